use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::{
    all::{Cache, Http, Member, Permissions},
    builder::CreateMessage,
    model::id::{ChannelId, GuildId, RoleId, UserId},
};
use songbird::Songbird;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{session::Notification, ui::embeds};

/// Operaciones de la plataforma de chat que necesita una sesión.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Conecta el bot a un canal de voz.
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()>;

    async fn leave(&self, guild_id: GuildId) -> Result<()>;

    /// Usuarios que no son bots en el canal de voz.
    async fn listener_count(&self, guild_id: GuildId, channel_id: ChannelId) -> usize;

    /// Administrador, gestor de canales o portador del rol DJ.
    async fn is_elevated(&self, guild_id: GuildId, user_id: UserId, dj_role: Option<RoleId>) -> bool;

    /// Si el usuario puede forzar un skip sin votación.
    async fn allows_force_skip(&self, guild_id: GuildId, user_id: UserId) -> bool;

    /// Publica una notificación en un canal de texto. Los fallos solo se loguean.
    async fn notify(&self, channel_id: ChannelId, notification: Notification);
}

/// Usuarios (no bots) en un canal de voz, leídos de la caché.
pub fn count_listeners(cache: &Cache, guild_id: GuildId, channel_id: ChannelId) -> usize {
    let Some(guild) = cache.guild(guild_id) else {
        return 0;
    };

    guild
        .voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel_id))
        .filter(|state| {
            let is_bot = state
                .member
                .as_ref()
                .map(|m| m.user.bot)
                .or_else(|| guild.members.get(&state.user_id).map(|m| m.user.bot))
                .unwrap_or(false);
            !is_bot
        })
        .count()
}

/// Implementación sobre serenity + songbird.
pub struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
    songbird: Arc<Songbird>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, songbird: Arc<Songbird>) -> Self {
        Self {
            http,
            cache,
            songbird,
        }
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<Member> {
        let cached = self
            .cache
            .guild(guild_id)
            .and_then(|guild| guild.members.get(&user_id).cloned());

        match cached {
            Some(member) => Some(member),
            None => match self.http.get_member(guild_id, user_id).await {
                Ok(member) => Some(member),
                Err(e) => {
                    warn!("No se pudo obtener el miembro {} en {}: {}", user_id, guild_id, e);
                    None
                }
            },
        }
    }

    /// Permisos efectivos a nivel de servidor (rol @everyone + roles del miembro).
    fn guild_permissions(&self, guild_id: GuildId, member: &Member) -> Permissions {
        let Some(guild) = self.cache.guild(guild_id) else {
            return Permissions::empty();
        };

        if guild.owner_id == member.user.id {
            return Permissions::all();
        }

        let everyone = RoleId::new(guild_id.get());
        let mut permissions = guild
            .roles
            .get(&everyone)
            .map(|role| role.permissions)
            .unwrap_or_else(Permissions::empty);

        for role_id in &member.roles {
            if let Some(role) = guild.roles.get(role_id) {
                permissions |= role.permissions;
            }
        }

        permissions
    }
}

#[async_trait]
impl PlatformGateway for SerenityGateway {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        self.songbird
            .join(guild_id, channel_id)
            .await
            .with_context(|| format!("No se pudo unir al canal {}", channel_id))?;

        info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
        Ok(())
    }

    async fn leave(&self, guild_id: GuildId) -> Result<()> {
        if self.songbird.get(guild_id).is_none() {
            debug!("Sin conexión de voz que cerrar en guild {}", guild_id);
            return Ok(());
        }

        self.songbird
            .remove(guild_id)
            .await
            .context("Error al desconectar del canal de voz")?;

        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }

    async fn listener_count(&self, guild_id: GuildId, channel_id: ChannelId) -> usize {
        count_listeners(&self.cache, guild_id, channel_id)
    }

    async fn is_elevated(&self, guild_id: GuildId, user_id: UserId, dj_role: Option<RoleId>) -> bool {
        let Some(member) = self.member(guild_id, user_id).await else {
            return false;
        };

        if dj_role.is_some_and(|role| member.roles.contains(&role)) {
            return true;
        }

        let permissions = self.guild_permissions(guild_id, &member);
        permissions.administrator() || permissions.manage_channels()
    }

    async fn allows_force_skip(&self, guild_id: GuildId, user_id: UserId) -> bool {
        let Some(member) = self.member(guild_id, user_id).await else {
            return false;
        };

        let permissions = self.guild_permissions(guild_id, &member);
        permissions.administrator() || permissions.manage_channels() || permissions.move_members()
    }

    async fn notify(&self, channel_id: ChannelId, notification: Notification) {
        let message = CreateMessage::new().embed(embeds::notification_embed(&notification));
        if let Err(e) = channel_id.send_message(&self.http, message).await {
            warn!("No se pudo enviar notificación a {}: {:?}", channel_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_guild_has_no_listeners() {
        let cache = Cache::new();
        assert_eq!(count_listeners(&cache, GuildId::new(1), ChannelId::new(10)), 0);
    }
}
