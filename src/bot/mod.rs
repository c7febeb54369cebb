//! # Bot Module
//!
//! Discord front-end for the playback sessions.
//!
//! - Slash command registration ([`commands`]) and dispatch ([`handlers`])
//! - Voice state tracking: listener counts and forced disconnects are
//!   forwarded to the guild's session as [`SessionEvent`]s
//! - The [`gateway::PlatformGateway`] the sessions use to join, leave,
//!   check permissions and post notifications
//! - Background maintenance (resolution cache cleanup, yt-dlp check)
//!
//! The [`SessionRegistry`] lives in the client's `TypeMap`, inserted by
//! `main` once the client (and therefore its HTTP client and cache) exists.

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
    prelude::TypeMapKey,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod gateway;
pub mod handlers;

use crate::{
    cache::ResolutionCache,
    config::Config,
    session::{SessionEvent, SessionRegistry},
    sources::ytdlp::YtDlpCatalog,
};

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(3600);

impl TypeMapKey for SessionRegistry {
    type Value = SessionRegistry;
}

/// Obtiene el registro de sesiones del contexto del cliente.
pub async fn session_registry(ctx: &Context) -> Option<SessionRegistry> {
    ctx.data.read().await.get::<SessionRegistry>().cloned()
}

/// Handler de eventos de Discord.
pub struct GuildPlayerBot {
    config: Arc<Config>,
    cache: ResolutionCache,
    catalog: Arc<YtDlpCatalog>,
}

impl GuildPlayerBot {
    pub fn new(config: Arc<Config>, cache: ResolutionCache, catalog: Arc<YtDlpCatalog>) -> Self {
        Self {
            config,
            cache,
            catalog,
        }
    }

    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await.map_err(|e| {
                    error!("❌ Error registrando comandos de guild: {:?}", e);
                    anyhow::anyhow!(
                        "No se pudieron registrar comandos de guild. Verifica el permiso 'applications.commands'."
                    )
                })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!(
                        "No se pudieron registrar comandos globales. Verifica el permiso 'applications.commands'."
                    )
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for GuildPlayerBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        let cache = self.cache.clone();
        let catalog = self.catalog.clone();
        tokio::spawn(async move {
            maintenance_tasks(cache, catalog).await;
        });
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        let Some(registry) = session_registry(&ctx).await else {
            return;
        };
        if !registry.contains(guild_id) {
            return;
        }

        // El bot fue desconectado del canal de voz
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id == current_user_id {
            if old.is_some() && new.channel_id.is_none() {
                info!("🔌 Bot desconectado en guild {}", guild_id);
                registry.deliver(guild_id, SessionEvent::BotDisconnected);
            }
            return;
        }

        let Some(bot_channel) = bot_voice_channel(&ctx, guild_id).await else {
            return;
        };

        let old_channel = old.as_ref().and_then(|state| state.channel_id);
        if old_channel != Some(bot_channel) && new.channel_id != Some(bot_channel) {
            return;
        }

        let listeners = gateway::count_listeners(&ctx.cache, guild_id, bot_channel);
        debug!("👥 {} oyentes en el canal {} de guild {}", listeners, bot_channel, guild_id);
        registry.deliver(guild_id, SessionEvent::Occupancy { listeners });
    }
}

/// Canal de voz en el que está conectado el bot, según songbird.
async fn bot_voice_channel(ctx: &Context, guild_id: GuildId) -> Option<ChannelId> {
    let manager = songbird::get(ctx).await?;
    let call = manager.get(guild_id)?;
    let channel = call.lock().await.current_channel()?;
    Some(ChannelId::new(channel.0.get()))
}

/// Limpieza de la caché de resoluciones y verificación de yt-dlp, cada hora.
async fn maintenance_tasks(cache: ResolutionCache, catalog: Arc<YtDlpCatalog>) {
    let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
    // El primer tick es inmediato
    interval.tick().await;

    loop {
        interval.tick().await;

        cache.cleanup_old_entries();

        if let Err(e) = catalog.verify().await {
            warn!("Error verificando yt-dlp: {:?}", e);
        }

        info!("🧹 Tareas de mantenimiento completadas");
    }
}
