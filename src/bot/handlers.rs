use anyhow::Result;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse},
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{debug, info, warn};

use crate::{
    bot::{
        commands::{parse_command, CommandOptions},
        session_registry,
    },
    session::Caller,
    ui::embeds,
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        return reply_ephemeral(ctx, &command, "❌ Este comando solo funciona en un servidor").await;
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let options = CommandOptions::from_interaction(&command.data.options);
    let Some(intent) = parse_command(&command.data.name, &options) else {
        return reply_ephemeral(ctx, &command, "❌ Comando no reconocido").await;
    };

    let Some(registry) = session_registry(ctx).await else {
        warn!("Registro de sesiones no disponible todavía");
        return reply_ephemeral(ctx, &command, "❌ El bot aún se está iniciando").await;
    };

    // Las resoluciones y conexiones pueden superar los 3s de Discord
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let caller = Caller {
        user: command.user.id,
        voice_channel: user_voice_channel(ctx, guild_id, command.user.id),
        text_channel: command.channel_id,
    };

    let embed = match registry.execute(guild_id, caller, intent).await {
        Ok(outcome) => embeds::outcome_embed(&outcome),
        Err(e) => {
            debug!("/{} rechazado en guild {}: {}", command.data.name, guild_id, e);
            embeds::error_embed(&e)
        }
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;

    Ok(())
}

async fn reply_ephemeral(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

/// Canal de voz del usuario según la caché de estados de voz.
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
