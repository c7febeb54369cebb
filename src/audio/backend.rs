use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::audio::track::{PlaybackId, Track};

/// Motivo por el que terminó una reproducción.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEndReason {
    /// Terminó de forma natural
    Finished,
    /// Detenida explícitamente (stop/skip)
    Stopped,
    /// Reemplazada por otra reproducción
    Replaced,
    /// Falló durante la carga o la reproducción
    Error,
}

impl TrackEndReason {
    /// Solo un final natural (o un error tratado como tal) puede activar loop
    /// y autoplay.
    pub fn may_advance_naturally(&self) -> bool {
        matches!(self, TrackEndReason::Finished | TrackEndReason::Error)
    }
}

/// Callbacks asíncronos del backend, entregados como mensajes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    TrackStart {
        guild_id: GuildId,
        playback: PlaybackId,
    },
    TrackEnd {
        guild_id: GuildId,
        playback: PlaybackId,
        reason: TrackEndReason,
    },
    NodeReady {
        guild_id: GuildId,
    },
    NodeClosed {
        guild_id: GuildId,
    },
}

impl BackendEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            BackendEvent::TrackStart { guild_id, .. }
            | BackendEvent::TrackEnd { guild_id, .. }
            | BackendEvent::NodeReady { guild_id }
            | BackendEvent::NodeClosed { guild_id } => *guild_id,
        }
    }
}

pub type BackendEventSender = mpsc::UnboundedSender<BackendEvent>;
pub type BackendEventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

/// Servicio externo que reproduce el audio en un canal de voz.
///
/// Las llamadas solo inician la operación; el resultado observable llega
/// después como [`BackendEvent`].
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Comienza a reproducir `track`, reemplazando lo que estuviera sonando.
    async fn play(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        track: &Track,
        playback: PlaybackId,
        volume: u8,
    ) -> Result<()>;

    async fn pause(&self, guild_id: GuildId) -> Result<()>;

    async fn resume(&self, guild_id: GuildId) -> Result<()>;

    async fn stop(&self, guild_id: GuildId) -> Result<()>;

    /// `level` en porcentaje, 0–150
    async fn set_volume(&self, guild_id: GuildId, level: u8) -> Result<()>;

    /// Posición de la reproducción actual, si el backend la conoce.
    async fn position(&self, guild_id: GuildId) -> Option<Duration>;

    /// Libera el estado interno asociado al guild.
    fn release(&self, guild_id: GuildId);
}
