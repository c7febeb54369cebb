use serenity::model::id::{ChannelId, GuildId, UserId};
use std::time::Duration;

use crate::audio::{
    backend::{BackendEvent, TrackEndReason},
    queue::QueuePage,
    track::{PlaybackId, Track},
};

/// Quién emite un comando y desde dónde.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user: UserId,
    /// Canal de voz en el que está el usuario, si está en alguno
    pub voice_channel: Option<ChannelId>,
    /// Canal de texto donde se invocó el comando
    pub text_channel: ChannelId,
}

/// Intenciones de usuario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play { query: String },
    Skip { force: bool },
    Pause,
    Resume,
    Stop,
    Disconnect,
    Queue { page: usize },
    NowPlaying,
    Shuffle,
    /// Se ajusta a 0–150
    Volume { level: i64 },
    /// `None` alterna el valor actual
    Loop { enabled: Option<bool> },
    Autoplay { enabled: Option<bool> },
}

impl Command {
    /// Los comandos de solo lectura no exigen estar en el canal del bot.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Command::Queue { .. } | Command::NowPlaying)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Play { .. } => "play",
            Command::Skip { .. } => "skip",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::Disconnect => "leave",
            Command::Queue { .. } => "queue",
            Command::NowPlaying => "nowplaying",
            Command::Shuffle => "shuffle",
            Command::Volume { .. } => "volume",
            Command::Loop { .. } => "loop",
            Command::Autoplay { .. } => "autoplay",
        }
    }
}

/// Track actual con su progreso.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    pub position: Option<Duration>,
    pub paused: bool,
    pub waiting_for_listeners: bool,
}

/// Vista de solo lectura de la cola.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    pub page: QueuePage,
    pub loop_enabled: bool,
    pub autoplay: bool,
}

/// Resultado estructurado de un comando exitoso; la capa de presentación
/// decide cómo mostrarlo.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// La reproducción empezó de inmediato; `queued` cuenta los tracks
    /// adicionales que quedaron en cola (playlists)
    Started { track: Track, queued: usize },
    /// Agregado a la cola en `position` (1-based)
    Queued {
        track: Track,
        position: usize,
        estimated_wait: Duration,
        added: usize,
    },
    Skipped { skipped: Track, next: Option<Track> },
    Paused,
    Resumed,
    Stopped,
    Disconnected,
    Queue(QueueSnapshot),
    Current(Option<NowPlaying>),
    Shuffled { tracks: usize },
    Volume { level: u8 },
    Loop { enabled: bool },
    Autoplay { enabled: bool },
}

/// Mensajes que la sesión envía al canal de texto vinculado.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    NowPlaying { track: Track },
    /// El canal de voz quedó sin oyentes; la reproducción se pausó
    ListenersLeft { timeout: Duration },
    ListenersReturned,
    TrackFailed { track: Track },
    /// Fallos repetidos del backend; la sesión quedó inactiva
    BackendUnavailable,
    /// La sesión se cerró por inactividad
    InactivityDisconnect { idle_for: Duration },
}

/// Eventos externos normalizados para una sesión.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TrackStart { playback: PlaybackId },
    TrackEnd { playback: PlaybackId, reason: TrackEndReason },
    NodeReady,
    NodeClosed,
    /// Oyentes (no bots) en el canal de voz del bot
    Occupancy { listeners: usize },
    /// La plataforma informa que el bot salió del canal de voz
    BotDisconnected,
}

impl SessionEvent {
    pub fn from_backend(event: BackendEvent) -> (GuildId, SessionEvent) {
        let guild_id = event.guild_id();
        let event = match event {
            BackendEvent::TrackStart { playback, .. } => SessionEvent::TrackStart { playback },
            BackendEvent::TrackEnd {
                playback, reason, ..
            } => SessionEvent::TrackEnd { playback, reason },
            BackendEvent::NodeReady { .. } => SessionEvent::NodeReady,
            BackendEvent::NodeClosed { .. } => SessionEvent::NodeClosed,
        };
        (guild_id, event)
    }
}
