use thiserror::Error;

/// Errores devueltos a quien emitió un comando.
///
/// Nunca terminan el contexto de ejecución de la sesión.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// El usuario no está en un canal de voz
    #[error("caller is not in a voice channel")]
    NotInVoice,

    /// El usuario está en otro canal que el del bot
    #[error("caller is not in the bot's voice channel")]
    WrongChannel,

    /// No hay sesión activa en el servidor
    #[error("no playback session for this guild")]
    NotConnected,

    #[error("no results for query")]
    NoResults,

    /// Backend caído o sin respuesta dentro del timeout
    #[error("audio backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("failed to join voice channel: {0}")]
    JoinFailed(String),

    #[error("queue is empty")]
    EmptyQueue,

    #[error("queue is full ({0} tracks)")]
    QueueFull(usize),

    #[error("nothing is playing")]
    NothingPlaying,

    #[error("playback is already paused")]
    AlreadyPaused,

    #[error("playback is already running")]
    AlreadyPlaying,

    /// El voto se registró pero no alcanza el umbral
    #[error("skip vote recorded ({votes}/{required})")]
    InsufficientVotes { votes: usize, required: usize },

    /// La sesión terminó antes de responder
    #[error("session closed")]
    SessionClosed,
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
