use serenity::model::id::UserId;
use std::{fmt, time::Duration};

/// Origen de un track, derivado de su URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Video web (YouTube y similares)
    WebVideo,
    /// Audio de plataformas sociales (SoundCloud, Bandcamp...)
    SocialAudio,
    /// Elemento expandido desde una playlist curada
    PlaylistItem,
}

impl SourceKind {
    /// Clasifica una URL de origen.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.contains("soundcloud.com") || lower.contains("bandcamp.com") {
            SourceKind::SocialAudio
        } else {
            SourceKind::WebVideo
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::WebVideo => "YouTube",
            SourceKind::SocialAudio => "SoundCloud",
            SourceKind::PlaylistItem => "Playlist",
        }
    }
}

/// Descriptor inmutable de un elemento reproducible.
///
/// Se crea cuando el catálogo resuelve una consulta y no se modifica después;
/// la cola y el slot "reproduciendo ahora" guardan copias del mismo valor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Referencia reproducible asignada por el backend (URL de stream o id)
    pub id: String,
    pub title: String,
    pub author: String,
    /// Cero para transmisiones en vivo
    pub duration: Duration,
    pub source_uri: String,
    pub source_kind: SourceKind,
    pub requested_by: Option<UserId>,
    pub thumbnail: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, source_uri: impl Into<String>) -> Self {
        let source_uri = source_uri.into();
        Self {
            id: id.into(),
            title: title.into(),
            author: String::new(),
            duration: Duration::ZERO,
            source_kind: SourceKind::from_url(&source_uri),
            source_uri,
            requested_by: None,
            thumbnail: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_source_kind(mut self, kind: SourceKind) -> Self {
        self.source_kind = kind;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: String) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn requested_by(mut self, user: Option<UserId>) -> Self {
        self.requested_by = user;
        self
    }

    /// Duración conocida; `None` para streams en vivo.
    pub fn known_duration(&self) -> Option<Duration> {
        (!self.duration.is_zero()).then_some(self.duration)
    }

    pub fn is_live(&self) -> bool {
        self.duration.is_zero()
    }
}

/// Identifica una reproducción concreta de un track dentro de una sesión.
///
/// El backend devuelve este id en cada callback, lo que permite descartar
/// entregas duplicadas o tardías de `trackStart`/`trackEnd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_detection() {
        assert_eq!(
            SourceKind::from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            SourceKind::WebVideo
        );
        assert_eq!(
            SourceKind::from_url("https://soundcloud.com/artist/song"),
            SourceKind::SocialAudio
        );
    }

    #[test]
    fn test_live_tracks_have_no_known_duration() {
        let live = Track::new("id", "Radio", "https://youtu.be/live");
        assert!(live.is_live());
        assert_eq!(live.known_duration(), None);

        let song = live.with_duration(Duration::from_secs(200));
        assert_eq!(song.known_duration(), Some(Duration::from_secs(200)));
    }
}
