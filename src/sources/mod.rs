//! # Track Catalog
//!
//! Resolves user queries (free text or URLs) into playable [`Track`]s.
//!
//! - [`TrackCatalog`]: the seam the session manager depends on
//! - [`ytdlp::YtDlpCatalog`]: implementation backed by the `yt-dlp` binary
//! - [`CachedCatalog`]: decorator that memoizes non-empty resolutions

pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serenity::model::id::UserId;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::{audio::track::Track, cache::ResolutionCache};

pub use ytdlp::YtDlpCatalog;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("regex de URL válida"));

static PLAYLIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.|music\.)?(youtube\.com/(playlist\?|watch\?.*[?&]?list=)|soundcloud\.com/[^/]+/sets/)")
        .expect("regex de playlist válida")
});

/// Cómo debe resolverse una consulta
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// Texto libre: búsqueda, se toma el primer resultado
    Search(String),
    /// URL de un único elemento
    Url(String),
    /// URL de playlist: se expande hasta el límite configurado
    Playlist(String),
}

impl QueryKind {
    pub fn classify(query: &str) -> Self {
        let query = query.trim();
        if PLAYLIST_REGEX.is_match(query) {
            QueryKind::Playlist(query.to_string())
        } else if URL_REGEX.is_match(query) {
            QueryKind::Url(query.to_string())
        } else {
            QueryKind::Search(query.to_string())
        }
    }

    /// Clave normalizada para el caché de resoluciones
    pub fn cache_key(&self) -> String {
        match self {
            QueryKind::Search(text) => format!("search:{}", text.to_lowercase()),
            QueryKind::Url(url) => format!("url:{}", url),
            QueryKind::Playlist(url) => format!("playlist:{}", url),
        }
    }
}

/// Cliente del catálogo de tracks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Resuelve una consulta en uno o más tracks (vacío si no hay resultados).
    async fn resolve(&self, query: &str, requested_by: Option<UserId>) -> Result<Vec<Track>>;

    /// Búsqueda de texto libre con hasta `limit` resultados.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>>;
}

/// Decorador que guarda en caché las resoluciones no vacías.
pub struct CachedCatalog {
    inner: Arc<dyn TrackCatalog>,
    cache: ResolutionCache,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn TrackCatalog>, cache: ResolutionCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl TrackCatalog for CachedCatalog {
    async fn resolve(&self, query: &str, requested_by: Option<UserId>) -> Result<Vec<Track>> {
        let key = QueryKind::classify(query).cache_key();

        if let Some(cached) = self.cache.get(&key) {
            debug!("💾 Resolución en caché para: {}", query);
            return Ok(cached
                .into_iter()
                .map(|t| t.requested_by(requested_by))
                .collect());
        }

        let tracks = self.inner.resolve(query, requested_by).await?;
        if !tracks.is_empty() {
            let anonymous = tracks.iter().cloned().map(|t| t.requested_by(None)).collect();
            self.cache.insert(key, anonymous);
        }
        Ok(tracks)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        self.inner.search(query, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::{eq, function};
    use std::time::Duration;

    #[test]
    fn test_query_classification() {
        assert_eq!(
            QueryKind::classify("  daft punk  "),
            QueryKind::Search("daft punk".to_string())
        );
        assert_eq!(
            QueryKind::classify("https://youtu.be/dQw4w9WgXcQ"),
            QueryKind::Url("https://youtu.be/dQw4w9WgXcQ".to_string())
        );
        assert!(matches!(
            QueryKind::classify("https://www.youtube.com/playlist?list=PL123"),
            QueryKind::Playlist(_)
        ));
        assert!(matches!(
            QueryKind::classify("https://soundcloud.com/artist/sets/album"),
            QueryKind::Playlist(_)
        ));
    }

    #[test]
    fn test_search_keys_are_case_insensitive() {
        assert_eq!(
            QueryKind::classify("Daft Punk").cache_key(),
            QueryKind::classify("daft punk").cache_key()
        );
    }

    #[tokio::test]
    async fn test_cached_catalog_hits_inner_once() {
        let mut inner = MockTrackCatalog::new();
        inner
            .expect_resolve()
            .with(function(|q: &str| q == "song"), eq(Some(UserId::new(1))))
            .times(1)
            .returning(|_, user| {
                Ok(vec![Track::new("id", "Song", "https://youtu.be/x").requested_by(user)])
            });

        let catalog = CachedCatalog::new(
            Arc::new(inner),
            ResolutionCache::new(10, Duration::from_secs(60)),
        );

        let first = catalog.resolve("song", Some(UserId::new(1))).await.unwrap();
        let second = catalog.resolve("SONG", Some(UserId::new(2))).await.unwrap();

        assert_eq!(first[0].requested_by, Some(UserId::new(1)));
        assert_eq!(second[0].requested_by, Some(UserId::new(2)));
    }

    #[tokio::test]
    async fn test_empty_results_are_not_cached() {
        let mut inner = MockTrackCatalog::new();
        inner.expect_resolve().times(2).returning(|_, _| Ok(Vec::new()));

        let catalog = CachedCatalog::new(
            Arc::new(inner),
            ResolutionCache::new(10, Duration::from_secs(60)),
        );

        assert!(catalog.resolve("nada", None).await.unwrap().is_empty());
        assert!(catalog.resolve("nada", None).await.unwrap().is_empty());
    }
}
