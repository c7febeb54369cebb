use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{audio::track::Track, sources::TrackCatalog};

/// Candidatos pedidos al catálogo en la búsqueda por artista
const CANDIDATES: usize = 10;

/// Elige un track relacionado para continuar cuando la cola se agota.
pub struct AutoplayAdvisor {
    catalog: Arc<dyn TrackCatalog>,
}

impl AutoplayAdvisor {
    pub fn new(catalog: Arc<dyn TrackCatalog>) -> Self {
        Self { catalog }
    }

    /// Busca algo del mismo artista distinto a `finished`; si no hay nada
    /// usable recurre a "artista - título". El track elegido hereda el
    /// solicitante del que terminó.
    pub async fn related(&self, finished: &Track) -> Option<Track> {
        let by_author = format!("{} music", finished.author);
        match self.catalog.search(&by_author, CANDIDATES).await {
            Ok(results) => {
                let candidates: Vec<Track> = results
                    .into_iter()
                    .filter(|t| t.source_uri != finished.source_uri)
                    .collect();
                let pick = candidates.choose(&mut rand::thread_rng()).cloned();
                if let Some(track) = pick {
                    debug!("🎲 Autoplay eligió: {}", track.title);
                    return Some(track.requested_by(finished.requested_by));
                }
            }
            Err(e) => warn!("Búsqueda de autoplay falló para '{}': {}", by_author, e),
        }

        let fallback = format!("{} - {}", finished.author, finished.title);
        match self.catalog.search(&fallback, 1).await {
            Ok(results) => results
                .into_iter()
                .next()
                .map(|t| t.requested_by(finished.requested_by)),
            Err(e) => {
                warn!("Búsqueda de respaldo de autoplay falló: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockTrackCatalog;
    use mockall::predicate::{eq, function};
    use serenity::model::id::UserId;

    fn finished() -> Track {
        Track::new("a", "Around the World", "https://youtu.be/a")
            .with_author("Daft Punk")
            .requested_by(Some(UserId::new(3)))
    }

    #[tokio::test]
    async fn test_related_excludes_finished_track() {
        let mut catalog = MockTrackCatalog::new();
        catalog
            .expect_search()
            .with(function(|q: &str| q == "Daft Punk music"), eq(CANDIDATES))
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    Track::new("a", "Around the World", "https://youtu.be/a"),
                    Track::new("b", "One More Time", "https://youtu.be/b"),
                ])
            });

        let advisor = AutoplayAdvisor::new(Arc::new(catalog));
        let pick = advisor.related(&finished()).await.unwrap();

        assert_eq!(pick.id, "b");
        assert_eq!(pick.requested_by, Some(UserId::new(3)));
    }

    #[tokio::test]
    async fn test_falls_back_to_title_search() {
        let mut catalog = MockTrackCatalog::new();
        catalog
            .expect_search()
            .with(function(|q: &str| q == "Daft Punk music"), eq(CANDIDATES))
            .returning(|_, _| Ok(vec![Track::new("a", "Around the World", "https://youtu.be/a")]));
        catalog
            .expect_search()
            .with(function(|q: &str| q == "Daft Punk - Around the World"), eq(1))
            .returning(|_, _| Ok(vec![Track::new("c", "Live", "https://youtu.be/c")]));

        let advisor = AutoplayAdvisor::new(Arc::new(catalog));
        let pick = advisor.related(&finished()).await.unwrap();

        assert_eq!(pick.id, "c");
    }

    #[tokio::test]
    async fn test_no_suggestion_when_catalog_fails() {
        let mut catalog = MockTrackCatalog::new();
        catalog
            .expect_search()
            .returning(|_, _| Err(anyhow::anyhow!("yt-dlp no disponible")));

        let advisor = AutoplayAdvisor::new(Arc::new(catalog));
        assert!(advisor.related(&finished()).await.is_none());
    }
}
