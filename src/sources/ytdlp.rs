use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{QueryKind, TrackCatalog};
use crate::audio::track::{SourceKind, Track};

/// Información extraída de yt-dlp (`--dump-json`, una entrada por línea)
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    is_live: Option<bool>,
}

impl YtDlpInfo {
    fn source_uri(&self) -> String {
        self.webpage_url
            .clone()
            .or_else(|| self.url.clone().filter(|u| u.starts_with("http")))
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id))
    }

    fn into_track(self, kind: Option<SourceKind>, requested_by: Option<UserId>) -> Track {
        let uri = self.source_uri();
        let duration = match (self.is_live, self.duration) {
            (Some(true), _) | (_, None) => Duration::ZERO,
            (_, Some(secs)) => Duration::from_secs_f64(secs.max(0.0)),
        };
        let author = self
            .uploader
            .or(self.channel)
            .unwrap_or_else(|| "Desconocido".to_string());

        let mut track = Track::new(uri.clone(), self.title.unwrap_or_else(|| uri.clone()), uri)
            .with_author(author)
            .with_duration(duration)
            .requested_by(requested_by);
        if let Some(kind) = kind {
            track = track.with_source_kind(kind);
        }
        if let Some(thumbnail) = self.thumbnail {
            track = track.with_thumbnail(thumbnail);
        }
        track
    }
}

/// Catálogo basado en el binario `yt-dlp`.
pub struct YtDlpCatalog {
    // Limitar procesos concurrentes para evitar rate limiting
    rate_limiter: Semaphore,
    max_playlist_size: usize,
}

impl YtDlpCatalog {
    pub fn new(max_playlist_size: usize) -> Self {
        Self {
            rate_limiter: Semaphore::new(3),
            max_playlist_size,
        }
    }

    /// Ejecuta yt-dlp y parsea cada línea JSON de la salida.
    async fn run(&self, args: &[&str]) -> Result<Vec<YtDlpInfo>> {
        let _permit = self.rate_limiter.acquire().await?;

        let output = Command::new("yt-dlp")
            .args(args)
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_lines(&stdout))
    }

    async fn search_entries(&self, query: &str, limit: usize) -> Result<Vec<YtDlpInfo>> {
        let search_query = format!("ytsearch{}:{}", limit.max(1), query);
        self.run(&[
            "--no-playlist",
            "--dump-json",
            "--flat-playlist",
            "--skip-download",
            "--no-warnings",
            &search_query,
        ])
        .await
    }

    /// Verifica que yt-dlp esté instalado
    pub async fn verify(&self) -> Result<()> {
        let output = Command::new("yt-dlp")
            .arg("--version")
            .output()
            .await
            .context("yt-dlp no encontrado en PATH")?;
        if !output.status.success() {
            anyhow::bail!("yt-dlp no responde");
        }
        info!("✅ yt-dlp {}", String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }
}

#[async_trait]
impl TrackCatalog for YtDlpCatalog {
    async fn resolve(&self, query: &str, requested_by: Option<UserId>) -> Result<Vec<Track>> {
        let tracks = match QueryKind::classify(query) {
            QueryKind::Search(text) => {
                info!("🔍 Buscando: {}", text);
                self.search_entries(&text, 1)
                    .await?
                    .into_iter()
                    .take(1)
                    .map(|info| info.into_track(None, requested_by))
                    .collect()
            }
            QueryKind::Url(url) => {
                debug!("📊 Obteniendo info de: {}", url);
                self.run(&["--no-playlist", "--dump-json", "--no-warnings", &url])
                    .await?
                    .into_iter()
                    .take(1)
                    .map(|info| info.into_track(None, requested_by))
                    .collect()
            }
            QueryKind::Playlist(url) => {
                info!("📋 Expandiendo playlist: {}", url);
                let limit = self.max_playlist_size.to_string();
                self.run(&[
                    "--flat-playlist",
                    "--dump-json",
                    "--playlist-end",
                    &limit,
                    "--no-warnings",
                    &url,
                ])
                .await?
                .into_iter()
                .take(self.max_playlist_size)
                .map(|info| info.into_track(Some(SourceKind::PlaylistItem), requested_by))
                .collect()
            }
        };

        Ok(tracks)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        Ok(self
            .search_entries(query, limit)
            .await?
            .into_iter()
            .map(|info| info.into_track(None, None))
            .collect())
    }
}

fn parse_lines(stdout: &str) -> Vec<YtDlpInfo> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<YtDlpInfo>(line) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Entrada de yt-dlp ignorada: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_output() {
        let stdout = r#"{"id":"abc","title":"Song A","duration":215.0,"uploader":"Artist","url":"https://www.youtube.com/watch?v=abc"}
not json
{"id":"def","title":"Live Radio","is_live":true,"channel":"Radio FM"}
"#;
        let entries = parse_lines(stdout);
        assert_eq!(entries.len(), 2);

        let tracks: Vec<Track> = entries
            .into_iter()
            .map(|info| info.into_track(None, Some(UserId::new(7))))
            .collect();

        assert_eq!(tracks[0].title, "Song A");
        assert_eq!(tracks[0].author, "Artist");
        assert_eq!(tracks[0].duration, Duration::from_secs(215));
        assert_eq!(tracks[0].source_uri, "https://www.youtube.com/watch?v=abc");
        assert_eq!(tracks[0].source_kind, SourceKind::WebVideo);
        assert_eq!(tracks[0].requested_by, Some(UserId::new(7)));

        assert!(tracks[1].is_live());
        assert_eq!(tracks[1].author, "Radio FM");
        assert_eq!(tracks[1].source_uri, "https://www.youtube.com/watch?v=def");
    }

    #[test]
    fn test_playlist_items_are_tagged() {
        let info: YtDlpInfo =
            serde_json::from_str(r#"{"id":"x","title":"T","webpage_url":"https://soundcloud.com/a/t"}"#).unwrap();
        let track = info.into_track(Some(SourceKind::PlaylistItem), None);
        assert_eq!(track.source_kind, SourceKind::PlaylistItem);
        assert_eq!(track.id, "https://soundcloud.com/a/t");
    }
}
