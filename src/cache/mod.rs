//! # Cache Module
//!
//! Memoizes catalog resolutions so that repeated `/play` requests for the
//! same query do not spawn another `yt-dlp` process.
//!
//! ## Configuration
//!
//! ```env
//! CACHE_SIZE=100              # Maximum number of cached resolutions
//! CACHE_TTL=1h                # Time-to-live (humantime)
//! ```

pub mod lru_cache;

use lru_cache::LRUCache;
use tracing::info;

use crate::audio::track::Track;

/// Cache de resoluciones, indexado por la clave normalizada de la consulta.
pub type ResolutionCache = LRUCache<String, Vec<Track>>;

impl ResolutionCache {
    /// Mantenimiento periódico: elimina las entradas expiradas.
    pub fn cleanup_old_entries(&self) {
        let removed = self.cleanup_expired();
        if removed > 0 {
            info!("🧹 Cache cleanup: removed {} expired entries", removed);
        }
    }
}
