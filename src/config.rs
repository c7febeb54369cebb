use anyhow::{Context, Result};
use serenity::model::id::RoleId;
use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::storage::GuildSettings;

/// Volumen máximo aceptado (porcentaje)
pub const MAX_VOLUME: u8 = 150;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: u8,
    pub max_queue_size: usize,
    pub max_playlist_size: usize,

    // Sesiones
    pub inactivity_timeout: Duration,
    pub sweep_interval: Duration,
    pub enable_autoplay: bool,

    // Timeouts de colaboradores externos
    pub catalog_timeout: Duration,
    pub backend_timeout: Duration,
    pub autoplay_timeout: Duration,
    pub backend_failure_threshold: u32,

    // Rendimiento
    pub cache_size: usize,
    pub cache_ttl: Duration,

    // Paths
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN no definido")?,
            application_id: std::env::var("APPLICATION_ID")
                .context("APPLICATION_ID no definido")?
                .parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Audio
            default_volume: env_or("DEFAULT_VOLUME", defaults.default_volume)?,
            max_queue_size: env_or("MAX_QUEUE_SIZE", defaults.max_queue_size)?,
            max_playlist_size: env_or("MAX_PLAYLIST_SIZE", defaults.max_playlist_size)?,

            // Sesiones
            inactivity_timeout: env_duration("INACTIVITY_TIMEOUT", defaults.inactivity_timeout)?,
            sweep_interval: env_duration("SWEEP_INTERVAL", defaults.sweep_interval)?,
            enable_autoplay: env_or("ENABLE_AUTOPLAY", defaults.enable_autoplay)?,

            // Timeouts
            catalog_timeout: env_duration("CATALOG_TIMEOUT", defaults.catalog_timeout)?,
            backend_timeout: env_duration("BACKEND_TIMEOUT", defaults.backend_timeout)?,
            autoplay_timeout: env_duration("AUTOPLAY_TIMEOUT", defaults.autoplay_timeout)?,
            backend_failure_threshold: env_or(
                "BACKEND_FAILURE_THRESHOLD",
                defaults.backend_failure_threshold,
            )?,

            // Rendimiento
            cache_size: env_or("CACHE_SIZE", defaults.cache_size)?,
            cache_ttl: env_duration("CACHE_TTL", defaults.cache_ttl)?,

            // Paths
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        };

        std::fs::create_dir_all(&config.data_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0 and 150
    /// - Queue, playlist and cache sizes must be greater than 0
    /// - Every timeout and the sweep interval must be non-zero
    /// - The backend failure threshold must be at least 1
    pub fn validate(&self) -> Result<()> {
        if self.default_volume > MAX_VOLUME {
            anyhow::bail!(
                "Default volume must be between 0 and {}, got: {}",
                MAX_VOLUME,
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        if self.cache_size == 0 {
            anyhow::bail!("Cache size must be greater than 0");
        }

        for (name, value) in [
            ("INACTIVITY_TIMEOUT", self.inactivity_timeout),
            ("SWEEP_INTERVAL", self.sweep_interval),
            ("CATALOG_TIMEOUT", self.catalog_timeout),
            ("BACKEND_TIMEOUT", self.backend_timeout),
            ("AUTOPLAY_TIMEOUT", self.autoplay_timeout),
        ] {
            if value.is_zero() {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        if self.backend_failure_threshold == 0 {
            anyhow::bail!("Backend failure threshold must be at least 1");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the Discord token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Audio: {}% vol, {} queue, {} playlist\n  \
            Sessions: idle timeout {}, sweep every {}, autoplay={}\n  \
            Timeouts: catalog {}, backend {}, autoplay {} ({} failures tolerated)\n  \
            Cache: {} resolutions, ttl {}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.default_volume,
            self.max_queue_size,
            self.max_playlist_size,
            humantime::format_duration(self.inactivity_timeout),
            humantime::format_duration(self.sweep_interval),
            self.enable_autoplay,
            humantime::format_duration(self.catalog_timeout),
            humantime::format_duration(self.backend_timeout),
            humantime::format_duration(self.autoplay_timeout),
            self.backend_failure_threshold,
            self.cache_size,
            humantime::format_duration(self.cache_ttl),
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            default_volume: 50,
            max_queue_size: 1000,
            max_playlist_size: 50,

            inactivity_timeout: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
            enable_autoplay: false,

            catalog_timeout: Duration::from_secs(15),
            backend_timeout: Duration::from_secs(10),
            autoplay_timeout: Duration::from_secs(10),
            backend_failure_threshold: 3,

            cache_size: 100,
            cache_ttl: Duration::from_secs(3600),

            data_dir: "/app/data".into(),
        }
    }
}

/// Valores inmutables con los que nace una sesión.
///
/// Se calculan una sola vez, al crear la sesión, combinando la configuración
/// global con la persistida para el servidor.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefaults {
    pub volume: u8,
    pub inactivity_timeout: Duration,
    pub autoplay: bool,
    pub dj_role: Option<RoleId>,
    pub max_queue_size: usize,
}

impl SessionDefaults {
    pub fn resolve(config: &Config, settings: &GuildSettings) -> Self {
        Self {
            volume: settings
                .default_volume
                .unwrap_or(config.default_volume)
                .min(MAX_VOLUME),
            inactivity_timeout: settings
                .inactivity_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(config.inactivity_timeout),
            autoplay: settings.autoplay.unwrap_or(config.enable_autoplay),
            dj_role: settings.dj_role_id.filter(|id| *id != 0).map(RoleId::new),
            max_queue_size: config.max_queue_size,
        }
    }
}

impl From<&Config> for SessionDefaults {
    fn from(config: &Config) -> Self {
        Self::resolve(config, &GuildSettings::default())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse()
            .with_context(|| format!("Valor inválido para {}: {}", key, val)),
        _ => Ok(default),
    }
}

fn env_duration(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => humantime::parse_duration(val.trim())
            .with_context(|| format!("Duración inválida para {}: {}", key, val)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_volume_above_limit_is_rejected() {
        let config = Config {
            default_volume: 200,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config = Config {
            backend_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_guild_settings_override_defaults() {
        let config = Config::default();
        let settings = GuildSettings {
            guild_id: 1,
            default_volume: Some(120),
            inactivity_timeout_secs: Some(30),
            dj_role_id: Some(5),
            autoplay: Some(true),
        };

        assert_eq!(
            SessionDefaults::resolve(&config, &settings),
            SessionDefaults {
                volume: 120,
                inactivity_timeout: Duration::from_secs(30),
                autoplay: true,
                dj_role: Some(RoleId::new(5)),
                max_queue_size: 1000,
            }
        );

        let inherited = SessionDefaults::from(&config);
        assert_eq!(inherited.volume, 50);
        assert_eq!(inherited.inactivity_timeout, Duration::from_secs(300));
        assert_eq!(inherited.dj_role, None);
    }

    #[test]
    fn test_summary_hides_token() {
        let config = Config {
            discord_token: "secret-token".to_string(),
            ..Config::default()
        };
        assert!(!config.summary().contains("secret-token"));
    }
}
