use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serenity::model::id::GuildId;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

/// Configuración persistida de un servidor.
///
/// Los campos vacíos heredan el valor global de [`crate::config::Config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GuildSettings {
    pub guild_id: u64,
    /// Volumen inicial, 0–150
    pub default_volume: Option<u8>,
    pub inactivity_timeout_secs: Option<u64>,
    pub dj_role_id: Option<u64>,
    pub autoplay: Option<bool>,
}

/// Fuente de la configuración por servidor, consultada al crear una sesión.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn guild_settings(&self, guild_id: GuildId) -> Result<GuildSettings>;
}

/// Almacenamiento basado en archivos JSON (`servers/guild_<id>.json`)
pub struct JsonStorage {
    data_dir: PathBuf,
    servers_cache: DashMap<u64, GuildSettings>,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        let servers_dir = data_dir.join("servers");
        fs::create_dir_all(&servers_dir)
            .await
            .with_context(|| format!("No se pudo crear {}", servers_dir.display()))?;

        info!("📁 Storage inicializado en: {}", data_dir.display());

        let storage = Self {
            data_dir,
            servers_cache: DashMap::new(),
        };
        storage.load_all_servers().await?;

        Ok(storage)
    }

    /// Obtiene la configuración de un servidor, creándola si no existe
    pub async fn get_guild_settings(&self, guild_id: u64) -> Result<GuildSettings> {
        if let Some(settings) = self.servers_cache.get(&guild_id) {
            return Ok(settings.clone());
        }

        let settings = match self.load_guild_settings(guild_id).await {
            Ok(settings) => settings,
            Err(_) => {
                let settings = GuildSettings {
                    guild_id,
                    ..GuildSettings::default()
                };
                self.save_guild_settings(&settings).await?;
                info!("📝 Configuración por defecto creada para guild {}", guild_id);
                settings
            }
        };

        self.servers_cache.insert(guild_id, settings.clone());
        Ok(settings)
    }

    async fn load_guild_settings(&self, guild_id: u64) -> Result<GuildSettings> {
        let file_path = self.settings_path(guild_id);
        let content = fs::read_to_string(&file_path).await?;
        let settings: GuildSettings = serde_json::from_str(&content)
            .with_context(|| format!("JSON inválido en {}", file_path.display()))?;
        Ok(settings)
    }

    async fn save_guild_settings(&self, settings: &GuildSettings) -> Result<()> {
        let file_path = self.settings_path(settings.guild_id);
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&file_path, content).await?;
        Ok(())
    }

    async fn load_all_servers(&self) -> Result<()> {
        let servers_dir = self.data_dir.join("servers");
        let mut files = fs::read_dir(&servers_dir).await?;
        let mut loaded_count = 0;

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let guild_id = path
                .file_stem()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("guild_"))
                .and_then(|id| id.parse::<u64>().ok());

            if let Some(guild_id) = guild_id {
                match self.load_guild_settings(guild_id).await {
                    Ok(settings) => {
                        self.servers_cache.insert(guild_id, settings);
                        loaded_count += 1;
                    }
                    Err(e) => {
                        warn!("Error cargando configuración para guild {}: {}", guild_id, e);
                    }
                }
            }
        }

        if loaded_count > 0 {
            info!("📂 Cargadas {} configuraciones de servidor", loaded_count);
        }

        Ok(())
    }

    fn settings_path(&self, guild_id: u64) -> PathBuf {
        self.data_dir.join("servers").join(format!("guild_{}.json", guild_id))
    }
}

#[async_trait]
impl SettingsStore for JsonStorage {
    async fn guild_settings(&self, guild_id: GuildId) -> Result<GuildSettings> {
        self.get_guild_settings(guild_id.get()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_missing_guild_gets_defaults_written() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().to_path_buf()).await.unwrap();

        let settings = storage.guild_settings(GuildId::new(42)).await.unwrap();
        assert_eq!(settings.guild_id, 42);
        assert_eq!(settings.default_volume, None);
        assert!(dir.path().join("servers/guild_42.json").exists());
    }

    #[tokio::test]
    async fn test_existing_files_are_loaded_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let servers = dir.path().join("servers");
        std::fs::create_dir_all(&servers).unwrap();
        std::fs::write(
            servers.join("guild_7.json"),
            r#"{"guild_id":7,"default_volume":80,"dj_role_id":99}"#,
        )
        .unwrap();

        let storage = JsonStorage::new(dir.path().to_path_buf()).await.unwrap();
        let settings = storage.guild_settings(GuildId::new(7)).await.unwrap();

        assert_eq!(
            settings,
            GuildSettings {
                guild_id: 7,
                default_volume: Some(80),
                inactivity_timeout_secs: None,
                dj_role_id: Some(99),
                autoplay: None,
            }
        );
    }
}
