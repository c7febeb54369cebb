use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod audio;
mod bot;
mod cache;
mod config;
mod session;
mod sources;
mod storage;
mod ui;

use crate::audio::songbird_backend::SongbirdBackend;
use crate::bot::{gateway::SerenityGateway, GuildPlayerBot};
use crate::cache::ResolutionCache;
use crate::config::Config;
use crate::session::{Collaborators, InactivitySweeper, SessionRegistry};
use crate::sources::{CachedCatalog, YtDlpCatalog};
use crate::storage::JsonStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_player=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Player v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    info!("{}", config.summary());

    // Ajustes por servidor
    let storage = Arc::new(JsonStorage::new(config.data_dir.clone()).await?);

    // Catálogo de yt-dlp con caché de resoluciones
    let cache = ResolutionCache::new(config.cache_size, config.cache_ttl);
    let ytdlp = Arc::new(YtDlpCatalog::new(config.max_playlist_size));
    let catalog = Arc::new(CachedCatalog::new(ytdlp.clone(), cache.clone()));

    // Backend de audio: los callbacks del driver llegan por este canal
    let songbird = Songbird::serenity();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let backend = Arc::new(SongbirdBackend::new(songbird.clone(), events_tx));

    // Intents mínimos: servidores y estados de voz
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let handler = GuildPlayerBot::new(config.clone(), cache, ytdlp);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird.clone())
        .await?;

    let gateway = Arc::new(SerenityGateway::new(
        client.http.clone(),
        client.cache.clone(),
        songbird,
    ));

    let registry = SessionRegistry::new(Collaborators {
        config: config.clone(),
        catalog,
        backend,
        gateway,
        settings: storage,
    });

    {
        let mut data = client.data.write().await;
        data.insert::<SessionRegistry>(registry.clone());
    }

    registry.spawn_event_pump(events_rx);

    let shutdown = CancellationToken::new();
    InactivitySweeper::new(registry, config.sweep_interval, shutdown.clone()).spawn();

    // Manejar shutdown graceful
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shutdown.cancel();
        std::process::exit(0);
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    // Verificar dependencias críticas
    let yt_dlp = async_process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await?;

    let ffmpeg = async_process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await?;

    if yt_dlp.status.success() && ffmpeg.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}
