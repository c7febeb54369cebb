//! Colaboradores falsos para probar sesiones sin Discord ni yt-dlp.

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    audio::{
        backend::AudioBackend,
        track::{PlaybackId, Track},
    },
    bot::gateway::PlatformGateway,
    config::Config,
    session::{
        command::{Caller, Command, Notification},
        reconciler::Collaborators,
    },
    sources::TrackCatalog,
    storage::{GuildSettings, SettingsStore},
};

pub const GUILD: GuildId = GuildId::new(1);
pub const VOICE: ChannelId = ChannelId::new(10);
pub const OTHER_VOICE: ChannelId = ChannelId::new(11);
pub const TEXT: ChannelId = ChannelId::new(20);

pub fn caller(user: u64) -> Caller {
    Caller {
        user: UserId::new(user),
        voice_channel: Some(VOICE),
        text_channel: TEXT,
    }
}

pub fn caller_in(user: u64, voice_channel: Option<ChannelId>) -> Caller {
    Caller {
        voice_channel,
        ..caller(user)
    }
}

pub fn track(id: &str, secs: u64) -> Track {
    Track::new(id, format!("Song {}", id), format!("https://youtu.be/{}", id))
        .with_author("Artist")
        .with_duration(Duration::from_secs(secs))
}

pub fn play(query: &str) -> Command {
    Command::Play {
        query: query.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Play {
        track: String,
        playback: PlaybackId,
        volume: u8,
    },
    Pause,
    Resume,
    Stop,
    Volume(u8),
    Release,
}

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<BackendCall>>,
    failing: AtomicBool,
    position: Mutex<Option<Duration>>,
}

impl FakeBackend {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_position(&self, position: Option<Duration>) {
        *self.position.lock() = position;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Ids de track enviados a `play`, en orden.
    pub fn played(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Play { track, .. } => Some(track.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_playback(&self) -> Option<PlaybackId> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            BackendCall::Play { playback, .. } => Some(*playback),
            _ => None,
        })
    }

    fn record(&self, call: BackendCall) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("backend caído");
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn play(
        &self,
        _guild_id: GuildId,
        _channel_id: ChannelId,
        track: &Track,
        playback: PlaybackId,
        volume: u8,
    ) -> Result<()> {
        self.record(BackendCall::Play {
            track: track.id.clone(),
            playback,
            volume,
        })
    }

    async fn pause(&self, _guild_id: GuildId) -> Result<()> {
        self.record(BackendCall::Pause)
    }

    async fn resume(&self, _guild_id: GuildId) -> Result<()> {
        self.record(BackendCall::Resume)
    }

    async fn stop(&self, _guild_id: GuildId) -> Result<()> {
        self.record(BackendCall::Stop)
    }

    async fn set_volume(&self, _guild_id: GuildId, level: u8) -> Result<()> {
        self.record(BackendCall::Volume(level))
    }

    async fn position(&self, _guild_id: GuildId) -> Option<Duration> {
        *self.position.lock()
    }

    fn release(&self, _guild_id: GuildId) {
        self.calls.lock().push(BackendCall::Release);
    }
}

pub struct FakeGateway {
    listeners: AtomicUsize,
    elevated: Mutex<HashSet<UserId>>,
    force_skippers: Mutex<HashSet<UserId>>,
    failing_join: AtomicBool,
    stalled_queries: AtomicBool,
    joins: AtomicUsize,
    leaves: AtomicUsize,
    notifications: Mutex<Vec<Notification>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            listeners: AtomicUsize::new(1),
            elevated: Mutex::new(HashSet::new()),
            force_skippers: Mutex::new(HashSet::new()),
            failing_join: AtomicBool::new(false),
            stalled_queries: AtomicBool::new(false),
            joins: AtomicUsize::new(0),
            leaves: AtomicUsize::new(0),
            notifications: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn set_listeners(&self, listeners: usize) {
        self.listeners.store(listeners, Ordering::SeqCst);
    }

    pub fn elevate(&self, user: u64) {
        self.elevated.lock().insert(UserId::new(user));
    }

    pub fn allow_force_skip(&self, user: u64) {
        self.force_skippers.lock().insert(UserId::new(user));
    }

    pub fn fail_joins(&self) {
        self.failing_join.store(true, Ordering::SeqCst);
    }

    /// Las consultas de oyentes y permisos no responden nunca.
    pub fn stall_queries(&self) {
        self.stalled_queries.store(true, Ordering::SeqCst);
    }

    async fn maybe_stall(&self) {
        if self.stalled_queries.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    pub fn join_count(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn leave_count(&self) -> usize {
        self.leaves.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }
}

#[async_trait]
impl PlatformGateway for FakeGateway {
    async fn join(&self, _guild_id: GuildId, _channel_id: ChannelId) -> Result<()> {
        if self.failing_join.load(Ordering::SeqCst) {
            bail!("sin permisos para conectar");
        }
        self.joins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn leave(&self, _guild_id: GuildId) -> Result<()> {
        self.leaves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn listener_count(&self, _guild_id: GuildId, _channel_id: ChannelId) -> usize {
        self.maybe_stall().await;
        self.listeners.load(Ordering::SeqCst)
    }

    async fn is_elevated(&self, _guild_id: GuildId, user_id: UserId, _dj_role: Option<RoleId>) -> bool {
        self.maybe_stall().await;
        self.elevated.lock().contains(&user_id)
    }

    async fn allows_force_skip(&self, _guild_id: GuildId, user_id: UserId) -> bool {
        self.maybe_stall().await;
        self.force_skippers.lock().contains(&user_id)
    }

    async fn notify(&self, _channel_id: ChannelId, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    resolutions: Mutex<HashMap<String, Vec<Track>>>,
    searches: Mutex<HashMap<String, Vec<Track>>>,
}

#[async_trait]
impl TrackCatalog for FakeCatalog {
    async fn resolve(&self, query: &str, requested_by: Option<UserId>) -> Result<Vec<Track>> {
        let tracks = self.resolutions.lock().get(query).cloned().unwrap_or_default();
        Ok(tracks.into_iter().map(|t| t.requested_by(requested_by)).collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        let tracks = self.searches.lock().get(query).cloned().unwrap_or_default();
        Ok(tracks.into_iter().take(limit).collect())
    }
}

pub struct DefaultSettings;

#[async_trait]
impl SettingsStore for DefaultSettings {
    async fn guild_settings(&self, guild_id: GuildId) -> Result<GuildSettings> {
        Ok(GuildSettings {
            guild_id: guild_id.get(),
            ..GuildSettings::default()
        })
    }
}

/// Colaboradores falsos más la configuración con la que se crean las sesiones.
pub struct Fixture {
    pub config: Config,
    pub backend: Arc<FakeBackend>,
    pub gateway: Arc<FakeGateway>,
    pub catalog: Arc<FakeCatalog>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            config: Config {
                catalog_timeout: Duration::from_secs(1),
                backend_timeout: Duration::from_secs(1),
                autoplay_timeout: Duration::from_secs(1),
                ..Config::default()
            },
            backend: Arc::new(FakeBackend::default()),
            gateway: Arc::new(FakeGateway::default()),
            catalog: Arc::new(FakeCatalog::default()),
        }
    }

    pub fn with_track(self, query: &str, track: Track) -> Self {
        self.with_tracks(query, vec![track])
    }

    pub fn with_tracks(self, query: &str, tracks: Vec<Track>) -> Self {
        self.catalog.resolutions.lock().insert(query.to_string(), tracks);
        self
    }

    pub fn with_search(self, query: &str, tracks: Vec<Track>) -> Self {
        self.catalog.searches.lock().insert(query.to_string(), tracks);
        self
    }

    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.config.inactivity_timeout = timeout;
        self
    }

    pub fn with_autoplay(mut self) -> Self {
        self.config.enable_autoplay = true;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.config.backend_timeout = timeout;
        self
    }

    pub fn with_max_queue(mut self, size: usize) -> Self {
        self.config.max_queue_size = size;
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            config: Arc::new(self.config.clone()),
            catalog: self.catalog.clone(),
            backend: self.backend.clone(),
            gateway: self.gateway.clone(),
            settings: Arc::new(DefaultSettings),
        }
    }
}
