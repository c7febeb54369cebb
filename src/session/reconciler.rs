use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        backend::{AudioBackend, TrackEndReason},
        track::{PlaybackId, Track},
    },
    bot::gateway::PlatformGateway,
    config::{Config, SessionDefaults},
    session::{
        autoplay::AutoplayAdvisor,
        command::{
            Caller, Command, CommandOutcome, NowPlaying, Notification, QueueSnapshot, SessionEvent,
        },
        error::{SessionError, SessionResult},
        state::{EndDisposition, PlaybackState, Session},
    },
    sources::TrackCatalog,
    storage::SettingsStore,
};

/// Servicios externos compartidos por todas las sesiones.
#[derive(Clone)]
pub struct Collaborators {
    pub config: Arc<Config>,
    pub catalog: Arc<dyn TrackCatalog>,
    pub backend: Arc<dyn AudioBackend>,
    pub gateway: Arc<dyn PlatformGateway>,
    pub settings: Arc<dyn SettingsStore>,
}

/// Aplica comandos y eventos sobre la sesión de un servidor.
///
/// Cada llamada a un colaborador se completa (o agota su timeout) antes de
/// mutar el estado, así que la sesión nunca queda a mitad de una transición.
pub struct Reconciler {
    guild_id: GuildId,
    deps: Collaborators,
    advisor: AutoplayAdvisor,
    session: Option<Session>,
}

impl Reconciler {
    pub fn new(guild_id: GuildId, deps: Collaborators) -> Self {
        Self {
            guild_id,
            advisor: AutoplayAdvisor::new(deps.catalog.clone()),
            deps,
            session: None,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// `false` cuando no hay sesión (nunca se conectó o ya se destruyó).
    pub fn is_alive(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    // ------------------------------------------------------------------
    // Comandos
    // ------------------------------------------------------------------

    pub async fn handle_command(&mut self, caller: Caller, command: Command) -> SessionResult<CommandOutcome> {
        debug!("⚙️ /{} de {} en guild {}", command.name(), caller.user, self.guild_id);

        if !matches!(command, Command::Play { .. }) {
            let session = self.session.as_ref().ok_or(SessionError::NotConnected)?;
            if !command.is_read_only() {
                Self::check_caller(session, &caller)?;
            }
        }

        match command {
            Command::Play { query } => self.play(caller, &query).await,
            Command::Skip { force } => self.skip(caller.user, force).await,
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await,
            Command::Stop => self.stop().await,
            Command::Disconnect => self.disconnect().await,
            Command::Queue { page } => self.queue_snapshot(page),
            Command::NowPlaying => self.now_playing().await,
            Command::Shuffle => self.shuffle(),
            Command::Volume { level } => self.volume(level).await,
            Command::Loop { enabled } => self.toggle_loop(enabled),
            Command::Autoplay { enabled } => self.toggle_autoplay(enabled),
        }
    }

    fn check_caller(session: &Session, caller: &Caller) -> SessionResult<()> {
        match caller.voice_channel {
            None => Err(SessionError::NotInVoice),
            Some(channel) if channel != session.voice_channel => Err(SessionError::WrongChannel),
            Some(_) => Ok(()),
        }
    }

    async fn play(&mut self, caller: Caller, query: &str) -> SessionResult<CommandOutcome> {
        let voice_channel = caller.voice_channel.ok_or(SessionError::NotInVoice)?;
        if let Some(session) = &self.session {
            if session.voice_channel != voice_channel {
                return Err(SessionError::WrongChannel);
            }
            if session.queue.is_full() {
                return Err(SessionError::QueueFull(session.defaults.max_queue_size));
            }
        }

        let tracks = self.resolve(query, caller.user).await?;

        if self.session.is_none() {
            self.connect(voice_channel, caller.text_channel).await?;
        }

        let now = Instant::now();
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::SessionClosed);
        };
        session.text_channel = caller.text_channel;
        session.touch(now);

        let first = tracks[0].clone();
        let starts_now = session.current().is_none();
        let queued_before = session.queue.len();
        let added = session.queue.extend(tracks);
        if added == 0 {
            return Err(SessionError::QueueFull(session.defaults.max_queue_size));
        }

        if starts_now {
            return match self.advance().await {
                Some(track) => {
                    let queued = self.session.as_ref().map_or(0, |s| s.queue.len());
                    Ok(CommandOutcome::Started { track, queued })
                }
                None => Err(SessionError::BackendUnreachable(
                    "el backend no inició la reproducción".to_string(),
                )),
            };
        }

        let position = queued_before + 1;
        let mut estimated_wait = session.queue.duration_ahead_of(position);
        if let Some(remaining) = self.current_remaining().await {
            estimated_wait += remaining;
        }

        info!("➕ {} agregado en posición {} (guild {})", first.title, position, self.guild_id);
        Ok(CommandOutcome::Queued {
            track: first,
            position,
            estimated_wait,
            added,
        })
    }

    async fn resolve(&self, query: &str, user: UserId) -> SessionResult<Vec<Track>> {
        let catalog_timeout = self.deps.config.catalog_timeout;
        match timeout(catalog_timeout, self.deps.catalog.resolve(query, Some(user))).await {
            Ok(Ok(tracks)) if !tracks.is_empty() => Ok(tracks),
            Ok(Ok(_)) => {
                info!("🔍 Sin resultados para: {}", query);
                Err(SessionError::NoResults)
            }
            Ok(Err(e)) => {
                warn!("Error resolviendo '{}': {:?}", query, e);
                Err(SessionError::NoResults)
            }
            Err(_) => {
                warn!("⏱️ Timeout resolviendo '{}'", query);
                Err(SessionError::NoResults)
            }
        }
    }

    async fn connect(&mut self, voice_channel: ChannelId, text_channel: ChannelId) -> SessionResult<()> {
        let settings = match self.deps.settings.guild_settings(self.guild_id).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Usando configuración global para guild {}: {}", self.guild_id, e);
                Default::default()
            }
        };
        let defaults = SessionDefaults::resolve(&self.deps.config, &settings);

        let join = self.deps.gateway.join(self.guild_id, voice_channel);
        match timeout(self.deps.config.backend_timeout, join).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("❌ Error al unirse al canal de voz: {:?}", e);
                return Err(SessionError::JoinFailed(e.to_string()));
            }
            Err(_) => {
                error!("⏱️ Timeout al unirse al canal de voz {}", voice_channel);
                return Err(SessionError::JoinFailed("timeout".to_string()));
            }
        }

        let mut session = Session::new(
            self.guild_id,
            voice_channel,
            text_channel,
            defaults,
            Instant::now(),
        );
        let count = self.deps.gateway.listener_count(self.guild_id, voice_channel);
        match self.timed(count).await {
            Some(listeners) => session.listeners = listeners,
            None => warn!("⏱️ Timeout contando oyentes en guild {}", self.guild_id),
        }

        info!("🎶 Sesión creada en guild {} (canal {})", self.guild_id, voice_channel);
        self.session = Some(session);
        Ok(())
    }

    async fn skip(&mut self, user: UserId, force: bool) -> SessionResult<CommandOutcome> {
        let Some(session) = self.session.as_ref() else {
            return Err(SessionError::NotConnected);
        };
        let current = session.current().cloned().ok_or(SessionError::NothingPlaying)?;
        let voice_channel = session.voice_channel;
        let dj_role = session.defaults.dj_role;

        let known_listeners = session.listeners;

        // Sin respuesta de la plataforma se asume que no hay permisos
        let gateway = self.deps.gateway.clone();
        let bypass = current.requested_by == Some(user)
            || (force
                && self
                    .timed(gateway.allows_force_skip(self.guild_id, user))
                    .await
                    .unwrap_or(false))
            || self
                .timed(gateway.is_elevated(self.guild_id, user, dj_role))
                .await
                .unwrap_or(false);

        if !bypass {
            let listeners = self
                .timed(gateway.listener_count(self.guild_id, voice_channel))
                .await
                .unwrap_or(known_listeners);
            let Some(session) = self.session.as_mut() else {
                return Err(SessionError::NotConnected);
            };
            session.listeners = listeners;
            let votes = session.add_vote(user);
            let required = Session::required_votes(listeners);
            if votes < required {
                debug!("🗳️ Voto de skip {}/{} en guild {}", votes, required, self.guild_id);
                return Err(SessionError::InsufficientVotes { votes, required });
            }
        }

        let next = self.replace_current().await;
        info!("⏭️ Saltado: {}", current.title);
        Ok(CommandOutcome::Skipped {
            skipped: current,
            next,
        })
    }

    /// Abandona el track actual y pasa al siguiente de la cola, sin loop ni
    /// autoplay. Si la cola está vacía detiene el backend.
    async fn replace_current(&mut self) -> Option<Track> {
        let session = self.session.as_mut()?;
        session.finish_current(Instant::now());

        let next = self.advance().await;
        if next.is_none() {
            let backend = self.deps.backend.clone();
            if !self.backend_call(backend.stop(self.guild_id)).await {
                warn!("No se pudo detener el backend en guild {}", self.guild_id);
            }
        }
        next
    }

    async fn pause(&mut self) -> SessionResult<CommandOutcome> {
        match self.session.as_ref().map(Session::state) {
            Some(PlaybackState::Playing) => {}
            Some(PlaybackState::Paused) => return Err(SessionError::AlreadyPaused),
            _ => return Err(SessionError::NothingPlaying),
        }

        let backend = self.deps.backend.clone();
        if !self.backend_call(backend.pause(self.guild_id)).await {
            return Err(SessionError::BackendUnreachable("pause".to_string()));
        }

        if let Some(session) = self.session.as_mut() {
            session.pause(false, Instant::now());
        }
        info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        Ok(CommandOutcome::Paused)
    }

    async fn resume(&mut self) -> SessionResult<CommandOutcome> {
        match self.session.as_ref().map(Session::state) {
            Some(PlaybackState::Paused) => {}
            Some(PlaybackState::Playing) => return Err(SessionError::AlreadyPlaying),
            _ => return Err(SessionError::NothingPlaying),
        }

        let backend = self.deps.backend.clone();
        if !self.backend_call(backend.resume(self.guild_id)).await {
            return Err(SessionError::BackendUnreachable("resume".to_string()));
        }

        if let Some(session) = self.session.as_mut() {
            session.resume(Instant::now());
        }
        info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
        Ok(CommandOutcome::Resumed)
    }

    /// Vacía cola y track actual. El estado local se limpia aunque el backend
    /// no confirme; un `trackEnd` tardío queda marcado como duplicado.
    async fn stop(&mut self) -> SessionResult<CommandOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::NotConnected);
        };
        let had_current = session.current().is_some();
        session.stop(Instant::now());

        if had_current {
            let backend = self.deps.backend.clone();
            if !self.backend_call(backend.stop(self.guild_id)).await {
                warn!("Backend no confirmó stop en guild {}", self.guild_id);
            }
        }

        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
        Ok(CommandOutcome::Stopped)
    }

    async fn disconnect(&mut self) -> SessionResult<CommandOutcome> {
        self.stop().await?;
        self.teardown(true).await;
        Ok(CommandOutcome::Disconnected)
    }

    fn queue_snapshot(&self, page: usize) -> SessionResult<CommandOutcome> {
        let session = self.session.as_ref().ok_or(SessionError::NotConnected)?;
        Ok(CommandOutcome::Queue(QueueSnapshot {
            current: session.current().cloned(),
            page: session.queue.page(page),
            loop_enabled: session.loop_enabled,
            autoplay: session.autoplay,
        }))
    }

    async fn now_playing(&self) -> SessionResult<CommandOutcome> {
        let Some(session) = self.session.as_ref() else {
            return Err(SessionError::NotConnected);
        };
        let Some(track) = session.current().cloned() else {
            return Ok(CommandOutcome::Current(None));
        };

        let paused = session.state() == PlaybackState::Paused;
        let waiting_for_listeners = session.waiting_for_listeners();
        let position = self.timed(self.deps.backend.position(self.guild_id)).await.flatten();

        Ok(CommandOutcome::Current(Some(NowPlaying {
            track,
            position,
            paused,
            waiting_for_listeners,
        })))
    }

    fn shuffle(&mut self) -> SessionResult<CommandOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::NotConnected);
        };
        if session.queue.len() < 2 {
            return Err(SessionError::EmptyQueue);
        }
        session.queue.shuffle();
        session.touch(Instant::now());
        Ok(CommandOutcome::Shuffled {
            tracks: session.queue.len(),
        })
    }

    /// Siempre responde con el volumen ajustado; si el backend falla el
    /// valor queda guardado para la próxima reproducción.
    async fn volume(&mut self, level: i64) -> SessionResult<CommandOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::NotConnected);
        };
        let level = session.set_volume(level, Instant::now());
        let playing = session.current().is_some();

        if playing {
            let backend = self.deps.backend.clone();
            if !self.backend_call(backend.set_volume(self.guild_id, level)).await {
                warn!("🔊 Volumen {} guardado pero no aplicado en guild {}", level, self.guild_id);
            }
        }

        Ok(CommandOutcome::Volume { level })
    }

    fn toggle_loop(&mut self, enabled: Option<bool>) -> SessionResult<CommandOutcome> {
        let session = self.session.as_mut().ok_or(SessionError::NotConnected)?;
        session.loop_enabled = enabled.unwrap_or(!session.loop_enabled);
        session.touch(Instant::now());
        info!("🔁 Loop {} en guild {}", session.loop_enabled, self.guild_id);
        Ok(CommandOutcome::Loop {
            enabled: session.loop_enabled,
        })
    }

    fn toggle_autoplay(&mut self, enabled: Option<bool>) -> SessionResult<CommandOutcome> {
        let session = self.session.as_mut().ok_or(SessionError::NotConnected)?;
        session.autoplay = enabled.unwrap_or(!session.autoplay);
        session.touch(Instant::now());
        info!("🎲 Autoplay {} en guild {}", session.autoplay, self.guild_id);
        Ok(CommandOutcome::Autoplay {
            enabled: session.autoplay,
        })
    }

    // ------------------------------------------------------------------
    // Eventos
    // ------------------------------------------------------------------

    pub async fn handle_event(&mut self, event: SessionEvent) {
        if self.session.is_none() {
            debug!("Evento {:?} sin sesión en guild {}", event, self.guild_id);
            return;
        }

        match event {
            SessionEvent::TrackStart { playback } => self.on_track_start(playback).await,
            SessionEvent::TrackEnd { playback, reason } => self.on_track_end(playback, reason).await,
            SessionEvent::NodeReady => {
                if let Some(session) = self.session.as_mut() {
                    session.reset_failures();
                }
            }
            SessionEvent::NodeClosed => self.on_node_closed().await,
            SessionEvent::Occupancy { listeners } => self.on_occupancy(listeners).await,
            SessionEvent::BotDisconnected => {
                info!("🔌 Bot desconectado externamente de guild {}", self.guild_id);
                self.teardown(false).await;
            }
        }
    }

    async fn on_track_start(&mut self, playback: PlaybackId) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(track) = session.mark_started(playback, Instant::now()).cloned() else {
            debug!("trackStart obsoleto {} en guild {}", playback, self.guild_id);
            return;
        };

        info!("🎵 Reproduciendo: {} ({})", track.title, playback);
        self.notify(Notification::NowPlaying { track }).await;
    }

    async fn on_track_end(&mut self, playback: PlaybackId, reason: TrackEndReason) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.classify_end(playback) {
            EndDisposition::Duplicate | EndDisposition::Stale => {
                debug!("trackEnd ignorado {} ({:?}) en guild {}", playback, reason, self.guild_id);
                return;
            }
            EndDisposition::Current | EndDisposition::Orphan => {}
        }

        session.retire_playback(playback);
        let finished = session.finish_current(Instant::now());

        if reason == TrackEndReason::Error {
            if let Some(track) = &finished {
                warn!("⚠️ Error reproduciendo {}, saltando", track.title);
                let failed = Notification::TrackFailed {
                    track: track.clone(),
                };
                self.notify(failed).await;
            }
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if reason == TrackEndReason::Finished && session.loop_enabled {
            if let Some(track) = &finished {
                session.queue.requeue(track.clone());
            }
        }
        let autoplay = session.autoplay && reason.may_advance_naturally();

        if self.advance().await.is_some() {
            return;
        }

        let threshold = self.deps.config.backend_failure_threshold;
        let backend_healthy = self
            .session
            .as_ref()
            .is_some_and(|s| s.consecutive_failures() < threshold);
        if let (true, true, Some(track)) = (autoplay, backend_healthy, finished) {
            self.autoplay_after(&track).await;
        }
    }

    async fn autoplay_after(&mut self, finished: &Track) {
        let suggestion = timeout(self.deps.config.autoplay_timeout, self.advisor.related(finished)).await;
        let related = match suggestion {
            Ok(Some(track)) => track,
            Ok(None) => {
                debug!("Autoplay sin sugerencias para {}", finished.title);
                return;
            }
            Err(_) => {
                warn!("⏱️ Timeout de autoplay en guild {}", self.guild_id);
                return;
            }
        };

        let Some(session) = self.session.as_mut() else {
            return;
        };
        // La sesión pudo reanudarse mientras se buscaba
        if session.current().is_some() {
            return;
        }

        info!("🎲 Autoplay: {}", related.title);
        if session.queue.push_back(related) {
            self.advance().await;
        }
    }

    async fn on_node_closed(&mut self) {
        warn!("⚠️ Nodo de audio cerrado en guild {}", self.guild_id);
        let playback = match self.session.as_ref() {
            Some(session) => session.current_playback(),
            None => return,
        };
        let Some(playback) = playback else {
            return;
        };

        self.record_backend_failure().await;
        let still_current = self
            .session
            .as_ref()
            .is_some_and(|s| s.current_playback() == Some(playback));
        if still_current {
            self.on_track_end(playback, TrackEndReason::Error).await;
        }
    }

    async fn on_occupancy(&mut self, listeners: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.listeners = listeners;
        let state = session.state();
        let waiting = session.waiting_for_listeners();
        let timeout_value = session.defaults.inactivity_timeout;

        if listeners == 0 && state == PlaybackState::Playing {
            let backend = self.deps.backend.clone();
            if !self.backend_call(backend.pause(self.guild_id)).await {
                return;
            }
            if let Some(session) = self.session.as_mut() {
                session.pause(true, Instant::now());
            }
            info!("⏸️ Canal vacío, pausando en guild {}", self.guild_id);
            self.notify(Notification::ListenersLeft {
                timeout: timeout_value,
            })
            .await;
        } else if listeners > 0 && state == PlaybackState::Paused && waiting {
            let backend = self.deps.backend.clone();
            if !self.backend_call(backend.resume(self.guild_id)).await {
                return;
            }
            if let Some(session) = self.session.as_mut() {
                session.resume(Instant::now());
            }
            info!("▶️ Oyentes de vuelta, reanudando en guild {}", self.guild_id);
            self.notify(Notification::ListenersReturned).await;
        }
    }

    // ------------------------------------------------------------------
    // Barrido de inactividad
    // ------------------------------------------------------------------

    /// Cierra la sesión si está inactiva. Devuelve `true` si fue desalojada.
    pub async fn sweep(&mut self, now: Instant) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        if !session.is_evictable(now) {
            return false;
        }

        let idle_for = now.saturating_duration_since(session.last_activity());
        info!(
            "💤 Desconectando por inactividad de guild {} ({})",
            self.guild_id,
            humantime::format_duration(Duration::from_secs(idle_for.as_secs()))
        );
        self.notify(Notification::InactivityDisconnect { idle_for }).await;
        self.teardown(true).await;
        true
    }

    // ------------------------------------------------------------------
    // Internos
    // ------------------------------------------------------------------

    /// Saca tracks del frente de la cola hasta que uno arranque. Devuelve el
    /// que quedó sonando, o `None` si la cola se agotó.
    async fn advance(&mut self) -> Option<Track> {
        loop {
            let session = self.session.as_mut()?;
            if session.current().is_some() {
                return None;
            }
            let Some(track) = session.queue.pop_front() else {
                session.touch(Instant::now());
                return None;
            };
            let playback = session.next_playback_id();
            let voice_channel = session.voice_channel;
            let volume = session.volume;

            let backend = self.deps.backend.clone();
            let play = backend.play(self.guild_id, voice_channel, &track, playback, volume);
            if self.backend_call(play).await {
                if let Some(session) = self.session.as_mut() {
                    session.begin_playback(track.clone(), playback, Instant::now());
                }
                return Some(track);
            }

            if let Some(session) = self.session.as_mut() {
                session.retire_playback(playback);
            }
            warn!("⚠️ No se pudo iniciar {}, probando el siguiente", track.title);
        }
    }

    /// Tiempo restante del track actual, si el backend lo informa.
    async fn current_remaining(&self) -> Option<Duration> {
        let session = self.session.as_ref()?;
        let duration = session.current()?.known_duration()?;
        let position = self.timed(self.deps.backend.position(self.guild_id)).await.flatten()?;
        Some(duration.saturating_sub(position))
    }

    async fn timed<T>(&self, operation: impl Future<Output = T>) -> Option<T> {
        timeout(self.deps.config.backend_timeout, operation).await.ok()
    }

    /// Ejecuta una llamada al backend con timeout y lleva la cuenta de fallos
    /// consecutivos. Devuelve `true` si tuvo éxito.
    async fn backend_call(&mut self, call: impl Future<Output = anyhow::Result<()>>) -> bool {
        match self.timed(call).await {
            Some(Ok(())) => {
                if let Some(session) = self.session.as_mut() {
                    session.reset_failures();
                }
                true
            }
            Some(Err(e)) => {
                warn!("❌ Backend falló en guild {}: {:?}", self.guild_id, e);
                self.record_backend_failure().await;
                false
            }
            None => {
                warn!("⏱️ Timeout del backend en guild {}", self.guild_id);
                self.record_backend_failure().await;
                false
            }
        }
    }

    async fn record_backend_failure(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let failures = session.record_failure();
        if failures < self.deps.config.backend_failure_threshold {
            return;
        }

        session.stop(Instant::now());
        // Solo se avisa al cruzar el umbral
        if failures == self.deps.config.backend_failure_threshold {
            error!(
                "❌ Backend no disponible en guild {} tras {} fallos, sesión inactiva",
                self.guild_id, failures
            );
            self.notify(Notification::BackendUnavailable).await;
        }
    }

    async fn notify(&self, notification: Notification) {
        let Some(channel) = self.session.as_ref().map(|s| s.text_channel) else {
            return;
        };
        let send = self.deps.gateway.notify(channel, notification);
        if self.timed(send).await.is_none() {
            warn!("⏱️ Timeout enviando notificación a {}", channel);
        }
    }

    /// Destruye la sesión. `leave` indica si hay que salir del canal de voz
    /// (falso cuando la plataforma ya nos desconectó).
    async fn teardown(&mut self, leave: bool) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.teardown(Instant::now());

        if leave {
            let leave = self.deps.gateway.leave(self.guild_id);
            match self.timed(leave).await {
                Some(Ok(())) => {}
                Some(Err(e)) => warn!("Error al salir del canal de voz: {:?}", e),
                None => warn!("⏱️ Timeout al salir del canal de voz en guild {}", self.guild_id),
            }
        }
        self.deps.backend.release(self.guild_id);

        self.session = None;
        info!("🗑️ Sesión destruida en guild {}", self.guild_id);
    }
}
