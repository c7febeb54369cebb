use serenity::model::id::{ChannelId, GuildId, UserId};
use std::collections::HashSet;
use tokio::time::Instant;
use tracing::debug;

use crate::{
    audio::{
        queue::TrackQueue,
        track::{PlaybackId, Track},
    },
    config::{SessionDefaults, MAX_VOLUME},
};

/// Estado observable de la reproducción.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    /// Sesión desmantelada; no acepta más transiciones
    Stopped,
}

/// Cómo clasificar un `trackEnd` recibido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndDisposition {
    /// Corresponde a la reproducción actual
    Current,
    /// Ya se procesó el final de esa reproducción
    Duplicate,
    /// Pertenece a una reproducción anterior; suena otra
    Stale,
    /// No hay nada sonando y la reproducción nunca se dio por terminada
    Orphan,
}

/// Estado de reproducción de un servidor.
///
/// Todas las transiciones pasan por estos métodos, que mantienen juntas las
/// invariantes: `current` vacío si y solo si el estado es `Idle` o `Stopped`,
/// los votos se vacían en cada cambio de track y `last_activity` se actualiza
/// en cada transición.
#[derive(Debug)]
pub struct Session {
    pub guild_id: GuildId,
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
    pub queue: TrackQueue,
    pub volume: u8,
    pub loop_enabled: bool,
    pub autoplay: bool,
    /// Último conteo de oyentes conocido
    pub listeners: usize,
    pub defaults: SessionDefaults,

    current: Option<Track>,
    current_playback: Option<PlaybackId>,
    // Reproducción más reciente dada por terminada; los ids son monótonos
    ended_through: Option<PlaybackId>,
    next_playback: u64,
    skip_votes: HashSet<UserId>,
    waiting_for_listeners: bool,
    last_activity: Instant,
    state: PlaybackState,
    consecutive_failures: u32,
}

impl Session {
    pub fn new(
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        defaults: SessionDefaults,
        now: Instant,
    ) -> Self {
        Self {
            guild_id,
            voice_channel,
            text_channel,
            queue: TrackQueue::new(defaults.max_queue_size),
            volume: defaults.volume.min(MAX_VOLUME),
            loop_enabled: false,
            autoplay: defaults.autoplay,
            listeners: 0,
            defaults,
            current: None,
            current_playback: None,
            ended_through: None,
            next_playback: 1,
            skip_votes: HashSet::new(),
            waiting_for_listeners: false,
            last_activity: now,
            state: PlaybackState::Idle,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn current_playback(&self) -> Option<PlaybackId> {
        self.current_playback
    }

    pub fn waiting_for_listeners(&self) -> bool {
        self.waiting_for_listeners
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn skip_votes(&self) -> usize {
        self.skip_votes.len()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Reserva el id para la próxima reproducción.
    pub fn next_playback_id(&mut self) -> PlaybackId {
        let id = PlaybackId(self.next_playback);
        self.next_playback += 1;
        id
    }

    /// El backend aceptó reproducir `track`; pasa a `Playing`.
    pub fn begin_playback(&mut self, track: Track, playback: PlaybackId, now: Instant) {
        debug_assert!(self.current.is_none(), "begin_playback con un track activo");
        self.current = Some(track);
        self.current_playback = Some(playback);
        self.state = PlaybackState::Playing;
        self.waiting_for_listeners = false;
        self.skip_votes.clear();
        self.touch(now);
    }

    /// Registra un `trackStart`. Devuelve el track si el id es el actual.
    ///
    /// Los votos de skip se descartan en cada inicio de track.
    pub fn mark_started(&mut self, playback: PlaybackId, now: Instant) -> Option<&Track> {
        if self.current_playback != Some(playback) {
            return None;
        }
        self.skip_votes.clear();
        self.touch(now);
        self.current.as_ref()
    }

    pub fn classify_end(&self, playback: PlaybackId) -> EndDisposition {
        if self.current_playback == Some(playback) {
            EndDisposition::Current
        } else if self.ended_through.is_some_and(|ended| playback <= ended) {
            EndDisposition::Duplicate
        } else if self.current.is_some() {
            EndDisposition::Stale
        } else {
            EndDisposition::Orphan
        }
    }

    /// Marca una reproducción como terminada sin tocar lo que esté sonando.
    ///
    /// Se usa cuando el backend rechaza un `play`: cualquier callback tardío
    /// de ese id queda clasificado como duplicado.
    pub fn retire_playback(&mut self, playback: PlaybackId) {
        self.ended_through = Some(self.ended_through.map_or(playback, |e| e.max(playback)));
        self.next_playback = self.next_playback.max(playback.0 + 1);
    }

    /// Libera el slot actual y pasa a `Idle`. Devuelve el track que sonaba.
    pub fn finish_current(&mut self, now: Instant) -> Option<Track> {
        if let Some(playback) = self.current_playback.take() {
            self.retire_playback(playback);
        }
        self.skip_votes.clear();
        self.waiting_for_listeners = false;
        if self.state != PlaybackState::Stopped {
            self.state = PlaybackState::Idle;
        }
        self.touch(now);
        self.current.take()
    }

    pub fn pause(&mut self, waiting_for_listeners: bool, now: Instant) {
        debug_assert!(self.current.is_some());
        self.state = PlaybackState::Paused;
        self.waiting_for_listeners = waiting_for_listeners;
        self.touch(now);
    }

    pub fn resume(&mut self, now: Instant) {
        debug_assert!(self.current.is_some());
        self.state = PlaybackState::Playing;
        self.waiting_for_listeners = false;
        self.touch(now);
    }

    /// Vacía cola y track actual; la sesión sigue conectada.
    pub fn stop(&mut self, now: Instant) -> Option<Track> {
        self.queue.clear();
        self.finish_current(now)
    }

    /// Estado terminal antes de destruir la sesión.
    pub fn teardown(&mut self, now: Instant) {
        self.stop(now);
        self.state = PlaybackState::Stopped;
    }

    /// Registra el voto de `user` y devuelve el total.
    pub fn add_vote(&mut self, user: UserId) -> usize {
        self.skip_votes.insert(user);
        self.skip_votes.len()
    }

    /// Mayoría estricta de los oyentes.
    pub fn required_votes(listeners: usize) -> usize {
        listeners / 2 + 1
    }

    pub fn set_volume(&mut self, level: i64, now: Instant) -> u8 {
        self.volume = level.clamp(0, i64::from(MAX_VOLUME)) as u8;
        self.touch(now);
        self.volume
    }

    /// Suma un fallo del backend y devuelve el total consecutivo.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    pub fn reset_failures(&mut self) {
        if self.consecutive_failures > 0 {
            debug!("Backend recuperado en guild {}", self.guild_id);
        }
        self.consecutive_failures = 0;
    }

    /// Inactiva, sin cola, sin esperar oyentes y quieta más allá del timeout.
    pub fn is_evictable(&self, now: Instant) -> bool {
        self.state == PlaybackState::Idle
            && self.queue.is_empty()
            && !self.waiting_for_listeners
            && now.saturating_duration_since(self.last_activity) > self.defaults.inactivity_timeout
    }

    /// Comprueba las invariantes de estado.
    pub fn is_consistent(&self) -> bool {
        let slot_matches_state = match self.state {
            PlaybackState::Idle | PlaybackState::Stopped => self.current.is_none(),
            PlaybackState::Playing | PlaybackState::Paused => self.current.is_some(),
        };
        let waiting_only_when_paused =
            !self.waiting_for_listeners || self.state == PlaybackState::Paused;

        slot_matches_state
            && self.current.is_some() == self.current_playback.is_some()
            && waiting_only_when_paused
            && self.volume <= MAX_VOLUME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn session() -> Session {
        Session::new(
            GuildId::new(1),
            ChannelId::new(10),
            ChannelId::new(20),
            SessionDefaults::from(&Config::default()),
            Instant::now(),
        )
    }

    fn track(name: &str) -> Track {
        Track::new(name, name, format!("https://youtu.be/{}", name))
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = session();
        assert_eq!(session.state(), PlaybackState::Idle);
        assert_eq!(session.volume, 50);
        assert!(session.current().is_none());
        assert!(session.is_consistent());
    }

    #[test]
    fn test_begin_and_finish_playback() {
        let mut session = session();
        let now = Instant::now();
        let playback = session.next_playback_id();
        session.add_vote(UserId::new(5));

        session.begin_playback(track("a"), playback, now);
        assert_eq!(session.state(), PlaybackState::Playing);
        assert_eq!(session.skip_votes(), 0);
        assert!(session.is_consistent());

        let finished = session.finish_current(now);
        assert_eq!(finished.map(|t| t.id), Some("a".to_string()));
        assert_eq!(session.state(), PlaybackState::Idle);
        assert!(session.is_consistent());
    }

    #[test]
    fn test_track_start_clears_votes_for_current_playback_only() {
        let mut session = session();
        let now = Instant::now();
        let playback = session.next_playback_id();
        session.begin_playback(track("a"), playback, now);

        session.add_vote(UserId::new(2));
        assert!(session.mark_started(PlaybackId(99), now).is_none());
        assert_eq!(session.skip_votes(), 1);

        assert!(session.mark_started(playback, now).is_some());
        assert_eq!(session.skip_votes(), 0);
    }

    #[test]
    fn test_end_classification() {
        let mut session = session();
        let now = Instant::now();
        let first = session.next_playback_id();
        session.begin_playback(track("a"), first, now);
        assert_eq!(session.classify_end(first), EndDisposition::Current);

        session.finish_current(now);
        assert_eq!(session.classify_end(first), EndDisposition::Duplicate);

        let second = session.next_playback_id();
        session.begin_playback(track("b"), second, now);
        assert_eq!(session.classify_end(PlaybackId(99)), EndDisposition::Stale);

        session.finish_current(now);
        assert_eq!(session.classify_end(PlaybackId(99)), EndDisposition::Orphan);
    }

    #[test]
    fn test_required_votes_is_strict_majority() {
        assert_eq!(Session::required_votes(1), 1);
        assert_eq!(Session::required_votes(2), 2);
        assert_eq!(Session::required_votes(3), 2);
        assert_eq!(Session::required_votes(4), 3);
    }

    #[test]
    fn test_duplicate_votes_count_once() {
        let mut session = session();
        assert_eq!(session.add_vote(UserId::new(1)), 1);
        assert_eq!(session.add_vote(UserId::new(1)), 1);
        assert_eq!(session.add_vote(UserId::new(2)), 2);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut session = session();
        let now = Instant::now();
        assert_eq!(session.set_volume(500, now), 150);
        assert_eq!(session.set_volume(-3, now), 0);
        assert_eq!(session.set_volume(80, now), 80);
    }

    #[test]
    fn test_eviction_requires_idle_empty_and_timeout() {
        let mut session = session();
        let start = session.last_activity();
        let later = start + Duration::from_secs(301);

        assert!(!session.is_evictable(start + Duration::from_secs(10)));
        assert!(session.is_evictable(later));

        session.queue.push_back(track("a"));
        assert!(!session.is_evictable(later));
    }

    #[test]
    fn test_teardown_is_terminal() {
        let mut session = session();
        let now = Instant::now();
        let playback = session.next_playback_id();
        session.begin_playback(track("a"), playback, now);
        session.queue.push_back(track("b"));

        session.teardown(now);
        assert_eq!(session.state(), PlaybackState::Stopped);
        assert!(session.queue.is_empty());
        assert!(session.is_consistent());
    }
}
