use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    events::CoreEvent,
    input::YoutubeDl,
    tracks::{PlayMode, Track as SongbirdTrack, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use crate::audio::{
    backend::{AudioBackend, BackendEvent, BackendEventSender, TrackEndReason},
    track::{PlaybackId, Track},
};

/// Reproducción activa en un guild
struct ActivePlayback {
    playback: PlaybackId,
    handle: TrackHandle,
}

/// Backend de audio sobre el driver de songbird.
///
/// Cada reproducción registra handlers de songbird que reenvían el inicio y
/// el final del track como [`BackendEvent`]s por un canal, en lugar de mutar
/// la sesión desde el hilo del driver.
pub struct SongbirdBackend {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    active: Arc<DashMap<GuildId, ActivePlayback>>,
    driver_hooks: DashSet<GuildId>,
    events: BackendEventSender,
}

impl SongbirdBackend {
    pub fn new(manager: Arc<Songbird>, events: BackendEventSender) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            active: Arc::new(DashMap::new()),
            driver_hooks: DashSet::new(),
            events,
        }
    }

    fn handle(&self, guild_id: GuildId) -> Result<TrackHandle> {
        self.active
            .get(&guild_id)
            .map(|a| a.handle.clone())
            .ok_or_else(|| anyhow::anyhow!("No hay reproducción activa en guild {}", guild_id))
    }

    /// Registra los eventos del driver una vez por conexión.
    fn hook_driver(&self, guild_id: GuildId, call: &mut songbird::Call) {
        if !self.driver_hooks.insert(guild_id) {
            return;
        }

        call.add_global_event(
            Event::Core(CoreEvent::DriverConnect),
            DriverStateForwarder {
                guild_id,
                connected: true,
                events: self.events.clone(),
            },
        );
        call.add_global_event(
            Event::Core(CoreEvent::DriverReconnect),
            DriverStateForwarder {
                guild_id,
                connected: true,
                events: self.events.clone(),
            },
        );
        call.add_global_event(
            Event::Core(CoreEvent::DriverDisconnect),
            DriverStateForwarder {
                guild_id,
                connected: false,
                events: self.events.clone(),
            },
        );
    }
}

#[async_trait]
impl AudioBackend for SongbirdBackend {
    async fn play(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        track: &Track,
        playback: PlaybackId,
        volume: u8,
    ) -> Result<()> {
        let call = self
            .manager
            .get(guild_id)
            .with_context(|| format!("Sin conexión de voz en guild {} (canal {})", guild_id, channel_id))?;

        let input = YoutubeDl::new(self.http.clone(), track.id.clone());
        let handle = {
            let mut handler = call.lock().await;
            self.hook_driver(guild_id, &mut handler);
            handler.play(SongbirdTrack::from(input).volume(volume as f32 / 100.0))
        };

        for (event, kind) in TRACK_FORWARDERS {
            handle
                .add_event(
                    Event::Track(event),
                    PlaybackForwarder {
                        guild_id,
                        playback,
                        kind,
                        active: self.active.clone(),
                        events: self.events.clone(),
                    },
                )
                .map_err(|e| anyhow::anyhow!("Error al agregar event handler: {}", e))?;
        }

        // La reproducción anterior pasa a estar reemplazada antes de detenerla
        if let Some(previous) = self.active.insert(guild_id, ActivePlayback { playback, handle }) {
            let _ = previous.handle.stop();
        }

        info!("🎵 Reproduciendo {} ({}) en guild {}", track.title, playback, guild_id);
        Ok(())
    }

    async fn pause(&self, guild_id: GuildId) -> Result<()> {
        self.handle(guild_id)?
            .pause()
            .context("Error al pausar")?;
        info!("⏸️ Reproducción pausada en guild {}", guild_id);
        Ok(())
    }

    async fn resume(&self, guild_id: GuildId) -> Result<()> {
        self.handle(guild_id)?
            .play()
            .context("Error al reanudar")?;
        info!("▶️ Reproducción reanudada en guild {}", guild_id);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<()> {
        if let Some((_, active)) = self.active.remove(&guild_id) {
            active.handle.stop().context("Error al detener")?;
        }
        info!("⏹️ Reproducción detenida en guild {}", guild_id);
        Ok(())
    }

    async fn set_volume(&self, guild_id: GuildId, level: u8) -> Result<()> {
        // Sin track activo el volumen se aplica en el próximo play
        if let Some(active) = self.active.get(&guild_id) {
            active
                .handle
                .set_volume(level as f32 / 100.0)
                .context("Error al cambiar volumen")?;
        }
        info!("🔊 Volumen ajustado a {}% en guild {}", level, guild_id);
        Ok(())
    }

    async fn position(&self, guild_id: GuildId) -> Option<Duration> {
        let handle = self.handle(guild_id).ok()?;
        handle.get_info().await.ok().map(|info| info.position)
    }

    fn release(&self, guild_id: GuildId) {
        if let Some((_, active)) = self.active.remove(&guild_id) {
            let _ = active.handle.stop();
        }
        self.driver_hooks.remove(&guild_id);
        debug!("Estado de backend liberado para guild {}", guild_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForwardKind {
    Start,
    End,
}

/// Eventos de songbird que se reenvían por cada reproducción.
///
/// `Playable` marca el inicio real del track; `Play` solo se dispara al
/// salir de una pausa.
const TRACK_FORWARDERS: [(TrackEvent, ForwardKind); 3] = [
    (TrackEvent::Playable, ForwardKind::Start),
    (TrackEvent::End, ForwardKind::End),
    (TrackEvent::Error, ForwardKind::End),
];

/// Reenvía los eventos de un track de songbird como mensajes
struct PlaybackForwarder {
    guild_id: GuildId,
    playback: PlaybackId,
    kind: ForwardKind,
    active: Arc<DashMap<GuildId, ActivePlayback>>,
    events: BackendEventSender,
}

impl PlaybackForwarder {
    fn end_reason(&self, mode: &PlayMode) -> TrackEndReason {
        let superseded = self
            .active
            .get(&self.guild_id)
            .is_some_and(|a| a.playback != self.playback);

        match mode {
            PlayMode::Errored(e) => {
                warn!("❌ Error en track {} de guild {}: {:?}", self.playback, self.guild_id, e);
                TrackEndReason::Error
            }
            PlayMode::End => TrackEndReason::Finished,
            _ if superseded => TrackEndReason::Replaced,
            _ => TrackEndReason::Stopped,
        }
    }
}

#[async_trait]
impl VoiceEventHandler for PlaybackForwarder {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };

        for (state, _handle) in tracks.iter() {
            let event = match self.kind {
                ForwardKind::Start => BackendEvent::TrackStart {
                    guild_id: self.guild_id,
                    playback: self.playback,
                },
                ForwardKind::End => {
                    let reason = self.end_reason(&state.playing);
                    self.active
                        .remove_if(&self.guild_id, |_, a| a.playback == self.playback);
                    BackendEvent::TrackEnd {
                        guild_id: self.guild_id,
                        playback: self.playback,
                        reason,
                    }
                }
            };

            if self.events.send(event).is_err() {
                error!("Canal de eventos cerrado, descartando evento de guild {}", self.guild_id);
            }
        }

        None
    }
}

/// Reenvía conexiones/desconexiones del driver de voz
struct DriverStateForwarder {
    guild_id: GuildId,
    connected: bool,
    events: BackendEventSender,
}

#[async_trait]
impl VoiceEventHandler for DriverStateForwarder {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let event = if self.connected {
            info!("🔄 Driver de voz listo en guild {}", self.guild_id);
            BackendEvent::NodeReady { guild_id: self.guild_id }
        } else {
            warn!("🔌 Driver de voz desconectado en guild {}", self.guild_id);
            BackendEvent::NodeClosed { guild_id: self.guild_id }
        };

        let _ = self.events.send(event);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_is_forwarded_from_playable_only() {
        let starts: Vec<TrackEvent> = TRACK_FORWARDERS
            .iter()
            .filter(|(_, kind)| *kind == ForwardKind::Start)
            .map(|(event, _)| *event)
            .collect();

        assert_eq!(starts, vec![TrackEvent::Playable]);
        assert!(TRACK_FORWARDERS
            .iter()
            .all(|(event, _)| *event != TrackEvent::Play));
    }

    #[test]
    fn test_end_and_error_both_forward_as_end() {
        for event in [TrackEvent::End, TrackEvent::Error] {
            assert!(TRACK_FORWARDERS.contains(&(event, ForwardKind::End)));
        }
    }
}
