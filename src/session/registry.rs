use dashmap::DashMap;
use futures::future::join_all;
use serenity::model::id::GuildId;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info};

use crate::{
    audio::backend::BackendEventReceiver,
    session::{
        actor::{SessionActor, SessionMessage, SessionSender},
        command::{Caller, Command, CommandOutcome, SessionEvent},
        error::{SessionError, SessionResult},
        reconciler::{Collaborators, Reconciler},
    },
};

#[derive(Clone)]
struct SessionHandle {
    id: u64,
    tx: SessionSender,
}

struct RegistryInner {
    sessions: DashMap<GuildId, SessionHandle>,
    next_id: AtomicU64,
    deps: Collaborators,
}

/// Mapa concurrente guild → sesión.
///
/// Cada sesión vive en su propia tarea; el registro solo guarda el extremo
/// emisor de su buzón. Una sesión existe solo mientras el bot está conectado
/// en ese servidor.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(deps: Collaborators) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: DashMap::new(),
                next_id: AtomicU64::new(1),
                deps,
            }),
        }
    }

    /// Envía un comando a la sesión del servidor y espera el resultado.
    pub async fn execute(
        &self,
        guild_id: GuildId,
        caller: Caller,
        command: Command,
    ) -> SessionResult<CommandOutcome> {
        let (reply, response) = oneshot::channel();
        self.route(
            guild_id,
            SessionMessage::Command {
                caller,
                command,
                reply,
            },
        );
        response.await.unwrap_or(Err(SessionError::SessionClosed))
    }

    /// Entrega un evento externo; se descarta si el servidor no tiene sesión.
    pub fn deliver(&self, guild_id: GuildId, event: SessionEvent) {
        self.route(guild_id, SessionMessage::Event(event));
    }

    /// Pide a cada sesión que evalúe su inactividad. Devuelve cuántas se cerraron.
    pub async fn sweep(&self, now: Instant) -> usize {
        let guilds: Vec<GuildId> = self.inner.sessions.iter().map(|e| *e.key()).collect();

        let replies = guilds.into_iter().map(|guild_id| {
            let (reply, response) = oneshot::channel();
            self.route(guild_id, SessionMessage::Sweep { now, reply });
            response
        });

        join_all(replies)
            .await
            .into_iter()
            .filter(|evicted| matches!(evicted, Ok(true)))
            .count()
    }

    /// Reenvía los callbacks del backend a las sesiones correspondientes.
    pub fn spawn_event_pump(&self, mut events: BackendEventReceiver) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let (guild_id, event) = SessionEvent::from_backend(event);
                registry.deliver(guild_id, event);
            }
            debug!("Canal de eventos del backend cerrado");
        })
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.inner.sessions.contains_key(&guild_id)
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    /// Encamina un mensaje al buzón del servidor.
    ///
    /// Un `play` crea la sesión si no existe. Si el buzón ya está cerrado se
    /// quita la entrada obsoleta y se reintenta una vez.
    pub(crate) fn route(&self, guild_id: GuildId, message: SessionMessage) {
        let mut message = message;

        for _ in 0..2 {
            let tx = if message.creates_session() {
                self.inner
                    .sessions
                    .entry(guild_id)
                    .or_insert_with(|| self.spawn_actor(guild_id))
                    .tx
                    .clone()
            } else {
                match self.inner.sessions.get(&guild_id) {
                    Some(handle) => handle.tx.clone(),
                    None => {
                        message.reject();
                        return;
                    }
                }
            };

            match tx.send(message) {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    debug!("Buzón cerrado para guild {}, reintentando", guild_id);
                    self.inner
                        .sessions
                        .remove_if(&guild_id, |_, handle| handle.tx.same_channel(&tx));
                    message = returned;
                }
            }
        }

        message.reject();
    }

    /// Quita la entrada del servidor solo si sigue apuntando al actor `id`.
    pub(crate) fn deregister(&self, guild_id: GuildId, id: u64) {
        if self
            .inner
            .sessions
            .remove_if(&guild_id, |_, handle| handle.id == id)
            .is_some()
        {
            debug!("Sesión {} de guild {} dada de baja", id, guild_id);
        }
    }

    fn spawn_actor(&self, guild_id: GuildId) -> SessionHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let reconciler = Reconciler::new(guild_id, self.inner.deps.clone());
        let actor = SessionActor::new(id, reconciler, rx, self.clone());
        tokio::spawn(actor.run());

        info!("🆕 Actor de sesión {} para guild {}", id, guild_id);
        SessionHandle { id, tx }
    }
}
