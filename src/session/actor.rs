use serenity::model::id::GuildId;
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};
use tracing::{debug, info};

use crate::session::{
    command::{Caller, Command, CommandOutcome, SessionEvent},
    error::{SessionError, SessionResult},
    reconciler::Reconciler,
    registry::SessionRegistry,
};

/// Mensajes del buzón de una sesión. Se procesan de a uno, en orden.
#[derive(Debug)]
pub enum SessionMessage {
    Command {
        caller: Caller,
        command: Command,
        reply: oneshot::Sender<SessionResult<CommandOutcome>>,
    },
    Event(SessionEvent),
    /// Pregunta del barrido de inactividad; responde `true` si la sesión se cerró
    Sweep {
        now: Instant,
        reply: oneshot::Sender<bool>,
    },
}

impl SessionMessage {
    /// Solo `play` puede crear una sesión nueva.
    pub fn creates_session(&self) -> bool {
        matches!(
            self,
            SessionMessage::Command {
                command: Command::Play { .. },
                ..
            }
        )
    }

    /// Responde a un mensaje que no tiene sesión que lo atienda.
    pub fn reject(self) {
        match self {
            SessionMessage::Command { reply, .. } => {
                let _ = reply.send(Err(SessionError::NotConnected));
            }
            SessionMessage::Sweep { reply, .. } => {
                let _ = reply.send(false);
            }
            SessionMessage::Event(event) => {
                debug!("Evento {:?} descartado: sin sesión", event);
            }
        }
    }
}

pub type SessionSender = mpsc::UnboundedSender<SessionMessage>;
pub type SessionReceiver = mpsc::UnboundedReceiver<SessionMessage>;

/// Contexto de ejecución de una sesión: una tarea que drena su buzón.
pub struct SessionActor {
    id: u64,
    reconciler: Reconciler,
    inbox: SessionReceiver,
    registry: SessionRegistry,
}

impl SessionActor {
    pub fn new(id: u64, reconciler: Reconciler, inbox: SessionReceiver, registry: SessionRegistry) -> Self {
        Self {
            id,
            reconciler,
            inbox,
            registry,
        }
    }

    pub async fn run(mut self) {
        let guild_id = self.reconciler.guild_id();
        debug!("Actor {} iniciado para guild {}", self.id, guild_id);

        while let Some(message) = self.inbox.recv().await {
            self.handle(message).await;

            if let Some(session) = self.reconciler.session() {
                debug_assert!(session.is_consistent(), "estado inconsistente en {}", guild_id);
            } else {
                break;
            }
        }

        self.shutdown(guild_id).await;
    }

    async fn handle(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Command {
                caller,
                command,
                reply,
            } => {
                let result = self.reconciler.handle_command(caller, command).await;
                self.deregister_if_closed();
                if reply.send(result).is_err() {
                    debug!("Quien envió el comando ya no espera respuesta");
                }
            }
            SessionMessage::Event(event) => {
                self.reconciler.handle_event(event).await;
                self.deregister_if_closed();
            }
            SessionMessage::Sweep { now, reply } => {
                let evicted = self.reconciler.sweep(now).await;
                self.deregister_if_closed();
                let _ = reply.send(evicted);
            }
        }
    }

    // Antes de responder, para que quien espere la respuesta ya no vea la sesión
    fn deregister_if_closed(&self) {
        if !self.reconciler.is_alive() {
            self.registry.deregister(self.reconciler.guild_id(), self.id);
        }
    }

    /// Se da de baja del registro y reenvía lo que quedó en el buzón, para
    /// que un `play` pendiente cree una sesión nueva.
    async fn shutdown(mut self, guild_id: GuildId) {
        self.registry.deregister(guild_id, self.id);
        self.inbox.close();

        let mut rerouted = 0;
        while let Some(message) = self.inbox.recv().await {
            self.registry.route(guild_id, message);
            rerouted += 1;
        }

        if rerouted > 0 {
            debug!("{} mensajes reenviados tras cerrar guild {}", rerouted, guild_id);
        }
        info!("🧹 Actor {} de guild {} finalizado", self.id, guild_id);
    }
}
