use std::time::Duration;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::session::registry::SessionRegistry;

/// Tarea periódica que cierra las sesiones inactivas.
pub struct InactivitySweeper {
    registry: SessionRegistry,
    interval: Duration,
    shutdown: CancellationToken,
}

impl InactivitySweeper {
    pub fn new(registry: SessionRegistry, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            registry,
            interval,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // El primer tick es inmediato
        ticker.tick().await;

        info!(
            "💤 Barrido de inactividad cada {}",
            humantime::format_duration(self.interval)
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Barrido de inactividad detenido");
                    break;
                }
                _ = ticker.tick() => {
                    if self.registry.is_empty() {
                        continue;
                    }
                    let evicted = self.registry.sweep(Instant::now()).await;
                    if evicted > 0 {
                        info!(
                            "🧹 {} sesiones inactivas cerradas ({} activas)",
                            evicted,
                            self.registry.len()
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{command::Command, testing::*};

    #[tokio::test]
    async fn test_sweeper_stops_on_cancel() {
        let fixture = Fixture::new();
        let registry = crate::session::SessionRegistry::new(fixture.collaborators());
        let shutdown = CancellationToken::new();

        let handle = InactivitySweeper::new(registry, Duration::from_millis(10), shutdown.clone()).spawn();
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("el barrido debería terminar")
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_evicts_idle_sessions() {
        let fixture = Fixture::new()
            .with_inactivity_timeout(Duration::from_millis(20))
            .with_track("song", track("a", 180));
        let registry = crate::session::SessionRegistry::new(fixture.collaborators());

        registry.execute(GUILD, caller(1), play("song")).await.unwrap();
        registry.execute(GUILD, caller(1), Command::Stop).await.unwrap();

        let shutdown = CancellationToken::new();
        let handle =
            InactivitySweeper::new(registry.clone(), Duration::from_millis(10), shutdown.clone()).spawn();

        for _ in 0..100 {
            if !registry.contains(GUILD) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.cancel();
        handle.await.unwrap();
        assert!(!registry.contains(GUILD));
        assert_eq!(fixture.gateway.leave_count(), 1);
    }
}
