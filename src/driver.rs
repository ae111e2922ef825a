//! Periodic creation and advancement loops.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fleet::Fleet;

/// Drives a [`Fleet`] on two independent timers.
#[derive(Debug)]
pub struct TickDriver {
    fleet: Arc<Fleet>,
    creation_interval: Duration,
    advance_interval: Duration,
}

/// Running loops; dropping this does not stop them, call [`DriverHandle::stop`].
#[derive(Debug)]
pub struct DriverHandle {
    shutdown: CancellationToken,
    creation: JoinHandle<()>,
    advancement: JoinHandle<()>,
}

/// Shortest period a tick loop will run at; zero periods are raised to this.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

impl TickDriver {
    pub fn new(fleet: Arc<Fleet>, creation_interval: Duration, advance_interval: Duration) -> Self {
        Self {
            fleet,
            creation_interval: creation_interval.max(MIN_TICK_PERIOD),
            advance_interval: advance_interval.max(MIN_TICK_PERIOD),
        }
    }

    /// Run one creation tick immediately, then spawn both loops.
    pub fn spawn(self, shutdown: CancellationToken) -> DriverHandle {
        let created = self.fleet.create_missions();
        info!(
            created = created.len(),
            creation_every = ?self.creation_interval,
            advance_every = ?self.advance_interval,
            "tick driver started"
        );

        let creation = {
            let fleet = Arc::clone(&self.fleet);
            spawn_loop("creation", self.creation_interval, shutdown.clone(), move || {
                fleet.create_missions();
            })
        };
        let advancement = {
            let fleet = Arc::clone(&self.fleet);
            spawn_loop("advancement", self.advance_interval, shutdown.clone(), move || {
                fleet.advance();
            })
        };

        DriverHandle {
            shutdown,
            creation,
            advancement,
        }
    }
}

impl DriverHandle {
    /// Signal both loops and wait for them to exit.
    pub async fn stop(self) {
        self.shutdown.cancel();
        join_loop("creation", self.creation).await;
        join_loop("advancement", self.advancement).await;
    }
}

/// Wait for a loop task; returns `false` if it panicked or was aborted.
async fn join_loop(name: &'static str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(err) => {
            warn!(name, error = %err, "tick loop exited abnormally");
            false
        }
    }
}

/// Resolve once `signal` fires or `token` is cancelled, then cancel `token`.
///
/// A signal listener that fails to install is logged and ignored; only the
/// token can end the wait after that.
pub async fn wait_for_shutdown<S>(signal: S, token: CancellationToken)
where
    S: Future<Output = io::Result<()>>,
{
    tokio::select! {
        result = signal => match result {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => {
                warn!(error = %err, "failed to listen for shutdown signal");
                token.cancelled().await;
            }
        },
        _ = token.cancelled() => {}
    }
    token.cancel();
}

fn spawn_loop<F>(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(name, "tick loop stopping");
                    break;
                }
                _ = ticker.tick() => tick(),
            }
        }
    })
}
