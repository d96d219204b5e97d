//! Periodic driver of the three recorder cycles

use crate::recorder::Recorder;
use pmoprogram::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Periods and ondemand admission limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub refresh_interval: Duration,
    pub ondemand_interval: Duration,
    pub broadcast_interval: Duration,
    pub ondemand_batch_size: usize,
    pub ondemand_stagger: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(3600),
            ondemand_interval: Duration::from_secs(600),
            broadcast_interval: Duration::from_secs(60),
            ondemand_batch_size: 2,
            ondemand_stagger: Duration::from_secs(30),
        }
    }
}

/// Running refresh, ondemand and broadcast loops
///
/// Each loop ticks immediately, then once per period. Cancelling the token
/// stops new cycles; recordings already launched keep running until
/// [`Recorder::wait_recordings`] sees them finish.
#[derive(Debug)]
pub struct Scheduler {
    token: CancellationToken,
    loops: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(
        recorder: Arc<Recorder>,
        settings: SchedulerSettings,
        token: CancellationToken,
    ) -> Self {
        info!(?settings, "starting scheduler");

        let refresh = {
            let recorder = Arc::clone(&recorder);
            spawn_cycle("refresh", settings.refresh_interval, token.clone(), move || {
                let recorder = Arc::clone(&recorder);
                async move { recorder.refresh().await.map(|_| ()) }
            })
        };

        let ondemand = {
            let recorder = Arc::clone(&recorder);
            let batch_size = settings.ondemand_batch_size;
            let stagger = settings.ondemand_stagger;
            spawn_cycle("ondemand", settings.ondemand_interval, token.clone(), move || {
                let recorder = Arc::clone(&recorder);
                async move {
                    let tasks = recorder.prepare_ondemand(batch_size, stagger).await?;
                    if !tasks.is_empty() {
                        info!(launched = tasks.len(), "ondemand recordings launched");
                    }
                    Ok::<(), Error>(())
                }
            })
        };

        let broadcast = spawn_cycle(
            "broadcast",
            settings.broadcast_interval,
            token.clone(),
            move || {
                let recorder = Arc::clone(&recorder);
                async move {
                    let tasks = recorder.prepare_broadcast().await?;
                    if !tasks.is_empty() {
                        info!(launched = tasks.len(), "broadcast recordings launched");
                    }
                    Ok::<(), Error>(())
                }
            },
        );

        Self {
            token,
            loops: vec![refresh, ondemand, broadcast],
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Stop scheduling new cycles
    pub fn stop(&self) {
        info!("stopping scheduler");
        self.token.cancel();
    }

    /// Wait until every loop has exited
    pub async fn wait(self) {
        for handle in self.loops {
            if let Err(err) = handle.await {
                warn!("scheduler loop join error: {err}");
            }
        }
        info!("scheduler stopped");
    }
}

fn spawn_cycle<F, Fut>(
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    mut cycle: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        // tokio intervals reject a zero period
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = cycle().await {
                        error!(cycle = name, "cycle failed: {err}");
                    }
                }
            }
        }

        info!(cycle = name, "loop stopped");
    })
}
