//! Tokio runtime driving the refresh loop.
//!
//! One frame build runs at a time on a blocking thread. A build that
//! outlives the refresh interval is left to finish, but its frame is dropped
//! and no new build starts until it is done. The one exception is a late
//! frame arriving while nothing has been published yet.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::error::Result;

use super::enrich::ProcessInfoSource;
use super::frame::FrameBuilder;
use super::metrics::Frame;
use super::provider::MetricsProvider;

/// What the renderer sees: the latest complete frame plus loop status.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub frame: Option<Arc<Frame>>,
    /// Error of the most recent failed cycle, cleared by the next success.
    pub last_error: Option<String>,
    pub skipped_cycles: u64,
}

/// Wrapper around the Tokio runtime running the refresh loop.
pub struct MonitorRuntime {
    snapshot_rx: watch::Receiver<Snapshot>,
    shutdown_tx: broadcast::Sender<()>,
    _runtime_handle: tokio::runtime::Runtime,
}

impl MonitorRuntime {
    /// Start refreshing frames every `period`.
    pub fn start<P, S>(builder: FrameBuilder<P, S>, period: Duration) -> anyhow::Result<Self>
    where
        P: MetricsProvider + 'static,
        S: ProcessInfoSource + Send + 'static,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .thread_name("refresh-loop")
            .build()?;

        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        runtime.spawn(refresh_task(
            Arc::new(builder),
            period,
            snapshot_tx,
            shutdown_tx.subscribe(),
        ));

        Ok(Self {
            snapshot_rx,
            shutdown_tx,
            _runtime_handle: runtime,
        })
    }

    /// Latest complete frame, if one has been built yet.
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.snapshot_rx.borrow().frame.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Stop scheduling cycles. Dropping the runtime waits for a build that is
    /// still inside the provider.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn refresh_task<P, S>(
    builder: Arc<FrameBuilder<P, S>>,
    period: Duration,
    snapshot_tx: watch::Sender<Snapshot>,
    mut shutdown: broadcast::Receiver<()>,
) where
    P: MetricsProvider + 'static,
    S: ProcessInfoSource + Send + 'static,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<JoinHandle<Result<Frame>>> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match in_flight.take() {
                    Some(handle) if !handle.is_finished() => {
                        log::debug!("Previous cycle still running, skipping tick");
                        snapshot_tx.send_modify(|s| s.skipped_cycles += 1);
                        in_flight = Some(handle);
                    }
                    overrun => {
                        if let Some(handle) = overrun {
                            let nothing_shown = snapshot_tx.borrow().frame.is_none();
                            if nothing_shown {
                                log::debug!("No frame shown yet, publishing the late one");
                                publish(handle.await, &snapshot_tx);
                            }
                        }
                        in_flight = run_cycle(&builder, period, &snapshot_tx).await;
                    }
                }
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }
}

/// Run one build bounded by `budget`. Returns the handle if it overran.
async fn run_cycle<P, S>(
    builder: &Arc<FrameBuilder<P, S>>,
    budget: Duration,
    snapshot_tx: &watch::Sender<Snapshot>,
) -> Option<JoinHandle<Result<Frame>>>
where
    P: MetricsProvider + 'static,
    S: ProcessInfoSource + Send + 'static,
{
    let cycle_builder = Arc::clone(builder);
    let mut handle = tokio::task::spawn_blocking(move || cycle_builder.build());

    match timeout(budget, &mut handle).await {
        Ok(outcome) => {
            publish(outcome, snapshot_tx);
            None
        }
        Err(_) => {
            log::warn!("Frame build exceeded {:?}, dropping this cycle", budget);
            snapshot_tx.send_modify(|s| s.skipped_cycles += 1);
            Some(handle)
        }
    }
}

fn publish(
    outcome: std::result::Result<Result<Frame>, JoinError>,
    snapshot_tx: &watch::Sender<Snapshot>,
) {
    match outcome {
        Ok(Ok(frame)) => {
            snapshot_tx.send_modify(|s| {
                s.frame = Some(Arc::new(frame));
                s.last_error = None;
            });
        }
        Ok(Err(e)) => {
            log::error!("Frame build failed: {}", e);
            snapshot_tx.send_modify(|s| s.last_error = Some(e.to_string()));
        }
        Err(e) => {
            log::error!("Frame build task failed: {}", e);
            snapshot_tx.send_modify(|s| s.last_error = Some(e.to_string()));
        }
    }
}
