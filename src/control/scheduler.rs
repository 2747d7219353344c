use super::autopilot::Autopilot;
use crate::{error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Drives the control cycle at a fixed interval.
///
/// Ticks are non-reentrant by construction: each cycle runs on a spawned
/// task whose handle is awaited before the next interval fires, so the
/// trim vector and mode registry are only ever touched by one cycle at a
/// time. A panicking law surfaces as a join error, is logged, and the
/// loop schedules the next tick anyway; an autopilot that stops ticking
/// is worse than one that logs and retries.
pub struct Scheduler;

impl Scheduler {
    /// Spawns the scheduling loop for the given autopilot.
    pub fn spawn(ap: Arc<RwLock<Autopilot>>) -> JoinHandle<()> {
        tokio::spawn(async move { Self::run(ap).await })
    }

    async fn run(ap: Arc<RwLock<Autopilot>>) {
        let (period, stale_factor, cancel) = {
            let this = ap.read().await;
            let scheduler = &this.scheduler_config().scheduler;
            (
                Duration::from_millis(scheduler.tick_interval_ms),
                scheduler.stale_tick_factor,
                this.cancel_token(),
            )
        };
        info!("Control loop started at {}ms", period.as_millis());

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Control loop stopped");
                    return;
                }
                _ = interval.tick() => {}
            }

            // A cycle arriving far too late (OS suspend, debugger) must
            // not apply a huge corrective step.
            let elapsed = last_tick.elapsed();
            last_tick = Instant::now();
            let stale = elapsed > period * stale_factor;
            if stale {
                warn!("Discarding stale cycle, {}ms since the last tick", elapsed.as_millis());
            }

            let ap_tick = Arc::clone(&ap);
            let handle = tokio::spawn(async move {
                ap_tick.write().await.tick(stale).await;
            });
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!("Control cycle panicked: {err}");
                }
            }
        }
    }
}
