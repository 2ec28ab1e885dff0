// bbox_sync/server/src/server/sync_loop.rs
use super::instance::BoundingBoxServer;
use super::sync_controller::SyncReport;
use crate::operational::monitoring::metrics;

use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Extra time a tick may take before it is reported as slow.
const SLOW_TICK_SLACK: Duration = Duration::from_millis(5);

impl BoundingBoxServer {
    /// Drives event processing and delta delivery at the configured tick
    /// rate until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run_sync_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let tick_duration = self.config.tick_duration();
        let mut tick_timer = interval(tick_duration);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Sync loop started. Tick rate: {}ms", tick_duration.as_millis());

        loop {
            tokio::select! {
                _ = tick_timer.tick() => {
                    self.run_tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Sync loop stopped after {} ticks", self.frame());
    }

    /// One tick: drain a batch of events, then push pending adds.
    pub fn run_tick(&self) -> SyncReport {
        let tick_start = Instant::now();
        let current_frame = self.frame_counter.load(AtomicOrdering::Relaxed);

        let processed = self.process_pending_events();
        let report = self.synchronize_observers();

        let elapsed = tick_start.elapsed();
        metrics::record_tick_time(elapsed.as_secs_f64());
        self.frame_counter.fetch_add(1, AtomicOrdering::Relaxed);

        if processed > 0 || report.adds_sent > 0 {
            debug!(
                "[Tick {}] {} events, {} adds ({} failed)",
                current_frame, processed, report.adds_sent, report.add_failures
            );
        }
        if elapsed > self.config.tick_duration() + SLOW_TICK_SLACK {
            warn!("Tick {} took too long: {:?}", current_frame, elapsed);
        }
        report
    }
}
