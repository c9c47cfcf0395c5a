//! Background task that flushes the request profiler on a fixed interval.
//!
//! The task is started once the server is up and stopped during shutdown.
//! Stopping flushes one last time so the tail of the final interval is logged.

use moonlight_core::Profiler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct ProfilerTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProfilerTask {
    /// Spawns the flush loop on the current runtime.
    pub fn start(profiler: Arc<Profiler>, every: Duration) -> Self {
        let (stop, mut stopped) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        profiler.flush();
                    }
                    _ = &mut stopped => {
                        profiler.flush();
                        break;
                    }
                }
            }
            tracing::debug!("profiler task stopped");
        });
        tracing::info!("profiling summaries every {}s", every.as_secs());
        Self { stop, handle }
    }

    /// Signals the loop to stop and waits for its final flush.
    pub async fn stop(self) {
        // The receiver only disappears if the task already ended.
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            tracing::error!("profiler task ended abnormally: {e}");
        }
    }
}
