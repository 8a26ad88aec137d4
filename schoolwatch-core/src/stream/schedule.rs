use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A cancellable periodic task.
///
/// The first tick fires one interval after spawning. A tick that is running
/// when the schedule is cancelled completes; no tick starts afterwards.
/// The tick callback returns `false` to end the schedule on its own.
pub struct RefreshSchedule {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
    ticks: Arc<AtomicU64>,
}

impl RefreshSchedule {
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        let token = CancellationToken::new();
        let ticks = Arc::new(AtomicU64::new(0));

        let cancelled = token.clone();
        let counter = Arc::clone(&ticks);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        counter.fetch_add(1, Ordering::SeqCst);
                        if !tick().await {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            token,
            handle: Some(handle),
            interval,
            ticks,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of ticks started so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Request cancellation without waiting for an in-flight tick.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait until the task has exited.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::error!("refresh schedule task failed: {}", e);
            }
        }
    }
}

impl Drop for RefreshSchedule {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
