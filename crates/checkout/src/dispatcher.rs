//! Interval-driven delivery of queued notifications.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::notifier::{NotificationTask, Notifier};
use crate::queue::WorkQueue;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The queue was drained.
    Drained { delivered: usize, failed: usize },
    /// Another tick was still running.
    Skipped,
}

struct DispatcherInner {
    queue: WorkQueue<NotificationTask>,
    notifier: Arc<dyn Notifier>,
    busy: AtomicBool,
    interval: Duration,
}

/// Drains the notification queue in the background.
///
/// At most one tick drains at a time. A tick that finds another one running
/// returns [`TickOutcome::Skipped`] immediately; the work is picked up by the
/// next tick instead. Failed deliveries are logged and dropped.
#[derive(Clone)]
pub struct NotificationDispatcher {
    inner: Arc<DispatcherInner>,
}

/// Clears the busy flag when a tick ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl NotificationDispatcher {
    pub fn new(
        queue: WorkQueue<NotificationTask>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                queue,
                notifier,
                busy: AtomicBool::new(false),
                interval,
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Delivers every queued task unless a tick is already in progress.
    pub async fn tick(&self) -> TickOutcome {
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("notification tick skipped; previous tick still running");
            return TickOutcome::Skipped;
        }
        let _guard = BusyGuard(&self.inner.busy);

        let mut delivered = 0;
        let mut failed = 0;

        while let Some(task) = self.inner.queue.pop() {
            match self.inner.notifier.deliver(&task).await {
                Ok(()) => {
                    delivered += 1;
                    metrics::counter!("notifications_delivered_total").increment(1);
                }
                Err(e) => {
                    failed += 1;
                    metrics::counter!("notifications_failed_total").increment(1);
                    tracing::warn!(
                        order_id = %task.order_id,
                        error = %e,
                        "notification delivery failed"
                    );
                }
            }
        }

        if delivered + failed > 0 {
            tracing::info!(delivered, failed, "notification queue drained");
        }
        TickOutcome::Drained { delivered, failed }
    }

    /// Ticks on the configured interval until `shutdown` turns true or its
    /// sender is dropped.
    ///
    /// Each tick runs on its own task, so a slow tick does not delay the
    /// timer; ticks that land while it is still running are skipped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.inner.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = self.inner.interval.as_secs(), "notification dispatcher started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let dispatcher = self.clone();
                    tokio::spawn(async move {
                        dispatcher.tick().await;
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("notification dispatcher stopped");
    }
}
