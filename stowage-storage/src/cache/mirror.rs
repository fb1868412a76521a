//! Detached mirror tasks and the tracker that lets callers wait for them.

use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Counts in-flight detached tasks.
#[derive(Debug, Default)]
pub(crate) struct MirrorTracker {
    pending: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending count when the task ends, panics included.
struct PendingGuard(Arc<MirrorTracker>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl MirrorTracker {
    /// Submit `task` to the runtime without awaiting it.
    pub(crate) fn spawn<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard(Arc::clone(self));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until no task is in flight.
    pub(crate) async fn settled(&self) {
        loop {
            let mut notified = pin!(self.idle.notified());
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn test_settled_without_tasks_returns() {
        let tracker = Arc::new(MirrorTracker::default());
        tracker.settled().await;
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test]
    async fn test_settled_waits_for_tasks() {
        let tracker = Arc::new(MirrorTracker::default());
        let done = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&done);
        tracker.spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        });

        tracker.settled().await;
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_still_settles() {
        let tracker = Arc::new(MirrorTracker::default());
        tracker.spawn(async { panic!("mirror task blew up") });
        tracker.settled().await;
        assert_eq!(tracker.pending(), 0);
    }
}
