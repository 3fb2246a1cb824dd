//! Cancellable one-shot timers.
//!
//! `schedule(delay, action)` returns a handle; dropping the handle does not
//! cancel the timer, calling `cancel()` does. Mute expiry, warning auto-kick,
//! trivia timeout and self-destructing confirmations all run through this
//! instead of fire-and-forget spawns, so the owning component can cancel a
//! pending action when it is superseded.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct TaskHandle {
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Cancel the scheduled action. A no-op if it already fired.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run `action` after `delay` on the current runtime.
pub fn schedule<F>(delay: Duration, action: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        action.await;
    });
    TaskHandle { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scheduled_action_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        schedule(Duration::from_millis(10), async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_prevents_firing() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let handle = schedule(Duration::from_millis(40), async move {
            flag.store(true, Ordering::SeqCst);
        });
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_after_fire_is_noop() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let handle = schedule(Duration::from_millis(5), async move {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(handle.is_finished());

        handle.cancel();
        assert!(fired.load(Ordering::SeqCst));
    }
}
