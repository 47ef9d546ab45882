//! Cancellable one-shot delay backing silence auto endpointing.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Single-shot timer: `arm` starts a countdown that invokes the callback
/// unless `cancel` wins first. Arming while armed replaces the countdown,
/// so no two countdowns coexist.
///
/// `cancel` signals the delivery thread but never joins it: the fire path
/// may be blocked on the same lock the canceller holds. An expiry that
/// raced a cancel can therefore still be delivered afterwards; callers
/// pair the callback with a freshness check (the controller's arm
/// generation) to discard those.
#[derive(Debug)]
pub(crate) struct EndpointTimer {
    cancel: Option<Sender<()>>,
}

impl EndpointTimer {
    pub(crate) fn new() -> Self {
        Self { cancel: None }
    }

    /// Start (or restart) the countdown.
    pub(crate) fn arm<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let (tx, rx) = bounded::<()>(1);
        thread::spawn(move || match rx.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => on_fire(),
            // Cancelled, or the owning timer was dropped.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
        });
        self.cancel = Some(tx);
    }

    /// Idempotent; cancelling an unarmed timer is a no-op. Dropping the
    /// timer cancels the same way, by disconnecting the channel.
    pub(crate) fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.try_send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Instant;

    #[test]
    fn fires_after_the_delay() {
        let (tx, rx) = unbounded();
        let mut timer = EndpointTimer::new();
        let armed_at = Instant::now();
        timer.arm(Duration::from_millis(30), move || {
            let _ = tx.send(armed_at.elapsed());
        });
        let elapsed = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("timer should fire");
        assert!(elapsed >= Duration::from_millis(30));
    }

    #[test]
    fn cancel_prevents_fire() {
        let (tx, rx) = unbounded();
        let mut timer = EndpointTimer::new();
        timer.arm(Duration::from_millis(60), move || {
            let _ = tx.send(());
        });
        timer.cancel();
        assert!(
            rx.recv_timeout(Duration::from_millis(200)).is_err(),
            "cancelled timer must not fire"
        );
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut timer = EndpointTimer::new();
        timer.cancel();
        timer.arm(Duration::from_millis(50), || {});
        timer.cancel();
        timer.cancel();
    }

    #[test]
    fn rearm_replaces_previous_countdown() {
        let (tx, rx) = unbounded();
        let mut timer = EndpointTimer::new();
        let first = tx.clone();
        timer.arm(Duration::from_millis(250), move || {
            let _ = first.send("first");
        });
        timer.arm(Duration::from_millis(20), move || {
            let _ = tx.send("second");
        });
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)),
            Ok("second"),
            "only the replacement countdown should fire"
        );
        assert!(
            rx.recv_timeout(Duration::from_millis(400)).is_err(),
            "replaced countdown must stay cancelled"
        );
    }

    #[test]
    fn drop_cancels_like_cancel_does() {
        let (tx, rx) = unbounded();
        {
            let mut timer = EndpointTimer::new();
            timer.arm(Duration::from_millis(40), move || {
                let _ = tx.send(());
            });
        }
        assert!(
            rx.recv_timeout(Duration::from_millis(200)).is_err(),
            "dropping the timer must not let the countdown fire"
        );
    }
}
