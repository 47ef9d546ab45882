//! Session events for the mirror UI / bridge layer.
//!
//! The bridge frames these as newline-delimited JSON; this module defines
//! only the payloads and a non-blocking sink. Level updates are not
//! events — the UI polls the shared meter instead.

use crate::session::{Phase, TriggerSource};
use crossbeam_channel::{Sender, TrySendError};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Events emitted by the session controller.
///
/// Serialized as JSON with an `"event"` tag field for type discrimination.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// The session moved to a new phase.
    #[serde(rename = "phase_changed")]
    PhaseChanged {
        phase: Phase,
        trigger: TriggerSource,
    },

    /// The backend answered the in-flight request.
    #[serde(rename = "request_completed")]
    RequestCompleted { request_id: u64, elapsed_ms: u64 },

    /// The backend reported a failure; `message` is verbatim for the UI.
    #[serde(rename = "request_failed")]
    RequestFailed { request_id: u64, message: String },

    /// Recording could not be started or stopped.
    #[serde(rename = "capture_error")]
    CaptureError { message: String },
}

/// Non-blocking event fan-out. A slow consumer loses events rather than
/// stalling the session lock; losses are counted for diagnostics.
#[derive(Debug)]
pub(crate) struct EventSink {
    sender: Option<Sender<SessionEvent>>,
    dropped: AtomicUsize,
}

impl EventSink {
    pub(crate) fn new(sender: Option<Sender<SessionEvent>>) -> Self {
        Self {
            sender,
            dropped: AtomicUsize::new(0),
        }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let Some(sender) = &self.sender else { return };
        if let Err(err) = sender.try_send(event) {
            match err {
                TrySendError::Full(_) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                // Consumer went away; nothing left to count.
                TrySendError::Disconnected(_) => {}
            }
        }
    }

    pub(crate) fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
