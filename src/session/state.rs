//! Session phase vocabulary and the push-to-talk transition table.
//!
//! Every trigger source (mirror UI button, GPIO edge, endpoint timer,
//! server directive) funnels through the same table; the source is
//! metadata for logging and UI feedback, never a separate code path.

use serde::Serialize;
use std::time::Instant;

/// Where the session sits in its listen/process cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Listening = 1,
    Processing = 2,
}

impl Phase {
    /// Label shown next to the mirror's microphone indicator.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Listening => "listening",
            Phase::Processing => "processing",
        }
    }

    /// Decode the atomic mirror written by the controller. Unknown bits
    /// read as Idle, the only phase that is always safe to report.
    pub(crate) fn from_bits(bits: u8) -> Phase {
        match bits {
            1 => Phase::Listening,
            2 => Phase::Processing,
            _ => Phase::Idle,
        }
    }
}

/// Which path delivered a trigger event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// On-screen button in the mirror UI.
    Manual,
    /// Physical push-to-talk button. Callers must report only the
    /// pressed edge; delivering the release edge too would read as a
    /// second press.
    Gpio,
    /// Endpoint timer expiry after sustained silence.
    AutoEndpoint,
    /// Server-initiated expect-speech re-activation.
    Directive,
}

impl TriggerSource {
    pub fn label(self) -> &'static str {
        match self {
            TriggerSource::Manual => "manual",
            TriggerSource::Gpio => "gpio",
            TriggerSource::AutoEndpoint => "auto_endpoint",
            TriggerSource::Directive => "directive",
        }
    }
}

/// In-flight exchange between "recording stopped" and "backend responded".
/// At most one exists at a time; the id recognizes stale completions.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub(crate) id: u64,
    pub(crate) trigger: TriggerSource,
    pub(crate) started_at: Instant,
}

/// What a trigger event should do given the current phase.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    StartListening,
    StopAndSubmit,
    Ignored,
}

/// Single transition table for every trigger source. A trigger that lands
/// mid-request is dropped: the session is not re-entrant while a speech
/// request is outstanding.
pub(crate) fn on_trigger(phase: Phase) -> Transition {
    match phase {
        Phase::Idle => Transition::StartListening,
        Phase::Listening => Transition::StopAndSubmit,
        Phase::Processing => Transition::Ignored,
    }
}
