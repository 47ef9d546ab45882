//! Voice backend collaborator interface.
//!
//! The backend owns transport, authentication, and response playback; the
//! session controller only hands it finished captures and waits for one
//! completion per request.

use crate::session::{RequestCompletion, TriggerSource};
use anyhow::Result;

/// One submitted listen/process exchange, as the backend sees it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub id: u64,
    /// How the capture was ended; for the backend's logs only.
    pub trigger: TriggerSource,
}

/// Speech backend seam.
///
/// `submit` is called under the session lock and must return promptly;
/// the outcome arrives later through `done`, usually from a network
/// thread. Exactly one of success/failure resolves a request — extra
/// calls on the same handle are discarded by the session.
pub trait VoiceBackend: Send + Sync {
    /// Hand off the finished capture. An `Err` fails the request
    /// immediately; on `Ok` the backend owes one call on `done`.
    fn submit(&self, request: CaptureRequest, done: RequestCompletion) -> Result<()>;

    /// Whether the backend is currently playing response audio. Gates
    /// directive re-activation so the mirror does not record itself.
    fn is_speaking(&self) -> bool;

    /// Ping the backend's idle tracking on user interaction.
    fn note_user_activity(&self) {}
}
