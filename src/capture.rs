//! Audio capture collaborator interface and the live level meter.
//!
//! Recording itself (device selection, encoding, streaming) lives outside
//! this crate; the session controller only starts and stops a capture and
//! consumes the RMS levels it reports.

use crate::session::LevelTap;
use anyhow::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Raw RMS value the recorder reports when no recording is in progress.
pub const LEVEL_IDLE: u32 = 0;

/// Shared last-observed RMS level for the mirror's visual meter.
///
/// Lock-free so the UI can poll it at frame rate while the capture thread
/// publishes at sample cadence.
#[derive(Clone, Debug)]
pub struct LevelMeter {
    level: Arc<AtomicU32>,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            level: Arc::new(AtomicU32::new(LEVEL_IDLE)),
        }
    }

    pub fn set(&self, level: u32) {
        self.level.store(level, Ordering::Relaxed);
    }

    pub fn level(&self) -> u32 {
        self.level.load(Ordering::Relaxed)
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque token identifying one live recording.
#[derive(Debug, PartialEq, Eq)]
pub struct CaptureHandle {
    id: u64,
}

impl CaptureHandle {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Microphone-side collaborator.
///
/// Both calls happen while the session lock is held, so implementations
/// must return promptly and must not call back into the controller from
/// inside them. Levels flow through the tap from the capture thread, and
/// keep flowing harmlessly for a short window after `stop_recording`; the
/// session discards them once it has left Listening.
pub trait AudioCapture: Send + Sync {
    /// Begin streaming RMS levels into `levels` until stopped.
    fn start_recording(&self, levels: LevelTap) -> Result<CaptureHandle>;

    /// Stop the recording identified by `handle`.
    fn stop_recording(&self, handle: CaptureHandle) -> Result<()>;
}
