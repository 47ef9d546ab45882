//! Push-to-talk session control for a smart-mirror voice assistant.
//!
//! The mirror's UI button, a GPIO push-to-talk switch, and server
//! expect-speech directives all funnel into one session controller that
//! owns the listen/process cycle, auto-ends recordings after sustained
//! silence, and reconciles asynchronous backend completions. Audio
//! capture and the voice backend stay behind narrow trait seams.

pub mod backend;
pub mod capture;
pub mod config;
pub mod events;
mod logging;
pub mod session;
mod telemetry;

pub use backend::{CaptureRequest, VoiceBackend};
pub use capture::{AudioCapture, CaptureHandle, LevelMeter, LEVEL_IDLE};
pub use events::SessionEvent;
pub use logging::{init_logging, log_debug, log_file_path};
pub use session::{
    EndpointConfig, LevelTap, Phase, PttController, RequestCompletion, SessionConfig,
    TriggerSource,
};
pub use telemetry::init_tracing;
