//! Default values shared by the CLI definition and the simulator.

/// Silence threshold matching the mirror's stock microphone gain.
pub const DEFAULT_ENDPOINT_THRESHOLD: u32 = 5;

/// Silence tail before a listening session auto-ends (milliseconds).
pub const DEFAULT_ENDPOINT_SILENCE_MS: u64 = 2_000;

/// Retry interval while an expect-speech directive waits for idle.
pub const DEFAULT_DIRECTIVE_RETRY_MS: u64 = 500;

/// Upper bound of the recorder's raw RMS domain (16-bit PCM).
pub const MAX_RMS_LEVEL: u32 = 32_767;

pub(super) const MAX_ENDPOINT_SILENCE_MS: u64 = 60_000;
pub(super) const MIN_DIRECTIVE_RETRY_MS: u64 = 50;
pub(super) const MAX_DIRECTIVE_RETRY_MS: u64 = 10_000;
