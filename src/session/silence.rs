//! Silence detection over live RMS levels.
//!
//! Converts the stream of microphone energy samples into edge-triggered
//! arm/cancel decisions for the endpoint timer. The recorder reports raw
//! non-negative RMS values; `0` is its "no recording in progress" marker
//! and must not be read as literal silence.

use anyhow::{bail, Result};
use std::time::Duration;

/// Tuning for silence-based auto endpointing. Immutable once built.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// RMS level below which audio counts as silence.
    pub threshold_level: u32,
    /// How long the level must stay below threshold before auto-ending.
    pub silence_duration: Duration,
}

impl EndpointConfig {
    /// Build a validated config. A zero duration would endpoint the
    /// session on the first quiet sample, so it is rejected here rather
    /// than surfacing mid-recording.
    pub fn new(threshold_level: u32, silence_duration: Duration) -> Result<Self> {
        if silence_duration.is_zero() {
            bail!("endpoint silence duration must be greater than zero");
        }
        Ok(Self {
            threshold_level,
            silence_duration,
        })
    }
}

/// Edge emitted when a sample crosses the silence boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SilenceEdge {
    /// Level dropped below threshold with no timer armed; arm one.
    Started,
    /// Sound returned (or the recorder went idle) while a timer was
    /// armed; cancel it.
    Ended,
}

/// Edge-triggered silence detector.
///
/// A sample strictly below the threshold arms at most one timer; a sample
/// above it, or the `0` idle marker, cancels an armed timer. A sample
/// exactly at the threshold neither arms nor cancels, which keeps the
/// detector from flapping when the level sits on the boundary.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    threshold_level: u32,
    armed: bool,
}

impl SilenceDetector {
    pub fn new(config: &EndpointConfig) -> Self {
        Self {
            threshold_level: config.threshold_level,
            armed: false,
        }
    }

    /// Classify one sample. Returns the edge to act on, if any.
    pub fn observe(&mut self, level: u32) -> Option<SilenceEdge> {
        if level == 0 || level > self.threshold_level {
            if self.armed {
                self.armed = false;
                return Some(SilenceEdge::Ended);
            }
            return None;
        }
        if level < self.threshold_level {
            if !self.armed {
                self.armed = true;
                return Some(SilenceEdge::Started);
            }
            return None;
        }
        // level == threshold: inert in both directions.
        None
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Forget any armed timer, e.g. when the session leaves Listening.
    pub fn reset(&mut self) {
        self.armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(threshold: u32) -> SilenceDetector {
        let config = EndpointConfig::new(threshold, Duration::from_secs(2))
            .expect("test config should be valid");
        SilenceDetector::new(&config)
    }

    #[test]
    fn rejects_zero_silence_duration() {
        let err = EndpointConfig::new(5, Duration::ZERO).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn arms_once_below_threshold() {
        let mut det = detector(5);
        assert_eq!(det.observe(3), Some(SilenceEdge::Started));
        assert_eq!(det.observe(2), None);
        assert!(det.is_armed());
    }

    #[test]
    fn loud_sample_ends_armed_silence() {
        let mut det = detector(5);
        assert_eq!(det.observe(3), Some(SilenceEdge::Started));
        assert_eq!(det.observe(6), Some(SilenceEdge::Ended));
        assert!(!det.is_armed());
    }

    #[test]
    fn zero_is_idle_marker_not_silence() {
        let mut det = detector(5);
        // Unarmed: the idle marker changes nothing.
        assert_eq!(det.observe(0), None);
        assert!(!det.is_armed());
        // Armed: it cancels exactly like sound does.
        assert_eq!(det.observe(3), Some(SilenceEdge::Started));
        assert_eq!(det.observe(0), Some(SilenceEdge::Ended));
    }

    #[test]
    fn threshold_boundary_is_inert() {
        let mut det = detector(5);
        assert_eq!(det.observe(5), None);
        assert!(!det.is_armed());
        det.observe(3);
        assert_eq!(det.observe(5), None);
        assert!(det.is_armed());
    }

    #[test]
    fn quiet_tail_after_speech_arms_once() {
        let mut det = detector(5);
        let edges: Vec<_> = [10, 3, 3, 3].iter().map(|&l| det.observe(l)).collect();
        assert_eq!(
            edges,
            vec![None, Some(SilenceEdge::Started), None, None],
            "only the first quiet sample should arm"
        );
    }

    #[test]
    fn loud_interruption_resets_the_edge() {
        let mut det = detector(5);
        let edges: Vec<_> = [2, 2, 6, 2].iter().map(|&l| det.observe(l)).collect();
        assert_eq!(
            edges,
            vec![
                Some(SilenceEdge::Started),
                None,
                Some(SilenceEdge::Ended),
                Some(SilenceEdge::Started),
            ]
        );
    }

    #[test]
    fn reset_disarms() {
        let mut det = detector(5);
        det.observe(3);
        det.reset();
        assert!(!det.is_armed());
        assert_eq!(det.observe(2), Some(SilenceEdge::Started));
    }
}
