//! Offline push-to-talk simulator.
//!
//! Drives the session controller with a scripted microphone and a
//! loopback backend so the whole trigger/endpoint/completion cycle can be
//! exercised without mirror hardware. Prints the event stream as JSON
//! lines plus a pipe-delimited summary for smoke scripts.

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use mirrortalk::{
    init_logging, init_tracing, AudioCapture, CaptureHandle, CaptureRequest, LevelTap, Phase,
    PttController, RequestCompletion, TriggerSource, VoiceBackend,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Parser)]
#[command(about = "Simulate push-to-talk sessions against a scripted microphone")]
struct Args {
    #[command(flatten)]
    config: mirrortalk::config::AppConfig,

    /// Backend turnaround for the loopback responder (milliseconds)
    #[arg(long = "backend-latency-ms", default_value_t = 250)]
    backend_latency_ms: u64,

    /// Sample cadence for the scripted microphone (milliseconds)
    #[arg(long = "sample-interval-ms", default_value_t = 100)]
    sample_interval_ms: u64,

    /// Loud samples fed before the script goes quiet
    #[arg(long = "speech-samples", default_value_t = 5)]
    speech_samples: u32,
}

/// Microphone double: each recording plays a short burst of speech-level
/// samples, then stays quiet so the endpoint timer can do its job.
struct ScriptedMic {
    next_id: AtomicU64,
    live: Mutex<Option<Arc<AtomicBool>>>,
    interval: Duration,
    speech_samples: u32,
    loud_level: u32,
    quiet_level: u32,
}

impl ScriptedMic {
    fn new(interval: Duration, speech_samples: u32, threshold: u32) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            live: Mutex::new(None),
            interval,
            speech_samples,
            loud_level: threshold.saturating_mul(4).max(1),
            quiet_level: threshold.saturating_sub(2).max(1),
        }
    }
}

impl AudioCapture for ScriptedMic {
    fn start_recording(&self, levels: LevelTap) -> Result<CaptureHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stopped = Arc::new(AtomicBool::new(false));
        *self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&stopped));
        let interval = self.interval;
        let speech_samples = self.speech_samples;
        let loud = self.loud_level;
        let quiet = self.quiet_level;
        thread::spawn(move || {
            let mut sent = 0u32;
            while !stopped.load(Ordering::Relaxed) {
                let level = if sent < speech_samples { loud } else { quiet };
                levels.push(level);
                sent = sent.saturating_add(1);
                thread::sleep(interval);
            }
        });
        Ok(CaptureHandle::new(id))
    }

    fn stop_recording(&self, _handle: CaptureHandle) -> Result<()> {
        if let Some(stopped) = self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take() {
            stopped.store(true, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Backend double: every submission succeeds after a fixed turnaround.
struct LoopbackBackend {
    latency: Duration,
}

impl VoiceBackend for LoopbackBackend {
    fn submit(&self, request: CaptureRequest, done: RequestCompletion) -> Result<()> {
        let latency = self.latency;
        eprintln!(
            "loopback|submitted|request={}|trigger={}",
            request.id,
            request.trigger.label()
        );
        thread::spawn(move || {
            thread::sleep(latency);
            done.succeed();
        });
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        false
    }
}

fn wait_for_phase(controller: &PttController, phase: Phase, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if controller.phase() == phase {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(10));
    }
    bail!(
        "timed out waiting for phase {}, still {}",
        phase.label(),
        controller.phase().label()
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.config.validate()?;
    init_logging(&args.config);
    init_tracing(&args.config);

    let session_config = args.config.session_config()?;
    let silence = session_config.endpoint.silence_duration;
    let mic = Arc::new(ScriptedMic::new(
        Duration::from_millis(args.sample_interval_ms),
        args.speech_samples,
        session_config.endpoint.threshold_level,
    ));
    let backend = Arc::new(LoopbackBackend {
        latency: Duration::from_millis(args.backend_latency_ms),
    });
    let (events_tx, events_rx) = bounded(256);
    let controller = PttController::with_events(
        session_config,
        mic.clone() as Arc<dyn AudioCapture>,
        backend as Arc<dyn VoiceBackend>,
        Some(events_tx),
    );

    // Budget: speech burst + silence tail + backend turnaround, padded.
    let session_budget = Duration::from_millis(
        args.sample_interval_ms * u64::from(args.speech_samples)
            + args.backend_latency_ms
            + 2_000,
    ) + silence * 2;

    // Session 1: a press starts listening; the quiet tail auto-endpoints.
    controller.trigger_pressed(TriggerSource::Manual);
    wait_for_phase(&controller, Phase::Processing, session_budget)?;
    wait_for_phase(&controller, Phase::Idle, session_budget)?;

    // Session 2: a server directive re-enters listening on its own.
    controller.on_expect_speech_directive();
    wait_for_phase(&controller, Phase::Listening, session_budget)?;
    wait_for_phase(&controller, Phase::Idle, session_budget * 2)?;

    controller.shutdown();

    let mut event_count = 0usize;
    for event in events_rx.try_iter() {
        event_count += 1;
        println!(
            "{}",
            serde_json::to_string(&event).map_err(|err| anyhow!("event encode: {err}"))?
        );
    }
    println!(
        "session_sim|sessions=2|events={event_count}|dropped={}",
        controller.dropped_events()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from(["session_sim"]).expect("defaults should parse");
        assert_eq!(args.backend_latency_ms, 250);
        assert_eq!(args.sample_interval_ms, 100);
        args.config.validate().expect("defaults should validate");
    }

    #[test]
    fn scripted_mic_goes_quiet_after_the_burst() {
        let mic = ScriptedMic::new(Duration::from_millis(1), 2, 5);
        assert_eq!(mic.loud_level, 20);
        assert_eq!(mic.quiet_level, 3);
    }
}
