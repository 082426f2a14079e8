//! Cooperative scheduler: yield points, progress events, cancellation.
//!
//! An [`Invocation`] is a resumable run of one algorithm. Each call to
//! [`Invocation::resume`] processes units up to the next yield point and
//! returns a [`ProgressEvent`]; the host decides when to call again, which is
//! how a long run shares a thread with a render loop. [`Scheduler::run`] is
//! the blocking convenience that resumes until done.
//!
//! ## State machine
//!
//! ```text
//! Idle --resume--> Running --last unit--> Completed
//!                     |
//!                     +--cancel token seen--> Failed
//! ```
//!
//! Fractions handed to the caller never decrease, never exceed 1, and the
//! final event always carries exactly 1.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::buffer::PixelBuffer;
use crate::engine::{Job, JobStep};
use crate::error::{EngineError, Result};
use crate::filters;
use crate::registry::{self, AlgorithmId, Params};

// ============================================================================
// Configuration
// ============================================================================

/// Pacing and execution options for the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Relative speed, 1-100. At 50 every pass yields at its base interval;
    /// higher values process proportionally more units per yield.
    pub speed: f64,
    /// Upper bound on yields per pass; large buffers get longer intervals.
    pub max_yields_per_pass: usize,
    /// Sleep applied by [`Scheduler::run`] at every yield point.
    pub yield_pause_ms: u64,
    /// Split pointwise chunks across the rayon pool.
    pub parallel: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            speed: 50.0,
            max_yields_per_pass: 2048,
            yield_pause_ms: 0,
            parallel: false,
        }
    }
}

impl SchedulerConfig {
    /// Parse a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    /// Units to process between yields for a pass.
    ///
    /// # Arguments
    /// * `base` - The pass's interval at normal speed
    /// * `units` - Total units in the pass
    pub fn interval(&self, base: usize, units: usize) -> usize {
        let speed = if self.speed.is_finite() {
            self.speed.clamp(1.0, 100.0)
        } else {
            50.0
        };
        let scaled = (base as f64 * speed / 50.0).round() as usize;
        let floor = units.div_ceil(self.max_yields_per_pass.max(1));
        scaled.max(floor).max(1)
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Lifecycle of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Progress report delivered at every yield point.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    /// Completed share of the run, in [0, 1].
    pub fraction: f64,
    /// Units finished in the current pass.
    pub processed_index: usize,
    /// Partially written result, when one is worth displaying.
    pub snapshot: Option<&'a PixelBuffer>,
}

/// Result of [`Invocation::resume`].
#[derive(Debug)]
pub enum Step<'a> {
    Progress(ProgressEvent<'a>),
    Done,
}

/// Shared flag that aborts an invocation at its next yield point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Wall clock for timing logs; browsers without WASI have no `Instant`.
#[cfg(not(target_arch = "wasm32"))]
fn clock_now() -> Option<Instant> {
    Some(Instant::now())
}

#[cfg(target_arch = "wasm32")]
fn clock_now() -> Option<Instant> {
    None
}

/// One resumable algorithm run.
pub struct Invocation {
    algorithm: AlgorithmId,
    config: SchedulerConfig,
    job: Box<dyn Job>,
    state: RunState,
    cancel: CancelToken,
    last_fraction: f64,
    processed: usize,
    total_pixels: usize,
    output: Option<PixelBuffer>,
    started: Option<Instant>,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("algorithm", &self.algorithm)
            .field("state", &self.state)
            .field("last_fraction", &self.last_fraction)
            .finish_non_exhaustive()
    }
}

impl Invocation {
    fn new(
        algorithm: AlgorithmId,
        config: SchedulerConfig,
        job: Box<dyn Job>,
        cancel: CancelToken,
        total_pixels: usize,
    ) -> Self {
        Invocation {
            algorithm,
            config,
            job,
            state: RunState::Idle,
            cancel,
            last_fraction: 0.0,
            processed: 0,
            total_pixels,
            output: None,
            started: None,
        }
    }

    pub fn algorithm(&self) -> AlgorithmId {
        self.algorithm
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Token that cancels this invocation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Advance to the next yield point.
    ///
    /// # Returns
    /// `Step::Progress` for every yield and for the final event (fraction 1),
    /// then `Step::Done` on every later call.
    ///
    /// # Errors
    /// `Cancelled` once the cancel token has been observed.
    pub fn resume(&mut self) -> Result<Step<'_>> {
        match self.state {
            RunState::Completed => return Ok(Step::Done),
            RunState::Failed => {
                return Err(EngineError::Cancelled {
                    processed: self.processed,
                })
            }
            RunState::Idle => {
                self.state = RunState::Running;
                self.started = clock_now();
                debug!(algorithm = %self.algorithm, pixels = self.total_pixels, "invocation started");
            }
            RunState::Running => {}
        }

        if self.cancel.is_cancelled() {
            self.state = RunState::Failed;
            debug!(algorithm = %self.algorithm, processed = self.processed, "invocation cancelled");
            return Err(EngineError::Cancelled {
                processed: self.processed,
            });
        }

        match self.job.step(&self.config) {
            JobStep::Yield {
                fraction,
                processed,
            } => {
                let fraction = fraction.max(self.last_fraction).min(1.0);
                self.last_fraction = fraction;
                self.processed = processed;
                trace!(algorithm = %self.algorithm, fraction, processed, "yield");
                Ok(Step::Progress(ProgressEvent {
                    fraction,
                    processed_index: processed,
                    snapshot: self.job.snapshot(),
                }))
            }
            JobStep::Done => {
                let Some(output) = self.job.take_output() else {
                    self.state = RunState::Failed;
                    return Err(EngineError::NotFinished(RunState::Failed));
                };
                self.output = Some(output);
                self.state = RunState::Completed;
                self.last_fraction = 1.0;
                self.processed = self.total_pixels;
                debug!(
                    algorithm = %self.algorithm,
                    elapsed_ms = self.started.map(|t| t.elapsed().as_millis() as u64).unwrap_or(0),
                    "invocation completed"
                );
                Ok(Step::Progress(ProgressEvent {
                    fraction: 1.0,
                    processed_index: self.total_pixels,
                    snapshot: self.output.as_ref(),
                }))
            }
        }
    }

    /// Take the result of a completed invocation.
    pub fn finish(mut self) -> Result<PixelBuffer> {
        match (self.state, self.output.take()) {
            (RunState::Completed, Some(output)) => Ok(output),
            (state, _) => Err(EngineError::NotFinished(state)),
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Entry point that resolves algorithms and drives invocations.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Scheduler { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Prepare an invocation without running any unit.
    ///
    /// # Errors
    /// `UnknownAlgorithm` or `InvalidBuffer`, before the buffer is copied.
    pub fn start(&self, id: &str, buffer: &PixelBuffer, params: &Params) -> Result<Invocation> {
        self.start_with_cancel(id, buffer, params, CancelToken::new())
    }

    /// Like [`Scheduler::start`], observing an external cancel token.
    pub fn start_with_cancel(
        &self,
        id: &str,
        buffer: &PixelBuffer,
        params: &Params,
        cancel: CancelToken,
    ) -> Result<Invocation> {
        let descriptor = registry::resolve(id)?;
        buffer.validate()?;

        let resolved = descriptor.resolve(params);
        let input = Arc::new(buffer.clone());
        let job = filters::build(descriptor.id, input, &resolved);

        Ok(Invocation::new(
            descriptor.id,
            self.config.clone(),
            job,
            cancel,
            buffer.pixel_count(),
        ))
    }

    /// Run an algorithm to completion, reporting every yield.
    ///
    /// # Arguments
    /// * `id` - Registered algorithm id, e.g. `"gaussianBlur"`
    /// * `buffer` - Input; never modified
    /// * `params` - Parameter values; missing names take their defaults
    /// * `on_progress` - Called at every yield point and once with fraction 1
    pub fn run<F>(&self, id: &str, buffer: &PixelBuffer, params: &Params, on_progress: F) -> Result<PixelBuffer>
    where
        F: FnMut(&ProgressEvent<'_>),
    {
        self.run_with_cancel(id, buffer, params, CancelToken::new(), on_progress)
    }

    /// Blocking run that stops with `Cancelled` once `cancel` is set.
    pub fn run_with_cancel<F>(
        &self,
        id: &str,
        buffer: &PixelBuffer,
        params: &Params,
        cancel: CancelToken,
        mut on_progress: F,
    ) -> Result<PixelBuffer>
    where
        F: FnMut(&ProgressEvent<'_>),
    {
        let mut invocation = self.start_with_cancel(id, buffer, params, cancel)?;
        let pause = Duration::from_millis(self.config.yield_pause_ms);

        loop {
            match invocation.resume()? {
                Step::Progress(event) => {
                    on_progress(&event);
                    if event.fraction < 1.0 && !pause.is_zero() {
                        thread::sleep(pause);
                    }
                }
                Step::Done => break,
            }
        }

        invocation.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| [(x * 3) as u8, (y * 5) as u8, ((x ^ y) * 2) as u8, 255]).unwrap()
    }

    #[test]
    fn test_interval_scales_with_speed() {
        let mut config = SchedulerConfig::default();
        assert_eq!(config.interval(1000, 10_000), 1000);
        config.speed = 100.0;
        assert_eq!(config.interval(1000, 10_000), 2000);
        config.speed = 1.0;
        assert_eq!(config.interval(1000, 10_000), 20);
        config.speed = 0.0;
        assert_eq!(config.interval(1000, 10_000), 20);
    }

    #[test]
    fn test_interval_caps_yield_count() {
        let config = SchedulerConfig {
            max_yields_per_pass: 10,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.interval(1000, 1_000_000), 100_000);
        assert_eq!(config.interval(10, 50), 10);
    }

    #[test]
    fn test_config_from_json_partial() {
        let config = SchedulerConfig::from_json(r#"{"speed": 80, "parallel": true}"#).unwrap();
        assert_eq!(config.speed, 80.0);
        assert!(config.parallel);
        assert_eq!(config.max_yields_per_pass, 2048);
        assert!(matches!(
            SchedulerConfig::from_json("{speed"),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_algorithm_fails_fast() {
        let buffer = gradient(4, 4);
        let mut called = false;
        let err = Scheduler::default()
            .run("sepiaDream", &buffer, &Params::new(), |_| called = true)
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownAlgorithm("sepiaDream".into()));
        assert!(!called);
    }

    #[test]
    fn test_state_machine() {
        let buffer = gradient(40, 40);
        let mut invocation = Scheduler::default().start("invert", &buffer, &Params::new()).unwrap();
        assert_eq!(invocation.state(), RunState::Idle);

        let mut last = 0.0;
        loop {
            match invocation.resume().unwrap() {
                Step::Progress(event) => {
                    assert!(event.fraction >= last);
                    last = event.fraction;
                }
                Step::Done => break,
            }
        }
        assert_eq!(last, 1.0);
        assert_eq!(invocation.state(), RunState::Completed);
        assert!(matches!(invocation.resume(), Ok(Step::Done)));
        let out = invocation.finish().unwrap();
        assert_eq!(out.at(1, 1), [252, 250, 255, 255]);
    }

    #[test]
    fn test_finish_before_completion() {
        let buffer = gradient(40, 40);
        let mut invocation = Scheduler::default().start("grayscale", &buffer, &Params::new()).unwrap();
        invocation.resume().unwrap();
        assert_eq!(invocation.finish().unwrap_err(), EngineError::NotFinished(RunState::Running));
    }

    #[test]
    fn test_progress_monotonic_and_ends_at_one() {
        let buffer = gradient(53, 37);
        let scheduler = Scheduler::default();
        for id in ["grayscale", "blur", "mosaic", "pointillism", "rotation", "pencilSketch", "charcoal", "neonGlow"] {
            let mut fractions = Vec::new();
            scheduler
                .run(id, &buffer, &Params::new(), |event| fractions.push(event.fraction))
                .unwrap();
            assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{}: {:?}", id, fractions);
            assert_eq!(*fractions.last().unwrap(), 1.0, "{}", id);
            assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
        }
    }

    #[test]
    fn test_final_event_carries_result() {
        let buffer = gradient(10, 10);
        let mut final_snapshot = None;
        let out = Scheduler::default()
            .run("invert", &buffer, &Params::new(), |event| {
                if event.fraction == 1.0 {
                    final_snapshot = event.snapshot.cloned();
                }
            })
            .unwrap();
        assert_eq!(final_snapshot, Some(out));
    }

    #[test]
    fn test_cancel_at_yield_point() {
        let buffer = gradient(100, 100);
        let token = CancelToken::new();
        let trigger = token.clone();
        let mut events = 0;
        let err = Scheduler::default()
            .run_with_cancel("grayscale", &buffer, &Params::new(), token, |_| {
                events += 1;
                if events == 2 {
                    trigger.cancel();
                }
            })
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled { processed: 2000 });
        assert_eq!(events, 2);
    }

    #[test]
    fn test_cancelled_invocation_stays_failed() {
        let buffer = gradient(8, 8);
        let mut invocation = Scheduler::default().start("invert", &buffer, &Params::new()).unwrap();
        invocation.cancel_token().cancel();
        assert!(invocation.resume().is_err());
        assert_eq!(invocation.state(), RunState::Failed);
        assert!(invocation.resume().is_err());
        assert!(invocation.finish().is_err());
    }

    #[test]
    fn test_speed_changes_event_count_not_output() {
        let buffer = gradient(64, 64);
        let run = |speed: f64| {
            let scheduler = Scheduler::new(SchedulerConfig {
                speed,
                ..SchedulerConfig::default()
            });
            let mut events = 0;
            let out = scheduler.run("brightness", &buffer, &Params::new().with("brightness", 20.0), |_| events += 1).unwrap();
            (events, out)
        };
        let (slow_events, slow) = run(10.0);
        let (fast_events, fast) = run(100.0);
        assert!(slow_events > fast_events);
        assert_eq!(slow, fast);
    }

    #[test]
    fn test_tracing_subscriber_does_not_change_output() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let buffer = gradient(12, 12);
        let traced = tracing::subscriber::with_default(subscriber, || {
            crate::run("sharpen", &buffer, &Params::new(), |_| {}).unwrap()
        });
        let plain = crate::run("sharpen", &buffer, &Params::new(), |_| {}).unwrap();
        assert_eq!(traced, plain);
    }
}
