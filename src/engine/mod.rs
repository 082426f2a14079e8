//! Generic processing engines.
//!
//! Every algorithm is a configuration of one of four engines:
//!
//! | Engine | Module | Work unit | Reads |
//! |--------|--------|-----------|-------|
//! | Pointwise | [`pointwise`] | pixel | the pixel itself |
//! | Convolution | [`convolution`] | pixel | a square neighbourhood |
//! | Geometric resample | [`resample`] | pixel or block | an inverse-mapped source site |
//! | Composite | [`composite`] | stage | the outputs of earlier stages |
//!
//! ## Execution model
//!
//! Engines never loop over a whole buffer on their own. A [`Pass`] exposes a
//! count of work units and processes one unit (or a range) on request; the
//! [`PassJob`] wrapper walks those units in row-major or block order and
//! stops at every yield interval so the scheduler can report progress and
//! hand control back to the host. Composites chain jobs and remap each
//! stage's local progress into its slice of the global range.

pub mod composite;
pub mod convolution;
pub mod pointwise;
pub mod resample;

use std::ops::Range;

use crate::buffer::PixelBuffer;
use crate::scheduler::SchedulerConfig;

/// Base yield interval for linear-time passes.
pub const YIELD_PIXELS: usize = 1000;

/// Base yield interval for passes that touch a window per pixel.
pub const YIELD_PIXELS_HEAVY: usize = 500;

/// Position of the unit being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub x: usize,
    pub y: usize,
    pub index: usize,
}

impl Site {
    #[inline]
    pub fn new(index: usize, width: usize) -> Self {
        Site {
            x: index % width,
            y: index / width,
            index,
        }
    }

    #[inline]
    pub fn xf(&self) -> f64 {
        self.x as f64
    }

    #[inline]
    pub fn yf(&self) -> f64 {
        self.y as f64
    }
}

/// One sweep over a buffer, split into independently schedulable units.
pub trait Pass {
    /// Total number of units (pixels or blocks).
    fn units(&self) -> usize;

    /// Units to process between yields at normal speed.
    fn yield_every(&self) -> usize {
        YIELD_PIXELS
    }

    /// Process a single unit.
    fn run_unit(&mut self, unit: usize);

    /// Process a contiguous range of units.
    fn run_range(&mut self, units: Range<usize>, _parallel: bool) {
        for unit in units {
            self.run_unit(unit);
        }
    }

    /// Destination buffer, possibly partially written.
    fn output(&self) -> &PixelBuffer;

    fn into_output(self: Box<Self>) -> PixelBuffer;
}

/// Outcome of advancing a job to its next yield point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobStep {
    /// Suspended with `fraction` of the job complete.
    Yield { fraction: f64, processed: usize },
    /// All units processed; the output is ready.
    Done,
}

/// Resumable unit of work driven by the scheduler.
pub trait Job {
    /// Run until the next yield point.
    fn step(&mut self, config: &SchedulerConfig) -> JobStep;

    /// Buffer worth showing to a host while the job runs.
    fn snapshot(&self) -> Option<&PixelBuffer>;

    /// Take the result once `step` returned `Done`.
    fn take_output(&mut self) -> Option<PixelBuffer>;
}

// ============================================================================
// Pass Job
// ============================================================================

/// Drives a single [`Pass`] through its units in order.
pub struct PassJob {
    pass: Option<Box<dyn Pass>>,
    cursor: usize,
    output: Option<PixelBuffer>,
}

impl PassJob {
    pub fn new(pass: impl Pass + 'static) -> Self {
        PassJob {
            pass: Some(Box::new(pass)),
            cursor: 0,
            output: None,
        }
    }

    /// Boxed job, ready for the scheduler or a composite stage.
    pub fn boxed(pass: impl Pass + 'static) -> Box<dyn Job> {
        Box::new(Self::new(pass))
    }
}

impl Job for PassJob {
    fn step(&mut self, config: &SchedulerConfig) -> JobStep {
        let Some(pass) = self.pass.as_mut() else {
            return JobStep::Done;
        };

        let units = pass.units();
        let interval = config.interval(pass.yield_every(), units);
        let end = (self.cursor + interval).min(units);
        pass.run_range(self.cursor..end, config.parallel);
        self.cursor = end;

        if end >= units {
            self.output = self.pass.take().map(|pass| pass.into_output());
            return JobStep::Done;
        }

        JobStep::Yield {
            fraction: end as f64 / units as f64,
            processed: end,
        }
    }

    fn snapshot(&self) -> Option<&PixelBuffer> {
        match &self.pass {
            Some(pass) => Some(pass.output()),
            None => self.output.as_ref(),
        }
    }

    fn take_output(&mut self) -> Option<PixelBuffer> {
        self.output.take()
    }
}

/// Run a job to completion without reporting progress.
#[cfg(test)]
pub(crate) fn drain(mut job: Box<dyn Job>) -> PixelBuffer {
    let config = SchedulerConfig::default();
    while job.step(&config) != JobStep::Done {}
    job.take_output().expect("finished job has output")
}
