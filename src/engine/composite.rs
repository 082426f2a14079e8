//! Composite runner: ordered stages sharing one progress range.
//!
//! A composite is a list of [`Stage`]s. Each stage builds a job from the
//! composite's input and the outputs of earlier stages, and owns a fixed
//! slice of the progress range proportional to its weight. Stage slices are
//! contiguous and the last one ends at exactly 1, so local progress remapped
//! through them stays monotonic across stage boundaries.
//!
//! Stages may themselves be composites; nesting simply remaps twice.

use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::PixelBuffer;
use crate::engine::{Job, JobStep};
use crate::scheduler::SchedulerConfig;

/// Buffers visible to a stage builder.
pub struct Inputs<'a> {
    original: &'a Arc<PixelBuffer>,
    outputs: &'a [Arc<PixelBuffer>],
}

impl<'a> Inputs<'a> {
    /// The composite's own input.
    pub fn original(&self) -> &'a Arc<PixelBuffer> {
        self.original
    }

    /// Output of an earlier stage.
    pub fn stage(&self, index: usize) -> &'a Arc<PixelBuffer> {
        &self.outputs[index]
    }

    /// Output of the stage just before this one, or the input for the first.
    pub fn previous(&self) -> &'a Arc<PixelBuffer> {
        self.outputs.last().unwrap_or(self.original)
    }
}

type StageBuilder = Box<dyn Fn(&Inputs<'_>) -> Box<dyn Job> + Send + Sync>;

/// One step of a composite pipeline.
pub struct Stage {
    name: &'static str,
    weight: f64,
    build: StageBuilder,
}

impl Stage {
    /// # Arguments
    /// * `name` - Label used in trace output
    /// * `weight` - Share of the composite's progress range
    /// * `build` - Creates the stage job from the visible buffers
    pub fn new<F>(name: &'static str, weight: f64, build: F) -> Self
    where
        F: Fn(&Inputs<'_>) -> Box<dyn Job> + Send + Sync + 'static,
    {
        Stage {
            name,
            weight,
            build: Box::new(build),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Contiguous sub-ranges of [0, 1] proportional to `weights`.
///
/// The first range starts at 0, each range starts where the previous one
/// ends, and the last ends at exactly 1.
pub fn stage_ranges(weights: &[f64]) -> Vec<Range<f64>> {
    let total: f64 = weights.iter().sum();
    let mut ranges = Vec::with_capacity(weights.len());
    let mut start = 0.0;
    let mut acc = 0.0;
    for (i, weight) in weights.iter().enumerate() {
        acc += weight;
        let end = if i + 1 == weights.len() || total <= 0.0 {
            1.0
        } else {
            (acc / total).min(1.0)
        };
        ranges.push(start..end);
        start = end;
    }
    ranges
}

// ============================================================================
// Composite Job
// ============================================================================

/// Runs stages in order, remapping their progress into fixed sub-ranges.
pub struct Composite {
    original: Arc<PixelBuffer>,
    stages: Vec<Stage>,
    ranges: Vec<Range<f64>>,
    outputs: Vec<Arc<PixelBuffer>>,
    current: Option<Box<dyn Job>>,
    index: usize,
    result: Option<PixelBuffer>,
}

impl Composite {
    pub fn new(original: Arc<PixelBuffer>, stages: Vec<Stage>) -> Self {
        let weights: Vec<f64> = stages.iter().map(Stage::weight).collect();
        Composite {
            original,
            ranges: stage_ranges(&weights),
            stages,
            outputs: Vec::new(),
            current: None,
            index: 0,
            result: None,
        }
    }

    pub fn boxed(self) -> Box<dyn Job> {
        Box::new(self)
    }

    /// Progress slice owned by each stage.
    pub fn ranges(&self) -> &[Range<f64>] {
        &self.ranges
    }
}

impl Job for Composite {
    fn step(&mut self, config: &SchedulerConfig) -> JobStep {
        if self.index >= self.stages.len() {
            return JobStep::Done;
        }

        let (stages, original, outputs, index) = (&self.stages, &self.original, &self.outputs, self.index);
        let job = self
            .current
            .get_or_insert_with(|| (stages[index].build)(&Inputs { original, outputs }));
        let range = self.ranges[index].clone();

        match job.step(config) {
            JobStep::Yield { fraction, processed } => JobStep::Yield {
                fraction: range.start + (range.end - range.start) * fraction,
                processed,
            },
            JobStep::Done => {
                let finished = job.take_output();
                self.current = None;
                let Some(output) = finished else {
                    // No result to hand on; the caller sees a job without output.
                    debug!(stage = self.stages[index].name, "composite stage finished without output");
                    self.index = self.stages.len();
                    return JobStep::Done;
                };
                self.index += 1;
                trace!(stage = self.stages[index].name, "composite stage finished");

                if self.index == self.stages.len() {
                    self.result = Some(output);
                    return JobStep::Done;
                }
                self.outputs.push(Arc::new(output));
                JobStep::Yield {
                    fraction: range.end,
                    processed: 0,
                }
            }
        }
    }

    fn snapshot(&self) -> Option<&PixelBuffer> {
        if let Some(result) = &self.result {
            return Some(result);
        }
        if self.index + 1 == self.stages.len() {
            return self.current.as_ref().and_then(|job| job.snapshot());
        }
        None
    }

    fn take_output(&mut self) -> Option<PixelBuffer> {
        self.result.take()
    }
}
