//! Pointwise engine: per-pixel formulas with no neighbour access.
//!
//! A formula sees the current pixel and its [`Site`] and returns the new
//! pixel. Because no neighbour is read, pixels can be computed in any order,
//! which is what lets [`PointwisePass`] hand chunks to rayon.
//!
//! [`BlendPass`] is the two-input variant used by composite stages: it
//! combines a base buffer with a layer buffer of the same size.

use std::ops::Range;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "parallel")]
use crate::buffer::CHANNELS;

use crate::buffer::{PixelBuffer, Rgba};
use crate::engine::{Pass, Site};

/// Per-pixel formula.
pub type Formula = Box<dyn Fn(Rgba, Site) -> Rgba + Send + Sync>;

/// Two-input formula: `(base, layer, site)`.
pub type BlendFormula = Box<dyn Fn(Rgba, Rgba, Site) -> Rgba + Send + Sync>;

// ============================================================================
// Pointwise Pass
// ============================================================================

/// Applies a formula to every pixel of a cloned buffer.
pub struct PointwisePass {
    output: PixelBuffer,
    formula: Formula,
}

impl PointwisePass {
    pub fn new<F>(input: &PixelBuffer, formula: F) -> Self
    where
        F: Fn(Rgba, Site) -> Rgba + Send + Sync + 'static,
    {
        PointwisePass {
            output: input.clone(),
            formula: Box::new(formula),
        }
    }

    fn run_sequential(&mut self, units: Range<usize>) {
        for unit in units {
            self.run_unit(unit);
        }
    }
}

impl Pass for PointwisePass {
    fn units(&self) -> usize {
        self.output.pixel_count()
    }

    fn run_unit(&mut self, unit: usize) {
        let site = Site::new(unit, self.output.width());
        let pixel = self.output.at(site.x, site.y);
        self.output.put(site.x, site.y, (self.formula)(pixel, site));
    }

    fn run_range(&mut self, units: Range<usize>, parallel: bool) {
        #[cfg(feature = "parallel")]
        if parallel {
            let width = self.output.width();
            let formula = &self.formula;
            if let Some(bytes) = self.output.as_slice_mut() {
                let start = units.start;
                bytes[units.start * CHANNELS..units.end * CHANNELS]
                    .par_chunks_mut(CHANNELS)
                    .enumerate()
                    .for_each(|(offset, px)| {
                        let site = Site::new(start + offset, width);
                        let out = formula([px[0], px[1], px[2], px[3]], site);
                        px.copy_from_slice(&out);
                    });
                return;
            }
        }
        #[cfg(not(feature = "parallel"))]
        let _ = parallel;

        self.run_sequential(units);
    }

    fn output(&self) -> &PixelBuffer {
        &self.output
    }

    fn into_output(self: Box<Self>) -> PixelBuffer {
        self.output
    }
}

// ============================================================================
// Blend Pass
// ============================================================================

/// Combines a base buffer with a same-sized layer, pixel by pixel.
pub struct BlendPass {
    output: PixelBuffer,
    layer: Arc<PixelBuffer>,
    formula: BlendFormula,
}

impl BlendPass {
    /// # Arguments
    /// * `base` - Buffer whose clone receives the result
    /// * `layer` - Second input, read only
    /// * `formula` - `(base_pixel, layer_pixel, site) -> pixel`
    pub fn new<F>(base: &PixelBuffer, layer: Arc<PixelBuffer>, formula: F) -> Self
    where
        F: Fn(Rgba, Rgba, Site) -> Rgba + Send + Sync + 'static,
    {
        debug_assert_eq!(base.width(), layer.width());
        debug_assert_eq!(base.height(), layer.height());
        BlendPass {
            output: base.clone(),
            layer,
            formula: Box::new(formula),
        }
    }
}

impl Pass for BlendPass {
    fn units(&self) -> usize {
        self.output.pixel_count()
    }

    fn run_unit(&mut self, unit: usize) {
        let site = Site::new(unit, self.output.width());
        let base = self.output.at(site.x, site.y);
        let layer = self.layer.at(site.x, site.y);
        self.output.put(site.x, site.y, (self.formula)(base, layer, site));
    }

    fn output(&self) -> &PixelBuffer {
        &self.output
    }

    fn into_output(self: Box<Self>) -> PixelBuffer {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{drain, Job, JobStep, PassJob};
    use crate::scheduler::SchedulerConfig;

    fn gradient(width: usize, height: usize) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            [(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8, 200]
        })
        .unwrap()
    }

    #[test]
    fn test_formula_sees_site() {
        let input = PixelBuffer::new(4, 3).unwrap();
        let out = drain(PassJob::boxed(PointwisePass::new(&input, |_, s: Site| {
            [s.x as u8, s.y as u8, s.index as u8, 255]
        })));
        assert_eq!(out.at(3, 2), [3, 2, 11, 255]);
    }

    #[test]
    fn test_input_untouched() {
        let input = gradient(8, 8);
        let before = input.clone();
        let _ = drain(PassJob::boxed(PointwisePass::new(&input, |p, _| {
            [255 - p[0], 255 - p[1], 255 - p[2], p[3]]
        })));
        assert_eq!(input, before);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let input = gradient(64, 48);
        let formula = |p: Rgba, s: Site| {
            [p[0].wrapping_add(s.x as u8), p[1] / 2, p[2].saturating_add(40), p[3]]
        };

        let sequential = drain(PassJob::boxed(PointwisePass::new(&input, formula)));

        let config = SchedulerConfig {
            parallel: true,
            ..SchedulerConfig::default()
        };
        let mut job = PassJob::new(PointwisePass::new(&input, formula));
        while job.step(&config) != JobStep::Done {}
        let parallel = job.take_output().unwrap();

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_blend_reads_both_inputs() {
        let base = PixelBuffer::filled(3, 3, [100, 100, 100, 255]).unwrap();
        let layer = Arc::new(PixelBuffer::filled(3, 3, [20, 40, 60, 10]).unwrap());
        let out = drain(PassJob::boxed(BlendPass::new(&base, layer, |b, l, _| {
            [b[0] + l[0], b[1] + l[1], b[2] + l[2], b[3]]
        })));
        assert_eq!(out.at(1, 1), [120, 140, 160, 255]);
    }
}
