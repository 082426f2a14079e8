//! Geometric resample engine: inverse mapping, directional sampling, blocks.
//!
//! Three pass shapes share this module:
//!
//! - [`RemapPass`] asks a mapping closure for the source coordinate of each
//!   destination pixel and copies the nearest source pixel.
//! - [`AccumulatePass`] averages several samples along a path per pixel
//!   (motion and radial blur).
//! - [`BlockPass`] works on fixed-size tiles instead of pixels (mosaic and
//!   pointillism).
//!
//! Coordinates are rounded half up to the nearest pixel; there is no
//! interpolation.

use std::sync::Arc;

use crate::buffer::{round_half_up, store, PixelBuffer, Rgba};
use crate::engine::{Pass, Site};

/// Opaque black written for unmapped pixels.
pub const BLACK: Rgba = [0, 0, 0, 255];

/// What a remap writes when its source coordinate is off the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outside {
    /// Opaque black.
    Black,
    /// The destination pixel's own source value.
    Identity,
    /// The nearest edge pixel.
    Clamp,
}

/// Source coordinate for a destination site; `None` keeps the pixel as is.
pub type InverseMap = Box<dyn Fn(Site) -> Option<(f64, f64)> + Send + Sync>;

/// Combine `(own, sampled, site)` into the written pixel.
pub type Shade = Box<dyn Fn(Rgba, Rgba, Site) -> Rgba + Send + Sync>;

/// Collects sample coordinates for a site into the scratch vector.
pub type SamplePath = Box<dyn Fn(Site, &mut Vec<(f64, f64)>) + Send + Sync>;

#[inline]
fn nearest(x: f64, y: f64) -> Option<(isize, isize)> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some((round_half_up(x) as isize, round_half_up(y) as isize))
}

// ============================================================================
// Remap
// ============================================================================

/// Nearest-neighbour inverse mapping.
pub struct RemapPass {
    source: Arc<PixelBuffer>,
    output: PixelBuffer,
    map: InverseMap,
    outside: Outside,
    shade: Option<Shade>,
}

impl RemapPass {
    pub fn new<F>(source: Arc<PixelBuffer>, outside: Outside, map: F) -> Self
    where
        F: Fn(Site) -> Option<(f64, f64)> + Send + Sync + 'static,
    {
        let output = match outside {
            Outside::Black => {
                let mut black = (*source).clone();
                black.fill(BLACK);
                black
            }
            Outside::Identity | Outside::Clamp => (*source).clone(),
        };
        RemapPass {
            source,
            output,
            map: Box::new(map),
            outside,
            shade: None,
        }
    }

    /// Post-process every sampled pixel.
    pub fn shaded<F>(mut self, shade: F) -> Self
    where
        F: Fn(Rgba, Rgba, Site) -> Rgba + Send + Sync + 'static,
    {
        self.shade = Some(Box::new(shade));
        self
    }

    fn sample(&self, site: Site) -> Rgba {
        let own = self.source.at(site.x, site.y);
        let Some((sx, sy)) = (self.map)(site) else {
            return own;
        };
        let Some((ix, iy)) = nearest(sx, sy) else {
            return own;
        };

        let sampled = match self.source.get(ix, iy) {
            Some(px) => px,
            None => match self.outside {
                Outside::Black => return BLACK,
                Outside::Identity => return own,
                Outside::Clamp => self.source.clamped(ix, iy),
            },
        };

        match &self.shade {
            Some(shade) => shade(own, sampled, site),
            None => sampled,
        }
    }
}

impl Pass for RemapPass {
    fn units(&self) -> usize {
        self.source.pixel_count()
    }

    fn run_unit(&mut self, unit: usize) {
        let site = Site::new(unit, self.source.width());
        let pixel = self.sample(site);
        self.output.put(site.x, site.y, pixel);
    }

    fn output(&self) -> &PixelBuffer {
        &self.output
    }

    fn into_output(self: Box<Self>) -> PixelBuffer {
        self.output
    }
}

// ============================================================================
// Accumulate
// ============================================================================

/// Average of the in-range samples along a per-pixel path.
///
/// A pixel with no in-range sample keeps its source value.
pub struct AccumulatePass {
    source: Arc<PixelBuffer>,
    output: PixelBuffer,
    path: SamplePath,
    scratch: Vec<(f64, f64)>,
}

impl AccumulatePass {
    pub fn new<F>(source: Arc<PixelBuffer>, path: F) -> Self
    where
        F: Fn(Site, &mut Vec<(f64, f64)>) + Send + Sync + 'static,
    {
        let output = (*source).clone();
        AccumulatePass {
            source,
            output,
            path: Box::new(path),
            scratch: Vec::new(),
        }
    }
}

impl Pass for AccumulatePass {
    fn units(&self) -> usize {
        self.source.pixel_count()
    }

    fn run_unit(&mut self, unit: usize) {
        let site = Site::new(unit, self.source.width());
        self.scratch.clear();
        (self.path)(site, &mut self.scratch);

        let mut sum = [0.0f64; 3];
        let mut count = 0usize;
        for &(x, y) in &self.scratch {
            let Some(px) = nearest(x, y).and_then(|(ix, iy)| self.source.get(ix, iy)) else {
                continue;
            };
            for c in 0..3 {
                sum[c] += px[c] as f64;
            }
            count += 1;
        }

        if count == 0 {
            return;
        }

        let mut out = self.source.at(site.x, site.y);
        for c in 0..3 {
            out[c] = store(round_half_up(sum[c] / count as f64));
        }
        self.output.put(site.x, site.y, out);
    }

    fn output(&self) -> &PixelBuffer {
        &self.output
    }

    fn into_output(self: Box<Self>) -> PixelBuffer {
        self.output
    }
}

// ============================================================================
// Blocks
// ============================================================================

/// Which pixels of a block receive the block average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMask {
    /// Every pixel; alpha stays per pixel.
    Full,
    /// A disc of diameter `size` on a white background, opaque.
    Disc,
}

/// Tile-based averaging in row-major block order.
pub struct BlockPass {
    source: Arc<PixelBuffer>,
    output: PixelBuffer,
    size: usize,
    mask: BlockMask,
    yield_every: usize,
}

impl BlockPass {
    /// # Arguments
    /// * `source` - Buffer to average
    /// * `size` - Block edge length in pixels (at least 1)
    /// * `mask` - Pixels of each block that are written
    /// * `yield_every` - Blocks between yields
    pub fn new(source: Arc<PixelBuffer>, size: usize, mask: BlockMask, yield_every: usize) -> Self {
        let mut output = (*source).clone();
        if mask == BlockMask::Disc {
            output.fill([255, 255, 255, 255]);
        }
        BlockPass {
            source,
            output,
            size: size.max(1),
            mask,
            yield_every: yield_every.max(1),
        }
    }

    fn blocks_across(&self) -> usize {
        self.source.width().div_ceil(self.size)
    }
}

impl Pass for BlockPass {
    fn units(&self) -> usize {
        self.blocks_across() * self.source.height().div_ceil(self.size)
    }

    fn yield_every(&self) -> usize {
        self.yield_every
    }

    fn run_unit(&mut self, unit: usize) {
        let across = self.blocks_across();
        let x0 = (unit % across) * self.size;
        let y0 = (unit / across) * self.size;
        let x1 = (x0 + self.size).min(self.source.width());
        let y1 = (y0 + self.size).min(self.source.height());

        let mut sum = [0.0f64; 3];
        for y in y0..y1 {
            for x in x0..x1 {
                let px = self.source.at(x, y);
                for c in 0..3 {
                    sum[c] += px[c] as f64;
                }
            }
        }
        let count = ((x1 - x0) * (y1 - y0)) as f64;
        let avg = sum.map(|s| store(round_half_up(s / count)));

        let half = self.size as f64 / 2.0;
        for y in y0..y1 {
            for x in x0..x1 {
                match self.mask {
                    BlockMask::Full => {
                        let alpha = self.source.at(x, y)[3];
                        self.output.put(x, y, [avg[0], avg[1], avg[2], alpha]);
                    }
                    BlockMask::Disc => {
                        let dx = (x - x0) as f64 - half;
                        let dy = (y - y0) as f64 - half;
                        if (dx * dx + dy * dy).sqrt() <= half {
                            self.output.put(x, y, [avg[0], avg[1], avg[2], 255]);
                        }
                    }
                }
            }
        }
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
    use crate::engine::{drain, PassJob};

    fn numbered(width: usize, height: usize) -> Arc<PixelBuffer> {
        Arc::new(PixelBuffer::from_fn(width, height, |x, y| [x as u8, y as u8, (x * y) as u8, 200]).unwrap())
    }

    #[test]
    fn test_identity_map() {
        let src = numbered(5, 4);
        let out = drain(PassJob::boxed(RemapPass::new(src.clone(), Outside::Black, |s| {
            Some((s.xf(), s.yf()))
        })));
        assert_eq!(out, *src);
    }

    #[test]
    fn test_outside_black() {
        let src = numbered(3, 3);
        let out = drain(PassJob::boxed(RemapPass::new(src, Outside::Black, |s| {
            Some((s.xf() + 2.0, s.yf()))
        })));
        assert_eq!(out.at(0, 1), [2, 1, 2, 200]);
        assert_eq!(out.at(1, 1), BLACK);
    }

    #[test]
    fn test_outside_identity() {
        let src = numbered(3, 3);
        let out = drain(PassJob::boxed(RemapPass::new(src.clone(), Outside::Identity, |s| {
            Some((s.xf() - 5.0, s.yf()))
        })));
        assert_eq!(out, *src);
    }

    #[test]
    fn test_outside_clamp() {
        let src = numbered(4, 2);
        let out = drain(PassJob::boxed(RemapPass::new(src, Outside::Clamp, |s| {
            Some((s.xf() + 10.0, s.yf()))
        })));
        assert_eq!(out.at(0, 1), [3, 1, 3, 200]);
    }

    #[test]
    fn test_none_keeps_pixel_and_nan_is_identity() {
        let src = numbered(3, 3);
        let out = drain(PassJob::boxed(RemapPass::new(src.clone(), Outside::Black, |s| {
            if s.x == 0 {
                None
            } else {
                Some((f64::NAN, 0.0))
            }
        })));
        assert_eq!(out, *src);
    }

    #[test]
    fn test_rounding_half_up_at_negative_half() {
        let src = numbered(3, 1);
        let out = drain(PassJob::boxed(RemapPass::new(src.clone(), Outside::Black, |s| {
            Some((s.xf() - 0.5, s.yf()))
        })));
        // -0.5 rounds to 0 rather than leaving the raster
        assert_eq!(out.at(0, 0), src.at(0, 0));
        assert_eq!(out.at(2, 0), src.at(2, 0));
    }

    #[test]
    fn test_shade_sees_own_and_sampled() {
        let src = numbered(3, 3);
        let out = drain(PassJob::boxed(
            RemapPass::new(src, Outside::Identity, |s| Some((s.xf() - 1.0, s.yf())))
                .shaded(|own, sampled, _| [own[0], sampled[0], 0, 255]),
        ));
        assert_eq!(out.at(2, 0), [2, 1, 0, 255]);
    }

    #[test]
    fn test_accumulate_averages_in_range_samples() {
        let src = Arc::new(PixelBuffer::from_rgba(3, 1, vec![0, 0, 0, 255, 90, 90, 90, 255, 30, 30, 30, 9]).unwrap());
        let out = drain(PassJob::boxed(AccumulatePass::new(src, |s, path| {
            for i in 0..3 {
                path.push((s.xf() + i as f64, s.yf()));
            }
        })));
        assert_eq!(out.at(0, 0), [40, 40, 40, 255]);
        assert_eq!(out.at(1, 0), [60, 60, 60, 255]);
        assert_eq!(out.at(2, 0), [30, 30, 30, 9]);
    }

    #[test]
    fn test_accumulate_without_samples_keeps_pixel() {
        let src = numbered(2, 2);
        let out = drain(PassJob::boxed(AccumulatePass::new(src.clone(), |_, _| {})));
        assert_eq!(out, *src);
    }

    #[test]
    fn test_block_average_full() {
        let src = Arc::new(PixelBuffer::from_rgba(2, 2, vec![0, 10, 20, 255, 10, 10, 20, 1, 20, 10, 20, 255, 31, 10, 20, 255]).unwrap());
        let mut pass = BlockPass::new(src, 2, BlockMask::Full, 10);
        assert_eq!(pass.units(), 1);
        pass.run_unit(0);
        // (0 + 10 + 20 + 31) / 4 = 15.25
        assert_eq!(pass.output().at(0, 0), [15, 10, 20, 255]);
        assert_eq!(pass.output().at(1, 0), [15, 10, 20, 1]);
    }

    #[test]
    fn test_partial_blocks_counted() {
        let src = numbered(5, 3);
        let pass = BlockPass::new(src, 2, BlockMask::Full, 10);
        assert_eq!(pass.units(), 6);
    }

    #[test]
    fn test_disc_mask_on_white() {
        let src = Arc::new(PixelBuffer::filled(6, 6, [10, 20, 30, 100]).unwrap());
        let out = drain(PassJob::boxed(BlockPass::new(src, 6, BlockMask::Disc, 50)));
        assert_eq!(out.at(3, 3), [10, 20, 30, 255]);
        assert_eq!(out.at(0, 0), [255, 255, 255, 255]);
    }
}
