//! Convolution engine: neighbourhood filters.
//!
//! A [`ConvolutionPass`] walks every pixel and hands its window to a
//! [`Reducer`]. Linear reducers apply a [`Kernel`]; the others replace the
//! weighted sum with a rank, edge or histogram statistic.
//!
//! ## Border policies
//!
//! | Policy | Border pixels | Out-of-range taps |
//! |--------|---------------|-------------------|
//! | [`Edges::Interior`] | copied from the base buffer | never read |
//! | [`Edges::Crop`] | processed | dropped, no renormalization |
//! | [`Edges::Normalize`] | processed | dropped, divided by in-range weight |
//!
//! Each filter keeps the policy it has always used; mixing them changes
//! edge pixels, so they are not unified.

use std::sync::Arc;

use ndarray::{Array2, ArrayView3};

use crate::buffer::{luma, round_half_up, store, PixelBuffer, Rgba};
use crate::engine::{Pass, Site, YIELD_PIXELS, YIELD_PIXELS_HEAVY};

// ============================================================================
// Kernel
// ============================================================================

/// Square, odd-sized weight matrix with an optional output bias.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Array2<f64>,
    bias: f64,
}

impl Kernel {
    /// Build from explicit rows. `N` must be odd.
    pub fn from_rows<const N: usize>(rows: [[f64; N]; N]) -> Self {
        debug_assert!(N % 2 == 1, "kernel size must be odd");
        let weights = Array2::from_shape_fn((N, N), |(y, x)| rows[y][x]);
        Kernel { weights, bias: 0.0 }
    }

    /// Add a constant to every output channel.
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Uniform (2r+1)x(2r+1) box of ones.
    pub fn box_filter(radius: usize) -> Self {
        let size = radius * 2 + 1;
        Kernel {
            weights: Array2::<f64>::ones((size, size)),
            bias: 0.0,
        }
    }

    /// Normalized 2D Gaussian.
    ///
    /// Size is `ceil(2 * radius) * 2 + 1` and `sigma = radius / 3`.
    pub fn gaussian(radius: f64) -> Self {
        let half = (radius * 2.0).ceil().max(0.0) as usize;
        let size = half * 2 + 1;
        let sigma = radius / 3.0;

        if sigma <= 0.0 {
            return Kernel::from_rows([[1.0]]);
        }

        let mut weights = Array2::from_shape_fn((size, size), |(i, j)| {
            let x = i as f64 - half as f64;
            let y = j as f64 - half as f64;
            (-(x * x + y * y) / (2.0 * sigma * sigma)).exp()
        });

        // Normalize
        let sum = weights.sum();
        weights.mapv_inplace(|w| w / sum);

        Kernel { weights, bias: 0.0 }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.weights.nrows()
    }

    #[inline]
    pub fn half(&self) -> usize {
        self.size() / 2
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }
}

/// How a linear kernel treats taps that fall outside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edges {
    /// Only pixels with a full window are processed.
    Interior,
    /// Missing taps contribute nothing.
    Crop,
    /// Missing taps are dropped and the sum divided by the in-range weight.
    Normalize,
}

/// How a linear sum becomes a channel value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Finish {
    /// `store(sum + bias)`
    Store,
    /// `store(round(sum + bias))`
    Round,
    /// `store(source + sum * strength)`
    AddToSource(f64),
}

/// Per-pixel statistic computed over the window.
#[derive(Debug, Clone)]
pub enum Reducer {
    /// Weighted sum of RGB.
    Linear {
        kernel: Kernel,
        edges: Edges,
        finish: Finish,
    },
    /// Per-channel lower median of the in-range window.
    Median { radius: usize },
    /// Edge-preserving smoothing.
    Bilateral {
        spatial_sigma: f64,
        intensity_sigma: f64,
    },
    /// Modal luminance bin of the in-range window.
    OilPaint { radius: usize },
    /// Binary Sobel magnitude on luma, interior only.
    Sobel { threshold: f64 },
}

// ============================================================================
// Convolution Pass
// ============================================================================

const SOBEL_X: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Precomputed per-reducer tables.
enum Plan {
    Linear {
        kernel: Kernel,
        edges: Edges,
        finish: Finish,
    },
    Median {
        radius: isize,
    },
    Bilateral {
        radius: isize,
        spatial: Array2<f64>,
        intensity_denom: f64,
    },
    OilPaint {
        radius: isize,
    },
    Sobel {
        luma: Array2<u8>,
        threshold: f64,
    },
}

/// Neighbourhood filter over one source buffer.
pub struct ConvolutionPass {
    source: Arc<PixelBuffer>,
    output: PixelBuffer,
    plan: Plan,
    yield_every: usize,
}

impl ConvolutionPass {
    /// # Arguments
    /// * `source` - Buffer read for every window
    /// * `reducer` - Statistic computed per pixel
    ///
    /// The output starts as a copy of `source`, so pixels a reducer skips
    /// keep their source value.
    pub fn new(source: Arc<PixelBuffer>, reducer: Reducer) -> Self {
        let output = (*source).clone();
        Self::with_base(source, &output, reducer)
    }

    /// Like [`ConvolutionPass::new`], but skipped pixels come from `base`.
    pub fn with_base(source: Arc<PixelBuffer>, base: &PixelBuffer, reducer: Reducer) -> Self {
        debug_assert_eq!(source.width(), base.width());
        debug_assert_eq!(source.height(), base.height());

        let (plan, yield_every) = match reducer {
            Reducer::Linear {
                kernel,
                edges,
                finish,
            } => (
                Plan::Linear {
                    kernel,
                    edges,
                    finish,
                },
                YIELD_PIXELS_HEAVY,
            ),
            Reducer::Median { radius } => (
                Plan::Median {
                    radius: radius as isize,
                },
                YIELD_PIXELS,
            ),
            Reducer::Bilateral {
                spatial_sigma,
                intensity_sigma,
            } => {
                let radius = (spatial_sigma * 2.0).ceil().max(0.0) as isize;
                let size = (radius * 2 + 1) as usize;
                let spatial = Array2::from_shape_fn((size, size), |(j, i)| {
                    let dx = i as f64 - radius as f64;
                    let dy = j as f64 - radius as f64;
                    (-(dx * dx + dy * dy) / (2.0 * spatial_sigma * spatial_sigma)).exp()
                });
                (
                    Plan::Bilateral {
                        radius,
                        spatial,
                        intensity_denom: 2.0 * intensity_sigma * intensity_sigma,
                    },
                    YIELD_PIXELS_HEAVY,
                )
            }
            Reducer::OilPaint { radius } => (
                Plan::OilPaint {
                    radius: radius as isize,
                },
                YIELD_PIXELS,
            ),
            Reducer::Sobel { threshold } => (
                Plan::Sobel {
                    luma: luma_plane(source.view()),
                    threshold,
                },
                YIELD_PIXELS_HEAVY,
            ),
        };

        ConvolutionPass {
            source,
            output: base.clone(),
            plan,
            yield_every,
        }
    }

    /// Override the base yield interval.
    pub fn yielding_every(mut self, units: usize) -> Self {
        self.yield_every = units.max(1);
        self
    }
}

impl Pass for ConvolutionPass {
    fn units(&self) -> usize {
        self.source.pixel_count()
    }

    fn yield_every(&self) -> usize {
        self.yield_every
    }

    fn run_unit(&mut self, unit: usize) {
        let site = Site::new(unit, self.source.width());
        let src = &*self.source;
        let pixel = match &self.plan {
            Plan::Linear {
                kernel,
                edges,
                finish,
            } => linear(src, site, kernel, *edges, *finish),
            Plan::Median { radius } => Some(median(src, site, *radius)),
            Plan::Bilateral {
                radius,
                spatial,
                intensity_denom,
            } => Some(bilateral(src, site, *radius, spatial, *intensity_denom)),
            Plan::OilPaint { radius } => Some(oil_paint(src, site, *radius)),
            Plan::Sobel { luma, threshold } => sobel(luma, site, *threshold),
        };
        if let Some(pixel) = pixel {
            self.output.put(site.x, site.y, pixel);
        }
    }

    fn output(&self) -> &PixelBuffer {
        &self.output
    }

    fn into_output(self: Box<Self>) -> PixelBuffer {
        self.output
    }
}

// ============================================================================
// Reducers
// ============================================================================

#[inline]
fn is_interior(site: Site, half: usize, width: usize, height: usize) -> bool {
    site.x >= half && site.y >= half && site.x + half < width && site.y + half < height
}

/// Weighted RGB sum. `None` leaves the base pixel in place.
fn linear(src: &PixelBuffer, site: Site, kernel: &Kernel, edges: Edges, finish: Finish) -> Option<Rgba> {
    let (width, height) = (src.width(), src.height());
    let half = kernel.half();
    if edges == Edges::Interior && !is_interior(site, half, width, height) {
        return None;
    }

    let mut sum = [0.0f64; 3];
    let mut weight_sum = 0.0;
    let size = kernel.size();
    for ky in 0..size {
        let sy = site.y as isize + ky as isize - half as isize;
        for kx in 0..size {
            let sx = site.x as isize + kx as isize - half as isize;
            let Some(px) = src.get(sx, sy) else {
                continue;
            };
            let w = kernel.weights()[[ky, kx]];
            for c in 0..3 {
                sum[c] += px[c] as f64 * w;
            }
            weight_sum += w;
        }
    }

    let center = src.at(site.x, site.y);
    let mut out = center;
    for c in 0..3 {
        let v = match edges {
            Edges::Normalize if weight_sum == 0.0 => {
                out[c] = center[c];
                continue;
            }
            Edges::Normalize => sum[c] / weight_sum,
            _ => sum[c],
        };
        out[c] = match finish {
            Finish::Store => store(v + kernel.bias()),
            Finish::Round => store(round_half_up(v + kernel.bias())),
            Finish::AddToSource(strength) => store(center[c] as f64 + v * strength),
        };
    }
    Some(out)
}

fn median(src: &PixelBuffer, site: Site, radius: isize) -> Rgba {
    let window = ((radius * 2 + 1) * (radius * 2 + 1)) as usize;
    let mut values: [Vec<u8>; 3] = [
        Vec::with_capacity(window),
        Vec::with_capacity(window),
        Vec::with_capacity(window),
    ];

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if let Some(px) = src.get(site.x as isize + dx, site.y as isize + dy) {
                for c in 0..3 {
                    values[c].push(px[c]);
                }
            }
        }
    }

    let mut out = src.at(site.x, site.y);
    for c in 0..3 {
        let channel = &mut values[c];
        channel.sort_unstable();
        out[c] = channel[(channel.len() - 1) / 2];
    }
    out
}

fn bilateral(src: &PixelBuffer, site: Site, radius: isize, spatial: &Array2<f64>, intensity_denom: f64) -> Rgba {
    let center = src.at(site.x, site.y);
    let mut sum = [0.0f64; 3];
    let mut weight_sum = 0.0;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let Some(px) = src.get(site.x as isize + dx, site.y as isize + dy) else {
                continue;
            };
            let dist_sq: f64 = (0..3)
                .map(|c| {
                    let d = px[c] as f64 - center[c] as f64;
                    d * d
                })
                .sum();
            let weight = spatial[[(dy + radius) as usize, (dx + radius) as usize]]
                * (-dist_sq / intensity_denom).exp();
            for c in 0..3 {
                sum[c] += px[c] as f64 * weight;
            }
            weight_sum += weight;
        }
    }

    if weight_sum.is_nan() || weight_sum <= 0.0 {
        return center;
    }

    let mut out = center;
    for c in 0..3 {
        out[c] = store(round_half_up(sum[c] / weight_sum));
    }
    out
}

fn oil_paint(src: &PixelBuffer, site: Site, radius: isize) -> Rgba {
    let mut counts = [0u32; 256];
    let mut totals = [[0u32; 3]; 256];

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let Some(px) = src.get(site.x as isize + dx, site.y as isize + dy) else {
                continue;
            };
            let sum = px[0] as f64 + px[1] as f64 + px[2] as f64;
            let bin = round_half_up(sum / 3.0) as usize;
            counts[bin] += 1;
            for c in 0..3 {
                totals[bin][c] += px[c] as u32;
            }
        }
    }

    // First bin wins ties
    let mut best = 0;
    let mut best_count = 0;
    for (bin, &count) in counts.iter().enumerate() {
        if count > best_count {
            best_count = count;
            best = bin;
        }
    }

    let mut out = src.at(site.x, site.y);
    if best_count == 0 {
        return out;
    }
    for c in 0..3 {
        out[c] = store(round_half_up(totals[best][c] as f64 / best_count as f64));
    }
    out
}

fn sobel(luma: &Array2<u8>, site: Site, threshold: f64) -> Option<Rgba> {
    let (height, width) = luma.dim();
    if !is_interior(site, 1, width, height) {
        return None;
    }

    let mut gx = 0.0;
    let mut gy = 0.0;
    for ky in 0..3 {
        for kx in 0..3 {
            let v = luma[[site.y + ky - 1, site.x + kx - 1]] as f64;
            gx += v * SOBEL_X[ky][kx];
            gy += v * SOBEL_Y[ky][kx];
        }
    }

    let magnitude = (gx * gx + gy * gy).sqrt();
    let edge = if magnitude > threshold { 255 } else { 0 };
    Some([edge, edge, edge, 255])
}

/// Rounded Rec. 601 luma of every pixel.
pub fn luma_plane(input: ArrayView3<u8>) -> Array2<u8> {
    let (height, width, _) = input.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        luma([input[[y, x, 0]], input[[y, x, 1]], input[[y, x, 2]], input[[y, x, 3]]])
    })
}
