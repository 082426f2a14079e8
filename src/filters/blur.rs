//! Blur filters: box, gaussian, motion, radial, median and bilateral.
//!
//! | Filter | Engine | Border |
//! |--------|--------|--------|
//! | box | convolution | in-range taps, renormalized |
//! | gaussian | convolution | in-range taps, not renormalized |
//! | motion / radial | accumulate | in-range samples averaged |
//! | median | convolution | in-range taps |
//! | bilateral | convolution | in-range taps |

use std::sync::Arc;

use crate::buffer::PixelBuffer;
use crate::engine::convolution::{ConvolutionPass, Edges, Finish, Kernel, Reducer};
use crate::engine::resample::AccumulatePass;
use crate::engine::{Job, PassJob, YIELD_PIXELS};
use crate::filters::whole;

// ============================================================================
// Linear Blurs
// ============================================================================

/// Box blur over a `(2r+1)^2` window, averaged over the in-range pixels.
pub fn box_blur(input: Arc<PixelBuffer>, radius: f64) -> Box<dyn Job> {
    PassJob::boxed(ConvolutionPass::new(
        input,
        Reducer::Linear {
            kernel: Kernel::box_filter(whole(radius)),
            edges: Edges::Normalize,
            finish: Finish::Round,
        },
    ))
}

/// Gaussian blur with `sigma = radius / 3`.
///
/// Taps that fall off the raster are dropped without renormalizing, so
/// borders darken slightly.
pub fn gaussian_blur(input: Arc<PixelBuffer>, radius: f64) -> Box<dyn Job> {
    PassJob::boxed(
        ConvolutionPass::new(
            input,
            Reducer::Linear {
                kernel: Kernel::gaussian(radius),
                edges: Edges::Crop,
                finish: Finish::Round,
            },
        )
        .yielding_every(YIELD_PIXELS),
    )
}

// ============================================================================
// Directional Blurs
// ============================================================================

/// Average of `distance` samples stepping along `angle` degrees.
///
/// # Arguments
/// * `distance` - Number of samples, starting at the pixel itself
/// * `angle` - Direction in degrees, 0 = +x, 90 = +y
pub fn motion_blur(input: Arc<PixelBuffer>, distance: f64, angle: f64) -> Box<dyn Job> {
    let (dy, dx) = angle.to_radians().sin_cos();
    let samples = distance.max(0.0).ceil() as usize;
    PassJob::boxed(AccumulatePass::new(input, move |site, path| {
        for i in 0..samples {
            let i = i as f64;
            path.push((site.xf() + dx * i, site.yf() + dy * i));
        }
    }))
}

/// Zoom blur toward the centre, stronger with distance from it.
///
/// A pixel at distance `d` averages `ceil(d / dmax * strength)` samples on
/// the segment from the centre to itself; the centre pixel is unchanged.
pub fn radial_blur(input: Arc<PixelBuffer>, strength: f64) -> Box<dyn Job> {
    let cx = input.width() as f64 / 2.0;
    let cy = input.height() as f64 / 2.0;
    let max_distance = cx.hypot(cy);
    PassJob::boxed(AccumulatePass::new(input, move |site, path| {
        let dx = site.xf() - cx;
        let dy = site.yf() - cy;
        let amount = dx.hypot(dy) / max_distance * strength;
        if amount.is_nan() || amount <= 0.0 {
            return;
        }
        let samples = amount.ceil() as usize;
        for i in 0..samples {
            let t = i as f64 / amount;
            path.push((cx + dx * t, cy + dy * t));
        }
    }))
}

// ============================================================================
// Rank and Edge-Preserving
// ============================================================================

/// Per-channel median over the in-range window.
pub fn median_filter(input: Arc<PixelBuffer>, radius: f64) -> Box<dyn Job> {
    PassJob::boxed(ConvolutionPass::new(input, Reducer::Median { radius: whole(radius) }))
}

/// Bilateral filter.
///
/// # Arguments
/// * `spatial_sigma` - Spatial falloff; window radius is `ceil(2 * sigma)`
/// * `intensity_sigma` - Falloff on RGB distance to the centre pixel
pub fn bilateral_filter(input: Arc<PixelBuffer>, spatial_sigma: f64, intensity_sigma: f64) -> Box<dyn Job> {
    PassJob::boxed(ConvolutionPass::new(
        input,
        Reducer::Bilateral {
            spatial_sigma,
            intensity_sigma,
        },
    ))
}
