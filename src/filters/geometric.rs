//! Geometric filters: Rotation, Perspective, Fisheye, Barrel Distortion,
//! Wave Distortion, Swirl.
//!
//! Every filter is an inverse map: for each destination pixel it returns the
//! source coordinate to copy, sampled nearest-neighbour.
//!
//! | Filter | Off raster |
//! |--------|------------|
//! | rotation, perspective, barrel | opaque black |
//! | fisheye, wave, swirl | pixel keeps its value |

use std::sync::Arc;

use crate::buffer::PixelBuffer;
use crate::engine::resample::{Outside, RemapPass};
use crate::engine::{Job, PassJob, Site};

/// Raster centre `(w / 2, h / 2)`.
#[inline]
fn centre(input: &PixelBuffer) -> (f64, f64) {
    (input.width() as f64 / 2.0, input.height() as f64 / 2.0)
}

fn remap<F>(input: Arc<PixelBuffer>, outside: Outside, map: F) -> Box<dyn Job>
where
    F: Fn(Site) -> Option<(f64, f64)> + Send + Sync + 'static,
{
    PassJob::boxed(RemapPass::new(input, outside, map))
}

// ============================================================================
// Affine
// ============================================================================

/// Rotate around the centre by `degrees`.
pub fn rotation(input: Arc<PixelBuffer>, degrees: f64) -> Box<dyn Job> {
    let (cx, cy) = centre(&input);
    let (sin, cos) = degrees.to_radians().sin_cos();
    remap(input, Outside::Black, move |site| {
        let dx = site.xf() - cx;
        let dy = site.yf() - cy;
        Some((dx * cos - dy * sin + cx, dx * sin + dy * cos + cy))
    })
}

/// Horizontal squeeze that grows linearly toward the bottom row.
///
/// # Arguments
/// * `amount` - Squeeze at the bottom edge, 0 = none, 1 = full
pub fn perspective(input: Arc<PixelBuffer>, amount: f64) -> Box<dyn Job> {
    let width = input.width() as f64;
    let height = input.height() as f64;
    remap(input, Outside::Black, move |site| {
        let scale = 1.0 - (site.yf() / height) * amount;
        Some(((site.xf() - width / 2.0) * scale + width / 2.0, site.yf()))
    })
}

// ============================================================================
// Radial Lenses
// ============================================================================

/// Fisheye lens inside the inscribed circle.
///
/// Normalized radius `r` samples from `r^2 * s + r * (1 - s)`. The exact
/// centre and everything outside the circle are left as is.
pub fn fisheye(input: Arc<PixelBuffer>, strength: f64) -> Box<dyn Job> {
    let (cx, cy) = centre(&input);
    let max_radius = cx.min(cy);
    remap(input, Outside::Identity, move |site| {
        let dx = site.xf() - cx;
        let dy = site.yf() - cy;
        let d = dx.hypot(dy);
        if d >= max_radius || d == 0.0 {
            return None;
        }
        let r = d / max_radius;
        let scale = (r * r * strength + r * (1.0 - strength)) / r;
        Some((cx + dx * scale, cy + dy * scale))
    })
}

/// Radial barrel (positive) or pincushion (negative) distortion.
pub fn barrel_distortion(input: Arc<PixelBuffer>, distortion: f64) -> Box<dyn Job> {
    let (cx, cy) = centre(&input);
    remap(input, Outside::Black, move |site| {
        let dx = (site.xf() - cx) / cx;
        let dy = (site.yf() - cy) / cy;
        let d = dx.hypot(dy);
        let scale = if d == 0.0 { 1.0 } else { d * (1.0 + distortion * d * d) / d };
        Some((cx + dx * cx * scale, cy + dy * cy * scale))
    })
}

/// Rotate pixels around the centre, most strongly near it.
pub fn swirl(input: Arc<PixelBuffer>, strength: f64) -> Box<dyn Job> {
    let (cx, cy) = centre(&input);
    let max_radius = cx.min(cy);
    remap(input, Outside::Identity, move |site| {
        let dx = site.xf() - cx;
        let dy = site.yf() - cy;
        let d = dx.hypot(dy);
        if d >= max_radius {
            return None;
        }
        let angle = dy.atan2(dx) + (max_radius - d) / max_radius * strength;
        let (sin, cos) = angle.sin_cos();
        Some((cx + d * cos, cy + d * sin))
    })
}

// ============================================================================
// Wave
// ============================================================================

/// Sine displacement: x shifts with the row, y with the column.
///
/// # Arguments
/// * `amplitude` - Peak displacement in pixels
/// * `frequency` - Radians per pixel
pub fn wave_distortion(input: Arc<PixelBuffer>, amplitude: f64, frequency: f64) -> Box<dyn Job> {
    remap(input, Outside::Identity, move |site| {
        Some((
            site.xf() + (site.yf() * frequency).sin() * amplitude,
            site.yf() + (site.xf() * frequency).sin() * amplitude,
        ))
    })
}
