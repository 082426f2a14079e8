//! Color science filters: Hue Shift, Saturation, Selective Color,
//! Complementary Color.
//!
//! These filters round-trip every pixel through HSV
//! (see [`crate::color`]). Alpha is preserved.

use crate::buffer::{PixelBuffer, Rgba};
use crate::color::{hsv_to_rgb, rgb_to_hsv, Hsv};
use crate::engine::Job;
use crate::filters::color_adjust::gray_pixel;
use crate::filters::pointwise;

/// Run `f` on the pixel's HSV form and convert back, keeping alpha.
#[inline]
pub fn with_hsv(pixel: Rgba, f: impl Fn(Hsv) -> Hsv) -> Rgba {
    let [r, g, b] = hsv_to_rgb(f(rgb_to_hsv(pixel[0], pixel[1], pixel[2])));
    [r, g, b, pixel[3]]
}

/// Circular distance between two hues, in degrees [0, 180].
#[inline]
pub fn hue_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs().rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

// ============================================================================
// Hue
// ============================================================================

/// Rotate hue by `degrees`; the result wraps into [0, 360).
pub fn hue_shift(input: &PixelBuffer, degrees: f64) -> Box<dyn Job> {
    pointwise(input, move |p, _| {
        with_hsv(p, |hsv| Hsv {
            h: hsv.h + degrees,
            ..hsv
        })
    })
}

/// Hue rotated by 180 degrees.
pub fn complementary_color(input: &PixelBuffer) -> Box<dyn Job> {
    hue_shift(input, 180.0)
}

// ============================================================================
// Saturation
// ============================================================================

/// Multiply HSV saturation by `factor`, capped at 1.
pub fn saturation_enhance(input: &PixelBuffer, factor: f64) -> Box<dyn Job> {
    pointwise(input, move |p, _| {
        with_hsv(p, |hsv| Hsv {
            s: (hsv.s * factor).clamp(0.0, 1.0),
            ..hsv
        })
    })
}

// ============================================================================
// Selective Color
// ============================================================================

/// Keep pixels whose hue lies within `tolerance` of `target`; others turn
/// to luma gray.
///
/// # Arguments
/// * `target` - Hue in degrees to preserve
/// * `tolerance` - Maximum circular hue distance that is kept
pub fn selective_color(input: &PixelBuffer, target: f64, tolerance: f64) -> Box<dyn Job> {
    pointwise(input, move |p, _| {
        let hsv = rgb_to_hsv(p[0], p[1], p[2]);
        if hue_distance(hsv.h, target) > tolerance {
            gray_pixel(p)
        } else {
            p
        }
    })
}
