//! Vintage filters: Vintage Film, Faded, Vignette, Film Grain,
//! High Contrast B&W.

use crate::buffer::{luma, round_half_up, store, PixelBuffer};
use crate::color::Hsv;
use crate::engine::Job;
use crate::filters::color_science::with_hsv;
use crate::filters::{map_rgb, pointwise};
use crate::noise::site_uniform;

/// Contrast stretch around mid-gray on the [0, 1] scale.
#[inline]
fn stretch(v: f64, factor: f64) -> f64 {
    ((v / 255.0 - 0.5) * factor + 0.5) * 255.0
}

// ============================================================================
// Vintage Film
// ============================================================================

/// Warm tone curve, then a 30% sepia mix blended with the input.
///
/// Tone and sepia run in one float pass; only the final blend is stored, so
/// tone values past either end of the 8-bit range still reach the sepia mix.
pub fn vintage_film(input: &PixelBuffer, intensity: f64) -> Box<dyn Job> {
    pointwise(input, move |p, _| {
        let r = stretch(p[0] as f64 * 1.1 + 20.0, 1.2);
        let g = stretch(p[1] as f64 * 0.95 + 10.0, 1.2);
        let b = stretch(p[2] as f64 * 0.8 - 10.0, 1.2);
        let sepia = [
            (r * 0.393 + g * 0.769 + b * 0.189) * 0.3 + r * 0.7,
            (r * 0.349 + g * 0.686 + b * 0.168) * 0.3 + g * 0.7,
            (r * 0.272 + g * 0.534 + b * 0.131) * 0.3 + b * 0.7,
        ];
        let out = |c: usize| store(round_half_up(sepia[c] * intensity + p[c] as f64 * (1.0 - intensity)));
        [out(0), out(1), out(2), p[3]]
    })
}

// ============================================================================
// Faded
// ============================================================================

/// Washed-out look: lower saturation, lifted value, white overlay.
///
/// # Arguments
/// * `amount` - Fade strength in [0.1, 1]
pub fn faded(input: &PixelBuffer, amount: f64) -> Box<dyn Job> {
    let overlay = amount * 0.2;
    pointwise(input, move |p, _| {
        let washed = with_hsv(p, |hsv| Hsv {
            h: hsv.h,
            s: hsv.s * (1.0 - amount * 0.7),
            v: hsv.v * (1.0 - amount * 0.3) + amount * 0.3,
        });
        map_rgb(washed, |v| store(round_half_up(v * (1.0 - overlay) + 255.0 * overlay)))
    })
}

// ============================================================================
// Vignette
// ============================================================================

/// Quadratic darkening toward the corners.
pub fn vignette(input: &PixelBuffer, intensity: f64) -> Box<dyn Job> {
    let cx = input.width() as f64 / 2.0;
    let cy = input.height() as f64 / 2.0;
    let max_distance = cx.hypot(cy);
    pointwise(input, move |p, site| {
        let d = (site.xf() - cx).hypot(site.yf() - cy) / max_distance;
        let factor = 1.0 - d * d * intensity;
        map_rgb(p, |v| store(round_half_up(v * factor)))
    })
}

// ============================================================================
// Film Grain
// ============================================================================

/// Seeded luminance grain: one offset per pixel, shared by r, g and b.
pub fn film_grain(input: &PixelBuffer, amount: f64, seed: u64) -> Box<dyn Job> {
    pointwise(input, move |p, site| {
        let noise = (site_uniform(seed, site.index, 0) - 0.5) * amount * 100.0;
        map_rgb(p, |v| store(v + noise))
    })
}

// ============================================================================
// High Contrast B&W
// ============================================================================

/// Luma stretched by `contrast` around mid-gray, opaque.
pub fn high_contrast_bw(input: &PixelBuffer, contrast: f64) -> Box<dyn Job> {
    pointwise(input, move |p, _| {
        let v = store(stretch(luma(p) as f64, contrast));
        [v, v, v, 255]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::drain;

    #[test]
    fn test_vintage_film_white() {
        let input = PixelBuffer::filled(3, 3, [255, 255, 255, 90]).unwrap();
        let out = drain(vintage_film(&input, 1.0));
        // Tone (335.1, 277.2, 207.3) feeds the sepia mix unclamped; blue ~= 225.01
        assert_eq!(out.at(1, 1), [255, 255, 225, 90]);
    }

    #[test]
    fn test_vintage_film_keeps_tone_out_of_range() {
        let light = PixelBuffer::filled(3, 3, [200, 180, 160, 255]).unwrap();
        assert_eq!(drain(vintage_film(&light, 1.0)).at(1, 1), [255, 207, 138, 255]);
        // Tone (11.7, -7.8, -37.5): the negative channels pull red down to 5.64
        let dark = PixelBuffer::filled(3, 3, [10, 5, 0, 255]).unwrap();
        assert_eq!(drain(vintage_film(&dark, 1.0)).at(1, 1), [6, 0, 0, 255]);
    }

    #[test]
    fn test_vintage_film_zero_intensity_is_input() {
        let input = PixelBuffer::filled(3, 3, [40, 120, 200, 255]).unwrap();
        assert_eq!(drain(vintage_film(&input, 0.0)), input);
    }

    #[test]
    fn test_faded_gray() {
        let input = PixelBuffer::filled(2, 2, [100, 100, 100, 60]).unwrap();
        let out = drain(faded(&input, 0.5));
        // v -> 0.4833 (123), then 10% white overlay
        assert_eq!(out.at(0, 0), [136, 136, 136, 60]);
    }

    #[test]
    fn test_vignette_centre_and_corner() {
        let input = PixelBuffer::filled(4, 4, [100, 100, 100, 255]).unwrap();
        let out = drain(vignette(&input, 0.8));
        assert_eq!(out.at(2, 2), [100, 100, 100, 255]);
        assert_eq!(out.at(0, 0), [20, 20, 20, 255]);
    }

    #[test]
    fn test_film_grain_is_monochrome() {
        let input = PixelBuffer::filled(8, 8, [128, 128, 128, 255]).unwrap();
        let out = drain(film_grain(&input, 0.3, 7));
        let mut changed = false;
        for y in 0..8 {
            for x in 0..8 {
                let p = out.at(x, y);
                assert!(p[0] == p[1] && p[1] == p[2]);
                assert!((113..=143).contains(&p[0]));
                changed |= p[0] != 128;
            }
        }
        assert!(changed);
    }

    #[test]
    fn test_high_contrast_bw() {
        let input = PixelBuffer::from_rgba(2, 1, vec![100, 100, 100, 9, 250, 250, 250, 9]).unwrap();
        let out = drain(high_contrast_bw(&input, 3.0));
        // 3v - 255
        assert_eq!(out.at(0, 0), [45, 45, 45, 255]);
        assert_eq!(out.at(1, 0), [255, 255, 255, 255]);
    }
}
