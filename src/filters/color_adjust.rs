//! Color adjustment filters: Grayscale, Invert, Brightness, Contrast,
//! Color Balance, Quantization.
//!
//! These are pixel-wise operations that don't require spatial context.
//! Alpha is always preserved unchanged.

use crate::buffer::{luma, round_half_up, store, PixelBuffer, Rgba};
use crate::engine::Job;
use crate::filters::{map_rgb, pointwise};

// ============================================================================
// Grayscale / Invert
// ============================================================================

/// Rec. 601 luma written to all three colour channels.
#[inline]
pub fn gray_pixel(pixel: Rgba) -> Rgba {
    let g = luma(pixel);
    [g, g, g, pixel[3]]
}

#[inline]
pub fn invert_pixel(pixel: Rgba) -> Rgba {
    [255 - pixel[0], 255 - pixel[1], 255 - pixel[2], pixel[3]]
}

pub fn grayscale(input: &PixelBuffer) -> Box<dyn Job> {
    pointwise(input, |p, _| gray_pixel(p))
}

pub fn invert(input: &PixelBuffer) -> Box<dyn Job> {
    pointwise(input, |p, _| invert_pixel(p))
}

// ============================================================================
// Brightness
// ============================================================================

/// Adjust image brightness.
///
/// # Arguments
/// * `input` - RGBA image
/// * `amount` - Percentage, -100 (black) to 100 (white); 0 = no change
pub fn brightness(input: &PixelBuffer, amount: f64) -> Box<dyn Job> {
    let offset = amount * 2.55;
    pointwise(input, move |p, _| map_rgb(p, |v| store(v + offset)))
}

// ============================================================================
// Contrast
// ============================================================================

/// Classic contrast factor `259(c + 255) / (255(259 - c))`.
///
/// The singularity at `c = 259` lies outside the parameter range.
#[inline]
pub fn contrast_factor(amount: f64) -> f64 {
    (259.0 * (amount + 255.0)) / (255.0 * (259.0 - amount))
}

/// Adjust image contrast around mid-gray 128.
///
/// # Arguments
/// * `input` - RGBA image
/// * `amount` - -100 (flat gray) to 100 (maximum); 0 = no change
pub fn contrast(input: &PixelBuffer, amount: f64) -> Box<dyn Job> {
    let factor = contrast_factor(amount);
    pointwise(input, move |p, _| map_rgb(p, |v| store(factor * (v - 128.0) + 128.0)))
}

// ============================================================================
// Color Balance
// ============================================================================

/// Warm/cool temperature shift.
///
/// Positive temperature scales red up and blue down by up to 30%.
pub fn color_balance(input: &PixelBuffer, temperature: f64) -> Box<dyn Job> {
    let t = temperature / 100.0;
    let red = 1.0 + t * 0.3;
    let blue = 1.0 - t * 0.3;
    pointwise(input, move |p, _| {
        [
            store(p[0] as f64 * red),
            p[1],
            store(p[2] as f64 * blue),
            p[3],
        ]
    })
}

// ============================================================================
// Quantization
// ============================================================================

/// Floor every channel to a multiple of `256 / levels`.
pub fn color_quantization(input: &PixelBuffer, levels: f64) -> Box<dyn Job> {
    let step = 256.0 / levels;
    pointwise(input, move |p, _| map_rgb(p, |v| store((v / step).floor() * step)))
}

/// Snap a channel to the nearest of `levels` evenly spaced values in [0, 255].
#[inline]
pub fn posterize_channel(v: u8, levels: f64) -> u8 {
    let step = 255.0 / (levels - 1.0);
    store(round_half_up(round_half_up(v as f64 / step) * step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::drain;
    use crate::noise::SimpleRng;

    fn random_buffer(width: usize, height: usize) -> PixelBuffer {
        let mut rng = SimpleRng::new(99);
        PixelBuffer::from_fn(width, height, |_, _| {
            let v = rng.next_u64();
            [v as u8, (v >> 8) as u8, (v >> 16) as u8, (v >> 24) as u8]
        })
        .unwrap()
    }

    #[test]
    fn test_grayscale_reference_values() {
        let input = PixelBuffer::from_rgba(
            2,
            2,
            vec![255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255],
        )
        .unwrap();
        let out = drain(grayscale(&input));
        assert_eq!(out.at(0, 0), [76, 76, 76, 255]);
        assert_eq!(out.at(1, 0), [150, 150, 150, 255]);
        assert_eq!(out.at(0, 1), [29, 29, 29, 255]);
        assert_eq!(out.at(1, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn test_grayscale_channels_equal() {
        let out = drain(grayscale(&random_buffer(31, 17)));
        for y in 0..17 {
            for x in 0..31 {
                let p = out.at(x, y);
                assert!(p[0] == p[1] && p[1] == p[2]);
            }
        }
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let input = random_buffer(40, 25);
        let once = drain(invert(&input));
        assert_ne!(once, input);
        assert_eq!(drain(invert(&once)), input);
    }

    #[test]
    fn test_brightness_clamps() {
        let input = PixelBuffer::filled(2, 2, [250, 10, 128, 77]).unwrap();
        let out = drain(brightness(&input, 10.0));
        // 10 * 2.55 = 25.5; 128 + 25.5 rounds half to even
        assert_eq!(out.at(0, 0), [255, 36, 154, 77]);
        let out = drain(brightness(&input, -100.0));
        assert_eq!(out.at(1, 1), [0, 0, 0, 77]);
    }

    #[test]
    fn test_contrast_zero_is_identity_on_mid_gray() {
        let input = PixelBuffer::filled(4, 4, [128, 128, 128, 255]).unwrap();
        assert_eq!(drain(contrast(&input, 0.0)), input);
    }

    #[test]
    fn test_contrast_zero_is_identity() {
        assert_eq!(contrast_factor(0.0), 1.0);
        let input = random_buffer(8, 8);
        assert_eq!(drain(contrast(&input, 0.0)), input);
    }

    #[test]
    fn test_contrast_full_negative_flattens() {
        let input = PixelBuffer::filled(1, 1, [0, 255, 100, 255]).unwrap();
        let out = drain(contrast(&input, -100.0));
        // factor = 259 * 155 / (255 * 359) ~= 0.4385
        assert_eq!(out.at(0, 0), [72, 184, 116, 255]);
    }

    #[test]
    fn test_color_balance_warm() {
        let input = PixelBuffer::filled(1, 1, [100, 100, 100, 255]).unwrap();
        let out = drain(color_balance(&input, 100.0));
        assert_eq!(out.at(0, 0), [130, 100, 70, 255]);
    }

    #[test]
    fn test_quantization_levels() {
        let input = PixelBuffer::from_rgba(1, 1, vec![31, 32, 255, 9]).unwrap();
        let out = drain(color_quantization(&input, 8.0));
        assert_eq!(out.at(0, 0), [0, 32, 224, 9]);
    }

    #[test]
    fn test_posterize_channel() {
        // step = 255 / 7 ~= 36.43
        assert_eq!(posterize_channel(0, 8.0), 0);
        assert_eq!(posterize_channel(20, 8.0), 36);
        assert_eq!(posterize_channel(255, 8.0), 255);
        assert_eq!(posterize_channel(100, 2.0), 0);
        assert_eq!(posterize_channel(128, 2.0), 255);
    }
}
