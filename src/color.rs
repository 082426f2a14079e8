//! RGB <-> HSV conversion for the hue and saturation family of filters.
//!
//! Hue is kept as an unrounded degree value in [0, 360) so that a round
//! trip through HSV reproduces the original 8-bit channels.

use crate::buffer::{round_half_up, store};

/// Hue in degrees [0, 360), saturation and value in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

/// Convert 8-bit RGB to HSV.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let mut h = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / diff).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / diff + 2.0)
    } else {
        60.0 * ((r - g) / diff + 4.0)
    };
    if h >= 360.0 {
        h -= 360.0;
    }

    let s = if max == 0.0 { 0.0 } else { diff / max };

    Hsv { h, s, v: max }
}

/// Convert HSV back to 8-bit RGB.
///
/// Hue outside [0, 360) is wrapped; channels are rounded to nearest.
pub fn hsv_to_rgb(hsv: Hsv) -> [u8; 3] {
    let h = hsv.h.rem_euclid(360.0);
    let c = hsv.v * hsv.s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = hsv.v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    [
        store(round_half_up((r + m) * 255.0)),
        store(round_half_up((g + m) * 255.0)),
        store(round_half_up((b + m) * 255.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::SimpleRng;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_primaries() {
        let red = rgb_to_hsv(255, 0, 0);
        assert_abs_diff_eq!(red.h, 0.0);
        assert_abs_diff_eq!(red.s, 1.0);
        assert_abs_diff_eq!(red.v, 1.0);

        let green = rgb_to_hsv(0, 255, 0);
        assert_abs_diff_eq!(green.h, 120.0);

        let blue = rgb_to_hsv(0, 0, 255);
        assert_abs_diff_eq!(blue.h, 240.0);
    }

    #[test]
    fn test_magenta_wraps_to_positive_hue() {
        let hsv = rgb_to_hsv(255, 0, 128);
        assert!(hsv.h > 300.0 && hsv.h < 360.0);
    }

    #[test]
    fn test_gray_has_no_saturation() {
        let hsv = rgb_to_hsv(90, 90, 90);
        assert_abs_diff_eq!(hsv.s, 0.0);
        assert_abs_diff_eq!(hsv.h, 0.0);
        assert_eq!(hsv_to_rgb(hsv), [90, 90, 90]);
    }

    #[test]
    fn test_black() {
        let hsv = rgb_to_hsv(0, 0, 0);
        assert_abs_diff_eq!(hsv.v, 0.0);
        assert_eq!(hsv_to_rgb(hsv), [0, 0, 0]);
    }

    #[test]
    fn test_hue_wraps_past_360() {
        let rgb = hsv_to_rgb(Hsv { h: 480.0, s: 1.0, v: 1.0 });
        assert_eq!(rgb, hsv_to_rgb(Hsv { h: 120.0, s: 1.0, v: 1.0 }));
        assert_eq!(rgb, [0, 255, 0]);
    }

    #[test]
    fn test_round_trip_random_triples() {
        let mut rng = SimpleRng::new(2024);
        for _ in 0..10_000 {
            let r = (rng.next_u64() & 0xFF) as u8;
            let g = (rng.next_u64() & 0xFF) as u8;
            let b = (rng.next_u64() & 0xFF) as u8;
            let [r2, g2, b2] = hsv_to_rgb(rgb_to_hsv(r, g, b));
            assert!((r as i16 - r2 as i16).abs() <= 1, "r {} -> {}", r, r2);
            assert!((g as i16 - g2 as i16).abs() <= 1, "g {} -> {}", g, g2);
            assert!((b as i16 - b2 as i16).abs() <= 1, "b {} -> {}", b, b2);
        }
    }
}
