//! Artistic filters: Oil Painting, Watercolor, Pencil Sketch, Cartoon,
//! Mosaic, Pointillism, Crayon, Charcoal, Woodcut, Abstract Art.
//!
//! The multi-step effects are composites; each stage owns a fixed share of
//! the progress range.

use std::sync::Arc;

use crate::buffer::{luma, round_half_up, store, PixelBuffer, Rgba};
use crate::engine::composite::{Composite, Stage};
use crate::engine::convolution::{ConvolutionPass, Reducer};
use crate::engine::pointwise::BlendPass;
use crate::engine::resample::{BlockMask, BlockPass};
use crate::engine::{Job, PassJob};
use crate::filters::blur::{bilateral_filter, gaussian_blur};
use crate::filters::color_adjust::{grayscale, invert, posterize_channel};
use crate::filters::edge::sobel_edge;
use crate::filters::{map_rgb, pointwise, whole};
use crate::noise::site_uniform;

/// Blocks between yields for mosaic.
const MOSAIC_BLOCKS: usize = 10;

/// Dots between yields for pointillism.
const POINTILLISM_DOTS: usize = 50;

/// `v * (1 - k) + effect * k`, rounded half up.
#[inline]
fn mix(effect: f64, v: f64, k: f64) -> u8 {
    store(round_half_up(effect * k + v * (1.0 - k)))
}

#[inline]
fn opaque_gray(v: u8) -> Rgba {
    [v, v, v, 255]
}

// ============================================================================
// Painting
// ============================================================================

/// Modal-luminance smoothing over a `(2b+1)^2` window.
pub fn oil_painting(input: Arc<PixelBuffer>, brush_size: f64) -> Box<dyn Job> {
    PassJob::boxed(ConvolutionPass::new(
        input,
        Reducer::OilPaint {
            radius: whole(brush_size),
        },
    ))
}

/// Soft blend with a gaussian blur, followed by a 1.3x saturation boost.
pub fn watercolor(input: Arc<PixelBuffer>, intensity: f64) -> Box<dyn Job> {
    Composite::new(
        input,
        vec![
            Stage::new("blur", 0.5, |inputs| gaussian_blur(inputs.original().clone(), 2.0)),
            Stage::new("saturate", 0.5, move |inputs| {
                PassJob::boxed(BlendPass::new(inputs.original(), inputs.stage(0).clone(), move |p, blurred, _| {
                    let mixed = [0usize, 1, 2].map(|c| mix(blurred[c] as f64, p[c] as f64, intensity));
                    let [r, g, b] = mixed.map(|v| v as f64 / 255.0);
                    let max = r.max(g).max(b);
                    let min = r.min(g).min(b);
                    if max <= 0.0 {
                        return [mixed[0], mixed[1], mixed[2], p[3]];
                    }
                    let saturation = (max - min) / max;
                    let boosted = (saturation * 1.3).min(1.0);
                    let factor = boosted / saturation;
                    let factor = if factor.is_nan() || factor == 0.0 { 1.0 } else { factor };
                    let boost = |c: f64| store(round_half_up(((c - min) * factor + min).clamp(0.0, 255.0) * 255.0));
                    [boost(r), boost(g), boost(b), p[3]]
                }))
            }),
        ],
    )
    .boxed()
}

// ============================================================================
// Drawing
// ============================================================================

/// Color-dodge pencil sketch on an opaque gray canvas.
///
/// # Arguments
/// * `intensity` - Blend between the dodge result (1) and plain gray (0)
pub fn pencil_sketch(input: Arc<PixelBuffer>, intensity: f64) -> Box<dyn Job> {
    Composite::new(
        input,
        vec![
            Stage::new("grayscale", 0.3, |inputs| grayscale(inputs.original())),
            Stage::new("invert", 0.3, |inputs| invert(inputs.stage(0))),
            Stage::new("blur", 0.2, |inputs| gaussian_blur(inputs.stage(1).clone(), 3.0)),
            Stage::new("dodge", 0.2, move |inputs| {
                PassJob::boxed(BlendPass::new(inputs.stage(0), inputs.stage(2).clone(), move |gray, blurred, _| {
                    let g = gray[0] as f64;
                    let b = blurred[0] as f64;
                    let sketch = if blurred[0] == 255 { 255.0 } else { (g * 255.0 / (255.0 - b)).min(255.0) };
                    opaque_gray(mix(sketch, g, intensity))
                }))
            }),
        ],
    )
    .boxed()
}

/// Dark strokes along edges over a faint paper texture.
pub fn charcoal(input: Arc<PixelBuffer>, intensity: f64) -> Box<dyn Job> {
    Composite::new(
        input,
        vec![
            Stage::new("grayscale", 0.3, |inputs| grayscale(inputs.original())),
            Stage::new("edges", 0.4, |inputs| sobel_edge(inputs.stage(0).clone(), 50.0)),
            Stage::new("shade", 0.3, move |inputs| {
                PassJob::boxed(BlendPass::new(inputs.stage(0), inputs.stage(1).clone(), move |gray, edges, site| {
                    let g = gray[0] as f64;
                    let stroke = (255.0 - g - edges[0] as f64 * 0.5).max(0.0);
                    let paper = (site.xf() * 0.05).sin() * (site.yf() * 0.05).sin() * 20.0;
                    let c = (stroke + paper).clamp(0.0, 255.0);
                    opaque_gray(mix(c, g, intensity))
                }))
            }),
        ],
    )
    .boxed()
}

/// Wax crayon: wavy grain plus per-pixel noise, with a mild contrast lift.
pub fn crayon(input: &PixelBuffer, intensity: f64, seed: u64) -> Box<dyn Job> {
    pointwise(input, move |p, site| {
        let waves = ((site.xf() * 0.1).sin() + (site.yf() * 0.1).sin()) * 20.0;
        let grain = site_uniform(seed, site.index, 0) * 30.0 - 15.0;
        map_rgb(p, |v| {
            let c = v + waves + grain;
            let c = ((c / 255.0 - 0.5) * 1.2 + 0.5) * 255.0;
            mix(c, v, intensity)
        })
    })
}

/// Binary luma cut with horizontal carving ripples.
pub fn woodcut(input: &PixelBuffer, threshold: f64) -> Box<dyn Job> {
    pointwise(input, move |p, site| {
        let ink = if luma(p) as f64 > threshold { 255.0 } else { 0.0 };
        opaque_gray(store(ink + (site.yf() * 0.1).sin() * 10.0))
    })
}

// ============================================================================
// Cartoon
// ============================================================================

/// Bilateral smoothing followed by posterization to `levels` per channel.
pub fn cartoon(input: Arc<PixelBuffer>, levels: f64) -> Box<dyn Job> {
    Composite::new(
        input,
        vec![
            Stage::new("smooth", 0.7, |inputs| bilateral_filter(inputs.original().clone(), 10.0, 80.0)),
            Stage::new("posterize", 0.3, move |inputs| {
                pointwise(inputs.previous(), move |p, _| {
                    [
                        posterize_channel(p[0], levels),
                        posterize_channel(p[1], levels),
                        posterize_channel(p[2], levels),
                        p[3],
                    ]
                })
            }),
        ],
    )
    .boxed()
}

// ============================================================================
// Blocks
// ============================================================================

/// Replace each `block_size` square with its mean colour.
pub fn mosaic(input: Arc<PixelBuffer>, block_size: f64) -> Box<dyn Job> {
    PassJob::boxed(BlockPass::new(input, whole(block_size), BlockMask::Full, MOSAIC_BLOCKS))
}

/// Opaque dots of each block's mean colour on a white canvas.
pub fn pointillism(input: Arc<PixelBuffer>, dot_size: f64) -> Box<dyn Job> {
    PassJob::boxed(BlockPass::new(input, whole(dot_size), BlockMask::Disc, POINTILLISM_DOTS))
}

// ============================================================================
// Abstract
// ============================================================================

/// Procedural interference pattern that shifts and rotates channels.
///
/// # Arguments
/// * `complexity` - Spatial frequency of the pattern
pub fn abstract_art(input: &PixelBuffer, complexity: f64) -> Box<dyn Job> {
    pointwise(input, move |p, site| {
        let (x, y) = (site.xf(), site.yf());
        let p1 = (x * 0.01 * complexity).sin() * (y * 0.01 * complexity).cos();
        let p2 = ((x + y) * 0.005 * complexity).sin();
        let p3 = (x.hypot(y) * 0.01 * complexity).cos();
        let f = (p1 + p2 + p3) / 3.0;

        let r = p[0] as f64 + f * 100.0;
        let g = p[1] as f64 + f * 80.0;
        let b = p[2] as f64 + f * 120.0;
        let shift = f * 60.0;
        let out = |v: f64| store(round_half_up((v + shift).clamp(0.0, 255.0)));
        [out(g), out(b), out(r), p[3]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::drain;

    #[test]
    fn test_oil_painting_uniform_unchanged() {
        let input = Arc::new(PixelBuffer::filled(7, 7, [90, 45, 200, 33]).unwrap());
        assert_eq!(drain(oil_painting(input.clone(), 4.0)), *input);
    }

    #[test]
    fn test_watercolor_boosts_saturation() {
        let input = Arc::new(PixelBuffer::filled(12, 12, [200, 100, 100, 255]).unwrap());
        let out = drain(watercolor(input, 0.8));
        // s = 0.5 -> 0.65, so red moves from 200 to 100 + 100 * 1.3
        assert_eq!(out.at(6, 6), [230, 100, 100, 255]);
    }

    #[test]
    fn test_watercolor_gray_stays_gray() {
        let input = Arc::new(PixelBuffer::filled(12, 12, [100, 100, 100, 255]).unwrap());
        let out = drain(watercolor(input, 0.8));
        assert_eq!(out.at(6, 6), [100, 100, 100, 255]);
    }

    #[test]
    fn test_pencil_sketch_white_paper() {
        let input = Arc::new(PixelBuffer::filled(6, 6, [255, 255, 255, 10]).unwrap());
        let out = drain(pencil_sketch(input, 0.8));
        assert_eq!(out.at(0, 0), [255, 255, 255, 255]);
        assert_eq!(out.at(3, 3), [255, 255, 255, 255]);
    }

    #[test]
    fn test_charcoal_flat_white() {
        let input = Arc::new(PixelBuffer::filled(6, 6, [255, 255, 255, 255]).unwrap());
        let out = drain(charcoal(input, 0.8));
        // No edge inside; paper term sin(0.1)^2 * 20 ~= 0.2
        assert_eq!(out.at(2, 2), [51, 51, 51, 255]);
    }

    #[test]
    fn test_cartoon_posterizes() {
        let input = Arc::new(PixelBuffer::filled(5, 5, [100, 200, 30, 90]).unwrap());
        let out = drain(cartoon(input, 2.0));
        assert_eq!(out.at(2, 2), [0, 255, 0, 90]);
    }

    #[test]
    fn test_mosaic_two_by_two_blocks() {
        let input = PixelBuffer::from_fn(4, 4, |x, y| {
            let block = (x / 2 + 2 * (y / 2)) as u8;
            [block * 50 + (x % 2) as u8 * 10 + (y % 2) as u8 * 20, 100, (x % 2) as u8 * 3, 200]
        })
        .unwrap();
        let out = drain(mosaic(Arc::new(input), 2.0));
        for y in 0..4 {
            for x in 0..4 {
                let block = (x / 2 + 2 * (y / 2)) as u8;
                // red mean = base + (0 + 10 + 20 + 30) / 4; blue 1.5 rounds up
                assert_eq!(out.at(x, y), [block * 50 + 15, 100, 2, 200]);
            }
        }
    }

    #[test]
    fn test_pointillism_disc_on_white() {
        let input = Arc::new(PixelBuffer::filled(4, 4, [10, 20, 30, 40]).unwrap());
        let out = drain(pointillism(input, 4.0));
        assert_eq!(out.at(0, 0), [255, 255, 255, 255]);
        assert_eq!(out.at(2, 2), [10, 20, 30, 255]);
    }

    #[test]
    fn test_crayon_depends_on_seed() {
        let input = PixelBuffer::filled(10, 10, [120, 120, 120, 255]).unwrap();
        let a = drain(crayon(&input, 0.7, 1));
        let b = drain(crayon(&input, 0.7, 2));
        assert_ne!(a, b);
        assert_eq!(a, drain(crayon(&input, 0.7, 1)));
    }

    #[test]
    fn test_woodcut_threshold_and_ripple() {
        let input = PixelBuffer::from_fn(2, 16, |x, _| if x == 0 { [200, 200, 200, 7] } else { [10, 10, 10, 7] }).unwrap();
        let out = drain(woodcut(&input, 128.0));
        assert_eq!(out.at(0, 0), [255, 255, 255, 255]);
        assert_eq!(out.at(1, 0), [0, 0, 0, 255]);
        // sin(1.5) * 10 ~= 9.97
        assert_eq!(out.at(1, 15), [10, 10, 10, 255]);
    }

    #[test]
    fn test_abstract_art_origin() {
        let input = PixelBuffer::filled(3, 3, [100, 100, 100, 77]).unwrap();
        let out = drain(abstract_art(&input, 5.0));
        // f = 1/3 at the origin; channels rotate g, b, r
        assert_eq!(out.at(0, 0), [147, 160, 153, 77]);
    }
}
