//! Texture filters: Enhanced Emboss, Metallic, Glass, Neon Glow,
//! Drop Shadow, Texture Overlay.

use std::sync::Arc;

use crate::buffer::{round_half_up, store, PixelBuffer};
use crate::color::Hsv;
use crate::engine::composite::{Composite, Stage};
use crate::engine::convolution::{ConvolutionPass, Edges, Finish, Reducer};
use crate::engine::pointwise::BlendPass;
use crate::engine::resample::{Outside, RemapPass};
use crate::engine::{Job, PassJob, YIELD_PIXELS};
use crate::filters::color_science::with_hsv;
use crate::filters::edge::{emboss_kernel, sobel_edge};
use crate::filters::{map_rgb, pointwise};
use crate::noise::site_uniform;

// ============================================================================
// Emboss
// ============================================================================

/// Emboss with off-centre weights scaled by `depth`, interior only.
pub fn emboss_enhanced(input: Arc<PixelBuffer>, depth: f64) -> Box<dyn Job> {
    PassJob::boxed(
        ConvolutionPass::new(
            input,
            Reducer::Linear {
                kernel: emboss_kernel(depth),
                edges: Edges::Interior,
                finish: Finish::Store,
            },
        )
        .yielding_every(YIELD_PIXELS),
    )
}

// ============================================================================
// Surfaces
// ============================================================================

/// Brushed-metal sheen: sine reflections, contrast 1.5 and a cool tint.
///
/// # Arguments
/// * `metallic` - Blend toward the metal look, 0 = unchanged
pub fn metallic(input: &PixelBuffer, metallic: f64) -> Box<dyn Job> {
    const TINT: [f64; 3] = [1.1, 1.05, 0.9];
    pointwise(input, move |p, site| {
        let reflection = (site.xf() * 0.1).sin() * (site.yf() * 0.1).cos() * 50.0;
        let metal = |c: usize| {
            let v = p[c] as f64;
            let sheen = (((v + reflection) / 255.0 - 0.5) * 1.5 + 0.5) * 255.0 * TINT[c];
            store(round_half_up(sheen * metallic + v * (1.0 - metallic)))
        };
        [metal(0), metal(1), metal(2), p[3]]
    })
}

/// Frosted glass: each pixel samples a seeded random neighbour, edge-clamped,
/// then takes a faint blue tint.
pub fn glass(input: Arc<PixelBuffer>, distortion: f64, seed: u64) -> Box<dyn Job> {
    PassJob::boxed(
        RemapPass::new(input, Outside::Clamp, move |site| {
            let ox = round_half_up((site_uniform(seed, site.index, 0) - 0.5) * distortion);
            let oy = round_half_up((site_uniform(seed, site.index, 1) - 0.5) * distortion);
            Some((site.xf() + ox, site.yf() + oy))
        })
        .shaded(|_, s, _| {
            [
                store(round_half_up(s[0] as f64 * 0.95)),
                store(round_half_up(s[1] as f64 * 0.98)),
                store(round_half_up(s[2] as f64 * 1.05)),
                s[3],
            ]
        }),
    )
}

/// Sine interference pattern added to every channel.
pub fn texture_overlay(input: &PixelBuffer, intensity: f64) -> Box<dyn Job> {
    pointwise(input, move |p, site| {
        let (x, y) = (site.xf(), site.yf());
        let t = ((x * 0.1).sin() * (y * 0.1).sin() * 50.0 + (x * 0.05).cos() * (y * 0.05).cos() * 30.0) * intensity;
        map_rgb(p, |v| store(v + t))
    })
}

// ============================================================================
// Composites
// ============================================================================

/// Saturated, brightened edges over a dimmed image.
///
/// # Arguments
/// * `glow` - Value multiplier on edge pixels, capped at full brightness
pub fn neon_glow(input: Arc<PixelBuffer>, glow: f64) -> Box<dyn Job> {
    Composite::new(
        input,
        vec![
            Stage::new("edges", 0.5, |inputs| sobel_edge(inputs.original().clone(), 100.0)),
            Stage::new("glow", 0.5, move |inputs| {
                PassJob::boxed(BlendPass::new(inputs.original(), inputs.stage(0).clone(), move |p, edges, _| {
                    if edges[0] > 128 {
                        with_hsv(p, |hsv| Hsv {
                            h: hsv.h,
                            s: (hsv.s * 1.5).min(1.0),
                            v: (hsv.v * glow).min(1.0),
                        })
                    } else {
                        map_rgb(p, |v| store(round_half_up(v * 0.7)))
                    }
                }))
            }),
        ],
    )
    .boxed()
}

/// Half-darkened copy of the opaque pixels, offset down-right, kept behind
/// the original opaque pixels.
///
/// Only a whole-pixel `offset` casts a shadow. A fractional one names no
/// caster pixel, so the shadow stage leaves the image as is.
pub fn drop_shadow(input: Arc<PixelBuffer>, offset: f64) -> Box<dyn Job> {
    let casts = offset.is_finite() && offset.fract() == 0.0;
    Composite::new(
        input,
        vec![
            Stage::new("shadow", 0.5, move |inputs| {
                PassJob::boxed(
                    RemapPass::new(inputs.original().clone(), Outside::Identity, move |site| {
                        casts.then(|| (site.xf() - offset, site.yf() - offset))
                    })
                    .shaded(|own, caster, _| {
                        if caster[3] > 128 {
                            map_rgb(own, |v| store(round_half_up(v * 0.5)))
                        } else {
                            own
                        }
                    }),
                )
            }),
            Stage::new("restore", 0.5, |inputs| {
                PassJob::boxed(BlendPass::new(inputs.stage(0), inputs.original().clone(), |shadow, orig, _| {
                    if orig[3] > 128 {
                        orig
                    } else {
                        shadow
                    }
                }))
            }),
        ],
    )
    .boxed()
}
