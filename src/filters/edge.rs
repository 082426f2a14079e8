//! Edge and sharpening filters.
//!
//! The fixed 3x3 kernels (sharpen, emboss, laplacian) only process pixels
//! with a full window; the one-pixel border keeps its input value. Sobel
//! edges are binary and opaque.

use std::sync::Arc;

use crate::buffer::{store, PixelBuffer};
use crate::engine::composite::{Composite, Stage};
use crate::engine::convolution::{ConvolutionPass, Edges, Finish, Kernel, Reducer};
use crate::engine::pointwise::BlendPass;
use crate::engine::{Job, PassJob, YIELD_PIXELS};
use crate::filters::blur::box_blur;
use crate::filters::color_adjust::grayscale;

pub const SHARPEN: [[f64; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];
pub const EMBOSS: [[f64; 3]; 3] = [[-2.0, -1.0, 0.0], [-1.0, 1.0, 1.0], [0.0, 1.0, 2.0]];
pub const LAPLACIAN: [[f64; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 4.0, -1.0], [0.0, -1.0, 0.0]];

/// Output bias that centres emboss results on mid-gray.
pub const EMBOSS_BIAS: f64 = 128.0;

fn interior(input: Arc<PixelBuffer>, kernel: Kernel, finish: Finish) -> ConvolutionPass {
    ConvolutionPass::new(
        input,
        Reducer::Linear {
            kernel,
            edges: Edges::Interior,
            finish,
        },
    )
}

// ============================================================================
// Edge Detection
// ============================================================================

/// Binary Sobel edges on the input's luma.
///
/// # Arguments
/// * `threshold` - Gradient magnitude above which a pixel is an edge (white)
pub fn edge(input: Arc<PixelBuffer>, threshold: f64) -> Box<dyn Job> {
    PassJob::boxed(ConvolutionPass::new(input, Reducer::Sobel { threshold }))
}

/// Two-stage Sobel: grayscale pre-pass, then edges of the gray buffer.
///
/// Border pixels keep the original input, not the gray pre-pass.
pub fn sobel_edge(input: Arc<PixelBuffer>, threshold: f64) -> Box<dyn Job> {
    Composite::new(
        input,
        vec![
            Stage::new("grayscale", 0.3, |inputs| grayscale(inputs.original())),
            Stage::new("sobel", 0.7, move |inputs| {
                PassJob::boxed(ConvolutionPass::with_base(
                    inputs.stage(0).clone(),
                    inputs.original(),
                    Reducer::Sobel { threshold },
                ))
            }),
        ],
    )
    .boxed()
}

// ============================================================================
// Sharpening
// ============================================================================

pub fn sharpen(input: Arc<PixelBuffer>) -> Box<dyn Job> {
    PassJob::boxed(interior(input, Kernel::from_rows(SHARPEN), Finish::Store))
}

/// Add `strength` times the Laplacian response to each pixel.
pub fn laplacian_sharpen(input: Arc<PixelBuffer>, strength: f64) -> Box<dyn Job> {
    PassJob::boxed(
        interior(input, Kernel::from_rows(LAPLACIAN), Finish::AddToSource(strength)).yielding_every(YIELD_PIXELS),
    )
}

/// Unsharp mask: `v + amount * (v - blurred)` against a box blur.
///
/// # Arguments
/// * `amount` - Strength of the high-pass boost
/// * `radius` - Box blur radius
pub fn unsharp_mask(input: Arc<PixelBuffer>, amount: f64, radius: f64) -> Box<dyn Job> {
    Composite::new(
        input,
        vec![
            Stage::new("blur", 0.5, move |inputs| box_blur(inputs.original().clone(), radius)),
            Stage::new("mask", 0.5, move |inputs| {
                PassJob::boxed(BlendPass::new(inputs.original(), inputs.stage(0).clone(), move |p, blurred, _| {
                    let boost = |c: usize| {
                        let v = p[c] as f64;
                        store(v + amount * (v - blurred[c] as f64))
                    };
                    [boost(0), boost(1), boost(2), p[3]]
                }))
            }),
        ],
    )
    .boxed()
}

// ============================================================================
// Emboss
// ============================================================================

pub fn emboss(input: Arc<PixelBuffer>) -> Box<dyn Job> {
    PassJob::boxed(interior(
        input,
        Kernel::from_rows(EMBOSS).with_bias(EMBOSS_BIAS),
        Finish::Store,
    ))
}

/// Emboss kernel whose off-centre weights scale with `depth`.
pub fn emboss_kernel(depth: f64) -> Kernel {
    let d = depth;
    Kernel::from_rows([[-2.0 * d, -d, 0.0], [-d, 1.0, d], [0.0, d, 2.0 * d]]).with_bias(EMBOSS_BIAS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Rgba;
    use crate::engine::drain;

    fn step_edge(width: usize, height: usize, alpha: u8) -> Arc<PixelBuffer> {
        Arc::new(
            PixelBuffer::from_fn(width, height, |x, _| {
                if x < width / 2 {
                    [20, 20, 20, alpha]
                } else {
                    [220, 220, 220, alpha]
                }
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_edge_marks_boundary() {
        let input = step_edge(8, 6, 100);
        let out = drain(edge(input.clone(), 128.0));
        assert_eq!(out.at(3, 2), [255, 255, 255, 255]);
        assert_eq!(out.at(1, 2), [0, 0, 0, 255]);
        // Border keeps the input, including alpha
        assert_eq!(out.at(0, 0), input.at(0, 0));
    }

    #[test]
    fn test_sobel_edge_matches_single_pass_on_gray() {
        let input = step_edge(10, 7, 255);
        let two_stage = drain(sobel_edge(input.clone(), 128.0));
        let one_pass = drain(edge(input, 128.0));
        assert_eq!(two_stage, one_pass);
    }

    #[test]
    fn test_sobel_edge_border_is_original_colour() {
        let input = Arc::new(PixelBuffer::filled(5, 5, [200, 10, 10, 255]).unwrap());
        let out = drain(sobel_edge(input, 128.0));
        assert_eq!(out.at(0, 0), [200, 10, 10, 255]);
        assert_eq!(out.at(2, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn test_sharpen_flat_unchanged() {
        let input = Arc::new(PixelBuffer::filled(6, 6, [33, 66, 99, 255]).unwrap());
        assert_eq!(drain(sharpen(input.clone())), *input);
    }

    #[test]
    fn test_sharpen_boosts_peak() {
        let mut src = PixelBuffer::filled(3, 3, [100, 100, 100, 255]).unwrap();
        src.put(1, 1, [120, 120, 120, 255]);
        let out = drain(sharpen(Arc::new(src)));
        // 5 * 120 - 4 * 100
        assert_eq!(out.at(1, 1)[0], 200);
    }

    #[test]
    fn test_emboss_flat_is_offset() {
        let input = Arc::new(PixelBuffer::filled(4, 4, [10, 20, 30, 255]).unwrap());
        let out = drain(emboss(input));
        assert_eq!(out.at(1, 1), [138, 148, 158, 255]);
        assert_eq!(out.at(0, 0), [10, 20, 30, 255]);
    }

    #[test]
    fn test_emboss_kernel_depth_one_matches_emboss() {
        assert_eq!(emboss_kernel(1.0), Kernel::from_rows(EMBOSS).with_bias(EMBOSS_BIAS));
    }

    #[test]
    fn test_laplacian_sharpen_strength() {
        let mut src = PixelBuffer::filled(3, 3, [100, 100, 100, 255]).unwrap();
        src.put(1, 1, [110, 110, 110, 255]);
        let out = drain(laplacian_sharpen(Arc::new(src), 2.0));
        // Laplacian response 4 * 10 = 40, doubled
        assert_eq!(out.at(1, 1)[0], 190);
    }

    #[test]
    fn test_unsharp_mask_flat_unchanged() {
        let input = Arc::new(PixelBuffer::filled(5, 5, [77, 88, 99, 12]).unwrap());
        assert_eq!(drain(unsharp_mask(input.clone(), 1.5, 1.0)), *input);
    }

    #[test]
    fn test_unsharp_mask_increases_local_contrast() {
        let input = step_edge(8, 3, 255);
        let out = drain(unsharp_mask(input.clone(), 1.0, 1.0));
        let dark: Rgba = out.at(3, 1);
        let light: Rgba = out.at(4, 1);
        assert!(dark[0] < 20);
        assert!(light[0] > 220);
    }
}
