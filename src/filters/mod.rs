//! Algorithm configurations.
//!
//! Each registered algorithm is a small builder that configures one of the
//! generic engines and returns a boxed [`Job`]. Nothing here loops over a
//! buffer directly; the engines own iteration, yielding and progress.
//!
//! ## Modules
//!
//! | Module | Algorithms | Engine |
//! |--------|------------|--------|
//! | [`color_adjust`] | grayscale, invert, brightness, contrast, color balance, quantization | Pointwise |
//! | [`color_science`] | hue shift, saturation, selective and complementary color | Pointwise (HSV) |
//! | [`blur`] | box, gaussian, motion, radial, median, bilateral | Convolution, Resample |
//! | [`edge`] | edge, sharpen, emboss, laplacian, unsharp mask, sobel edge | Convolution, Composite |
//! | [`stylize`] | oil painting, watercolor, pencil sketch, cartoon, mosaic, ... | mixed |
//! | [`vintage`] | vintage film, faded, vignette, film grain, high contrast B&W | Pointwise |
//! | [`geometric`] | rotation, perspective, fisheye, barrel, wave, swirl | Resample |
//! | [`texture`] | enhanced emboss, metallic, glass, neon glow, drop shadow, overlay | mixed |
//!
//! ## Conventions
//!
//! - Alpha is copied from the input unless an algorithm defines it.
//! - Every computed channel goes through [`store`](crate::buffer::store).
//! - Parameters arrive already resolved against the schema.

pub mod blur;
pub mod color_adjust;
pub mod color_science;
pub mod edge;
pub mod geometric;
pub mod stylize;
pub mod texture;
pub mod vintage;

use std::sync::Arc;

use crate::buffer::{PixelBuffer, Rgba};
use crate::engine::pointwise::PointwisePass;
use crate::engine::{Job, PassJob, Site};
use crate::registry::{AlgorithmId, Params};

/// Build the job for `id` over `input`.
pub fn build(id: AlgorithmId, input: Arc<PixelBuffer>, params: &Params) -> Box<dyn Job> {
    let p = |name: &str| params.value(name);
    let seed = p("seed").max(0.0) as u64;

    match id {
        // Basic
        AlgorithmId::Grayscale => color_adjust::grayscale(&input),
        AlgorithmId::Invert => color_adjust::invert(&input),
        AlgorithmId::Brightness => color_adjust::brightness(&input, p("brightness")),
        AlgorithmId::Contrast => color_adjust::contrast(&input, p("contrast")),
        AlgorithmId::Blur => blur::box_blur(input, p("blurRadius")),
        AlgorithmId::Edge => edge::edge(input, p("threshold")),
        AlgorithmId::Sharpen => edge::sharpen(input),
        AlgorithmId::Emboss => edge::emboss(input),

        // Filter
        AlgorithmId::GaussianBlur => blur::gaussian_blur(input, p("radius")),
        AlgorithmId::MotionBlur => blur::motion_blur(input, p("distance"), p("angle")),
        AlgorithmId::RadialBlur => blur::radial_blur(input, p("strength")),
        AlgorithmId::MedianFilter => blur::median_filter(input, p("radius")),
        AlgorithmId::BilateralFilter => blur::bilateral_filter(input, p("spatialSigma"), p("intensitySigma")),
        AlgorithmId::LaplacianSharpen => edge::laplacian_sharpen(input, p("strength")),
        AlgorithmId::UnsharpMask => edge::unsharp_mask(input, p("amount"), p("radius")),
        AlgorithmId::SobelEdge => edge::sobel_edge(input, p("threshold")),

        // Artistic
        AlgorithmId::OilPainting => stylize::oil_painting(input, p("brushSize")),
        AlgorithmId::Watercolor => stylize::watercolor(input, p("intensity")),
        AlgorithmId::PencilSketch => stylize::pencil_sketch(input, p("intensity")),
        AlgorithmId::Cartoon => stylize::cartoon(input, p("levels")),
        AlgorithmId::Mosaic => stylize::mosaic(input, p("blockSize")),
        AlgorithmId::Pointillism => stylize::pointillism(input, p("dotSize")),
        AlgorithmId::Crayon => stylize::crayon(&input, p("intensity"), seed),
        AlgorithmId::Charcoal => stylize::charcoal(input, p("intensity")),
        AlgorithmId::Woodcut => stylize::woodcut(&input, p("threshold")),
        AlgorithmId::AbstractArt => stylize::abstract_art(&input, p("complexity")),

        // Color
        AlgorithmId::HueShift => color_science::hue_shift(&input, p("hueShift")),
        AlgorithmId::SaturationEnhance => color_science::saturation_enhance(&input, p("saturation")),
        AlgorithmId::ColorBalance => color_adjust::color_balance(&input, p("temperature")),
        AlgorithmId::SelectiveColor => color_science::selective_color(&input, p("targetHue"), p("tolerance")),
        AlgorithmId::ComplementaryColor => color_science::complementary_color(&input),
        AlgorithmId::ColorQuantization => color_adjust::color_quantization(&input, p("levels")),

        // Vintage
        AlgorithmId::VintageFilm => vintage::vintage_film(&input, p("intensity")),
        AlgorithmId::Faded => vintage::faded(&input, p("fadeAmount")),
        AlgorithmId::Vignette => vintage::vignette(&input, p("intensity")),
        AlgorithmId::FilmGrain => vintage::film_grain(&input, p("amount"), seed),
        AlgorithmId::HighContrastBw => vintage::high_contrast_bw(&input, p("contrast")),

        // Geometric
        AlgorithmId::Rotation => geometric::rotation(input, p("angle")),
        AlgorithmId::Perspective => geometric::perspective(input, p("perspective")),
        AlgorithmId::Fisheye => geometric::fisheye(input, p("strength")),
        AlgorithmId::BarrelDistortion => geometric::barrel_distortion(input, p("distortion")),
        AlgorithmId::WaveDistortion => geometric::wave_distortion(input, p("amplitude"), p("frequency")),
        AlgorithmId::Swirl => geometric::swirl(input, p("strength")),

        // Texture
        AlgorithmId::EmbossEnhanced => texture::emboss_enhanced(input, p("depth")),
        AlgorithmId::Metallic => texture::metallic(&input, p("metallic")),
        AlgorithmId::Glass => texture::glass(input, p("distortion"), seed),
        AlgorithmId::NeonGlow => texture::neon_glow(input, p("glowIntensity")),
        AlgorithmId::DropShadow => texture::drop_shadow(input, p("shadowOffset")),
        AlgorithmId::TextureOverlay => texture::texture_overlay(&input, p("textureIntensity")),
    }
}

/// Pointwise job over a clone of `input`.
pub(crate) fn pointwise<F>(input: &PixelBuffer, formula: F) -> Box<dyn Job>
where
    F: Fn(Rgba, Site) -> Rgba + Send + Sync + 'static,
{
    PassJob::boxed(PointwisePass::new(input, formula))
}

/// Apply `f` to the colour channels, keeping alpha.
#[inline]
pub(crate) fn map_rgb(pixel: Rgba, f: impl Fn(f64) -> u8) -> Rgba {
    [f(pixel[0] as f64), f(pixel[1] as f64), f(pixel[2] as f64), pixel[3]]
}

/// Whole-pixel count for a size-like parameter.
#[inline]
pub(crate) fn whole(v: f64) -> usize {
    if v.is_finite() && v > 0.0 {
        v as usize
    } else {
        0
    }
}
