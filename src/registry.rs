//! Algorithm registry: identifiers, display metadata, parameter schemas.
//!
//! Every algorithm the engine knows is a variant of [`AlgorithmId`]. The
//! string form (`"gaussianBlur"`, `"pencilSketch"`, ...) is what hosts send;
//! [`resolve`] turns it into the static [`AlgorithmDescriptor`] and is the
//! only place a lookup can miss.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! algorithm_ids {
    ($($variant:ident => $id:literal,)+) => {
        /// Closed set of registered algorithms.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum AlgorithmId {
            $(
                #[serde(rename = $id)]
                $variant,
            )+
        }

        impl AlgorithmId {
            /// Every id in catalogue order.
            pub const ALL: &'static [AlgorithmId] = &[$(AlgorithmId::$variant,)+];

            /// Wire identifier.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(AlgorithmId::$variant => $id,)+
                }
            }
        }

        impl FromStr for AlgorithmId {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($id => Ok(AlgorithmId::$variant),)+
                    _ => Err(EngineError::UnknownAlgorithm(s.to_string())),
                }
            }
        }
    };
}

algorithm_ids! {
    Grayscale => "grayscale",
    Invert => "invert",
    Brightness => "brightness",
    Contrast => "contrast",
    Blur => "blur",
    Edge => "edge",
    Sharpen => "sharpen",
    Emboss => "emboss",
    GaussianBlur => "gaussianBlur",
    MotionBlur => "motionBlur",
    RadialBlur => "radialBlur",
    MedianFilter => "medianFilter",
    BilateralFilter => "bilateralFilter",
    LaplacianSharpen => "laplacianSharpen",
    UnsharpMask => "unsharpMask",
    SobelEdge => "sobelEdge",
    OilPainting => "oilPainting",
    Watercolor => "watercolor",
    PencilSketch => "pencilSketch",
    Cartoon => "cartoon",
    Mosaic => "mosaic",
    Pointillism => "pointillism",
    Crayon => "crayon",
    Charcoal => "charcoal",
    Woodcut => "woodcut",
    AbstractArt => "abstractArt",
    HueShift => "hueShift",
    SaturationEnhance => "saturationEnhance",
    ColorBalance => "colorBalance",
    SelectiveColor => "selectiveColor",
    ComplementaryColor => "complementaryColor",
    ColorQuantization => "colorQuantization",
    VintageFilm => "vintageFilm",
    Faded => "faded",
    Vignette => "vignette",
    FilmGrain => "filmGrain",
    HighContrastBw => "highContrastBW",
    Rotation => "rotation",
    Perspective => "perspective",
    Fisheye => "fisheye",
    BarrelDistortion => "barrelDistortion",
    WaveDistortion => "waveDistortion",
    Swirl => "swirl",
    EmbossEnhanced => "embossEnhanced",
    Metallic => "metallic",
    Glass => "glass",
    NeonGlow => "neonGlow",
    DropShadow => "dropShadow",
    TextureOverlay => "textureOverlay",
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping used by selection UIs; declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Basic,
    Filter,
    Artistic,
    Color,
    Vintage,
    Geometric,
    Texture,
}

/// Engine an algorithm is a configuration of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineKind {
    Pointwise,
    Convolution,
    GeometricResample,
    Composite,
}

// ============================================================================
// Descriptors
// ============================================================================

/// One numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
}

const fn param(name: &'static str, default: f64, min: f64, max: f64, step: f64) -> ParamSpec {
    ParamSpec {
        name,
        min,
        max,
        default,
        step,
    }
}

const SEED: ParamSpec = param("seed", 0.0, 0.0, 4_294_967_295.0, 1.0);

/// Static metadata for a registered algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlgorithmDescriptor {
    pub id: AlgorithmId,
    pub name: &'static str,
    pub category: Category,
    pub engine: EngineKind,
    pub params: &'static [ParamSpec],
}

impl AlgorithmDescriptor {
    /// Schema entry for `name`.
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    /// Fill every schema parameter, taking caller values where present.
    ///
    /// Values are not range checked. Non-finite values fall back to the
    /// default; names outside the schema are dropped.
    pub fn resolve(&self, params: &Params) -> Params {
        let mut resolved = Params::new();
        for spec in self.params {
            let value = params.get(spec.name).filter(|v| v.is_finite()).unwrap_or(spec.default);
            resolved.set(spec.name, value);
        }
        resolved
    }
}

macro_rules! entry {
    ($id:ident, $name:literal, $category:ident, $engine:ident, [$($param:expr),* $(,)?]) => {
        AlgorithmDescriptor {
            id: AlgorithmId::$id,
            name: $name,
            category: Category::$category,
            engine: EngineKind::$engine,
            params: &[$($param),*],
        }
    };
}

/// Catalogue in definition order, one entry per [`AlgorithmId`].
pub static CATALOG: &[AlgorithmDescriptor] = &[
    // Basic
    entry!(Grayscale, "Grayscale", Basic, Pointwise, []),
    entry!(Invert, "Invert", Basic, Pointwise, []),
    entry!(Brightness, "Brightness", Basic, Pointwise, [param("brightness", 0.0, -100.0, 100.0, 1.0)]),
    entry!(Contrast, "Contrast", Basic, Pointwise, [param("contrast", 0.0, -100.0, 100.0, 1.0)]),
    entry!(Blur, "Blur", Basic, Convolution, [param("blurRadius", 1.0, 1.0, 10.0, 1.0)]),
    entry!(Edge, "Edge Detection", Basic, Convolution, [param("threshold", 128.0, 0.0, 255.0, 1.0)]),
    entry!(Sharpen, "Sharpen", Basic, Convolution, []),
    entry!(Emboss, "Emboss", Basic, Convolution, []),
    // Filter
    entry!(GaussianBlur, "Gaussian Blur", Filter, Convolution, [param("radius", 2.0, 1.0, 10.0, 0.5)]),
    entry!(
        MotionBlur,
        "Motion Blur",
        Filter,
        GeometricResample,
        [param("distance", 10.0, 1.0, 50.0, 1.0), param("angle", 0.0, 0.0, 360.0, 1.0)]
    ),
    entry!(RadialBlur, "Radial Blur", Filter, GeometricResample, [param("strength", 10.0, 1.0, 50.0, 1.0)]),
    entry!(MedianFilter, "Median Filter", Filter, Convolution, [param("radius", 1.0, 1.0, 5.0, 1.0)]),
    entry!(
        BilateralFilter,
        "Bilateral Filter",
        Filter,
        Convolution,
        [param("spatialSigma", 10.0, 1.0, 50.0, 1.0), param("intensitySigma", 20.0, 1.0, 100.0, 1.0)]
    ),
    entry!(LaplacianSharpen, "Laplacian Sharpen", Filter, Convolution, [param("strength", 1.0, 0.1, 3.0, 0.1)]),
    entry!(
        UnsharpMask,
        "Unsharp Mask",
        Filter,
        Composite,
        [param("amount", 1.5, 0.1, 5.0, 0.1), param("radius", 1.0, 1.0, 10.0, 1.0)]
    ),
    entry!(SobelEdge, "Sobel Edge", Filter, Composite, [param("threshold", 128.0, 0.0, 255.0, 1.0)]),
    // Artistic
    entry!(OilPainting, "Oil Painting", Artistic, Convolution, [param("brushSize", 4.0, 1.0, 15.0, 1.0)]),
    entry!(Watercolor, "Watercolor", Artistic, Composite, [param("intensity", 0.8, 0.1, 2.0, 0.1)]),
    entry!(PencilSketch, "Pencil Sketch", Artistic, Composite, [param("intensity", 0.8, 0.1, 2.0, 0.1)]),
    entry!(Cartoon, "Cartoon", Artistic, Composite, [param("levels", 8.0, 2.0, 32.0, 1.0)]),
    entry!(Mosaic, "Mosaic", Artistic, GeometricResample, [param("blockSize", 10.0, 2.0, 50.0, 1.0)]),
    entry!(Pointillism, "Pointillism", Artistic, GeometricResample, [param("dotSize", 6.0, 2.0, 20.0, 1.0)]),
    entry!(Crayon, "Crayon", Artistic, Pointwise, [param("intensity", 0.7, 0.1, 2.0, 0.1), SEED]),
    entry!(Charcoal, "Charcoal", Artistic, Composite, [param("intensity", 0.8, 0.1, 2.0, 0.1)]),
    entry!(Woodcut, "Woodcut", Artistic, Pointwise, [param("threshold", 128.0, 0.0, 255.0, 1.0)]),
    entry!(AbstractArt, "Abstract Art", Artistic, Pointwise, [param("complexity", 5.0, 1.0, 20.0, 1.0)]),
    // Color
    entry!(HueShift, "Hue Shift", Color, Pointwise, [param("hueShift", 30.0, -180.0, 180.0, 1.0)]),
    entry!(SaturationEnhance, "Saturation", Color, Pointwise, [param("saturation", 1.5, 0.0, 3.0, 0.1)]),
    entry!(ColorBalance, "Color Balance", Color, Pointwise, [param("temperature", 0.0, -100.0, 100.0, 1.0)]),
    entry!(
        SelectiveColor,
        "Selective Color",
        Color,
        Pointwise,
        [param("targetHue", 120.0, 0.0, 360.0, 1.0), param("tolerance", 30.0, 1.0, 180.0, 1.0)]
    ),
    entry!(ComplementaryColor, "Complementary Color", Color, Pointwise, []),
    entry!(ColorQuantization, "Color Quantization", Color, Pointwise, [param("levels", 8.0, 2.0, 32.0, 1.0)]),
    // Vintage
    entry!(VintageFilm, "Vintage Film", Vintage, Pointwise, [param("intensity", 0.8, 0.1, 2.0, 0.1)]),
    entry!(Faded, "Faded", Vintage, Pointwise, [param("fadeAmount", 0.6, 0.1, 1.0, 0.1)]),
    entry!(Vignette, "Vignette", Vintage, Pointwise, [param("intensity", 0.8, 0.1, 2.0, 0.1)]),
    entry!(FilmGrain, "Film Grain", Vintage, Pointwise, [param("amount", 0.3, 0.1, 1.0, 0.1), SEED]),
    entry!(HighContrastBw, "High Contrast B&W", Vintage, Pointwise, [param("contrast", 2.0, 1.0, 5.0, 0.1)]),
    // Geometric
    entry!(Rotation, "Rotation", Geometric, GeometricResample, [param("angle", 45.0, -180.0, 180.0, 1.0)]),
    entry!(Perspective, "Perspective", Geometric, GeometricResample, [param("perspective", 0.5, 0.0, 1.0, 0.1)]),
    entry!(Fisheye, "Fisheye", Geometric, GeometricResample, [param("strength", 0.5, 0.0, 2.0, 0.1)]),
    entry!(
        BarrelDistortion,
        "Barrel Distortion",
        Geometric,
        GeometricResample,
        [param("distortion", 0.3, -1.0, 1.0, 0.1)]
    ),
    entry!(
        WaveDistortion,
        "Wave Distortion",
        Geometric,
        GeometricResample,
        [param("amplitude", 20.0, 1.0, 100.0, 1.0), param("frequency", 0.02, 0.001, 0.1, 0.001)]
    ),
    entry!(Swirl, "Swirl", Geometric, GeometricResample, [param("strength", 1.0, 0.0, 5.0, 0.1)]),
    // Texture
    entry!(EmbossEnhanced, "Enhanced Emboss", Texture, Convolution, [param("depth", 2.0, 1.0, 10.0, 1.0)]),
    entry!(Metallic, "Metallic", Texture, Pointwise, [param("metallic", 0.8, 0.0, 2.0, 0.1)]),
    entry!(
        Glass,
        "Glass",
        Texture,
        GeometricResample,
        [param("distortion", 10.0, 1.0, 50.0, 1.0), SEED]
    ),
    entry!(NeonGlow, "Neon Glow", Texture, Composite, [param("glowIntensity", 1.5, 0.5, 5.0, 0.1)]),
    entry!(DropShadow, "Drop Shadow", Texture, Composite, [param("shadowOffset", 5.0, 1.0, 20.0, 1.0)]),
    entry!(
        TextureOverlay,
        "Texture Overlay",
        Texture,
        Pointwise,
        [param("textureIntensity", 0.5, 0.0, 2.0, 0.1)]
    ),
];

/// Look up an algorithm by its wire id.
///
/// # Errors
/// `UnknownAlgorithm` when `id` is not registered.
pub fn resolve(id: &str) -> Result<&'static AlgorithmDescriptor> {
    let id = AlgorithmId::from_str(id)?;
    Ok(descriptor(id))
}

/// Descriptor for a known id.
pub fn descriptor(id: AlgorithmId) -> &'static AlgorithmDescriptor {
    // CATALOG is declared in the same order as AlgorithmId
    &CATALOG[id as usize]
}

/// Every descriptor, grouped by category, definition order within a group.
pub fn list_algorithms() -> Vec<&'static AlgorithmDescriptor> {
    let mut all: Vec<_> = CATALOG.iter().collect();
    all.sort_by_key(|d| d.category);
    all
}

// ============================================================================
// Parameters
// ============================================================================

/// Named numeric parameters for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, f64>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of numbers, e.g. `{"radius": 2.5}`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    /// Builder form of [`Params::set`].
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Value of a resolved parameter; 0 when absent.
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Params(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_matches_ids() {
        assert_eq!(CATALOG.len(), AlgorithmId::ALL.len());
        assert_eq!(CATALOG.len(), 49);
        for (descriptor, id) in CATALOG.iter().zip(AlgorithmId::ALL) {
            assert_eq!(descriptor.id, *id);
        }
    }

    #[test]
    fn test_id_round_trip() {
        for id in AlgorithmId::ALL {
            assert_eq!(id.as_str().parse::<AlgorithmId>().unwrap(), *id);
            assert_eq!(resolve(id.as_str()).unwrap().id, *id);
        }
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(
            resolve("GaussianBlur").unwrap_err(),
            EngineError::UnknownAlgorithm("GaussianBlur".into())
        );
        assert!(resolve("").is_err());
    }

    #[test]
    fn test_list_sorted_by_category_then_definition() {
        let list = list_algorithms();
        assert_eq!(list.len(), 49);
        assert!(list.windows(2).all(|w| w[0].category <= w[1].category));
        let filters: Vec<&str> = list
            .iter()
            .filter(|d| d.category == Category::Filter)
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(filters.first(), Some(&"gaussianBlur"));
        assert_eq!(filters.last(), Some(&"sobelEdge"));
    }

    #[test]
    fn test_defaults_inside_ranges() {
        for descriptor in CATALOG {
            for spec in descriptor.params {
                assert!(spec.min <= spec.default && spec.default <= spec.max, "{}.{}", descriptor.id, spec.name);
                assert!(spec.step > 0.0);
            }
        }
    }

    #[test]
    fn test_seeded_algorithms() {
        for id in [AlgorithmId::FilmGrain, AlgorithmId::Crayon, AlgorithmId::Glass] {
            assert!(descriptor(id).param("seed").is_some());
        }
    }

    #[test]
    fn test_resolve_params_defaults_and_zero() {
        let contrast = descriptor(AlgorithmId::Contrast);
        assert_eq!(contrast.resolve(&Params::new()).get("contrast"), Some(0.0));

        let blur = descriptor(AlgorithmId::GaussianBlur);
        assert_eq!(blur.resolve(&Params::new()).get("radius"), Some(2.0));

        // A present zero is kept even where the default is not zero
        let rotation = descriptor(AlgorithmId::Rotation);
        let resolved = rotation.resolve(&Params::new().with("angle", 0.0).with("unused", 3.0));
        assert_eq!(resolved.get("angle"), Some(0.0));
        assert_eq!(resolved.get("unused"), None);

        let nan = rotation.resolve(&Params::new().with("angle", f64::NAN));
        assert_eq!(nan.get("angle"), Some(45.0));
    }

    #[test]
    fn test_out_of_range_values_not_clamped() {
        let brightness = descriptor(AlgorithmId::Brightness);
        let resolved = brightness.resolve(&Params::new().with("brightness", 400.0));
        assert_eq!(resolved.value("brightness"), 400.0);
    }

    #[test]
    fn test_params_json() {
        let params = Params::from_json(r#"{"distance": 12, "angle": 90.5}"#).unwrap();
        assert_eq!(params.get("distance"), Some(12.0));
        assert_eq!(params.get("angle"), Some(90.5));
        assert!(matches!(Params::from_json("[1, 2]"), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_descriptor_json_shape() {
        let json = serde_json::to_value(descriptor(AlgorithmId::HighContrastBw)).unwrap();
        assert_eq!(json["id"], "highContrastBW");
        assert_eq!(json["category"], "vintage");
        assert_eq!(json["engine"], "pointwise");
        assert_eq!(json["params"][0]["name"], "contrast");
    }
}
