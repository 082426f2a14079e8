//! Pixel buffer data model and channel arithmetic.
//!
//! ## Layout
//!
//! | Field | Shape | Type | Description |
//! |-------|-------|------|-------------|
//! | data | (H, W, 4) | u8 | R, G, B, A per pixel, row-major |
//!
//! A buffer always holds at least one pixel and exactly four channels.
//! Filters never write into the buffer they were handed; they clone first
//! and return the clone.

use ndarray::{Array3, ArrayView3};

use crate::error::{EngineError, Result};

/// One RGBA pixel.
pub type Rgba = [u8; 4];

/// Number of channels per pixel.
pub const CHANNELS: usize = 4;

/// In-memory 8-bit RGBA raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Array3<u8>,
}

fn check_dims(width: usize, height: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(EngineError::InvalidBuffer(format!(
            "dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(CHANNELS))
        .ok_or_else(|| {
            EngineError::InvalidBuffer(format!("dimensions overflow: {}x{}", width, height))
        })
}

impl PixelBuffer {
    /// Create a transparent black buffer.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        check_dims(width, height)?;
        Ok(Self {
            data: Array3::<u8>::zeros((height, width, CHANNELS)),
        })
    }

    /// Create a buffer with every pixel set to `pixel`.
    pub fn filled(width: usize, height: usize, pixel: Rgba) -> Result<Self> {
        let mut buffer = Self::new(width, height)?;
        buffer.fill(pixel);
        Ok(buffer)
    }

    /// Wrap flat RGBA bytes (length = width * height * 4).
    ///
    /// # Errors
    /// `InvalidBuffer` on zero dimensions or a length mismatch.
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = check_dims(width, height)?;
        if data.len() != expected {
            return Err(EngineError::InvalidBuffer(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        let data = Array3::from_shape_vec((height, width, CHANNELS), data)
            .map_err(|e| EngineError::InvalidBuffer(e.to_string()))?;
        Ok(Self { data })
    }

    /// Wrap an existing (height, width, 4) array.
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        let (height, width, channels) = data.dim();
        check_dims(width, height)?;
        if channels != CHANNELS {
            return Err(EngineError::InvalidBuffer(format!(
                "expected 4 channels, got {}",
                channels
            )));
        }
        Ok(Self {
            data: data.as_standard_layout().into_owned(),
        })
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> Rgba,
    {
        let mut buffer = Self::new(width, height)?;
        for y in 0..height {
            for x in 0..width {
                buffer.put(x, y, f(x, y));
            }
        }
        Ok(buffer)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// Pixel at (x, y). Panics when out of range.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> Rgba {
        [
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
            self.data[[y, x, 3]],
        ]
    }

    /// Pixel at signed coordinates, `None` outside the raster.
    #[inline]
    pub fn get(&self, x: isize, y: isize) -> Option<Rgba> {
        if x < 0 || y < 0 || x as usize >= self.width() || y as usize >= self.height() {
            return None;
        }
        Some(self.at(x as usize, y as usize))
    }

    /// Pixel at signed coordinates clamped to the nearest edge.
    #[inline]
    pub fn clamped(&self, x: isize, y: isize) -> Rgba {
        let cx = x.clamp(0, self.width() as isize - 1) as usize;
        let cy = y.clamp(0, self.height() as isize - 1) as usize;
        self.at(cx, cy)
    }

    /// Pixel at row-major index.
    #[inline]
    pub fn at_index(&self, index: usize) -> Rgba {
        let width = self.width();
        self.at(index % width, index / width)
    }

    #[inline]
    pub fn put(&mut self, x: usize, y: usize, pixel: Rgba) {
        for (c, value) in pixel.iter().enumerate() {
            self.data[[y, x, c]] = *value;
        }
    }

    #[inline]
    pub fn put_index(&mut self, index: usize, pixel: Rgba) {
        let width = self.width();
        self.put(index % width, index / width, pixel);
    }

    pub fn fill(&mut self, pixel: Rgba) {
        for (c, value) in pixel.iter().enumerate() {
            self.data.index_axis_mut(ndarray::Axis(2), c).fill(*value);
        }
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array3<u8> {
        &self.data
    }

    /// Contiguous row-major bytes, when the storage allows it.
    pub(crate) fn as_slice_mut(&mut self) -> Option<&mut [u8]> {
        self.data.as_slice_mut()
    }

    /// Flat RGBA bytes in row-major order.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    /// Consume the buffer into flat RGBA bytes.
    pub fn into_rgba(self) -> Vec<u8> {
        if self.data.is_standard_layout() {
            self.data.into_raw_vec_and_offset().0
        } else {
            self.data.iter().copied().collect()
        }
    }

    /// Re-check the structural invariants.
    pub fn validate(&self) -> Result<()> {
        let (height, width, channels) = self.data.dim();
        check_dims(width, height)?;
        if channels != CHANNELS {
            return Err(EngineError::InvalidBuffer(format!(
                "expected 4 channels, got {}",
                channels
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Channel arithmetic
// ============================================================================

/// Round half toward positive infinity.
#[inline]
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Write a computed value into an 8-bit channel.
///
/// Clamps to [0, 255] and rounds half to even, matching a clamped byte
/// store. NaN maps to 0.
#[inline]
pub fn store(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, 255.0).round_ties_even() as u8
}

/// Rec. 601 luma rounded to the nearest integer.
#[inline]
pub fn luma(pixel: Rgba) -> u8 {
    let v = 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
    store(round_half_up(v))
}
