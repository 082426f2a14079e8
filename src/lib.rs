//! Pixelforge
//!
//! A cooperative raster-image transformation engine. A caller hands in an
//! RGBA buffer, an algorithm id and numeric parameters; the engine returns a
//! new buffer of the same size and reports progress at regular yield points
//! so a single-threaded host can stay responsive.
//!
//! ## Image Format
//! Buffers are 8-bit RGBA, row-major, `(height, width, 4)`. The input buffer
//! is never modified.
//!
//! ## Architecture
//! - [`registry`]: the catalog of algorithm ids and their parameter schemas
//! - [`engine`]: generic pointwise, convolution, resample and composite passes
//! - [`filters`]: per-algorithm configurations of those passes
//! - [`scheduler`]: yield intervals, progress events, cancellation
//!
//! ## Example
//! ```
//! use pixelforge::{run, Params, PixelBuffer};
//!
//! let input = PixelBuffer::filled(4, 4, [200, 100, 50, 255]).unwrap();
//! let output = run("invert", &input, &Params::new(), |_| {}).unwrap();
//! assert_eq!(output.at(0, 0), [55, 155, 205, 255]);
//! ```

pub mod buffer;
pub mod color;
pub mod engine;
pub mod error;
pub mod filters;
pub mod noise;
pub mod registry;
pub mod scheduler;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use buffer::PixelBuffer;
pub use error::{EngineError, Result};
pub use registry::{AlgorithmDescriptor, AlgorithmId, Category, EngineKind, Params};
pub use scheduler::{CancelToken, Invocation, ProgressEvent, RunState, Scheduler, SchedulerConfig, Step};

/// Run `id` to completion with the default scheduler configuration.
///
/// `on_progress` sees every yield point, ending with a fraction of exactly 1.
///
/// # Errors
/// `UnknownAlgorithm` or `InvalidBuffer` before any work starts.
pub fn run<F>(id: &str, buffer: &PixelBuffer, params: &Params, on_progress: F) -> Result<PixelBuffer>
where
    F: FnMut(&ProgressEvent<'_>),
{
    Scheduler::default().run(id, buffer, params, on_progress)
}

/// Catalog entries grouped by category, in registration order within each.
pub fn list_algorithms() -> Vec<&'static AlgorithmDescriptor> {
    registry::list_algorithms()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_reports_final_progress() {
        let input = PixelBuffer::filled(40, 30, [10, 20, 30, 255]).unwrap();
        let mut last = 0.0;
        let out = run("grayscale", &input, &Params::new(), |event| last = event.fraction).unwrap();
        assert_eq!(last, 1.0);
        assert_eq!(out.at(5, 5), [18, 18, 18, 255]);
    }

    #[test]
    fn test_run_unknown_id() {
        let input = PixelBuffer::filled(2, 2, [0, 0, 0, 255]).unwrap();
        let err = run("sepia", &input, &Params::new(), |_| {}).unwrap_err();
        assert_eq!(err, EngineError::UnknownAlgorithm("sepia".into()));
    }

    #[test]
    fn test_list_algorithms_covers_catalog() {
        assert_eq!(list_algorithms().len(), AlgorithmId::ALL.len());
    }
}
