//! WebAssembly exports.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Buffers cross
//! the boundary as flat RGBA bytes; parameters and descriptors as JSON.
//!
//! A host that wants to stay responsive drives a [`WasmInvocation`] from its
//! own event loop, calling `resume()` once per frame:
//!
//! ```js
//! const run = new WasmInvocation("gaussianBlur", data, width, height, '{"radius": 4}');
//! function tick() {
//!   const fraction = run.resume();
//!   if (fraction < 0) { show(run.finish()); return; }
//!   progress(fraction);
//!   requestAnimationFrame(tick);
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::buffer::PixelBuffer;
use crate::error::EngineError;
use crate::registry::{list_algorithms, Params};
use crate::scheduler::{CancelToken, Invocation, RunState, Scheduler, Step};

fn js_error(err: EngineError) -> JsError {
    JsError::new(&err.to_string())
}

fn parse_params(params_json: &str) -> Result<Params, JsError> {
    if params_json.trim().is_empty() {
        return Ok(Params::new());
    }
    Params::from_json(params_json).map_err(js_error)
}

// ============================================================================
// Catalog
// ============================================================================

/// JSON array of algorithm descriptors, grouped by category.
#[wasm_bindgen(js_name = listAlgorithms)]
pub fn list_algorithms_json() -> Result<String, JsError> {
    serde_json::to_string(&list_algorithms()).map_err(|e| JsError::new(&e.to_string()))
}

// ============================================================================
// Invocation
// ============================================================================

/// A run the host advances one yield interval at a time.
#[wasm_bindgen]
pub struct WasmInvocation {
    inner: Option<Invocation>,
    cancel: CancelToken,
}

#[wasm_bindgen]
impl WasmInvocation {
    /// # Arguments
    /// * `id` - Algorithm id, e.g. `"gaussianBlur"`
    /// * `data` - Flat RGBA bytes (length = width * height * 4)
    /// * `params_json` - Object of parameter values; empty for defaults
    #[wasm_bindgen(constructor)]
    pub fn new(id: &str, data: &[u8], width: usize, height: usize, params_json: &str) -> Result<WasmInvocation, JsError> {
        let buffer = PixelBuffer::from_rgba(width, height, data.to_vec()).map_err(js_error)?;
        let params = parse_params(params_json)?;
        let cancel = CancelToken::new();
        let inner = Scheduler::default()
            .start_with_cancel(id, &buffer, &params, cancel.clone())
            .map_err(js_error)?;
        Ok(WasmInvocation {
            inner: Some(inner),
            cancel,
        })
    }

    /// Advance to the next yield point.
    ///
    /// Returns the completed fraction, or `-1` once the run is done.
    pub fn resume(&mut self) -> Result<f64, JsError> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| js_error(EngineError::NotFinished(RunState::Completed)))?;
        match inner.resume().map_err(js_error)? {
            Step::Progress(event) => Ok(event.fraction),
            Step::Done => Ok(-1.0),
        }
    }

    /// RGBA bytes of the finished result.
    pub fn finish(&mut self) -> Result<Vec<u8>, JsError> {
        let inner = self
            .inner
            .take()
            .ok_or_else(|| js_error(EngineError::NotFinished(RunState::Completed)))?;
        Ok(inner.finish().map_err(js_error)?.into_rgba())
    }

    /// Abort at the next yield point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Run `id` to completion without yielding to the host.
#[wasm_bindgen(js_name = runAlgorithm)]
pub fn run_algorithm(id: &str, data: &[u8], width: usize, height: usize, params_json: &str) -> Result<Vec<u8>, JsError> {
    let buffer = PixelBuffer::from_rgba(width, height, data.to_vec()).map_err(js_error)?;
    let params = parse_params(params_json)?;
    let output = crate::run(id, &buffer, &params, |_| {}).map_err(js_error)?;
    Ok(output.into_rgba())
}
