//! ImageCraft WASM - WebAssembly bindings for the ImageCraft editing engine
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible image handle
//! - `decode` - JPEG/PNG decoding with EXIF orientation
//! - `encode` - JPEG/PNG export
//! - `catalog` - Operation validation and the list of supported kinds
//! - `pipeline` - Stateful edit session
//!
//! # Usage
//!
//! ```typescript
//! import init, { decode_image, encode_jpeg, JsEditPipeline } from '@imagecraft/wasm';
//!
//! await init();
//!
//! const pipeline = new JsEditPipeline();
//! pipeline.load_source_with_aspect(decode_image(bytes), 3, 4);
//! const out = pipeline.append_or_replace('sepia', { intensity: 0.7 });
//! const jpeg = encode_jpeg(out, 90);
//! ```

use std::fmt::Display;

use wasm_bindgen::prelude::*;

mod catalog;
mod decode;
mod encode;
mod pipeline;
mod types;

pub use catalog::{operation_kinds, validate_operation};
pub use decode::{decode_image, DecodeError};
pub use encode::{encode_jpeg, encode_png, EncodeError};
pub use pipeline::JsEditPipeline;
pub use types::JsRasterImage;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Convert an error into a JavaScript `Error` carrying its message.
pub(crate) fn js_error(err: impl Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_js_error_keeps_message() {
        let err: js_sys::Error = js_error("boom").into();
        assert_eq!(String::from(err.message()), "boom");
    }
}
