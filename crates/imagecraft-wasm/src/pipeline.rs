//! Edit pipeline WASM bindings.
//!
//! ```typescript
//! import { decode_image, JsEditPipeline } from '@imagecraft/wasm';
//!
//! const pipeline = new JsEditPipeline();
//! pipeline.load_source(decode_image(bytes));
//! let preview = pipeline.append_or_replace('brightness', { value: 0.2 });
//! preview = pipeline.append_or_replace('brightness', { value: 0.3 }); // replaces
//! preview = pipeline.append_or_replace('rotate', { degrees: 90 });
//! ```

use imagecraft_core::{AspectHint, EditPipeline, EngineConfig, EngineError, Operation};
use wasm_bindgen::prelude::*;
use web_sys::console;

use crate::catalog::params_from_js;
use crate::types::JsRasterImage;

/// Stateful editing session owning a source image and its operation list.
#[wasm_bindgen]
pub struct JsEditPipeline {
    inner: EditPipeline,
}

#[wasm_bindgen]
impl JsEditPipeline {
    /// Create a pipeline. `config` is an optional `{ interpolation, maxPixels }` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsEditPipeline, JsValue> {
        let config: EngineConfig = if config.is_undefined() || config.is_null() {
            EngineConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        Ok(Self::with_config(config))
    }

    /// Replace the source image and drop all operations.
    pub fn load_source(&mut self, image: &JsRasterImage) -> Result<(), JsValue> {
        self.inner
            .load_source(image.raster().clone())
            .map_err(crate::js_error)
    }

    /// Replace the source image, center-cropping it to `aspect_width:aspect_height`.
    pub fn load_source_with_aspect(
        &mut self,
        image: &JsRasterImage,
        aspect_width: u32,
        aspect_height: u32,
    ) -> Result<(), JsValue> {
        let aspect = AspectHint::new(aspect_width, aspect_height).map_err(crate::js_error)?;
        self.inner
            .load_source_with_aspect(image.raster().clone(), aspect)
            .map_err(crate::js_error)
    }

    /// Apply an operation, replacing the last one when it drives the same
    /// slider, and return the new output.
    ///
    /// On error the pipeline keeps its previous operations and output.
    pub fn append_or_replace(&mut self, kind: &str, params: JsValue) -> Result<JsRasterImage, JsValue> {
        let params = params_from_js(params)?;
        let op = crate::catalog::parse_operation(kind, &params).map_err(crate::js_error)?;
        self.apply_operation(op).map_err(report)
    }

    /// Replace the whole operation list with canonical operation objects
    /// (as returned by `validate_operation`).
    pub fn set_operations(&mut self, operations: JsValue) -> Result<JsRasterImage, JsValue> {
        let operations: Vec<Operation> =
            serde_wasm_bindgen::from_value(operations).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.inner
            .set_operations(operations)
            .map(|out| JsRasterImage::from_raster((*out).clone()))
            .map_err(report)
    }

    /// Drop all operations; the output reverts to the source.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// The current output, if a source is loaded.
    pub fn output(&self) -> Option<JsRasterImage> {
        self.inner
            .output()
            .map(|out| JsRasterImage::from_raster(out.as_ref().clone()))
    }

    #[wasm_bindgen(getter)]
    pub fn operation_count(&self) -> usize {
        self.inner.operations().len()
    }

    /// Current state name: `empty`, `loaded`, `rendering` or `rendered`.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.state_name().to_string()
    }

    /// Operations currently applied, as canonical operation objects.
    pub fn operations(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.operations()).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Surface render failures the user cannot fix by moving a slider.
fn report(err: EngineError) -> JsValue {
    if !err.is_user_correctable() {
        console::warn_1(&JsValue::from_str(&format!("edit rolled back: {}", err)));
    }
    crate::js_error(err)
}

impl JsEditPipeline {
    pub(crate) fn with_config(config: EngineConfig) -> Self {
        Self {
            inner: EditPipeline::new(config),
        }
    }

    pub(crate) fn apply_operation(&mut self, op: Operation) -> imagecraft_core::Result<JsRasterImage> {
        let out = self.inner.append_or_replace(op)?;
        Ok(JsRasterImage::from_raster(out.as_ref().clone()))
    }

    pub(crate) fn state_name(&self) -> &'static str {
        use imagecraft_core::PipelineState;
        match self.inner.state() {
            PipelineState::Empty => "empty",
            PipelineState::Loaded => "loaded",
            PipelineState::Rendering => "rendering",
            PipelineState::Rendered => "rendered",
        }
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &EditPipeline {
        &self.inner
    }

    #[cfg(test)]
    pub(crate) fn inner_mut(&mut self) -> &mut EditPipeline {
        &mut self.inner
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn source() -> JsRasterImage {
        JsRasterImage::new(40, 30, vec![90u8; 40 * 30 * 3], false).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_pipeline_end_to_end() {
        let mut pipeline = JsEditPipeline::new(JsValue::UNDEFINED).unwrap();
        pipeline.load_source(&source()).unwrap();

        let params = serde_wasm_bindgen::to_value(&imagecraft_core::OperationParams {
            degrees: Some(90.0),
            ..Default::default()
        })
        .unwrap();
        let out = pipeline.append_or_replace("rotate", params).unwrap();
        assert_eq!((out.width(), out.height()), (30, 40));
        assert_eq!(pipeline.state(), "rendered");
    }

    #[wasm_bindgen_test]
    fn test_pipeline_rejects_unknown_kind() {
        let mut pipeline = JsEditPipeline::new(JsValue::NULL).unwrap();
        pipeline.load_source(&source()).unwrap();
        assert!(pipeline.append_or_replace("swirl", JsValue::UNDEFINED).is_err());
        assert_eq!(pipeline.operation_count(), 0);
    }

    #[wasm_bindgen_test]
    fn test_load_source_with_aspect() {
        let mut pipeline = JsEditPipeline::new(JsValue::UNDEFINED).unwrap();
        pipeline.load_source_with_aspect(&source(), 1, 1).unwrap();
        let out = pipeline.output().unwrap();
        assert_eq!(out.width(), out.height());
    }
}
