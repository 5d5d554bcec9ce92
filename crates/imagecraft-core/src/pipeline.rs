//! The edit pipeline: an ordered operation list over an untouched source.
//!
//! The output is never edited in place. Every change re-derives it by
//! folding the filter engine over the full operation list, starting from the
//! original source, so slider edits are always relative to the original and
//! never compound. A change is committed only when the whole fold succeeds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::Operation;
use crate::config::EngineConfig;
use crate::engine::FilterEngine;
use crate::error::{EngineError, Result};
use crate::geometry::{self, CropRect};
use crate::raster::{check_budget, RasterImage};

/// Lifecycle of an [`EditPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineState {
    /// No source loaded.
    Empty,
    /// Source present; output equals the source.
    Loaded,
    /// Re-deriving the output. Only observable while a call is running.
    Rendering,
    /// Output derived from at least one operation.
    Rendered,
}

/// Target aspect ratio for acquisition, e.g. 3:4 for portrait capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectHint {
    width: u32,
    height: u32,
}

impl AspectHint {
    /// Portrait 3:4, the capture framing of the camera screen.
    pub const PORTRAIT_3_4: AspectHint = AspectHint { width: 3, height: 4 };
    pub const SQUARE: AspectHint = AspectHint { width: 1, height: 1 };

    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::invalid(
                "aspect",
                format!("ratio terms must be > 0, got {}:{}", width, height),
            ));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Source image plus the ordered operations applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    source: Arc<RasterImage>,
    operations: Vec<Operation>,
}

impl EditState {
    pub fn source(&self) -> &Arc<RasterImage> {
        &self.source
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Fold the operations over the source.
    pub fn render(&self, engine: &FilterEngine) -> Result<RasterImage> {
        engine.apply_all(&self.source, &self.operations)
    }
}

/// Replace the last operation when it shares `op`'s category, else append.
fn append_or_replace_in(operations: &mut Vec<Operation>, op: Operation) {
    let replaces = match (operations.last(), op.category()) {
        (Some(last), Some(category)) => last.category() == Some(category),
        _ => false,
    };
    if replaces {
        operations.pop();
    }
    operations.push(op);
}

/// Owns the edit state and the current rendered output.
#[derive(Debug, Clone)]
pub struct EditPipeline {
    engine: FilterEngine,
    edit: Option<EditState>,
    output: Option<Arc<RasterImage>>,
    state: PipelineState,
}

impl Default for EditPipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EditPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: FilterEngine::new(config),
            edit: None,
            output: None,
            state: PipelineState::Empty,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    pub fn edit_state(&self) -> Option<&EditState> {
        self.edit.as_ref()
    }

    pub fn source(&self) -> Option<&Arc<RasterImage>> {
        self.edit.as_ref().map(|e| &e.source)
    }

    pub fn output(&self) -> Option<&Arc<RasterImage>> {
        self.output.as_ref()
    }

    pub fn operations(&self) -> &[Operation] {
        self.edit.as_ref().map(|e| e.operations.as_slice()).unwrap_or(&[])
    }

    /// Install a new source, clearing any previous edits.
    ///
    /// The image is made upright first. On error the pipeline is unchanged.
    pub fn load_source(&mut self, image: RasterImage) -> Result<()> {
        let upright = self.admit(image)?;
        self.install(upright);
        Ok(())
    }

    /// Like [`load_source`](Self::load_source), but first center-crops the
    /// upright image to the largest region with the requested aspect ratio.
    pub fn load_source_with_aspect(&mut self, image: RasterImage, aspect: AspectHint) -> Result<()> {
        let upright = self.admit(image)?;
        let rect = CropRect::centered_aspect(upright.width(), upright.height(), aspect.width, aspect.height);
        let framed = geometry::crop(&upright, &rect)?;
        self.install(framed);
        Ok(())
    }

    /// Add `op`, replacing the last operation if it has the same category,
    /// and re-derive the output.
    pub fn append_or_replace(&mut self, op: Operation) -> Result<Arc<RasterImage>> {
        let edit = self.edit.as_ref().ok_or(EngineError::NoSource)?;
        let mut operations = edit.operations.clone();
        append_or_replace_in(&mut operations, op);
        self.commit(operations)
    }

    /// Replace the whole operation list, e.g. to step through an undo stack.
    pub fn set_operations(&mut self, operations: Vec<Operation>) -> Result<Arc<RasterImage>> {
        if self.edit.is_none() {
            return Err(EngineError::NoSource);
        }
        self.commit(operations)
    }

    /// Drop all operations; the output reverts to the source.
    ///
    /// A no-op while no source is loaded.
    pub fn clear(&mut self) {
        if let Some(edit) = self.edit.as_mut() {
            debug!(dropped = edit.operations.len(), "clear edits");
            edit.operations.clear();
            self.output = Some(Arc::clone(&edit.source));
            self.state = PipelineState::Loaded;
        }
    }

    /// Check the budget and make the image upright.
    fn admit(&self, image: RasterImage) -> Result<RasterImage> {
        check_budget(image.width(), image.height(), image.format(), self.engine.config().max_pixels)?;
        image.normalize_orientation()
    }

    fn install(&mut self, source: RasterImage) {
        debug!(width = source.width(), height = source.height(), "load source");
        let source = Arc::new(source);
        self.output = Some(Arc::clone(&source));
        self.edit = Some(EditState {
            source,
            operations: Vec::new(),
        });
        self.state = PipelineState::Loaded;
    }

    /// Re-derive from the source with `operations` and commit both atomically.
    fn commit(&mut self, operations: Vec<Operation>) -> Result<Arc<RasterImage>> {
        let Some(edit) = self.edit.as_ref() else {
            return Err(EngineError::NoSource);
        };
        let candidate = EditState {
            source: Arc::clone(&edit.source),
            operations,
        };

        let previous = self.state;
        self.state = PipelineState::Rendering;
        debug!(operations = candidate.operations.len(), "render");

        match candidate.render(&self.engine) {
            Ok(output) => {
                let output = Arc::new(output);
                self.state = if candidate.operations.is_empty() {
                    PipelineState::Loaded
                } else {
                    PipelineState::Rendered
                };
                self.edit = Some(candidate);
                self.output = Some(Arc::clone(&output));
                Ok(output)
            }
            Err(err) => {
                warn!(error = %err, "render failed, keeping previous output");
                self.state = previous;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OperationKind;
    use crate::engine::apply;
    use crate::geometry::FlipAxis;
    use crate::raster::{Orientation, PixelFormat};

    fn gradient(width: u32, height: u32) -> RasterImage {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
            }
        }
        RasterImage::new(width, height, PixelFormat::Rgb8, pixels).unwrap()
    }

    fn loaded(image: RasterImage) -> EditPipeline {
        let mut pipeline = EditPipeline::default();
        pipeline.load_source(image).unwrap();
        pipeline
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_pipeline_is_send_sync() {
        assert_send_sync::<EditPipeline>();
        assert_send_sync::<EditState>();
    }

    #[test]
    fn test_starts_empty() {
        let pipeline = EditPipeline::default();
        assert_eq!(pipeline.state(), PipelineState::Empty);
        assert!(pipeline.output().is_none());
        assert!(pipeline.operations().is_empty());
    }

    #[test]
    fn test_edit_without_source_fails() {
        let mut pipeline = EditPipeline::default();
        let err = pipeline.append_or_replace(Operation::invert()).unwrap_err();
        assert_eq!(err, EngineError::NoSource);
        assert_eq!(pipeline.state(), PipelineState::Empty);
        assert_eq!(pipeline.set_operations(vec![]).unwrap_err(), EngineError::NoSource);
    }

    #[test]
    fn test_load_source_outputs_source() {
        let img = gradient(20, 10);
        let pipeline = loaded(img.clone());
        assert_eq!(pipeline.state(), PipelineState::Loaded);
        assert_eq!(**pipeline.output().unwrap(), img);
        assert!(Arc::ptr_eq(pipeline.output().unwrap(), pipeline.source().unwrap()));
    }

    #[test]
    fn test_load_source_normalizes_orientation() {
        let img = gradient(20, 10).with_orientation(Orientation::Rotate90CW);
        let pipeline = loaded(img);
        let source = pipeline.source().unwrap();
        assert_eq!(source.dimensions(), (10, 20));
        assert_eq!(source.orientation(), Orientation::Normal);
    }

    #[test]
    fn test_load_source_respects_budget() {
        let mut pipeline = EditPipeline::new(EngineConfig::default().with_max_pixels(100));
        let err = pipeline.load_source(gradient(20, 10)).unwrap_err();
        assert!(matches!(err, EngineError::ResourceExhausted { .. }));
        assert_eq!(pipeline.state(), PipelineState::Empty);
    }

    #[test]
    fn test_load_source_resets_operations() {
        let mut pipeline = loaded(gradient(8, 8));
        pipeline.append_or_replace(Operation::invert()).unwrap();
        pipeline.load_source(gradient(4, 4)).unwrap();
        assert!(pipeline.operations().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Loaded);
    }

    #[test]
    fn test_load_source_with_aspect() {
        let mut pipeline = EditPipeline::default();
        pipeline
            .load_source_with_aspect(gradient(1000, 1000), AspectHint::PORTRAIT_3_4)
            .unwrap();
        let source = pipeline.source().unwrap();
        assert_eq!(source.dimensions(), (750, 1000));
        assert_eq!(source.pixel(0, 0).unwrap()[0], (125 % 256) as u8);
    }

    #[test]
    fn test_aspect_hint_validation() {
        assert!(AspectHint::new(0, 4).is_err());
        assert_eq!(AspectHint::new(1, 1).unwrap(), AspectHint::SQUARE);
    }

    #[test]
    fn test_brightness_replaces_not_stacks() {
        let img = gradient(16, 16);
        let mut pipeline = loaded(img.clone());
        pipeline.append_or_replace(Operation::brightness(0.2).unwrap()).unwrap();
        let output = pipeline.append_or_replace(Operation::brightness(0.3).unwrap()).unwrap();

        assert_eq!(pipeline.operations(), &[Operation::brightness(0.3).unwrap()]);
        let direct = apply(&img, &Operation::brightness(0.3).unwrap()).unwrap();
        assert_eq!(*output, direct);
    }

    #[test]
    fn test_different_categories_append() {
        let mut pipeline = loaded(gradient(8, 8));
        pipeline.append_or_replace(Operation::brightness(0.1).unwrap()).unwrap();
        pipeline.append_or_replace(Operation::contrast(1.2).unwrap()).unwrap();
        pipeline.append_or_replace(Operation::brightness(0.1).unwrap()).unwrap();
        let kinds: Vec<_> = pipeline.operations().iter().map(|op| op.kind()).collect();
        assert_eq!(
            kinds,
            vec![OperationKind::Brightness, OperationKind::Contrast, OperationKind::Brightness]
        );
    }

    #[test]
    fn test_transforms_always_append() {
        let mut pipeline = loaded(gradient(8, 6));
        pipeline.append_or_replace(Operation::rotate(90.0).unwrap()).unwrap();
        let output = pipeline.append_or_replace(Operation::rotate(90.0).unwrap()).unwrap();
        assert_eq!(pipeline.operations().len(), 2);
        assert_eq!(output.dimensions(), (8, 6));
    }

    #[test]
    fn test_crop_rotate_order_matters() {
        let img = gradient(100, 80);
        let rect = CropRect::new(10, 5, 30, 20);

        let mut a = loaded(img.clone());
        a.append_or_replace(Operation::crop(rect).unwrap()).unwrap();
        let crop_then_rotate = a.append_or_replace(Operation::rotate(90.0).unwrap()).unwrap();

        let mut b = loaded(img);
        b.append_or_replace(Operation::rotate(90.0).unwrap()).unwrap();
        let rotate_then_crop = b.append_or_replace(Operation::crop(rect).unwrap()).unwrap();

        assert_eq!(crop_then_rotate.dimensions(), (20, 30));
        assert_eq!(rotate_then_crop.dimensions(), (30, 20));
        assert_ne!(crop_then_rotate, rotate_then_crop);
    }

    #[test]
    fn test_failed_edit_keeps_previous_output() {
        let mut pipeline = loaded(gradient(10, 10));
        let good = pipeline.append_or_replace(Operation::invert()).unwrap();

        let err = pipeline
            .append_or_replace(Operation::crop(CropRect::new(50, 50, 5, 5)).unwrap())
            .unwrap_err();
        assert!(matches!(err, EngineError::OutOfBounds { .. }));
        assert_eq!(pipeline.state(), PipelineState::Rendered);
        assert_eq!(pipeline.operations(), &[Operation::invert()]);
        assert!(Arc::ptr_eq(pipeline.output().unwrap(), &good));
    }

    #[test]
    fn test_failed_append_rolls_back() {
        let mut pipeline = EditPipeline::new(EngineConfig::default().with_max_pixels(150));
        pipeline.load_source(gradient(10, 10)).unwrap();
        pipeline.append_or_replace(Operation::rotate(90.0).unwrap()).unwrap();
        let err = pipeline.append_or_replace(Operation::rotate(45.0).unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::ResourceExhausted { .. }));
        assert_eq!(pipeline.operations().len(), 1);
    }

    #[test]
    fn test_failed_set_operations_rolls_back() {
        let mut pipeline = loaded(gradient(10, 10));
        let good = pipeline
            .set_operations(vec![Operation::grayscale(), Operation::flip(FlipAxis::Horizontal)])
            .unwrap();
        let before = pipeline.operations().to_vec();

        let err = pipeline
            .set_operations(vec![
                Operation::invert(),
                Operation::crop(CropRect::new(40, 0, 5, 5)).unwrap(),
            ])
            .unwrap_err();
        assert!(matches!(err, EngineError::OutOfBounds { .. }));
        assert_eq!(pipeline.state(), PipelineState::Rendered);
        assert_eq!(pipeline.operations(), before.as_slice());
        assert!(Arc::ptr_eq(pipeline.output().unwrap(), &good));
    }

    #[test]
    fn test_clear_reverts_to_source() {
        let img = gradient(12, 12);
        let mut pipeline = loaded(img.clone());
        pipeline.append_or_replace(Operation::sepia(1.0).unwrap()).unwrap();
        pipeline.clear();
        assert_eq!(pipeline.state(), PipelineState::Loaded);
        assert!(pipeline.operations().is_empty());
        assert_eq!(**pipeline.output().unwrap(), img);
    }

    #[test]
    fn test_clear_on_empty_is_noop() {
        let mut pipeline = EditPipeline::default();
        pipeline.clear();
        assert_eq!(pipeline.state(), PipelineState::Empty);
    }

    #[test]
    fn test_set_operations_replaces_list() {
        let img = gradient(12, 8);
        let mut pipeline = loaded(img.clone());
        pipeline.append_or_replace(Operation::noir()).unwrap();

        let ops = vec![Operation::flip(FlipAxis::Vertical), Operation::invert()];
        let output = pipeline.set_operations(ops.clone()).unwrap();
        assert_eq!(pipeline.operations(), ops.as_slice());
        assert_eq!(*output, FilterEngine::default().apply_all(&img, &ops).unwrap());

        pipeline.set_operations(vec![]).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Loaded);
        assert_eq!(**pipeline.output().unwrap(), img);
    }

    #[test]
    fn test_output_never_compounds() {
        let img = gradient(10, 10);
        let mut pipeline = loaded(img.clone());
        for _ in 0..5 {
            pipeline.append_or_replace(Operation::brightness(0.1).unwrap()).unwrap();
        }
        let direct = apply(&img, &Operation::brightness(0.1).unwrap()).unwrap();
        assert_eq!(**pipeline.output().unwrap(), direct);
    }

    #[test]
    fn test_end_to_end_sepia_then_brightness() {
        let img = RasterImage::solid(600, 800, [120, 110, 100]).unwrap();
        let mut pipeline = loaded(img);

        let sepia = pipeline.append_or_replace(Operation::sepia(1.0).unwrap()).unwrap();
        let before = sepia.luma_at(0, 0).unwrap();

        let output = pipeline.append_or_replace(Operation::brightness(0.2).unwrap()).unwrap();
        assert_eq!(output.dimensions(), (600, 800));
        assert!(output.luma_at(0, 0).unwrap() > before);
        assert_eq!(pipeline.state(), PipelineState::Rendered);
    }

    #[test]
    fn test_edit_state_renders_output() {
        let mut pipeline = loaded(gradient(9, 9));
        pipeline.append_or_replace(Operation::grayscale()).unwrap();
        let edit = pipeline.edit_state().unwrap();
        assert_eq!(edit.render(pipeline.engine()).unwrap(), **pipeline.output().unwrap());
    }
}
