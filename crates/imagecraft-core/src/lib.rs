//! ImageCraft Core - image transformation engine
//!
//! This crate models photo edits as validated, replayable operations over an
//! in-memory raster image: tonal adjustments, stylistic filters and
//! geometric transforms, combined by an edit pipeline that always re-derives
//! its output from the untouched source.
//!
//! The core does no I/O and no codec work; hosts hand it decoded pixels and
//! take rendered pixels back.

pub mod catalog;
pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod geometry;
mod parallel;
pub mod pipeline;
pub mod primitives;
pub mod raster;

pub use catalog::{
    validate, Adjustment, Color, Filter, Operation, OperationCategory, OperationFamily, OperationKind,
    OperationParams, OperationSpec, Transform,
};
pub use config::EngineConfig;
pub use curve::{CurveLut, CurvePoint, ToneCurve};
pub use engine::{apply, FilterEngine};
pub use error::{EngineError, Result};
pub use geometry::{CropRect, FlipAxis, InterpolationFilter};
pub use pipeline::{AspectHint, EditPipeline, EditState, PipelineState};
pub use raster::{ColorSpace, Orientation, PixelFormat, RasterImage, ResampleFilter};
