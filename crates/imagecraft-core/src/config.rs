//! Engine configuration.
//!
//! The configuration is a constant input to the filter engine: two engines
//! built from equal configs produce identical output for identical input.

use serde::{Deserialize, Serialize};

use crate::geometry::InterpolationFilter;

/// Default upper bound on the number of pixels a single output may hold.
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// Tunables shared by every operation the engine executes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Resampling used by arbitrary-angle rotation.
    pub interpolation: InterpolationFilter,
    /// Largest output (width * height) any operation may allocate.
    pub max_pixels: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationFilter::Bilinear,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl EngineConfig {
    /// Configuration suited to final export: Lanczos3 resampling.
    pub fn export() -> Self {
        Self {
            interpolation: InterpolationFilter::Lanczos3,
            ..Self::default()
        }
    }

    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }
}
