// ============================================================
// Layer 4 — Pixel Preprocessor
// ============================================================
// Turns one raw 8-bit pixel row into the float grid the model
// consumes.
//
// Steps (applied in order):
//   1. Cast each u8 intensity to f32
//   2. Scale into [0, 1] by dividing by 255
//   3. Interpret the flat row as a row-major H x W grid
//   4. Prepend a single channel axis → [1, H, W]
//
// The transform is pure: the same row always maps to the same
// output, and nothing about the preprocessor changes between
// calls.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::ImageShape;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    shape: ImageShape,
}

impl Preprocessor {
    /// Create a preprocessor for images of `shape`.
    pub fn new(shape: ImageShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Output dimensions, channel first: `[1, H, W]`.
    pub fn dims(&self) -> Vec<usize> {
        vec![1, self.shape.height, self.shape.width]
    }

    /// Apply the full pipeline to one raw row.
    pub fn apply(&self, raw: &[u8]) -> PipelineResult<Vec<f32>> {
        // ── Step 3 precondition: the row must fill the grid exactly ──────────
        if raw.len() != self.shape.pixels() {
            return Err(PipelineError::data_shape(format!(
                "expected {} pixels ({}x{}), got {}",
                self.shape.pixels(),
                self.shape.height,
                self.shape.width,
                raw.len()
            )));
        }

        // ── Steps 1 + 2: cast and scale ──────────────────────────────────────
        // Row-major flat order already is the [1, H, W] layout,
        // so reshaping is a matter of how `dims()` is reported.
        Ok(raw.iter().map(|&p| p as f32 / 255.0).collect())
    }
}
