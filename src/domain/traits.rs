// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so a
// different storage format or augmentation scheme can be
// plugged in without touching the pipeline.

use anyhow::Result;

use crate::domain::sample::{ImageShape, Partition, RawImages};

// ─── LabeledImageSource ───────────────────────────────────────────────────────
/// Anything that can produce aligned pixel rows and labels for a partition.
///
/// Implementations:
///   - CsvImageSource → two CSV tables per partition
pub trait LabeledImageSource {
    /// Load every image of `partition` with its 0-indexed label.
    fn load(&self, partition: Partition) -> Result<RawImages>;
}

// ─── ImageAugment ─────────────────────────────────────────────────────────────
/// A whole-batch image-to-image transform.
///
/// The output has the same length and per-image size as the input.
/// Implementations must be deterministic for a fixed configuration.
pub trait ImageAugment {
    fn augment(&self, images: &[Vec<u8>], shape: ImageShape) -> Vec<Vec<u8>>;
}
