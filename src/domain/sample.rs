// ============================================================
// Layer 3 — Image Sample Domain Types
// ============================================================
// Plain data: raw pixel rows as they come off disk, the
// transformed sample a store hands out, and the small enums
// that select behaviour (store mode, dataset variant).

use serde::{Deserialize, Serialize};

/// Which phase a store serves. Only controls whether labels are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Train,
    Valid,
    Test,
}

impl Mode {
    pub fn yields_labels(self) -> bool {
        !matches!(self, Mode::Test)
    }
}

/// Which pair of CSV files to read for each partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataVariant {
    Primary,
    Alternate,
}

/// The two on-disk partitions of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Test,
}

impl DataVariant {
    /// (images file, labels file) for one partition.
    pub fn file_names(self, partition: Partition) -> (&'static str, &'static str) {
        match (self, partition) {
            (DataVariant::Primary, Partition::Train) => ("Train Images.csv", "Train Labels.csv"),
            (DataVariant::Primary, Partition::Test) => ("Test Images.csv", "Test Labels.csv"),
            (DataVariant::Alternate, Partition::Train) => {
                ("csvTrainImages 13440x1024.csv", "csvTrainLabel 13440x1.csv")
            }
            (DataVariant::Alternate, Partition::Test) => {
                ("csvTestImages 3360x1024.csv", "csvTestLabel 3360x1.csv")
            }
        }
    }
}

/// Spatial size of every image in a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: usize,
    pub width:  usize,
}

impl ImageShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn pixels(&self) -> usize {
        self.height * self.width
    }
}

/// Flat 8-bit pixel rows with 0-indexed labels, exactly as loaded.
///
/// `labels` is aligned 1:1 with `images`; the 1 → 0 label shift has
/// already been applied by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImages {
    pub shape:  ImageShape,
    pub images: Vec<Vec<u8>>,
    pub labels: Vec<usize>,
}

impl RawImages {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Number of classes implied by the largest label.
    pub fn num_classes(&self) -> usize {
        self.labels.iter().max().map_or(0, |m| m + 1)
    }
}

/// One transformed sample: a `[1, H, W]` (or `[H, W]`) float grid in
/// unit range plus its label (absent in test mode).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub pixels: Vec<f32>,
    pub dims:   Vec<usize>,
    pub label:  Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_test_mode_hides_labels() {
        assert!(Mode::Train.yields_labels());
        assert!(Mode::Valid.yields_labels());
        assert!(!Mode::Test.yields_labels());
    }

    #[test]
    fn test_num_classes_from_max_label() {
        let raw = RawImages {
            shape:  ImageShape::new(1, 1),
            images: vec![vec![0], vec![0], vec![0]],
            labels: vec![0, 4, 2],
        };
        assert_eq!(raw.num_classes(), 5);
    }

    #[test]
    fn test_alternate_variant_file_names() {
        let (img, lbl) = DataVariant::Alternate.file_names(Partition::Test);
        assert_eq!(img, "csvTestImages 3360x1024.csv");
        assert_eq!(lbl, "csvTestLabel 3360x1.csv");
    }
}
