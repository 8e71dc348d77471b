use burn::data::dataset::Dataset;

use crate::data::preprocessor::Preprocessor;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::{Mode, Sample};

/// In-memory store of raw pixel rows and labels.
///
/// Rows stay as u8 until accessed; `sample(i)` runs the preprocessor on
/// every access, so the stored data is never mutated.
#[derive(Debug, Clone)]
pub struct SampleStore {
    images:       Vec<Vec<u8>>,
    labels:       Option<Vec<usize>>,
    preprocessor: Preprocessor,
    mode:         Mode,
}

impl SampleStore {
    /// Build a store, checking every row against the preprocessor's shape.
    ///
    /// Train and valid stores must carry one label per image; a test store
    /// may carry labels but never returns them.
    pub fn new(
        images:       Vec<Vec<u8>>,
        labels:       Option<Vec<usize>>,
        preprocessor: Preprocessor,
        mode:         Mode,
    ) -> PipelineResult<Self> {
        let expected = preprocessor.shape().pixels();
        if let Some(bad) = images.iter().position(|row| row.len() != expected) {
            return Err(PipelineError::data_shape(format!(
                "image {bad} has {} pixels, expected {expected}",
                images[bad].len()
            )));
        }

        match (&labels, mode.yields_labels()) {
            (Some(l), _) if l.len() != images.len() => {
                return Err(PipelineError::data_shape(format!(
                    "{} images but {} labels",
                    images.len(),
                    l.len()
                )));
            }
            (None, true) => {
                return Err(PipelineError::data_shape(format!(
                    "{mode:?} store requires labels"
                )));
            }
            _ => {}
        }

        Ok(Self { images, labels, preprocessor, mode })
    }

    /// Unlabeled store for inference.
    pub fn unlabeled(images: Vec<Vec<u8>>, preprocessor: Preprocessor) -> PipelineResult<Self> {
        Self::new(images, None, preprocessor, Mode::Test)
    }

    /// Transformed sample at `index`.
    pub fn sample(&self, index: usize) -> PipelineResult<Sample> {
        let raw = self.images.get(index).ok_or(PipelineError::IndexOutOfRange {
            index,
            len: self.images.len(),
        })?;

        let label = if self.mode.yields_labels() {
            self.labels.as_ref().map(|l| l[index])
        } else {
            None
        };

        Ok(Sample {
            pixels: self.preprocessor.apply(raw)?,
            dims:   self.preprocessor.dims(),
            label,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.images.len()
    }
}

impl Dataset<Sample> for SampleStore {
    fn get(&self, index: usize) -> Option<Sample> {
        self.sample(index).ok()
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}
