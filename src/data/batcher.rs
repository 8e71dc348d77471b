// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<Sample>
// into device tensors.
//
// How batching works here:
//   Input:  Vec of N Samples, each a flat [1, H, W] float grid
//   Output: ImageBatch with images [N, 1, H, W], labels [N]
//
//   All pixel vectors are concatenated into one long Vec and
//   reshaped:
//   [s1_p1, ..., s1_pHW, s2_p1, ..., sN_pHW] → [N, 1, H, W]
//
// Every sample from one store has the same size (checked when
// the store is built), so no padding is needed.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::Sample;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// A stacked group of samples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Pixel grids — shape: [batch_size, 1, height, width]
    pub images: Tensor<B, 4>,

    /// Class ids — shape: [batch_size]
    /// `None` when the samples came from an unlabeled (test) store.
    pub labels: Option<Tensor<B, 1, Int>>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn size(&self) -> usize {
        self.images.dims()[0]
    }
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device so tensors land on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<B, Sample, ImageBatch<B>> for ImageBatcher<B> {
    /// Stack samples into one batch.
    ///
    /// Labels are kept only if every sample has one.
    fn batch(&self, items: Vec<Sample>, _device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let (height, width) = match items.first().map(|s| s.dims.as_slice()) {
            Some([_, h, w]) | Some([h, w]) => (*h, *w),
            _ => (0, 0),
        };

        // ── Flatten pixels ────────────────────────────────────────────────────
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, 1, height, width]);

        // ── Collect labels ────────────────────────────────────────────────────
        // Burn uses i32 for Int tensor input, cast per sample
        let labels: Option<Vec<i32>> = items
            .iter()
            .map(|s| s.label.map(|l| l as i32))
            .collect();

        let labels = labels.map(|l| Tensor::<B, 1, Int>::from_ints(l.as_slice(), &self.device));

        ImageBatch { images, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn sample(value: f32, label: Option<usize>) -> Sample {
        Sample { pixels: vec![value; 6], dims: vec![1, 2, 3], label }
    }

    #[test]
    fn test_stacks_into_nchw() {
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![sample(0.5, Some(1)), sample(0.25, Some(3))], &batcher.device);

        assert_eq!(batch.images.dims(), [2, 1, 2, 3]);
        assert_eq!(batch.size(), 2);

        let labels: Vec<i64> = batch.labels.unwrap().into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![1, 3]);
    }

    #[test]
    fn test_unlabeled_samples_give_no_labels() {
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![sample(0.0, None), sample(1.0, None)], &batcher.device);
        assert!(batch.labels.is_none());
    }

    #[test]
    fn test_two_dimensional_samples_get_channel_axis() {
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let s = Sample { pixels: vec![0.0; 4], dims: vec![2, 2], label: Some(0) };
        let batch = batcher.batch(vec![s], &batcher.device);
        assert_eq!(batch.images.dims(), [1, 1, 2, 2]);
    }
}
