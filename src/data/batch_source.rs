// ============================================================
// Layer 4 — Batch Source
// ============================================================
// Walks a SampleStore in fixed-size chunks and hands each chunk
// to the ImageBatcher.
//
//   store (len L) ──► order (0..L, or a fresh permutation)
//                 ──► chunks of batch_size
//                 ──► ImageBatch
//
// Every traversal covers each index exactly once. The last
// batch is short when L % batch_size != 0. With shuffling on,
// the source owns a seeded StdRng and draws a new permutation
// per traversal, so the sequence of orders is reproducible for
// a fixed seed.

use burn::{data::dataloader::batcher::Batcher, prelude::*};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::batcher::{ImageBatch, ImageBatcher};
use crate::data::dataset::SampleStore;
use crate::domain::error::{PipelineError, PipelineResult};

pub struct BatchSource<B: Backend> {
    store:      SampleStore,
    batcher:    ImageBatcher<B>,
    batch_size: usize,
    rng:        Option<StdRng>,
}

impl<B: Backend> BatchSource<B> {
    /// Sequential source: every traversal visits indices in store order.
    pub fn sequential(store: SampleStore, batch_size: usize, device: B::Device) -> PipelineResult<Self> {
        Self::build(store, batch_size, device, None)
    }

    /// Shuffled source: each traversal uses a new permutation drawn from `seed`.
    pub fn shuffled(
        store:      SampleStore,
        batch_size: usize,
        device:     B::Device,
        seed:       u64,
    ) -> PipelineResult<Self> {
        Self::build(store, batch_size, device, Some(StdRng::seed_from_u64(seed)))
    }

    fn build(
        store:      SampleStore,
        batch_size: usize,
        device:     B::Device,
        rng:        Option<StdRng>,
    ) -> PipelineResult<Self> {
        if batch_size == 0 {
            return Err(PipelineError::config("batch size must be positive"));
        }
        Ok(Self { store, batcher: ImageBatcher::new(device), batch_size, rng })
    }

    pub fn sample_count(&self) -> usize {
        self.store.sample_count()
    }

    pub fn num_batches(&self) -> usize {
        self.store.sample_count().div_ceil(self.batch_size)
    }

    /// Index order for the next traversal.
    fn next_order(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.store.sample_count()).collect();
        if let Some(rng) = self.rng.as_mut() {
            order.shuffle(rng);
        }
        order
    }

    /// Start a traversal. Each call restarts from the first batch.
    pub fn iter(&mut self) -> BatchIter<'_, B> {
        let order = self.next_order();
        BatchIter {
            store:      &self.store,
            batcher:    &self.batcher,
            batch_size: self.batch_size,
            order,
            cursor:     0,
        }
    }
}

/// One traversal over a BatchSource.
pub struct BatchIter<'a, B: Backend> {
    store:      &'a SampleStore,
    batcher:    &'a ImageBatcher<B>,
    batch_size: usize,
    order:      Vec<usize>,
    cursor:     usize,
}

impl<B: Backend> Iterator for BatchIter<'_, B> {
    type Item = PipelineResult<ImageBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indices = &self.order[self.cursor..end];
        self.cursor = end;

        let samples: PipelineResult<Vec<_>> = indices.iter().map(|&i| self.store.sample(i)).collect();
        Some(samples.map(|s| self.batcher.batch(s, &self.batcher.device)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessor::Preprocessor;
    use crate::domain::sample::{ImageShape, Mode};
    use burn::backend::NdArray;
    use proptest::prelude::*;

    type TestBackend = NdArray;

    /// Store where image i is filled with the value i, label i.
    fn store(len: usize) -> SampleStore {
        SampleStore::new(
            (0..len).map(|i| vec![i as u8; 4]).collect(),
            Some((0..len).collect()),
            Preprocessor::new(ImageShape::new(2, 2)),
            Mode::Train,
        )
        .unwrap()
    }

    /// Labels of one full traversal, in visiting order.
    fn traversal(source: &mut BatchSource<TestBackend>) -> Vec<usize> {
        source
            .iter()
            .flat_map(|b| {
                let labels = b.unwrap().labels.unwrap();
                labels.into_data().iter::<i64>().map(|l| l as usize).collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn test_batch_sizes_cover_store() {
        let mut src = BatchSource::<TestBackend>::sequential(store(10), 4, Default::default()).unwrap();
        let sizes: Vec<usize> = src.iter().map(|b| b.unwrap().size()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(src.num_batches(), 3);
    }

    #[test]
    fn test_sequential_traversals_repeat() {
        let mut src = BatchSource::<TestBackend>::sequential(store(7), 3, Default::default()).unwrap();
        let first  = traversal(&mut src);
        let second = traversal(&mut src);
        assert_eq!(first, (0..7).collect::<Vec<_>>());
        assert_eq!(first, second);
    }

    #[test]
    fn test_shuffled_traversals_reorder_but_cover_all() {
        let mut src = BatchSource::<TestBackend>::shuffled(store(32), 5, Default::default(), 42).unwrap();
        let first  = traversal(&mut src);
        let second = traversal(&mut src);

        let mut a = first.clone();
        let mut b = second.clone();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, (0..32).collect::<Vec<_>>());
        assert_eq!(b, (0..32).collect::<Vec<_>>());
        assert_ne!(first, second);
    }

    #[test]
    fn test_same_seed_same_orders() {
        let mut x = BatchSource::<TestBackend>::shuffled(store(16), 4, Default::default(), 7).unwrap();
        let mut y = BatchSource::<TestBackend>::shuffled(store(16), 4, Default::default(), 7).unwrap();
        assert_eq!(traversal(&mut x), traversal(&mut y));
        assert_eq!(traversal(&mut x), traversal(&mut y));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = BatchSource::<TestBackend>::sequential(store(3), 0, Default::default())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_iter_restarts() {
        let mut src = BatchSource::<TestBackend>::sequential(store(4), 2, Default::default()).unwrap();
        let mut it = src.iter();
        assert!(it.next().is_some());
        drop(it);
        assert_eq!(traversal(&mut src), vec![0, 1, 2, 3]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_every_traversal_is_a_permutation(len in 1usize..40, bs in 1usize..9, seed in any::<u64>()) {
            let mut src = BatchSource::<TestBackend>::shuffled(store(len), bs, Default::default(), seed).unwrap();
            for _ in 0..2 {
                let mut seen = traversal(&mut src);
                seen.sort_unstable();
                prop_assert_eq!(seen, (0..len).collect::<Vec<_>>());
            }
        }
    }
}
