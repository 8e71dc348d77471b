// ============================================================
// Layer 4 — Stratified Train/Validation Splitter
// ============================================================
// Partitions the training pool into two sets whose class mix
// matches the pool:
//   - Training set:   used to update model weights
//   - Validation set: used for early stopping and best-model choice
//
// Allocation:
//   n_valid = round(fraction * n)
//   each class c first gets floor(n_valid * n_c / n) slots;
//   leftover slots go to the classes with the largest
//   fractional parts (ties: lower class id first).
//
// Which members of a class land in validation is decided by a
// Fisher-Yates shuffle from a StdRng seeded with `seed`. Both
// outputs are shuffled once more with the same RNG, so the
// whole partition is a pure function of (labels, fraction, seed).
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::{PipelineError, PipelineResult};

/// Default share of the pool held out for validation.
pub const DEFAULT_VALID_FRACTION: f64 = 0.2;

/// Index-level partition: positions into the original pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub valid: Vec<usize>,
}

/// Both halves of a split, images and labels kept aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Split<T> {
    pub train_images: Vec<T>,
    pub valid_images: Vec<T>,
    pub train_labels: Vec<usize>,
    pub valid_labels: Vec<usize>,
}

/// Compute a stratified partition of `labels`.
pub fn stratified_indices(labels: &[usize], fraction: f64, seed: u64) -> PipelineResult<SplitIndices> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(PipelineError::config(format!(
            "validation fraction must lie in [0, 1], got {fraction}"
        )));
    }

    let total   = labels.len();
    let n_valid = ((total as f64) * fraction).round() as usize;
    let mut rng = StdRng::seed_from_u64(seed);

    // ── Group indices by class ───────────────────────────────────────────────
    let num_classes = labels.iter().max().map_or(0, |m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); num_classes];
    for (i, &label) in labels.iter().enumerate() {
        by_class[label].push(i);
    }

    // ── Per-class quotas ─────────────────────────────────────────────────────
    let quotas = allocate(&by_class, n_valid, total);

    // ── Pick members ─────────────────────────────────────────────────────────
    let mut train = Vec::with_capacity(total - n_valid);
    let mut valid = Vec::with_capacity(n_valid);
    for (members, quota) in by_class.iter_mut().zip(quotas) {
        members.shuffle(&mut rng);
        valid.extend_from_slice(&members[..quota]);
        train.extend_from_slice(&members[quota..]);
    }

    train.shuffle(&mut rng);
    valid.shuffle(&mut rng);

    tracing::debug!(
        "Stratified split: {} training, {} validation over {} classes",
        train.len(),
        valid.len(),
        num_classes,
    );

    Ok(SplitIndices { train, valid })
}

/// Largest-remainder allocation of `n_valid` slots across classes.
fn allocate(by_class: &[Vec<usize>], n_valid: usize, total: usize) -> Vec<usize> {
    if total == 0 {
        return vec![0; by_class.len()];
    }

    let exact: Vec<f64> = by_class
        .iter()
        .map(|m| n_valid as f64 * m.len() as f64 / total as f64)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut leftover = n_valid - quotas.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..by_class.len()).collect();
    // stable sort keeps lower class ids first among equal remainders
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });

    for c in order {
        if leftover == 0 {
            break;
        }
        if quotas[c] < by_class[c].len() {
            quotas[c] += 1;
            leftover -= 1;
        }
    }
    quotas
}

/// Split aligned `images`/`labels` into train and validation halves.
pub fn split<T: Clone>(
    images:   &[T],
    labels:   &[usize],
    fraction: f64,
    seed:     u64,
) -> PipelineResult<Split<T>> {
    if images.len() != labels.len() {
        return Err(PipelineError::data_shape(format!(
            "{} images but {} labels",
            images.len(),
            labels.len()
        )));
    }

    let idx  = stratified_indices(labels, fraction, seed)?;
    let take = |ix: &[usize]| -> (Vec<T>, Vec<usize>) {
        ix.iter().map(|&i| (images[i].clone(), labels[i])).unzip()
    };
    let (train_images, train_labels) = take(&idx.train);
    let (valid_images, valid_labels) = take(&idx.valid);

    Ok(Split { train_images, valid_images, train_labels, valid_labels })
}
