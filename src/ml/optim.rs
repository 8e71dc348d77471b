// ============================================================
// Layer 5 — Model Optimizer
// ============================================================
// Thin stateful wrapper around a Burn optimizer that exposes
// the classic three-call training step:
//
//   zero_gradients()        drop any gradients from the last batch
//   backward(loss, &model)  compute gradients for this batch
//   step(model) -> model    apply one update with those gradients
//
// Burn modules are values, so `step` consumes the model and
// returns the updated one.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::marker::PhantomData;

use burn::{
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

pub struct ModelOptimizer<M, B, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    optim:   O,
    lr:      f64,
    grads:   Option<GradientsParams>,
    _marker: PhantomData<(M, B)>,
}

impl<M, B, O> ModelOptimizer<M, B, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    pub fn new(optim: O, lr: f64) -> Self {
        Self { optim, lr, grads: None, _marker: PhantomData }
    }

    pub fn zero_gradients(&mut self) {
        self.grads = None;
    }

    pub fn backward(&mut self, loss: Tensor<B, 1>, model: &M) {
        let grads = loss.backward();
        self.grads = Some(GradientsParams::from_grads(grads, model));
    }

    /// Apply the pending gradients. Without pending gradients the model is
    /// returned unchanged.
    pub fn step(&mut self, model: M) -> M {
        match self.grads.take() {
            Some(grads) => self.optim.step(self.lr, model, grads),
            None => model,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    pub fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }
}

/// Adam with optional L2 weight decay.
///
/// m = β1*m + (1-β1)*g        (mean)
/// v = β2*v + (1-β2)*g²       (variance)
/// θ = θ - lr * m / (√v + ε)  (update)
pub fn adam<M, B>(lr: f64, weight_decay: f64) -> ModelOptimizer<M, B, impl Optimizer<M, B>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut config = AdamConfig::new().with_epsilon(1e-8);
    if weight_decay > 0.0 {
        config = config.with_weight_decay(Some(WeightDecayConfig::new(weight_decay as f32)));
    }
    ModelOptimizer::new(config.init(), lr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{CharCnn, CharCnnConfig, ImageClassifier};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn model() -> CharCnn<TestBackend> {
        CharCnnConfig::new(2)
            .with_filter_sizes([3, 3, 3])
            .with_channels([2, 2, 2])
            .init(&Default::default())
    }

    fn outputs(model: &CharCnn<TestBackend>) -> Vec<f32> {
        let images = Tensor::<TestBackend, 4>::ones([1, 1, 8, 8], &Default::default());
        model.forward(images).into_data().iter::<f32>().collect()
    }

    fn loss(model: &CharCnn<TestBackend>) -> Tensor<TestBackend, 1> {
        let images = Tensor::<TestBackend, 4>::ones([2, 1, 8, 8], &Default::default());
        model.forward(images).powf_scalar(2.0).mean()
    }

    #[test]
    fn test_step_changes_parameters() {
        let m = model();
        let before = outputs(&m);
        let mut optim = adam(1e-1, 0.0);
        optim.backward(loss(&m), &m);
        let m = optim.step(m);
        assert_ne!(before, outputs(&m));
    }

    #[test]
    fn test_step_after_zero_gradients_is_noop() {
        let m = model();
        let before = outputs(&m);
        let mut optim = adam(1e-1, 1e-4);
        optim.backward(loss(&m), &m);
        optim.zero_gradients();
        let m = optim.step(m);
        assert_eq!(before, outputs(&m));
    }

    #[test]
    fn test_learning_rate_is_adjustable() {
        let mut optim = adam::<CharCnn<TestBackend>, TestBackend>(1e-3, 0.0);
        optim.set_learning_rate(5e-4);
        assert_eq!(optim.learning_rate(), 5e-4);
    }
}
