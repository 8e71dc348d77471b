/// Per-epoch learning-rate policy, stepped once after each validation phase.
pub trait LrScheduler {
    /// Learning rate to use for the next epoch.
    fn step(&mut self, epoch: usize, current_lr: f64, valid_loss: f64) -> f64;
}

/// Keeps the learning rate unchanged. Same behaviour as passing no scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantLr;

impl LrScheduler for ConstantLr {
    fn step(&mut self, _epoch: usize, current_lr: f64, _valid_loss: f64) -> f64 {
        current_lr
    }
}

/// Multiply the learning rate by `gamma` every `step_size` epochs.
#[derive(Debug, Clone, Copy)]
pub struct StepDecay {
    pub step_size: usize,
    pub gamma:     f64,
}

impl StepDecay {
    pub fn new(step_size: usize, gamma: f64) -> Self {
        Self { step_size: step_size.max(1), gamma }
    }
}

impl LrScheduler for StepDecay {
    fn step(&mut self, epoch: usize, current_lr: f64, _valid_loss: f64) -> f64 {
        if epoch % self.step_size == 0 {
            current_lr * self.gamma
        } else {
            current_lr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_is_noop() {
        let mut s = ConstantLr;
        assert_eq!(s.step(1, 0.01, 3.0), 0.01);
    }

    #[test]
    fn test_step_decay_every_n_epochs() {
        let mut s = StepDecay::new(2, 0.5);
        let mut lr = 1.0;
        let mut seen = Vec::new();
        for epoch in 1..=5 {
            lr = s.step(epoch, lr, 0.0);
            seen.push(lr);
        }
        assert_eq!(seen, vec![1.0, 0.5, 0.5, 0.25, 0.25]);
    }
}
