use burn::lr_scheduler::LrScheduler;
use burn::LearningRate;

/// Multiplies the learning rate by `gamma` every `step_size` epochs.
#[derive(Clone, Debug)]
pub struct StepDecay {
    initial_lr: f64,
    step_size: usize,
    gamma: f64,
    epoch: usize,
}

impl StepDecay {
    pub fn new(initial_lr: f64, step_size: usize, gamma: f64) -> Self {
        Self {
            initial_lr,
            step_size: step_size.max(1),
            gamma,
            epoch: 0,
        }
    }

    pub fn lr(&self) -> f64 {
        self.initial_lr * self.gamma.powi((self.epoch / self.step_size) as i32)
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }
}

impl LrScheduler for StepDecay {
    /// Number of epochs already stepped.
    type Record = usize;

    /// Advances one epoch and returns the new learning rate.
    fn step(&mut self) -> LearningRate {
        self.epoch += 1;
        self.lr()
    }

    fn to_record(&self) -> Self::Record {
        self.epoch
    }

    fn load_record(mut self, record: Self::Record) -> Self {
        self.epoch = record;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decays_every_step_size_epochs() {
        let mut sched = StepDecay::new(1e-3, 2, 0.5);
        assert_eq!(sched.lr(), 1e-3);

        let lrs: Vec<f64> = (0..5).map(|_| LrScheduler::step(&mut sched)).collect();
        assert_eq!(lrs, vec![1e-3, 5e-4, 5e-4, 2.5e-4, 2.5e-4]);
        assert_eq!(sched.epoch(), 5);
    }

    #[test]
    fn record_restores_the_epoch() {
        let mut sched = StepDecay::new(1e-2, 1, 0.1);
        LrScheduler::step(&mut sched);
        LrScheduler::step(&mut sched);

        let restored = StepDecay::new(1e-2, 1, 0.1).load_record(sched.to_record());
        assert_eq!(restored.epoch(), 2);
        assert!((restored.lr() - 1e-4).abs() < 1e-12);
    }
}
