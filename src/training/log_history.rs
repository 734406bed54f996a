use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

/// Every loss value tracked across an epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    TrainingLoss,
    TrainingConfidenceLoss,
    TrainingOffsetLoss,
    TrainingForecastLoss,
    ValLoss,
    EndToEndValLoss,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::TrainingLoss,
        Metric::TrainingConfidenceLoss,
        Metric::TrainingOffsetLoss,
        Metric::TrainingForecastLoss,
        Metric::ValLoss,
        Metric::EndToEndValLoss,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::TrainingLoss => "training_loss",
            Metric::TrainingConfidenceLoss => "training_tg_confidence_loss",
            Metric::TrainingOffsetLoss => "training_tg_huber_loss",
            Metric::TrainingForecastLoss => "training_tf_huber_loss",
            Metric::ValLoss => "val_loss",
            Metric::EndToEndValLoss => "end_to_end_val_loss",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loss values accumulated since the last drain.
#[derive(Clone, Debug, Default)]
pub struct LogHistory {
    samples: [Vec<f64>; 6],
}

impl LogHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metric: Metric, value: f64) {
        self.samples[metric.slot()].push(value);
    }

    pub fn samples(&self, metric: Metric) -> &[f64] {
        &self.samples[metric.slot()]
    }

    /// Mean of every metric recorded since the last drain, clearing the accumulators.
    ///
    /// Metrics without samples are left out of the result.
    pub fn drain_means(&mut self) -> BTreeMap<Metric, f64> {
        let mut means = BTreeMap::new();

        for metric in Metric::ALL {
            let samples = std::mem::take(&mut self.samples[metric.slot()]);
            if samples.is_empty() {
                warn!("No samples recorded for {metric}, skipping");
                continue;
            }
            means.insert(metric, samples.iter().sum::<f64>() / samples.len() as f64);
        }

        means
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_averages_and_resets() {
        let mut history = LogHistory::new();
        history.record(Metric::TrainingLoss, 1.0);
        history.record(Metric::TrainingLoss, 2.0);
        history.record(Metric::ValLoss, 4.0);

        let means = history.drain_means();
        assert_eq!(means.get(&Metric::TrainingLoss), Some(&1.5));
        assert_eq!(means.get(&Metric::ValLoss), Some(&4.0));
        assert!(history.samples(Metric::TrainingLoss).is_empty());

        history.record(Metric::TrainingLoss, 6.0);
        assert_eq!(history.drain_means().get(&Metric::TrainingLoss), Some(&6.0));
    }

    #[test]
    fn empty_metrics_are_not_emitted() {
        let mut history = LogHistory::new();
        assert!(history.drain_means().is_empty());

        history.record(Metric::EndToEndValLoss, 0.5);
        let means = history.drain_means();
        assert_eq!(means.len(), 1);
        assert!(!means.contains_key(&Metric::TrainingOffsetLoss));
    }

    #[test]
    fn metric_names_are_stable() {
        let names: Vec<&str> = Metric::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "training_loss",
                "training_tg_confidence_loss",
                "training_tg_huber_loss",
                "training_tf_huber_loss",
                "val_loss",
                "end_to_end_val_loss",
            ]
        );
    }
}
