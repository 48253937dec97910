/// Outcome of feeding one epoch's validation F1 to [`EarlyStopping`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Strictly better than every earlier epoch; the model should be checkpointed.
    Improved { previous_best: f64 },
    NoImprovement { stale_epochs: usize },
}

/// Tracks the best validation F1 of a run and counts epochs without improvement.
///
/// The best score starts at 0.0, so an epoch scoring exactly 0 never counts as an
/// improvement.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best_f1: f64,
    best_epoch: Option<usize>,
    stale_epochs: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_f1: 0.0,
            best_epoch: None,
            stale_epochs: 0,
        }
    }

    pub fn observe(&mut self, epoch: usize, f1: f64) -> Verdict {
        if f1 > self.best_f1 {
            let previous_best = self.best_f1;
            self.best_f1 = f1;
            self.best_epoch = Some(epoch);
            self.stale_epochs = 0;
            Verdict::Improved { previous_best }
        } else {
            self.stale_epochs += 1;
            Verdict::NoImprovement {
                stale_epochs: self.stale_epochs,
            }
        }
    }

    pub fn should_stop(&self) -> bool {
        self.stale_epochs >= self.patience
    }

    /// `None` until some epoch improved on 0.
    pub fn best_f1(&self) -> Option<f64> {
        self.best_epoch.map(|_| self.best_f1)
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Epoch index at which a run with these scores stops, if it stops early.
    fn stop_epoch(patience: usize, scores: &[f64]) -> Option<usize> {
        let mut monitor = EarlyStopping::new(patience);
        for (epoch, &f1) in scores.iter().enumerate() {
            monitor.observe(epoch, f1);
            if monitor.should_stop() {
                return Some(epoch);
            }
        }
        None
    }

    #[test]
    fn improvement_resets_the_counter() {
        let mut monitor = EarlyStopping::new(3);
        assert_eq!(monitor.observe(0, 0.5), Verdict::Improved { previous_best: 0.0 });
        assert_eq!(monitor.observe(1, 0.4), Verdict::NoImprovement { stale_epochs: 1 });
        assert_eq!(monitor.observe(2, 0.6), Verdict::Improved { previous_best: 0.5 });
        assert_eq!(monitor.best_epoch(), Some(2));
        assert_eq!(monitor.best_f1(), Some(0.6));
        assert!(!monitor.should_stop());
    }

    #[test]
    fn equal_score_is_not_an_improvement() {
        let mut monitor = EarlyStopping::new(3);
        monitor.observe(0, 0.7);
        assert_eq!(monitor.observe(1, 0.7), Verdict::NoImprovement { stale_epochs: 1 });
    }

    #[test]
    fn stops_after_patience_stale_epochs() {
        // Best at epoch 1, then three flat epochs: stop at epoch 4 despite 10 planned.
        let scores = [0.5, 0.8, 0.7, 0.8, 0.6, 0.9, 0.9, 0.9, 0.9, 0.9];
        assert_eq!(stop_epoch(3, &scores), Some(4));
    }

    #[test]
    fn runs_to_completion_while_improving() {
        assert_eq!(stop_epoch(3, &[0.1, 0.2, 0.3, 0.4]), None);
    }

    #[test]
    fn zero_f1_never_improves() {
        let mut monitor = EarlyStopping::new(5);
        for epoch in 0..4 {
            assert!(matches!(monitor.observe(epoch, 0.0), Verdict::NoImprovement { .. }));
        }
        assert_eq!(monitor.best_f1(), None);
        assert_eq!(monitor.best_epoch(), None);
    }
}
