/// Linear warmup from 0 to `lr`, then linear decay to 0 at `total_steps`.
#[derive(Debug, Clone)]
pub struct LinearWarmup {
    step: usize,
    lr: f64,
    warmup_steps: usize,
    total_steps: usize,
}

impl LinearWarmup {
    pub fn new(lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self {
            step: 0,
            lr,
            warmup_steps,
            total_steps,
        }
    }

    /// Warmup covering `fraction` of `total_steps` (truncated).
    pub fn with_warmup_fraction(lr: f64, fraction: f64, total_steps: usize) -> Self {
        let warmup_steps = (fraction * total_steps as f64) as usize;
        Self::new(lr, warmup_steps, total_steps)
    }

    /// Learning rate for the current step.
    pub fn current_lr(&self) -> f64 {
        if self.step < self.warmup_steps {
            return self.lr * self.step as f64 / self.warmup_steps.max(1) as f64;
        }
        let remaining = self.total_steps.saturating_sub(self.step) as f64;
        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.lr * (remaining / decay_steps).max(0.0)
    }

    pub fn advance(&mut self) {
        self.step += 1;
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lr_after(sched: &mut LinearWarmup, steps: usize) -> f64 {
        for _ in 0..steps {
            sched.advance();
        }
        sched.current_lr()
    }

    #[test]
    fn warmup_is_ten_percent_of_total() {
        let sched = LinearWarmup::with_warmup_fraction(1e-3, 0.1, 250);
        assert_eq!(sched.warmup_steps(), 25);
    }

    #[test]
    fn starts_at_zero_and_peaks_after_warmup() {
        let mut sched = LinearWarmup::new(1e-3, 10, 100);
        assert_eq!(sched.current_lr(), 0.0);
        assert!((lr_after(&mut sched, 5) - 5e-4).abs() < 1e-12);
        assert!((lr_after(&mut sched, 5) - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn decays_linearly_to_zero() {
        let mut sched = LinearWarmup::new(1e-3, 10, 100);
        // Halfway through the 90 decay steps.
        assert!((lr_after(&mut sched, 55) - 5e-4).abs() < 1e-12);
        assert_eq!(lr_after(&mut sched, 45), 0.0);
        assert_eq!(lr_after(&mut sched, 5), 0.0);
    }

    #[test]
    fn no_warmup_starts_at_full_rate() {
        let sched = LinearWarmup::new(2e-5, 0, 9);
        assert_eq!(sched.current_lr(), 2e-5);
    }
}
