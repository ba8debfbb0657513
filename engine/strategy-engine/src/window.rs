use std::collections::VecDeque;

/// Fixed-capacity rolling price window.
#[derive(Clone, Debug, PartialEq)]
pub struct RollingWindow {
    buf: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "rolling window needs at least 2 samples");
        Self { buf: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, value: f64) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn first(&self) -> Option<f64> {
        self.buf.front().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.buf.back().copied()
    }

    pub fn mean(&self) -> f64 {
        if self.buf.is_empty() {
            return 0.0;
        }
        self.buf.iter().sum::<f64>() / self.buf.len() as f64
    }

    /// Population standard deviation over the window.
    pub fn std_dev(&self) -> f64 {
        if self.buf.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var =
            self.buf.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / self.buf.len() as f64;
        var.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_then_slides() {
        let mut w = RollingWindow::new(3);
        w.push(1.0);
        w.push(2.0);
        assert!(!w.is_full());
        w.push(3.0);
        assert!(w.is_full());

        w.push(4.0);
        assert_eq!(w.len(), 3);
        assert_eq!(w.first(), Some(2.0));
        assert_eq!(w.last(), Some(4.0));
    }

    #[test]
    fn test_mean_and_std_dev() {
        let mut w = RollingWindow::new(4);
        for v in [2.0, 4.0, 4.0, 4.0] {
            w.push(v);
        }
        assert!((w.mean() - 3.5).abs() < 1e-12);
        // population variance = (2.25 + 0.25*3)/4 = 0.75
        assert!((w.std_dev() - 0.75_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_window_stats_are_zero() {
        let w = RollingWindow::new(2);
        assert_eq!(w.mean(), 0.0);
        assert_eq!(w.std_dev(), 0.0);
        assert_eq!(w.first(), None);
    }
}
