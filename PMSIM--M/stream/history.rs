use serde::{Deserialize, Serialize};

/// Parallel predicted/actual series for one run. Append-only and unbounded;
/// both series always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    predicted: Vec<f64>,
    actual: Vec<f64>,
}

impl History {
    /// Empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one smoothed pair.
    pub fn push(&mut self, predicted: f64, actual: f64) {
        self.predicted.push(predicted);
        self.actual.push(actual);
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicted.len()
    }

    /// Whether no pair has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicted.is_empty()
    }

    /// Smoothed predictions in arrival order.
    #[must_use]
    pub fn predicted(&self) -> &[f64] {
        &self.predicted
    }

    /// Smoothed ground truth in arrival order.
    #[must_use]
    pub fn actual(&self) -> &[f64] {
        &self.actual
    }

    /// Most recent pair.
    #[must_use]
    pub fn latest(&self) -> Option<(f64, f64)> {
        Some((*self.predicted.last()?, *self.actual.last()?))
    }

    /// Mean absolute error between the two series.
    #[must_use]
    pub fn mean_absolute_error(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let total: f64 = self
            .predicted
            .iter()
            .zip(&self.actual)
            .map(|(p, a)| (p - a).abs())
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.len() as f64;
        Some(total / count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_grow_together() {
        let mut history = History::new();
        assert!(history.is_empty());
        assert_eq!(history.latest(), None);
        history.push(70.0, 71.0);
        history.push(72.0, 70.0);
        assert_eq!(history.len(), 2);
        assert_eq!(history.predicted(), &[70.0, 72.0]);
        assert_eq!(history.actual(), &[71.0, 70.0]);
        assert_eq!(history.latest(), Some((72.0, 70.0)));
    }

    #[test]
    fn mean_absolute_error_over_pairs() {
        let mut history = History::new();
        assert_eq!(history.mean_absolute_error(), None);
        history.push(10.0, 12.0);
        history.push(20.0, 16.0);
        assert!((history.mean_absolute_error().unwrap() - 3.0).abs() < 1e-12);
    }
}
