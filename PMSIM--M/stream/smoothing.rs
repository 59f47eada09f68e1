/// Blends `raw` into `prior` with gain `1 / factor`.
///
/// Returns `raw` unchanged when there is no prior or `factor <= 1`; a zero or
/// negative factor therefore never divides.
#[must_use]
pub fn smooth(raw: f64, prior: Option<f64>, factor: f64) -> f64 {
    match prior {
        Some(prior) if factor > 1.0 => prior + (raw - prior) / factor,
        _ => raw,
    }
}

/// First-order low-pass filter over a single signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSmoother {
    factor: f64,
    last: Option<f64>,
}

impl SignalSmoother {
    /// Creates an empty smoother. Larger factors respond more slowly.
    #[must_use]
    pub const fn new(factor: f64) -> Self {
        Self { factor, last: None }
    }

    /// Smooths `raw` and remembers the output as the next prior.
    pub fn push(&mut self, raw: f64) -> f64 {
        let next = smooth(raw, self.last, self.factor);
        self.last = Some(next);
        next
    }

    /// Last smoothed output, if any.
    #[must_use]
    pub const fn last(&self) -> Option<f64> {
        self.last
    }
}

/// Independent smoothers for the predicted and actual streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingState {
    predicted: SignalSmoother,
    actual: SignalSmoother,
}

impl SmoothingState {
    /// Creates empty state sharing one factor across both streams.
    #[must_use]
    pub const fn new(factor: f64) -> Self {
        Self {
            predicted: SignalSmoother::new(factor),
            actual: SignalSmoother::new(factor),
        }
    }

    /// Smooths one `(predicted, actual)` pair, each against its own prior.
    pub fn push(&mut self, predicted: f64, actual: f64) -> (f64, f64) {
        (self.predicted.push(predicted), self.actual.push(actual))
    }

    /// Last smoothed predicted value.
    #[must_use]
    pub const fn last_predicted(&self) -> Option<f64> {
        self.predicted.last()
    }

    /// Last smoothed actual value.
    #[must_use]
    pub const fn last_actual(&self) -> Option<f64> {
        self.actual.last()
    }
}
