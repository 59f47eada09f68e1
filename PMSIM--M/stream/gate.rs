use std::time::Duration;

/// What is due on one iteration. Inference is always due and not represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateDecision {
    /// Redraw the chart.
    pub render: bool,
    /// Refresh the numeric readouts.
    pub refresh: bool,
}

/// Decouples render cadence (every `render_stride` iterations) from readout
/// cadence (every `refresh_interval` of clock time).
#[derive(Debug, Clone)]
pub struct RateGate {
    render_stride: usize,
    refresh_interval: Duration,
    last_refresh: Option<Duration>,
}

impl RateGate {
    /// Creates a gate. A zero stride is treated as one.
    #[must_use]
    pub fn new(render_stride: usize, refresh_interval: Duration) -> Self {
        Self {
            render_stride: render_stride.max(1),
            refresh_interval,
            last_refresh: None,
        }
    }

    /// Fixed-count throttle: `index % stride == 0`.
    #[must_use]
    pub const fn render_due(&self, index: usize) -> bool {
        index % self.render_stride == 0
    }

    /// Time-based throttle. The first call is always due; a firing check
    /// stores `now` as the new refresh timestamp.
    pub fn refresh_due(&mut self, now: Duration) -> bool {
        let due = self
            .last_refresh
            .map_or(true, |last| now.saturating_sub(last) >= self.refresh_interval);
        if due {
            self.last_refresh = Some(now);
        }
        due
    }

    /// Runs both checks for one iteration.
    pub fn poll(&mut self, index: usize, now: Duration) -> GateDecision {
        GateDecision {
            render: self.render_due(index),
            refresh: self.refresh_due(now),
        }
    }

    /// Timestamp of the last readout refresh.
    #[must_use]
    pub const fn last_refresh(&self) -> Option<Duration> {
        self.last_refresh
    }
}
