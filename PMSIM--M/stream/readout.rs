use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Floor applied to the denominator of [`accuracy`].
pub const ACCURACY_EPSILON: f64 = 1e-5;

/// Relative-error score in percent: `max(0, 100 * (1 - |a - p| / max(a, eps)))`.
///
/// Clamped below at zero and uncapped above.
#[must_use]
pub fn accuracy(actual: f64, predicted: f64) -> f64 {
    let score = 100.0 * (1.0 - (actual - predicted).abs() / actual.max(ACCURACY_EPSILON));
    score.max(0.0)
}

/// Numeric readouts for one metrics refresh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Readout {
    /// Sample index the values belong to.
    pub index: usize,
    /// Smoothed prediction.
    pub predicted: f64,
    /// Smoothed ground truth.
    pub actual: f64,
    /// [`accuracy`] of the pair.
    pub accuracy: f64,
}

impl Readout {
    /// Builds a readout, scoring the pair.
    #[must_use]
    pub fn new(index: usize, predicted: f64, actual: f64) -> Self {
        Self {
            index,
            predicted,
            actual,
            accuracy: accuracy(actual, predicted),
        }
    }
}

/// Receives readouts on every metrics refresh. Fire-and-forget.
pub trait MetricsEmitter {
    /// Publishes one readout.
    fn emit(&mut self, readout: &Readout);
}

/// Discards readouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmitter;

impl MetricsEmitter for NullEmitter {
    fn emit(&mut self, _readout: &Readout) {}
}

const SAVE_CURSOR: &str = "\x1b7";
const RESTORE_CURSOR: &str = "\x1b8";
const CLEAR_LINE: &str = "\x1b[2K";
const GREEN: &str = "\x1b[92m";
const RESET: &str = "\x1b[0m";

/// Scoreboard line pinned to a fixed terminal row below the chart.
#[derive(Debug)]
pub struct TerminalReadouts<W: Write> {
    out: W,
    row: u16,
    color: bool,
}

impl TerminalReadouts<io::Stdout> {
    /// Writes to stdout on `row` (1-based).
    #[must_use]
    pub fn stdout(row: u16, color: bool) -> Self {
        Self::new(io::stdout(), row, color)
    }
}

impl<W: Write> TerminalReadouts<W> {
    /// Writes to `out` on `row` (1-based).
    pub fn new(out: W, row: u16, color: bool) -> Self {
        Self { out, row, color }
    }

    /// Plain-text scoreboard for one readout.
    #[must_use]
    pub fn line(&self, readout: &Readout) -> String {
        let (open, close) = if self.color { (GREEN, RESET) } else { ("", "") };
        format!(
            "Predicted {:.2}°C   Actual {:.2}°C   {open}Accuracy {:.1}%{close}",
            readout.predicted, readout.actual, readout.accuracy
        )
    }

    /// Consumes the emitter, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MetricsEmitter for TerminalReadouts<W> {
    fn emit(&mut self, readout: &Readout) {
        let line = self.line(readout);
        let _ = write!(
            self.out,
            "{SAVE_CURSOR}\x1b[{};1H{CLEAR_LINE}{line}{RESTORE_CURSOR}",
            self.row
        );
        let _ = self.out.flush();
    }
}
