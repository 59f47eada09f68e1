//! Chart renderers: terminal frames and SVG documents drawn from history snapshots.

/// SVG document renderer.
pub mod svg;
/// ANSI terminal renderer.
pub mod terminal;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alert::Status;

pub use svg::SvgChart;
pub use terminal::TerminalChart;

/// Borrowed view of the run handed to a renderer. It cannot outlive the call,
/// so renderers never hold on to the driver's history.
#[derive(Debug, Clone, Copy)]
pub struct ChartFrame<'a> {
    /// Index of the sample that triggered this render.
    pub index: usize,
    /// Smoothed predictions so far.
    pub predicted: &'a [f64],
    /// Smoothed ground truth so far.
    pub actual: &'a [f64],
    /// Alert boundary.
    pub threshold: f64,
    /// Status of the latest prediction.
    pub status: Status,
}

impl ChartFrame<'_> {
    /// Latest prediction, or zero before the first sample.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.predicted.last().copied().unwrap_or_default()
    }

    /// Number of samples in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicted.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicted.is_empty()
    }
}

/// Errors raised while drawing a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing the frame failed.
    #[error("writing chart to {target}: {source}")]
    Io {
        /// Output description (`terminal` or a file path).
        target: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Draws a chart from a full snapshot; holds no per-run chart state.
pub trait Renderer {
    /// Redraws the chart.
    fn render(&mut self, frame: &ChartFrame<'_>) -> Result<(), RenderError>;
}

/// Renders to each child in order, stopping at the first failure.
#[derive(Default)]
pub struct FanoutRenderer {
    targets: Vec<Box<dyn Renderer>>,
}

impl FanoutRenderer {
    /// Empty fanout; rendering is a no-op until targets are added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target.
    #[must_use]
    pub fn with(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.targets.push(renderer);
        self
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no target is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Renderer for FanoutRenderer {
    fn render(&mut self, frame: &ChartFrame<'_>) -> Result<(), RenderError> {
        for target in &mut self.targets {
            target.render(frame)?;
        }
        Ok(())
    }
}

/// Shared chart geometry and axis limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartLayout {
    /// Terminal columns used for samples.
    pub width: usize,
    /// Terminal rows used for the plot area.
    pub height: usize,
    /// SVG width in pixels.
    pub svg_width: u32,
    /// SVG height in pixels.
    pub svg_height: u32,
    /// Lower y-axis limit.
    pub y_min: f64,
    /// Upper y-axis limit.
    pub y_max: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 72,
            height: 16,
            svg_width: 1280,
            svg_height: 640,
            y_min: 0.0,
            y_max: 100.0,
        }
    }
}

impl ChartLayout {
    /// Fraction of the y-range covered by `value`, clamped to `0..=1`.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.y_max - self.y_min;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.y_min) / span).clamp(0.0, 1.0)
    }
}
