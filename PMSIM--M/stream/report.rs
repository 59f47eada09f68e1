use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    alert::Status,
    driver::{RunState, StreamSession},
    error::{Result, StreamError},
};

/// Summary of a finished run, serialized with `--report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Final lifecycle state.
    pub state: RunState,
    /// Samples in the dataset.
    pub samples_total: usize,
    /// Samples actually processed.
    pub iterations: usize,
    /// Frames rendered.
    pub renders: usize,
    /// Readout refreshes.
    pub refreshes: usize,
    /// Frames rendered in ALERT.
    pub alert_renders: usize,
    /// Alert boundary used.
    pub threshold: f64,
    /// Last smoothed prediction.
    pub final_predicted: Option<f64>,
    /// Last smoothed ground truth.
    pub final_actual: Option<f64>,
    /// Status of the last prediction.
    pub final_status: Option<Status>,
    /// Accuracy at the last refresh.
    pub last_accuracy: Option<f64>,
    /// Mean absolute error over the smoothed history.
    pub mean_absolute_error: Option<f64>,
    /// Run start.
    pub started_at: Option<DateTime<Utc>>,
    /// Run end.
    pub finished_at: Option<DateTime<Utc>>,
    /// Report creation time.
    pub generated_at: DateTime<Utc>,
}

impl RunReport {
    /// Pretty JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let body = self.to_json().map_err(|err| StreamError::Io {
            path: path.to_path_buf(),
            source: err.into(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StreamError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, body).map_err(|source| StreamError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Builder for `RunReport`.
pub struct RunReportBuilder<'a> {
    session: Option<&'a StreamSession>,
    samples_total: usize,
    threshold: f64,
}

impl<'a> RunReportBuilder<'a> {
    /// Creates builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: None,
            samples_total: 0,
            threshold: 80.0,
        }
    }

    /// Sets the session to summarize.
    #[must_use]
    pub const fn session(mut self, session: &'a StreamSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the dataset size.
    #[must_use]
    pub const fn samples_total(mut self, samples: usize) -> Self {
        self.samples_total = samples;
        self
    }

    /// Sets the threshold used for the final status.
    #[must_use]
    pub const fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Builds report.
    #[must_use]
    pub fn build(self) -> RunReport {
        let latest = self.session.and_then(|s| s.history().latest());
        RunReport {
            state: self.session.map_or(RunState::Running, StreamSession::state),
            samples_total: self.samples_total,
            iterations: self.session.map_or(0, StreamSession::index),
            renders: self.session.map_or(0, StreamSession::renders),
            refreshes: self.session.map_or(0, StreamSession::refreshes),
            alert_renders: self.session.map_or(0, StreamSession::alert_renders),
            threshold: self.threshold,
            final_predicted: latest.map(|(p, _)| p),
            final_actual: latest.map(|(_, a)| a),
            final_status: self.session.and_then(|s| s.status(self.threshold)),
            last_accuracy: self
                .session
                .and_then(StreamSession::last_readout)
                .map(|r| r.accuracy),
            mean_absolute_error: self
                .session
                .and_then(|s| s.history().mean_absolute_error()),
            started_at: self.session.and_then(StreamSession::started_at),
            finished_at: self.session.and_then(StreamSession::finished_at),
            generated_at: Utc::now(),
        }
    }
}

impl Default for RunReportBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
