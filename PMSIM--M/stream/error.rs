use std::path::PathBuf;

use thiserror::Error;

use crate::{dataset::DatasetError, inference::InferenceError, render::RenderError};

/// Shared `Result` alias for the stream crate.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Failures surfaced to the caller of a run. None of them are retried.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A dataset, model or collaborator is unavailable at start.
    #[error("missing {resource}: {details}")]
    MissingResource {
        /// What is missing (`dataset`, `model`, `renderer`, ...).
        resource: &'static str,
        /// Path or explanation.
        details: String,
    },
    /// The inference collaborator failed on a sample; the run is over.
    #[error("inference failed on sample {index}: {source}")]
    InferenceFailure {
        /// Sample being processed.
        index: usize,
        /// Model error.
        #[source]
        source: InferenceError,
    },
    /// A renderer failed to draw; the run is over.
    #[error("render failed on sample {index}: {source}")]
    RenderFailure {
        /// Sample that triggered the render.
        index: usize,
        /// Renderer error.
        #[source]
        source: RenderError,
    },
    /// Numeric configuration rejected before the run.
    #[error("invalid configuration: {details}")]
    Configuration {
        /// Which setting and why.
        details: String,
    },
    /// Configuration file could not be parsed.
    #[error("parsing configuration {}: {details}", .path.display())]
    ConfigParse {
        /// Config file.
        path: PathBuf,
        /// Parser message.
        details: String,
    },
    /// Dataset present but malformed.
    #[error(transparent)]
    Dataset(DatasetError),
    /// Filesystem failure outside dataset and model loading.
    #[error("io failure at {}: {source}", .path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl StreamError {
    /// Convenience constructor for configuration errors.
    #[must_use]
    pub fn config(details: impl Into<String>) -> Self {
        Self::Configuration {
            details: details.into(),
        }
    }

    /// Whether the error stopped the loop mid-run rather than before it.
    #[must_use]
    pub const fn is_mid_run(&self) -> bool {
        matches!(
            self,
            Self::InferenceFailure { .. } | Self::RenderFailure { .. }
        )
    }
}

impl From<DatasetError> for StreamError {
    fn from(value: DatasetError) -> Self {
        match value {
            DatasetError::Missing { path } => Self::MissingResource {
                resource: "dataset",
                details: path.display().to_string(),
            },
            other => Self::Dataset(other),
        }
    }
}

impl From<InferenceError> for StreamError {
    fn from(value: InferenceError) -> Self {
        match value {
            InferenceError::Missing { path } => Self::MissingResource {
                resource: "model",
                details: path.display().to_string(),
            },
            other => Self::MissingResource {
                resource: "model",
                details: other.to_string(),
            },
        }
    }
}
