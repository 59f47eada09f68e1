#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! PMSIM stream engine – streams motor samples through a model, smooths the
//! signals, flags temperature alerts, and throttles chart and readout updates.

/// Exponential smoothing of predicted and actual series.
#[path = "../smoothing.rs"]
pub mod smoothing;

/// Threshold classification and status palette.
#[path = "../alert.rs"]
pub mod alert;

/// Render and readout cadence.
#[path = "../gate.rs"]
pub mod gate;

/// Injectable monotonic clocks.
#[path = "../clock.rs"]
pub mod clock;

/// Cooperative cancellation.
#[path = "../cancel.rs"]
pub mod cancel;

/// Smoothed run history.
#[path = "../history.rs"]
pub mod history;

/// Accuracy scoring and readout sinks.
#[path = "../readout.rs"]
pub mod readout;

/// Sample sources and CSV loading.
#[path = "../dataset.rs"]
pub mod dataset;

/// Inference seam and dense network backend.
#[path = "../inference.rs"]
pub mod inference;

/// Seeded synthetic motor data.
#[path = "../synthetic.rs"]
pub mod synthetic;

/// Chart renderers.
#[path = "../render/main.rs"]
pub mod render;

/// Error types.
#[path = "../error.rs"]
pub mod error;

/// TOML configuration.
#[path = "../config.rs"]
pub mod config;

/// Telemetry for the stream engine.
#[path = "../helper.rs"]
pub mod helper;

/// Streaming control loop.
#[path = "../driver.rs"]
pub mod driver;

/// Run summaries.
#[path = "../report.rs"]
pub mod report;

/// Runtime assembly from configuration.
#[path = "../main.rs"]
pub mod runtime;

pub use alert::{classify, Status};
pub use cancel::{CancelSignal, CancelToken, NeverCancel};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SimulatorConfig, StreamConfig};
pub use dataset::{DatasetSource, Sample, TabularDataset};
pub use driver::{RunState, StreamDriver, StreamDriverBuilder, StreamSession};
pub use error::{Result, StreamError};
pub use helper::{StreamTelemetry, StreamTelemetryBuilder};
pub use inference::{DenseNetwork, InferenceService};
pub use readout::{accuracy, MetricsEmitter, Readout};
pub use render::{ChartFrame, Renderer};
pub use report::RunReport;
pub use runtime::{DataSource, Simulator, SimulatorBuilder};
pub use smoothing::smooth;
pub use synthetic::SyntheticProfile;
