use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_logging::LogLevel;
use tokio::{task::yield_now, time::sleep};

use crate::{
    alert::{classify, Status},
    cancel::CancelSignal,
    clock::{Clock, SystemClock},
    config::StreamConfig,
    dataset::DatasetSource,
    error::{Result, StreamError},
    gate::RateGate,
    helper::StreamTelemetry,
    history::History,
    inference::InferenceService,
    readout::{MetricsEmitter, Readout},
    render::{ChartFrame, Renderer},
    smoothing::SmoothingState,
};

/// Lifecycle of a streaming run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// Iterating over the dataset.
    Running,
    /// Every sample was processed.
    Completed,
    /// The cancel signal was observed before the dataset was exhausted.
    Stopped,
}

impl RunState {
    /// Upper-case label used in logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Stopped => "STOPPED",
        }
    }

    /// Whether the run has ended.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Mutable state of one run. Passed into and returned from [`StreamDriver::run`].
///
/// A session is tied to the configuration it was created with; a driver
/// refuses sessions built for a different one.
#[derive(Debug, Clone)]
pub struct StreamSession {
    config: StreamConfig,
    state: RunState,
    index: usize,
    history: History,
    smoothing: SmoothingState,
    gate: RateGate,
    renders: usize,
    refreshes: usize,
    alert_renders: usize,
    last_readout: Option<Readout>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl StreamSession {
    /// Fresh session at sample 0 with empty smoothing state.
    #[must_use]
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            config: *config,
            state: RunState::Running,
            index: 0,
            history: History::new(),
            smoothing: SmoothingState::new(config.smoothing_factor),
            gate: RateGate::new(config.render_stride, config.refresh_interval()),
            renders: 0,
            refreshes: 0,
            alert_renders: 0,
            last_readout: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Index of the next sample to process.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Smoothed history so far.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Number of frames handed to the renderer.
    #[must_use]
    pub const fn renders(&self) -> usize {
        self.renders
    }

    /// Number of readout refreshes.
    #[must_use]
    pub const fn refreshes(&self) -> usize {
        self.refreshes
    }

    /// Frames rendered while in ALERT.
    #[must_use]
    pub const fn alert_renders(&self) -> usize {
        self.alert_renders
    }

    /// Most recent readout, if any refresh fired.
    #[must_use]
    pub const fn last_readout(&self) -> Option<Readout> {
        self.last_readout
    }

    /// Status of the latest smoothed prediction against `threshold`.
    #[must_use]
    pub fn status(&self, threshold: f64) -> Option<Status> {
        self.history
            .latest()
            .map(|(predicted, _)| classify(predicted, threshold))
    }

    /// When the run started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the run finished.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

/// What a single iteration produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Sample processed.
    pub index: usize,
    /// Smoothed prediction.
    pub predicted: f64,
    /// Smoothed ground truth.
    pub actual: f64,
    /// Status of `predicted`.
    pub status: Status,
    /// Whether a frame was rendered.
    pub rendered: bool,
    /// Readout emitted on this iteration.
    pub readout: Option<Readout>,
}

/// Control loop: fetch, infer, smooth, record, then render and refresh when due.
pub struct StreamDriver {
    config: StreamConfig,
    dataset: Box<dyn DatasetSource>,
    inference: Box<dyn InferenceService>,
    renderer: Box<dyn Renderer>,
    emitter: Box<dyn MetricsEmitter>,
    clock: Arc<dyn Clock>,
    telemetry: Option<StreamTelemetry>,
}

impl std::fmt::Debug for StreamDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDriver")
            .field("config", &self.config)
            .field("samples", &self.dataset.len())
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl StreamDriver {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> StreamDriverBuilder {
        StreamDriverBuilder::default()
    }

    /// Validated loop settings.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Number of samples in the dataset.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.dataset.len()
    }

    /// A fresh session for this driver's configuration.
    #[must_use]
    pub fn session(&self) -> StreamSession {
        StreamSession::new(&self.config)
    }

    /// Runs until the dataset is exhausted or `cancel` fires.
    ///
    /// Inference and render failures end the run immediately with the index of
    /// the failing sample. A session that already finished is returned as is.
    /// Yields to the runtime once per iteration, so tasks that set `cancel`
    /// get to run even with a zero delay.
    pub async fn run(
        &mut self,
        mut session: StreamSession,
        cancel: &dyn CancelSignal,
    ) -> Result<StreamSession> {
        self.check_session(&session)?;
        if session.state.is_finished() {
            return Ok(session);
        }
        let total = self.dataset.len();
        if session.started_at.is_none() {
            session.started_at = Some(Utc::now());
        }
        self.log(
            LogLevel::Info,
            "stream.run.start",
            json!({
                "samples": total,
                "start_index": session.index,
                "threshold": self.config.threshold,
                "smoothing_factor": self.config.smoothing_factor,
                "render_stride": self.config.render_stride,
            }),
        );
        let delay = self.config.inter_iteration_delay();

        while session.index < total {
            if cancel.is_cancelled() {
                session.state = RunState::Stopped;
                break;
            }
            let Some(outcome) = self.step(&mut session)? else {
                break;
            };
            if let Some(readout) = outcome.readout {
                self.event(
                    "stream.readout",
                    json!({
                        "index": readout.index,
                        "predicted": readout.predicted,
                        "actual": readout.actual,
                        "accuracy": readout.accuracy,
                        "status": outcome.status.label(),
                    }),
                )
                .await;
            }
            if delay.is_zero() {
                yield_now().await;
            } else {
                sleep(delay).await;
            }
        }

        if session.state == RunState::Running {
            session.state = RunState::Completed;
        }
        session.finished_at = Some(Utc::now());
        let summary = json!({
            "state": session.state.label(),
            "iterations": session.index,
            "samples": total,
            "renders": session.renders,
            "refreshes": session.refreshes,
            "alert_renders": session.alert_renders,
        });
        let message = match session.state {
            RunState::Stopped => "stream.run.stopped",
            _ => "stream.run.completed",
        };
        self.log(LogLevel::Info, message, summary.clone());
        self.event("stream.run.finished", summary).await;
        Ok(session)
    }

    /// Processes the sample at `session.index()`. Returns `None` once the
    /// dataset is exhausted. Does not check cancellation or sleep.
    pub fn step(&mut self, session: &mut StreamSession) -> Result<Option<StepOutcome>> {
        self.check_session(session)?;
        let index = session.index;
        if index >= self.dataset.len() {
            return Ok(None);
        }
        let Some(sample) = self.dataset.get(index) else {
            return Err(StreamError::MissingResource {
                resource: "sample",
                details: format!("dataset has no sample at index {index}"),
            });
        };
        let observed = sample.actual;
        let raw = match self.inference.predict(sample.features) {
            Ok(value) => value,
            Err(source) => {
                self.log(
                    LogLevel::Error,
                    "stream.inference.failed",
                    json!({ "index": index, "error": source.to_string() }),
                );
                return Err(StreamError::InferenceFailure { index, source });
            }
        };

        let (predicted, actual) = session.smoothing.push(raw, observed);
        session.history.push(predicted, actual);

        let decision = session.gate.poll(index, self.clock.now());
        let status = classify(predicted, self.config.threshold);
        if decision.render {
            let frame = ChartFrame {
                index,
                predicted: session.history.predicted(),
                actual: session.history.actual(),
                threshold: self.config.threshold,
                status,
            };
            if let Err(source) = self.renderer.render(&frame) {
                self.log(
                    LogLevel::Error,
                    "stream.render.failed",
                    json!({ "index": index, "error": source.to_string() }),
                );
                return Err(StreamError::RenderFailure { index, source });
            }
            session.renders += 1;
            if status.is_alert() {
                session.alert_renders += 1;
            }
        }

        let readout = decision.refresh.then(|| Readout::new(index, predicted, actual));
        if let Some(readout) = &readout {
            self.emitter.emit(readout);
            session.refreshes += 1;
            session.last_readout = Some(*readout);
        }

        session.index += 1;
        Ok(Some(StepOutcome {
            index,
            predicted,
            actual,
            status,
            rendered: decision.render,
            readout,
        }))
    }

    fn check_session(&self, session: &StreamSession) -> Result<()> {
        if session.config == self.config {
            Ok(())
        } else {
            Err(StreamError::config(
                "session was created for a different stream configuration",
            ))
        }
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(level, message, metadata);
        }
    }

    async fn event(&self, event_type: &str, payload: Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.event(event_type, payload).await;
        }
    }
}

/// Builder for [`StreamDriver`].
#[derive(Default)]
pub struct StreamDriverBuilder {
    config: StreamConfig,
    dataset: Option<Box<dyn DatasetSource>>,
    inference: Option<Box<dyn InferenceService>>,
    renderer: Option<Box<dyn Renderer>>,
    emitter: Option<Box<dyn MetricsEmitter>>,
    clock: Option<Arc<dyn Clock>>,
    telemetry: Option<StreamTelemetry>,
}

impl StreamDriverBuilder {
    /// Sets loop tuning.
    #[must_use]
    pub const fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the sample source.
    #[must_use]
    pub fn dataset(mut self, dataset: Box<dyn DatasetSource>) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn inference(mut self, inference: Box<dyn InferenceService>) -> Self {
        self.inference = Some(inference);
        self
    }

    /// Sets the chart renderer.
    #[must_use]
    pub fn renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the readout sink.
    #[must_use]
    pub fn emitter(mut self, emitter: Box<dyn MetricsEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Overrides the clock. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: StreamTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Validates configuration and checks every collaborator is present.
    pub fn build(self) -> Result<StreamDriver> {
        self.config.validate()?;
        Ok(StreamDriver {
            config: self.config,
            dataset: required(self.dataset, "dataset")?,
            inference: required(self.inference, "inference service")?,
            renderer: required(self.renderer, "renderer")?,
            emitter: required(self.emitter, "metrics emitter")?,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock::new())),
            telemetry: self.telemetry,
        })
    }
}

fn required<T>(value: Option<T>, resource: &'static str) -> Result<T> {
    value.ok_or_else(|| StreamError::MissingResource {
        resource,
        details: "not configured".into(),
    })
}
