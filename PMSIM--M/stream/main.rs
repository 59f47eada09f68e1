use std::sync::Arc;

use serde_json::json;
use shared_event_bus::{EventPublisher, FileEventPublisher};
use shared_logging::LogLevel;

use crate::{
    cancel::CancelSignal,
    clock::Clock,
    config::SimulatorConfig,
    dataset::{DatasetSource, DatasetSummary, TabularDataset},
    driver::{StreamDriver, StreamSession},
    error::{Result, StreamError},
    helper::StreamTelemetry,
    inference::DenseNetwork,
    readout::{MetricsEmitter, NullEmitter, TerminalReadouts},
    render::{FanoutRenderer, Renderer, SvgChart, TerminalChart},
    report::{RunReport, RunReportBuilder},
    synthetic::{SyntheticError, SyntheticProfile},
};

/// Where samples and the model come from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum DataSource {
    /// CSV files and JSON weights named in `[paths]`.
    #[default]
    Files,
    /// Generated motor-like samples with their matching linear model.
    Synthetic(SyntheticProfile),
}

/// Fully assembled simulator: data, model, renderers and telemetry.
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    driver: StreamDriver,
    summary: DatasetSummary,
    telemetry: Option<StreamTelemetry>,
}

impl Simulator {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::default()
    }

    /// Streams every sample until done or cancelled and summarizes the run.
    pub async fn run(&mut self, cancel: &dyn CancelSignal) -> Result<RunReport> {
        let session = self.driver.run(self.driver.session(), cancel).await?;
        Ok(self.report(&session))
    }

    /// Summarizes `session` against this simulator's dataset and threshold.
    #[must_use]
    pub fn report(&self, session: &StreamSession) -> RunReport {
        RunReportBuilder::new()
            .session(session)
            .samples_total(self.driver.samples())
            .threshold(self.config.stream.threshold)
            .build()
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Loaded dataset summary.
    #[must_use]
    pub const fn summary(&self) -> &DatasetSummary {
        &self.summary
    }

    /// Returns telemetry handle.
    #[must_use]
    pub const fn telemetry(&self) -> Option<&StreamTelemetry> {
        self.telemetry.as_ref()
    }
}

/// Builder for `Simulator`.
#[derive(Default)]
pub struct SimulatorBuilder {
    config: SimulatorConfig,
    source: DataSource,
    color: bool,
    telemetry: Option<StreamTelemetry>,
    clock: Option<Arc<dyn Clock>>,
    renderer: Option<Box<dyn Renderer>>,
    emitter: Option<Box<dyn MetricsEmitter>>,
}

impl SimulatorBuilder {
    /// Sets configuration.
    #[must_use]
    pub fn config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Selects the data source.
    #[must_use]
    pub const fn source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    /// Enables ANSI colors on terminal output.
    #[must_use]
    pub const fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Sets telemetry, replacing whatever `[logging]` would build.
    #[must_use]
    pub fn telemetry(mut self, telemetry: StreamTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Overrides the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replaces the renderers derived from `[chart]`.
    #[must_use]
    pub fn renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Replaces the terminal readouts.
    #[must_use]
    pub fn emitter(mut self, emitter: Box<dyn MetricsEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Loads data and model, then wires renderers, readouts and telemetry.
    pub fn build(self) -> Result<Simulator> {
        self.config.validate()?;
        let telemetry = match self.telemetry {
            Some(telemetry) => Some(telemetry),
            None => telemetry_from(&self.config)?,
        };

        let (dataset, model, origin) = match self.source {
            DataSource::Files => {
                let paths = &self.config.paths;
                let dataset = TabularDataset::from_csv(&paths.features, &paths.targets)?;
                let model = DenseNetwork::from_file(&paths.model)?;
                (dataset, model, "files")
            }
            DataSource::Synthetic(profile) => {
                let run = profile.generate().map_err(|err| match err {
                    SyntheticError::Dataset(err) => StreamError::from(err),
                    SyntheticError::Model(err) => StreamError::from(err),
                })?;
                (run.dataset, run.model, "synthetic")
            }
        };
        if !dataset.is_empty() && model.input_dim() != dataset.feature_width() {
            return Err(StreamError::config(format!(
                "model expects {} features but the dataset has {}",
                model.input_dim(),
                dataset.feature_width()
            )));
        }
        let summary = dataset.summary();
        if let Some(tel) = &telemetry {
            let _ = tel.log(
                LogLevel::Info,
                "simulator.loaded",
                json!({
                    "source": origin,
                    "samples": summary.samples,
                    "features": summary.features,
                    "layers": model.depth(),
                }),
            );
        }

        let chart = &self.config.chart;
        let mut readout_row = None;
        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None => {
                let mut fanout = FanoutRenderer::new();
                if chart.terminal_enabled() {
                    let terminal = TerminalChart::stdout(chart.layout, self.color);
                    readout_row = Some(terminal.rows() + 2);
                    fanout = fanout.with(Box::new(terminal));
                }
                if let Some(path) = &chart.svg_path {
                    fanout = fanout.with(Box::new(SvgChart::new(path, chart.layout)));
                }
                Box::new(fanout)
            }
        };
        let emitter: Box<dyn MetricsEmitter> = match (self.emitter, readout_row) {
            (Some(emitter), _) => emitter,
            (None, Some(row)) => Box::new(TerminalReadouts::stdout(
                u16::try_from(row).unwrap_or(u16::MAX),
                self.color,
            )),
            (None, None) => Box::new(NullEmitter),
        };

        let mut driver = StreamDriver::builder()
            .config(self.config.stream)
            .dataset(Box::new(dataset))
            .inference(Box::new(model))
            .renderer(renderer)
            .emitter(emitter);
        if let Some(clock) = self.clock {
            driver = driver.clock(clock);
        }
        if let Some(tel) = &telemetry {
            driver = driver.telemetry(tel.clone());
        }

        Ok(Simulator {
            config: self.config,
            driver: driver.build()?,
            summary,
            telemetry,
        })
    }
}

fn telemetry_from(config: &SimulatorConfig) -> Result<Option<StreamTelemetry>> {
    let logging = &config.logging;
    if logging.path.is_none() && logging.event_log.is_none() {
        return Ok(None);
    }
    let mut builder = StreamTelemetry::builder("stream").min_level(logging.level);
    if let Some(path) = &logging.path {
        builder = builder.log_path(path);
    }
    if let Some(path) = &logging.event_log {
        let publisher = FileEventPublisher::new(path).map_err(|err| StreamError::MissingResource {
            resource: "event log",
            details: format!("{}: {err}", path.display()),
        })?;
        builder = builder.event_publisher(Arc::new(publisher) as Arc<dyn EventPublisher>);
    }
    builder
        .build()
        .map(Some)
        .map_err(|err| StreamError::MissingResource {
            resource: "log file",
            details: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use parking_lot::Mutex;
    use shared_event_bus::MemoryEventBus;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        cancel::NeverCancel,
        clock::ManualClock,
        config::StreamConfig,
        driver::RunState,
        readout::Readout,
        render::{ChartFrame, RenderError},
    };

    #[derive(Clone, Default)]
    struct Counter {
        frames: Arc<Mutex<usize>>,
        readouts: Arc<Mutex<Vec<Readout>>>,
    }

    impl Renderer for Counter {
        fn render(&mut self, _frame: &ChartFrame<'_>) -> std::result::Result<(), RenderError> {
            *self.frames.lock() += 1;
            Ok(())
        }
    }

    impl MetricsEmitter for Counter {
        fn emit(&mut self, readout: &Readout) {
            self.readouts.lock().push(*readout);
        }
    }

    fn quiet_config() -> SimulatorConfig {
        let mut config = SimulatorConfig::default();
        config.stream = StreamConfig {
            inter_iteration_delay_seconds: 0.0,
            ..StreamConfig::default()
        };
        config.chart.terminal = Some(false);
        config
    }

    #[tokio::test]
    async fn synthetic_simulator_runs_to_completion() {
        let counter = Counter::default();
        let bus = Arc::new(MemoryEventBus::new(256));
        let telemetry = StreamTelemetry::builder("stream")
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        let mut simulator = Simulator::builder()
            .config(quiet_config())
            .source(DataSource::Synthetic(SyntheticProfile {
                samples: 30,
                ..SyntheticProfile::default()
            }))
            .renderer(Box::new(counter.clone()))
            .emitter(Box::new(counter.clone()))
            .clock(Arc::new(ManualClock::new()))
            .telemetry(telemetry)
            .build()
            .unwrap();
        assert_eq!(simulator.summary().samples, 30);
        let report = simulator.run(&NeverCancel).await.unwrap();
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.iterations, 30);
        assert_eq!(*counter.frames.lock(), 10);
        assert_eq!(counter.readouts.lock().len(), 1);
        assert_eq!(bus.of_type("stream.run.finished").len(), 1);
    }

    #[tokio::test]
    async fn file_simulator_writes_svg() {
        let tmp = tempdir().unwrap();
        let features = tmp.path().join("X.csv");
        let targets = tmp.path().join("y.csv");
        let model = tmp.path().join("model.json");
        let svg = tmp.path().join("live.svg");
        fs::write(&features, "a,b\n70,1\n75,1\n90,1\n").unwrap();
        fs::write(&targets, "pm\n71\n76\n88\n").unwrap();
        fs::write(
            &model,
            r#"{"input_dim":2,"layers":[{"output_dim":1,"weights":[1.0,0.0],"bias":[0.0],"activation":"linear"}]}"#,
        )
        .unwrap();
        let mut config = quiet_config();
        config.paths.features = features;
        config.paths.targets = targets;
        config.paths.model = model;
        config.chart.svg_path = Some(svg.clone());
        config.stream.smoothing_factor = 1.0;

        let mut simulator = Simulator::builder()
            .config(config)
            .clock(Arc::new(ManualClock::new()))
            .build()
            .unwrap();
        let report = simulator.run(&NeverCancel).await.unwrap();
        assert_eq!(report.renders, 1);
        assert_eq!(report.final_predicted, Some(90.0));
        let document = fs::read_to_string(&svg).unwrap();
        assert!(document.starts_with("<svg"));
    }

    #[test]
    fn missing_dataset_is_a_missing_resource() {
        let tmp = tempdir().unwrap();
        let mut config = quiet_config();
        config.paths.features = tmp.path().join("absent.csv");
        let err = Simulator::builder().config(config).build().unwrap_err();
        assert!(matches!(
            err,
            StreamError::MissingResource {
                resource: "dataset",
                ..
            }
        ));
    }

    #[test]
    fn missing_model_is_a_missing_resource() {
        let tmp = tempdir().unwrap();
        let features = tmp.path().join("X.csv");
        let targets = tmp.path().join("y.csv");
        fs::write(&features, "a\n1\n").unwrap();
        fs::write(&targets, "y\n1\n").unwrap();
        let mut config = quiet_config();
        config.paths.features = features;
        config.paths.targets = targets;
        config.paths.model = tmp.path().join("absent.json");
        let err = Simulator::builder().config(config).build().unwrap_err();
        assert!(matches!(
            err,
            StreamError::MissingResource {
                resource: "model",
                ..
            }
        ));
    }

    #[test]
    fn logging_section_builds_file_telemetry() {
        let tmp = tempdir().unwrap();
        let log = tmp.path().join("stream.log");
        let mut config = quiet_config();
        config.logging.path = Some(log.clone());
        let simulator = Simulator::builder()
            .config(config)
            .source(DataSource::Synthetic(SyntheticProfile {
                samples: 4,
                ..SyntheticProfile::default()
            }))
            .build()
            .unwrap();
        assert!(simulator.telemetry().is_some());
        let records = shared_logging::read_records(&log).unwrap();
        assert_eq!(records[0].message, "simulator.loaded");
    }
}
