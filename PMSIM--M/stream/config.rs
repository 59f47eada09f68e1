use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use shared_logging::LogLevel;

use crate::{
    error::{Result, StreamError},
    render::ChartLayout,
};

/// Loop tuning. Every field has a default and may be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Alert boundary; predictions strictly above it raise ALERT.
    pub threshold: f64,
    /// Smoothing denominator; `<= 1` disables smoothing.
    pub smoothing_factor: f64,
    /// Redraw every `render_stride` iterations.
    pub render_stride: usize,
    /// Minimum clock time between readout refreshes.
    pub metrics_refresh_interval_seconds: f64,
    /// Cosmetic pause between iterations.
    pub inter_iteration_delay_seconds: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            threshold: 80.0,
            smoothing_factor: 15.0,
            render_stride: 3,
            metrics_refresh_interval_seconds: 0.3,
            inter_iteration_delay_seconds: 0.005,
        }
    }
}

impl StreamConfig {
    /// Rejects settings that would misbehave mid-run.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(StreamError::config("threshold must be finite"));
        }
        if !self.smoothing_factor.is_finite() || self.smoothing_factor < 0.0 {
            return Err(StreamError::config(format!(
                "smoothing_factor must be a non-negative number, got {}",
                self.smoothing_factor
            )));
        }
        if self.render_stride == 0 {
            return Err(StreamError::config("render_stride must be at least 1"));
        }
        check_seconds(
            "metrics_refresh_interval_seconds",
            self.metrics_refresh_interval_seconds,
        )?;
        check_seconds(
            "inter_iteration_delay_seconds",
            self.inter_iteration_delay_seconds,
        )?;
        Ok(())
    }

    /// Refresh interval as a [`Duration`]; call after [`StreamConfig::validate`].
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        seconds(self.metrics_refresh_interval_seconds)
    }

    /// Pacing delay as a [`Duration`]; call after [`StreamConfig::validate`].
    #[must_use]
    pub fn inter_iteration_delay(&self) -> Duration {
        seconds(self.inter_iteration_delay_seconds)
    }
}

/// Rounds to the nearest nanosecond so `0.3` is exactly 300ms.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_nanos((value * 1e9).round() as u64)
    } else {
        Duration::ZERO
    }
}

fn check_seconds(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StreamError::config(format!(
            "{name} must be a non-negative number of seconds, got {value}"
        )))
    }
}

/// Input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Feature CSV with a header row.
    pub features: PathBuf,
    /// Target CSV with a header row.
    pub targets: PathBuf,
    /// Dense network weights (JSON).
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            features: PathBuf::from("data/X_test_reloaded.csv"),
            targets: PathBuf::from("data/y_test_reloaded.csv"),
            model: PathBuf::from("model/motor_dnn_best.json"),
        }
    }
}

/// Chart geometry plus optional SVG output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Geometry and axis limits.
    #[serde(flatten)]
    pub layout: ChartLayout,
    /// Write an SVG chart here on every render.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg_path: Option<PathBuf>,
    /// Draw the terminal chart and readouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,
}

impl ChartConfig {
    /// Whether the terminal dashboard is enabled (default on).
    #[must_use]
    pub fn terminal_enabled(&self) -> bool {
        self.terminal.unwrap_or(true)
    }

    fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        if layout.width == 0 || layout.height < 2 {
            return Err(StreamError::config(
                "chart needs width >= 1 and height >= 2",
            ));
        }
        if !(layout.y_min.is_finite() && layout.y_max.is_finite() && layout.y_max > layout.y_min) {
            return Err(StreamError::config("chart y_max must exceed y_min"));
        }
        Ok(())
    }
}

/// Structured log and event outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// JSON-lines log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Lowest level written to `path`.
    pub level: LogLevel,
    /// JSON-lines event log (readouts and run outcome).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            path: None,
            level: LogLevel::Info,
            event_log: None,
        }
    }
}

/// Whole simulator configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Input files.
    pub paths: PathsConfig,
    /// Loop tuning.
    pub stream: StreamConfig,
    /// Rendering.
    pub chart: ChartConfig,
    /// Logs and events.
    pub logging: LoggingConfig,
}

impl SimulatorConfig {
    /// Loads a TOML document. Relative paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => StreamError::MissingResource {
                resource: "config file",
                details: path.display().to_string(),
            },
            _ => StreamError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let mut config = Self::from_toml_str(&raw).map_err(|err| match err {
            StreamError::ConfigParse { details, .. } => StreamError::ConfigParse {
                path: path.to_path_buf(),
                details,
            },
            other => other,
        })?;
        let base = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        config.resolve_relative_to(&base);
        Ok(config)
    }

    /// Parses and validates a TOML document without touching the filesystem.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|err| StreamError::ConfigParse {
            path: PathBuf::from("<inline>"),
            details: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.stream.validate()?;
        self.chart.validate()
    }

    /// Serializes the document back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| StreamError::config(err.to_string()))
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |candidate: &mut PathBuf| {
            if candidate.is_relative() {
                *candidate = base.join(&*candidate);
            }
        };
        resolve(&mut self.paths.features);
        resolve(&mut self.paths.targets);
        resolve(&mut self.paths.model);
        for optional in [
            &mut self.chart.svg_path,
            &mut self.logging.path,
            &mut self.logging.event_log,
        ] {
            if let Some(candidate) = optional.as_mut() {
                resolve(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_dashboard() {
        let config = StreamConfig::default();
        assert_eq!(config.threshold, 80.0);
        assert_eq!(config.smoothing_factor, 15.0);
        assert_eq!(config.render_stride, 3);
        assert_eq!(config.refresh_interval(), Duration::from_millis(300));
        assert_eq!(config.inter_iteration_delay(), Duration::from_millis(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_numbers() {
        let cases = [
            StreamConfig {
                render_stride: 0,
                ..StreamConfig::default()
            },
            StreamConfig {
                smoothing_factor: -2.0,
                ..StreamConfig::default()
            },
            StreamConfig {
                threshold: f64::NAN,
                ..StreamConfig::default()
            },
            StreamConfig {
                metrics_refresh_interval_seconds: -0.1,
                ..StreamConfig::default()
            },
            StreamConfig {
                inter_iteration_delay_seconds: f64::INFINITY,
                ..StreamConfig::default()
            },
        ];
        for case in cases {
            assert!(
                matches!(case.validate(), Err(StreamError::Configuration { .. })),
                "{case:?}"
            );
        }
    }

    #[test]
    fn parses_partial_document() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            [stream]
            threshold = 75.0
            render_stride = 5

            [chart]
            width = 40
            svg_path = "out/live.svg"
            "#,
        )
        .unwrap();
        assert_eq!(config.stream.threshold, 75.0);
        assert_eq!(config.stream.render_stride, 5);
        assert_eq!(config.stream.smoothing_factor, 15.0);
        assert_eq!(config.chart.layout.width, 40);
        assert_eq!(config.chart.layout.height, 16);
        assert!(config.chart.terminal_enabled());
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn negative_stride_is_a_parse_error() {
        let err = SimulatorConfig::from_toml_str("[stream]\nrender_stride = -3\n").unwrap_err();
        assert!(matches!(err, StreamError::ConfigParse { .. }));
        let err = SimulatorConfig::from_toml_str("[stream]\nrender_stride = 0\n").unwrap_err();
        assert!(matches!(err, StreamError::Configuration { .. }));
    }

    #[test]
    fn load_resolves_paths_against_config_dir() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("sim.toml");
        fs::write(
            &path,
            "[paths]\nfeatures = \"data/x.csv\"\nmodel = \"/abs/model.json\"\n[logging]\nevent_log = \"logs/events.jsonl\"\n",
        )
        .unwrap();
        let config = SimulatorConfig::load(&path).unwrap();
        assert_eq!(config.paths.features, tmp.path().join("data/x.csv"));
        assert_eq!(config.paths.targets, tmp.path().join("data/y_test_reloaded.csv"));
        assert_eq!(config.paths.model, PathBuf::from("/abs/model.json"));
        assert_eq!(
            config.logging.event_log,
            Some(tmp.path().join("logs/events.jsonl"))
        );
        assert!(matches!(
            SimulatorConfig::load(tmp.path().join("absent.toml")),
            Err(StreamError::MissingResource { .. })
        ));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = SimulatorConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(SimulatorConfig::from_toml_str(&text).unwrap(), config);
    }
}
