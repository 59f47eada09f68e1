use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use pmsim_stream::{
    config::PathsConfig,
    dataset::TabularDataset,
    helper::random_seed,
    report::RunReport,
    CancelToken, DataSource, RunState, Simulator, SimulatorConfig, SyntheticProfile,
};
use shared_logging::LogLevel;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Parser, Debug)]
#[command(
    name = "pmsim",
    version,
    about = "Streams motor samples through a PM temperature model with a live chart"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Streams the configured dataset through the model.
    Run(RunArgs),
    /// Streams generated motor data through its matching model.
    Demo {
        #[command(flatten)]
        stream: StreamArgs,
        /// Samples to generate.
        #[arg(long, default_value_t = 600)]
        samples: usize,
        /// RNG seed; random when omitted.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Loads a dataset and prints its summary.
    Inspect {
        /// Feature CSV; defaults to the standard data path.
        #[arg(long)]
        features: Option<PathBuf>,
        /// Target CSV; defaults to the standard data path.
        #[arg(long)]
        targets: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    stream: StreamArgs,
    /// Feature CSV.
    #[arg(long)]
    features: Option<PathBuf>,
    /// Target CSV.
    #[arg(long)]
    targets: Option<PathBuf>,
    /// Dense network weights (JSON).
    #[arg(long)]
    model: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct StreamArgs {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Alert threshold in °C.
    #[arg(long)]
    threshold: Option<f64>,
    /// Smoothing denominator; 1 disables smoothing.
    #[arg(long)]
    smoothing_factor: Option<f64>,
    /// Redraw every N samples.
    #[arg(long)]
    render_stride: Option<usize>,
    /// Seconds between readout refreshes.
    #[arg(long)]
    refresh_interval: Option<f64>,
    /// Seconds to pause between samples.
    #[arg(long)]
    delay: Option<f64>,
    /// Also write the chart as SVG to this path.
    #[arg(long)]
    svg: Option<PathBuf>,
    /// Skip the terminal chart and readouts.
    #[arg(long)]
    no_terminal: bool,
    /// JSON-lines log file.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Lowest level written to the log (`debug`, `info`, `warn`, `error`).
    #[arg(long)]
    log_level: Option<String>,
    /// JSON-lines event log.
    #[arg(long)]
    event_log: Option<PathBuf>,
    /// Write a JSON run report here.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl StreamArgs {
    /// Loads the config file (or defaults) and applies flag overrides.
    fn load_config(&self) -> Result<SimulatorConfig> {
        let mut config = match &self.config {
            Some(path) => SimulatorConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SimulatorConfig::default(),
        };
        let stream = &mut config.stream;
        if let Some(value) = self.threshold {
            stream.threshold = value;
        }
        if let Some(value) = self.smoothing_factor {
            stream.smoothing_factor = value;
        }
        if let Some(value) = self.render_stride {
            stream.render_stride = value;
        }
        if let Some(value) = self.refresh_interval {
            stream.metrics_refresh_interval_seconds = value;
        }
        if let Some(value) = self.delay {
            stream.inter_iteration_delay_seconds = value;
        }
        if let Some(path) = &self.svg {
            config.chart.svg_path = Some(path.clone());
        }
        if self.no_terminal {
            config.chart.terminal = Some(false);
        }
        if let Some(path) = &self.log {
            config.logging.path = Some(path.clone());
        }
        if let Some(raw) = &self.log_level {
            config.logging.level = LogLevel::parse(raw)
                .ok_or_else(|| anyhow!("unknown log level {raw:?}"))?;
        }
        if let Some(path) = &self.event_log {
            config.logging.event_log = Some(path.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            let mut config = args.stream.load_config()?;
            let paths = &mut config.paths;
            if let Some(path) = args.features {
                paths.features = path;
            }
            if let Some(path) = args.targets {
                paths.targets = path;
            }
            if let Some(path) = args.model {
                paths.model = path;
            }
            simulate(&args.stream, config, DataSource::Files)
        }
        Commands::Demo {
            stream,
            samples,
            seed,
        } => {
            let config = stream.load_config()?;
            let profile = SyntheticProfile {
                samples,
                seed: seed.unwrap_or_else(random_seed),
                ..SyntheticProfile::default()
            };
            simulate(&stream, config, DataSource::Synthetic(profile))
        }
        Commands::Inspect { features, targets } => {
            let defaults = PathsConfig::default();
            let features = features.unwrap_or(defaults.features);
            let targets = targets.unwrap_or(defaults.targets);
            inspect(&features, &targets)
        }
    }
}

fn simulate(args: &StreamArgs, config: SimulatorConfig, source: DataSource) -> Result<()> {
    let terminal = config.chart.terminal_enabled();
    let color = std::env::var_os("NO_COLOR").is_none();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;

    let report = runtime.block_on(async move {
        let mut simulator = Simulator::builder()
            .config(config)
            .source(source)
            .color(color)
            .build()?;
        if terminal {
            print!("{CLEAR_SCREEN}");
            io::stdout().flush()?;
        } else {
            println!("{}", simulator.summary());
        }

        let cancel = CancelToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                watcher.cancel();
            }
        });
        // Let the watcher install its handler before the loop starts.
        tokio::task::yield_now().await;

        let report = simulator.run(&cancel).await?;
        anyhow::Ok(report)
    })?;

    if terminal {
        println!("\n");
    }
    print_outcome(&report);
    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    Ok(())
}

fn print_outcome(report: &RunReport) {
    match report.state {
        RunState::Stopped => println!("Simulation stopped."),
        _ => println!("Simulation completed!"),
    }
    if let (Some(predicted), Some(status)) = (report.final_predicted, report.final_status) {
        println!(
            "{} of {} samples, final prediction {predicted:.2}°C [{status}]",
            report.iterations, report.samples_total
        );
    }
}

fn inspect(features: &Path, targets: &Path) -> Result<()> {
    let dataset = TabularDataset::from_csv(features, targets)
        .with_context(|| format!("loading {} and {}", features.display(), targets.display()))?;
    let summary = dataset.summary();
    println!("{summary}");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn flags_override_config_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("pmsim.toml");
        fs::write(
            &path,
            "[stream]\nthreshold = 75.0\nrender_stride = 5\n\n[chart]\nsvg_path = \"out/live.svg\"\n",
        )
        .unwrap();
        let args = StreamArgs {
            config: Some(path),
            render_stride: Some(2),
            no_terminal: true,
            ..StreamArgs::default()
        };
        let config = args.load_config().unwrap();
        assert!((config.stream.threshold - 75.0).abs() < f64::EPSILON);
        assert_eq!(config.stream.render_stride, 2);
        assert!(!config.chart.terminal_enabled());
        assert_eq!(
            config.chart.svg_path,
            Some(tmp.path().join("out").join("live.svg"))
        );
    }

    #[test]
    fn log_level_flag_sets_logging_level() {
        let args = StreamArgs {
            log_level: Some("warn".into()),
            ..StreamArgs::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);

        let args = StreamArgs {
            log_level: Some("loud".into()),
            ..StreamArgs::default()
        };
        assert!(args.load_config().is_err());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = StreamArgs {
            render_stride: Some(0),
            ..StreamArgs::default()
        };
        assert!(args.load_config().is_err());
    }

    #[test]
    fn cli_parses_demo_flags() {
        let cli = Cli::try_parse_from([
            "pmsim",
            "demo",
            "--samples",
            "50",
            "--seed",
            "3",
            "--no-terminal",
            "--smoothing-factor",
            "1",
        ])
        .unwrap();
        match cli.command {
            Commands::Demo {
                stream,
                samples,
                seed,
            } => {
                assert_eq!(samples, 50);
                assert_eq!(seed, Some(3));
                assert!(stream.no_terminal);
                assert_eq!(stream.smoothing_factor, Some(1.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
