use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use barrage_core::{AllocationStrategy, BarrageConfig, Bounds, Speed, Timebase};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::error::{Result, SimError};
use crate::scenario::{Scenario, StreamSpec};
use crate::sim::{SimOptions, run as run_sim};

#[derive(Debug, Parser)]
#[command(
    name = "barrage-sim",
    about = "Headless barrage lane allocation simulator",
    version
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a stream through the engine and report outcomes.
    Run(RunArgs),

    /// Print the effective configuration.
    #[command(name = "print-config")]
    PrintConfig(ConfigArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpeedArg {
    Slower,
    Slow,
    Slowless,
    Normal,
    Fastless,
    Fast,
    Faster,
}

impl From<SpeedArg> for Speed {
    fn from(value: SpeedArg) -> Self {
        match value {
            SpeedArg::Slower => Self::Slower,
            SpeedArg::Slow => Self::Slow,
            SpeedArg::Slowless => Self::Slowless,
            SpeedArg::Normal => Self::Normal,
            SpeedArg::Fastless => Self::Fastless,
            SpeedArg::Fast => Self::Fast,
            SpeedArg::Faster => Self::Faster,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Compact,
    Sparse,
}

impl From<StrategyArg> for AllocationStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Compact => Self::Compact,
            StrategyArg::Sparse => Self::Sparse,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// TOML or JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub speed: Option<SpeedArg>,

    /// Transit duration in ms; overrides --speed.
    #[arg(long = "transit-ms")]
    pub transit_ms: Option<i64>,

    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Percent of the container height used for lanes.
    #[arg(long)]
    pub area: Option<f64>,

    #[arg(long = "row-height")]
    pub row_height: Option<f64>,

    #[arg(long = "min-gap")]
    pub min_gap: Option<f64>,

    /// Treat scheduled times as offsets from playback start.
    #[arg(long)]
    pub preset: bool,

    /// Seed for lane shuffling.
    #[arg(long = "lane-seed")]
    pub lane_seed: Option<u64>,
}

impl ConfigArgs {
    /// Load the config file, if any, then apply flag overrides.
    pub fn resolve(&self) -> Result<BarrageConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => BarrageConfig::default(),
        };
        if let Some(speed) = self.speed {
            config.speed = speed.into();
        }
        if let Some(ms) = self.transit_ms {
            config.speed = Speed::Custom(ms);
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.into();
        }
        if let Some(area) = self.area {
            config.area = area;
        }
        if let Some(row_height) = self.row_height {
            config.row_height = row_height;
        }
        if let Some(min_gap) = self.min_gap {
            config.min_gap = min_gap;
        }
        if self.preset {
            config.timebase = Timebase::Preset;
        }
        if self.lane_seed.is_some() {
            config.seed = self.lane_seed;
        }
        Ok(config.validated()?)
    }
}

fn load_config(path: &Path) -> Result<BarrageConfig> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(BarrageConfig::from_toml_file(path)?),
        Some("json") => Ok(BarrageConfig::from_json_file(path)?),
        _ => Err(SimError::ConfigFormat {
            path: path.to_path_buf(),
        }),
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// JSON-lines item file; replaces the generated stream.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Mean items per second for the generated stream.
    #[arg(long, default_value_t = 20.0)]
    pub rate: f64,

    #[arg(long = "duration-ms", default_value_t = 30_000)]
    pub duration_ms: i64,

    #[arg(long = "latency-ms", default_value_t = 300)]
    pub latency_ms: i64,

    /// Seed for the generated stream.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    #[arg(long, default_value_t = 1_280.0)]
    pub width: f64,

    #[arg(long, default_value_t = 720.0)]
    pub height: f64,

    #[arg(long = "char-width", default_value_t = 16.0)]
    pub char_width: f64,

    #[arg(long = "frame-ms", default_value_t = 16)]
    pub frame_ms: i64,

    #[arg(long = "max-frames", default_value_t = 1_000_000)]
    pub max_frames: u64,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    run(cli)
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_stream(&args),
        Commands::PrintConfig(args) => {
            let config = args.resolve()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_stream(args: &RunArgs) -> Result<()> {
    if !(args.width > 0.0) || !(args.height >= 0.0) {
        return Err(SimError::invalid(format!(
            "container must have positive width and non-negative height, got {}x{}",
            args.width, args.height
        )));
    }
    if !(args.char_width > 0.0) {
        return Err(SimError::invalid("char-width must be > 0"));
    }
    if args.frame_ms <= 0 {
        return Err(SimError::invalid("frame-ms must be > 0"));
    }

    let config = args.config.resolve()?;
    let scenario = match &args.input {
        Some(path) => Scenario::from_jsonl(BufReader::new(File::open(path)?))?,
        None => Scenario::generate(&StreamSpec {
            rate: args.rate,
            duration_ms: args.duration_ms,
            max_latency_ms: args.latency_ms,
            seed: args.seed,
        })?,
    };
    let options = SimOptions {
        container: Bounds::from_size(args.width, args.height),
        char_width: args.char_width,
        frame_ms: args.frame_ms,
        max_frames: args.max_frames,
        start_at: 0,
    };

    let report = run_sim(config, &scenario, &options);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    if report.overlap_count > 0 {
        return Err(SimError::Overlap {
            count: report.overlap_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use tempfile::NamedTempFile;

    use super::{Cli, Commands, run};
    use crate::error::SimError;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("barrage-sim").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "print-config",
            "--speed",
            "slow",
            "--strategy",
            "compact",
            "--min-gap",
            "10",
        ]);
        let Commands::PrintConfig(args) = cli.command else {
            panic!("expected print-config");
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.transit(), 23_000);
        assert_eq!(config.strategy, barrage_core::AllocationStrategy::Compact);
        assert_eq!(config.min_gap, 10.0);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = parse(&["print-config", "--area", "0"]);
        let err = run(cli).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn config_file_is_loaded_by_extension() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "speed = \"normal\"\nrow_height = 30.0").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let cli = parse(&["print-config", "--config", &path]);
        let Commands::PrintConfig(args) = cli.command else {
            panic!("expected print-config");
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.transit(), 18_000);
        assert_eq!(config.row_height, 30.0);
    }

    #[test]
    fn unknown_config_extension_fails() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let err = run(parse(&["print-config", "--config", &path])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn small_generated_run_succeeds() {
        let cli = parse(&[
            "run",
            "--rate",
            "10",
            "--duration-ms",
            "2000",
            "--lane-seed",
            "4",
            "--json",
        ]);
        assert!(run(cli).is_ok());
    }

    #[test]
    fn jsonl_input_runs() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..6 {
            writeln!(
                file,
                "{{\"id\":\"f{i}\",\"content\":\"item {i}\",\"scheduledTime\":{}}}",
                i * 250
            )
            .unwrap();
        }
        let path = file.path().to_str().unwrap().to_string();
        assert!(run(parse(&["run", "--input", &path, "--height", "48"])).is_ok());
    }

    #[test]
    fn zero_frame_step_is_invalid() {
        let err = run(parse(&["run", "--frame-ms", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
