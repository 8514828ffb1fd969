use std::{
    any::Any,
    path::{Path, PathBuf},
    process::exit,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use collatz::config::ConfigArgs;
use collatz_core::{
    benchmark::{benchmark_concurrent, benchmark_sequential},
    sink::TrajectoryWriter,
    CollatzCalculator, RunSummary,
};
use common::config::{CalculatorConfig, SinkConfig};
use eyre::{Result, WrapErr};
use sysinfo::System;
use tracing_chrome::ChromeLayerBuilder;
use tracing_subscriber::{self, fmt::format::FmtSpan, prelude::*, EnvFilter};

/// Exhaustive Collatz verification benchmarks
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Time full-range runs up to 2^power
    Benchmark(BenchmarkArgs),
    /// Print the fused step count to 1 of each value
    Steps {
        #[arg(required = true)]
        values: Vec<u64>,
    },
    /// Write the full trajectory of each value
    Trajectory {
        #[arg(required = true)]
        values: Vec<u64>,

        /// Output file, or `-` for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
    /// Run sequentially, then query the accumulated proof mask
    Mask {
        #[arg(short, long, default_value_t = 20)]
        power: u32,

        /// Values to check against the mask
        #[arg(short, long)]
        query: Vec<u64>,
    },
}

#[derive(Args, Debug)]
struct BenchmarkArgs {
    /// Test every odd value below 2^(power - 1)
    #[arg(short, long, default_value_t = 24)]
    power: u32,

    #[arg(short, long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    /// Write every trajectory to this file, or `-` for stderr (stdout carries the banners)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print run summaries as JSON
    #[arg(long)]
    json: bool,

    /// Span output formats
    #[arg(short, long, value_enum)]
    format: Option<Vec<Format>>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
enum Mode {
    Sequential,
    Concurrent,
    Both,
}

#[derive(Debug, Clone, ValueEnum, PartialEq)]
enum Format {
    Default,
    Chrome,
}

fn main() {
    let cli = Cli::parse();
    let formats = match &cli.command {
        Commands::Benchmark(args) => args.format.clone().unwrap_or_default(),
        _ => Vec::new(),
    };
    let trace_file = match &cli.command {
        Commands::Benchmark(args) => Some(format!(
            "benchmark-runs/perfetto_traces/collatz_{}.json",
            args.power
        )),
        _ => None,
    };
    let _guards = init_tracing(&formats, trace_file);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn init_tracing(formats: &[Format], trace_file: Option<String>) -> Vec<Box<dyn Any>> {
    let mut layers = Vec::new();

    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_filter(log_filter)
        .boxed();
    layers.push(log_layer);

    let mut guards: Vec<Box<dyn Any>> = vec![];

    if formats.contains(&Format::Default) {
        let collector_layer = tracing_subscriber::fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed();
        layers.push(collector_layer);
    }
    if formats.contains(&Format::Chrome) {
        let (chrome_layer, guard) = match &trace_file {
            Some(file) => {
                if let Err(e) = std::fs::create_dir_all("benchmark-runs/perfetto_traces") {
                    eprintln!("Warning: Failed to create benchmark-runs/perfetto_traces directory: {e}");
                }
                ChromeLayerBuilder::new()
                    .file(file)
                    .include_args(true)
                    .build()
            }
            None => ChromeLayerBuilder::new().include_args(true).build(),
        };
        layers.push(chrome_layer.boxed());
        guards.push(Box::new(guard));
    }

    tracing_subscriber::registry().with(layers).init();
    announce_formats(formats);
    guards
}

/// Runs once the subscriber is installed; earlier events have nowhere to go.
fn announce_formats(formats: &[Format]) {
    if formats.contains(&Format::Chrome) {
        tracing::info!("Running tracing-chrome. Traces can be viewed in https://ui.perfetto.dev/");
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config.resolve()?;
    match cli.command {
        Commands::Benchmark(args) => benchmark(config, args),
        Commands::Steps { values } => {
            let calculator = CollatzCalculator::new(config)?;
            for value in values {
                println!("{value}: {}", calculator.steps(value)?);
            }
            Ok(())
        }
        Commands::Trajectory { values, output } => {
            let sink = open_sink(&output, Console::Stdout, config.sink)?;
            let calculator = CollatzCalculator::new(config)?.with_sink(sink);
            for value in values {
                calculator.test_and_print(value)?;
            }
            calculator.finish()?;
            Ok(())
        }
        Commands::Mask { power, query } => {
            let calculator = CollatzCalculator::new(config)?;
            calculator.test_sequentially(power)?;
            let mask = calculator.proof_mask()?;
            println!(
                "mask: {:#b} power: {} solid: {}",
                mask.mask, mask.mask_power, mask.mask_is_solid
            );
            for value in query {
                println!("{value}: {}", mask.has_proven(value));
            }
            Ok(())
        }
    }
}

fn benchmark(mut config: CalculatorConfig, args: BenchmarkArgs) -> Result<()> {
    log_host();

    let sink = match &args.output {
        Some(path) => {
            config.emit_trajectories = true;
            Some(open_sink(path, Console::Stderr, config.sink)?)
        }
        None => None,
    };
    let mut calculator = CollatzCalculator::new(config)?;
    if let Some(sink) = sink {
        calculator = calculator.with_sink(sink);
    }
    tracing::info!(threads = calculator.num_threads(), "worker pool ready");

    let mut summaries: Vec<RunSummary> = Vec::new();
    if matches!(args.mode, Mode::Sequential | Mode::Both) {
        summaries.push(benchmark_sequential(&calculator, args.power)?);
    }
    if matches!(args.mode, Mode::Concurrent | Mode::Both) {
        summaries.push(benchmark_concurrent(&calculator, args.power)?);
    }

    if let [sequential, concurrent] = summaries.as_slice() {
        let speedup = sequential.elapsed.as_secs_f64() / concurrent.elapsed.as_secs_f64();
        tracing::info!("concurrent speedup: {speedup:.2}x");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    let written = calculator.finish()?;
    if args.output.is_some() {
        tracing::info!(bytes = written, "trajectories written");
    }
    Ok(())
}

/// Where `-` sends trajectories.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Console {
    Stdout,
    Stderr,
}

fn open_sink(path: &Path, console: Console, config: SinkConfig) -> Result<TrajectoryWriter> {
    if path.as_os_str() == "-" {
        let sink = match console {
            Console::Stdout => TrajectoryWriter::stdout(config)?,
            Console::Stderr => TrajectoryWriter::stderr(config)?,
        };
        return Ok(sink);
    }
    TrajectoryWriter::create(path, config)
        .wrap_err_with(|| format!("failed to create trajectory file {}", path.display()))
}

fn log_host() {
    let mut system = System::new();
    system.refresh_cpu();
    let brand = system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .unwrap_or_default();
    tracing::info!(
        cpus = system.cpus().len(),
        os = System::long_os_version().unwrap_or_default(),
        "host: {brand}"
    );
}
