use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, Level};

use ampes::{discover_inputs, init_logging, run_all, Config, BUILD_DATE, VERSION};

#[derive(Parser, Debug)]
#[command(name = "ampes", version)]
#[command(about = "Convert layered RepRap g-code into heat-source event series")]
struct Args {
    /// G-code files or directories of *.gcode files
    #[arg(short, long, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Configuration file (YAML, JSON or TOML)
    #[arg(short, long, default_value = "input.yaml")]
    config: PathBuf,

    /// Output directory
    #[arg(short = 'd', long, default_value = "output")]
    output_dir: PathBuf,

    /// Base name of the output files
    #[arg(short = 'o', long, default_value = "output")]
    outfile_name: String,

    /// Seed of the power fluctuation stream, overrides the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    init_logging(level)?;
    debug!("ampes {} built {}", VERSION, BUILD_DATE);

    info!("Reading configuration {}", args.config.display());
    let config = Config::load_run_config(&args.config)
        .with_context(|| format!("Failed to load configuration {}", args.config.display()))?
        .with_seed(args.seed);

    let cwd = std::env::current_dir().context("Failed to resolve the working directory")?;
    let inputs = discover_inputs(&args.input, &cwd)?;

    let written = run_all(&config, &inputs, &args.output_dir, &args.outfile_name)?;
    for path in &written {
        debug!("Wrote {}", path.display());
    }
    Ok(())
}
