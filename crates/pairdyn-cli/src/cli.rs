use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "pairdyn developers",
    version,
    about = "pairdyn - Molecular dynamics of atoms interacting through a two-term pair potential, on a sequential or data-parallel force backend.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Integrate a trajectory and write the report, energy log and trajectory files.
    Run(RunArgs),
    /// Run the same input on both backends and compare their energies and forces.
    Check(CheckArgs),
}

/// Force backend names accepted on the command line and in the run file.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sequential,
    Parallel,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Prefix for the output files (<PREFIX>.out, .ene, .pic, .final.xyz).
    #[arg(short, long, required = true, value_name = "PREFIX")]
    pub output: PathBuf,

    /// Override the number of integration steps.
    #[arg(short = 'n', long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Override the force backend.
    #[arg(short, long, value_enum, value_name = "KIND")]
    pub backend: Option<BackendKind>,

    /// Override the number of steps per parallel dispatch.
    #[arg(long, value_name = "INT")]
    pub batch_steps: Option<usize>,

    /// Override the target temperature of the thermostat.
    #[arg(short, long, value_name = "FLOAT")]
    pub temperature: Option<f64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S run.report-interval=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Largest accepted relative difference of the potential energies.
    #[arg(long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,

    /// Steps both backends advance before comparing. Zero compares the
    /// starting configuration only.
    #[arg(short = 'n', long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
