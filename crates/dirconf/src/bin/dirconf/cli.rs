//! dirconf cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; dirconf ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process a document
    ///
    /// Prints the single outcome with sweeps kept as they are, or all outcomes with --all
    #[command(alias = "proc")]
    Process(ProcessCommand),

    /// List variables, environment variables, symbols and imports of a document
    Inspect(InspectCommand),

    /// List every leaf of a document with its path
    Walk(WalkCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct ProcessCommand {
    /// Document to process
    pub file: PathBuf,

    /// Document with the values for $var and $for
    #[clap(short = 'c', long = "context")]
    pub context: Option<PathBuf>,

    /// Expand sweeps and print every outcome
    #[clap(short = 'a', long = "all")]
    pub all: bool,

    /// Fail instead of producing more outcomes than this
    #[clap(long = "max-branches")]
    pub max_branches: Option<usize>,

    /// Fail on variables that have no value
    #[clap(long = "strict")]
    pub strict: bool,

    /// Write each outcome to its own file in this directory
    #[clap(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct InspectCommand {
    pub file: PathBuf,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct WalkCommand {
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yml",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Print the syntax tree of a document
    Ast { file: PathBuf },
    /// Print the directive tokens of a string
    Scan { text: String },
}
