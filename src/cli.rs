//! CLI argument parsing for cctprof

use crate::attribution::{AttributionMode, OutputFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cctprof")]
#[command(version)]
#[command(
    about = "Attribute binary-instrumentation overhead in HPCToolkit calling-context profiles",
    long_about = None
)]
pub struct Cli {
    /// TOML file with analyzer settings (flags override it)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug tracing to stderr (honours RUST_LOG)
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rank program entities by the instrumentation cost attributed to them
    Attribute(AttributeArgs),

    /// Split statement cost by rewritten region and code version
    Versions(VersionsArgs),

    /// Dump the calling-context tree of a database
    Tree(TreeArgs),

    /// Summarize one or more databases
    Summary(SummaryArgs),
}

/// Settings shared by subcommands that load databases
#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    /// Materialize call-site elements as tree nodes
    #[arg(long = "call-site-nodes")]
    pub call_site_nodes: bool,

    /// Frame name of instrumentation markers
    #[arg(long = "marker", value_name = "NAME")]
    pub marker: Option<String>,
}

#[derive(Args, Debug)]
pub struct AttributeArgs {
    /// Profile database directories (or experiment.xml files)
    #[arg(required = true, value_name = "DB")]
    pub databases: Vec<PathBuf>,

    /// Grouping of attributed cost
    #[arg(short = 'm', long = "mode", value_enum, default_value = "function")]
    pub mode: AttributionMode,

    /// Print only the K most expensive entries
    #[arg(short = 'k', long = "top-k", value_name = "K")]
    pub top_k: Option<usize>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Worker threads for loading databases
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub load: LoadArgs,
}

#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Profile database directory (or experiment.xml file)
    #[arg(value_name = "DB")]
    pub database: PathBuf,

    /// Version map written by the binary rewriter
    #[arg(value_name = "MAP")]
    pub map: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub load: LoadArgs,
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Profile database directory (or experiment.xml file)
    #[arg(value_name = "DB")]
    pub database: PathBuf,

    /// Skip nodes deeper than this
    #[arg(long = "max-depth", value_name = "DEPTH")]
    pub max_depth: Option<usize>,

    #[command(flatten)]
    pub load: LoadArgs,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Profile database directories (or experiment.xml files)
    #[arg(required = true, value_name = "DB")]
    pub databases: Vec<PathBuf>,

    /// Print the summaries as a JSON array
    #[arg(long = "json")]
    pub json: bool,

    #[command(flatten)]
    pub load: LoadArgs,
}
