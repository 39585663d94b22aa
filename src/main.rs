use anyhow::{Context, Result};
use clap::Parser;
use cctprof::attribution::{attribute_databases, open_database, write_report};
use cctprof::cli::{Cli, Command, LoadArgs};
use cctprof::config::AnalyzerConfig;
use cctprof::ingest::ProfileDatabase;
use cctprof::inspect::{summarize, write_summary, write_tree};
use cctprof::version_map::{version_report, write_version_report, VersionMap};
use std::io::{self, BufWriter, Write};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Defaults, then the config file, then command-line flags
fn load_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let config = match &cli.config {
        Some(path) => AnalyzerConfig::from_toml(path)?,
        None => AnalyzerConfig::default(),
    };
    debug!("Config: {:?}", config);
    Ok(config)
}

fn apply_load_args(config: &mut AnalyzerConfig, load: &LoadArgs) {
    if load.call_site_nodes {
        config.call_site_nodes = true;
    }
    if let Some(marker) = &load.marker {
        config.marker_frame = marker.clone();
    }
}

fn finish(config: AnalyzerConfig) -> Result<AnalyzerConfig> {
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Command::Attribute(args) => {
            apply_load_args(&mut config, &args.load);
            config.top_k = args.top_k.or(config.top_k);
            config.jobs = args.jobs.or(config.jobs);
            let config = finish(config)?;

            let attribution = attribute_databases(&args.databases, args.mode, &config)?;
            write_report(&attribution, args.format, config.top_k, &mut out)?;
        }
        Command::Versions(args) => {
            apply_load_args(&mut config, &args.load);
            let config = finish(config)?;

            let (db, metric) = open_database(&args.database, &config)?;
            let map = VersionMap::from_file(&args.map)?;
            let report = version_report(&db, &map, metric);
            write_version_report(&report, args.format, &mut out)?;
        }
        Command::Tree(args) => {
            apply_load_args(&mut config, &args.load);
            let config = finish(config)?;

            let db = ProfileDatabase::open(&args.database, &config.ingest_options())
                .with_context(|| format!("Failed to load {}", args.database.display()))?;
            let metric = db.tables.metrics.select(&config.exclusive_tag);
            write_tree(&db, metric, args.max_depth, &mut out)?;
        }
        Command::Summary(args) => {
            apply_load_args(&mut config, &args.load);
            let config = finish(config)?;

            let mut summaries = Vec::with_capacity(args.databases.len());
            for path in &args.databases {
                let db = ProfileDatabase::open(path, &config.ingest_options())
                    .with_context(|| format!("Failed to load {}", path.display()))?;
                let metric = db.tables.metrics.select(&config.exclusive_tag);
                summaries.push(summarize(&db, &config.marker_frame, metric));
            }
            if args.json {
                serde_json::to_writer_pretty(&mut out, &summaries)?;
                writeln!(out)?;
            } else {
                for summary in &summaries {
                    write_summary(summary, &mut out)?;
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(cli.debug);

    run(cli)
}
