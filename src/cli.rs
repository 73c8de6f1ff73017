use crate::config::{Config, LayoutStrategy, load_config};
use crate::ir::Graph;
use crate::layout::{UserEdits, compute_layout_with_edits};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pdl", version, about = "Lay out a generated data-pipeline architecture graph")]
pub struct Args {
    /// Input graph JSON or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output layout JSON. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Placement strategy; overrides the config file
    #[arg(short = 's', long = "strategy", value_enum)]
    pub strategy: Option<StrategyArg>,

    /// JSON file of user-pinned positions: {"pinned": {"id": {"x": .., "y": ..}}}
    #[arg(short = 'e', long = "edits")]
    pub edits: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StrategyArg {
    Columns,
    Solver,
}

impl From<StrategyArg> for LayoutStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Columns => LayoutStrategy::Columns,
            StrategyArg::Solver => LayoutStrategy::Solver,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = resolve_config(&args)?;
    let input = read_input(args.input.as_deref())?;
    let graph = Graph::from_json_str(&input).context("failed to parse input graph")?;
    let edits = read_edits(args.edits.as_deref())?;

    tracing::info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        pinned = edits.pinned.len(),
        "laying out graph"
    );
    let layout = compute_layout_with_edits(&graph, &edits, &config.theme, &config.layout);
    if !layout.report.is_clean() {
        tracing::warn!(
            dropped_nodes = layout.report.dropped_nodes.len(),
            dropped_edges = layout.report.dropped_edges.len(),
            "input graph needed cleanup"
        );
    }

    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &layout)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let json = LayoutDump::from_layout(&layout).to_json()?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(strategy) = args.strategy {
        config.layout.strategy = strategy.into();
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_edits(path: Option<&Path>) -> Result<UserEdits> {
    let Some(path) = path else {
        return Ok(UserEdits::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_edits(&contents)
}

fn parse_edits(contents: &str) -> Result<UserEdits> {
    serde_json::from_str(contents).context("invalid edits file")
}
