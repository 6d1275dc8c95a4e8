use crate::config::load_config;
use crate::ir::OpTree;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output};
use crate::session::LayoutSession;
use crate::transition::RecordingBackend;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nnle", version, about = "Lay out a traced neural-network graph")]
pub struct Args {
    /// Input op tree (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Expand these ops after the initial pass
    #[arg(long = "expand", value_name = "ID")]
    pub expand: Vec<String>,

    /// Collapse these ops after the initial pass
    #[arg(long = "collapse", value_name = "ID")]
    pub collapse: Vec<String>,

    /// Show everything above this depth and fold the rest
    #[arg(short = 'd', long = "depth")]
    pub depth: Option<u32>,

    /// Also write the layout as JSON to this path
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Json,
    /// Scene commands emitted while drawing, one JSON object per line
    Commands,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let tree = OpTree::from_json(&input).context("failed to load op tree")?;
    let mut session = LayoutSession::new(tree, config.layout.clone(), RecordingBackend::new())?;
    session.initial_pass()?;

    if let Some(depth) = args.depth {
        session.collapse_to_depth(depth)?;
    }
    for key in &args.expand {
        session.expand(key)?;
    }
    for key in &args.collapse {
        session.collapse(key)?;
    }
    session.finish_animations();

    let stats = session.stats();
    for warning in &stats.warnings {
        tracing::warn!(%warning, "layout warning");
    }
    tracing::info!(
        nodes = stats.visible_nodes,
        planes = stats.visible_planes,
        edges = session.edges().len(),
        "layout ready"
    );

    if let Some(path) = &args.dump_layout {
        write_layout_dump(path, session.tree(), session.edges(), session.stats())?;
    }

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(session.tree(), session.edges(), &config.theme, &config.render);
            write_output(&svg, args.output.as_deref())?;
        }
        OutputFormat::Json => {
            let dump = crate::layout_dump::LayoutDump::from_layout(
                session.tree(),
                session.edges(),
                session.stats(),
            );
            write_output(&serde_json::to_string_pretty(&dump)?, args.output.as_deref())?;
        }
        OutputFormat::Commands => {
            let mut lines = String::new();
            for command in &session.backend().log {
                lines.push_str(&serde_json::to_string(command)?);
                lines.push('\n');
            }
            write_output(&lines, args.output.as_deref())?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_actions() {
        let args = Args::try_parse_from([
            "nnle", "-i", "model.json", "--expand", "m", "--expand", "n", "--collapse", "k", "-d",
            "3", "-e", "commands",
        ])
        .unwrap();
        assert_eq!(args.expand, vec!["m", "n"]);
        assert_eq!(args.collapse, vec!["k"]);
        assert_eq!(args.depth, Some(3));
        assert!(matches!(args.output_format, OutputFormat::Commands));
    }
}
