//! Rundown CLI Tool
//!
//! Command-line interface for resolving which items are in effect on each line
//! of a rundown, replaying edit scripts and inspecting exported snapshots.
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rundown_core::{EffectiveItem, EffectiveTable, LineId, Rundown, Snapshot};
use rundown_resolver::{ContinuityResolver, Edit, Mode, ResolverConfig, RundownSession};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rundown")]
#[command(about = "Rundown continuity - resolve infinite items across lines and segments")]
#[command(version)]
struct Cli {
    /// Lines walked between cancellation checks
    #[arg(long, global = true, default_value = "16")]
    cancel_check_interval: usize,

    /// Keep entries of lines that are no longer in the rundown
    #[arg(long, global = true)]
    keep_orphans: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a rundown JSON file and print the effective items
    Resolve {
        /// Input rundown JSON file
        input: PathBuf,

        /// Start recomputing at this line
        #[arg(long)]
        from: Option<String>,

        /// Walk to the last line even if every layer converges
        #[arg(long)]
        run_to_end: bool,

        /// Write a binary snapshot of the effective items
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a JSON list of edits to a rundown and print the result
    Replay {
        /// Input rundown JSON file
        input: PathBuf,

        /// JSON file holding a list of edits
        edits: PathBuf,

        /// Write a binary snapshot of the final effective items
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show information about a snapshot file
    Inspect {
        /// Snapshot file path
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ResolverConfig {
        cancel_check_interval: cli.cancel_check_interval,
        prune_orphans: !cli.keep_orphans,
    };

    match cli.command {
        Commands::Resolve {
            input,
            from,
            run_to_end,
            output,
        } => resolve(&input, from, run_to_end, output, config)?,

        Commands::Replay { input, edits, output } => replay(&input, &edits, output, config)?,

        Commands::Inspect { input } => inspect(&input)?,
    }

    Ok(())
}

fn load_rundown(path: &Path) -> Result<Rundown> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Rundown::from_json(&json).with_context(|| format!("Failed to parse rundown {}", path.display()))
}

fn resolve(
    input: &Path,
    from: Option<String>,
    run_to_end: bool,
    output: Option<PathBuf>,
    config: ResolverConfig,
) -> Result<()> {
    let rundown = load_rundown(input)?;
    info!(rundown = %rundown.id, lines = rundown.line_count(), "loaded rundown");

    let resolver = ContinuityResolver::new(config);
    let from: Option<LineId> = from.map(Into::into);
    let report = resolver
        .recompute(&rundown, from.as_ref(), Mode::from_run_to_end(run_to_end))
        .context("Failed to resolve rundown")?;
    println!(
        "Resolved {} lines ({} changed), table version {}",
        report.lines_visited, report.lines_changed, report.version
    );

    let table = resolver.snapshot();
    print_table(&rundown, &table);

    if let Some(output) = output {
        write_snapshot(&table, &output)?;
    }
    Ok(())
}

fn replay(input: &Path, edits: &Path, output: Option<PathBuf>, config: ResolverConfig) -> Result<()> {
    let rundown = load_rundown(input)?;
    let file = File::open(edits).with_context(|| format!("Failed to open {}", edits.display()))?;
    let edits: Vec<Edit> = serde_json::from_reader(BufReader::new(file)).context("Failed to parse edit script")?;

    let session = RundownSession::new(rundown, config).context("Failed to resolve rundown")?;
    println!("Replaying {} edits", edits.len());

    for (i, edit) in edits.into_iter().enumerate() {
        let label = format!("{edit:?}");
        match session.apply(edit) {
            Ok(report) => println!(
                "  [{}] ok: visited {}, changed {}, pruned {}{}",
                i,
                report.lines_visited,
                report.lines_changed,
                report.pruned,
                if report.converged_early { ", converged early" } else { "" }
            ),
            Err(err) => {
                warn!(%err, edit = %label, "edit rejected");
                println!("  [{}] rejected: {}", i, err);
            }
        }
    }

    let table = session.resolver().snapshot();
    session.with_rundown(|rundown| print_table(rundown, &table));

    if let Some(output) = output {
        write_snapshot(&table, &output)?;
    }
    Ok(())
}

fn inspect(input: &Path) -> Result<()> {
    let file = File::open(input).context("Failed to open snapshot file")?;
    let snapshot = Snapshot::read(BufReader::new(file)).context("Failed to read snapshot")?;

    println!("\n=== Snapshot Information ===");
    println!("Format version: {}", snapshot.header.version);
    println!("Table version: {}", snapshot.header.table_version);
    println!("Lines: {}", snapshot.header.num_lines);
    println!("Lines with an item in effect: {}", snapshot.active_lines());

    println!("\n=== Lines (first 10) ===");
    let ids = snapshot.table.line_ids();
    for id in ids.iter().take(10) {
        let Some(effects) = snapshot.table.line(id) else {
            continue;
        };
        println!("  {}", id);
        for (layer, effect) in effects.iter() {
            println!("    {:<24} {}", layer.as_str(), describe(effect));
        }
    }
    if ids.len() > 10 {
        println!("  ... and {} more lines", ids.len() - 10);
    }
    Ok(())
}

fn write_snapshot(table: &EffectiveTable, output: &Path) -> Result<()> {
    let file = File::create(output).context("Failed to create snapshot file")?;
    Snapshot::new(table.clone())
        .context("Failed to capture snapshot")?
        .write(BufWriter::new(file))
        .context("Failed to write snapshot")?;
    println!("Wrote snapshot to {}", output.display());
    Ok(())
}

fn print_table(rundown: &Rundown, table: &EffectiveTable) {
    println!("\n=== {} ===", if rundown.name.is_empty() { rundown.id.as_str() } else { rundown.name.as_str() });
    let mut current_segment = None;
    for (segment, line) in rundown.lines() {
        if current_segment != Some(&segment.id) {
            println!("[{}] {}", segment.id, segment.name);
            current_segment = Some(&segment.id);
        }
        println!("  {} {} ({} ms)", line.id, line.title, line.expected_duration_ms);
        for layer in &rundown.source_layers {
            let effect = table.effective(&line.id, &layer.id);
            println!("    {:<24} {}", layer.name, describe(effect));
        }
    }
}

fn describe(effect: Option<&EffectiveItem>) -> String {
    let Some(effect) = effect else {
        return "-".to_string();
    };
    let duration = match effect.window.duration_ms {
        Some(ms) => format!("{ms} ms"),
        None => "open".to_string(),
    };
    if effect.is_continuation {
        format!(
            "{} (continues from {}, +{} ms, {:?})",
            effect.origin, effect.origin_line, effect.window.elapsed_ms, effect.mode
        )
    } else {
        format!("{} ({}, {:?})", effect.origin, duration, effect.mode)
    }
}
