use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hostpatch_core::backup::BackupOutcome;
use hostpatch_core::inspect::{inspect, InspectReport, DEFAULT_NEEDLES};
use hostpatch_core::{restore_asset, PatchConfig, PatchReport, Patcher, RestoreConfig};
use hostpatch_store_unity::UnityAssetStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hostpatch",
    version,
    about = "Point configuration endpoints embedded in Unity asset files at a new host"
)]
struct Cli {
    /// Log filter, e.g. "info" or "hostpatch_core=debug".
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Back up the asset file, then rewrite endpoint hosts in place.
    Patch {
        /// Path to the asset file (e.g. resources.assets).
        #[arg(long)]
        asset: PathBuf,
        /// Backup location; defaults to `<asset>.bak`.
        #[arg(long)]
        backup: Option<PathBuf>,
        /// Replacement hostname or IP address, without scheme or port.
        #[arg(long)]
        host: String,
        /// Overwrite an existing backup.
        #[arg(long)]
        force_backup: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Copy the backup back over the asset file.
    Restore {
        #[arg(long)]
        asset: PathBuf,
        /// Backup location; defaults to `<asset>.bak`.
        #[arg(long)]
        backup: Option<PathBuf>,
    },
    /// List object kinds and payload entries matching needles or config markers.
    Inspect {
        #[arg(long)]
        asset: PathBuf,
        /// String to search for in payloads (repeatable); a built-in list is used when omitted.
        #[arg(long = "needle")]
        needles: Vec<String>,
        /// Write each matching payload to this directory.
        #[arg(long)]
        dump_dir: Option<PathBuf>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn cmd_patch(asset: &Path, backup: Option<&Path>, host: &str, force_backup: bool, json: bool) -> Result<()> {
    let config = PatchConfig::new(asset, host)
        .with_backup(backup.map(Path::to_path_buf))
        .with_force_backup(force_backup);
    let report = Patcher::new(UnityAssetStore)
        .patch(&config)
        .with_context(|| format!("failed to patch {}", asset.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_patch_report(&report);
    }
    Ok(())
}

fn print_patch_report(report: &PatchReport) {
    match report.backup {
        BackupOutcome::Created => println!("Backup written: {}", report.backup_path.display()),
        BackupOutcome::Reused => println!("Backup exists: {}", report.backup_path.display()),
    }
    for entry in &report.patched_entries {
        println!("  {} [{}]: {} field(s)", entry.name, entry.schema, entry.changed_fields);
    }
    println!("Patched: {}", report.asset.display());
    println!("Updated fields: {}", report.stats.total_changed_fields);
}

fn cmd_restore(asset: &Path, backup: Option<&Path>) -> Result<()> {
    let config = RestoreConfig::new(asset).with_backup(backup.map(Path::to_path_buf));
    restore_asset(&config).with_context(|| format!("failed to restore {}", asset.display()))?;
    println!("Restored: {}", asset.display());
    Ok(())
}

fn cmd_inspect(asset: &Path, needles: &[String], dump_dir: Option<&Path>, json: bool) -> Result<()> {
    let needles: Vec<String> = if needles.is_empty() {
        DEFAULT_NEEDLES.iter().map(|s| s.to_string()).collect()
    } else {
        needles.to_vec()
    };
    let report = inspect(&UnityAssetStore, asset, &needles, dump_dir)
        .with_context(|| format!("failed to inspect {}", asset.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_inspect_report(&report);
    }
    Ok(())
}

fn print_inspect_report(report: &InspectReport) {
    println!("== {} ==", report.asset.display());
    println!("top kinds:");
    for kc in report.kind_counts.iter().take(20) {
        println!("{:8} {}", kc.count, kc.kind);
    }
    println!("TextAsset entries: {}", report.entries_scanned);
    for hit in &report.hits {
        let schema = hit.schema.map_or("-".to_string(), |s| s.to_string());
        println!(
            "HIT name='{}' id={} size={} schema={} needles={:?}",
            hit.name, hit.id, hit.size, schema, hit.needles
        );
        if let Some(path) = &hit.dump_path {
            println!("    dumped to {}", path.display());
        }
    }
    if report.hits.is_empty() {
        println!("No matching entries.");
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Patch {
            asset,
            backup,
            host,
            force_backup,
            json,
        } => cmd_patch(asset, backup.as_deref(), host, *force_backup, *json),
        Command::Restore { asset, backup } => cmd_restore(asset, backup.as_deref()),
        Command::Inspect {
            asset,
            needles,
            dump_dir,
            json,
        } => cmd_inspect(asset, needles, dump_dir.as_deref(), *json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
