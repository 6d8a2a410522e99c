use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use seo_core::backup::BackupManager;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum BackupsSubcommand {
    /// List backups, newest first
    List,

    /// Write a backup back to its original location
    Restore {
        /// Backup file name (inside the backup directory) or path
        backup: PathBuf,
        /// Restore to this path instead of the recorded original
        #[arg(long)]
        to: Option<PathBuf>,
    },

    /// Delete backups older than the retention period
    Prune {
        /// Age in days (default: backup.retention_days from config)
        #[arg(long)]
        days: Option<u32>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: BackupsSubcommand, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let manager = BackupManager::new(config.backup.resolve_dir(root));

    match subcmd {
        BackupsSubcommand::List => list(&manager, json),
        BackupsSubcommand::Restore { backup, to } => restore(&manager, &backup, to.as_deref(), json),
        BackupsSubcommand::Prune { days } => {
            prune(&manager, days.unwrap_or(config.backup.retention_days), json)
        }
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(manager: &BackupManager, json: bool) -> anyhow::Result<()> {
    let entries = manager.list().context("failed to list backups")?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No backups in {}.", manager.dir().display());
        return Ok(());
    }
    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                e.created.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.size.to_string(),
                e.original
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    print_table(&["BACKUP", "CREATED", "BYTES", "ORIGINAL"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// restore
// ---------------------------------------------------------------------------

fn restore(
    manager: &BackupManager,
    backup: &Path,
    to: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let backup = if backup.is_file() {
        backup.to_path_buf()
    } else {
        manager.dir().join(backup)
    };
    let target = manager
        .restore(&backup, to)
        .with_context(|| format!("failed to restore {}", backup.display()))?;

    if json {
        print_json(&serde_json::json!({
            "backup": backup,
            "restored_to": target,
        }))
    } else {
        println!("Restored {} -> {}", backup.display(), target.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// prune
// ---------------------------------------------------------------------------

fn prune(manager: &BackupManager, days: u32, json: bool) -> anyhow::Result<()> {
    let max_age = Duration::from_secs(u64::from(days) * 24 * 60 * 60);
    let removed = manager.prune(max_age).context("failed to prune backups")?;
    if json {
        print_json(&serde_json::json!({ "removed": removed, "days": days }))
    } else {
        println!("Removed {removed} backup(s) older than {days} day(s).");
        Ok(())
    }
}
