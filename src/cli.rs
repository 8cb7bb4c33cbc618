use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::api::DiaryBackend;
use crate::auth::UserStore;
use crate::models::{Entry, EntryDraft};

pub const BACKUP_PREFIX: &str = "emotional_diary_backup_";
pub const BACKUPS_KEPT: usize = 5;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Emotional diary web client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the web client (default)
    Serve,
    /// Write the signed-in user's entries to a timestamped backup file
    Backup {
        /// Directory to write into, defaults to BACKUP_DIR
        dir: Option<PathBuf>,
    },
    /// Re-create entries from a backup file
    Restore {
        /// Backup to read, defaults to the newest one in BACKUP_DIR
        file: Option<PathBuf>,
    },
}

impl Cli {
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[derive(Serialize, Deserialize)]
pub struct Backup {
    pub created_at: String,
    pub user_id: String,
    pub entries: Vec<Entry>,
}

// Restore also takes a bare array or an export file.
#[derive(Deserialize)]
#[serde(untagged)]
enum BackupFile {
    Wrapped { entries: Vec<Entry> },
    Bare(Vec<Entry>),
}

pub fn backup_file_name(now: NaiveDateTime) -> String {
    format!("{BACKUP_PREFIX}{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Backup files in `dir`, oldest first. The timestamped names sort
/// chronologically.
pub fn list_backups(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(BACKUP_PREFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Delete all but the `keep` newest backups; returns what was removed.
pub fn prune_backups(dir: &Path, keep: usize) -> std::io::Result<Vec<PathBuf>> {
    let files = list_backups(dir)?;
    let excess = files.len().saturating_sub(keep);
    let mut removed = Vec::with_capacity(excess);
    for old in files.into_iter().take(excess) {
        fs::remove_file(&old)?;
        removed.push(old);
    }
    Ok(removed)
}

pub fn parse_backup(content: &str) -> Result<Vec<Entry>, serde_json::Error> {
    Ok(match serde_json::from_str(content)? {
        BackupFile::Wrapped { entries } => entries,
        BackupFile::Bare(entries) => entries,
    })
}

/// Fetch the signed-in user's entries and write them to a new backup file.
pub async fn create_backup(
    backend: &dyn DiaryBackend,
    users: &UserStore,
    dir: &Path,
) -> CliResult<PathBuf> {
    let user = users
        .load()
        .await
        .ok_or("no signed-in user; log in through the web app first")?;

    let entries = backend.list_entries(&user).await?;
    fs::create_dir_all(dir)?;

    let now = chrono::Local::now();
    let path = dir.join(backup_file_name(now.naive_local()));
    let backup = Backup {
        created_at: now.to_rfc3339(),
        user_id: user.user_id,
        entries,
    };
    fs::write(&path, serde_json::to_string_pretty(&backup)?)?;
    tracing::info!(path = %path.display(), entries = backup.entries.len(), "backup written");

    for old in prune_backups(dir, BACKUPS_KEPT)? {
        tracing::info!(path = %old.display(), "removed old backup");
    }
    Ok(path)
}

/// Re-create every entry of a backup. Without a file the newest backup in
/// `dir` is used. Returns how many entries were created.
pub async fn restore_backup(
    backend: &dyn DiaryBackend,
    users: &UserStore,
    file: Option<&Path>,
    dir: &Path,
) -> CliResult<usize> {
    let user = users
        .load()
        .await
        .ok_or("no signed-in user; log in through the web app first")?;

    let path = match file {
        Some(file) => file.to_path_buf(),
        None => list_backups(dir)?
            .pop()
            .ok_or_else(|| format!("no backup files found in {}", dir.display()))?,
    };

    let entries = parse_backup(&fs::read_to_string(&path)?)?;
    let mut restored = 0;
    for entry in &entries {
        let draft = EntryDraft::from_entry(entry, &user.user_id);
        match backend.create_entry(&user, &draft).await {
            Ok(_) => restored += 1,
            Err(e) => tracing::warn!(date = %entry.date, "Failed to restore entry: {e}"),
        }
    }
    tracing::info!(path = %path.display(), restored, total = entries.len(), "restore finished");
    Ok(restored)
}
