use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Snapshot of a target file taken right before a rewrite.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BackupData {
    pub id: String,
    pub target: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Names of the passes whose output replaced this content.
    pub passes: Vec<String>,
    pub original_content: String,
}

impl BackupData {
    pub fn new(target: &Path, passes: Vec<String>, original_content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target: target.to_path_buf(),
            created_at: Utc::now(),
            passes,
            original_content,
        }
    }
}

pub trait StorageProvider {
    fn store_backup(&mut self, file_path: &str, backup_data: BackupData) -> Result<()>;
    /// Removes and returns the newest backup for `file_path`.
    fn restore_backup(&mut self, file_path: &str) -> Result<Option<BackupData>>;
    fn list_backups(&self, file_path: &str) -> Result<Vec<BackupData>>;
    fn cleanup(&mut self) -> Result<()>;
}

/// Writes `content` to `path` without ever leaving a half-written file.
///
/// The data goes to a temp file in the same directory, is flushed to disk,
/// and is then renamed over `path`. Permissions of an existing file are kept.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file next to {}", path.display()))?;
    temp.write_all(content.as_bytes())
        .context("Failed to write temp file")?;
    temp.as_file().sync_all().context("Failed to flush temp file")?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .context("Failed to copy file permissions")?;
    }

    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Keeps every backup as its own JSON file so several runs can be undone
/// one after another.
pub struct FileStorage {
    backup_dir: PathBuf,
}

impl FileStorage {
    pub fn new(backup_dir: PathBuf) -> Result<Self> {
        if !backup_dir.exists() {
            fs::create_dir_all(&backup_dir).context("Failed to create backup directory")?;
        }
        Ok(Self { backup_dir })
    }

    /// Percent-encodes the characters that cannot appear in a file name or
    /// that the name format uses, so distinct keys never share a prefix.
    fn safe_name(file_path: &str) -> String {
        let mut name = String::with_capacity(file_path.len());
        for c in file_path.chars() {
            match c {
                '%' | '/' | '\\' | ':' | '@' => name.push_str(&format!("%{:02X}", c as u32)),
                _ => name.push(c),
            }
        }
        name
    }

    fn get_backup_path(&self, file_path: &str, backup_data: &BackupData) -> PathBuf {
        // Timestamp first so that name order is creation order.
        let stamp = backup_data.created_at.format("%Y%m%dT%H%M%S%.6f");
        let short_id = backup_data.id.get(..8).unwrap_or(&backup_data.id);
        self.backup_dir.join(format!(
            "{}@{stamp}-{short_id}.backup.json",
            Self::safe_name(file_path)
        ))
    }

    /// Backup files for `file_path`, oldest first.
    fn backup_files(&self, file_path: &str) -> Result<Vec<PathBuf>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}@", Self::safe_name(file_path));
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.backup_dir).context("Failed to read backup directory")? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(&prefix) && name.ends_with(".backup.json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_backup(path: &Path) -> Result<BackupData> {
        let content = fs::read_to_string(path).context("Failed to read backup file")?;
        serde_json::from_str(&content).context("Failed to deserialize backup data")
    }
}

impl StorageProvider for FileStorage {
    fn store_backup(&mut self, file_path: &str, backup_data: BackupData) -> Result<()> {
        let backup_path = self.get_backup_path(file_path, &backup_data);
        let serialized =
            serde_json::to_string_pretty(&backup_data).context("Failed to serialize backup data")?;
        write_atomic(&backup_path, &serialized).context("Failed to write backup file")?;
        tracing::debug!("Stored backup {}", backup_path.display());
        Ok(())
    }

    fn restore_backup(&mut self, file_path: &str) -> Result<Option<BackupData>> {
        let Some(latest) = self.backup_files(file_path)?.pop() else {
            return Ok(None);
        };
        let backup_data = Self::read_backup(&latest)?;

        // The backup is consumed so the next restore goes one step further back.
        fs::remove_file(&latest).context("Failed to remove backup file after restore")?;
        Ok(Some(backup_data))
    }

    fn list_backups(&self, file_path: &str) -> Result<Vec<BackupData>> {
        self.backup_files(file_path)?
            .iter()
            .map(|path| Self::read_backup(path))
            .collect()
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.backup_dir.exists() {
            fs::remove_dir_all(&self.backup_dir)
                .context("Failed to remove backup directory during cleanup")?;
        }
        Ok(())
    }
}

/// Holds backups for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryStorage {
    backups: HashMap<String, Vec<BackupData>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageProvider for MemoryStorage {
    fn store_backup(&mut self, file_path: &str, backup_data: BackupData) -> Result<()> {
        self.backups
            .entry(file_path.to_string())
            .or_default()
            .push(backup_data);
        Ok(())
    }

    fn restore_backup(&mut self, file_path: &str) -> Result<Option<BackupData>> {
        Ok(self.backups.get_mut(file_path).and_then(Vec::pop))
    }

    fn list_backups(&self, file_path: &str) -> Result<Vec<BackupData>> {
        Ok(self.backups.get(file_path).cloned().unwrap_or_default())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.backups.clear();
        Ok(())
    }
}

/// Used when backups are turned off.
pub struct NoStorage;

impl StorageProvider for NoStorage {
    fn store_backup(&mut self, _file_path: &str, _backup_data: BackupData) -> Result<()> {
        Ok(())
    }

    fn restore_backup(&mut self, _file_path: &str) -> Result<Option<BackupData>> {
        Ok(None)
    }

    fn list_backups(&self, _file_path: &str) -> Result<Vec<BackupData>> {
        Ok(Vec::new())
    }

    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}
