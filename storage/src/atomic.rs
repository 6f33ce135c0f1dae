// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file store.
//!
//! `readJson`/`saveJson`/`appendJsonl`/`computeChecksum` from the
//! specification, backed by `fs4` advisory locks on a sidecar `<file>.lock`
//! handle and temp-file-then-rename writes so a crash mid-write never
//! leaves a torn file on disk.

use cleo_core::error::{CleoError, Result};
use fs4::FileExt;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::jsonl;

fn lock_sidecar(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".lock");
    PathBuf::from(s)
}

/// In-process reentrancy tracking over the cross-process `fs4` flock: the
/// same `(path, owner)` pair may "acquire" a lock it already holds without
/// blocking on itself.
#[derive(Default)]
pub struct LockTable {
    held: Mutex<HashMap<(PathBuf, String), (usize, Option<File>)>>,
}

pub struct LockGuard<'a> {
    table: &'a LockTable,
    key: (PathBuf, String),
}

impl LockTable {
    pub fn acquire(&self, path: &Path, owner: &str) -> Result<LockGuard<'_>> {
        let key = (path.to_path_buf(), owner.to_string());
        let mut held = self.held.lock().expect("lock table poisoned");
        if let Some(entry) = held.get_mut(&key) {
            entry.0 += 1;
            return Ok(LockGuard { table: self, key });
        }

        let lock_path = lock_sidecar(path);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CleoError::LockFailed(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| CleoError::LockFailed(e.to_string()))?;
        file.lock_exclusive()
            .map_err(|e| CleoError::LockFailed(format!("{path:?}: {e}")))?;

        held.insert(key.clone(), (1, Some(file)));
        Ok(LockGuard { table: self, key })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.table.held.lock().expect("lock table poisoned");
        if let Some(entry) = held.get_mut(&self.key) {
            entry.0 -= 1;
            if entry.0 == 0 {
                if let Some(file) = entry.1.take() {
                    let _ = FileExt::unlock(&file);
                }
                held.remove(&self.key);
            }
        }
    }
}

/// First 16 hex characters of SHA-256 over `value`'s canonical JSON form.
pub fn compute_checksum(value: &Value) -> String {
    let canonical = serde_json::to_string(value).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// `readJson`: `None` if the file doesn't exist, `VALIDATION_ERROR` on
/// malformed JSON.
pub fn read_json(path: &Path) -> Result<Option<Value>> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let value = serde_json::from_str(&content)
                .map_err(|e| CleoError::Validation(format!("{path:?}: malformed JSON: {e}")))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CleoError::Internal(format!("{path:?}: {e}"))),
    }
}

pub fn read_json_required(path: &Path) -> Result<Value> {
    read_json(path)?.ok_or_else(|| CleoError::not_found(path.display()))
}

/// Caller-supplied validation hook run under the lock before any bytes hit
/// disk.
pub type Validator = dyn Fn(&Value) -> Result<()>;

/// Options accepted by [`save_json`].
pub struct SaveOptions<'a> {
    pub backup_dir: Option<&'a Path>,
    pub backup_retention: usize,
    pub validate: Option<&'a Validator>,
}

impl Default for SaveOptions<'_> {
    fn default() -> Self {
        Self { backup_dir: None, backup_retention: 10, validate: None }
    }
}

/// `saveJson`: lock → validate → backup → atomic temp-file-then-rename →
/// unlock.
pub fn save_json(lock_table: &LockTable, owner: &str, path: &Path, value: &Value, opts: &SaveOptions<'_>) -> Result<()> {
    let _guard = lock_table.acquire(path, owner)?;

    if let Some(validate) = opts.validate {
        validate(value)?;
    }

    if let Some(backup_dir) = opts.backup_dir {
        if path.exists() {
            backup_existing(path, backup_dir, opts.backup_retention)?;
        }
    }

    write_atomically(path, &serde_json::to_string_pretty(value).map_err(|e| CleoError::Internal(e.to_string()))?)
}

fn backup_existing(path: &Path, backup_dir: &Path, retention: usize) -> Result<()> {
    fs::create_dir_all(backup_dir).map_err(|e| CleoError::Internal(e.to_string()))?;
    let stem = path.file_name().and_then(|n| n.to_str()).unwrap_or("state");
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.fZ");
    let dest = backup_dir.join(format!("{stem}.{stamp}.bak"));
    fs::copy(path, &dest).map_err(|e| CleoError::Internal(e.to_string()))?;

    let mut backups: Vec<_> = fs::read_dir(backup_dir)
        .map_err(|e| CleoError::Internal(e.to_string()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(stem))
        .collect();
    backups.sort_by_key(|e| e.file_name());
    while backups.len() > retention {
        let oldest = backups.remove(0);
        let _ = fs::remove_file(oldest.path());
    }
    Ok(())
}

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| CleoError::Internal(e.to_string()))?;

    let tmp_path = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("state"),
        std::process::id()
    ));
    {
        let mut tmp = File::create(&tmp_path).map_err(|e| CleoError::Internal(e.to_string()))?;
        use std::io::Write;
        tmp.write_all(content.as_bytes()).map_err(|e| CleoError::Internal(e.to_string()))?;
        tmp.sync_all().map_err(|e| CleoError::Internal(e.to_string()))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| CleoError::Internal(e.to_string()))?;
    Ok(())
}

/// `appendJsonl`: reads the existing (tolerantly-parsed) log, appends
/// `entry`, and rewrites the whole file via the same atomic rename so the
/// log is always a prefix of some previously valid file.
pub fn append_jsonl(lock_table: &LockTable, owner: &str, path: &Path, entry: &Value) -> Result<()> {
    let _guard = lock_table.acquire(path, owner)?;

    let existing = match fs::read_to_string(path) {
        Ok(content) => jsonl::read_log_entries(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(CleoError::Internal(e.to_string())),
    };

    let mut entries = existing;
    entries.push(entry.clone());
    write_atomically(path, &jsonl::render_jsonl(&entries))
}

/// `readLogEntries`: tolerant read of the audit log's three historic
/// shapes.
pub fn read_log_entries(path: &Path) -> Result<Vec<Value>> {
    match fs::read_to_string(path) {
        Ok(content) => jsonl::read_log_entries(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(CleoError::Internal(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn checksum_is_sixteen_hex_chars() {
        let checksum = compute_checksum(&json!({"a": 1}));
        assert_eq!(checksum.len(), 16);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn save_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todo.json");
        let table = LockTable::default();
        let value = json!({"tasks": {}});
        save_json(&table, "owner", &path, &value, &SaveOptions::default()).unwrap();
        assert_eq!(read_json(&path).unwrap(), Some(value));
    }

    #[test]
    fn save_json_aborts_when_validator_rejects() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todo.json");
        let table = LockTable::default();
        let validate: &Validator = &|_v| Err(CleoError::validation("nope"));
        let opts = SaveOptions { validate: Some(validate), ..Default::default() };
        let err = save_json(&table, "owner", &path, &json!({}), &opts).unwrap_err();
        assert!(err.is_validation());
        assert!(!path.exists());
    }

    #[test]
    fn append_jsonl_accumulates_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todo-log.jsonl");
        let table = LockTable::default();
        append_jsonl(&table, "owner", &path, &json!({"op": "a"})).unwrap();
        append_jsonl(&table, "owner", &path, &json!({"op": "b"})).unwrap();
        let entries = read_log_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn reentrant_lock_on_same_owner_does_not_deadlock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todo.json");
        let table = LockTable::default();
        let _outer = table.acquire(&path, "owner").unwrap();
        let _inner = table.acquire(&path, "owner").unwrap();
    }
}
