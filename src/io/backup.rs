// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Document snapshots taken before destructive bulk edits.

use crate::error::{Error, Result};
use crate::io::serialization::{export_json, import_json};
use crate::models::ProjectDocument;
use std::fmt;
use std::path::{Path, PathBuf};

/// Handle to a stored snapshot. For [`BackupDir`] this is the file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupId(pub String);

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Somewhere to keep whole-document snapshots.
pub trait SnapshotSink {
    fn write_snapshot(&mut self, doc: &ProjectDocument) -> Result<BackupId>;
    fn restore_snapshot(&self, id: &BackupId) -> Result<ProjectDocument>;
}

/// Timestamped JSON files in a backups directory.
#[derive(Debug, Clone)]
pub struct BackupDir {
    dir: PathBuf,
}

impl BackupDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &BackupId) -> PathBuf {
        self.dir.join(format!("{}.json", id.0))
    }

    /// A fresh id from the local clock; repeated stamps get a numeric suffix.
    fn next_id(&self) -> BackupId {
        let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
        let base = format!("metadata-{}", stamp);
        let mut id = BackupId(base.clone());
        let mut n = 1;
        while self.path_for(&id).exists() {
            id = BackupId(format!("{}-{}", base, n));
            n += 1;
        }
        id
    }
}

impl SnapshotSink for BackupDir {
    fn write_snapshot(&mut self, doc: &ProjectDocument) -> Result<BackupId> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let id = self.next_id();
        export_json(doc, &self.path_for(&id))?;
        log::info!("Wrote backup {}", id);
        Ok(id)
    }

    fn restore_snapshot(&self, id: &BackupId) -> Result<ProjectDocument> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(Error::UnknownBackup(id.0.clone()));
        }
        import_json(&path)
    }
}

/// Snapshots held in memory, for embedding without a backups directory.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshots {
    snapshots: Vec<ProjectDocument>,
}

impl MemorySnapshots {
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotSink for MemorySnapshots {
    fn write_snapshot(&mut self, doc: &ProjectDocument) -> Result<BackupId> {
        self.snapshots.push(doc.clone());
        Ok(BackupId(format!("snapshot-{}", self.snapshots.len() - 1)))
    }

    fn restore_snapshot(&self, id: &BackupId) -> Result<ProjectDocument> {
        id.0.strip_prefix("snapshot-")
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| self.snapshots.get(n))
            .cloned()
            .ok_or_else(|| Error::UnknownBackup(id.0.clone()))
    }
}
