// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project discovery and the on-disk project document.
//!
//! [`scan`] walks a project directory and groups companion files into
//! [`FileBundle`]s without touching anything on disk. [`Catalog::load`]
//! reads the project document, or builds and writes a fresh one from a
//! scan when the project is opened for the first time.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::io::backup::{BackupDir, BackupId, SnapshotSink};
use crate::io::legacy::{self, MEASUREMENT_EXTENSION};
use crate::io::media::ProcessedFrames;
use crate::io::serialization::{export_json, import_json};
use crate::models::bundle::link_chain;
use crate::models::{FileBundle, ProjectDocument};
use crate::store::AnnotationStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Companion extensions recognized without configuration.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".wav", ".flac", ".dicom", ".TextGrid", "US.txt", ".txt", ".dat", ".ult",
];

/// Marker in the name of directories holding pre-extracted frames.
const FRAME_CACHE_MARKER: &str = "_dicom_to_png";

/// What a single file contributes to the project.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Found {
    Companion { bundle: String, key: String },
    Frame { bundle: String, frame: u32 },
    Measurement,
    Ignored,
}

#[derive(Debug, Default)]
struct Discovery {
    bundles: BTreeMap<String, FileBundle>,
    measurements: Vec<PathBuf>,
}

/// Decide what `file_name`, found in directory `dir` (relative to the
/// project root), is.
fn classify(file_name: &str, dir: &Path, extra: &[String]) -> Found {
    let Some((stem, ext)) = file_name.rfind('.').map(|i| file_name.split_at(i)) else {
        return Found::Ignored;
    };

    match ext {
        ".png" => {
            if !dir.to_string_lossy().contains(FRAME_CACHE_MARKER) {
                return Found::Ignored;
            }
            match stem.split_once("_frame_") {
                Some((bundle, frame)) if !bundle.is_empty() => match frame.parse() {
                    Ok(frame) => Found::Frame {
                        bundle: bundle.to_string(),
                        frame,
                    },
                    Err(_) => Found::Ignored,
                },
                _ => Found::Ignored,
            }
        }
        ".txt" if stem.len() > 2 && stem.ends_with("US") => Found::Companion {
            bundle: stem[..stem.len() - 2].to_string(),
            key: "US.txt".to_string(),
        },
        ".wav" if stem.ends_with("_Track1") => Found::Ignored,
        ".wav" if stem.ends_with("_Track0") => Found::Companion {
            bundle: stem[..stem.len() - "_Track0".len()].to_string(),
            key: ext.to_string(),
        },
        // spline exports need ULT frame timing to place; not imported
        ".dat" if stem == "SPLINES" => Found::Ignored,
        _ if ext.strip_prefix('.') == Some(MEASUREMENT_EXTENSION) => Found::Measurement,
        _ if stem.is_empty() => Found::Ignored,
        _ if SUPPORTED_EXTENSIONS.contains(&ext) || extra.iter().any(|e| e == ext) => {
            Found::Companion {
                bundle: stem.to_string(),
                key: ext.to_string(),
            }
        }
        _ => Found::Ignored,
    }
}

fn walk(
    root: &Path,
    dir: &Path,
    settings: &Settings,
    extra: &[String],
    found: &mut Discovery,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| Error::io(dir, e))?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .collect();
    entries.sort();

    let relative_dir = dir.strip_prefix(root).unwrap_or(dir);
    for path in entries {
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            log::warn!("Skipping non UTF-8 name {}", path.display());
            continue;
        };

        if path.is_dir() {
            if settings.exclude_dirs.iter().any(|d| d == file_name) {
                log::debug!("Not descending into {}", path.display());
                continue;
            }
            if let Err(e) = walk(root, &path, settings, extra, found) {
                log::warn!("Skipping {}: {}", path.display(), e);
            }
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        match classify(file_name, relative_dir, extra) {
            Found::Companion { bundle, key } => {
                found
                    .bundles
                    .entry(bundle.clone())
                    .or_insert_with(|| FileBundle::new(&bundle))
                    .companions
                    .insert(key, Some(relative));
            }
            Found::Frame { bundle, frame } => {
                found
                    .bundles
                    .entry(bundle.clone())
                    .or_insert_with(|| FileBundle::new(&bundle))
                    .set_processed(frame, relative);
            }
            Found::Measurement => found.measurements.push(path),
            Found::Ignored => {}
        }
    }
    Ok(())
}

fn discover(root: &Path, settings: &Settings) -> Result<Discovery> {
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }
    let extra: Vec<String> = settings
        .extra_extensions
        .iter()
        .map(|e| {
            if e.starts_with('.') {
                e.clone()
            } else {
                format!(".{}", e)
            }
        })
        .collect();

    let mut found = Discovery::default();
    walk(root, root, settings, &extra, &mut found)?;
    if found.bundles.is_empty() {
        return Err(Error::NoSupportedFiles(root.to_path_buf()));
    }
    Ok(found)
}

/// Group the files under `root` into bundles, sorted by name and linked.
///
/// Fails with [`Error::NoSupportedFiles`] when nothing recognizable is found.
pub fn scan(root: &Path, settings: &Settings) -> Result<Vec<FileBundle>> {
    let mut bundles: Vec<FileBundle> = discover(root, settings)?.bundles.into_values().collect();
    link_chain(&mut bundles);
    Ok(bundles)
}

/// The bundles of an open project and the location of its document.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    document_path: PathBuf,
    backup_dir: PathBuf,
    bundles: Vec<FileBundle>,
}

impl Catalog {
    /// Open the project at `root`, reading its document or creating it.
    pub fn load(root: &Path, settings: &Settings) -> Result<(Self, ProjectDocument)> {
        if !root.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }
        let root = root.canonicalize().map_err(|e| Error::io(root, e))?;
        let document_path = root.join(&settings.document_name);

        let mut doc = if document_path.is_file() {
            let mut doc = import_json(&document_path)?;
            if doc.path != root {
                log::info!(
                    "Project moved from {} to {}",
                    doc.path.display(),
                    root.display()
                );
                doc.path = root.clone();
            }
            log::info!(
                "Loaded {} ({} files, {} traces)",
                document_path.display(),
                doc.files.len(),
                doc.traces.len()
            );
            doc
        } else {
            let found = discover(&root, settings)?;
            let mut doc = ProjectDocument::new(
                root.clone(),
                &settings.default_trace_name,
                settings.default_trace_color,
            );
            doc.files = found.bundles.into_values().collect();
            for path in &found.measurements {
                match legacy::read_measurement(path) {
                    Ok(Some(measurement)) => measurement.apply(&mut doc),
                    Ok(None) => {}
                    Err(e) => log::warn!("Cannot import {}: {}", path.display(), e),
                }
            }
            log::info!(
                "Discovered {} files under {}",
                doc.files.len(),
                root.display()
            );
            doc
        };
        link_chain(&mut doc.files);
        export_json(&doc, &document_path)?;

        let catalog = Self {
            backup_dir: root.join(&settings.state_dir).join("backups"),
            bundles: doc.files.clone(),
            document_path,
            root,
        };
        Ok((catalog, doc))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Backups directory for this project.
    pub fn backups(&self) -> BackupDir {
        BackupDir::new(&self.backup_dir)
    }

    pub fn bundles(&self) -> &[FileBundle] {
        &self.bundles
    }

    pub fn bundle(&self, name: &str) -> Option<&FileBundle> {
        self.bundles.iter().find(|b| b.name == name)
    }

    pub fn next(&self, name: &str) -> Option<&FileBundle> {
        let next = self.bundle(name)?.next.as_deref()?;
        self.bundle(next)
    }

    pub fn previous(&self, name: &str) -> Option<&FileBundle> {
        let prev = self.bundle(name)?.prev.as_deref()?;
        self.bundle(prev)
    }

    /// Record a cached frame image for a bundle. Returns `false` for an
    /// unknown bundle. The caller persists the change with [`Catalog::write`].
    pub fn add_processed(&mut self, name: &str, frame: u32, path: PathBuf) -> bool {
        match self.bundles.iter_mut().find(|b| b.name == name) {
            Some(bundle) => {
                bundle.set_processed(frame, path);
                true
            }
            None => false,
        }
    }

    /// Frame images for a bundle, if it has a frame cache.
    pub fn image_source(&self, name: &str) -> Option<ProcessedFrames> {
        ProcessedFrames::for_bundle(&self.root, self.bundle(name)?)
    }

    /// The document for the store's current state.
    pub fn document(&self, store: &AnnotationStore) -> ProjectDocument {
        store.to_document(&self.root, &self.bundles)
    }

    /// Write the whole document.
    pub fn write(&self, store: &AnnotationStore) -> Result<()> {
        export_json(&self.document(store), &self.document_path)?;
        log::debug!("Wrote {}", self.document_path.display());
        Ok(())
    }

    /// Snapshot the document as it is on disk.
    pub fn write_backup(&self, sink: &mut dyn SnapshotSink) -> Result<BackupId> {
        let doc = import_json(&self.document_path)?;
        sink.write_snapshot(&doc)
    }
}
