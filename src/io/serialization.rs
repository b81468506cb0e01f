// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project document serialization and deserialization.
//!
//! JSON is the on-disk format of the project document. YAML is offered as
//! an export for people who prefer reading it.

use crate::error::{Error, Result};
use crate::models::ProjectDocument;
use std::path::{Path, PathBuf};

/// Export the document to YAML format.
pub fn export_yaml(data: &ProjectDocument, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data).map_err(|source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, yaml.as_bytes())
}

/// Export the document to JSON format, replacing any existing file atomically.
pub fn export_json(data: &ProjectDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, json.as_bytes())
}

/// Import a document from YAML format.
pub fn import_yaml(path: &Path) -> Result<ProjectDocument> {
    let yaml = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_yaml::from_str(&yaml).map_err(|source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Import a document from JSON format.
pub fn import_json(path: &Path) -> Result<ProjectDocument> {
    let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&json).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    std::fs::write(&tmp, contents).map_err(|e| Error::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        Error::io(path, e)
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Color, Point};

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ultratrace-serialization-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample() -> ProjectDocument {
        let mut doc = ProjectDocument::new(PathBuf::from("/p"), "tongue", Color::RED);
        doc.traces["tongue"]
            .files
            .entry("00".to_string())
            .or_default()
            .insert(12, vec![Point::new(0.1, 0.2), Point::new(1.0 / 3.0, 0.7)]);
        doc
    }

    #[test]
    fn test_json_roundtrip_is_exact() {
        let dir = scratch("json");
        let path = dir.join("metadata.json");
        let doc = sample();

        export_json(&doc, &path).unwrap();
        assert_eq!(import_json(&path).unwrap(), doc);
        assert!(!temp_path(&path).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_json_uses_document_keys() {
        let dir = scratch("keys");
        let path = dir.join("metadata.json");
        export_json(&sample(), &path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["defaultTraceName"], "tongue");
        assert_eq!(raw["traces"]["tongue"]["color"], "#ff0000");
        assert_eq!(raw["traces"]["tongue"]["files"]["00"]["12"][0]["x"], 0.1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = scratch("yaml");
        let path = dir.join("metadata.yaml");
        let doc = sample();

        export_yaml(&doc, &path).unwrap();
        assert_eq!(import_yaml(&path).unwrap(), doc);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_json_reports_path() {
        let dir = scratch("malformed");
        let path = dir.join("metadata.json");
        std::fs::write(&path, "{ not json").unwrap();

        match import_json(&path) {
            Err(Error::Json { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected {:?}", other),
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
