// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project document.
//!
//! The persisted aggregate: project root, traces with their per-file,
//! per-frame point lists, and the ordered chain of file bundles. This is the
//! single on-disk source of truth; the annotation store and bundle catalog
//! are views derived from it and written back to it.

use super::annotation::Point;
use super::bundle::FileBundle;
use super::color::Color;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-trace record: display color and file -> frame -> points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub color: Color,
    #[serde(default)]
    pub files: BTreeMap<String, BTreeMap<u32, Vec<Point>>>,
}

impl TraceRecord {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            files: BTreeMap::new(),
        }
    }

    /// Points recorded for one (file, frame) slice; empty when untraced.
    pub fn points(&self, file: &str, frame: u32) -> &[Point] {
        self.files
            .get(file)
            .and_then(|frames| frames.get(&frame))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Complete project data for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(alias = "firstrun_path")]
    pub path: PathBuf,
    #[serde(rename = "defaultTraceName")]
    pub default_trace_name: String,
    /// Traces in registration order.
    pub traces: IndexMap<String, TraceRecord>,
    /// Bundles sorted by name with consistent `_prev`/`_next` links.
    pub files: Vec<FileBundle>,
}

impl ProjectDocument {
    /// Create a document holding only the default trace.
    pub fn new(path: PathBuf, default_trace_name: &str, color: Color) -> Self {
        let mut traces = IndexMap::new();
        traces.insert(default_trace_name.to_string(), TraceRecord::new(color));
        Self {
            path,
            default_trace_name: default_trace_name.to_string(),
            traces,
            files: Vec::new(),
        }
    }

    /// Bundle names in chain order.
    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }
}
