// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Engine settings.
//!
//! All tunable constants live here. Settings can be read from YAML or JSON;
//! any key left out falls back to its default.

use crate::error::{Error, Result};
use crate::models::Color;
use crate::util::geometry::DEFAULT_ZOOM_DELTA;
use crate::util::hit_test::TieBreak;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
    pub min_zoom: i32,
    pub max_zoom: i32,
    /// Scale multiplier applied per zoom step.
    pub zoom_delta: f64,
    /// Hit-test radius in screen units.
    pub select_radius: f64,
    /// Natural image size used until a frame is shown.
    pub natural_size: (f64, f64),
    pub default_trace_name: String,
    pub default_trace_color: Color,
    /// File name of the project document inside the project root.
    pub document_name: String,
    /// Directory (inside the project root) holding backups.
    pub state_dir: String,
    pub exclude_dirs: Vec<String>,
    /// Custom companion extensions recognized in addition to the built-in ones.
    pub extra_extensions: Vec<String>,
    pub tie_break: TieBreak,
    /// Maximum undo depth; unbounded when absent.
    pub history_limit: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_zoom: -5,
            max_zoom: 5,
            zoom_delta: DEFAULT_ZOOM_DELTA,
            select_radius: 12.0,
            natural_size: (800.0, 600.0),
            default_trace_name: "tongue".to_string(),
            default_trace_color: Color::RED,
            document_name: "metadata.json".to_string(),
            state_dir: ".ultratrace".to_string(),
            exclude_dirs: [".git", "node_modules", "__pycache__", ".ultratrace"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extra_extensions: Vec::new(),
            tie_break: TieBreak::LowestId,
            history_limit: None,
        }
    }
}

impl Settings {
    /// Load settings from a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let extension = path.extension().and_then(|s| s.to_str());
        let settings = match extension {
            Some("json") => serde_json::from_str(&text).map_err(|source| Error::Json {
                path: path.to_path_buf(),
                source,
            })?,
            _ => serde_yaml::from_str(&text).map_err(|source| Error::Yaml {
                path: path.to_path_buf(),
                source,
            })?,
        };
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
