// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Import of `.measurement` files left behind by older tracing tools.
//!
//! A measurement file is named `<bundle>_<frame>.measurement` and holds a
//! JSON object; the member carrying both `type` and `points` is the trace,
//! with points in pixels on an 800x600 canvas at 1x zoom and no pan.

use crate::error::{Error, Result};
use crate::models::{Color, Point, ProjectDocument, TraceRecord};
use crate::util::geometry::normalize_coordinates;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const MEASUREMENT_EXTENSION: &str = "measurement";

/// Canvas size the legacy tools traced on.
const LEGACY_CANVAS: (f64, f64) = (800.0, 600.0);

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub bundle: String,
    pub frame: u32,
    /// True coordinates.
    pub points: Vec<Point>,
}

#[derive(Deserialize)]
struct Shape {
    #[serde(rename = "type")]
    _kind: serde_json::Value,
    points: Vec<(f64, f64)>,
}

/// Split `<bundle>_<frame>` into its parts.
fn parse_stem(stem: &str) -> Option<(&str, u32)> {
    let (bundle, frame) = stem.rsplit_once('_')?;
    if bundle.is_empty() {
        return None;
    }
    Some((bundle, frame.parse().ok()?))
}

/// Read one measurement file. Returns `Ok(None)` when the file name or
/// contents do not look like a measurement.
pub fn read_measurement(path: &Path) -> Result<Option<Measurement>> {
    let Some((bundle, frame)) = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(parse_stem)
    else {
        log::warn!("Skipping {}: not named <bundle>_<frame>", path.display());
        return Ok(None);
    };

    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let members: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&text).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let Some(shape) = members
        .into_values()
        .filter_map(|value| serde_json::from_value::<Shape>(value).ok())
        .last()
    else {
        log::warn!("Skipping {}: no traced shape", path.display());
        return Ok(None);
    };

    let (width, height) = LEGACY_CANVAS;
    let points = shape
        .points
        .into_iter()
        .map(|(x, y)| normalize_coordinates(x, y, width, height))
        .collect();
    Ok(Some(Measurement {
        bundle: bundle.to_string(),
        frame,
        points,
    }))
}

impl Measurement {
    /// Write the points into the document's default trace, replacing that slice.
    pub fn apply(self, doc: &mut ProjectDocument) {
        let record = doc
            .traces
            .entry(doc.default_trace_name.clone())
            .or_insert_with(|| TraceRecord::new(Color::RED));
        log::debug!(
            "Imported {} points for {} frame {}",
            self.points.len(),
            self.bundle,
            self.frame
        );
        record
            .files
            .entry(self.bundle)
            .or_default()
            .insert(self.frame, self.points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ultratrace-legacy-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_stem() {
        assert_eq!(parse_stem("00_12"), Some(("00", 12)));
        assert_eq!(parse_stem("subj_a_0007"), Some(("subj_a", 7)));
        assert_eq!(parse_stem("noframe"), None);
        assert_eq!(parse_stem("00_x"), None);
        assert_eq!(parse_stem("_3"), None);
    }

    #[test]
    fn test_read_and_apply_measurement() {
        let dir = scratch("apply");
        let path = dir.join("00_3.measurement");
        std::fs::write(
            &path,
            r#"{"TR": {"type": "spline", "points": [[400, 300], [80, 60]]}, "note": "x"}"#,
        )
        .unwrap();

        let measurement = read_measurement(&path).unwrap().unwrap();
        assert_eq!(measurement.bundle, "00");
        assert_eq!(measurement.frame, 3);
        assert_eq!(
            measurement.points,
            [Point::new(0.5, 0.5), Point::new(0.1, 0.1)]
        );

        let mut doc = ProjectDocument::new(PathBuf::from("/p"), "tongue", Color::RED);
        measurement.apply(&mut doc);
        assert_eq!(doc.traces["tongue"].points("00", 3).len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_measurement_without_shape_is_skipped() {
        let dir = scratch("skip");
        let path = dir.join("00_3.measurement");
        std::fs::write(&path, r#"{"TR": {"measurement": 4.2}}"#).unwrap();
        assert_eq!(read_measurement(&path).unwrap(), None);

        let odd = dir.join("loose.measurement");
        std::fs::write(&odd, "{}").unwrap();
        assert_eq!(read_measurement(&odd).unwrap(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
