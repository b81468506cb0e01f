// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media collaborators: frame images and time-aligned transcripts.
//!
//! The engine never decodes pixels. It only needs the frame count of a
//! bundle and the size of a frame, to size the viewport.

use crate::error::{Error, Result};
use crate::models::FileBundle;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A source of frame images for one bundle.
pub trait ImageSource {
    fn frame_count(&self) -> usize;
    /// Pixel dimensions of a frame, or `None` if there is no such frame.
    fn frame_size(&self, frame: u32) -> Result<Option<(u32, u32)>>;
}

/// A source of time-aligned labels (e.g. a TextGrid tier).
pub trait AlignmentSource {
    /// Label of the interval containing `time` (seconds), if any.
    fn interval_containing(&self, time: f64) -> Option<String>;
}

/// Frames pre-extracted to image files, as listed in a bundle's `processed` map.
#[derive(Debug, Clone)]
pub struct ProcessedFrames {
    frames: BTreeMap<u32, PathBuf>,
}

impl ProcessedFrames {
    /// Resolve a bundle's cached frames against the project root. Returns
    /// `None` when the bundle has no cache.
    pub fn for_bundle(root: &Path, bundle: &FileBundle) -> Option<Self> {
        let frames = bundle.processed.as_ref()?;
        Some(Self {
            frames: frames
                .iter()
                .map(|(frame, path)| (*frame, root.join(path)))
                .collect(),
        })
    }
}

impl ImageSource for ProcessedFrames {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame_size(&self, frame: u32) -> Result<Option<(u32, u32)>> {
        let Some(path) = self.frames.get(&frame) else {
            return Ok(None);
        };
        let size = image::image_dimensions(path).map_err(|e| match e {
            image::ImageError::IoError(source) => Error::io(path, source),
            other => Error::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, other)),
        })?;
        Ok(Some(size))
    }
}

/// Labelled intervals held in memory, sorted by start time.
#[derive(Debug, Clone, Default)]
pub struct Intervals {
    intervals: Vec<(f64, f64, String)>,
}

impl Intervals {
    pub fn new(mut intervals: Vec<(f64, f64, String)>) -> Self {
        intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { intervals }
    }
}

impl AlignmentSource for Intervals {
    fn interval_containing(&self, time: f64) -> Option<String> {
        self.intervals
            .iter()
            .find(|(start, end, _)| *start <= time && time < *end)
            .map(|(_, _, label)| label.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ultratrace-media-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_processed_frame_size() {
        let dir = scratch("size");
        image::RgbImage::new(64, 48)
            .save(dir.join("00_frame_0001.png"))
            .unwrap();

        let mut bundle = FileBundle::new("00");
        bundle.set_processed(1, PathBuf::from("00_frame_0001.png"));
        let source = ProcessedFrames::for_bundle(&dir, &bundle).unwrap();

        assert_eq!(source.frame_count(), 1);
        assert_eq!(source.frame_size(1).unwrap(), Some((64, 48)));
        assert_eq!(source.frame_size(2).unwrap(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_bundle_without_cache() {
        assert!(ProcessedFrames::for_bundle(Path::new("/p"), &FileBundle::new("00")).is_none());
    }

    #[test]
    fn test_missing_frame_file_is_io_error() {
        let mut bundle = FileBundle::new("00");
        bundle.set_processed(1, PathBuf::from("gone.png"));
        let source = ProcessedFrames::for_bundle(&scratch("missing"), &bundle).unwrap();
        assert!(matches!(source.frame_size(1), Err(Error::Io { .. })));
    }

    #[test]
    fn test_interval_lookup() {
        let tier = Intervals::new(vec![
            (0.5, 1.0, "a".to_string()),
            (0.0, 0.5, "".to_string()),
        ]);
        assert_eq!(tier.interval_containing(0.7).as_deref(), Some("a"));
        assert_eq!(tier.interval_containing(0.5).as_deref(), Some("a"));
        assert_eq!(tier.interval_containing(0.2).as_deref(), Some(""));
        assert_eq!(tier.interval_containing(1.0), None);
    }
}
