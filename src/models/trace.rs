// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Traces: named, colored annotation channels spanning every bundle.

use super::annotation::AnnotationId;
use super::color::Color;
use std::collections::BTreeMap;
use std::fmt;

/// Longest trace name accepted, in characters.
pub const MAX_TRACE_NAME_LEN: usize = 12;

/// Stable handle to a trace. Unlike the name, it survives renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceId(pub(crate) u32);

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace#{}", self.0)
    }
}

/// Why a trace name was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRejection {
    Empty,
    TooLong,
    Duplicate,
}

impl fmt::Display for NameRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameRejection::Empty => write!(f, "name is empty"),
            NameRejection::TooLong => {
                write!(f, "name is longer than {MAX_TRACE_NAME_LEN} characters")
            }
            NameRejection::Duplicate => write!(f, "name is already taken"),
        }
    }
}

/// Check a candidate name against the shape rules. Uniqueness is checked by
/// the store, which knows the other names.
pub fn check_name_shape(name: &str) -> Result<(), NameRejection> {
    if name.is_empty() {
        Err(NameRejection::Empty)
    } else if name.chars().count() > MAX_TRACE_NAME_LEN {
        Err(NameRejection::TooLong)
    } else {
        Ok(())
    }
}

/// A named annotation channel, e.g. one anatomical structure.
#[derive(Debug, Clone)]
pub struct Trace {
    pub id: TraceId,
    pub name: String,
    pub color: Color,
    /// file -> frame -> annotations in placement order (visible or not)
    pub(crate) frames: BTreeMap<String, BTreeMap<u32, Vec<AnnotationId>>>,
}

impl Trace {
    pub(crate) fn new(id: TraceId, name: &str, color: Color) -> Self {
        Self {
            id,
            name: name.to_string(),
            color,
            frames: BTreeMap::new(),
        }
    }

    /// Annotation ids in one (file, frame) slice, including soft-deleted ones.
    pub(crate) fn slice(&self, file: &str, frame: u32) -> &[AnnotationId] {
        self.frames
            .get(file)
            .and_then(|frames| frames.get(&frame))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn slice_mut(&mut self, file: &str, frame: u32) -> &mut Vec<AnnotationId> {
        self.frames
            .entry(file.to_string())
            .or_default()
            .entry(frame)
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_shape_rules() {
        assert_eq!(check_name_shape(""), Err(NameRejection::Empty));
        assert_eq!(check_name_shape("tongue"), Ok(()));
        assert_eq!(check_name_shape("twelve_chars"), Ok(()));
        assert_eq!(check_name_shape("thirteen_char"), Err(NameRejection::TooLong));
    }

    #[test]
    fn test_name_length_counts_characters() {
        // 12 characters, more than 12 bytes
        assert_eq!(check_name_shape("ééééééééééé1"), Ok(()));
    }

    #[test]
    fn test_missing_slice_is_empty() {
        let trace = Trace::new(TraceId(0), "tongue", Color::RED);
        assert!(trace.slice("00", 1).is_empty());
    }
}
