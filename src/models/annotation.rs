// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the point annotations ("crosshairs") placed on a
//! frame, and the resolution-independent coordinates they are stored in.

use super::trace::TraceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D point in true coordinates: fractions along each axis of the
/// displayed image at 1x zoom, e.g. the image center is `(0.5, 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by a true-space delta.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Stable identity of an annotation for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnotationId(pub(crate) u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xhair#{}", self.0)
    }
}

/// A single point placed on one frame of one bundle, owned by one trace.
///
/// Screen position is never stored; it is derived from `position` through
/// the active viewport whenever it is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub trace: TraceId,
    pub file: String,
    pub frame: u32,
    pub position: Point,
    /// Soft-delete flag. Invisible annotations stay in memory for undo but
    /// are excluded from rendering, hit-testing and the persisted document.
    pub visible: bool,
}

impl Annotation {
    pub(crate) fn new(
        id: AnnotationId,
        trace: TraceId,
        file: &str,
        frame: u32,
        position: Point,
    ) -> Self {
        Self {
            id,
            trace,
            file: file.to_string(),
            frame,
            position,
            visible: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_offset() {
        let p = Point::new(0.25, 0.5).offset(0.25, -0.5);
        assert_eq!(p, Point::new(0.5, 0.0));
    }

    #[test]
    fn test_point_serializes_as_xy_object() {
        let json = serde_json::to_string(&Point::new(0.5, 0.25)).unwrap();
        assert_eq!(json, r#"{"x":0.5,"y":0.25}"#);
    }
}
