// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the zoom/pan viewport and the coordinate
//! transformations between screen coordinates and true (normalized)
//! coordinates.

use crate::config::Settings;
use crate::models::annotation::Point;

/// Convert pixel coordinates to normalized coordinates (0.0 to 1.0).
pub fn normalize_coordinates(pixel_x: f64, pixel_y: f64, width: f64, height: f64) -> Point {
    Point {
        x: pixel_x / width,
        y: pixel_y / height,
    }
}

/// Convert normalized coordinates to pixel coordinates.
pub fn denormalize_coordinates(point: &Point, width: f64, height: f64) -> (f64, f64) {
    (point.x * width, point.y * height)
}

/// Zoom/pan state mapping true coordinates to screen coordinates.
///
/// `screen = true * natural_size * scale + pan`, where
/// `scale = delta ^ zoom`. Zoom is an integer step count clamped to
/// `[min_zoom, max_zoom]`; out-of-range requests are silently ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    zoom: i32,
    min_zoom: i32,
    max_zoom: i32,
    delta: f64,
    pan: (f64, f64),
    natural_size: (f64, f64),
    viewport_size: (f64, f64),
    pivot: Option<(f64, f64)>,
}

/// Per-step scale used when the configured one is unusable.
pub const DEFAULT_ZOOM_DELTA: f64 = 1.3;

impl Viewport {
    /// A viewport at 1x. A `delta` that is not a finite value above zero
    /// falls back to [`DEFAULT_ZOOM_DELTA`]; degenerate natural sizes fall
    /// back to 800x600.
    pub fn new(min_zoom: i32, max_zoom: i32, delta: f64, natural_size: (f64, f64)) -> Self {
        let delta = if is_positive(delta) {
            delta
        } else {
            log::warn!("Ignoring zoom delta {}, using {}", delta, DEFAULT_ZOOM_DELTA);
            DEFAULT_ZOOM_DELTA
        };
        let natural_size = if is_positive(natural_size.0) && is_positive(natural_size.1) {
            natural_size
        } else {
            log::warn!("Ignoring natural size {:?}", natural_size);
            (800.0, 600.0)
        };
        Self {
            zoom: 0,
            min_zoom: min_zoom.min(0),
            max_zoom: max_zoom.max(0),
            delta,
            pan: (0.0, 0.0),
            natural_size,
            viewport_size: natural_size,
            pivot: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.min_zoom,
            settings.max_zoom,
            settings.zoom_delta,
            settings.natural_size,
        )
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    /// Effective magnification, `delta ^ zoom`.
    pub fn scale(&self) -> f64 {
        self.delta.powi(self.zoom)
    }

    pub fn pan_offset(&self) -> (f64, f64) {
        self.pan
    }

    pub fn natural_size(&self) -> (f64, f64) {
        self.natural_size
    }

    /// Size the transform to the displayed image. Degenerate sizes are ignored.
    pub fn set_natural_size(&mut self, width: f64, height: f64) {
        if is_positive(width) && is_positive(height) {
            self.natural_size = (width, height);
        }
    }

    /// Record the on-screen canvas size; its center is the default zoom pivot.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        if is_positive(width) && is_positive(height) {
            self.viewport_size = (width, height);
        }
    }

    /// Record the last interaction point, used as the zoom pivot.
    pub fn set_pivot(&mut self, x: f64, y: f64) {
        self.pivot = Some((x, y));
    }

    /// Zoom in one step around the pivot. Returns `false` at the bound.
    pub fn zoom_in(&mut self) -> bool {
        self.step_zoom(1)
    }

    /// Zoom out one step around the pivot. Returns `false` at the bound.
    pub fn zoom_out(&mut self) -> bool {
        self.step_zoom(-1)
    }

    fn step_zoom(&mut self, step: i32) -> bool {
        let target = self.zoom + step;
        if target < self.min_zoom || target > self.max_zoom {
            return false;
        }

        let (px, py) = self.pivot.unwrap_or((
            self.viewport_size.0 / 2.0,
            self.viewport_size.1 / 2.0,
        ));
        let old_scale = self.scale();
        self.zoom = target;
        let ratio = self.scale() / old_scale;

        // keep the true point under the pivot fixed
        self.pan = (px - (px - self.pan.0) * ratio, py - (py - self.pan.1) * ratio);
        log::debug!(
            "Zoom {} (scale {:.3}), pan ({:.1}, {:.1})",
            self.zoom,
            self.scale(),
            self.pan.0,
            self.pan.1
        );
        true
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    /// Back to 1x with no pan, e.g. on frame change.
    pub fn reset(&mut self) {
        self.zoom = 0;
        self.pan = (0.0, 0.0);
        self.pivot = None;
    }

    /// Size of the displayed image on screen at the current zoom.
    fn displayed_size(&self) -> (f64, f64) {
        let scale = self.scale();
        (self.natural_size.0 * scale, self.natural_size.1 * scale)
    }

    /// True coordinates -> screen coordinates.
    pub fn to_screen(&self, point: &Point) -> (f64, f64) {
        let (width, height) = self.displayed_size();
        let (x, y) = denormalize_coordinates(point, width, height);
        (x + self.pan.0, y + self.pan.1)
    }

    /// Screen coordinates -> true coordinates.
    pub fn to_true(&self, x: f64, y: f64) -> Point {
        let (width, height) = self.displayed_size();
        normalize_coordinates(x - self.pan.0, y - self.pan.1, width, height)
    }

    /// Convert a screen-space drag delta to a true-space delta under the
    /// current zoom.
    pub fn delta_to_true(&self, dx: f64, dy: f64) -> (f64, f64) {
        let (width, height) = self.displayed_size();
        (dx / width, dy / height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
