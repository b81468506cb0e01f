// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UltraTrace - annotation engine for tracing contours across image frames.
//!
//! Point annotations ("crosshairs") are placed on frames of ultrasound
//! recordings, grouped into named, colored traces, and kept in a JSON project
//! document next to the recordings. Coordinates are stored normalized to the
//! frame ("true" coordinates) and mapped to the screen through a zoom/pan
//! [`Viewport`].

pub mod app;
pub mod config;
pub mod error;
pub mod history;
pub mod io;
pub mod models;
pub mod store;
pub mod util;

pub use app::Session;
pub use config::Settings;
pub use error::{Error, Result};
pub use history::{Command, CommandLog, Replay};
pub use io::catalog::{scan, Catalog};
pub use models::{
    Annotation, AnnotationId, Color, FileBundle, Point, ProjectDocument, Trace, TraceId,
};
pub use store::AnnotationStore;
pub use util::geometry::Viewport;
pub use util::hit_test::{Hit, HitTester, Probe, TieBreak};
