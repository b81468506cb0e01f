// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data models for annotations, traces, bundles and the project document.

pub mod annotation;
pub mod bundle;
pub mod color;
pub mod project;
pub mod trace;

pub use annotation::{Annotation, AnnotationId, Point};
pub use bundle::FileBundle;
pub use color::Color;
pub use project::{ProjectDocument, TraceRecord};
pub use trace::{NameRejection, Trace, TraceId, MAX_TRACE_NAME_LEN};
