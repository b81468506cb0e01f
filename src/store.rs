// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! In-memory annotation store.
//!
//! Holds every trace and every annotation placed in the session, keyed by
//! trace x file x frame. Deletions are soft (a visibility flag) so that undo
//! can bring annotations back; [`AnnotationStore::prune`] is the only place
//! annotations are dropped for good.

use crate::models::trace::check_name_shape;
use crate::models::{
    Annotation, AnnotationId, Color, FileBundle, NameRejection, Point, ProjectDocument, Trace,
    TraceId, TraceRecord,
};
use crate::util::geometry::Viewport;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    /// Traces in registration order.
    traces: IndexMap<TraceId, Trace>,
    annotations: BTreeMap<AnnotationId, Annotation>,
    /// Transient; never persisted and outside undo scope.
    selection: BTreeSet<AnnotationId>,
    default_trace: TraceId,
    next_annotation: u64,
    next_trace: u32,
}

impl AnnotationStore {
    /// Create a store holding only the default trace.
    pub fn new(default_trace_name: &str, color: Color) -> Self {
        let mut store = Self {
            traces: IndexMap::new(),
            annotations: BTreeMap::new(),
            selection: BTreeSet::new(),
            default_trace: TraceId(0),
            next_annotation: 0,
            next_trace: 0,
        };
        store.default_trace = store.add_trace(default_trace_name, color);
        store
    }

    /// Build the store from a persisted document.
    pub fn from_document(doc: &ProjectDocument) -> Self {
        let mut store = Self {
            traces: IndexMap::new(),
            annotations: BTreeMap::new(),
            selection: BTreeSet::new(),
            default_trace: TraceId(0),
            next_annotation: 0,
            next_trace: 0,
        };

        for (name, record) in &doc.traces {
            let trace = store.add_trace(name, record.color);
            for (file, frames) in &record.files {
                for (frame, points) in frames {
                    for point in points {
                        store.insert(trace, file, *frame, *point);
                    }
                }
            }
        }

        match store.trace_by_name(&doc.default_trace_name) {
            Some(id) => store.default_trace = id,
            None => {
                log::warn!(
                    "Default trace `{}` not found in document",
                    doc.default_trace_name
                );
                let first = store.traces.keys().next().copied();
                store.default_trace = match first {
                    Some(id) => id,
                    None => store.add_trace(&doc.default_trace_name, Color::RED),
                };
            }
        }
        store
    }

    /// Serialize the visible state into a document.
    pub fn to_document(&self, path: &Path, files: &[FileBundle]) -> ProjectDocument {
        let mut traces = IndexMap::new();
        for trace in self.traces.values() {
            let mut record = TraceRecord::new(trace.color);
            for (file, frames) in &trace.frames {
                for (frame, ids) in frames {
                    let points: Vec<Point> = ids
                        .iter()
                        .filter_map(|id| self.annotations.get(id))
                        .filter(|a| a.visible)
                        .map(|a| a.position)
                        .collect();
                    if !points.is_empty() {
                        record
                            .files
                            .entry(file.clone())
                            .or_default()
                            .insert(*frame, points);
                    }
                }
            }
            traces.insert(trace.name.clone(), record);
        }

        ProjectDocument {
            path: path.to_path_buf(),
            default_trace_name: self.default_trace_name().to_string(),
            traces,
            files: files.to_vec(),
        }
    }

    // ---- traces ----

    pub(crate) fn add_trace(&mut self, name: &str, color: Color) -> TraceId {
        let id = TraceId(self.next_trace);
        self.next_trace += 1;
        self.traces.insert(id, Trace::new(id, name, color));
        id
    }

    /// Traces in registration order.
    pub fn traces(&self) -> impl Iterator<Item = &Trace> {
        self.traces.values()
    }

    pub fn trace(&self, id: TraceId) -> Option<&Trace> {
        self.traces.get(&id)
    }

    pub fn trace_by_name(&self, name: &str) -> Option<TraceId> {
        self.traces.values().find(|t| t.name == name).map(|t| t.id)
    }

    pub fn default_trace(&self) -> TraceId {
        self.default_trace
    }

    pub fn default_trace_name(&self) -> &str {
        self.traces
            .get(&self.default_trace)
            .map(|t| t.name.as_str())
            .unwrap_or_default()
    }

    pub fn set_default_trace(&mut self, trace: TraceId) -> bool {
        if self.traces.contains_key(&trace) {
            self.default_trace = trace;
            true
        } else {
            false
        }
    }

    fn check_name(&self, name: &str) -> Result<(), NameRejection> {
        check_name_shape(name)?;
        if self.trace_by_name(name).is_some() {
            return Err(NameRejection::Duplicate);
        }
        Ok(())
    }

    /// Register a new trace with a random color. It does not become the
    /// default. Returns `None` if the name is rejected.
    pub fn new_trace(&mut self, name: &str) -> Option<TraceId> {
        if let Err(reason) = self.check_name(name) {
            log::warn!("Cannot create trace `{}`: {}", name, reason);
            return None;
        }
        let id = self.add_trace(name, Color::random());
        log::info!("Created trace `{}`", name);
        Some(id)
    }

    /// Rename a trace, returning its previous name. Rejected (returning
    /// `None`) if the new name is empty, too long, or already used by any
    /// trace including this one.
    pub fn rename(&mut self, trace: TraceId, new_name: &str) -> Option<String> {
        if let Err(reason) = self.check_name(new_name) {
            log::warn!("Cannot rename trace to `{}`: {}", new_name, reason);
            return None;
        }
        let entry = self.traces.get_mut(&trace)?;
        let previous = std::mem::replace(&mut entry.name, new_name.to_string());
        log::info!("Renamed trace `{}` -> `{}`", previous, new_name);
        Some(previous)
    }

    /// Change a trace's color, returning the previous one.
    pub fn recolor(&mut self, trace: TraceId, color: Color) -> Option<Color> {
        let entry = self.traces.get_mut(&trace)?;
        let previous = std::mem::replace(&mut entry.color, color);
        log::debug!("Recolored trace `{}`: {} -> {}", entry.name, previous, color);
        Some(previous)
    }

    // ---- annotations ----

    fn insert(&mut self, trace: TraceId, file: &str, frame: u32, position: Point) -> AnnotationId {
        let id = AnnotationId(self.next_annotation);
        self.next_annotation += 1;
        self.annotations
            .insert(id, Annotation::new(id, trace, file, frame, position));
        if let Some(entry) = self.traces.get_mut(&trace) {
            entry.slice_mut(file, frame).push(id);
        }
        id
    }

    /// Create a visible, unselected annotation. Returns `None` for an
    /// unknown trace.
    pub fn place(
        &mut self,
        trace: TraceId,
        file: &str,
        frame: u32,
        position: Point,
    ) -> Option<AnnotationId> {
        if !self.traces.contains_key(&trace) {
            return None;
        }
        let id = self.insert(trace, file, frame, position);
        log::debug!(
            "Placed {} at ({:.3}, {:.3}) on {} frame {}",
            id,
            position.x,
            position.y,
            file,
            frame
        );
        Some(id)
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    /// Soft-delete. Returns `true` if the annotation was visible.
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        self.selection.remove(&id);
        match self.annotations.get_mut(&id) {
            Some(annotation) if annotation.visible => {
                annotation.visible = false;
                true
            }
            _ => false,
        }
    }

    /// Undo a soft-delete. Returns `true` if the annotation was hidden.
    pub fn restore(&mut self, id: AnnotationId) -> bool {
        match self.annotations.get_mut(&id) {
            Some(annotation) if !annotation.visible => {
                annotation.visible = true;
                true
            }
            _ => false,
        }
    }

    /// Move annotations by a screen-space delta, converted with the viewport
    /// active during the drag. Returns the true-space delta applied and the
    /// starting position of every annotation that moved.
    pub fn move_by(
        &mut self,
        ids: &[AnnotationId],
        dx: f64,
        dy: f64,
        viewport: &Viewport,
    ) -> ((f64, f64), Vec<(AnnotationId, Point)>) {
        let (tdx, tdy) = viewport.delta_to_true(dx, dy);
        ((tdx, tdy), self.translate(ids, tdx, tdy))
    }

    /// Move visible annotations by a true-space delta, returning their
    /// starting positions. Each annotation moves at most once.
    pub fn translate(
        &mut self,
        ids: &[AnnotationId],
        dx: f64,
        dy: f64,
    ) -> Vec<(AnnotationId, Point)> {
        let unique: BTreeSet<AnnotationId> = ids.iter().copied().collect();
        let mut origins = Vec::with_capacity(unique.len());
        for id in &unique {
            if let Some(annotation) = self.annotations.get_mut(id) {
                if annotation.visible {
                    origins.push((*id, annotation.position));
                    annotation.position = annotation.position.offset(dx, dy);
                }
            }
        }
        origins
    }

    pub(crate) fn set_position(&mut self, id: AnnotationId, position: Point) -> Option<Point> {
        let annotation = self.annotations.get_mut(&id)?;
        Some(std::mem::replace(&mut annotation.position, position))
    }

    /// Visible annotations of one slice in placement order. An untraced
    /// slice (or unknown trace) yields an empty list.
    pub fn for_frame(&self, trace: TraceId, file: &str, frame: u32) -> Vec<&Annotation> {
        let Some(entry) = self.traces.get(&trace) else {
            return Vec::new();
        };
        entry
            .slice(file, frame)
            .iter()
            .filter_map(|id| self.annotations.get(id))
            .filter(|a| a.visible)
            .collect()
    }

    /// Frames of `file` holding at least one visible annotation, ascending.
    pub fn traced_frames(&self, trace: TraceId, file: &str) -> Vec<u32> {
        let Some(frames) = self.traces.get(&trace).and_then(|t| t.frames.get(file)) else {
            return Vec::new();
        };
        frames
            .iter()
            .filter(|(_, ids)| {
                ids.iter()
                    .any(|id| self.annotations.get(id).is_some_and(|a| a.visible))
            })
            .map(|(frame, _)| *frame)
            .collect()
    }

    /// Soft-delete every visible annotation of one slice, returning them.
    pub fn clear(&mut self, trace: TraceId, file: &str, frame: u32) -> Vec<AnnotationId> {
        let ids: Vec<AnnotationId> = self
            .for_frame(trace, file, frame)
            .iter()
            .map(|a| a.id)
            .collect();
        for id in &ids {
            self.remove(*id);
        }
        ids
    }

    // ---- selection ----

    /// Select a visible annotation. Invisible annotations are unselectable.
    pub fn select(&mut self, id: AnnotationId) -> bool {
        if self.annotations.get(&id).is_some_and(|a| a.visible) {
            self.selection.insert(id);
            true
        } else {
            false
        }
    }

    pub fn unselect(&mut self, id: AnnotationId) {
        self.selection.remove(&id);
    }

    pub fn unselect_all(&mut self) {
        self.selection.clear();
    }

    pub fn select_all(&mut self, trace: TraceId, file: &str, frame: u32) {
        let ids: Vec<AnnotationId> = self
            .for_frame(trace, file, frame)
            .iter()
            .map(|a| a.id)
            .collect();
        self.selection.extend(ids);
    }

    pub fn is_selected(&self, id: AnnotationId) -> bool {
        self.selection.contains(&id)
    }

    pub fn selected(&self) -> Vec<AnnotationId> {
        self.selection.iter().copied().collect()
    }

    // ---- maintenance ----

    /// Permanently drop soft-deleted annotations. Returns how many went.
    pub fn prune(&mut self) -> usize {
        let dead: BTreeSet<AnnotationId> = self
            .annotations
            .values()
            .filter(|a| !a.visible)
            .map(|a| a.id)
            .collect();
        if dead.is_empty() {
            return 0;
        }

        self.annotations.retain(|id, _| !dead.contains(id));
        self.selection.retain(|id| !dead.contains(id));
        for trace in self.traces.values_mut() {
            for frames in trace.frames.values_mut() {
                for ids in frames.values_mut() {
                    ids.retain(|id| !dead.contains(id));
                }
                frames.retain(|_, ids| !ids.is_empty());
            }
            trace.frames.retain(|_, frames| !frames.is_empty());
        }
        log::info!("Pruned {} deleted annotations", dead.len());
        dead.len()
    }

    /// Bring the store in line with a document snapshot.
    ///
    /// Annotation ids survive where possible: a snapshot point is matched to
    /// a visible annotation at the same position first, then to one of the
    /// `hint` annotations at that position. Unmatched points become new
    /// annotations; unmatched annotations are soft-deleted. The default
    /// trace is left as it is, since default changes are not undoable.
    pub fn reload(&mut self, doc: &ProjectDocument, hint: &[AnnotationId]) {
        for (name, record) in &doc.traces {
            let id = match self.trace_by_name(name) {
                Some(id) => id,
                None => self.add_trace(name, record.color),
            };
            if let Some(trace) = self.traces.get_mut(&id) {
                trace.color = record.color;
            }
        }

        let hinted: BTreeSet<AnnotationId> = hint.iter().copied().collect();
        let trace_ids: Vec<TraceId> = self.traces.keys().copied().collect();
        for trace in trace_ids {
            let Some(entry) = self.traces.get(&trace) else {
                continue;
            };
            let record = doc.traces.get(&entry.name);

            let mut slices: BTreeSet<(String, u32)> = BTreeSet::new();
            for (file, frames) in &entry.frames {
                slices.extend(frames.keys().map(|frame| (file.clone(), *frame)));
            }
            if let Some(record) = record {
                for (file, frames) in &record.files {
                    slices.extend(frames.keys().map(|frame| (file.clone(), *frame)));
                }
            }

            for (file, frame) in slices {
                let points = record.map(|r| r.points(&file, frame)).unwrap_or(&[]);
                self.reconcile_slice(trace, &file, frame, points, &hinted);
            }
        }
        self.selection.clear();
    }

    fn reconcile_slice(
        &mut self,
        trace: TraceId,
        file: &str,
        frame: u32,
        points: &[Point],
        hinted: &BTreeSet<AnnotationId>,
    ) {
        let mut unused: Vec<AnnotationId> = self
            .traces
            .get(&trace)
            .map(|t| t.slice(file, frame).to_vec())
            .unwrap_or_default();

        for point in points {
            let at_point = |id: &AnnotationId, visible: bool| {
                self.annotations
                    .get(id)
                    .is_some_and(|a| a.position == *point && a.visible == visible)
            };
            let pick = unused
                .iter()
                .position(|id| at_point(id, true))
                .or_else(|| {
                    unused
                        .iter()
                        .position(|id| hinted.contains(id) && at_point(id, false))
                });

            match pick {
                Some(index) => {
                    let id = unused.remove(index);
                    self.restore(id);
                }
                None => {
                    self.insert(trace, file, frame, *point);
                }
            }
        }

        for id in unused {
            if let Some(annotation) = self.annotations.get_mut(&id) {
                annotation.visible = false;
            }
        }
    }
}
