// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main session state.
//!
//! A [`Session`] ties the annotation store, the catalog, the viewport and the
//! command log together. Every public mutation is recorded for undo and
//! followed by a full write of the project document, in that order.

use crate::config::Settings;
use crate::error::Result;
use crate::history::{Command, CommandLog, Replay, ReplayTarget};
use crate::io::backup::SnapshotSink;
use crate::io::catalog::Catalog;
use crate::io::media::{AlignmentSource, ImageSource};
use crate::io::serialization::{export_json, export_yaml};
use crate::models::{AnnotationId, Color, Point, ProjectDocument, TraceId};
use crate::store::AnnotationStore;
use crate::util::geometry::Viewport;
use crate::util::hit_test::{Hit, HitTester, Probe};
use std::path::{Path, PathBuf};

/// An open project.
pub struct Session {
    settings: Settings,
    store: AnnotationStore,
    catalog: Catalog,
    viewport: Viewport,
    hit_tester: HitTester,
    /// History for undo/redo
    history: CommandLog,
    snapshots: Box<dyn SnapshotSink>,
    alignment: Option<Box<dyn AlignmentSource>>,
    /// True coordinates captured by the last copy.
    clipboard: Vec<Point>,
}

impl Session {
    /// Open the project at `root`, keeping backups in its state directory.
    pub fn open(root: &Path, settings: Settings) -> Result<Self> {
        let (catalog, doc) = Catalog::load(root, &settings)?;
        let snapshots = Box::new(catalog.backups());
        Ok(Self::assemble(settings, catalog, &doc, snapshots))
    }

    /// Open the project at `root` with a custom snapshot sink.
    pub fn open_with(
        root: &Path,
        settings: Settings,
        snapshots: Box<dyn SnapshotSink>,
    ) -> Result<Self> {
        let (catalog, doc) = Catalog::load(root, &settings)?;
        Ok(Self::assemble(settings, catalog, &doc, snapshots))
    }

    fn assemble(
        settings: Settings,
        catalog: Catalog,
        doc: &ProjectDocument,
        snapshots: Box<dyn SnapshotSink>,
    ) -> Self {
        let store = AnnotationStore::from_document(doc);
        log::info!(
            "Opened {} with {} traces (default `{}`)",
            catalog.root().display(),
            store.traces().count(),
            store.default_trace_name()
        );
        Self {
            viewport: Viewport::from_settings(&settings),
            hit_tester: HitTester::from_settings(&settings),
            history: CommandLog::with_limit(settings.history_limit),
            settings,
            store,
            catalog,
            snapshots,
            alignment: None,
            clipboard: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Zoom and pan are view state; they are never persisted or undone.
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn history(&self) -> &CommandLog {
        &self.history
    }

    /// The document as it would be written now.
    pub fn document(&self) -> ProjectDocument {
        self.catalog.document(&self.store)
    }

    fn write(&self) -> Result<()> {
        self.catalog.write(&self.store)
    }

    fn record(&mut self, command: Command) -> Result<()> {
        self.history.push(command);
        self.write()
    }

    // ---- annotations ----

    /// Place an annotation at true coordinates.
    pub fn place(
        &mut self,
        trace: TraceId,
        file: &str,
        frame: u32,
        position: Point,
    ) -> Result<Option<AnnotationId>> {
        let Some(id) = self.store.place(trace, file, frame, position) else {
            log::warn!("Cannot place on unknown trace {}", trace);
            return Ok(None);
        };
        self.record(Command::Add(vec![id]))?;
        Ok(Some(id))
    }

    /// Place an annotation at a screen position under the current viewport.
    pub fn place_at_screen(
        &mut self,
        trace: TraceId,
        file: &str,
        frame: u32,
        x: f64,
        y: f64,
    ) -> Result<Option<AnnotationId>> {
        self.viewport.set_pivot(x, y);
        let position = self.viewport.to_true(x, y);
        self.place(trace, file, frame, position)
    }

    /// Soft-delete annotations. Returns how many were visible.
    pub fn remove(&mut self, ids: &[AnnotationId]) -> Result<usize> {
        let removed: Vec<AnnotationId> = ids
            .iter()
            .copied()
            .filter(|id| self.store.remove(*id))
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }
        let count = removed.len();
        self.record(Command::Delete(removed))?;
        Ok(count)
    }

    pub fn remove_selected(&mut self) -> Result<usize> {
        let selected = self.store.selected();
        self.remove(&selected)
    }

    /// Drag annotations by a screen-space delta. Returns `false` if nothing moved.
    pub fn move_by(&mut self, ids: &[AnnotationId], dx: f64, dy: f64) -> Result<bool> {
        let ((tdx, tdy), origins) = self.store.move_by(ids, dx, dy, &self.viewport);
        if origins.is_empty() {
            return Ok(false);
        }
        self.record(Command::Move {
            origins,
            dx: tdx,
            dy: tdy,
        })?;
        Ok(true)
    }

    pub fn move_selected(&mut self, dx: f64, dy: f64) -> Result<bool> {
        let selected = self.store.selected();
        self.move_by(&selected, dx, dy)
    }

    /// Soft-delete a whole slice after backing up the document. Returns how
    /// many annotations were cleared; an empty slice is left alone.
    pub fn clear(&mut self, trace: TraceId, file: &str, frame: u32) -> Result<usize> {
        if self.store.for_frame(trace, file, frame).is_empty() {
            return Ok(0);
        }
        let backup = self.catalog.write_backup(self.snapshots.as_mut())?;
        let cleared = self.store.clear(trace, file, frame);
        let count = cleared.len();
        log::info!("Cleared {} annotations from {} frame {}", count, file, frame);
        self.record(Command::Clear {
            trace,
            file: file.to_string(),
            frame,
            backup,
            cleared,
        })?;
        Ok(count)
    }

    // ---- traces ----

    /// Change a trace's color; `None` picks a random one. Returns the
    /// previous color.
    pub fn recolor(&mut self, trace: TraceId, color: Option<Color>) -> Result<Option<Color>> {
        let color = color.unwrap_or_else(Color::random);
        let Some(previous) = self.store.recolor(trace, color) else {
            return Ok(None);
        };
        self.record(Command::Recolor {
            trace,
            color: previous,
        })?;
        Ok(Some(previous))
    }

    /// Rename a trace. Returns `false` if the name was rejected.
    pub fn rename(&mut self, trace: TraceId, name: &str) -> Result<bool> {
        let Some(previous) = self.store.rename(trace, name) else {
            return Ok(false);
        };
        self.record(Command::Rename {
            trace,
            name: previous,
        })?;
        Ok(true)
    }

    /// Register a new trace. Trace creation is not undoable.
    pub fn new_trace(&mut self, name: &str) -> Result<Option<TraceId>> {
        let Some(id) = self.store.new_trace(name) else {
            return Ok(None);
        };
        self.history.invalidate_redo();
        self.write()?;
        Ok(Some(id))
    }

    pub fn set_default_trace(&mut self, trace: TraceId) -> Result<bool> {
        if !self.store.set_default_trace(trace) {
            return Ok(false);
        }
        self.history.invalidate_redo();
        self.write()?;
        Ok(true)
    }

    // ---- history ----

    pub fn undo(&mut self) -> Result<Replay> {
        let mut target = ReplayTarget {
            store: &mut self.store,
            snapshots: self.snapshots.as_mut(),
            root: self.catalog.root(),
            files: self.catalog.bundles(),
        };
        let replay = self.history.undo(&mut target)?;
        if replay != Replay::Empty {
            self.write()?;
        }
        Ok(replay)
    }

    pub fn redo(&mut self) -> Result<Replay> {
        let mut target = ReplayTarget {
            store: &mut self.store,
            snapshots: self.snapshots.as_mut(),
            root: self.catalog.root(),
            files: self.catalog.bundles(),
        };
        let replay = self.history.redo(&mut target)?;
        if replay != Replay::Empty {
            self.write()?;
        }
        Ok(replay)
    }

    // ---- selection ----

    /// Select the annotation nearest to a click. Unless `additive`, any
    /// previous selection is dropped first. The hit names the trace that
    /// owns the annotation, which may differ from `active`.
    pub fn select_nearest(
        &mut self,
        probe: &Probe<'_>,
        active: Option<TraceId>,
        additive: bool,
    ) -> Option<Hit> {
        self.viewport.set_pivot(probe.position.0, probe.position.1);
        if !additive {
            self.store.unselect_all();
        }
        let hit = self
            .hit_tester
            .find_nearest(&self.store, &self.viewport, probe, active)?;
        self.store.select(hit.annotation);
        Some(hit)
    }

    pub fn select_all(&mut self, trace: TraceId, file: &str, frame: u32) {
        self.store.select_all(trace, file, frame);
    }

    pub fn unselect_all(&mut self) {
        self.store.unselect_all();
    }

    /// Capture the selected annotations' positions. Returns how many.
    pub fn copy(&mut self) -> usize {
        self.clipboard = self
            .store
            .selected()
            .into_iter()
            .filter_map(|id| self.store.annotation(id))
            .map(|a| a.position)
            .collect();
        self.clipboard.len()
    }

    /// Place copies of the clipboard on a slice as a single undo step. The
    /// pasted annotations become the selection.
    pub fn paste(&mut self, trace: TraceId, file: &str, frame: u32) -> Result<Vec<AnnotationId>> {
        if self.clipboard.is_empty() || self.store.trace(trace).is_none() {
            return Ok(Vec::new());
        }
        self.store.unselect_all();
        let pasted: Vec<AnnotationId> = self
            .clipboard
            .iter()
            .filter_map(|p| self.store.place(trace, file, frame, *p))
            .collect();
        for id in &pasted {
            self.store.select(*id);
        }
        self.record(Command::Add(pasted.clone()))?;
        Ok(pasted)
    }

    // ---- navigation and media ----

    /// Prepare the viewport for a frame: back to 1x and sized to the frame
    /// image when the bundle has one. Returns `false` for an unknown bundle.
    pub fn show_frame(&mut self, file: &str, frame: u32) -> Result<bool> {
        if self.catalog.bundle(file).is_none() {
            return Ok(false);
        }
        self.store.unselect_all();
        self.viewport.reset();
        if let Some(source) = self.catalog.image_source(file) {
            if let Some((width, height)) = source.frame_size(frame)? {
                self.viewport
                    .set_natural_size(f64::from(width), f64::from(height));
            }
        }
        log::debug!("Showing {} frame {}", file, frame);
        Ok(true)
    }

    pub fn set_alignment(&mut self, source: Box<dyn AlignmentSource>) {
        self.alignment = Some(source);
    }

    /// Label of the aligned interval at `time`, if an alignment is attached.
    pub fn interval_at(&self, time: f64) -> Option<String> {
        self.alignment.as_ref()?.interval_containing(time)
    }

    /// Record a cached frame image for a bundle.
    pub fn add_processed(&mut self, file: &str, frame: u32, path: PathBuf) -> Result<bool> {
        if !self.catalog.add_processed(file, frame, path) {
            return Ok(false);
        }
        self.write()?;
        Ok(true)
    }

    // ---- maintenance ----

    /// Drop soft-deleted annotations for good. The command history goes too.
    pub fn prune(&mut self) -> Result<usize> {
        let pruned = self.store.prune();
        self.history.clear();
        self.write()?;
        Ok(pruned)
    }

    /// Export the document to a file, YAML or JSON by extension.
    pub fn export(&self, path: &Path) -> Result<()> {
        let doc = self.document();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => export_yaml(&doc, path)?,
            _ => export_json(&doc, path)?,
        }
        log::info!("Exported annotations to {}", path.display());
        Ok(())
    }
}
