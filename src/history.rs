// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Undo/redo command log.
//!
//! Every mutating gesture is recorded as a [`Command`] describing what was
//! done. Replaying a command from one stack reverses its effect and yields
//! the inverse command, which goes onto the other stack.

use crate::error::Result;
use crate::io::backup::{BackupId, SnapshotSink};
use crate::models::{AnnotationId, Color, FileBundle, Point, TraceId};
use crate::store::AnnotationStore;
use std::path::Path;

/// A reversible record of one mutating operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// These annotations were placed.
    Add(Vec<AnnotationId>),
    /// These annotations were soft-deleted.
    Delete(Vec<AnnotationId>),
    /// These annotations were moved by a true-space `(dx, dy)` away from
    /// the recorded origins.
    Move {
        origins: Vec<(AnnotationId, Point)>,
        dx: f64,
        dy: f64,
    },
    /// The trace was recolored; `color` is the color it had before.
    Recolor { trace: TraceId, color: Color },
    /// The trace was renamed; `name` is the name it had before.
    Rename { trace: TraceId, name: String },
    /// A whole slice was cleared after the document was backed up.
    Clear {
        trace: TraceId,
        file: String,
        frame: u32,
        backup: BackupId,
        cleared: Vec<AnnotationId>,
    },
    /// A cleared slice was brought back from its backup.
    Restore {
        trace: TraceId,
        file: String,
        frame: u32,
    },
}

/// Everything a replay may touch.
pub struct ReplayTarget<'a> {
    pub store: &'a mut AnnotationStore,
    pub snapshots: &'a mut dyn SnapshotSink,
    /// Project root and bundles, needed to snapshot the full document.
    pub root: &'a Path,
    pub files: &'a [FileBundle],
}

impl ReplayTarget<'_> {
    fn snapshot(&mut self) -> Result<BackupId> {
        let doc = self.store.to_document(self.root, self.files);
        self.snapshots.write_snapshot(&doc)
    }
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Add(_) => "add",
            Command::Delete(_) => "delete",
            Command::Move { .. } => "move",
            Command::Recolor { .. } => "recolor",
            Command::Rename { .. } => "rename",
            Command::Clear { .. } => "clear",
            Command::Restore { .. } => "restore",
        }
    }

    /// Reverse this command's effect and return its inverse, or `None` if
    /// the store refused (e.g. the trace is gone or a name is now taken).
    fn replay(&self, target: &mut ReplayTarget<'_>) -> Result<Option<Command>> {
        let inverse = match self {
            Command::Add(ids) => {
                for id in ids {
                    target.store.remove(*id);
                }
                Some(Command::Delete(ids.clone()))
            }
            Command::Delete(ids) => {
                for id in ids {
                    target.store.restore(*id);
                }
                Some(Command::Add(ids.clone()))
            }
            Command::Move { origins, dx, dy } => {
                let displaced = origins
                    .iter()
                    .filter_map(|(id, origin)| {
                        target
                            .store
                            .set_position(*id, *origin)
                            .map(|current| (*id, current))
                    })
                    .collect();
                Some(Command::Move {
                    origins: displaced,
                    dx: -dx,
                    dy: -dy,
                })
            }
            Command::Recolor { trace, color } => target
                .store
                .recolor(*trace, *color)
                .map(|previous| Command::Recolor {
                    trace: *trace,
                    color: previous,
                }),
            Command::Rename { trace, name } => {
                target
                    .store
                    .rename(*trace, name)
                    .map(|previous| Command::Rename {
                        trace: *trace,
                        name: previous,
                    })
            }
            Command::Clear {
                trace,
                file,
                frame,
                backup,
                cleared,
            } => {
                let doc = target.snapshots.restore_snapshot(backup)?;
                target.store.reload(&doc, cleared);
                log::info!("Restored {} frame {} from backup {}", file, frame, backup);
                Some(Command::Restore {
                    trace: *trace,
                    file: file.clone(),
                    frame: *frame,
                })
            }
            Command::Restore { trace, file, frame } => {
                let backup = target.snapshot()?;
                let cleared = target.store.clear(*trace, file, *frame);
                Some(Command::Clear {
                    trace: *trace,
                    file: file.clone(),
                    frame: *frame,
                    backup,
                    cleared,
                })
            }
        };
        target.store.unselect_all();
        Ok(inverse)
    }
}

/// Outcome of an undo or redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// The command was reversed and its inverse recorded.
    Applied,
    /// The command could no longer be applied and was dropped.
    Rejected,
    /// Nothing to undo/redo.
    Empty,
}

/// History system for undo/redo functionality.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    /// Undo stack (most recent last)
    undo_stack: Vec<Command>,
    /// Redo stack (commands undone, most recent last)
    redo_stack: Vec<Command>,
    /// Maximum undo depth, if bounded
    max_size: Option<usize>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_size: Option<usize>) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Record a new action. Any new action invalidates the redo history.
    pub fn push(&mut self, command: Command) {
        log::debug!("Recorded {}", command.name());
        self.undo_stack.push(command);
        if let Some(max_size) = self.max_size {
            if self.undo_stack.len() > max_size {
                self.undo_stack.remove(0);
            }
        }
        self.redo_stack.clear();
    }

    /// Forget the redo history without recording anything, for mutations
    /// that have no undo entry of their own.
    pub fn invalidate_redo(&mut self) {
        self.redo_stack.clear();
    }

    pub fn undo(&mut self, target: &mut ReplayTarget<'_>) -> Result<Replay> {
        Self::replay_top(&mut self.undo_stack, &mut self.redo_stack, target, "undo")
    }

    pub fn redo(&mut self, target: &mut ReplayTarget<'_>) -> Result<Replay> {
        Self::replay_top(&mut self.redo_stack, &mut self.undo_stack, target, "redo")
    }

    fn replay_top(
        from: &mut Vec<Command>,
        to: &mut Vec<Command>,
        target: &mut ReplayTarget<'_>,
        what: &str,
    ) -> Result<Replay> {
        let Some(command) = from.last() else {
            log::warn!("Nothing to {}!", what);
            return Ok(Replay::Empty);
        };

        // An I/O failure leaves the command on its stack.
        let inverse = command.replay(target)?;
        let command = from.pop();
        match inverse {
            Some(inverse) => {
                log::debug!("{} {}", what, inverse.name());
                to.push(inverse);
                Ok(Replay::Applied)
            }
            None => {
                if let Some(command) = command {
                    log::warn!("Cannot {} {}: dropped", what, command.name());
                }
                Ok(Replay::Rejected)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::backup::MemorySnapshots;
    use crate::models::Color;

    struct Fixture {
        store: AnnotationStore,
        snapshots: MemorySnapshots,
        log: CommandLog,
        tongue: TraceId,
    }

    impl Fixture {
        fn new() -> Self {
            let store = AnnotationStore::new("tongue", Color::RED);
            let tongue = store.default_trace();
            Self {
                store,
                snapshots: MemorySnapshots::default(),
                log: CommandLog::new(),
                tongue,
            }
        }

        fn undo(&mut self) -> Replay {
            let mut target = ReplayTarget {
                store: &mut self.store,
                snapshots: &mut self.snapshots,
                root: Path::new("/p"),
                files: &[],
            };
            self.log.undo(&mut target).unwrap()
        }

        fn redo(&mut self) -> Replay {
            let mut target = ReplayTarget {
                store: &mut self.store,
                snapshots: &mut self.snapshots,
                root: Path::new("/p"),
                files: &[],
            };
            self.log.redo(&mut target).unwrap()
        }

        fn positions(&self) -> Vec<Point> {
            self.store
                .for_frame(self.tongue, "00", 1)
                .iter()
                .map(|a| a.position)
                .collect()
        }
    }

    #[test]
    fn test_empty_stacks_report_empty() {
        let mut f = Fixture::new();
        assert_eq!(f.undo(), Replay::Empty);
        assert_eq!(f.redo(), Replay::Empty);
    }

    #[test]
    fn test_push_clears_redo() {
        let mut f = Fixture::new();
        let a = f.store.place(f.tongue, "00", 1, Point::new(0.5, 0.5)).unwrap();
        f.log.push(Command::Add(vec![a]));
        assert_eq!(f.undo(), Replay::Applied);
        assert!(f.log.can_redo());

        let b = f.store.place(f.tongue, "00", 1, Point::new(0.1, 0.1)).unwrap();
        f.log.push(Command::Add(vec![b]));
        assert!(!f.log.can_redo());
        assert_eq!(f.redo(), Replay::Empty);
    }

    #[test]
    fn test_add_undo_redo() {
        let mut f = Fixture::new();
        let a = f.store.place(f.tongue, "00", 1, Point::new(0.5, 0.5)).unwrap();
        f.log.push(Command::Add(vec![a]));

        f.undo();
        assert!(f.positions().is_empty());
        f.redo();
        assert_eq!(f.positions(), [Point::new(0.5, 0.5)]);
        assert_eq!(f.log.undo_len(), 1);
        assert_eq!(f.log.redo_len(), 0);
    }

    #[test]
    fn test_delete_undo_redo() {
        let mut f = Fixture::new();
        let a = f.store.place(f.tongue, "00", 1, Point::new(0.5, 0.5)).unwrap();
        f.store.remove(a);
        f.log.push(Command::Delete(vec![a]));

        f.undo();
        assert_eq!(f.positions(), [Point::new(0.5, 0.5)]);
        f.redo();
        assert!(f.positions().is_empty());
    }

    #[test]
    fn test_move_undo_is_exact() {
        let mut f = Fixture::new();
        let a = f.store.place(f.tongue, "00", 1, Point::new(0.2, 0.2)).unwrap();
        let origins = f.store.translate(&[a], 0.1, 0.0);
        f.log.push(Command::Move {
            origins,
            dx: 0.1,
            dy: 0.0,
        });
        let moved = f.positions();

        f.undo();
        assert_eq!(f.positions(), [Point::new(0.2, 0.2)]);
        f.redo();
        assert_eq!(f.positions(), moved);
        f.undo();
        assert_eq!(f.positions(), [Point::new(0.2, 0.2)]);
    }

    #[test]
    fn test_move_inverse_negates_delta() {
        let mut f = Fixture::new();
        let a = f.store.place(f.tongue, "00", 1, Point::new(0.2, 0.2)).unwrap();
        let origins = f.store.translate(&[a], 0.1, -0.05);
        f.log.push(Command::Move {
            origins,
            dx: 0.1,
            dy: -0.05,
        });
        f.undo();

        match f.log.redo_stack.last() {
            Some(Command::Move { origins, dx, dy }) => {
                assert_eq!((*dx, *dy), (-0.1, 0.05));
                assert_eq!(origins[0].0, a);
            }
            other => panic!("expected a move, got {:?}", other),
        }
    }

    #[test]
    fn test_recolor_ping_pong() {
        let mut f = Fixture::new();
        let previous = f.store.recolor(f.tongue, Color::BLUE).unwrap();
        f.log.push(Command::Recolor {
            trace: f.tongue,
            color: previous,
        });

        f.undo();
        assert_eq!(f.store.trace(f.tongue).unwrap().color, Color::RED);
        f.redo();
        assert_eq!(f.store.trace(f.tongue).unwrap().color, Color::BLUE);
        f.undo();
        assert_eq!(f.store.trace(f.tongue).unwrap().color, Color::RED);
    }

    #[test]
    fn test_rename_ping_pong() {
        let mut f = Fixture::new();
        let previous = f.store.rename(f.tongue, "dorsum").unwrap();
        f.log.push(Command::Rename {
            trace: f.tongue,
            name: previous,
        });

        f.undo();
        assert_eq!(f.store.trace(f.tongue).unwrap().name, "tongue");
        f.redo();
        assert_eq!(f.store.trace(f.tongue).unwrap().name, "dorsum");
    }

    #[test]
    fn test_rename_replay_rejected_when_name_taken() {
        let mut f = Fixture::new();
        let previous = f.store.rename(f.tongue, "dorsum").unwrap();
        f.log.push(Command::Rename {
            trace: f.tongue,
            name: previous,
        });
        f.store.new_trace("tongue").unwrap();

        assert_eq!(f.undo(), Replay::Rejected);
        assert_eq!(f.store.trace(f.tongue).unwrap().name, "dorsum");
        assert!(!f.log.can_undo());
        assert!(!f.log.can_redo());
    }

    #[test]
    fn test_clear_restore_from_backup() {
        let mut f = Fixture::new();
        let a = f.store.place(f.tongue, "00", 1, Point::new(0.1, 0.1)).unwrap();
        let b = f.store.place(f.tongue, "00", 1, Point::new(0.2, 0.2)).unwrap();
        let doc = f.store.to_document(Path::new("/p"), &[]);
        let backup = f.snapshots.write_snapshot(&doc).unwrap();
        let cleared = f.store.clear(f.tongue, "00", 1);
        f.log.push(Command::Clear {
            trace: f.tongue,
            file: "00".to_string(),
            frame: 1,
            backup,
            cleared,
        });

        f.undo();
        let ids: Vec<AnnotationId> = f
            .store
            .for_frame(f.tongue, "00", 1)
            .iter()
            .map(|x| x.id)
            .collect();
        assert_eq!(ids, [a, b]);

        f.redo();
        assert!(f.positions().is_empty());
        assert_eq!(f.snapshots.len(), 2);

        f.undo();
        assert_eq!(f.positions(), [Point::new(0.1, 0.1), Point::new(0.2, 0.2)]);
    }

    #[test]
    fn test_unknown_backup_keeps_command() {
        let mut f = Fixture::new();
        f.log.push(Command::Clear {
            trace: f.tongue,
            file: "00".to_string(),
            frame: 1,
            backup: BackupId("missing".to_string()),
            cleared: Vec::new(),
        });
        let mut target = ReplayTarget {
            store: &mut f.store,
            snapshots: &mut f.snapshots,
            root: Path::new("/p"),
            files: &[],
        };
        assert!(f.log.undo(&mut target).is_err());
        assert!(f.log.can_undo());
    }

    #[test]
    fn test_undo_clears_selection() {
        let mut f = Fixture::new();
        let a = f.store.place(f.tongue, "00", 1, Point::new(0.5, 0.5)).unwrap();
        let b = f.store.place(f.tongue, "00", 1, Point::new(0.6, 0.5)).unwrap();
        f.log.push(Command::Add(vec![b]));
        f.store.select(a);
        f.undo();
        assert!(!f.store.is_selected(a));
    }

    #[test]
    fn test_history_limit() {
        let mut log = CommandLog::with_limit(Some(2));
        for i in 0..4 {
            log.push(Command::Add(vec![AnnotationId(i)]));
        }
        assert_eq!(log.undo_len(), 2);
        assert_eq!(log.undo_stack[0], Command::Add(vec![AnnotationId(2)]));
    }
}
