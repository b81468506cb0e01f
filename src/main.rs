// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UltraTrace - open a project directory and report what it holds.
//!
//! Usage: `ultratrace <project-dir> [settings-file]`
//!
//! Opening a project for the first time scans it and writes its document.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use ultratrace::{Session, Settings};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let mut args = std::env::args_os().skip(1);
    let Some(root) = args.next().map(PathBuf::from) else {
        bail!("usage: ultratrace <project-dir> [settings-file]");
    };

    let settings = match args.next().map(PathBuf::from) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let session = Session::open(&root, settings)
        .with_context(|| format!("Failed to open project {}", root.display()))?;

    let store = session.store();
    println!("{}", session.catalog().root().display());
    println!("  files: {}", session.catalog().bundles().len());
    for trace in store.traces() {
        let frames: usize = session
            .catalog()
            .bundles()
            .iter()
            .map(|b| store.traced_frames(trace.id, &b.name).len())
            .sum();
        let marker = if trace.id == store.default_trace() { "*" } else { " " };
        println!("  {} {:<12} {} ({} traced frames)", marker, trace.name, trace.color, frames);
    }

    Ok(())
}
