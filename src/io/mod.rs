// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for project discovery, documents, backups and media.

pub mod backup;
pub mod catalog;
pub mod legacy;
pub mod media;
pub mod serialization;
