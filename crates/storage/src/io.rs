// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem operations abstracted behind a trait for deterministic testing.

use crate::CheckpointError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Abstracts the durable-write primitives the checkpoint store relies on.
///
/// All filesystem access goes through this trait so crash scenarios (a
/// write that fails mid-rename, a directory fsync that errors) can be
/// exercised without touching a real disk.
pub trait IoBackend: Send + Sync + 'static {
    fn write_new(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError>;
    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError>;
    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError>;
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, CheckpointError>;
    fn remove(&self, path: &Path) -> Result<(), CheckpointError>;
    fn list_file_stems(&self, dir: &Path, extension: &str) -> Result<Vec<String>, CheckpointError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), CheckpointError>;
}

/// Production backend using real filesystem operations.
#[derive(Clone, Default)]
pub struct FsIoBackend;

impl IoBackend for FsIoBackend {
    fn write_new(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(CheckpointError::Io)?;
        }
        let mut file = File::create(path).map_err(CheckpointError::Io)?;
        file.write_all(data).map_err(CheckpointError::Io)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        let file = File::open(path).map_err(CheckpointError::Io)?;
        file.sync_all().map_err(CheckpointError::Io)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        std::fs::rename(from, to).map_err(CheckpointError::Io)
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        let dir = File::open(path).map_err(CheckpointError::Io)?;
        dir.sync_all().map_err(CheckpointError::Io)
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, CheckpointError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CheckpointError::Io(e)),
        }
    }

    fn remove(&self, path: &Path) -> Result<(), CheckpointError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckpointError::Io(e)),
        }
    }

    fn list_file_stems(&self, dir: &Path, extension: &str) -> Result<Vec<String>, CheckpointError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut stems = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(CheckpointError::Io)? {
            let entry = entry.map_err(CheckpointError::Io)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    stems.push(stem.to_string());
                }
            }
        }
        Ok(stems)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), CheckpointError> {
        std::fs::create_dir_all(path).map_err(CheckpointError::Io)
    }
}
