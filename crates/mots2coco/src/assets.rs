// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Copying referenced frames into the output image directory.

use crate::Error;
use std::{collections::HashSet, path::Path, path::PathBuf};

/// Copies source frames next to the converted annotations.
///
/// Destination directories are created on first use. With copying disabled
/// every call is a no-op.
#[derive(Debug, Default)]
pub struct AssetStore {
    copy: bool,
    created: HashSet<PathBuf>,
    copied: usize,
}

impl AssetStore {
    pub fn new(copy: bool) -> Self {
        Self {
            copy,
            created: HashSet::new(),
            copied: 0,
        }
    }

    /// Number of files copied so far.
    pub fn copied(&self) -> usize {
        self.copied
    }

    /// Copy `source` to `destination`.
    ///
    /// Fails with [`Error::MissingSourceAsset`] when `source` is not a file.
    pub fn copy(&mut self, source: &Path, destination: &Path) -> Result<(), Error> {
        if !self.copy {
            return Ok(());
        }
        if !source.is_file() {
            return Err(Error::MissingSourceAsset(source.to_path_buf()));
        }

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
            && !self.created.contains(parent)
        {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
                log::info!("Directory {} is created", parent.display());
            }
            self.created.insert(parent.to_path_buf());
        }

        std::fs::copy(source, destination)?;
        self.copied += 1;
        log::debug!("Copied {} to {}", source.display(), destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("frame.jpg");
        std::fs::write(&source, [0xFF, 0xD8, 0xFF]).unwrap();
        let destination = temp_dir.path().join("out/images/2_frame.jpg");

        let mut store = AssetStore::new(true);
        store.copy(&source, &destination).unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(store.copied(), 1);
    }

    #[test]
    fn test_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = AssetStore::new(true);
        let err = store
            .copy(
                &temp_dir.path().join("missing.jpg"),
                &temp_dir.path().join("out.jpg"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::MissingSourceAsset(_)));
    }

    #[test]
    fn test_disabled_copy_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("out/frame.jpg");

        let mut store = AssetStore::new(false);
        store
            .copy(&temp_dir.path().join("missing.jpg"), &destination)
            .unwrap();
        assert!(!destination.exists());
        assert_eq!(store.copied(), 0);
    }
}
