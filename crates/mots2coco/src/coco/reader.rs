// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON/ZIP readers.

use super::{
    types::CocoDocument,
    verify::verify_document,
    writer::ZIP_ANNOTATIONS_ENTRY,
};
use crate::Error;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

/// Options for COCO reading.
#[derive(Debug, Clone, Default)]
pub struct CocoReadOptions {
    /// If true, reject documents that fail [`verify_document`].
    pub validate: bool,
}

/// COCO reader for documents written by the conversion.
///
/// # Example
///
/// ```rust,no_run
/// use mots2coco::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let document = reader.read_json("train.json")?;
/// println!("Loaded {} images", document.images.len());
/// # Ok::<(), mots2coco::Error>(())
/// ```
pub struct CocoReader {
    options: CocoReadOptions,
}

impl CocoReader {
    /// Create a new COCO reader with default options.
    pub fn new() -> Self {
        Self {
            options: CocoReadOptions::default(),
        }
    }

    /// Create a new COCO reader with custom options.
    pub fn with_options(options: CocoReadOptions) -> Self {
        Self { options }
    }

    /// Read a COCO document from a JSON file.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDocument, Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        let document: CocoDocument = serde_json::from_reader(reader)?;
        self.check(document)
    }

    /// Read the annotations entry of a ZIP archive written by
    /// [`CocoWriter::write_zip`](super::CocoWriter::write_zip).
    pub fn read_zip<P: AsRef<Path>>(&self, path: P) -> Result<CocoDocument, Error> {
        let file = File::open(path.as_ref())?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut entry = archive.by_name(ZIP_ANNOTATIONS_ENTRY)?;

        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        let document: CocoDocument = serde_json::from_str(&contents)?;
        self.check(document)
    }

    /// Read either format, choosing by extension.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<CocoDocument, Error> {
        let is_zip = path
            .as_ref()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip {
            self.read_zip(path)
        } else {
            self.read_json(path)
        }
    }

    fn check(&self, document: CocoDocument) -> Result<CocoDocument, Error> {
        if self.options.validate {
            let report = verify_document(&document);
            if !report.is_valid() {
                return Err(Error::CocoError(report.summary()));
            }
        }
        Ok(document)
    }
}

impl Default for CocoReader {
    fn default() -> Self {
        Self::new()
    }
}
