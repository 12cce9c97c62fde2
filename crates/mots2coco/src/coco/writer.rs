// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON/ZIP writers.

use super::types::CocoDocument;
use crate::Error;
use std::{
    collections::HashSet,
    fs::File,
    io::{BufWriter, Write},
    path::{Component, Path, PathBuf},
};
use zip::{CompressionMethod, write::SimpleFileOptions};

/// Entry name of the annotations inside a ZIP archive.
pub const ZIP_ANNOTATIONS_ENTRY: &str = "annotations/instances.json";

/// Options for COCO writing.
#[derive(Debug, Clone)]
pub struct CocoWriteOptions {
    /// Compress output (for ZIP).
    pub compress: bool,
    /// Pretty-print JSON with indentation.
    pub pretty: bool,
}

impl Default for CocoWriteOptions {
    fn default() -> Self {
        Self {
            compress: true,
            pretty: false,
        }
    }
}

/// COCO writer for generating JSON and ZIP files.
///
/// # Example
///
/// ```rust,no_run
/// use mots2coco::coco::{CocoDocument, CocoWriter};
///
/// let writer = CocoWriter::new();
/// let document = CocoDocument::default();
/// writer.write_json(&document, "train.json")?;
/// # Ok::<(), mots2coco::Error>(())
/// ```
pub struct CocoWriter {
    options: CocoWriteOptions,
}

impl CocoWriter {
    /// Create a new COCO writer with default options.
    pub fn new() -> Self {
        Self {
            options: CocoWriteOptions::default(),
        }
    }

    /// Create a new COCO writer with custom options.
    pub fn with_options(options: CocoWriteOptions) -> Self {
        Self { options }
    }

    /// Write a COCO document to a JSON file.
    ///
    /// # Arguments
    /// * `document` - The COCO document to write
    /// * `path` - Output file path
    pub fn write_json<P: AsRef<Path>>(&self, document: &CocoDocument, path: P) -> Result<(), Error> {
        ensure_parent(path.as_ref())?;

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, document)?;
        } else {
            serde_json::to_writer(&mut writer, document)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write a COCO document to a ZIP file with images.
    ///
    /// Creates a ZIP archive with:
    /// - `annotations/instances.json` - The COCO annotations
    /// - Images under the names supplied by `images`
    ///
    /// # Arguments
    /// * `document` - The COCO document to write
    /// * `images` - Iterator of `(entry_name, image_data)` pairs
    /// * `path` - Output ZIP file path
    pub fn write_zip<P: AsRef<Path>>(
        &self,
        document: &CocoDocument,
        images: impl Iterator<Item = (String, Vec<u8>)>,
        path: P,
    ) -> Result<(), Error> {
        ensure_parent(path.as_ref())?;

        let file = File::create(path.as_ref())?;
        let mut zip = zip::ZipWriter::new(file);

        let options = if self.options.compress {
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
        } else {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        };

        zip.start_file(ZIP_ANNOTATIONS_ENTRY, options)?;
        let json = if self.options.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };
        zip.write_all(json.as_bytes())?;

        for (name, data) in images {
            zip.start_file(&name, options)?;
            zip.write_all(&data)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Write a COCO document to a ZIP file, packing every image it references.
    ///
    /// Each image's `file_name` is read from disk. Names already under
    /// `base_dir` are used as-is, other relative names resolve against it.
    /// The image is stored as `images/<name>` where `<name>` is its path
    /// relative to `base_dir`, and the packed annotations carry that same
    /// relative `file_name`. Unreadable images are logged and left out.
    pub fn write_zip_with_images<P: AsRef<Path>>(
        &self,
        document: &CocoDocument,
        base_dir: &Path,
        path: P,
    ) -> Result<(), Error> {
        let mut packed = document.clone();
        let mut sources = Vec::with_capacity(packed.images.len());
        let mut seen = HashSet::new();

        for image in &mut packed.images {
            let (source, name) = archive_name(base_dir, &image.file_name, image.id);
            if seen.insert(name.clone()) {
                sources.push((source, name.clone()));
            }
            image.file_name = name;
        }

        let images = sources.into_iter().filter_map(|(source, name)| {
            match std::fs::read(&source) {
                Ok(data) => Some((format!("images/{}", name), data)),
                Err(e) => {
                    log::warn!("Skipping image {}: {}", source.display(), e);
                    None
                }
            }
        });

        self.write_zip(&packed, images, path)
    }
}

/// Source path and `/`-separated archive name of an image relative to
/// `base_dir`. Root, prefix and `..` components never reach the name.
fn archive_name(base_dir: &Path, file_name: &str, id: u64) -> (PathBuf, String) {
    let file = Path::new(file_name);
    let (source, relative) = match file.strip_prefix(base_dir) {
        Ok(relative) => (file.to_path_buf(), relative),
        Err(_) => (base_dir.join(file), file),
    };

    let name = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    if name.is_empty() {
        (source, id.to_string())
    } else {
        (source, name)
    }
}

impl Default for CocoWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_parent(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
