// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end conversion runs.
//!
//! Two pipelines feed the same [`Aggregator`]:
//!
//! - [`convert_manifest`] reads a text manifest line by line, copying each
//!   referenced frame the first time its image id is seen.
//! - [`convert_label_dir`] walks `instances/{group}/{frame}.png`, decodes the
//!   frames in parallel and merges them in sorted order.
//!
//! [`emit`] writes the finished document. Nothing is written before the whole
//! input has been consumed.

use crate::{
    Error,
    aggregate::{Aggregator, AnnotationStub, ImageStub},
    assets::AssetStore,
    coco::{CocoDocument, CocoWriteOptions, CocoWriter},
    label::{self, LabelImage, SegmentedObject},
    manifest::ManifestParser,
    mask::{CocoRleCodec, MaskCodec},
    settings::{OutputSettings, Settings},
};
use rayon::prelude::*;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Label image extension looked for by [`discover_frames`].
pub const LABEL_EXT: &str = "png";

/// Counts reported after a conversion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub images: usize,
    pub annotations: usize,
    /// One past the last assigned annotation id.
    pub next_free_id: u64,
    /// Manifest lines that were malformed or whose frame was missing.
    pub skipped_lines: usize,
    /// Label images that could not be decoded.
    pub skipped_frames: usize,
    pub copied_images: usize,
}

impl ConversionSummary {
    /// Id of the last annotation, `0` when there are none.
    pub fn last_annotation_id(&self) -> u64 {
        self.next_free_id.saturating_sub(1)
    }
}

/// A finished document and how it was produced.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub document: CocoDocument,
    pub summary: ConversionSummary,
}

impl Conversion {
    fn finish(aggregator: Aggregator, mut summary: ConversionSummary) -> Self {
        summary.images = aggregator.image_count();
        summary.annotations = aggregator.annotation_count();
        let (document, next_free_id) = aggregator.finalize();
        summary.next_free_id = next_free_id;
        Conversion { document, summary }
    }
}

/// Convert every line of a manifest.
///
/// Blank lines are ignored. Lines that fail to parse are logged and skipped.
/// A missing source frame skips its line too, unless `settings.strict` is set,
/// in which case the run fails with [`Error::MissingSourceAsset`].
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn convert_manifest<R: BufRead, C: MaskCodec>(
    reader: R,
    parser: &ManifestParser<C>,
    assets: &mut AssetStore,
    settings: &Settings,
) -> Result<Conversion, Error> {
    let mut aggregator = Aggregator::new(settings.categories.clone());
    let mut summary = ConversionSummary::default();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let (image, annotation) = match parser.parse(&line) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("Skipping line {}: {}", number + 1, err);
                summary.skipped_lines += 1;
                continue;
            }
        };

        if !aggregator.contains(image.image_id)
            && let Some(source) = &image.source_path
        {
            match assets.copy(source, Path::new(&image.file_name)) {
                Ok(()) => {}
                Err(Error::MissingSourceAsset(path)) if !settings.strict => {
                    log::warn!(
                        "Skipping line {}: source frame {} does not exist",
                        number + 1,
                        path.display()
                    );
                    summary.skipped_lines += 1;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        aggregator.add(image, annotation)?;
    }

    summary.copied_images = assets.copied();
    Ok(Conversion::finish(aggregator, summary))
}

/// Convert a manifest file, copying frames from `source_root` into
/// `images_dir`.
///
/// The file stem names the sequence for the MOTS layout, whose lines carry no
/// group column.
pub fn convert_manifest_file(
    path: &Path,
    source_root: &Path,
    images_dir: &Path,
    settings: &Settings,
) -> Result<Conversion, Error> {
    let sequence = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parser = ManifestParser::new(settings.manifest.clone(), source_root, images_dir)
        .with_sequence(sequence);
    let mut assets = AssetStore::new(settings.copy_images);

    log::info!("Converting manifest {}", path.display());
    let reader = BufReader::new(File::open(path)?);
    let conversion = convert_manifest(reader, &parser, &mut assets, settings)?;
    log::info!(
        "Parsed {} annotations on {} images ({} lines skipped)",
        conversion.summary.annotations,
        conversion.summary.images,
        conversion.summary.skipped_lines
    );
    Ok(conversion)
}

/// One label image found under the instances directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LabelFrame {
    /// Sequence directory name.
    pub group: String,
    /// Frame file stem.
    pub frame: String,
    pub path: PathBuf,
}

/// Find `{group}/{frame}.png` label images, sorted by group then frame.
pub fn discover_frames(instances_dir: &Path) -> Result<Vec<LabelFrame>, Error> {
    let mut frames = Vec::new();
    for entry in WalkDir::new(instances_dir).min_depth(2).max_depth(2) {
        let entry = entry?;
        let path = entry.path();
        let is_label = entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(LABEL_EXT));
        if !is_label {
            continue;
        }

        let group = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let frame = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        frames.push(LabelFrame {
            group,
            frame,
            path: path.to_path_buf(),
        });
    }

    frames.sort();
    Ok(frames)
}

/// Convert a directory of instance label images.
///
/// Frames get image ids `first_image_id, first_image_id + 1, ...` in sorted
/// order. A frame that cannot be decoded is logged and skipped without
/// shifting the ids of later frames. Frames without instances still get an
/// image entry.
#[cfg_attr(feature = "profiling", tracing::instrument(skip(settings)))]
pub fn convert_label_dir(instances_dir: &Path, settings: &Settings) -> Result<Conversion, Error> {
    let divisor = settings.id_divisor()?;
    let frames = discover_frames(instances_dir)?;
    log::info!(
        "Decoding {} label images from {}",
        frames.len(),
        instances_dir.display()
    );

    let codec = CocoRleCodec;
    let decoded: Vec<Result<(u32, u32, Vec<SegmentedObject>), Error>> = frames
        .par_iter()
        .map(|frame| {
            let label = LabelImage::open(&frame.path)?;
            let objects = label::decode(&label, divisor, &codec);
            Ok((label.height(), label.width(), objects))
        })
        .collect();

    let mut aggregator = Aggregator::new(settings.categories.clone());
    let mut summary = ConversionSummary::default();
    let first_id = settings.labels.first_image_id;

    for (position, (frame, result)) in frames.iter().zip(decoded).enumerate() {
        let (height, width, objects) = match result {
            Ok(decoded) => decoded,
            Err(err) => {
                log::warn!("Skipping frame {}: {}", frame.path.display(), err);
                summary.skipped_frames += 1;
                continue;
            }
        };

        let image = ImageStub {
            image_id: first_id + position as u64,
            height,
            width,
            file_name: format!(
                "{}/{}.{}",
                frame.group, frame.frame, settings.labels.image_ext
            ),
            source_path: None,
        };
        log::debug!(
            "Frame {}/{}: {} instances",
            frame.group,
            frame.frame,
            objects.len()
        );

        aggregator.add_image(image.clone());
        for object in objects {
            aggregator.add(image.clone(), AnnotationStub::from(object))?;
        }
    }

    Ok(Conversion::finish(aggregator, summary))
}

/// Write a finished document to `output`.
///
/// A `.zip` output packs the annotations together with every referenced
/// frame under `images/`, named by its path relative to `images_base`, and
/// the packed `file_name`s are rewritten to match. Any other extension gets
/// plain JSON. Returns the number of annotations written.
#[cfg_attr(feature = "profiling", tracing::instrument(skip(conversion, options)))]
pub fn emit(
    conversion: &Conversion,
    output: &Path,
    options: &OutputSettings,
    images_base: &Path,
) -> Result<usize, Error> {
    let writer = CocoWriter::with_options(CocoWriteOptions {
        compress: options.compress,
        pretty: options.pretty,
    });

    let is_zip = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip {
        writer.write_zip_with_images(&conversion.document, images_base, output)?;
    } else {
        writer.write_json(&conversion.document, output)?;
    }

    let count = conversion.document.annotations.len();
    log::info!(
        "Wrote {} annotations to {} (last annotation id: {})",
        count,
        output.display(),
        conversion.summary.last_annotation_id()
    );
    Ok(count)
}
