// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # MOTS to COCO Conversion Library
//!
//! Converts Multi-Object Tracking and Segmentation (MOTS) annotations into a
//! single COCO instance-segmentation document with compressed RLE masks.
//!
//! ## Features
//!
//! - **Label images**: 16-bit instance maps (`class_id * 1000 + index` per
//!   pixel) decoded into one mask, box and category per instance
//! - **Text manifests**: pre-encoded RLE lines in the extended 12-column
//!   layout or the canonical 6-column MOTS layout
//! - **Aggregation**: images deduplicated by id, annotation ids assigned as
//!   the contiguous range `1..=N`
//! - **Output**: compact or pretty JSON, optionally packed into a ZIP
//!   archive together with the referenced frames
//! - **Verification**: structural checks over any written document
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mots2coco::{Settings, convert_label_dir, emit};
//! use std::path::Path;
//!
//! let settings = Settings::default();
//! let conversion = convert_label_dir(Path::new("data/instances"), &settings)?;
//! emit(
//!     &conversion,
//!     Path::new("annotations/train.json"),
//!     &settings.output,
//!     Path::new("data"),
//! )?;
//! println!("last annotation id: {}", conversion.summary.last_annotation_id());
//! # Ok::<(), mots2coco::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: wraps the conversion stages in `tracing` spans

mod aggregate;
mod assets;
mod bbox;
pub mod coco;
mod error;
mod label;
mod manifest;
mod mask;
mod pipeline;
mod settings;

pub use crate::{
    aggregate::{Aggregator, AnnotationStub, ImageRecord, ImageStub, PendingAnnotation},
    assets::AssetStore,
    bbox::{BboxConvention, BoundingBox},
    error::{Error, ParseError},
    label::{LabelImage, SegmentedObject, decode},
    manifest::{MOTS_FIELDS, ManifestParser},
    mask::{BinaryMask, CocoRleCodec, EncodedMask, MaskCodec, Rle},
    pipeline::{
        Conversion, ConversionSummary, LABEL_EXT, LabelFrame, convert_label_dir, convert_manifest,
        convert_manifest_file, discover_frames, emit,
    },
    settings::{
        DEFAULT_ID_DIVISOR, ENV_PREFIX, ExtendedColumns, LabelSettings, ManifestFormat,
        ManifestSettings, OutputSettings, Settings, default_categories,
    },
};
