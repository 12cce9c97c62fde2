// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Conversion settings.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML/JSON/YAML file, then `MOTS2COCO_*` environment variables
//! (nested keys joined with `__`, e.g. `MOTS2COCO_MANIFEST__FORMAT=mots`).
//!
//! ```toml
//! id_divisor = 1000
//! copy_images = true
//!
//! [manifest]
//! format = "extended"
//! bbox = "corners"
//!
//! [[categories]]
//! id = 1
//! name = "car"
//! supercategory = "vehicle"
//! ```

use crate::{Error, bbox::BboxConvention, coco::CocoCategory};
use serde::{Deserialize, Serialize};
use std::{num::NonZeroU32, path::Path};

/// MOTS track ids encode the class as `track_id / 1000`.
pub const DEFAULT_ID_DIVISOR: u32 = 1000;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "MOTS2COCO";

/// Top-level settings for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Divisor recovering the class id from a track id.
    pub id_divisor: u32,
    /// Category table emitted verbatim in every document.
    pub categories: Vec<CocoCategory>,
    /// Manifest reader configuration.
    pub manifest: ManifestSettings,
    /// Label image reader configuration.
    pub labels: LabelSettings,
    /// Copy referenced frames into the output image directory.
    pub copy_images: bool,
    /// Abort the run when a referenced source frame is missing instead of
    /// skipping its record.
    pub strict: bool,
    /// Output formatting.
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id_divisor: DEFAULT_ID_DIVISOR,
            categories: default_categories(),
            manifest: ManifestSettings::default(),
            labels: LabelSettings::default(),
            copy_images: true,
            strict: false,
            output: OutputSettings::default(),
        }
    }
}

/// The MOTS category table: car (vehicle) and person.
pub fn default_categories() -> Vec<CocoCategory> {
    vec![
        CocoCategory {
            id: 1,
            name: "car".to_string(),
            supercategory: "vehicle".to_string(),
        },
        CocoCategory {
            id: 2,
            name: "person".to_string(),
            supercategory: "person".to_string(),
        },
    ]
}

/// Which column layout a manifest uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    /// 12 columns with an embedded bounding box, see [`ExtendedColumns`].
    #[default]
    Extended,
    /// Canonical MOTS `time_frame id class_id img_height img_width rle`.
    Mots,
}

/// Column indices of the extended manifest layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedColumns {
    pub group: usize,
    pub image_id: usize,
    pub frame_name: usize,
    pub class_id: usize,
    pub height: usize,
    pub width: usize,
    /// First of four consecutive bounding box columns.
    pub bbox: usize,
    pub rle: usize,
}

impl Default for ExtendedColumns {
    fn default() -> Self {
        Self {
            group: 0,
            image_id: 1,
            frame_name: 2,
            class_id: 4,
            height: 5,
            width: 6,
            bbox: 7,
            rle: 11,
        }
    }
}

impl ExtendedColumns {
    /// Minimum number of fields a line needs to cover every column.
    pub fn required_fields(&self) -> usize {
        [
            self.group,
            self.image_id,
            self.frame_name,
            self.class_id,
            self.height,
            self.width,
            self.bbox + 3,
            self.rle,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// Manifest reader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestSettings {
    pub format: ManifestFormat,
    pub columns: ExtendedColumns,
    /// How the extended layout's bounding box columns are to be read.
    pub bbox: BboxConvention,
    /// Directory under the source root holding `{group}/{frame}` images.
    pub image_subdir: String,
    /// Frame extension for the MOTS layout, whose lines carry no file name.
    pub image_ext: String,
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            format: ManifestFormat::Extended,
            columns: ExtendedColumns::default(),
            bbox: BboxConvention::Corners,
            image_subdir: "new_images".to_string(),
            image_ext: "jpg".to_string(),
        }
    }
}

/// Label image reader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSettings {
    /// Extension of the camera frames matching each label image.
    pub image_ext: String,
    /// Id of the first discovered frame; later frames count up from it.
    pub first_image_id: u64,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            image_ext: "jpg".to_string(),
            first_image_id: 1,
        }
    }
}

/// Document output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Pretty-print JSON with indentation.
    pub pretty: bool,
    /// Deflate entries when writing a ZIP archive.
    pub compress: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            pretty: false,
            compress: true,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        log::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Reject settings no conversion could run with.
    pub fn validate(&self) -> Result<(), Error> {
        self.id_divisor()?;

        if self.categories.is_empty() {
            return Err(Error::InvalidParameters(
                "category table must not be empty".to_string(),
            ));
        }
        let mut ids: Vec<u32> = self.categories.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.categories.len() {
            return Err(Error::InvalidParameters(
                "category ids must be unique".to_string(),
            ));
        }

        Ok(())
    }

    /// The id divisor as a non-zero value.
    pub fn id_divisor(&self) -> Result<NonZeroU32, Error> {
        NonZeroU32::new(self.id_divisor)
            .ok_or_else(|| Error::InvalidParameters("id_divisor must be non-zero".to_string()))
    }
}
