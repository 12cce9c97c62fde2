// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON data structures for serde serialization/deserialization.
//!
//! Only the subset produced by MOTS conversion is modelled: categories,
//! images, and instance annotations carrying compressed RLE masks. Field
//! declaration order is the order fields appear in the written JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level COCO document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoDocument {
    /// Fixed category table.
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
    /// One entry per frame, in first-seen order.
    pub images: Vec<CocoImage>,
    /// One entry per object instance, ids `1..=N`.
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
}

/// Category definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCategory {
    /// Parent category name (e.g., "vehicle" for "car").
    #[serde(default)]
    pub supercategory: String,
    /// Unique category ID.
    pub id: u32,
    /// Category name (e.g., "person", "car").
    pub name: String,
}

/// Image metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoImage {
    /// Path of the frame, as written by the conversion.
    pub file_name: String,
    /// Image height in pixels.
    pub height: u32,
    /// Image width in pixels.
    pub width: u32,
    /// Unique image ID.
    pub id: u64,
}

/// Instance annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// Compressed RLE mask of the instance.
    pub segmentation: CocoCompressedRle,
    /// Bounding box: `[left, top, width, height]` in pixels.
    pub bbox: [u32; 4],
    /// ID of the image containing this object.
    pub image_id: u64,
    /// Category ID of this object.
    pub category_id: u32,
    /// Unique annotation ID.
    pub id: u64,
    /// Crowd flag; never set by conversion, consumers treat absence as 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iscrowd: Option<u8>,
}

/// Compressed RLE segmentation (pycocotools string encoding).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCompressedRle {
    /// Mask size as `[height, width]` (NOT `[width, height]`!)
    pub size: [u32; 2],
    /// Encoded counts string, carried verbatim.
    pub counts: String,
}

/// Lookup tables over a [`CocoDocument`].
#[derive(Debug, Clone)]
pub struct CocoIndex {
    /// `image_id` → `CocoImage`
    pub images: HashMap<u64, CocoImage>,
    /// `category_id` → `CocoCategory`
    pub categories: HashMap<u32, CocoCategory>,
}

impl CocoIndex {
    /// Build lookup index from a `CocoDocument`.
    pub fn from_document(document: &CocoDocument) -> Self {
        let images: HashMap<_, _> = document
            .images
            .iter()
            .map(|img| (img.id, img.clone()))
            .collect();

        let categories: HashMap<_, _> = document
            .categories
            .iter()
            .map(|cat| (cat.id, cat.clone()))
            .collect();

        Self { images, categories }
    }
}
