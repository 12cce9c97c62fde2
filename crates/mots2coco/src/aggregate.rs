// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Aggregation of per-frame records into one COCO document.
//!
//! Both the manifest parser and the label decoder produce
//! `(ImageStub, AnnotationStub)` pairs. The [`Aggregator`] owns the growing
//! image table for one run and assigns annotation ids only in
//! [`Aggregator::finalize`], so ids are always the contiguous range `1..=N`
//! in image insertion order × per-image annotation order.

use crate::{
    Error,
    bbox::BoundingBox,
    coco::{CocoAnnotation, CocoCategory, CocoCompressedRle, CocoDocument, CocoImage},
    label::SegmentedObject,
    mask::EncodedMask,
};
use std::{collections::HashMap, path::PathBuf};

/// Image metadata produced for every record, even for already-known ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStub {
    pub image_id: u64,
    pub height: u32,
    pub width: u32,
    /// Name written to the document's `file_name`.
    pub file_name: String,
    /// Frame to copy into the output tree, if the source format names one.
    pub source_path: Option<PathBuf>,
}

/// One annotation before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationStub {
    /// COCO `[left, top, width, height]`.
    pub bbox: [u32; 4],
    pub segmentation: EncodedMask,
    pub category_id: u32,
}

impl AnnotationStub {
    pub fn new(bbox: &BoundingBox, segmentation: EncodedMask, category_id: u32) -> Self {
        Self {
            bbox: bbox.to_coco(),
            segmentation,
            category_id,
        }
    }
}

impl From<SegmentedObject> for AnnotationStub {
    fn from(object: SegmentedObject) -> Self {
        Self::new(&object.bbox, object.mask, object.class_id)
    }
}

/// An image and the annotations collected for it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub image_id: u64,
    pub file_name: String,
    pub height: u32,
    pub width: u32,
    pub annotations: Vec<PendingAnnotation>,
}

/// Annotation held by an [`ImageRecord`], counts already converted to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnnotation {
    pub bbox: [u32; 4],
    pub segmentation: CocoCompressedRle,
    pub category_id: u32,
}

/// Collects records for one conversion run.
#[derive(Debug, Clone)]
pub struct Aggregator {
    categories: Vec<CocoCategory>,
    images: Vec<ImageRecord>,
    index: HashMap<u64, usize>,
}

impl Aggregator {
    /// Start a run that will emit `categories` verbatim.
    pub fn new(categories: Vec<CocoCategory>) -> Self {
        Self {
            categories,
            images: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Whether `image_id` has already been registered.
    pub fn contains(&self, image_id: u64) -> bool {
        self.index.contains_key(&image_id)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.images.iter().map(|r| r.annotations.len()).sum()
    }

    /// Register an image without adding an annotation.
    ///
    /// Returns `true` when the id was new. Metadata of an already-known id is
    /// left untouched.
    pub fn add_image(&mut self, image: ImageStub) -> bool {
        self.record_mut(image).1
    }

    /// Append one annotation, registering its image on first encounter.
    ///
    /// Fails only when the mask counts are not valid UTF-8; nothing is
    /// registered in that case.
    pub fn add(&mut self, image: ImageStub, annotation: AnnotationStub) -> Result<(), Error> {
        let counts = String::from_utf8(annotation.segmentation.counts).map_err(|e| {
            Error::InvalidRle(format!(
                "counts for image {} are not UTF-8: {}",
                image.image_id, e
            ))
        })?;

        let (record, _) = self.record_mut(image);
        record.annotations.push(PendingAnnotation {
            bbox: annotation.bbox,
            segmentation: CocoCompressedRle {
                size: annotation.segmentation.size,
                counts,
            },
            category_id: annotation.category_id,
        });
        Ok(())
    }

    /// Assign annotation ids and build the document.
    ///
    /// Returns the document and the next free annotation id (`N + 1`).
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
    pub fn finalize(self) -> (CocoDocument, u64) {
        let mut next_id = 1u64;
        let mut images = Vec::with_capacity(self.images.len());
        let mut annotations = Vec::new();

        for record in self.images {
            for pending in record.annotations {
                annotations.push(CocoAnnotation {
                    segmentation: pending.segmentation,
                    bbox: pending.bbox,
                    image_id: record.image_id,
                    category_id: pending.category_id,
                    id: next_id,
                    iscrowd: None,
                });
                next_id += 1;
            }
            images.push(CocoImage {
                file_name: record.file_name,
                height: record.height,
                width: record.width,
                id: record.image_id,
            });
        }

        let document = CocoDocument {
            categories: self.categories,
            images,
            annotations,
        };
        (document, next_id)
    }

    fn record_mut(&mut self, image: ImageStub) -> (&mut ImageRecord, bool) {
        let inserted = !self.index.contains_key(&image.image_id);
        if inserted {
            self.index.insert(image.image_id, self.images.len());
            self.images.push(ImageRecord {
                image_id: image.image_id,
                file_name: image.file_name,
                height: image.height,
                width: image.width,
                annotations: Vec::new(),
            });
        }
        let position = self.index[&image.image_id];
        (&mut self.images[position], inserted)
    }
}
