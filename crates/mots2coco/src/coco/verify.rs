// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO document verification.
//!
//! Checks the structural guarantees a converted document must hold:
//! annotation ids are exactly `1..=N` in document order, every annotation
//! references an existing image and category, image ids are unique, and boxes
//! and mask sizes agree with their image.

use super::types::{CocoDocument, CocoIndex};
use std::{collections::HashSet, fmt};

/// How many offending ids the report prints per check.
const MAX_LISTED: usize = 5;

/// Result of verifying one document.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub image_count: usize,
    pub annotation_count: usize,
    pub category_count: usize,
    /// Image ids occurring more than once.
    pub duplicate_image_ids: Vec<u64>,
    /// Category ids occurring more than once.
    pub duplicate_category_ids: Vec<u32>,
    /// Annotation ids not equal to their 1-based position.
    pub out_of_sequence_ids: Vec<u64>,
    /// Annotations whose `image_id` names no image.
    pub dangling_annotations: Vec<u64>,
    /// Annotations whose `category_id` names no category.
    pub unknown_categories: Vec<u64>,
    /// Annotations with an empty box or one leaving the image.
    pub invalid_boxes: Vec<u64>,
    /// Annotations whose mask size differs from the image size.
    pub size_mismatches: Vec<u64>,
}

impl VerificationReport {
    /// Returns true if the document passed all checks.
    pub fn is_valid(&self) -> bool {
        self.duplicate_image_ids.is_empty()
            && self.duplicate_category_ids.is_empty()
            && self.out_of_sequence_ids.is_empty()
            && self.dangling_annotations.is_empty()
            && self.unknown_categories.is_empty()
            && self.invalid_boxes.is_empty()
            && self.size_mismatches.is_empty()
    }

    /// One-line-per-check summary.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "Images: {}, annotations: {}, categories: {}\n",
            self.image_count, self.annotation_count, self.category_count
        );
        for (label, count) in self.checks() {
            if count > 0 {
                s.push_str(&format!("{}: {}\n", label, count));
            }
        }
        s
    }

    fn checks(&self) -> [(&'static str, usize); 7] {
        [
            ("Duplicate image ids", self.duplicate_image_ids.len()),
            ("Duplicate category ids", self.duplicate_category_ids.len()),
            ("Out-of-sequence annotation ids", self.out_of_sequence_ids.len()),
            ("Annotations without image", self.dangling_annotations.len()),
            ("Annotations with unknown category", self.unknown_categories.len()),
            ("Invalid bounding boxes", self.invalid_boxes.len()),
            ("Mask size mismatches", self.size_mismatches.len()),
        ]
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "╔══════════════════════════════════════════════════════════════╗"
        )?;
        writeln!(
            f,
            "║                  COCO DOCUMENT VERIFICATION                  ║"
        )?;
        writeln!(
            f,
            "╠══════════════════════════════════════════════════════════════╣"
        )?;
        writeln!(f, "║ Images:      {}", self.image_count)?;
        writeln!(f, "║ Annotations: {}", self.annotation_count)?;
        writeln!(f, "║ Categories:  {}", self.category_count)?;
        writeln!(
            f,
            "╠══════════════════════════════════════════════════════════════╣"
        )?;
        write_ids(f, "Duplicate image ids", &self.duplicate_image_ids)?;
        write_ids(f, "Duplicate category ids", &self.duplicate_category_ids)?;
        write_ids(f, "Out-of-sequence ids", &self.out_of_sequence_ids)?;
        write_ids(f, "Without image", &self.dangling_annotations)?;
        write_ids(f, "Unknown category", &self.unknown_categories)?;
        write_ids(f, "Invalid boxes", &self.invalid_boxes)?;
        write_ids(f, "Size mismatches", &self.size_mismatches)?;
        let status = if self.is_valid() {
            "✓ PASSED"
        } else {
            "✗ FAILED"
        };
        writeln!(f, "║ Status: {}", status)?;
        writeln!(
            f,
            "╚══════════════════════════════════════════════════════════════╝"
        )
    }
}

fn write_ids<T: fmt::Display>(f: &mut fmt::Formatter<'_>, label: &str, ids: &[T]) -> fmt::Result {
    if ids.is_empty() {
        return writeln!(f, "║ {:<22} none", format!("{}:", label));
    }
    let listed: Vec<String> = ids.iter().take(MAX_LISTED).map(|id| id.to_string()).collect();
    write!(f, "║ {:<22} {} ({})", format!("{}:", label), ids.len(), listed.join(", "))?;
    if ids.len() > MAX_LISTED {
        write!(f, " ... and {} more", ids.len() - MAX_LISTED)?;
    }
    writeln!(f)
}

/// Check every structural guarantee of a converted document.
pub fn verify_document(document: &CocoDocument) -> VerificationReport {
    let index = CocoIndex::from_document(document);

    let mut report = VerificationReport {
        image_count: document.images.len(),
        annotation_count: document.annotations.len(),
        category_count: document.categories.len(),
        ..Default::default()
    };

    let mut seen_images = HashSet::new();
    for image in &document.images {
        if !seen_images.insert(image.id) {
            report.duplicate_image_ids.push(image.id);
        }
    }

    let mut seen_categories = HashSet::new();
    for category in &document.categories {
        if !seen_categories.insert(category.id) {
            report.duplicate_category_ids.push(category.id);
        }
    }

    for (position, ann) in document.annotations.iter().enumerate() {
        if ann.id != position as u64 + 1 {
            report.out_of_sequence_ids.push(ann.id);
        }
        if !index.categories.contains_key(&ann.category_id) {
            report.unknown_categories.push(ann.id);
        }

        let [_, _, w, h] = ann.bbox;
        if w == 0 || h == 0 {
            report.invalid_boxes.push(ann.id);
        }

        let Some(image) = index.images.get(&ann.image_id) else {
            report.dangling_annotations.push(ann.id);
            continue;
        };
        let [x, y, _, _] = ann.bbox;
        if (w > 0 && h > 0)
            && (x as u64 + w as u64 > image.width as u64 || y as u64 + h as u64 > image.height as u64)
        {
            report.invalid_boxes.push(ann.id);
        }
        if ann.segmentation.size != [image.height, image.width] {
            report.size_mismatches.push(ann.id);
        }
    }

    report
}
