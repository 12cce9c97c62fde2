// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Pixel-space bounding boxes.
//!
//! Boxes are held as inclusive corner coordinates, the form produced when
//! scanning a mask, and converted to COCO `[left, top, width, height]` on
//! output. A box covering the single pixel `(3, 4)` is `x_min = x_max = 3`,
//! `y_min = y_max = 4` and has COCO form `[3, 4, 1, 1]`.

use serde::{Deserialize, Serialize};

/// How a manifest encodes the four bounding box columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BboxConvention {
    /// `x_min y_min x_max y_max`, maxima inclusive.
    #[default]
    Corners,
    /// `left top width height`, already in COCO form.
    Xywh,
}

/// Axis-aligned box with inclusive integer corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    /// Box containing exactly one pixel.
    pub fn from_point(x: u32, y: u32) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
        }
    }

    /// Grow the box so it contains `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
    }

    /// Build a box from four manifest columns interpreted with `convention`.
    ///
    /// Returns `None` for degenerate input: inverted corners or a zero
    /// width/height.
    pub fn from_columns(values: [u32; 4], convention: BboxConvention) -> Option<Self> {
        let [a, b, c, d] = values;
        match convention {
            BboxConvention::Corners => (c >= a && d >= b).then_some(Self {
                x_min: a,
                y_min: b,
                x_max: c,
                y_max: d,
            }),
            BboxConvention::Xywh => {
                if c == 0 || d == 0 {
                    return None;
                }
                Some(Self {
                    x_min: a,
                    y_min: b,
                    x_max: a.checked_add(c - 1)?,
                    y_max: b.checked_add(d - 1)?,
                })
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }

    /// COCO `[left, top, width, height]`.
    pub fn to_coco(&self) -> [u32; 4] {
        [self.x_min, self.y_min, self.width(), self.height()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners_to_coco() {
        let bbox = BoundingBox::from_columns([10, 20, 29, 24], BboxConvention::Corners).unwrap();
        assert_eq!(bbox.to_coco(), [10, 20, 20, 5]);
    }

    #[test]
    fn test_xywh_is_preserved() {
        let bbox = BoundingBox::from_columns([10, 20, 20, 5], BboxConvention::Xywh).unwrap();
        assert_eq!(bbox.x_max, 29);
        assert_eq!(bbox.y_max, 24);
        assert_eq!(bbox.to_coco(), [10, 20, 20, 5]);
    }

    #[test]
    fn test_degenerate_columns_rejected() {
        assert!(BoundingBox::from_columns([10, 10, 5, 20], BboxConvention::Corners).is_none());
        assert!(BoundingBox::from_columns([10, 10, 0, 20], BboxConvention::Xywh).is_none());
    }

    #[test]
    fn test_include_grows_box() {
        let mut bbox = BoundingBox::from_point(5, 5);
        bbox.include(2, 9);
        bbox.include(7, 3);
        assert_eq!(bbox.to_coco(), [2, 3, 6, 7]);
        assert!(bbox.contains(2, 3));
        assert!(!bbox.contains(8, 3));
    }
}
