// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! MOTS label images and their decoding into object instances.
//!
//! A label image stores one object id per pixel: `0` is background, any other
//! value identifies one instance in the frame. MOTS ids follow
//! `track_id = class_id * id_divisor + instance_index` with a divisor of
//! 1000, so a pixel value of `2005` is instance 5 of class 2 (person).

use crate::{
    Error,
    bbox::BoundingBox,
    mask::{BinaryMask, EncodedMask, MaskCodec},
};
use image::DynamicImage;
use std::{collections::BTreeMap, num::NonZeroU32, path::Path};

/// Row-major grid of instance ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl LabelImage {
    /// Wrap a row-major pixel buffer of `width * height` ids.
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, Error> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(Error::DecodeError(format!(
                "label buffer has {} pixels, expected {}x{} = {}",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Read a label PNG from disk.
    ///
    /// MOTS instance maps are 16-bit grayscale; 8-bit grayscale is accepted
    /// for small synthetic sets. Pixel values are taken as-is, never rescaled.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let image = image::open(path.as_ref()).map_err(|e| {
            Error::DecodeError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_dynamic(image)
    }

    /// Convert a decoded image, rejecting anything that is not single-channel.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, Error> {
        let (width, height) = (image.width(), image.height());
        let pixels: Vec<u32> = match image {
            DynamicImage::ImageLuma16(buffer) => {
                buffer.into_raw().into_iter().map(u32::from).collect()
            }
            DynamicImage::ImageLuma8(buffer) => {
                buffer.into_raw().into_iter().map(u32::from).collect()
            }
            other => {
                return Err(Error::DecodeError(format!(
                    "unsupported label pixel format {:?}, expected 8 or 16-bit grayscale",
                    other.color()
                )));
            }
        };
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Distinct non-background ids with their tight boxes, ascending by id.
    pub fn instances(&self) -> BTreeMap<u32, BoundingBox> {
        let mut instances: BTreeMap<u32, BoundingBox> = BTreeMap::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let value = self.get(x, y);
                if value == 0 {
                    continue;
                }
                instances
                    .entry(value)
                    .and_modify(|b| b.include(x, y))
                    .or_insert_with(|| BoundingBox::from_point(x, y));
            }
        }
        instances
    }

    /// Binary mask of the pixels equal to `value`, scanning only `within`.
    fn mask_of(&self, value: u32, within: &BoundingBox) -> BinaryMask {
        let mut mask = BinaryMask::new(self.height, self.width);
        for y in within.y_min..=within.y_max {
            for x in within.x_min..=within.x_max {
                if self.get(x, y) == value {
                    mask.set(x, y);
                }
            }
        }
        mask
    }
}

/// One object instance found in a label image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedObject {
    pub mask: EncodedMask,
    pub class_id: u32,
    pub track_id: u32,
    pub bbox: BoundingBox,
}

/// Split a label image into one [`SegmentedObject`] per distinct non-zero
/// pixel value, in ascending value order.
///
/// A frame with no foreground pixels yields an empty vector.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn decode(
    label: &LabelImage,
    id_divisor: NonZeroU32,
    codec: &dyn MaskCodec,
) -> Vec<SegmentedObject> {
    label
        .instances()
        .into_iter()
        .map(|(value, bbox)| {
            let mask = label.mask_of(value, &bbox);
            SegmentedObject {
                mask: codec.encode(&mask),
                class_id: value / id_divisor,
                track_id: value,
                bbox,
            }
        })
        .collect()
}
