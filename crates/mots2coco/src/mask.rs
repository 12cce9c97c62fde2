// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Binary masks and the COCO compressed RLE codec.
//!
//! The conversion core only ever sees [`EncodedMask`] values and the
//! [`MaskCodec`] trait; the counts it carries are opaque and preserved byte for
//! byte. [`CocoRleCodec`] is the pycocotools-compatible implementation:
//!
//! - masks are scanned in **column-major** (Fortran) order
//! - runs alternate background/foreground, starting with background
//! - each run is written as 5-bit groups offset by 48, bit 5 flagging a
//!   continuation, and runs after the second are stored as the difference to
//!   the run two positions earlier

use crate::{bbox::BoundingBox, Error};

/// Binary pixel mask stored in column-major order.
///
/// Pixel `(x, y)` lives at index `y + height * x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    height: u32,
    width: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    /// All-background mask.
    pub fn new(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            data: vec![0; height as usize * width as usize],
        }
    }

    /// Wrap an existing column-major buffer.
    pub fn from_column_major(height: u32, width: u32, data: Vec<u8>) -> Result<Self, Error> {
        let expected = height as usize * width as usize;
        if data.len() != expected {
            return Err(Error::InvalidParameters(format!(
                "mask buffer has {} pixels, expected {}x{} = {}",
                data.len(),
                height,
                width,
                expected
            )));
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raw column-major pixels, `0` or `1`.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn set(&mut self, x: u32, y: u32) {
        let idx = self.index(x, y);
        self.data[idx] = 1;
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)] != 0
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.data.iter().filter(|&&v| v != 0).count() as u64
    }

    /// Smallest box containing every foreground pixel, `None` for an empty
    /// mask.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;
        for x in 0..self.width {
            for y in 0..self.height {
                if self.get(x, y) {
                    match bbox.as_mut() {
                        Some(b) => b.include(x, y),
                        None => bbox = Some(BoundingBox::from_point(x, y)),
                    }
                }
            }
        }
        bbox
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize + self.height as usize * x as usize
    }
}

/// Compact mask representation handed between the codec and the core.
///
/// `size` is `[height, width]`; `counts` is whatever the codec produced and
/// must not be altered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMask {
    pub size: [u32; 2],
    pub counts: Vec<u8>,
}

/// Encoder/decoder for binary masks.
pub trait MaskCodec: Send + Sync {
    /// Encode a binary mask into its compact form.
    fn encode(&self, mask: &BinaryMask) -> EncodedMask;

    /// Expand a compact mask back into pixels.
    fn decode(&self, encoded: &EncodedMask) -> Result<BinaryMask, Error>;

    /// Tight box around the foreground of a compact mask, `None` when it has
    /// no foreground pixels.
    fn bbox(&self, encoded: &EncodedMask) -> Result<Option<BoundingBox>, Error> {
        Ok(self.decode(encoded)?.bbox())
    }
}

/// Uncompressed run-length encoding of a [`BinaryMask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rle {
    pub height: u32,
    pub width: u32,
    /// Alternating background/foreground runs, starting with background.
    pub counts: Vec<u32>,
}

impl Rle {
    pub fn from_mask(mask: &BinaryMask) -> Self {
        let mut counts = Vec::new();
        let mut previous = 0u8;
        let mut run = 0u32;

        for &v in mask.as_slice() {
            let v = u8::from(v != 0);
            if v != previous {
                counts.push(run);
                run = 0;
                previous = v;
            }
            run += 1;
        }
        counts.push(run);

        Self {
            height: mask.height(),
            width: mask.width(),
            counts,
        }
    }

    /// Expand the runs into a mask, rejecting runs that do not add up to
    /// `height * width`.
    pub fn to_mask(&self) -> Result<BinaryMask, Error> {
        let total = self.check_size()?;

        let mut data = vec![0u8; total as usize];
        let mut pos = 0usize;
        let mut foreground = false;
        for &count in &self.counts {
            let end = pos + count as usize;
            if foreground {
                data[pos..end].fill(1);
            }
            pos = end;
            foreground = !foreground;
        }

        BinaryMask::from_column_major(self.height, self.width, data)
    }

    /// Tight box around the foreground runs, without expanding the mask.
    ///
    /// A run covering offsets `start..end` spans columns `start / height`
    /// through `(end - 1) / height`; when it wraps past a column boundary the
    /// full height of the columns in between is covered.
    pub fn bbox(&self) -> Result<Option<BoundingBox>, Error> {
        self.check_size()?;
        let height = self.height as u64;

        let mut bbox: Option<BoundingBox> = None;
        let mut include = |x: u64, y: u64| {
            let (x, y) = (x as u32, y as u32);
            match bbox.as_mut() {
                Some(b) => b.include(x, y),
                None => bbox = Some(BoundingBox::from_point(x, y)),
            }
        };

        let mut start = 0u64;
        for (i, &count) in self.counts.iter().enumerate() {
            let end = start + count as u64;
            if i % 2 == 1 && count > 0 {
                let (x0, y0) = (start / height, start % height);
                let (x1, y1) = ((end - 1) / height, (end - 1) % height);
                include(x0, y0);
                include(x1, y1);
                if x1 > x0 {
                    include(x0, height - 1);
                    include(x1, 0);
                }
            }
            start = end;
        }

        Ok(bbox)
    }

    fn check_size(&self) -> Result<u64, Error> {
        let total = self.height as u64 * self.width as u64;
        let sum: u64 = self.counts.iter().map(|&c| c as u64).sum();
        if sum != total {
            return Err(Error::InvalidRle(format!(
                "counts sum {} does not match mask size {}x{} = {}",
                sum, self.height, self.width, total
            )));
        }
        Ok(total)
    }

    /// Compressed counts string.
    pub fn to_compressed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.counts.len() * 2);
        for (i, &count) in self.counts.iter().enumerate() {
            let mut x = count as i64;
            if i > 2 {
                x -= self.counts[i - 2] as i64;
            }
            loop {
                let mut c = (x & 0x1f) as u8;
                x >>= 5;
                let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
                if more {
                    c |= 0x20;
                }
                out.push(c + 48);
                if !more {
                    break;
                }
            }
        }
        out
    }

    /// Parse a compressed counts string.
    pub fn from_compressed(bytes: &[u8], height: u32, width: u32) -> Result<Self, Error> {
        let mut counts: Vec<u32> = Vec::new();
        let mut i = 0usize;

        while i < bytes.len() {
            let mut x: i64 = 0;
            let mut shift = 0u32;
            loop {
                let Some(&byte) = bytes.get(i) else {
                    return Err(Error::InvalidRle(format!(
                        "counts string ends inside a run at byte {}",
                        i
                    )));
                };
                if !(48..48 + 64).contains(&byte) {
                    return Err(Error::InvalidRle(format!(
                        "invalid character {:?} at byte {}",
                        byte as char, i
                    )));
                }
                if shift >= 60 {
                    return Err(Error::InvalidRle(format!("run too long at byte {}", i)));
                }
                let c = (byte - 48) as i64;
                x |= (c & 0x1f) << shift;
                shift += 5;
                i += 1;
                if c & 0x20 == 0 {
                    if c & 0x10 != 0 {
                        x |= -1i64 << shift;
                    }
                    break;
                }
            }

            if counts.len() > 2 {
                x += counts[counts.len() - 2] as i64;
            }
            let count = u32::try_from(x).map_err(|_| {
                Error::InvalidRle(format!("run {} out of range: {}", counts.len(), x))
            })?;
            counts.push(count);
        }

        Ok(Self {
            height,
            width,
            counts,
        })
    }
}

/// pycocotools-compatible compressed RLE codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct CocoRleCodec;

impl MaskCodec for CocoRleCodec {
    fn encode(&self, mask: &BinaryMask) -> EncodedMask {
        EncodedMask {
            size: [mask.height(), mask.width()],
            counts: Rle::from_mask(mask).to_compressed(),
        }
    }

    fn decode(&self, encoded: &EncodedMask) -> Result<BinaryMask, Error> {
        let [height, width] = encoded.size;
        Rle::from_compressed(&encoded.counts, height, width)?.to_mask()
    }

    fn bbox(&self, encoded: &EncodedMask) -> Result<Option<BoundingBox>, Error> {
        let [height, width] = encoded.size;
        Rle::from_compressed(&encoded.counts, height, width)?.bbox()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3 rows x 4 columns, column-major:
    // col 0: [0,0,0], col 1: [1,1,1], col 2: [0,0,1], col 3: [1,0,0]
    fn sample_mask() -> BinaryMask {
        BinaryMask::from_column_major(3, 4, vec![0, 0, 0, 1, 1, 1, 0, 0, 1, 1, 0, 0]).unwrap()
    }

    #[test]
    fn test_rle_runs() {
        let rle = Rle::from_mask(&sample_mask());
        assert_eq!(rle.counts, vec![3, 3, 2, 2, 2]);
    }

    #[test]
    fn test_rle_all_foreground_starts_with_empty_run() {
        let mask = BinaryMask::from_column_major(3, 4, vec![1; 12]).unwrap();
        assert_eq!(Rle::from_mask(&mask).counts, vec![0, 12]);
    }

    #[test]
    fn test_compressed_known_string() {
        // Fourth run is stored as 2 - 3 = -1, which encodes to 'O'.
        let rle = Rle::from_mask(&sample_mask());
        assert_eq!(rle.to_compressed(), b"332O0".to_vec());

        let long = Rle {
            height: 10,
            width: 10,
            counts: vec![100],
        };
        assert_eq!(long.to_compressed(), b"T3".to_vec());
    }

    #[test]
    fn test_from_compressed_known_string() {
        let rle = Rle::from_compressed(b"332O0", 3, 4).unwrap();
        assert_eq!(rle.counts, vec![3, 3, 2, 2, 2]);
        assert_eq!(rle.to_mask().unwrap(), sample_mask());
    }

    #[test]
    fn test_codec_preserves_mask() {
        let codec = CocoRleCodec;
        let mask = sample_mask();
        let encoded = codec.encode(&mask);
        assert_eq!(encoded.size, [3, 4]);
        assert_eq!(codec.decode(&encoded).unwrap(), mask);
    }

    #[test]
    fn test_from_compressed_rejects_bad_character() {
        let err = Rle::from_compressed(b"33 2", 3, 4).unwrap_err();
        assert!(matches!(err, Error::InvalidRle(_)));
    }

    #[test]
    fn test_from_compressed_rejects_unterminated_run() {
        // 'T' carries the continuation bit.
        let err = Rle::from_compressed(b"T", 10, 10).unwrap_err();
        assert!(matches!(err, Error::InvalidRle(_)));
    }

    #[test]
    fn test_to_mask_rejects_size_mismatch() {
        let rle = Rle {
            height: 3,
            width: 4,
            counts: vec![3, 3],
        };
        assert!(matches!(rle.to_mask(), Err(Error::InvalidRle(_))));
    }

    #[test]
    fn test_mask_bbox_and_area() {
        let mask = sample_mask();
        assert_eq!(mask.area(), 5);
        assert_eq!(mask.bbox().unwrap().to_coco(), [1, 0, 3, 3]);
        assert!(BinaryMask::new(3, 4).bbox().is_none());
    }

    #[test]
    fn test_run_bbox_matches_decoded_mask() {
        let (height, width) = (3u32, 4u32);
        for bits in 0u32..1 << (height * width) {
            let data = (0..height * width).map(|i| ((bits >> i) & 1) as u8).collect();
            let mask = BinaryMask::from_column_major(height, width, data).unwrap();
            let rle = Rle::from_mask(&mask);
            assert_eq!(rle.bbox().unwrap(), mask.bbox(), "mask bits {:012b}", bits);
        }
    }

    #[test]
    fn test_codec_bbox_from_counts() {
        let codec = CocoRleCodec;
        let encoded = codec.encode(&sample_mask());
        assert_eq!(codec.bbox(&encoded).unwrap().unwrap().to_coco(), [1, 0, 3, 3]);

        let mismatched = EncodedMask {
            size: [3, 5],
            counts: encoded.counts,
        };
        assert!(matches!(codec.bbox(&mismatched), Err(Error::InvalidRle(_))));
    }
}
