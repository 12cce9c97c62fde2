// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! MOTS text manifest parsing.
//!
//! Each manifest line describes one object instance whose mask is already
//! RLE-encoded. Two column layouts are supported, selected by
//! [`ManifestFormat`]:
//!
//! - **extended** (12 columns, indices configurable):
//!   `group image_id frame_name frame_id class_id height width b0 b1 b2 b3 rle`
//! - **mots** (6 columns): `time_frame track_id class_id height width rle`;
//!   the box is derived from the RLE runs because the line carries none.
//!
//! The RLE token is never re-encoded; its bytes reach the output unchanged.

use crate::{
    ParseError,
    aggregate::{AnnotationStub, ImageStub},
    bbox::BoundingBox,
    mask::{CocoRleCodec, EncodedMask, MaskCodec},
    settings::{ManifestFormat, ManifestSettings},
};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

/// Column count of the canonical MOTS layout.
pub const MOTS_FIELDS: usize = 6;

/// Parses manifest lines into `(ImageStub, AnnotationStub)` pairs.
///
/// The parser also computes where each frame lives (`source_path`) and where
/// it is copied to (`file_name`), but never touches the file system.
#[derive(Debug, Clone)]
pub struct ManifestParser<C: MaskCodec = CocoRleCodec> {
    settings: ManifestSettings,
    source_root: PathBuf,
    images_dir: PathBuf,
    sequence: String,
    codec: C,
}

impl ManifestParser {
    /// Parser reading frames under `source_root` and naming copies inside
    /// `images_dir`.
    pub fn new(
        settings: ManifestSettings,
        source_root: impl Into<PathBuf>,
        images_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            source_root: source_root.into(),
            images_dir: images_dir.into(),
            sequence: String::new(),
            codec: CocoRleCodec,
        }
    }
}

impl<C: MaskCodec> ManifestParser<C> {
    /// Use another codec for masks whose box has to be recovered.
    pub fn with_codec<D: MaskCodec>(self, codec: D) -> ManifestParser<D> {
        ManifestParser {
            settings: self.settings,
            source_root: self.source_root,
            images_dir: self.images_dir,
            sequence: self.sequence,
            codec,
        }
    }

    /// Sequence name standing in for the group column of the MOTS layout,
    /// normally the manifest's file stem (`0002` for `0002.txt`).
    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = sequence.into();
        self
    }

    pub fn settings(&self) -> &ManifestSettings {
        &self.settings
    }

    /// Number of whitespace-separated fields a line needs.
    pub fn required_fields(&self) -> usize {
        match self.settings.format {
            ManifestFormat::Extended => self.settings.columns.required_fields(),
            ManifestFormat::Mots => MOTS_FIELDS,
        }
    }

    /// Parse one manifest line.
    pub fn parse(&self, line: &str) -> Result<(ImageStub, AnnotationStub), ParseError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let expected = self.required_fields();
        if fields.len() < expected {
            return Err(ParseError::TruncatedLine {
                expected,
                found: fields.len(),
            });
        }

        match self.settings.format {
            ManifestFormat::Extended => self.parse_extended(&fields),
            ManifestFormat::Mots => self.parse_mots(&fields),
        }
    }

    fn parse_extended(&self, fields: &[&str]) -> Result<(ImageStub, AnnotationStub), ParseError> {
        let columns = &self.settings.columns;

        let group = fields[columns.group];
        // Validated even though only its text is used.
        field::<u64>(fields, columns.group)?;
        let image_id: u64 = field(fields, columns.image_id)?;
        let frame_name = fields[columns.frame_name];
        let category_id: u32 = field(fields, columns.class_id)?;
        let height: u32 = field(fields, columns.height)?;
        let width: u32 = field(fields, columns.width)?;
        let corners = [
            field(fields, columns.bbox)?,
            field(fields, columns.bbox + 1)?,
            field(fields, columns.bbox + 2)?,
            field(fields, columns.bbox + 3)?,
        ];
        let bbox = BoundingBox::from_columns(corners, self.settings.bbox).ok_or_else(|| {
            ParseError::InvalidField {
                column: columns.bbox,
                reason: format!("degenerate bounding box {:?}", corners),
            }
        })?;
        let segmentation = EncodedMask {
            size: [height, width],
            counts: fields[columns.rle].as_bytes().to_vec(),
        };

        Ok((
            self.image_stub(image_id, group, frame_name, height, width),
            AnnotationStub::new(&bbox, segmentation, category_id),
        ))
    }

    fn parse_mots(&self, fields: &[&str]) -> Result<(ImageStub, AnnotationStub), ParseError> {
        let time_frame: u64 = field(fields, 0)?;
        field::<u64>(fields, 1)?;
        let category_id: u32 = field(fields, 2)?;
        let height: u32 = field(fields, 3)?;
        let width: u32 = field(fields, 4)?;
        let segmentation = EncodedMask {
            size: [height, width],
            counts: fields[5].as_bytes().to_vec(),
        };

        let bbox = self
            .codec
            .bbox(&segmentation)
            .map_err(|e| ParseError::InvalidField {
                column: 5,
                reason: e.to_string(),
            })?
            .ok_or_else(|| ParseError::InvalidField {
            column: 5,
            reason: "mask has no foreground pixels".to_string(),
        })?;

        let frame_name = format!("{:06}.{}", time_frame, self.settings.image_ext);
        Ok((
            self.image_stub(time_frame, &self.sequence, &frame_name, height, width),
            AnnotationStub::new(&bbox, segmentation, category_id),
        ))
    }

    fn image_stub(
        &self,
        image_id: u64,
        group: &str,
        frame_name: &str,
        height: u32,
        width: u32,
    ) -> ImageStub {
        let (source, destination) = self.asset_paths(group, frame_name);
        ImageStub {
            image_id,
            height,
            width,
            file_name: destination.to_string_lossy().into_owned(),
            source_path: Some(source),
        }
    }

    /// `(source, destination)` of a frame: the source lives in
    /// `{root}/{image_subdir}/{group}/{frame}`, the copy in
    /// `{images_dir}/{group}_{frame}`.
    pub fn asset_paths(&self, group: &str, frame_name: &str) -> (PathBuf, PathBuf) {
        let mut source = self.source_root.join(&self.settings.image_subdir);
        if !group.is_empty() {
            source.push(group);
        }
        source.push(frame_name);

        let copy_name = if group.is_empty() {
            frame_name.to_string()
        } else {
            format!("{}_{}", group, frame_name)
        };
        (source, self.images_dir.join(copy_name))
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }
}

fn field<T: FromStr>(fields: &[&str], column: usize) -> Result<T, ParseError> {
    fields[column]
        .parse()
        .map_err(|_| ParseError::NotAnInteger {
            column,
            value: fields[column].to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bbox::BboxConvention, mask::BinaryMask};

    const LINE: &str = "2 42 000017.jpg 17 1 375 1242 100 150 199 174 UkU\\1`0RQ1>PoN";

    fn parser() -> ManifestParser {
        ManifestParser::new(ManifestSettings::default(), "/data/mots", "/out/images")
    }

    #[test]
    fn test_parse_extended_line() {
        let (image, annotation) = parser().parse(LINE).unwrap();

        assert_eq!(image.image_id, 42);
        assert_eq!(image.height, 375);
        assert_eq!(image.width, 1242);
        assert_eq!(
            image.source_path,
            Some(PathBuf::from("/data/mots/new_images/2/000017.jpg"))
        );
        assert_eq!(
            PathBuf::from(&image.file_name),
            PathBuf::from("/out/images/2_000017.jpg")
        );

        assert_eq!(annotation.category_id, 1);
        assert_eq!(annotation.segmentation.size, [375, 1242]);
        // Corner box normalized to [left, top, width, height].
        assert_eq!(annotation.bbox, [100, 150, 100, 25]);
    }

    #[test]
    fn test_rle_token_verbatim() {
        let (_, annotation) = parser().parse(LINE).unwrap();
        assert_eq!(annotation.segmentation.counts, b"UkU\\1`0RQ1>PoN".to_vec());
    }

    #[test]
    fn test_xywh_convention() {
        let settings = ManifestSettings {
            bbox: BboxConvention::Xywh,
            ..Default::default()
        };
        let parser = ManifestParser::new(settings, "/data", "/out");
        let (_, annotation) = parser.parse(LINE).unwrap();
        assert_eq!(annotation.bbox, [100, 150, 199, 174]);
    }

    #[test]
    fn test_truncated_line() {
        let err = parser().parse("1 2 3 4 5").unwrap_err();
        assert_eq!(
            err,
            ParseError::TruncatedLine {
                expected: 12,
                found: 5
            }
        );
    }

    #[test]
    fn test_extra_fields_ignored() {
        let line = format!("{} trailing", LINE);
        assert!(parser().parse(&line).is_ok());
    }

    #[test]
    fn test_not_an_integer() {
        let line = "2 42 000017.jpg 17 car 375 1242 100 150 199 174 abc";
        let err = parser().parse(line).unwrap_err();
        assert_eq!(
            err,
            ParseError::NotAnInteger {
                column: 4,
                value: "car".to_string()
            }
        );
    }

    #[test]
    fn test_degenerate_box() {
        let line = "2 42 000017.jpg 17 1 375 1242 100 150 99 174 abc";
        let err = parser().parse(line).unwrap_err();
        assert!(matches!(err, ParseError::InvalidField { column: 7, .. }));
    }

    #[test]
    fn test_custom_columns() {
        let mut settings = ManifestSettings::default();
        settings.columns.rle = 12;
        let parser = ManifestParser::new(settings, "/data", "/out");
        assert_eq!(parser.required_fields(), 13);
        assert!(matches!(
            parser.parse(LINE),
            Err(ParseError::TruncatedLine { expected: 13, .. })
        ));
    }

    #[test]
    fn test_parse_mots_line() {
        // 3x4 frame, foreground pixels in columns 1..=3.
        let mask =
            BinaryMask::from_column_major(3, 4, vec![0, 0, 0, 1, 1, 1, 0, 0, 1, 1, 0, 0]).unwrap();
        let counts = CocoRleCodec.encode(&mask).counts;
        let line = format!("7 2001 2 3 4 {}", String::from_utf8(counts.clone()).unwrap());

        let settings = ManifestSettings {
            format: ManifestFormat::Mots,
            image_ext: "png".to_string(),
            ..Default::default()
        };
        let parser = ManifestParser::new(settings, "/data", "/out").with_sequence("0002");
        let (image, annotation) = parser.parse(&line).unwrap();

        assert_eq!(image.image_id, 7);
        assert_eq!(
            image.source_path,
            Some(PathBuf::from("/data/new_images/0002/000007.png"))
        );
        assert_eq!(annotation.category_id, 2);
        assert_eq!(annotation.bbox, [1, 0, 3, 3]);
        assert_eq!(annotation.segmentation.counts, counts);
    }

    #[test]
    fn test_mots_line_with_bad_mask() {
        let settings = ManifestSettings {
            format: ManifestFormat::Mots,
            ..Default::default()
        };
        let parser = ManifestParser::new(settings, "/data", "/out");
        let err = parser.parse("1 2001 2 3 4 33").unwrap_err();
        assert!(matches!(err, ParseError::InvalidField { column: 5, .. }));
    }
}
