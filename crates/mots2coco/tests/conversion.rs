// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use image::{ImageBuffer, Luma};
use mots2coco::{
    Error, ManifestFormat, Settings,
    coco::{CocoReader, verify_document},
    convert_label_dir, convert_manifest_file, discover_frames, emit,
};
use std::{io::Read, path::Path};
use tempfile::TempDir;

const RLE: &str = "UkU\\1`0RQ1>PoN";

fn write_label(path: &Path, width: u32, height: u32, pixels: Vec<u16>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, pixels)
        .unwrap()
        .save(path)
        .unwrap();
}

fn write_frame(root: &Path, group: &str, frame: &str) {
    let dir = root.join("new_images").join(group);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(frame), [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
}

fn manifest_line(group: u32, image_id: u64, frame: &str, class_id: u32) -> String {
    format!(
        "{} {} {} 0 {} 375 1242 100 150 199 174 {}",
        group, image_id, frame, class_id, RLE
    )
}

#[test]
fn test_manifest_copies_frames_once() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("mots");
    let images = temp_dir.path().join("out/images");
    write_frame(&source, "2", "000042.jpg");
    write_frame(&source, "2", "000043.jpg");

    let manifest = temp_dir.path().join("train.txt");
    std::fs::write(
        &manifest,
        [
            manifest_line(2, 42, "000042.jpg", 1),
            manifest_line(2, 42, "000042.jpg", 2),
            manifest_line(2, 43, "000043.jpg", 1),
        ]
        .join("\n"),
    )
    .unwrap();

    let conversion =
        convert_manifest_file(&manifest, &source, &images, &Settings::default()).unwrap();

    assert_eq!(conversion.summary.images, 2);
    assert_eq!(conversion.summary.annotations, 3);
    assert_eq!(conversion.summary.copied_images, 2);
    assert!(images.join("2_000042.jpg").is_file());
    assert!(images.join("2_000043.jpg").is_file());

    let document = &conversion.document;
    assert_eq!(
        Path::new(&document.images[0].file_name),
        images.join("2_000042.jpg")
    );
    for annotation in &document.annotations {
        assert_eq!(annotation.segmentation.counts, RLE);
        assert_eq!(annotation.bbox, [100, 150, 100, 25]);
    }
    assert!(verify_document(document).is_valid());
}

#[test]
fn test_manifest_skips_bad_lines_and_missing_frames() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("mots");
    let images = temp_dir.path().join("images");
    write_frame(&source, "2", "000001.jpg");

    let manifest = temp_dir.path().join("train.txt");
    std::fs::write(
        &manifest,
        [
            "1 2 3 4 5".to_string(),
            manifest_line(2, 9, "000009.jpg", 1),
            manifest_line(2, 1, "000001.jpg", 2),
        ]
        .join("\n"),
    )
    .unwrap();

    let conversion =
        convert_manifest_file(&manifest, &source, &images, &Settings::default()).unwrap();
    assert_eq!(conversion.summary.skipped_lines, 2);
    assert_eq!(conversion.document.images.len(), 1);
    assert_eq!(conversion.document.annotations[0].id, 1);
    assert_eq!(conversion.document.annotations[0].image_id, 1);

    let strict = Settings {
        strict: true,
        ..Default::default()
    };
    let err = convert_manifest_file(&manifest, &source, &images, &strict).unwrap_err();
    assert!(matches!(err, Error::MissingSourceAsset(_)));
}

#[test]
fn test_mots_manifest_uses_file_stem_as_sequence() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("0002.txt");
    // Runs [0, 6, 6]: the first two columns of a 3x4 frame are foreground.
    std::fs::write(&manifest, "5 2001 2 3 4 066\n").unwrap();

    let mut settings = Settings {
        copy_images: false,
        ..Default::default()
    };
    settings.manifest.format = ManifestFormat::Mots;

    let conversion =
        convert_manifest_file(&manifest, temp_dir.path(), Path::new("images"), &settings)
            .unwrap();
    let document = &conversion.document;
    assert_eq!(document.images[0].id, 5);
    assert_eq!(
        Path::new(&document.images[0].file_name),
        Path::new("images/0002_000005.jpg")
    );
    assert_eq!(document.annotations[0].bbox, [0, 0, 2, 3]);
    assert_eq!(document.annotations[0].category_id, 2);
}

#[test]
fn test_label_dir_conversion() {
    let temp_dir = TempDir::new().unwrap();
    let instances = temp_dir.path().join("instances");

    #[rustfmt::skip]
    let pixels = vec![
        0,    0,    2001, 0,
        1002, 0,    2001, 0,
        1002, 1002, 0,    0,
    ];
    write_label(&instances.join("0001/000001.png"), 4, 3, pixels);
    write_label(&instances.join("0001/000000.png"), 4, 3, vec![0; 12]);
    write_label(&instances.join("0000/000003.png"), 2, 1, vec![1001, 1001]);

    let frames = discover_frames(&instances).unwrap();
    let names: Vec<String> = frames
        .iter()
        .map(|f| format!("{}/{}", f.group, f.frame))
        .collect();
    assert_eq!(names, vec!["0000/000003", "0001/000000", "0001/000001"]);

    let conversion = convert_label_dir(&instances, &Settings::default()).unwrap();
    let document = &conversion.document;

    let images: Vec<(u64, &str)> = document
        .images
        .iter()
        .map(|i| (i.id, i.file_name.as_str()))
        .collect();
    assert_eq!(
        images,
        vec![
            (1, "0000/000003.jpg"),
            (2, "0001/000000.jpg"),
            (3, "0001/000001.jpg")
        ]
    );

    let annotations: Vec<(u64, u64, u32, [u32; 4])> = document
        .annotations
        .iter()
        .map(|a| (a.id, a.image_id, a.category_id, a.bbox))
        .collect();
    assert_eq!(
        annotations,
        vec![
            (1, 1, 1, [0, 0, 2, 1]),
            (2, 3, 1, [0, 1, 2, 2]),
            (3, 3, 2, [2, 0, 1, 2]),
        ]
    );
    assert_eq!(conversion.summary.last_annotation_id(), 3);
    assert!(verify_document(document).is_valid());
}

#[test]
fn test_all_zero_frame_alone() {
    let temp_dir = TempDir::new().unwrap();
    let instances = temp_dir.path().join("instances");
    write_label(&instances.join("0000/000000.png"), 8, 4, vec![0; 32]);

    let conversion = convert_label_dir(&instances, &Settings::default()).unwrap();
    assert_eq!(conversion.document.images.len(), 1);
    assert!(conversion.document.annotations.is_empty());
    assert_eq!(conversion.summary.next_free_id, 1);
}

#[test]
fn test_undecodable_frame_keeps_later_ids() {
    let temp_dir = TempDir::new().unwrap();
    let instances = temp_dir.path().join("instances");
    std::fs::create_dir_all(instances.join("0000")).unwrap();
    std::fs::write(instances.join("0000/000000.png"), b"not a png").unwrap();
    write_label(&instances.join("0000/000001.png"), 1, 1, vec![2001]);

    let conversion = convert_label_dir(&instances, &Settings::default()).unwrap();
    assert_eq!(conversion.summary.skipped_frames, 1);
    assert_eq!(conversion.document.images[0].id, 2);
    assert_eq!(conversion.document.annotations[0].image_id, 2);
}

#[test]
fn test_emit_json_and_zip() {
    let temp_dir = TempDir::new().unwrap();
    let instances = temp_dir.path().join("instances");
    write_label(&instances.join("0000/000000.png"), 2, 2, vec![0, 1001, 1001, 0]);

    let settings = Settings::default();
    let conversion = convert_label_dir(&instances, &settings).unwrap();

    let json = temp_dir.path().join("annotations/train.json");
    assert_eq!(
        emit(&conversion, &json, &settings.output, temp_dir.path()).unwrap(),
        1
    );
    let restored = CocoReader::new().read(&json).unwrap();
    assert_eq!(restored, conversion.document);

    let zip = temp_dir.path().join("train.zip");
    emit(&conversion, &zip, &settings.output, temp_dir.path()).unwrap();
    assert_eq!(CocoReader::new().read(&zip).unwrap(), conversion.document);
}

#[test]
fn test_zip_keeps_sequences_sharing_frame_names_apart() {
    let temp_dir = TempDir::new().unwrap();
    let instances = temp_dir.path().join("instances");
    let frames = temp_dir.path().join("frames");
    for group in ["0001", "0002"] {
        write_label(&instances.join(group).join("000000.png"), 1, 1, vec![1001]);
        std::fs::create_dir_all(frames.join(group)).unwrap();
        std::fs::write(frames.join(group).join("000000.jpg"), group.as_bytes()).unwrap();
    }

    let settings = Settings::default();
    let conversion = convert_label_dir(&instances, &settings).unwrap();
    let output = temp_dir.path().join("train.zip");
    emit(&conversion, &output, &settings.output, &frames).unwrap();

    let file = std::fs::File::open(&output).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    assert_eq!(archive.len(), 3);
    for image in &conversion.document.images {
        let mut data = String::new();
        archive
            .by_name(&format!("images/{}", image.file_name))
            .unwrap()
            .read_to_string(&mut data)
            .unwrap();
        assert!(image.file_name.starts_with(&data));
    }
    assert_eq!(CocoReader::new().read(&output).unwrap(), conversion.document);
}

#[test]
fn test_manifest_zip_names_frames_relative_to_image_dir() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("mots");
    let images = temp_dir.path().join("out/images");
    write_frame(&source, "2", "000042.jpg");

    let manifest = temp_dir.path().join("train.txt");
    std::fs::write(&manifest, manifest_line(2, 42, "000042.jpg", 1)).unwrap();

    let settings = Settings::default();
    let conversion = convert_manifest_file(&manifest, &source, &images, &settings).unwrap();
    let output = temp_dir.path().join("train.zip");
    emit(&conversion, &output, &settings.output, &images).unwrap();

    let restored = CocoReader::new().read(&output).unwrap();
    assert_eq!(restored.images[0].file_name, "2_000042.jpg");
    assert_eq!(restored.annotations, conversion.document.annotations);

    let file = std::fs::File::open(&output).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    assert!(archive.by_name("images/2_000042.jpg").is_ok());
}
