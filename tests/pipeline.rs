//! End-to-end tests through the public API with real files on disk.

use image::{ImageBuffer, ImageFormat, Rgb};
use mailbatch::config;
use mailbatch::fs::LocalFs;
use mailbatch::message::{Addressing, MessageDescriptor, OutboxTransport, Transport};
use mailbatch::metadata::Extractor;
use mailbatch::pipeline::{self, ErrorPolicy, PipelineError, PlanOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MIB: u64 = 1024 * 1024;

fn write_sized(dir: &Path, name: &str, size: u64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![0u8; size as usize]).unwrap();
    path
}

fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let path = dir.join(name);
    img.save_with_format(&path, ImageFormat::Jpeg).unwrap();
    path
}

fn subjects(planned: &[pipeline::PlannedMessage]) -> Vec<&str> {
    planned.iter().map(|p| p.message.subject.as_str()).collect()
}

// ============================================================================
// Planning
// ============================================================================

#[test]
fn files_are_packed_into_size_bounded_messages() {
    let tmp = TempDir::new().unwrap();
    let paths = vec![
        write_sized(tmp.path(), "a.bin", 4 * MIB),
        write_sized(tmp.path(), "b.bin", 3 * MIB),
        write_sized(tmp.path(), "c.bin", 5 * MIB),
    ];

    let extraction = pipeline::extract_all(
        &paths,
        &Extractor::new(LocalFs),
        0,
        ErrorPolicy::Abort,
        None,
    )
    .unwrap();
    let options = PlanOptions {
        max_size: 10 * MIB,
        title: "T".to_string(),
        ..Default::default()
    };
    let planned = pipeline::plan(extraction.records, &options).unwrap();

    assert_eq!(
        subjects(&planned),
        vec!["T #1 (1-2/3) 7.0MiB", "T #2 (3-3/3) 5.0MiB"]
    );
    assert_eq!(planned[0].message.attachments, paths[..2].to_vec());
    assert_eq!(planned[1].message.attachments, paths[2..].to_vec());
    assert!(planned[0].message.html.contains("2 files, 7.0MiB."));
}

#[test]
fn oversized_file_fails_the_batch() {
    let tmp = TempDir::new().unwrap();
    let paths = vec![
        write_sized(tmp.path(), "small.bin", 10),
        write_sized(tmp.path(), "huge.bin", 2048),
    ];
    let extraction =
        pipeline::extract_all(&paths, &Extractor::new(LocalFs), 0, ErrorPolicy::Abort, None)
            .unwrap();
    let options = PlanOptions {
        max_size: 1024,
        ..Default::default()
    };

    let err = pipeline::plan(extraction.records, &options).unwrap_err();
    assert!(matches!(err, PipelineError::Group(_)));
    assert_eq!(
        err.to_string(),
        "file \"huge.bin\", size 2048, exceed max_size 1024"
    );
}

#[test]
fn photos_are_described_and_ordered_by_size() {
    let tmp = TempDir::new().unwrap();
    let paths = vec![
        write_jpeg(tmp.path(), "wide.jpg", 320, 200),
        write_sized(tmp.path(), "notes.txt", 5),
        write_jpeg(tmp.path(), "small.jpg", 40, 30),
    ];

    let extraction = pipeline::extract_all(
        &paths,
        &Extractor::with_defaults(),
        80,
        ErrorPolicy::Abort,
        None,
    )
    .unwrap();
    let records = &extraction.records;
    assert_eq!(records.len(), 3);

    let wide = records[0].image.as_ref().expect("jpeg is an image");
    assert_eq!(wide.format, "JPEG");
    assert_eq!(wide.size, (320, 200));
    assert!(wide.thumbnail.is_some());
    assert!(records[1].image.is_none());

    let options = PlanOptions {
        order_by: Some("file.size".parse().unwrap()),
        ..Default::default()
    };
    let planned = pipeline::plan(extraction.records, &options).unwrap();
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].message.attachments[0], tmp.path().join("notes.txt"));

    let html = &planned[0].message.html;
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("data:image/jpeg;base64,"));
    assert!(html.contains("320x200"));

    let text: serde_json::Value = serde_json::from_str(&planned[0].message.text).unwrap();
    assert_eq!(text["files"].as_array().unwrap().len(), 3);
    assert!(text["files"][2]["image"].get("thumbnail").is_none());
}

#[test]
fn gif_and_bmp_are_images_too() {
    let tmp = TempDir::new().unwrap();
    let img = ImageBuffer::from_fn(120, 90, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 32])
    });
    let gif = tmp.path().join("anim.gif");
    let bmp = tmp.path().join("scan.bmp");
    img.save_with_format(&gif, ImageFormat::Gif).unwrap();
    img.save_with_format(&bmp, ImageFormat::Bmp).unwrap();

    let extraction = pipeline::extract_all(
        &[gif, bmp],
        &Extractor::with_defaults(),
        80,
        ErrorPolicy::Abort,
        None,
    )
    .unwrap();

    let expected = [("image/gif", "GIF"), ("image/bmp", "BMP")];
    for (record, (mime, format)) in extraction.records.iter().zip(expected) {
        assert_eq!(record.type_description.as_deref(), Some(mime));
        let image = record.image.as_ref().expect("decoded as an image");
        assert_eq!(image.format, format);
        assert_eq!(image.size, (120, 90));
        assert!(image.thumbnail.is_some());
    }
}

#[test]
fn unreadable_files_can_be_skipped() {
    let tmp = TempDir::new().unwrap();
    let paths = vec![
        write_sized(tmp.path(), "a.bin", 1),
        tmp.path().join("gone.bin"),
    ];

    let extraction =
        pipeline::extract_all(&paths, &Extractor::new(LocalFs), 0, ErrorPolicy::Skip, None)
            .unwrap();
    assert_eq!(extraction.records.len(), 1);
    assert_eq!(extraction.skipped.len(), 1);

    let err =
        pipeline::extract_all(&paths, &Extractor::new(LocalFs), 0, ErrorPolicy::Abort, None)
            .unwrap_err();
    assert!(err.to_string().contains("gone.bin"));
}

// ============================================================================
// Config and outbox
// ============================================================================

#[test]
fn config_file_drives_the_plan_and_outbox() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("mailbatch.toml");
    fs::write(
        &config_path,
        r#"
[grouping]
max_size = "2KiB"

[subject]
title = "Holiday"
template = "{title} {num}/{progress}"

[mail]
from = "Me <me@example.com>"
to = ["you@example.org"]
"#,
    )
    .unwrap();
    let config = config::load_config(Some(config_path.as_path()), None).unwrap();

    let files = tmp.path().join("files");
    fs::create_dir(&files).unwrap();
    let paths = vec![
        write_sized(&files, "1.bin", 1024),
        write_sized(&files, "2.bin", 1024),
        write_sized(&files, "3.bin", 100),
    ];
    let extraction =
        pipeline::extract_all(&paths, &Extractor::new(LocalFs), 0, ErrorPolicy::Abort, None)
            .unwrap();
    let planned = pipeline::plan(extraction.records, &config.plan_options().unwrap()).unwrap();
    assert_eq!(subjects(&planned), vec!["Holiday 1/1-1", "Holiday 2/2-3"]);

    let outbox = tmp.path().join("outbox");
    let mut transport = OutboxTransport::new(&outbox).unwrap();
    let written: Vec<PathBuf> = planned
        .iter()
        .map(|p| transport.send(&p.message).unwrap())
        .collect();
    assert_eq!(
        written,
        vec![outbox.join("001.json"), outbox.join("002.json")]
    );

    let stored = MessageDescriptor::from_json(&fs::read_to_string(&written[1]).unwrap()).unwrap();
    assert_eq!(stored.subject, "Holiday 2/2-3");
    assert_eq!(stored.attachments, paths[1..].to_vec());
    assert_eq!(stored.sender_address(), Some("me@example.com"));
    assert_eq!(stored.envelope_recipients(), vec!["you@example.org"]);
    assert_eq!(
        stored.addressing.smtp.map(|s| s.to_string()),
        Some("smtp.example.com:25".to_string())
    );
}

#[test]
fn outbox_refuses_unaddressed_messages() {
    let tmp = TempDir::new().unwrap();
    let mut transport = OutboxTransport::new(tmp.path().join("outbox")).unwrap();
    let message = MessageDescriptor {
        subject: "no one".to_string(),
        ..Default::default()
    }
    .with_addressing(Addressing::default());

    assert!(transport.send(&message).is_err());
    assert_eq!(fs::read_dir(transport.dir()).unwrap().count(), 0);
}
