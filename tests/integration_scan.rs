//! Integration tests for scanning and bracket detection on a real directory.

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use common::{exposure, Card};
use photo_hdr::core::bracket::BracketDetector;
use photo_hdr::core::scanner::{PhotoScanner, ScanConfig, WalkDirScanner};
use photo_hdr::error::ScanError;
use std::sync::Arc;

fn scanner(card: Card) -> WalkDirScanner {
    WalkDirScanner::with_reader(ScanConfig::default(), Arc::new(card.into_exif()))
}

#[test]
fn scan_lists_raw_files_in_name_order() {
    let temp = TempDir::new().unwrap();
    let mut card = Card::new(temp.path());
    let names = card.bracket("ILCE-7RM4", &[-1.0, 0.0, 1.0]);
    temp.child("DSC01234.JPG").touch().unwrap();
    temp.child(".DSC09999.ARW").touch().unwrap();
    temp.child("hdr/tiff/DSC00001.ARW").touch().unwrap();

    let result = scanner(card).scan(temp.path()).unwrap();

    let found: Vec<String> = result.photos.iter().map(|p| p.filename()).collect();
    assert_eq!(found, names);
    assert_eq!(result.photos[2].exposure_bias(), Some(1.0));
}

#[test]
fn extension_match_ignores_case() {
    let temp = TempDir::new().unwrap();
    temp.child("dsc00001.arw").touch().unwrap();
    temp.child("DSC00002.ARW").touch().unwrap();

    let result = scanner(Card::new(temp.path())).scan(temp.path()).unwrap();

    assert_eq!(result.photos.len(), 2);
}

#[test]
fn missing_directory_is_reported() {
    let temp = TempDir::new().unwrap();
    let missing = temp.child("not-a-card");

    let err = scanner(Card::new(temp.path()))
        .scan(missing.path())
        .unwrap_err();

    assert!(matches!(err, ScanError::DirectoryNotFound { .. }));
}

#[test]
fn unrelated_photo_splits_a_bracket_at_any_position() {
    for position in 0..=5 {
        let temp = TempDir::new().unwrap();
        let mut card = Card::new(temp.path());
        let biases = [-2.0, -1.0, 0.0, 1.0, 2.0];
        for (i, bias) in biases.iter().enumerate() {
            if i == position {
                card.shoot(exposure("DMC-GH5", 0.0));
            }
            card.shoot(exposure("ILCE-7RM4", *bias));
        }
        if position == biases.len() {
            card.shoot(exposure("DMC-GH5", 0.0));
        }

        let photos = scanner(card).scan(temp.path()).unwrap().photos;
        let stacks = BracketDetector::default().find_brackets(&photos);

        assert!(stacks.len() <= 2, "position {}", position);
        for stack in stacks.iter() {
            assert!(stack.iter().all(|p| p.camera() == Some("ILCE-7RM4")));
        }
        assert_eq!(
            stacks.total_photos(),
            match position {
                1 | 4 => 4,
                _ => 5,
            },
            "position {}",
            position
        );
    }
}
