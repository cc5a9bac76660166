//! Fakes shared by the integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use photo_hdr::core::metadata::{MetadataReader, PhotoMetadata};
use photo_hdr::core::stages::{CommandOutput, CommandRunner};
use photo_hdr::error::StageError;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stands in for darktable-cli, align_image_stack, enfuse and exiftool by
/// creating the files each tool would write
#[derive(Default)]
pub struct FakeTools {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    failing: HashSet<String>,
    missing: HashSet<String>,
    drop_outputs: usize,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// `program` runs and exits with status 1
    pub fn failing(mut self, program: &str) -> Self {
        self.failing.insert(program.to_string());
        self
    }

    /// `program` is not installed
    pub fn missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    /// The aligner writes `count` fewer files than it was given
    pub fn dropping_outputs(mut self, count: usize) -> Self {
        self.drop_outputs = count;
        self
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == program)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CommandRunner for FakeTools {
    fn execute(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, StageError> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.clone()));

        if self.missing.contains(program) {
            return Err(StageError::Spawn {
                tool: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        if self.failing.contains(program) {
            return Ok(CommandOutput {
                stderr: format!("{} failed", program),
                code: Some(1),
                ..Default::default()
            });
        }

        match program {
            "darktable-cli" | "enfuse" => fs::write(&args[1], b"image").unwrap(),
            "align_image_stack" => {
                let inputs = args.iter().filter(|a| a.ends_with(".tif")).count();
                for index in 0..inputs.saturating_sub(self.drop_outputs) {
                    fs::write(format!("{}{:04}.tif", args[1], index), b"image").unwrap();
                }
            }
            "exiftool" => {
                let dest = &args[3];
                if Path::new(dest).exists() {
                    fs::copy(dest, format!("{}_original", dest)).unwrap();
                }
            }
            _ => {}
        }

        Ok(CommandOutput::ok())
    }
}

/// Serves metadata by file name
#[derive(Default)]
pub struct FakeExif {
    photos: HashMap<String, PhotoMetadata>,
}

impl MetadataReader for FakeExif {
    fn read(&self, path: &Path) -> PhotoMetadata {
        path.file_name()
            .and_then(|name| self.photos.get(&*name.to_string_lossy()))
            .cloned()
            .unwrap_or_default()
    }
}

pub fn sunset() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 10, 4)
        .unwrap()
        .and_hms_opt(18, 30, 0)
        .unwrap()
}

pub fn exposure(camera: &str, bias: f64) -> PhotoMetadata {
    PhotoMetadata {
        date_taken: Some(sunset()),
        camera: Some(camera.to_string()),
        lens: Some("FE 24-70mm F2.8 GM".to_string()),
        iso: Some(200),
        shutter_speed: Some(0.05),
        aperture: Some(8.0),
        exposure_bias: Some(bias),
        brightness: Some(3.5),
    }
}

/// A memory card dump: RAW files on disk plus their metadata
pub struct Card {
    dir: PathBuf,
    next: usize,
    exif: FakeExif,
}

impl Card {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            next: 1234,
            exif: FakeExif::default(),
        }
    }

    /// Shoot one exposure, named DSC0NNNN.ARW in capture order
    pub fn shoot(&mut self, metadata: PhotoMetadata) -> String {
        let name = format!("DSC{:05}.ARW", self.next);
        self.next += 1;
        fs::write(self.dir.join(&name), b"raw").unwrap();
        self.exif.photos.insert(name.clone(), metadata);
        name
    }

    pub fn bracket(&mut self, camera: &str, biases: &[f64]) -> Vec<String> {
        biases
            .iter()
            .map(|bias| self.shoot(exposure(camera, *bias)))
            .collect()
    }

    pub fn into_exif(self) -> FakeExif {
        self.exif
    }
}
