//! # Metadata Module
//!
//! Read-only EXIF view of a photo.
//!
//! ## Extracted Fields
//! - Date taken (DateTimeOriginal)
//! - Camera model and lens model
//! - ISO, exposure time, aperture
//! - Exposure bias and brightness
//!
//! Sony ARW and most other RAW formats are TIFF containers, so the same
//! reader handles RAW, TIFF and JPEG files.

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Extracted photo metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    /// Original capture date/time (camera local time)
    pub date_taken: Option<NaiveDateTime>,
    /// Camera model (e.g., "ILCE-7RM4")
    pub camera: Option<String>,
    /// Lens model (e.g., "FE 24-70mm F2.8 GM")
    pub lens: Option<String>,
    /// ISO sensitivity
    pub iso: Option<u32>,
    /// Exposure time in seconds
    pub shutter_speed: Option<f64>,
    /// F-number
    pub aperture: Option<f64>,
    /// Exposure compensation in EV, rounded to 2 decimals
    pub exposure_bias: Option<f64>,
    /// APEX brightness value, rounded to 2 decimals
    pub brightness: Option<f64>,
}

impl PhotoMetadata {
    /// Check if any metadata was extracted
    pub fn has_data(&self) -> bool {
        self.date_taken.is_some()
            || self.camera.is_some()
            || self.lens.is_some()
            || self.iso.is_some()
            || self.shutter_speed.is_some()
            || self.exposure_bias.is_some()
    }

    /// Exposure value used for bracket naming.
    ///
    /// The exposure bias when the camera recorded one, otherwise the scene
    /// EV normalized to ISO 100.
    pub fn exposure_value(&self) -> Option<f64> {
        if let Some(bias) = self.exposure_bias {
            return Some(bias);
        }

        let (aperture, time) = (self.aperture?, self.shutter_speed?);
        if aperture <= 0.0 || time <= 0.0 {
            return None;
        }

        let mut ev = (aperture * aperture / time).log2();
        if let Some(iso) = self.iso.filter(|iso| *iso > 0) {
            ev -= (iso as f64 / 100.0).log2();
        }
        Some(round_to(ev, 2))
    }
}

/// Read-only metadata accessor.
///
/// Implement this trait to feed synthetic metadata in tests.
pub trait MetadataReader: Send + Sync {
    /// Read metadata for a file. Unreadable files yield empty metadata.
    fn read(&self, path: &Path) -> PhotoMetadata;
}

/// Metadata reader backed by kamadak-exif
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifMetadataReader;

impl MetadataReader for ExifMetadataReader {
    fn read(&self, path: &Path) -> PhotoMetadata {
        extract_metadata(path)
    }
}

/// Extract EXIF metadata from a photo file
pub fn extract_metadata(path: &Path) -> PhotoMetadata {
    let mut metadata = PhotoMetadata::default();

    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return metadata,
    };

    let mut bufreader = BufReader::new(&file);
    let exif_reader = match Reader::new().read_from_container(&mut bufreader) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No EXIF data");
            return metadata;
        }
    };

    if let Some(field) = exif_reader.get_field(Tag::DateTimeOriginal, In::PRIMARY) {
        if let Some(s) = get_string_value(&field.value) {
            // EXIF date format: "YYYY:MM:DD HH:MM:SS"
            metadata.date_taken = NaiveDateTime::parse_from_str(&s, "%Y:%m:%d %H:%M:%S").ok();
        }
    }

    if let Some(field) = exif_reader.get_field(Tag::Model, In::PRIMARY) {
        metadata.camera = get_string_value(&field.value);
    }
    if let Some(field) = exif_reader.get_field(Tag::LensModel, In::PRIMARY) {
        metadata.lens = get_string_value(&field.value);
    }

    if let Some(field) = exif_reader.get_field(Tag::PhotographicSensitivity, In::PRIMARY) {
        metadata.iso = field.value.get_uint(0);
    }

    if let Some(field) = exif_reader.get_field(Tag::ExposureTime, In::PRIMARY) {
        metadata.shutter_speed = get_f64_value(&field.value);
    }
    // Fall back to the APEX shutter speed value: t = 2^-Tv
    if metadata.shutter_speed.is_none() {
        if let Some(field) = exif_reader.get_field(Tag::ShutterSpeedValue, In::PRIMARY) {
            metadata.shutter_speed = get_f64_value(&field.value).map(|tv| (-tv).exp2());
        }
    }

    if let Some(field) = exif_reader.get_field(Tag::FNumber, In::PRIMARY) {
        metadata.aperture = get_f64_value(&field.value);
    }
    if let Some(field) = exif_reader.get_field(Tag::ExposureBiasValue, In::PRIMARY) {
        metadata.exposure_bias = get_f64_value(&field.value).map(|v| round_to(v, 2));
    }
    if let Some(field) = exif_reader.get_field(Tag::BrightnessValue, In::PRIMARY) {
        metadata.brightness = get_f64_value(&field.value).map(|v| round_to(v, 2));
    }

    metadata
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Avoid "-0" leaking into filenames
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Helper to extract a float from rational EXIF values
fn get_f64_value(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(vec) => vec.first().map(|r| r.to_f64()),
        Value::SRational(vec) => vec.first().map(|r| r.to_f64()),
        Value::Short(vec) => vec.first().map(|v| *v as f64),
        Value::Long(vec) => vec.first().map(|v| *v as f64),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}
