// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR integration for text extraction from images
//!
//! Components:
//! - `detection` - Text region detection and DB post-processing
//! - `recognition` - CTC text recognition from rectified crops
//! - `preprocessing` - Image preprocessing for models
//! - `model` - Combined OCR pipeline

pub mod detection;
pub mod model;
pub mod preprocessing;
pub mod recognition;

use anyhow::Result;
use image::DynamicImage;

pub use detection::{DbPostProcessConfig, OcrDetectionModel, TextBox};
pub use model::{OcrModelPaths, PaddleOcrModel, TextRegion};
pub use recognition::{OcrRecognitionModel, RecognizedText};

/// Maps an image to recognized (text, quadrilateral) pairs
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &DynamicImage) -> Result<Vec<TextRegion>>;
}
