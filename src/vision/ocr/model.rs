// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR pipeline: detection followed by per-region recognition

use anyhow::Result;
use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::detection::OcrDetectionModel;
use super::preprocessing::{
    crop_quad, preprocess_for_detection, preprocess_for_recognition, PreprocessInfo,
    OCR_INPUT_SIZE,
};
use super::recognition::OcrRecognitionModel;
use super::TextExtractor;
use crate::vision::device::Device;

/// Detection model file name
pub const DET_MODEL_FILE: &str = "det_model.onnx";
/// Recognition model file name
pub const REC_MODEL_FILE: &str = "rec_model.onnx";
/// Character dictionary file name
pub const DICT_FILE: &str = "ppocr_keys_v1.txt";

/// Regions recognized with lower mean confidence are dropped
pub const MIN_TEXT_CONFIDENCE: f32 = 0.5;

/// A recognized text region in original image coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRegion {
    /// Extracted text content
    pub text: String,
    /// Mean character confidence (0.0-1.0)
    pub confidence: f32,
    /// Corners clockwise from top-left
    pub quad: [[f32; 2]; 4],
}

/// Files that make up an OCR model directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
    pub dictionary: PathBuf,
}

impl OcrModelPaths {
    pub fn from_dir<P: AsRef<Path>>(model_dir: P) -> Self {
        let dir = model_dir.as_ref();
        Self {
            detection: dir.join(DET_MODEL_FILE),
            recognition: dir.join(REC_MODEL_FILE),
            dictionary: dir.join(DICT_FILE),
        }
    }

    /// First missing file, if any
    pub fn missing(&self) -> Option<&Path> {
        [&self.detection, &self.recognition, &self.dictionary]
            .into_iter()
            .find(|p| !p.exists())
            .map(PathBuf::as_path)
    }
}

/// PaddleOCR model for text extraction
///
/// Combines text detection and recognition models for end-to-end OCR.
#[derive(Debug, Clone)]
pub struct PaddleOcrModel {
    detector: OcrDetectionModel,
    recognizer: OcrRecognitionModel,
    min_confidence: f32,
}

impl PaddleOcrModel {
    /// Load PaddleOCR models from the specified directory
    ///
    /// Expected files:
    /// - det_model.onnx (text detection)
    /// - rec_model.onnx (text recognition)
    /// - ppocr_keys_v1.txt (character dictionary)
    pub async fn new<P: AsRef<Path>>(model_dir: P, device: Device) -> Result<Self> {
        let paths = OcrModelPaths::from_dir(&model_dir);
        if let Some(missing) = paths.missing() {
            anyhow::bail!("OCR model file not found: {}", missing.display());
        }

        info!("Loading PaddleOCR models from {}", model_dir.as_ref().display());

        let detector = OcrDetectionModel::new(&paths.detection, device).await?;
        let recognizer =
            OcrRecognitionModel::new(&paths.recognition, &paths.dictionary, device).await?;

        info!("PaddleOCR pipeline ready");

        Ok(Self {
            detector,
            recognizer,
            min_confidence: MIN_TEXT_CONFIDENCE,
        })
    }

    /// Process an image and extract text regions
    pub fn process(&self, image: &DynamicImage) -> Result<Vec<TextRegion>> {
        let info = PreprocessInfo::new(image, OCR_INPUT_SIZE);
        let input = preprocess_for_detection(image);
        let boxes = self.detector.detect(&input)?;

        let rgb = image.to_rgb8();
        let mut regions = Vec::with_capacity(boxes.len());

        for text_box in &boxes {
            let quad = info.map_quad_to_original(&text_box.quad);
            let Some(crop) = crop_quad(&rgb, &quad) else {
                continue;
            };

            let recognized = self
                .recognizer
                .recognize(&preprocess_for_recognition(&crop))?;

            if recognized.is_empty() || recognized.confidence < self.min_confidence {
                debug!(
                    "Dropping region {:?} (text {:?}, confidence {:.3})",
                    quad, recognized.text, recognized.confidence
                );
                continue;
            }

            regions.push(TextRegion {
                text: recognized.text,
                confidence: recognized.confidence,
                quad,
            });
        }

        debug!("OCR kept {} of {} detected regions", regions.len(), boxes.len());
        Ok(regions)
    }
}

impl TextExtractor for PaddleOcrModel {
    fn extract_text(&self, image: &DynamicImage) -> Result<Vec<TextRegion>> {
        self.process(image)
    }
}
