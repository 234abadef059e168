// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading the segmentation and OCR models

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::vision::device::Device;
use crate::vision::ocr::{PaddleOcrModel, TextExtractor};
use crate::vision::segmentation::{
    AutomaticMaskGenerator, MaskGenerator, MaskGeneratorConfig, SamModel, SamModelPaths,
};

/// Default OCR model directory
pub const DEFAULT_OCR_MODEL_DIR: &str = "./models/paddleocr-onnx";

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Segmentation model directory or encoder file (required)
    pub segmentation_model: PathBuf,
    /// Path to OCR model directory (optional)
    pub ocr_model_dir: Option<PathBuf>,
    /// Requested execution device
    pub device: Device,
    /// Automatic mask generator settings
    pub mask_generator: MaskGeneratorConfig,
}

impl VisionModelConfig {
    pub fn new(segmentation_model: impl Into<PathBuf>) -> Self {
        Self {
            segmentation_model: segmentation_model.into(),
            ocr_model_dir: Some(PathBuf::from(DEFAULT_OCR_MODEL_DIR)),
            device: Device::Cpu,
            mask_generator: MaskGeneratorConfig::default(),
        }
    }
}

/// Information about a loaded vision model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionModelInfo {
    /// Model name
    pub name: String,
    /// Model type (segmentation, ocr)
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Owns the model handles shared by the request handlers
///
/// Segmentation is required: failing to load it is an error. OCR is optional
/// and its absence is only logged.
pub struct VisionModelManager {
    mask_generator: Arc<AutomaticMaskGenerator<SamModel>>,
    ocr_model: Option<Arc<PaddleOcrModel>>,
    device: Device,
}

impl VisionModelManager {
    pub async fn new(config: VisionModelConfig) -> anyhow::Result<Self> {
        let paths = SamModelPaths::resolve(&config.segmentation_model)?;
        let sam = SamModel::new(&paths, config.device).await?;
        let device = sam.device();
        tracing::info!(
            "✅ Segmentation model loaded from {}",
            config.segmentation_model.display()
        );

        let mask_generator = Arc::new(AutomaticMaskGenerator::new(sam, config.mask_generator));

        let ocr_model = if let Some(ref dir) = config.ocr_model_dir {
            match PaddleOcrModel::new(dir, device).await {
                Ok(model) => {
                    tracing::info!("✅ PaddleOCR model loaded from {}", dir.display());
                    Some(Arc::new(model))
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to load OCR model from {}: {}", dir.display(), e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            mask_generator,
            ocr_model,
            device,
        })
    }

    /// Mask generator handle for `/calculate-boxes`
    pub fn mask_generator(&self) -> Arc<dyn MaskGenerator> {
        self.mask_generator.clone()
    }

    /// OCR handle for `/obtainText`, if the models loaded
    pub fn text_extractor(&self) -> Option<Arc<dyn TextExtractor>> {
        self.ocr_model
            .clone()
            .map(|model| model as Arc<dyn TextExtractor>)
    }

    /// Device the segmentation model runs on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Check if OCR is available
    pub fn has_ocr(&self) -> bool {
        self.ocr_model.is_some()
    }

    /// List all vision models and their availability
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            VisionModelInfo {
                name: "segment-anything".to_string(),
                model_type: "segmentation".to_string(),
                available: true,
            },
            VisionModelInfo {
                name: "paddleocr".to_string(),
                model_type: "ocr".to_string(),
                available: self.ocr_model.is_some(),
            },
        ]
    }
}
