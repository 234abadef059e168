// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;
use std::path::PathBuf;

use crate::api::ServerConfig;
use crate::vision::model_manager::DEFAULT_OCR_MODEL_DIR;
use crate::vision::segmentation::MaskGeneratorConfig;
use crate::vision::{Device, VisionModelConfig};

/// Desktop vision server: mask proposals, OCR and inpainting over HTTP
#[derive(Parser, Debug, Clone)]
#[command(name = "desktop-vision-server")]
#[command(version)]
#[command(about = "HTTP server for mask proposals, text extraction and inpainting", long_about = None)]
pub struct Cli {
    /// TCP port to bind
    #[arg(long)]
    pub port: u16,

    /// Segmentation model: directory with encoder.onnx and decoder.onnx, or the encoder file
    #[arg(long)]
    pub model: PathBuf,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// PaddleOCR model directory (det_model.onnx, rec_model.onnx, ppocr_keys_v1.txt)
    #[arg(long, default_value = DEFAULT_OCR_MODEL_DIR)]
    pub ocr_model_dir: PathBuf,

    /// Maximum number of mask proposals per image (unbounded if unset)
    #[arg(long)]
    pub max_masks: Option<usize>,

    /// Force CPU execution even when CUDA is available
    #[arg(long)]
    pub cpu: bool,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.host.clone(), self.port)
    }

    pub fn vision_config(&self, device: Device) -> VisionModelConfig {
        VisionModelConfig {
            segmentation_model: self.model.clone(),
            ocr_model_dir: Some(self.ocr_model_dir.clone()),
            device,
            mask_generator: MaskGeneratorConfig {
                max_masks: self.max_masks,
                ..Default::default()
            },
        }
    }
}
