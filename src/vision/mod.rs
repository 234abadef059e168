// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module
//!
//! This module provides:
//! - Automatic mask proposals via a Segment Anything ONNX model
//! - OCR (Optical Character Recognition) via PaddleOCR
//! - Classical mask-guided inpainting

pub mod device;
pub mod image_utils;
pub mod inpaint;
pub mod model_manager;
pub mod ocr;
pub mod segmentation;

pub use device::{select_device, Device};
pub use image_utils::{
    decode_image_bytes, decode_mask_bytes, detect_format, encode_jpeg, ImageError, ImageInfo,
};
pub use model_manager::{VisionModelConfig, VisionModelInfo, VisionModelManager};
pub use ocr::{TextExtractor, TextRegion};
pub use segmentation::{MaskGenerator, MaskProposal};
