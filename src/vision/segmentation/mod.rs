// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Automatic mask proposal (Segment Anything style)
//!
//! Components:
//! - `preprocessing` - Resize/normalize/pad images for the image encoder
//! - `model` - ONNX image encoder + prompt decoder pair
//! - `automatic` - Point-grid prompting, mask filtering and box NMS
//!
//! Request handlers only see [`MaskGenerator`]; the encoder/decoder pair sits
//! behind [`PromptableSegmenter`] so generation can run against any model.

pub mod automatic;
pub mod model;
pub mod preprocessing;

use anyhow::Result;
use image::DynamicImage;
use ndarray::Array2;

pub use automatic::{AutomaticMaskGenerator, MaskGeneratorConfig};
pub use model::{SamEmbedding, SamModel, SamModelPaths};

/// One mask plane returned by the prompt decoder
#[derive(Debug, Clone)]
pub struct MaskPrediction {
    /// Mask logits at original image resolution, indexed `[y, x]`
    pub logits: Array2<f32>,
    /// Decoder's own estimate of mask quality
    pub predicted_iou: f32,
}

/// A mask that survived filtering and NMS
#[derive(Debug, Clone, PartialEq)]
pub struct MaskProposal {
    /// Prompt point that produced the mask, in original image pixels
    pub point: [f32; 2],
    pub predicted_iou: f32,
    pub stability_score: f32,
    /// Inclusive pixel bounds `[x0, y0, x1, y1]`
    pub bbox: [u32; 4],
    /// Number of mask pixels
    pub area: usize,
}

/// Produces mask proposals for a whole image
pub trait MaskGenerator: Send + Sync {
    fn generate(&self, image: &DynamicImage) -> Result<Vec<MaskProposal>>;
}

/// A promptable segmentation model: encode once, decode per point prompt
pub trait PromptableSegmenter: Send + Sync {
    /// Per-image features reused across point prompts
    type Embedding: Send;

    fn embed(&self, image: &DynamicImage) -> Result<Self::Embedding>;

    /// Decode the masks for a single foreground point given in original
    /// image pixel coordinates.
    fn predict_point(
        &self,
        embedding: &Self::Embedding,
        point: [f32; 2],
    ) -> Result<Vec<MaskPrediction>>;
}
