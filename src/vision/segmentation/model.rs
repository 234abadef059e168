// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Segment Anything ONNX model (image encoder + prompt decoder)
//!
//! The encoder turns a 1024x1024 normalized image into a feature map once per
//! request; the decoder is then run for every point prompt against that map.

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::{Array1, Array2, Array3, Array4, Axis, Ix2, Ix4};
use ort::session::Session;
use ort::value::{TensorRef, Value};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_encoder, transform_point, SAM_MASK_INPUT_SIZE};
use super::{MaskPrediction, PromptableSegmenter};
use crate::vision::device::{build_session, first_input_name, Device};

/// Encoder file name inside a model directory
pub const ENCODER_FILE: &str = "encoder.onnx";
/// Decoder file name inside a model directory
pub const DECODER_FILE: &str = "decoder.onnx";

/// Mask planes produced by the decoder in multimask mode
pub const MULTIMASK_PLANES: usize = 3;

/// Resolved locations of the encoder and decoder graphs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamModelPaths {
    pub encoder: PathBuf,
    pub decoder: PathBuf,
}

impl SamModelPaths {
    /// Resolve the `--model` argument
    ///
    /// Accepts either a directory holding `encoder.onnx` and `decoder.onnx`,
    /// or the encoder file itself. For a file, the decoder is the sibling
    /// whose name swaps `encoder` for `decoder` (e.g. `vit_b_encoder.onnx` ->
    /// `vit_b_decoder.onnx`), falling back to `decoder.onnx`.
    pub fn resolve(model: &Path) -> Result<Self> {
        if model.is_dir() {
            let paths = Self {
                encoder: model.join(ENCODER_FILE),
                decoder: model.join(DECODER_FILE),
            };
            return paths.verified();
        }

        if !model.is_file() {
            anyhow::bail!("Segmentation model not found: {}", model.display());
        }

        let file_name = model
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid model path: {}", model.display()))?;

        let swapped = model.with_file_name(file_name.replace("encoder", "decoder"));
        let decoder = if swapped != model && swapped.is_file() {
            swapped
        } else {
            model.with_file_name(DECODER_FILE)
        };

        Self {
            encoder: model.to_path_buf(),
            decoder,
        }
        .verified()
    }

    fn verified(self) -> Result<Self> {
        if !self.encoder.is_file() {
            anyhow::bail!("Segmentation encoder not found: {}", self.encoder.display());
        }
        if !self.decoder.is_file() {
            anyhow::bail!("Segmentation decoder not found: {}", self.decoder.display());
        }
        Ok(self)
    }
}

/// Encoder output for one image
#[derive(Debug, Clone)]
pub struct SamEmbedding {
    /// Image feature map, shape [1, 256, 64, 64]
    pub features: Array4<f32>,
    pub width: u32,
    pub height: u32,
}

/// ONNX Segment Anything model
#[derive(Clone)]
pub struct SamModel {
    encoder: Arc<Mutex<Session>>,
    decoder: Arc<Mutex<Session>>,
    encoder_input: String,
    device: Device,
}

impl std::fmt::Debug for SamModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamModel")
            .field("encoder_input", &self.encoder_input)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl SamModel {
    /// Load both graphs on `device`
    ///
    /// If either graph had to fall back to CPU, the reported device is CPU.
    pub async fn new(paths: &SamModelPaths, device: Device) -> Result<Self> {
        info!("Loading segmentation encoder from {}", paths.encoder.display());
        let (encoder, encoder_device) = build_session(&paths.encoder, device)?;

        info!("Loading segmentation decoder from {}", paths.decoder.display());
        let (decoder, decoder_device) = build_session(&paths.decoder, device)?;

        let encoder_input = first_input_name(&encoder, "image");
        let device = if encoder_device == Device::Cuda && decoder_device == Device::Cuda {
            Device::Cuda
        } else {
            Device::Cpu
        };

        info!("Segmentation model loaded (encoder input: {})", encoder_input);

        Ok(Self {
            encoder: Arc::new(Mutex::new(encoder)),
            decoder: Arc::new(Mutex::new(decoder)),
            encoder_input,
            device,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

impl PromptableSegmenter for SamModel {
    type Embedding = SamEmbedding;

    fn embed(&self, image: &DynamicImage) -> Result<SamEmbedding> {
        let (width, height) = image.dimensions();
        let input = preprocess_for_encoder(image);
        let input_value = Value::from_array(input).context("Failed to create encoder tensor")?;

        let mut session = self
            .encoder
            .lock()
            .map_err(|e| anyhow!("Encoder session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs![&self.encoder_input => input_value])
            .context("Segmentation encoder inference failed")?;

        let features = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract image embeddings")?
            .to_owned()
            .into_dimensionality::<Ix4>()
            .context("Unexpected image embedding rank")?;

        debug!("Image embedding shape: {:?}", features.shape());

        Ok(SamEmbedding {
            features,
            width,
            height,
        })
    }

    fn predict_point(
        &self,
        embedding: &SamEmbedding,
        point: [f32; 2],
    ) -> Result<Vec<MaskPrediction>> {
        let [px, py] = transform_point(point, embedding.width, embedding.height);

        // one foreground point plus the padding point the decoder expects
        let point_coords = Array3::from_shape_vec((1, 2, 2), vec![px, py, 0.0, 0.0])?;
        let point_labels = Array2::from_shape_vec((1, 2), vec![1.0f32, -1.0])?;
        let mask_input =
            Array4::<f32>::zeros((1, 1, SAM_MASK_INPUT_SIZE, SAM_MASK_INPUT_SIZE));
        let has_mask_input = Array1::from_vec(vec![0.0f32]);
        let orig_im_size =
            Array1::from_vec(vec![embedding.height as f32, embedding.width as f32]);

        let embeddings_value = TensorRef::from_array_view(embedding.features.view())?;
        let coords_value = Value::from_array(point_coords)?;
        let labels_value = Value::from_array(point_labels)?;
        let mask_input_value = Value::from_array(mask_input)?;
        let has_mask_value = Value::from_array(has_mask_input)?;
        let orig_size_value = Value::from_array(orig_im_size)?;

        let mut session = self
            .decoder
            .lock()
            .map_err(|e| anyhow!("Decoder session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs![
                "image_embeddings" => embeddings_value,
                "point_coords" => coords_value,
                "point_labels" => labels_value,
                "mask_input" => mask_input_value,
                "has_mask_input" => has_mask_value,
                "orig_im_size" => orig_size_value,
            ])
            .context("Segmentation decoder inference failed")?;

        // masks: [1, C, H, W] logits; iou_predictions: [1, C]
        let masks = outputs["masks"]
            .try_extract_array::<f32>()
            .context("Failed to extract masks")?
            .to_owned();
        let scores: Vec<f32> = outputs["iou_predictions"]
            .try_extract_array::<f32>()
            .context("Failed to extract IoU predictions")?
            .iter()
            .copied()
            .collect();

        if masks.ndim() != 4 {
            anyhow::bail!("Unexpected mask output shape: {:?}", masks.shape());
        }

        let planes = masks.index_axis(Axis(0), 0);
        let selected = multimask_planes(planes.shape()[0]);
        let mut predictions = Vec::with_capacity(selected.len());
        for c in selected {
            let logits = planes
                .index_axis(Axis(0), c)
                .to_owned()
                .into_dimensionality::<Ix2>()
                .context("Unexpected mask plane rank")?;
            predictions.push(MaskPrediction {
                logits,
                predicted_iou: scores.get(c).copied().unwrap_or(0.0),
            });
        }

        Ok(predictions)
    }
}

/// Decoder planes used as mask candidates
///
/// A four-plane decoder output carries the single-mask token at index 0 ahead
/// of the three multimask planes; only the multimask planes are kept.
pub fn multimask_planes(plane_count: usize) -> Range<usize> {
    if plane_count == MULTIMASK_PLANES + 1 {
        1..plane_count
    } else {
        0..plane_count
    }
}
