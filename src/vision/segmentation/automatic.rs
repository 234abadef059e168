// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Automatic mask generation
//!
//! Prompts a [`PromptableSegmenter`] with a regular grid of foreground points,
//! keeps masks whose predicted IoU and stability clear their thresholds, and
//! removes duplicates with box non-maximum suppression.

use super::{MaskGenerator, MaskPrediction, MaskProposal, PromptableSegmenter};
use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use ndarray::Array2;
use tracing::debug;

/// Mask generation settings
#[derive(Debug, Clone)]
pub struct MaskGeneratorConfig {
    /// Grid points sampled along each image side
    pub points_per_side: usize,
    /// Grid points per progress group; every point is still decoded with its
    /// own prompt, so this never changes the result
    pub points_per_batch: usize,
    /// Minimum decoder-predicted IoU
    pub pred_iou_thresh: f32,
    /// Minimum stability score
    pub stability_score_thresh: f32,
    /// Logit offset used when computing stability
    pub stability_score_offset: f32,
    /// Logit threshold that binarizes masks
    pub mask_threshold: f32,
    /// Box IoU above which the lower-scoring mask is suppressed
    pub box_nms_thresh: f32,
    /// Cap on returned masks (`None` = unbounded)
    pub max_masks: Option<usize>,
}

impl Default for MaskGeneratorConfig {
    fn default() -> Self {
        Self {
            points_per_side: 50,
            points_per_batch: 100,
            pred_iou_thresh: 0.88,
            stability_score_thresh: 0.95,
            stability_score_offset: 1.0,
            mask_threshold: 0.0,
            box_nms_thresh: 0.7,
            max_masks: None,
        }
    }
}

/// Point-grid mask generator over any promptable segmenter
pub struct AutomaticMaskGenerator<S> {
    segmenter: S,
    config: MaskGeneratorConfig,
}

impl<S: PromptableSegmenter> AutomaticMaskGenerator<S> {
    pub fn new(segmenter: S, config: MaskGeneratorConfig) -> Self {
        Self { segmenter, config }
    }

    pub fn config(&self) -> &MaskGeneratorConfig {
        &self.config
    }

    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }

    /// Apply IoU and stability thresholds to one decoded mask
    fn evaluate(&self, point: [f32; 2], prediction: &MaskPrediction) -> Option<MaskProposal> {
        if prediction.predicted_iou < self.config.pred_iou_thresh {
            return None;
        }

        let stability = stability_score(
            &prediction.logits,
            self.config.mask_threshold,
            self.config.stability_score_offset,
        );
        if stability < self.config.stability_score_thresh {
            return None;
        }

        let (bbox, area) = mask_bbox(&prediction.logits, self.config.mask_threshold)?;

        Some(MaskProposal {
            point,
            predicted_iou: prediction.predicted_iou,
            stability_score: stability,
            bbox,
            area,
        })
    }
}

impl<S: PromptableSegmenter> MaskGenerator for AutomaticMaskGenerator<S> {
    fn generate(&self, image: &DynamicImage) -> Result<Vec<MaskProposal>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("Cannot segment an empty image");
        }

        let embedding = self.segmenter.embed(image)?;

        let points: Vec<[f32; 2]> = build_point_grid(self.config.points_per_side)
            .into_iter()
            .map(|[x, y]| [x * width as f32, y * height as f32])
            .collect();

        let mut candidates = Vec::new();
        for (batch_idx, batch) in points
            .chunks(self.config.points_per_batch.max(1))
            .enumerate()
        {
            let before = candidates.len();
            for &point in batch {
                for prediction in self.segmenter.predict_point(&embedding, point)? {
                    if let Some(proposal) = self.evaluate(point, &prediction) {
                        candidates.push(proposal);
                    }
                }
            }
            debug!(
                "Mask batch {}: {} points, {} masks kept",
                batch_idx,
                batch.len(),
                candidates.len() - before
            );
        }

        let mut masks = non_max_suppression(candidates, self.config.box_nms_thresh);
        if let Some(max) = self.config.max_masks {
            masks.truncate(max);
        }

        debug!("Generated {} masks for {}x{} image", masks.len(), width, height);
        Ok(masks)
    }
}

/// Evenly spaced `n x n` grid in normalized `[0, 1]` coordinates
///
/// Points sit at cell centers, row by row from the top left.
pub fn build_point_grid(n: usize) -> Vec<[f32; 2]> {
    if n == 0 {
        return Vec::new();
    }

    let offset = 1.0 / (2.0 * n as f32);
    let step = if n > 1 {
        (1.0 - 2.0 * offset) / (n - 1) as f32
    } else {
        0.0
    };
    let coords: Vec<f32> = (0..n).map(|i| offset + i as f32 * step).collect();

    let mut grid = Vec::with_capacity(n * n);
    for &y in &coords {
        for &x in &coords {
            grid.push([x, y]);
        }
    }
    grid
}

/// IoU between the mask binarized at `threshold + offset` and at
/// `threshold - offset`
pub fn stability_score(logits: &Array2<f32>, threshold: f32, offset: f32) -> f32 {
    let high = threshold + offset;
    let low = threshold - offset;

    let mut intersection = 0usize;
    let mut union = 0usize;
    for &v in logits.iter() {
        if v > high {
            intersection += 1;
        }
        if v > low {
            union += 1;
        }
    }

    if union == 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

/// Inclusive bounding box and pixel count of `logits > threshold`
pub fn mask_bbox(logits: &Array2<f32>, threshold: f32) -> Option<([u32; 4], usize)> {
    let mut x0 = usize::MAX;
    let mut y0 = usize::MAX;
    let mut x1 = 0;
    let mut y1 = 0;
    let mut area = 0;

    for ((y, x), &v) in logits.indexed_iter() {
        if v > threshold {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
            area += 1;
        }
    }

    if area == 0 {
        return None;
    }
    Some(([x0 as u32, y0 as u32, x1 as u32, y1 as u32], area))
}

/// IoU of two inclusive pixel boxes
pub fn box_iou(a: &[u32; 4], b: &[u32; 4]) -> f32 {
    let area = |r: &[u32; 4]| ((r[2] - r[0] + 1) as f32) * ((r[3] - r[1] + 1) as f32);

    let ix0 = a[0].max(b[0]);
    let iy0 = a[1].max(b[1]);
    let ix1 = a[2].min(b[2]);
    let iy1 = a[3].min(b[3]);
    if ix1 < ix0 || iy1 < iy0 {
        return 0.0;
    }

    let inter = ((ix1 - ix0 + 1) as f32) * ((iy1 - iy0 + 1) as f32);
    inter / (area(a) + area(b) - inter)
}

/// Greedy box NMS ordered by predicted IoU (highest first)
///
/// Ties keep grid order. The returned list stays sorted by predicted IoU.
pub fn non_max_suppression(mut masks: Vec<MaskProposal>, iou_thresh: f32) -> Vec<MaskProposal> {
    masks.sort_by(|a, b| b.predicted_iou.total_cmp(&a.predicted_iou));

    let mut kept: Vec<MaskProposal> = Vec::new();
    for mask in masks {
        if kept.iter().all(|k| box_iou(&k.bbox, &mask.bbox) <= iou_thresh) {
            kept.push(mask);
        }
    }
    kept
}
