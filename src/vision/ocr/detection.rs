// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text detection model
//!
//! This module provides the text detection component of PaddleOCR.
//! The model outputs a per-pixel text probability map; DB post-processing
//! turns it into rotated quadrilaterals.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array4, ArrayView2, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::OCR_INPUT_SIZE;
use crate::vision::device::{build_session, first_input_name, Device};

/// Expected input size for detection model
pub const DETECTION_INPUT_SIZE: u32 = OCR_INPUT_SIZE; // 640x640

/// Boxes whose top edges are within this many pixels count as the same line
const LINE_TOLERANCE: f32 = 10.0;

/// A detected text quad in detection input space
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    /// Corners clockwise from top-left
    pub quad: [[f32; 2]; 4],
    /// Mean probability over the component
    pub score: f32,
}

impl TextBox {
    /// Length of the shorter side
    pub fn short_side(&self) -> f32 {
        let [a, b, _, d] = self.quad;
        distance(a, b).min(distance(a, d))
    }
}

/// DB (Differentiable Binarization) post-processing settings
#[derive(Debug, Clone)]
pub struct DbPostProcessConfig {
    /// Probability threshold for the binary map
    pub binary_thresh: f32,
    /// Minimum mean probability of a component
    pub box_thresh: f32,
    /// Expansion ratio applied to shrunk text kernels
    pub unclip_ratio: f32,
    /// Components with at most this many pixels are noise
    pub min_region_pixels: usize,
    /// Minimum short side of a box, before and after unclipping
    pub min_side: f32,
}

impl Default for DbPostProcessConfig {
    fn default() -> Self {
        Self {
            binary_thresh: 0.3,
            box_thresh: 0.6,
            unclip_ratio: 1.5,
            min_region_pixels: 10,
            min_side: 3.0,
        }
    }
}

/// PaddleOCR text detection model
#[derive(Clone)]
pub struct OcrDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Post-processing settings
    config: DbPostProcessConfig,
}

impl std::fmt::Debug for OcrDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrDetectionModel")
            .field("input_name", &self.input_name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OcrDetectionModel {
    /// Load the OCR detection model (det_model.onnx)
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime fails to load it
    pub async fn new<P: AsRef<Path>>(model_path: P, device: Device) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR detection model not found: {}", model_path.display());
        }

        info!("Loading OCR detection model from {}", model_path.display());

        let (session, _) = build_session(model_path, device)?;
        let input_name = first_input_name(&session, "x");

        debug!("Detection model loaded - input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            config: DbPostProcessConfig::default(),
        })
    }

    /// Run text detection on a preprocessed image tensor
    ///
    /// The input should come from `preprocess_for_detection()`. Returned
    /// quads are in the same (padded, 640x640) coordinate space.
    pub fn detect(&self, input: &Array4<f32>) -> Result<Vec<TextBox>> {
        let shape = input.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }
        let (input_height, input_width) = (shape[2], shape[3]);

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let prob_map = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| anyhow!("Detection session lock poisoned: {}", e))?;

            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("Detection inference failed")?;

            outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?
                .to_owned()
        };

        debug!("Detection output shape: {:?}", prob_map.shape());

        // [1, 1, H, W] or [1, H, W]
        let mut plane = prob_map.view();
        while plane.ndim() > 2 {
            plane = plane.index_axis_move(Axis(0), 0);
        }
        let plane = plane
            .into_dimensionality::<Ix2>()
            .context("Unexpected detection output shape")?;

        let scale_x = input_width as f32 / plane.ncols().max(1) as f32;
        let scale_y = input_height as f32 / plane.nrows().max(1) as f32;

        let mut boxes = db_postprocess(plane, &self.config);
        for text_box in &mut boxes {
            for corner in &mut text_box.quad {
                corner[0] *= scale_x;
                corner[1] *= scale_y;
            }
        }

        debug!("Detected {} text regions", boxes.len());
        Ok(boxes)
    }
}

/// Turn a probability map into text quads
///
/// Binarize, collect 4-connected components, filter by size and mean
/// probability, fit the minimum-area rectangle around each component's pixel
/// footprint, then expand it by `area * unclip_ratio / perimeter`. Output is
/// sorted in reading order.
pub fn db_postprocess(prob: ArrayView2<f32>, config: &DbPostProcessConfig) -> Vec<TextBox> {
    let (height, width) = prob.dim();
    let mut visited = vec![false; width * height];
    let mut boxes = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y * width + x] || prob[[y, x]] < config.binary_thresh {
                continue;
            }

            let (pixels, sum_prob) = flood_fill(&prob, &mut visited, x, y, config.binary_thresh);
            if pixels.len() <= config.min_region_pixels {
                continue;
            }

            let score = sum_prob / pixels.len() as f32;
            if score < config.box_thresh {
                continue;
            }

            let mut corners = Vec::with_capacity(pixels.len() * 4);
            for &(px, py) in &pixels {
                let (fx, fy) = (px as f32, py as f32);
                corners.extend_from_slice(&[[fx, fy], [fx + 1.0, fy], [fx, fy + 1.0], [fx + 1.0, fy + 1.0]]);
            }

            let hull = convex_hull(corners);
            let Some(rect) = min_area_rect(&hull) else {
                continue;
            };
            if rect.short_side() < config.min_side {
                continue;
            }

            let rect = rect.unclip(config.unclip_ratio);
            if rect.short_side() < config.min_side + 2.0 {
                continue;
            }

            boxes.push(TextBox {
                quad: order_corners(rect.corners()),
                score,
            });
        }
    }

    sort_reading_order(&mut boxes);
    boxes
}

/// Collect the 4-connected component containing (start_x, start_y)
fn flood_fill(
    prob: &ArrayView2<f32>,
    visited: &mut [bool],
    start_x: usize,
    start_y: usize,
    threshold: f32,
) -> (Vec<(usize, usize)>, f32) {
    let (height, width) = prob.dim();
    let mut stack = vec![(start_x, start_y)];
    let mut pixels = Vec::new();
    let mut sum_prob = 0.0;

    while let Some((x, y)) = stack.pop() {
        let idx = y * width + x;
        if visited[idx] {
            continue;
        }
        let p = prob[[y, x]];
        if p < threshold {
            continue;
        }

        visited[idx] = true;
        pixels.push((x, y));
        sum_prob += p;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    (pixels, sum_prob)
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn cross(o: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Convex hull (Andrew's monotone chain), counter-clockwise in math axes
pub fn convex_hull(mut points: Vec<[f32; 2]>) -> Vec<[f32; 2]> {
    points.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let mut hull: Vec<[f32; 2]> = Vec::with_capacity(points.len() * 2);
    for &p in &points {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    let lower_len = hull.len() + 1;
    for &p in points.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop();
    hull
}

/// Rotated rectangle: center plus two orthonormal axes with half extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: [f32; 2],
    pub axis_u: [f32; 2],
    pub axis_v: [f32; 2],
    pub half_u: f32,
    pub half_v: f32,
}

impl RotatedRect {
    pub fn short_side(&self) -> f32 {
        2.0 * self.half_u.min(self.half_v)
    }

    pub fn area(&self) -> f32 {
        4.0 * self.half_u * self.half_v
    }

    pub fn perimeter(&self) -> f32 {
        4.0 * (self.half_u + self.half_v)
    }

    /// Grow every side outwards by `area * ratio / perimeter`
    pub fn unclip(self, ratio: f32) -> Self {
        let perimeter = self.perimeter();
        if perimeter <= 0.0 {
            return self;
        }
        let d = self.area() * ratio / perimeter;
        Self {
            half_u: self.half_u + d,
            half_v: self.half_v + d,
            ..self
        }
    }

    pub fn corners(&self) -> [[f32; 2]; 4] {
        let [cx, cy] = self.center;
        let (u, v) = (self.axis_u, self.axis_v);
        let at = |su: f32, sv: f32| {
            [
                cx + su * self.half_u * u[0] + sv * self.half_v * v[0],
                cy + su * self.half_u * u[1] + sv * self.half_v * v[1],
            ]
        };
        [at(-1.0, -1.0), at(1.0, -1.0), at(1.0, 1.0), at(-1.0, 1.0)]
    }
}

/// Minimum-area enclosing rectangle of a convex hull (rotating calipers)
pub fn min_area_rect(hull: &[[f32; 2]]) -> Option<RotatedRect> {
    if hull.len() < 3 {
        return None;
    }

    let mut best: Option<(f32, RotatedRect)> = None;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let len = distance(a, b);
        if len <= f32::EPSILON {
            continue;
        }

        let u = [(b[0] - a[0]) / len, (b[1] - a[1]) / len];
        let v = [-u[1], u[0]];

        let (mut min_u, mut max_u) = (f32::MAX, f32::MIN);
        let (mut min_v, mut max_v) = (f32::MAX, f32::MIN);
        for p in hull {
            let pu = p[0] * u[0] + p[1] * u[1];
            let pv = p[0] * v[0] + p[1] * v[1];
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if best.as_ref().map_or(true, |(a, _)| area < *a) {
            let cu = (min_u + max_u) / 2.0;
            let cv = (min_v + max_v) / 2.0;
            best = Some((
                area,
                RotatedRect {
                    center: [cu * u[0] + cv * v[0], cu * u[1] + cv * v[1]],
                    axis_u: u,
                    axis_v: v,
                    half_u: (max_u - min_u) / 2.0,
                    half_v: (max_v - min_v) / 2.0,
                },
            ));
        }
    }

    best.map(|(_, rect)| rect)
}

/// Order four corners as top-left, top-right, bottom-right, bottom-left
pub fn order_corners(mut pts: [[f32; 2]; 4]) -> [[f32; 2]; 4] {
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));

    let (tl, bl) = if pts[0][1] <= pts[1][1] {
        (pts[0], pts[1])
    } else {
        (pts[1], pts[0])
    };
    let (tr, br) = if pts[2][1] <= pts[3][1] {
        (pts[2], pts[3])
    } else {
        (pts[3], pts[2])
    };

    [tl, tr, br, bl]
}

/// Sort top-to-bottom, then left-to-right within a line
pub fn sort_reading_order(boxes: &mut [TextBox]) {
    boxes.sort_by(|a, b| {
        a.quad[0][1]
            .total_cmp(&b.quad[0][1])
            .then(a.quad[0][0].total_cmp(&b.quad[0][0]))
    });

    // one bubble pass per position keeps nearly-level boxes left-to-right
    for i in 0..boxes.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            let same_line = (boxes[j + 1].quad[0][1] - boxes[j].quad[0][1]).abs() < LINE_TOLERANCE;
            if same_line && boxes[j + 1].quad[0][0] < boxes[j].quad[0][0] {
                boxes.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
}
