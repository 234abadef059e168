// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR response types

use serde::{Deserialize, Serialize};

use crate::vision::TextRegion;

/// Quadrilateral corners: top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub x3: f32,
    pub y3: f32,
}

impl From<[[f32; 2]; 4]> for QuadBox {
    fn from(quad: [[f32; 2]; 4]) -> Self {
        let [[x0, y0], [x1, y1], [x2, y2], [x3, y3]] = quad;
        Self {
            x0,
            y0,
            x1,
            y1,
            x2,
            y2,
            x3,
            y3,
        }
    }
}

/// A detected text region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBoxEntry {
    /// Extracted text
    pub text: String,
    /// Region corners
    pub bbox: QuadBox,
}

/// Response from POST /obtainText
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    pub text_boxes: Vec<TextBoxEntry>,
}

impl From<Vec<TextRegion>> for OcrResponse {
    fn from(regions: Vec<TextRegion>) -> Self {
        Self {
            text_boxes: regions
                .into_iter()
                .map(|r| TextBoxEntry {
                    text: r.text,
                    bbox: QuadBox::from(r.quad),
                })
                .collect(),
        }
    }
}
