// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers for integration tests: fake model handles, image fixtures
//! and multipart request building.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use desktop_vision_server::{
    api::{create_app, AppState},
    vision::{Device, MaskGenerator, MaskProposal, TextExtractor, TextRegion},
};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "vision-test-boundary-7d3c";

/// Proposes one mask seeded at the image center, followed by `extra` fixed points
pub struct CenterMaskGenerator {
    pub extra: Vec<[f32; 2]>,
    pub calls: AtomicUsize,
}

impl CenterMaskGenerator {
    pub fn new(extra: Vec<[f32; 2]>) -> Self {
        Self {
            extra,
            calls: AtomicUsize::new(0),
        }
    }
}

fn proposal(point: [f32; 2], predicted_iou: f32) -> MaskProposal {
    MaskProposal {
        point,
        predicted_iou,
        stability_score: 0.99,
        bbox: [0, 0, 1, 1],
        area: 4,
    }
}

impl MaskGenerator for CenterMaskGenerator {
    fn generate(&self, image: &DynamicImage) -> Result<Vec<MaskProposal>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (w, h) = image.dimensions();

        let mut proposals = vec![proposal([w as f32 / 2.0, h as f32 / 2.0], 0.99)];
        proposals.extend(self.extra.iter().map(|&p| proposal(p, 0.9)));
        Ok(proposals)
    }
}

/// Always fails, as a broken model session would
pub struct FailingMaskGenerator;

impl MaskGenerator for FailingMaskGenerator {
    fn generate(&self, _image: &DynamicImage) -> Result<Vec<MaskProposal>> {
        anyhow::bail!("Segmentation encoder inference failed")
    }
}

/// Returns a fixed set of regions for every image
pub struct FakeTextExtractor {
    pub regions: Vec<TextRegion>,
}

impl TextExtractor for FakeTextExtractor {
    fn extract_text(&self, _image: &DynamicImage) -> Result<Vec<TextRegion>> {
        Ok(self.regions.clone())
    }
}

pub fn text_region(text: &str, x: f32, y: f32, w: f32, h: f32) -> TextRegion {
    TextRegion {
        text: text.to_string(),
        confidence: 0.97,
        quad: [[x, y], [x + w, y], [x + w, y + h], [x, y + h]],
    }
}

pub fn state_with(
    mask_generator: Arc<dyn MaskGenerator>,
    text_extractor: Option<Arc<dyn TextExtractor>>,
) -> Arc<AppState> {
    Arc::new(AppState::new(mask_generator, text_extractor, Device::Cpu))
}

/// App with a center-point mask generator and no OCR
pub fn default_app() -> Router {
    create_app(state_with(Arc::new(CenterMaskGenerator::new(vec![])), None))
}

/// Horizontal/vertical color ramp
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    encode(image, ImageFormat::Png)
}

/// Build a multipart/form-data body with one file part per (field, bytes)
pub fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, data) in parts {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}.png\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
