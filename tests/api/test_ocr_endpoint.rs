// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! OCR endpoint tests for POST /obtainText
//!
//! Uses a fixed-output text extractor; the PaddleOCR pipeline itself is
//! covered in tests/vision.

use axum::http::StatusCode;
use desktop_vision_server::api::create_app;
use image::DynamicImage;
use std::sync::Arc;

use crate::common::{
    body_json, gradient_image, multipart_request, png_bytes, send, state_with, text_region,
    CenterMaskGenerator, FakeTextExtractor,
};

fn app_with_regions(regions: Vec<desktop_vision_server::vision::TextRegion>) -> axum::Router {
    create_app(state_with(
        Arc::new(CenterMaskGenerator::new(vec![])),
        Some(Arc::new(FakeTextExtractor { regions })),
    ))
}

fn sample_png() -> Vec<u8> {
    png_bytes(&DynamicImage::ImageRgb8(gradient_image(120, 60)))
}

#[cfg(test)]
mod ocr_handler_tests {
    use super::*;

    /// Test 1: Regions are returned as textBoxes with x0..y3 corners
    #[tokio::test]
    async fn test_returns_text_boxes() {
        let app = app_with_regions(vec![
            text_region("HELLO", 10.0, 5.0, 50.0, 12.0),
            text_region("WORLD", 10.0, 30.0, 60.0, 12.0),
        ]);

        let image = sample_png();
        let response = send(
            app,
            multipart_request("/obtainText", &[("image", image.as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let boxes = json["textBoxes"].as_array().unwrap();
        assert_eq!(boxes.len(), 2);

        assert_eq!(boxes[0]["text"], "HELLO");
        assert_eq!(boxes[1]["text"], "WORLD");

        let bbox = &boxes[0]["bbox"];
        assert_eq!(bbox["x0"].as_f64(), Some(10.0));
        assert_eq!(bbox["y0"].as_f64(), Some(5.0));
        assert_eq!(bbox["x2"].as_f64(), Some(60.0));
        assert_eq!(bbox["y2"].as_f64(), Some(17.0));
        assert_eq!(bbox["x3"].as_f64(), Some(10.0));
        assert_eq!(bbox["y3"].as_f64(), Some(17.0));
    }

    /// Test 2: Every bbox runs top-left to bottom-right
    #[tokio::test]
    async fn test_bbox_corner_order() {
        let app = app_with_regions(vec![text_region("A", 3.0, 4.0, 8.0, 9.0)]);

        let image = sample_png();
        let response = send(
            app,
            multipart_request("/obtainText", &[("image", image.as_slice())]),
        )
        .await;
        let json = body_json(response).await;

        for entry in json["textBoxes"].as_array().unwrap() {
            let b = &entry["bbox"];
            assert!(b["x0"].as_f64() < b["x2"].as_f64());
            assert!(b["y0"].as_f64() < b["y2"].as_f64());
            assert!(b["x1"].as_f64() > b["x3"].as_f64());
        }
    }

    /// Test 3: No text yields an empty list, not an error
    #[tokio::test]
    async fn test_no_text_found() {
        let app = app_with_regions(vec![]);

        let image = sample_png();
        let response = send(
            app,
            multipart_request("/obtainText", &[("image", image.as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({"textBoxes": []}));
    }

    /// Test 4: Without OCR models the route reports 503
    #[tokio::test]
    async fn test_ocr_not_loaded() {
        let app = create_app(state_with(Arc::new(CenterMaskGenerator::new(vec![])), None));

        let image = sample_png();
        let response = send(
            app,
            multipart_request("/obtainText", &[("image", image.as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["errorType"], "service_unavailable");
        assert_eq!(json["message"], "OCR model not loaded");
    }

    /// Test 5: Undecodable upload
    #[tokio::test]
    async fn test_invalid_image() {
        let app = app_with_regions(vec![text_region("X", 0.0, 0.0, 5.0, 5.0)]);

        let response = send(
            app,
            multipart_request("/obtainText", &[("image", [0x89u8, 0x50, 0x4E, 0x47, 0x00].as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["details"]["field"], "image");
    }

    /// Test 6: Empty image field
    #[tokio::test]
    async fn test_empty_image_field() {
        let app = app_with_regions(vec![]);

        let response = send(
            app,
            multipart_request("/obtainText", &[("image", b"".as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["message"].as_str().unwrap().contains("empty"));
    }
}
