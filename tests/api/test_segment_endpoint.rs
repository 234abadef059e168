// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Mask proposal endpoint tests for POST /calculate-boxes
//!
//! The mask generator is faked so these tests cover request handling only:
//! form parsing, image validation, response shape and error mapping.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use desktop_vision_server::api::create_app;
use image::DynamicImage;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::common::{
    body_json, default_app, gradient_image, multipart_request, png_bytes, send, state_with,
    CenterMaskGenerator, FailingMaskGenerator,
};

fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    png_bytes(&DynamicImage::ImageRgb8(gradient_image(width, height)))
}

#[cfg(test)]
mod segment_handler_tests {
    use super::*;

    /// Test 1: Seed points come back in generator order
    #[tokio::test]
    async fn test_returns_mask_coordinates_in_order() {
        let generator = Arc::new(CenterMaskGenerator::new(vec![[1.0, 2.0], [35.5, 17.0]]));
        let app = create_app(state_with(generator.clone(), None));

        let image = gradient_png(40, 20);
        let response = send(
            app,
            multipart_request("/calculate-boxes", &[("image", image.as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let masks = json["masks"].as_array().unwrap();
        assert_eq!(masks.len(), 3);

        assert_eq!(masks[0]["coordinates"]["x"].as_f64(), Some(20.0));
        assert_eq!(masks[0]["coordinates"]["y"].as_f64(), Some(10.0));
        assert_eq!(masks[1]["coordinates"]["x"].as_f64(), Some(1.0));
        assert_eq!(masks[1]["coordinates"]["y"].as_f64(), Some(2.0));
        assert_eq!(masks[2]["coordinates"]["x"].as_f64(), Some(35.5));

        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    /// Test 2: JPEG uploads are accepted
    #[tokio::test]
    async fn test_accepts_jpeg_upload() {
        let image = DynamicImage::ImageRgb8(gradient_image(32, 32));
        let jpeg = crate::common::encode(&image, image::ImageFormat::Jpeg);

        let response = send(
            default_app(),
            multipart_request("/calculate-boxes", &[("image", jpeg.as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["masks"][0]["coordinates"]["x"].as_f64(), Some(16.0));
    }

    /// Test 3: Missing image field is a validation error
    #[tokio::test]
    async fn test_missing_image_field() {
        let response = send(
            default_app(),
            multipart_request("/calculate-boxes", &[("picture", b"whatever".as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["errorType"], "validation_error");
        assert_eq!(json["details"]["field"], "image");
        assert!(json["message"].as_str().unwrap().contains("required"));
    }

    /// Test 4: Bytes that are not an image are rejected
    #[tokio::test]
    async fn test_undecodable_image() {
        let response = send(
            default_app(),
            multipart_request("/calculate-boxes", &[("image", b"definitely not a png".as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["details"]["field"], "image");
        assert!(json["message"].as_str().unwrap().contains("Invalid image"));
    }

    /// Test 5: Non-multipart bodies are rejected before any model work
    #[tokio::test]
    async fn test_non_multipart_request() {
        let generator = Arc::new(CenterMaskGenerator::new(vec![]));
        let app = create_app(state_with(generator.clone(), None));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/calculate-boxes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"image": "abc"}"#))
            .unwrap();

        let response = send(app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["errorType"], "invalid_request");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    /// Test 6: A truncated multipart stream is a bad request
    #[tokio::test]
    async fn test_malformed_multipart_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/calculate-boxes")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", crate::common::BOUNDARY),
            )
            .body(Body::from("this body has no boundary at all"))
            .unwrap();

        let response = send(default_app(), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Test 7: Generator failures surface as 500
    #[tokio::test]
    async fn test_generator_failure_is_internal_error() {
        let app = create_app(state_with(Arc::new(FailingMaskGenerator), None));

        let image = gradient_png(16, 16);
        let response = send(
            app,
            multipart_request("/calculate-boxes", &[("image", image.as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["errorType"], "internal_error");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("encoder inference failed"));
    }
}
