// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Inpainting endpoint tests for POST /inpaint

use axum::http::{header, StatusCode};
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage};

use crate::common::{
    body_bytes, body_json, default_app, gradient_image, multipart_request, png_bytes, send,
};

fn mask_png(width: u32, height: u32, rect: Option<(u32, u32, u32, u32)>) -> Vec<u8> {
    let mask = GrayImage::from_fn(width, height, |x, y| match rect {
        Some((x0, y0, x1, y1)) if x >= x0 && x < x1 && y >= y0 && y < y1 => Luma([255]),
        _ => Luma([0]),
    });
    png_bytes(&DynamicImage::ImageLuma8(mask))
}

#[cfg(test)]
mod inpaint_handler_tests {
    use super::*;

    /// Test 1: An all-zero mask returns a JPEG attachment of the same size
    #[tokio::test]
    async fn test_empty_mask_returns_jpeg_attachment() {
        let image = png_bytes(&DynamicImage::ImageRgb8(gradient_image(48, 32)));
        let mask = mask_png(48, 32, None);

        let response = send(
            default_app(),
            multipart_request(
                "/inpaint",
                &[("image", image.as_slice()), ("inpaintMask", mask.as_slice())],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/jpg"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"inpaint.jpg\""
        );

        let bytes = body_bytes(response).await;
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
        let result = image::load_from_memory(&bytes).unwrap();
        assert_eq!(result.dimensions(), (48, 32));
    }

    /// Test 2: A masked dark rectangle on a flat background is filled in and
    /// the unmasked background comes back unchanged
    #[tokio::test]
    async fn test_masked_region_is_repaired() {
        let source = RgbImage::from_fn(48, 40, |x, y| {
            if (20..30).contains(&x) && (15..25).contains(&y) {
                Rgb([0, 0, 0])
            } else {
                Rgb([100, 100, 100])
            }
        });
        let image = png_bytes(&DynamicImage::ImageRgb8(source));
        let mask = mask_png(48, 40, Some((19, 14, 31, 26)));

        let response = send(
            default_app(),
            multipart_request(
                "/inpaint",
                &[("image", image.as_slice()), ("inpaintMask", mask.as_slice())],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let result = image::load_from_memory(&body_bytes(response).await)
            .unwrap()
            .to_rgb8();

        let inside = [(25, 20), (20, 15), (29, 24), (22, 23)];
        let outside = [(2, 2), (45, 37), (18, 20), (31, 20), (25, 13), (25, 26), (0, 39)];
        for (x, y) in inside.into_iter().chain(outside) {
            let pixel = result.get_pixel(x, y);
            for channel in pixel.0 {
                assert!(
                    (channel as i32 - 100).abs() <= 8,
                    "pixel ({}, {}) = {:?}",
                    x,
                    y,
                    pixel
                );
            }
        }
    }

    /// Test 3: Mask and image sizes must agree
    #[tokio::test]
    async fn test_dimension_mismatch() {
        let image = png_bytes(&DynamicImage::ImageRgb8(gradient_image(40, 30)));
        let mask = mask_png(20, 20, None);

        let response = send(
            default_app(),
            multipart_request(
                "/inpaint",
                &[("image", image.as_slice()), ("inpaintMask", mask.as_slice())],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["errorType"], "validation_error");
        assert_eq!(json["details"]["field"], "inpaintMask");
    }

    /// Test 4: The mask field is required
    #[tokio::test]
    async fn test_missing_mask() {
        let image = png_bytes(&DynamicImage::ImageRgb8(gradient_image(16, 16)));

        let response = send(
            default_app(),
            multipart_request("/inpaint", &[("image", image.as_slice())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["details"]["field"], "inpaintMask");
        assert_eq!(json["message"], "inpaintMask is required");
    }

    /// Test 5: An undecodable mask is reported against the mask field
    #[tokio::test]
    async fn test_invalid_mask() {
        let image = png_bytes(&DynamicImage::ImageRgb8(gradient_image(16, 16)));

        let response = send(
            default_app(),
            multipart_request(
                "/inpaint",
                &[("image", image.as_slice()), ("inpaintMask", b"not an image".as_slice())],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["details"]["field"], "inpaintMask");
    }
}
