// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoint handler

use axum::extract::State;
use axum::Json;
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::response::OcrResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::{run_blocking, AppState};
use crate::api::multipart::{UploadedFiles, IMAGE_FIELD};
use crate::vision::decode_image_bytes;

/// POST /obtainText - Extract text regions from an image
///
/// # Request
/// Multipart form with an `image` file (PNG or JPEG).
///
/// # Response
/// - `textBoxes`: recognized text with its quadrilateral (`x0..y3`,
///   clockwise from top-left), top-to-bottom then left-to-right
///
/// # Errors
/// - 400 Bad Request: missing field, not multipart, undecodable image
/// - 503 Service Unavailable: OCR model not loaded
/// - 500 Internal Server Error: OCR processing failed
pub async fn obtain_text_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let start = Instant::now();

    let extractor = state
        .text_extractor
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable("OCR model not loaded".to_string()))?;

    let mut files = UploadedFiles::read(multipart?).await?;
    let bytes = files.take(IMAGE_FIELD)?;

    let (image, image_info) =
        decode_image_bytes(&bytes).map_err(|e| ApiError::invalid_image(IMAGE_FIELD, e))?;
    debug!(
        "Decoded image: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );

    let regions = run_blocking(move || extractor.extract_text(&image)).await?;

    info!(
        "OCR complete: {} regions, {}ms",
        regions.len(),
        start.elapsed().as_millis()
    );

    Ok(Json(OcrResponse::from(regions)))
}
