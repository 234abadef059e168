// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Mask proposal endpoint handler

use axum::extract::State;
use axum::Json;
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::response::SegmentResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::{run_blocking, AppState};
use crate::api::multipart::{UploadedFiles, IMAGE_FIELD};
use crate::vision::decode_image_bytes;

/// POST /calculate-boxes - Propose masks for an uploaded image
///
/// # Request
/// Multipart form with an `image` file (PNG or JPEG).
///
/// # Response
/// `{"masks": [{"coordinates": {"x", "y"}}]}`, one seed point per mask,
/// best masks first.
///
/// # Errors
/// - 400 Bad Request: missing field, not multipart, undecodable image
/// - 500 Internal Server Error: segmentation failed
pub async fn calculate_boxes_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let start = Instant::now();

    let mut files = UploadedFiles::read(multipart?).await?;
    let bytes = files.take(IMAGE_FIELD)?;

    let (image, image_info) =
        decode_image_bytes(&bytes).map_err(|e| ApiError::invalid_image(IMAGE_FIELD, e))?;
    debug!(
        "Decoded image: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );

    let generator = state.mask_generator.clone();
    let proposals = run_blocking(move || generator.generate(&image)).await?;

    info!("Execution time: {:.5} seconds", start.elapsed().as_secs_f64());

    Ok(Json(SegmentResponse::from(proposals.as_slice())))
}
