// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inpainting endpoint handler

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::api::errors::ApiError;
use crate::api::http_server::{run_blocking, AppState};
use crate::api::multipart::{UploadedFiles, IMAGE_FIELD, MASK_FIELD};
use crate::vision::inpaint::inpaint;
use crate::vision::{decode_image_bytes, decode_mask_bytes, encode_jpeg};

/// Download name of the result
pub const INPAINT_FILENAME: &str = "inpaint.jpg";

/// Content type of the result
pub const INPAINT_CONTENT_TYPE: &str = "image/jpg";

/// POST /inpaint - Reconstruct the masked pixels of an image
///
/// # Request
/// Multipart form with `image` (source) and `inpaintMask` (any non-zero
/// pixel is repainted). Both must have the same dimensions.
///
/// # Response
/// JPEG bytes as an `inpaint.jpg` attachment.
///
/// # Errors
/// - 400 Bad Request: missing field, undecodable file, dimension mismatch
/// - 500 Internal Server Error: encoding failed
pub async fn inpaint_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let start = Instant::now();

    let mut files = UploadedFiles::read(multipart?).await?;
    let image_bytes = files.take(IMAGE_FIELD)?;
    let mask_bytes = files.take(MASK_FIELD)?;

    let (image, image_info) =
        decode_image_bytes(&image_bytes).map_err(|e| ApiError::invalid_image(IMAGE_FIELD, e))?;
    let mask =
        decode_mask_bytes(&mask_bytes).map_err(|e| ApiError::invalid_image(MASK_FIELD, e))?;
    debug!(
        "Inpainting {}x{} image with {}x{} mask",
        image_info.width,
        image_info.height,
        mask.width(),
        mask.height()
    );

    let radius = state.inpaint_radius;
    let jpeg = run_blocking(move || -> Result<Vec<u8>, ApiError> {
        let repaired = inpaint(&image, &mask, radius)?;
        encode_jpeg(&repaired).map_err(|e| ApiError::InternalError(e.to_string()))
    })
    .await?;

    info!(
        "Inpainting complete: {} bytes, {}ms",
        jpeg.len(),
        start.elapsed().as_millis()
    );

    Ok((
        [
            (header::CONTENT_TYPE, INPAINT_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", INPAINT_FILENAME),
            ),
        ],
        jpeg,
    )
        .into_response())
}
