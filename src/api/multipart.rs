// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart form reading shared by the upload routes

use axum_extra::extract::Multipart;
use bytes::Bytes;
use std::collections::HashMap;
use tracing::debug;

use super::errors::ApiError;
use crate::vision::image_utils::MAX_IMAGE_SIZE;

/// Form field carrying the source image
pub const IMAGE_FIELD: &str = "image";

/// Form field carrying the inpainting mask
pub const MASK_FIELD: &str = "inpaintMask";

/// Named file fields of one multipart request
#[derive(Debug, Default)]
pub struct UploadedFiles {
    files: HashMap<String, Bytes>,
}

impl UploadedFiles {
    /// Drain every named field from the form; later duplicates win
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut files = HashMap::new();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let data = field.bytes().await?;
            if data.len() > MAX_IMAGE_SIZE {
                return Err(ApiError::invalid_field(
                    &name,
                    format!("{} bytes exceeds maximum of {} bytes", data.len(), MAX_IMAGE_SIZE),
                ));
            }

            debug!("Received form field '{}' ({} bytes)", name, data.len());
            files.insert(name, data);
        }

        Ok(Self { files })
    }

    /// Take a required, non-empty field
    pub fn take(&mut self, field: &str) -> Result<Bytes, ApiError> {
        match self.files.remove(field) {
            Some(data) if !data.is_empty() => Ok(data),
            Some(_) => Err(ApiError::invalid_field(field, format!("{} is empty", field))),
            None => Err(ApiError::invalid_field(field, format!("{} is required", field))),
        }
    }
}
