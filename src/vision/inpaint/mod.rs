// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Mask-guided inpainting
//!
//! Classical (non-learned) reconstruction of masked pixels from their
//! surroundings. Used by `POST /inpaint`.

pub mod navier_stokes;

use image::{DynamicImage, GrayImage};
use thiserror::Error;

pub use navier_stokes::FastMarchingInpainter;

/// Neighborhood radius used by the inpainting route
pub const INPAINT_RADIUS: u32 = 7;

#[derive(Debug, Error)]
pub enum InpaintError {
    #[error(
        "mask is {mask_width}x{mask_height} but image is {image_width}x{image_height}"
    )]
    DimensionMismatch {
        image_width: u32,
        image_height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    #[error("inpainted buffer does not match the image dimensions")]
    BufferMismatch,
}

/// Reconstruct every pixel selected by a non-zero mask value
///
/// Grayscale images stay single-channel; everything else is processed as
/// 8-bit RGB (alpha is dropped). Pixels outside the mask are returned as-is.
pub fn inpaint(
    image: &DynamicImage,
    mask: &GrayImage,
    radius: u32,
) -> Result<DynamicImage, InpaintError> {
    if image.width() != mask.width() || image.height() != mask.height() {
        return Err(InpaintError::DimensionMismatch {
            image_width: image.width(),
            image_height: image.height(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }

    let (width, height) = (image.width() as usize, image.height() as usize);

    match image {
        DynamicImage::ImageLuma8(gray) => {
            let filled =
                FastMarchingInpainter::new(width, height, 1, gray.as_raw(), mask.as_raw(), radius)
                    .run();
            Ok(DynamicImage::ImageLuma8(
                GrayImage::from_raw(image.width(), image.height(), filled)
                    .ok_or(InpaintError::BufferMismatch)?,
            ))
        }
        other => {
            let rgb = other.to_rgb8();
            let filled =
                FastMarchingInpainter::new(width, height, 3, rgb.as_raw(), mask.as_raw(), radius)
                    .run();
            Ok(DynamicImage::ImageRgb8(
                image::RgbImage::from_raw(image.width(), image.height(), filled)
                    .ok_or(InpaintError::BufferMismatch)?,
            ))
        }
    }
}
