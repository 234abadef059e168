// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the segmentation encoder

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// Square input side of the image encoder
pub const SAM_INPUT_SIZE: u32 = 1024;

/// Side of the low resolution mask prompt accepted by the decoder
pub const SAM_MASK_INPUT_SIZE: usize = 256;

/// Per-channel pixel mean (0-255 scale)
pub const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];

/// Per-channel pixel std (0-255 scale)
pub const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];

/// Size of the image after resizing its longest side to `target`
pub fn resized_shape(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale = target as f32 / width.max(height).max(1) as f32;
    let new_w = (width as f32 * scale + 0.5) as u32;
    let new_h = (height as f32 * scale + 0.5) as u32;
    (new_w.max(1), new_h.max(1))
}

/// Map a point from original pixels into the resized encoder frame
pub fn transform_point(point: [f32; 2], width: u32, height: u32) -> [f32; 2] {
    let (new_w, new_h) = resized_shape(width, height, SAM_INPUT_SIZE);
    [
        point[0] * new_w as f32 / width.max(1) as f32,
        point[1] * new_h as f32 / height.max(1) as f32,
    ]
}

/// Preprocess an image for the encoder
///
/// Steps:
/// 1. Resize so the longest side is 1024 (aspect ratio preserved)
/// 2. Normalize each channel: (pixel - mean) / std
/// 3. Zero-pad bottom and right to 1024x1024
/// 4. Convert to NCHW tensor format [1, 3, 1024, 1024]
pub fn preprocess_for_encoder(image: &DynamicImage) -> Array4<f32> {
    let (orig_w, orig_h) = image.dimensions();
    let (new_w, new_h) = resized_shape(orig_w, orig_h, SAM_INPUT_SIZE);

    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let size = SAM_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - PIXEL_MEAN[c]) / PIXEL_STD[c];
        }
    }

    tensor
}
