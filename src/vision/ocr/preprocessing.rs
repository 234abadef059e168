// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for PaddleOCR

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Target size for PaddleOCR detection model
pub const OCR_INPUT_SIZE: u32 = 640;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input
pub const REC_MAX_WIDTH: u32 = 320;

/// Minimum width for recognition model input
pub const REC_MIN_WIDTH: u32 = 4;

/// Mean values for detection normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for detection normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Recognition crops are normalized to [-1, 1]
pub const REC_MEAN: f32 = 0.5;
pub const REC_STD: f32 = 0.5;

/// Crops taller than this multiple of their width are treated as vertical text
pub const VERTICAL_TEXT_RATIO: f32 = 1.5;

/// Preprocess an image for OCR detection
///
/// Steps:
/// 1. Resize with aspect ratio preservation to OCR_INPUT_SIZE
/// 2. Pad to square with gray (128) background
/// 3. Convert to RGB
/// 4. Normalize with ImageNet mean/std: (pixel/255 - mean) / std
/// 5. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(image: &DynamicImage) -> Array4<f32> {
    let resized = resize_with_padding(image, OCR_INPUT_SIZE);
    let rgb = resized.to_rgb8();

    let size = OCR_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    tensor
}

/// Preprocess a rectified text crop for recognition
///
/// Resizes to height 48 with aspect-preserving width clamped to
/// `[REC_MIN_WIDTH, REC_MAX_WIDTH]`, then normalizes to [-1, 1].
/// Output shape: [1, 3, 48, W]
pub fn preprocess_for_recognition(crop: &RgbImage) -> Array4<f32> {
    let (orig_w, orig_h) = crop.dimensions();

    let scale = REC_INPUT_HEIGHT as f32 / orig_h.max(1) as f32;
    let new_width = ((orig_w as f32 * scale).round() as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let resized = imageops::resize(crop, new_width, REC_INPUT_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::zeros((1, 3, REC_INPUT_HEIGHT as usize, new_width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - REC_MEAN) / REC_STD;
        }
    }

    tensor
}

/// Cut a quadrilateral out of `image` and warp it to an upright rectangle
///
/// Corners are expected clockwise from top-left. The output size is the
/// longer of each pair of opposite edges; samples are bilinear. Crops much
/// taller than wide are rotated 90 degrees counter-clockwise so vertical text
/// reads left to right. Returns `None` for degenerate quads.
pub fn crop_quad(image: &RgbImage, quad: &[[f32; 2]; 4]) -> Option<RgbImage> {
    let dist = |a: [f32; 2], b: [f32; 2]| ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();

    let width = dist(quad[0], quad[1]).max(dist(quad[3], quad[2])).round() as u32;
    let height = dist(quad[0], quad[3]).max(dist(quad[1], quad[2])).round() as u32;
    if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
        return None;
    }

    let lerp = |a: [f32; 2], b: [f32; 2], t: f32| [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t];

    let mut crop = RgbImage::new(width, height);
    for (x, y, pixel) in crop.enumerate_pixels_mut() {
        let u = (x as f32 + 0.5) / width as f32;
        let v = (y as f32 + 0.5) / height as f32;
        let top = lerp(quad[0], quad[1], u);
        let bottom = lerp(quad[3], quad[2], u);
        let [sx, sy] = lerp(top, bottom, v);
        *pixel = sample_bilinear(image, sx - 0.5, sy - 0.5);
    }

    if height as f32 >= width as f32 * VERTICAL_TEXT_RATIO {
        crop = imageops::rotate270(&crop);
    }

    Some(crop)
}

/// Bilinear sample at a continuous pixel position, edges replicated
fn sample_bilinear(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let max_x = (image.width() - 1) as f32;
    let max_y = (image.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);
    let fx = x - x0;
    let fy = y - y0;

    let p00 = image.get_pixel(x0 as u32, y0 as u32);
    let p10 = image.get_pixel(x1 as u32, y0 as u32);
    let p01 = image.get_pixel(x0 as u32, y1 as u32);
    let p11 = image.get_pixel(x1 as u32, y1 as u32);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Resize image with aspect ratio preservation and padding
///
/// The image is scaled to fit within target_size x target_size
/// while preserving aspect ratio, then padded with gray (128)
/// to reach the target dimensions.
pub fn resize_with_padding(image: &DynamicImage, target_size: u32) -> DynamicImage {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        return DynamicImage::ImageRgb8(RgbImage::from_pixel(
            target_size,
            target_size,
            Rgb([128, 128, 128]),
        ));
    }

    let info = PreprocessInfo::new(image, target_size);
    let (new_w, new_h) = info.scaled_size();

    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let mut output = RgbImage::from_pixel(target_size, target_size, Rgb([128, 128, 128]));
    imageops::replace(&mut output, &rgb, info.offset_x as i64, info.offset_y as i64);

    DynamicImage::ImageRgb8(output)
}

/// Scale and padding applied by [`resize_with_padding`]
///
/// Used to map detection results back to original coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl PreprocessInfo {
    /// Calculate preprocessing info for an image
    pub fn new(image: &DynamicImage, target_size: u32) -> Self {
        let (orig_w, orig_h) = image.dimensions();

        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Size of the image content inside the padded canvas
    pub fn scaled_size(&self) -> (u32, u32) {
        let w = ((self.original_width as f32 * self.scale).round() as u32).max(1);
        let h = ((self.original_height as f32 * self.scale).round() as u32).max(1);
        (w, h)
    }

    /// Map a coordinate from preprocessed space back to original image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }

    /// Map a quad back to original space and clamp it to the image bounds
    pub fn map_quad_to_original(&self, quad: &[[f32; 2]; 4]) -> [[f32; 2]; 4] {
        let max_x = self.original_width.saturating_sub(1) as f32;
        let max_y = self.original_height.saturating_sub(1) as f32;

        quad.map(|[x, y]| {
            let (ox, oy) = self.map_to_original(x, y);
            [ox.clamp(0.0, max_x), oy.clamp(0.0, max_y)]
        })
    }
}
