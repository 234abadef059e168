// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end model tests
//!
//! These need real ONNX models and are ignored by default. Point
//! `VISION_TEST_SAM_MODEL` at a Segment Anything encoder/decoder directory and
//! `VISION_TEST_OCR_DIR` at a PaddleOCR directory, then run with
//! `--ignored`.

use desktop_vision_server::vision::ocr::PaddleOcrModel;
use desktop_vision_server::vision::{
    Device, MaskGenerator, TextExtractor, VisionModelConfig, VisionModelManager,
};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::path::PathBuf;

fn env_path(var: &str) -> PathBuf {
    PathBuf::from(std::env::var(var).unwrap_or_else(|_| panic!("{} must be set", var)))
}

/// 5x7 glyphs, one string per row, '#' = ink
fn glyph(c: char) -> [&'static str; 7] {
    match c {
        'T' => ["#####", "..#..", "..#..", "..#..", "..#..", "..#..", "..#.."],
        'E' => ["#####", "#....", "#....", "####.", "#....", "#....", "#####"],
        'S' => [".####", "#....", "#....", ".###.", "....#", "....#", "####."],
        _ => ["....."; 7],
    }
}

/// Black block letters on white, `scale` pixels per glyph cell
fn render_text(text: &str, scale: u32) -> RgbImage {
    let margin = 8 * scale;
    let advance = 6 * scale;
    let width = margin * 2 + advance * text.len() as u32;
    let height = margin * 2 + 7 * scale;

    let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for (i, c) in text.chars().enumerate() {
        let origin_x = margin + i as u32 * advance;
        for (row, line) in glyph(c).iter().enumerate() {
            for (col, cell) in line.chars().enumerate() {
                if cell != '#' {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        image.put_pixel(
                            origin_x + col as u32 * scale + dx,
                            margin + row as u32 * scale + dy,
                            Rgb([0, 0, 0]),
                        );
                    }
                }
            }
        }
    }
    image
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    /// Test 1: OCR reads rendered block text and boxes it
    #[tokio::test]
    #[ignore = "requires PaddleOCR models (VISION_TEST_OCR_DIR)"]
    async fn test_ocr_reads_block_text() {
        let model = PaddleOcrModel::new(env_path("VISION_TEST_OCR_DIR"), Device::Cpu)
            .await
            .unwrap();

        let image = DynamicImage::ImageRgb8(render_text("TEST", 6));
        let regions = model.extract_text(&image).unwrap();

        let region = regions
            .iter()
            .find(|r| r.text.to_uppercase().contains("TEST"))
            .unwrap_or_else(|| panic!("no TEST region in {:?}", regions));

        let [tl, _, br, _] = region.quad;
        assert!(tl[0] < br[0] && tl[1] < br[1]);
        assert!(br[0] <= image.width() as f32 && br[1] <= image.height() as f32);
        assert!(region.confidence >= 0.5);
    }

    /// Test 2: Blank images produce no text
    #[tokio::test]
    #[ignore = "requires PaddleOCR models (VISION_TEST_OCR_DIR)"]
    async fn test_ocr_blank_image() {
        let model = PaddleOcrModel::new(env_path("VISION_TEST_OCR_DIR"), Device::Cpu)
            .await
            .unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 80, Rgb([255, 255, 255])));
        assert!(model.extract_text(&image).unwrap().is_empty());
    }

    /// Test 3: Automatic masks land inside the image and respect max_masks
    #[tokio::test]
    #[ignore = "requires Segment Anything models (VISION_TEST_SAM_MODEL)"]
    async fn test_sam_proposes_masks() {
        let mut config = VisionModelConfig::new(env_path("VISION_TEST_SAM_MODEL"));
        config.ocr_model_dir = None;
        config.mask_generator.points_per_side = 8;
        config.mask_generator.max_masks = Some(5);

        let manager = VisionModelManager::new(config).await.unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(256, 192, |x, y| {
            match (x < 128, y < 96) {
                (true, true) => Rgb([220, 30, 30]),
                (false, true) => Rgb([30, 200, 40]),
                (true, false) => Rgb([30, 40, 210]),
                (false, false) => Rgb([240, 240, 240]),
            }
        }));

        let proposals = manager.mask_generator().generate(&image).unwrap();
        assert!(!proposals.is_empty());
        assert!(proposals.len() <= 5);

        let (w, h) = image.dimensions();
        for proposal in &proposals {
            assert!(proposal.point[0] >= 0.0 && proposal.point[0] < w as f32);
            assert!(proposal.point[1] >= 0.0 && proposal.point[1] < h as f32);
            assert!(proposal.predicted_iou >= 0.88);
            assert!(proposal.stability_score >= 0.95);
        }
    }
}
