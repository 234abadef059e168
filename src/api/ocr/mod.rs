// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR API endpoint module
//!
//! Provides POST /obtainText for extracting text regions from images.

pub mod handler;
pub mod response;

pub use handler::obtain_text_handler;
pub use response::{OcrResponse, QuadBox, TextBoxEntry};
