// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inpainting API endpoint module
//!
//! Provides POST /inpaint, returning the repaired image as a JPEG download.

pub mod handler;

pub use handler::{inpaint_handler, INPAINT_CONTENT_TYPE, INPAINT_FILENAME};
