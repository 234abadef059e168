// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Mask proposal API endpoint module
//!
//! Provides POST /calculate-boxes for automatic mask proposals.

pub mod handler;
pub mod response;

pub use handler::calculate_boxes_handler;
pub use response::{Coordinates, MaskEntry, SegmentResponse};
