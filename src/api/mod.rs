// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;
pub mod inpaint;
pub mod multipart;
pub mod ocr;
pub mod segment;

pub use errors::{ApiError, ErrorResponse};
pub use http_server::{
    create_app, create_router, start_server, AppState, HealthResponse, ServerConfig,
    DEFAULT_BODY_LIMIT,
};
pub use inpaint::inpaint_handler;
pub use ocr::{obtain_text_handler, OcrResponse};
pub use segment::{calculate_boxes_handler, SegmentResponse};
