// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{create_app, start_server, ApiError, AppState, ServerConfig};
pub use vision::{
    Device, MaskGenerator, MaskProposal, TextExtractor, TextRegion, VisionModelConfig,
    VisionModelManager,
};
