// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use desktop_vision_server::{
    api::{start_server, AppState},
    cli::Cli,
    version,
    vision::{select_device, VisionModelManager},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ort=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    info!("🚀 Starting {}", version::get_version_string());

    let device = select_device(cli.cpu);
    info!("Selected device: {}", device);

    // Load segmentation (required) and OCR (optional) models
    let manager = VisionModelManager::new(cli.vision_config(device)).await?;
    if !manager.has_ocr() {
        info!("/obtainText will answer 503 until OCR models are installed");
    }
    for model in manager.list_models() {
        info!(
            "Model {} ({}): {}",
            model.name,
            model.model_type,
            if model.available { "available" } else { "unavailable" }
        );
    }

    let state = AppState::from_manager(&manager);
    start_server(cli.server_config(), state).await
}
