// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Execution device selection for ONNX Runtime sessions
//!
//! The server prefers CUDA when the provider is usable on this host and falls
//! back to CPU otherwise. Every model session is built through
//! [`build_session`] so all models land on the same device.

use anyhow::{Context, Result};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Intra-op threads per session
const INTRA_THREADS: usize = 4;

/// Device the ONNX sessions execute on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => write!(f, "cuda"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Pick CUDA if the execution provider reports itself available, else CPU
pub fn select_device(force_cpu: bool) -> Device {
    if force_cpu {
        return Device::Cpu;
    }

    match CUDAExecutionProvider::default().is_available() {
        Ok(true) => Device::Cuda,
        Ok(false) => Device::Cpu,
        Err(e) => {
            warn!("Could not query CUDA execution provider: {}", e);
            Device::Cpu
        }
    }
}

/// Build an ONNX session for `model_path` on the requested device
///
/// Returns the device the session actually landed on: if CUDA registration
/// fails the session is rebuilt on CPU.
pub fn build_session(model_path: &Path, device: Device) -> Result<(Session, Device)> {
    if !model_path.exists() {
        anyhow::bail!("ONNX model not found: {}", model_path.display());
    }

    if device == Device::Cuda {
        match build_cuda_session(model_path) {
            Ok(session) => {
                info!("Loaded {} on cuda", model_path.display());
                return Ok((session, Device::Cuda));
            }
            Err(e) => {
                warn!("CUDA execution provider failed for {}: {}", model_path.display(), e);
                warn!("   Falling back to CPU execution provider");
            }
        }
    }

    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

    info!("Loaded {} on cpu", model_path.display());
    Ok((session, Device::Cpu))
}

fn build_cuda_session(model_path: &Path) -> Result<Session> {
    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default()
            .build()
            .error_on_failure()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

    Ok(session)
}

/// First input name of a session, or `fallback` if the graph exposes none
pub fn first_input_name(session: &Session, fallback: &str) -> String {
    session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}
