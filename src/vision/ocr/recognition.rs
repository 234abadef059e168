// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text recognition model
//!
//! This module provides the text recognition component of PaddleOCR.
//! It recognizes text content from rectified text crops.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array4, ArrayView2, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::REC_INPUT_HEIGHT;
use crate::vision::device::{build_session, first_input_name, Device};

/// Recognition model input height
pub const RECOGNITION_INPUT_HEIGHT: u32 = REC_INPUT_HEIGHT; // 48

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    /// The recognized text content
    pub text: String,
    /// Mean probability of the emitted symbols (0.0-1.0)
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self { text, confidence }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// PaddleOCR text recognition model
#[derive(Clone)]
pub struct OcrRecognitionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// CTC symbol table: blank at 0, dictionary entries, then space
    dictionary: Arc<Vec<String>>,
    /// Model input name
    input_name: String,
}

impl std::fmt::Debug for OcrRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRecognitionModel")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrRecognitionModel {
    /// Load the OCR recognition model and its character dictionary
    ///
    /// # Arguments
    /// - `model_path`: Path to the ONNX model file (rec_model.onnx)
    /// - `dict_path`: Path to the character dictionary (ppocr_keys_v1.txt)
    /// - `device`: Execution device
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - Dictionary file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(model_path: P, dict_path: P, device: Device) -> Result<Self> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!("OCR character dictionary not found: {}", dict_path.display());
        }

        info!("Loading OCR recognition model from {}", model_path.display());

        let dictionary = load_dictionary(dict_path)?;
        info!("Loaded character dictionary with {} symbols", dictionary.len());

        let (session, _) = build_session(model_path, device)?;
        let input_name = first_input_name(&session, "x");

        debug!("Recognition model loaded - input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    /// Recognize text from a preprocessed crop of shape [1, 3, 48, W]
    pub fn recognize(&self, input: &Array4<f32>) -> Result<RecognizedText> {
        let shape = input.shape();
        if shape[0] != 1
            || shape[1] != 3
            || shape[2] != RECOGNITION_INPUT_HEIGHT as usize
            || shape[3] < 4
        {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected [1, 3, {}, W>=4]",
                shape,
                RECOGNITION_INPUT_HEIGHT
            );
        }

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let output = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| anyhow!("Recognition session lock poisoned: {}", e))?;

            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("Recognition inference failed")?;

            outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?
                .to_owned()
        };

        // [1, T, C] or [T, C]
        let mut probs = output.view();
        while probs.ndim() > 2 {
            probs = probs.index_axis_move(Axis(0), 0);
        }
        let probs = probs
            .into_dimensionality::<Ix2>()
            .context("Unexpected recognition output shape")?;

        Ok(ctc_greedy_decode(probs, &self.dictionary))
    }
}

/// Load a character dictionary (one symbol per line)
///
/// Returns the CTC symbol table: index 0 is the blank, followed by each line
/// of the file, followed by a space symbol.
pub fn load_dictionary<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open dictionary: {}", path.as_ref().display()))?;

    let mut dictionary = vec![String::new()];
    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read dictionary line")?;
        dictionary.push(line.trim_end_matches('\r').to_string());
    }
    dictionary.push(" ".to_string());

    Ok(dictionary)
}

/// Greedy (best path) CTC decoding over a [T, C] probability matrix
///
/// Blank (index 0) is dropped and a symbol repeated on consecutive timesteps
/// is emitted once. Confidence is the mean max-probability of the emitted
/// symbols, 0 when nothing is emitted.
pub fn ctc_greedy_decode(probs: ArrayView2<f32>, dictionary: &[String]) -> RecognizedText {
    let mut text = String::new();
    let mut total = 0.0f32;
    let mut emitted = 0usize;
    let mut prev_index = 0usize;

    for row in probs.rows() {
        let (index, prob) = row
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, &p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        if index != 0 && index != prev_index {
            if let Some(symbol) = dictionary.get(index) {
                text.push_str(symbol);
                total += prob;
                emitted += 1;
            }
        }
        prev_index = index;
    }

    let confidence = if emitted == 0 { 0.0 } else { total / emitted as f32 };
    RecognizedText::new(text, confidence)
}
