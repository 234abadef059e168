// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Mask proposal response types

use serde::{Deserialize, Serialize};

use crate::vision::MaskProposal;

/// Seed point of a proposed mask, in image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskEntry {
    pub coordinates: Coordinates,
}

/// Response from POST /calculate-boxes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub masks: Vec<MaskEntry>,
}

impl From<&[MaskProposal]> for SegmentResponse {
    fn from(proposals: &[MaskProposal]) -> Self {
        Self {
            masks: proposals
                .iter()
                .map(|p| MaskEntry {
                    coordinates: Coordinates {
                        x: p.point[0],
                        y: p.point[1],
                    },
                })
                .collect(),
        }
    }
}
