//! Boundary with the face-detection collaborator.
//!
//! The detector itself is external: it hands over zero or more detections
//! per capture, each with a bounding box and an embedding. Only a capture
//! with exactly one face may reach the matcher.

use crate::embedding::EmbeddingVector;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    #[serde(default)]
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// One face found in a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub embedding: Vec<f32>,
}

/// Accept a capture only if it contains exactly one face.
pub fn single_face(detections: Vec<Detection>, dim: usize) -> Result<EmbeddingVector> {
    let count = detections.len();
    let mut iter = detections.into_iter();
    match (iter.next(), iter.next()) {
        (Some(face), None) => {
            tracing::debug!(
                confidence = face.bbox.confidence,
                "capture: single face accepted"
            );
            EmbeddingVector::new(face.embedding, dim)
        }
        _ => {
            tracing::info!(count, "capture rejected: expected exactly one face");
            Err(Error::MultipleOrNoFaceDetected { count })
        }
    }
}
