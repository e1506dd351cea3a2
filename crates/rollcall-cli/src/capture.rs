//! Detection documents produced by the external face model runner.
//!
//! A document is a JSON array of detections, one per face found in the
//! captured image.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use rollcall_core::Detection;

/// Read detections from `path`, or from stdin when `path` is `-`.
pub fn read_detections(path: &Path) -> Result<Vec<Detection>> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading detections from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading detections from {}", path.display()))?
    };
    parse_detections(&raw)
}

pub fn parse_detections(raw: &str) -> Result<Vec<Detection>> {
    let detections: Vec<Detection> =
        serde_json::from_str(raw).context("detection document is not a JSON array of detections")?;
    tracing::debug!(faces = detections.len(), "loaded detections");
    Ok(detections)
}
