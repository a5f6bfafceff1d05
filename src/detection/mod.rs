// src/detection/mod.rs

mod geometry;
mod gravity;
mod overlay;
mod steering;
mod types;
mod wall;

// Re-export public APIs
pub use gravity::GravityDetector;
pub use steering::SteeringDetector;
pub use types::*;
pub use wall::WallDetector;

use crate::error::Result;
use crate::imageops::{HoughParams, ImageOps};
use crate::types::{EdgePipelineConfig, Frame};

/// A per-frame perception stage. Implementations hold no per-frame state,
/// so the same frame always yields the same estimate.
pub trait Detector: Send + Sync {
    type Output: Into<Estimate>;

    /// Short tag used in log lines and metrics
    fn name(&self) -> &'static str;

    fn process(&self, frame: &Frame) -> Result<Self::Output>;
}

/// grey → CLAHE → blur → Canny on an already resized frame.
pub(crate) fn edge_map(ops: &dyn ImageOps, resized: &Frame, cfg: &EdgePipelineConfig) -> Result<Frame> {
    let gray = ops.to_grayscale(resized)?;
    let adjusted = ops.apply_clahe(&gray, cfg.clahe_clip_limit, cfg.clahe_tile_grid)?;
    let blurred = ops.gaussian_blur(&adjusted, cfg.blur_kernel)?;
    ops.canny(&blurred, cfg.canny_low, cfg.canny_high)
}

pub(crate) fn hough_params(cfg: &EdgePipelineConfig) -> HoughParams {
    HoughParams {
        threshold: cfg.hough_threshold,
        min_line_length: cfg.hough_min_line_length,
        max_line_gap: cfg.hough_max_line_gap,
    }
}
