// src/detection/gravity.rs
//
// Dark-mass centroid steering: invert the grey frame and take the
// intensity-weighted mean column.

use std::sync::Arc;
use tracing::debug;

use super::overlay::{self, CYAN, RED};
use super::{Detector, GravityEstimate};
use crate::error::{Result, SteerError};
use crate::imageops::{to_bgr, ImageOps};
use crate::types::{Frame, GravityWorkerConfig};

pub struct GravityDetector {
    ops: Arc<dyn ImageOps>,
    config: GravityWorkerConfig,
    render_debug: bool,
}

impl GravityDetector {
    pub fn new(ops: Arc<dyn ImageOps>, config: GravityWorkerConfig, render_debug: bool) -> Self {
        Self {
            ops,
            config,
            render_debug,
        }
    }
}

/// Column centroid of `255 - p`; `None` for an all-white frame.
pub(crate) fn inverted_centroid_x(gray: &Frame) -> Option<f32> {
    let mut total: u64 = 0;
    let mut weighted: u64 = 0;
    for y in 0..gray.height {
        for (x, &p) in gray.row(y).iter().enumerate() {
            let w = (255 - p) as u64;
            total += w;
            weighted += x as u64 * w;
        }
    }
    (total > 0).then(|| (weighted as f64 / total as f64) as f32)
}

impl Detector for GravityDetector {
    type Output = GravityEstimate;

    fn name(&self) -> &'static str {
        "gravity"
    }

    fn process(&self, frame: &Frame) -> Result<GravityEstimate> {
        if frame.is_empty() {
            return Err(SteerError::Processing("empty frame".into()));
        }
        let resized = self.ops.resize_to_width(frame, self.config.resize_width)?;
        let gray = self.ops.to_grayscale(&resized)?;
        let (width, height) = (resized.width, resized.height);

        let center_x = width as f32 / 2.0;
        let centroid_x = inverted_centroid_x(&gray).unwrap_or(center_x);
        let lateral_offset = centroid_x - center_x;

        debug!("[gravity] centroid_x={:.1} offset={:.1}", centroid_x, lateral_offset);

        let debug_frame = self.render_debug.then(|| {
            let mut canvas = to_bgr(&resized);
            overlay::center_guide(&mut canvas, CYAN);
            overlay::fill_circle(&mut canvas, centroid_x as i32, (height / 2) as i32, 10, RED);
            canvas
        });

        Ok(GravityEstimate {
            lateral_offset,
            centroid_x,
            frame_width: width,
            debug_frame,
        })
    }
}
