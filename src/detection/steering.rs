// src/detection/steering.rs
//
// Vanishing-point steering: diagonal edge lines converge ahead of the
// robot; the horizontal offset of their median intersection from the
// image centre is the steering error.

use std::sync::Arc;
use tracing::debug;

use super::geometry;
use super::overlay::{self, BLUE, GREEN, RED};
use super::{edge_map, hough_params, Detector, SteeringEstimate};
use crate::error::{Result, SteerError};
use crate::imageops::{to_bgr, ImageOps};
use crate::types::{AngleBands, Frame, SteeringWorkerConfig};

pub struct SteeringDetector {
    ops: Arc<dyn ImageOps>,
    config: SteeringWorkerConfig,
    bands: AngleBands,
    render_debug: bool,
}

impl SteeringDetector {
    pub fn new(
        ops: Arc<dyn ImageOps>,
        config: SteeringWorkerConfig,
        bands: AngleBands,
        render_debug: bool,
    ) -> Self {
        Self {
            ops,
            config,
            bands,
            render_debug,
        }
    }
}

impl Detector for SteeringDetector {
    type Output = SteeringEstimate;

    fn name(&self) -> &'static str {
        "steering"
    }

    fn process(&self, frame: &Frame) -> Result<SteeringEstimate> {
        if frame.is_empty() {
            return Err(SteerError::Processing("empty frame".into()));
        }
        let ops = self.ops.as_ref();
        let edges_cfg = &self.config.edges;

        let resized = ops.resize_to_width(frame, edges_cfg.resize_width)?;
        let (width, height) = (resized.width, resized.height);

        let edges = edge_map(ops, &resized, edges_cfg)?;
        let cleaned = ops.connected_components_filtered(&edges, self.config.min_noise_area)?;
        let lines = ops.hough_lines_p(&cleaned, &hough_params(edges_cfg))?;

        let diagonal = geometry::diagonal_lines(&lines, &self.bands);
        let points = geometry::intersections(&diagonal, width, height);
        let center_x = width as f32 / 2.0;
        let vanishing_x =
            geometry::median(points.iter().map(|p| p.0).collect()).unwrap_or(center_x);
        let lateral_offset = vanishing_x - center_x;

        debug!(
            "[steering] lines={} diagonal={} intersections={} vp_x={:.1} offset={:.1}",
            lines.len(),
            diagonal.len(),
            points.len(),
            vanishing_x,
            lateral_offset
        );

        let debug_frame = self.render_debug.then(|| {
            let mut canvas = to_bgr(&resized);
            for seg in lines.iter().filter(|l| {
                let a = l.abs_angle_deg();
                !self.bands.is_horizontal(a) && !self.bands.is_vertical(a)
            }) {
                overlay::draw_extended(&mut canvas, seg, GREEN);
            }
            overlay::center_guide(&mut canvas, BLUE);
            overlay::fill_circle(&mut canvas, vanishing_x as i32, (height / 2) as i32, 10, RED);
            canvas
        });

        Ok(SteeringEstimate {
            lateral_offset,
            vanishing_x,
            frame_width: width,
            intersections: points.len(),
            debug_frame,
        })
    }
}
