// src/detection/wall.rs
//
// Wall detection from one panoramic frame. The top half looks right, the
// bottom half looks left. A half flags a wall when a near-vertical line
// sits on its outward side; lines near the robot's own centreline are
// ignored.

use std::sync::Arc;
use tracing::{debug, warn};

use super::geometry;
use super::overlay::{self, BLUE, RED};
use super::{edge_map, hough_params, Detector, WallFlag};
use crate::error::{Result, SteerError};
use crate::imageops::{to_bgr, ImageOps};
use crate::types::{AngleBands, Frame, WallWorkerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Top half; outward is right of centre
    Right,
    /// Bottom half; outward is left of centre
    Left,
}

impl Side {
    fn is_outward(self, midpoint_x: f32, center_x: f32) -> bool {
        match self {
            Side::Right => midpoint_x > center_x,
            Side::Left => midpoint_x < center_x,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Side::Right => "right",
            Side::Left => "left",
        }
    }
}

struct HalfResult {
    detected: bool,
    debug_frame: Option<Frame>,
}

pub struct WallDetector {
    ops: Arc<dyn ImageOps>,
    config: WallWorkerConfig,
    bands: AngleBands,
    render_debug: bool,
}

impl WallDetector {
    pub fn new(
        ops: Arc<dyn ImageOps>,
        config: WallWorkerConfig,
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

    fn process_half(&self, half: &Frame, side: Side) -> Result<HalfResult> {
        if half.is_empty() {
            return Err(SteerError::Processing(format!("{} half is empty", side.as_str())));
        }
        let ops = self.ops.as_ref();
        let edges_cfg = &self.config.edges;

        let resized = ops.resize_to_width(half, edges_cfg.resize_width)?;
        let edges = edge_map(ops, &resized, edges_cfg)?;
        let lines = ops.hough_lines_p(&edges, &hough_params(edges_cfg))?;

        let center_x = resized.width as f32 / 2.0;
        let hits: Vec<_> = geometry::vertical_lines(&lines, &self.bands)
            .into_iter()
            .filter(|l| side.is_outward(l.midpoint_x(), center_x))
            .collect();

        debug!(
            "[wall] {} half: lines={} outward_vertical={}",
            side.as_str(),
            lines.len(),
            hits.len()
        );

        let debug_frame = self.render_debug.then(|| {
            let mut canvas = to_bgr(&resized);
            overlay::center_guide(&mut canvas, BLUE);
            for seg in &hits {
                overlay::draw_extended(&mut canvas, seg, RED);
            }
            canvas
        });

        Ok(HalfResult {
            detected: !hits.is_empty(),
            debug_frame,
        })
    }
}

impl Detector for WallDetector {
    type Output = WallFlag;

    fn name(&self) -> &'static str {
        "wall"
    }

    fn process(&self, frame: &Frame) -> Result<WallFlag> {
        if frame.is_empty() {
            return Err(SteerError::Processing("empty frame".into()));
        }

        let frame = match &self.config.undistort {
            Some(intrinsics) => self.ops.undistort(frame, intrinsics)?,
            None => frame.clone(),
        };

        let half_height = frame.height / 2;
        let right = frame.crop_rows(0, half_height);
        let left = frame.crop_rows(half_height, frame.height);

        let mut flag = WallFlag::default();
        for (half, side) in [(&right, Side::Right), (&left, Side::Left)] {
            match self.process_half(half, side) {
                Ok(result) => {
                    flag.detected |= result.detected;
                    match side {
                        Side::Right => flag.debug_frame_right = result.debug_frame,
                        Side::Left => flag.debug_frame_left = result.debug_frame,
                    }
                }
                Err(e) => warn!("[wall] {} half failed: {}", side.as_str(), e),
            }
        }

        Ok(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imageops::NativeImageOps;
    use crate::types::CameraIntrinsics;

    /// 240×360 panoramic frame; optional dark vertical bar in each half.
    fn wall_scene(top_x: Option<usize>, bottom_x: Option<usize>) -> Frame {
        let mut frame = Frame::filled(240, 360, 3, 230);
        for (x0, y_offset) in [(top_x, 0usize), (bottom_x, 180)] {
            if let Some(x0) = x0 {
                for y in 20..160 {
                    for x in x0 - 3..=x0 + 3 {
                        let i = frame.index(x, y + y_offset);
                        frame.data[i..i + 3].copy_from_slice(&[30, 30, 30]);
                    }
                }
            }
        }
        frame
    }

    fn detector(config: WallWorkerConfig, render_debug: bool) -> WallDetector {
        WallDetector::new(
            Arc::new(NativeImageOps::new()),
            config,
            AngleBands::default(),
            render_debug,
        )
    }

    #[test]
    fn test_right_view_outward_line_detected() {
        let flag = detector(WallWorkerConfig::default(), false)
            .process(&wall_scene(Some(180), None))
            .unwrap();
        assert!(flag.detected);
    }

    #[test]
    fn test_right_view_inward_line_ignored() {
        let flag = detector(WallWorkerConfig::default(), false)
            .process(&wall_scene(Some(60), None))
            .unwrap();
        assert!(!flag.detected);
    }

    #[test]
    fn test_left_view_uses_mirrored_rule() {
        let det = detector(WallWorkerConfig::default(), false);
        assert!(det.process(&wall_scene(None, Some(60))).unwrap().detected);
        assert!(!det.process(&wall_scene(None, Some(180))).unwrap().detected);
    }

    #[test]
    fn test_blank_frame_no_wall() {
        let flag = detector(WallWorkerConfig::default(), true)
            .process(&wall_scene(None, None))
            .unwrap();
        assert!(!flag.detected);
        assert!(flag.debug_frame_right.is_some());
        assert!(flag.debug_frame_left.is_some());
    }

    #[test]
    fn test_identity_undistortion_keeps_result() {
        let config = WallWorkerConfig {
            undistort: Some(CameraIntrinsics {
                camera_matrix: [[200.0, 0.0, 120.0], [0.0, 200.0, 180.0], [0.0, 0.0, 1.0]],
                dist_coeffs: [0.0; 5],
                calibration_size: [240, 360],
            }),
            ..WallWorkerConfig::default()
        };
        let flag = detector(config, false).process(&wall_scene(Some(180), None)).unwrap();
        assert!(flag.detected);
    }

    #[test]
    fn test_processing_is_idempotent() {
        let det = detector(WallWorkerConfig::default(), true);
        let frame = wall_scene(Some(180), Some(60));
        let first = det.process(&frame).unwrap();
        assert!(first.detected);
        assert!(first.debug_frame_right.is_some());
        assert_eq!(first, det.process(&frame).unwrap());
    }

    #[test]
    fn test_empty_frame_is_error() {
        let empty = Frame::new(Vec::new(), 0, 0, 3);
        assert!(detector(WallWorkerConfig::default(), false).process(&empty).is_err());
    }

    #[test]
    fn test_outward_rule() {
        assert!(Side::Right.is_outward(121.0, 120.0));
        assert!(!Side::Right.is_outward(120.0, 120.0));
        assert!(Side::Left.is_outward(119.0, 120.0));
        assert!(!Side::Left.is_outward(120.0, 120.0));
    }
}
