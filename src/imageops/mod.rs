// src/imageops/mod.rs
//
// Image primitives consumed by the detectors. Detectors only see the
// `ImageOps` trait; `NativeImageOps` is the pure-Rust backend.

mod components;
mod edges;
mod filter;
mod hough;
mod resize;
mod undistort;

pub use hough::HoughParams;
pub use resize::{scaled_height, to_bgr};

use crate::error::{Result, SteerError};
use crate::types::{CameraIntrinsics, Frame, LineSegment};

pub trait ImageOps: Send + Sync {
    fn resize(&self, frame: &Frame, width: usize, height: usize) -> Result<Frame>;
    fn to_grayscale(&self, frame: &Frame) -> Result<Frame>;
    fn gaussian_blur(&self, gray: &Frame, ksize: usize) -> Result<Frame>;
    fn apply_clahe(&self, gray: &Frame, clip_limit: f32, tile_grid: [usize; 2]) -> Result<Frame>;
    fn canny(&self, gray: &Frame, low: f32, high: f32) -> Result<Frame>;
    /// Binary mask of the 8-connected components with more than `min_area` pixels
    fn connected_components_filtered(&self, binary: &Frame, min_area: usize) -> Result<Frame>;
    fn hough_lines_p(&self, edges: &Frame, params: &HoughParams) -> Result<Vec<LineSegment>>;
    fn undistort(&self, frame: &Frame, intrinsics: &CameraIntrinsics) -> Result<Frame>;

    /// Resize to `width`, keeping the aspect ratio.
    fn resize_to_width(&self, frame: &Frame, width: usize) -> Result<Frame> {
        let height = scaled_height(frame.width, frame.height, width);
        self.resize(frame, width, height)
    }
}

fn require_nonempty(frame: &Frame, op: &str) -> Result<()> {
    if frame.is_empty() || frame.data.len() != frame.width * frame.height * frame.channels {
        return Err(SteerError::Processing(format!("{}: empty or malformed frame", op)));
    }
    Ok(())
}

fn require_gray(frame: &Frame, op: &str) -> Result<()> {
    require_nonempty(frame, op)?;
    if !frame.is_gray() {
        return Err(SteerError::Processing(format!(
            "{}: expected 1 channel, got {}",
            op, frame.channels
        )));
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeImageOps;

impl NativeImageOps {
    pub fn new() -> Self {
        Self
    }
}

impl ImageOps for NativeImageOps {
    fn resize(&self, frame: &Frame, width: usize, height: usize) -> Result<Frame> {
        require_nonempty(frame, "resize")?;
        if width == 0 || height == 0 {
            return Err(SteerError::Processing(format!(
                "resize: invalid target {}x{}",
                width, height
            )));
        }
        Ok(resize::resize(frame, width, height))
    }

    fn to_grayscale(&self, frame: &Frame) -> Result<Frame> {
        require_nonempty(frame, "to_grayscale")?;
        if frame.channels != 1 && frame.channels != 3 {
            return Err(SteerError::Processing(format!(
                "to_grayscale: unsupported channel count {}",
                frame.channels
            )));
        }
        Ok(resize::to_grayscale(frame))
    }

    fn gaussian_blur(&self, gray: &Frame, ksize: usize) -> Result<Frame> {
        require_gray(gray, "gaussian_blur")?;
        if ksize % 2 == 0 {
            return Err(SteerError::Processing(format!(
                "gaussian_blur: kernel size {} must be odd",
                ksize
            )));
        }
        Ok(filter::gaussian_blur(gray, ksize))
    }

    fn apply_clahe(&self, gray: &Frame, clip_limit: f32, tile_grid: [usize; 2]) -> Result<Frame> {
        require_gray(gray, "apply_clahe")?;
        Ok(filter::apply_clahe(gray, clip_limit, tile_grid))
    }

    fn canny(&self, gray: &Frame, low: f32, high: f32) -> Result<Frame> {
        require_gray(gray, "canny")?;
        Ok(edges::canny(gray, low, high))
    }

    fn connected_components_filtered(&self, binary: &Frame, min_area: usize) -> Result<Frame> {
        require_gray(binary, "connected_components")?;
        Ok(components::connected_components_filtered(binary, min_area))
    }

    fn hough_lines_p(&self, edges: &Frame, params: &HoughParams) -> Result<Vec<LineSegment>> {
        require_gray(edges, "hough_lines_p")?;
        Ok(hough::hough_lines_p(edges, params))
    }

    fn undistort(&self, frame: &Frame, intrinsics: &CameraIntrinsics) -> Result<Frame> {
        require_nonempty(frame, "undistort")?;
        Ok(undistort::undistort(frame, intrinsics))
    }
}
