// src/types.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub steering_mode: SteeringMode,
    pub control: ControlConfig,
    pub serial: SerialConfig,
    pub steering: SteeringWorkerConfig,
    pub gravity: GravityWorkerConfig,
    pub wall: WallWorkerConfig,
    pub angle_bands: AngleBands,
    pub retry: RetryConfig,
    pub preview: PreviewConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steering_mode: SteeringMode::LineDetect,
            control: ControlConfig::default(),
            serial: SerialConfig::default(),
            steering: SteeringWorkerConfig::default(),
            gravity: GravityWorkerConfig::default(),
            wall: WallWorkerConfig::default(),
            angle_bands: AngleBands::default(),
            retry: RetryConfig::default(),
            preview: PreviewConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Which perception slot feeds the steering command. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringMode {
    LineDetect,
    Gravity,
}

impl SteeringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SteeringMode::LineDetect => "LINE_DETECT",
            SteeringMode::Gravity => "GRAVITY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Pixels of lateral offset tolerated before a turn command is issued
    pub steering_threshold: f32,
    pub stop_duration_ms: u64,
    /// Measured from the moment the stop starts
    pub stop_cooldown_ms: u64,
    pub tick_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            steering_threshold: 20.0,
            stop_duration_ms: 3000,
            stop_cooldown_ms: 10000,
            tick_interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub enabled: bool,
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: "/dev/ttyS0".to_string(),
            baud_rate: 115200,
            timeout_ms: 1000,
        }
    }
}

/// Where a worker gets its frames from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Device {
        index: i32,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
        #[serde(default)]
        fps: Option<f64>,
    },
    Directory {
        path: PathBuf,
        #[serde(default = "default_looping")]
        looping: bool,
    },
}

fn default_looping() -> bool {
    true
}

impl SourceConfig {
    pub fn device(index: i32) -> Self {
        SourceConfig::Device {
            index,
            width: None,
            height: None,
            fps: None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceConfig::Device { index, .. } => format!("camera {}", index),
            SourceConfig::Directory { path, .. } => format!("frames in {}", path.display()),
        }
    }
}

/// Parameters shared by the edge + line pipelines (steering and wall).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgePipelineConfig {
    pub resize_width: usize,
    pub clahe_clip_limit: f32,
    pub clahe_tile_grid: [usize; 2],
    pub blur_kernel: usize,
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_threshold: u32,
    pub hough_min_line_length: f32,
    pub hough_max_line_gap: u32,
}

impl Default for EdgePipelineConfig {
    fn default() -> Self {
        Self {
            resize_width: 240,
            clahe_clip_limit: 15.0,
            clahe_tile_grid: [4, 4],
            blur_kernel: 7,
            canny_low: 100.0,
            canny_high: 150.0,
            hough_threshold: 35,
            hough_min_line_length: 35.0,
            hough_max_line_gap: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringWorkerConfig {
    pub source: SourceConfig,
    pub target_hz: f64,
    pub edges: EdgePipelineConfig,
    /// Edge components with this many pixels or fewer are dropped as noise
    pub min_noise_area: usize,
}

impl Default for SteeringWorkerConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::device(0),
            target_hz: 2.0,
            edges: EdgePipelineConfig::default(),
            min_noise_area: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityWorkerConfig {
    pub source: SourceConfig,
    pub target_hz: f64,
    pub resize_width: usize,
}

impl Default for GravityWorkerConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::device(0),
            target_hz: 5.0,
            resize_width: 240,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WallWorkerConfig {
    pub enabled: bool,
    pub source: SourceConfig,
    pub target_hz: f64,
    pub edges: EdgePipelineConfig,
    pub undistort: Option<CameraIntrinsics>,
}

impl Default for WallWorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: SourceConfig::device(1),
            target_hz: 5.0,
            edges: EdgePipelineConfig {
                clahe_tile_grid: [12, 12],
                canny_low: 90.0,
                hough_threshold: 30,
                hough_min_line_length: 30.0,
                ..EdgePipelineConfig::default()
            },
            undistort: None,
        }
    }
}

/// Pinhole intrinsics plus Brown-Conrady distortion (k1, k2, p1, p2, k3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub camera_matrix: [[f64; 3]; 3],
    pub dist_coeffs: [f64; 5],
    /// Resolution the matrix was calibrated at; rescaled to the live frame
    pub calibration_size: [usize; 2],
}

/// Angle bands (absolute degrees) used to classify Hough segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngleBands {
    pub horizontal_max_deg: f32,
    pub horizontal_min_deg: f32,
    pub vertical_min_deg: f32,
    pub vertical_max_deg: f32,
}

impl Default for AngleBands {
    fn default() -> Self {
        Self {
            horizontal_max_deg: 10.0,
            horizontal_min_deg: 175.0,
            vertical_min_deg: 80.0,
            vertical_max_deg: 100.0,
        }
    }
}

impl AngleBands {
    pub fn is_horizontal(&self, abs_angle_deg: f32) -> bool {
        abs_angle_deg <= self.horizontal_max_deg || abs_angle_deg >= self.horizontal_min_deg
    }

    pub fn is_vertical(&self, abs_angle_deg: f32) -> bool {
        (self.vertical_min_deg..=self.vertical_max_deg).contains(&abs_angle_deg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub idle_sleep_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 1000,
            idle_sleep_ms: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// FRAMES
// ============================================================================

/// Owned pixel buffer. Row-major; 3-channel frames are BGR interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * channels);
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> Self {
        Self::new(vec![value; width * height * channels], width, height, channels)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn is_gray(&self) -> bool {
        self.channels == 1
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.channels
    }

    /// Grey value at (x, y). Only meaningful for 1-channel frames.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * self.channels;
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Copy of rows `[y0, y1)`.
    pub fn crop_rows(&self, y0: usize, y1: usize) -> Frame {
        let stride = self.width * self.channels;
        let y1 = y1.min(self.height);
        let y0 = y0.min(y1);
        Frame::new(
            self.data[y0 * stride..y1 * stride].to_vec(),
            self.width,
            y1 - y0,
            self.channels,
        )
    }
}

// ============================================================================
// LINE SEGMENTS
// ============================================================================

/// Segment as returned by the probabilistic Hough transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Absolute angle in degrees, [0, 180].
    pub fn abs_angle_deg(&self) -> f32 {
        ((self.y2 - self.y1) as f32)
            .atan2((self.x2 - self.x1) as f32)
            .to_degrees()
            .abs()
    }

    /// Slope and intercept of `y = m x + c`; `None` for exactly vertical segments.
    pub fn slope_intercept(&self) -> Option<(f32, f32)> {
        if self.x1 == self.x2 {
            return None;
        }
        let m = (self.y2 - self.y1) as f32 / (self.x2 - self.x1) as f32;
        let c = self.y1 as f32 - m * self.x1 as f32;
        Some((m, c))
    }

    pub fn midpoint_x(&self) -> f32 {
        (self.x1 + self.x2) as f32 / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_bands_classification() {
        let bands = AngleBands::default();
        assert!(bands.is_horizontal(0.0));
        assert!(bands.is_horizontal(10.0));
        assert!(bands.is_horizontal(178.0));
        assert!(!bands.is_horizontal(45.0));
        assert!(bands.is_vertical(90.0));
        assert!(bands.is_vertical(80.0));
        assert!(!bands.is_vertical(79.9));
        assert!(!bands.is_vertical(135.0));
    }

    #[test]
    fn test_segment_geometry() {
        let seg = LineSegment::new(0, 0, 10, 10);
        assert!((seg.abs_angle_deg() - 45.0).abs() < 1e-4);
        let (m, c) = seg.slope_intercept().unwrap();
        assert!((m - 1.0).abs() < 1e-6);
        assert!(c.abs() < 1e-6);
        assert_eq!(seg.midpoint_x(), 5.0);

        let vertical = LineSegment::new(4, 0, 4, 20);
        assert!(vertical.slope_intercept().is_none());
        assert!((vertical.abs_angle_deg() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_crop_rows() {
        let mut frame = Frame::filled(4, 4, 1, 0);
        for y in 0..4 {
            for x in 0..4 {
                frame.data[y * 4 + x] = y as u8;
            }
        }
        let bottom = frame.crop_rows(2, 4);
        assert_eq!(bottom.height, 2);
        assert_eq!(bottom.get(0, 0), 2);
        assert_eq!(bottom.get(3, 1), 3);
    }
}
