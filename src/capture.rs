// src/capture.rs
//
// Frame sources for the perception workers: a live camera through OpenCV
// (behind the `camera` feature) or a directory of still frames for bench
// runs.

use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::error::{Result, SteerError};
use crate::types::{Frame, SourceConfig};

pub trait FrameSource: Send {
    /// Next frame; `Ok(None)` when the source has nothing to give right now.
    fn read(&mut self) -> Result<Option<Frame>>;

    fn release(&mut self);
}

pub fn open_source(cfg: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    match cfg {
        SourceConfig::Directory { path, looping } => {
            Ok(Box::new(ImageSequenceSource::open(path, *looping)?))
        }
        #[cfg(feature = "camera")]
        SourceConfig::Device {
            index,
            width,
            height,
            fps,
        } => Ok(Box::new(CameraSource::open(*index, *width, *height, *fps)?)),
        #[cfg(not(feature = "camera"))]
        SourceConfig::Device { .. } => Err(SteerError::device(
            cfg.describe(),
            "built without the `camera` feature (rebuild with `--features camera` or use a `kind: directory` source)",
        )),
    }
}

// ============================================================================
// IMAGE SEQUENCE
// ============================================================================

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    next: usize,
    looping: bool,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, looping: bool) -> Result<Self> {
        if !dir.is_dir() {
            return Err(SteerError::device(dir.display().to_string(), "not a directory"));
        }

        let files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();

        if files.is_empty() {
            return Err(SteerError::device(dir.display().to_string(), "no image frames found"));
        }

        info!("Found {} frame(s) in {}", files.len(), dir.display());
        Ok(Self {
            files,
            next: 0,
            looping,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        if self.next >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.next = 0;
        }
        let path = &self.files[self.next];
        self.next += 1;

        let rgb = image::open(path)
            .map_err(|e| SteerError::FrameRead(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);

        // RGB → BGR
        let mut data = rgb.into_raw();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        Ok(Some(Frame::new(data, width, height, 3)))
    }

    fn release(&mut self) {
        self.files.clear();
        self.next = 0;
    }
}

// ============================================================================
// CAMERA
// ============================================================================

#[cfg(feature = "camera")]
pub use camera::CameraSource;

#[cfg(feature = "camera")]
mod camera {
    use opencv::{
        core::Mat,
        prelude::*,
        videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
    };
    use tracing::{info, warn};

    use super::FrameSource;
    use crate::error::{Result, SteerError};
    use crate::types::Frame;

    pub struct CameraSource {
        cap: VideoCapture,
        index: i32,
    }

    impl CameraSource {
        pub fn open(index: i32, width: Option<u32>, height: Option<u32>, fps: Option<f64>) -> Result<Self> {
            let device = format!("camera {}", index);
            let mut cap = VideoCapture::new(index, CAP_ANY).map_err(|e| SteerError::device(&device, e))?;
            if !cap.is_opened().map_err(|e| SteerError::device(&device, e))? {
                return Err(SteerError::device(device, "failed to open"));
            }

            for (prop, value) in [
                (CAP_PROP_FRAME_WIDTH, width.map(f64::from)),
                (CAP_PROP_FRAME_HEIGHT, height.map(f64::from)),
                (CAP_PROP_FPS, fps),
            ] {
                if let Some(v) = value {
                    if !cap.set(prop, v).unwrap_or(false) {
                        warn!("camera {}: property {} = {} not accepted", index, prop, v);
                    }
                }
            }

            let w = cap.get(CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
            let h = cap.get(CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
            let f = cap.get(CAP_PROP_FPS).unwrap_or(0.0);
            info!("Camera {} opened at {}x{} @ {:.1} FPS", index, w, h, f);

            Ok(Self { cap, index })
        }
    }

    impl FrameSource for CameraSource {
        fn read(&mut self) -> Result<Option<Frame>> {
            let mut mat = Mat::default();
            if !self.cap.read(&mut mat)? || mat.empty() {
                return Ok(None);
            }
            let mat = if mat.is_continuous() { mat } else { mat.try_clone()? };
            let (width, height) = (mat.cols() as usize, mat.rows() as usize);
            let channels = mat.channels() as usize;
            let data = mat.data_bytes()?.to_vec();
            if data.len() != width * height * channels {
                return Err(SteerError::FrameRead(format!(
                    "camera {}: unexpected buffer size {}",
                    self.index,
                    data.len()
                )));
            }
            Ok(Some(Frame::new(data, width, height, channels)))
        }

        fn release(&mut self) {
            if let Err(e) = self.cap.release() {
                warn!("camera {}: release failed: {}", self.index, e);
            }
        }
    }
}
