// src/preview.rs
//
// Optional live display of the detectors' debug frames.

use std::time::Duration;

use crate::error::Result;
use crate::types::Frame;

pub const STEERING_WINDOW: &str = "Steering Camera";
pub const GRAVITY_WINDOW: &str = "Gravity Camera";
pub const WALL_RIGHT_WINDOW: &str = "Wall Right (Top)";
pub const WALL_LEFT_WINDOW: &str = "Wall Left (Bottom)";

pub trait PreviewSink {
    fn show(&mut self, window: &str, frame: &Frame) -> Result<()>;

    /// Block up to `timeout` for a key press; `true` when the quit key was hit.
    fn wait_quit(&mut self, timeout: Duration) -> Result<bool>;

    fn close(&mut self);
}

/// Display backend for `preview.enabled`; `None` when this build cannot
/// open windows.
pub fn open_preview() -> Option<Box<dyn PreviewSink>> {
    #[cfg(feature = "camera")]
    {
        Some(Box::new(OpenCvPreview::new()))
    }
    #[cfg(not(feature = "camera"))]
    {
        tracing::warn!("preview requested but built without the `camera` feature; running headless");
        None
    }
}

#[cfg(feature = "camera")]
pub use opencv_preview::OpenCvPreview;

#[cfg(feature = "camera")]
mod opencv_preview {
    use opencv::{core::Mat, highgui, prelude::*};
    use std::collections::HashSet;
    use std::time::Duration;
    use tracing::warn;

    use super::PreviewSink;
    use crate::error::Result;
    use crate::types::Frame;

    const QUIT_KEY: i32 = b'q' as i32;

    #[derive(Default)]
    pub struct OpenCvPreview {
        windows: HashSet<String>,
    }

    impl OpenCvPreview {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl PreviewSink for OpenCvPreview {
        fn show(&mut self, window: &str, frame: &Frame) -> Result<()> {
            let mat = Mat::from_slice(&frame.data)?;
            let mat = mat.reshape(frame.channels as i32, frame.height as i32)?;
            let mat = mat.try_clone()?;
            highgui::imshow(window, &mat)?;
            self.windows.insert(window.to_string());
            Ok(())
        }

        fn wait_quit(&mut self, timeout: Duration) -> Result<bool> {
            let key = highgui::wait_key(timeout.as_millis().max(1) as i32)?;
            Ok(key & 0xFF == QUIT_KEY)
        }

        fn close(&mut self) {
            if let Err(e) = highgui::destroy_all_windows() {
                warn!("failed to close preview windows: {}", e);
            }
            self.windows.clear();
        }
    }
}
