// src/config.rs

use crate::error::SteerError;
use crate::types::{Config, EdgePipelineConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

macro_rules! invalid {
    ($($arg:tt)*) => {
        return Err(SteerError::Config(format!($($arg)*)))
    };
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), SteerError> {
        if !(self.control.steering_threshold >= 0.0) {
            invalid!("control.steering_threshold must be non-negative");
        }
        if self.control.tick_interval_ms == 0 {
            invalid!("control.tick_interval_ms must be positive");
        }
        if self.control.stop_cooldown_ms < self.control.stop_duration_ms {
            invalid!(
                "control.stop_cooldown_ms ({}) must not be shorter than stop_duration_ms ({})",
                self.control.stop_cooldown_ms,
                self.control.stop_duration_ms
            );
        }

        for (name, hz) in [
            ("steering", self.steering.target_hz),
            ("gravity", self.gravity.target_hz),
            ("wall", self.wall.target_hz),
        ] {
            if !(hz > 0.0) {
                invalid!("{}.target_hz must be positive", name);
            }
            if Duration::try_from_secs_f64(1.0 / hz).is_err() {
                invalid!("{}.target_hz {} gives an unrepresentable interval", name, hz);
            }
        }

        validate_edges("steering.edges", &self.steering.edges)?;
        validate_edges("wall.edges", &self.wall.edges)?;
        if self.gravity.resize_width == 0 {
            invalid!("gravity.resize_width must be positive");
        }

        // Workers must notice the stop flag within a second.
        if self.retry.max_backoff_ms > 1000 {
            invalid!("retry.max_backoff_ms must be at most 1000");
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            invalid!("retry.initial_backoff_ms exceeds retry.max_backoff_ms");
        }

        let bands = &self.angle_bands;
        if bands.vertical_min_deg > bands.vertical_max_deg {
            invalid!("angle_bands: vertical_min_deg exceeds vertical_max_deg");
        }

        Ok(())
    }
}

fn validate_edges(name: &str, edges: &EdgePipelineConfig) -> std::result::Result<(), SteerError> {
    if edges.resize_width == 0 {
        invalid!("{}.resize_width must be positive", name);
    }
    if edges.blur_kernel % 2 == 0 {
        invalid!("{}.blur_kernel must be odd, got {}", name, edges.blur_kernel);
    }
    if edges.clahe_tile_grid[0] == 0 || edges.clahe_tile_grid[1] == 0 {
        invalid!("{}.clahe_tile_grid must be non-zero", name);
    }
    if edges.canny_low > edges.canny_high {
        invalid!("{}.canny_low exceeds canny_high", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SourceConfig, SteeringMode};
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "steering_mode: gravity\ncontrol:\n  steering_threshold: 15\nwall:\n  enabled: false\ngravity:\n  source:\n    kind: directory\n    path: /tmp/frames\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.steering_mode, SteeringMode::Gravity);
        assert_eq!(config.control.steering_threshold, 15.0);
        assert_eq!(config.control.stop_duration_ms, 3000);
        assert!(!config.wall.enabled);
        assert_eq!(
            config.gravity.source,
            SourceConfig::Directory {
                path: "/tmp/frames".into(),
                looping: true
            }
        );
    }

    #[test]
    fn test_rejects_even_blur_kernel() {
        let mut config = Config::default();
        config.steering.edges.blur_kernel = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_slow_backoff() {
        let mut config = Config::default();
        config.retry.max_backoff_ms = 5000;
        match config.validate() {
            Err(SteerError::Config(msg)) => assert!(msg.contains("max_backoff_ms")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_tiny_target_hz() {
        let mut config = Config::default();
        config.wall.target_hz = 1e-30;
        match config.validate() {
            Err(SteerError::Config(msg)) => assert!(msg.contains("wall.target_hz")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.yaml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.steering_mode, SteeringMode::LineDetect);
        assert_eq!(config.steering.source, SourceConfig::device(0));
    }

    #[test]
    fn test_load_reports_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "control:\n  stop_duration_ms: 20000\n").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("stop_cooldown_ms"));
    }
}
