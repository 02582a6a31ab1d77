use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgecamError, Result};

/// Fallback publish rate when the configured one is unusable.
const DEFAULT_FRAME_RATE: f32 = 15.0;

/// Publisher configuration.
///
/// Field defaults mirror the knobs a camera publisher typically exposes:
/// output resolution, JPEG quality, target frame rate, and how often the
/// render loop actually captures (every `capture_divisor`-th tick).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublisherConfig {
    /// Websocket URL of the rosbridge server.
    pub bridge_url: String,
    /// Topic the CompressedImage messages are published on.
    pub topic: String,
    /// Frame ID stamped into each message header.
    pub frame_id: String,
    /// Render target width in pixels.
    pub width: u32,
    /// Render target height in pixels.
    pub height: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// Target publish rate in frames per second.
    pub frame_rate: f32,
    /// Capture every Nth loop tick (0 behaves as 1).
    pub capture_divisor: u32,
    /// Optional downscaled publish width. When both publish dimensions are
    /// set and differ from the render size, frames are resized before
    /// encoding.
    pub publish_width: Option<u32>,
    /// Optional downscaled publish height.
    pub publish_height: Option<u32>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            bridge_url: "ws://127.0.0.1:9090".to_string(),
            topic: "/camera/image/compressed".to_string(),
            frame_id: "camera".to_string(),
            width: 640,
            height: 480,
            quality: 50,
            frame_rate: DEFAULT_FRAME_RATE,
            capture_divisor: 3,
            publish_width: None,
            publish_height: None,
        }
    }
}

impl PublisherConfig {
    /// Load configuration from a JSON file, returning defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            std::fs::read_to_string(path).map_err(|e| BridgecamError::Config(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|e| BridgecamError::Config(e.to_string()))?;
        Ok(config.normalised())
    }

    /// Save configuration to disk atomically (write .tmp then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| BridgecamError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BridgecamError::Config(e.to_string()))?;
        }

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| BridgecamError::Config(e.to_string()))?;
        std::fs::rename(&tmp_path, path).map_err(|e| BridgecamError::Config(e.to_string()))?;

        Ok(())
    }

    /// Clamp out-of-range fields into usable values.
    pub fn normalised(mut self) -> Self {
        self.quality = self.quality.clamp(1, 100);
        // A zero-extent texture fails wgpu validation, so zero render
        // dimensions fall back to the defaults.
        if self.width == 0 {
            self.width = 640;
        }
        if self.height == 0 {
            self.height = 480;
        }
        if self.capture_divisor == 0 {
            self.capture_divisor = 1;
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            self.frame_rate = DEFAULT_FRAME_RATE;
        }
        self
    }

    /// Loop period derived from the frame rate.
    pub fn update_period(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frame_rate)
    }

    /// Publish resolution after optional downscaling.
    pub fn publish_size(&self) -> (u32, u32) {
        match (self.publish_width, self.publish_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => (self.width, self.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_matches_reference_values() {
        let config = PublisherConfig::default();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
        assert_eq!(config.quality, 50);
        assert_eq!(config.frame_rate, 15.0);
        assert_eq!(config.capture_divisor, 3);
        assert_eq!(config.topic, "/camera/image/compressed");
    }

    #[test]
    fn load_returns_default_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.json");
        let config = PublisherConfig::load(&path).unwrap();
        assert_eq!(config, PublisherConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bridgecam.json");
        let config = PublisherConfig {
            topic: "/front/image/compressed".to_string(),
            quality: 80,
            frame_rate: 30.0,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = PublisherConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn save_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bridgecam.json");
        PublisherConfig::default().save(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn load_rejects_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(PublisherConfig::load(&path).is_err());
    }

    #[test]
    fn load_accepts_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"quality": 90}"#).unwrap();
        let config = PublisherConfig::load(&path).unwrap();
        assert_eq!(config.quality, 90);
        assert_eq!(config.width, 640);
    }

    #[test]
    fn normalised_clamps_quality() {
        let config = PublisherConfig {
            quality: 0,
            ..Default::default()
        };
        assert_eq!(config.normalised().quality, 1);
    }

    #[test]
    fn normalised_fixes_zero_render_dimensions() {
        let config = PublisherConfig {
            width: 0,
            height: 0,
            ..Default::default()
        };
        let fixed = config.normalised();
        assert_eq!(fixed.width, 640);
        assert_eq!(fixed.height, 480);
    }

    #[test]
    fn load_recovers_from_zero_width() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zero.json");
        std::fs::write(&path, r#"{"width": 0}"#).unwrap();
        let config = PublisherConfig::load(&path).unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
    }

    #[test]
    fn normalised_fixes_zero_divisor() {
        let config = PublisherConfig {
            capture_divisor: 0,
            ..Default::default()
        };
        assert_eq!(config.normalised().capture_divisor, 1);
    }

    #[test]
    fn normalised_fixes_nonpositive_frame_rate() {
        let config = PublisherConfig {
            frame_rate: -5.0,
            ..Default::default()
        };
        assert_eq!(config.normalised().frame_rate, DEFAULT_FRAME_RATE);
    }

    #[test]
    fn update_period_is_inverse_of_frame_rate() {
        // 1/16 is exact in f32, so the period comes out as exactly 62.5ms
        let config = PublisherConfig {
            frame_rate: 16.0,
            ..Default::default()
        };
        assert_eq!(config.update_period(), Duration::from_micros(62_500));
    }

    #[test]
    fn publish_size_defaults_to_render_size() {
        let config = PublisherConfig::default();
        assert_eq!(config.publish_size(), (640, 480));
    }

    #[test]
    fn publish_size_uses_downscale_dimensions_when_set() {
        let config = PublisherConfig {
            publish_width: Some(320),
            publish_height: Some(240),
            ..Default::default()
        };
        assert_eq!(config.publish_size(), (320, 240));
    }

    #[test]
    fn publish_size_ignores_zero_dimensions() {
        let config = PublisherConfig {
            publish_width: Some(0),
            publish_height: Some(240),
            ..Default::default()
        };
        assert_eq!(config.publish_size(), (640, 480));
    }
}
