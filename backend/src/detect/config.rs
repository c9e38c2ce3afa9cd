use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub model: ModelParams,
    pub video: VideoParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoParams {
    pub max_frames: usize,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        }
    }
}

impl Default for VideoParams {
    fn default() -> Self {
        Self { max_frames: 300 }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: ModelParams::default(),
            video: VideoParams::default(),
        }
    }
}

impl DetectorConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = match std::env::var("CARGO_MANIFEST_DIR") {
            Ok(manifest_dir) => format!("{}/../config/detector.yaml", manifest_dir),
            Err(_) => "config/detector.yaml".to_string(),
        };
        let config_str = std::fs::read_to_string(config_path)?;
        let config: DetectorConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_yolo_conventions() {
        let config = DetectorConfig::default();
        assert_eq!(config.model.input_size, 640);
        assert!((config.model.confidence_threshold - 0.25).abs() < f32::EPSILON);
        assert!((config.model.iou_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.video.max_frames, 300);
    }

    #[test]
    fn parses_the_shipped_yaml_shape() {
        let yaml = r#"
model:
  input_size: 320
  confidence_threshold: 0.5
  iou_threshold: 0.4
video:
  max_frames: 60
"#;
        let config: DetectorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model.input_size, 320);
        assert_eq!(config.video.max_frames, 60);
    }
}
