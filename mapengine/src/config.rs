//! Engine tunables. Every field has a default, so a JSON override file only
//! needs the values it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::compositor::LayerStyle;
use crate::error::EngineError;
use crate::labels::{LabelConfig, LabelStyle};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub camera: CameraConfig,
    pub input: InputConfig,
    pub jobs: JobConfig,
    pub labels: LabelConfig,
    pub label_style: LabelStyle,
    pub layers: LayerStyle,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom applied by `reset`, centred on the raster.
    pub initial_zoom: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 15.0,
            initial_zoom: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Screen pixels a primary press may travel before it becomes a pan.
    pub drag_threshold: f64,
    pub wheel_zoom_in: f64,
    pub wheel_zoom_out: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 5.0,
            wheel_zoom_in: 1.1,
            wheel_zoom_out: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Pixels each full-raster pass may touch per frame.
    pub pixel_budget: usize,
    /// Country anchors recomputed per frame.
    pub labels_per_step: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            pixel_budget: 1 << 20,
            labels_per_step: 5,
        }
    }
}
