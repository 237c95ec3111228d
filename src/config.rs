use std::path::Path;

use serde::Deserialize;

use crate::{
    camera::{Camera, CameraSettings},
    error::{RenderError, Result},
    render_system::kernel::ConstantParams,
};

/// Settings for a progressive render, read from a JSON file. Every field is
/// optional and falls back to [`RenderConfig::default`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    // bounces per path
    pub depth: u32,
    pub flip_y: bool,
    pub gamma: f32,
    pub ray_cast_epsilon: f32,
    // progressive iterations the binary runs before saving
    pub frames: u32,
    // worker threads, 0 means one per core
    pub threads: usize,
    // image rows handed to a worker job at a time
    pub band_rows: u32,
    pub seed: u64,
    pub output: String,
    pub camera: CameraSettings,
}

impl Default for RenderConfig {
    fn default() -> RenderConfig {
        RenderConfig {
            width: 640,
            height: 360,
            depth: 8,
            flip_y: true,
            gamma: 2.2,
            ray_cast_epsilon: 0.001,
            frames: 64,
            threads: 0,
            band_rows: 8,
            seed: 0,
            output: "render.png".to_string(),
            camera: CameraSettings::default(),
        }
    }
}

impl RenderConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<RenderConfig> {
        let text = std::fs::read_to_string(path)?;
        let config: RenderConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "image size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(RenderError::InvalidConfig(format!(
                "{}x{} pixels do not fit a u32 index",
                self.width, self.height
            )));
        }
        if !(self.gamma > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if !(self.ray_cast_epsilon >= 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "ray_cast_epsilon must not be negative, got {}",
                self.ray_cast_epsilon
            )));
        }
        if self.band_rows == 0 {
            return Err(RenderError::InvalidConfig(
                "band_rows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn camera(&self) -> Camera {
        Camera::from_settings(&self.camera, self.aspect_ratio())
    }

    /// Parameters for the frame that brings the accumulation to `iteration`
    /// samples per pixel.
    pub fn constant_params(&self, camera: Camera, iteration: u32) -> ConstantParams {
        ConstantParams {
            depth: self.depth,
            width: self.width,
            height: self.height,
            flip_y: self.flip_y,
            inverted_gamma: 1.0 / self.gamma,
            ray_cast_epsilon: self.ray_cast_epsilon,
            current_iteration: iteration as f32,
            camera,
        }
    }
}
