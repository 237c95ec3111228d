pub mod camera;
pub mod config;
pub mod error;
pub mod render_system;
pub mod utils;

pub use camera::{Camera, CameraSettings};
pub use config::RenderConfig;
pub use error::{RenderError, Result};
pub use render_system::{
    kernel::FrameMode,
    material::Material,
    progressive_rendering::Renderer,
    scene::{Scene, SceneBuilder},
};
