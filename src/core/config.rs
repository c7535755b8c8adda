//! Viewer configuration
//!
//! All start-up values (window, camera, lights, shader locations and the two
//! scene objects) live in one [`RendererConfig`] value that is passed to the
//! program at construction. It can be loaded from a RON file; every field
//! has a default, so a file only needs to name what it changes.
//!
//! ```ron
//! (
//!     window: (title: "Suzanne", width: 1920, height: 1080),
//!     scene: (secondary: Mesh(path: "assets/suzanne.obj", colour: (0.2, 0.8, 0.0))),
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::error::{Error, Result};
use crate::renderer::lights::LightingEnvironment;

/// Window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable VSync
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("Lumen"),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// Initial camera state and input response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub view_direction: Vec3,
    pub up: Vec3,
    /// Degrees
    pub yaw: f32,
    /// Degrees
    pub pitch: f32,
    /// Degrees of rotation per unit of mouse motion
    pub sensitivity: f32,
    /// World units per movement key press or repeat
    pub movement_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 3.0),
            view_direction: Vec3::NEG_Z,
            up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            sensitivity: 0.1,
            movement_speed: 0.2,
        }
    }
}

/// Where shader sources are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directory holding the stage sources
    pub directory: PathBuf,
    /// Vertex stage file name, relative to `directory`
    pub vertex: PathBuf,
    /// Fragment stage file name, relative to `directory`
    pub fragment: PathBuf,
    /// Extra directories searched by `#include`
    pub include_dirs: Vec<PathBuf>,
}

impl ShaderConfig {
    /// Full path of the vertex stage source.
    #[must_use]
    pub fn vertex_path(&self) -> PathBuf {
        self.directory.join(&self.vertex)
    }

    /// Full path of the fragment stage source.
    #[must_use]
    pub fn fragment_path(&self) -> PathBuf {
        self.directory.join(&self.fragment)
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("shaders"),
            vertex: PathBuf::from("object.vert.wgsl"),
            fragment: PathBuf::from("object.frag.wgsl"),
            include_dirs: Vec::new(),
        }
    }
}

/// Description of one renderable object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectSpec {
    /// Procedural cube spanning `-half_extent..=half_extent` on each axis
    Cube { half_extent: f32, colour: Vec3 },
    /// Mesh loaded from an `.obj`, `.gltf` or `.glb` file
    Mesh { path: PathBuf, colour: Vec3 },
    /// Single flat triangle
    Triangle { colour: Vec3 },
}

/// The two resident objects; `primary` is shown first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub primary: ObjectSpec,
    pub secondary: ObjectSpec,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            primary: ObjectSpec::Cube {
                half_extent: 1.0,
                colour: Vec3::new(1.0, 0.647, 0.0),
            },
            secondary: ObjectSpec::Mesh {
                path: PathBuf::from("assets/icosphere.obj"),
                colour: Vec3::new(0.2, 0.8, 0.0),
            },
        }
    }
}

/// Complete start-up configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub lighting: LightingEnvironment,
    pub shaders: ShaderConfig,
    pub scene: SceneConfig,
    /// RGBA clear colour
    pub clear_colour: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            lighting: LightingEnvironment::default(),
            shaders: ShaderConfig::default(),
            scene: SceneConfig::default(),
            clear_colour: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RendererConfig {
    /// Load a configuration from a RON file.
    ///
    /// Relative shader and mesh paths in the file are resolved against the
    /// file's own directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| Error::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let mut config = Self::from_ron(&text).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Parse a configuration from RON text.
    pub fn from_ron(text: &str) -> std::result::Result<Self, String> {
        ron::from_str(text).map_err(|err| err.to_string())
    }

    /// Serialise to pretty RON.
    pub fn to_ron(&self) -> std::result::Result<String, String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|err| err.to_string())
    }

    /// Resolve relative shader and mesh paths against `base`.
    #[must_use]
    pub fn with_base_directory(mut self, base: impl AsRef<Path>) -> Self {
        self.resolve_relative_to(base.as_ref());
        self
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        resolve(&mut self.shaders.directory);
        self.shaders.include_dirs.iter_mut().for_each(resolve);
        for spec in [&mut self.scene.primary, &mut self.scene.secondary] {
            if let ObjectSpec::Mesh { path, .. } = spec {
                resolve(path);
            }
        }
    }

    /// Set the window title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    /// Set window dimensions
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Enable or disable VSync
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.window.vsync = vsync;
        self
    }

    /// Replace the two scene objects
    #[must_use]
    pub fn with_scene(mut self, primary: ObjectSpec, secondary: ObjectSpec) -> Self {
        self.scene = SceneConfig { primary, secondary };
        self
    }

    /// Read shaders from another directory
    #[must_use]
    pub fn with_shader_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.shaders.directory = directory.into();
        self
    }
}
