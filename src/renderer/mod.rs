//! Rendering module
//!
//! Camera, lights, shader programs and the renderable objects that tie them
//! to the GPU backend.

pub mod camera;
pub mod flags;
pub mod lights;
pub mod object;
pub mod shader;
pub mod vertex;

pub use camera::{Camera, MovementKind};
pub use flags::{ActiveObject, FeatureFlags};
pub use lights::{AmbientLight, DirectionalLight, Light, LightingEnvironment, PointLight};
pub use object::{FrameContext, Geometry, ObjectKind, RenderableObject, Residency};
pub use shader::{ReloadOutcome, ShaderPaths, ShaderProgram, ShaderSource};
pub use vertex::Vertex;
