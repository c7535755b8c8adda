//! A small real-time 3D viewer built in Rust
//!
//! This crate provides:
//! - Renderable objects (procedural cube, imported mesh, triangle) with an
//!   explicit GPU resource lifecycle
//! - WGSL shader programs that hot reload when their sources change
//! - A yaw/pitch camera driven by mouse motion and key steps
//! - Ambient, point and directional lights with Phong shading
//! - Rendering with wgpu and windowing with winit

pub mod assets;
pub mod core;
pub mod gpu;
pub mod input;
pub mod renderer;

// Re-exports for convenience
pub use glam;
pub use wgpu;
pub use winit;

pub use crate::core::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{FrameOutcome, Program, RendererConfig, RunState};
    pub use crate::core::config::ObjectSpec;
    pub use crate::gpu::{GpuBackend, WgpuBackend};
    pub use crate::input::{InputAction, InputController, InputEvent, InputMapper, KeyAction};
    pub use crate::renderer::{
        ActiveObject, AmbientLight, Camera, DirectionalLight, FeatureFlags, Light,
        LightingEnvironment, PointLight, RenderableObject, Vertex,
    };
    pub use glam::{Mat4, Vec3, Vec4};
    pub use winit::keyboard::KeyCode;
}
