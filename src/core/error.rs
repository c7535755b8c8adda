//! Crate-wide error type

use std::path::PathBuf;

use thiserror::Error;

use crate::gpu::ShaderStage;

/// Errors that can abort start-up.
///
/// Shader errors raised while hot reloading are logged instead of returned,
/// so everything here is fatal when it reaches `main`.
#[derive(Debug, Error)]
pub enum Error {
    /// Window, surface, adapter or device could not be created.
    #[error("failed to initialise graphics resources: {0}")]
    ResourceInit(String),

    /// A shader source could not be read, preprocessed or compiled.
    #[error("failed to compile {stage} shader {}: {message}", .path.display())]
    ShaderCompile {
        stage: ShaderStage,
        path: PathBuf,
        message: String,
    },

    /// Compiled stages could not be linked into a program.
    #[error("failed to link shader program: {message}")]
    ShaderLink { message: String },

    /// A mesh file could not be read or parsed.
    #[error("failed to load mesh {}: {message}", .path.display())]
    Asset { path: PathBuf, message: String },

    /// The configuration file could not be read or parsed.
    #[error("failed to load config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// The window event loop failed.
    #[error("event loop error: {0}")]
    EventLoop(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<winit::error::EventLoopError> for Error {
    fn from(err: winit::error::EventLoopError) -> Self {
        Error::EventLoop(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_compile_message_names_stage_and_path() {
        let err = Error::ShaderCompile {
            stage: ShaderStage::Fragment,
            path: PathBuf::from("shaders/object.frag.wgsl"),
            message: "expected `;`".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("fragment"));
        assert!(text.contains("object.frag.wgsl"));
        assert!(text.contains("expected `;`"));
    }
}
