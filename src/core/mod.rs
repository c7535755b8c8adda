//! Core viewer module
//!
//! Configuration, errors, the render loop and the winit application that
//! drives it.

pub mod app;
pub mod config;
pub mod error;
pub mod program;
pub mod stage;
pub mod stats;

pub use app::run;
pub use config::RendererConfig;
pub use error::{Error, Result};
pub use program::{FrameOutcome, Program, RunState};
pub use stage::Stage;
pub use stats::FrameStats;
