//! Input handling
//!
//! The window layer turns raw events into [`InputEvent`]s and queues them;
//! the render loop drains the queue once per frame through an
//! [`InputController`].

pub mod controller;
pub mod mapping;
pub mod queue;

pub use controller::{ControlRequest, InputController};
pub use mapping::{InputAction, InputMapper};
pub use queue::{InputEvent, InputQueue, KeyAction};
