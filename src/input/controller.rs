//! Applies input events to the camera and feature flags

use super::mapping::{InputAction, InputMapper};
use super::queue::{InputEvent, KeyAction};
use crate::renderer::camera::{Camera, MovementKind};
use crate::renderer::flags::FeatureFlags;

/// What the render loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlRequest {
    #[default]
    Continue,
    Close,
}

/// Turns [`InputEvent`]s into camera motion, flag toggles and close requests.
#[derive(Debug, Clone)]
pub struct InputController {
    mapper: InputMapper,
    /// World units per movement event
    movement_speed: f32,
}

impl InputController {
    #[must_use]
    pub fn new(mapper: InputMapper, movement_speed: f32) -> Self {
        Self {
            mapper,
            movement_speed,
        }
    }

    /// Apply one event.
    ///
    /// Movement keys step on press and repeat, toggles flip on release and
    /// quit fires on press. Unbound keys are ignored.
    pub fn apply(
        &self,
        event: InputEvent,
        camera: &mut Camera,
        flags: &mut FeatureFlags,
    ) -> ControlRequest {
        match event {
            InputEvent::MouseDelta { dx, dy } => {
                camera.apply_mouse_delta(dx, dy);
                ControlRequest::Continue
            }
            InputEvent::Key { key, action } => match self.mapper.get_action(key) {
                Some(bound) => self.apply_action(bound, action, camera, flags),
                None => ControlRequest::Continue,
            },
        }
    }

    fn apply_action(
        &self,
        bound: InputAction,
        action: KeyAction,
        camera: &mut Camera,
        flags: &mut FeatureFlags,
    ) -> ControlRequest {
        if let Some(kind) = movement_kind(bound) {
            if action != KeyAction::Release {
                camera.apply_movement_step(kind, self.movement_speed);
            }
            return ControlRequest::Continue;
        }

        match (bound, action) {
            (InputAction::ToggleSpecular, KeyAction::Release) => {
                flags.toggle_specular();
                log::debug!("Specular {}", on_off(flags.specular));
            }
            (InputAction::ToggleDirectional, KeyAction::Release) => {
                flags.toggle_directional();
                log::debug!("Directional light {}", on_off(flags.directional));
            }
            (InputAction::ToggleActiveObject, KeyAction::Release) => {
                flags.toggle_active_object();
                log::debug!("Active object: {:?}", flags.active);
            }
            (InputAction::Quit, KeyAction::Press) => {
                log::info!("Quit requested");
                return ControlRequest::Close;
            }
            _ => {}
        }
        ControlRequest::Continue
    }
}

impl Default for InputController {
    fn default() -> Self {
        Self::new(InputMapper::with_defaults(), 0.2)
    }
}

fn movement_kind(action: InputAction) -> Option<MovementKind> {
    match action {
        InputAction::MoveForward => Some(MovementKind::Forward),
        InputAction::MoveBackward => Some(MovementKind::Backward),
        InputAction::StrafeLeft => Some(MovementKind::StrafeLeft),
        InputAction::StrafeRight => Some(MovementKind::StrafeRight),
        _ => None,
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
