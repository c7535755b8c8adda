//! Key to action mapping
//!
//! Physical keys map to logical [`InputAction`]s so bindings can be changed
//! at runtime without touching the controller.
//!
//! # Example
//!
//! ```ignore
//! let mut mapper = InputMapper::with_defaults();
//! mapper.bind(KeyCode::ArrowUp, InputAction::MoveForward);
//! assert_eq!(mapper.get_action(KeyCode::ArrowUp), Some(InputAction::MoveForward));
//! ```

use rustc_hash::FxHashMap;
use winit::keyboard::KeyCode;

// ============================================================================
// Input Actions
// ============================================================================

/// What a key means to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    // -------------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------------
    MoveForward,
    MoveBackward,
    StrafeLeft,
    StrafeRight,

    // -------------------------------------------------------------------------
    // Toggles
    // -------------------------------------------------------------------------
    /// Point-light specular term on/off
    ToggleSpecular,
    /// Directional light on/off
    ToggleDirectional,
    /// Swap which object is drawn
    ToggleActiveObject,

    /// Close the window
    Quit,
}

// ============================================================================
// Input Mapper
// ============================================================================

/// Maps physical keys to actions. One action per key, any number of keys per action.
#[derive(Debug, Clone)]
pub struct InputMapper {
    key_bindings: FxHashMap<KeyCode, InputAction>,
    /// Reverse lookup
    action_keys: FxHashMap<InputAction, Vec<KeyCode>>,
}

impl InputMapper {
    /// Create a mapper with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key_bindings: FxHashMap::default(),
            action_keys: FxHashMap::default(),
        }
    }

    /// Create a mapper with the standard viewer bindings.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut mapper = Self::new();

        mapper.bind(KeyCode::KeyW, InputAction::MoveForward);
        mapper.bind(KeyCode::KeyS, InputAction::MoveBackward);
        mapper.bind(KeyCode::KeyA, InputAction::StrafeLeft);
        mapper.bind(KeyCode::KeyD, InputAction::StrafeRight);

        mapper.bind(KeyCode::Space, InputAction::ToggleSpecular);
        mapper.bind(KeyCode::KeyL, InputAction::ToggleDirectional);
        mapper.bind(KeyCode::KeyM, InputAction::ToggleActiveObject);

        mapper.bind(KeyCode::Escape, InputAction::Quit);

        mapper
    }

    /// Bind a key to an action, replacing any previous binding of that key.
    pub fn bind(&mut self, key: KeyCode, action: InputAction) {
        self.forget_key(key);
        self.key_bindings.insert(key, action);
        self.action_keys.entry(action).or_default().push(key);
    }

    /// Remove a key's binding.
    pub fn unbind(&mut self, key: KeyCode) {
        self.forget_key(key);
    }

    fn forget_key(&mut self, key: KeyCode) {
        let Some(old_action) = self.key_bindings.remove(&key) else {
            return;
        };
        if let Some(keys) = self.action_keys.get_mut(&old_action) {
            keys.retain(|k| *k != key);
        }
    }

    #[must_use]
    pub fn get_action(&self, key: KeyCode) -> Option<InputAction> {
        self.key_bindings.get(&key).copied()
    }

    /// Keys bound to an action, in binding order.
    #[must_use]
    pub fn keys_for(&self, action: InputAction) -> &[KeyCode] {
        self.action_keys.get(&action).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_bound(&self, key: KeyCode) -> bool {
        self.key_bindings.contains_key(&key)
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.key_bindings.len()
    }
}

impl Default for InputMapper {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let mapper = InputMapper::with_defaults();

        assert_eq!(mapper.get_action(KeyCode::KeyW), Some(InputAction::MoveForward));
        assert_eq!(mapper.get_action(KeyCode::KeyS), Some(InputAction::MoveBackward));
        assert_eq!(mapper.get_action(KeyCode::KeyA), Some(InputAction::StrafeLeft));
        assert_eq!(mapper.get_action(KeyCode::KeyD), Some(InputAction::StrafeRight));
        assert_eq!(mapper.get_action(KeyCode::Space), Some(InputAction::ToggleSpecular));
        assert_eq!(mapper.get_action(KeyCode::KeyL), Some(InputAction::ToggleDirectional));
        assert_eq!(mapper.get_action(KeyCode::KeyM), Some(InputAction::ToggleActiveObject));
        assert_eq!(mapper.get_action(KeyCode::Escape), Some(InputAction::Quit));
        assert_eq!(mapper.binding_count(), 8);
        assert_eq!(mapper.get_action(KeyCode::KeyQ), None);
    }

    #[test]
    fn test_rebind_moves_key_between_actions() {
        let mut mapper = InputMapper::with_defaults();

        mapper.bind(KeyCode::KeyW, InputAction::Quit);

        assert_eq!(mapper.get_action(KeyCode::KeyW), Some(InputAction::Quit));
        assert!(mapper.keys_for(InputAction::MoveForward).is_empty());
        assert_eq!(
            mapper.keys_for(InputAction::Quit),
            &[KeyCode::Escape, KeyCode::KeyW]
        );
    }

    #[test]
    fn test_several_keys_per_action() {
        let mut mapper = InputMapper::with_defaults();
        mapper.bind(KeyCode::ArrowUp, InputAction::MoveForward);

        assert_eq!(
            mapper.keys_for(InputAction::MoveForward),
            &[KeyCode::KeyW, KeyCode::ArrowUp]
        );
    }

    #[test]
    fn test_unbind() {
        let mut mapper = InputMapper::with_defaults();
        mapper.unbind(KeyCode::Space);

        assert!(!mapper.is_bound(KeyCode::Space));
        assert!(mapper.keys_for(InputAction::ToggleSpecular).is_empty());

        // Unbinding an unbound key is a no-op
        mapper.unbind(KeyCode::Space);
        assert_eq!(mapper.binding_count(), 7);
    }
}
