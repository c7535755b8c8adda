//! Input event queue
//!
//! The window layer pushes events as they arrive; the render loop drains
//! them once at the start of each frame, in arrival order.

use std::collections::VecDeque;

use winit::keyboard::KeyCode;

// ============================================================================
// Event Types
// ============================================================================

/// Key transition reported by the window layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Press,
    Release,
    /// Auto-repeat while the key is held
    Repeat,
}

impl KeyAction {
    /// Map winit's pressed state and repeat flag onto a transition.
    #[must_use]
    pub fn from_winit(state: winit::event::ElementState, repeat: bool) -> Self {
        match (state, repeat) {
            (winit::event::ElementState::Released, _) => KeyAction::Release,
            (winit::event::ElementState::Pressed, true) => KeyAction::Repeat,
            (winit::event::ElementState::Pressed, false) => KeyAction::Press,
        }
    }
}

/// One input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A physical key changed state.
    Key { key: KeyCode, action: KeyAction },
    /// Relative mouse motion. Positive `dy` means the mouse moved up.
    MouseDelta { dx: f32, dy: f32 },
}

impl InputEvent {
    #[must_use]
    pub fn press(key: KeyCode) -> Self {
        InputEvent::Key {
            key,
            action: KeyAction::Press,
        }
    }

    #[must_use]
    pub fn release(key: KeyCode) -> Self {
        InputEvent::Key {
            key,
            action: KeyAction::Release,
        }
    }

    #[must_use]
    pub fn repeat(key: KeyCode) -> Self {
        InputEvent::Key {
            key,
            action: KeyAction::Repeat,
        }
    }
}

// ============================================================================
// Input Queue
// ============================================================================

/// FIFO of input events waiting for the next frame.
#[derive(Debug)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }

    #[inline]
    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    /// Take every queued event, oldest first.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::ElementState;

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = InputQueue::new();
        queue.push(InputEvent::press(KeyCode::KeyW));
        queue.push(InputEvent::MouseDelta { dx: 1.0, dy: 2.0 });
        queue.push(InputEvent::release(KeyCode::KeyW));
        assert_eq!(queue.len(), 3);

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events[0], InputEvent::press(KeyCode::KeyW));
        assert_eq!(events[1], InputEvent::MouseDelta { dx: 1.0, dy: 2.0 });
        assert_eq!(events[2], InputEvent::release(KeyCode::KeyW));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_key_action_from_winit() {
        assert_eq!(KeyAction::from_winit(ElementState::Pressed, false), KeyAction::Press);
        assert_eq!(KeyAction::from_winit(ElementState::Pressed, true), KeyAction::Repeat);
        assert_eq!(KeyAction::from_winit(ElementState::Released, false), KeyAction::Release);
        assert_eq!(KeyAction::from_winit(ElementState::Released, true), KeyAction::Release);
    }
}
