//! Platform-agnostic input state.
//!
//! Hosts translate their window events into [`Key`], [`MouseButton`] and
//! [`ButtonState`] and inject them here; scripts query the result through
//! [`ScriptContext::input`](crate::scene::ScriptContext).

use glam::Vec2;
use rustc_hash::FxHashSet;

/// Keyboard keys the engine distinguishes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,

    Space,
    Enter,
    Escape,
    Backspace,
    Tab,

    Shift,
    Control,
    Alt,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Held, just-pressed and just-released state for keys and mouse buttons,
/// plus per-frame pointer motion.
///
/// Transient state (`*_down`, `*_up`, deltas) covers everything injected
/// since the last [`start_frame`](Self::start_frame).
#[derive(Debug, Clone, Default)]
pub struct InputManager {
    pressed_keys: FxHashSet<Key>,
    just_pressed_keys: FxHashSet<Key>,
    just_released_keys: FxHashSet<Key>,

    pressed_mouse: FxHashSet<MouseButton>,
    just_pressed_mouse: FxHashSet<MouseButton>,
    just_released_mouse: FxHashSet<MouseButton>,

    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
    scroll_delta: Vec2,
}

impl InputManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Injection (host side)
    // ========================================================================

    /// Clears transient state. Called by the engine at the end of each tick.
    pub fn start_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_released_keys.clear();
        self.just_pressed_mouse.clear();
        self.just_released_mouse.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn inject_key(&mut self, key: Key, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                if self.pressed_keys.insert(key) {
                    self.just_pressed_keys.insert(key);
                }
            }
            ButtonState::Released => {
                if self.pressed_keys.remove(&key) {
                    self.just_released_keys.insert(key);
                }
            }
        }
    }

    pub fn inject_mouse_button(&mut self, button: MouseButton, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                if self.pressed_mouse.insert(button) {
                    self.just_pressed_mouse.insert(button);
                }
            }
            ButtonState::Released => {
                if self.pressed_mouse.remove(&button) {
                    self.just_released_mouse.insert(button);
                }
            }
        }
    }

    /// The first position after startup produces no delta.
    pub fn inject_mouse_position(&mut self, x: f32, y: f32) {
        let position = Vec2::new(x, y);
        if let Some(previous) = self.mouse_position {
            self.mouse_delta += position - previous;
        }
        self.mouse_position = Some(position);
    }

    pub fn inject_scroll(&mut self, dx: f32, dy: f32) {
        self.scroll_delta += Vec2::new(dx, dy);
    }

    // ========================================================================
    // Queries (script side)
    // ========================================================================

    #[must_use]
    pub fn key(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }

    #[must_use]
    pub fn key_down(&self, key: Key) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    #[must_use]
    pub fn key_up(&self, key: Key) -> bool {
        self.just_released_keys.contains(&key)
    }

    #[must_use]
    pub fn mouse_button(&self, button: MouseButton) -> bool {
        self.pressed_mouse.contains(&button)
    }

    #[must_use]
    pub fn mouse_button_down(&self, button: MouseButton) -> bool {
        self.just_pressed_mouse.contains(&button)
    }

    #[must_use]
    pub fn mouse_button_up(&self, button: MouseButton) -> bool {
        self.just_released_mouse.contains(&button)
    }

    #[must_use]
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position.unwrap_or(Vec2::ZERO)
    }

    #[must_use]
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    #[must_use]
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_transient_but_hold_persists() {
        let mut input = InputManager::new();
        input.inject_key(Key::W, ButtonState::Pressed);
        assert!(input.key(Key::W));
        assert!(input.key_down(Key::W));

        input.start_frame();
        assert!(input.key(Key::W));
        assert!(!input.key_down(Key::W));

        input.inject_key(Key::W, ButtonState::Released);
        assert!(!input.key(Key::W));
        assert!(input.key_up(Key::W));
    }

    #[test]
    fn repeated_press_does_not_retrigger() {
        let mut input = InputManager::new();
        input.inject_mouse_button(MouseButton::Left, ButtonState::Pressed);
        input.start_frame();
        input.inject_mouse_button(MouseButton::Left, ButtonState::Pressed);
        assert!(!input.mouse_button_down(MouseButton::Left));
    }

    #[test]
    fn mouse_delta_accumulates_until_frame_start() {
        let mut input = InputManager::new();
        input.inject_mouse_position(10.0, 10.0);
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.inject_mouse_position(12.0, 9.0);
        input.inject_mouse_position(15.0, 9.0);
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, -1.0));

        input.start_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        assert_eq!(input.mouse_position(), Vec2::new(15.0, 9.0));
    }
}
