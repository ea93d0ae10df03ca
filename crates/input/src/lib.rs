//! Input snapshot for keyboard, mouse and analog axes.
//!
//! The host feeds [`InputEvent`]s once per frame; scripts and managers only read.
//! Keys are addressed by case-insensitive name (`"space"`, `"a"`, `"left"`).

use glam::Vec2;
use std::collections::{HashMap, HashSet};

/// Mouse buttons the runtime tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Map 1 = left, 2 = middle, 3 = right.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            other => {
                log::debug!("No mouse button with index {}", other);
                None
            }
        }
    }
}

/// Whether a key or button went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Pressed,
    Released,
}

/// Raw input delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key { name: String, state: ElementState },
    MouseButton { button: MouseButton, state: ElementState },
    CursorMoved { position: Vec2 },
    MouseMotion { delta: Vec2 },
    Scroll { delta: f32 },
    /// Analog axis value in [-1, 1], e.g. from a gamepad stick.
    Axis { name: String, value: f32 },
}

fn normalize_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Input state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    keys_held: HashSet<String>,
    keys_pressed: HashSet<String>,
    keys_released: HashSet<String>,

    mouse_held: HashSet<MouseButton>,
    mouse_pressed: HashSet<MouseButton>,
    mouse_released: HashSet<MouseButton>,

    mouse_position: Vec2,
    mouse_delta: Vec2,
    accumulated_delta: Vec2,
    scroll: f32,

    /// Analog axes reported by the host; they override key-derived axes.
    analog_axes: HashMap<String, f32>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_pressed.clear();
        self.mouse_released.clear();
        self.mouse_delta = self.accumulated_delta;
        self.accumulated_delta = Vec2::ZERO;
        self.scroll = 0.0;
    }

    /// Apply one host event.
    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key { name, state } => self.process_keyboard(&name, state),
            InputEvent::MouseButton { button, state } => self.process_mouse_button(button, state),
            InputEvent::CursorMoved { position } => self.mouse_position = position,
            InputEvent::MouseMotion { delta } => self.accumulated_delta += delta,
            InputEvent::Scroll { delta } => self.scroll += delta,
            InputEvent::Axis { name, value } => {
                self.analog_axes.insert(normalize_key(&name), value.clamp(-1.0, 1.0));
            }
        }
    }

    /// Start a frame and apply the host's events for it.
    pub fn feed(&mut self, events: impl IntoIterator<Item = InputEvent>) {
        self.begin_frame();
        for event in events {
            self.apply(event);
        }
        // motion arriving this frame is visible this frame
        self.mouse_delta += self.accumulated_delta;
        self.accumulated_delta = Vec2::ZERO;
    }

    pub fn process_keyboard(&mut self, key: &str, state: ElementState) {
        let key = normalize_key(key);
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key.clone());
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                if self.keys_held.remove(&key) {
                    self.keys_released.insert(key);
                }
            }
        }
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.mouse_held.contains(&button) {
                    self.mouse_pressed.insert(button);
                }
                self.mouse_held.insert(button);
            }
            ElementState::Released => {
                if self.mouse_held.remove(&button) {
                    self.mouse_released.insert(button);
                }
            }
        }
    }

    /// Is the key currently held.
    pub fn is_down(&self, key: &str) -> bool {
        self.keys_held.contains(&normalize_key(key))
    }

    /// Did the key go down during this frame.
    pub fn is_pressed_this_frame(&self, key: &str) -> bool {
        self.keys_pressed.contains(&normalize_key(key))
    }

    /// Did the key go up during this frame.
    pub fn is_released_this_frame(&self, key: &str) -> bool {
        self.keys_released.contains(&normalize_key(key))
    }

    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    pub fn is_mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_released.contains(&button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll wheel delta this frame; positive is up.
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Value of a named axis in [-1, 1].
    ///
    /// `horizontal` and `vertical` fall back to WASD/arrow keys when no analog value
    /// was reported; other names come only from analog input.
    pub fn axis(&self, name: &str) -> f32 {
        let name = normalize_key(name);
        if let Some(value) = self.analog_axes.get(&name) {
            return *value;
        }
        let pair = |neg: [&str; 2], pos: [&str; 2]| {
            let held = |keys: [&str; 2]| keys.iter().any(|k| self.keys_held.contains(*k));
            (held(pos) as i32 - held(neg) as i32) as f32
        };
        match name.as_str() {
            "horizontal" => pair(["a", "left"], ["d", "right"]),
            "vertical" => pair(["s", "down"], ["w", "up"]),
            _ => {
                log::trace!("Axis '{}' has no analog value yet", name);
                0.0
            }
        }
    }

    /// Movement input as a normalized vector (WASD / arrows / left stick).
    pub fn movement(&self) -> Vec2 {
        Vec2::new(self.axis("horizontal"), self.axis("vertical")).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, state: ElementState) -> InputEvent {
        InputEvent::Key {
            name: name.to_string(),
            state,
        }
    }

    #[test]
    fn pressed_is_edge_triggered() {
        let mut input = InputState::new();
        input.feed([key("Space", ElementState::Pressed)]);
        assert!(input.is_down("space"));
        assert!(input.is_pressed_this_frame("SPACE"));

        input.feed([]);
        assert!(input.is_down("space"));
        assert!(!input.is_pressed_this_frame("space"));

        input.feed([key("space", ElementState::Released)]);
        assert!(!input.is_down("space"));
        assert!(input.is_released_this_frame("space"));
    }

    #[test]
    fn repeat_press_does_not_retrigger() {
        let mut input = InputState::new();
        input.feed([key("w", ElementState::Pressed)]);
        input.feed([key("w", ElementState::Pressed)]);
        assert!(!input.is_pressed_this_frame("w"));
    }

    #[test]
    fn axes_from_keys_and_analog() {
        let mut input = InputState::new();
        input.feed([key("d", ElementState::Pressed), key("w", ElementState::Pressed)]);
        assert_eq!(input.axis("horizontal"), 1.0);
        assert_eq!(input.axis("vertical"), 1.0);
        assert!((input.movement().length() - 1.0).abs() < 1e-6);

        input.feed([InputEvent::Axis {
            name: "Horizontal".to_string(),
            value: -3.0,
        }]);
        assert_eq!(input.axis("horizontal"), -1.0);
        assert_eq!(input.axis("throttle"), 0.0);
    }

    #[test]
    fn mouse_motion_and_buttons() {
        let mut input = InputState::new();
        input.feed([
            InputEvent::MouseMotion { delta: Vec2::new(3.0, 1.0) },
            InputEvent::MouseMotion { delta: Vec2::new(1.0, 1.0) },
            InputEvent::MouseButton {
                button: MouseButton::Left,
                state: ElementState::Pressed,
            },
        ]);
        assert_eq!(input.mouse_delta(), Vec2::new(4.0, 2.0));
        assert!(input.is_mouse_pressed(MouseButton::Left));

        input.feed([]);
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        assert!(input.is_mouse_held(MouseButton::Left));
    }

    #[test]
    fn mouse_indices_map_to_buttons() {
        assert_eq!(MouseButton::from_index(1), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_index(3), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_index(0), None);
        assert_eq!(MouseButton::from_index(4), None);
    }
}
