//! Keys the popup reacts to.

/// A key press delivered to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Self::Escape,
            "Enter" => Self::Enter,
            " " | "Spacebar" => Self::Space,
            "ArrowUp" | "Up" => Self::ArrowUp,
            "ArrowDown" | "Down" => Self::ArrowDown,
            "ArrowLeft" | "Left" => Self::ArrowLeft,
            "ArrowRight" | "Right" => Self::ArrowRight,
            _ => Self::Other,
        }
    }

    /// Map a legacy `keyCode`.
    pub fn from_code(code: u32) -> Self {
        match code {
            27 => Self::Escape,
            13 => Self::Enter,
            32 => Self::Space,
            38 => Self::ArrowUp,
            40 => Self::ArrowDown,
            37 => Self::ArrowLeft,
            39 => Self::ArrowRight,
            _ => Self::Other,
        }
    }
}
