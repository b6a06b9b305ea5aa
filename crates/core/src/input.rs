//! Input event value types forwarded to the render worker
//!
//! Bit values follow the Windows Forms `MouseButtons` and `Keys` enums, which
//! is what the worker interprets.

use std::ops::{BitOr, BitOrAssign};

/// Mouse button bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MouseButtons(u32);

impl MouseButtons {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(0x0010_0000);
    pub const RIGHT: Self = Self(0x0020_0000);
    pub const MIDDLE: Self = Self(0x0040_0000);
    pub const X_BUTTON1: Self = Self(0x0080_0000);
    pub const X_BUTTON2: Self = Self(0x0100_0000);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for MouseButtons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MouseButtons {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Keyboard modifier bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyModifiers(u32);

impl KeyModifiers {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(0x0001_0000);
    pub const CONTROL: Self = Self(0x0002_0000);
    pub const ALT: Self = Self(0x0004_0000);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for KeyModifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for KeyModifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Kind of mouse button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MouseEventType {
    Move = 0,
    Down = 1,
    Up = 2,
}

impl From<MouseEventType> for u8 {
    fn from(kind: MouseEventType) -> u8 {
        kind as u8
    }
}

/// Kind of key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyEventType {
    Down = 0,
    Up = 1,
    /// Character input; carried by `Message::KeyCharEvent` on the wire
    Char = 2,
}

impl From<KeyEventType> for u8 {
    fn from(kind: KeyEventType) -> u8 {
        kind as u8
    }
}
