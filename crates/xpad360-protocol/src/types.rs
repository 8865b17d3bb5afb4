use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Digital buttons reported by the controller.
///
/// The discriminant doubles as the bit index inside a [`crate::ButtonSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Button {
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    Start,
    Back,
    LeftStick,
    RightStick,
    LeftShoulder,
    RightShoulder,
    Guide,
    A,
    B,
    X,
    Y,
}

impl Button {
    pub const ALL: [Button; 15] = [
        Button::DPadUp,
        Button::DPadDown,
        Button::DPadLeft,
        Button::DPadRight,
        Button::Start,
        Button::Back,
        Button::LeftStick,
        Button::RightStick,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::Guide,
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
    ];

    /// Bit of this button inside a [`crate::ButtonSet`].
    #[inline]
    pub const fn bit(self) -> u16 {
        1u16 << (self as u16)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Button::DPadUp => "dpad_up",
            Button::DPadDown => "dpad_down",
            Button::DPadLeft => "dpad_left",
            Button::DPadRight => "dpad_right",
            Button::Start => "start",
            Button::Back => "back",
            Button::LeftStick => "left_stick",
            Button::RightStick => "right_stick",
            Button::LeftShoulder => "left_shoulder",
            Button::RightShoulder => "right_shoulder",
            Button::Guide => "guide",
            Button::A => "a",
            Button::B => "b",
            Button::X => "x",
            Button::Y => "y",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Button {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = compact_name(s);
        Button::ALL
            .into_iter()
            .find(|b| compact_name(b.name()) == key)
            .or(match key.as_str() {
                "lb" => Some(Button::LeftShoulder),
                "rb" => Some(Button::RightShoulder),
                "ls" | "l3" => Some(Button::LeftStick),
                "rs" | "r3" => Some(Button::RightStick),
                "select" => Some(Button::Back),
                "home" | "xbox" => Some(Button::Guide),
                _ => None,
            })
            .ok_or_else(|| ParseError::UnknownButton(s.to_string()))
    }
}

/// Analog triggers, one byte each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Left,
    Right,
}

impl Trigger {
    pub const ALL: [Trigger; 2] = [Trigger::Left, Trigger::Right];
}

/// Thumbstick axes, signed 16-bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::LeftX, Axis::LeftY, Axis::RightX, Axis::RightY];
}

/// Lowercases and strips separators so `dpad-up`, `DPadUp` and `dpad_up`
/// compare equal.
pub(crate) fn compact_name(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_bits_are_distinct() {
        let mut seen = 0u16;
        for b in Button::ALL {
            assert_eq!(seen & b.bit(), 0, "{b} shares a bit");
            seen |= b.bit();
        }
        assert_eq!(seen.count_ones(), 15);
    }

    #[test]
    fn parse_button_accepts_spellings() {
        assert_eq!("dpad-up".parse::<Button>().unwrap(), Button::DPadUp);
        assert_eq!("DPadUp".parse::<Button>().unwrap(), Button::DPadUp);
        assert_eq!("left_shoulder".parse::<Button>().unwrap(), Button::LeftShoulder);
        assert_eq!("LB".parse::<Button>().unwrap(), Button::LeftShoulder);
        assert_eq!("a".parse::<Button>().unwrap(), Button::A);
    }

    #[test]
    fn every_button_parses_from_its_name() {
        for b in Button::ALL {
            assert_eq!(b.to_string().parse::<Button>().unwrap(), b);
        }
    }

    #[test]
    fn parse_button_rejects_unknown() {
        assert!(matches!(
            "turbo".parse::<Button>(),
            Err(ParseError::UnknownButton(name)) if name == "turbo"
        ));
    }
}
