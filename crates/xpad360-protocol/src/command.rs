//! Outbound messages for the output endpoint.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::types::compact_name;

pub const RUMBLE_LEN: usize = 8;
pub const LED_LEN: usize = 3;

const RUMBLE_OPCODE: u8 = 0x00;
const LED_OPCODE: u8 = 0x01;

/// Builds the rumble message for the two motor power levels.
pub const fn rumble_command(left: u8, right: u8) -> [u8; RUMBLE_LEN] {
    [RUMBLE_OPCODE, RUMBLE_LEN as u8, 0x00, left, right, 0x00, 0x00, 0x00]
}

pub const fn led_command(state: LedState) -> [u8; LED_LEN] {
    [LED_OPCODE, LED_LEN as u8, state.code()]
}

/// Patterns of the ring of four lights around the guide button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum LedState {
    #[default]
    Off = 0x00,
    AllBlinking = 0x01,
    TopLeftBlinkOn = 0x02,
    TopRightBlinkOn = 0x03,
    BottomLeftBlinkOn = 0x04,
    BottomRightBlinkOn = 0x05,
    TopLeftOn = 0x06,
    TopRightOn = 0x07,
    BottomLeftOnly = 0x08,
    BottomRightOnly = 0x09,
    Rotate = 0x0A,
    Blink = 0x0B,
    BlinkSlower = 0x0C,
    RotateWithTwoLights = 0x0D,
    BlinkAlt = 0x0E,
    BlinkOnce = 0x0F,
}

impl LedState {
    pub const ALL: [LedState; 16] = [
        LedState::Off,
        LedState::AllBlinking,
        LedState::TopLeftBlinkOn,
        LedState::TopRightBlinkOn,
        LedState::BottomLeftBlinkOn,
        LedState::BottomRightBlinkOn,
        LedState::TopLeftOn,
        LedState::TopRightOn,
        LedState::BottomLeftOnly,
        LedState::BottomRightOnly,
        LedState::Rotate,
        LedState::Blink,
        LedState::BlinkSlower,
        LedState::RotateWithTwoLights,
        LedState::BlinkAlt,
        LedState::BlinkOnce,
    ];

    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            LedState::Off => "off",
            LedState::AllBlinking => "all_blinking",
            LedState::TopLeftBlinkOn => "top_left_blink_on",
            LedState::TopRightBlinkOn => "top_right_blink_on",
            LedState::BottomLeftBlinkOn => "bottom_left_blink_on",
            LedState::BottomRightBlinkOn => "bottom_right_blink_on",
            LedState::TopLeftOn => "top_left_on",
            LedState::TopRightOn => "top_right_on",
            LedState::BottomLeftOnly => "bottom_left_only",
            LedState::BottomRightOnly => "bottom_right_only",
            LedState::Rotate => "rotate",
            LedState::Blink => "blink",
            LedState::BlinkSlower => "blink_slower",
            LedState::RotateWithTwoLights => "rotate_with_two_lights",
            LedState::BlinkAlt => "blink_alt",
            LedState::BlinkOnce => "blink_once",
        }
    }
}

impl TryFrom<u8> for LedState {
    type Error = ParseError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        LedState::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(ParseError::InvalidLedCode(code))
    }
}

impl FromStr for LedState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = compact_name(s);
        LedState::ALL
            .into_iter()
            .find(|state| compact_name(state.name()) == key)
            .ok_or_else(|| ParseError::UnknownLedState(s.to_string()))
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rumble_layout() {
        assert_eq!(
            rumble_command(128, 200),
            [0x00, 0x08, 0x00, 0x80, 0xC8, 0x00, 0x00, 0x00]
        );
        assert_eq!(rumble_command(0, 0), [0x00, 0x08, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn led_layout() {
        assert_eq!(led_command(LedState::Rotate), [0x01, 0x03, 0x0A]);
        assert_eq!(led_command(LedState::Off), [0x01, 0x03, 0x00]);
        assert_eq!(led_command(LedState::BlinkOnce), [0x01, 0x03, 0x0F]);
    }

    #[test]
    fn all_table_matches_codes() {
        for (i, state) in LedState::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(state.code()), i);
            assert_eq!(LedState::try_from(state.code()).unwrap(), state);
        }
        assert!(matches!(
            LedState::try_from(0x10),
            Err(ParseError::InvalidLedCode(0x10))
        ));
    }

    #[test]
    fn every_led_state_parses_from_its_name() {
        for state in LedState::ALL {
            assert_eq!(state.to_string().parse::<LedState>().unwrap(), state);
        }
    }

    #[test]
    fn parse_led_names() {
        assert_eq!("rotate".parse::<LedState>().unwrap(), LedState::Rotate);
        assert_eq!(
            "top-left-on".parse::<LedState>().unwrap(),
            LedState::TopLeftOn
        );
        assert_eq!(
            "RotateWithTwoLights".parse::<LedState>().unwrap(),
            LedState::RotateWithTwoLights
        );
        assert!("disco".parse::<LedState>().is_err());
    }
}
