//! Pure decoding of raw input reports.
//!
//! Every function tolerates short reports: a field that doesn't fit in the
//! slice decodes as released / zero.

use crate::button_set::ButtonSet;
use crate::types::{Axis, Button, Trigger};

#[inline]
pub fn decode_button(report: &[u8], button: Button) -> bool {
    let field = button.field();
    report
        .get(field.offset)
        .is_some_and(|byte| byte & field.mask != 0)
}

#[inline]
pub fn decode_trigger(report: &[u8], trigger: Trigger) -> u8 {
    report.get(trigger.field().offset).copied().unwrap_or(0)
}

/// Low byte at `offset`, high byte at `offset + 1`.
#[inline]
pub fn decode_axis(report: &[u8], axis: Axis) -> i16 {
    let field = axis.field();
    match report.get(field.offset..field.end()) {
        Some(&[lo, hi]) => i16::from_le_bytes([lo, hi]),
        _ => 0,
    }
}

pub fn decode_buttons(report: &[u8]) -> ButtonSet {
    Button::ALL
        .into_iter()
        .filter(|b| decode_button(report, *b))
        .collect()
}

/// Maps an axis value to `[-1.0, 1.0]`.
#[inline]
pub fn normalize_axis(value: i16) -> f32 {
    if value < 0 {
        f32::from(value) / 32768.0
    } else {
        f32::from(value) / f32::from(i16::MAX)
    }
}

/// Maps a trigger value to `[0.0, 1.0]`.
#[inline]
pub fn normalize_trigger(value: u8) -> f32 {
    f32::from(value) / f32::from(u8::MAX)
}

/// Decoded copy of a whole input report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadState {
    pub buttons: ButtonSet,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_x: i16,
    pub left_y: i16,
    pub right_x: i16,
    pub right_y: i16,
}

impl GamepadState {
    pub fn decode(report: &[u8]) -> Self {
        Self {
            buttons: decode_buttons(report),
            left_trigger: decode_trigger(report, Trigger::Left),
            right_trigger: decode_trigger(report, Trigger::Right),
            left_x: decode_axis(report, Axis::LeftX),
            left_y: decode_axis(report, Axis::LeftY),
            right_x: decode_axis(report, Axis::RightX),
            right_y: decode_axis(report, Axis::RightY),
        }
    }

    #[inline]
    pub fn button(&self, button: Button) -> bool {
        self.buttons.contains(button)
    }

    pub fn trigger(&self, trigger: Trigger) -> u8 {
        match trigger {
            Trigger::Left => self.left_trigger,
            Trigger::Right => self.right_trigger,
        }
    }

    pub fn axis(&self, axis: Axis) -> i16 {
        match axis {
            Axis::LeftX => self.left_x,
            Axis::LeftY => self.left_y,
            Axis::RightX => self.right_x,
            Axis::RightY => self.right_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::REPORT_LEN;

    fn report_with(offset: usize, bytes: &[u8]) -> [u8; REPORT_LEN] {
        let mut r = [0u8; REPORT_LEN];
        r[offset..offset + bytes.len()].copy_from_slice(bytes);
        r
    }

    #[test]
    fn zeroed_report_has_nothing_pressed() {
        let r = [0u8; REPORT_LEN];
        for b in Button::ALL {
            assert!(!decode_button(&r, b));
        }
        assert_eq!(GamepadState::decode(&r), GamepadState::default());
    }

    #[test]
    fn each_button_decodes_only_its_own_bit() {
        for b in Button::ALL {
            let field = b.field();
            let r = report_with(field.offset, &[field.mask]);
            for other in Button::ALL {
                assert_eq!(decode_button(&r, other), other == b, "{b} vs {other}");
            }
        }
    }

    #[test]
    fn all_bits_set_presses_everything() {
        let r = report_with(2, &[0xFF, 0xFF]);
        assert_eq!(decode_buttons(&r).count(), 15);
    }

    #[test]
    fn axis_extremes() {
        let r = report_with(6, &[0xFF, 0x7F]);
        assert_eq!(decode_axis(&r, Axis::LeftX), 32767);
        let r = report_with(6, &[0x00, 0x80]);
        assert_eq!(decode_axis(&r, Axis::LeftX), -32768);
        let r = report_with(12, &[0xFF, 0xFF]);
        assert_eq!(decode_axis(&r, Axis::RightY), -1);
    }

    #[test]
    fn axis_round_trips_signed_values() {
        for value in [i16::MIN, -12345, -1, 0, 1, 4242, i16::MAX] {
            for axis in Axis::ALL {
                let r = report_with(axis.field().offset, &value.to_le_bytes());
                assert_eq!(decode_axis(&r, axis), value);
            }
        }
    }

    #[test]
    fn triggers_read_single_bytes() {
        let r = report_with(4, &[0x12, 0xFE]);
        assert_eq!(decode_trigger(&r, Trigger::Left), 0x12);
        assert_eq!(decode_trigger(&r, Trigger::Right), 0xFE);
    }

    #[test]
    fn short_report_decodes_as_zero() {
        let r = [0x00, 0x14, 0xFF, 0xFF, 0x80];
        assert!(decode_button(&r, Button::A));
        assert_eq!(decode_trigger(&r, Trigger::Left), 0x80);
        assert_eq!(decode_trigger(&r, Trigger::Right), 0);
        assert_eq!(decode_axis(&r, Axis::LeftX), 0);
        assert!(!decode_button(&[], Button::A));
    }

    #[test]
    fn normalization_bounds() {
        assert!((normalize_axis(i16::MAX) - 1.0).abs() < f32::EPSILON);
        assert!((normalize_axis(i16::MIN) + 1.0).abs() < f32::EPSILON);
        assert!(normalize_axis(0).abs() < f32::EPSILON);
        assert!((normalize_trigger(255) - 1.0).abs() < f32::EPSILON);
        assert!(normalize_trigger(0).abs() < f32::EPSILON);
    }
}
