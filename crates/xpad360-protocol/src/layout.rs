//! Byte/bit positions of every control inside an input report.
//!
//! The table is fixed by the controller firmware. Decoding never consults
//! the report's own length/type header; it always reads these offsets.

use crate::types::{Axis, Button, Trigger};

/// Length of an input report as sent by the controller.
pub const REPORT_LEN: usize = 20;

/// Location of a single button bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub offset: usize,
    pub mask: u8,
}

/// Location of a multi-byte little-endian value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteField {
    pub offset: usize,
    pub width: usize,
}

impl BitField {
    const fn new(offset: usize, mask: u8) -> Self {
        Self { offset, mask }
    }
}

impl ByteField {
    const fn new(offset: usize, width: usize) -> Self {
        Self { offset, width }
    }

    /// One past the last byte of the field.
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

const BUTTONS_LOW: usize = 2;
const BUTTONS_HIGH: usize = 3;

/// Indexed by `Button as usize`.
const BUTTON_TABLE: [BitField; Button::ALL.len()] = [
    BitField::new(BUTTONS_LOW, 0x01),  // DPadUp
    BitField::new(BUTTONS_LOW, 0x02),  // DPadDown
    BitField::new(BUTTONS_LOW, 0x04),  // DPadLeft
    BitField::new(BUTTONS_LOW, 0x08),  // DPadRight
    BitField::new(BUTTONS_LOW, 0x10),  // Start
    BitField::new(BUTTONS_LOW, 0x20),  // Back
    BitField::new(BUTTONS_LOW, 0x40),  // LeftStick
    BitField::new(BUTTONS_LOW, 0x80),  // RightStick
    BitField::new(BUTTONS_HIGH, 0x01), // LeftShoulder
    BitField::new(BUTTONS_HIGH, 0x02), // RightShoulder
    BitField::new(BUTTONS_HIGH, 0x04), // Guide
    BitField::new(BUTTONS_HIGH, 0x10), // A
    BitField::new(BUTTONS_HIGH, 0x20), // B
    BitField::new(BUTTONS_HIGH, 0x40), // X
    BitField::new(BUTTONS_HIGH, 0x80), // Y
];

impl Button {
    #[inline]
    pub const fn field(self) -> BitField {
        BUTTON_TABLE[self as usize]
    }
}

impl Trigger {
    #[inline]
    pub const fn field(self) -> ByteField {
        match self {
            Trigger::Left => ByteField::new(4, 1),
            Trigger::Right => ByteField::new(5, 1),
        }
    }
}

impl Axis {
    #[inline]
    pub const fn field(self) -> ByteField {
        match self {
            Axis::LeftX => ByteField::new(6, 2),
            Axis::LeftY => ByteField::new(8, 2),
            Axis::RightX => ByteField::new(10, 2),
            Axis::RightY => ByteField::new(12, 2),
        }
    }
}
