//! Wire format of the wired Xbox 360 controller: input report layout,
//! decoding, and the rumble/LED output messages.

mod button_set;
mod command;
mod decode;
mod error;
mod layout;
mod types;

pub use button_set::ButtonSet;
pub use command::{led_command, rumble_command, LedState, LED_LEN, RUMBLE_LEN};
pub use decode::{
    decode_axis, decode_button, decode_buttons, decode_trigger, normalize_axis,
    normalize_trigger, GamepadState,
};
pub use error::ParseError;
pub use layout::{BitField, ByteField, REPORT_LEN};
pub use types::{Axis, Button, Trigger};
