//! Userspace driver for the wired Xbox 360 controller.
//!
//! [`Xbox360Controller`] claims the vendor-specific gamepad interface of the
//! first matching device, polls its input reports on a background thread and
//! sends rumble and LED commands. The USB host stack is reached through the
//! traits in [`usb`].

mod command;
mod controller;
mod error;
mod events;
mod poller;
mod priority;
mod report;
mod settings;
mod types;
pub mod usb;

pub use crate::controller::Xbox360Controller;
pub use crate::error::{Error, Result};
pub use crate::events::{ControllerEvent, EventReceiver};
pub use crate::settings::{DeviceFilter, DriverSettings};
pub use crate::types::{AttachOutcome, ConnectionState, ControllerInfo, PollStats};

pub use xpad360_protocol as protocol;
pub use xpad360_protocol::{Axis, Button, ButtonSet, GamepadState, LedState, Trigger};
