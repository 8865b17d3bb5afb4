use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::usb::DeviceIdentity;

/// Single-slot attachment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connected = 1,
}

/// Atomic cell holding the [`ConnectionState`].
#[derive(Debug)]
pub(crate) struct ConnectionCell(AtomicU8);

impl ConnectionCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected as u8))
    }

    #[inline]
    pub(crate) fn get(&self) -> ConnectionState {
        if self.0.load(Ordering::Acquire) == ConnectionState::Connected as u8 {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    #[inline]
    pub(crate) fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }
}

/// Stable facts about the attached controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus: u8,
    pub address: u8,
    pub interface: u8,
    /// Size of the report buffer, the input endpoint's max packet size.
    pub report_len: usize,
    pub poll_interval: Duration,
}

impl ControllerInfo {
    pub(crate) fn new(
        identity: &DeviceIdentity,
        interface: u8,
        report_len: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            vendor_id: identity.vendor_id,
            product_id: identity.product_id,
            bus: identity.bus,
            address: identity.address,
            interface,
            report_len,
            poll_interval,
        }
    }
}

/// Counters of the polling loop for the current connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Reports copied into the buffer.
    pub reports: u64,
    /// Transfers that failed and zeroed the buffer.
    pub failures: u64,
}

/// Result of handling an attach notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Connected,
    /// Another controller already occupies the slot.
    AlreadyConnected,
    /// Vendor, product or class didn't match the filter.
    NotMatched,
    /// No interface with the gamepad signature and two endpoints.
    NoUsableInterface,
}
