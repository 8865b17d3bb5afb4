//! Transport seam between the driver and a USB host stack.
//!
//! The driver only talks to these traits. [`mock`] provides an in-memory
//! implementation and, with the `rusb-backend` feature, [`libusb`]
//! provides one on top of `rusb`.

mod bus;
pub mod mock;
#[cfg(feature = "rusb-backend")]
pub mod libusb;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::error::Result;

pub use bus::DeviceBus;

/// `bmRequestType` of a standard host-to-device request.
pub const REQUEST_TYPE_STANDARD_OUT: u8 = 0x00;
/// `bRequest` of SET_CONFIGURATION.
pub const REQUEST_SET_CONFIGURATION: u8 = 0x09;

/// Failure of a single transfer or descriptor request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("transfer timed out")]
    Timeout,
    #[error("device disconnected")]
    Disconnected,
    #[error("endpoint stalled")]
    Stall,
    #[error("usb i/o error: {0}")]
    Io(String),
}

/// Identity of a device as seen on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub class_code: u8,
    pub bus: u8,
    pub address: u8,
}

impl DeviceIdentity {
    /// Same vendor/product pair, regardless of where it is plugged in.
    pub fn same_product(&self, other: &DeviceIdentity) -> bool {
        self.vendor_id == other.vendor_id && self.product_id == other.product_id
    }

    /// Same physical port and address.
    pub fn same_slot(&self, other: &DeviceIdentity) -> bool {
        self.bus == other.bus && self.address == other.address
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (bus {} addr {})",
            self.vendor_id, self.product_id, self.bus, self.address
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub direction: Direction,
    pub max_packet_size: u16,
    /// bInterval, in frames (milliseconds at full speed).
    pub interval: u8,
}

impl EndpointDescriptor {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.interval))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub number: u8,
    pub alternate_setting: u8,
    pub class_code: u8,
    pub sub_class_code: u8,
    pub protocol_code: u8,
    pub endpoints: Vec<EndpointDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    /// bConfigurationValue.
    pub value: u8,
    pub interfaces: Vec<InterfaceDescriptor>,
}

/// A device announced by the host, not yet opened.
pub trait UsbDevice: Send + Sync {
    fn identity(&self) -> DeviceIdentity;

    fn open(&self) -> std::result::Result<Box<dyn RawDevice>, TransferError>;
}

/// An opened device.
pub trait RawDevice: Send {
    fn configuration(&self) -> std::result::Result<ConfigurationDescriptor, TransferError>;

    /// Issues a control transfer without a data stage.
    fn send_control_transfer(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
    ) -> std::result::Result<(), TransferError>;

    fn open_input(
        &self,
        interface: &InterfaceDescriptor,
        endpoint: &EndpointDescriptor,
        timeout: Duration,
    ) -> std::result::Result<Box<dyn InputPipe>, TransferError>;

    fn open_output(
        &self,
        interface: &InterfaceDescriptor,
        endpoint: &EndpointDescriptor,
        timeout: Duration,
    ) -> std::result::Result<Box<dyn OutputPipe>, TransferError>;
}

/// Device-to-host interrupt pipe.
pub trait InputPipe: Send {
    fn max_packet_size(&self) -> usize;

    fn interval(&self) -> Duration;

    /// Reads one packet into `buffer`, returning the byte count.
    fn transfer(&mut self, buffer: &mut [u8]) -> std::result::Result<usize, TransferError>;
}

/// Host-to-device interrupt pipe.
pub trait OutputPipe: Send {
    fn transfer(&mut self, data: &[u8]) -> std::result::Result<usize, TransferError>;
}

/// Opaque handle of a listener registered with a [`DeviceNotifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Receives attach/detach notifications from the host.
pub trait DeviceListener: Send + Sync {
    fn device_connected(&self, device: &dyn UsbDevice);

    fn device_disconnected(&self, device: &dyn UsbDevice);
}

/// Host-wide attach/detach bus.
///
/// Devices already present when a listener subscribes are announced to it
/// as connected.
pub trait DeviceNotifier: Send + Sync {
    fn subscribe(&self, listener: Arc<dyn DeviceListener>) -> Result<SubscriptionId>;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Keeps a listener subscribed until dropped.
pub struct Registration {
    notifier: Arc<dyn DeviceNotifier>,
    id: SubscriptionId,
}

impl Registration {
    pub(crate) fn new(notifier: Arc<dyn DeviceNotifier>, id: SubscriptionId) -> Self {
        Self { notifier, id }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.notifier.unsubscribe(self.id);
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}
