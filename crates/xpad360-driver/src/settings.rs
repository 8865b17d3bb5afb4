use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::usb::{DeviceIdentity, InterfaceDescriptor};

/// Which devices and interfaces the driver claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceFilter {
    /// `bDeviceClass`. Class 0 (defined per interface) is accepted too.
    pub device_class: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            device_class: 0xFF,
            vendor_id: 0x045E,
            product_id: 0x028E,
            interface_class: 0xFF,
            interface_subclass: 0x5D,
            interface_protocol: 0x01,
        }
    }
}

impl DeviceFilter {
    pub fn matches_device(&self, identity: &DeviceIdentity) -> bool {
        identity.vendor_id == self.vendor_id
            && identity.product_id == self.product_id
            && (identity.class_code == self.device_class || identity.class_code == 0)
    }

    pub fn matches_interface(&self, interface: &InterfaceDescriptor) -> bool {
        interface.class_code == self.interface_class
            && interface.sub_class_code == self.interface_subclass
            && interface.protocol_code == self.interface_protocol
    }
}

/// Tunables of the controller driver. Durations are written in
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverSettings {
    pub filter: DeviceFilter,
    /// Upper bound for a single input transfer. Also bounds how long
    /// shutdown waits for the poller.
    #[serde(with = "millis")]
    pub read_timeout: Duration,
    #[serde(with = "millis")]
    pub write_timeout: Duration,
    /// Floor for the polling period, on top of the endpoint's bInterval.
    #[serde(with = "millis")]
    pub min_poll_interval: Duration,
    /// Ask the OS for real-time scheduling of the poller thread.
    pub high_priority: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            filter: DeviceFilter::default(),
            read_timeout: Duration::from_millis(100),
            write_timeout: Duration::from_millis(100),
            min_poll_interval: Duration::from_millis(1),
            high_priority: true,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
