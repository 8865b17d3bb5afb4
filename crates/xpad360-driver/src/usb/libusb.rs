//! libusb transport built on `rusb`.
//!
//! [`RusbNotifier`] turns libusb hotplug callbacks (or, where hotplug is
//! unavailable, a periodic bus scan) into [`DeviceNotifier`] events. Listeners
//! are called from a dispatcher thread, never from inside libusb, so they are
//! free to open devices and issue blocking transfers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ahash::AHashSet;
use crossbeam_channel::{unbounded, Receiver, Sender};
use rusb::{Context, Device, DeviceHandle, Hotplug, HotplugBuilder, UsbContext};

use super::{
    ConfigurationDescriptor, DeviceBus, DeviceIdentity, DeviceListener, DeviceNotifier,
    Direction, EndpointDescriptor, InputPipe, InterfaceDescriptor, OutputPipe, RawDevice,
    SubscriptionId, TransferError, UsbDevice, REQUEST_SET_CONFIGURATION,
    REQUEST_TYPE_STANDARD_OUT,
};
use crate::error::{Error, Result};

const EVENT_TIMEOUT: Duration = Duration::from_millis(100);
const SCAN_INTERVAL: Duration = Duration::from_secs(1);
const CONTROL_TIMEOUT: Duration = Duration::from_secs(1);

impl From<rusb::Error> for TransferError {
    fn from(error: rusb::Error) -> Self {
        match error {
            rusb::Error::Timeout => TransferError::Timeout,
            rusb::Error::NoDevice => TransferError::Disconnected,
            rusb::Error::Pipe => TransferError::Stall,
            other => TransferError::Io(other.to_string()),
        }
    }
}

/// A device enumerated by libusb.
pub struct RusbDevice {
    device: Device<Context>,
    identity: DeviceIdentity,
}

impl RusbDevice {
    pub fn new(device: Device<Context>) -> std::result::Result<Self, TransferError> {
        let descriptor = device.device_descriptor()?;
        let identity = DeviceIdentity {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            class_code: descriptor.class_code(),
            bus: device.bus_number(),
            address: device.address(),
        };
        Ok(Self { device, identity })
    }
}

impl UsbDevice for RusbDevice {
    fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    fn open(&self) -> std::result::Result<Box<dyn RawDevice>, TransferError> {
        let mut handle = self.device.open()?;
        // Not supported on every platform; claiming will report the real problem.
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            log::debug!("auto-detach of kernel driver unavailable: {e}");
        }
        Ok(Box::new(RusbRawDevice {
            device: self.device.clone(),
            handle: Arc::new(handle),
        }))
    }
}

/// Claimed interfaces are released by `DeviceHandle` once the raw device
/// and every pipe sharing the handle are gone.
struct RusbRawDevice {
    device: Device<Context>,
    handle: Arc<DeviceHandle<Context>>,
}

impl RawDevice for RusbRawDevice {
    fn configuration(&self) -> std::result::Result<ConfigurationDescriptor, TransferError> {
        let config = self.device.config_descriptor(0)?;
        let mut interfaces = Vec::new();
        for interface in config.interfaces() {
            for descriptor in interface.descriptors() {
                let endpoints = descriptor
                    .endpoint_descriptors()
                    .map(|ep| EndpointDescriptor {
                        address: ep.address(),
                        direction: match ep.direction() {
                            rusb::Direction::In => Direction::In,
                            rusb::Direction::Out => Direction::Out,
                        },
                        max_packet_size: ep.max_packet_size(),
                        interval: ep.interval(),
                    })
                    .collect();
                interfaces.push(InterfaceDescriptor {
                    number: descriptor.interface_number(),
                    alternate_setting: descriptor.setting_number(),
                    class_code: descriptor.class_code(),
                    sub_class_code: descriptor.sub_class_code(),
                    protocol_code: descriptor.protocol_code(),
                    endpoints,
                });
            }
        }
        Ok(ConfigurationDescriptor {
            value: config.number(),
            interfaces,
        })
    }

    fn send_control_transfer(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
    ) -> std::result::Result<(), TransferError> {
        // libusb must see configuration changes to keep its own state right.
        if let Some(config) = set_configuration_value(request_type, request, value)? {
            // Reselecting the active configuration fails while a kernel
            // driver still holds an interface.
            if self.handle.active_configuration()? != config {
                self.handle.set_active_configuration(config)?;
            }
            return Ok(());
        }
        self.handle
            .write_control(request_type, request, value, index, &[], CONTROL_TIMEOUT)?;
        Ok(())
    }

    fn open_input(
        &self,
        interface: &InterfaceDescriptor,
        endpoint: &EndpointDescriptor,
        timeout: Duration,
    ) -> std::result::Result<Box<dyn InputPipe>, TransferError> {
        self.handle.claim_interface(interface.number)?;
        Ok(Box::new(RusbInputPipe {
            handle: Arc::clone(&self.handle),
            endpoint: endpoint.address,
            max_packet_size: usize::from(endpoint.max_packet_size),
            interval: endpoint.poll_interval(),
            timeout,
        }))
    }

    fn open_output(
        &self,
        interface: &InterfaceDescriptor,
        endpoint: &EndpointDescriptor,
        timeout: Duration,
    ) -> std::result::Result<Box<dyn OutputPipe>, TransferError> {
        self.handle.claim_interface(interface.number)?;
        Ok(Box::new(RusbOutputPipe {
            handle: Arc::clone(&self.handle),
            endpoint: endpoint.address,
            timeout,
        }))
    }
}

/// The configuration value of a standard SET_CONFIGURATION request, if
/// that is what the request is.
fn set_configuration_value(
    request_type: u8,
    request: u8,
    value: u16,
) -> std::result::Result<Option<u8>, TransferError> {
    if request_type != REQUEST_TYPE_STANDARD_OUT || request != REQUEST_SET_CONFIGURATION {
        return Ok(None);
    }
    u8::try_from(value)
        .map(Some)
        .map_err(|_| TransferError::Io(format!("configuration value {value} out of range")))
}

struct RusbInputPipe {
    handle: Arc<DeviceHandle<Context>>,
    endpoint: u8,
    max_packet_size: usize,
    interval: Duration,
    timeout: Duration,
}

impl InputPipe for RusbInputPipe {
    fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn transfer(&mut self, buffer: &mut [u8]) -> std::result::Result<usize, TransferError> {
        Ok(self.handle.read_interrupt(self.endpoint, buffer, self.timeout)?)
    }
}

struct RusbOutputPipe {
    handle: Arc<DeviceHandle<Context>>,
    endpoint: u8,
    timeout: Duration,
}

impl OutputPipe for RusbOutputPipe {
    fn transfer(&mut self, data: &[u8]) -> std::result::Result<usize, TransferError> {
        Ok(self.handle.write_interrupt(self.endpoint, data, self.timeout)?)
    }
}

enum BusEvent {
    Arrived(Device<Context>),
    Left { bus: u8, address: u8 },
}

/// Forwards libusb hotplug callbacks to the dispatcher thread.
struct HotplugForwarder {
    tx: Sender<BusEvent>,
}

impl Hotplug<Context> for HotplugForwarder {
    fn device_arrived(&mut self, device: Device<Context>) {
        let _ = self.tx.send(BusEvent::Arrived(device));
    }

    fn device_left(&mut self, device: Device<Context>) {
        let _ = self.tx.send(BusEvent::Left {
            bus: device.bus_number(),
            address: device.address(),
        });
    }
}

/// Host attach/detach bus backed by libusb.
pub struct RusbNotifier {
    bus: Arc<DeviceBus>,
    registration: Mutex<Option<rusb::Registration<Context>>>,
    stop: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl RusbNotifier {
    /// Starts watching the bus. Devices already plugged in are reported as
    /// arrivals.
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(|e| Error::Backend(format!("libusb init: {e}")))?;
        let (tx, rx) = unbounded::<BusEvent>();
        let stop = Arc::new(AtomicBool::new(false));
        let bus = Arc::new(DeviceBus::new());

        let mut threads = Vec::new();
        let registration = if rusb::has_hotplug() {
            let callback: Box<dyn Hotplug<Context>> = Box::new(HotplugForwarder { tx });
            let registration = HotplugBuilder::new()
                .enumerate(true)
                .register(&context, callback)
                .map_err(|e| Error::Backend(format!("hotplug registration: {e}")))?;
            let context = context.clone();
            let stop = Arc::clone(&stop);
            threads.push(spawn("xpad360-usb-events", move || {
                handle_events(&context, &stop);
            })?);
            Some(registration)
        } else {
            log::info!("libusb hotplug unavailable, scanning the bus every {SCAN_INTERVAL:?}");
            let context = context.clone();
            let stop = Arc::clone(&stop);
            threads.push(spawn("xpad360-usb-scan", move || {
                scan_bus(&context, &tx, &stop);
            })?);
            None
        };
        {
            let bus = Arc::clone(&bus);
            threads.push(spawn("xpad360-usb-dispatch", move || dispatch(&rx, &bus))?);
        }

        Ok(Self {
            bus,
            registration: Mutex::new(registration),
            stop,
            threads: Mutex::new(threads),
        })
    }
}

fn spawn<F>(name: &str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|e| Error::Backend(format!("failed to spawn {name}: {e}")))
}

fn handle_events(context: &Context, stop: &AtomicBool) {
    while !stop.load(Ordering::Acquire) {
        if let Err(e) = context.handle_events(Some(EVENT_TIMEOUT)) {
            log::warn!("libusb event handling failed: {e}");
            thread::sleep(EVENT_TIMEOUT);
        }
    }
}

/// Polling fallback for platforms without hotplug support. Owns the only
/// sender, so the dispatcher exits once this returns.
fn scan_bus(context: &Context, tx: &Sender<BusEvent>, stop: &AtomicBool) {
    let mut known: AHashSet<(u8, u8)> = AHashSet::new();
    while !stop.load(Ordering::Acquire) {
        match context.devices() {
            Ok(list) => {
                let mut seen = AHashSet::new();
                for device in list.iter() {
                    let slot = (device.bus_number(), device.address());
                    seen.insert(slot);
                    if !known.contains(&slot) && tx.send(BusEvent::Arrived(device)).is_err() {
                        return;
                    }
                }
                for &(bus, address) in known.difference(&seen) {
                    if tx.send(BusEvent::Left { bus, address }).is_err() {
                        return;
                    }
                }
                known = seen;
            }
            Err(e) => log::warn!("usb bus scan failed: {e}"),
        }
        thread::sleep(SCAN_INTERVAL);
    }
}

fn dispatch(rx: &Receiver<BusEvent>, bus: &DeviceBus) {
    while let Ok(event) = rx.recv() {
        match event {
            BusEvent::Arrived(device) => match RusbDevice::new(device) {
                Ok(device) => bus.arrived(Arc::new(device)),
                Err(e) => log::debug!("skipping device without readable descriptor: {e}"),
            },
            BusEvent::Left { bus: number, address } => {
                let present = bus
                    .present()
                    .into_iter()
                    .map(|d| d.identity())
                    .find(|id| id.bus == number && id.address == address);
                if let Some(identity) = present {
                    bus.left(&identity);
                }
            }
        }
    }
}

impl DeviceNotifier for RusbNotifier {
    fn subscribe(&self, listener: Arc<dyn DeviceListener>) -> Result<SubscriptionId> {
        Ok(self.bus.subscribe(listener))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }
}

impl Drop for RusbNotifier {
    fn drop(&mut self) {
        // Deregistering drops the forwarder and with it the dispatcher's sender.
        self.registration
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.stop.store(true, Ordering::Release);
        let threads = self.threads.get_mut().unwrap_or_else(PoisonError::into_inner);
        for handle in threads.drain(..) {
            if handle.join().is_err() {
                log::error!("usb notifier thread panicked");
            }
        }
    }
}
