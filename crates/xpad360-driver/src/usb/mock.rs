//! In-memory transport for tests.
//!
//! A [`MockDevice`] serves scripted input reports, records everything
//! written to its output pipe and can be told to fail at each attach step.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use super::{
    ConfigurationDescriptor, DeviceBus, DeviceIdentity, DeviceListener, DeviceNotifier,
    Direction, EndpointDescriptor, InputPipe, InterfaceDescriptor, OutputPipe, RawDevice,
    SubscriptionId, TransferError, UsbDevice,
};
use crate::error::Result;

pub const MICROSOFT_VENDOR_ID: u16 = 0x045E;
pub const XBOX360_PRODUCT_ID: u16 = 0x028E;

/// One scripted result of an input transfer.
#[derive(Debug, Clone)]
pub enum MockRead {
    Report(Vec<u8>),
    Fail(TransferError),
}

/// A control transfer as received by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

#[derive(Default)]
struct Shared {
    reads: Mutex<VecDeque<MockRead>>,
    reads_changed: Condvar,
    input_transfers: AtomicUsize,
    writes: Mutex<Vec<Vec<u8>>>,
    control: Mutex<Vec<ControlRequest>>,
    open_count: AtomicUsize,
    input_open: AtomicBool,
    output_open: AtomicBool,
    fail_open: AtomicBool,
    fail_configuration: AtomicBool,
    fail_control: AtomicBool,
    fail_writes: AtomicBool,
}

/// Scriptable controller. Clones share the same state.
#[derive(Clone)]
pub struct MockDevice {
    identity: DeviceIdentity,
    configuration: ConfigurationDescriptor,
    shared: Arc<Shared>,
}

impl MockDevice {
    /// A wired controller with the interface layout of the real hardware:
    /// the gamepad interface first, then the headset, plug-in module and
    /// security interfaces.
    pub fn xbox360() -> Self {
        let gamepad = InterfaceDescriptor {
            number: 0,
            alternate_setting: 0,
            class_code: 0xFF,
            sub_class_code: 0x5D,
            protocol_code: 0x01,
            endpoints: vec![
                endpoint(0x81, Direction::In, 32, 4),
                endpoint(0x01, Direction::Out, 32, 8),
            ],
        };
        let headset = InterfaceDescriptor {
            number: 1,
            alternate_setting: 0,
            class_code: 0xFF,
            sub_class_code: 0x5D,
            protocol_code: 0x03,
            endpoints: vec![
                endpoint(0x82, Direction::In, 32, 2),
                endpoint(0x02, Direction::Out, 32, 4),
                endpoint(0x83, Direction::In, 32, 64),
                endpoint(0x03, Direction::Out, 32, 16),
            ],
        };
        let plugin = InterfaceDescriptor {
            number: 2,
            alternate_setting: 0,
            class_code: 0xFF,
            sub_class_code: 0x5D,
            protocol_code: 0x02,
            endpoints: vec![endpoint(0x84, Direction::In, 32, 16)],
        };
        let security = InterfaceDescriptor {
            number: 3,
            alternate_setting: 0,
            class_code: 0xFF,
            sub_class_code: 0xFD,
            protocol_code: 0x13,
            endpoints: Vec::new(),
        };
        Self::new(
            DeviceIdentity {
                vendor_id: MICROSOFT_VENDOR_ID,
                product_id: XBOX360_PRODUCT_ID,
                class_code: 0xFF,
                bus: 1,
                address: 4,
            },
            ConfigurationDescriptor {
                value: 1,
                interfaces: vec![gamepad, headset, plugin, security],
            },
        )
    }

    pub fn new(identity: DeviceIdentity, configuration: ConfigurationDescriptor) -> Self {
        Self {
            identity,
            configuration,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Same descriptors with a different bus address.
    pub fn with_address(mut self, bus: u8, address: u8) -> Self {
        self.identity.bus = bus;
        self.identity.address = address;
        self
    }

    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn configuration(&self) -> &ConfigurationDescriptor {
        &self.configuration
    }

    pub fn push_report(&self, report: &[u8]) {
        self.push(MockRead::Report(report.to_vec()));
    }

    pub fn push_failure(&self, error: TransferError) {
        self.push(MockRead::Fail(error));
    }

    pub fn push(&self, read: MockRead) {
        let mut reads = self.shared.reads.lock().unwrap_or_else(PoisonError::into_inner);
        reads.push_back(read);
        self.shared.reads_changed.notify_all();
    }

    /// Scripted reads not yet consumed by the input pipe.
    pub fn pending_reads(&self) -> usize {
        self.shared
            .reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of input transfers attempted so far, including timeouts.
    pub fn input_transfers(&self) -> usize {
        self.shared.input_transfers.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn control_requests(&self) -> Vec<ControlRequest> {
        self.shared
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times the device has been opened.
    pub fn open_count(&self) -> usize {
        self.shared.open_count.load(Ordering::SeqCst)
    }

    pub fn is_input_open(&self) -> bool {
        self.shared.input_open.load(Ordering::SeqCst)
    }

    pub fn is_output_open(&self) -> bool {
        self.shared.output_open.load(Ordering::SeqCst)
    }

    pub fn fail_open(&self, fail: bool) {
        self.shared.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn fail_configuration(&self, fail: bool) {
        self.shared.fail_configuration.store(fail, Ordering::SeqCst);
    }

    pub fn fail_control(&self, fail: bool) {
        self.shared.fail_control.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }
}

fn endpoint(address: u8, direction: Direction, max_packet_size: u16, interval: u8) -> EndpointDescriptor {
    EndpointDescriptor {
        address,
        direction,
        max_packet_size,
        interval,
    }
}

impl UsbDevice for MockDevice {
    fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    fn open(&self) -> std::result::Result<Box<dyn RawDevice>, TransferError> {
        if self.shared.fail_open.load(Ordering::SeqCst) {
            return Err(TransferError::Io("access denied".into()));
        }
        self.shared.open_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockRawDevice {
            configuration: self.configuration.clone(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MockRawDevice {
    configuration: ConfigurationDescriptor,
    shared: Arc<Shared>,
}

impl RawDevice for MockRawDevice {
    fn configuration(&self) -> std::result::Result<ConfigurationDescriptor, TransferError> {
        if self.shared.fail_configuration.load(Ordering::SeqCst) {
            return Err(TransferError::Io("descriptor read failed".into()));
        }
        Ok(self.configuration.clone())
    }

    fn send_control_transfer(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
    ) -> std::result::Result<(), TransferError> {
        if self.shared.fail_control.load(Ordering::SeqCst) {
            return Err(TransferError::Stall);
        }
        self.shared
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ControlRequest {
                request_type,
                request,
                value,
                index,
            });
        Ok(())
    }

    fn open_input(
        &self,
        _interface: &InterfaceDescriptor,
        endpoint: &EndpointDescriptor,
        timeout: Duration,
    ) -> std::result::Result<Box<dyn InputPipe>, TransferError> {
        self.shared.input_open.store(true, Ordering::SeqCst);
        Ok(Box::new(MockInputPipe {
            max_packet_size: usize::from(endpoint.max_packet_size),
            interval: endpoint.poll_interval(),
            timeout,
            shared: Arc::clone(&self.shared),
        }))
    }

    fn open_output(
        &self,
        _interface: &InterfaceDescriptor,
        _endpoint: &EndpointDescriptor,
        _timeout: Duration,
    ) -> std::result::Result<Box<dyn OutputPipe>, TransferError> {
        self.shared.output_open.store(true, Ordering::SeqCst);
        Ok(Box::new(MockOutputPipe {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MockInputPipe {
    max_packet_size: usize,
    interval: Duration,
    timeout: Duration,
    shared: Arc<Shared>,
}

impl InputPipe for MockInputPipe {
    fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    /// Blocks up to the pipe timeout for a scripted read.
    fn transfer(&mut self, buffer: &mut [u8]) -> std::result::Result<usize, TransferError> {
        self.shared.input_transfers.fetch_add(1, Ordering::SeqCst);
        let reads = self.shared.reads.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut reads, _) = self
            .shared
            .reads_changed
            .wait_timeout_while(reads, self.timeout, |r| r.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        match reads.pop_front() {
            Some(MockRead::Report(bytes)) => {
                let n = bytes.len().min(buffer.len());
                buffer[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(MockRead::Fail(error)) => Err(error),
            None => Err(TransferError::Timeout),
        }
    }
}

impl Drop for MockInputPipe {
    fn drop(&mut self) {
        self.shared.input_open.store(false, Ordering::SeqCst);
    }
}

struct MockOutputPipe {
    shared: Arc<Shared>,
}

impl OutputPipe for MockOutputPipe {
    fn transfer(&mut self, data: &[u8]) -> std::result::Result<usize, TransferError> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(TransferError::Disconnected);
        }
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.to_vec());
        Ok(data.len())
    }
}

impl Drop for MockOutputPipe {
    fn drop(&mut self) {
        self.shared.output_open.store(false, Ordering::SeqCst);
    }
}

/// Attach/detach bus driven by the test.
#[derive(Default)]
pub struct MockNotifier {
    bus: DeviceBus,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plug(&self, device: &MockDevice) {
        self.bus.arrived(Arc::new(device.clone()));
    }

    pub fn unplug(&self, device: &MockDevice) {
        self.bus.left(&device.identity());
    }

    pub fn listener_count(&self) -> usize {
        self.bus.listener_count()
    }
}

impl DeviceNotifier for MockNotifier {
    fn subscribe(&self, listener: Arc<dyn DeviceListener>) -> Result<SubscriptionId> {
        Ok(self.bus.subscribe(listener))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }
}
