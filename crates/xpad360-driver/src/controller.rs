//! Lifecycle of the single controller slot.
//!
//! [`Xbox360Controller`] reacts to attach/detach notifications, owns the
//! poller and the report buffer of the current connection and exposes the
//! decoded input and the output commands to the application.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use crossbeam_channel::{unbounded, Sender};
use xpad360_protocol::{
    decode_axis, decode_button, decode_trigger, Axis, Button, GamepadState, LedState, Trigger,
};

use crate::command::{Command, OutputChannel};
use crate::error::{Error, Result};
use crate::events::{ControllerEvent, EventReceiver};
use crate::poller::{self, Poller};
use crate::report::ReportBuffer;
use crate::settings::{DeviceFilter, DriverSettings};
use crate::types::{AttachOutcome, ConnectionCell, ConnectionState, ControllerInfo, PollStats};
use crate::usb::{
    ConfigurationDescriptor, DeviceIdentity, DeviceListener, DeviceNotifier, Direction,
    EndpointDescriptor, InterfaceDescriptor, RawDevice, Registration, UsbDevice,
    REQUEST_SET_CONFIGURATION, REQUEST_TYPE_STANDARD_OUT,
};

/// Callback run synchronously on the attaching thread once a controller is
/// connected.
pub(crate) type ConnectedHandler = Arc<dyn Fn(&Xbox360Controller) + Send + Sync>;

/// Everything that exists only while a controller is attached.
struct Session {
    identity: DeviceIdentity,
    info: ControllerInfo,
    // Declared before the device so the thread is joined first.
    poller: Poller,
    _device: Box<dyn RawDevice>,
}

/// State shared by every handle of a controller and its listener adapter.
pub(crate) struct Inner {
    settings: DriverSettings,
    state: ConnectionCell,
    session: Mutex<Option<Session>>,
    report: RwLock<Option<Arc<ReportBuffer>>>,
    output: OutputChannel,
    handlers: Mutex<Vec<ConnectedHandler>>,
    subscribers: Mutex<Vec<Sender<ControllerEvent>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            log::info!("controller {} released while connected", session.identity);
            drop(session);
        }
    }
}

/// Driver for one wired Xbox 360 controller.
///
/// Cheap to clone; clones share the same slot. Dropping the last clone while
/// connected stops the poller.
#[derive(Clone)]
pub struct Xbox360Controller {
    inner: Arc<Inner>,
}

impl Default for Xbox360Controller {
    fn default() -> Self {
        Self::new(DriverSettings::default())
    }
}

impl Xbox360Controller {
    pub fn new(settings: DriverSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                state: ConnectionCell::new(),
                session: Mutex::new(None),
                report: RwLock::new(None),
                output: OutputChannel::default(),
                handlers: Mutex::new(Vec::new()),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.inner.settings
    }

    /// Listens for attach/detach notifications on `notifier` until the
    /// returned guard is dropped. Devices already present are offered
    /// immediately.
    pub fn register(&self, notifier: Arc<dyn DeviceNotifier>) -> Result<Registration> {
        let listener = Arc::new(Listener {
            inner: Arc::downgrade(&self.inner),
        });
        let id = notifier.subscribe(listener)?;
        Ok(Registration::new(notifier, id))
    }

    /// Detaches the connected controller, if any.
    pub fn shutdown(&self) {
        let identity = self.lock_session().as_ref().map(|s| s.identity);
        if let Some(identity) = identity {
            self.detach(&identity);
        }
    }

    /// Handles a newly attached device.
    ///
    /// The first matching device wins; later ones are ignored until it is
    /// detached. Transport failures leave the controller disconnected.
    pub fn on_attach(&self, device: &dyn UsbDevice) -> Result<AttachOutcome> {
        let identity = device.identity();
        let settings = &self.inner.settings;
        if self.is_connected() {
            log::debug!("ignoring {identity}: a controller is already connected");
            return Ok(AttachOutcome::AlreadyConnected);
        }
        if !settings.filter.matches_device(&identity) {
            log::debug!("ignoring {identity}: not a supported controller");
            return Ok(AttachOutcome::NotMatched);
        }

        let mut session = self.lock_session();
        if session.is_some() {
            return Ok(AttachOutcome::AlreadyConnected);
        }

        let raw = device.open()?;
        let configuration = raw.configuration()?;
        let Some((interface, input, output)) =
            find_gamepad_interface(&configuration, &settings.filter)
        else {
            log::info!("{identity} has no usable gamepad interface");
            return Ok(AttachOutcome::NoUsableInterface);
        };

        raw.send_control_transfer(
            REQUEST_TYPE_STANDARD_OUT,
            REQUEST_SET_CONFIGURATION,
            u16::from(configuration.value),
            0,
        )?;
        let input_pipe = raw.open_input(interface, input, settings.read_timeout)?;
        let output_pipe = raw.open_output(interface, output, settings.write_timeout)?;

        let report_len = input_pipe.max_packet_size();
        if report_len == 0 {
            return Err(Error::Descriptor(format!(
                "input endpoint {:#04x} has a zero max packet size",
                input.address
            )));
        }
        let interval = poller::effective_interval(input_pipe.interval(), settings.min_poll_interval);
        let buffer = Arc::new(ReportBuffer::zeroed(report_len));
        let poller = Poller::spawn(
            input_pipe,
            Arc::clone(&buffer),
            interval,
            settings.high_priority,
        )?;

        let info = ControllerInfo::new(&identity, interface.number, report_len, interval);
        *self.write_report() = Some(buffer);
        self.inner.output.install(output_pipe);
        *session = Some(Session {
            identity,
            info: info.clone(),
            poller,
            _device: raw,
        });
        self.inner.state.set(ConnectionState::Connected);
        drop(session);

        log::info!(
            "controller connected: {identity}, interface {}, {report_len} byte reports every {:?}",
            interface.number,
            info.poll_interval
        );
        self.notify_connected(info);
        Ok(AttachOutcome::Connected)
    }

    /// Handles a device removal. Only the pad occupying the slot is
    /// detached; an identical pad at another address is ignored. Returns
    /// whether the connected controller was detached; the poller has exited
    /// by the time this returns.
    pub fn on_detach(&self, device: &dyn UsbDevice) -> bool {
        self.detach(&device.identity())
    }

    fn detach(&self, identity: &DeviceIdentity) -> bool {
        let mut slot = self.lock_session();
        let matches = slot.as_ref().is_some_and(|s| {
            s.identity.same_product(identity) && s.identity.same_slot(identity)
        });
        if !matches || !self.is_connected() {
            log::debug!("ignoring removal of {identity}");
            return false;
        }
        self.inner.state.set(ConnectionState::Disconnected);
        let Some(mut session) = slot.take() else {
            return false;
        };
        session.poller.stop();
        self.inner.output.close();
        *self.write_report() = None;
        drop(slot);

        let stats = session.poller.stats();
        let info = session.info.clone();
        drop(session);
        log::info!(
            "controller disconnected: {identity} ({} reports, {} failed transfers)",
            stats.reports,
            stats.failures
        );
        self.broadcast(ControllerEvent::Disconnected(info));
        true
    }

    /// Registers a callback run after every successful attach, on the
    /// attaching thread.
    pub fn on_connected<F>(&self, handler: F)
    where
        F: Fn(&Xbox360Controller) + Send + Sync + 'static,
    {
        lock(&self.inner.handlers).push(Arc::new(handler));
    }

    /// Subscribes to connection events. Dropped receivers are cleaned up
    /// automatically.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = unbounded();
        lock(&self.inner.subscribers).push(tx);
        rx
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub fn info(&self) -> Option<ControllerInfo> {
        self.lock_session().as_ref().map(|s| s.info.clone())
    }

    /// Poller counters of the current connection.
    pub fn poll_stats(&self) -> PollStats {
        self.lock_session()
            .as_ref()
            .map(|s| s.poller.stats())
            .unwrap_or_default()
    }

    pub fn get_button(&self, button: Button) -> bool {
        self.with_report(|report| decode_button(report, button))
    }

    pub fn get_trigger(&self, trigger: Trigger) -> u8 {
        self.with_report(|report| decode_trigger(report, trigger))
    }

    pub fn get_axis(&self, axis: Axis) -> i16 {
        self.with_report(|report| decode_axis(report, axis))
    }

    /// Decodes the whole current report at once.
    pub fn state(&self) -> GamepadState {
        self.with_report(GamepadState::decode)
    }

    /// Sets both rumble motors. Failures are logged, not returned.
    pub fn send_rumble(&self, left: u8, right: u8) {
        self.send_logged(Command::Rumble { left, right });
    }

    pub fn stop_rumble(&self) {
        self.send_rumble(0, 0);
    }

    /// Sets the ring light pattern. Failures are logged, not returned.
    pub fn send_led_state(&self, state: LedState) {
        self.send_logged(Command::Led(state));
    }

    pub fn try_send_rumble(&self, left: u8, right: u8) -> Result<()> {
        self.try_send(Command::Rumble { left, right })
    }

    pub fn try_send_led_state(&self, state: LedState) -> Result<()> {
        self.try_send(Command::Led(state))
    }

    fn try_send(&self, command: Command) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.inner.output.send(command)
    }

    fn send_logged(&self, command: Command) {
        match self.try_send(command) {
            Ok(()) => {}
            Err(Error::NotConnected) => log::debug!("dropping {command}: not connected"),
            Err(e) => log::warn!("failed to send {command}: {e}"),
        }
    }

    fn with_report<R: Default>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        if !self.is_connected() {
            return R::default();
        }
        let report = self.inner.report.read().unwrap_or_else(PoisonError::into_inner);
        match report.as_ref() {
            Some(buffer) => buffer.read(f),
            None => R::default(),
        }
    }

    fn notify_connected(&self, info: ControllerInfo) {
        let handlers = lock(&self.inner.handlers).clone();
        for handler in handlers {
            handler(self);
        }
        self.broadcast(ControllerEvent::Connected(info));
    }

    fn broadcast(&self, event: ControllerEvent) {
        lock(&self.inner.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        lock(&self.inner.session)
    }

    fn write_report(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<ReportBuffer>>> {
        self.inner
            .report
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Finds the gamepad interface and its IN/OUT endpoint pair. Interfaces
/// with the right signature but a different endpoint layout are skipped.
fn find_gamepad_interface<'a>(
    configuration: &'a ConfigurationDescriptor,
    filter: &DeviceFilter,
) -> Option<(
    &'a InterfaceDescriptor,
    &'a EndpointDescriptor,
    &'a EndpointDescriptor,
)> {
    configuration
        .interfaces
        .iter()
        .filter(|interface| filter.matches_interface(interface))
        .find_map(|interface| {
            let [first, second] = interface.endpoints.as_slice() else {
                log::debug!(
                    "skipping interface {}: {} endpoints",
                    interface.number,
                    interface.endpoints.len()
                );
                return None;
            };
            match (first.direction, second.direction) {
                (Direction::In, Direction::Out) => Some((interface, first, second)),
                (Direction::Out, Direction::In) => Some((interface, second, first)),
                _ => None,
            }
        })
}

/// Forwards host notifications to a controller without keeping it alive.
struct Listener {
    inner: Weak<Inner>,
}

impl Listener {
    fn controller(&self) -> Option<Xbox360Controller> {
        self.inner.upgrade().map(|inner| Xbox360Controller { inner })
    }
}

impl DeviceListener for Listener {
    fn device_connected(&self, device: &dyn UsbDevice) {
        let Some(controller) = self.controller() else {
            return;
        };
        match controller.on_attach(device) {
            Ok(AttachOutcome::Connected) => {}
            Ok(outcome) => log::debug!("{} not attached: {outcome:?}", device.identity()),
            Err(e) => log::error!("failed to attach {}: {e}", device.identity()),
        }
    }

    fn device_disconnected(&self, device: &dyn UsbDevice) {
        if let Some(controller) = self.controller() {
            controller.on_detach(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::mock::MockDevice;

    fn interface(endpoints: Vec<EndpointDescriptor>) -> InterfaceDescriptor {
        InterfaceDescriptor {
            number: 0,
            alternate_setting: 0,
            class_code: 0xFF,
            sub_class_code: 0x5D,
            protocol_code: 0x01,
            endpoints,
        }
    }

    fn endpoint(address: u8, direction: Direction) -> EndpointDescriptor {
        EndpointDescriptor {
            address,
            direction,
            max_packet_size: 32,
            interval: 4,
        }
    }

    #[test]
    fn finds_the_gamepad_interface_of_a_real_layout() {
        let device = MockDevice::xbox360();
        let (interface, input, output) =
            find_gamepad_interface(device.configuration(), &DeviceFilter::default()).unwrap();
        assert_eq!(interface.number, 0);
        assert_eq!(input.address, 0x81);
        assert_eq!(output.address, 0x01);
    }

    #[test]
    fn accepts_endpoints_in_either_order() {
        let configuration = ConfigurationDescriptor {
            value: 1,
            interfaces: vec![interface(vec![
                endpoint(0x02, Direction::Out),
                endpoint(0x82, Direction::In),
            ])],
        };
        let (_, input, output) =
            find_gamepad_interface(&configuration, &DeviceFilter::default()).unwrap();
        assert_eq!(input.address, 0x82);
        assert_eq!(output.address, 0x02);
    }

    #[test]
    fn skips_interfaces_with_the_wrong_endpoint_layout() {
        let mut second = interface(vec![
            endpoint(0x83, Direction::In),
            endpoint(0x03, Direction::Out),
        ]);
        second.number = 1;
        let configuration = ConfigurationDescriptor {
            value: 1,
            interfaces: vec![
                interface(vec![endpoint(0x81, Direction::In)]),
                interface(vec![
                    endpoint(0x81, Direction::In),
                    endpoint(0x82, Direction::In),
                ]),
                second,
            ],
        };
        let (interface, ..) =
            find_gamepad_interface(&configuration, &DeviceFilter::default()).unwrap();
        assert_eq!(interface.number, 1);
    }

    #[test]
    fn no_match_without_gamepad_signature() {
        let mut only = interface(vec![
            endpoint(0x81, Direction::In),
            endpoint(0x01, Direction::Out),
        ]);
        only.protocol_code = 0x03;
        let configuration = ConfigurationDescriptor {
            value: 1,
            interfaces: vec![only],
        };
        assert!(find_gamepad_interface(&configuration, &DeviceFilter::default()).is_none());
    }
}
