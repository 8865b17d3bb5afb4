use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{after, select, tick, Receiver};
use xpad360_driver::protocol::{normalize_axis, normalize_trigger};
use xpad360_driver::usb::libusb::RusbNotifier;
use xpad360_driver::usb::Registration;
use xpad360_driver::{
    Axis, ControllerEvent, ControllerInfo, DriverSettings, GamepadState, LedState, Trigger,
    Xbox360Controller,
};

use crate::AppError;

const TICK: Duration = Duration::from_millis(10);

/// Controller registered with the host's hotplug notifications.
pub(crate) struct Daemon {
    controller: Xbox360Controller,
    registration: Option<Registration>,
}

impl Daemon {
    pub(crate) fn start(settings: DriverSettings) -> Result<Self, AppError> {
        let notifier = Arc::new(RusbNotifier::new()?);
        let controller = Xbox360Controller::new(settings);
        let registration = controller.register(notifier)?;
        Ok(Self {
            controller,
            registration: Some(registration),
        })
    }

    pub(crate) fn controller(&self) -> &Xbox360Controller {
        &self.controller
    }

    /// Blocks until a controller is attached, `stop` fires or `wait` passes.
    pub(crate) fn wait_for_controller(
        &self,
        stop: &Receiver<()>,
        wait: Duration,
    ) -> Result<ControllerInfo, AppError> {
        let events = self.controller.subscribe();
        if let Some(info) = self.controller.info() {
            return Ok(info);
        }
        let deadline = after(wait);
        loop {
            select! {
                recv(stop) -> _ => return Err(AppError::Interrupted),
                recv(deadline) -> _ => return Err(AppError::NoController(wait)),
                recv(events) -> msg => {
                    if let Ok(ControllerEvent::Connected(info)) = msg {
                        return Ok(info);
                    }
                }
            }
        }
    }

    /// Logs connection events and input changes until `stop` fires.
    pub(crate) fn run(&self, stop: &Receiver<()>) -> Result<(), AppError> {
        self.controller
            .on_connected(|controller| controller.send_led_state(LedState::TopLeftOn));
        let events = self.controller.subscribe();
        let ticker = tick(TICK);
        let mut last = GamepadState::default();

        if let Some(info) = self.controller.info() {
            log_connected(&info);
            self.controller.send_led_state(LedState::TopLeftOn);
        }
        log::info!("xpad360d started. Waiting for controller input.");
        loop {
            select! {
                recv(stop) -> _ => break,
                recv(events) -> msg => match msg {
                    Ok(ControllerEvent::Connected(info)) => log_connected(&info),
                    Ok(ControllerEvent::Disconnected(info)) => {
                        log::warn!(
                            "controller {:04x}:{:04x} disconnected",
                            info.vendor_id,
                            info.product_id
                        );
                        last = GamepadState::default();
                    }
                    Err(err) => {
                        log::error!("event channel closed: {err}");
                        break;
                    }
                },
                recv(ticker) -> _ => {
                    let state = self.controller.state();
                    if state != last {
                        log_changes(&last, &state);
                        last = state;
                    }
                }
            }
        }
        Ok(())
    }

    /// Stops listening for devices, silences the controller and detaches.
    pub(crate) fn stop(mut self) {
        self.registration.take();
        if self.controller.is_connected() {
            self.controller.stop_rumble();
            self.controller.send_led_state(LedState::Off);
        }
        self.controller.shutdown();
        log::debug!("driver stopped");
    }
}

fn log_connected(info: &ControllerInfo) {
    log::info!(
        "controller {:04x}:{:04x} connected on bus {} address {} ({} byte reports every {:?})",
        info.vendor_id,
        info.product_id,
        info.bus,
        info.address,
        info.report_len,
        info.poll_interval
    );
}

fn log_changes(last: &GamepadState, state: &GamepadState) {
    let pressed = state.buttons.pressed_since(&last.buttons);
    let released = last.buttons.pressed_since(&state.buttons);
    if !pressed.is_empty() {
        log::info!("pressed: {pressed}");
    }
    if !released.is_empty() {
        log::info!("released: {released}");
    }
    for trigger in Trigger::ALL {
        let value = state.trigger(trigger);
        if value != last.trigger(trigger) {
            log::debug!("{trigger:?} trigger: {:.2}", normalize_trigger(value));
        }
    }
    for axis in Axis::ALL {
        let value = state.axis(axis);
        if value != last.axis(axis) {
            log::debug!("{axis:?}: {:+.2}", normalize_axis(value));
        }
    }
}
