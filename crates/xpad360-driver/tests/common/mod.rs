#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

use xpad360_driver::usb::mock::MockDevice;
use xpad360_driver::{AttachOutcome, DriverSettings, Xbox360Controller};

const DEADLINE: Duration = Duration::from_secs(2);

/// Short timeouts keep joins fast; no real-time priority in CI.
pub fn settings() -> DriverSettings {
    DriverSettings {
        read_timeout: Duration::from_millis(10),
        write_timeout: Duration::from_millis(10),
        high_priority: false,
        ..DriverSettings::default()
    }
}

pub fn attached() -> (Xbox360Controller, MockDevice) {
    let controller = Xbox360Controller::new(settings());
    let device = MockDevice::xbox360();
    let outcome = controller.on_attach(&device).unwrap();
    assert_eq!(outcome, AttachOutcome::Connected);
    (controller, device)
}

/// Polls `condition` until it holds or two seconds pass.
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < DEADLINE {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// A 20 byte input report.
pub fn report(buttons: [u8; 2], triggers: [u8; 2], axes: [i16; 4]) -> Vec<u8> {
    let mut bytes = vec![0x00, 0x14, buttons[0], buttons[1], triggers[0], triggers[1]];
    for axis in axes {
        bytes.extend_from_slice(&axis.to_le_bytes());
    }
    bytes.resize(20, 0);
    bytes
}
