mod common;

use std::thread;

use common::{attached, settings};
use xpad360_driver::usb::TransferError;
use xpad360_driver::{Error, LedState, Xbox360Controller};

#[test]
fn rumble_is_encoded() {
    let (controller, device) = attached();
    controller.send_rumble(128, 200);
    assert_eq!(
        device.writes(),
        vec![vec![0x00, 0x08, 0x00, 0x80, 0xC8, 0x00, 0x00, 0x00]]
    );
}

#[test]
fn stop_rumble_zeroes_both_motors() {
    let (controller, device) = attached();
    controller.stop_rumble();
    assert_eq!(device.writes(), vec![vec![0x00, 0x08, 0x00, 0, 0, 0, 0, 0]]);
}

#[test]
fn led_state_is_encoded() {
    let (controller, device) = attached();
    controller.send_led_state(LedState::Rotate);
    controller.send_led_state(LedState::BlinkOnce);
    assert_eq!(
        device.writes(),
        vec![vec![0x01, 0x03, 0x0A], vec![0x01, 0x03, 0x0F]]
    );
}

#[test]
fn commands_are_dropped_while_disconnected() {
    let controller = Xbox360Controller::new(settings());
    controller.send_rumble(255, 255);
    controller.send_led_state(LedState::AllBlinking);

    assert!(matches!(
        controller.try_send_rumble(1, 2),
        Err(Error::NotConnected)
    ));
    assert!(matches!(
        controller.try_send_led_state(LedState::Off),
        Err(Error::NotConnected)
    ));
}

#[test]
fn commands_after_detach_do_not_reach_the_device() {
    let (controller, device) = attached();
    controller.on_detach(&device);
    controller.send_rumble(10, 10);
    assert!(device.writes().is_empty());
}

#[test]
fn write_failures_are_absorbed() {
    let (controller, device) = attached();
    device.fail_writes(true);

    controller.send_rumble(1, 1);
    controller.send_led_state(LedState::Blink);
    assert!(matches!(
        controller.try_send_rumble(1, 1),
        Err(Error::Transfer(TransferError::Disconnected))
    ));
    assert!(controller.is_connected());

    device.fail_writes(false);
    controller.try_send_led_state(LedState::Off).unwrap();
    assert_eq!(device.writes(), vec![vec![0x01, 0x03, 0x00]]);
}

#[test]
fn concurrent_senders_are_serialized() {
    let (controller, device) = attached();
    let workers: Vec<_> = (0..4u8)
        .map(|n| {
            let controller = controller.clone();
            thread::spawn(move || {
                for i in 0..50u8 {
                    if (i + n) % 2 == 0 {
                        controller.send_rumble(n, i);
                    } else {
                        controller.send_led_state(LedState::TopRightOn);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let writes = device.writes();
    assert_eq!(writes.len(), 200);
    for write in writes {
        match write.len() {
            8 => assert_eq!(&write[..3], &[0x00, 0x08, 0x00]),
            3 => assert_eq!(write, [0x01, 0x03, 0x07]),
            n => panic!("unexpected write of {n} bytes"),
        }
    }
}

#[test]
fn commands_work_while_reports_stream() {
    let (controller, device) = attached();
    for _ in 0..10 {
        device.push_report(&[0x00, 0x14, 0x00, 0x10]);
    }
    for i in 0..10 {
        controller.send_rumble(i, i);
    }
    assert_eq!(device.writes().len(), 10);
}
