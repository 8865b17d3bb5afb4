use codspeed_criterion_compat::{black_box, criterion_group, criterion_main, Criterion};
use xpad360_protocol::{decode_button, Button, GamepadState, REPORT_LEN};

fn sample_report() -> [u8; REPORT_LEN] {
    let mut report = [0u8; REPORT_LEN];
    report[1] = REPORT_LEN as u8;
    report[2] = 0x11;
    report[3] = 0x30;
    report[4] = 0x7F;
    report[6..8].copy_from_slice(&(-1200i16).to_le_bytes());
    report[10..12].copy_from_slice(&30000i16.to_le_bytes());
    report
}

pub fn bench_decode(c: &mut Criterion) {
    let report = sample_report();

    c.bench_function("decode_full_state", |b| {
        b.iter(|| GamepadState::decode(black_box(&report)))
    });

    c.bench_function("decode_all_buttons_individually", |b| {
        b.iter(|| {
            let mut pressed = 0usize;
            for button in Button::ALL {
                if decode_button(black_box(&report), button) {
                    pressed += 1;
                }
            }
            black_box(pressed)
        })
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
