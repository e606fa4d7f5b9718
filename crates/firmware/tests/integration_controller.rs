//! Controller integration tests
//!
//! Drives the foreground loop the way the interrupt handlers do: serial
//! bytes go into a `SerialRx` ring, knob events into an `InputQueue`, and
//! every `poll` is one 5 ms tick. All peripherals are the platform mocks.
//!
//! Run with: cargo test -p firmware --test integration_controller

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    // the mock FLASH image and the staging buffer live on the test stack
    clippy::large_stack_arrays,
)]

use std::rc::Rc;

use control::{InputQueue, LevelDisplay};
use embedded_hal::delay::DelayNs;
use firmware::{Controller, ModuleRx, Peripherals};
use params::descriptor::id;
use params::{Context, Function, SerialNumber};
use platform::display::{BEEP_CONFIRM, BEEP_ERROR};
use platform::mocks::{
    MockAnnunciator, MockDelay, MockDisplay, MockFilterEngine, MockFlash, MockSerial, Routine,
};
use platform::{Direction, FlashError, InputEvent};

type TestController =
    Controller<MockFlash, MockDisplay, MockAnnunciator, MockFilterEngine, MockSerial, MockDelay>;

fn serial_number(value: u32) -> SerialNumber {
    SerialNumber::with_check_digits(value).unwrap()
}

fn peripherals() -> Peripherals<MockDisplay, MockAnnunciator, MockFilterEngine, MockSerial, MockDelay>
{
    Peripherals {
        display: MockDisplay::new(),
        speaker: MockAnnunciator::new(),
        engine: MockFilterEngine::new(),
        serial: MockSerial::new(),
        delay: MockDelay::new(),
    }
}

fn power_up(flash: MockFlash, serial: u32) -> TestController {
    let mut c = Controller::new(flash, serial_number(serial), peripherals());
    c.start().unwrap();
    c
}

/// Module test bench: controller plus the two interrupt-side queues.
struct Bench {
    c: TestController,
    rx: ModuleRx,
    input: InputQueue,
}

impl Bench {
    fn new() -> Self {
        Self::with_flash(MockFlash::new(), 132_001)
    }

    fn with_flash(flash: MockFlash, serial: u32) -> Self {
        Self {
            c: power_up(flash, serial),
            rx: ModuleRx::new(),
            input: InputQueue::new(),
        }
    }

    /// Deliver `bytes` as the UART would, polling between bursts so the
    /// ring never overruns.
    fn send(&mut self, bytes: &[u8]) {
        for burst in bytes.chunks(64) {
            for &b in burst {
                self.rx.on_byte(b);
            }
            self.poll();
        }
    }

    fn poll(&mut self) {
        self.c.poll(&self.rx, &self.input).unwrap();
    }

    fn knob(&mut self, events: &[InputEvent]) {
        for &e in events {
            assert!(self.input.push(e));
        }
        self.poll();
    }

    fn display(&self) -> &MockDisplay {
        &self.c.peripherals().display
    }

    fn replies(&self) -> Vec<String> {
        self.c
            .peripherals()
            .serial
            .replies()
            .map(String::from)
            .collect()
    }

    fn common(&self, param: usize) -> i32 {
        self.c.state().store.get(param, Context::Common)
    }

    fn power_cycle(self, serial: u32) -> Self {
        let (flash, _) = self.c.into_parts();
        Self::with_flash(flash, serial)
    }
}

// ─── startup ─────────────────────────────────────────────────────────────────

#[test]
fn blank_flash_is_seeded_and_module_signs_on() {
    let mut bench = Bench::new();

    let records = bench.c.log_mut().live_records().unwrap();
    assert_eq!(records.len(), 5, "one record per location");

    let display = bench.display();
    assert!(display.shown("Filter V2.20"));
    assert!(display.shown("SN 132001"));
    assert!(display.line().starts_with(" FUNC:"));

    let engine = &bench.c.peripherals().engine;
    assert_eq!(engine.sample_rate(), 48_000);
    assert_eq!(engine.routine(false), Routine::AllPass);
    assert_eq!(engine.routine(true), Routine::AllPass);

    // Sign-on holds each message for a second.
    assert!(bench.c.peripherals().delay.elapsed_us() >= 2_000_000);
}

#[test]
fn log_from_another_module_is_reseeded() {
    let mut bench = Bench::new();
    bench.send(b"at all func:lowpass\r");
    bench.send(b"at all store:3\r");

    let mut bench = bench.power_cycle(500_123);
    bench.send(b"at all recall:3\r");
    assert_eq!(bench.common(id::FUNC), Function::AllPass as i32);
}

// ─── serial requests ─────────────────────────────────────────────────────────

#[test]
fn stored_settings_survive_power_cycle() {
    let mut bench = Bench::new();
    bench.send(b"at all func:lowpass\r");
    bench.send(b"at all lpfcut:3000\r");
    bench.send(b"at sn:132001,store:3\r");
    assert!(bench.display().shown("       3 Stored "));
    assert!(bench
        .c
        .peripherals()
        .speaker
        .beeps()
        .contains(&BEEP_CONFIRM));

    let mut bench = bench.power_cycle(132_001);
    // Location 0 still holds factory settings.
    assert_eq!(bench.common(id::FUNC), Function::AllPass as i32);

    bench.send(b"at all recall:3\r");
    assert!(bench.display().shown("      3 Recalled"));
    assert_eq!(bench.common(id::FUNC), Function::LowPass as i32);
    assert_eq!(bench.common(id::LP_FCUT), 3000);
    assert!(matches!(
        bench.c.peripherals().engine.routine(false),
        Routine::Fir(_)
    ));
}

#[test]
fn read_requests_reply_over_serial() {
    let mut bench = Bench::new();
    bench.send(b"at all apgain\r");
    bench.send(b"at all firmware\r");
    bench.send(b"at all serial\r");
    bench.send(b"at all mode\r");
    assert_eq!(bench.replies(), ["1.00", "2.20", "132001", "A&B Common "]);
}

#[test]
fn requests_for_other_modules_are_ignored() {
    let mut bench = Bench::new();
    bench.send(b"at sn:500123,func:lowpass\r");
    assert_eq!(bench.common(id::FUNC), Function::AllPass as i32);

    // Inactive function parameters are dropped too.
    bench.send(b"at all lpfcut:3000\r");
    assert_eq!(bench.common(id::LP_FCUT), 1000);
}

#[test]
fn write_is_clamped_to_bounds() {
    let mut bench = Bench::new();
    bench.send(b"at all apgain:250.5\r");
    assert_eq!(bench.common(id::AP_GAIN), 10_000);

    bench.send(b"at all apgain:-1.25\r");
    assert_eq!(bench.common(id::AP_GAIN), -125);
}

#[test]
fn sendsn_backs_off_and_quietsn_silences() {
    let mut bench = Bench::new();
    let before = bench.c.peripherals().delay.elapsed_us();
    bench.send(b"at all sendsn\r");
    let waited = bench.c.peripherals().delay.elapsed_us() - before;
    assert!(waited <= 22 * 0x7fff);
    assert_eq!(bench.replies(), [serial_number(132_001).as_str()]);

    bench.send(b"at all quietsn\r");
    bench.send(b"at all sendsn\r");
    assert_eq!(bench.replies().len(), 1);
}

/// Delay during which the other modules on the bus are heard.
struct BusDelay {
    rx: Rc<ModuleRx>,
    chatter: Vec<u8>,
    inner: MockDelay,
}

impl DelayNs for BusDelay {
    fn delay_ns(&mut self, ns: u32) {
        for b in self.chatter.drain(..) {
            self.rx.on_byte(b);
        }
        self.inner.delay_ns(ns);
    }
}

#[test]
fn sendsn_wait_ignores_other_modules_replies() {
    let rx = Rc::new(ModuleRx::new());
    let input = InputQueue::new();
    let io = Peripherals {
        display: MockDisplay::new(),
        speaker: MockAnnunciator::new(),
        engine: MockFilterEngine::new(),
        serial: MockSerial::new(),
        delay: BusDelay {
            rx: Rc::clone(&rx),
            chatter: Vec::new(),
            inner: MockDelay::new(),
        },
    };
    let mut c = Controller::new(MockFlash::new(), serial_number(132_001), io);
    c.start().unwrap();

    // Twenty other modules answer while this one backs off.
    let chatter: Vec<u8> = (0..20)
        .flat_map(|k| format!("{}\r", serial_number(132_100 + k).as_str()).into_bytes())
        .collect();
    assert!(chatter.len() > rx.capacity());
    c.peripherals_mut().delay.chatter = chatter;

    for &b in b"at all sendsn\r" {
        rx.on_byte(b);
    }
    c.poll(&rx, &input).unwrap();
    c.poll(&rx, &input).unwrap();

    assert!(c.peripherals().delay.chatter.is_empty());
    assert!(!rx.is_suspended());
    assert!(!c.peripherals().display.shown("RS-232 Error!"));
    assert!(!c.peripherals().speaker.beeps().contains(&BEEP_ERROR));
    let replies: Vec<&str> = c.peripherals().serial.replies().collect();
    assert_eq!(replies, [serial_number(132_001).as_str()]);

    for &b in b"at all echo:Hi\r" {
        rx.on_byte(b);
    }
    c.poll(&rx, &input).unwrap();
    assert_eq!(c.peripherals().serial.replies().last(), Some("Hi"));
}

#[test]
fn echo_and_display_text() {
    let mut bench = Bench::new();
    bench.send(b"at all echo:Hello\r");
    assert_eq!(bench.replies(), ["Hello"]);
    assert_eq!(bench.display().line(), "Hello           ");

    bench.send(b"at all display:Busy\r");
    assert_eq!(bench.display().line(), "Busy            ");
    for _ in 0..200 {
        bench.poll();
    }
    assert_eq!(bench.display().line(), "Busy            ");

    bench.send(b"at all display\r");
    assert!(bench.display().line().starts_with(" FUNC:"));
}

#[test]
fn reset_restores_factory_settings() {
    let mut bench = Bench::new();
    bench.send(b"at all func:notch\r");
    assert_eq!(bench.common(id::FUNC), Function::Notch as i32);
    bench.send(b"at all reset\r");
    assert_eq!(bench.common(id::FUNC), Function::AllPass as i32);
    assert_eq!(bench.c.peripherals().engine.routine(false), Routine::AllPass);
}

#[test]
fn line_error_is_reported_and_flushes_input() {
    let mut bench = Bench::new();
    for &b in b"at all func:low" {
        bench.rx.on_byte(b);
    }
    bench.rx.on_line_error();
    bench.poll();

    assert!(bench.display().shown("RS-232 Error!   "));
    assert!(bench.c.peripherals().speaker.beeps().contains(&BEEP_ERROR));
    assert!(bench.rx.is_empty());

    bench.send(b"pass\r");
    assert_eq!(bench.common(id::FUNC), Function::AllPass as i32);
}

// ─── FLASH faults and reprogramming ──────────────────────────────────────────

#[test]
fn flash_fault_during_store_is_shown() {
    let mut bench = Bench::new();
    bench
        .c
        .log_mut()
        .programmer()
        .device_mut()
        .fail_next_write(FlashError::ProgramTimeout);
    bench.send(b"at all store:2\r");

    let display = bench.display();
    assert!(display.shown("ProgERR"));
    assert!(display.shown("5"));
    assert!(display.shown("inStore"));
    assert!(display.line().starts_with("Store:"));
}

fn program_session(start: u32, data: &[u8]) -> Vec<u8> {
    let sum: u32 = data.iter().map(|&b| u32::from(b)).sum();
    let mut line = format!("at all program: s:{start} l:{} d:", data.len() / 2).into_bytes();
    line.extend_from_slice(data);
    line.extend_from_slice(format!("{sum:08}").as_bytes());
    line
}

#[test]
fn blank_serial_block_is_replaced_when_programming_sector_0() {
    let mut bench = Bench::new();
    // 80 words of ASCII zeros: the serial block reads "0000000000".
    bench.send(&program_session(0, &[b'0'; 160]));

    let display = bench.display();
    assert!(display.shown("Recvd    0 Words"));
    assert!(display.shown("Programming...  "));
    assert_eq!(display.line(), "Sector 0 Prog OK");

    let (flash, _) = bench.c.into_parts();
    let ours = serial_number(132_001).code_words();
    for (k, word) in ours.iter().enumerate() {
        assert_eq!(flash.word(0x42 + k as u32), *word);
    }
    assert_eq!(flash.word(0x41), 0x3030);
    assert_eq!(flash.word(0x47), 0x3030);
}

#[test]
fn image_for_other_sectors_is_written_verbatim() {
    let mut bench = Bench::new();
    bench.send(&program_session(0x2000, &[b'0'; 160]));
    assert_eq!(bench.display().line(), "Sector 1 Prog OK");

    let (flash, _) = bench.c.into_parts();
    assert_eq!(flash.word(0x2042), 0x3030);
}

#[test]
fn bad_checksum_aborts_programming() {
    let mut bench = Bench::new();
    let mut session = program_session(0x2000, &[b'0'; 16]);
    let last = session.len() - 1;
    session[last] = b'9';
    bench.send(&session);

    let display = bench.display();
    assert!(display.shown("PARAMETER ERROR "));
    assert!(display.shown("WRITE ABORTED!  "));
    let (flash, _) = bench.c.into_parts();
    assert_eq!(flash.word(0x2000), 0xffff);
}

// ─── knob ────────────────────────────────────────────────────────────────────

#[test]
fn knob_edit_reaches_engine() {
    let mut bench = Bench::new();
    bench.knob(&[
        InputEvent::ButtonPress,
        InputEvent::ButtonRelease,
        InputEvent::Rotary(Direction::Cw),
    ]);
    assert_eq!(bench.common(id::FUNC), Function::LowPass as i32);
    assert!(matches!(
        bench.c.peripherals().engine.routine(false),
        Routine::Fir(_)
    ));
    assert!(bench.display().line().starts_with(" FUNC:LowPass"));
}

#[test]
fn levels_appear_after_the_knob_is_left_alone() {
    let mut bench = Bench::new();
    bench.send(b"at all reverttolevels:y\r");
    assert_eq!(bench.c.state().level, LevelDisplay::Off);

    for _ in 0..1200 {
        bench.poll();
    }
    assert_eq!(bench.c.state().level, LevelDisplay::Auto);
    assert!(bench.display().line().starts_with("Levels-In  Out"));
    assert!(bench.c.peripherals().engine.flags().2, "meter running");

    // Any turn brings the parameter display back and stops the meter.
    bench.knob(&[InputEvent::Rotary(Direction::Cw)]);
    assert_eq!(bench.c.state().level, LevelDisplay::Off);
    assert!(!bench.c.peripherals().engine.flags().2);
}
