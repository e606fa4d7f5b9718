//! Filter module emulator.
//!
//! Runs the real foreground loop on the desktop. Lines typed on stdin are
//! either serial traffic (anything starting with `at`) or knob gestures:
//!
//! | Input | Gesture                 |
//! |-------|-------------------------|
//! | `+`   | one detent clockwise    |
//! | `-`   | one detent anticlockwise|
//! | `p`   | press and release       |
//! | `P`   | press and hold          |
//! | `R`   | release                 |
//!
//! Gestures can be chained on one line (`P++R`). End of input quits.
//!
//! Run with: `RUST_LOG=debug cargo run -p firmware --features emulator`

use std::time::Duration;

use control::InputQueue;
use firmware::emulator::{
    load_flash, save_flash, EmulatorConfig, SimulatedKnob, StdDelay, StdoutSerial, TracingDisplay,
    TracingEngine, TracingSpeaker,
};
use firmware::{Controller, ModuleRx, Peripherals};
use platform::config::{APP_NAME, TICK_US};
use platform::{Direction, InputEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Filled by the simulated pin-change interrupt.
static INPUT: InputQueue = InputQueue::new();

/// Filled by the simulated UART receive interrupt.
static RX: ModuleRx = ModuleRx::new();

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EmulatorConfig::from_env()?;
    tracing::info!(
        serial = %config.serial,
        encoder = ?config.encoder,
        "{} emulator",
        APP_NAME
    );

    let flash = load_flash(config.flash_image.as_deref())?;
    let io = Peripherals {
        display: TracingDisplay::new(),
        speaker: TracingSpeaker,
        engine: TracingEngine::new(),
        serial: StdoutSerial,
        delay: StdDelay,
    };
    let mut controller = Controller::new(flash, config.serial, io);
    if let Err(e) = controller.start() {
        tracing::error!("startup: {e}");
    }

    let mut knob = SimulatedKnob::new(config.encoder);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(Duration::from_micros(u64::from(TICK_US)));

    loop {
        tokio::select! {
            _ = tick.tick() => {
                controller
                    .poll(&RX, &INPUT)
                    .map_err(|e| anyhow::anyhow!("foreground loop: {e}"))?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.to_ascii_lowercase().starts_with("at") {
                    for byte in line.bytes().chain(Some(b'\r')) {
                        RX.on_byte(byte);
                    }
                } else {
                    gestures(&mut knob, line);
                }
            }
        }
    }

    tracing::info!("display: |{}|", controller.peripherals().display.line());
    if let Some(path) = &config.flash_image {
        let (flash, _) = controller.into_parts();
        save_flash(&flash, path)?;
    }
    Ok(())
}

fn gestures(knob: &mut SimulatedKnob, line: &str) {
    for gesture in line.chars() {
        let events: Vec<InputEvent> = match gesture {
            '+' => knob.turn(Direction::Cw),
            '-' => knob.turn(Direction::Ccw),
            'p' => {
                let mut events = knob.set_pressed(true);
                events.extend(knob.set_pressed(false));
                events
            }
            'P' => knob.set_pressed(true),
            'R' => knob.set_pressed(false),
            ' ' => continue,
            other => {
                tracing::warn!("unknown gesture '{other}'");
                continue;
            }
        };
        for event in events {
            tracing::debug!(?event, "knob");
            if !INPUT.push(event) {
                tracing::warn!(?event, "input queue full");
            }
        }
    }
}
