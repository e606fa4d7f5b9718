//! Desktop stand-ins for the module's peripherals.
//!
//! The LCD, the speaker and the filter engine log through `tracing`; serial
//! replies go to stdout. The knob is simulated at pin level so the real
//! [`Debouncer`] decodes it.
//!
//! Settings come from the environment:
//!
//! | Variable             | Default      | Meaning                            |
//! |----------------------|--------------|------------------------------------|
//! | `FILTER_SERIAL`      | `132001`     | six significant serial digits      |
//! | `FILTER_ENCODER`     | `detent`     | `detent` or `panasonic`            |
//! | `FILTER_FLASH_IMAGE` | (none)       | file the FLASH contents persist in |

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context as _};
use control::{Debouncer, EncoderType};
use embedded_hal::delay::DelayNs;
use embedded_storage::nor_flash::NorFlash;
use params::SerialNumber;
use platform::flash::FLASH_BYTES;
use platform::mocks::{MockDisplay, MockFilterEngine, MockFlash};
use platform::{
    Annunciator, Channels, Direction, FilterEngine, FirScale, InputEvent, NotchCoefficients,
    TextDisplay,
};

/// Emulator settings.
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Module serial number
    pub serial: SerialNumber,
    /// Encoder fitted to the simulated panel
    pub encoder: EncoderType,
    /// FLASH image file, loaded at start and written back on exit
    pub flash_image: Option<PathBuf>,
}

impl EmulatorConfig {
    /// Serial number used when `FILTER_SERIAL` is unset.
    pub const DEFAULT_SERIAL: u32 = 132_001;

    /// Read the settings from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let serial = match std::env::var("FILTER_SERIAL") {
            Ok(text) => {
                let value: u32 = text
                    .trim()
                    .parse()
                    .with_context(|| format!("FILTER_SERIAL={text} is not a number"))?;
                SerialNumber::with_check_digits(value)
                    .map_err(|e| anyhow::anyhow!("FILTER_SERIAL={text}: {e}"))?
            }
            Err(_) => SerialNumber::with_check_digits(Self::DEFAULT_SERIAL)
                .map_err(|e| anyhow::anyhow!("default serial: {e}"))?,
        };

        let encoder = match std::env::var("FILTER_ENCODER").as_deref() {
            Err(_) | Ok("detent") => EncoderType::Detent,
            Ok("panasonic") => EncoderType::Panasonic,
            Ok(other) => bail!("FILTER_ENCODER={other}: expected detent or panasonic"),
        };

        let flash_image = std::env::var_os("FILTER_FLASH_IMAGE").map(PathBuf::from);

        Ok(Self {
            serial,
            encoder,
            flash_image,
        })
    }
}

/// FLASH device, loaded from `path` when the file exists.
pub fn load_flash(path: Option<&Path>) -> anyhow::Result<MockFlash> {
    let mut flash = MockFlash::new();
    let Some(path) = path else {
        return Ok(flash);
    };
    if !path.exists() {
        tracing::info!("flash image {} not found, starting erased", path.display());
        return Ok(flash);
    }
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.len() != FLASH_BYTES {
        bail!(
            "{}: expected {FLASH_BYTES} bytes, found {}",
            path.display(),
            bytes.len()
        );
    }
    // An erased device accepts any pattern without an erase.
    flash
        .write(0, &bytes)
        .map_err(|e| anyhow::anyhow!("loading {}: {e}", path.display()))?;
    tracing::info!("flash image loaded from {}", path.display());
    Ok(flash)
}

/// Write the FLASH contents back to `path`.
pub fn save_flash(flash: &MockFlash, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, flash.bytes()).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!("flash image saved to {}", path.display());
    Ok(())
}

/// LCD that logs its line after every write.
#[derive(Default)]
pub struct TracingDisplay {
    inner: MockDisplay,
}

impl TracingDisplay {
    /// Blank display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current line.
    pub fn line(&self) -> &str {
        self.inner.line()
    }
}

impl TextDisplay for TracingDisplay {
    fn show(&mut self, text: &str, column: u8, cursor: bool) {
        self.inner.show(text, column, cursor);
        if !text.is_empty() {
            tracing::info!(target: "lcd", "|{}|", self.inner.line());
        }
    }
}

/// Speaker that logs beeps.
#[derive(Debug, Default)]
pub struct TracingSpeaker;

impl Annunciator for TracingSpeaker {
    fn beep(&mut self, cycles: u16, half_period_us: u16) {
        tracing::info!(target: "speaker", cycles, half_period_us, "beep");
    }
}

/// Filter engine that logs every request and keeps the resulting state.
#[derive(Default)]
pub struct TracingEngine {
    inner: MockFilterEngine,
}

impl TracingEngine {
    /// Engine with both channels silent.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded engine state.
    pub fn state(&self) -> &MockFilterEngine {
        &self.inner
    }
}

impl FilterEngine for TracingEngine {
    fn silence(&mut self, channels: Channels) {
        tracing::debug!(target: "engine", ?channels, "silence");
        self.inner.silence(channels);
    }

    fn pass_through(&mut self, channels: Channels) {
        tracing::debug!(target: "engine", ?channels, "pass through");
        self.inner.pass_through(channels);
    }

    fn load_fir(&mut self, channels: Channels, taps: &[i16], scale: FirScale) {
        tracing::debug!(target: "engine", ?channels, taps = taps.len(), ?scale, "load FIR");
        self.inner.load_fir(channels, taps, scale);
    }

    fn load_notch(&mut self, channels: Channels, coefficients: NotchCoefficients) {
        tracing::debug!(target: "engine", ?channels, ?coefficients, "load notch");
        self.inner.load_notch(channels, coefficients);
    }

    fn set_gain(&mut self, channels: Channels, hundredths: i32) {
        tracing::debug!(target: "engine", ?channels, hundredths, "gain");
        self.inner.set_gain(channels, hundredths);
    }

    fn set_input_full_scale(&mut self, vpp: i32) {
        tracing::debug!(target: "engine", vpp, "input full scale");
        self.inner.set_input_full_scale(vpp);
    }

    fn set_sample_rate(&mut self, hz: u32) {
        tracing::debug!(target: "engine", hz, "sample rate");
        self.inner.set_sample_rate(hz);
    }

    fn set_white_noise(&mut self, enabled: bool) {
        tracing::debug!(target: "engine", enabled, "white noise");
        self.inner.set_white_noise(enabled);
    }

    fn set_cascade(&mut self, enabled: bool) {
        tracing::debug!(target: "engine", enabled, "cascade");
        self.inner.set_cascade(enabled);
    }

    fn set_level_meter(&mut self, enabled: bool) {
        tracing::debug!(target: "engine", enabled, "level meter");
        self.inner.set_level_meter(enabled);
    }
}

/// Serial replies on stdout, `\r` shown as a line break.
#[derive(Debug, Default)]
pub struct StdoutSerial;

impl embedded_io::ErrorType for StdoutSerial {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for StdoutSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut out = std::io::stdout().lock();
        for &byte in buf {
            let byte = if byte == b'\r' { b'\n' } else { byte };
            out.write_all(&[byte])
                .map_err(|_| embedded_io::ErrorKind::Other)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::stdout()
            .flush()
            .map_err(|_| embedded_io::ErrorKind::Other)
    }
}

/// Busy-wait replaced by a thread sleep.
#[derive(Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Samples taken per pin-change interrupt.
const WINDOW: usize = 9;

/// Switch pin level (bit 2) when released.
const SWITCH_UP: u8 = 0b100;

/// Knob driven at pin level through the real debouncer.
pub struct SimulatedKnob {
    debouncer: Debouncer,
    encoder: EncoderType,
    /// Index into the clockwise phase sequence
    phase: usize,
    pressed: bool,
}

impl SimulatedKnob {
    /// Knob at rest, switch released.
    pub fn new(encoder: EncoderType) -> Self {
        Self {
            debouncer: Debouncer::new(encoder),
            encoder,
            phase: 0,
            pressed: false,
        }
    }

    /// Gray codes of one clockwise cycle, phase B in bit 1.
    fn sequence(&self) -> [u8; 4] {
        match self.encoder {
            EncoderType::Detent => [0, 1, 3, 2],
            EncoderType::Panasonic => [0, 2, 3, 1],
        }
    }

    fn pins(&self) -> u8 {
        let gray = self.sequence().get(self.phase).copied().unwrap_or(0);
        if self.pressed {
            gray
        } else {
            gray | SWITCH_UP
        }
    }

    fn interrupt(&mut self, before: u8) -> Vec<InputEvent> {
        let after = self.pins();
        let samples = [after; WINDOW];
        self.debouncer.process(before ^ after, &samples).to_vec()
    }

    /// Turn until the debouncer reports one detent.
    pub fn turn(&mut self, direction: Direction) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for _ in 0..4 {
            let before = self.pins();
            self.phase = match direction {
                Direction::Cw => self.phase.wrapping_add(1) & 3,
                Direction::Ccw => self.phase.wrapping_add(3) & 3,
            };
            events.extend(self.interrupt(before));
            if events.iter().any(|e| matches!(e, InputEvent::Rotary(_))) {
                break;
            }
        }
        events
    }

    /// Push (`true`) or release (`false`) the knob.
    pub fn set_pressed(&mut self, pressed: bool) -> Vec<InputEvent> {
        let before = self.pins();
        self.pressed = pressed;
        self.interrupt(before)
    }
}
