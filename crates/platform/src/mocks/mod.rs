//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform seams for use
//! in unit tests, integration tests and the desktop emulator.

#![cfg(any(test, feature = "std"))]
// Host-only test doubles; counters and offsets are bounded by the fixtures.
#![allow(clippy::arithmetic_side_effects)]

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_storage::nor_flash::{ErrorType, NorFlash, ReadNorFlash};
use heapless::{Deque, String, Vec};

use crate::filter::{Channels, FilterEngine, FirScale, NotchCoefficients};
use crate::flash::{FlashError, FLASH_BYTES, SECTOR_BYTES};
use crate::display::{Annunciator, TextDisplay, LCD_COLUMNS};

// ---------------------------------------------------------------------------
// FLASH
// ---------------------------------------------------------------------------

/// In-memory NOR FLASH with the same erase/program rules as the real part.
///
/// Bits can only be cleared by `write`; `erase` sets a whole sector back to
/// `0xFF`. One-shot faults can be armed to exercise error paths.
pub struct MockFlash {
    data: [u8; FLASH_BYTES],
    erase_fault: Option<FlashError>,
    write_fault: Option<FlashError>,
    stuck_byte: Option<u32>,
    erase_count: usize,
    write_count: usize,
}

impl MockFlash {
    /// Create a fully erased device.
    #[allow(clippy::large_stack_arrays)] // host-only mock; mirrors the 128 KiB part
    pub fn new() -> Self {
        Self {
            data: [0xff; FLASH_BYTES],
            erase_fault: None,
            write_fault: None,
            stuck_byte: None,
            erase_count: 0,
            write_count: 0,
        }
    }

    /// Fail the next erase with `error`.
    pub fn fail_next_erase(&mut self, error: FlashError) {
        self.erase_fault = Some(error);
    }

    /// Fail the next write with `error`.
    pub fn fail_next_write(&mut self, error: FlashError) {
        self.write_fault = Some(error);
    }

    /// Leave the byte at `offset` at `0x00` after every erase.
    pub fn stick_byte(&mut self, offset: u32) {
        self.stuck_byte = Some(offset);
    }

    /// Number of sector erases performed.
    pub fn erase_count(&self) -> usize {
        self.erase_count
    }

    /// Number of successful write calls.
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Raw device contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Read one big-endian word at a word address.
    pub fn word(&self, word_addr: u32) -> u16 {
        let at = (word_addr as usize) << 1;
        let hi = self.data.get(at).copied().unwrap_or(0xff);
        let lo = self.data.get(at | 1).copied().unwrap_or(0xff);
        u16::from_be_bytes([hi, lo])
    }

    /// Overwrite one word directly, bypassing program rules (corruption tests).
    pub fn poke_word(&mut self, word_addr: u32, value: u16) {
        let at = (word_addr as usize) << 1;
        let [hi, lo] = value.to_be_bytes();
        if let Some(slot) = self.data.get_mut(at) {
            *slot = hi;
        }
        if let Some(slot) = self.data.get_mut(at | 1) {
            *slot = lo;
        }
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, FlashError> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(FlashError::Parameter)?;
        if end > self.data.len() {
            return Err(FlashError::Parameter);
        }
        Ok(start..end)
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for MockFlash {
    type Error = FlashError;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        let src = self.data.get(range).ok_or(FlashError::Parameter)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        FLASH_BYTES
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_BYTES as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if let Some(error) = self.erase_fault.take() {
            return Err(error);
        }
        if from % SECTOR_BYTES != 0 || to % SECTOR_BYTES != 0 || to < from {
            return Err(FlashError::Parameter);
        }
        let range = self.range(from, (to - from) as usize)?;
        for byte in self.data.get_mut(range).ok_or(FlashError::Parameter)? {
            *byte = 0xff;
        }
        if let Some(stuck) = self.stuck_byte {
            if (from..to).contains(&stuck) {
                if let Some(byte) = self.data.get_mut(stuck as usize) {
                    *byte = 0x00;
                }
            }
        }
        self.erase_count += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if let Some(error) = self.write_fault.take() {
            return Err(error);
        }
        let range = self.range(offset, bytes.len())?;
        let target = self.data.get_mut(range).ok_or(FlashError::Parameter)?;
        if target.iter().zip(bytes).any(|(&old, &new)| (old ^ new) & new != 0) {
            return Err(FlashError::ProgramZeroToOne);
        }
        for (slot, &new) in target.iter_mut().zip(bytes) {
            *slot &= new;
        }
        self.write_count += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LCD + speaker
// ---------------------------------------------------------------------------

/// Mock character LCD: keeps the visible line and a history of fragments.
pub struct MockDisplay {
    line: [u8; LCD_COLUMNS as usize],
    cursor: u8,
    cursor_visible: bool,
    history: Deque<String<32>, 64>,
}

impl MockDisplay {
    /// Create a blank display.
    pub fn new() -> Self {
        Self {
            line: [b' '; LCD_COLUMNS as usize],
            cursor: 1,
            cursor_visible: false,
            history: Deque::new(),
        }
    }

    /// Current contents of the visible line.
    pub fn line(&self) -> &str {
        core::str::from_utf8(&self.line).unwrap_or("")
    }

    /// Cursor column and visibility.
    pub fn cursor(&self) -> (u8, bool) {
        (self.cursor, self.cursor_visible)
    }

    /// `true` if any fragment written since the last [`clear_history`]
    /// starts with `text`.
    ///
    /// [`clear_history`]: MockDisplay::clear_history
    pub fn shown(&self, text: &str) -> bool {
        self.history.iter().any(|fragment| fragment.starts_with(text))
    }

    /// Fragments written so far, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// Forget the fragment history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDisplay for MockDisplay {
    fn show(&mut self, text: &str, column: u8, cursor: bool) {
        let start = usize::from(column.max(1)) - 1;
        for (slot, byte) in self.line.iter_mut().skip(start).zip(text.bytes()) {
            *slot = byte;
        }
        if !text.is_empty() {
            if self.history.is_full() {
                let _ = self.history.pop_front();
            }
            let mut fragment = String::new();
            for ch in text.chars() {
                if fragment.push(ch).is_err() {
                    break;
                }
            }
            let _ = self.history.push_back(fragment);
        }
        self.cursor = column;
        self.cursor_visible = cursor;
    }
}

/// Mock speaker that records every beep.
#[derive(Default)]
pub struct MockAnnunciator {
    beeps: Vec<(u16, u16), 64>,
}

impl MockAnnunciator {
    /// Create a silent speaker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of beeps so far.
    pub fn count(&self) -> usize {
        self.beeps.len()
    }

    /// Recorded `(cycles, half_period_us)` pairs.
    pub fn beeps(&self) -> &[(u16, u16)] {
        &self.beeps
    }

    /// Forget recorded beeps.
    pub fn clear(&mut self) {
        self.beeps.clear();
    }
}

impl Annunciator for MockAnnunciator {
    fn beep(&mut self, cycles: u16, half_period_us: u16) {
        let _ = self.beeps.push((cycles, half_period_us));
    }
}

// ---------------------------------------------------------------------------
// Serial transmit
// ---------------------------------------------------------------------------

/// Mock UART transmitter capturing every byte sent.
#[derive(Default)]
pub struct MockSerial {
    sent: Vec<u8, 2048>,
}

impl MockSerial {
    /// Create an empty transmitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes sent so far.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Carriage-return terminated replies sent so far.
    pub fn replies(&self) -> impl Iterator<Item = &str> {
        self.sent
            .split(|&b| b == b'\r')
            .filter(|line| !line.is_empty())
            .map(|line| core::str::from_utf8(line).unwrap_or(""))
    }

    /// Forget captured output.
    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = Infallible;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        // A full capture buffer silently drops; the UART never back-pressures.
        let _ = self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filter engine
// ---------------------------------------------------------------------------

/// Routine currently selected on one channel of [`MockFilterEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routine {
    /// NoFunc
    Silent,
    /// AllPass
    AllPass,
    /// FIR with the given quantisation
    Fir(FirScale),
    /// Lattice notch
    Notch,
}

/// One request received by [`MockFilterEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCall {
    /// `silence`
    Silence(Channels),
    /// `pass_through`
    PassThrough(Channels),
    /// `load_fir` with the number of taps loaded
    LoadFir {
        /// Target channels
        channels: Channels,
        /// Table length
        taps: usize,
        /// Quantisation
        scale: FirScale,
    },
    /// `load_notch`
    LoadNotch(Channels, NotchCoefficients),
    /// `set_gain`
    Gain(Channels, i32),
    /// `set_input_full_scale`
    FullScale(i32),
    /// `set_sample_rate`
    SampleRate(u32),
    /// `set_white_noise`
    WhiteNoise(bool),
    /// `set_cascade`
    Cascade(bool),
    /// `set_level_meter`
    LevelMeter(bool),
}

/// Mock DSP engine recording requests and the resulting per-channel state.
pub struct MockFilterEngine {
    calls: Deque<EngineCall, 128>,
    routine: [Routine; 2],
    gain: [i32; 2],
    taps: [Vec<i16, 256>; 2],
    sample_rate: u32,
    white_noise: bool,
    cascade: bool,
    level_meter: bool,
}

impl MockFilterEngine {
    /// Create an engine with both channels silent.
    pub fn new() -> Self {
        Self {
            calls: Deque::new(),
            routine: [Routine::Silent; 2],
            gain: [0; 2],
            taps: [Vec::new(), Vec::new()],
            sample_rate: 0,
            white_noise: false,
            cascade: false,
            level_meter: false,
        }
    }

    /// Requests received so far (oldest first, last 128 kept).
    pub fn calls(&self) -> impl Iterator<Item = &EngineCall> {
        self.calls.iter()
    }

    /// Forget recorded requests (state is kept).
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Routine selected on channel A (`b == false`) or B.
    pub fn routine(&self, b: bool) -> Routine {
        self.routine[usize::from(b)]
    }

    /// Gain on channel A (`b == false`) or B.
    pub fn gain(&self, b: bool) -> i32 {
        self.gain[usize::from(b)]
    }

    /// FIR table last loaded on channel A (`b == false`) or B.
    pub fn taps(&self, b: bool) -> &[i16] {
        &self.taps[usize::from(b)]
    }

    /// Current sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// White-noise, cascade and level-meter flags.
    pub fn flags(&self) -> (bool, bool, bool) {
        (self.white_noise, self.cascade, self.level_meter)
    }

    fn record(&mut self, call: EngineCall) {
        if self.calls.is_full() {
            let _ = self.calls.pop_front();
        }
        let _ = self.calls.push_back(call);
    }

    fn each(channels: Channels, mut f: impl FnMut(usize)) {
        if channels.includes_a() {
            f(0);
        }
        if channels.includes_b() {
            f(1);
        }
    }
}

impl Default for MockFilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::indexing_slicing)] // Safety: `each` only yields 0 or 1 for the 2-element arrays
impl FilterEngine for MockFilterEngine {
    fn silence(&mut self, channels: Channels) {
        Self::each(channels, |ch| self.routine[ch] = Routine::Silent);
        self.record(EngineCall::Silence(channels));
    }

    fn pass_through(&mut self, channels: Channels) {
        Self::each(channels, |ch| self.routine[ch] = Routine::AllPass);
        self.record(EngineCall::PassThrough(channels));
    }

    fn load_fir(&mut self, channels: Channels, taps: &[i16], scale: FirScale) {
        Self::each(channels, |ch| {
            self.routine[ch] = Routine::Fir(scale);
            self.taps[ch].clear();
            let _ = self.taps[ch].extend_from_slice(taps);
        });
        self.record(EngineCall::LoadFir {
            channels,
            taps: taps.len(),
            scale,
        });
    }

    fn load_notch(&mut self, channels: Channels, coefficients: NotchCoefficients) {
        Self::each(channels, |ch| self.routine[ch] = Routine::Notch);
        self.record(EngineCall::LoadNotch(channels, coefficients));
    }

    fn set_gain(&mut self, channels: Channels, hundredths: i32) {
        Self::each(channels, |ch| self.gain[ch] = hundredths);
        self.record(EngineCall::Gain(channels, hundredths));
    }

    fn set_input_full_scale(&mut self, vpp: i32) {
        self.record(EngineCall::FullScale(vpp));
    }

    fn set_sample_rate(&mut self, hz: u32) {
        self.sample_rate = hz;
        self.record(EngineCall::SampleRate(hz));
    }

    fn set_white_noise(&mut self, enabled: bool) {
        self.white_noise = enabled;
        self.record(EngineCall::WhiteNoise(enabled));
    }

    fn set_cascade(&mut self, enabled: bool) {
        self.cascade = enabled;
        self.record(EngineCall::Cascade(enabled));
    }

    fn set_level_meter(&mut self, enabled: bool) {
        self.level_meter = enabled;
        self.record(EngineCall::LevelMeter(enabled));
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Busy-wait delay that only accumulates the requested time.
#[derive(Default)]
pub struct MockDelay {
    elapsed_ns: u64,
}

impl MockDelay {
    /// Create a delay with nothing elapsed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in microseconds.
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns / 1_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns = self.elapsed_ns.saturating_add(u64::from(ns));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flash_rejects_zero_to_one() {
        let mut flash = MockFlash::new();
        flash.write(0, &[0x0f]).unwrap();
        assert_eq!(flash.write(0, &[0xf0]), Err(FlashError::ProgramZeroToOne));
        // Clearing more bits is always allowed.
        flash.write(0, &[0x03]).unwrap();
        assert_eq!(flash.bytes()[0], 0x03);
    }

    #[test]
    fn flash_erase_restores_ones_per_sector() {
        let mut flash = MockFlash::new();
        flash.write(SECTOR_BYTES, &[0x00, 0x00]).unwrap();
        flash.erase(SECTOR_BYTES, 2 * SECTOR_BYTES).unwrap();
        assert_eq!(flash.word(SECTOR_BYTES / 2), 0xffff);
        assert_eq!(flash.erase_count(), 1);
    }

    #[test]
    fn flash_out_of_range_is_parameter_error() {
        let mut flash = MockFlash::new();
        let mut buf = [0u8; 4];
        assert_eq!(
            flash.read(FLASH_BYTES as u32 - 2, &mut buf),
            Err(FlashError::Parameter)
        );
    }

    #[test]
    fn flash_one_shot_faults() {
        let mut flash = MockFlash::new();
        flash.fail_next_erase(FlashError::EraseTimeout);
        assert_eq!(flash.erase(0, SECTOR_BYTES), Err(FlashError::EraseTimeout));
        assert!(flash.erase(0, SECTOR_BYTES).is_ok());
    }

    #[test]
    fn display_writes_at_column_and_clips() {
        let mut lcd = MockDisplay::new();
        lcd.show("Mode:", 1, false);
        lcd.show("A&BSeparate", 6, true);
        assert_eq!(lcd.line(), "Mode:A&BSeparate");
        lcd.show("overflowing", 14, false);
        assert_eq!(lcd.line(), "Mode:A&BSeparove");
        assert_eq!(lcd.cursor(), (14, false));
        assert!(lcd.shown("A&B"));
    }

    #[test]
    fn serial_splits_replies_on_cr() {
        use embedded_io::Write;
        let mut tx = MockSerial::new();
        tx.write_all(b"2.20\r1320010000\r").unwrap();
        let replies: std::vec::Vec<&str> = tx.replies().collect();
        assert_eq!(replies, ["2.20", "1320010000"]);
    }

    #[test]
    fn engine_tracks_both_channels() {
        let mut engine = MockFilterEngine::new();
        engine.pass_through(Channels::Both);
        engine.silence(Channels::B);
        assert_eq!(engine.routine(false), Routine::AllPass);
        assert_eq!(engine.routine(true), Routine::Silent);
    }
}
