//! ParamStore — the single owned table of module settings.
//!
//! Rows are indexed by [`ParamId`], columns by [`Context`]. Writes through
//! [`ParamStore::set`] raise the change signal; the foreground consumes it
//! with [`ParamStore::take_change`] exactly once per dispatch.

use platform::config::GAIN_MAX;

use crate::descriptor::{id, Function, ParamId, NPARAMS, USER_FIR_BASE, USER_FIR_ROWS};
use crate::selection::{Context, Mode};

/// Words per row in the FLASH image: three cells, low word then high word.
pub const WORDS_PER_ROW: usize = 6;

/// Length of the FLASH image produced by [`ParamStore::write_words`].
pub const IMAGE_WORDS: usize = NPARAMS * WORDS_PER_ROW;

/// How much re-derivation a change needs. Ordered: a higher severity
/// implies everything a lower one does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    /// Nothing pending
    #[default]
    None,
    /// Selection moved: recompute bounds only
    SelectionOnly,
    /// Value edited: bounds, derived values and coefficients
    Full,
    /// Press-to-confirm action (store, recall, initialize)
    Confirmed,
}

/// Inclusive legal range of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bounds {
    /// Smallest legal value
    pub min: i32,
    /// Largest legal value
    pub max: i32,
}

impl Bounds {
    /// No restriction.
    pub const UNBOUNDED: Bounds = Bounds {
        min: i32::MIN,
        max: i32::MAX,
    };

    /// Gains in hundredths.
    pub const GAIN: Bounds = Bounds {
        min: -GAIN_MAX,
        max: GAIN_MAX,
    };

    /// Create a range.
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range. The upper limit is applied first, so a
    /// degenerate range (`min > max`) yields `min`.
    pub fn clamp(self, value: i32) -> i32 {
        value.min(self.max).max(self.min)
    }
}

/// All parameter values plus their current bounds and the pending change.
#[derive(Clone)]
pub struct ParamStore {
    cells: [[i32; 3]; NPARAMS],
    bounds: [Bounds; NPARAMS],
    pending: Severity,
}

// ---- construction ----

impl ParamStore {
    /// A table of zeros with nothing pending.
    pub const fn zeroed() -> Self {
        Self {
            cells: [[0; 3]; NPARAMS],
            bounds: [Bounds::UNBOUNDED; NPARAMS],
            pending: Severity::None,
        }
    }

    /// Factory defaults: AllPass everywhere, 20 Vpp input, 48 kHz, unity
    /// gains, order 127, tap cursor 1 and the default frequencies.
    ///
    /// A full update is pending so the first dispatch programs the engine.
    pub fn factory() -> Self {
        let mut store = Self::zeroed();
        for ctx in Context::ALL {
            store.put(id::FUNC, ctx, Function::AllPass as i32);
            for gain in [
                id::AP_GAIN,
                id::LP_GAIN,
                id::HP_GAIN,
                id::BP_GAIN,
                id::BS_GAIN,
                id::N_GAIN,
                id::IN_GAIN,
                id::UF_GAIN,
            ] {
                store.put(gain, ctx, 100);
            }
            for order in [id::LP_ORDER, id::HP_ORDER, id::BP_ORDER, id::BS_ORDER, id::UF_ORDER] {
                store.put(order, ctx, 127);
            }
            store.put(id::UF_TAP, ctx, 1);
        }
        store.put(id::FULL_SCALE_IN, Context::A, 20);
        store.put(id::SAMPLE_RATE, Context::A, 1);
        store.reset_frequencies();
        store.pending = Severity::Full;
        store
    }

    /// Reload the default frequencies (after a sample-rate change).
    pub fn reset_frequencies(&mut self) {
        for ctx in Context::ALL {
            for param in [
                id::LP_FCUT,
                id::HP_FCUT,
                id::BP_F1,
                id::BP_FWDTH,
                id::BS_F1,
                id::BS_FWDTH,
                id::N_FNOTCH,
                id::IN_FCNTR,
                id::N_FWIDTH,
                id::IN_FWIDTH,
            ] {
                self.put(param, ctx, 1000);
            }
            self.put(id::BP_F2, ctx, 2000);
            self.put(id::BS_F2, ctx, 2000);
            self.put(id::BP_FCNTR, ctx, 1500);
            self.put(id::BS_FCNTR, ctx, 1500);
        }
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::factory()
    }
}

// ---- cell access ----

impl ParamStore {
    /// Value of `param` in `ctx` (0 for an out-of-range id).
    pub fn get(&self, param: ParamId, ctx: Context) -> i32 {
        self.cells
            .get(param)
            .and_then(|row| row.get(ctx.index()))
            .copied()
            .unwrap_or(0)
    }

    /// Write a value and raise the change signal to at least
    /// [`Severity::Full`].
    pub fn set(&mut self, param: ParamId, ctx: Context, value: i32) {
        self.put(param, ctx, value);
        self.raise(Severity::Full);
    }

    /// Write a value without raising the change signal (derived values and
    /// bulk loads).
    pub fn put(&mut self, param: ParamId, ctx: Context, value: i32) {
        if let Some(cell) = self
            .cells
            .get_mut(param)
            .and_then(|row| row.get_mut(ctx.index()))
        {
            *cell = value;
        }
    }

    /// Bounds last computed for `param`.
    pub fn get_bounds(&self, param: ParamId) -> Bounds {
        self.bounds.get(param).copied().unwrap_or(Bounds::UNBOUNDED)
    }

    /// Record freshly computed bounds for `param`.
    pub fn set_bounds(&mut self, param: ParamId, bounds: Bounds) {
        if let Some(slot) = self.bounds.get_mut(param) {
            *slot = bounds;
        }
    }

    /// Raise the pending change; a lower severity never overrides a higher.
    pub fn raise(&mut self, severity: Severity) {
        self.pending = self.pending.max(severity);
    }

    /// Pending severity, without consuming it.
    pub fn pending(&self) -> Severity {
        self.pending
    }

    /// Consume the pending change.
    pub fn take_change(&mut self) -> Severity {
        core::mem::take(&mut self.pending)
    }
}

// ---- typed views ----

impl ParamStore {
    /// Function assigned to `ctx`; unknown values read as NoFunc.
    pub fn function(&self, ctx: Context) -> Function {
        Function::from_value(self.get(id::FUNC, ctx)).unwrap_or(Function::NoFunc)
    }

    /// Channel mode.
    pub fn mode(&self) -> Mode {
        Mode::from_value(self.get(id::MODE, Context::A))
    }

    /// Codec sample rate selected by SampleRate.
    pub fn sample_rate_hz(&self) -> u32 {
        if self.get(id::SAMPLE_RATE, Context::A) != 0 {
            48_000
        } else {
            8_000
        }
    }

    /// Highest filter order the current mode allows.
    pub fn max_order(&self) -> i32 {
        if self.mode() == Mode::ChannelAOnly {
            256
        } else {
            128
        }
    }

    /// User-FIR tap `k` (0-based) of `ctx`.
    pub fn user_fir_tap(&self, ctx: Context, k: usize) -> i16 {
        let cell = self.get(USER_FIR_BASE.saturating_add(k / 2), ctx);
        let [b0, b1, b2, b3] = cell.to_le_bytes();
        if k % 2 == 0 {
            i16::from_le_bytes([b0, b1])
        } else {
            i16::from_le_bytes([b2, b3])
        }
    }

    /// Replace User-FIR tap `k` (0-based) of `ctx`; even taps live in the
    /// low half of a cell, odd taps in the high half.
    pub fn set_user_fir_tap(&mut self, ctx: Context, k: usize, tap: i16) {
        if k / 2 >= USER_FIR_ROWS {
            return;
        }
        let row = USER_FIR_BASE.saturating_add(k / 2);
        let mut bytes = self.get(row, ctx).to_le_bytes();
        let [lo, hi] = tap.to_le_bytes();
        let at: usize = if k % 2 == 0 { 0 } else { 2 };
        if let Some(half) = bytes.get_mut(at..at.saturating_add(2)) {
            half.copy_from_slice(&[lo, hi]);
        }
        self.put(row, ctx, i32::from_le_bytes(bytes));
    }
}

// ---- FLASH image ----

impl ParamStore {
    /// Serialise every cell as `[A lo, A hi, B lo, B hi, C lo, C hi]` per
    /// row into `out`. Returns the number of words written.
    #[allow(clippy::cast_possible_truncation)] // split into 16-bit halves
    pub fn write_words(&self, out: &mut [u16]) -> usize {
        let words = self.cells.iter().flat_map(|row| {
            row.iter().flat_map(|&cell| {
                let bits = u32::from_ne_bytes(cell.to_ne_bytes());
                [bits as u16, (bits >> 16) as u16]
            })
        });
        out.iter_mut()
            .zip(words)
            .map(|(slot, word)| *slot = word)
            .count()
    }

    /// Load every cell from an image produced by [`write_words`]. Bounds and
    /// the pending change are left alone. Returns `false` (and loads
    /// nothing) when `words` is shorter than [`IMAGE_WORDS`].
    ///
    /// [`write_words`]: ParamStore::write_words
    pub fn load_words(&mut self, words: &[u16]) -> bool {
        if words.len() < IMAGE_WORDS {
            return false;
        }
        let cells = self.cells.iter_mut().flat_map(|row| row.iter_mut());
        for (cell, pair) in cells.zip(words.chunks_exact(2)) {
            if let [lo, hi] = *pair {
                let bits = u32::from(lo) | (u32::from(hi) << 16);
                *cell = i32::from_ne_bytes(bits.to_ne_bytes());
            }
        }
        true
    }

    /// `true` if every cell of `self` equals `other` (bounds ignored).
    pub fn same_values(&self, other: &ParamStore) -> bool {
        self.cells == other.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_defaults() {
        let s = ParamStore::factory();
        for ctx in Context::ALL {
            assert_eq!(s.function(ctx), Function::AllPass);
            assert_eq!(s.get(id::LP_ORDER, ctx), 127);
            assert_eq!(s.get(id::UF_GAIN, ctx), 100);
            assert_eq!(s.get(id::NF_GAIN, ctx), 0);
            assert_eq!(s.get(id::UF_TAP, ctx), 1);
            assert_eq!(s.get(id::BP_F2, ctx), 2000);
            assert_eq!(s.get(id::BS_FCNTR, ctx), 1500);
        }
        assert_eq!(s.sample_rate_hz(), 48_000);
        assert_eq!(s.mode(), Mode::Common);
        assert_eq!(s.get(id::FULL_SCALE_IN, Context::A), 20);
        assert_eq!(s.pending(), Severity::Full);
    }

    #[test]
    fn change_signal_is_consumed_once() {
        let mut s = ParamStore::zeroed();
        s.set(id::LP_FCUT, Context::A, 5000);
        assert_eq!(s.take_change(), Severity::Full);
        assert_eq!(s.take_change(), Severity::None);
    }

    #[test]
    fn lower_severity_does_not_override() {
        let mut s = ParamStore::zeroed();
        s.raise(Severity::Confirmed);
        s.set(id::STORE, Context::A, 3);
        s.raise(Severity::SelectionOnly);
        assert_eq!(s.take_change(), Severity::Confirmed);
    }

    #[test]
    fn put_is_silent() {
        let mut s = ParamStore::zeroed();
        s.put(id::BP_F2, Context::B, 3000);
        assert_eq!(s.get(id::BP_F2, Context::B), 3000);
        assert_eq!(s.get(id::BP_F2, Context::A), 0);
        assert_eq!(s.pending(), Severity::None);
    }

    #[test]
    fn out_of_range_ids_are_ignored() {
        let mut s = ParamStore::zeroed();
        s.set(NPARAMS, Context::A, 7);
        assert_eq!(s.get(NPARAMS, Context::A), 0);
        assert_eq!(s.get_bounds(NPARAMS), Bounds::UNBOUNDED);
    }

    #[test]
    fn user_fir_taps_pack_two_per_cell() {
        let mut s = ParamStore::zeroed();
        s.set_user_fir_tap(Context::B, 0, -2);
        s.set_user_fir_tap(Context::B, 1, 300);
        s.set_user_fir_tap(Context::B, 255, i16::MIN);
        assert_eq!(s.user_fir_tap(Context::B, 0), -2);
        assert_eq!(s.user_fir_tap(Context::B, 1), 300);
        assert_eq!(s.user_fir_tap(Context::B, 255), i16::MIN);
        assert_eq!(s.get(USER_FIR_BASE, Context::B), (300 << 16) | 0xfffe);
        assert_eq!(s.user_fir_tap(Context::A, 0), 0);
        // Tap 256 would be past the coefficient area.
        s.set_user_fir_tap(Context::B, 256, 1);
        assert_eq!(s.get(NPARAMS - 1, Context::B) >> 16, i32::from(i16::MIN));
    }

    #[test]
    fn bounds_clamp() {
        let b = Bounds::new(3, 128);
        assert_eq!(b.clamp(500), 128);
        assert_eq!(b.clamp(-5), 3);
        assert_eq!(Bounds::new(10, 5).clamp(7), 10);
    }

    #[test]
    fn image_round_trip() {
        let mut s = ParamStore::factory();
        s.put(id::BP_F1, Context::Common, -123_456);
        s.set_user_fir_tap(Context::A, 7, -32768);
        let mut words = [0u16; IMAGE_WORDS];
        assert_eq!(s.write_words(&mut words), IMAGE_WORDS);
        // Cell (BP_F1, Common) is row 22, third column: words 22*6+4, +5.
        assert_eq!(words[22 * 6 + 4], 0x1dc0);
        assert_eq!(words[22 * 6 + 5], 0xfffe);

        let mut t = ParamStore::zeroed();
        assert!(t.load_words(&words));
        assert!(t.same_values(&s));
        assert!(!t.load_words(&words[..10]));
    }
}
