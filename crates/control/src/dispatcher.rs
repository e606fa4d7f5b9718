//! Parameter-change dispatcher.
//!
//! One handler per parameter id. Every handler first records the bounds of
//! its parameter; a [`Severity::SelectionOnly`] change stops there. Fuller
//! changes re-derive coupled values and reprogram the [`FilterEngine`].
//!
//! Effects that need the FLASH log, the LCD or a delay are handed back to
//! the caller as an [`Action`].

use params::descriptor::id;
use params::{Bounds, Context, Mode, ParamId, ParamStore, Severity};
use platform::config::{
    RateFraction, F1_MAX, F1_MIN, F2_MAX, F2_MIN, FCUT_MAX, FCUT_MIN, FNOTCH_MAX, FNOTCH_MIN,
    FNWIDTH_MAX, FNWIDTH_MIN, FULL_SCALE_MAX_VPP, FWIDTH_MIN, LAST_MEM_LOC,
};
use platform::{Channels, FilterEngine, FirScale};

use crate::design::{self, FirDesigner, MAX_TAPS};
use crate::state::{ControlState, LevelDisplay};

/// Follow-up the caller performs after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Save the settings to a FLASH location
    Store(u16),
    /// Load the settings of a FLASH location
    Recall(u16),
    /// Factory defaults, then seed every FLASH location with them
    FactoryReset,
    /// Show the firmware version next to its template
    ShowFirmware,
    /// Show the serial number next to its template
    ShowSerial,
    /// Show a User-FIR tap value next to the tap index
    ShowTap(i16),
}

/// Parameter ids of one band filter.
#[derive(Clone, Copy)]
struct Band {
    f1: ParamId,
    f2: ParamId,
    center: ParamId,
    width: ParamId,
    order: ParamId,
}

const BAND_PASS: Band = Band {
    f1: id::BP_F1,
    f2: id::BP_F2,
    center: id::BP_FCNTR,
    width: id::BP_FWDTH,
    order: id::BP_ORDER,
};

const BAND_STOP: Band = Band {
    f1: id::BS_F1,
    f2: id::BS_F2,
    center: id::BS_FCNTR,
    width: id::BS_FWDTH,
    order: id::BS_ORDER,
};

fn band_of(param: ParamId) -> Option<Band> {
    if (id::BP_F1..=id::BP_ORDER).contains(&param) {
        Some(BAND_PASS)
    } else if (id::BS_F1..=id::BS_ORDER).contains(&param) {
        Some(BAND_STOP)
    } else {
        None
    }
}

/// Order parameters reset when leaving Ch A Only.
const LONG_ORDERS: [ParamId; 5] = [
    id::LP_ORDER,
    id::HP_ORDER,
    id::BP_ORDER,
    id::BS_ORDER,
    id::UF_ORDER,
];

/// Hz value of a rate fraction at the current sample rate, truncated.
#[allow(clippy::cast_possible_truncation)] // limits are ≤ 20000 Hz
fn hz(store: &ParamStore, limit: RateFraction) -> i32 {
    limit.at(store.sample_rate_hz()) as i32
}

/// Smallest band width, rounded up to whole Hz so that stored integer edges
/// never fall below the limit.
#[allow(clippy::cast_possible_truncation)] // ≤ 400 Hz
pub fn min_band_width(sample_rate: u32) -> i32 {
    libm::ceilf(FWIDTH_MIN.at(sample_rate)) as i32
}

/// Bounds of `param` in `ctx` given the other current values, or `None`
/// for parameters without a range.
#[allow(clippy::cast_possible_truncation)] // frequencies ≤ 20000 Hz
#[allow(clippy::cast_precision_loss)] // widths ≤ 20000 are exact in f32
pub fn bounds_for(store: &ParamStore, param: ParamId, ctx: Context) -> Option<Bounds> {
    let fs = store.sample_rate_hz();
    let bounds = match param {
        id::FULL_SCALE_IN => Bounds::new(1, FULL_SCALE_MAX_VPP),
        id::STORE | id::RECALL => Bounds::new(0, i32::from(LAST_MEM_LOC)),
        id::NF_GAIN
        | id::AP_GAIN
        | id::LP_GAIN
        | id::HP_GAIN
        | id::BP_GAIN
        | id::BS_GAIN
        | id::N_GAIN
        | id::IN_GAIN
        | id::UF_GAIN => Bounds::GAIN,
        id::LP_ORDER | id::HP_ORDER | id::BP_ORDER | id::BS_ORDER | id::UF_ORDER => {
            Bounds::new(3, store.max_order())
        }
        id::UF_TAP => Bounds::new(1, store.get(id::UF_ORDER, ctx)),
        id::LP_FCUT | id::HP_FCUT => Bounds::new(hz(store, FCUT_MIN), hz(store, FCUT_MAX)),
        id::BP_F1 | id::BS_F1 => Bounds::new(hz(store, F1_MIN), hz(store, F1_MAX)),
        id::BP_F2 | id::BS_F2 => Bounds::new(hz(store, F2_MIN), hz(store, F2_MAX)),
        id::BP_FCNTR | id::BS_FCNTR => {
            let half = store.get(param.saturating_add(1), ctx) as f32 / 2.0;
            Bounds::new(
                (F1_MIN.at(fs) + half + 0.5) as i32,
                (F2_MAX.at(fs) - half + 0.5) as i32,
            )
        }
        id::BP_FWDTH | id::BS_FWDTH => Bounds::new(
            min_band_width(fs),
            (RateFraction(F2_MAX.0.saturating_sub(F1_MIN.0)).at(fs) + 0.5) as i32,
        ),
        id::N_FNOTCH | id::IN_FCNTR => Bounds::new(hz(store, FNOTCH_MIN), hz(store, FNOTCH_MAX)),
        id::N_FWIDTH | id::IN_FWIDTH => {
            Bounds::new(hz(store, FNWIDTH_MIN), hz(store, FNWIDTH_MAX))
        }
        _ => return None,
    };
    Some(bounds)
}

/// Applies parameter changes to the engine.
pub struct Dispatcher {
    designer: FirDesigner,
    taps: [i16; MAX_TAPS],
}

impl Dispatcher {
    /// Dispatcher with an empty coefficient buffer.
    pub const fn new() -> Self {
        Self {
            designer: FirDesigner::new(),
            taps: [0; MAX_TAPS],
        }
    }

    /// Consume the pending change and apply it to the selected parameter.
    pub fn dispatch<E: FilterEngine>(
        &mut self,
        state: &mut ControlState,
        engine: &mut E,
    ) -> Option<Action> {
        let severity = state.store.take_change();
        let selection = state.selection;
        self.update(state, engine, selection.param, selection.context, severity)
    }

    /// Recompute and record the bounds of `param` only.
    pub fn refresh_bounds(&self, store: &mut ParamStore, param: ParamId, ctx: Context) {
        if let Some(bounds) = bounds_for(store, param, ctx) {
            store.set_bounds(param, bounds);
        }
    }

    /// Handle a change of `param` in `ctx` at `severity`.
    pub fn update<E: FilterEngine>(
        &mut self,
        state: &mut ControlState,
        engine: &mut E,
        param: ParamId,
        ctx: Context,
        severity: Severity,
    ) -> Option<Action> {
        if severity == Severity::None {
            return None;
        }
        self.refresh_bounds(&mut state.store, param, ctx);

        // These act on selection as well as on edits.
        match param {
            id::LEVELS => {
                state.level = LevelDisplay::Selected;
                return None;
            }
            id::REVERT_TO_LEVELS => {
                state.restart_auto_level();
                return None;
            }
            id::FIRMWARE => return Some(Action::ShowFirmware),
            id::SERIAL_NO => return Some(Action::ShowSerial),
            id::UF_TAP => {
                let index = state.store.get(id::UF_TAP, ctx).saturating_sub(1);
                let tap = usize::try_from(index)
                    .map(|k| state.store.user_fir_tap(ctx, k))
                    .unwrap_or(0);
                if severity >= Severity::Full {
                    let order = state.store.get(id::UF_ORDER, ctx);
                    self.load_user_fir(&state.store, engine, ctx, order);
                }
                return Some(Action::ShowTap(tap));
            }
            _ => {}
        }
        if severity == Severity::SelectionOnly {
            return None;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("dispatch: param {} ctx {} {}", param, ctx, severity);

        match param {
            id::FUNC => {
                self.gain(&state.store, engine, ctx);
                let first = state.store.function(ctx).first();
                return self.update(state, engine, first, ctx, Severity::Full);
            }
            id::FULL_SCALE_IN => self.set_all_gains(&state.store, engine),
            id::SAMPLE_RATE => {
                engine.set_sample_rate(state.store.sample_rate_hz());
                state.store.reset_frequencies();
                self.init_functions(state, engine);
            }
            id::INPUT_SRC => engine.set_white_noise(state.store.get(param, Context::A) != 0),
            id::MODE => self.init_functions(state, engine),
            id::CASCADE => engine.set_cascade(state.store.get(param, Context::A) != 0),
            id::INITIALIZE if severity == Severity::Confirmed => {
                return Some(Action::FactoryReset)
            }
            id::STORE | id::RECALL if severity == Severity::Confirmed => {
                let loc = u16::try_from(state.store.get(param, Context::A)).unwrap_or(0);
                return Some(if param == id::STORE {
                    Action::Store(loc)
                } else {
                    Action::Recall(loc)
                });
            }
            id::NF_GAIN => {
                self.gain(&state.store, engine, ctx);
                engine.silence(ctx.channels());
            }
            id::AP_GAIN => {
                self.gain(&state.store, engine, ctx);
                engine.pass_through(ctx.channels());
            }
            id::LP_GAIN | id::HP_GAIN | id::BP_GAIN | id::BS_GAIN | id::N_GAIN | id::IN_GAIN
            | id::UF_GAIN => self.gain(&state.store, engine, ctx),
            id::LP_FCUT | id::HP_FCUT => {
                let f1 = state.store.get(param, ctx);
                let order = state.store.get(param.saturating_add(1), ctx);
                self.load_fir(&state.store, engine, ctx, f1 as f32, 0.0, order);
            }
            id::LP_ORDER | id::HP_ORDER => {
                let f1 = state.store.get(param.saturating_sub(1), ctx);
                let order = state.store.get(param, ctx);
                self.load_fir(&state.store, engine, ctx, f1 as f32, 0.0, order);
            }
            id::BP_F1..=id::BP_ORDER | id::BS_F1..=id::BS_ORDER => {
                if let Some(band) = band_of(param) {
                    self.update_band(&mut state.store, engine, band, param, ctx);
                }
            }
            id::N_FNOTCH | id::IN_FCNTR => {
                let fnotch = state.store.get(param, ctx);
                let fwidth = state.store.get(param.saturating_add(1), ctx);
                self.load_notch(&state.store, engine, ctx, fnotch, fwidth);
            }
            id::N_FWIDTH | id::IN_FWIDTH => {
                let fnotch = state.store.get(param.saturating_sub(1), ctx);
                let fwidth = state.store.get(param, ctx);
                self.load_notch(&state.store, engine, ctx, fnotch, fwidth);
            }
            id::UF_ORDER => {
                state.store.put(id::UF_TAP, ctx, 1);
                let order = state.store.get(param, ctx);
                self.load_user_fir(&state.store, engine, ctx, order);
            }
            _ => {}
        }
        None
    }

    /// Program the engine for the current mode: gains and the active
    /// function of every context in use.
    pub fn init_functions<E: FilterEngine>(&mut self, state: &mut ControlState, engine: &mut E) {
        match state.store.mode() {
            Mode::Common => self.init_context(state, engine, Context::Common),
            Mode::Separate => {
                for order in LONG_ORDERS {
                    if state.store.get(order, Context::A) > 128 {
                        state.store.put(order, Context::A, 127);
                    }
                }
                self.init_context(state, engine, Context::A);
                self.init_context(state, engine, Context::B);
            }
            Mode::ChannelAOnly => {
                engine.silence(Channels::B);
                self.init_context(state, engine, Context::A);
            }
        }
    }

    fn init_context<E: FilterEngine>(
        &mut self,
        state: &mut ControlState,
        engine: &mut E,
        ctx: Context,
    ) {
        self.gain(&state.store, engine, ctx);
        let first = state.store.function(ctx).first();
        let _ = self.update(state, engine, first, ctx, Severity::Full);
    }

    /// Input full scale, then the output gain of every context in use.
    pub fn set_all_gains<E: FilterEngine>(&self, store: &ParamStore, engine: &mut E) {
        engine.set_input_full_scale(store.get(id::FULL_SCALE_IN, Context::A));
        if store.mode() == Mode::Common {
            self.gain(store, engine, Context::Common);
        } else {
            self.gain(store, engine, Context::A);
            self.gain(store, engine, Context::B);
        }
    }

    /// Output gain of the function assigned to `ctx`.
    pub fn gain<E: FilterEngine>(&self, store: &ParamStore, engine: &mut E, ctx: Context) {
        let gain = store.get(store.function(ctx).last(), ctx);
        engine.set_gain(ctx.channels(), gain);
    }

    /// Edge, center or width edit of a band filter. The other three values
    /// follow so that the band stays at least [`min_band_width`] wide.
    #[allow(clippy::cast_possible_truncation)] // frequencies ≤ 20000 Hz
    #[allow(clippy::cast_precision_loss)] // frequencies ≤ 20000 are exact in f32
    fn update_band<E: FilterEngine>(
        &mut self,
        store: &mut ParamStore,
        engine: &mut E,
        band: Band,
        param: ParamId,
        ctx: Context,
    ) {
        let fs = store.sample_rate_hz();
        let get = |store: &ParamStore, p: ParamId| store.get(p, ctx) as f32;
        let min_width = min_band_width(fs) as f32;
        let (mut f1, mut f2) = (get(store, band.f1), get(store, band.f2));

        if param == band.f1 {
            if f2 - f1 < min_width {
                f2 = f1 + min_width;
                store.put(band.f2, ctx, f2 as i32);
            }
            store.put(band.center, ctx, ((f1 + f2) / 2.0) as i32);
            store.put(band.width, ctx, (f2 - f1) as i32);
        } else if param == band.f2 {
            if f2 - f1 < min_width {
                f1 = f2 - min_width;
                store.put(band.f1, ctx, f1 as i32);
            }
            store.put(band.center, ctx, ((f1 + f2) / 2.0) as i32);
            store.put(band.width, ctx, (f2 - f1) as i32);
        } else if param == band.center {
            let half = get(store, band.width) / 2.0;
            let center = get(store, band.center);
            f1 = center - half;
            f2 = center + half;
            store.put(band.f1, ctx, f1 as i32);
            store.put(band.f2, ctx, f2 as i32);
            store.put(band.width, ctx, (f2 - f1) as i32);
        } else if param == band.width {
            let width = get(store, band.width);
            let center = get(store, band.center);
            f1 = center - width / 2.0;
            f2 = center + width / 2.0;
            let (lo, hi) = (F1_MIN.at(fs), F2_MAX.at(fs));
            if f1 < lo {
                f1 = lo;
                f2 = f1 + width;
            }
            if hi < f2 {
                f2 = hi;
                f1 = f2 - width;
            }
            store.put(band.f1, ctx, f1 as i32);
            store.put(band.f2, ctx, f2 as i32);
            store.put(band.center, ctx, ((f1 + f2) / 2.0) as i32);
        }

        let order = store.get(band.order, ctx);
        self.load_fir(store, engine, ctx, f1, f2, order);
    }

    #[allow(clippy::cast_precision_loss)] // rates ≤ 48000 are exact in f32
    fn load_fir<E: FilterEngine>(
        &mut self,
        store: &ParamStore,
        engine: &mut E,
        ctx: Context,
        f1: f32,
        f2: f32,
        order: i32,
    ) {
        let Ok(order) = usize::try_from(order) else {
            return;
        };
        let fs = store.sample_rate_hz() as f32;
        let function = store.function(ctx);
        match self
            .designer
            .design(function, f1, f2, order, fs, &mut self.taps)
        {
            Some(scale) => {
                if let Some(taps) = self.taps.get(..order) {
                    engine.load_fir(ctx.channels(), taps, scale);
                }
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("dispatch: no FIR for {} order {}", function, order);
            }
        }
    }

    fn load_user_fir<E: FilterEngine>(
        &mut self,
        store: &ParamStore,
        engine: &mut E,
        ctx: Context,
        order: i32,
    ) {
        let order = usize::try_from(order).unwrap_or(0).min(MAX_TAPS);
        for (k, slot) in self.taps.iter_mut().enumerate().take(order) {
            *slot = store.user_fir_tap(ctx, k);
        }
        if let Some(taps) = self.taps.get(..order) {
            engine.load_fir(ctx.channels(), taps, FirScale::Q15);
        }
    }

    #[allow(clippy::cast_precision_loss)] // values ≤ 48000 are exact in f32
    fn load_notch<E: FilterEngine>(
        &self,
        store: &ParamStore,
        engine: &mut E,
        ctx: Context,
        fnotch: i32,
        fwidth: i32,
    ) {
        let fs = store.sample_rate_hz() as f32;
        if let Some(coefficients) =
            design::notch(store.function(ctx), fnotch as f32, fwidth as f32, fs)
        {
            engine.load_notch(ctx.channels(), coefficients);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use params::{Function, Selection};
    use platform::mocks::{EngineCall, MockFilterEngine, Routine};

    fn state_with(mode: Mode, func: Function) -> ControlState {
        let mut store = ParamStore::factory();
        store.put(id::MODE, Context::A, mode as i32);
        for ctx in Context::ALL {
            store.put(id::FUNC, ctx, func as i32);
        }
        let _ = store.take_change();
        ControlState::new(store)
    }

    fn edit(
        d: &mut Dispatcher,
        s: &mut ControlState,
        e: &mut MockFilterEngine,
        param: ParamId,
        ctx: Context,
        value: i32,
    ) -> Option<Action> {
        d.refresh_bounds(&mut s.store, param, ctx);
        let v = s.store.get_bounds(param).clamp(value);
        s.store.set(param, ctx, v);
        let severity = s.store.take_change();
        d.update(s, e, param, ctx, severity)
    }

    #[test]
    fn func_change_initialises_new_function() {
        let mut d = Dispatcher::new();
        let mut e = MockFilterEngine::new();
        let mut s = state_with(Mode::Common, Function::LowPass);
        s.store.set(id::FUNC, Context::Common, Function::LowPass as i32);
        s.selection = Selection::home(Mode::Common);
        assert_eq!(d.dispatch(&mut s, &mut e), None);
        assert_eq!(e.routine(false), Routine::Fir(FirScale::Q16));
        assert_eq!(e.routine(true), Routine::Fir(FirScale::Q16));
        assert_eq!(e.taps(false).len(), 127);
        assert_eq!(e.gain(true), 100);
        assert_eq!(s.store.get_bounds(id::LP_FCUT), Bounds::new(200, 20_000));
    }

    #[test]
    fn selection_only_refreshes_bounds() {
        let mut d = Dispatcher::new();
        let mut e = MockFilterEngine::new();
        let mut s = state_with(Mode::Separate, Function::UserFir);
        s.store.put(id::UF_ORDER, Context::B, 40);
        let action = d.update(&mut s, &mut e, id::UF_TAP, Context::B, Severity::SelectionOnly);
        assert_eq!(action, Some(Action::ShowTap(0)));
        assert_eq!(s.store.get_bounds(id::UF_TAP), Bounds::new(1, 40));
        assert_eq!(e.calls().count(), 0);
    }

    #[test]
    fn confirmed_actions() {
        let mut d = Dispatcher::new();
        let mut e = MockFilterEngine::new();
        let mut s = state_with(Mode::Common, Function::AllPass);
        s.store.put(id::STORE, Context::A, 3);
        assert_eq!(
            d.update(&mut s, &mut e, id::STORE, Context::A, Severity::Full),
            None
        );
        assert_eq!(
            d.update(&mut s, &mut e, id::STORE, Context::A, Severity::Confirmed),
            Some(Action::Store(3))
        );
        assert_eq!(
            d.update(&mut s, &mut e, id::RECALL, Context::A, Severity::Confirmed),
            Some(Action::Recall(0))
        );
        assert_eq!(
            d.update(&mut s, &mut e, id::INITIALIZE, Context::A, Severity::Confirmed),
            Some(Action::FactoryReset)
        );
        assert_eq!(s.store.get_bounds(id::RECALL), Bounds::new(0, 4));
    }

    #[test]
    fn leaving_channel_a_only_caps_orders() {
        let mut d = Dispatcher::new();
        let mut e = MockFilterEngine::new();
        let mut s = state_with(Mode::ChannelAOnly, Function::HighPass);
        s.store.put(id::HP_ORDER, Context::A, 255);
        edit(&mut d, &mut s, &mut e, id::HP_ORDER, Context::A, 255);
        assert_eq!(e.taps(false).len(), 255);
        assert_eq!(e.routine(true), Routine::Silent);

        edit(&mut d, &mut s, &mut e, id::MODE, Context::A, 1);
        assert_eq!(s.store.get(id::HP_ORDER, Context::A), 127);
        assert_eq!(e.taps(false).len(), 127);
        assert_eq!(e.taps(true).len(), 127);
    }

    #[test]
    fn band_edges_push_each_other() {
        let mut d = Dispatcher::new();
        let mut e = MockFilterEngine::new();
        let mut s = state_with(Mode::Common, Function::BandPass);
        let c = Context::Common;
        // Factory band is 1000..2000 Hz.
        edit(&mut d, &mut s, &mut e, id::BP_F1, c, 1_900);
        assert_eq!(s.store.get(id::BP_F2, c), 2_300);
        assert_eq!(s.store.get(id::BP_FCNTR, c), 2_100);
        assert_eq!(s.store.get(id::BP_FWDTH, c), 400);

        edit(&mut d, &mut s, &mut e, id::BP_F2, c, 2_000);
        assert_eq!(s.store.get(id::BP_F1, c), 1_600);

        edit(&mut d, &mut s, &mut e, id::BP_FWDTH, c, 19_000);
        // Slid up against the lower limit.
        assert_eq!(s.store.get(id::BP_F1, c), 200);
        assert_eq!(s.store.get(id::BP_F2, c), 19_200);
        assert_eq!(s.store.get(id::BP_FCNTR, c), 9_700);

        edit(&mut d, &mut s, &mut e, id::BP_FCNTR, c, 30_000);
        // Clamped so the upper edge stays at the limit.
        assert_eq!(s.store.get(id::BP_F2, c), 20_000);
        assert_eq!(s.store.get(id::BP_F1, c), 1_000);
    }

    #[test]
    fn notch_and_user_fir() {
        let mut d = Dispatcher::new();
        let mut e = MockFilterEngine::new();
        let mut s = state_with(Mode::Common, Function::InvNotch);
        edit(&mut d, &mut s, &mut e, id::IN_FWIDTH, Context::Common, 500);
        assert!(matches!(
            e.calls().last(),
            Some(EngineCall::LoadNotch(Channels::Both, n)) if n.g2 == 0.5
        ));

        let mut s = state_with(Mode::Common, Function::UserFir);
        s.store.set_user_fir_tap(Context::Common, 0, 1234);
        s.store.put(id::UF_TAP, Context::Common, 9);
        edit(&mut d, &mut s, &mut e, id::UF_ORDER, Context::Common, 5);
        assert_eq!(s.store.get(id::UF_TAP, Context::Common), 1);
        assert_eq!(e.taps(false), &[1234, 0, 0, 0, 0]);
        assert_eq!(e.routine(false), Routine::Fir(FirScale::Q15));
    }

    #[test]
    fn levels_and_info_rows() {
        let mut d = Dispatcher::new();
        let mut e = MockFilterEngine::new();
        let mut s = state_with(Mode::Common, Function::AllPass);
        d.update(&mut s, &mut e, id::LEVELS, Context::A, Severity::SelectionOnly);
        assert_eq!(s.level, LevelDisplay::Selected);
        assert_eq!(
            d.update(&mut s, &mut e, id::SERIAL_NO, Context::A, Severity::SelectionOnly),
            Some(Action::ShowSerial)
        );
    }

    #[test]
    fn sample_rate_change_reloads_defaults() {
        let mut d = Dispatcher::new();
        let mut e = MockFilterEngine::new();
        let mut s = state_with(Mode::Common, Function::LowPass);
        s.store.put(id::LP_FCUT, Context::Common, 7_000);
        edit(&mut d, &mut s, &mut e, id::SAMPLE_RATE, Context::A, 0);
        assert_eq!(e.sample_rate(), 8_000);
        assert_ne!(s.store.get(id::LP_FCUT, Context::Common), 7_000);
        assert_eq!(min_band_width(8_000), 67);
        d.refresh_bounds(&mut s.store, id::LP_FCUT, Context::Common);
        assert_eq!(s.store.get_bounds(id::LP_FCUT), Bounds::new(33, 3_333));
    }
}
