//! Channel context and menu selection.
//!
//! The knob walks one ordered menu whose shape depends on [`Mode`]:
//!
//! ```text
//! Common:        Common(FUNC, first..last) → Options → Common …
//! Separate:      A(FUNC, …) → B(FUNC, …) → Options → A …
//! ChannelAOnly:  A(FUNC, …) → Options → A …
//! ```
//!
//! [`Selection::step`] reports when a section boundary was crossed so the
//! caller can sound the boundary beep.

use platform::Direction;

use crate::descriptor::{ParamId, OPTIONS_END, OPTIONS_START};
use crate::store::ParamStore;

/// Which value column an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Context {
    /// Channel A (also used for every Options value)
    A,
    /// Channel B
    B,
    /// Both channels in Common mode
    Common,
}

impl Context {
    /// All contexts in column order.
    pub const ALL: [Context; 3] = [Context::A, Context::B, Context::Common];

    /// Column index into a parameter row.
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::Common => 2,
        }
    }

    /// Channels driven by this context.
    pub const fn channels(self) -> platform::Channels {
        match self {
            Self::A => platform::Channels::A,
            Self::B => platform::Channels::B,
            Self::Common => platform::Channels::Both,
        }
    }

    /// LCD indicator written in column 1 outside the Options menu.
    pub const fn indicator(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::Common => " ",
        }
    }
}

/// Channel mode (the value of Mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Both channels share the Common settings
    Common,
    /// A and B have independent functions
    Separate,
    /// B is silenced so A can run 256-tap filters
    ChannelAOnly,
}

impl Mode {
    /// Decode a stored Mode value; anything past Separate reads as
    /// ChannelAOnly.
    pub const fn from_value(value: i32) -> Self {
        match value {
            0 => Self::Common,
            1 => Self::Separate,
            _ => Self::ChannelAOnly,
        }
    }

    /// Context of the function menu the selection returns to.
    pub const fn home_context(self) -> Context {
        match self {
            Self::Common => Context::Common,
            Self::Separate | Self::ChannelAOnly => Context::A,
        }
    }
}

/// Parameter currently under the cursor.
///
/// Invariant: `in_options` implies `param` lies in
/// `OPTIONS_START..=OPTIONS_END` and `context` is A; otherwise `param` is 0
/// (FUNC) or inside the id range of the function assigned to `context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Selection {
    /// Selected parameter row
    pub param: ParamId,
    /// Selected value column
    pub context: Context,
    /// Cursor is in the device-options menu
    pub in_options: bool,
}

impl Selection {
    /// FUNC of the home context for `mode`.
    pub const fn home(mode: Mode) -> Self {
        Self {
            param: 0,
            context: mode.home_context(),
            in_options: false,
        }
    }

    /// A parameter in the Options menu.
    pub const fn option(param: ParamId) -> Self {
        Self {
            param,
            context: Context::A,
            in_options: true,
        }
    }

    /// Move one entry through the menu. Returns `true` when a section
    /// boundary (function ↔ Options, A ↔ B) was crossed.
    pub fn step(&mut self, direction: Direction, store: &ParamStore) -> bool {
        let func_a = store.function(Context::A);
        let func_b = store.function(Context::B);
        let func_c = store.function(Context::Common);
        let p = self.param;

        match (store.mode(), direction, self.in_options) {
            // ---- A&B Common ----
            (Mode::Common, Direction::Ccw, false) => {
                if p == 0 {
                    *self = Self::option(OPTIONS_END);
                } else if p == func_c.first() {
                    self.param = 0;
                    return true;
                } else {
                    self.param = p.saturating_sub(1);
                }
            }
            (Mode::Common, Direction::Cw, false) => {
                if p == 0 {
                    self.param = func_c.first();
                } else if p == func_c.last() {
                    *self = Self::option(OPTIONS_START);
                    return true;
                } else {
                    self.param = p.saturating_add(1);
                }
            }
            (Mode::Common, Direction::Ccw, true) => {
                if p == OPTIONS_START {
                    *self = self.function_entry(func_c.last(), Context::Common);
                } else {
                    return self.options_back();
                }
            }
            (Mode::Common, Direction::Cw, true) => {
                if p == OPTIONS_END {
                    *self = self.function_entry(0, Context::Common);
                    return true;
                }
                self.param = p.saturating_add(1);
            }

            // ---- A&B Separate ----
            (Mode::Separate, Direction::Ccw, false) => {
                if self.context == Context::A {
                    if p == 0 {
                        *self = Self::option(OPTIONS_END);
                    } else if p == func_a.first() {
                        self.param = 0;
                        return true;
                    } else {
                        self.param = p.saturating_sub(1);
                    }
                } else if p == 0 {
                    *self = self.function_entry(func_a.last(), Context::A);
                } else if p == func_b.first() {
                    self.param = 0;
                    return true;
                } else {
                    self.param = p.saturating_sub(1);
                }
            }
            (Mode::Separate, Direction::Cw, false) => {
                if self.context == Context::A {
                    if p == 0 {
                        self.param = func_a.first();
                    } else if p == func_a.last() {
                        *self = self.function_entry(0, Context::B);
                        return true;
                    } else {
                        self.param = p.saturating_add(1);
                    }
                } else if p == 0 {
                    self.param = func_b.first();
                } else if p == func_b.last() {
                    *self = Self::option(OPTIONS_START);
                    return true;
                } else {
                    self.param = p.saturating_add(1);
                }
            }
            (Mode::Separate, Direction::Ccw, true) => {
                if p == OPTIONS_START {
                    *self = self.function_entry(func_b.last(), Context::B);
                } else {
                    return self.options_back();
                }
            }

            // ---- Ch A Only ----
            (Mode::ChannelAOnly, Direction::Ccw, false) => {
                if p == 0 {
                    *self = Self::option(OPTIONS_END);
                } else if p == func_a.first() {
                    self.param = 0;
                    return true;
                } else {
                    self.param = p.saturating_sub(1);
                }
            }
            (Mode::ChannelAOnly, Direction::Cw, false) => {
                if p == 0 {
                    self.param = func_a.first();
                } else if p == func_a.last() {
                    *self = Self::option(OPTIONS_START);
                    return true;
                } else {
                    self.param = p.saturating_add(1);
                }
            }
            (Mode::ChannelAOnly, Direction::Ccw, true) => {
                if p == OPTIONS_START {
                    *self = self.function_entry(func_a.last(), Context::A);
                } else {
                    return self.options_back();
                }
            }

            // Separate and Ch A Only leave Options into A's FUNC.
            (Mode::Separate | Mode::ChannelAOnly, Direction::Cw, true) => {
                if p == OPTIONS_END {
                    *self = self.function_entry(0, Context::A);
                    return true;
                }
                self.param = p.saturating_add(1);
            }
        }
        false
    }

    fn function_entry(self, param: ParamId, context: Context) -> Self {
        Self {
            param,
            context,
            in_options: false,
        }
    }

    /// Step back inside Options; arriving on the first entry is a boundary.
    fn options_back(&mut self) -> bool {
        self.param = self.param.saturating_sub(1);
        self.param == OPTIONS_START
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{id, Function};

    fn store_with(mode: i32, a: Function, b: Function, c: Function) -> ParamStore {
        let mut s = ParamStore::factory();
        s.put(id::MODE, Context::A, mode);
        s.put(id::FUNC, Context::A, a as i32);
        s.put(id::FUNC, Context::B, b as i32);
        s.put(id::FUNC, Context::Common, c as i32);
        s
    }

    fn walk(sel: &mut Selection, dir: Direction, store: &ParamStore, n: usize) -> usize {
        (0..n).filter(|_| sel.step(dir, store)).count()
    }

    #[test]
    fn common_mode_full_cycle() {
        let s = store_with(0, Function::NoFunc, Function::NoFunc, Function::LowPass);
        let mut sel = Selection::home(Mode::Common);
        assert_eq!(sel.context, Context::Common);

        assert!(!sel.step(Direction::Cw, &s));
        assert_eq!(sel.param, id::LP_FCUT);
        walk(&mut sel, Direction::Cw, &s, 2);
        assert_eq!(sel.param, id::LP_GAIN);

        assert!(sel.step(Direction::Cw, &s));
        assert_eq!(sel, Selection::option(OPTIONS_START));

        // 12 more steps reach OPTIONS_END, one more wraps to FUNC.
        assert_eq!(walk(&mut sel, Direction::Cw, &s, 12), 0);
        assert_eq!(sel.param, OPTIONS_END);
        assert!(sel.step(Direction::Cw, &s));
        assert_eq!(sel, Selection::home(Mode::Common));
    }

    #[test]
    fn common_mode_ccw_boundaries() {
        let s = store_with(0, Function::NoFunc, Function::NoFunc, Function::Notch);
        let mut sel = Selection::home(Mode::Common);
        // FUNC → Options end is silent.
        assert!(!sel.step(Direction::Ccw, &s));
        assert_eq!(sel, Selection::option(OPTIONS_END));
        // Walking down to Options start beeps on arrival.
        assert_eq!(walk(&mut sel, Direction::Ccw, &s, 11), 0);
        assert_eq!(sel.param, OPTIONS_START + 1);
        assert!(sel.step(Direction::Ccw, &s));
        assert_eq!(sel.param, OPTIONS_START);
        // Options start → last Common function parameter.
        assert!(!sel.step(Direction::Ccw, &s));
        assert_eq!(sel.param, id::N_GAIN);
        assert_eq!(sel.context, Context::Common);
        assert!(!sel.in_options);
        walk(&mut sel, Direction::Ccw, &s, 2);
        assert_eq!(sel.param, id::N_FNOTCH);
        assert!(sel.step(Direction::Ccw, &s));
        assert_eq!(sel.param, 0);
    }

    #[test]
    fn separate_mode_visits_a_then_b_then_options() {
        let s = store_with(1, Function::AllPass, Function::HighPass, Function::NoFunc);
        let mut sel = Selection::home(Mode::Separate);
        assert_eq!(sel.context, Context::A);

        sel.step(Direction::Cw, &s);
        assert_eq!(sel.param, id::AP_GAIN);
        assert!(sel.step(Direction::Cw, &s));
        assert_eq!((sel.param, sel.context), (0, Context::B));

        sel.step(Direction::Cw, &s);
        assert_eq!(sel.param, id::HP_FCUT);
        walk(&mut sel, Direction::Cw, &s, 2);
        assert!(sel.step(Direction::Cw, &s));
        assert!(sel.in_options);

        // Back out of Options lands on B's last parameter.
        assert!(!sel.step(Direction::Ccw, &s));
        assert_eq!((sel.param, sel.context), (id::HP_GAIN, Context::B));

        // From B's FUNC, ccw goes to A's last parameter.
        let mut sel = Selection {
            param: 0,
            context: Context::B,
            in_options: false,
        };
        assert!(!sel.step(Direction::Ccw, &s));
        assert_eq!((sel.param, sel.context), (id::AP_GAIN, Context::A));
    }

    #[test]
    fn channel_a_only_skips_b() {
        let s = store_with(2, Function::UserFir, Function::BandPass, Function::NoFunc);
        let mut sel = Selection::home(Mode::ChannelAOnly);
        sel.step(Direction::Cw, &s);
        assert_eq!(sel.param, id::UF_ORDER);
        walk(&mut sel, Direction::Cw, &s, 2);
        assert!(sel.step(Direction::Cw, &s));
        assert!(sel.in_options);
        assert_eq!(walk(&mut sel, Direction::Cw, &s, 13), 1);
        assert_eq!(sel, Selection::home(Mode::ChannelAOnly));
    }

    #[test]
    fn selection_invariant_holds_on_long_walks() {
        for mode in 0..3 {
            let s = store_with(mode, Function::BandStop, Function::Notch, Function::LowPass);
            for dir in [Direction::Cw, Direction::Ccw] {
                let mut sel = Selection::home(Mode::from_value(mode));
                for _ in 0..200 {
                    sel.step(dir, &s);
                    if sel.in_options {
                        assert!((OPTIONS_START..=OPTIONS_END).contains(&sel.param));
                        assert_eq!(sel.context, Context::A);
                    } else {
                        let f = s.function(sel.context);
                        assert!(sel.param == 0 || f.owns(sel.param), "{sel:?}");
                        assert_ne!(sel.context == Context::Common, mode != 0);
                        if mode == 2 {
                            assert_eq!(sel.context, Context::A);
                        }
                    }
                }
            }
        }
    }
}
