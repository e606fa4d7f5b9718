//! Front-panel event router.
//!
//! The knob is the only control. With the cursor on column 1 a turn walks
//! the menu; a press moves the cursor into the value field, where turns
//! change the digit under the cursor. Turning while held moves the cursor
//! instead, and the first turn after letting go of a held turn is
//! ignored. Press-to-confirm parameters (Initialize, Store, Recall) take a
//! second press to act; any turn cancels.

use params::{descriptor, Layout, ParamKind, Severity};
use platform::{Direction, InputEvent, TextDisplay};

use crate::screen::{place_cursor, redisplay, show_message, show_right};
use crate::state::{ControlState, LevelDisplay};

/// What the caller still has to do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reaction {
    /// Nothing further
    Handled,
    /// A menu section boundary was crossed: sound the boundary beep
    Boundary,
    /// A pending confirmation was cancelled; "Cancelled" is on the LCD
    Cancelled,
}

/// Knob state carried between events.
#[derive(Debug, Default)]
pub struct Router {
    held: bool,
    turned_while_held: bool,
}

impl Router {
    /// Knob released, no turn pending.
    pub const fn new() -> Self {
        Self {
            held: false,
            turned_while_held: false,
        }
    }

    /// `true` while the knob is pushed down.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Apply one debounced event to the selection, the cursor and the
    /// parameter values. Value and selection changes are left pending in
    /// the store for the dispatcher.
    pub fn handle<D: TextDisplay>(
        &mut self,
        event: InputEvent,
        state: &mut ControlState,
        display: &mut D,
    ) -> Reaction {
        let (press, turn) = match event {
            InputEvent::ButtonPress => {
                self.held = true;
                (true, None)
            }
            InputEvent::ButtonRelease => {
                self.held = false;
                (false, None)
            }
            InputEvent::Rotary(direction) => (false, Some(direction)),
        };
        state.flash_cursor = true;

        let reaction = match descriptor(state.selection.param) {
            Some(d) => self.route(press, turn, d, state, display),
            None => Reaction::Handled,
        };
        match event {
            InputEvent::Rotary(_) => self.turned_while_held = self.held,
            InputEvent::ButtonPress => self.turned_while_held = false,
            InputEvent::ButtonRelease => {}
        }
        reaction
    }

    fn route<D: TextDisplay>(
        &self,
        press: bool,
        turn: Option<Direction>,
        d: &params::Descriptor,
        state: &mut ControlState,
        display: &mut D,
    ) -> Reaction {
        if press && state.cursor != 1 && d.confirm {
            state.confirm_armed = true;
            state.level = LevelDisplay::Off;
            show_message(state, display, "Press to");
            display.show(d.confirm_name(), 10, false);
            place_cursor(state, display, 1, false);
            return Reaction::Handled;
        }

        if state.confirm_armed {
            if press {
                state.confirm_armed = false;
                state.store.raise(Severity::Confirmed);
            } else if turn.is_some() {
                state.confirm_armed = false;
                show_message(state, display, "Cancelled");
                return Reaction::Cancelled;
            }
            return Reaction::Handled;
        }

        if press || (self.held && turn == Some(Direction::Cw)) {
            let pos = cursor_right(state.cursor, &d.layout);
            place_cursor(state, display, pos, true);
            return Reaction::Handled;
        }
        if self.held && turn == Some(Direction::Ccw) {
            let pos = cursor_left(state.cursor, &d.layout);
            place_cursor(state, display, pos, true);
            return Reaction::Handled;
        }

        let Some(direction) = turn else {
            return Reaction::Handled;
        };
        if state.level == LevelDisplay::Auto {
            state.level = LevelDisplay::Off;
            let pos = state.saved_cursor;
            redisplay(state, display, pos);
            state.store.raise(Severity::SelectionOnly);
            return Reaction::Handled;
        }
        if self.turned_while_held {
            return Reaction::Handled;
        }

        state.level = LevelDisplay::Off;
        if state.cursor == 1 {
            let crossed = state.selection.step(direction, &state.store);
            redisplay(state, display, 1);
            state.store.raise(Severity::SelectionOnly);
            if crossed {
                return Reaction::Boundary;
            }
        } else {
            let selection = state.selection;
            let value = state.store.get(selection.param, selection.context);
            let edited = match d.layout.kind {
                ParamKind::Enumerated { labels } => step_label(value, labels.len(), direction),
                ParamKind::Numeric { .. } => {
                    let delta = digit_step(&d.layout, state.cursor).saturating_mul(direction.sign());
                    state
                        .store
                        .get_bounds(selection.param)
                        .clamp(value.saturating_add(delta))
                }
            };
            state.store.set(selection.param, selection.context, edited);
            let pos = state.cursor;
            show_right(state, display, pos);
        }
        Reaction::Handled
    }
}

/// Next cursor stop to the right: from column 1 into the ones digit, then
/// along the field skipping the decimal point, and back to column 1 past
/// the end.
pub fn cursor_right(cursor: u8, layout: &Layout) -> u8 {
    let start = i32::from(layout.start);
    let end = start.saturating_add(i32::from(layout.width()));
    let pos = if cursor == 1 {
        start.saturating_add(i32::from(layout.cursor_offset()))
    } else {
        let next = i32::from(cursor).saturating_add(1);
        if next >= end {
            1
        } else if is_point(next, layout) {
            next.saturating_add(1)
        } else {
            next
        }
    };
    u8::try_from(pos).unwrap_or(1)
}

/// Next cursor stop to the left: from column 1 onto the last digit, then
/// along the field skipping the decimal point, and back to column 1 before
/// the start.
pub fn cursor_left(cursor: u8, layout: &Layout) -> u8 {
    let start = i32::from(layout.start);
    let end = start.saturating_add(i32::from(layout.width()));
    let pos = if cursor == 1 {
        end.saturating_sub(1)
    } else {
        let prev = i32::from(cursor).saturating_sub(1);
        if prev < start {
            1
        } else if is_point(prev, layout) {
            prev.saturating_sub(1)
        } else {
            prev
        }
    };
    u8::try_from(pos).unwrap_or(1)
}

fn is_point(column: i32, layout: &Layout) -> bool {
    let frac = i32::from(layout.frac_digits());
    let end = i32::from(layout.start).saturating_add(i32::from(layout.width()));
    frac != 0 && column == end.saturating_sub(frac).saturating_sub(1)
}

/// Power of ten the digit under `cursor` stands for.
pub fn digit_step(layout: &Layout, cursor: u8) -> i32 {
    let end = i32::from(layout.start).saturating_add(i32::from(layout.width()));
    let frac = i32::from(layout.frac_digits());
    let cursor = i32::from(cursor);
    let right_of_point = frac == 0 || cursor >= end.saturating_sub(frac);
    let weight = if right_of_point {
        end.saturating_sub(cursor).saturating_sub(1)
    } else {
        end.saturating_sub(cursor).saturating_sub(2)
    };
    u32::try_from(weight)
        .ok()
        .filter(|w| *w <= 9)
        .and_then(|w| 10i32.checked_pow(w))
        .unwrap_or(1)
}

/// Step a label index around `count` labels.
fn step_label(value: i32, count: usize, direction: Direction) -> i32 {
    let Ok(count) = i32::try_from(count) else {
        return 0;
    };
    if count == 0 {
        return 0;
    }
    match direction {
        Direction::Cw => {
            let next = value.saturating_add(1);
            if next >= count {
                0
            } else {
                next
            }
        }
        Direction::Ccw => {
            let prev = value.saturating_sub(1);
            if prev < 0 {
                count.saturating_sub(1)
            } else {
                prev
            }
        }
    }
}
