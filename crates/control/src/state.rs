//! Foreground control state shared by the router and the dispatcher.

use params::{ParamStore, Selection};
use platform::config::AUTO_LEVEL_PERIODS;

/// What the level meter is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LevelDisplay {
    /// Meter off, the parameter display is shown
    #[default]
    Off,
    /// Levels selected in the Options menu
    Selected,
    /// Shown automatically after the knob was left alone
    Auto,
}

impl LevelDisplay {
    /// `true` while the engine should run the meter.
    pub const fn is_on(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Everything the front panel and the dispatcher act on.
#[derive(Clone)]
pub struct ControlState {
    /// Parameter values, bounds and the pending change
    pub store: ParamStore,
    /// Parameter under the cursor
    pub selection: Selection,
    /// Cursor column (1 = selection column)
    pub cursor: u8,
    /// Cursor currently drawn
    pub cursor_visible: bool,
    /// Blink the cursor; cleared while the LCD shows literal text
    pub flash_cursor: bool,
    /// A "Press to …" confirmation is pending
    pub confirm_armed: bool,
    /// Level meter state
    pub level: LevelDisplay,
    /// Cursor column to restore when the auto level display is left
    pub saved_cursor: u8,
    /// Blink periods since the knob or the serial port was last used
    pub idle_periods: u16,
}

impl ControlState {
    /// State around `store`, with the selection on the home FUNC entry.
    pub fn new(store: ParamStore) -> Self {
        let selection = Selection::home(store.mode());
        Self {
            store,
            selection,
            cursor: 1,
            cursor_visible: false,
            flash_cursor: true,
            confirm_armed: false,
            level: LevelDisplay::Off,
            saved_cursor: 1,
            idle_periods: 0,
        }
    }

    /// Restart the auto-level countdown. With RevertToLevels off the count
    /// stays at 0 and never advances.
    pub fn restart_auto_level(&mut self) {
        self.idle_periods = u16::from(self.revert_to_levels());
    }

    /// Advance the countdown by one blink period. Returns `true` when the
    /// auto level display is due.
    pub fn tick_auto_level(&mut self) -> bool {
        if self.idle_periods == 0 {
            return false;
        }
        self.idle_periods = self.idle_periods.saturating_add(1);
        if self.idle_periods > AUTO_LEVEL_PERIODS {
            self.restart_auto_level();
            return true;
        }
        false
    }

    fn revert_to_levels(&self) -> bool {
        self.store
            .get(params::descriptor::id::REVERT_TO_LEVELS, params::Context::A)
            != 0
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use params::descriptor::id;
    use params::Context;

    #[test]
    fn auto_level_needs_revert_enabled() {
        let mut s = ControlState::new(ParamStore::factory());
        s.restart_auto_level();
        assert!((0..50).all(|_| !s.tick_auto_level()));

        s.store.put(id::REVERT_TO_LEVELS, Context::A, 1);
        s.restart_auto_level();
        let due: Vec<bool> = (0..11).map(|_| s.tick_auto_level()).collect();
        assert_eq!(due.iter().filter(|d| **d).count(), 1);
        assert!(due[9]);
    }

    #[test]
    fn level_display_on() {
        assert!(!LevelDisplay::Off.is_on());
        assert!(LevelDisplay::Selected.is_on());
        assert!(LevelDisplay::Auto.is_on());
    }
}
