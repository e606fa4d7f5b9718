//! Character LCD and speaker abstraction

/// Visible columns on each LCD line. Columns are 1-based.
pub const LCD_COLUMNS: u8 = 16;

/// Character LCD sink.
///
/// The control core only ever writes text fragments at a column and then
/// decides whether the single cursor is shown. Byte/nibble protocol and
/// timing live below this trait.
pub trait TextDisplay {
    /// Write `text` starting at 1-based `column`, then park the cursor at
    /// `column` and show it when `cursor` is `true`.
    ///
    /// An empty `text` only moves (or hides) the cursor. Text past column
    /// [`LCD_COLUMNS`] is clipped by the sink.
    fn show(&mut self, text: &str, column: u8, cursor: bool);
}

/// Panel speaker.
pub trait Annunciator {
    /// Toggle the speaker `cycles` times with the given half period.
    fn beep(&mut self, cycles: u16, half_period_us: u16);
}

/// Short click used for "stored"/"recalled" confirmation.
pub const BEEP_CONFIRM: (u16, u16) = (75, 400);

/// Alert used when the cursor crosses a menu section boundary.
pub const BEEP_BOUNDARY: (u16, u16) = (30, 550);

/// Long alert used for serial line errors.
pub const BEEP_ERROR: (u16, u16) = (200, 400);
