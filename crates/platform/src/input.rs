//! Front-panel input events

/// Rotation direction of the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Clockwise
    Cw,
    /// Counter-clockwise
    Ccw,
}

impl Direction {
    /// `+1` for clockwise, `-1` otherwise.
    pub const fn sign(self) -> i32 {
        match self {
            Self::Cw => 1,
            Self::Ccw => -1,
        }
    }
}

/// Debounced actions from the knob.
///
/// The knob is both the encoder and the only push button, so "turned while
/// held" is expressed by a [`InputEvent::Rotary`] arriving between a
/// [`InputEvent::ButtonPress`] and its [`InputEvent::ButtonRelease`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// Knob pushed down
    ButtonPress,
    /// Knob released
    ButtonRelease,
    /// One encoder detent
    Rotary(Direction),
}
