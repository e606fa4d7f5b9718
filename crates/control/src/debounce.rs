//! Knob debouncing and the interrupt → foreground event channel.
//!
//! # Pins
//!
//! | Bit | Signal            | Level                   |
//! |-----|-------------------|-------------------------|
//! | 0   | Encoder phase A   | gray code low bit       |
//! | 1   | Encoder phase B   | gray code high bit      |
//! | 2   | Push switch       | active low              |
//!
//! On every pin-change interrupt the handler samples the pins for the
//! debounce window and hands the samples to [`Debouncer::process`]. Each pin
//! is majority-voted over the window. The resulting events go into an
//! [`InputQueue`] that the foreground drains once per tick.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use platform::{Direction, InputEvent};

/// Events one pin-change interrupt can produce.
pub type EventBatch = Vec<InputEvent, 2>;

/// Encoder fitted to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderType {
    /// Half-step encoder; phase-A-only changes are ignored
    Panasonic,
    /// One full gray cycle per detent
    #[default]
    Detent,
}

impl EncoderType {
    /// Direction for a `previous << 2 | current` gray transition.
    fn decode(self, transition: u8) -> Option<Direction> {
        match (self, transition) {
            (Self::Panasonic, 3 | 12 | 7 | 8) => Some(Direction::Ccw),
            (Self::Panasonic, 6 | 9 | 2 | 13) => Some(Direction::Cw),
            (Self::Detent, 7 | 8) => Some(Direction::Cw),
            (Self::Detent, 4 | 11) => Some(Direction::Ccw),
            _ => None,
        }
    }
}

/// Majority-vote debouncer for the knob.
#[derive(Debug)]
pub struct Debouncer {
    encoder: EncoderType,
    switch_down: bool,
    gray: u8,
}

impl Debouncer {
    /// Switch released, encoder at gray code 0.
    pub const fn new(encoder: EncoderType) -> Self {
        Self {
            encoder,
            switch_down: false,
            gray: 0,
        }
    }

    /// `true` while the debounced switch is down.
    pub fn switch_down(&self) -> bool {
        self.switch_down
    }

    /// Debounce one pin-change interrupt.
    ///
    /// `changed` has a bit set for every pin whose change raised the
    /// interrupt; `samples` are the pin levels read during the window.
    /// A switch edge comes out before a detent.
    pub fn process(&mut self, changed: u8, samples: &[u8]) -> EventBatch {
        let mut events = EventBatch::new();
        if samples.is_empty() {
            return events;
        }
        let half = samples.len() / 2;
        let highs = |bit: u8| samples.iter().filter(|&&s| s & (1 << bit) != 0).count();

        // The switch needs a clear low majority (6 of 9); a phase counts as
        // high on a simple majority (5 of 9).
        let down = highs(2) < half;
        if down != self.switch_down {
            self.switch_down = down;
            let edge = if down {
                InputEvent::ButtonPress
            } else {
                InputEvent::ButtonRelease
            };
            let _ = events.push(edge);
        }

        if self.encoder == EncoderType::Panasonic && changed & 0b001 != 0 {
            return events;
        }

        let previous = self.gray;
        self.gray = (u8::from(highs(1) > half) << 1) | u8::from(highs(0) > half);
        if let Some(direction) = self.encoder.decode((previous << 2) | self.gray) {
            let _ = events.push(InputEvent::Rotary(direction));
        }
        events
    }
}

/// Depth of the input event channel.
pub const CHANNEL_DEPTH: usize = 16;

/// Events from the pin-change interrupt to the foreground loop.
///
/// The interrupt only ever calls [`InputQueue::push`]; a full queue drops
/// the event instead of blocking.
pub struct InputQueue {
    channel: Channel<CriticalSectionRawMutex, InputEvent, CHANNEL_DEPTH>,
}

impl InputQueue {
    /// Empty queue, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Interrupt side: enqueue without blocking. Returns `false` when the
    /// queue was full and the event was dropped.
    pub fn push(&self, event: InputEvent) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("input: queue full, dropped {}", event);
                false
            }
        }
    }

    /// Interrupt side: push every event of a batch.
    pub fn push_all(&self, events: &EventBatch) -> usize {
        events.iter().filter(|&&event| self.push(event)).count()
    }

    /// Foreground side: next event, if any.
    pub fn pop(&self) -> Option<InputEvent> {
        self.channel.try_receive().ok()
    }

    /// Foreground side: discard everything pending.
    pub fn clear(&self) {
        self.channel.clear();
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
