//! Front-panel control core: knob input, parameter editing and filter updates.
//!
//! Nothing here owns hardware. Every operation takes the peripherals it
//! drives ([`platform::TextDisplay`], [`platform::FilterEngine`]) as
//! arguments, so the same code runs on the module and under host tests.
//!
//! # Modules
//!
//! - [`debounce`] — majority-vote knob debouncer and the interrupt [`InputQueue`]
//! - [`router`] — knob events to cursor moves, value edits and confirmations
//! - [`dispatcher`] — parameter changes to bounds, filter tables and [`Action`]s
//! - [`design`] — windowed-sinc FIR and notch coefficient design
//! - [`screen`] — parameter lines and messages on the LCD
//! - [`state`] — the [`ControlState`] shared by all of the above

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![warn(missing_docs)]

pub mod debounce;
pub mod design;
pub mod dispatcher;
pub mod router;
pub mod screen;
pub mod state;

pub use debounce::{Debouncer, EncoderType, EventBatch, InputQueue};
pub use design::FirDesigner;
pub use dispatcher::{bounds_for, min_band_width, Action, Dispatcher};
pub use router::{Reaction, Router};
pub use state::{ControlState, LevelDisplay};
