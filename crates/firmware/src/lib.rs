//! Dual-channel DSP filter module firmware.
//!
//! Ties the parameter store, the FLASH settings log, the serial command
//! parser and the front-panel control core into the module's foreground
//! loop.
//!
//! # Architecture
//!
//! ```text
//! interrupts: UART rx → SerialRx      knob pins → Debouncer → InputQueue
//!                             ↓                                  ↓
//! foreground:        Controller::poll  (every 5 ms tick)
//!                             ↓
//!        FlashLog · Dispatcher → FilterEngine · TextDisplay · Annunciator
//! ```
//!
//! # Features
//!
//! - `defmt` - structured logging on the target
//! - `emulator` - desktop emulator binary (tokio, tracing)
//! - `std` - standard library (emulator and host tests)

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![warn(missing_docs)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod backoff;
pub mod controller;
pub mod error;

#[cfg(feature = "emulator")]
pub mod emulator;

pub use backoff::Lcg;
pub use controller::{Controller, ModuleRx, Peripherals};
pub use error::ControlError;
