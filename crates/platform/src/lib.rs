//! Hardware Abstraction Layer (HAL) for the dual-channel filter module
//!
//! This crate provides trait-based abstractions for every peripheral the
//! control core talks to, enabling development and testing without the
//! physical module.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: foreground loop, emulator)
//!         ↓
//! Feature Layers (params, flash-log, command, control)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (DSP peripherals, LCD, UART, FLASH)
//! ```
//!
//! # Peripheral seams
//!
//! - [`TextDisplay`] - 16-column character LCD, fed `(text, column, cursor)` triples
//! - [`Annunciator`] - panel speaker used for clicks and alert beeps
//! - [`FilterEngine`] - the DSP sample routines and their coefficient tables
//! - [`flash`] - FLASH geometry and [`FlashError`]; the device itself is an
//!   [`embedded_storage::nor_flash::NorFlash`]
//! - [`InputEvent`] - debounced encoder and push-button actions
//!
//! Serial transmit uses [`embedded_io::Write`] and busy-wait timing uses
//! [`embedded_hal::delay::DelayNs`] directly; neither needs a local trait.
//!
//! # Features
//!
//! - `std`: expose [`mocks`] outside of `cfg(test)` (host tests, emulator)
//! - `defmt`: derive `defmt::Format` on platform types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod display;
pub mod filter;
pub mod flash;
pub mod input;
pub mod mocks;

pub use display::{Annunciator, TextDisplay, LCD_COLUMNS};
pub use filter::{Channels, FilterEngine, FirScale, NotchCoefficients};
pub use flash::FlashError;
pub use input::{Direction, InputEvent};
