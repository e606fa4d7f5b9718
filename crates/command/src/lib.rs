//! Serial command interface — receive ring, parser and request resolution.
//!
//! Bytes arrive from the UART interrupt into a [`SerialRx`] ring. The
//! foreground feeds them one at a time to the [`Parser`], which turns
//! authorized lines into [`Event`]s. Parameter requests are resolved against
//! the descriptor table with [`resolve_name`] and [`parse_value`].
//!
//! # Modules
//!
//! - [`rx`] — interrupt-fed byte ring with the comm-error flag and intake mask
//! - [`parser`] — header, request, tap-list and program-session state machine
//! - [`resolve`] — name lookup, value parsing, built-in [`Command`]s

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![warn(missing_docs)]

pub mod parser;
pub mod resolve;
pub mod rx;

pub use parser::{Event, Parser, ParserContext, Request, FIELD_LEN, MAX_TAPS, PROGRAM_WORDS};
pub use resolve::{parse_value, resolve_name, string_compare, Command, ParseError, Value};
pub use rx::SerialRx;
