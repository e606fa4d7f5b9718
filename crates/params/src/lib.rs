//! Parameter store — descriptor table, value cells, selection and formatting.
//!
//! Every setting of the module is a row in one table of `[A, B, Common]`
//! values. The first [`NDESCRIPTORS`] rows have a static [`Descriptor`]
//! (template text, labels, press-to-confirm flag); the remaining rows hold
//! the packed User-FIR taps.
//!
//! # Modules
//!
//! - [`descriptor`] — static descriptor table, [`Layout`] derivation, [`Function`] ranges
//! - [`store`] — [`ParamStore`] cells, bounds and the change [`Severity`]
//! - [`selection`] — [`Context`], [`Mode`] and the menu traversal in [`Selection::step`]
//! - [`format`] — number rendering shared by the LCD and serial replies
//! - [`serial`] — module serial number and its check digits

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![warn(missing_docs)]

pub mod descriptor;
pub mod format;
pub mod selection;
pub mod serial;
pub mod store;

pub use descriptor::{
    descriptor, Descriptor, Function, Layout, ParamId, ParamKind, NDESCRIPTORS, NPARAMS,
    OPTIONS_END, OPTIONS_START, USER_FIR_BASE,
};
pub use selection::{Context, Mode, Selection};
pub use serial::{valid_serial, SerialError, SerialNumber};
pub use store::{Bounds, ParamStore, Severity};
