//! FLASH settings log — append-only records in sector 3 with compaction.
//!
//! Each store appends one [`record`] holding the whole parameter image and
//! the storage location it belongs to. Recall scans the chain and loads the
//! latest record for a location. When the sector cannot hold another record
//! the live records are re-packed from a staging buffer.
//!
//! # Modules
//!
//! - [`record`] — header layout, [`RECORD_WORDS`], validation [`Identity`]
//! - [`programmer`] — [`SectorProgrammer`] and its [`Unlocked`] write guard
//! - [`log`] — [`FlashLog`]: store, recall, store-all, startup scan

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![warn(missing_docs)]

pub mod log;
pub mod programmer;
pub mod record;

pub use log::{FlashLog, LogError, LogHealth, Stage, StoreOutcome, MAX_RECORDS, STAGING_WORDS};
pub use programmer::{SectorProgrammer, Unlocked};
pub use record::{Identity, RecordHeader, HEADER_WORDS, RECORD_WORDS};
