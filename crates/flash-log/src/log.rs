//! FlashLog — store, recall and reseed of the settings records.
//!
//! The chain starts at [`LOG_BASE`] and follows `next` pointers until a
//! header whose `next` word is still erased. Every traversed header must
//! carry this module's [`Identity`]; one bad header makes the whole log
//! corrupt.

use embedded_storage::nor_flash::NorFlash;
use params::ParamStore;
use platform::config::LAST_MEM_LOC;
use platform::flash::{FlashError, ERASED_WORD, LOG_BASE, LOG_END, SECTOR_WORDS};

use crate::programmer::SectorProgrammer;
use crate::record::{Identity, RecordHeader, HEADER_WORDS, RECORD_WORDS};

/// Minimum staging buffer length accepted by [`FlashLog::store`]: one full
/// sector.
pub const STAGING_WORDS: usize = SECTOR_WORDS as usize;

/// Highest number of records the log sector can chain.
pub const MAX_RECORDS: usize = STAGING_WORDS / RECORD_WORDS;

/// Operation in progress when the FLASH device failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Reading the chain
    Read,
    /// Re-programming compacted records
    Compact,
    /// Appending the new record
    Append,
    /// Erasing the log before a reseed
    Erase,
    /// Programming a host-supplied code image
    Program,
}

impl Stage {
    /// Eight-column label shown after `ProgERR<code>`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Read => "in Read ",
            Self::Compact => "inStore1",
            Self::Append => "inStore2",
            Self::Erase => "in Erase",
            Self::Program => "inUpdate",
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors from log operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogError {
    /// A header in the chain has the wrong version or serial number, or a
    /// link points outside the log.
    #[error("settings log is corrupt")]
    Corrupt,
    /// No record exists for the requested location.
    #[error("location has never been stored")]
    LocationBlank,
    /// The sector is still full after compaction.
    #[error("settings log is full")]
    Full,
    /// The staging buffer is shorter than [`STAGING_WORDS`].
    #[error("staging buffer too small")]
    Staging,
    /// Location code outside `0..=LAST_MEM_LOC`.
    #[error("bad location code")]
    Location,
    /// The FLASH device failed.
    #[error("flash error {error} {stage}")]
    Flash {
        /// What the log was doing
        stage: Stage,
        /// Device error
        error: FlashError,
    },
}

impl LogError {
    fn flash(stage: Stage) -> impl FnOnce(FlashError) -> LogError {
        move |error| LogError::Flash { stage, error }
    }
}

/// Result of a successful store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreOutcome {
    /// Location written
    pub location: u16,
    /// The log was compacted first
    pub compacted: bool,
}

/// State of the log found at power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogHealth {
    /// Nothing has been stored yet.
    Blank,
    /// A header failed validation.
    Corrupt,
    /// The chain is intact.
    Healthy {
        /// Number of records in the chain
        records: usize,
    },
}

/// End of the chain: first free word and the last record (0 when empty).
#[derive(Debug, Clone, Copy)]
struct ChainEnd {
    free: u16,
    last: u16,
}

/// The settings log over a FLASH device.
pub struct FlashLog<F> {
    programmer: SectorProgrammer<F>,
    identity: Identity,
}

impl<F> FlashLog<F>
where
    F: NorFlash<Error = FlashError>,
{
    /// Log over `programmer`, accepting records written by `identity`.
    pub fn new(programmer: SectorProgrammer<F>, identity: Identity) -> Self {
        Self {
            programmer,
            identity,
        }
    }

    /// Identity expected in every header.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// The sector programmer (code-image updates share the device).
    pub fn programmer(&mut self) -> &mut SectorProgrammer<F> {
        &mut self.programmer
    }

    /// Release the programmer.
    pub fn into_programmer(self) -> SectorProgrammer<F> {
        self.programmer
    }

    /// Append the current image as the newest record for `location`,
    /// compacting first when the sector has no room.
    ///
    /// `staging` must hold at least [`STAGING_WORDS`] words; its contents
    /// are clobbered.
    pub fn store(
        &mut self,
        location: u16,
        image: &ParamStore,
        staging: &mut [u16],
    ) -> Result<StoreOutcome, LogError> {
        if location > LAST_MEM_LOC {
            return Err(LogError::Location);
        }
        if staging.len() < STAGING_WORDS {
            return Err(LogError::Staging);
        }

        let mut end = self.walk(|_, _| {})?;
        let mut compacted = false;
        if !has_room(end.free) {
            #[cfg(feature = "defmt")]
            defmt::info!("flash log: compacting before store of location {}", location);
            end = self.compact(location, end.last, staging)?;
            compacted = true;
            if !has_room(end.free) {
                return Err(LogError::Full);
            }
        }

        let record = staging.get_mut(..RECORD_WORDS).ok_or(LogError::Staging)?;
        let next = end.free.saturating_add(record_len_u16());
        let header = RecordHeader::new(self.identity, next, end.last, location);
        let (head, body) = record.split_at_mut(HEADER_WORDS);
        head.copy_from_slice(&header.to_words());
        image.write_words(body);

        self.programmer
            .unlock()
            .program(u32::from(end.free), record, false)
            .map_err(LogError::flash(Stage::Append))?;

        #[cfg(feature = "defmt")]
        defmt::debug!("flash log: stored location {} at {=u16:#x}", location, end.free);
        Ok(StoreOutcome {
            location,
            compacted,
        })
    }

    /// Load the latest record for `location` into `into`.
    ///
    /// On any error `into` is left untouched.
    pub fn recall(
        &mut self,
        location: u16,
        into: &mut ParamStore,
        staging: &mut [u16],
    ) -> Result<(), LogError> {
        let mut found = None;
        self.walk(|ptr, header| {
            if header.location == location {
                found = Some(ptr);
            }
        })?;
        let ptr = found.ok_or(LogError::LocationBlank)?;

        let record = staging.get_mut(..RECORD_WORDS).ok_or(LogError::Staging)?;
        self.programmer
            .read_words(u32::from(ptr), record)
            .map_err(LogError::flash(Stage::Read))?;
        let body = record.get(HEADER_WORDS..).ok_or(LogError::Staging)?;
        if !into.load_words(body) {
            return Err(LogError::Staging);
        }
        Ok(())
    }

    /// Erase the log and store `image` to every location, highest first.
    pub fn store_all(&mut self, image: &ParamStore, staging: &mut [u16]) -> Result<(), LogError> {
        #[cfg(feature = "defmt")]
        defmt::warn!("flash log: reseeding all locations");
        self.programmer
            .unlock()
            .program(u32::from(LOG_BASE), &[ERASED_WORD], true)
            .map_err(LogError::flash(Stage::Erase))?;
        for location in (0..=LAST_MEM_LOC).rev() {
            self.store(location, image, staging)?;
        }
        Ok(())
    }

    /// Classify the log at power-up.
    pub fn startup_scan(&mut self) -> Result<LogHealth, LogError> {
        let first = self.read_header(LOG_BASE)?;
        if first.next == ERASED_WORD {
            return Ok(LogHealth::Blank);
        }
        let mut records = 0usize;
        match self.walk(|_, _| records = records.saturating_add(1)) {
            Ok(_) => Ok(LogHealth::Healthy { records }),
            Err(LogError::Corrupt) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("flash log: corrupt record after {} good ones", records);
                Ok(LogHealth::Corrupt)
            }
            Err(e) => Err(e),
        }
    }

    /// Every record in chain order with its word address.
    pub fn live_records(
        &mut self,
    ) -> Result<heapless::Vec<(u16, RecordHeader), MAX_RECORDS>, LogError> {
        let mut out = heapless::Vec::new();
        self.walk(|ptr, header| {
            let _ = out.push((ptr, *header));
        })?;
        Ok(out)
    }

    fn read_header(&mut self, ptr: u16) -> Result<RecordHeader, LogError> {
        let mut words = [0u16; HEADER_WORDS];
        self.programmer
            .read_words(u32::from(ptr), &mut words)
            .map_err(LogError::flash(Stage::Read))?;
        Ok(RecordHeader::from_words(words))
    }

    /// Follow `next` links from the base, calling `visit` on every valid
    /// record.
    fn walk(&mut self, mut visit: impl FnMut(u16, &RecordHeader)) -> Result<ChainEnd, LogError> {
        let mut ptr = LOG_BASE;
        let mut last = 0;
        loop {
            let header = self.read_header(ptr)?;
            if header.next == ERASED_WORD {
                return Ok(ChainEnd { free: ptr, last });
            }
            if !header.is_valid(self.identity) || header.next <= ptr || header.next > LOG_END {
                return Err(LogError::Corrupt);
            }
            visit(ptr, &header);
            last = ptr;
            ptr = header.next;
        }
    }

    /// Re-pack the latest record of every location except `location`
    /// (which is about to be written) and reprogram the sector.
    ///
    /// Walks `prev` links back from `last`, so the first record met for a
    /// location is its newest.
    fn compact(&mut self, location: u16, last: u16, staging: &mut [u16]) -> Result<ChainEnd, LogError> {
        let mut seen: u32 = 0;
        mark(&mut seen, location)?;

        let mut fill = 0usize;
        let mut prev_fill = 0usize;
        let mut kept = 0usize;
        let mut ptr = last;
        while ptr != 0 {
            let header = self.read_header(ptr)?;
            if !header.is_valid(self.identity) || (header.prev != 0 && header.prev >= ptr) {
                return Err(LogError::Corrupt);
            }
            if !is_marked(seen, header.location) {
                mark(&mut seen, header.location)?;
                let end = fill.checked_add(RECORD_WORDS).ok_or(LogError::Staging)?;
                let dst = staging.get_mut(fill..end).ok_or(LogError::Staging)?;
                self.programmer
                    .read_words(u32::from(ptr), dst)
                    .map_err(LogError::flash(Stage::Read))?;
                let prev_link = if kept == 0 { 0 } else { log_addr(prev_fill)? };
                RecordHeader::relink(dst, log_addr(end)?, prev_link);
                prev_fill = fill;
                fill = end;
                kept = kept.saturating_add(1);
            }
            ptr = header.prev;
        }

        let packed = staging.get(..fill).ok_or(LogError::Staging)?;
        self.programmer
            .unlock()
            .program(u32::from(LOG_BASE), packed, true)
            .map_err(LogError::flash(Stage::Compact))?;

        #[cfg(feature = "defmt")]
        defmt::info!("flash log: compacted to {} records", kept);
        Ok(ChainEnd {
            free: log_addr(fill)?,
            last: if kept == 0 { 0 } else { log_addr(prev_fill)? },
        })
    }
}

fn record_len_u16() -> u16 {
    u16::try_from(RECORD_WORDS).unwrap_or(u16::MAX)
}

/// `true` if a record starting at `free` fits in the log sector.
fn has_room(free: u16) -> bool {
    RECORD_WORDS <= usize::from(LOG_END.saturating_sub(free))
}

/// Word address of staging offset `offset` once programmed at the base.
fn log_addr(offset: usize) -> Result<u16, LogError> {
    u16::try_from(offset)
        .ok()
        .and_then(|o| LOG_BASE.checked_add(o))
        .ok_or(LogError::Corrupt)
}

fn is_marked(seen: u32, location: u16) -> bool {
    1u32.checked_shl(u32::from(location))
        .is_some_and(|bit| seen & bit != 0)
}

fn mark(seen: &mut u32, location: u16) -> Result<(), LogError> {
    let bit = 1u32
        .checked_shl(u32::from(location))
        .ok_or(LogError::Corrupt)?;
    *seen |= bit;
    Ok(())
}
