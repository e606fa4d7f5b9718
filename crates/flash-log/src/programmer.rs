//! Sector programmer: the only path that erases or writes the FLASH.
//!
//! The device starts locked. Writes are possible only through the
//! [`Unlocked`] guard returned by [`SectorProgrammer::unlock`], which locks
//! the device again when it goes out of scope, including on early returns.
//!
//! Every write stays inside one sector and never asks the part to turn a
//! `0` bit back into a `1`; such a request is refused before any byte is
//! touched.

use core::ops::{Deref, DerefMut};

use embedded_storage::nor_flash::NorFlash;
use platform::flash::{byte_offset, sector_of, FlashError, SECTOR_COUNT, SECTOR_WORDS};

/// Bytes moved per device call.
const CHUNK_BYTES: usize = 64;

/// Owns the FLASH device and its write lock.
pub struct SectorProgrammer<F> {
    flash: F,
    locked: bool,
}

impl<F> SectorProgrammer<F>
where
    F: NorFlash<Error = FlashError>,
{
    /// Wrap `flash`; the device starts locked.
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            locked: true,
        }
    }

    /// `true` outside an [`Unlocked`] scope.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Unlock writes until the returned guard is dropped.
    pub fn unlock(&mut self) -> Unlocked<'_, F> {
        self.locked = false;
        Unlocked { programmer: self }
    }

    /// The underlying device.
    pub fn device(&self) -> &F {
        &self.flash
    }

    /// Mutable access to the underlying device (fault injection in tests).
    pub fn device_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Release the device.
    pub fn into_inner(self) -> F {
        self.flash
    }

    /// Read `out.len()` words starting at `start_word`.
    pub fn read_words(&mut self, start_word: u32, out: &mut [u16]) -> Result<(), FlashError> {
        let mut addr = byte_offset(start_word);
        let mut buf = [0u8; CHUNK_BYTES];
        for words in out.chunks_mut(CHUNK_BYTES / 2) {
            let bytes = buf.get_mut(..words.len().saturating_mul(2)).ok_or(FlashError::Parameter)?;
            self.flash.read(addr, bytes)?;
            for (word, pair) in words.iter_mut().zip(bytes.chunks_exact(2)) {
                if let [hi, lo] = *pair {
                    *word = u16::from_be_bytes([hi, lo]);
                }
            }
            addr = addr.saturating_add(u32::try_from(bytes.len()).unwrap_or(u32::MAX));
        }
        Ok(())
    }

    /// Read one word.
    pub fn read_word(&mut self, word_addr: u32) -> Result<u16, FlashError> {
        let mut w = [0u16; 1];
        self.read_words(word_addr, &mut w)?;
        let [word] = w;
        Ok(word)
    }

    /// Program `words` at `start_word`, erasing the containing sector first
    /// when `erase` is set.
    ///
    /// `words` may be empty only for an erase-only call.
    pub fn program(&mut self, start_word: u32, words: &[u16], erase: bool) -> Result<(), FlashError> {
        if self.locked {
            #[cfg(feature = "defmt")]
            defmt::warn!("flash: program at {=u32:#x} while locked", start_word);
            return Err(FlashError::Locked);
        }
        let len = u32::try_from(words.len()).map_err(|_| FlashError::Parameter)?;
        if len == 0 && !erase {
            return Err(FlashError::Parameter);
        }
        let end = start_word.checked_add(len).ok_or(FlashError::Parameter)?;
        let last = end.saturating_sub(1).max(start_word);
        if end > SECTOR_COUNT.saturating_mul(SECTOR_WORDS) || sector_of(start_word) != sector_of(last) {
            return Err(FlashError::Parameter);
        }

        if erase {
            self.erase_sector(sector_of(start_word))?;
        }
        if len == 0 {
            return Ok(());
        }

        self.check_writable(start_word, words)?;

        let mut addr = byte_offset(start_word);
        let mut buf = [0u8; CHUNK_BYTES];
        for chunk in words.chunks(CHUNK_BYTES / 2) {
            let bytes = buf.get_mut(..chunk.len().saturating_mul(2)).ok_or(FlashError::Parameter)?;
            for (pair, word) in bytes.chunks_exact_mut(2).zip(chunk) {
                pair.copy_from_slice(&word.to_be_bytes());
            }
            self.flash.write(addr, bytes)?;
            addr = addr.saturating_add(u32::try_from(bytes.len()).unwrap_or(u32::MAX));
        }
        Ok(())
    }

    fn erase_sector(&mut self, sector: u32) -> Result<(), FlashError> {
        let from = byte_offset(sector.saturating_mul(SECTOR_WORDS));
        let to = byte_offset(sector.saturating_add(1).saturating_mul(SECTOR_WORDS));
        self.flash.erase(from, to)?;

        let mut buf = [0u8; CHUNK_BYTES];
        let mut addr = from;
        while addr < to {
            self.flash.read(addr, &mut buf)?;
            if buf.iter().any(|&b| b != 0xff) {
                #[cfg(feature = "defmt")]
                defmt::error!("flash: sector {} not blank after erase", sector);
                return Err(FlashError::EraseVerify);
            }
            addr = addr.saturating_add(u32::try_from(CHUNK_BYTES).unwrap_or(u32::MAX));
        }
        Ok(())
    }

    /// Refuse the whole write if any byte needs a 0 → 1 transition.
    fn check_writable(&mut self, start_word: u32, words: &[u16]) -> Result<(), FlashError> {
        let mut addr = byte_offset(start_word);
        let mut buf = [0u8; CHUNK_BYTES];
        for chunk in words.chunks(CHUNK_BYTES / 2) {
            let current = buf.get_mut(..chunk.len().saturating_mul(2)).ok_or(FlashError::Parameter)?;
            self.flash.read(addr, current)?;
            for (have, word) in current.chunks_exact(2).zip(chunk) {
                for (&h, w) in have.iter().zip(word.to_be_bytes()) {
                    if (h ^ w) & w != 0 {
                        return Err(FlashError::ProgramZeroToOne);
                    }
                }
            }
            addr = addr.saturating_add(u32::try_from(current.len()).unwrap_or(u32::MAX));
        }
        Ok(())
    }
}

/// Write access to the FLASH; relocks on drop.
pub struct Unlocked<'a, F>
where
    F: NorFlash<Error = FlashError>,
{
    programmer: &'a mut SectorProgrammer<F>,
}

impl<F> Deref for Unlocked<'_, F>
where
    F: NorFlash<Error = FlashError>,
{
    type Target = SectorProgrammer<F>;

    fn deref(&self) -> &Self::Target {
        self.programmer
    }
}

impl<F> DerefMut for Unlocked<'_, F>
where
    F: NorFlash<Error = FlashError>,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.programmer
    }
}

impl<F> Drop for Unlocked<'_, F>
where
    F: NorFlash<Error = FlashError>,
{
    fn drop(&mut self) {
        self.programmer.locked = true;
    }
}
