//! FLASH geometry and device errors
//!
//! The module's FLASH is a 64K-word part split into eight programmable
//! sectors of 0x2000 words. The control core addresses it in 16-bit words;
//! the block device underneath is byte addressed, so word `w` lives at byte
//! offsets `2w` (high byte) and `2w + 1` (low byte).
//!
//! The device is driven through [`embedded_storage::nor_flash::NorFlash`]
//! with [`FlashError`] as its error type, so every device-level failure the
//! operator can be told about has a distinct variant.

use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// Words in one programmable sector.
pub const SECTOR_WORDS: u32 = 0x2000;

/// Bytes in one erasable sector.
pub const SECTOR_BYTES: u32 = SECTOR_WORDS * 2;

/// Number of sectors on the device.
pub const SECTOR_COUNT: u32 = 8;

/// Total device size in bytes.
pub const FLASH_BYTES: usize = (SECTOR_BYTES * SECTOR_COUNT) as usize;

/// Word address of the first settings record.
pub const LOG_BASE: u16 = 0x6000;

/// Last word of the settings log region (sector 3).
pub const LOG_END: u16 = 0x7fff;

/// Word offset of the serial-number block inside a sector 0/4 code image.
pub const SERIAL_LOC: usize = 0x0040;

/// Value of an erased word; also the end-of-chain sentinel.
pub const ERASED_WORD: u16 = 0xffff;

/// Convert a word address to the device byte offset.
pub const fn byte_offset(word_addr: u32) -> u32 {
    word_addr << 1
}

/// Sector index (0..8) holding `word_addr`.
pub const fn sector_of(word_addr: u32) -> u32 {
    word_addr / SECTOR_WORDS
}

/// Errors reported by the FLASH device or by the sector programmer guarding
/// it.
///
/// [`FlashError::code`] is the number shown to the operator as
/// `ProgERR<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Write attempted while the device is locked.
    #[error("flash is locked")]
    Locked,
    /// Start/length outside a single sector or outside the device.
    #[error("bad sector start or length")]
    Parameter,
    /// Sector erase did not complete in time.
    #[error("erase timeout")]
    EraseTimeout,
    /// Sector did not read back as all ones after erase.
    #[error("erase verify failed")]
    EraseVerify,
    /// Programming would need to turn a 0 bit back into a 1.
    #[error("cannot program 0 to 1 without erase")]
    ProgramZeroToOne,
    /// Byte program did not complete in time.
    #[error("program timeout")]
    ProgramTimeout,
}

impl FlashError {
    /// Operator-visible error number.
    pub const fn code(self) -> u8 {
        match self {
            Self::Locked | Self::Parameter => 1,
            Self::EraseTimeout => 2,
            Self::EraseVerify => 3,
            Self::ProgramZeroToOne => 4,
            Self::ProgramTimeout => 5,
        }
    }
}

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Self::Parameter => NorFlashErrorKind::OutOfBounds,
            _ => NorFlashErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_operator_table() {
        assert_eq!(FlashError::Locked.code(), 1);
        assert_eq!(FlashError::Parameter.code(), 1);
        assert_eq!(FlashError::EraseTimeout.code(), 2);
        assert_eq!(FlashError::EraseVerify.code(), 3);
        assert_eq!(FlashError::ProgramZeroToOne.code(), 4);
        assert_eq!(FlashError::ProgramTimeout.code(), 5);
    }

    #[test]
    fn log_region_is_sector_three() {
        assert_eq!(sector_of(u32::from(LOG_BASE)), 3);
        assert_eq!(sector_of(u32::from(LOG_END)), 3);
        assert_eq!(byte_offset(u32::from(LOG_BASE)), 0xc000);
    }
}
