//! On-FLASH record layout.
//!
//! ```text
//! word 0   next       word address of the following record (0xFFFF: none yet)
//! word 1   prev       word address of the preceding record (0: first)
//! word 2   version    FIRMWARE_VERSION of the writer
//! word 3-4 serial     module serial number, low half first
//! word 5   location   storage location code
//! word 6.. image      ParamStore::write_words
//! ```

use params::store::IMAGE_WORDS;
use params::SerialNumber;
use platform::config::FIRMWARE_VERSION;

/// Header words before the parameter image.
pub const HEADER_WORDS: usize = 6;

/// Length of one record in words.
pub const RECORD_WORDS: usize = HEADER_WORDS + IMAGE_WORDS;

/// Version and serial number every record in the log must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
    /// Firmware version word
    pub version: u16,
    /// Serial number, low then high half
    pub serial: [u16; 2],
}

impl Identity {
    /// Identity of the running module.
    pub fn of(serial: &SerialNumber) -> Self {
        Self {
            version: FIRMWARE_VERSION,
            serial: serial.words(),
        }
    }
}

/// Decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecordHeader {
    /// Next record address
    pub next: u16,
    /// Previous record address
    pub prev: u16,
    /// Firmware version of the writer
    pub version: u16,
    /// Serial number of the writer
    pub serial: [u16; 2],
    /// Storage location code
    pub location: u16,
}

impl RecordHeader {
    /// Header for a new record written by `identity`.
    pub fn new(identity: Identity, next: u16, prev: u16, location: u16) -> Self {
        Self {
            next,
            prev,
            version: identity.version,
            serial: identity.serial,
            location,
        }
    }

    /// Decode the first [`HEADER_WORDS`] words.
    pub fn from_words(words: [u16; HEADER_WORDS]) -> Self {
        let [next, prev, version, lo, hi, location] = words;
        Self {
            next,
            prev,
            version,
            serial: [lo, hi],
            location,
        }
    }

    /// Encode as header words.
    pub fn to_words(self) -> [u16; HEADER_WORDS] {
        let [lo, hi] = self.serial;
        [self.next, self.prev, self.version, lo, hi, self.location]
    }

    /// A header is valid iff it was written by this firmware version on
    /// this module.
    pub fn is_valid(&self, identity: Identity) -> bool {
        self.version == identity.version && self.serial == identity.serial
    }

    /// Rewrite the header words at the front of `record` with new links.
    pub fn relink(record: &mut [u16], next: u16, prev: u16) {
        if let Some([n, p]) = record.get_mut(..2).and_then(|s| <&mut [u16; 2]>::try_from(s).ok()) {
            *n = next;
            *p = prev;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_size() {
        assert_eq!(RECORD_WORDS, 1032);
        // Seven records fit in the 0x2000-word log sector.
        assert!(7 * RECORD_WORDS < 0x2000);
        assert!(8 * RECORD_WORDS > 0x2000);
    }

    #[test]
    fn header_words_round_trip() {
        let id = Identity {
            version: 220,
            serial: [0x03a1, 0x0002],
        };
        let h = RecordHeader::new(id, 0x6408, 0, 3);
        assert_eq!(h.to_words(), [0x6408, 0, 220, 0x03a1, 2, 3]);
        assert_eq!(RecordHeader::from_words(h.to_words()), h);
        assert!(h.is_valid(id));
        assert!(!h.is_valid(Identity { version: 219, ..id }));
        assert!(!h.is_valid(Identity {
            serial: [0x03a1, 3],
            ..id
        }));
    }

    #[test]
    fn relink_rewrites_pointers_only() {
        let mut rec = [1u16, 2, 220, 4, 5, 6, 7];
        RecordHeader::relink(&mut rec, 0x6408, 0x6000);
        assert_eq!(rec, [0x6408, 0x6000, 220, 4, 5, 6, 7]);
        let mut short = [9u16];
        RecordHeader::relink(&mut short, 1, 1);
        assert_eq!(short, [9]);
    }
}
