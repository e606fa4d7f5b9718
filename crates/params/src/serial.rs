//! Module serial number: six significant digits and four check digits.
//!
//! ```text
//! 0123456789
//! ######oess
//! ```
//!
//! `o` is the sum of digits 0, 2, 4 modulo 10, `e` the sum of digits 1, 3, 5
//! modulo 10 and `ss` the two-digit sum of `######oe`.

use thiserror_no_std::Error;

/// Length of a serial number including its check digits.
pub const SERIAL_LEN: usize = 10;

/// Code-image words holding the serial number, two ASCII bytes per word.
pub const SERIAL_WORDS: usize = SERIAL_LEN / 2;

/// Why a serial number was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// Not exactly ten characters.
    #[error("serial number must be ten digits")]
    Length,
    /// A character outside `0..=9`.
    #[error("serial number contains a non-digit")]
    NotDigit,
    /// The check digits do not match.
    #[error("serial number check digits do not match")]
    Checksum,
}

/// `true` when `digits` is a well-formed serial number with correct check
/// digits.
pub fn valid_serial(digits: &[u8]) -> bool {
    check(digits).is_ok()
}

// Safety: digits are 0..=9, every sum stays below 100
#[allow(clippy::arithmetic_side_effects)]
fn check(digits: &[u8]) -> Result<[u8; SERIAL_LEN], SerialError> {
    let raw: [u8; SERIAL_LEN] = digits.try_into().map_err(|_| SerialError::Length)?;
    let mut d = [0u8; SERIAL_LEN];
    for (out, &c) in d.iter_mut().zip(raw.iter()) {
        if !c.is_ascii_digit() {
            return Err(SerialError::NotDigit);
        }
        *out = c.wrapping_sub(b'0');
    }
    let [d0, d1, d2, d3, d4, d5, o, e, s1, s0] = d.map(u16::from);
    let odd = (d0 + d2 + d4) % 10;
    let even = (d1 + d3 + d5) % 10;
    let sum = d0 + d1 + d2 + d3 + d4 + d5 + odd + even;
    if odd != o || even != e || sum != 10 * s1 + s0 {
        return Err(SerialError::Checksum);
    }
    Ok(raw)
}

/// A validated serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialNumber {
    digits: [u8; SERIAL_LEN],
}

impl SerialNumber {
    /// Validate `text` (ten ASCII digits).
    pub fn parse(text: &str) -> Result<Self, SerialError> {
        Self::from_bytes(text.as_bytes())
    }

    /// Validate raw ASCII bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerialError> {
        check(bytes).map(|digits| Self { digits })
    }

    /// Build a serial number from six significant digits, computing the
    /// check digits.
    // Safety: digits are 0..=9, every sum stays below 100
    #[allow(
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        clippy::cast_possible_truncation
    )]
    pub fn with_check_digits(value: u32) -> Result<Self, SerialError> {
        if value > 999_999 {
            return Err(SerialError::Length);
        }
        let mut digits = [b'0'; SERIAL_LEN];
        let mut n = value;
        for slot in digits.iter_mut().take(6).rev() {
            *slot = b'0' + (n % 10) as u8;
            n /= 10;
        }
        let d = digits.map(|c| c.wrapping_sub(b'0'));
        let odd = (d[0] + d[2] + d[4]) % 10;
        let even = (d[1] + d[3] + d[5]) % 10;
        let sum = d[0] + d[1] + d[2] + d[3] + d[4] + d[5] + odd + even;
        digits[6] = b'0' + odd;
        digits[7] = b'0' + even;
        digits[8] = b'0' + sum / 10;
        digits[9] = b'0' + sum % 10;
        Self::from_bytes(&digits)
    }

    /// Serial number stored in a code image: [`SERIAL_WORDS`] words, high
    /// byte first.
    pub fn from_code_words(words: &[u16]) -> Result<Self, SerialError> {
        let words: [u16; SERIAL_WORDS] = words.try_into().map_err(|_| SerialError::Length)?;
        Self::from_bytes(&unpack(words))
    }

    /// The ten digits.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.digits).unwrap_or("")
    }

    /// The six significant digits as an integer.
    #[allow(clippy::arithmetic_side_effects)] // Safety: at most 999_999
    pub fn value(&self) -> u32 {
        self.digits
            .iter()
            .take(6)
            .fold(0u32, |acc, &c| acc * 10 + u32::from(c & 0x0f))
    }

    /// [`value`](Self::value) split into low and high 16-bit halves, as kept
    /// in FLASH record headers.
    #[allow(clippy::cast_possible_truncation)] // split into 16-bit halves
    pub fn words(&self) -> [u16; 2] {
        let v = self.value();
        [v as u16, (v >> 16) as u16]
    }

    /// The digits packed two per word, high byte first.
    pub fn code_words(&self) -> [u16; SERIAL_WORDS] {
        let mut out = [0u16; SERIAL_WORDS];
        for (word, pair) in out.iter_mut().zip(self.digits.chunks_exact(2)) {
            if let [hi, lo] = *pair {
                *word = u16::from_be_bytes([hi, lo]);
            }
        }
        out
    }
}

impl core::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `true` when a code image's serial block is blank (`"0000000000"`).
pub fn code_words_blank(words: &[u16]) -> bool {
    words.iter().all(|&w| w == 0x3030)
}

fn unpack(words: [u16; SERIAL_WORDS]) -> [u8; SERIAL_LEN] {
    let mut out = [0u8; SERIAL_LEN];
    for (pair, word) in out.chunks_exact_mut(2).zip(words) {
        pair.copy_from_slice(&word.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_good_serial() {
        // 1+2+0 = 3, 3+0+1 = 4, 1+3+2+0+0+1+3+4 = 14
        assert!(valid_serial(b"1320013414"));
        let sn = SerialNumber::parse("1320013414").unwrap();
        assert_eq!(sn.value(), 132_001);
        assert_eq!(sn.words(), [0x03a1, 0x0002]);
        assert_eq!(sn.to_string(), "1320013414");
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(SerialNumber::parse("132001341"), Err(SerialError::Length));
        assert_eq!(SerialNumber::parse("13200134a4"), Err(SerialError::NotDigit));
        assert_eq!(SerialNumber::parse("1320013415"), Err(SerialError::Checksum));
        assert_eq!(SerialNumber::parse("1320014414"), Err(SerialError::Checksum));
    }

    #[test]
    fn computes_check_digits() {
        let sn = SerialNumber::with_check_digits(132_001).unwrap();
        assert_eq!(sn.as_str(), "1320013414");
        let zero = SerialNumber::with_check_digits(0).unwrap();
        assert_eq!(zero.as_str(), "0000000000");
        let nines = SerialNumber::with_check_digits(999_999).unwrap();
        assert_eq!(nines.as_str(), "9999997768");
        assert!(SerialNumber::with_check_digits(1_000_000).is_err());
    }

    #[test]
    fn code_words_round_trip() {
        let sn = SerialNumber::parse("1320013414").unwrap();
        let words = sn.code_words();
        assert_eq!(words[0], u16::from_be_bytes(*b"13"));
        assert_eq!(SerialNumber::from_code_words(&words), Ok(sn));
        assert!(code_words_blank(&[0x3030; SERIAL_WORDS]));
        assert!(!code_words_blank(&words));
        assert!(SerialNumber::from_code_words(&[0xffff; SERIAL_WORDS]).is_err());
    }
}
