//! Random back-off for `sendsn`.
//!
//! Every module on the bus answers `at all sendsn`, so each waits a random
//! multiple of [`SENDSN_WAIT_US`] before replying. The generator is seeded
//! from the serial number and advanced once per foreground tick, which
//! spreads modules with close serial numbers further apart.

use platform::config::SENDSN_WAIT_US;

/// Linear congruential generator producing 15-bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// Largest value [`Lcg::next_value`] returns.
    pub const MAX: u16 = 0x7fff;

    /// Generator seeded with `seed`.
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Generator seeded from a six-digit serial number, modulo 2^15.
    pub const fn from_serial(value: u32) -> Self {
        Self::new(value & 0x7fff)
    }

    /// Next value in `0..=MAX`.
    #[allow(clippy::cast_possible_truncation)] // masked to 15 bits
    pub fn next_value(&mut self) -> u16 {
        self.state = self
            .state
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345);
        ((self.state >> 16) & u32::from(Self::MAX)) as u16
    }

    /// Next back-off delay in microseconds.
    pub fn next_delay_us(&mut self) -> u32 {
        SENDSN_WAIT_US.saturating_mul(u32::from(self.next_value()))
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_in_range_and_vary() {
        let mut rng = Lcg::from_serial(132_001);
        let values: Vec<u16> = (0..64).map(|_| rng.next_value()).collect();
        assert!(values.iter().all(|&v| v <= Lcg::MAX));
        assert!(values.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn same_serial_same_sequence() {
        let mut a = Lcg::from_serial(500_123);
        let mut b = Lcg::from_serial(500_123);
        let mut c = Lcg::from_serial(500_124);
        let sa: Vec<u16> = (0..8).map(|_| a.next_value()).collect();
        let sb: Vec<u16> = (0..8).map(|_| b.next_value()).collect();
        let sc: Vec<u16> = (0..8).map(|_| c.next_value()).collect();
        assert_eq!(sa, sb);
        assert_ne!(sa, sc);
    }

    #[test]
    fn delay_is_bounded() {
        let mut rng = Lcg::new(1);
        for _ in 0..100 {
            assert!(rng.next_delay_us() <= SENDSN_WAIT_US * u32::from(Lcg::MAX));
        }
    }
}
