//! Module configuration and constants
//!
//! Central values shared by every layer. Anything that ends up in a FLASH
//! record, on the LCD or in a serial reply references these constants rather
//! than hardcoding values.

/// The product name shown on the sign-on screen
pub const APP_NAME: &str = "Filter Module";

/// Crate version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Firmware version stamped into every FLASH record, displayed as `2.20`.
///
/// Records written by any other version fail validation and force a reseed.
pub const FIRMWARE_VERSION: u16 = 220;

/// Highest storage location code; locations are `0..=LAST_MEM_LOC`.
pub const LAST_MEM_LOC: u16 = 4;

/// Serial receive ring length. Must be a power of two.
pub const SERIAL_BUF_LEN: usize = 128;

/// Gain limit in hundredths (±100.00x).
pub const GAIN_MAX: i32 = 10_000;

/// Largest input full-scale setting in volts peak-to-peak.
pub const FULL_SCALE_MAX_VPP: i32 = 20;

/// Per-unit step of the `sendsn` random back-off, in microseconds.
pub const SENDSN_WAIT_US: u32 = 22;

/// Foreground ticks (5 ms each) per cursor blink phase.
pub const CURSOR_PERIOD: u16 = 50;

/// Length of one foreground tick in microseconds.
pub const TICK_US: u32 = 5_000;

/// Switch sampling window used by the debouncer, in microseconds.
pub const DEBOUNCE_US: u32 = 500;

/// Foreground ticks without a received byte before a half-finished command
/// (or an abandoned programming session) is dropped.
pub const PARSER_IDLE_TICKS: u16 = 400;

/// Auto-level display kicks in after this many idle cursor periods when
/// "RevertToLevels" is enabled.
pub const AUTO_LEVEL_PERIODS: u16 = 10;

// ── Frequency limits (fractions of the sample rate) ─────────────────────────

/// A frequency limit expressed as `numerator / 48000` of the sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateFraction(pub u32);

impl RateFraction {
    /// Scale the fraction to Hz at `sample_rate`.
    #[allow(clippy::arithmetic_side_effects)] // Safety: numerators ≤ 20000 and rates ≤ 48000 fit in u64
    #[allow(clippy::cast_precision_loss)] // product < 2^30, exact in f64
    pub fn at(self, sample_rate: u32) -> f32 {
        let hz = (u64::from(self.0) * u64::from(sample_rate)) as f64 / 48_000.0;
        #[allow(clippy::cast_possible_truncation)] // Hz values ≤ 20000 fit f32 exactly
        let hz = hz as f32;
        hz
    }
}

/// Low/high-pass cutoff, lower limit.
pub const FCUT_MIN: RateFraction = RateFraction(200);
/// Low/high-pass cutoff, upper limit.
pub const FCUT_MAX: RateFraction = RateFraction(20_000);
/// Band lower edge, lower limit.
pub const F1_MIN: RateFraction = RateFraction(200);
/// Band lower edge, upper limit.
pub const F1_MAX: RateFraction = RateFraction(19_600);
/// Band upper edge, lower limit.
pub const F2_MIN: RateFraction = RateFraction(600);
/// Band upper edge, upper limit.
pub const F2_MAX: RateFraction = RateFraction(20_000);
/// Minimum band width.
pub const FWIDTH_MIN: RateFraction = RateFraction(400);
/// Notch / inverse-notch center, lower limit.
pub const FNOTCH_MIN: RateFraction = RateFraction(200);
/// Notch / inverse-notch center, upper limit.
pub const FNOTCH_MAX: RateFraction = RateFraction(20_000);
/// Notch / inverse-notch width, lower limit.
pub const FNWIDTH_MIN: RateFraction = RateFraction(10);
/// Notch / inverse-notch width, upper limit.
pub const FNWIDTH_MAX: RateFraction = RateFraction(10_000);

/// Version string rendered the way the LCD and serial replies show it.
pub const fn version_banner() -> &'static str {
    "Filter V2.20"
}
