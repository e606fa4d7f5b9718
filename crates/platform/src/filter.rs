//! DSP filter engine abstraction
//!
//! The sample-processing routines run in the audio interrupt and are opaque
//! to the control core. The core selects a routine per channel and loads its
//! coefficient tables; nothing here touches samples.

/// Which output channels a request applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channels {
    /// Channel A only
    A,
    /// Channel B only
    B,
    /// Both channels (common settings)
    Both,
}

impl Channels {
    /// `true` if channel A is affected.
    pub const fn includes_a(self) -> bool {
        matches!(self, Self::A | Self::Both)
    }

    /// `true` if channel B is affected.
    pub const fn includes_b(self) -> bool {
        matches!(self, Self::B | Self::Both)
    }
}

/// Quantisation of a FIR table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FirScale {
    /// Coefficients scaled by 32768 (center tap above 0.4999)
    Q15,
    /// Coefficients scaled by 65536
    Q16,
}

/// Two-stage lattice notch section.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NotchCoefficients {
    /// Center-frequency reflection coefficient, `-cos(2π·fn/fs)`
    pub k1: f32,
    /// Bandwidth reflection coefficient
    pub k2: f32,
    /// Direct-path mix
    pub g1: f32,
    /// All-pass-path mix
    pub g2: f32,
}

/// The DSP side of the module.
///
/// Implementations are expected to mute the affected outputs while a table
/// is being replaced.
pub trait FilterEngine {
    /// Route the channel(s) to silence (NoFunc).
    fn silence(&mut self, channels: Channels);

    /// Route input straight to output (AllPass).
    fn pass_through(&mut self, channels: Channels);

    /// Load a symmetric or user FIR table and select the FIR routine.
    fn load_fir(&mut self, channels: Channels, taps: &[i16], scale: FirScale);

    /// Load notch coefficients and select the notch routine.
    fn load_notch(&mut self, channels: Channels, coefficients: NotchCoefficients);

    /// Output gain in hundredths (100 = 1.00x).
    fn set_gain(&mut self, channels: Channels, hundredths: i32);

    /// Input full-scale level in volts peak-to-peak; sets codec input gain.
    fn set_input_full_scale(&mut self, vpp: i32);

    /// Codec sample rate.
    fn set_sample_rate(&mut self, hz: u32);

    /// Replace the analog input with the internal white-noise source.
    fn set_white_noise(&mut self, enabled: bool);

    /// Feed channel A's output into channel B.
    fn set_cascade(&mut self, enabled: bool);

    /// Run the input/output level meter.
    fn set_level_meter(&mut self, enabled: bool);
}
