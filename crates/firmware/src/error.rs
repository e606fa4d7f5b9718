//! Controller errors.
//!
//! Almost every failure the module can hit is reported to the operator on
//! the LCD and then absorbed. What is left here are the faults the caller of
//! the foreground loop has to know about.

use flash_log::LogError;
use thiserror_no_std::Error;

/// Faults returned by [`Controller`](crate::Controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// The settings log could not be brought into a usable state at startup.
    #[error("settings log unusable: {0}")]
    Log(LogError),
    /// The serial transmitter refused a reply.
    #[error("serial transmit failed")]
    Serial,
}

impl From<LogError> for ControlError {
    fn from(error: LogError) -> Self {
        Self::Log(error)
    }
}
