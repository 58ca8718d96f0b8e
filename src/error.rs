//! Common error definitions.

use crate::dma::DmaError;

macro_rules! impl_from_error {
    ($error:ident) => {
        impl From<$error> for Error {
            fn from(error: $error) -> Self {
                Self::$error(error)
            }
        }
    };
}

/// Alias for Result<T, Error>.
pub type Result<T> = core::result::Result<T, Error>;

/// Collection of all errors that can occur.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A conversion is already running, or another context holds the handle. Nothing changed;
    /// this is not recorded in the handle's error code.
    Busy,
    /// Occurs when an expected change of a register doesn't happen in time.
    ///
    /// This is returned when a bounded loop exceeds its alotted tick count or iteration count.
    Timeout,
    /// The request can't be applied in the current state, or conflicts with the configuration.
    Config,
    /// The peripheral didn't respond as expected, eg it wouldn't enable or disable.
    Internal,
    /// Direct Memory Access (DMA) error
    DmaError(DmaError),
}

impl_from_error!(DmaError);
