//! Driver state and sticky error code. Both are read and updated from thread and interrupt
//! context, so they're held in atomics, and every update is a single read-modify-write.

use core::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use paste::paste;

use crate::error::Error;

bitflags! {
    /// What the driver believes the ADC is doing. Several bits can be set at once; eg a regular
    /// conversion running alongside an injected one.
    pub struct StateFlags: u32 {
        /// Enabled, or ready to be; no conversion in progress.
        const READY = 1 << 0;
        /// Calibration is running.
        const BUSY_INTERNAL = 1 << 1;
        const TIMEOUT = 1 << 2;

        const ERROR_INTERNAL = 1 << 4;
        const ERROR_CONFIG = 1 << 5;
        const ERROR_DMA = 1 << 6;

        const REG_BUSY = 1 << 8;
        const REG_EOC = 1 << 9;
        const REG_OVR = 1 << 10;
        const REG_EOSMP = 1 << 11;

        const INJ_BUSY = 1 << 12;
        const INJ_EOC = 1 << 13;
        const INJ_JQOVF = 1 << 14;

        const AWD1 = 1 << 16;
        const AWD2 = 1 << 17;
        const AWD3 = 1 << 18;

        /// This instance is a multimode slave; the master's start drives its conversions.
        const MULTIMODE_SLAVE = 1 << 20;
    }
}

bitflags! {
    /// Errors recorded since the last start cleared them.
    pub struct ErrorCode: u32 {
        const INTERNAL = 1 << 0;
        const OVR = 1 << 1;
        const DMA = 1 << 2;
        const JQOVF = 1 << 3;
        const TIMEOUT = 1 << 4;
        const CONFIG = 1 << 5;
    }
}

impl ErrorCode {
    /// The bit an error leaves behind. `Busy` leaves none: nothing was changed.
    pub fn from_error(e: Error) -> Self {
        match e {
            Error::Busy => Self::empty(),
            Error::Timeout => Self::TIMEOUT,
            Error::Config => Self::CONFIG,
            Error::Internal => Self::INTERNAL,
            Error::DmaError(_) => Self::DMA,
        }
    }
}

/// Make an atomic cell for one of the flag types above.
macro_rules! atomic_flags {
    ($name:ident, $flags:ty) => {
        paste! {
            pub(crate) struct [<Atomic $name>](AtomicU32);

            impl [<Atomic $name>] {
                pub const fn new(initial: $flags) -> Self {
                    Self(AtomicU32::new(initial.bits()))
                }

                pub fn get(&self) -> $flags {
                    <$flags>::from_bits_truncate(self.0.load(Ordering::Acquire))
                }

                pub fn contains(&self, flags: $flags) -> bool {
                    self.get().contains(flags)
                }

                pub fn set(&self, flags: $flags) {
                    self.0.fetch_or(flags.bits(), Ordering::AcqRel);
                }

                pub fn clear(&self, flags: $flags) {
                    self.0.fetch_and(!flags.bits(), Ordering::AcqRel);
                }

                /// Clear then set, as one update.
                pub fn clear_set(&self, clear: $flags, set: $flags) {
                    let _ = self
                        .0
                        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                            Some((v & !clear.bits()) | set.bits())
                        });
                }

                pub fn reset(&self) {
                    self.0.store(0, Ordering::Release);
                }
            }
        }
    };
}

atomic_flags!(State, StateFlags);
atomic_flags!(ErrorCode, ErrorCode);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dma::DmaError;

    #[test]
    fn clear_set_is_one_update() {
        let s = AtomicState::new(StateFlags::READY | StateFlags::INJ_EOC);
        s.clear_set(StateFlags::READY | StateFlags::INJ_EOC, StateFlags::INJ_BUSY);
        assert_eq!(s.get(), StateFlags::INJ_BUSY);
    }

    #[test]
    fn busy_is_never_recorded() {
        assert!(ErrorCode::from_error(Error::Busy).is_empty());
        assert_eq!(
            ErrorCode::from_error(Error::DmaError(DmaError::Transfer)),
            ErrorCode::DMA
        );
    }

    #[test]
    fn error_code_accumulates() {
        let e = AtomicErrorCode::new(ErrorCode::empty());
        e.set(ErrorCode::JQOVF);
        e.set(ErrorCode::INTERNAL);
        assert!(e.contains(ErrorCode::JQOVF | ErrorCode::INTERNAL));
        e.clear(ErrorCode::JQOVF);
        assert_eq!(e.get(), ErrorCode::INTERNAL);
        e.reset();
        assert!(e.get().is_empty());
    }
}
