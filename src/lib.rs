//! Extended ADC driver for STM32H5 microcontrollers: calibration, the injected group with its
//! context queue, dual-ADC multimode with DMA, and low-power controls.
//!
//! Select your chip with a feature, eg `h563`, to get [`regs::Mmio`] wired to the PAC. Without a
//! chip feature, the driver runs over any [`regs::RegisterBlock`] implementation.
//!
//! Example:
//! ```ignore
//! use stm32_adc_ex::{adc::{Adc, AdcConfig, InputMode}, pac, regs::{Instance, Mmio}};
//!
//! let dp = pac::Peripherals::take().unwrap();
//! let regs = Mmio::new(dp.ADC1, dp.ADC2, dp.ADCC);
//! let adc = Adc::new(&regs, Instance::Adc1, AdcConfig::default(), || millis());
//! adc.calibrate(InputMode::SingleEnded)?;
//! ```

#![cfg_attr(not(test), no_std)]

// H5 PAC
#[cfg(feature = "h503")]
pub use stm32h5::stm32h503 as pac;

#[cfg(feature = "h562")]
pub use stm32h5::stm32h562 as pac;

#[cfg(feature = "h563")]
pub use stm32h5::stm32h563 as pac;

#[cfg(feature = "h573")]
pub use stm32h5::stm32h573 as pac;

/// Iteration bound for busy-waits with no tick source available.
pub const MAX_ITERS: u32 = 300_000;

pub mod adc;
pub mod dma;
pub mod error;
pub mod regs;
pub mod traits;
pub mod util;

#[cfg(test)]
mod sim;

pub use crate::{
    adc::{Adc, AdcConfig},
    error::{Error, Result},
    regs::Instance,
};
