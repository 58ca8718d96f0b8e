//! Self-calibration, and access to the resulting calibration factors. (RM0481, 26.4.8)

use super::{Adc, InputMode, StateFlags};
use crate::{
    error::{Error, Result},
    regs::{self, Reg, RegisterBlock, calfact, cr},
    traits::Tick,
};

/// Upper bound on ADCAL polls: 1.32 s worth of CPU cycles at the slowest ADC clock.
#[cfg(not(test))]
const CALIBRATION_TIMEOUT: u32 = 633_600_000;
#[cfg(test)]
const CALIBRATION_TIMEOUT: u32 = 1_000;

impl<R: RegisterBlock, T: Tick> Adc<R, T> {
    /// Calibrate the ADC for single-ended or differential inputs. The ADC is disabled first, and
    /// left disabled. Run again after deep power-down, or if VREF+ changes by more than 10%.
    pub fn calibrate(&self, mode: InputMode) -> Result<()> {
        let guard = self.lock()?;
        let regs = self.regs();

        self.disable_internal()?;

        self.state
            .clear_set(StateFlags::REG_BUSY | StateFlags::INJ_BUSY, StateFlags::BUSY_INTERNAL);

        let dif = match mode {
            InputMode::SingleEnded => 0,
            InputMode::Differential => cr::ADCALDIF,
        };
        regs.modify_cr(cr::ADCALDIF, dif | cr::ADCAL);

        drop(guard);

        let mut i = 0;
        while regs.calibrating() {
            i += 1;
            if i >= CALIBRATION_TIMEOUT {
                self.state
                    .clear_set(StateFlags::BUSY_INTERNAL, StateFlags::ERROR_INTERNAL);
                return self.fail(Error::Timeout);
            }
        }

        self.state.clear_set(StateFlags::BUSY_INTERNAL, StateFlags::READY);
        Ok(())
    }

    /// Read the calibration factor for an input mode.
    pub fn calibration_factor(&self, mode: InputMode) -> u8 {
        let val = self.regs().read(Reg::Calfact);
        let factor = match mode {
            InputMode::SingleEnded => val & calfact::CALFACT_S,
            InputMode::Differential => {
                regs::field(val, calfact::CALFACT_D, calfact::CALFACT_D_POS)
            }
        };
        factor as u8
    }

    /// Load a calibration factor, eg one saved from an earlier calibration. The ADC must be enabled,
    /// with no conversion running. Factors are 7 bits.
    pub fn set_calibration_factor(&self, mode: InputMode, factor: u8) -> Result<()> {
        let _guard = self.lock()?;
        let regs = self.regs();

        if factor as u32 > calfact::CALFACT_S {
            return self.config_error();
        }

        if !regs.is_enabled() || regs.regular_ongoing() || regs.injected_ongoing() {
            self.error_code.set(super::ErrorCode::INTERNAL);
            return self.config_error();
        }

        match mode {
            InputMode::SingleEnded => regs.modify(Reg::Calfact, calfact::CALFACT_S, factor as u32),
            InputMode::Differential => regs.modify(
                Reg::Calfact,
                calfact::CALFACT_D,
                (factor as u32) << calfact::CALFACT_D_POS,
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adc::{AdcConfig, ErrorCode, tests::adc},
        regs::Instance,
        sim::SimAdc,
    };

    #[test]
    fn calibration_completes_and_leaves_ready() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.calibrate(InputMode::Differential).unwrap();

        assert_eq!(sim.calibrations[0].get(), 1);
        assert_ne!(sim.last_cr_write(Instance::Adc1) & cr::ADCALDIF, 0);
        let state = a.state();
        assert!(state.contains(StateFlags::READY));
        assert!(!state.contains(StateFlags::BUSY_INTERNAL));
    }

    #[test]
    fn calibration_disables_first() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.enable_internal().unwrap();
        a.calibrate(InputMode::SingleEnded).unwrap();
        assert!(!a.is_enabled());
        assert_eq!(sim.last_cr_write(Instance::Adc1) & cr::ADCALDIF, 0);
    }

    #[test]
    fn calibration_times_out_when_adcal_stays_set() {
        let sim = SimAdc::new();
        sim.stuck_calibration.set(true);
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());

        assert_eq!(a.calibrate(InputMode::SingleEnded), Err(Error::Timeout));
        assert_eq!(sim.calibrations[0].get(), 1);
        let state = a.state();
        assert!(state.contains(StateFlags::ERROR_INTERNAL));
        assert!(!state.contains(StateFlags::BUSY_INTERNAL));
        assert!(a.error_code().contains(ErrorCode::TIMEOUT));

        // The lock isn't held after the failure.
        sim.stuck_calibration.set(false);
        sim.poke(Instance::Adc1, Reg::Cr, cr::ADVREGEN);
        a.calibrate(InputMode::SingleEnded).unwrap();
        assert!(a.state().contains(StateFlags::READY));
    }

    #[test]
    fn calibration_fails_when_disable_fails() {
        let sim = SimAdc::new();
        sim.stuck_enabled.set(true);
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.enable_internal().unwrap();

        assert_eq!(a.calibrate(InputMode::SingleEnded), Err(Error::Internal));
        assert_eq!(sim.calibrations[0].get(), 0);
        assert!(a.state().contains(StateFlags::ERROR_INTERNAL));
        assert!(a.error_code().contains(ErrorCode::INTERNAL));
    }

    #[test]
    fn factor_round_trips_when_enabled_and_idle() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.enable_internal().unwrap();

        a.set_calibration_factor(InputMode::SingleEnded, 0x55).unwrap();
        a.set_calibration_factor(InputMode::Differential, 0x2A).unwrap();
        assert_eq!(a.calibration_factor(InputMode::SingleEnded), 0x55);
        assert_eq!(a.calibration_factor(InputMode::Differential), 0x2A);
    }

    #[test]
    fn factor_rejected_when_disabled() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());

        assert_eq!(
            a.set_calibration_factor(InputMode::SingleEnded, 3),
            Err(Error::Config)
        );
        assert_eq!(sim.peek(Instance::Adc1, Reg::Calfact), 0);
        assert!(a.state().contains(StateFlags::ERROR_CONFIG));
        assert!(a.error_code().contains(ErrorCode::INTERNAL | ErrorCode::CONFIG));
    }

    #[test]
    fn factor_rejected_while_converting() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.enable_internal().unwrap();
        a.regs().set_cr(cr::ADSTART);

        assert_eq!(
            a.set_calibration_factor(InputMode::Differential, 3),
            Err(Error::Config)
        );
    }

    #[test]
    fn factor_wider_than_seven_bits_rejected() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.enable_internal().unwrap();
        assert_eq!(
            a.set_calibration_factor(InputMode::SingleEnded, 0x80),
            Err(Error::Config)
        );
    }
}
