//! Low-power controls. (RM0481, 26.4.6)

use super::Adc;
use crate::{
    error::Result,
    regs::{RegisterBlock, cr},
    traits::Tick,
};

impl<R: RegisterBlock, T: Tick> Adc<R, T> {
    /// Turn off the ADC's voltage regulator. The ADC must be disabled. [`Adc::new`] turns it back
    /// on.
    pub fn disable_voltage_regulator(&self) -> Result<()> {
        let regs = self.regs();
        if regs.is_enabled() {
            return self.config_error();
        }
        regs.modify_cr(cr::ADVREGEN, 0);
        Ok(())
    }

    /// Enter deep power-down: the lowest-consumption state, which also switches off the
    /// regulator. The ADC must be disabled. Calibration is lost; recalibrate after leaving it.
    pub fn enter_deep_power_down(&self) -> Result<()> {
        let regs = self.regs();
        if regs.is_enabled() {
            return self.config_error();
        }
        regs.modify_cr(0, cr::DEEPPWD);
        Ok(())
    }
}
