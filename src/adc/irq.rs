//! Interrupt dispatch. Call [`Adc::on_interrupt`] from the ADC's interrupt handler, and
//! [`Adc::on_dma_event`] from the handler of the DMA channel moving regular results.

use super::{Adc, ErrorCode, StateFlags};
use crate::{
    dma::DmaInterrupt,
    regs::{Instance, Reg, RegisterBlock, cfgr, isr},
    traits::Tick,
};

/// Application hooks run from interrupt context. Each defaults to doing nothing.
pub trait AdcCallbacks {
    /// An injected conversion or sequence ended, per `eoc_selection`.
    fn injected_conversion_complete(&mut self, _adc: Instance) {}

    /// A context was written to JSQR while the queue was full.
    fn injected_queue_overflow(&mut self, _adc: Instance) {}

    fn level_out_of_window2(&mut self, _adc: Instance) {}

    fn level_out_of_window3(&mut self, _adc: Instance) {}

    /// The sampling phase of a regular conversion ended.
    fn end_of_sampling(&mut self, _adc: Instance) {}

    fn dma_complete(&mut self, _adc: Instance) {}

    fn dma_half_complete(&mut self, _adc: Instance) {}

    /// Regular overrun, or DMA transfer error. Details are in [`Adc::error_code`].
    fn error(&mut self, _adc: Instance) {}
}

impl<R: RegisterBlock, T: Tick> Adc<R, T> {
    /// Service the ADC's pending interrupts: update state, run callbacks, and clear the flags.
    pub fn on_interrupt(&self, cb: &mut impl AdcCallbacks) {
        let regs = self.regs();
        let flags = regs.read(Reg::Isr);
        let enabled = regs.read(Reg::Ier);
        let pending = |flag: u32| flags & flag != 0 && enabled & flag != 0;

        if pending(isr::EOSMP) {
            if !self.state.contains(StateFlags::ERROR_INTERNAL) {
                self.state.set(StateFlags::REG_EOSMP);
            }
            cb.end_of_sampling(self.instance);
            regs.clear_flags(isr::EOSMP);
        }

        if pending(isr::JEOC) || pending(isr::JEOS) {
            self.service_injected_end(flags, cb);
        }

        if pending(isr::AWD2) {
            self.state.set(StateFlags::AWD2);
            cb.level_out_of_window2(self.instance);
            regs.clear_flags(isr::AWD2);
        }

        if pending(isr::AWD3) {
            self.state.set(StateFlags::AWD3);
            cb.level_out_of_window3(self.instance);
            regs.clear_flags(isr::AWD3);
        }

        if pending(isr::OVR) {
            // In overwrite mode, without DMA, a missed result is expected.
            let cfgr_val = self.effective_regular_cfgr();
            if cfgr_val & cfgr::OVRMOD == 0 || self.dma_enabled(cfgr_val) {
                self.state.set(StateFlags::REG_OVR);
                self.error_code.set(ErrorCode::OVR);
                #[cfg(feature = "defmt")]
                defmt::warn!("ADC {}: overrun", self.instance);
                cb.error(self.instance);
            }
            regs.clear_flags(isr::OVR);
        }

        if pending(isr::JQOVF) {
            self.state.set(StateFlags::INJ_JQOVF);
            self.error_code.set(ErrorCode::JQOVF);
            #[cfg(feature = "defmt")]
            defmt::warn!("ADC {}: injected queue overflow", self.instance);
            regs.clear_flags(isr::JQOVF);
            cb.injected_queue_overflow(self.instance);
        }
    }

    fn service_injected_end(&self, flags: u32, cb: &mut impl AdcCallbacks) {
        let regs = self.regs();

        if !self.state.contains(StateFlags::ERROR_INTERNAL) {
            self.state.set(StateFlags::INJ_EOC);
        }

        let cfgr_val = self.effective_injected_cfgr();
        if self.injected_sequence_is_last(cfgr_val) && flags & isr::JEOS != 0 {
            if !regs.injected_ongoing() {
                regs.disable_interrupts(isr::JEOC | isr::JEOS);
                self.state.clear(StateFlags::INJ_BUSY);
                if !self.state.contains(StateFlags::REG_BUSY) {
                    self.state.set(StateFlags::READY);
                }
            } else {
                // JADSTART should have self-cleared after a final sequence.
                self.state.set(StateFlags::ERROR_INTERNAL);
                self.error_code.set(ErrorCode::INTERNAL);
            }
        }

        cb.injected_conversion_complete(self.instance);
        regs.clear_flags(isr::JEOC | isr::JEOS);
    }

    /// Handle an event of the DMA channel moving this ADC's regular results. For a multimode
    /// transfer, call on the master.
    pub fn on_dma_event(&self, event: DmaInterrupt, cb: &mut impl AdcCallbacks) {
        match event {
            DmaInterrupt::TransferComplete => {
                if !self
                    .state
                    .get()
                    .intersects(StateFlags::ERROR_INTERNAL | StateFlags::ERROR_DMA)
                {
                    self.state.set(StateFlags::REG_EOC);

                    // A one-shot, software-started sequence is over after its last transfer.
                    let cfgr_val = self.regs().read(Reg::Cfgr);
                    if self.regs().regular_trigger_is_software()
                        && cfgr_val & cfgr::CONT == 0
                        && !self.dma_continuous_requests()
                    {
                        self.state.clear(StateFlags::REG_BUSY);
                        if !self.state.contains(StateFlags::INJ_BUSY) {
                            self.state.set(StateFlags::READY);
                        }
                    }
                }
                cb.dma_complete(self.instance);
            }
            DmaInterrupt::HalfTransfer => cb.dma_half_complete(self.instance),
            DmaInterrupt::TransferError => {
                self.state.set(StateFlags::ERROR_DMA);
                self.error_code.set(ErrorCode::DMA);
                #[cfg(feature = "defmt")]
                defmt::warn!("ADC {}: DMA transfer error", self.instance);
                cb.error(self.instance);
            }
        }
    }

    /// DMA circular-request setting in effect: the common block's, when the pair converts together.
    fn dma_continuous_requests(&self) -> bool {
        #[cfg(multimode)]
        if self.multimode_mode() != super::MultimodeMode::Independent {
            let ccr_val = self.regs().read_common(crate::regs::CommonReg::Ccr);
            return ccr_val & crate::regs::ccr::DMACFG != 0;
        }
        self.regs().read(Reg::Cfgr) & cfgr::DMACFG != 0
    }

    fn dma_enabled(&self, cfgr_val: u32) -> bool {
        #[cfg(multimode)]
        if self.multimode_mode() != super::MultimodeMode::Independent {
            let ccr_val = self.regs().read_common(crate::regs::CommonReg::Ccr);
            return ccr_val & crate::regs::ccr::MDMA != 0;
        }
        cfgr_val & cfgr::DMAEN != 0
    }
}
