//! Stopping the regular group while leaving the injected group running.

use super::{Adc, Group, StateFlags};
use crate::{
    dma::DmaTransfer,
    error::{Error, Result},
    regs::{Reg, RegisterBlock, cfgr, isr},
    traits::Tick,
};

impl<R: RegisterBlock, T: Tick> Adc<R, T> {
    /// Stop regular conversions. The ADC is disabled only if no injected conversion is running.
    pub fn stop_regular(&self) -> Result<()> {
        let _guard = self.lock()?;
        self.stop_conversion_internal(Group::Regular)?;
        self.state.clear(StateFlags::REG_BUSY);
        self.finish_regular_stop()
    }

    /// As [`Self::stop_regular`], also disabling the EOC, EOS and overrun interrupts.
    pub fn stop_regular_interrupt(&self) -> Result<()> {
        let _guard = self.lock()?;
        self.stop_conversion_internal(Group::Regular)?;
        self.state.clear(StateFlags::REG_BUSY);
        self.regs()
            .disable_interrupts(isr::EOC | isr::EOS | isr::OVR);
        self.finish_regular_stop()
    }

    /// As [`Self::stop_regular`], for a conversion moved by DMA: DMA requests are disabled, and the
    /// channel is aborted. The ADC is still disabled if the abort fails.
    pub fn stop_regular_dma<D: DmaTransfer>(&self, dma: &mut D) -> Result<()> {
        let _guard = self.lock()?;
        let regs = self.regs();

        self.stop_conversion_internal(Group::Regular)?;
        self.state.clear(StateFlags::REG_BUSY);

        regs.modify(Reg::Cfgr, cfgr::DMAEN, 0);
        let aborted = self.abort_dma(dma);
        regs.disable_interrupts(isr::OVR);

        if !regs.injected_ongoing() {
            let disabled = self.disable_internal();
            aborted?;
            disabled?;
            self.state.clear_set(StateFlags::INJ_BUSY, StateFlags::READY);
        } else {
            self.state.set(StateFlags::INJ_BUSY);
            aborted?;
        }
        Ok(())
    }

    /// Disable the ADC if the injected group is idle; otherwise mark it still busy.
    fn finish_regular_stop(&self) -> Result<()> {
        if !self.regs().injected_ongoing() {
            self.disable_internal()?;
            self.state.clear_set(StateFlags::INJ_BUSY, StateFlags::READY);
        } else {
            self.state.set(StateFlags::INJ_BUSY);
        }
        Ok(())
    }

    /// Abort a DMA transfer, recording a failure.
    pub(crate) fn abort_dma<D: DmaTransfer>(&self, dma: &mut D) -> Result<()> {
        dma.abort().map_err(|e| {
            self.state.set(StateFlags::ERROR_DMA);
            self.error_code.set(super::ErrorCode::DMA);
            #[cfg(feature = "defmt")]
            defmt::warn!("ADC {}: DMA abort failed: {}", self.instance, e);
            Error::DmaError(e)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::vec::Vec;

    use super::*;
    use crate::{
        adc::{AdcConfig, ErrorCode, tests::adc},
        dma::{DataSize, DmaError, DmaInterrupt, LinkedListNode, TransferMode},
        regs::{Instance, cr},
        sim::SimAdc,
    };

    /// Records what the driver asks of the DMA.
    pub(crate) struct MockDma {
        pub mode: TransferMode,
        pub size: DataSize,
        pub head: Option<LinkedListNode>,
        pub started: Option<(u32, u32, u32)>,
        pub list_started: bool,
        pub aborts: u32,
        pub fail_abort: bool,
        pub interrupts: Vec<DmaInterrupt>,
    }

    impl MockDma {
        pub fn new(mode: TransferMode, size: DataSize) -> Self {
            Self {
                mode,
                size,
                head: None,
                started: None,
                list_started: false,
                aborts: 0,
                fail_abort: false,
                interrupts: Vec::new(),
            }
        }
    }

    impl DmaTransfer for MockDma {
        fn mode(&self) -> TransferMode {
            self.mode
        }

        fn data_size(&self) -> DataSize {
            self.size
        }

        fn head_node(&mut self) -> Option<&mut LinkedListNode> {
            self.head.as_mut()
        }

        fn enable_interrupt(&mut self, interrupt: DmaInterrupt) {
            self.interrupts.push(interrupt);
        }

        fn start(&mut self, src: u32, dst: u32, len: u32) -> core::result::Result<(), DmaError> {
            self.started = Some((src, dst, len));
            Ok(())
        }

        fn start_linked_list(&mut self) -> core::result::Result<(), DmaError> {
            self.list_started = true;
            Ok(())
        }

        fn abort(&mut self) -> core::result::Result<(), DmaError> {
            self.aborts += 1;
            if self.fail_abort {
                Err(DmaError::Timeout)
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn stop_regular_disables_when_injected_idle() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.enable_internal().unwrap();
        a.regs().set_cr(cr::ADSTART);
        a.state.set(StateFlags::REG_BUSY);

        a.stop_regular().unwrap();
        assert!(!a.is_enabled());
        assert!(a.state().contains(StateFlags::READY));
        assert!(!a.state().contains(StateFlags::REG_BUSY));
    }

    #[test]
    fn stop_regular_keeps_injected_running() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.enable_internal().unwrap();
        a.regs().set_cr(cr::ADSTART);
        a.regs().set_cr(cr::JADSTART);

        a.stop_regular_interrupt().unwrap();
        assert!(a.is_enabled());
        assert!(a.regs().injected_ongoing());
        assert!(a.state().contains(StateFlags::INJ_BUSY));
    }

    #[test]
    fn stop_regular_dma_disables_even_if_abort_fails() {
        let sim = SimAdc::new();
        let a = adc(&sim, Instance::Adc1, AdcConfig::default());
        a.enable_internal().unwrap();
        sim.poke(
            Instance::Adc1,
            Reg::Cfgr,
            sim.peek(Instance::Adc1, Reg::Cfgr) | cfgr::DMAEN,
        );
        a.regs().set_cr(cr::ADSTART);

        let mut dma = MockDma::new(TransferMode::Normal, DataSize::S16);
        dma.fail_abort = true;

        assert_eq!(
            a.stop_regular_dma(&mut dma),
            Err(Error::DmaError(DmaError::Timeout))
        );
        assert_eq!(dma.aborts, 1);
        assert!(!a.is_enabled());
        assert_eq!(sim.peek(Instance::Adc1, Reg::Cfgr) & cfgr::DMAEN, 0);
        assert!(a.state().contains(StateFlags::ERROR_DMA));
        assert!(a.error_code().contains(ErrorCode::DMA));
    }
}
