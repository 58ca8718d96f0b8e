//! Dual-ADC operation: ADC1 (master) and ADC2 (slave) converting together, with results packed in
//! the common data register and moved by one DMA channel. (RM0481, 26.4.31)

use super::{Adc, Group, STOP_CONVERSION_TIMEOUT_MS, Skipped, StateFlags, disable, enable};
use crate::{
    dma::{DmaInterrupt, DmaTransfer, MAX_BLOCK_BYTES, TransferMode},
    error::{Error, Result},
    regs::{self, CommonReg, RegisterBlock, ccr, isr},
    traits::Tick,
    util::wait_until,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// How the pair converts. (CCR DUAL field)
pub enum MultimodeMode {
    Independent = 0b0_0000,
    DualRegSimultInjSimult = 0b0_0001,
    DualRegSimultAltTrig = 0b0_0010,
    DualRegInterlInjSimult = 0b0_0011,
    DualInjSimult = 0b0_0101,
    DualRegSimult = 0b0_0110,
    DualRegInterl = 0b0_0111,
    DualAltTrig = 0b0_1001,
}

impl MultimodeMode {
    pub(crate) fn from_ccr(ccr: u32) -> Self {
        match ccr & ccr::DUAL {
            0b0_0001 => Self::DualRegSimultInjSimult,
            0b0_0010 => Self::DualRegSimultAltTrig,
            0b0_0011 => Self::DualRegInterlInjSimult,
            0b0_0101 => Self::DualInjSimult,
            0b0_0110 => Self::DualRegSimult,
            0b0_0111 => Self::DualRegInterl,
            0b0_1001 => Self::DualAltTrig,
            _ => Self::Independent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Packing of master and slave results for DMA. (CCR MDMA field)
pub enum MultiDmaAccess {
    /// Each ADC uses its own DMA request.
    Disabled = 0b00,
    /// One 32-bit transfer per pair of results: slave in the upper half.
    Bits12_10 = 0b10,
    /// One 16-bit transfer per pair of results: slave in the upper byte.
    Bits8_6 = 0b11,
}

/// Multimode settings, applied to the master.
#[derive(Clone, Debug)]
pub struct MultimodeConfig {
    pub mode: MultimodeMode,
    pub dma_access: MultiDmaAccess,
    /// Delay between the master's and slave's sampling phases in interleaved mode, in ADC clock
    /// cycles, 1-16. (CCR DELAY field)
    pub sampling_delay: u8,
}

impl Default for MultimodeConfig {
    fn default() -> Self {
        Self {
            mode: MultimodeMode::Independent,
            dma_access: MultiDmaAccess::Disabled,
            sampling_delay: 1,
        }
    }
}

/// Bytes moved for `items` of `item_bytes` each, if they fit in one DMA block.
fn block_len(items: usize, item_bytes: u32) -> Option<u32> {
    let len = u32::try_from(items).ok()?.checked_mul(item_bytes)?;
    (len <= MAX_BLOCK_BYTES).then_some(len)
}

/// Split a multimode result into (master, slave) halves.
pub fn split_multimode_value(val: u32) -> (u16, u16) {
    (val as u16, (val >> 16) as u16)
}

impl<R: RegisterBlock, T: Tick> Adc<R, T> {
    /// Configure the pair this master belongs to. DMA access is set whenever neither ADC runs a
    /// regular conversion; the mode and delay only while both ADCs are disabled. When they can't be
    /// set, this is reported as `Skipped::MULTIMODE_MODE`.
    pub fn configure_multimode(&self, cfg: &MultimodeConfig) -> Result<Skipped> {
        if !(1..=16).contains(&cfg.sampling_delay) {
            return self.config_error();
        }

        let _guard = self.lock()?;
        let Some(slave) = self.instance.slave() else {
            return self.config_error();
        };

        let regs = self.regs();
        if regs.regular_ongoing() || self.regs_of(slave).regular_ongoing() {
            return self.config_error();
        }

        let mut skipped = Skipped::empty();
        let mode_settable = !regs::any_common_enabled(&self.regs, self.instance);

        if cfg.mode != MultimodeMode::Independent {
            let mut dma = (cfg.dma_access as u32) << ccr::MDMA_POS;
            if self.cfg.dma_continuous_requests {
                dma |= ccr::DMACFG;
            }
            regs.modify_common(CommonReg::Ccr, ccr::MDMA | ccr::DMACFG, dma);

            if mode_settable {
                regs.modify_common(
                    CommonReg::Ccr,
                    ccr::DUAL | ccr::DELAY,
                    cfg.mode as u32 | ((cfg.sampling_delay as u32 - 1) << ccr::DELAY_POS),
                );
            } else {
                skipped |= Skipped::MULTIMODE_MODE;
            }
        } else {
            regs.modify_common(CommonReg::Ccr, ccr::MDMA | ccr::DMACFG, 0);

            if mode_settable {
                regs.modify_common(CommonReg::Ccr, ccr::DUAL | ccr::DELAY, 0);
            } else {
                skipped |= Skipped::MULTIMODE_MODE;
            }
        }

        Ok(skipped)
    }

    /// Start regular conversions on both ADCs of the pair, moving the packed results from the
    /// common data register into `buf` by DMA. Call on the master. `buf`'s element size must match
    /// the DMA data width, and the whole buffer must fit in one DMA block (64KB less one byte).
    /// In linked-list mode, the head node's length and addresses are overwritten.
    ///
    /// # Safety
    /// `buf` must stay valid, and not be accessed, until the transfer is stopped or complete.
    pub unsafe fn start_multimode_dma<D: DmaTransfer, W>(
        &self,
        dma: &mut D,
        buf: &mut [W],
    ) -> Result<()> {
        let regs = self.regs();

        if regs.regular_ongoing() {
            return Err(Error::Busy);
        }

        let guard = self.lock()?;

        let Some(slave) = self.instance.slave() else {
            return self.config_error();
        };

        let size = match dma.mode() {
            TransferMode::LinkedList => match dma.head_node() {
                Some(node) => node.src_data_size(),
                None => return self.config_error(),
            },
            TransferMode::Normal => dma.data_size(),
        };
        if size.bytes() as usize != core::mem::size_of::<W>() {
            return self.config_error();
        }
        let Some(len) = block_len(buf.len(), size.bytes()) else {
            return self.config_error();
        };

        self.enable_internal()?;
        enable(&self.regs_of(slave), &self.tick).map_err(|e| self.internal_error(e))?;

        self.state.clear_set(
            StateFlags::READY | StateFlags::REG_EOC | StateFlags::REG_OVR | StateFlags::REG_EOSMP,
            StateFlags::REG_BUSY,
        );
        self.error_code.reset();

        dma.enable_interrupt(DmaInterrupt::TransferComplete);
        dma.enable_interrupt(DmaInterrupt::HalfTransfer);
        dma.enable_interrupt(DmaInterrupt::TransferError);

        regs.clear_flags(isr::EOC | isr::EOS | isr::OVR);

        drop(guard);

        regs.enable_interrupts(isr::OVR);

        let src = regs.common_data_addr();
        let dst = buf.as_mut_ptr() as usize as u32;

        let started = match dma.mode() {
            TransferMode::LinkedList => {
                if let Some(node) = dma.head_node() {
                    node.set_block_size(len);
                    node.set_src(src);
                    node.set_dst(dst);
                }
                dma.start_linked_list()
            }
            TransferMode::Normal => dma.start(src, dst, len),
        };

        if let Err(e) = started {
            self.state.set(StateFlags::ERROR_DMA);
            return self.fail(Error::DmaError(e));
        }

        regs.set_cr(crate::regs::cr::ADSTART);
        Ok(())
    }

    /// Stop multimode conversions on both groups, abort the DMA, and disable both ADCs. Call on
    /// the master. Every step is attempted even if an earlier one fails; the first failure is
    /// returned.
    pub fn stop_multimode_dma<D: DmaTransfer>(&self, dma: &mut D) -> Result<()> {
        let _guard = self.lock()?;

        self.stop_conversion_internal(Group::Both)?;

        let Some(slave) = self.instance.slave() else {
            return self.config_error();
        };

        let regs = self.regs();
        let slave_regs = self.regs_of(slave);

        let mut result = Ok(());

        if !wait_until(&self.tick, STOP_CONVERSION_TIMEOUT_MS, || {
            !regs.regular_ongoing() && !slave_regs.regular_ongoing()
        }) {
            self.error_code.set(super::ErrorCode::TIMEOUT);
            result = Err(self.internal_error(Error::Timeout));
        }

        let aborted = self.abort_dma(dma);
        regs.disable_interrupts(isr::OVR);

        let slave_disabled = disable(&slave_regs, &self.tick).map_err(|e| self.internal_error(e));
        let master_disabled = self.disable_internal();

        result = result.and(aborted).and(master_disabled).and(slave_disabled);

        self.state.clear_set(
            StateFlags::REG_BUSY | StateFlags::INJ_BUSY,
            StateFlags::READY,
        );
        result
    }

    /// Stop the pair's regular conversions, and the DMA moving them. Injected conversions keep
    /// running; each ADC is disabled only if its injected group is idle.
    pub fn stop_regular_multimode_dma<D: DmaTransfer>(&self, dma: &mut D) -> Result<()> {
        let _guard = self.lock()?;

        self.stop_conversion_internal(Group::Regular)?;
        self.state.clear(StateFlags::REG_BUSY);

        let Some(slave) = self.instance.slave() else {
            return self.config_error();
        };

        let regs = self.regs();
        let slave_regs = self.regs_of(slave);

        if !wait_until(&self.tick, STOP_CONVERSION_TIMEOUT_MS, || {
            !regs.regular_ongoing() && !slave_regs.regular_ongoing()
        }) {
            self.state.set(StateFlags::ERROR_INTERNAL);
            return self.fail(Error::Timeout);
        }

        let aborted = self.abort_dma(dma);
        regs.disable_interrupts(isr::OVR);
        aborted?;

        if !regs.injected_ongoing() {
            self.disable_internal()?;
            if !slave_regs.injected_ongoing() {
                disable(&slave_regs, &self.tick).map_err(|e| self.internal_error(e))?;
            }
            self.state.clear_set(StateFlags::INJ_BUSY, StateFlags::READY);
        }
        Ok(())
    }

    /// Latest packed result: master in the lower half, slave in the upper. See
    /// [`split_multimode_value`].
    pub fn multimode_value(&self) -> u32 {
        self.regs().read_common(CommonReg::Cdr)
    }
}
