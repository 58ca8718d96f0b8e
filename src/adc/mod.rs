//! Extended ADC driver for the STM32H5: calibration, the injected group, dual-ADC multimode with
//! DMA, and low power. (RM0481, chapter 26)
//!
//! One [`Adc`] handle per physical instance. Operations take `&self`, so a handle can sit in a
//! static and be used from both thread code and interrupt handlers; a non-reentrant try-lock
//! serializes configuration and start/stop sequences, and contention returns `Error::Busy`.
//! Every operation keeps [`StateFlags`] in step with the hardware.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use cfg_if::cfg_if;

use crate::{
    error::{Error, Result},
    regs::{AdcRegs, Instance, Reg, RegisterBlock, cfgr, cr, isr},
    traits::Tick,
    util::{self, wait_until},
};

mod calibration;
mod injected;
mod irq;
#[cfg(multimode)]
mod multimode;
mod power;
mod regular;
mod state;

pub use injected::{
    InjectedConfig, InjectedContext, InjectedContextBuilder, InjectedOutcome, InjectedRank,
    InjectedTrigger, Offset, OffsetSign, OffsetSlot, Oversampling, OversamplingRatio, Skipped,
    TriggerEdge,
};
pub use irq::AdcCallbacks;
#[cfg(multimode)]
pub use multimode::{MultiDmaAccess, MultimodeConfig, MultimodeMode, split_multimode_value};
pub use state::{ErrorCode, StateFlags};

use state::{AtomicErrorCode, AtomicState};

/// ADEN to ADRDY.
const ENABLE_TIMEOUT_MS: u32 = 2;
/// ADDIS to ADEN low.
const DISABLE_TIMEOUT_MS: u32 = 2;
/// ADSTP/JADSTP to ADSTART/JADSTART low.
const STOP_CONVERSION_TIMEOUT_MS: u32 = 5;
/// Longest conversion (640.5 cycle sampling, 256x oversampling) at the slowest ADC clock, in CPU
/// cycles.
const CONVERSION_TIME_MAX_CPU_CYCLES: u32 = 167_168;
/// Regulator start-up time, tADCVREG_STUP.
const REGULATOR_STARTUP_US: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// ADC resolution. (CFGR RES field)
pub enum Resolution {
    B12 = 0b00,
    B10 = 0b01,
    B8 = 0b10,
    B6 = 0b11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Which flag marks the end of a conversion, for polling and interrupts.
pub enum EocSelection {
    /// EOC / JEOC: after each channel.
    SingleConversion,
    /// EOS / JEOS: after the whole sequence.
    SequenceConversion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Single-ended, or differential input. (DIFSEL register). Also selects which calibration factor
/// is run or accessed.
pub enum InputMode {
    SingleEnded,
    Differential,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Sample time, in ADC clock cycles. (SMPRx SMP fields, and SMPR1 SMPPLUS)
pub enum SampleTime {
    T2_5 = 0b000,
    T6_5 = 0b001,
    T12_5 = 0b010,
    T24_5 = 0b011,
    T47_5 = 0b100,
    T92_5 = 0b101,
    T247_5 = 0b110,
    T640_5 = 0b111,
    /// Replaces 2.5 cycles for every channel of the instance.
    T3_5 = 0b1000,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// An ADC input. `In(n)` is the external channel n (0-19); the rest are internal channels, which
/// are routed to a fixed instance and channel number.
pub enum Channel {
    In(u8),
    /// ADC1 channel 16.
    TempSensor,
    /// ADC1 channel 17.
    VrefInt,
    /// ADC2 channel 16.
    Vbat,
    /// ADC2 channel 17.
    VddCore,
}

impl Channel {
    pub fn number(self) -> u8 {
        match self {
            Self::In(n) => n,
            Self::TempSensor | Self::Vbat => 16,
            Self::VrefInt | Self::VddCore => 17,
        }
    }

    pub(crate) fn is_valid(self) -> bool {
        self.number() <= 19
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Conversion group(s) an operation applies to.
pub enum Group {
    Regular,
    Injected,
    Both,
}

/// Init-time settings of the ADC. The extended operations consult these, eg to choose between the
/// per-conversion and per-sequence end flags.
#[derive(Clone, Debug)]
pub struct AdcConfig {
    pub resolution: Resolution,
    /// Defaults to `SingleConversion`.
    pub eoc_selection: EocSelection,
    /// Scan mode: convert every rank of a sequence, instead of only rank 1. Enables the injected
    /// multi-rank configuration protocol. Defaults to disabled.
    pub scan: bool,
    /// Regular group continuous mode. (CFGR CONT)
    pub continuous: bool,
    /// Regular group discontinuous mode. (CFGR DISCEN)
    pub discontinuous: bool,
    /// Keep issuing DMA requests after the last transfer, for circular DMA. (CFGR DMACFG)
    pub dma_continuous_requests: bool,
    /// Core clock speed, in Hz. Used to size settling delays.
    pub sysclk: u32,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::B12,
            eoc_selection: EocSelection::SingleConversion,
            scan: false,
            continuous: false,
            discontinuous: false,
            dma_continuous_requests: false,
            sysclk: 250_000_000,
        }
    }
}

/// Non-reentrant try-lock. Held only while registers and state are updated, never across a wait
/// for a conversion.
struct Lock(AtomicBool);

/// Releases the lock when dropped.
struct LockGuard<'a>(&'a AtomicBool);

impl Lock {
    const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    fn try_acquire(&self) -> Result<LockGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| LockGuard(&self.0))
            .map_err(|_| Error::Busy)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Represents an Analog to Digital Converter (ADC) peripheral.
pub struct Adc<R, T> {
    regs: R,
    tick: T,
    instance: Instance,
    cfg: AdcConfig,
    state: AtomicState,
    error_code: AtomicErrorCode,
    lock: Lock,
    /// Ranks still to be configured before the pending injected context is committed. 0: none
    /// pending.
    ctx_remaining: AtomicU32,
    /// JSQR image of the pending injected context.
    ctx_jsqr: AtomicU32,
}

impl<R: RegisterBlock, T: Tick> Adc<R, T> {
    /// Initialize an ADC instance: exit deep power-down, enable the voltage regulator, and apply
    /// `cfg`. The ADC kernel clock must be enabled. Run [`Self::calibrate`] before converting.
    pub fn new(regs: R, instance: Instance, cfg: AdcConfig, tick: T) -> Self {
        let result = Self {
            regs,
            tick,
            instance,
            cfg,
            state: AtomicState::new(StateFlags::empty()),
            error_code: AtomicErrorCode::new(ErrorCode::empty()),
            lock: Lock::new(),
            ctx_remaining: AtomicU32::new(0),
            ctx_jsqr: AtomicU32::new(0),
        };

        let regs = result.regs();
        if !regs.is_enabled() {
            // RM: "DEEPPWD must be cleared before ADVREGEN is set."
            regs.modify_cr(cr::DEEPPWD, 0);
            if regs.read(Reg::Cr) & cr::ADVREGEN == 0 {
                regs.modify_cr(0, cr::ADVREGEN);
                util::delay_cycles(util::us_to_cycles(REGULATOR_STARTUP_US, result.cfg.sysclk));
            }

            let mut set = (result.cfg.resolution as u32) << cfgr::RES_POS;
            if result.cfg.continuous {
                set |= cfgr::CONT;
            }
            if result.cfg.discontinuous {
                set |= cfgr::DISCEN;
            }
            if result.cfg.dma_continuous_requests {
                set |= cfgr::DMACFG;
            }
            regs.modify(
                Reg::Cfgr,
                cfgr::RES | cfgr::CONT | cfgr::DISCEN | cfgr::DMACFG,
                set,
            );
        }

        result.state.set(StateFlags::READY);
        result
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn config(&self) -> &AdcConfig {
        &self.cfg
    }

    pub fn state(&self) -> StateFlags {
        self.state.get()
    }

    /// Errors recorded since the last start cleared them.
    pub fn error_code(&self) -> ErrorCode {
        self.error_code.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.regs().is_enabled()
    }

    pub(crate) fn regs(&self) -> AdcRegs<'_, R> {
        AdcRegs::new(&self.regs, self.instance)
    }

    pub(crate) fn regs_of(&self, adc: Instance) -> AdcRegs<'_, R> {
        AdcRegs::new(&self.regs, adc)
    }

    fn lock(&self) -> Result<LockGuard<'_>> {
        self.lock.try_acquire()
    }

    /// Record `e` in the error code, and return it.
    fn fail<U>(&self, e: Error) -> Result<U> {
        #[cfg(feature = "defmt")]
        defmt::warn!("ADC {}: {}", self.instance, e);
        self.error_code.set(ErrorCode::from_error(e));
        Err(e)
    }

    /// Record a configuration rejection in both state and error code.
    fn config_error<U>(&self) -> Result<U> {
        self.state.set(StateFlags::ERROR_CONFIG);
        self.fail(Error::Config)
    }

    /// Record a failure of one of the enable/disable/stop primitives.
    fn internal_error(&self, e: Error) -> Error {
        self.state.set(StateFlags::ERROR_INTERNAL);
        self.error_code.set(ErrorCode::INTERNAL);
        #[cfg(feature = "defmt")]
        defmt::warn!("ADC {}: enable, disable or stop failed", self.instance);
        e
    }

    fn enable_internal(&self) -> Result<()> {
        enable(&self.regs(), &self.tick).map_err(|e| self.internal_error(e))
    }

    fn disable_internal(&self) -> Result<()> {
        disable(&self.regs(), &self.tick).map_err(|e| self.internal_error(e))
    }

    fn stop_conversion_internal(&self, group: Group) -> Result<()> {
        stop_conversion(&self.regs(), &self.tick, group).map_err(|e| self.internal_error(e))
    }

    /// Which flag ends a conversion, for the given group.
    fn eoc_flag(&self, injected: bool) -> u32 {
        match (self.cfg.eoc_selection, injected) {
            (EocSelection::SingleConversion, false) => isr::EOC,
            (EocSelection::SequenceConversion, false) => isr::EOS,
            (EocSelection::SingleConversion, true) => isr::JEOC,
            (EocSelection::SequenceConversion, true) => isr::JEOS,
        }
    }

    cfg_if! {
        if #[cfg(multimode)] {
            /// Mode of the pair this instance belongs to.
            pub fn multimode_mode(&self) -> MultimodeMode {
                MultimodeMode::from_ccr(self.regs().read_common(crate::regs::CommonReg::Ccr))
            }

            /// Does this instance start its own injected conversions? A slave doesn't, when the
            /// pair's mode has the master trigger the injected groups of both.
            fn starts_own_injected(&self) -> bool {
                self.instance.is_master()
                    || matches!(
                        self.multimode_mode(),
                        MultimodeMode::Independent
                            | MultimodeMode::DualRegSimult
                            | MultimodeMode::DualRegInterl
                    )
            }

            /// Same, for the regular group.
            fn starts_own_regular(&self) -> bool {
                self.instance.is_master()
                    || matches!(
                        self.multimode_mode(),
                        MultimodeMode::Independent
                            | MultimodeMode::DualInjSimult
                            | MultimodeMode::DualAltTrig
                    )
            }

            /// CFGR holding the injected settings in effect: the master's, for a slave whose
            /// injected group is driven by its master.
            fn effective_injected_cfgr(&self) -> u32 {
                if self.starts_own_injected() {
                    self.regs().read(Reg::Cfgr)
                } else {
                    self.regs_of(self.instance.master()).read(Reg::Cfgr)
                }
            }

            /// Same, for the regular group.
            fn effective_regular_cfgr(&self) -> u32 {
                if self.starts_own_regular() {
                    self.regs().read(Reg::Cfgr)
                } else {
                    self.regs_of(self.instance.master()).read(Reg::Cfgr)
                }
            }

            fn is_multimode_master_or_independent(&self) -> bool {
                self.instance.is_master() || self.multimode_mode() == MultimodeMode::Independent
            }
        } else {
            fn starts_own_injected(&self) -> bool {
                true
            }

            fn effective_injected_cfgr(&self) -> u32 {
                self.regs().read(Reg::Cfgr)
            }

            fn effective_regular_cfgr(&self) -> u32 {
                self.regs().read(Reg::Cfgr)
            }

            fn is_multimode_master_or_independent(&self) -> bool {
                true
            }
        }
    }
}

/// Enable the ADC, and wait until it's ready. No-op if already enabled.
pub(crate) fn enable<R: RegisterBlock, T: Tick>(regs: &AdcRegs<R>, tick: &T) -> Result<()> {
    if regs.is_enabled() {
        return Ok(());
    }

    // An action pending on a disabled ADC, eg a calibration, means ADEN can't be set.
    if regs.read(Reg::Cr) & cr::RS_BITS != 0 {
        return Err(Error::Internal);
    }

    regs.set_cr(cr::ADEN);

    // ADEN can be cleared by hardware while ADRDY is pending, eg if the ADC is re-disabled.
    let ready = wait_until(tick, ENABLE_TIMEOUT_MS, || {
        if regs.flag(isr::ADRDY) {
            return true;
        }
        if !regs.is_enabled() {
            regs.set_cr(cr::ADEN);
        }
        false
    });

    if ready { Ok(()) } else { Err(Error::Internal) }
}

/// Disable the ADC, and wait until it's off. Conversions must be stopped first. No-op if disabled,
/// or already being disabled.
pub(crate) fn disable<R: RegisterBlock, T: Tick>(regs: &AdcRegs<R>, tick: &T) -> Result<()> {
    if !regs.is_enabled() || regs.is_disabling() {
        return Ok(());
    }

    if regs.read(Reg::Cr) & (cr::JADSTART | cr::ADSTART | cr::ADEN) != cr::ADEN {
        return Err(Error::Internal);
    }

    regs.set_cr(cr::ADDIS);
    regs.clear_flags(isr::EOSMP | isr::ADRDY);

    if wait_until(tick, DISABLE_TIMEOUT_MS, || !regs.is_enabled()) {
        Ok(())
    } else {
        Err(Error::Internal)
    }
}

/// Stop ongoing conversions of `group`, and wait until they have stopped. In auto-injection mode
/// the injected group follows the regular one, so both are always stopped.
pub(crate) fn stop_conversion<R: RegisterBlock, T: Tick>(
    regs: &AdcRegs<R>,
    tick: &T,
    group: Group,
) -> Result<()> {
    if !regs.regular_ongoing() && !regs.injected_ongoing() {
        return Ok(());
    }

    let cfgr_val = regs.read(Reg::Cfgr);
    let mut group = group;

    if cfgr_val & cfgr::JAUTO != 0 {
        if cfgr_val & cfgr::CONT != 0 && cfgr_val & cfgr::AUTDLY != 0 {
            // With auto-delay, stopping mid-sequence would leave the injected group waiting on a
            // data read; let it complete first.
            group = Group::Regular;
            let mut i = 0;
            while !regs.flag(isr::JEOS) {
                i += 1;
                if i >= CONVERSION_TIME_MAX_CPU_CYCLES * 4 {
                    return Err(Error::Internal);
                }
            }
            regs.clear_flags(isr::JEOS);
        } else {
            group = Group::Both;
        }
    }

    if group != Group::Injected && regs.regular_ongoing() && !regs.is_disabling() {
        regs.set_cr(cr::ADSTP);
    }
    if group != Group::Regular && regs.injected_ongoing() && !regs.is_disabling() {
        regs.set_cr(cr::JADSTP);
    }

    let mask = match group {
        Group::Regular => cr::ADSTART,
        Group::Injected => cr::JADSTART,
        Group::Both => cr::ADSTART | cr::JADSTART,
    };

    if wait_until(tick, STOP_CONVERSION_TIMEOUT_MS, || {
        regs.read(Reg::Cr) & mask == 0
    }) {
        Ok(())
    } else {
        Err(Error::Internal)
    }
}
