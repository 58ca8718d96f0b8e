//! Injected group: up to 4 ranks, converted on a trigger with priority over the regular group.
//! Optionally queued: with JQM set, up to 2 contexts (JSQR images) wait their turn in hardware.
//! (RM0481, 26.4.21)

use core::sync::atomic::Ordering;

use bitflags::bitflags;

use super::{Adc, Channel, EocSelection, InputMode, SampleTime, StateFlags};
use crate::{
    error::{Error, Result},
    regs::{
        self, CommonReg, Instance, Reg, RegisterBlock, ccr, cfgr, cfgr2, isr, jsqr, ofr, or, smpr,
    },
    traits::Tick,
    util::{self, wait_until},
};

/// Temperature sensor start-up time, tSTART.
const TEMPSENSOR_SETTLING_US: u32 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Position in the injected sequence.
pub enum InjectedRank {
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
}

impl InjectedRank {
    fn jsq_pos(self) -> u32 {
        jsqr::JSQ1_POS + 6 * (self as u32 - 1)
    }

    fn data_reg(self) -> Reg {
        match self {
            Self::R1 => Reg::Jdr1,
            Self::R2 => Reg::Jdr2,
            Self::R3 => Reg::Jdr3,
            Self::R4 => Reg::Jdr4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Trigger polarity. (JSQR JEXTEN field)
pub enum TriggerEdge {
    None = 0b00,
    Rising = 0b01,
    Falling = 0b10,
    Both = 0b11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What starts an injected sequence.
pub enum InjectedTrigger {
    /// JADSTART.
    Software,
    /// `source` is the JEXTSEL value; see RM0481, Table 251. An edge of `None` leaves the
    /// sequence started by software.
    External { source: u8, edge: TriggerEdge },
}

impl InjectedTrigger {
    fn jsqr_bits(self) -> u32 {
        match self {
            Self::Software => 0,
            Self::External { source, edge } => {
                ((source as u32) << jsqr::JEXTSEL_POS & jsqr::JEXTSEL)
                    | (edge as u32) << jsqr::JEXTEN_POS
            }
        }
    }

    /// Auto-injection needs the injected group to follow the regular one, so no edge.
    fn allows_auto_injection(self) -> bool {
        match self {
            Self::Software => true,
            Self::External { edge, .. } => edge == TriggerEdge::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// One of the 4 offset units, shared by the regular and injected groups.
pub enum OffsetSlot {
    O1,
    O2,
    O3,
    O4,
}

impl OffsetSlot {
    const ALL: [Self; 4] = [Self::O1, Self::O2, Self::O3, Self::O4];

    fn reg(self) -> Reg {
        match self {
            Self::O1 => Reg::Ofr1,
            Self::O2 => Reg::Ofr2,
            Self::O3 => Reg::Ofr3,
            Self::O4 => Reg::Ofr4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Whether the offset is subtracted from, or added to, the raw conversion. (OFRx OFFSETPOS)
pub enum OffsetSign {
    Negative,
    Positive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Offset {
    pub slot: OffsetSlot,
    /// In units of the configured resolution.
    pub value: u16,
    pub sign: OffsetSign,
    /// Clamp the result to the resolution's range instead of letting it wrap. (OFRx SATEN)
    pub saturation: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Oversampling ratio. (CFGR2 OVSR field)
pub enum OversamplingRatio {
    X2 = 0,
    X4 = 1,
    X8 = 2,
    X16 = 3,
    X32 = 4,
    X64 = 5,
    X128 = 6,
    X256 = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Injected oversampling. The ratio and shift are shared with regular oversampling.
pub struct Oversampling {
    pub ratio: OversamplingRatio,
    /// Right shift applied to the accumulated result, 0-8. (CFGR2 OVSS)
    pub shift: u8,
}

/// Settings for one injected channel, and for the injected group as a whole.
#[derive(Clone, Debug)]
pub struct InjectedConfig {
    pub channel: Channel,
    pub rank: InjectedRank,
    pub sampling_time: SampleTime,
    /// Applies only while the ADC is disabled.
    pub input_mode: InputMode,
    /// `None` disables any offset unit currently assigned to this channel.
    pub offset: Option<Offset>,
    /// Number of ranks in the sequence, 1-4. In scan mode with more than 1 rank, that many
    /// configuration calls build one context, which is committed on the last.
    pub sequence_len: u8,
    /// Convert one rank per trigger. (CFGR JDISCEN)
    pub discontinuous: bool,
    /// Start the injected sequence automatically after the regular one. (CFGR JAUTO)
    pub auto_injection: bool,
    /// Queue contexts in hardware. (CFGR JQM)
    pub queue_context: bool,
    pub trigger: InjectedTrigger,
    pub oversampling: Option<Oversampling>,
}

impl Default for InjectedConfig {
    fn default() -> Self {
        Self {
            channel: Channel::In(0),
            rank: InjectedRank::R1,
            sampling_time: SampleTime::T2_5,
            input_mode: InputMode::SingleEnded,
            offset: None,
            sequence_len: 1,
            discontinuous: false,
            auto_injection: false,
            queue_context: false,
            trigger: InjectedTrigger::Software,
            oversampling: None,
        }
    }
}

bitflags! {
    /// Settings that were left unchanged, because the ADC's state doesn't allow changing them.
    pub struct Skipped: u32 {
        /// Injected conversion ongoing: JQM, JDISCEN, and the channel 0 path.
        const QUEUE_DISCONTINUOUS = 1 << 0;
        /// Any conversion ongoing.
        const AUTO_INJECTION = 1 << 1;
        const OVERSAMPLING = 1 << 2;
        const SAMPLE_TIME = 1 << 3;
        const OFFSET = 1 << 4;
        /// ADC enabled.
        const INPUT_MODE = 1 << 5;
        /// Multimode mode and sampling delay: an ADC of the pair is enabled.
        const MULTIMODE_MODE = 1 << 6;
    }
}

/// Result of configuring one injected channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InjectedOutcome {
    /// The context written to JSQR by this call, if any.
    pub committed: Option<InjectedContext>,
    pub skipped: Skipped,
}

/// A complete injected sequence: length, trigger, and channel per rank. This is a JSQR image;
/// writing one is a single register write, and enters it in the context queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InjectedContext {
    jsqr: u32,
}

impl InjectedContext {
    /// Number of ranks, 1-4.
    pub fn len(&self) -> u8 {
        (self.jsqr & jsqr::JL) as u8 + 1
    }

    /// Channel number converted at `rank`.
    pub fn channel(&self, rank: InjectedRank) -> u8 {
        ((self.jsqr >> rank.jsq_pos()) & jsqr::JSQ_MASK) as u8
    }

    /// Raw JSQR value.
    pub fn bits(&self) -> u32 {
        self.jsqr
    }
}

/// Builds an [`InjectedContext`] one rank at a time. Each call to [`Self::rank`] fills one rank;
/// after `len` calls, the context can be finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InjectedContextBuilder {
    remaining: u8,
    jsqr: u32,
}

impl InjectedContextBuilder {
    pub fn new(len: u8, trigger: InjectedTrigger) -> Result<Self> {
        if !(1..=4).contains(&len) {
            return Err(Error::Config);
        }
        Ok(Self {
            remaining: len,
            jsqr: (len as u32 - 1) | trigger.jsqr_bits(),
        })
    }

    pub fn rank(mut self, rank: InjectedRank, channel: Channel) -> Result<Self> {
        let len = (self.jsqr & jsqr::JL) as u8 + 1;
        if self.remaining == 0 || rank as u8 > len || !channel.is_valid() {
            return Err(Error::Config);
        }

        let pos = rank.jsq_pos();
        self.jsqr = (self.jsqr & !(jsqr::JSQ_MASK << pos)) | ((channel.number() as u32) << pos);
        self.remaining -= 1;
        Ok(self)
    }

    /// Ranks still to be configured.
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    pub fn finish(self) -> Result<InjectedContext> {
        if self.remaining != 0 {
            return Err(Error::Config);
        }
        Ok(InjectedContext { jsqr: self.jsqr })
    }
}

impl<R: RegisterBlock, T: Tick> Adc<R, T> {
    /// Reject settings that can't be represented, or that contradict each other.
    fn check_injected_config(&self, cfg: &InjectedConfig) -> Result<()> {
        let ch = cfg.channel.number();
        let mut ok = cfg.channel.is_valid() && (1..=4).contains(&cfg.sequence_len);

        if self.cfg.scan && cfg.sequence_len > 1 && cfg.rank as u8 > cfg.sequence_len {
            ok = false;
        }
        // Differential inputs use the next channel as the negative input.
        if cfg.input_mode == InputMode::Differential && ch >= 19 {
            ok = false;
        }
        if cfg.auto_injection
            && (!cfg.trigger.allows_auto_injection() || cfg.discontinuous || self.cfg.discontinuous)
        {
            ok = false;
        }
        if let Some(o) = cfg.oversampling {
            if o.shift > 8 || cfg.offset.is_some() {
                ok = false;
            }
        }
        if let Some(o) = cfg.offset {
            if (o.value as u32) << self.offset_shift() > ofr::OFFSET {
                ok = false;
            }
        }
        if !self.routes_internal_channel(cfg.channel) {
            ok = false;
        }

        if ok { Ok(()) } else { Err(Error::Config) }
    }

    /// Is this channel available on this instance?
    fn routes_internal_channel(&self, channel: Channel) -> bool {
        match channel {
            Channel::In(_) => true,
            Channel::TempSensor | Channel::VrefInt => self.instance == Instance::Adc1,
            #[cfg(multimode)]
            Channel::Vbat | Channel::VddCore => self.instance == Instance::Adc2,
            #[cfg(not(multimode))]
            Channel::Vbat | Channel::VddCore => false,
        }
    }

    /// Offsets are given at the configured resolution, and stored left-aligned to 12 bits.
    fn offset_shift(&self) -> u32 {
        2 * regs::field(self.regs().read(Reg::Cfgr), cfgr::RES, cfgr::RES_POS)
    }

    fn pending_context(&self) -> Option<InjectedContextBuilder> {
        let remaining = self.ctx_remaining.load(Ordering::Acquire) as u8;
        if remaining == 0 {
            return None;
        }
        Some(InjectedContextBuilder {
            remaining,
            jsqr: self.ctx_jsqr.load(Ordering::Acquire),
        })
    }

    fn store_pending_context(&self, builder: Option<InjectedContextBuilder>) {
        let (remaining, jsqr) = builder.map_or((0, 0), |b| (b.remaining, b.jsqr));
        self.ctx_jsqr.store(jsqr, Ordering::Release);
        self.ctx_remaining.store(remaining as u32, Ordering::Release);
    }

    /// Configure a channel of the injected group.
    ///
    /// Without scan mode, or with a sequence length of 1, only a rank-1 call writes the sequence.
    /// Otherwise, `sequence_len` consecutive calls build one context, which is written by the last.
    ///
    /// Settings that can't change in the current state (eg sampling time while converting) are
    /// left alone, and reported in the outcome's `skipped` set.
    pub fn configure_injected_channel(&self, cfg: &InjectedConfig) -> Result<InjectedOutcome> {
        if self.check_injected_config(cfg).is_err() {
            return self.config_error();
        }

        let _guard = self.lock()?;
        let regs = self.regs();
        let ch = cfg.channel.number() as u32;

        let mut outcome = InjectedOutcome {
            committed: None,
            skipped: Skipped::empty(),
        };

        if !self.cfg.scan || cfg.sequence_len == 1 {
            if cfg.rank == InjectedRank::R1 {
                let ctx = InjectedContextBuilder::new(1, cfg.trigger)
                    .and_then(|b| b.rank(InjectedRank::R1, cfg.channel))
                    .and_then(|b| b.finish());
                let Ok(ctx) = ctx else {
                    return self.config_error();
                };
                regs.write(Reg::Jsqr, ctx.jsqr);
                outcome.committed = Some(ctx);
            }
        } else {
            let builder = match self.pending_context() {
                Some(b) => Ok(b),
                None => InjectedContextBuilder::new(cfg.sequence_len, cfg.trigger),
            }
            .and_then(|b| b.rank(cfg.rank, cfg.channel));

            let Ok(builder) = builder else {
                return self.config_error();
            };

            if builder.remaining() == 0 {
                let ctx = InjectedContext { jsqr: builder.jsqr };
                self.store_pending_context(None);
                regs.write(Reg::Jsqr, ctx.jsqr);
                outcome.committed = Some(ctx);
            } else {
                self.store_pending_context(Some(builder));
            }
        }

        if !regs.injected_ongoing() {
            if ch == 0 || (ch == 1 && cfg.input_mode == InputMode::Differential) {
                regs.modify(Reg::Or, 0, or::OP0);
            }

            let mut set = 0;
            if cfg.queue_context {
                set |= cfgr::JQM;
            }
            if cfg.discontinuous && !cfg.auto_injection {
                set |= cfgr::JDISCEN;
            }
            regs.modify(Reg::Cfgr, cfgr::JQM | cfgr::JDISCEN, set);
        } else {
            outcome.skipped |= Skipped::QUEUE_DISCONTINUOUS;
        }

        if !regs.regular_ongoing() && !regs.injected_ongoing() {
            if cfg.auto_injection {
                regs.modify(Reg::Cfgr, 0, cfgr::JAUTO);
            } else {
                regs.modify(Reg::Cfgr, cfgr::JAUTO, 0);
            }

            match cfg.oversampling {
                Some(o) => regs.modify(
                    Reg::Cfgr2,
                    cfgr2::JOVSE | cfgr2::OVSR | cfgr2::OVSS,
                    cfgr2::JOVSE
                        | (o.ratio as u32) << cfgr2::OVSR_POS
                        | (o.shift as u32) << cfgr2::OVSS_POS,
                ),
                None => regs.modify(Reg::Cfgr2, cfgr2::JOVSE, 0),
            }

            self.set_sample_time(ch, cfg.sampling_time);

            match cfg.offset {
                Some(o) => {
                    let mut val = ofr::OFFSET_EN
                        | ch << ofr::OFFSET_CH_POS
                        | ((o.value as u32) << self.offset_shift()) & ofr::OFFSET;
                    if o.sign == OffsetSign::Positive {
                        val |= ofr::OFFSETPOS;
                    }
                    if o.saturation {
                        val |= ofr::SATEN;
                    }
                    regs.write(o.slot.reg(), val);
                }
                None => {
                    for slot in OffsetSlot::ALL {
                        let val = regs.read(slot.reg());
                        if (val & ofr::OFFSET_CH) >> ofr::OFFSET_CH_POS == ch {
                            regs.modify(slot.reg(), ofr::OFFSET_EN, 0);
                        }
                    }
                }
            }
        } else {
            outcome.skipped |=
                Skipped::AUTO_INJECTION | Skipped::OVERSAMPLING | Skipped::SAMPLE_TIME | Skipped::OFFSET;
        }

        if !regs.is_enabled() {
            match cfg.input_mode {
                InputMode::SingleEnded => regs.modify(Reg::Difsel, 1 << ch, 0),
                InputMode::Differential => {
                    regs.modify(Reg::Difsel, 0, 1 << ch);
                    // The negative input is sampled for as long as the positive one.
                    self.set_sample_time(ch + 1, cfg.sampling_time);
                }
            }
        } else {
            outcome.skipped |= Skipped::INPUT_MODE;
        }

        self.route_internal_channel(cfg.channel);

        #[cfg(feature = "defmt")]
        if !outcome.skipped.is_empty() {
            defmt::debug!("ADC {}: injected settings skipped: {:#x}", self.instance, outcome.skipped.bits());
        }

        Ok(outcome)
    }

    /// Write a finished context to JSQR. With the queue enabled, it's converted after the contexts
    /// already queued. Rejected while a context is being built by `configure_injected_channel`.
    pub fn commit_injected_context(&self, ctx: InjectedContext) -> Result<()> {
        let _guard = self.lock()?;

        if self.pending_context().is_some() {
            return self.config_error();
        }

        self.regs().write(Reg::Jsqr, ctx.jsqr);
        Ok(())
    }

    fn set_sample_time(&self, ch: u32, time: SampleTime) {
        let regs = self.regs();
        let (reg, pos) = if ch < 10 {
            (Reg::Smpr1, smpr::SMP_WIDTH * ch)
        } else {
            (Reg::Smpr2, smpr::SMP_WIDTH * (ch - 10))
        };

        let (bits, plus) = match time {
            SampleTime::T3_5 => (SampleTime::T2_5 as u32, true),
            t => (t as u32, false),
        };

        regs.modify(reg, smpr::SMP_MASK << pos, bits << pos);
        if plus {
            regs.modify(Reg::Smpr1, 0, smpr::SMPPLUS);
        } else {
            regs.modify(Reg::Smpr1, smpr::SMPPLUS, 0);
        }
    }

    /// Connect an internal channel's source, if it isn't already.
    fn route_internal_channel(&self, channel: Channel) {
        let regs = self.regs();
        let paths = regs.read_common(CommonReg::Ccr);

        match channel {
            Channel::TempSensor if paths & ccr::TSEN == 0 => {
                regs.modify_common(CommonReg::Ccr, 0, ccr::TSEN);
                util::delay_cycles(util::us_to_cycles(TEMPSENSOR_SETTLING_US, self.cfg.sysclk));
            }
            Channel::VrefInt if paths & ccr::VREFEN == 0 => {
                regs.modify_common(CommonReg::Ccr, 0, ccr::VREFEN);
            }
            Channel::Vbat if paths & ccr::VBATEN == 0 => {
                regs.modify_common(CommonReg::Ccr, 0, ccr::VBATEN);
            }
            Channel::VddCore => regs.modify(Reg::Or, 0, or::OP1),
            _ => (),
        }
    }

    /// Start an injected conversion. With an external trigger, this arms it. A slave in a mode
    /// where the master drives both injected groups doesn't start; it's marked
    /// `MULTIMODE_SLAVE` instead.
    pub fn start_injected(&self) -> Result<()> {
        self.start_injected_inner(false)
    }

    /// As [`Self::start_injected`], also enabling the end-of-conversion interrupt selected by
    /// `eoc_selection`, and the queue overflow interrupt when queueing.
    pub fn start_injected_interrupt(&self) -> Result<()> {
        self.start_injected_inner(true)
    }

    fn start_injected_inner(&self, interrupts: bool) -> Result<()> {
        let regs = self.regs();

        if regs.injected_ongoing() {
            return Err(Error::Busy);
        }

        // Software triggering needs JQDIS set; with JQDIS clear and no edge, the queue is simply
        // empty.
        if regs.injected_trigger_is_software() && !regs.queue_disabled() {
            return self.config_error();
        }

        let guard = self.lock()?;

        self.enable_internal()?;

        if self.state.contains(StateFlags::REG_BUSY) {
            self.error_code.clear(super::ErrorCode::JQOVF);
        } else {
            self.error_code.reset();
        }

        self.state
            .clear_set(StateFlags::READY | StateFlags::INJ_EOC, StateFlags::INJ_BUSY);

        if self.is_multimode_master_or_independent() {
            self.state.clear(StateFlags::MULTIMODE_SLAVE);
        }

        regs.clear_flags(isr::JEOC | isr::JEOS);

        drop(guard);

        if interrupts {
            if regs.read(Reg::Cfgr) & cfgr::JQM != 0 {
                regs.enable_interrupts(isr::JQOVF);
            }
            match self.cfg.eoc_selection {
                EocSelection::SequenceConversion => {
                    regs.disable_interrupts(isr::JEOC);
                    regs.enable_interrupts(isr::JEOS);
                }
                EocSelection::SingleConversion => {
                    regs.disable_interrupts(isr::JEOS);
                    regs.enable_interrupts(isr::JEOC);
                }
            }
        }

        if self.starts_own_injected() {
            // In auto-injection mode the regular group's start triggers the injected one.
            if !regs.auto_injection() {
                regs.set_cr(crate::regs::cr::JADSTART);
            }
        } else {
            self.state.set(StateFlags::MULTIMODE_SLAVE);
        }

        Ok(())
    }

    /// Stop injected conversions. If no regular conversion is running, the ADC is disabled too.
    /// In auto-injection mode, this stops the regular group as well.
    pub fn stop_injected(&self) -> Result<()> {
        self.stop_injected_inner(false)
    }

    /// As [`Self::stop_injected`], also disabling the injected interrupts.
    pub fn stop_injected_interrupt(&self) -> Result<()> {
        self.stop_injected_inner(true)
    }

    fn stop_injected_inner(&self, interrupts: bool) -> Result<()> {
        let _guard = self.lock()?;
        let regs = self.regs();

        self.stop_conversion_internal(super::Group::Injected)?;

        if interrupts {
            regs.disable_interrupts(isr::JEOC | isr::JEOS | isr::JQOVF);
        }

        if !regs.regular_ongoing() {
            self.disable_internal()?;
            self.state
                .clear_set(StateFlags::REG_BUSY | StateFlags::INJ_BUSY, StateFlags::READY);
        } else {
            self.state.clear(StateFlags::INJ_BUSY);
        }
        Ok(())
    }

    /// Wait for the end of an injected conversion or sequence, per `eoc_selection`. `timeout_ms` of
    /// [`crate::util::MAX_DELAY`] waits forever.
    pub fn poll_injected(&self, timeout_ms: u32) -> Result<()> {
        let regs = self.regs();
        let flag = self.eoc_flag(true);

        if !wait_until(&self.tick, timeout_ms, || regs.flag(flag)) {
            self.state.set(StateFlags::TIMEOUT);
            return self.fail(Error::Timeout);
        }

        let cfgr_val = self.effective_injected_cfgr();
        self.state.set(StateFlags::INJ_EOC);

        if self.injected_sequence_is_last(cfgr_val) && regs.flag(isr::JEOS) {
            self.state.clear(StateFlags::INJ_BUSY);
            if !self.state.contains(StateFlags::REG_BUSY) {
                self.state.set(StateFlags::READY);
            }
        }

        // With auto-delay, the next conversion waits until the data is read; JEOC is cleared by
        // the read.
        if flag == isr::JEOS {
            if cfgr_val & cfgr::AUTDLY == 0 {
                regs.clear_flags(isr::JEOC | isr::JEOS);
            }
        } else {
            regs.clear_flags(isr::JEOC);
        }
        Ok(())
    }

    /// Is the sequence that just ended the end of all injected activity, or will another trigger
    /// follow? `cfgr_val` is the effective injected CFGR.
    pub(crate) fn injected_sequence_is_last(&self, cfgr_val: u32) -> bool {
        let regs = self.regs();
        let no_retrigger = regs.injected_trigger_is_software()
            || (cfgr_val & cfgr::JAUTO == 0
                && regs.regular_trigger_is_software()
                && cfgr_val & cfgr::CONT == 0);
        no_retrigger && cfgr_val & cfgr::JQM == 0
    }

    /// Read the result of an injected rank.
    pub fn injected_value(&self, rank: InjectedRank) -> u32 {
        self.regs().read(rank.data_reg())
    }

    /// Enable the context queue (clear JQDIS), and clear any earlier overflow from the state.
    /// No conversion may be running.
    pub fn enable_injected_queue(&self) -> Result<()> {
        let regs = self.regs();
        if regs.regular_ongoing() || regs.injected_ongoing() {
            return Err(Error::Busy);
        }
        regs.modify(Reg::Cfgr, cfgr::JQDIS, 0);
        self.state.clear(StateFlags::INJ_JQOVF);
        Ok(())
    }

    /// Disable the context queue (set JQDIS). Required for software-triggered injected
    /// conversions. No conversion may be running.
    pub fn disable_injected_queue(&self) -> Result<()> {
        let regs = self.regs();
        if regs.regular_ongoing() || regs.injected_ongoing() {
            return Err(Error::Busy);
        }
        regs.modify(Reg::Cfgr, 0, cfgr::JQDIS);
        Ok(())
    }
}
