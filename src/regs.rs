//! Register map of the H5 ADC (RM0481, chapter 26), and the access layer the driver runs on.
//!
//! The driver never touches memory directly: it goes through [`RegisterBlock`], which [`Mmio`]
//! implements over the PAC. The offsets below give the register map; they aren't used for
//! access.

use cfg_if::cfg_if;

#[cfg(pac)]
use crate::pac::{self, ADC1};
#[cfg(all(pac, multimode))]
use crate::pac::{ADC2, ADCC};

/// A physical ADC instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instance {
    Adc1,
    #[cfg(multimode)]
    Adc2,
}

/// Master/slave pairs sharing a common block. The first entry of each pair is the master.
#[cfg(multimode)]
const PAIRS: &[(Instance, Instance)] = &[(Instance::Adc1, Instance::Adc2)];

impl Instance {
    /// The master of the pair this instance belongs to. An unpaired instance is its own master.
    pub fn master(self) -> Instance {
        #[cfg(multimode)]
        for &(master, slave) in PAIRS {
            if slave == self {
                return master;
            }
        }
        self
    }

    /// The slave paired with this instance, if this instance is a master.
    pub fn slave(self) -> Option<Instance> {
        #[cfg(multimode)]
        for &(master, slave) in PAIRS {
            if master == self {
                return Some(slave);
            }
        }
        None
    }

    pub fn is_master(self) -> bool {
        self.master() == self
    }
}

/// Per-instance registers, by byte offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Reg {
    Isr = 0x00,
    Ier = 0x04,
    Cr = 0x08,
    Cfgr = 0x0C,
    Cfgr2 = 0x10,
    Smpr1 = 0x14,
    Smpr2 = 0x18,
    Jsqr = 0x4C,
    Ofr1 = 0x60,
    Ofr2 = 0x64,
    Ofr3 = 0x68,
    Ofr4 = 0x6C,
    Jdr1 = 0x80,
    Jdr2 = 0x84,
    Jdr3 = 0x88,
    Jdr4 = 0x8C,
    Difsel = 0xB0,
    Calfact = 0xB4,
    Or = 0xC8,
}

/// Registers of the block shared by ADC1 and ADC2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum CommonReg {
    Csr = 0x00,
    Ccr = 0x08,
    Cdr = 0x0C,
}

/// Interrupt and status register. Flags are cleared by writing 1. IER uses the same positions.
pub mod isr {
    pub const ADRDY: u32 = 1 << 0;
    pub const EOSMP: u32 = 1 << 1;
    pub const EOC: u32 = 1 << 2;
    pub const EOS: u32 = 1 << 3;
    pub const OVR: u32 = 1 << 4;
    pub const JEOC: u32 = 1 << 5;
    pub const JEOS: u32 = 1 << 6;
    pub const AWD1: u32 = 1 << 7;
    pub const AWD2: u32 = 1 << 8;
    pub const AWD3: u32 = 1 << 9;
    pub const JQOVF: u32 = 1 << 10;
}

pub mod cr {
    pub const ADEN: u32 = 1 << 0;
    pub const ADDIS: u32 = 1 << 1;
    pub const ADSTART: u32 = 1 << 2;
    pub const JADSTART: u32 = 1 << 3;
    pub const ADSTP: u32 = 1 << 4;
    pub const JADSTP: u32 = 1 << 5;
    pub const ADVREGEN: u32 = 1 << 28;
    pub const DEEPPWD: u32 = 1 << 29;
    pub const ADCALDIF: u32 = 1 << 30;
    pub const ADCAL: u32 = 1 << 31;

    /// Bits that software can only set; hardware clears them. Writing them back as read would
    /// re-trigger the action, so they're masked out of every read-modify-write.
    pub const RS_BITS: u32 = ADCAL | JADSTP | ADSTP | JADSTART | ADSTART | ADDIS | ADEN;
}

pub mod cfgr {
    pub const DMAEN: u32 = 1 << 0;
    pub const DMACFG: u32 = 1 << 1;
    pub const RES_POS: u32 = 3;
    pub const RES: u32 = 0b11 << RES_POS;
    pub const EXTEN: u32 = 0b11 << 10;
    pub const OVRMOD: u32 = 1 << 12;
    pub const CONT: u32 = 1 << 13;
    pub const AUTDLY: u32 = 1 << 14;
    pub const DISCEN: u32 = 1 << 16;
    pub const JDISCEN: u32 = 1 << 20;
    pub const JQM: u32 = 1 << 21;
    pub const JAUTO: u32 = 1 << 25;
    pub const JQDIS: u32 = 1 << 31;
}

pub mod cfgr2 {
    pub const ROVSE: u32 = 1 << 0;
    pub const JOVSE: u32 = 1 << 1;
    pub const OVSR_POS: u32 = 2;
    pub const OVSR: u32 = 0b111 << OVSR_POS;
    pub const OVSS_POS: u32 = 5;
    pub const OVSS: u32 = 0b1111 << OVSS_POS;
    pub const TROVS: u32 = 1 << 9;
}

pub mod smpr {
    /// SMPR1: sampling time 3.5 cycles replaces 2.5 cycles, for all channels.
    pub const SMPPLUS: u32 = 1 << 31;
    pub const SMP_WIDTH: u32 = 3;
    pub const SMP_MASK: u32 = 0b111;
}

pub mod jsqr {
    pub const JL: u32 = 0b11;
    pub const JEXTSEL_POS: u32 = 2;
    pub const JEXTSEL: u32 = 0b1_1111 << JEXTSEL_POS;
    pub const JEXTEN_POS: u32 = 7;
    pub const JEXTEN: u32 = 0b11 << JEXTEN_POS;
    /// Position of JSQ1. Each following rank is 6 bits higher.
    pub const JSQ1_POS: u32 = 9;
    pub const JSQ_MASK: u32 = 0b1_1111;
}

pub mod ofr {
    pub const OFFSET: u32 = 0xFFF;
    pub const OFFSETPOS: u32 = 1 << 24;
    pub const SATEN: u32 = 1 << 25;
    pub const OFFSET_CH_POS: u32 = 26;
    pub const OFFSET_CH: u32 = 0b1_1111 << OFFSET_CH_POS;
    pub const OFFSET_EN: u32 = 1 << 31;
}

pub mod calfact {
    pub const CALFACT_S: u32 = 0x7F;
    pub const CALFACT_D_POS: u32 = 16;
    pub const CALFACT_D: u32 = 0x7F << CALFACT_D_POS;
}

/// Option register.
pub mod or {
    /// Channel 0 GPIO path. Required when INP0 or INN1 is converted.
    pub const OP0: u32 = 1 << 0;
    /// VDDCORE path, ADC2 only.
    pub const OP1: u32 = 1 << 1;
}

pub mod ccr {
    pub const DUAL: u32 = 0b1_1111;
    pub const DELAY_POS: u32 = 8;
    pub const DELAY: u32 = 0b1111 << DELAY_POS;
    pub const DMACFG: u32 = 1 << 13;
    pub const MDMA_POS: u32 = 14;
    pub const MDMA: u32 = 0b11 << MDMA_POS;
    pub const VREFEN: u32 = 1 << 22;
    pub const TSEN: u32 = 1 << 23;
    pub const VBATEN: u32 = 1 << 24;
}

/// Raw access to the ADC register blocks.
pub trait RegisterBlock {
    fn read(&self, adc: Instance, reg: Reg) -> u32;

    fn write(&self, adc: Instance, reg: Reg, value: u32);

    fn read_common(&self, reg: CommonReg) -> u32;

    fn write_common(&self, reg: CommonReg, value: u32);

    /// Bus address of the common data register; the source of multimode DMA transfers.
    fn common_data_addr(&self) -> u32;

    /// Clear the `clear` bits, then set the `set` bits. Not for write-1-to-clear registers.
    fn modify(&self, adc: Instance, reg: Reg, clear: u32, set: u32) {
        let val = self.read(adc, reg);
        self.write(adc, reg, (val & !clear) | set);
    }

    fn modify_common(&self, reg: CommonReg, clear: u32, set: u32) {
        let val = self.read_common(reg);
        self.write_common(reg, (val & !clear) | set);
    }
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &T {
    fn read(&self, adc: Instance, reg: Reg) -> u32 {
        (**self).read(adc, reg)
    }

    fn write(&self, adc: Instance, reg: Reg, value: u32) {
        (**self).write(adc, reg, value)
    }

    fn read_common(&self, reg: CommonReg) -> u32 {
        (**self).read_common(reg)
    }

    fn write_common(&self, reg: CommonReg, value: u32) {
        (**self).write_common(reg, value)
    }

    fn common_data_addr(&self) -> u32 {
        (**self).common_data_addr()
    }
}

/// The ADC peripherals, owned from the PAC.
#[cfg(pac)]
pub struct Mmio {
    adc1: ADC1,
    #[cfg(multimode)]
    adc2: ADC2,
    #[cfg(multimode)]
    common: ADCC,
}

#[cfg(pac)]
impl Mmio {
    /// Take the ADC register blocks from the PAC.
    #[cfg(multimode)]
    pub fn new(adc1: ADC1, adc2: ADC2, common: ADCC) -> Self {
        Self { adc1, adc2, common }
    }

    /// Take the ADC register block from the PAC.
    #[cfg(not(multimode))]
    pub fn new(adc1: ADC1) -> Self {
        Self { adc1 }
    }

    /// Access the ADCs without owning their PAC handles.
    ///
    /// # Safety
    /// The caller must be the only user of the ADC register blocks and their common block.
    pub unsafe fn steal() -> Self {
        unsafe {
            Self {
                adc1: ADC1::steal(),
                #[cfg(multimode)]
                adc2: ADC2::steal(),
                #[cfg(multimode)]
                common: ADCC::steal(),
            }
        }
    }

    fn block(&self, adc: Instance) -> &pac::adc1::RegisterBlock {
        match adc {
            Instance::Adc1 => &*self.adc1,
            #[cfg(multimode)]
            Instance::Adc2 => &*self.adc2,
        }
    }

    #[cfg(multimode)]
    fn common(&self) -> &pac::adcc::RegisterBlock {
        &*self.common
    }

    // The single-ADC parts carry the common registers in ADC1's block.
    #[cfg(not(multimode))]
    fn common(&self) -> &pac::adc1::RegisterBlock {
        &*self.adc1
    }
}

#[cfg(pac)]
impl RegisterBlock for Mmio {
    fn read(&self, adc: Instance, reg: Reg) -> u32 {
        let rb = self.block(adc);
        match reg {
            Reg::Isr => rb.isr().read().bits(),
            Reg::Ier => rb.ier().read().bits(),
            Reg::Cr => rb.cr().read().bits(),
            Reg::Cfgr => rb.cfgr().read().bits(),
            Reg::Cfgr2 => rb.cfgr2().read().bits(),
            Reg::Smpr1 => rb.smpr1().read().bits(),
            Reg::Smpr2 => rb.smpr2().read().bits(),
            Reg::Jsqr => rb.jsqr().read().bits(),
            Reg::Ofr1 => rb.ofr(0).read().bits(),
            Reg::Ofr2 => rb.ofr(1).read().bits(),
            Reg::Ofr3 => rb.ofr(2).read().bits(),
            Reg::Ofr4 => rb.ofr(3).read().bits(),
            Reg::Jdr1 => rb.jdr(0).read().bits(),
            Reg::Jdr2 => rb.jdr(1).read().bits(),
            Reg::Jdr3 => rb.jdr(2).read().bits(),
            Reg::Jdr4 => rb.jdr(3).read().bits(),
            Reg::Difsel => rb.difsel().read().bits(),
            Reg::Calfact => rb.calfact().read().bits(),
            Reg::Or => rb.or().read().bits(),
        }
    }

    fn write(&self, adc: Instance, reg: Reg, value: u32) {
        let rb = self.block(adc);
        match reg {
            Reg::Isr => rb.isr().write(|w| unsafe { w.bits(value) }),
            Reg::Ier => rb.ier().write(|w| unsafe { w.bits(value) }),
            Reg::Cr => rb.cr().write(|w| unsafe { w.bits(value) }),
            Reg::Cfgr => rb.cfgr().write(|w| unsafe { w.bits(value) }),
            Reg::Cfgr2 => rb.cfgr2().write(|w| unsafe { w.bits(value) }),
            Reg::Smpr1 => rb.smpr1().write(|w| unsafe { w.bits(value) }),
            Reg::Smpr2 => rb.smpr2().write(|w| unsafe { w.bits(value) }),
            Reg::Jsqr => rb.jsqr().write(|w| unsafe { w.bits(value) }),
            Reg::Ofr1 => rb.ofr(0).write(|w| unsafe { w.bits(value) }),
            Reg::Ofr2 => rb.ofr(1).write(|w| unsafe { w.bits(value) }),
            Reg::Ofr3 => rb.ofr(2).write(|w| unsafe { w.bits(value) }),
            Reg::Ofr4 => rb.ofr(3).write(|w| unsafe { w.bits(value) }),
            // Read-only
            Reg::Jdr1 | Reg::Jdr2 | Reg::Jdr3 | Reg::Jdr4 => return,
            Reg::Difsel => rb.difsel().write(|w| unsafe { w.bits(value) }),
            Reg::Calfact => rb.calfact().write(|w| unsafe { w.bits(value) }),
            Reg::Or => rb.or().write(|w| unsafe { w.bits(value) }),
        };
    }

    fn read_common(&self, reg: CommonReg) -> u32 {
        match reg {
            #[cfg(multimode)]
            CommonReg::Csr => self.common().csr().read().bits(),
            #[cfg(multimode)]
            CommonReg::Cdr => self.common().cdr().read().bits(),
            // No pair to report on.
            #[cfg(not(multimode))]
            CommonReg::Csr | CommonReg::Cdr => 0,
            CommonReg::Ccr => self.common().ccr().read().bits(),
        }
    }

    fn write_common(&self, reg: CommonReg, value: u32) {
        // CSR and CDR are read-only.
        if reg == CommonReg::Ccr {
            self.common().ccr().write(|w| unsafe { w.bits(value) });
        }
    }

    #[cfg(multimode)]
    fn common_data_addr(&self) -> u32 {
        self.common().cdr().as_ptr() as usize as u32
    }

    #[cfg(not(multimode))]
    fn common_data_addr(&self) -> u32 {
        0
    }
}

/// One instance's view of a [`RegisterBlock`], with the register-level queries the driver makes.
pub(crate) struct AdcRegs<'a, R> {
    regs: &'a R,
    pub adc: Instance,
}

impl<'a, R: RegisterBlock> AdcRegs<'a, R> {
    pub fn new(regs: &'a R, adc: Instance) -> Self {
        Self { regs, adc }
    }

    pub fn read(&self, reg: Reg) -> u32 {
        self.regs.read(self.adc, reg)
    }

    pub fn write(&self, reg: Reg, value: u32) {
        self.regs.write(self.adc, reg, value);
    }

    pub fn modify(&self, reg: Reg, clear: u32, set: u32) {
        self.regs.modify(self.adc, reg, clear, set);
    }

    pub fn read_common(&self, reg: CommonReg) -> u32 {
        self.regs.read_common(reg)
    }

    pub fn modify_common(&self, reg: CommonReg, clear: u32, set: u32) {
        self.regs.modify_common(reg, clear, set);
    }

    pub fn common_data_addr(&self) -> u32 {
        self.regs.common_data_addr()
    }

    /// Modify CR without writing back any of the set-only bits.
    pub fn modify_cr(&self, clear: u32, set: u32) {
        let val = self.read(Reg::Cr);
        self.write(Reg::Cr, (val & !(cr::RS_BITS | clear)) | set);
    }

    /// Trigger one of the set-only CR actions, eg `ADEN` or `JADSTART`.
    pub fn set_cr(&self, bit: u32) {
        self.modify_cr(0, bit);
    }

    pub fn is_enabled(&self) -> bool {
        self.read(Reg::Cr) & cr::ADEN != 0
    }

    pub fn is_disabling(&self) -> bool {
        self.read(Reg::Cr) & cr::ADDIS != 0
    }

    pub fn regular_ongoing(&self) -> bool {
        self.read(Reg::Cr) & cr::ADSTART != 0
    }

    pub fn injected_ongoing(&self) -> bool {
        self.read(Reg::Cr) & cr::JADSTART != 0
    }

    pub fn calibrating(&self) -> bool {
        self.read(Reg::Cr) & cr::ADCAL != 0
    }

    pub fn flag(&self, flag: u32) -> bool {
        self.read(Reg::Isr) & flag != 0
    }

    /// Clear status flags. ISR is write-1-to-clear, so other flags are left alone.
    pub fn clear_flags(&self, flags: u32) {
        self.write(Reg::Isr, flags);
    }

    pub fn enable_interrupts(&self, sources: u32) {
        self.modify(Reg::Ier, 0, sources);
    }

    pub fn disable_interrupts(&self, sources: u32) {
        self.modify(Reg::Ier, sources, 0);
    }

    /// JEXTEN = 0: injected conversions start on `JADSTART`.
    pub fn injected_trigger_is_software(&self) -> bool {
        self.read(Reg::Jsqr) & jsqr::JEXTEN == 0
    }

    /// EXTEN = 0: regular conversions start on `ADSTART`.
    pub fn regular_trigger_is_software(&self) -> bool {
        self.read(Reg::Cfgr) & cfgr::EXTEN == 0
    }

    pub fn auto_injection(&self) -> bool {
        self.read(Reg::Cfgr) & cfgr::JAUTO != 0
    }

    pub fn queue_disabled(&self) -> bool {
        self.read(Reg::Cfgr) & cfgr::JQDIS != 0
    }
}

/// Extract a field, given its mask and position.
pub(crate) fn field(val: u32, mask: u32, pos: u32) -> u32 {
    (val & mask) >> pos
}

cfg_if! {
    if #[cfg(multimode)] {
        /// Both instances sharing the common block of `adc`.
        pub(crate) fn common_instances(adc: Instance) -> [Instance; 2] {
            let master = adc.master();
            [master, master.slave().unwrap_or(master)]
        }
    } else {
        pub(crate) fn common_instances(adc: Instance) -> [Instance; 1] {
            [adc]
        }
    }
}

/// Is any ADC sharing the common block with `adc` enabled? Multimode mode and delay can only
/// change while this is false.
pub(crate) fn any_common_enabled<R: RegisterBlock>(regs: &R, adc: Instance) -> bool {
    common_instances(adc)
        .iter()
        .any(|&a| regs.read(a, Reg::Cr) & cr::ADEN != 0)
}
