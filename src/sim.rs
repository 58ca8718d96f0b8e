//! A register-level model of the ADC pair, for host tests. Control bits act the way RM0481
//! describes: ADEN raises ADRDY, ADDIS turns the ADC off, stop bits end conversions, ISR flags
//! clear on write-1. Fault switches make the handshakes hang, to exercise timeout paths.

use core::cell::Cell;

use crate::{
    regs::{CommonReg, Instance, Reg, RegisterBlock, cfgr, cr, isr},
    traits::Tick,
};

/// Last register offset is OR, at 0xC8.
const WORDS: usize = 0xCC / 4;

/// Bus address reported for CDR.
pub(crate) const CDR_ADDR: u32 = 0x4202_830C;

pub(crate) struct SimAdc {
    regs: [[Cell<u32>; WORDS]; 2],
    common: [Cell<u32>; 4],
    last_cr: [Cell<u32>; 2],
    /// ADEN never raises ADRDY.
    pub no_ready: Cell<bool>,
    /// ADDIS is ignored.
    pub stuck_enabled: Cell<bool>,
    /// ADSTP and JADSTP are ignored.
    pub stuck_conversion: Cell<bool>,
    /// ADCAL never clears.
    pub stuck_calibration: Cell<bool>,
    /// Calibrations started, per instance.
    pub calibrations: [Cell<u32>; 2],
    /// JSQR writes, per instance.
    pub jsqr_writes: [Cell<u32>; 2],
    /// JADSTART writes, per instance.
    pub injected_starts: [Cell<u32>; 2],
}

fn idx(adc: Instance) -> usize {
    match adc {
        Instance::Adc1 => 0,
        #[cfg(multimode)]
        Instance::Adc2 => 1,
    }
}

impl SimAdc {
    /// Registers at their reset values.
    pub fn new() -> Self {
        let sim = Self {
            regs: core::array::from_fn(|_| core::array::from_fn(|_| Cell::new(0))),
            common: core::array::from_fn(|_| Cell::new(0)),
            last_cr: core::array::from_fn(|_| Cell::new(0)),
            no_ready: Cell::new(false),
            stuck_enabled: Cell::new(false),
            stuck_conversion: Cell::new(false),
            stuck_calibration: Cell::new(false),
            calibrations: core::array::from_fn(|_| Cell::new(0)),
            jsqr_writes: core::array::from_fn(|_| Cell::new(0)),
            injected_starts: core::array::from_fn(|_| Cell::new(0)),
        };
        for r in &sim.regs {
            r[Reg::Cr as usize / 4].set(cr::DEEPPWD);
            r[Reg::Cfgr as usize / 4].set(cfgr::JQDIS);
        }
        sim
    }

    fn cell(&self, adc: Instance, reg: Reg) -> &Cell<u32> {
        &self.regs[idx(adc)][reg as usize / 4]
    }

    /// Read a register without side effects.
    pub fn peek(&self, adc: Instance, reg: Reg) -> u32 {
        self.cell(adc, reg).get()
    }

    /// Write a register directly, bypassing the hardware model.
    pub fn poke(&self, adc: Instance, reg: Reg, value: u32) {
        self.cell(adc, reg).set(value);
    }

    pub fn peek_common(&self, reg: CommonReg) -> u32 {
        self.common[reg as usize / 4].get()
    }

    pub fn poke_common(&self, reg: CommonReg, value: u32) {
        self.common[reg as usize / 4].set(value);
    }

    pub fn last_cr_write(&self, adc: Instance) -> u32 {
        self.last_cr[idx(adc)].get()
    }

    /// Raise status flags, as a conversion would.
    pub fn raise(&self, adc: Instance, flags: u32) {
        let c = self.cell(adc, Reg::Isr);
        c.set(c.get() | flags);
    }

    /// An injected sequence has finished: end flags set, and JADSTART cleared when nothing else
    /// will trigger it.
    pub fn finish_injected(&self, adc: Instance) {
        self.raise(adc, isr::JEOC | isr::JEOS);
        let cfgr_val = self.peek(adc, Reg::Cfgr);
        let software = self.peek(adc, Reg::Jsqr) & crate::regs::jsqr::JEXTEN == 0;
        if software && cfgr_val & cfgr::JQM == 0 {
            let c = self.cell(adc, Reg::Cr);
            c.set(c.get() & !cr::JADSTART);
        }
    }

    fn write_cr(&self, adc: Instance, value: u32) {
        let i = idx(adc);
        self.last_cr[i].set(value);

        let c = self.cell(adc, Reg::Cr);
        // Set-only bits are unaffected by writing 0.
        let mut val = (c.get() & cr::RS_BITS) | (value & !cr::RS_BITS);

        if value & cr::DEEPPWD != 0 {
            val &= !cr::ADVREGEN;
        }
        if value & cr::ADCAL != 0 {
            self.calibrations[i].set(self.calibrations[i].get() + 1);
            if self.stuck_calibration.get() {
                val |= cr::ADCAL;
            }
        }
        if value & cr::ADEN != 0 {
            val |= cr::ADEN;
            if !self.no_ready.get() {
                self.raise(adc, isr::ADRDY);
            }
        }
        if value & cr::ADSTART != 0 {
            val |= cr::ADSTART;
        }
        if value & cr::JADSTART != 0 {
            val |= cr::JADSTART;
            self.injected_starts[i].set(self.injected_starts[i].get() + 1);
        }
        if value & cr::ADSTP != 0 && !self.stuck_conversion.get() {
            val &= !cr::ADSTART;
        }
        if value & cr::JADSTP != 0 && !self.stuck_conversion.get() {
            val &= !cr::JADSTART;
        }
        if value & cr::ADDIS != 0 {
            if self.stuck_enabled.get() {
                val |= cr::ADDIS;
            } else {
                val &= !(cr::ADEN | cr::ADDIS | cr::ADSTART | cr::JADSTART);
            }
        }

        c.set(val);
    }
}

impl RegisterBlock for SimAdc {
    fn read(&self, adc: Instance, reg: Reg) -> u32 {
        self.peek(adc, reg)
    }

    fn write(&self, adc: Instance, reg: Reg, value: u32) {
        match reg {
            Reg::Isr => {
                let c = self.cell(adc, reg);
                c.set(c.get() & !value);
            }
            Reg::Cr => self.write_cr(adc, value),
            Reg::Jsqr => {
                let i = idx(adc);
                self.jsqr_writes[i].set(self.jsqr_writes[i].get() + 1);
                self.poke(adc, reg, value);
            }
            // Read-only data registers.
            Reg::Jdr1 | Reg::Jdr2 | Reg::Jdr3 | Reg::Jdr4 => (),
            _ => self.poke(adc, reg, value),
        }
    }

    fn read_common(&self, reg: CommonReg) -> u32 {
        self.peek_common(reg)
    }

    fn write_common(&self, reg: CommonReg, value: u32) {
        if reg != CommonReg::Cdr {
            self.poke_common(reg, value);
        }
    }

    fn common_data_addr(&self) -> u32 {
        CDR_ADDR
    }
}

/// A tick that advances by one ms each time it's read, so every timeout expires after a bounded
/// number of polls.
pub(crate) struct SimTick(Cell<u32>);

impl SimTick {
    pub fn new() -> Self {
        Self(Cell::new(0))
    }
}

impl Tick for SimTick {
    fn now_ms(&self) -> u32 {
        let now = self.0.get();
        self.0.set(now.wrapping_add(1));
        now
    }
}
