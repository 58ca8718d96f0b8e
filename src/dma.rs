//! Support for moving ADC results with the General Purpose DMA (GPDMA). (RM0481, chapter 15)
//!
//! The ADC driver only needs a small set of channel operations, described by [`DmaTransfer`].
//! [`GpdmaChannel`] implements them on a GPDMA channel's registers, reached through
//! [`ChannelRegisters`]; you can also implement the trait over your own DMA driver.

#[cfg(pac)]
use crate::pac;
use crate::util::bounded_loop;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
/// Source and destination data width. (CTR1 SDW_LOG2 and DDW_LOG2 fields)
pub enum DataSize {
    S8 = 0b00, // ie 8 bits
    S16 = 0b01,
    S32 = 0b10,
}

impl DataSize {
    /// Bytes per data item.
    pub fn bytes(self) -> u32 {
        1 << (self as u32)
    }

    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::S8,
            0b01 => Self::S16,
            _ => Self::S32,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// How a channel is programmed: directly through its registers, or by loading a linked-list node.
pub enum TransferMode {
    Normal,
    LinkedList,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Interrupt type. Set in CCR using DTEIE, HTIE, and TCIE bits.
pub enum DmaInterrupt {
    TransferError,
    HalfTransfer,
    TransferComplete,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// The channel is already enabled.
    Busy,
    /// A linked-list transfer was requested without a head node.
    NoLinkedList,
    /// A data transfer or link transfer error flag was raised.
    Transfer,
    /// The channel didn't acknowledge a suspend request.
    Timeout,
    /// The transfer is longer than one block, [`MAX_BLOCK_BYTES`].
    BlockSize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
/// Set in CCR PRIO. Can only be set when the channel is disabled.
pub enum Priority {
    LowWeightLow = 0,
    LowWeightMid = 1,
    LowWeightHigh = 2,
    High = 3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
/// GPDMA request lines. The integer values are CTR2 REQSEL values. (RM0481, Table 94)
pub enum DmaInput {
    Adc1 = 0,
    Adc2 = 1,
}

/// This struct is used to pass common (non-peripheral and non-use-specific) data when configuring
/// a channel.
#[derive(Clone)]
pub struct ChannelCfg {
    /// Defaults to low priority, mid weight.
    pub priority: Priority,
    /// Width of both the source and destination items. Defaults to 32 bits, to move a multimode
    /// result (master and slave data packed) per transfer.
    pub data_size: DataSize,
    pub input: DmaInput,
    /// Defaults to `Normal`. In `LinkedList` mode, a head node must be supplied.
    pub mode: TransferMode,
}

impl Default for ChannelCfg {
    fn default() -> Self {
        Self {
            priority: Priority::LowWeightMid,
            data_size: DataSize::S32,
            input: DmaInput::Adc1,
            mode: TransferMode::Normal,
        }
    }
}

/// A linked-list item: the register image a channel loads when it follows a link. Fields are
/// in the order the hardware expects; see RM0481, 15.4.8.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C, align(4))]
pub struct LinkedListNode {
    pub words: [u32; 8],
}

impl LinkedListNode {
    pub const CTR1: usize = 0;
    pub const CTR2: usize = 1;
    pub const CBR1: usize = 2;
    pub const CSAR: usize = 3;
    pub const CDAR: usize = 4;
    pub const CTR3: usize = 5;
    pub const CBR2: usize = 6;
    pub const CLLR: usize = 7;

    /// A peripheral-to-memory node: fixed source, incrementing destination.
    pub fn new(cfg: &ChannelCfg) -> Self {
        let mut words = [0; 8];
        words[Self::CTR1] = ctr1_bits(cfg.data_size);
        words[Self::CTR2] = cfg.input as u32;
        Self { words }
    }

    /// Source item width, from CTR1 SDW_LOG2.
    pub fn src_data_size(&self) -> DataSize {
        DataSize::from_bits(self.words[Self::CTR1])
    }

    /// Block size, in bytes. (CBR1 BNDT) At most [`MAX_BLOCK_BYTES`]; higher bits are dropped.
    pub fn set_block_size(&mut self, bytes: u32) {
        self.words[Self::CBR1] = (self.words[Self::CBR1] & !CBR1_BNDT) | (bytes & CBR1_BNDT);
    }

    pub fn set_src(&mut self, addr: u32) {
        self.words[Self::CSAR] = addr;
    }

    pub fn set_dst(&mut self, addr: u32) {
        self.words[Self::CDAR] = addr;
    }

    /// Link the node to itself, reloading every field. This makes the transfer circular.
    /// Call once the node is at its final address.
    pub fn link_to_self(&mut self) {
        let addr = self as *const Self as usize as u32;
        self.words[Self::CLLR] = CLLR_UPDATE_ALL | (addr & CLLR_LA);
    }
}

/// The channel operations the ADC driver uses.
pub trait DmaTransfer {
    fn mode(&self) -> TransferMode;

    /// Item width used in normal mode.
    fn data_size(&self) -> DataSize;

    /// The first node of the list, in linked-list mode.
    fn head_node(&mut self) -> Option<&mut LinkedListNode>;

    /// Enable an interrupt source. Takes effect at the next start.
    fn enable_interrupt(&mut self, interrupt: DmaInterrupt);

    /// Start a normal-mode transfer of `len` bytes.
    fn start(&mut self, src: u32, dst: u32, len: u32) -> Result<(), DmaError>;

    /// Start by loading the head node.
    fn start_linked_list(&mut self) -> Result<(), DmaError>;

    /// Stop the channel, discarding any remaining transfer.
    fn abort(&mut self) -> Result<(), DmaError>;
}

/// Registers of one GPDMA channel. (RM0481, 15.8)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelReg {
    Lbar,
    Fcr,
    Sr,
    Cr,
    Tr1,
    Tr2,
    Br1,
    Sar,
    Dar,
    Llr,
}

/// Raw access to one channel's registers. [`PacChannel`] implements it for the real peripheral.
pub trait ChannelRegisters {
    fn read(&self, reg: ChannelReg) -> u32;

    fn write(&self, reg: ChannelReg, value: u32);
}

/// A GPDMA channel, reached through the PAC.
#[cfg(pac)]
pub struct PacChannel {
    regs: &'static pac::gpdma1::RegisterBlock,
    channel: usize,
}

#[cfg(pac)]
impl PacChannel {
    /// Channel `channel` of GPDMA1. Only channels 0-5 are taken: 6 and 7 are the 2D channels.
    ///
    /// # Safety
    /// Nothing else may use this channel while the struct exists.
    pub unsafe fn gpdma1(channel: u8) -> Option<Self> {
        Self::new(pac::GPDMA1::ptr(), channel)
    }

    /// Channel `channel` of GPDMA2.
    ///
    /// # Safety
    /// Nothing else may use this channel while the struct exists.
    pub unsafe fn gpdma2(channel: u8) -> Option<Self> {
        Self::new(pac::GPDMA2::ptr(), channel)
    }

    fn new(regs: *const pac::gpdma1::RegisterBlock, channel: u8) -> Option<Self> {
        if channel > 5 {
            return None;
        }
        Some(Self {
            // The PAC's register blocks are static.
            regs: unsafe { &*regs },
            channel: channel as usize,
        })
    }
}

#[cfg(pac)]
impl ChannelRegisters for PacChannel {
    fn read(&self, reg: ChannelReg) -> u32 {
        let ch = self.regs.ch(self.channel);
        match reg {
            ChannelReg::Lbar => ch.lbar().read().bits(),
            ChannelReg::Fcr => 0, // write-only
            ChannelReg::Sr => ch.sr().read().bits(),
            ChannelReg::Cr => ch.cr().read().bits(),
            ChannelReg::Tr1 => ch.tr1().read().bits(),
            ChannelReg::Tr2 => ch.tr2().read().bits(),
            ChannelReg::Br1 => ch.br1().read().bits(),
            ChannelReg::Sar => ch.sar().read().bits(),
            ChannelReg::Dar => ch.dar().read().bits(),
            ChannelReg::Llr => ch.llr().read().bits(),
        }
    }

    fn write(&self, reg: ChannelReg, value: u32) {
        let ch = self.regs.ch(self.channel);
        match reg {
            ChannelReg::Lbar => ch.lbar().write(|w| unsafe { w.bits(value) }),
            ChannelReg::Fcr => ch.fcr().write(|w| unsafe { w.bits(value) }),
            ChannelReg::Sr => return, // read-only
            ChannelReg::Cr => ch.cr().write(|w| unsafe { w.bits(value) }),
            ChannelReg::Tr1 => ch.tr1().write(|w| unsafe { w.bits(value) }),
            ChannelReg::Tr2 => ch.tr2().write(|w| unsafe { w.bits(value) }),
            ChannelReg::Br1 => ch.br1().write(|w| unsafe { w.bits(value) }),
            ChannelReg::Sar => ch.sar().write(|w| unsafe { w.bits(value) }),
            ChannelReg::Dar => ch.dar().write(|w| unsafe { w.bits(value) }),
            ChannelReg::Llr => ch.llr().write(|w| unsafe { w.bits(value) }),
        };
    }
}

const CCR_EN: u32 = 1 << 0;
const CCR_RESET: u32 = 1 << 1;
const CCR_SUSP: u32 = 1 << 2;
const CCR_TCIE: u32 = 1 << 8;
const CCR_HTIE: u32 = 1 << 9;
const CCR_DTEIE: u32 = 1 << 10;
const CCR_ULEIE: u32 = 1 << 11;
const CCR_PRIO_POS: u32 = 22;

const CSR_DTEF: u32 = 1 << 10;
const CSR_ULEF: u32 = 1 << 11;
const CSR_SUSPF: u32 = 1 << 13;
/// TCF through TOF. CFCR uses the same positions.
const FLAGS_ALL: u32 = 0x7F << 8;

const CTR1_DDW_POS: u32 = 16;
const CTR1_DINC: u32 = 1 << 19;

/// Largest block a channel moves without reloading: CBR1 BNDT is 16 bits wide.
pub const MAX_BLOCK_BYTES: u32 = 0xFFFF;
const CBR1_BNDT: u32 = MAX_BLOCK_BYTES;

const CLLR_LA: u32 = 0xFFFC;
// UT1, UT2, UB1, USA, UDA, ULL
const CLLR_UPDATE_ALL: u32 = (0b1_1111 << 27) | (1 << 16);

fn ctr1_bits(size: DataSize) -> u32 {
    size as u32 | ((size as u32) << CTR1_DDW_POS) | CTR1_DINC
}

/// One GPDMA channel, programmed through its registers.
pub struct GpdmaChannel<'a, C> {
    regs: C,
    cfg: ChannelCfg,
    head: Option<&'a mut LinkedListNode>,
    interrupts: u32,
}

impl<'a, C: ChannelRegisters> GpdmaChannel<'a, C> {
    /// Drive the channel behind `regs`, eg a [`PacChannel`]. The GPDMA clock must be enabled.
    pub fn new(regs: C, cfg: ChannelCfg) -> Self {
        Self {
            regs,
            cfg,
            head: None,
            // Link errors would otherwise stop the channel silently.
            interrupts: CCR_ULEIE,
        }
    }

    /// Set the head node for linked-list mode. It must live in the same 64KB region as any node it
    /// links to.
    pub fn set_head(&mut self, node: &'a mut LinkedListNode) {
        self.head = Some(node);
    }

    fn read(&self, reg: ChannelReg) -> u32 {
        self.regs.read(reg)
    }

    fn write(&self, reg: ChannelReg, val: u32) {
        self.regs.write(reg, val)
    }

    fn enable(&self) {
        let prio = (self.cfg.priority as u32) << CCR_PRIO_POS;
        self.write(ChannelReg::Cr, prio | self.interrupts | CCR_EN);
    }

    /// Transfer error flags currently set.
    pub fn error(&self) -> Option<DmaError> {
        if self.read(ChannelReg::Sr) & (CSR_DTEF | CSR_ULEF) != 0 {
            Some(DmaError::Transfer)
        } else {
            None
        }
    }

    pub fn clear_flags(&self) {
        self.write(ChannelReg::Fcr, FLAGS_ALL);
    }
}

impl<C: ChannelRegisters> DmaTransfer for GpdmaChannel<'_, C> {
    fn mode(&self) -> TransferMode {
        self.cfg.mode
    }

    fn data_size(&self) -> DataSize {
        self.cfg.data_size
    }

    fn head_node(&mut self) -> Option<&mut LinkedListNode> {
        self.head.as_deref_mut()
    }

    fn enable_interrupt(&mut self, interrupt: DmaInterrupt) {
        self.interrupts |= match interrupt {
            DmaInterrupt::TransferError => CCR_DTEIE,
            DmaInterrupt::HalfTransfer => CCR_HTIE,
            DmaInterrupt::TransferComplete => CCR_TCIE,
        };
    }

    fn start(&mut self, src: u32, dst: u32, len: u32) -> Result<(), DmaError> {
        if self.read(ChannelReg::Cr) & CCR_EN != 0 {
            return Err(DmaError::Busy);
        }
        if len > MAX_BLOCK_BYTES {
            return Err(DmaError::BlockSize);
        }

        self.clear_flags();
        self.write(ChannelReg::Tr1, ctr1_bits(self.cfg.data_size));
        self.write(ChannelReg::Tr2, self.cfg.input as u32);
        self.write(ChannelReg::Br1, len);
        self.write(ChannelReg::Sar, src);
        self.write(ChannelReg::Dar, dst);
        self.write(ChannelReg::Llr, 0);

        self.enable();
        Ok(())
    }

    fn start_linked_list(&mut self) -> Result<(), DmaError> {
        if self.read(ChannelReg::Cr) & CCR_EN != 0 {
            return Err(DmaError::Busy);
        }

        let node = *self.head.as_deref().ok_or(DmaError::NoLinkedList)?;
        let addr = self.head.as_deref().map_or(0, |n| n as *const _ as usize as u32);

        self.clear_flags();
        // The upper half of every link address comes from CLBAR.
        self.write(ChannelReg::Lbar, addr & 0xFFFF_0000);

        // Load the head node as if the channel had just followed a link to it.
        self.write(ChannelReg::Tr1, node.words[LinkedListNode::CTR1]);
        self.write(ChannelReg::Tr2, node.words[LinkedListNode::CTR2]);
        self.write(ChannelReg::Br1, node.words[LinkedListNode::CBR1]);
        self.write(ChannelReg::Sar, node.words[LinkedListNode::CSAR]);
        self.write(ChannelReg::Dar, node.words[LinkedListNode::CDAR]);
        self.write(ChannelReg::Llr, node.words[LinkedListNode::CLLR]);

        self.enable();
        Ok(())
    }

    fn abort(&mut self) -> Result<(), DmaError> {
        let ccr = self.read(ChannelReg::Cr);
        if ccr & CCR_EN == 0 {
            return Ok(());
        }

        // RM: "the software must suspend the channel and wait for SUSPF before resetting it"
        self.write(ChannelReg::Cr, ccr | CCR_SUSP);
        bounded_loop!(
            self.read(ChannelReg::Sr) & CSR_SUSPF == 0,
            DmaError::Timeout
        );

        self.write(
            ChannelReg::Cr,
            (self.read(ChannelReg::Cr) | CCR_RESET) & !CCR_SUSP,
        );
        self.clear_flags();
        Ok(())
    }
}
