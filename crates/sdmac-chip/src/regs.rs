//! Register map for Ramsey, the Super DMAC and the WD33C93.
//!
//! Ramsey and SDMAC registers are addressed by absolute physical address.
//! WD33C93 registers are internal indices reached through the SDMAC
//! index/data window (`SASR` / `SCMD`).
//!
//! ```text
//! 0x00DD0004  SDMAC WTC       R/W  LONG  word transfer count (SDMAC-02)
//! 0x00DD000C  Ramsey ACR      R/W  LONG  DMA address register
//! 0x00DD001F  SDMAC ISTR      RO   BYTE  interrupt status
//! 0x00DD0041  SDMAC SASR      RO   BYTE  WD33C93 index (read side)
//! 0x00DD0043  SDMAC SCMD      R/W  BYTE  WD33C93 data window
//! 0x00DD0049  SDMAC SASR      R/W  BYTE  WD33C93 index (write side)
//! 0x00DD0084  SDMAC WTC       WO   LONG  shadow of WTC, write path
//! 0x00DD008C  Ramsey ACR      WO   LONG  shadow of ACR, write path
//! 0x00DE0003  Ramsey CTRL     R/W  BYTE  control
//! 0x00DE0043  Ramsey VER      R/W  BYTE  version
//! ```
//!
//! The shadows at `+0x80` exist because 68030 write-allocate caching can
//! swallow a write followed by a read of the same longword; writing through
//! the alias and reading through the primary address sidesteps it.

/// Access width of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Width {
    /// 8 bits.
    Byte = 1,
    /// 16 bits.
    Word = 2,
    /// 32 bits.
    Long = 4,
}

impl Width {
    /// Width in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Mask covering every bit of this width.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xff,
            Self::Word => 0xffff,
            Self::Long => 0xffff_ffff,
        }
    }
}

/// Documented access class of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Writes are ignored by the hardware.
    ReadOnly,
    /// Reads return undefined data (strobes and write-only latches).
    WriteOnly,
    /// Fully read-write storage.
    ReadWrite,
}

/// A register location with its datasheet width and access class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterAddress {
    /// Physical address (Ramsey/SDMAC) or internal index (WD33C93).
    pub addr: u32,
    /// Access width.
    pub width: Width,
    /// Access class.
    pub access: Access,
}

/// Named register entry for dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    /// Location, width and access class.
    pub reg: RegisterAddress,
    /// Short mnemonic.
    pub name: &'static str,
    /// Human description.
    pub desc: &'static str,
}

const fn info(
    addr: u32,
    width: Width,
    access: Access,
    name: &'static str,
    desc: &'static str,
) -> RegisterInfo {
    RegisterInfo {
        reg: RegisterAddress { addr, width, access },
        name,
        desc,
    }
}

// ── Ramsey memory controller ─────────────────────────────────────────────────

/// Ramsey memory controller.
pub mod ramsey {
    /// Control register (byte).
    pub const CTRL: u32 = 0x00DE_0003;
    /// Version register (byte).
    pub const VER: u32 = 0x00DE_0043;
    /// DMA address register (long). Lives in the SDMAC page.
    pub const ACR: u32 = 0x00DD_000C;
    /// Write alias of [`ACR`].
    pub const ACR_ALT: u32 = ACR + 0x80;
    /// Bits of [`ACR`] that hold storage; bits 0-1 are not implemented.
    pub const ACR_MASK: u32 = 0xffff_fffc;

    /// Page-aligned base of the Ramsey register page.
    pub const PAGE_BASE: u32 = 0x00DE_0000;

    /// Version register values of known revisions.
    pub mod version {
        /// Ramsey-01.
        pub const REV_01: u8 = 0x7f;
        /// Ramsey-04.
        pub const REV_04: u8 = 0x0d;
        /// Ramsey-07.
        pub const REV_07: u8 = 0x0f;
    }

    /// Control register bit definitions.
    pub mod ctrl {
        /// Page mode.
        pub const PAGE_MODE: u8 = 1 << 0;
        /// Burst mode.
        pub const BURST_MODE: u8 = 1 << 1;
        /// Burst wrap.
        pub const WRAP: u8 = 1 << 2;
        /// 1Mx4 DRAM.
        pub const SIZE_1MX4: u8 = 1 << 3;
        /// 256Kx4 on Ramsey-04 and older, "skip" on Ramsey-07.
        pub const SIZE_256KX4_OR_SKIP: u8 = 1 << 4;
        /// Refresh rate field shift (two bits).
        pub const REFRESH_SHIFT: u8 = 5;
    }
}

// ── Super DMAC ───────────────────────────────────────────────────────────────

/// Super DMAC (SDMAC-02 / SDMAC-04).
pub mod sdmac {
    /// Page-aligned base of the SDMAC register page.
    pub const BASE: u32 = 0x00DD_0000;
    /// DACK width register (write only).
    pub const DAWR: u32 = 0x00DD_0003;
    /// Word transfer count (SDMAC-02 only).
    pub const WTC: u32 = 0x00DD_0004;
    /// Write alias of [`WTC`].
    pub const WTC_ALT: u32 = WTC + 0x80;
    /// Control register (byte).
    pub const CONTR: u32 = 0x00DD_000B;
    /// Strobe: start DMA.
    pub const ST_DMA: u32 = 0x00DD_0013;
    /// Strobe: flush DMA FIFO.
    pub const FLUSH: u32 = 0x00DD_0017;
    /// Strobe: clear interrupts.
    pub const CLR_INT: u32 = 0x00DD_001B;
    /// Interrupt status register (read only).
    pub const ISTR: u32 = 0x00DD_001F;
    /// Revision word of enhanced SDMAC-04 replacements (`"vX.Y"`).
    pub const REVISION: u32 = 0x00DD_0020;
    /// Strobe: stop DMA.
    pub const SP_DMA: u32 = 0x00DD_003F;
    /// WD33C93 index, long write (obsolete).
    pub const SASR_L: u32 = 0x00DD_0040;
    /// WD33C93 index, byte read.
    pub const SASR_B: u32 = 0x00DD_0041;
    /// WD33C93 data window (byte).
    pub const SCMD: u32 = 0x00DD_0043;
    /// WD33C93 data window, second decode (byte).
    pub const SCMD_B: u32 = 0x00DD_0047;
    /// WD33C93 index, long write.
    pub const SASRW: u32 = 0x00DD_0048;
    /// WD33C93 index, byte read/write.
    pub const SASR_B2: u32 = 0x00DD_0049;
    /// Coprocessor interface.
    pub const CI: u32 = 0x00DD_0050;
    /// Coprocessor interface data direction.
    pub const CIDDR: u32 = 0x00DD_0054;
    /// Synchronous serial peripheral bus data (SDMAC-04).
    pub const SSPBDAT: u32 = 0x00DD_0058;
    /// Synchronous serial peripheral bus control (SDMAC-04).
    pub const SSPBCTL: u32 = 0x00DD_005C;

    /// Bytes of the SDMAC page that must be mapped (covers the shadows).
    pub const PAGE_SPAN: usize = 0x100;

    /// Storage bits of [`WTC`]; the top byte is not implemented.
    pub const WTC_MASK: u32 = 0x00ff_ffff;
    /// Storage bits of [`SSPBDAT`].
    pub const SSPBDAT_MASK: u32 = 0x0000_00ff;
    /// [`WTC`] bit 2: read-write on SDMAC-02, hardwired clear on SDMAC-04.
    pub const WTC_PROBE_BIT: u32 = 1 << 2;

    /// Interrupt status register bit definitions.
    pub mod istr {
        /// FIFO empty.
        pub const FIFOE: u8 = 0x01;
        /// FIFO full.
        pub const FIFOF: u8 = 0x02;
        /// DMA overrun.
        pub const OVER: u8 = 0x04;
        /// DMA underrun.
        pub const UNDER: u8 = 0x08;
        /// Enabled interrupt pending.
        pub const INT_P: u8 = 0x10;
        /// DMA done (end of process).
        pub const INT_E: u8 = 0x20;
        /// SCSI peripheral interrupt.
        pub const INT_S: u8 = 0x40;
        /// Interrupt follow.
        pub const INT_F: u8 = 0x80;
    }

    /// Control register bit definitions.
    pub mod contr {
        /// Reserved, reads 0.
        pub const IODX: u8 = 0x01;
        /// DMA direction (1 = write to memory).
        pub const DMADIR: u8 = 0x02;
        /// Interrupt enable.
        pub const INTEN: u8 = 0x04;
        /// Peripheral mode (1 = SCSI).
        pub const PMODE: u8 = 0x08;
        /// Peripheral reset strobe.
        pub const RESET: u8 = 0x10;
        /// Terminal count enable.
        pub const TCE: u8 = 0x20;
        /// DMA enabled.
        pub const DMAENA: u8 = 0x80;
    }
}

// ── WD33C93 ──────────────────────────────────────────────────────────────────

/// WD33C93 / WD33C93A / WD33C93B internal registers.
pub mod wdc {
    /// Own ID (also CDB size after reset).
    pub const OWN_ID: u8 = 0x00;
    /// Control.
    pub const CONTROL: u8 = 0x01;
    /// Timeout period.
    pub const TPERIOD: u8 = 0x02;
    /// Total sectors / CDB1.
    pub const CDB1: u8 = 0x03;
    /// Total heads / CDB2.
    pub const CDB2: u8 = 0x04;
    /// Total cylinders MSB.
    pub const CYLS_H: u8 = 0x05;
    /// Total cylinders LSB.
    pub const CYLS_L: u8 = 0x06;
    /// Logical address MSB.
    pub const LADDR3: u8 = 0x07;
    /// Logical address 2nd.
    pub const LADDR2: u8 = 0x08;
    /// Logical address 3rd.
    pub const LADDR1: u8 = 0x09;
    /// Logical address LSB.
    pub const LADDR0: u8 = 0x0a;
    /// Sector number.
    pub const SECTOR: u8 = 0x0b;
    /// Head number.
    pub const HEAD: u8 = 0x0c;
    /// Cylinder number MSB.
    pub const CYL_H: u8 = 0x0d;
    /// Cylinder number LSB.
    pub const CYL_L: u8 = 0x0e;
    /// Target LUN.
    pub const LUN: u8 = 0x0f;
    /// Command phase.
    pub const CMDPHASE: u8 = 0x10;
    /// Synchronous transfer.
    pub const SYNC_TX: u8 = 0x11;
    /// Transfer count MSB.
    pub const TCOUNT2: u8 = 0x12;
    /// Transfer count 2nd.
    pub const TCOUNT1: u8 = 0x13;
    /// Transfer count LSB.
    pub const TCOUNT0: u8 = 0x14;
    /// Destination ID.
    pub const DST_ID: u8 = 0x15;
    /// Source ID.
    pub const SRC_ID: u8 = 0x16;
    /// SCSI status (read only, reading clears the interrupt).
    pub const SCSI_STAT: u8 = 0x17;
    /// Command.
    pub const CMD: u8 = 0x18;
    /// Data.
    pub const DATA: u8 = 0x19;
    /// Queue tag (real storage on WD33C93B only).
    pub const QUETAG: u8 = 0x1a;
    /// Not a register on any revision; reads 0xff.
    pub const INVALID_REG: u8 = 0x1e;
    /// Auxiliary status (read only).
    pub const AUXST: u8 = 0x1f;

    /// Highest directly windowed register.
    pub const LAST_DIRECT: u8 = 0x1f;
    /// First extended (mailbox-reached) register of the WD33C93B.
    pub const EXTENDED_BASE: u8 = 0x40;

    /// Holds the microcode revision after a reset with really-advanced features.
    pub const MICROCODE: u8 = CDB1;
    /// Extended-register mailbox: target sub-address.
    pub const MAILBOX_ADDR: u8 = CDB1;
    /// Extended-register mailbox: value.
    pub const MAILBOX_DATA: u8 = CDB2;

    /// Own ID register bit definitions.
    pub mod own_id {
        /// Own SCSI ID field.
        pub const ID_MASK: u8 = 0x07;
        /// EAF: enable advanced features.
        pub const EAF: u8 = 1 << 3;
        /// EHP: enable host parity.
        pub const EHP: u8 = 1 << 4;
        /// EIH (WD33C93A) / RAF really advanced features (WD33C93B).
        pub const RAF: u8 = 1 << 5;
        /// Frequency select field shift (two bits).
        pub const FS_SHIFT: u8 = 6;
    }

    /// Auxiliary status bit definitions.
    pub mod aux {
        /// Data buffer ready.
        pub const DBR: u8 = 1 << 0;
        /// Parity error.
        pub const PE: u8 = 1 << 1;
        /// Reserved; never set together with [`RESERVED_HI`].
        pub const RESERVED_LO: u8 = 1 << 2;
        /// Reserved.
        pub const RESERVED_HI: u8 = 1 << 3;
        /// Command in progress.
        pub const CIP: u8 = 1 << 4;
        /// Busy.
        pub const BSY: u8 = 1 << 5;
        /// Last command ignored.
        pub const LCI: u8 = 1 << 6;
        /// Interrupt pending.
        pub const INT: u8 = 1 << 7;
    }

    /// Target LUN register reserved bits (3-5).
    pub const LUN_RESERVED: u8 = 0x38;

    /// Control register bus-mode field shift (three bits).
    pub const CONTROL_MODE_SHIFT: u8 = 5;

    /// Synchronous transfer register fields.
    pub mod sync {
        /// Offset field.
        pub const OFFSET_MASK: u8 = 0x0f;
        /// Transfer period field shift (three bits).
        pub const PERIOD_SHIFT: u8 = 4;
        /// Fast SCSI select (WD33C93B).
        pub const FSS: u8 = 1 << 7;
        /// Largest valid synchronous offset.
        pub const MAX_OFFSET: u8 = 12;
    }

    /// Command codes.
    pub mod cmd {
        /// Reset.
        pub const RESET: u8 = 0x00;
        /// Abort.
        pub const ABORT: u8 = 0x01;
        /// Assert ATN.
        pub const ASSERT_ATN: u8 = 0x02;
        /// Negate ACK.
        pub const NEGATE_ACK: u8 = 0x03;
        /// Disconnect.
        pub const DISCONNECT: u8 = 0x04;
        /// Select with ATN.
        pub const SELECT_ATN: u8 = 0x06;
        /// Select without ATN.
        pub const SELECT: u8 = 0x07;
        /// Read an extended register through the mailbox (WD33C93B).
        pub const GET_REGISTER: u8 = 0x1c;
        /// Write an extended register through the mailbox (WD33C93B).
        pub const SET_REGISTER: u8 = 0x1d;
        /// Transfer info.
        pub const TRANSFER_INFO: u8 = 0x20;
    }

    /// Known microcode revision bytes.
    pub mod microcode {
        /// Earliest microcode.
        pub const REV_00: u8 = 0x00;
        /// 00-08 production microcode.
        pub const REV_08: u8 = 0x08;
        /// 00-09 microcode.
        pub const REV_09: u8 = 0x09;
    }
}

use Access::{ReadOnly, ReadWrite, WriteOnly};
use Width::{Byte, Long};

/// Ramsey and SDMAC registers in dump order.
pub const SDMAC_REGISTERS: &[RegisterInfo] = &[
    info(ramsey::CTRL, Byte, ReadWrite, "Ramsey_CTRL", "Ramsey Control"),
    info(ramsey::VER, Byte, ReadWrite, "Ramsey_VER", "Ramsey Version"),
    info(sdmac::DAWR, Byte, WriteOnly, "SDMAC_DAWR", "DACK width register (WO)"),
    info(sdmac::WTC, Long, ReadWrite, "SDMAC_WTC", "Word Transfer Count"),
    info(sdmac::CONTR, Byte, ReadWrite, "SDMAC_CONTR", "Control Register"),
    info(ramsey::ACR, Long, ReadWrite, "Ramsey_ACR", "DMA Address Register"),
    info(sdmac::ST_DMA, Byte, WriteOnly, "SDMAC_ST_DMA", "Start DMA"),
    info(sdmac::FLUSH, Byte, WriteOnly, "SDMAC_FLUSH", "Flush DMA FIFO"),
    info(sdmac::CLR_INT, Byte, WriteOnly, "SDMAC_CLR_INT", "Clear Interrupts"),
    info(sdmac::ISTR, Byte, ReadOnly, "SDMAC_ISTR", "Interrupt Status Register"),
    info(sdmac::SP_DMA, Byte, WriteOnly, "SDMAC_SP_DMA", "Stop DMA"),
    info(sdmac::SASR_L, Long, WriteOnly, "SDMAC_SASR_L", "WDC register index"),
    info(sdmac::SASR_B, Byte, ReadOnly, "SDMAC_SASR_B", "WDC register index"),
    info(sdmac::SCMD, Byte, ReadWrite, "SDMAC_SCMD", "WDC register data"),
    info(sdmac::SASRW, Long, WriteOnly, "SDMAC_SASRW", "WDC register index"),
    info(sdmac::SASR_B2, Byte, ReadWrite, "SDMAC_SASR_B", "WDC register index"),
    info(sdmac::CI, Long, ReadWrite, "SDMAC_CI", "Coprocessor Interface Register"),
    info(
        sdmac::CIDDR,
        Long,
        ReadWrite,
        "SDMAC_CIDDR",
        "Coprocessor Interface Data Direction Register",
    ),
    info(
        sdmac::SSPBCTL,
        Long,
        ReadWrite,
        "SDMAC_SSPBCTL",
        "Synchronous Serial Peripheral Bus Control Register",
    ),
    info(
        sdmac::SSPBDAT,
        Long,
        ReadWrite,
        "SDMAC_SSPBDAT",
        "Synchronous Serial Peripheral Bus Data Register",
    ),
];

/// WD33C93 registers in dump order. `addr` holds the internal index.
pub const WDC_REGISTERS: &[RegisterInfo] = &[
    info(0x00, Byte, ReadWrite, "WDC_OWN_ID", "Own ID"),
    info(0x01, Byte, ReadWrite, "WDC_CONTROL", "Control"),
    info(0x02, Byte, ReadWrite, "WDC_TPERIOD", "Timeout Period"),
    info(0x03, Byte, ReadWrite, "WDC_SECTORS", "Total Sectors"),
    info(0x04, Byte, ReadWrite, "WDC_HEADS", "Total Heads"),
    info(0x05, Byte, ReadWrite, "WDC_CYLS_H", "Total Cylinders MSB"),
    info(0x06, Byte, ReadWrite, "WDC_CYLS_L", "Total Cylinders LSB"),
    info(0x07, Byte, ReadWrite, "WDC_LADDR3", "Logical Address MSB"),
    info(0x08, Byte, ReadWrite, "WDC_LADDR2", "Logical Address 2nd"),
    info(0x09, Byte, ReadWrite, "WDC_LADDR1", "Logical Address 3rd"),
    info(0x0a, Byte, ReadWrite, "WDC_LADDR0", "Logical Address LSB"),
    info(0x0b, Byte, ReadWrite, "WDC_SECTOR", "Sector Number"),
    info(0x0c, Byte, ReadWrite, "WDC_HEAD", "Head Number"),
    info(0x0d, Byte, ReadWrite, "WDC_CYL_H", "Cylinder Number MSB"),
    info(0x0e, Byte, ReadWrite, "WDC_CYL_L", "Cylinder Number LSB"),
    info(0x0f, Byte, ReadWrite, "WDC_LUN", "Target LUN"),
    info(0x10, Byte, ReadWrite, "WDC_CMDPHASE", "Command Phase"),
    info(0x11, Byte, ReadWrite, "WDC_SYNC_TX", "Synchronous Transfer"),
    info(0x12, Byte, ReadWrite, "WDC_TCOUNT2", "Transfer Count MSB"),
    info(0x13, Byte, ReadWrite, "WDC_TCOUNT1", "Transfer Count 2nd"),
    info(0x14, Byte, ReadWrite, "WDC_TCOUNT0", "Transfer Count LSB"),
    info(0x15, Byte, ReadWrite, "WDC_DST_ID", "Destination ID"),
    info(0x16, Byte, ReadWrite, "WDC_SRC_ID", "Source ID"),
    info(0x17, Byte, ReadOnly, "WDC_SCSI_STAT", "Status"),
    info(0x18, Byte, ReadWrite, "WDC_CMD", "Command"),
    info(0x19, Byte, ReadWrite, "WDC_DATA", "Data"),
    info(0x1a, Byte, ReadWrite, "WDC_QUETAG", "Queue Tag"),
    info(0x1f, Byte, ReadOnly, "WDC_AUXST", "Auxiliary Status"),
];

/// Look up a WD33C93 register entry by index.
#[must_use]
pub fn wdc_register(index: u8) -> Option<&'static RegisterInfo> {
    WDC_REGISTERS.iter().find(|r| r.reg.addr == u32::from(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadows_sit_0x80_above_primary() {
        assert_eq!(sdmac::WTC_ALT, 0x00DD_0084);
        assert_eq!(ramsey::ACR_ALT, 0x00DD_008C);
        assert!(((sdmac::WTC_ALT - sdmac::BASE) as usize) < sdmac::PAGE_SPAN);
    }

    #[test]
    fn sdmac_registers_live_in_mapped_pages() {
        for r in SDMAC_REGISTERS {
            let in_sdmac = (sdmac::BASE..sdmac::BASE + sdmac::PAGE_SPAN as u32).contains(&r.reg.addr);
            let in_ramsey = r.reg.addr & 0xffff_0000 == ramsey::PAGE_BASE;
            assert!(in_sdmac || in_ramsey, "{} outside mapped pages", r.name);
        }
    }

    #[test]
    fn invalid_register_is_not_in_the_table() {
        assert!(wdc_register(wdc::INVALID_REG).is_none());
        assert_eq!(wdc_register(wdc::QUETAG).map(|r| r.name), Some("WDC_QUETAG"));
        assert_eq!(wdc_register(wdc::AUXST).map(|r| r.reg.access), Some(Access::ReadOnly));
    }

    #[test]
    fn width_masks() {
        assert_eq!(Width::Byte.mask(), 0xff);
        assert_eq!(Width::Long.bytes(), 4);
    }
}
