//! Hardware capabilities the probers run on
//!
//! Every prober talks to the hardware through three narrow traits so the
//! same code drives the physical chips (`/dev/mem`) and the simulated board.

use sdmac_chip::regs::Width;
use std::fmt::Debug;

/// Fixed-address register access.
///
/// Implementations perform exactly one bus cycle of the requested width per
/// call; no caching, merging or reordering.
pub trait RegisterBus: Debug {
    /// Read a byte register
    fn read_u8(&self, addr: u32) -> u8;
    /// Read a word register
    fn read_u16(&self, addr: u32) -> u16;
    /// Read a longword register
    fn read_u32(&self, addr: u32) -> u32;
    /// Write a byte register
    fn write_u8(&self, addr: u32, value: u8);
    /// Write a word register
    fn write_u16(&self, addr: u32, value: u16);
    /// Write a longword register
    fn write_u32(&self, addr: u32, value: u32);

    /// Read a register of the given width, zero-extended
    fn read(&self, addr: u32, width: Width) -> u32 {
        match width {
            Width::Byte => u32::from(self.read_u8(addr)),
            Width::Word => u32::from(self.read_u16(addr)),
            Width::Long => self.read_u32(addr),
        }
    }

    /// Write a register of the given width, truncating `value`
    #[allow(clippy::cast_possible_truncation)]
    fn write(&self, addr: u32, width: Width, value: u32) {
        match width {
            Width::Byte => self.write_u8(addr, value as u8),
            Width::Word => self.write_u16(addr, value as u16),
            Width::Long => self.write_u32(addr, value),
        }
    }
}

/// Exclusion of interrupt handlers on the executing core.
///
/// Calls are never nested; [`crate::Exclusion`] does the depth tracking.
pub trait InterruptMask: Debug {
    /// Stop interrupt handlers from running
    fn disable(&self);
    /// Let interrupt handlers run again
    fn enable(&self);
}

/// Free-running reference counter independent of the SCSI chip.
pub trait ReferenceTimer: Debug {
    /// Current counter value
    fn ticks(&self) -> u64;
    /// Counter frequency in Hz, or `None` if the timer service is unavailable
    fn frequency(&self) -> Option<u64>;
}

/// The three capabilities a [`crate::Session`] needs.
#[derive(Debug)]
pub struct Platform {
    /// Register access
    pub bus: Box<dyn RegisterBus>,
    /// Interrupt exclusion
    pub mask: Box<dyn InterruptMask>,
    /// Reference timer
    pub timer: Box<dyn ReferenceTimer>,
}
