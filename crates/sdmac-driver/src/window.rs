//! Register access primitive for the WD33C93
//!
//! The controller's internal registers are reached through the SDMAC
//! index/data window. Every access saves the index, selects the target
//! register, touches the data port and puts the saved index back, all with
//! interrupts excluded. The index is restored by a drop guard so an access
//! that faults still leaves the window as it found it.

use crate::bus::RegisterBus;
use crate::session::Session;
use sdmac_chip::regs::sdmac;
use sdmac_chip::regs::wdc::{self, aux, cmd};
use sdmac_chip::status::command_echo;
use tracing::{debug, trace, warn};

/// Restores the saved window index on drop
struct IndexScope<'a> {
    bus: &'a dyn RegisterBus,
    saved: u8,
}

impl Drop for IndexScope<'_> {
    fn drop(&mut self) {
        self.bus.write_u8(sdmac::SASR_B2, self.saved);
    }
}

/// Outcome of an extended-register mailbox command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedAccess {
    /// Mailbox value after the command; stale when `completed` is false
    pub value: u8,
    /// SCSI status observed, or `None` when the command never completed
    pub status: Option<u8>,
    /// Status matched the command echo
    pub completed: bool,
}

impl Session {
    fn select_index(&self, reg: u8) -> IndexScope<'_> {
        let bus = self.bus();
        let saved = bus.read_u8(sdmac::SASR_B);
        bus.write_u8(sdmac::SASR_B2, reg);
        IndexScope { bus, saved }
    }

    /// Current value of the window index register
    pub fn wdc_index(&self) -> u8 {
        self.bus().read_u8(sdmac::SASR_B)
    }

    /// Read a directly windowed register
    pub fn wdc_read(&self, reg: u8) -> u8 {
        let _irq = self.exclude();
        let _index = self.select_index(reg);
        let value = self.bus().read_u8(sdmac::SCMD);
        trace!(reg, value, "WDC read");
        value
    }

    /// Write a directly windowed register
    pub fn wdc_write(&self, reg: u8, value: u8) {
        let _irq = self.exclude();
        let _index = self.select_index(reg);
        trace!(reg, value, "WDC write");
        self.bus().write_u8(sdmac::SCMD, value);
    }

    /// Write a 24-bit value to three consecutive registers starting at `reg`
    ///
    /// The controller advances its internal pointer after each data access,
    /// so the three bytes go to the same port, most significant first.
    pub fn wdc_write24(&self, reg: u8, value: u32) {
        debug_assert!(value <= 0x00ff_ffff, "24-bit value out of range");
        let _irq = self.exclude();
        let _index = self.select_index(reg);
        trace!(reg, value, "WDC write24");
        for shift in [16, 8, 0] {
            self.bus().write_u8(sdmac::SCMD, (value >> shift) as u8);
        }
    }

    /// Read the pending SCSI status if an interrupt is outstanding
    pub(crate) fn clear_pending_interrupt(&self) -> Option<u8> {
        let _irq = self.exclude();
        if self.wdc_read(wdc::AUXST) & aux::INT != 0 {
            let stale = self.wdc_read(wdc::SCSI_STAT);
            debug!(status = stale, "Cleared pending WDC interrupt");
            return Some(stale);
        }
        None
    }

    /// Issue a command and wait for its completion interrupt
    ///
    /// Returns the SCSI status, or `None` when the interrupt never arrived
    /// within the poll ceiling.
    pub fn wdc_command(&self, command: u8) -> Option<u8> {
        let _irq = self.exclude();
        self.clear_pending_interrupt();
        self.wdc_write(wdc::CMD, command);
        self.poll("WDC command", || self.wdc_read(wdc::AUXST) & aux::INT != 0)?;
        let status = self.wdc_read(wdc::SCSI_STAT);
        debug!(command, status, "WDC command complete");
        Some(status)
    }

    /// Soft-reset the controller with the given own-ID register value
    ///
    /// Advanced-feature bits in `own_id` are latched by the reset.
    pub fn wdc_reset(&self, own_id: u8) -> Option<u8> {
        let _irq = self.exclude();
        self.wdc_write(wdc::OWN_ID, own_id);
        let status = self.wdc_command(cmd::RESET);
        if status.is_none() {
            warn!(own_id, "WDC reset did not complete");
        }
        status
    }

    /// Read an extended register through the mailbox
    ///
    /// Only the WD33C93B answers this command, and not necessarily every
    /// microcode revision of it. A mismatched completion status is logged and
    /// the stale mailbox value is returned.
    pub fn wdc_read_extended(&self, reg: u8) -> ExtendedAccess {
        let get = self.config().get_register_cmd;
        let _irq = self.exclude();
        self.wdc_write(wdc::MAILBOX_ADDR, reg);
        let status = self.wdc_command(get);
        let value = self.wdc_read(wdc::MAILBOX_DATA);
        self.extended_outcome(reg, get, value, status)
    }

    /// Write an extended register through the mailbox
    pub fn wdc_write_extended(&self, reg: u8, value: u8) -> ExtendedAccess {
        let set = self.config().set_register_cmd;
        let _irq = self.exclude();
        self.wdc_write(wdc::MAILBOX_ADDR, reg);
        self.wdc_write(wdc::MAILBOX_DATA, value);
        let status = self.wdc_command(set);
        let value = self.wdc_read(wdc::MAILBOX_DATA);
        self.extended_outcome(reg, set, value, status)
    }

    #[allow(clippy::unused_self)]
    fn extended_outcome(&self, reg: u8, command: u8, value: u8, status: Option<u8>) -> ExtendedAccess {
        let completed = status == Some(command_echo(command));
        if !completed {
            warn!(
                reg,
                command,
                status = ?status,
                expected = command_echo(command),
                "Extended register command failed; mailbox value may be stale"
            );
        }
        ExtendedAccess {
            value,
            status,
            completed,
        }
    }
}
