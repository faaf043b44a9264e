//! SCSI bus walk
//!
//! Selects every target ID except the controller's own, LUN 0, with a short
//! selection timeout. The abort flag is only looked at between targets, never
//! while interrupts are excluded.

use crate::error::{Result, SdmacError};
use crate::session::Session;
use sdmac_chip::regs::wdc::{self, cmd, own_id};
use sdmac_chip::status;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// User abort request, shareable with a signal handler
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    /// New, not raised
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an abort
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Abort requested
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a target did when selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// Select completed
    Present,
    /// Select timed out
    Absent,
    /// Some other status
    Unexpected(u8),
    /// No interrupt within the poll ceiling
    NoResponse,
}

/// Result for one target ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetProbe {
    /// SCSI ID
    pub target: u8,
    /// Outcome
    pub status: TargetStatus,
}

fn select_target(session: &Session, target: u8, own: u8) -> TargetStatus {
    let _irq = session.exclude();
    let saved_dst = session.wdc_read(wdc::DST_ID);
    let saved_lun = session.wdc_read(wdc::LUN);
    let saved_tperiod = session.wdc_read(wdc::TPERIOD);

    session.wdc_write(wdc::DST_ID, target);
    session.wdc_write(wdc::LUN, 0);
    session.wdc_write(wdc::TPERIOD, session.config().scan_tperiod);

    let outcome = match session.wdc_command(cmd::SELECT_ATN) {
        Some(status::SELECT_COMPLETE) => {
            session.wdc_command(cmd::DISCONNECT);
            TargetStatus::Present
        }
        Some(status::SELECT_TIMEOUT) => TargetStatus::Absent,
        Some(other) => TargetStatus::Unexpected(other),
        None => {
            warn!(target, "Select never completed; resetting controller");
            session.wdc_reset(own);
            TargetStatus::NoResponse
        }
    };

    session.wdc_write(wdc::DST_ID, saved_dst);
    session.wdc_write(wdc::LUN, saved_lun);
    session.wdc_write(wdc::TPERIOD, saved_tperiod);
    outcome
}

/// Walk target IDs 0-7
///
/// # Errors
///
/// Returns `Aborted` if `abort` was raised; the target in progress is
/// always finished first.
pub fn walk_bus(session: &Session, abort: &AbortFlag) -> Result<Vec<TargetProbe>> {
    let own = session.wdc_read(wdc::OWN_ID);
    let own_scsi_id = own & own_id::ID_MASK;
    let mut found = Vec::new();
    for target in (0..8).filter(|&t| t != own_scsi_id) {
        if abort.is_raised() {
            info!(target, "Bus walk aborted");
            return Err(SdmacError::Aborted);
        }
        let status = select_target(session, target, own);
        debug!(target, ?status, "Target probed");
        found.push(TargetProbe { target, status });
    }
    Ok(found)
}
