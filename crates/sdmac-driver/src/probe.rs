//! Full identification and verification run
//!
//! Ramsey first (the only fatal check), then the DMA engine and the
//! controller, the clock measurement, and the verification battery. The
//! destructive steps are bracketed by a register save/restore.

use crate::clock::estimate_clock_khz;
use crate::dmac;
use crate::error::Result;
use crate::identity::{ControllerIdentity, DmaProbe};
use crate::ramsey::{self, RamseyInfo};
use crate::session::Session;
use crate::settings::{read_settings, WdcSettings};
use crate::verify::{run_battery, VerificationReport};
use crate::wdc;
use tracing::info;

/// What the chips turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    /// Memory controller
    pub ramsey: RamseyInfo,
    /// DMA engine
    pub dma: DmaProbe,
    /// Protocol controller
    pub controller: ControllerIdentity,
    /// Measured input clock, 0 when the measurement failed
    pub clock_khz: u32,
}

/// Everything learned in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Chip identification
    pub identification: Identification,
    /// Configuration after restore
    pub settings: WdcSettings,
    /// Register battery
    pub verification: VerificationReport,
}

impl ProbeReport {
    /// Every subsystem passed its register battery
    pub fn passed(&self) -> bool {
        self.verification.passed()
    }
}

/// Identification only, bracketed by save/restore
///
/// # Errors
///
/// Returns `UnsupportedPlatform` if the memory controller is not a known
/// Ramsey.
pub fn identify_all(session: &mut Session) -> Result<Identification> {
    let ramsey = ramsey::identify(session)?;
    session.save_registers();
    let dma = dmac::probe_version(session);
    let controller = wdc::identify(session);
    let clock_khz = estimate_clock_khz(session, controller.model);
    session.restore_registers();
    Ok(Identification {
        ramsey,
        dma,
        controller,
        clock_khz,
    })
}

/// Identify, decode settings and verify
///
/// # Errors
///
/// Returns `UnsupportedPlatform` if the memory controller is not a known
/// Ramsey; every other failure is part of the report.
pub fn run_probe(session: &mut Session) -> Result<ProbeReport> {
    let identification = identify_all(session)?;
    let settings = read_settings(
        session,
        identification.clock_khz,
        identification.controller.model,
    );
    let verification = run_battery(session, &identification.dma.version);
    info!(passed = verification.passed(), "Probe complete");
    Ok(ProbeReport {
        identification,
        settings,
        verification,
    })
}
