//! Probe configuration
//!
//! All tunables live here; nothing else in the crate hardcodes a poll
//! ceiling or delay.

use sdmac_chip::regs::wdc::cmd;
use sdmac_chip::timing::{CLOCK_PROBE_TPERIOD, SCAN_TPERIOD};
use std::path::PathBuf;

/// Default physical memory device.
pub const DEFAULT_DEVMEM: &str = "/dev/mem";

/// Environment variable overriding the physical memory device.
pub const DEVMEM_ENV: &str = "SDMAC_DEVMEM";

/// Tunables for every bounded wait and probe parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Iteration ceiling of every busy-poll
    pub poll_limit: u32,
    /// Delay between poll attempts, in nanoseconds of reference time
    pub poll_delay_ns: u64,
    /// Timeout-period register value used by the clock measurement
    pub clock_tperiod: u8,
    /// Timeout-period register value used per target by the bus walk
    pub scan_tperiod: u8,
    /// Mismatch details kept per verified register
    pub max_mismatch_details: usize,
    /// Command that reads an extended register through the mailbox
    pub get_register_cmd: u8,
    /// Command that writes an extended register through the mailbox
    pub set_register_cmd: u8,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            poll_limit: 100_000,
            poll_delay_ns: 10_000,
            clock_tperiod: CLOCK_PROBE_TPERIOD,
            scan_tperiod: SCAN_TPERIOD,
            max_mismatch_details: 8,
            get_register_cmd: cmd::GET_REGISTER,
            set_register_cmd: cmd::SET_REGISTER,
        }
    }
}

/// Resolve the physical memory device path
///
/// An explicit path wins, then `SDMAC_DEVMEM`, then `/dev/mem`.
pub fn devmem_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = std::env::var(DEVMEM_ENV) {
        tracing::debug!("Using {DEVMEM_ENV}={path}");
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_DEVMEM)
}
