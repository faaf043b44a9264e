//! DMA engine generation probe
//!
//! There is no version register. SDMAC-02 stores WTC bit 2; SDMAC-04 has it
//! hardwired clear. The probe writes six patterns through the WTC shadow and
//! classifies what comes back.

use crate::identity::{DmaEngineVersion, DmaProbe, DmaProbeFailure};
use crate::session::Session;
use sdmac_chip::patterns::DMAC_PROBE_PATTERNS;
use sdmac_chip::regs::sdmac::{self, istr};
use tracing::{debug, info, warn};

/// Write `pattern` to WTC and read it back, restoring the original value
fn wtc_round_trip(session: &Session, pattern: u32) -> u32 {
    let bus = session.bus();
    let _irq = session.exclude();
    let saved = bus.read_u32(sdmac::WTC);
    bus.write_u32(sdmac::WTC_ALT, pattern);
    session.flush_bus();
    let readback = bus.read_u32(sdmac::WTC);
    bus.write_u32(sdmac::WTC_ALT, saved);
    readback
}

fn failed(failure: DmaProbeFailure) -> DmaProbe {
    warn!(?failure, "DMA engine probe failed");
    DmaProbe {
        version: DmaEngineVersion::Unknown,
        failure: Some(failure),
    }
}

/// Determine the DMA engine generation
pub fn probe_version(session: &Session) -> DmaProbe {
    let status = session.bus().read_u8(sdmac::ISTR);
    if status & (istr::FIFOE | istr::FIFOF) == istr::FIFOE | istr::FIFOF {
        return failed(DmaProbeFailure::InconsistentFifoState);
    }

    let low = sdmac::WTC_MASK;
    let low_without_probe = low & !sdmac::WTC_PROBE_BIT;
    let mut stores_low_bits = true;
    let mut probe_bit_seen = false;
    let mut probe_bit_cleared = false;
    let mut other_bits_diverge = false;

    for pattern in DMAC_PROBE_PATTERNS {
        let readback = wtc_round_trip(session, pattern);
        debug!(pattern, readback, "WTC probe");

        if readback == pattern && pattern != 0 && pattern != u32::MAX {
            return failed(DmaProbeFailure::ReadOnlyBitsWritable);
        }
        if readback & low != pattern & low {
            stores_low_bits = false;
        }
        if readback & low_without_probe != pattern & low_without_probe {
            other_bits_diverge = true;
        }
        if readback & sdmac::WTC_PROBE_BIT != 0 {
            probe_bit_seen = true;
        } else if pattern & sdmac::WTC_PROBE_BIT != 0 {
            probe_bit_cleared = true;
        }
    }

    let version = if stores_low_bits {
        DmaEngineVersion::Version2
    } else if !probe_bit_seen && probe_bit_cleared && !other_bits_diverge {
        DmaEngineVersion::Version4 {
            revision: read_revision(session),
        }
    } else {
        return failed(DmaProbeFailure::BitCorruption);
    };
    info!(?version, "DMA engine identified");
    DmaProbe {
        version,
        failure: None,
    }
}

/// Read the `"vX.Y"` revision of enhanced SDMAC-04 replacements
///
/// Returns `None` when the sentinel bytes are absent, which is the normal
/// case for original parts.
pub fn read_revision(session: &Session) -> Option<String> {
    let raw = session.bus().read_u32(sdmac::REVISION).to_be_bytes();
    let [b'v', major, b'.', minor] = raw else {
        debug!(raw = ?raw, "No SDMAC revision sentinel");
        return None;
    };
    if !major.is_ascii_digit() || !minor.is_ascii_digit() {
        return None;
    }
    Some(format!("v{}.{}", char::from(major), char::from(minor)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BoardProfile, SimulatedBoard, SimulatedDmac};
    use crate::config::ProbeConfig;

    fn probe(profile: BoardProfile) -> (DmaProbe, SimulatedBoard) {
        let board = SimulatedBoard::new(profile);
        let session = Session::new(board.platform(), ProbeConfig::default());
        (probe_version(&session), board)
    }

    #[test]
    fn sdmac02_stores_probe_bit() {
        let (p, _) = probe(BoardProfile::wd33c93());
        assert_eq!(p.version, DmaEngineVersion::Version2);
        assert_eq!(p.failure, None);
    }

    #[test]
    fn sdmac04_clears_probe_bit() {
        let (p, _) = probe(BoardProfile::wd33c93a());
        assert_eq!(p.version, DmaEngineVersion::Version4 { revision: None });
    }

    #[test]
    fn enhanced_revision_is_read() {
        let (p, _) = probe(BoardProfile {
            dmac_revision: u32::from_be_bytes(*b"v1.3"),
            ..BoardProfile::default()
        });
        assert_eq!(
            p.version,
            DmaEngineVersion::Version4 {
                revision: Some("v1.3".to_string())
            }
        );
    }

    #[test]
    fn stuck_probe_bit_is_corruption() {
        let (p, _) = probe(BoardProfile {
            dmac: SimulatedDmac::ProbeBitStuck,
            ..BoardProfile::default()
        });
        assert_eq!(p.version, DmaEngineVersion::Unknown);
        assert_eq!(p.failure, Some(DmaProbeFailure::BitCorruption));
    }

    #[test]
    fn impossible_fifo_state_aborts_before_writing() {
        let (p, board) = probe(BoardProfile {
            istr: istr::FIFOE | istr::FIFOF,
            ..BoardProfile::default()
        });
        assert_eq!(p.failure, Some(DmaProbeFailure::InconsistentFifoState));
        assert_eq!(board.wtc(), 0);
    }

    #[test]
    fn fifo_state_is_sampled_on_every_run() {
        let board = SimulatedBoard::new(BoardProfile::default());
        let session = Session::new(board.platform(), ProbeConfig::default());
        assert_eq!(probe_version(&session).failure, None);
        board.set_istr(istr::FIFOE | istr::FIFOF);
        let p = probe_version(&session);
        assert_eq!(p.version, DmaEngineVersion::Unknown);
        assert_eq!(p.failure, Some(DmaProbeFailure::InconsistentFifoState));
        board.set_istr(istr::FIFOF);
        assert_eq!(probe_version(&session).failure, None);
    }

    #[test]
    fn wtc_is_restored() {
        let board = SimulatedBoard::new(BoardProfile::wd33c93());
        let session = Session::new(board.platform(), ProbeConfig::default());
        session.bus().write_u32(sdmac::WTC_ALT, 0x0012_3454);
        probe_version(&session);
        assert_eq!(board.wtc(), 0x0012_3454);
    }
}
