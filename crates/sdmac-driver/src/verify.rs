//! Register verification
//!
//! Each register is exercised against the pattern battery according to its
//! access class, without assuming anything about its prior contents:
//!
//! - read-write: every pattern reads back as written
//! - read-only: writes never change what reads back
//! - undefined: as read-only, and the steady-state value is `$ff`
//!
//! For WD33C93 registers CONTROL is re-read after every write; a change
//! means the register decode is broken. Every pattern is always tried, and
//! the original value is put back after a mismatch and at the end.

use crate::identity::DmaEngineVersion;
use crate::session::Session;
use sdmac_chip::patterns::{low_byte, TEST_PATTERNS};
use sdmac_chip::regs::wdc;
use sdmac_chip::regs::{ramsey, sdmac, Width};
use tracing::{debug, warn};

/// Logical subsystem a register belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Ramsey
    MemoryController,
    /// SDMAC
    DmaEngine,
    /// WD33C93
    ProtocolController,
}

impl Subsystem {
    /// Chip name
    pub fn name(self) -> &'static str {
        match self {
            Self::MemoryController => "Ramsey",
            Self::DmaEngine => "SDMAC",
            Self::ProtocolController => "WDC",
        }
    }
}

/// Expected behaviour of a register under the battery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterClass {
    /// Stores every bit written
    ReadWrite,
    /// Ignores writes
    ReadOnly,
    /// Ignores writes and reads `$ff`
    Undefined,
}

/// What went wrong on one access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// Read-back differs from the expected value
    Readback,
    /// CONTROL changed after writing the register under test
    ControlDisturbed,
    /// Undefined register did not read `$ff`
    NotAllOnes,
}

/// One recorded mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Kind of failure
    pub kind: MismatchKind,
    /// Value written, if the failure followed a write
    pub written: Option<u32>,
    /// Expected value
    pub expected: u32,
    /// Observed value
    pub observed: u32,
}

/// Outcome for one register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// Subsystem the register belongs to
    pub subsystem: Subsystem,
    /// Register name
    pub register: &'static str,
    /// Access width
    pub width: Width,
    /// Total mismatches
    pub mismatches: u32,
    /// First mismatches, up to the configured limit
    pub details: Vec<Mismatch>,
}

impl VerificationResult {
    fn new(subsystem: Subsystem, register: &'static str, width: Width) -> Self {
        Self {
            subsystem,
            register,
            width,
            mismatches: 0,
            details: Vec::new(),
        }
    }

    fn record(&mut self, mismatch: Mismatch, limit: usize) {
        debug!(register = self.register, ?mismatch, "Verification mismatch");
        self.mismatches += 1;
        if self.details.len() < limit {
            self.details.push(mismatch);
        }
    }

    /// No mismatches
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

/// Outcome of the full battery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Per-register results
    pub results: Vec<VerificationResult>,
    /// Subsystems with no applicable register test
    pub skipped: Vec<Subsystem>,
}

impl VerificationReport {
    /// Total mismatches of one subsystem
    pub fn mismatches(&self, subsystem: Subsystem) -> u32 {
        self.results
            .iter()
            .filter(|r| r.subsystem == subsystem)
            .map(|r| r.mismatches)
            .sum()
    }

    /// Subsystem had no mismatches (a skipped subsystem counts as passed)
    pub fn subsystem_passed(&self, subsystem: Subsystem) -> bool {
        self.mismatches(subsystem) == 0
    }

    /// All three subsystems passed
    pub fn passed(&self) -> bool {
        [
            Subsystem::MemoryController,
            Subsystem::DmaEngine,
            Subsystem::ProtocolController,
        ]
        .into_iter()
        .all(|s| self.subsystem_passed(s))
    }
}

/// A directly addressed Ramsey or SDMAC register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectTarget {
    /// Register name
    pub name: &'static str,
    /// Subsystem
    pub subsystem: Subsystem,
    /// Address read back from
    pub read_addr: u32,
    /// Address written through (a shadow alias where one exists)
    pub write_addr: u32,
    /// Access width
    pub width: Width,
    /// Bits holding storage; patterns are confined to them before writing
    pub mask: u32,
}

/// Ramsey DMA address register
pub const RAMSEY_ACR: DirectTarget = DirectTarget {
    name: "Ramsey_ACR",
    subsystem: Subsystem::MemoryController,
    read_addr: ramsey::ACR,
    write_addr: ramsey::ACR_ALT,
    width: Width::Long,
    mask: ramsey::ACR_MASK,
};

/// SDMAC-02 word transfer count
pub const SDMAC_WTC: DirectTarget = DirectTarget {
    name: "SDMAC_WTC",
    subsystem: Subsystem::DmaEngine,
    read_addr: sdmac::WTC,
    write_addr: sdmac::WTC_ALT,
    width: Width::Long,
    mask: sdmac::WTC_MASK,
};

/// SDMAC-04 serial peripheral bus data
pub const SDMAC_SSPBDAT: DirectTarget = DirectTarget {
    name: "SDMAC_SSPBDAT",
    subsystem: Subsystem::DmaEngine,
    read_addr: sdmac::SSPBDAT,
    write_addr: sdmac::SSPBDAT,
    width: Width::Long,
    mask: sdmac::SSPBDAT_MASK,
};

/// Verify a Ramsey or SDMAC register with a given pattern order
pub fn verify_direct_with(
    session: &Session,
    target: DirectTarget,
    patterns: &[u32],
) -> VerificationResult {
    let bus = session.bus();
    let limit = session.config().max_mismatch_details;
    let mut result = VerificationResult::new(target.subsystem, target.name, target.width);

    let _irq = session.exclude();
    let original = bus.read(target.read_addr, target.width);
    for &pattern in patterns {
        let written = pattern & target.width.mask() & target.mask;
        bus.write(target.write_addr, target.width, written);
        session.flush_bus();
        let observed = bus.read(target.read_addr, target.width) & target.mask;
        if observed != written {
            result.record(
                Mismatch {
                    kind: MismatchKind::Readback,
                    written: Some(written),
                    expected: written,
                    observed,
                },
                limit,
            );
            bus.write(target.write_addr, target.width, original);
        }
    }
    bus.write(target.write_addr, target.width, original);
    result
}

/// Verify a Ramsey or SDMAC register
pub fn verify_direct(session: &Session, target: DirectTarget) -> VerificationResult {
    verify_direct_with(session, target, &TEST_PATTERNS)
}

/// Verify a WD33C93 register with a given pattern order
pub fn verify_register_with(
    session: &Session,
    reg: u8,
    class: RegisterClass,
    patterns: &[u32],
) -> VerificationResult {
    let limit = session.config().max_mismatch_details;
    let name = sdmac_chip::regs::wdc_register(reg).map_or("WDC_INVALID", |r| r.name);
    let mut result = VerificationResult::new(Subsystem::ProtocolController, name, Width::Byte);

    let _irq = session.exclude();
    let control = session.wdc_read(wdc::CONTROL);
    let mut before = session.wdc_read(reg);
    let original = before;

    for &pattern in patterns {
        let written = low_byte(pattern);
        session.wdc_write(reg, written);
        session.flush_bus();

        let now_control = session.wdc_read(wdc::CONTROL);
        if now_control != control {
            result.record(
                Mismatch {
                    kind: MismatchKind::ControlDisturbed,
                    written: Some(u32::from(written)),
                    expected: u32::from(control),
                    observed: u32::from(now_control),
                },
                limit,
            );
            session.wdc_write(wdc::CONTROL, control);
        }

        let observed = session.wdc_read(reg);
        let expected = match class {
            RegisterClass::ReadWrite => written,
            RegisterClass::ReadOnly | RegisterClass::Undefined => before,
        };
        if observed != expected {
            result.record(
                Mismatch {
                    kind: MismatchKind::Readback,
                    written: Some(u32::from(written)),
                    expected: u32::from(expected),
                    observed: u32::from(observed),
                },
                limit,
            );
            session.wdc_write(reg, original);
            before = session.wdc_read(reg);
        }
    }
    session.wdc_write(reg, original);

    if class == RegisterClass::Undefined {
        let steady = session.wdc_read(reg);
        if steady != 0xff {
            result.record(
                Mismatch {
                    kind: MismatchKind::NotAllOnes,
                    written: None,
                    expected: 0xff,
                    observed: u32::from(steady),
                },
                limit,
            );
        }
    }

    if !result.passed() {
        warn!(register = name, mismatches = result.mismatches, "WDC register failed");
    }
    result
}

/// Verify a WD33C93 register against its access class
pub fn verify_register_class(session: &Session, reg: u8, class: RegisterClass) -> VerificationResult {
    verify_register_with(session, reg, class, &TEST_PATTERNS)
}

/// Memory controller battery
pub fn verify_memory_controller(session: &Session) -> VerificationResult {
    verify_direct(session, RAMSEY_ACR)
}

/// DMA engine battery; `None` when the generation is unknown
pub fn verify_dma_engine(session: &Session, version: &DmaEngineVersion) -> Option<VerificationResult> {
    match version {
        DmaEngineVersion::Version2 => Some(verify_direct(session, SDMAC_WTC)),
        DmaEngineVersion::Version4 { .. } => Some(verify_direct(session, SDMAC_SSPBDAT)),
        DmaEngineVersion::Unknown => None,
    }
}

/// Protocol controller battery: one register of each class
pub fn verify_protocol_controller(session: &Session) -> Vec<VerificationResult> {
    vec![
        verify_register_class(session, wdc::LADDR0, RegisterClass::ReadWrite),
        verify_register_class(session, wdc::AUXST, RegisterClass::ReadOnly),
        verify_register_class(session, wdc::INVALID_REG, RegisterClass::Undefined),
    ]
}

/// Run every battery
pub fn run_battery(session: &Session, version: &DmaEngineVersion) -> VerificationReport {
    let mut report = VerificationReport::default();
    report.results.push(verify_memory_controller(session));
    match verify_dma_engine(session, version) {
        Some(result) => report.results.push(result),
        None => {
            debug!("DMA engine generation unknown; register test skipped");
            report.skipped.push(Subsystem::DmaEngine);
        }
    }
    report.results.extend(verify_protocol_controller(session));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BoardProfile, SimulatedBoard};
    use crate::config::ProbeConfig;

    fn session(profile: BoardProfile) -> (Session, SimulatedBoard) {
        let board = SimulatedBoard::new(profile);
        (Session::new(board.platform(), ProbeConfig::default()), board)
    }

    #[test]
    fn healthy_board_passes() {
        let (s, _) = session(BoardProfile::default());
        let report = run_battery(&s, &DmaEngineVersion::Version4 { revision: None });
        assert!(report.passed(), "{report:?}");
        assert_eq!(report.results.len(), 5);
    }

    #[test]
    fn dropped_write_is_counted_and_all_patterns_run() {
        let (s, board) = session(BoardProfile {
            ignores_writes: Some(wdc::LADDR0),
            ..BoardProfile::default()
        });
        board.set_wdc_register(wdc::LADDR0, 0x00);
        let r = verify_register_class(&s, wdc::LADDR0, RegisterClass::ReadWrite);
        // every pattern with a non-zero low byte fails
        let expected = TEST_PATTERNS.iter().filter(|&&p| low_byte(p) != 0).count();
        assert_eq!(r.mismatches as usize, expected);
        assert_eq!(r.details.len(), ProbeConfig::default().max_mismatch_details);
    }

    #[test]
    fn control_disturbance_is_reported() {
        let (s, _) = session(BoardProfile {
            disturbs_control: Some(wdc::LADDR0),
            ..BoardProfile::default()
        });
        let r = verify_register_class(&s, wdc::LADDR0, RegisterClass::ReadWrite);
        assert!(r.details.iter().all(|m| m.kind == MismatchKind::ControlDisturbed));
        assert_eq!(r.mismatches as usize, TEST_PATTERNS.len());
    }

    #[test]
    fn undefined_register_must_read_ones() {
        let (s, _) = session(BoardProfile {
            invalid_register_value: 0x00,
            ..BoardProfile::default()
        });
        let r = verify_register_class(&s, wdc::INVALID_REG, RegisterClass::Undefined);
        assert_eq!(r.mismatches, 1);
        assert_eq!(r.details[0].kind, MismatchKind::NotAllOnes);
    }

    #[test]
    fn direct_writes_stay_within_storage_bits() {
        let (s, board) = session(BoardProfile::default());
        assert!(verify_direct(&s, SDMAC_SSPBDAT).passed());
        let writes = board.long_writes(sdmac::SSPBDAT);
        assert_eq!(writes.len(), TEST_PATTERNS.len() + 1);
        assert!(writes.iter().all(|&w| w <= sdmac::SSPBDAT_MASK), "{writes:x?}");

        assert!(verify_memory_controller(&s).passed());
        assert!(board
            .long_writes(ramsey::ACR_ALT)
            .iter()
            .all(|&w| w & !ramsey::ACR_MASK == 0));
    }

    #[test]
    fn unknown_dma_engine_is_skipped() {
        let (s, _) = session(BoardProfile::default());
        let report = run_battery(&s, &DmaEngineVersion::Unknown);
        assert_eq!(report.skipped, vec![Subsystem::DmaEngine]);
        assert!(report.subsystem_passed(Subsystem::DmaEngine));
    }

    #[test]
    fn wtc_battery_on_sdmac02() {
        let (s, board) = session(BoardProfile::wd33c93());
        s.bus().write_u32(sdmac::WTC_ALT, 0x0000_1230);
        let r = verify_direct(&s, SDMAC_WTC);
        assert!(r.passed(), "{r:?}");
        assert_eq!(board.wtc(), 0x0000_1230);
    }

    #[test]
    fn wtc_battery_fails_on_sdmac04() {
        let (s, _) = session(BoardProfile::wd33c93a());
        assert!(!verify_direct(&s, SDMAC_WTC).passed());
    }
}
