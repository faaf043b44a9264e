//! Identification scenarios against the simulated board

use sdmac_chip::timing::INCLK_NTSC_KHZ;
use sdmac_driver::backends::{BoardProfile, SimulatedBoard, SimulatedDmac};
use sdmac_driver::verify::Subsystem;
use sdmac_driver::{
    dmac, probe, wdc, ControllerModel, DetectionFlags, DmaEngineVersion, DmaProbeFailure,
    ProbeConfig, SdmacError, Session,
};

fn setup(profile: BoardProfile, config: ProbeConfig) -> (Session, SimulatedBoard) {
    let board = SimulatedBoard::new(profile);
    let session = Session::new(board.platform(), config);
    (session, board)
}

fn near_ntsc(khz: u32) -> bool {
    (i64::from(khz) - i64::from(INCLK_NTSC_KHZ)).abs() * 50 < i64::from(INCLK_NTSC_KHZ)
}

/// Reset status 0x00 after enabling advanced features means WD33C93
#[test]
fn test_base_controller() {
    let (session, _board) = setup(BoardProfile::wd33c93(), ProbeConfig::default());
    let identity = wdc::identify(&session);
    assert_eq!(identity.model, ControllerModel::Base);
    assert_eq!(identity.microcode, None);
    assert!(identity.flags.is_empty());
}

/// Reset status 0x01 and a working QUETAG means WD33C93B
#[test]
fn test_revision_b_controller() {
    let (session, _board) = setup(BoardProfile::wd33c93b(), ProbeConfig::default());
    let identity = wdc::identify(&session);
    assert_eq!(identity.model, ControllerModel::RevisionB);
    assert_eq!(identity.microcode_label(), Some("00-09"));
}

/// Reset status 0x01 but QUETAG drops 0xa5 means WD33C93A
#[test]
fn test_quetag_stub_means_revision_a() {
    let profile = BoardProfile {
        quetag_drops: Some(0xa5),
        ..BoardProfile::wd33c93b()
    };
    let (session, _board) = setup(profile, ProbeConfig::default());
    let identity = wdc::identify(&session);
    assert_eq!(identity.model, ControllerModel::RevisionA);
    assert!(identity.microcode.is_some());
}

/// A broken undefined register fails identification but the run goes on
#[test]
fn test_invalid_register_still_measures_clock() {
    let profile = BoardProfile {
        invalid_register_value: 0x00,
        ..BoardProfile::default()
    };
    let (mut session, _board) = setup(profile, ProbeConfig::default());
    let report = probe::run_probe(&mut session).expect("known Ramsey");
    let id = &report.identification;
    assert_eq!(id.controller.model, ControllerModel::Unknown);
    assert!(id.controller.flags.contains(DetectionFlags::INVALID_REGISTER));
    assert!(near_ntsc(id.clock_khz), "{}", id.clock_khz);
    assert!(!report.verification.subsystem_passed(Subsystem::ProtocolController));
    assert!(report.verification.subsystem_passed(Subsystem::MemoryController));
}

/// A select that never signals gives a zero clock and nothing else fails
#[test]
fn test_clock_timeout_is_not_fatal() {
    let profile = BoardProfile {
        select_completes: false,
        ..BoardProfile::default()
    };
    let config = ProbeConfig {
        poll_limit: 50,
        ..ProbeConfig::default()
    };
    let (mut session, _board) = setup(profile, config);
    let report = probe::run_probe(&mut session).expect("known Ramsey");
    let id = &report.identification;
    assert_eq!(id.clock_khz, 0);
    assert_eq!(id.controller.model, ControllerModel::RevisionA);
    assert!(!report.settings.clock_measured);
    assert!(report.passed(), "{:?}", report.verification);
}

/// WTC storing a mixed pattern intact is a contradiction
#[test]
fn test_writable_read_only_bits() {
    let profile = BoardProfile {
        dmac: SimulatedDmac::FullyWritable,
        ..BoardProfile::default()
    };
    let (session, _board) = setup(profile, ProbeConfig::default());
    let probe = dmac::probe_version(&session);
    assert_eq!(probe.version, DmaEngineVersion::Unknown);
    assert_eq!(probe.failure, Some(DmaProbeFailure::ReadOnlyBitsWritable));
}

/// Unknown DMA engine skips its register test instead of failing it
#[test]
fn test_unknown_dma_engine_skips_register_test() {
    let profile = BoardProfile {
        dmac: SimulatedDmac::FullyWritable,
        ..BoardProfile::default()
    };
    let (mut session, _board) = setup(profile, ProbeConfig::default());
    let report = probe::run_probe(&mut session).expect("known Ramsey");
    assert_eq!(report.verification.skipped, vec![Subsystem::DmaEngine]);
    assert!(report.passed());
}

/// Full run on a healthy A3000
#[test]
fn test_healthy_a3000() {
    let (mut session, _board) = setup(BoardProfile::default(), ProbeConfig::default());
    let report = probe::run_probe(&mut session).expect("known Ramsey");
    let id = &report.identification;
    assert_eq!(id.ramsey.revision.number(), 7);
    assert_eq!(id.dma.version, DmaEngineVersion::Version4 { revision: None });
    assert_eq!(id.controller.model, ControllerModel::RevisionA);
    assert!(near_ntsc(id.clock_khz), "{}", id.clock_khz);
    assert!(report.passed());
}

/// Unknown memory controller stops the run
#[test]
fn test_unsupported_platform_is_fatal() {
    let profile = BoardProfile {
        ramsey_version: 0x00,
        ..BoardProfile::default()
    };
    let (mut session, board) = setup(profile, ProbeConfig::default());
    let err = probe::run_probe(&mut session).unwrap_err();
    assert!(matches!(err, SdmacError::UnsupportedPlatform { version: 0x00 }));
    assert_eq!(board.mask_transitions(), 0);
}
