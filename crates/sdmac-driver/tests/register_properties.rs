//! Register access properties against the simulated board

use sdmac_chip::patterns::TEST_PATTERNS;
use sdmac_chip::regs::{sdmac, wdc};
use sdmac_driver::backends::{BoardProfile, SimulatedBoard, SimulatedDmac};
use sdmac_driver::verify::{verify_register_with, RegisterClass};
use sdmac_driver::{dmac, probe, ProbeConfig, Session};

fn setup(profile: BoardProfile) -> (Session, SimulatedBoard) {
    let board = SimulatedBoard::new(profile);
    let session = Session::new(board.platform(), ProbeConfig::default());
    (session, board)
}

/// Read-write register holds every pattern, in either order, without touching CONTROL
#[test]
fn test_read_write_register_any_order() {
    let (session, board) = setup(BoardProfile::default());
    board.set_wdc_register(wdc::CONTROL, 0x84);
    board.set_wdc_register(wdc::LADDR0, 0x3e);

    let forward = TEST_PATTERNS;
    let mut reversed = TEST_PATTERNS;
    reversed.reverse();

    for patterns in [forward, reversed] {
        let result =
            verify_register_with(&session, wdc::LADDR0, RegisterClass::ReadWrite, &patterns);
        assert!(result.passed(), "{result:?}");
        assert_eq!(board.wdc_register(wdc::CONTROL), 0x84);
        assert_eq!(board.wdc_register(wdc::LADDR0), 0x3e);
    }
}

/// Writes never change a read-only register
#[test]
fn test_read_only_register_ignores_writes() {
    let (session, _board) = setup(BoardProfile::default());
    let before = session.wdc_read(wdc::AUXST);
    for pattern in TEST_PATTERNS {
        session.wdc_write(wdc::AUXST, pattern as u8);
        assert_eq!(session.wdc_read(wdc::AUXST), before);
    }
    let result =
        verify_register_with(&session, wdc::AUXST, RegisterClass::ReadOnly, &TEST_PATTERNS);
    assert!(result.passed(), "{result:?}");
}

/// The undefined register always reads $ff
#[test]
fn test_undefined_register_reads_all_ones() {
    let (session, _board) = setup(BoardProfile::default());
    for pattern in TEST_PATTERNS {
        session.wdc_write(wdc::INVALID_REG, pattern as u8);
        assert_eq!(session.wdc_read(wdc::INVALID_REG), 0xff);
    }
}

/// Index register is back to its prior value after every access
#[test]
fn test_index_restored_after_access() {
    let (session, board) = setup(BoardProfile::default());
    session.bus().write_u8(sdmac::SASR_B2, wdc::SYNC_TX);

    session.wdc_write(wdc::LADDR0, 0x11);
    assert_eq!(session.wdc_index(), wdc::SYNC_TX);
    assert_eq!(session.wdc_read(wdc::LADDR0), 0x11);
    assert_eq!(board.index(), wdc::SYNC_TX);

    session.wdc_write24(wdc::TCOUNT2, 0x12_3456);
    assert_eq!(board.index(), wdc::SYNC_TX);
    assert_eq!(board.wdc_register(wdc::TCOUNT2), 0x12);
    assert_eq!(board.wdc_register(wdc::TCOUNT1), 0x34);
    assert_eq!(board.wdc_register(wdc::TCOUNT0), 0x56);
}

/// Index register and interrupt state survive a faulting data access
#[test]
fn test_index_restored_when_data_access_faults() {
    let (session, board) = setup(BoardProfile {
        fault_register: Some(wdc::LADDR0),
        ..BoardProfile::default()
    });
    session.bus().write_u8(sdmac::SASR_B2, wdc::SYNC_TX);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        session.wdc_write(wdc::LADDR0, 0x11);
    }));
    assert!(outcome.is_err());
    assert_eq!(board.index(), wdc::SYNC_TX);
    assert_eq!(session.exclusion_depth(), 0);
    assert!(!board.interrupts_masked());
}

/// Running the DMA probe twice gives the same answer
#[test]
fn test_dma_probe_is_deterministic() {
    for dmac_kind in [
        SimulatedDmac::Sdmac02,
        SimulatedDmac::Sdmac04,
        SimulatedDmac::FullyWritable,
        SimulatedDmac::ProbeBitStuck,
    ] {
        let (session, _board) = setup(BoardProfile {
            dmac: dmac_kind,
            ..BoardProfile::default()
        });
        let first = dmac::probe_version(&session);
        let second = dmac::probe_version(&session);
        assert_eq!(first, second, "{dmac_kind:?}");
    }
}

/// No window access happens with interrupts enabled
#[test]
fn test_full_run_keeps_window_under_exclusion() {
    let (mut session, board) = setup(BoardProfile::wd33c93b());
    probe::run_probe(&mut session).expect("known Ramsey");
    assert_eq!(board.unmasked_window_accesses(), 0);
    assert!(board.mask_transitions() > 0);
    assert!(!board.interrupts_masked());
}

/// A full run leaves the snapshot registers as it found them
#[test]
fn test_full_run_restores_registers() {
    let (mut session, board) = setup(BoardProfile::default());
    let before = [
        (wdc::OWN_ID, 0x07),
        (wdc::CONTROL, 0x80),
        (wdc::TPERIOD, 0x20),
        (wdc::CMDPHASE, 0x46),
        (wdc::SYNC_TX, 0x4c),
    ];
    for (reg, value) in before {
        board.set_wdc_register(reg, value);
    }
    probe::run_probe(&mut session).expect("known Ramsey");
    for (reg, value) in before {
        assert_eq!(board.wdc_register(reg), value, "register {reg:#04x}");
    }
    assert_eq!(session.snapshot().depth(), 0);
}

/// Extended registers on the B revision go through the mailbox
#[test]
fn test_extended_register_mailbox() {
    let (session, board) = setup(BoardProfile::wd33c93b());
    let written = session.wdc_write_extended(0x45, 0x99);
    assert!(written.completed);
    assert_eq!(board.extended_register(0x45), 0x99);

    let read = session.wdc_read_extended(0x45);
    assert!(read.completed);
    assert_eq!(read.value, 0x99);
}

/// The A revision rejects the mailbox commands; the failure is data, not a panic
#[test]
fn test_extended_register_mailbox_unsupported() {
    let (session, _board) = setup(BoardProfile::wd33c93a());
    let read = session.wdc_read_extended(0x45);
    assert!(!read.completed);
    assert_eq!(read.status, Some(0x40));
}
