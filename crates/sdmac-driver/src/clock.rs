//! Input clock estimation
//!
//! The controller's oscillator frequency cannot be read. It is inferred by
//! timing a select timeout against the reference timer: select an ID that
//! never answers with a short TPERIOD, count reference ticks until the SDMAC
//! raises its SCSI interrupt, subtract the per-revision command overhead and
//! invert `TPERIOD = period_ms * clk_MHz / 80`.

use crate::identity::ControllerModel;
use crate::session::Session;
use sdmac_chip::regs::sdmac::{self, istr};
use sdmac_chip::regs::wdc::{self, cmd};
use sdmac_chip::status;
use sdmac_chip::timing::{
    eclock_to_ticks, ABSENT_TARGET, SELECT_OVERHEAD_WD33C93, SELECT_OVERHEAD_WD33C93A,
    SELECT_OVERHEAD_WD33C93B, TIMEOUT_DIVISOR,
};
use tracing::{debug, info, warn};

/// Select-command overhead of a revision, in E-clock ticks
pub fn select_overhead_eclocks(model: ControllerModel) -> u64 {
    match model {
        ControllerModel::RevisionA => SELECT_OVERHEAD_WD33C93A,
        ControllerModel::RevisionB => SELECT_OVERHEAD_WD33C93B,
        ControllerModel::Base | ControllerModel::Unknown => SELECT_OVERHEAD_WD33C93,
    }
}

/// Input clock in kHz from a measured timeout
///
/// `delta_ticks` is the raw tick count, overhead included. Returns 0 when
/// nothing is left after the overhead.
pub fn clock_khz_from_ticks(
    delta_ticks: u64,
    frequency: u64,
    tperiod: u8,
    model: ControllerModel,
) -> u32 {
    let overhead = eclock_to_ticks(select_overhead_eclocks(model), frequency);
    let ticks = delta_ticks.saturating_sub(overhead);
    if ticks == 0 {
        return 0;
    }
    // period_s = tperiod * 80 / kHz, period_s = ticks / frequency
    let khz = u128::from(tperiod) * u128::from(TIMEOUT_DIVISOR) * u128::from(frequency)
        / u128::from(ticks);
    u32::try_from(khz).unwrap_or(0)
}

/// Measure the controller's input clock
///
/// Returns 0 when the reference timer is unavailable, the timeout
/// interrupt never arrives within the poll ceiling, or the select ends with
/// anything but a timeout. A select that connects is disconnected again. Registers touched are
/// put back; the select leaves the controller idle.
pub fn estimate_clock_khz(session: &Session, model: ControllerModel) -> u32 {
    let Some(frequency) = session.reference_hz() else {
        warn!("No reference timer; clock not measured");
        return 0;
    };
    let tperiod = session.config().clock_tperiod;
    let bus = session.bus();
    let timer = session.timer();

    let _irq = session.exclude();
    let saved_dst = session.wdc_read(wdc::DST_ID);
    let saved_lun = session.wdc_read(wdc::LUN);
    let saved_tperiod = session.wdc_read(wdc::TPERIOD);

    session.clear_pending_interrupt();
    session.wdc_write(wdc::DST_ID, ABSENT_TARGET);
    session.wdc_write(wdc::LUN, ABSENT_TARGET);
    session.wdc_write(wdc::TPERIOD, tperiod);

    let start = timer.ticks();
    session.wdc_write(wdc::CMD, cmd::SELECT_ATN);
    let done = session.poll("select timeout", || {
        bus.read_u8(sdmac::ISTR) & istr::INT_S != 0
    });
    let end = timer.ticks();

    let khz = match done.map(|_| session.wdc_read(wdc::SCSI_STAT)) {
        Some(status::SELECT_TIMEOUT) => {
            let delta = end.wrapping_sub(start);
            let khz = clock_khz_from_ticks(delta, frequency, tperiod, model);
            debug!(delta, frequency, khz, "Select timeout measured");
            khz
        }
        Some(status::SELECT_COMPLETE) => {
            warn!(target = ABSENT_TARGET, "Clock select answered; disconnecting");
            session.wdc_command(cmd::DISCONNECT);
            0
        }
        Some(other) => {
            warn!(status = other, "Clock select ended without a timeout");
            0
        }
        None => {
            warn!("Select timeout never signalled; clock not measured");
            0
        }
    };

    session.wdc_write(wdc::DST_ID, saved_dst);
    session.wdc_write(wdc::LUN, saved_lun);
    session.wdc_write(wdc::TPERIOD, saved_tperiod);

    if khz != 0 {
        info!(khz, "WDC input clock");
    }
    khz
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BoardProfile, SimulatedBoard};
    use crate::config::ProbeConfig;
    use sdmac_chip::timing::{ECLOCK_HZ, INCLK_PAL_KHZ};

    #[test]
    fn inverts_the_timeout_formula() {
        // 4 * 80 / 14.318 MHz = 22.35 ms of E-clock, plus overhead
        let ticks = ECLOCK_HZ * 4 * 80 / 14_318 + SELECT_OVERHEAD_WD33C93A;
        let khz = clock_khz_from_ticks(ticks, ECLOCK_HZ, 4, ControllerModel::RevisionA);
        assert!((14_300..14_340).contains(&khz), "{khz}");
    }

    #[test]
    fn nothing_left_after_overhead() {
        assert_eq!(clock_khz_from_ticks(100, ECLOCK_HZ, 4, ControllerModel::Base), 0);
    }

    #[test]
    fn measures_simulated_pal_clock() {
        let board = SimulatedBoard::new(BoardProfile {
            input_clock_khz: INCLK_PAL_KHZ,
            ..BoardProfile::wd33c93b()
        });
        let session = Session::new(board.platform(), ProbeConfig::default());
        let khz = estimate_clock_khz(&session, ControllerModel::RevisionB);
        let error = (i64::from(khz) - i64::from(INCLK_PAL_KHZ)).abs();
        assert!(error * 50 < i64::from(INCLK_PAL_KHZ), "{khz}");
        assert_eq!(board.wdc_register(wdc::DST_ID), 0);
        assert_eq!(board.wdc_register(wdc::TPERIOD), 0x20);
    }

    #[test]
    fn answered_select_is_not_a_measurement() {
        let board = SimulatedBoard::new(BoardProfile {
            own_id: 0x06,
            present_targets: 1 << ABSENT_TARGET,
            ..BoardProfile::default()
        });
        let session = Session::new(board.platform(), ProbeConfig::default());
        assert_eq!(estimate_clock_khz(&session, ControllerModel::RevisionA), 0);
        assert_eq!(board.wdc_register(wdc::CMD), cmd::DISCONNECT);
        assert_eq!(board.wdc_register(wdc::SCSI_STAT), status::DISCONNECTED);
    }

    #[test]
    fn missing_timer_reports_zero() {
        let board = SimulatedBoard::new(BoardProfile {
            timer_available: false,
            ..BoardProfile::default()
        });
        let session = Session::new(board.platform(), ProbeConfig::default());
        assert_eq!(estimate_clock_khz(&session, ControllerModel::RevisionA), 0);
    }
}
