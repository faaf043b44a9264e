//! WD33C93 identification
//!
//! None of the family has an ID register. Identification walks a small
//! state machine, each step inferring from side effects:
//!
//! ```text
//! Unverified ──basic checks──▶ BasicsChecked ──EAF reset──▶ AdvancedFeaturesProbed
//!     │ any flag                   │ status 0x00 / other         │ QUETAG + RAF reset
//!     ▼                            ▼                             ▼
//!  Unknown(flags)            Base / Unknown(flags)        RevisionA / RevisionB
//! ```
//!
//! Resets and command waits are bounded; a timeout becomes a flag, never an
//! error, so identification always terminates with a classification.

use crate::identity::{ControllerIdentity, ControllerModel, DetectionFlags};
use crate::session::Session;
use sdmac_chip::patterns::{CMDPHASE_PATTERNS, QUETAG_PATTERNS};
use sdmac_chip::regs::wdc::{self, aux, own_id};
use sdmac_chip::status::{self, StatusGroup, VALID_COMMAND_PHASES};
use tracing::{debug, info, warn};

/// Identification progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyState {
    /// Nothing checked yet
    Unverified,
    /// Consistency checks passed
    BasicsChecked,
    /// Advanced-features reset answered `0x01`; A or B
    AdvancedFeaturesProbed,
    /// Terminal
    Done(ControllerIdentity),
}

/// Step-wise controller identification over a session
#[derive(Debug)]
pub struct Identifier<'s> {
    session: &'s Session,
    state: IdentifyState,
}

impl<'s> Identifier<'s> {
    /// Start identification
    pub fn new(session: &'s Session) -> Self {
        Self {
            session,
            state: IdentifyState::Unverified,
        }
    }

    /// Current state
    pub fn state(&self) -> IdentifyState {
        self.state
    }

    /// Perform one transition; terminal states are left unchanged
    pub fn step(&mut self) -> IdentifyState {
        let next = match self.state {
            IdentifyState::Unverified => {
                let flags = check_basics(self.session);
                if flags.is_empty() {
                    IdentifyState::BasicsChecked
                } else {
                    warn!(?flags, "WDC basic checks failed");
                    IdentifyState::Done(ControllerIdentity::unknown(flags))
                }
            }
            IdentifyState::BasicsChecked => probe_advanced_features(self.session),
            IdentifyState::AdvancedFeaturesProbed => {
                IdentifyState::Done(classify_advanced(self.session))
            }
            done @ IdentifyState::Done(_) => done,
        };
        debug!(from = ?self.state, to = ?next, "Identification step");
        self.state = next;
        next
    }

    /// Run to a terminal state
    pub fn run(mut self) -> ControllerIdentity {
        loop {
            if let IdentifyState::Done(identity) = self.step() {
                info!(model = identity.model.name(), microcode = ?identity.microcode, "WDC identified");
                return identity;
            }
        }
    }
}

/// Identify the attached controller
pub fn identify(session: &Session) -> ControllerIdentity {
    Identifier::new(session).run()
}

/// Consistency checks any family member passes; every check runs
pub fn check_basics(session: &Session) -> DetectionFlags {
    let _irq = session.exclude();
    let mut flags = DetectionFlags::empty();

    if session.wdc_read(wdc::INVALID_REG) != 0xff {
        flags |= DetectionFlags::INVALID_REGISTER;
    }

    let auxst = session.wdc_read(wdc::AUXST);
    let reserved = aux::RESERVED_LO | aux::RESERVED_HI;
    if auxst & reserved == reserved {
        flags |= DetectionFlags::AUX_STATUS_BITS;
    }

    if session.wdc_read(wdc::LUN) & wdc::LUN_RESERVED != 0 {
        flags |= DetectionFlags::TARGET_LUN_RESERVED;
    }

    let phase = session.wdc_read(wdc::CMDPHASE);
    if !VALID_COMMAND_PHASES.contains(&phase) {
        flags |= DetectionFlags::COMMAND_PHASE_INVALID;
    }
    for pattern in CMDPHASE_PATTERNS {
        session.wdc_write(wdc::CMDPHASE, pattern);
        if session.wdc_read(wdc::AUXST) != auxst {
            flags |= DetectionFlags::AUX_STATUS_WRITABLE;
        }
        if session.wdc_read(wdc::CMDPHASE) != pattern {
            flags |= DetectionFlags::COMMAND_PHASE_MISMATCH;
        }
    }
    session.wdc_write(wdc::CMDPHASE, phase);

    let scsi_status = session.wdc_read(wdc::SCSI_STAT);
    if StatusGroup::from_status(scsi_status).is_none() {
        flags |= DetectionFlags::SCSI_STATUS_INCONSISTENT;
    }

    debug!(?flags, auxst, phase, scsi_status, "WDC basic checks");
    flags
}

fn probe_advanced_features(session: &Session) -> IdentifyState {
    let _irq = session.exclude();
    let own = session.wdc_read(wdc::OWN_ID);
    match session.wdc_reset(own | own_id::EAF) {
        Some(status::RESET) => IdentifyState::Done(ControllerIdentity {
            model: ControllerModel::Base,
            microcode: None,
            flags: DetectionFlags::empty(),
        }),
        Some(status::RESET_ADVANCED) => IdentifyState::AdvancedFeaturesProbed,
        Some(other) => {
            warn!(status = other, "Unexpected status after advanced-features reset");
            IdentifyState::Done(ControllerIdentity::unknown(
                DetectionFlags::RESET_STATUS_UNEXPECTED,
            ))
        }
        None => IdentifyState::Done(ControllerIdentity::unknown(DetectionFlags::RESET_TIMEOUT)),
    }
}

/// QUETAG holds storage on the B revision only
///
/// CONTROL is re-read after every access to catch index drift.
pub fn quetag_is_storage(session: &Session) -> bool {
    let _irq = session.exclude();
    let control = session.wdc_read(wdc::CONTROL);
    let saved = session.wdc_read(wdc::QUETAG);
    let stores = QUETAG_PATTERNS.iter().all(|&pattern| {
        session.wdc_write(wdc::QUETAG, pattern);
        let readback = session.wdc_read(wdc::QUETAG);
        if session.wdc_read(wdc::CONTROL) != control {
            warn!(pattern, "CONTROL changed while probing QUETAG");
            return false;
        }
        if readback != pattern {
            debug!(pattern, readback, "QUETAG did not hold pattern");
            return false;
        }
        true
    });
    session.wdc_write(wdc::QUETAG, saved);
    stores
}

/// Reset with really-advanced features and read the microcode byte
fn read_microcode(session: &Session) -> Result<u8, DetectionFlags> {
    let _irq = session.exclude();
    let own = session.wdc_read(wdc::OWN_ID);
    match session.wdc_reset(own | own_id::EAF | own_id::RAF) {
        Some(status) => {
            let microcode = session.wdc_read(wdc::MICROCODE);
            debug!(status, microcode, "Really-advanced reset");
            Ok(microcode)
        }
        None => Err(DetectionFlags::RESET_TIMEOUT),
    }
}

fn classify_advanced(session: &Session) -> ControllerIdentity {
    let model = if quetag_is_storage(session) {
        ControllerModel::RevisionB
    } else {
        ControllerModel::RevisionA
    };
    match read_microcode(session) {
        Ok(byte) => ControllerIdentity {
            model,
            microcode: Some(byte),
            flags: DetectionFlags::empty(),
        },
        Err(flags) => ControllerIdentity {
            model,
            microcode: None,
            flags,
        },
    }
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
    fn walks_every_state() {
        let (s, _) = session(BoardProfile::wd33c93b());
        let mut id = Identifier::new(&s);
        assert_eq!(id.step(), IdentifyState::BasicsChecked);
        assert_eq!(id.step(), IdentifyState::AdvancedFeaturesProbed);
        let IdentifyState::Done(identity) = id.step() else {
            panic!("not terminal: {:?}", id.state());
        };
        assert_eq!(identity.model, ControllerModel::RevisionB);
        assert_eq!(identity.microcode, Some(0x09));
        assert_eq!(id.step(), IdentifyState::Done(identity));
    }

    #[test]
    fn all_basic_symptoms_are_collected() {
        let (s, board) = session(BoardProfile {
            invalid_register_value: 0x00,
            ..BoardProfile::default()
        });
        board.set_wdc_register(wdc::LUN, 0x38);
        board.set_wdc_register(wdc::CMDPHASE, 0x7f);
        let flags = check_basics(&s);
        assert!(flags.contains(DetectionFlags::INVALID_REGISTER));
        assert!(flags.contains(DetectionFlags::TARGET_LUN_RESERVED));
        assert!(flags.contains(DetectionFlags::COMMAND_PHASE_INVALID));
        assert!(!flags.contains(DetectionFlags::COMMAND_PHASE_MISMATCH));
        // phase put back
        assert_eq!(board.wdc_register(wdc::CMDPHASE), 0x7f);
    }

    #[test]
    fn stuck_command_phase_is_a_mismatch() {
        let (s, _) = session(BoardProfile {
            ignores_writes: Some(wdc::CMDPHASE),
            ..BoardProfile::default()
        });
        assert!(check_basics(&s).contains(DetectionFlags::COMMAND_PHASE_MISMATCH));
    }

    #[test]
    fn undefined_status_group() {
        let (s, board) = session(BoardProfile::default());
        board.set_wdc_register(wdc::SCSI_STAT, 0x30);
        assert!(check_basics(&s).contains(DetectionFlags::SCSI_STATUS_INCONSISTENT));
    }

    #[test]
    fn reserved_aux_bits_collected_with_other_symptoms() {
        let (s, _) = session(BoardProfile {
            aux_static: aux::RESERVED_LO | aux::RESERVED_HI,
            invalid_register_value: 0x00,
            ..BoardProfile::default()
        });
        let id = identify(&s);
        assert_eq!(id.model, ControllerModel::Unknown);
        assert_eq!(
            id.flags,
            DetectionFlags::AUX_STATUS_BITS | DetectionFlags::INVALID_REGISTER
        );
    }

    #[test]
    fn one_reserved_aux_bit_is_tolerated() {
        let (s, _) = session(BoardProfile {
            aux_static: aux::RESERVED_HI,
            ..BoardProfile::default()
        });
        assert!(check_basics(&s).is_empty());
    }

    #[test]
    fn aux_status_changed_by_command_phase_write() {
        let (s, board) = session(BoardProfile {
            aux_tracks_cmdphase: true,
            ..BoardProfile::default()
        });
        board.set_wdc_register(wdc::LUN, 0x08);
        let flags = check_basics(&s);
        assert_eq!(
            flags,
            DetectionFlags::AUX_STATUS_WRITABLE | DetectionFlags::TARGET_LUN_RESERVED
        );
        assert_eq!(board.wdc_register(wdc::CMDPHASE), 0x00);
    }

    #[test]
    fn reset_that_never_finishes() {
        let board = SimulatedBoard::new(BoardProfile {
            reset_completes: false,
            ..BoardProfile::default()
        });
        let config = ProbeConfig {
            poll_limit: 50,
            ..ProbeConfig::default()
        };
        let s = Session::new(board.platform(), config);
        let mut id = Identifier::new(&s);
        assert_eq!(id.step(), IdentifyState::BasicsChecked);
        let IdentifyState::Done(identity) = id.step() else {
            panic!("not terminal: {:?}", id.state());
        };
        assert_eq!(identity.model, ControllerModel::Unknown);
        assert_eq!(identity.flags, DetectionFlags::RESET_TIMEOUT);
        assert_ne!(board.wdc_register(wdc::OWN_ID) & own_id::EAF, 0);
    }

    #[test]
    fn unexpected_reset_status() {
        let (s, _) = session(BoardProfile {
            reset_status: Some(0x02),
            ..BoardProfile::default()
        });
        let id = identify(&s);
        assert_eq!(id.model, ControllerModel::Unknown);
        assert_eq!(id.flags, DetectionFlags::RESET_STATUS_UNEXPECTED);
    }

    #[test]
    fn revision_a_microcode() {
        let (s, _) = session(BoardProfile::wd33c93a());
        let id = identify(&s);
        assert_eq!(id.model, ControllerModel::RevisionA);
        assert_eq!(id.microcode_label(), Some("00-08"));
    }

    #[test]
    fn quetag_probe_restores_value() {
        let (s, board) = session(BoardProfile::wd33c93b());
        board.set_wdc_register(wdc::QUETAG, 0x33);
        assert!(quetag_is_storage(&s));
        assert_eq!(board.wdc_register(wdc::QUETAG), 0x33);
    }
}
