//! Ramsey memory controller identification
//!
//! The only fatal check of a run: a version outside the three known
//! revisions means this is not an A3000 and nothing else is probed.

use crate::error::{Result, SdmacError};
use crate::session::Session;
use sdmac_chip::regs::ramsey::{self, ctrl, version};
use tracing::{debug, error};

/// Known Ramsey revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamseyRevision {
    /// Ramsey-01
    Rev01,
    /// Ramsey-04
    Rev04,
    /// Ramsey-07
    Rev07,
}

impl RamseyRevision {
    /// Classify a version register value
    pub fn from_version(value: u8) -> Option<Self> {
        match value {
            version::REV_01 => Some(Self::Rev01),
            version::REV_04 => Some(Self::Rev04),
            version::REV_07 => Some(Self::Rev07),
            _ => None,
        }
    }

    /// Revision number
    pub fn number(self) -> u8 {
        match self {
            Self::Rev01 => 1,
            Self::Rev04 => 4,
            Self::Rev07 => 7,
        }
    }
}

/// DRAM organisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DramType {
    /// 1Mx4 parts
    Mx4x1M,
    /// 256Kx4 parts
    Mx4x256K,
    /// 1Mx1 parts (Ramsey-04 and older)
    Mx1x1M,
}

/// Refresh interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Every N clocks
    Clocks(u16),
    /// Refresh off
    Disabled,
}

/// Decoded control register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RamseyConfig {
    /// Page mode
    pub page_mode: bool,
    /// Burst mode
    pub burst_mode: bool,
    /// Burst wrap
    pub wrap: bool,
    /// DRAM organisation
    pub dram: DramType,
    /// Skip bit (Ramsey-07 only)
    pub skip: bool,
    /// Refresh interval
    pub refresh: Refresh,
}

impl RamseyConfig {
    /// Decode a control register value for a revision
    pub fn decode(control: u8, revision: RamseyRevision) -> Self {
        let size_bit = control & ctrl::SIZE_256KX4_OR_SKIP != 0;
        let (dram, skip) = if control & ctrl::SIZE_1MX4 != 0 {
            (DramType::Mx4x1M, false)
        } else if revision == RamseyRevision::Rev07 {
            (DramType::Mx4x256K, size_bit)
        } else if size_bit {
            (DramType::Mx4x256K, false)
        } else {
            (DramType::Mx1x1M, false)
        };
        let refresh = match (control >> ctrl::REFRESH_SHIFT) & 3 {
            0 => Refresh::Clocks(154),
            1 => Refresh::Clocks(238),
            2 => Refresh::Clocks(380),
            _ => Refresh::Disabled,
        };
        Self {
            page_mode: control & ctrl::PAGE_MODE != 0,
            burst_mode: control & ctrl::BURST_MODE != 0,
            wrap: control & ctrl::WRAP != 0,
            dram,
            skip,
            refresh,
        }
    }

    /// Page or burst mode needs static-column RAM
    pub fn static_column_required(&self) -> bool {
        self.page_mode || self.burst_mode
    }
}

/// Memory controller identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamseyInfo {
    /// Revision
    pub revision: RamseyRevision,
    /// Raw control register
    pub control: u8,
    /// Decoded control register
    pub config: RamseyConfig,
}

/// Identify the memory controller
///
/// # Errors
///
/// Returns `UnsupportedPlatform` if the version register holds an unknown
/// value.
pub fn identify(session: &Session) -> Result<RamseyInfo> {
    let value = session.bus().read_u8(ramsey::VER);
    let Some(revision) = RamseyRevision::from_version(value) else {
        error!(version = value, "Unrecognized Ramsey version");
        return Err(SdmacError::UnsupportedPlatform { version: value });
    };
    let control = session.bus().read_u8(ramsey::CTRL);
    debug!(?revision, control, "Ramsey identified");
    Ok(RamseyInfo {
        revision,
        control,
        config: RamseyConfig::decode(control, revision),
    })
}
