//! Identification results
//!
//! Plain data handed to the presentation layer; nothing here formats text
//! beyond short labels.

use bitflags::bitflags;
use sdmac_chip::regs::wdc::microcode;

/// DMA engine generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DmaEngineVersion {
    /// SDMAC-02: WTC bit 2 is read-write
    Version2,
    /// SDMAC-04: WTC bit 2 is hardwired clear
    Version4 {
        /// `"vX.Y"` revision of enhanced replacement parts
        revision: Option<String>,
    },
    /// Probe failed or was inconclusive
    Unknown,
}

impl DmaEngineVersion {
    /// SDMAC part number (2 or 4)
    pub fn number(&self) -> Option<u8> {
        match self {
            Self::Version2 => Some(2),
            Self::Version4 { .. } => Some(4),
            Self::Unknown => None,
        }
    }
}

/// Why the DMA engine probe gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaProbeFailure {
    /// FIFO reported empty and full at once
    InconsistentFifoState,
    /// A mixed pattern came back with every bit intact
    ReadOnlyBitsWritable,
    /// WTC bit 2 read back set where it cannot be stored
    BitCorruption,
}

/// Result of the DMA engine probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmaProbe {
    /// Classified generation
    pub version: DmaEngineVersion,
    /// Set when `version` is `Unknown` because of a contradiction
    pub failure: Option<DmaProbeFailure>,
}

/// WD33C93 family member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerModel {
    /// WD33C93: no advanced features
    Base,
    /// WD33C93A (or AM33C93A)
    RevisionA,
    /// WD33C93B
    RevisionB,
    /// Not detected
    Unknown,
}

impl ControllerModel {
    /// Part name
    pub fn name(self) -> &'static str {
        match self {
            Self::Base => "WD33C93",
            Self::RevisionA => "WD33C93A",
            Self::RevisionB => "WD33C93B",
            Self::Unknown => "unknown",
        }
    }

    /// Advanced features (and a microcode byte) are available
    pub fn is_advanced(self) -> bool {
        matches!(self, Self::RevisionA | Self::RevisionB)
    }
}

bitflags! {
    /// Symptoms explaining a failed or partial identification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DetectionFlags: u16 {
        /// Undefined register did not read `$ff`
        const INVALID_REGISTER = 1 << 0;
        /// Both reserved auxiliary status bits set
        const AUX_STATUS_BITS = 1 << 1;
        /// Writing the command phase changed auxiliary status
        const AUX_STATUS_WRITABLE = 1 << 2;
        /// Command phase did not round-trip
        const COMMAND_PHASE_MISMATCH = 1 << 3;
        /// SCSI status outside the defined groups
        const SCSI_STATUS_INCONSISTENT = 1 << 4;
        /// Target LUN reserved bits set
        const TARGET_LUN_RESERVED = 1 << 5;
        /// Command phase not a documented phase code
        const COMMAND_PHASE_INVALID = 1 << 6;
        /// Advanced-features reset returned an unexpected status
        const RESET_STATUS_UNEXPECTED = 1 << 7;
        /// Soft reset never completed
        const RESET_TIMEOUT = 1 << 8;
    }
}

/// Result of protocol controller identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerIdentity {
    /// Family member
    pub model: ControllerModel,
    /// Microcode byte, only for `RevisionA` / `RevisionB`
    pub microcode: Option<u8>,
    /// Every symptom observed on the way
    pub flags: DetectionFlags,
}

impl ControllerIdentity {
    /// Identification failed with the given symptoms
    pub fn unknown(flags: DetectionFlags) -> Self {
        Self {
            model: ControllerModel::Unknown,
            microcode: None,
            flags,
        }
    }

    /// Label of the microcode byte, if it is a known one
    pub fn microcode_label(&self) -> Option<&'static str> {
        self.microcode.and_then(microcode_label)
    }
}

/// Label of a known microcode byte
pub fn microcode_label(byte: u8) -> Option<&'static str> {
    match byte {
        microcode::REV_00 => Some("00-0x"),
        microcode::REV_08 => Some("00-08"),
        microcode::REV_09 => Some("00-09"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_microcode_is_surfaced_not_labelled() {
        let id = ControllerIdentity {
            model: ControllerModel::RevisionB,
            microcode: Some(0x42),
            flags: DetectionFlags::empty(),
        };
        assert_eq!(id.microcode_label(), None);
        assert_eq!(microcode_label(0x08), Some("00-08"));
    }

    #[test]
    fn flag_names_are_listed() {
        let flags = DetectionFlags::INVALID_REGISTER | DetectionFlags::TARGET_LUN_RESERVED;
        let names: Vec<_> = flags.iter_names().map(|(n, _)| n).collect();
        assert_eq!(names, ["INVALID_REGISTER", "TARGET_LUN_RESERVED"]);
    }
}
