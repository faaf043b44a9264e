//! Error types for SDMAC probe operations
//!
//! Only failures that make further probing pointless are errors. Inconclusive
//! identification, failed measurements and register mismatches are reported
//! as data by the probers.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for SDMAC operations
pub type Result<T> = std::result::Result<T, SdmacError>;

/// Errors that can occur during SDMAC operations
#[derive(Debug, Error)]
pub enum SdmacError {
    /// Memory controller version is not one of the known A3000 revisions
    #[error("Unrecognized Ramsey version ${version:02x} -- this program only works on Amiga 3000")]
    UnsupportedPlatform {
        /// Value read from the Ramsey version register
        version: u8,
    },

    /// Physical memory device could not be opened or mapped
    #[error("Cannot map {what}: {reason}")]
    Map {
        /// What was being mapped
        what: String,
        /// Reason for failure
        reason: String,
    },

    /// Physical memory device is missing
    #[error("Physical memory device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Register index outside the directly windowed or extended range
    #[error("Invalid WDC register ${reg:02x} (valid: $00-$1f, $40-$ff)")]
    InvalidRegister {
        /// Requested register index
        reg: u32,
    },

    /// Value does not fit the register width
    #[error("Value ${value:x} does not fit in {width} bits")]
    InvalidValue {
        /// Requested value
        value: u32,
        /// Register width in bits
        width: u32,
    },

    /// User abort observed at a safe point
    #[error("Aborted by user")]
    Aborted,
}

impl SdmacError {
    /// Create a mapping error
    pub fn map_failed(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Map {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Validate a register index for raw access
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegister` for `$20-$3f` and anything above `$ff`.
    pub fn check_register(reg: u32) -> Result<u8> {
        match u8::try_from(reg) {
            Ok(r) if r <= sdmac_chip::regs::wdc::LAST_DIRECT => Ok(r),
            Ok(r) if r >= sdmac_chip::regs::wdc::EXTENDED_BASE => Ok(r),
            _ => Err(Self::InvalidRegister { reg }),
        }
    }

    /// Validate a value against a register width in bits
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `value` has bits at or above `width`.
    pub fn check_value(value: u32, width: u32) -> Result<u32> {
        if width < 32 && value >> width != 0 {
            return Err(Self::InvalidValue { value, width });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_ranges() {
        assert_eq!(SdmacError::check_register(0x1f).ok(), Some(0x1f));
        assert_eq!(SdmacError::check_register(0x40).ok(), Some(0x40));
        assert!(SdmacError::check_register(0x20).is_err());
        assert!(SdmacError::check_register(0x3f).is_err());
        assert!(SdmacError::check_register(0x100).is_err());
    }

    #[test]
    fn value_widths() {
        assert!(SdmacError::check_value(0xff, 8).is_ok());
        assert!(SdmacError::check_value(0x100, 8).is_err());
        assert!(SdmacError::check_value(0xff_ffff, 24).is_ok());
        assert!(SdmacError::check_value(0x100_0000, 24).is_err());
    }

    #[test]
    fn messages_name_the_failure() {
        let e = SdmacError::UnsupportedPlatform { version: 0x42 };
        assert!(e.to_string().contains("$42"));
        assert!(e.to_string().contains("Amiga 3000"));
    }
}
