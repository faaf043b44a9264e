//! Identification and verification of the Amiga 3000 SCSI subsystem.
//!
//! The A3000's Super DMAC and its WD33C93 SCSI controller carry no usable ID
//! register. This crate infers chip generation, revision, microcode and
//! input clock from side effects (bit writability, reset status codes,
//! command timing) and verifies documented register semantics without
//! assuming prior register contents.
//!
//! # Layers
//!
//! ```text
//! probe::run_probe            full run: identify, settings, battery
//!   ├─ ramsey / dmac / wdc    identification
//!   ├─ clock                  input clock from a select timeout
//!   ├─ verify                 pattern battery per access class
//!   └─ scan                   SCSI bus walk
//! Session                     window primitive, exclusion, polling, snapshot
//! RegisterBus + InterruptMask + ReferenceTimer
//!   ├─ backends::devmem       /dev/mem on the real machine
//!   └─ backends::simulated    in-memory board
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use sdmac_driver::backends::devmem;
//! use sdmac_driver::{probe, ProbeConfig, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = devmem::open_platform("/dev/mem".as_ref())?;
//! let mut session = Session::new(platform, ProbeConfig::default());
//! let report = probe::run_probe(&mut session)?;
//! let id = &report.identification;
//! println!("{} at {} kHz", id.controller.model.name(), id.clock_khz);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod backends;
mod bus;
pub mod clock;
mod config;
pub mod dmac;
mod error;
mod exclusion;
mod identity;
pub mod probe;
pub mod ramsey;
pub mod scan;
mod session;
pub mod settings;
mod snapshot;
pub mod verify;
pub mod wdc;
mod window;

pub use bus::{InterruptMask, Platform, ReferenceTimer, RegisterBus};
pub use config::{devmem_path, ProbeConfig, DEFAULT_DEVMEM, DEVMEM_ENV};
pub use error::{Result, SdmacError};
pub use exclusion::{Exclusion, ExclusionGuard};
pub use identity::{
    microcode_label, ControllerIdentity, ControllerModel, DetectionFlags, DmaEngineVersion,
    DmaProbe, DmaProbeFailure,
};
pub use scan::AbortFlag;
pub use session::Session;
pub use snapshot::{RegisterSnapshot, SNAPSHOT_REGISTERS};
pub use window::ExtendedAccess;

/// Prelude for common imports
pub mod prelude {
    pub use crate::backends::{BoardProfile, SimulatedBoard};
    pub use crate::{
        ControllerIdentity, ControllerModel, DetectionFlags, DmaEngineVersion, ProbeConfig,
        Result, SdmacError, Session,
    };
}
