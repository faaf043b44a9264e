//! Silicon model for the Amiga 3000 SCSI subsystem.
//!
//! This crate has **no dependencies** and **no hardware access**; it is a
//! pure model of the silicon: physical register addresses, register widths
//! and access classes, bit definitions, and the test-pattern batteries the
//! probers drive through them.
//!
//! Three chips are described:
//!
//! ```text
//! Chip        Base        Role
//! ─────────── ─────────── ────────────────────────────────────────────────
//! Ramsey      0x00DE0000  Memory controller (also hosts the DMA address reg)
//! SDMAC       0x00DD0000  Super DMAC, DMA engine + WD33C93 register window
//! WD33C93     (indirect)  SCSI protocol controller, 32 registers via SDMAC
//! ```
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Register map for all three chips, bit definitions, register tables |
//! | [`patterns`] | Verification and DMA-probe bit-pattern batteries |
//! | [`status`] | WD33C93 SCSI status groups and command-phase codes |
//! | [`timing`] | Clock and calibration constants |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod patterns;
pub mod regs;
pub mod status;
pub mod timing;
