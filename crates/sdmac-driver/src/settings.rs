//! Current WD33C93 configuration
//!
//! Decodes control, timeout period and synchronous transfer into the bus
//! mode, timeout and synchronous rate the OS driver left behind.

use crate::identity::ControllerModel;
use crate::session::Session;
use sdmac_chip::regs::wdc::{self, sync};
use sdmac_chip::timing::{timeout_ms, INCLK_NTSC_KHZ};

/// Host bus mode from the control register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    /// Polled I/O
    Polled,
    /// Burst mode DMA
    Burst,
    /// WD bus mode
    WdBus,
    /// Single-byte DMA
    Dma,
    /// Reserved encoding
    Unknown(u8),
}

impl BusMode {
    /// Decode the control register's mode field
    pub fn from_control(control: u8) -> Self {
        match control >> wdc::CONTROL_MODE_SHIFT {
            0 => Self::Polled,
            1 => Self::Burst,
            2 => Self::WdBus,
            4 => Self::Dma,
            other => Self::Unknown(other),
        }
    }
}

/// Synchronous transfer agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTransfer {
    /// REQ/ACK offset
    pub offset: u8,
    /// Offset is within the chip's limit
    pub offset_valid: bool,
    /// Transfer period in input-clock cycles
    pub period_cycles: u8,
    /// Transfer rate in kHz
    pub rate_khz: u32,
}

/// Decoded configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WdcSettings {
    /// Raw control register
    pub control: u8,
    /// Raw timeout period register
    pub tperiod: u8,
    /// Raw synchronous transfer register
    pub sync_reg: u8,
    /// Host bus mode
    pub bus_mode: BusMode,
    /// Input clock used for the derived values (kHz)
    pub input_clock_khz: u32,
    /// `input_clock_khz` came from a measurement
    pub clock_measured: bool,
    /// Selection timeout in milliseconds
    pub timeout_ms: u32,
    /// Synchronous transfer, `None` for asynchronous
    pub sync: Option<SyncTransfer>,
}

/// Clock divider the frequency-select field must hold for an input clock
pub fn frequency_divider(clock_khz: u32) -> u32 {
    match clock_khz {
        0..=10_000 => 2,
        10_001..=15_000 => 3,
        _ => 4,
    }
}

/// Decode the synchronous transfer register
pub fn decode_sync(sync_reg: u8, clock_khz: u32, model: ControllerModel) -> Option<SyncTransfer> {
    let offset = sync_reg & sync::OFFSET_MASK;
    if offset == 0 {
        return None;
    }
    let period_cycles = match (sync_reg >> sync::PERIOD_SHIFT) & 7 {
        0 | 1 => 8,
        n => n,
    };
    let mut divider = frequency_divider(clock_khz);
    let mut multiplier = 2;
    if model == ControllerModel::RevisionB && divider == 4 {
        multiplier = if sync_reg & sync::FSS != 0 { 2 } else { 1 };
        divider = 2;
    }
    Some(SyncTransfer {
        offset,
        offset_valid: offset <= sync::MAX_OFFSET,
        period_cycles,
        rate_khz: multiplier * clock_khz / divider / u32::from(period_cycles),
    })
}

/// Read and decode the configuration
///
/// `clock_khz` is the measured input clock; 0 falls back to the NTSC A3000
/// clock.
pub fn read_settings(session: &Session, clock_khz: u32, model: ControllerModel) -> WdcSettings {
    let control = session.wdc_read(wdc::CONTROL);
    let tperiod = session.wdc_read(wdc::TPERIOD);
    let sync_reg = session.wdc_read(wdc::SYNC_TX);
    let clock_measured = clock_khz != 0;
    let input_clock_khz = if clock_measured { clock_khz } else { INCLK_NTSC_KHZ };
    WdcSettings {
        control,
        tperiod,
        sync_reg,
        bus_mode: BusMode::from_control(control),
        input_clock_khz,
        clock_measured,
        timeout_ms: timeout_ms(tperiod, input_clock_khz),
        sync: decode_sync(sync_reg, input_clock_khz, model),
    }
}
