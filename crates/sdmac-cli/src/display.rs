//! Text rendering of probe results and register decode tables

use sdmac_chip::status::StatusGroup;
use sdmac_driver::ramsey::{DramType, RamseyConfig, RamseyInfo, Refresh};
use sdmac_driver::scan::{TargetProbe, TargetStatus};
use sdmac_driver::settings::{BusMode, WdcSettings};
use sdmac_driver::verify::{Mismatch, MismatchKind, VerificationResult};
use sdmac_driver::{ControllerIdentity, ControllerModel, DmaEngineVersion, DmaProbe, DmaProbeFailure};
use std::fmt::Write;

/// SCSI bus phase names, indexed by MSG/CD/IO
const PHASES: [&str; 8] = [
    "Data Out",
    "Data In",
    "Command",
    "Status",
    "Unspecified Info Out",
    "Unspecified Info In",
    "Message Out",
    "Message In",
];

const COMMANDS: [Option<&str>; 0x19] = [
    Some("Reset"),
    Some("Abort"),
    Some("Assert ATN"),
    Some("Negate ACK"),
    Some("Disconnect"),
    Some("Reselect"),
    Some("Select-with-ATN"),
    Some("Select-without-ATN"),
    Some("Select-with-ATN-and-Transfer"),
    Some("Select-without-ATN-and-Transfer"),
    Some("Reselect-and-Receive-Data"),
    Some("Reselect-and-Send-Data"),
    Some("Wait-for-Select-and-Receive"),
    Some("Send-Status-and-Command-Complete"),
    Some("Send-Disconnect-Message"),
    Some("Set IDI"),
    Some("Receive Command"),
    Some("Receive Data"),
    Some("Receive Message Out"),
    Some("Receive Unspecified Info Out"),
    Some("Send Status"),
    Some("Send Data"),
    Some("Send Message In"),
    Some("Send Unspecified Info In"),
    Some("Translate Address"),
];

/// Name of a WD33C93 command code
pub fn command_name(command: u8) -> Option<&'static str> {
    match command {
        0x20 => Some("Transfer Info"),
        c => COMMANDS.get(usize::from(c)).copied().flatten(),
    }
}

fn phase(code: u8) -> &'static str {
    PHASES[usize::from(code & 7)]
}

/// Describe a SCSI status register value
pub fn scsi_status_text(status: u8) -> String {
    let code = status & 0x0f;
    let transfer = code & 0x08 != 0;
    let (group, detail) = match StatusGroup::from_status(status) {
        Some(StatusGroup::Reset) => (
            "Reset state",
            match code {
                0 => "Reset".to_string(),
                1 => "Reset with Advanced features".to_string(),
                _ => format!("Unknown code {code:x}"),
            },
        ),
        Some(StatusGroup::Complete) => (
            "Command complete",
            match code {
                0 => "Reselect as target success".to_string(),
                1 => "Reselect as initiator success".to_string(),
                3 => "Success, no ATN".to_string(),
                4 => "Success, ATN".to_string(),
                5 => "Translate Address success".to_string(),
                6 => "Select-and-Transfer success".to_string(),
                _ if transfer => format!("Transfer Info success: {} phase", phase(code)),
                _ => format!("Unknown code {code:x}"),
            },
        ),
        Some(StatusGroup::Paused) => (
            "Command paused/aborted",
            match code {
                0 => "Transfer Info, ACK".to_string(),
                1 => "Save-Data-Pointer during Select-and-Transfer".to_string(),
                2 => "Select, Reselect, or Wait-for-Select aborted".to_string(),
                3 => "Receive or Send aborted, or Wait-for-select error".to_string(),
                4 => "Command aborted, ATN".to_string(),
                5 => "Transfer Aborted, protocol violation".to_string(),
                6 => "Queue Tag mismatch, ACK".to_string(),
                7 => "Dest ID/LUN != reselect source, ACK".to_string(),
                _ => format!("Unknown code {code:x}"),
            },
        ),
        Some(StatusGroup::Error) => (
            "Command error",
            match code {
                0 => "Invalid command".to_string(),
                1 => "Unexpected disconnect".to_string(),
                2 => "Timeout during Select or Reselect".to_string(),
                3 => "Parity error, no ATN".to_string(),
                4 => "Parity error, ATN".to_string(),
                5 => "Translate Address > disk boundary".to_string(),
                6 => "Select-and-Transfer reselect Target != Dest".to_string(),
                7 => "Status parity error during Select-and-Transfer".to_string(),
                _ => format!("Unexpected change requested: {} phase", phase(code)),
            },
        ),
        Some(StatusGroup::Service) => (
            "Bus Svc Required",
            match code {
                0 => "WDC reselected as initiator".to_string(),
                1 => "WDC reselected in advanced mode, ACK".to_string(),
                2 => "WDC selected as target, no ATN".to_string(),
                3 => "WDC selected as target, ATN".to_string(),
                4 => "ATN".to_string(),
                5 => "Target disconnected".to_string(),
                7 => "Wait-for-Select paused, unknown target command".to_string(),
                _ if transfer => format!("REQ during WDC idle initiator: {} phase", phase(code)),
                _ => format!("Unknown code {code:x}"),
            },
        ),
        None => return format!("Unknown Status 0x{status:02x}"),
    };
    format!("{group}, {detail}")
}

/// Memory controller lines
pub fn ramsey_text(info: &RamseyInfo) -> String {
    let mut out = format!("Memory controller:   Ramsey-{:02}\n", info.revision.number());
    let _ = writeln!(out, "Ramsey config:       {}", ramsey_config_text(&info.config));
    if info.config.static_column_required() {
        out.push_str("                     Static Column RAM required\n");
    }
    out
}

/// Decoded Ramsey control register
pub fn ramsey_config_text(config: &RamseyConfig) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (on, name) in [
        (config.page_mode, "Page Mode"),
        (config.burst_mode, "Burst Mode"),
        (config.wrap, "Wrap"),
    ] {
        if on {
            parts.push(name.to_string());
        }
    }
    parts.push(
        match config.dram {
            DramType::Mx4x1M => "1Mx4",
            DramType::Mx4x256K => "256Kx4",
            DramType::Mx1x1M => "1Mx1",
        }
        .to_string(),
    );
    if config.skip {
        parts.push("Skip".to_string());
    }
    parts.push(match config.refresh {
        Refresh::Clocks(n) => format!("{n} clock refresh"),
        Refresh::Disabled => "refresh disabled".to_string(),
    });
    parts.join(", ")
}

/// DMA engine line
pub fn dma_text(probe: &DmaProbe) -> String {
    let body = match &probe.version {
        DmaEngineVersion::Version2 => "SDMAC-02".to_string(),
        DmaEngineVersion::Version4 { revision: Some(rev) } => format!("SDMAC-04 {rev}"),
        DmaEngineVersion::Version4 { revision: None } => "SDMAC-04".to_string(),
        DmaEngineVersion::Unknown => match probe.failure {
            Some(DmaProbeFailure::InconsistentFifoState) => {
                "Not detected: FIFO both empty and full".to_string()
            }
            Some(DmaProbeFailure::ReadOnlyBitsWritable) => {
                "Not detected: WTC stores bits that should be read-only".to_string()
            }
            Some(DmaProbeFailure::BitCorruption) => "Not detected: WTC bit 2 corrupted".to_string(),
            None => "Not detected".to_string(),
        },
    };
    format!("SCSI DMA Controller: {body}\n")
}

/// Short names of detection flags, in the order they are checked
fn flag_names(identity: &ControllerIdentity) -> Vec<&'static str> {
    identity
        .flags
        .iter_names()
        .map(|(name, _)| match name {
            "INVALID_REGISTER" => "INVALID",
            "AUX_STATUS_BITS" => "AUXST",
            "AUX_STATUS_WRITABLE" => "AUXST_WR",
            "COMMAND_PHASE_MISMATCH" => "CMDPHASE_RW",
            "SCSI_STATUS_INCONSISTENT" => "STAT",
            "TARGET_LUN_RESERVED" => "LUN",
            "COMMAND_PHASE_INVALID" => "CMDPHASE",
            "RESET_STATUS_UNEXPECTED" => "RESET_STAT",
            "RESET_TIMEOUT" => "RESET_TIMEOUT",
            other => other,
        })
        .collect()
}

/// Protocol controller line
pub fn controller_text(identity: &ControllerIdentity) -> String {
    let mut out = String::from("SCSI Controller:     ");
    match identity.model {
        ControllerModel::Unknown => {
            let _ = write!(out, "Not detected: {}", flag_names(identity).join(" "));
        }
        ControllerModel::Base => out.push_str("WD33C93"),
        ControllerModel::RevisionA => out.push_str("WD33C93A or AM33C93A"),
        ControllerModel::RevisionB => out.push_str("WD33C93B"),
    }
    if let Some(byte) = identity.microcode {
        match identity.microcode_label() {
            Some(label) => {
                let _ = write!(out, " microcode {label}");
            }
            None => {
                let _ = write!(out, " unknown microcode ${byte:02x}");
            }
        }
    }
    if identity.model != ControllerModel::Unknown && !identity.flags.is_empty() {
        let _ = write!(out, " ({})", flag_names(identity).join(" "));
    }
    out.push('\n');
    out
}

/// Input clock line
pub fn clock_text(khz: u32) -> String {
    if khz == 0 {
        "SCSI Clock:          measurement failed\n".to_string()
    } else {
        format!("SCSI Clock:          {}.{:03} MHz\n", khz / 1000, khz % 1000)
    }
}

/// WDC configuration line
pub fn settings_text(settings: &WdcSettings) -> String {
    let mut out = String::from("WDC Configuration:   ");
    match settings.bus_mode {
        BusMode::Polled => out.push_str("Polled Mode"),
        BusMode::Burst => out.push_str("Burst Mode"),
        BusMode::WdBus => out.push_str("WD Bus Mode"),
        BusMode::Dma => out.push_str("DMA Mode"),
        BusMode::Unknown(n) => {
            let _ = write!(out, "Unknown Bus Mode ({n})");
        }
    }
    let _ = write!(out, ", {} msec timeout", settings.timeout_ms);
    match settings.sync {
        None => out.push_str(", Async"),
        Some(sync) => {
            let _ = write!(out, ", Offset {}", sync.offset);
            if !sync.offset_valid {
                out.push_str(" (BAD)");
            }
            let _ = write!(
                out,
                ", Sync {}.{:03} MHz",
                sync.rate_khz / 1000,
                sync.rate_khz % 1000
            );
        }
    }
    if !settings.clock_measured {
        out.push_str(" (assuming NTSC clock)");
    }
    out.push('\n');
    out
}

fn mismatch_text(result: &VerificationResult, m: &Mismatch) -> String {
    let digits = result.width.bytes() * 2;
    match (m.kind, m.written) {
        (MismatchKind::ControlDisturbed, _) => format!(
            "  WDC_CONTROL {:02x} != expected {:02x}",
            m.observed, m.expected
        ),
        (MismatchKind::NotAllOnes, _) => format!(
            "  {} {:02x} != expected ff",
            result.register, m.observed
        ),
        (MismatchKind::Readback, Some(w)) if w != m.expected => format!(
            "  {} {:0digits$x} != expected {:0digits$x} when {:0digits$x} written",
            result.register, m.observed, m.expected, w
        ),
        (MismatchKind::Readback, _) => format!(
            "  {} {:0digits$x} != expected {:0digits$x}",
            result.register, m.observed, m.expected
        ),
    }
}

/// Verification lines for one subsystem
pub fn verification_text(label: &str, results: &[&VerificationResult], skipped: bool) -> String {
    let mut out = format!("{label:<14}");
    if skipped {
        out.push_str("SKIPPED (version unknown)\n");
        return out;
    }
    let mismatches: u32 = results.iter().map(|r| r.mismatches).sum();
    if mismatches == 0 {
        out.push_str("PASS\n");
        return out;
    }
    out.push_str("FAIL\n");
    for r in results {
        for m in &r.details {
            out.push_str(&mismatch_text(r, m));
            out.push('\n');
        }
        let hidden = r.mismatches as usize - r.details.len();
        if hidden > 0 {
            let _ = writeln!(out, "  {} more {} mismatches", hidden, r.register);
        }
    }
    out
}

/// One row of a register dump
pub fn register_row(addr: u32, digits: usize, value: u32, name: &str, desc: &str) -> String {
    format!(
        " {:02x} {:0digits$x}{:pad$} {:<13} {}",
        addr & 0xff,
        value,
        "",
        name,
        desc,
        pad = 8 - digits
    )
}

/// Hex dump, eight values per line with the byte offset
pub fn dump_values(values: &[u32], stride: usize) -> String {
    let digits = stride * 2;
    let mut out = String::new();
    for (line, chunk) in values.chunks(8).enumerate() {
        let _ = write!(out, "{:02x}:", line * 8 * stride);
        for v in chunk {
            let _ = write!(out, " {v:0digits$x}");
        }
        out.push('\n');
    }
    out
}

/// Bus walk line
pub fn target_text(probe: &TargetProbe) -> String {
    let what = match probe.status {
        TargetStatus::Present => "present".to_string(),
        TargetStatus::Absent => "no device".to_string(),
        TargetStatus::Unexpected(s) => format!("status {s:02x} ({})", scsi_status_text(s)),
        TargetStatus::NoResponse => "no response (controller reset)".to_string(),
    };
    format!("  ID {}: {what}", probe.target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdmac_driver::ramsey::RamseyRevision;
    use sdmac_driver::DetectionFlags;

    #[test]
    fn status_groups() {
        assert_eq!(scsi_status_text(0x01), "Reset state, Reset with Advanced features");
        assert_eq!(scsi_status_text(0x42), "Command error, Timeout during Select or Reselect");
        assert_eq!(scsi_status_text(0x1f), "Command complete, Transfer Info success: Message In phase");
        assert_eq!(scsi_status_text(0x30), "Unknown Status 0x30");
    }

    #[test]
    fn command_names() {
        assert_eq!(command_name(0x06), Some("Select-with-ATN"));
        assert_eq!(command_name(0x20), Some("Transfer Info"));
        assert_eq!(command_name(0x1c), None);
    }

    #[test]
    fn ramsey_line() {
        let config = RamseyConfig::decode(0x0b, RamseyRevision::Rev07);
        assert_eq!(
            ramsey_config_text(&config),
            "Page Mode, Burst Mode, 1Mx4, 154 clock refresh"
        );
    }

    #[test]
    fn unknown_controller_lists_flags() {
        let id = ControllerIdentity::unknown(
            DetectionFlags::INVALID_REGISTER | DetectionFlags::SCSI_STATUS_INCONSISTENT,
        );
        assert_eq!(controller_text(&id), "SCSI Controller:     Not detected: INVALID STAT\n");
    }

    #[test]
    fn dump_offsets() {
        let text = dump_values(&[0; 16], 4);
        assert!(text.starts_with("00: 00000000"));
        assert!(text.contains("\n20: "));
    }

    #[test]
    fn dma_line() {
        let probe = DmaProbe {
            version: DmaEngineVersion::Version2,
            failure: None,
        };
        assert_eq!(dma_text(&probe), "SCSI DMA Controller: SDMAC-02\n");
    }
}
