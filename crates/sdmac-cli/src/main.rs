//! `sdmac`: identify and test the Amiga 3000 SCSI subsystem.
//!
//! ```text
//! USAGE:
//!   sdmac [report]                   Identify every chip, decode settings, run tests
//!   sdmac test [--loop]              Register tests only, optionally until failure
//!   sdmac regs                       Named register dump
//!   sdmac raw                        Raw SDMAC window dump (byte, word, long)
//!   sdmac read <reg>                 Read a WD33C93 register (hex)
//!   sdmac write <reg> <value>        Write a WD33C93 register (hex)
//!   sdmac scan                       Select every SCSI target ID
//! ```
//!
//! `--simulate base|a|b` runs against an in-memory board instead of
//! `/dev/mem`.

mod display;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sdmac_chip::regs::{sdmac, wdc, Access, Width, SDMAC_REGISTERS, WDC_REGISTERS};
use sdmac_driver::backends::{devmem, BoardProfile, SimulatedBoard};
use sdmac_driver::verify::{self, Subsystem, VerificationReport};
use sdmac_driver::{
    devmem_path, dmac, probe, ramsey, scan, wdc as wdc_id, AbortFlag, ControllerModel,
    ProbeConfig, SdmacError, Session,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::OnceLock;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sdmac",
    about = "Amiga 3000 SDMAC / WD33C93 identification and test",
    version
)]
struct Cli {
    /// Run against a simulated board instead of the hardware.
    #[arg(long, value_enum, global = true)]
    simulate: Option<SimProfile>,

    /// Physical memory device (default: $SDMAC_DEVMEM, then /dev/mem).
    #[arg(long, global = true)]
    devmem: Option<PathBuf>,

    /// Status polls before giving up on the controller.
    #[arg(long, global = true)]
    poll_limit: Option<u32>,

    /// Delay between status polls, in nanoseconds.
    #[arg(long, global = true)]
    poll_delay_ns: Option<u64>,

    /// Debug logging, and every mismatch instead of the first few per register.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SimProfile {
    /// SDMAC-02 with a WD33C93
    Base,
    /// SDMAC-04 with a WD33C93A
    A,
    /// SDMAC-04 with a WD33C93B
    B,
}

impl SimProfile {
    fn board(self) -> BoardProfile {
        match self {
            Self::Base => BoardProfile::wd33c93(),
            Self::A => BoardProfile::wd33c93a(),
            Self::B => BoardProfile::wd33c93b(),
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Identify every chip, decode the controller settings and run the tests.
    Report,
    /// Run the register tests only.
    Test {
        /// Repeat until a test fails or Ctrl-C is pressed.
        #[arg(long = "loop")]
        repeat: bool,
    },
    /// Dump the named SDMAC, Ramsey and WD33C93 registers.
    Regs,
    /// Dump the raw SDMAC register window at every access width.
    Raw,
    /// Read one WD33C93 register (0x00-0x1f, or 0x40-0xff on a WD33C93B).
    Read {
        /// Register number in hex.
        reg: String,
    },
    /// Write one WD33C93 register.
    Write {
        /// Register number in hex.
        reg: String,
        /// Value in hex.
        value: String,
        /// Write 24 bits to three consecutive registers, MSB first.
        #[arg(long)]
        wide: bool,
    },
    /// Select every SCSI target ID and report which respond.
    Scan,
}

static ABORT: OnceLock<AbortFlag> = OnceLock::new();

extern "C" fn on_interrupt(_signal: libc::c_int) {
    if let Some(flag) = ABORT.get() {
        flag.raise();
    }
}

/// Route SIGINT to the abort flag so loops finish the current step.
fn install_abort_handler() -> AbortFlag {
    let flag = ABORT.get_or_init(AbortFlag::new).clone();
    // SAFETY: the handler only performs an atomic store.
    unsafe {
        libc::signal(
            libc::SIGINT,
            on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
    flag
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether everything that was checked passed.
fn run(cli: &Cli) -> Result<bool> {
    let mut session = open_session(cli)?;
    let abort = install_abort_handler();

    match &cli.command {
        None | Some(Cmd::Report) => cmd_report(&mut session),
        Some(Cmd::Test { repeat }) => cmd_test(&session, *repeat, &abort),
        Some(Cmd::Regs) => cmd_regs(&session),
        Some(Cmd::Raw) => cmd_raw(&session),
        Some(Cmd::Read { reg }) => cmd_read(&mut session, reg),
        Some(Cmd::Write { reg, value, wide }) => cmd_write(&mut session, reg, value, *wide),
        Some(Cmd::Scan) => cmd_scan(&mut session, &abort),
    }
}

fn open_session(cli: &Cli) -> Result<Session> {
    let mut config = ProbeConfig::default();
    if let Some(limit) = cli.poll_limit {
        config.poll_limit = limit;
    }
    if let Some(ns) = cli.poll_delay_ns {
        config.poll_delay_ns = ns;
    }
    if cli.verbose {
        config.max_mismatch_details = usize::MAX;
    }

    let platform = match cli.simulate {
        Some(profile) => SimulatedBoard::new(profile.board()).platform(),
        None => {
            let path = devmem_path(cli.devmem.clone());
            devmem::open_platform(&path)
                .with_context(|| format!("cannot access the hardware through {}", path.display()))?
        }
    };
    Ok(Session::new(platform, config))
}

/// Parse `1f`, `0x1f` or `$1f`.
fn parse_hex(text: &str) -> Result<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).with_context(|| format!("invalid hex value '{text}'"))
}

fn print_verification(report: &VerificationReport) {
    for subsystem in [
        Subsystem::MemoryController,
        Subsystem::DmaEngine,
        Subsystem::ProtocolController,
    ] {
        let results: Vec<_> = report
            .results
            .iter()
            .filter(|r| r.subsystem == subsystem)
            .collect();
        let label = format!("{} test:", subsystem.name());
        print!(
            "{}",
            display::verification_text(&label, &results, report.skipped.contains(&subsystem))
        );
    }
}

fn cmd_report(session: &mut Session) -> Result<bool> {
    let report = probe::run_probe(session)?;
    let id = &report.identification;

    print!("{}", display::ramsey_text(&id.ramsey));
    print!("{}", display::dma_text(&id.dma));
    print!("{}", display::controller_text(&id.controller));
    print!("{}", display::clock_text(id.clock_khz));
    print!("{}", display::settings_text(&report.settings));
    println!();
    print_verification(&report.verification);

    Ok(report.passed())
}

fn cmd_test(session: &Session, repeat: bool, abort: &AbortFlag) -> Result<bool> {
    ramsey::identify(session)?;
    let dma = dmac::probe_version(session);

    let mut pass = 0u64;
    loop {
        pass += 1;
        let report = verify::run_battery(session, &dma.version);

        if !report.passed() || !repeat {
            if repeat {
                println!("Pass {pass}");
            }
            print_verification(&report);
            return Ok(report.passed());
        }
        debug!(pass, "Battery pass complete");
        if pass % 100 == 0 {
            println!("Pass {pass}: PASS");
        }
        if abort.is_raised() {
            info!(pass, "Test loop interrupted");
            println!("Stopped after {pass} passes, all PASS");
            return Ok(true);
        }
    }
}

fn cmd_regs(session: &Session) -> Result<bool> {
    ramsey::identify(session)?;

    println!("SDMAC / Ramsey");
    for info in SDMAC_REGISTERS.iter().filter(|r| r.reg.access != Access::WriteOnly) {
        let value = {
            let _irq = session.exclude();
            session.bus().read(info.reg.addr, info.reg.width)
        };
        println!(
            "{}",
            display::register_row(info.reg.addr, info.reg.width.bytes() * 2, value, info.name, info.desc)
        );
    }

    println!("WD33C93");
    for info in WDC_REGISTERS {
        let reg = info.reg.addr as u8;
        // Reading the data register would consume a byte from the bus.
        if reg == wdc::DATA {
            continue;
        }
        let value = session.wdc_read(reg);
        let mut row = display::register_row(info.reg.addr, 2, u32::from(value), info.name, info.desc);
        match reg {
            wdc::SCSI_STAT => row.push_str(&format!(" ({})", display::scsi_status_text(value))),
            wdc::CMD => {
                if let Some(name) = display::command_name(value) {
                    row.push_str(&format!(" ({name})"));
                }
            }
            _ => {}
        }
        println!("{row}");
    }
    Ok(true)
}

fn cmd_raw(session: &Session) -> Result<bool> {
    ramsey::identify(session)?;

    let _irq = session.exclude();
    let index = session.bus().read_u8(sdmac::SASR_B);
    for (label, width) in [("Byte", Width::Byte), ("Word", Width::Word), ("Long", Width::Long)] {
        let stride = width.bytes();
        let values: Vec<u32> = (0..sdmac::PAGE_SPAN / 2 / stride)
            .map(|n| session.bus().read(sdmac::BASE + (n * stride) as u32, width))
            .collect();
        println!("{label}");
        print!("{}", display::dump_values(&values, stride));
    }
    session.bus().write_u8(sdmac::SASR_B2, index);
    Ok(true)
}

/// Extended registers exist only behind the WD33C93B mailbox.
fn require_extended(session: &mut Session) -> Result<()> {
    session.save_registers();
    let identity = wdc_id::identify(session);
    session.restore_registers();
    if identity.model != ControllerModel::RevisionB {
        bail!(
            "extended registers need a WD33C93B (found {})",
            identity.model.name()
        );
    }
    Ok(())
}

fn cmd_read(session: &mut Session, reg: &str) -> Result<bool> {
    let reg = SdmacError::check_register(parse_hex(reg)?)?;
    ramsey::identify(session)?;

    if reg < wdc::EXTENDED_BASE {
        println!("{:02x}", session.wdc_read(reg));
        return Ok(true);
    }
    require_extended(session)?;
    let access = session.wdc_read_extended(reg);
    if !access.completed {
        eprintln!(
            "Get Register failed (status {})",
            access
                .status
                .map_or_else(|| "none".to_string(), |s| format!("{s:02x}"))
        );
        return Ok(false);
    }
    println!("{:02x}", access.value);
    Ok(true)
}

fn cmd_write(session: &mut Session, reg: &str, value: &str, wide: bool) -> Result<bool> {
    let reg = SdmacError::check_register(parse_hex(reg)?)?;
    let value = SdmacError::check_value(parse_hex(value)?, if wide { 24 } else { 8 })?;
    ramsey::identify(session)?;

    if wide {
        if reg > wdc::LAST_DIRECT - 2 {
            bail!("a 24-bit write needs three consecutive registers below 0x20");
        }
        session.wdc_write24(reg, value);
        return Ok(true);
    }
    if reg < wdc::EXTENDED_BASE {
        session.wdc_write(reg, value as u8);
        return Ok(true);
    }
    require_extended(session)?;
    let access = session.wdc_write_extended(reg, value as u8);
    if !access.completed {
        eprintln!("Set Register failed");
    }
    Ok(access.completed)
}

fn cmd_scan(session: &mut Session, abort: &AbortFlag) -> Result<bool> {
    ramsey::identify(session)?;

    session.save_registers();
    let walked = scan::walk_bus(session, abort);
    session.restore_registers();

    match walked {
        Ok(targets) => {
            println!("SCSI bus");
            for t in &targets {
                println!("{}", display::target_text(t));
            }
            Ok(true)
        }
        Err(SdmacError::Aborted) => {
            println!("Aborted");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_prefixes() {
        assert_eq!(parse_hex("1f").unwrap(), 0x1f);
        assert_eq!(parse_hex("0x1F").unwrap(), 0x1f);
        assert_eq!(parse_hex("$40").unwrap(), 0x40);
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn cli_parses_globals_after_subcommand() {
        let cli = Cli::try_parse_from(["sdmac", "test", "--loop", "--simulate", "b"]).unwrap();
        assert!(matches!(cli.simulate, Some(SimProfile::B)));
        assert!(matches!(cli.command, Some(Cmd::Test { repeat: true })));
    }

    #[test]
    fn simulated_report_passes() {
        let cli = Cli::try_parse_from(["sdmac", "--simulate", "a"]).unwrap();
        let mut session = open_session(&cli).unwrap();
        assert!(cmd_report(&mut session).unwrap());
    }

    #[test]
    fn test_pass_leaves_controller_state_alone() {
        let board = SimulatedBoard::new(BoardProfile::wd33c93a());
        board.set_wdc_register(wdc::SCSI_STAT, 0x85);
        board.set_wdc_register(wdc::CMD, 0x06);
        let session = Session::new(board.platform(), ProbeConfig::default());
        assert!(cmd_test(&session, false, &AbortFlag::new()).unwrap());
        assert_eq!(board.wdc_register(wdc::SCSI_STAT), 0x85);
        assert_eq!(board.wdc_register(wdc::CMD), 0x06);
    }

    #[test]
    fn extended_read_refused_without_b() {
        let cli = Cli::try_parse_from(["sdmac", "--simulate", "a", "read", "40"]).unwrap();
        let mut session = open_session(&cli).unwrap();
        assert!(cmd_read(&mut session, "40").is_err());
    }

    #[test]
    fn wide_write_lands_msb_first() {
        let cli = Cli::try_parse_from(["sdmac", "--simulate", "b"]).unwrap();
        let mut session = open_session(&cli).unwrap();
        assert!(cmd_write(&mut session, "12", "123456", true).unwrap());
        assert_eq!(session.wdc_read(wdc::TCOUNT2), 0x12);
        assert_eq!(session.wdc_read(wdc::TCOUNT0), 0x56);
    }
}
