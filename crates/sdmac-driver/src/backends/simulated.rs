//! Simulated A3000 SCSI board
//!
//! An in-memory model of Ramsey, the Super DMAC and the WD33C93 family,
//! used by tests and by `sdmac --simulate`. It models the behaviours the
//! probers depend on:
//!
//! - WTC bit 2 read-write on SDMAC-02 and hardwired clear on SDMAC-04
//! - index auto-increment after data-port accesses
//! - read-only and undefined WD33C93 registers
//! - soft reset with advanced features, microcode byte in CDB1
//! - QUETAG storage on the B revision only
//! - select timeouts driven by simulated time
//! - the extended-register mailbox on the B revision
//! - faults: stuck or echoing auxiliary status bits, resets that never finish
//!
//! Time advances by a fixed amount on every bus access and timer read, so a
//! busy-poll makes progress without a real clock.
//!
//! All three capability traits are implemented over one shared state; the
//! board handle stays with the test for inspection after the platform has
//! been handed to a [`crate::Session`].

use crate::bus::{InterruptMask, Platform, ReferenceTimer, RegisterBus};
use sdmac_chip::regs::wdc::{self, cmd, own_id};
use sdmac_chip::regs::{ramsey, sdmac};
use sdmac_chip::status;
use sdmac_chip::timing::{
    eclock_to_ticks, INCLK_NTSC_KHZ, SELECT_OVERHEAD_WD33C93, SELECT_OVERHEAD_WD33C93A,
    SELECT_OVERHEAD_WD33C93B, TIMEOUT_DIVISOR,
};
use std::cell::RefCell;
use std::rc::Rc;

/// DMA engine behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedDmac {
    /// WTC holds 24 bits, bit 2 included
    Sdmac02,
    /// WTC bit 2 hardwired clear
    Sdmac04,
    /// WTC stores all 32 bits (impossible silicon)
    FullyWritable,
    /// WTC bit 2 stuck set (broken silicon)
    ProbeBitStuck,
}

/// Protocol controller revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedController {
    /// WD33C93, no advanced features
    Wd33c93,
    /// WD33C93A
    Wd33c93a,
    /// WD33C93B
    Wd33c93b,
}

impl SimulatedController {
    fn advanced(self) -> bool {
        !matches!(self, Self::Wd33c93)
    }

    /// Select overhead in nanoseconds, matching the calibration figures
    fn select_overhead_ns(self) -> u64 {
        let eclocks = match self {
            Self::Wd33c93 => SELECT_OVERHEAD_WD33C93,
            Self::Wd33c93a => SELECT_OVERHEAD_WD33C93A,
            Self::Wd33c93b => SELECT_OVERHEAD_WD33C93B,
        };
        eclock_to_ticks(eclocks, NS_PER_SEC)
    }
}

const NS_PER_SEC: u64 = 1_000_000_000;

/// Everything that distinguishes one simulated board from another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardProfile {
    /// Ramsey version register
    pub ramsey_version: u8,
    /// Ramsey control register at power-on
    pub ramsey_control: u8,
    /// DMA engine behaviour
    pub dmac: SimulatedDmac,
    /// Value of the SDMAC-04 revision register
    pub dmac_revision: u32,
    /// Static ISTR bits (FIFO state)
    pub istr: u8,
    /// Protocol controller revision
    pub controller: SimulatedController,
    /// Microcode byte reported after a really-advanced reset
    pub microcode: u8,
    /// Controller input clock in kHz
    pub input_clock_khz: u32,
    /// Value read from the undefined register
    pub invalid_register_value: u8,
    /// QUETAG value the B revision fails to store
    pub quetag_drops: Option<u8>,
    /// SCSI status forced after every reset
    pub reset_status: Option<u8>,
    /// Reset commands finish (false: the interrupt never arrives)
    pub reset_completes: bool,
    /// Auxiliary status bits that always read set
    pub aux_static: u8,
    /// Auxiliary status echoes the command phase register (broken decode)
    pub aux_tracks_cmdphase: bool,
    /// Select commands finish (false: the interrupt never arrives)
    pub select_completes: bool,
    /// Bitmap of SCSI IDs that answer a select
    pub present_targets: u8,
    /// Reference timer frequency service available
    pub timer_available: bool,
    /// Register that panics when touched through the data port
    pub fault_register: Option<u8>,
    /// Register whose writes toggle CONTROL bit 0 (broken decode)
    pub disturbs_control: Option<u8>,
    /// Register that ignores writes
    pub ignores_writes: Option<u8>,
    /// Own-ID register at power-on
    pub own_id: u8,
    /// Simulated nanoseconds per bus access
    pub access_ns: u64,
    /// Simulated nanoseconds per timer read
    pub tick_ns: u64,
}

impl BoardProfile {
    /// A3000 with SDMAC-02 and the original WD33C93
    pub fn wd33c93() -> Self {
        Self {
            dmac: SimulatedDmac::Sdmac02,
            controller: SimulatedController::Wd33c93,
            microcode: 0x00,
            ..Self::default()
        }
    }

    /// A3000 with SDMAC-04 and a WD33C93A
    pub fn wd33c93a() -> Self {
        Self::default()
    }

    /// A3000 with SDMAC-04 and a WD33C93B
    pub fn wd33c93b() -> Self {
        Self {
            controller: SimulatedController::Wd33c93b,
            microcode: wdc::microcode::REV_09,
            ..Self::default()
        }
    }
}

impl Default for BoardProfile {
    fn default() -> Self {
        Self {
            ramsey_version: ramsey::version::REV_07,
            ramsey_control: ramsey::ctrl::PAGE_MODE | ramsey::ctrl::BURST_MODE,
            dmac: SimulatedDmac::Sdmac04,
            dmac_revision: 0,
            istr: sdmac::istr::FIFOE,
            controller: SimulatedController::Wd33c93a,
            microcode: wdc::microcode::REV_08,
            input_clock_khz: INCLK_NTSC_KHZ,
            invalid_register_value: 0xff,
            quetag_drops: None,
            reset_status: None,
            reset_completes: true,
            aux_static: 0,
            aux_tracks_cmdphase: false,
            select_completes: true,
            present_targets: 0,
            timer_available: true,
            fault_register: None,
            disturbs_control: None,
            ignores_writes: None,
            own_id: 0x07,
            access_ns: 200,
            tick_ns: 50,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingCompletion {
    at_ns: u64,
    status: u8,
}

#[derive(Debug)]
struct BoardState {
    profile: BoardProfile,
    now_ns: u64,
    masked: bool,
    mask_transitions: u32,
    unmasked_window_accesses: u32,
    ramsey_control: u8,
    wtc: u32,
    acr: u32,
    sspbdat: u32,
    contr: u8,
    index: u8,
    regs: [u8; 32],
    extended: [u8; 256],
    interrupt: bool,
    pending: Option<PendingCompletion>,
    long_writes: Vec<(u32, u32)>,
}

impl BoardState {
    fn new(profile: BoardProfile) -> Self {
        let mut regs = [0u8; 32];
        regs[usize::from(wdc::OWN_ID)] = profile.own_id;
        regs[usize::from(wdc::TPERIOD)] = 0x20;
        Self {
            ramsey_control: profile.ramsey_control,
            profile,
            now_ns: 0,
            masked: false,
            mask_transitions: 0,
            unmasked_window_accesses: 0,
            wtc: 0,
            acr: 0,
            sspbdat: 0,
            contr: 0,
            index: 0,
            regs,
            extended: [0; 256],
            interrupt: false,
            pending: None,
            long_writes: Vec::new(),
        }
    }

    fn advance(&mut self, ns: u64) {
        self.now_ns = self.now_ns.saturating_add(ns);
        if let Some(p) = self.pending {
            if self.now_ns >= p.at_ns {
                self.complete(p.status);
            }
        }
    }

    fn access(&mut self, addr: u32) {
        self.advance(self.profile.access_ns);
        let window = matches!(
            addr,
            sdmac::SASR_B | sdmac::SASR_B2 | sdmac::SCMD | sdmac::SCMD_B | sdmac::SASRW | sdmac::SASR_L
        );
        if window && !self.masked {
            self.unmasked_window_accesses += 1;
        }
    }

    fn complete(&mut self, status: u8) {
        self.regs[usize::from(wdc::SCSI_STAT)] = status;
        self.interrupt = true;
        self.pending = None;
    }

    fn aux(&self) -> u8 {
        let mut value = self.profile.aux_static;
        if self.profile.aux_tracks_cmdphase {
            value |= self.regs[usize::from(wdc::CMDPHASE)] & !wdc::aux::INT;
        }
        if self.interrupt {
            value |= wdc::aux::INT;
        }
        if self.pending.is_some() {
            value |= wdc::aux::BSY | wdc::aux::CIP;
        }
        value
    }

    fn istr(&self) -> u8 {
        let mut value = self.profile.istr;
        if self.interrupt {
            value |= sdmac::istr::INT_S | sdmac::istr::INT_P;
        }
        value
    }

    fn store_wtc(&self, value: u32) -> u32 {
        match self.profile.dmac {
            SimulatedDmac::Sdmac02 => value & sdmac::WTC_MASK,
            SimulatedDmac::Sdmac04 => value & sdmac::WTC_MASK & !sdmac::WTC_PROBE_BIT,
            SimulatedDmac::FullyWritable => value,
            SimulatedDmac::ProbeBitStuck => (value & sdmac::WTC_MASK) | sdmac::WTC_PROBE_BIT,
        }
    }

    fn step_index(&mut self) {
        if !matches!(self.index, wdc::CMD | wdc::DATA | wdc::AUXST) && self.index < wdc::LAST_DIRECT {
            self.index += 1;
        }
    }

    fn check_fault(&self, reg: u8) {
        if self.profile.fault_register == Some(reg) {
            panic!("simulated bus fault at WDC register {reg:#04x}");
        }
    }

    fn data_read(&mut self) -> u8 {
        let reg = self.index;
        self.check_fault(reg);
        let value = match reg {
            wdc::INVALID_REG => self.profile.invalid_register_value,
            wdc::AUXST => self.aux(),
            wdc::SCSI_STAT => {
                self.interrupt = false;
                self.regs[usize::from(reg)]
            }
            wdc::QUETAG if self.profile.controller != SimulatedController::Wd33c93b => 0,
            0x1b..=0x1d => 0xff,
            r if r > wdc::LAST_DIRECT => 0xff,
            r => self.regs[usize::from(r)],
        };
        self.step_index();
        value
    }

    fn data_write(&mut self, value: u8) {
        let reg = self.index;
        self.check_fault(reg);
        match reg {
            wdc::INVALID_REG | wdc::AUXST | wdc::SCSI_STAT | 0x1b..=0x1d => {}
            r if r > wdc::LAST_DIRECT => {}
            r if self.profile.ignores_writes == Some(r) => {}
            wdc::QUETAG => {
                let stores = self.profile.controller == SimulatedController::Wd33c93b
                    && self.profile.quetag_drops != Some(value);
                if stores {
                    self.regs[usize::from(reg)] = value;
                }
            }
            wdc::CMD => {
                self.regs[usize::from(reg)] = value;
                self.execute(value);
            }
            r => self.regs[usize::from(r)] = value,
        }
        if self.profile.disturbs_control == Some(reg) {
            self.regs[usize::from(wdc::CONTROL)] ^= 0x01;
        }
        self.step_index();
    }

    fn select_timeout_ns(&self) -> Option<u64> {
        let tperiod = u64::from(self.regs[usize::from(wdc::TPERIOD)]);
        let khz = u64::from(self.profile.input_clock_khz);
        if tperiod == 0 || khz == 0 {
            return None;
        }
        Some(tperiod * u64::from(TIMEOUT_DIVISOR) * NS_PER_SEC / khz)
    }

    fn execute(&mut self, command: u8) {
        let controller = self.profile.controller;
        match command {
            cmd::RESET => {
                let own = self.regs[usize::from(wdc::OWN_ID)];
                let advanced = controller.advanced() && own & own_id::EAF != 0;
                if advanced && own & own_id::RAF != 0 {
                    self.regs[usize::from(wdc::MICROCODE)] = self.profile.microcode;
                }
                self.regs[usize::from(wdc::CMDPHASE)] = 0;
                let status = if advanced {
                    status::RESET_ADVANCED
                } else {
                    status::RESET
                };
                let status = self.profile.reset_status.unwrap_or(status);
                if self.profile.reset_completes {
                    self.complete(status);
                } else {
                    self.pending = Some(PendingCompletion {
                        at_ns: u64::MAX,
                        status,
                    });
                }
            }
            cmd::SELECT | cmd::SELECT_ATN => {
                let own = self.regs[usize::from(wdc::OWN_ID)] & own_id::ID_MASK;
                let target = self.regs[usize::from(wdc::DST_ID)] & 0x07;
                let answers = target != own && self.profile.present_targets & (1 << target) != 0;
                let (at_ns, status) = if answers {
                    (self.now_ns + 10_000, status::SELECT_COMPLETE)
                } else {
                    let done = self
                        .select_timeout_ns()
                        .filter(|_| self.profile.select_completes)
                        .map_or(u64::MAX, |t| {
                            self.now_ns + t + controller.select_overhead_ns()
                        });
                    (done, status::SELECT_TIMEOUT)
                };
                self.pending = Some(PendingCompletion { at_ns, status });
            }
            cmd::DISCONNECT => self.complete(status::DISCONNECTED),
            cmd::GET_REGISTER | cmd::SET_REGISTER
                if controller == SimulatedController::Wd33c93b =>
            {
                let addr = usize::from(self.regs[usize::from(wdc::MAILBOX_ADDR)]);
                let data = usize::from(wdc::MAILBOX_DATA);
                if command == cmd::GET_REGISTER {
                    self.regs[data] = self.extended[addr];
                } else {
                    self.extended[addr] = self.regs[data];
                }
                self.complete(status::command_echo(command));
            }
            _ => self.complete(status::INVALID_COMMAND),
        }
    }

    fn long_backing(&self, addr: u32) -> Option<u32> {
        match addr {
            sdmac::WTC => Some(self.wtc),
            ramsey::ACR => Some(self.acr),
            sdmac::SSPBDAT => Some(self.sspbdat),
            sdmac::REVISION => Some(self.profile.dmac_revision),
            _ => None,
        }
    }

    fn read_u8(&mut self, addr: u32) -> u8 {
        self.access(addr);
        match addr {
            ramsey::CTRL => self.ramsey_control,
            ramsey::VER => self.profile.ramsey_version,
            sdmac::ISTR => self.istr(),
            sdmac::CONTR => self.contr,
            sdmac::SASR_B | sdmac::SASR_B2 => self.index,
            sdmac::SCMD | sdmac::SCMD_B => self.data_read(),
            _ => self
                .long_backing(addr & !3)
                .map_or(0xff, |v| (v >> (8 * (3 - (addr & 3)))) as u8),
        }
    }

    fn read_u32(&mut self, addr: u32) -> u32 {
        if let Some(value) = self.long_backing(addr) {
            self.access(addr);
            return value;
        }
        (0..4).fold(0, |acc, i| acc << 8 | u32::from(self.read_u8(addr + i)))
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        self.access(addr);
        match addr {
            ramsey::CTRL => self.ramsey_control = value,
            sdmac::CONTR => self.contr = value,
            sdmac::SASR_B2 => self.index = value,
            sdmac::SCMD | sdmac::SCMD_B => self.data_write(value),
            _ => {}
        }
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        self.access(addr);
        self.long_writes.push((addr, value));
        match addr {
            sdmac::WTC | sdmac::WTC_ALT => self.wtc = self.store_wtc(value),
            ramsey::ACR | ramsey::ACR_ALT => self.acr = value & ramsey::ACR_MASK,
            sdmac::SSPBDAT => self.sspbdat = value & sdmac::SSPBDAT_MASK,
            sdmac::SASRW | sdmac::SASR_L => self.index = value as u8,
            _ => {}
        }
    }
}

/// Handle to a simulated board
///
/// Clones share state; [`SimulatedBoard::platform`] hands clones to a
/// session while the caller keeps one for inspection.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    state: Rc<RefCell<BoardState>>,
}

impl SimulatedBoard {
    /// Power on a board
    pub fn new(profile: BoardProfile) -> Self {
        tracing::debug!(controller = ?profile.controller, dmac = ?profile.dmac, "Simulated board");
        Self {
            state: Rc::new(RefCell::new(BoardState::new(profile))),
        }
    }

    /// Capabilities backed by this board
    pub fn platform(&self) -> Platform {
        Platform {
            bus: Box::new(self.clone()),
            mask: Box::new(self.clone()),
            timer: Box::new(self.clone()),
        }
    }

    /// Current window index, without a bus cycle
    pub fn index(&self) -> u8 {
        self.state.borrow().index
    }

    /// Peek a WD33C93 register without side effects
    pub fn wdc_register(&self, reg: u8) -> u8 {
        self.state.borrow().regs[usize::from(reg & wdc::LAST_DIRECT)]
    }

    /// Set a WD33C93 register without side effects
    pub fn set_wdc_register(&self, reg: u8, value: u8) {
        self.state.borrow_mut().regs[usize::from(reg & wdc::LAST_DIRECT)] = value;
    }

    /// Peek an extended register
    pub fn extended_register(&self, reg: u8) -> u8 {
        self.state.borrow().extended[usize::from(reg)]
    }

    /// Current WTC contents
    pub fn wtc(&self) -> u32 {
        self.state.borrow().wtc
    }

    /// Raw values written to a 32-bit register, oldest first
    pub fn long_writes(&self, addr: u32) -> Vec<u32> {
        self.state
            .borrow()
            .long_writes
            .iter()
            .filter(|&&(a, _)| a == addr)
            .map(|&(_, v)| v)
            .collect()
    }

    /// Replace the static ISTR bits
    pub fn set_istr(&self, value: u8) {
        self.state.borrow_mut().profile.istr = value;
    }

    /// Interrupts currently excluded
    pub fn interrupts_masked(&self) -> bool {
        self.state.borrow().masked
    }

    /// Times the interrupt mask was engaged
    pub fn mask_transitions(&self) -> u32 {
        self.state.borrow().mask_transitions
    }

    /// Window accesses made with interrupts enabled
    pub fn unmasked_window_accesses(&self) -> u32 {
        self.state.borrow().unmasked_window_accesses
    }

    /// Simulated time in nanoseconds
    pub fn now_ns(&self) -> u64 {
        self.state.borrow().now_ns
    }
}

impl RegisterBus for SimulatedBoard {
    fn read_u8(&self, addr: u32) -> u8 {
        self.state.borrow_mut().read_u8(addr)
    }

    fn read_u16(&self, addr: u32) -> u16 {
        let hi = self.read_u8(addr);
        let lo = self.read_u8(addr + 1);
        u16::from_be_bytes([hi, lo])
    }

    fn read_u32(&self, addr: u32) -> u32 {
        self.state.borrow_mut().read_u32(addr)
    }

    fn write_u8(&self, addr: u32, value: u8) {
        self.state.borrow_mut().write_u8(addr, value);
    }

    fn write_u16(&self, addr: u32, _value: u16) {
        self.state.borrow_mut().access(addr);
    }

    fn write_u32(&self, addr: u32, value: u32) {
        self.state.borrow_mut().write_u32(addr, value);
    }
}

impl InterruptMask for SimulatedBoard {
    fn disable(&self) {
        let mut state = self.state.borrow_mut();
        state.masked = true;
        state.mask_transitions += 1;
    }

    fn enable(&self) {
        self.state.borrow_mut().masked = false;
    }
}

impl ReferenceTimer for SimulatedBoard {
    fn ticks(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        let step = state.profile.tick_ns;
        state.advance(step);
        state.now_ns
    }

    fn frequency(&self) -> Option<u64> {
        self.state.borrow().profile.timer_available.then_some(NS_PER_SEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_port_auto_increments() {
        let board = SimulatedBoard::new(BoardProfile::default());
        board.write_u8(sdmac::SASR_B2, wdc::TCOUNT2);
        for b in [0x12, 0x34, 0x56] {
            board.write_u8(sdmac::SCMD, b);
        }
        assert_eq!(board.wdc_register(wdc::TCOUNT2), 0x12);
        assert_eq!(board.wdc_register(wdc::TCOUNT0), 0x56);
        assert_eq!(board.index(), wdc::DST_ID);
    }

    #[test]
    fn wtc_probe_bit_by_generation() {
        let old = SimulatedBoard::new(BoardProfile::wd33c93());
        old.write_u32(sdmac::WTC_ALT, 0xffff_ffff);
        assert_eq!(old.read_u32(sdmac::WTC), 0x00ff_ffff);

        let new = SimulatedBoard::new(BoardProfile::wd33c93a());
        new.write_u32(sdmac::WTC_ALT, 0xffff_ffff);
        assert_eq!(new.read_u32(sdmac::WTC), 0x00ff_fffb);
    }

    #[test]
    fn reset_reports_advanced_features_only_when_supported() {
        for (profile, expected) in [
            (BoardProfile::wd33c93(), status::RESET),
            (BoardProfile::wd33c93a(), status::RESET_ADVANCED),
        ] {
            let board = SimulatedBoard::new(profile);
            board.set_wdc_register(wdc::OWN_ID, 0x07 | own_id::EAF);
            board.write_u8(sdmac::SASR_B2, wdc::CMD);
            board.write_u8(sdmac::SCMD, cmd::RESET);
            assert_eq!(board.wdc_register(wdc::SCSI_STAT), expected);
        }
    }

    #[test]
    fn select_times_out_in_simulated_time() {
        let board = SimulatedBoard::new(BoardProfile::default());
        board.set_wdc_register(wdc::TPERIOD, 4);
        board.set_wdc_register(wdc::DST_ID, 7);
        board.write_u8(sdmac::SASR_B2, wdc::CMD);
        board.write_u8(sdmac::SCMD, cmd::SELECT_ATN);
        assert_eq!(board.read_u8(sdmac::ISTR) & sdmac::istr::INT_S, 0);
        while board.read_u8(sdmac::ISTR) & sdmac::istr::INT_S == 0 {
            board.ticks();
            assert!(board.now_ns() < 1_000_000_000);
        }
        // 4 * 80 / 14.318 MHz = 22.3 ms, plus select overhead
        assert!((22_000_000..24_000_000).contains(&board.now_ns()), "{}", board.now_ns());
    }

    #[test]
    fn long_registers_read_as_bytes_big_endian() {
        let board = SimulatedBoard::new(BoardProfile::default());
        board.write_u32(ramsey::ACR_ALT, 0x1234_5678);
        assert_eq!(board.read_u8(ramsey::ACR), 0x12);
        assert_eq!(board.read_u8(ramsey::ACR + 3), 0x78);
    }
}
