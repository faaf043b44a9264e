//! Probe session
//!
//! A [`Session`] owns the hardware capabilities and everything the probers
//! share across a run: configuration, exclusion depth, the reference timer
//! frequency and the register snapshot. It is threaded explicitly through
//! every prober; there is no global state.

use crate::bus::{Platform, ReferenceTimer, RegisterBus};
use crate::config::ProbeConfig;
use crate::exclusion::{Exclusion, ExclusionGuard};
use crate::snapshot::RegisterSnapshot;
use sdmac_chip::regs::ramsey;
use tracing::{debug, warn};

/// Spins per poll attempt when no reference timer is available
const FALLBACK_SPINS: u32 = 200;

/// Context for one run against one board
#[derive(Debug)]
pub struct Session {
    bus: Box<dyn RegisterBus>,
    timer: Box<dyn ReferenceTimer>,
    exclusion: Exclusion,
    config: ProbeConfig,
    reference_hz: Option<u64>,
    pub(crate) snapshot: RegisterSnapshot,
}

impl Session {
    /// Create a session over a platform
    pub fn new(platform: Platform, config: ProbeConfig) -> Self {
        let reference_hz = platform.timer.frequency();
        match reference_hz {
            Some(hz) => debug!(hz, "Reference timer available"),
            None => warn!("Reference timer unavailable; clock estimation disabled"),
        }
        Self {
            bus: platform.bus,
            timer: platform.timer,
            exclusion: Exclusion::new(platform.mask),
            config,
            reference_hz,
            snapshot: RegisterSnapshot::default(),
        }
    }

    /// Raw register bus
    pub fn bus(&self) -> &dyn RegisterBus {
        self.bus.as_ref()
    }

    /// Reference timer
    pub fn timer(&self) -> &dyn ReferenceTimer {
        self.timer.as_ref()
    }

    /// Reference timer frequency, read once when the session was created
    pub fn reference_hz(&self) -> Option<u64> {
        self.reference_hz
    }

    /// Probe configuration
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Exclude interrupts until the guard drops (re-entrant)
    pub fn exclude(&self) -> ExclusionGuard<'_> {
        self.exclusion.enter()
    }

    /// Current exclusion nesting depth
    pub fn exclusion_depth(&self) -> u32 {
        self.exclusion.depth()
    }

    /// Force outstanding writes to complete by reading an unrelated register
    pub fn flush_bus(&self) {
        let _ = self.bus.read_u8(ramsey::CTRL);
    }

    /// Wait one poll interval of reference time
    pub(crate) fn delay(&self) {
        let Some(hz) = self.reference_hz else {
            for _ in 0..FALLBACK_SPINS {
                std::hint::spin_loop();
            }
            return;
        };
        let ticks = u128::from(self.config.poll_delay_ns) * u128::from(hz) / 1_000_000_000;
        let ticks = u64::try_from(ticks).unwrap_or(u64::MAX).max(1);
        let start = self.timer.ticks();
        while self.timer.ticks().wrapping_sub(start) < ticks {
            std::hint::spin_loop();
        }
    }

    /// Poll `ready` until it returns true, at most `poll_limit` times
    ///
    /// Returns the number of attempts that failed before success, or `None`
    /// when the ceiling was reached.
    pub(crate) fn poll(&self, what: &str, mut ready: impl FnMut() -> bool) -> Option<u32> {
        for attempt in 0..self.config.poll_limit {
            if ready() {
                return Some(attempt);
            }
            self.delay();
        }
        warn!(what, limit = self.config.poll_limit, "Poll ceiling reached");
        None
    }
}
