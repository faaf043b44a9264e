//! Platform backends
//!
//! - [`devmem`]: physical chips through `/dev/mem`
//! - [`simulated`]: in-memory board for tests and demonstrations

pub mod devmem;
pub mod simulated;

pub use devmem::{open_platform, DevMemBus, MonotonicTimer, SignalMask};
pub use simulated::{BoardProfile, SimulatedBoard, SimulatedController, SimulatedDmac};
