//! Physical hardware access through `/dev/mem`
//!
//! Maps the SDMAC page and the Ramsey page and performs volatile accesses
//! at their fixed physical addresses. Interrupt exclusion blocks all signals
//! on the calling thread; the kernel's own SCSI driver must be kept off the
//! controller while probing.

use crate::bus::{InterruptMask, Platform, ReferenceTimer, RegisterBus};
use crate::error::{Result, SdmacError};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::time::{clock_getres, clock_gettime, ClockId};
use sdmac_chip::regs::{ramsey, sdmac};
use std::cell::Cell;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::Path;
use std::ptr::NonNull;

/// One mapped page of physical address space
#[derive(Debug)]
struct PhysWindow {
    ptr: NonNull<u8>,
    base: u32,
    size: usize,
}

impl PhysWindow {
    fn map(file: &File, base: u32, size: usize) -> Result<Self> {
        // SAFETY: mapping a device file; preconditions:
        // - fd is valid for the duration of the call (borrowed from `file`)
        // - size is a whole number of pages, base is page aligned
        // - MAP_SHARED so accesses reach the hardware, not a private copy
        // - the mapping is unmapped exactly once in Drop
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                u64::from(base),
            )
        }
        .map_err(|e| SdmacError::map_failed(format!("physical page {base:#010x}"), e))?;

        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| {
            SdmacError::map_failed(format!("physical page {base:#010x}"), "null mapping")
        })?;
        tracing::debug!("Mapped {size:#x} bytes of physical {base:#010x} at {ptr:p}");
        Ok(Self { ptr, base, size })
    }

    fn contains(&self, addr: u32, bytes: usize) -> bool {
        addr >= self.base && (addr - self.base) as usize + bytes <= self.size
    }

    fn at<T>(&self, addr: u32) -> *mut T {
        // SAFETY: callers check `contains(addr, size_of::<T>())` first, so
        // the offset stays inside the mapping.
        unsafe { self.ptr.as_ptr().add((addr - self.base) as usize).cast::<T>() }
    }
}

impl Drop for PhysWindow {
    fn drop(&mut self) {
        // SAFETY: ptr/size are exactly what mmap returned; nothing else
        // holds a reference into the mapping once the window drops.
        if let Err(e) = unsafe { munmap(self.ptr.as_ptr().cast(), self.size) } {
            tracing::warn!("munmap of {:#010x} failed: {e}", self.base);
        }
    }
}

/// Register bus over `/dev/mem`
///
/// Every access is bounds-checked against the two mapped pages.
///
/// # Panics
///
/// Accessors panic on addresses outside the SDMAC and Ramsey pages, like an
/// out-of-range MMIO offset.
#[derive(Debug)]
pub struct DevMemBus {
    sdmac: PhysWindow,
    ramsey: PhysWindow,
    _file: File,
}

impl DevMemBus {
    /// Open the physical memory device and map both register pages
    ///
    /// # Errors
    ///
    /// Returns an error if the device is missing, cannot be opened
    /// read-write, or either page cannot be mapped.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SdmacError::device_not_found(path));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|e| SdmacError::map_failed(path.display().to_string(), e))?;

        let page = rustix::param::page_size().max(sdmac::PAGE_SPAN);
        let sdmac = PhysWindow::map(&file, sdmac::BASE, page)?;
        let ramsey = PhysWindow::map(&file, ramsey::PAGE_BASE, page)?;
        tracing::info!("Opened {} for SDMAC and Ramsey registers", path.display());
        Ok(Self {
            sdmac,
            ramsey,
            _file: file,
        })
    }

    fn window(&self, addr: u32, bytes: usize) -> &PhysWindow {
        if self.sdmac.contains(addr, bytes) {
            &self.sdmac
        } else if self.ramsey.contains(addr, bytes) {
            &self.ramsey
        } else {
            panic!("register access outside mapped pages: {addr:#010x} ({bytes} bytes)");
        }
    }

    fn read<T: Copy>(&self, addr: u32) -> T {
        let ptr = self.window(addr, std::mem::size_of::<T>()).at::<T>(addr);
        // SAFETY: volatile read inside a live mapping (bounds checked by
        // `window`). Volatile is required: register reads have side effects.
        // 68k registers are naturally aligned at the addresses in the map.
        unsafe { ptr.read_volatile() }
    }

    fn write<T: Copy>(&self, addr: u32, value: T) {
        let ptr = self.window(addr, std::mem::size_of::<T>()).at::<T>(addr);
        // SAFETY: volatile write inside a live mapping (bounds checked by
        // `window`); the compiler must neither merge nor reorder it.
        unsafe { ptr.write_volatile(value) }
    }
}

impl RegisterBus for DevMemBus {
    fn read_u8(&self, addr: u32) -> u8 {
        self.read(addr)
    }

    fn read_u16(&self, addr: u32) -> u16 {
        self.read(addr)
    }

    fn read_u32(&self, addr: u32) -> u32 {
        self.read(addr)
    }

    fn write_u8(&self, addr: u32, value: u8) {
        self.write(addr, value);
    }

    fn write_u16(&self, addr: u32, value: u16) {
        self.write(addr, value);
    }

    fn write_u32(&self, addr: u32, value: u32) {
        self.write(addr, value);
    }
}

/// Blocks every signal on the calling thread while held
#[derive(Default)]
pub struct SignalMask {
    previous: Cell<Option<libc::sigset_t>>,
}

impl std::fmt::Debug for SignalMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let held = self.previous.take();
        let engaged = held.is_some();
        self.previous.set(held);
        f.debug_struct("SignalMask").field("engaged", &engaged).finish()
    }
}

impl InterruptMask for SignalMask {
    fn disable(&self) {
        let mut all = std::mem::MaybeUninit::<libc::sigset_t>::uninit();
        let mut old = std::mem::MaybeUninit::<libc::sigset_t>::uninit();
        // SAFETY: sigfillset initialises `all`; pthread_sigmask writes the
        // previous mask into `old` on success, checked before assume_init.
        unsafe {
            libc::sigfillset(all.as_mut_ptr());
            if libc::pthread_sigmask(libc::SIG_BLOCK, all.as_ptr(), old.as_mut_ptr()) == 0 {
                self.previous.set(Some(old.assume_init()));
            } else {
                tracing::warn!("pthread_sigmask(SIG_BLOCK) failed");
            }
        }
    }

    fn enable(&self) {
        if let Some(old) = self.previous.take() {
            // SAFETY: `old` is a mask previously returned by pthread_sigmask.
            let rc = unsafe { libc::pthread_sigmask(libc::SIG_SETMASK, &old, std::ptr::null_mut()) };
            if rc != 0 {
                tracing::warn!("pthread_sigmask(SIG_SETMASK) failed: {rc}");
            }
        }
    }
}

/// `CLOCK_MONOTONIC` in nanoseconds
#[derive(Debug)]
pub struct MonotonicTimer {
    frequency: Option<u64>,
}

impl MonotonicTimer {
    /// Query the clock resolution once
    ///
    /// The frequency service reports 1 GHz when the clock resolves at least
    /// one microsecond and is absent otherwise.
    pub fn new() -> Self {
        let res = clock_getres(ClockId::Monotonic);
        let res_ns = res.tv_sec.saturating_mul(1_000_000_000).saturating_add(res.tv_nsec);
        let frequency = (res_ns > 0 && res_ns <= 1_000).then_some(1_000_000_000);
        tracing::debug!(res_ns, ?frequency, "Monotonic clock");
        Self { frequency }
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceTimer for MonotonicTimer {
    #[allow(clippy::cast_sign_loss)]
    fn ticks(&self) -> u64 {
        let now = clock_gettime(ClockId::Monotonic);
        (now.tv_sec as u64)
            .wrapping_mul(1_000_000_000)
            .wrapping_add(now.tv_nsec as u64)
    }

    fn frequency(&self) -> Option<u64> {
        self.frequency
    }
}

/// Capabilities for the physical board
///
/// # Errors
///
/// Returns an error if the physical memory device cannot be mapped.
pub fn open_platform(path: &Path) -> Result<Platform> {
    Ok(Platform {
        bus: Box::new(DevMemBus::open(path)?),
        mask: Box::new(SignalMask::default()),
        timer: Box::new(MonotonicTimer::new()),
    })
}
