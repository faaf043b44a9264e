//! Re-entrant interrupt exclusion
//!
//! Every multi-step transaction on the register window runs inside an
//! [`ExclusionGuard`]. Guards nest: only the outermost one touches the
//! interrupt mask, so an outer probe calling an inner primitive keeps
//! interrupts excluded until the outer guard drops.

use crate::bus::InterruptMask;
use std::cell::Cell;

/// Nesting counter around an [`InterruptMask`]
#[derive(Debug)]
pub struct Exclusion {
    mask: Box<dyn InterruptMask>,
    depth: Cell<u32>,
}

impl Exclusion {
    /// Wrap an interrupt mask
    pub fn new(mask: Box<dyn InterruptMask>) -> Self {
        Self {
            mask,
            depth: Cell::new(0),
        }
    }

    /// Exclude interrupts until the returned guard drops
    pub fn enter(&self) -> ExclusionGuard<'_> {
        let depth = self.depth.get();
        if depth == 0 {
            self.mask.disable();
        }
        self.depth.set(depth + 1);
        ExclusionGuard { owner: self }
    }

    /// Current nesting depth (0 = interrupts enabled)
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }
}

/// Scope of excluded interrupts; releases on drop, including during unwinding
#[derive(Debug)]
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct ExclusionGuard<'a> {
    owner: &'a Exclusion,
}

impl Drop for ExclusionGuard<'_> {
    fn drop(&mut self) {
        let depth = self.owner.depth.get().saturating_sub(1);
        self.owner.depth.set(depth);
        if depth == 0 {
            self.owner.mask.enable();
        }
    }
}
