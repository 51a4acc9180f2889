//! Process Control Block definition
//!
//! A process is a static execution context: private stack, unique priority and
//! a timeout counter. Readiness is not stored here; it is membership in the
//! kernel's ready map.

use crate::types::{OsPrio, OsStkElement, OsStkPtr, OsTick};

/// Process entry point function type
pub type OsProcessFn = fn() -> !;

/// Process Control Block
#[repr(C)]
pub struct OsProcess {
    // ============ Stack pointer ============
    /// Saved stack pointer; only the switch code writes it
    pub(crate) stk_ptr: OsStkPtr,

    // ============ Stack information ============
    /// Base of stack
    pub(crate) stk_base: *mut OsStkElement,
    /// Stack size in words
    pub(crate) stk_size: usize,

    // ============ Process identification ============
    /// Process name for debugging
    pub(crate) name: &'static str,
    /// Priority, fixed at registration
    pub(crate) prio: OsPrio,

    // ============ Timeout ============
    /// Ticks left before the timer makes this process ready; 0 = none
    pub(crate) timeout: OsTick,
}

impl OsProcess {
    /// Create a new, unregistered process record
    pub const fn new() -> Self {
        OsProcess {
            stk_ptr: core::ptr::null_mut(),
            stk_base: core::ptr::null_mut(),
            stk_size: 0,
            name: "",
            prio: 0,
            timeout: 0,
        }
    }

    /// Reset the record to its unregistered state
    pub(crate) fn init(&mut self) {
        *self = Self::new();
    }

    /// Priority of this process
    #[inline]
    pub fn prio(&self) -> OsPrio {
        self.prio
    }

    /// Process name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Lowest address of the stack region
    #[inline]
    pub fn stack_base(&self) -> *const OsStkElement {
        self.stk_base
    }

    /// Stack size in words
    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stk_size
    }
}

impl Default for OsProcess {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsProcess {}
unsafe impl Sync for OsProcess {}
