//! Critical section protected cell
//!
//! Interior mutability for kernel and primitive state that may only be touched
//! with interrupts disabled. Borrows are meant to be short: never hold the
//! returned reference across a call that can switch processes.

use core::cell::UnsafeCell;

use crate::critical::CriticalSection;

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(UnsafeCell<T>);

// SAFETY: single core, and every access requires a CriticalSection token.
unsafe impl<T> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Get a mutable reference to the inner value
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub fn get(&self, _cs: &CriticalSection) -> &mut T {
        unsafe { &mut *self.0.get() }
    }

    /// Get a mutable reference without requiring a CriticalSection guard
    ///
    /// # Safety
    /// Interrupts must be disabled and no other reference may be live.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_unchecked(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }
}

impl<T: Copy> CsCell<T> {
    /// Copy the value out
    #[inline(always)]
    pub fn read(&self, cs: &CriticalSection) -> T {
        *self.get(cs)
    }

    /// Overwrite the value
    #[inline(always)]
    pub fn write(&self, cs: &CriticalSection, value: T) {
        *self.get(cs) = value;
    }
}
