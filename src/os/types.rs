//! Core type definitions for the kernel

/// Process priority (0 = highest priority)
pub type OsPrio = u8;

/// Set of process tags, one bit per priority
pub type OsProcessMap = u32;

/// Tick counter type
pub type OsTick = u32;

/// Nesting counter
pub type OsNestingCtr = u8;

/// Stack element type
pub type OsStkElement = u32;

/// Saved stack pointer of a switched-out process
pub type OsStkPtr = *mut OsStkElement;

/// State a process enters when it is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsStartState {
    /// Ready to run as soon as the kernel starts
    Ready = 0,
    /// Inactive until started or force-woken
    Suspended = 1,
}
