//! Compile-time configuration for the kernel
//!
//! These constants fix the process count, the bit layout of process maps and
//! the timing base. They are resolved at build time and never checked at runtime.

use crate::types::{OsPrio, OsProcessMap};

/// Number of application processes
pub const CFG_PROCESS_COUNT: usize = 8;

/// Number of priority levels, including the idle process
pub const CFG_PRIO_COUNT: usize = CFG_PROCESS_COUNT + 1;

/// Idle process priority (always the lowest)
pub const CFG_PRIO_IDLE: OsPrio = CFG_PROCESS_COUNT as OsPrio;

/// Bit order of process tags.
///
/// `true`: priority `p` maps to bit `p`.
/// `false`: priority `p` maps to bit `CFG_PRIO_COUNT - 1 - p`.
pub const CFG_PRIORITY_ORDER_ASCENDING: bool = true;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Core clock feeding SysTick
pub const CFG_SYSTICK_CLOCK_HZ: u32 = 16_000_000;

/// Minimum process stack size in words
pub const CFG_STK_SIZE_MIN: usize = 64;

/// Idle process stack size in words
pub const CFG_IDLE_STK_SIZE: usize = 128;

const _: () = assert!(
    CFG_PRIO_COUNT <= OsProcessMap::BITS as usize,
    "process map is too narrow for the configured process count"
);
