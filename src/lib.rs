//! Preemptive priority kernel in Rust
//!
//! A small real-time kernel for single-core microcontrollers providing:
//! - Strict-priority preemptive scheduling over one bit per process
//! - Event flags, mutexes, single-slot messages and bounded channels
//! - Tick-based timeouts shared by every blocking operation
//! - Context switching for ARM Cortex-M, plus a hosted simulation port
//!
//! Every piece of kernel state is mutated with interrupts disabled. That is
//! the only serialization mechanism the kernel relies on.

#![cfg_attr(target_os = "none", no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod os;
pub mod sync;
pub mod port;

#[cfg(test)]
mod testing;

// ============ Re-exports ============

pub use os::config;
pub use os::config::*;
pub use os::critical;
pub use os::error;
pub use os::error::OsError;
pub use os::kernel;
pub use os::kernel::{os_init, os_int_enter, os_int_exit, os_prio_cur, os_start, IsrGuard};
pub use os::prio;
pub use os::types;
pub use os::types::*;
pub use os::process;
pub use os::process::{os_process_create, OsProcess};
pub use os::sched;
pub use os::time;
pub use os::time::{os_sleep, os_time_get};

#[cfg(feature = "event-flag")]
pub use sync::event_flag;
#[cfg(feature = "mutex")]
pub use sync::mutex;
#[cfg(feature = "message")]
pub use sync::message;
#[cfg(feature = "channel")]
pub use sync::channel;
