//! Port layer - CPU-specific implementations
//!
//! This module provides the hardware abstraction layer for context switching,
//! interrupt masking and the tick source. Each port exposes the same set of
//! free functions:
//!
//! - `os_task_stk_init` builds the first context of a process
//! - `os_start_high_rdy` hands the CPU to the first process and never returns
//! - `os_ctx_sw` pends the switch interrupt
//! - `os_context_switch` transfers the CPU directly (`direct-switch` only)
//! - `enable_interrupts` / `disable_interrupts`
//! - `os_cpu_systick_init` starts the tick source
//! - `os_idle_hook` is what the idle process does between interrupts
//! - `os_port_init` resets port state on kernel initialization

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use cortex_m4::*;

// Hosted simulation: every process is an OS thread and only one of them holds
// the simulated CPU at a time.
#[cfg(not(target_os = "none"))]
pub mod host;

#[cfg(not(target_os = "none"))]
pub use host::*;

#[cfg(all(target_os = "none", not(target_arch = "arm")))]
compile_error!("no port is available for this bare-metal target");

#[cfg(all(target_os = "none", feature = "direct-switch"))]
compile_error!("the direct-switch strategy is only provided by the hosted port");
