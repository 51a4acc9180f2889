//! Core kernel modules
//!
//! Contains the kernel state, scheduler, process records and the system timer.

pub mod config;
pub mod critical;
pub mod error;
pub mod kernel;
pub mod prio;
pub mod types;
pub mod process;
pub mod sched;
pub mod time;
pub mod cs_cell;
