//! Synchronization primitives
//!
//! Every blocking primitive is a [`WaitMap`](service::WaitMap) plus its own
//! payload. The wait map records which processes are blocked on the object;
//! the shared protocol in [`service`] moves them between the wait map and the
//! kernel's ready map.

pub mod service;
pub mod ring_buffer;

#[cfg(feature = "event-flag")]
pub mod event_flag;

#[cfg(feature = "mutex")]
pub mod mutex;

#[cfg(feature = "message")]
pub mod message;

#[cfg(feature = "channel")]
pub mod channel;
