//! Timewarp Time Abstraction Layer
//!
//! This crate provides the seam that lets time-dependent code run against
//! both the **real** clock (std / tokio) and a **virtual** clock driven by a
//! scripted chronology (see `timewarp_sim`).
//!
//! # Core Concept
//!
//! Production code never calls `std::thread::sleep` or `Instant::now`
//! directly. It asks a [`Clock`] (blocking code) or a [`TimeContext`]
//! (async code) instead. Tests swap in a virtual clock, and every timeout,
//! polling interval and backoff delay resolves instantly and
//! deterministically.
//!
//! # Example
//!
//! ```ignore
//! use timewarp_env::{wait_until, Clock};
//!
//! fn await_ready<C: Clock>(clock: &mut C, svc: &Service) -> Result<bool, TimeError> {
//!     wait_until(clock, 0.5, 30.0, || svc.is_ready())
//! }
//! ```

mod clock;
mod context;
mod error;
mod tokio_impl;
mod waiters;

pub use clock::{Clock, SystemClock};
pub use context::TimeContext;
pub use error::{timer_duration, validate_seconds, TimeError};
pub use tokio_impl::TokioContext;
pub use waiters::{retry, wait_until, Backoff, RetryError};
