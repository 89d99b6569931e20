//! Timewarp Deterministic Simulation Harness
//!
//! This crate provides the virtual side of `timewarp_env`: a clock that
//! never waits, driven by a scripted **chronology** of time increments.
//!
//! # Core Principle
//!
//! Time only moves when the code under test sleeps. Whenever a sleep
//! crosses the next scheduled threshold, the chronology is pulled, and
//! pulling is where the simulated world reacts (a service comes up, a
//! message lands, a lease expires). A test therefore asserts timeouts,
//! polling intervals and backoff schedules exactly, in zero real time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Code under test                        │
//! │        wait_until(...)  retry(...)  clock.sleep(...)      │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │ Clock / TimeContext
//!                    ┌────────▼────────┐
//!                    │  VirtualClock   │  (now, next)
//!                    └────────┬────────┘
//!                             │ next_step()  (only when now >= next)
//!                    ┌────────▼────────┐
//!                    │   Chronology    │──► mutates SimWorld
//!                    └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use timewarp_sim::{SimWorld, Timeline, VirtualClock};
//! use timewarp_env::wait_until;
//!
//! let world = SimWorld::new();
//! let handle = world.clone();
//! let timeline = Timeline::new()
//!     .after(7.3, move |t| handle.set_service_up(t, true))
//!     .then_idle(60.0);
//!
//! let mut clock = VirtualClock::new(timeline)?;
//! assert!(wait_until(&mut clock, 0.5, 30.0, || world.service_up())?);
//! assert_eq!(clock.now(), 7.5);
//! ```

mod chronology;
mod clock;
mod context;
mod exporter;
mod jitter;
mod runner;
mod world;
pub mod scenarios;

pub use chronology::{Chronology, Periodic, Timeline};
pub use clock::{Draw, VirtualClock};
pub use context::SimContext;
pub use exporter::SimExport;
pub use jitter::Jitter;
pub use runner::{ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimWorld, WorldEvent, WorldState};
