//! Simulation context implementing TimeContext for deterministic testing.

use crate::chronology::Chronology;
use crate::clock::VirtualClock;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use timewarp_env::{TimeContext, TimeError};

/// Simulation context backed by a shared virtual clock.
///
/// This implements `TimeContext` so async services can be driven by a
/// chronology. `sleep` does its bookkeeping on the virtual clock and
/// resolves immediately; no timer is ever registered.
///
/// Clones share the same clock.
///
/// # Chronology callbacks
///
/// The clock stays locked while `sleep` pulls from the chronology, so a
/// `Timeline` action or `Periodic` callback must not call back into this
/// context (`now`, `sleep`, `with_clock`): the std mutex is not reentrant
/// and the call deadlocks. Callbacks get the simulated time they fire at
/// as an argument; use that instead of asking the clock.
pub struct SimContext<C> {
    clock: Arc<Mutex<VirtualClock<C>>>,
}

impl<C: Chronology> SimContext<C> {
    /// Starts a virtual clock on `chronology` and wraps it.
    pub fn new(chronology: C) -> Result<Self, TimeError> {
        Ok(Self::from_clock(VirtualClock::new(chronology)?))
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(chronology: C) -> Result<Arc<Self>, TimeError> {
        Self::new(chronology).map(Arc::new)
    }
}

impl<C> SimContext<C> {
    /// Wraps an existing clock.
    pub fn from_clock(clock: VirtualClock<C>) -> Self {
        Self {
            clock: Arc::new(Mutex::new(clock)),
        }
    }

    /// Runs `f` with read access to the underlying clock.
    pub fn with_clock<R>(&self, f: impl FnOnce(&VirtualClock<C>) -> R) -> R {
        f(&*self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, VirtualClock<C>> {
        // A panic inside a chronology action must not hide the clock state
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> Clone for SimContext<C> {
    fn clone(&self) -> Self {
        Self {
            clock: Arc::clone(&self.clock),
        }
    }
}

#[async_trait]
impl<C> TimeContext for SimContext<C>
where
    C: Chronology + Send + 'static,
{
    fn now(&self) -> f64 {
        self.lock().now()
    }

    async fn sleep(&self, seconds: f64) -> Result<(), TimeError> {
        self.lock().sleep(seconds)
    }
}
