//! Async time context trait for Timewarp-aware services.

use crate::error::TimeError;
use async_trait::async_trait;

/// The async interface for time interaction.
///
/// This trait abstracts the wall clock so that async services can run
/// against both the real timer (tokio) and the virtual clock.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` - wraps a shared `VirtualClock`
///
/// # Determinism
///
/// In simulation, `sleep` performs bookkeeping on the virtual clock and
/// resolves immediately. No real time passes.
#[async_trait]
pub trait TimeContext: Send + Sync + 'static {
    /// Returns the seconds elapsed since the context was created.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> f64;

    /// Suspends the caller for `seconds`.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    ///
    /// # Errors
    /// * `TimeError::InvalidArgument` - `seconds` is negative or not finite
    /// * `TimeError::EndOfTimes` - simulation only, the chronology ran dry
    async fn sleep(&self, seconds: f64) -> Result<(), TimeError>;
}
