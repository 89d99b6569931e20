//! Production implementation of TimeContext using Tokio.

use crate::error::{timer_duration, TimeError};
use crate::TimeContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Production context backed by the Tokio timer.
///
/// This is the "real" implementation used in production deployments.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimeContext for TokioContext {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    async fn sleep(&self, seconds: f64) -> Result<(), TimeError> {
        let duration = timer_duration(seconds)?;
        tokio::time::sleep(duration).await;
        Ok(())
    }
}
