//! Error types for the Timewarp time abstraction.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by real and virtual clocks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeError {
    /// Sleep was called with a negative or non-finite duration
    #[error("Invalid argument: sleep length must be non-negative, got {seconds}")]
    InvalidArgument { seconds: f64 },

    /// The chronology ran dry while the clock still needed thresholds
    #[error("End of times: chronology exhausted at t={now}s (last threshold {next}s)")]
    EndOfTimes { now: f64, next: f64 },

    /// The chronology produced no initial threshold
    #[error("Empty chronology: no initial threshold to start the clock")]
    EmptyChronology,

    /// The chronology produced a negative or non-finite step
    #[error("Invalid chronology step: {step}")]
    InvalidStep { step: f64 },
}

impl TimeError {
    /// Returns true for errors that signal a broken simulation rather than
    /// caller misuse.
    ///
    /// Harnesses should abort the running test on these instead of
    /// retrying.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TimeError::InvalidArgument { .. })
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(seconds: f64) -> Self {
        Self::InvalidArgument { seconds }
    }
}

/// Checks a sleep length the way a real blocking sleep does.
///
/// Every clock runs its argument through this before touching state, so
/// real and virtual clocks reject exactly the same inputs: negative and
/// non-finite values. Any finite non-negative length is accepted.
pub fn validate_seconds(seconds: f64) -> Result<f64, TimeError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TimeError::invalid_argument(seconds));
    }
    Ok(seconds)
}

/// Validates `seconds` and converts it for a real timer.
///
/// Lengths beyond what `Duration` can hold saturate to `Duration::MAX`.
pub fn timer_duration(seconds: f64) -> Result<Duration, TimeError> {
    let seconds = validate_seconds(seconds)?;
    Ok(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_zero_and_fractions() {
        assert_eq!(validate_seconds(0.0), Ok(0.0));
        assert_eq!(validate_seconds(1.5), Ok(1.5));
    }

    #[test]
    fn test_validate_accepts_lengths_beyond_duration() {
        assert_eq!(validate_seconds(2.0e19), Ok(2.0e19));
        assert_eq!(validate_seconds(f64::MAX), Ok(f64::MAX));
    }

    #[test]
    fn test_timer_duration_converts_and_saturates() {
        assert_eq!(timer_duration(1.5), Ok(Duration::from_millis(1500)));
        assert_eq!(timer_duration(2.0e19), Ok(Duration::MAX));
        assert!(timer_duration(-1.0).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        assert!(matches!(
            validate_seconds(-0.1),
            Err(TimeError::InvalidArgument { .. })
        ));
        assert!(validate_seconds(f64::NAN).is_err());
        assert!(validate_seconds(f64::INFINITY).is_err());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!TimeError::invalid_argument(-1.0).is_fatal());
        assert!(TimeError::EmptyChronology.is_fatal());
        assert!(TimeError::EndOfTimes { now: 1.0, next: 1.0 }.is_fatal());
        assert!(TimeError::InvalidStep { step: -2.0 }.is_fatal());
    }
}
