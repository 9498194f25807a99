//! Settings validation support.

use crate::error::ValidationError;

/// Trait for settings validation.
///
/// Implemented by the settings types so that a bad configuration file or
/// environment override is rejected before any loop starts.
///
/// # Examples
///
/// ```rust
/// use log_relay::core::Validate;
/// use log_relay::error::ValidationError;
///
/// struct PollSettings {
///     interval_ms: u64,
/// }
///
/// impl Validate for PollSettings {
///     fn validate(&self) -> Result<(), ValidationError> {
///         if self.interval_ms == 0 {
///             return Err(ValidationError::invalid_field(
///                 "interval_ms",
///                 "must be greater than 0"
///             ));
///         }
///
///         Ok(())
///     }
/// }
/// ```
pub trait Validate {
    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Should return a `ValidationError` describing what validation failed.
    fn validate(&self) -> Result<(), ValidationError>;
}
