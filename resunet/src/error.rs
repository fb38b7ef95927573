use thiserror::Error;

/// The error type for `Resunet-Burn` operations.
///
/// Construction-time contract violations surface as
/// [`ResunetError::InvalidConfiguration`]; caller-supplied tensors that break
/// the forward contract surface as [`ResunetError::InvalidTensorShape`].
#[derive(Error, Debug)]
pub enum ResunetError {
    /// Error for when an invalid model configuration is provided.
    /// This can happen if configuration parameters are logically inconsistent.
    #[error("Invalid model configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when an input tensor has an invalid shape.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },
}

/// A specialized `Result` type for `Resunet-Burn` operations.
pub type ResunetResult<T> = Result<T, ResunetError>;
