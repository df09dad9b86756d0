use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse or write JSON: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to write statistics: {0}")]
    StatisticsError(#[from] csv::Error),

    #[error("Invalid experiment configuration: {0}")]
    ConfigurationError(#[from] ConversionError),

    #[error("Stored parameters do not fit the network: expected layer sizes {expected:?}, found {found:?}")]
    ParameterShapeMismatch { expected: Vec<usize>, found: Vec<usize> },

    #[error("Stored parameters of layer {layer} are inconsistent: {reason}")]
    CorruptParameters { layer: usize, reason: String },
}

/// Raised while turning configuration DTOs into validated domain objects.
#[derive(Debug, Error, PartialEq)]
pub enum ConversionError {
    #[error("Unknown strategy: {0}")]
    UnknownStrategyType(String),

    #[error("Unknown capacity model: {0}")]
    UnknownCapacityModel(String),

    #[error("Unknown compute device: {0}")]
    UnknownDevice(String),

    #[error("Parameter '{0}' must be positive")]
    NonPositive(&'static str),

    #[error("Range '{name}' is invalid: min {min} > max {max}")]
    InvalidRange { name: &'static str, min: i64, max: i64 },

    #[error("Parameter '{name}' is out of range: {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("Capacity model '{0}' requires the field '{1}'")]
    MissingField(String, &'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
