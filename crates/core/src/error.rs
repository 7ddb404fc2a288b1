//! Error types for thermoelast

use thiserror::Error;

/// Result type alias for thermoelast
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for thermoelast
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file failed validation
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// One of the two traditional input files failed to parse
    #[error("Malformed input {path} (line {line}): {reason}")]
    InputMalformed {
        path: String,
        line: usize,
        reason: String,
    },

    /// The desired pressure range exceeds what the volume grid can support
    #[error(
        "Desired pressure range is too high for the volume grid; \
         at most {max_np} pressure points are safe"
    )]
    PressureRangeTooHigh { max_np: usize },

    /// The symmetry constraint system does not determine all 21 components
    #[error("Rank of symmetry constraint system {rank} is smaller than {expected}")]
    RankDeficient { rank: usize, expected: usize },

    /// Input elastic constants disagree with the symmetry constraints
    #[error("Symmetry constraint residuals too large: {0}")]
    ResidualTooLarge(String),

    /// Shear components coupling two different Voigt rows are not supported
    #[error("Shear modulus {0} with different Voigt rows is not implemented")]
    ShearNotImplemented(String),

    /// A linear-algebra primitive (LLS, eigendecomposition, inverse) failed
    #[error("Numeric failure in {0}")]
    Numeric(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    /// Create a new input-parsing error pointing at a 1-based line number
    pub fn malformed(path: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self::InputMalformed {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a new context-tagged numeric error
    pub fn numeric(msg: impl Into<String>) -> Self {
        Self::Numeric(msg.into())
    }
}
