//! Crate-wide error kinds.
//
// LookupError and ConfigError are fatal and surface to the caller.
// Timeout/Cancelled are terminal but the search still returns its
// current best design, so callers generally match on these rather
// than propagating with `?`.

/// Errors raised by the design advisor core.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("unknown field '{field}' on collection '{collection}'")]
    UnknownField { collection: String, field: String },

    #[error("design invariant violated: {0}")]
    InvariantViolation(String),

    #[error("search exceeded its deadline")]
    Timeout,

    #[error("search cancelled by user")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
