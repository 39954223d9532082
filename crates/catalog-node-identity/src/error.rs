/// Errors for node identity derivation
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("CPU introspection is not supported on {0}")]
    Unsupported(&'static str),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CPU descriptor is missing the {0} field")]
    MissingField(&'static str),

    #[error("Invalid CPU clock value: {0}")]
    InvalidClock(String),
}
