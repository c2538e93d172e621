use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity cannot be empty")]
    Empty,

    #[error("quantity \"{0}\" is not a valid Kubernetes quantity")]
    Malformed(String),

    #[error("quantity \"{0}\" is negative")]
    Negative(String),

    #[error("quantity \"{0}\" is too large")]
    Overflow(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RatioError {
    #[error("ratio \"{0}\" is not a decimal number or a fraction")]
    Malformed(String),

    #[error("ratio \"{0}\" must be between 0 and 1")]
    OutOfRange(String),
}

#[derive(Error, Debug)]
pub enum MutationError {
    #[error("cannot decode {kind} object: {source}")]
    DecodeObject {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("container {container}: cannot parse {resource} {field}: {source}")]
    InvalidQuantity {
        container: String,
        resource: String,
        field: &'static str,
        #[source]
        source: QuantityError,
    },

    #[error("cannot serialize patch: {0}")]
    SerializePatch(#[source] serde_json::Error),
}
