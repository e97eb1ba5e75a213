use thiserror::Error;

/// Every fallible operation in this crate returns this `Result`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds a TARS encode/decode call can fail with.
///
/// Every variant carries enough context (tag, expected kind/name, observed
/// wire type/value) for a caller to log a useful message without re-reading
/// the stream; the codec itself never retries or partially commits.
#[derive(Debug, Error)]
pub enum Error {
    #[error("truncated stream at tag {tag}: needed {needed} more byte(s), {available} available")]
    Truncated {
        tag: u8,
        needed: usize,
        available: usize,
    },

    #[error("type mismatch at tag {tag}: schema expects {expected}, wire delivered {observed}")]
    TypeMismatch {
        tag: u8,
        expected: &'static str,
        observed: String,
    },

    #[error("disordered field: expected tag {expected} or later, wire tag went back to {got}")]
    DisorderedField { expected: u8, got: u8 },

    #[error("range overflow at tag {tag}: value {value} does not fit in {kind}")]
    RangeOverflow {
        tag: u8,
        kind: &'static str,
        value: i128,
    },

    #[error("invalid value at tag {tag}: {message}")]
    InvalidValue { tag: u8, message: String },

    #[error("schema error: {message}")]
    SchemaError { message: String },

    #[error("unsupported at tag {tag}: {message}")]
    Unsupported { tag: u8, message: String },
}

impl Error {
    pub(crate) fn truncated(tag: u8, needed: usize, available: usize) -> Self {
        Error::Truncated {
            tag,
            needed,
            available,
        }
    }

    pub(crate) fn type_mismatch(tag: u8, expected: &'static str, observed: impl Into<String>) -> Self {
        Error::TypeMismatch {
            tag,
            expected,
            observed: observed.into(),
        }
    }

    pub(crate) fn disordered(expected: u8, got: u8) -> Self {
        Error::DisorderedField { expected, got }
    }

    pub(crate) fn range_overflow(tag: u8, kind: &'static str, value: i128) -> Self {
        Error::RangeOverflow { tag, kind, value }
    }

    pub(crate) fn invalid_value(tag: u8, message: impl Into<String>) -> Self {
        Error::InvalidValue {
            tag,
            message: message.into(),
        }
    }

    pub(crate) fn schema_error(message: impl Into<String>) -> Self {
        Error::SchemaError {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(tag: u8, message: impl Into<String>) -> Self {
        Error::Unsupported {
            tag,
            message: message.into(),
        }
    }
}
