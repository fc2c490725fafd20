use thiserror::Error;

/// Error outputs from `veskit-core`.
///
/// Local validation errors (`MalformedUri`, `InvalidState`) are raised before
/// any network call. Transport and decode errors carry enough context (HTTP
/// status, offending field) for the caller to decide whether to retry.
#[derive(Debug, Error)]
pub enum VesError {
    /// The supplied `ves://` URI could not be parsed.
    #[error("malformed ves URI `{uri}`: {reason}")]
    MalformedUri {
        /// The input that failed to parse.
        uri: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A get-only resolve did not find the item remotely.
    #[error("not found: {what}")]
    NotFound {
        /// The identifier that was looked up.
        what: String,
    },
    /// A create-only resolve collided with an existing item.
    #[error("already exists: {what}")]
    AlreadyExists {
        /// The identifier that collided.
        what: String,
    },
    /// A mutation was attempted on a deleted item.
    #[error("invalid state: {operation} on a deleted vault item")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
    },
    /// A wire record was missing a required field or carried an
    /// unresolvable embedded reference.
    #[error("decode error in field `{field}`: {reason}")]
    Decode {
        /// The offending record field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// The remote side answered with a non-2xx status.
    #[error("transport error: status {status} from {url}")]
    Transport {
        /// HTTP status code, preserved for the caller.
        status: u16,
        /// The URL that was requested.
        url: String,
    },
    /// A cipher operation was requested on an item whose binding does not
    /// support it, or the bound cipher rejected the payload.
    #[error("cipher mismatch: {context}")]
    CipherMismatch {
        /// Context describing the failed transform.
        context: String,
    },
    /// Connection-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// JSON serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl VesError {
    /// Creates a decode error for a record field.
    pub fn decode<R: Into<String>>(field: &'static str, reason: R) -> Self {
        Self::Decode {
            field,
            reason: reason.into(),
        }
    }

    /// Creates a cipher mismatch error.
    pub fn cipher<C: Into<String>>(context: C) -> Self {
        Self::CipherMismatch {
            context: context.into(),
        }
    }
}
