use std::fmt;
use std::str::FromStr;

use crate::error::VesError;

const SCHEME: &str = "ves://";

/// A `ves://` address of a vault item.
///
/// Two forms exist: the external form `ves://domain/externalId` identifies
/// an item across vaults by a human-meaningful identifier, and the internal
/// form `ves:///internalId` identifies it by its opaque numeric id within
/// the current session's domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VesUri {
    /// Cross-vault reference: `ves://{domain}/{external_id}`.
    External {
        /// The vault domain, e.g. `example.com`.
        domain: String,
        /// Human-meaningful identifier within the domain.
        external_id: String,
    },
    /// Session-local reference: `ves:///{id}`.
    Internal {
        /// Server-assigned numeric item id.
        id: u64,
    },
}

impl VesUri {
    /// Builds an external-form URI.
    pub fn external(domain: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self::External {
            domain: domain.into(),
            external_id: external_id.into(),
        }
    }

    /// Builds an internal-form URI.
    #[must_use]
    pub const fn internal(id: u64) -> Self {
        Self::Internal { id }
    }

    /// Parses a `ves://` URI.
    ///
    /// # Errors
    /// Returns [`VesError::MalformedUri`] on a wrong scheme or a missing or
    /// malformed identifier segment. Malformed input is always a hard error,
    /// never a silently-empty result.
    pub fn parse(input: &str) -> Result<Self, VesError> {
        let malformed = |reason: &str| VesError::MalformedUri {
            uri: input.to_string(),
            reason: reason.to_string(),
        };

        let raw = input.trim();
        let Some(path) = raw.strip_prefix(SCHEME) else {
            return Err(malformed("expected ves:// scheme"));
        };

        // `ves:///id` leaves an empty authority segment before the first `/`.
        match path.split_once('/') {
            Some(("", id)) => {
                if id.is_empty() {
                    return Err(malformed("missing internal id segment"));
                }
                let id = id
                    .parse::<u64>()
                    .map_err(|_| malformed("internal id is not numeric"))?;
                Ok(Self::Internal { id })
            }
            Some((domain, external_id)) => {
                if external_id.is_empty() {
                    return Err(malformed("missing external id segment"));
                }
                Ok(Self::External {
                    domain: domain.to_string(),
                    external_id: external_id.to_string(),
                })
            }
            None => Err(malformed("missing identifier segment")),
        }
    }

    /// The domain component, when present.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::External { domain, .. } => Some(domain),
            Self::Internal { .. } => None,
        }
    }
}

impl fmt::Display for VesUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External {
                domain,
                external_id,
            } => write!(f, "{SCHEME}{domain}/{external_id}"),
            Self::Internal { id } => write!(f, "{SCHEME}/{id}"),
        }
    }
}

impl FromStr for VesUri {
    type Err = VesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for VesUri {
    type Error = VesError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
