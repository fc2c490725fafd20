use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Semantic interpretation of a vault item's raw value.
///
/// The numeric code and the canonical lowercase name form a single fixed,
/// order-significant table; the wire record always carries the string name
/// for forward compatibility, never the numeric code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Plain text value.
    #[default]
    String = 0,
    /// The item wraps a file entity.
    File = 1,
    /// A stored password.
    Password = 2,
    /// An opaque secret, typically cipher-wrapped.
    Secret = 3,
}

impl ItemType {
    /// Returns the numeric type code.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Looks up a type by its numeric code.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::String),
            1 => Some(Self::File),
            2 => Some(Self::Password),
            3 => Some(Self::Secret),
            _ => None,
        }
    }
}
