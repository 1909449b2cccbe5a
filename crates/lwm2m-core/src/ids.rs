//! Identifier newtypes for the four addressing granularities.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sentinel value for "no ID" / "invalid ID", kept outside the valid `0..=65534` range.
pub const INVALID_ID: u32 = u32::MAX;

macro_rules! id_newtype {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Reserved sentinel meaning "no identifier".
            pub const INVALID: Self = Self(INVALID_ID);

            /// Construct from a raw value, returning `None` if it falls outside `0..=65534`.
            #[must_use]
            pub fn new(raw: u32) -> Option<Self> {
                if raw <= 65534 { Some(Self(raw)) } else { None }
            }

            /// Returns `true` if this is the [`Self::INVALID`] sentinel.
            #[must_use]
            pub fn is_invalid(self) -> bool {
                self.0 == INVALID_ID
            }

            /// The raw numeric value.
            #[must_use]
            pub fn value(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<u32> for $name {
            type Error = crate::error::LwM2mError;

            fn try_from(raw: u32) -> Result<Self, Self::Error> {
                Self::new(raw).ok_or(crate::error::LwM2mError::IdInvalid { value: raw })
            }
        }
    };
}

id_newtype!(ObjectId, "Identifier of an Object definition/instance family, `0..=65534`.");
id_newtype!(InstanceId, "Identifier of an ObjectInstance within an Object, `0..=65534`.");
id_newtype!(ResourceId, "Identifier of a Resource within an Object's definition, `0..=65534`.");
id_newtype!(
    ResourceInstanceId,
    "Identifier of a ResourceInstance within an array-valued Resource, `0..=65534`."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(ObjectId::new(65535).is_none());
        assert!(ObjectId::new(70000).is_none());
    }

    #[test]
    fn accepts_boundary() {
        assert_eq!(ObjectId::new(65534).unwrap().value(), 65534);
        assert_eq!(ObjectId::new(0).unwrap().value(), 0);
    }

    #[test]
    fn invalid_sentinel_is_outside_range() {
        assert!(ObjectId::INVALID.is_invalid());
        assert!(ObjectId::new(ObjectId::INVALID.value()).is_none());
    }
}
