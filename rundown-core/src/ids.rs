//! Identifiers for rundown entities
//!
//! Every entity is addressed by a string identifier assigned by the rundown
//! editing system. The newtypes keep a line id from being passed where an item
//! id is expected.

use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifies a rundown
    RundownId
);
string_id!(
    /// Identifies a segment within a rundown
    SegmentId
);
string_id!(
    /// Identifies a line; unique across the whole rundown
    LineId
);
string_id!(
    /// Identifies an item; unique across the whole rundown
    ItemId
);
string_id!(
    /// Identifies a source layer (e.g. `graphics-lower-third`)
    SourceLayerId
);
