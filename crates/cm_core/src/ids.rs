//! Identifier newtypes for participants and statements.
//!
//! Identifiers arrive as opaque scalars (integers in practice) and are kept
//! as strings internally. The original textual form is preserved on output;
//! `as_int` exposes the integer-coerced form where the value parses, which the
//! document renderers use for key coercion.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! def_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier, preserving its textual form.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Integer-coerced form, where the identifier parses as one.
            pub fn as_int(&self) -> Option<i64> {
                self.0.parse::<i64>().ok()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self(n.to_string())
            }
        }
    };
}

def_id!(ParticipantId, "Opaque stable participant identifier (`pid`).");
def_id!(StatementId, "Opaque stable statement identifier (`tid`).");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_raw_form() {
        let id = StatementId::new("007");
        assert_eq!(id.as_str(), "007");
        assert_eq!(id.as_int(), Some(7));
    }

    #[test]
    fn non_numeric_has_no_int_form() {
        let id = ParticipantId::new("anon-3");
        assert_eq!(id.as_int(), None);
        assert_eq!(id.to_string(), "anon-3");
    }
}
