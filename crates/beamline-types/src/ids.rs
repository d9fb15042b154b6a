//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Each accepted start command opens a new beam run. Runs are tagged with a
//! UUID v7 (time-ordered) so log lines and snapshots from the same run can be
//! correlated by an external collector.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one beam run (from an accepted start to the
    /// next stop or collapse).
    RunId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_run_ids_are_not_nil() {
        let a = RunId::new();
        let b = RunId::new();
        assert_ne!(a.into_inner(), Uuid::nil());
        assert_ne!(a, b);
    }

    #[test]
    fn run_id_display_matches_uuid() {
        let id = RunId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn run_id_serializes_as_bare_uuid() {
        let id = RunId::new();
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json, Some(format!("\"{}\"", id.into_inner())));
    }
}
