//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Epoch milliseconds, as reported by the host.
pub type Millis = i64;

/// Milliseconds in one day.
pub const DAY_MS: Millis = 24 * 60 * 60 * 1000;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The value was not a valid integer identifier.
    #[error("invalid {field}: {value}")]
    InvalidId { field: &'static str, value: String },
}

/// Generates a host-assigned integer ID newtype with common trait implementations.
macro_rules! define_host_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw host identifier.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw host identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                trimmed
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId {
                        field: $field_name,
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

define_host_id!(
    /// A browser tab identifier.
    ///
    /// Stable for the lifetime of the tab. Hosts may reuse an ID after the
    /// tab closes, so a closed record can be replaced by a new one.
    TabId, "tab ID"
);

define_host_id!(
    /// A browser window identifier.
    WindowId, "window ID"
);

impl TabId {
    /// The store key for this tab's record (the decimal ID).
    #[must_use]
    pub fn key(self) -> String {
        self.0.to_string()
    }
}

/// Seconds elapsed between two millisecond timestamps.
///
/// Negative spans (out-of-order timestamps) count as zero.
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond spans stay far below 2^52"
)]
pub fn secs_between(start: Millis, end: Millis) -> f64 {
    (end.saturating_sub(start)).max(0) as f64 / 1000.0
}
