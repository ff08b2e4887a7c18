//! Secret redaction for key material in logs and debug output.
//!
//! [`Redacted`] never exposes its inner value through `Debug` or `Display`;
//! both print `"<redacted>"`. It deserializes transparently so secrets can be
//! wrapped at the point they are read from disk.

use std::fmt::{self, Debug, Display};

/// Wrapper that redacts its inner value when formatted.
///
/// ```ignore
/// tracing::info!(key = %Redacted(&private_key), "Loaded signer");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for Redacted<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Redacted)
    }
}
