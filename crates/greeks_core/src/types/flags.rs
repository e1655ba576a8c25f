//! Support items for bitmask types declared through [`crate::bitmask!`].

use thiserror::Error;

/// A label that does not name any flag of the target set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {set} flag '{name}'")]
pub struct UnknownFlagError {
    /// Name of the flag set being parsed.
    pub set: &'static str,
    /// The offending label.
    pub name: String,
}

/// Canonical form used to compare flag labels: lowercase, without `_`, `-` or spaces.
pub fn normalise_flag_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}
