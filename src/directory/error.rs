//! Errors from the Directory Client (spec.md §4.C).

use std::fmt;

#[derive(Debug)]
pub enum DirectoryError {
    Ldap(String),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Ldap(msg) => write!(f, "directory error: {msg}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<ldap3::LdapError> for DirectoryError {
    fn from(err: ldap3::LdapError) -> Self {
        DirectoryError::Ldap(err.to_string())
    }
}

/// Classifies a directory error message as worth reconnecting over,
/// mirroring the catalog's substring classifier (spec.md §4.B, §5).
#[must_use]
pub fn is_transient(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    ["connection", "broken pipe", "network", "timeout", "eof"]
        .iter()
        .any(|needle| msg.contains(needle))
}
