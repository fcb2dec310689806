//! Connection-error classification for the catalog (spec.md §4.B): a
//! `sqlx::Error` is retried when its message contains one of these
//! substrings, matching the teacher's "classify-by-substring" convention for
//! its own redis/scylla reconnects.

const TRANSIENT_SUBSTRINGS: &[&str] = &[
    "connection",
    "broken pipe",
    "network",
    "timeout",
    "eof",
    "invalid connection",
    "connection refused",
    "server has gone away",
];

/// Whether `err`'s message looks like a transient connection failure worth
/// retrying, per the substring list in spec.md §4.B.
#[must_use]
pub fn is_transient(err: &sqlx::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    TRANSIENT_SUBSTRINGS.iter().any(|needle| msg.contains(needle))
}
