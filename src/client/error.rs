//! The error type returned by every [`super::Hypervisor`] call (spec.md §4.A).

use std::fmt;

/// Every hypervisor RPC returns either a parsed payload or one of these.
#[derive(Debug, Clone)]
pub enum HypervisorError {
    /// A network-level failure reaching the cluster.
    Transport(String),
    /// A non-2xx response; `body` is the response body verbatim.
    HttpStatus { code: u16, body: String },
    /// The response body didn't parse into the expected shape.
    Decode(String),
    /// A domain-level rejection raised by the client itself (e.g. "VMID not found").
    Domain(String),
}

impl fmt::Display for HypervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HypervisorError::Transport(msg) => write!(f, "transport error: {msg}"),
            HypervisorError::HttpStatus { code, body } => {
                write!(f, "hypervisor returned {code}: {body}")
            }
            HypervisorError::Decode(msg) => write!(f, "decode error: {msg}"),
            HypervisorError::Domain(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for HypervisorError {}

impl From<reqwest::Error> for HypervisorError {
    fn from(err: reqwest::Error) -> Self {
        HypervisorError::Transport(err.to_string())
    }
}

/// Shorthand for constructing a [`HypervisorError::Domain`].
#[macro_export]
macro_rules! hv_domain {
    ($($msg:tt)+) => {
        Err($crate::client::HypervisorError::Domain(format!($($msg)+)))
    };
}
