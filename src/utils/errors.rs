//! The error taxonomy shared by every layer of Kamino.
//!
//! `EngineError` is the single error type the Cloning Engine and its direct
//! collaborators (hypervisor client, catalog, directory client) return. The
//! HTTP edge is the only place that downgrades a kind to a status code, so
//! the Engine itself stays transport-agnostic (spec.md §7).

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::catalog::CatalogError;
use crate::client::HypervisorError;
use crate::directory::DirectoryError;

/// The semantic kind of failure, independent of which collaborator raised it.
///
/// Maps 1:1 onto spec.md §7's six error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing env / out-of-range config at startup.
    ConfigInvalid,
    /// Network-level failure talking to a collaborator.
    Transport,
    /// A collaborator returned a 4xx/5xx with a body.
    HypervisorDomain,
    /// Unknown template, already-deployed target, or an ownership check failed.
    ValidationRejected,
    /// No free PodID/VMID in the configured window.
    ResourceExhausted,
    /// One or more post-`PoolCreated` steps failed but a pod exists.
    Partial,
}

impl ErrorKind {
    /// The HTTP status code the edge should use for this kind.
    ///
    /// The Engine never calls this itself; only `routes` does.
    #[must_use]
    pub fn status_hint(self) -> StatusCode {
        match self {
            ErrorKind::ConfigInvalid => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Transport | ErrorKind::HypervisorDomain => StatusCode::BAD_GATEWAY,
            ErrorKind::ValidationRejected => StatusCode::BAD_REQUEST,
            ErrorKind::ResourceExhausted => StatusCode::CONFLICT,
            ErrorKind::Partial => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The error type threaded through the Engine and its collaborators.
#[derive(Debug)]
pub struct EngineError {
    pub kind: ErrorKind,
    pub msg: String,
}

impl EngineError {
    #[must_use]
    pub fn new<T: Into<String>>(kind: ErrorKind, msg: T) -> Self {
        EngineError {
            kind,
            msg: msg.into(),
        }
    }

    #[must_use]
    pub fn config_invalid<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::ConfigInvalid, msg)
    }

    #[must_use]
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::ValidationRejected, msg)
    }

    #[must_use]
    pub fn exhausted<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::ResourceExhausted, msg)
    }

    #[must_use]
    pub fn partial(errors: &[EngineError]) -> Self {
        let joined = errors
            .iter()
            .map(|err| err.msg.clone())
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(ErrorKind::Partial, joined)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for EngineError {}

impl From<HypervisorError> for EngineError {
    fn from(err: HypervisorError) -> Self {
        match err {
            HypervisorError::Transport(msg) => EngineError::new(ErrorKind::Transport, msg),
            HypervisorError::HttpStatus { code, body } => EngineError::new(
                ErrorKind::HypervisorDomain,
                format!("hypervisor returned {code}: {body}"),
            ),
            HypervisorError::Decode(msg) => EngineError::new(ErrorKind::Transport, msg),
            HypervisorError::Domain(msg) => EngineError::new(ErrorKind::HypervisorDomain, msg),
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        EngineError::new(ErrorKind::Transport, err.to_string())
    }
}

impl From<DirectoryError> for EngineError {
    fn from(err: DirectoryError) -> Self {
        EngineError::new(ErrorKind::Transport, err.to_string())
    }
}

/// The HTTP-facing error shape returned by the edge.
///
/// This is the only place in the codebase a [`StatusCode`] and a message are
/// glued together into a response body.
#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: StatusCode,
    pub msg: Option<String>,
}

impl ApiError {
    #[must_use]
    pub fn new(code: StatusCode, msg: Option<String>) -> Self {
        ApiError { code, msg }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::new(err.kind.status_hint(), Some(err.msg))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.msg {
            Some(msg) => {
                tracing::event!(tracing::Level::ERROR, error = %msg, code = self.code.as_u16());
                (self.code, Json(serde_json::json!({ "error": msg }))).into_response()
            }
            None => self.code.into_response(),
        }
    }
}

/// 400 bad request
#[macro_export]
macro_rules! bad {
    ($($msg:tt)+) => {
        Err($crate::utils::ApiError::new(
            axum::http::StatusCode::BAD_REQUEST,
            Some($($msg)+),
        ))
    };
}

/// 404 not found
#[macro_export]
macro_rules! not_found {
    ($($msg:tt)+) => {
        Err($crate::utils::ApiError::new(
            axum::http::StatusCode::NOT_FOUND,
            Some($($msg)+),
        ))
    };
}

/// 409 conflict
#[macro_export]
macro_rules! conflict {
    ($($msg:tt)+) => {
        Err($crate::utils::ApiError::new(
            axum::http::StatusCode::CONFLICT,
            Some($($msg)+),
        ))
    };
}

/// 503 service unavailable
#[macro_export]
macro_rules! unavailable {
    ($($msg:tt)+) => {
        Err($crate::utils::ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Some($($msg)+),
        ))
    };
}
