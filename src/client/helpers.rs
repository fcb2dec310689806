//! Request-sending helpers shared by every hypervisor sub-client.
//!
//! Mirrors the teacher's `send!`/`send_build!` macros (`api/src/client/helpers.rs`),
//! adapted to the `{ "data": T }` envelope the Proxmox-style cluster API wraps
//! every non-`DELETE` response in (spec.md §6).

use serde::de::DeserializeOwned;

use super::HypervisorError;

/// The `{ "data": T }` envelope every hypervisor response but `DELETE` uses.
#[derive(serde::Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Sends `req`, classifying non-2xx responses as [`HypervisorError::HttpStatus`]
/// with the body preserved verbatim, and decoding the `data` envelope into `T`.
pub async fn send_envelope<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
) -> Result<T, HypervisorError> {
    let resp = req.send().await?;
    let status = resp.status();
    let body = resp.text().await.map_err(|e| HypervisorError::Transport(e.to_string()))?;
    if !status.is_success() {
        return Err(HypervisorError::HttpStatus {
            code: status.as_u16(),
            body,
        });
    }
    let envelope: Envelope<T> = serde_json::from_str(&body)
        .map_err(|e| HypervisorError::Decode(format!("{e}: {body}")))?;
    Ok(envelope.data)
}

/// Sends `req`, classifying non-2xx responses the same as [`send_envelope`]
/// but discarding any body — used for `DELETE` calls that return no payload.
pub async fn send_empty(req: reqwest::RequestBuilder) -> Result<(), HypervisorError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(HypervisorError::HttpStatus {
            code: status.as_u16(),
            body,
        });
    }
    Ok(())
}
