//! error kinds reported by device calls.
//!
//! transport: the request never produced an http response (unreachable,
//! timeout, body read failure). server: the device answered, but with a
//! non-2xx status or a payload that doesn't decode.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("server: {0}")]
    Server(#[from] ServerError),
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("invalid device url: {0}")]
    InvalidUrl(String),
    #[error("request to {path} failed: {message}")]
    Request { path: &'static str, message: String },
    #[error("reading {path} failed: {message}")]
    Read { path: &'static str, message: String },
}

#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("{path} returned {status}: {body}")]
    Status {
        path: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("{path} returned malformed payload: {message}")]
    Decode { path: &'static str, message: String },
}

/// failure of POST /api/schedule
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("print time is empty")]
    EmptyTime,
    #[error("device rejected print time ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// failure of POST /submit. only transport failures count.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SubmitError(#[from] pub TransportError);

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl SaveError {
    /// the device-side failure behind this error. `EmptyTime` never reached
    /// the device, so it has none.
    pub fn device_error(&self) -> Option<ClientError> {
        match self {
            Self::EmptyTime => None,
            Self::Rejected { status, body } => Some(
                ServerError::Status {
                    path: crate::device::SCHEDULE_PATH,
                    status: *status,
                    body: body.clone(),
                }
                .into(),
            ),
            Self::Transport(e) => Some(e.clone().into()),
        }
    }
}

/// device body text for error messages, "<empty>" when blank
pub(crate) fn body_text(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "<empty>".to_string()
    } else {
        trimmed.to_string()
    }
}
