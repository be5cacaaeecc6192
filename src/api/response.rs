use crate::error::Error;
use reqwest::StatusCode;
use serde::Deserialize;

const MAX_REASON_LEN: usize = 200;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Map a response status to the error taxonomy. Success statuses pass through.
pub(super) fn check_status(status: StatusCode, body: &str) -> Result<(), Error> {
    if status.is_success() {
        return Ok(());
    }
    let reason = reason(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Auth(reason)),
        _ => Err(Error::Rejected {
            status: status.as_u16(),
            reason,
        }),
    }
}

/// The server's `{"error": "..."}` reason, else the (truncated) body, else the status text.
pub(super) fn reason(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        return error;
    }
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    body.chars().take(MAX_REASON_LEN).collect()
}
