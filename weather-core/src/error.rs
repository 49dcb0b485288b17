//! Error types for the three external collaborators: the weather source,
//! the sample store and the notification channel.

use thiserror::Error;

/// Failure to obtain a sample from a weather provider.
///
/// Recoverable: the location is skipped for the current cycle.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to weather provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed weather provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("weather provider response is missing `{0}`")]
    MissingField(&'static str),

    #[error("weather provider returned invalid timestamp {0}")]
    InvalidTimestamp(i64),
}

/// Failure to write or read samples.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt stored sample: {0}")]
    Corrupt(String),
}

/// Failure to deliver an alert message.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("notification relay rejected credentials (status {0})")]
    Auth(u16),

    #[error("notification relay returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn truncate_body_cuts_on_char_boundary() {
        let body = "é".repeat(150);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
    }

    #[test]
    fn status_error_names_status() {
        let err = FetchError::Status { status: 401, body: "bad key".into() };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad key"));
    }
}
