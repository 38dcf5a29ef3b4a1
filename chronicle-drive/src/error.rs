use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriveError {
    /// No stored authorization to start from
    #[error(
        "No authorized-user token at {path:?}. Download OAuth client credentials from the \
         Google Cloud Console, authorize once, and save the authorized-user JSON there"
    )]
    MissingCredentials { path: PathBuf },

    /// Token file exists but cannot be used
    #[error("Unusable token file {path:?}: {reason}. Delete it and re-authorize")]
    InvalidToken { path: PathBuf, reason: String },

    /// Refresh-token exchange failed
    #[error("Token refresh failed: {reason}")]
    Refresh { reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Drive answered with a non-success status
    #[error("Drive API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid Drive API base URL '{url}'")]
    BaseUrl { url: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DriveError>;

/// Longest response body kept in an error, in bytes.
const MAX_ERROR_BODY: usize = 500;

impl DriveError {
    /// Build an API error, truncating the body so logs stay readable.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        Self::Api { status, body }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Actionable follow-up for common API failures.
    pub fn hint(&self) -> Option<&'static str> {
        match self.status()? {
            401 => Some("Authentication failed. Delete the token file and re-authorize."),
            403 => Some(
                "Access denied. Ensure the Google Drive API is enabled for the project and \
                 the 'drive.readonly' scope was granted.",
            ),
            404 => Some("File not found."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_body_is_truncated() {
        let err = DriveError::api(500, "x".repeat(2000));
        match err {
            DriveError::Api { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY + 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let err = DriveError::api(500, "é".repeat(400));
        assert!(err.to_string().ends_with("..."));
    }

    #[test]
    fn test_hints_by_status() {
        assert!(DriveError::api(401, "").hint().unwrap().contains("re-authorize"));
        assert!(DriveError::api(403, "").hint().unwrap().contains("drive.readonly"));
        assert_eq!(DriveError::api(404, "").hint(), Some("File not found."));
        assert_eq!(DriveError::api(500, "").hint(), None);
        assert_eq!(DriveError::Refresh { reason: "x".into() }.hint(), None);
    }
}
