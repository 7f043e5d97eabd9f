//! Error types for the Bilibili API.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all Bilibili operations.
#[derive(Debug, Error)]
pub enum BiliError {
    /// A credential field required by the operation is empty.
    #[error("Missing credential field: {0}")]
    MissingCredential(&'static str),

    /// The string is neither a BV code nor an AV number.
    #[error("Invalid video id: {0}")]
    InvalidVideoId(String),

    /// Server answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Application-level error code in the JSON envelope.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The QR code expired before it was confirmed.
    #[error("QR code expired")]
    QrCodeExpired,

    /// The QR poll returned a status this client does not know.
    #[error("QR login failed ({code}): {message}")]
    QrLogin { code: i64, message: String },

    /// Login polling ran past the configured timeout.
    #[error("Login timed out after {0:?}")]
    LoginTimeout(Duration),

    /// Requested audio quality is not offered for the video.
    #[error("Quality not available: {0}")]
    QualityNotFound(String),

    /// Expected data was absent from the response.
    #[error("No data from API: {0}")]
    NoData(String),

    /// A file download could not be started or finished.
    #[error("Download failed: {0}")]
    Download(String),

    /// QR code could not be encoded.
    #[error("QR render error: {0}")]
    QrRender(String),

    /// HTTP request failed.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BiliError {
    /// True for errors caused by how the library was called rather than by
    /// the network or the server.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            BiliError::MissingCredential(_) | BiliError::InvalidVideoId(_)
        )
    }

    /// The platform error code, if the server returned one.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            BiliError::Api { code, .. } | BiliError::QrLogin { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for Bilibili operations.
pub type Result<T> = std::result::Result<T, BiliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors() {
        assert!(BiliError::MissingCredential("SESSDATA").is_usage_error());
        assert!(BiliError::InvalidVideoId("xyz".into()).is_usage_error());
        assert!(!BiliError::QrCodeExpired.is_usage_error());
    }

    #[test]
    fn test_api_code() {
        let err = BiliError::Api {
            code: -101,
            message: "账号未登录".into(),
        };
        assert_eq!(err.api_code(), Some(-101));
        assert_eq!(err.to_string(), "API error -101: 账号未登录");
        assert_eq!(BiliError::QrCodeExpired.api_code(), None);
    }
}
