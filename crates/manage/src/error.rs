//! Error types for management API operations.
//!
//! Errors are classified into categories so the deployment engine can decide
//! between "skip and warn" and "abort the run" with a match instead of
//! inspecting message text.

use crate::xml::xml_element_text;
use std::fmt;

/// Result type alias for management API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message-code suffixes the management API uses when a resource's owning
/// database does not exist. Codes look like `XDMP-NOSUCHDB`; the prefix names
/// the subsystem and is ignored.
const MISSING_DEPENDENCY_CODES: &[&str] = &["NOSUCHDB"];

/// Categories of management API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The database a resource is scoped to does not exist (yet).
    MissingDependency,
    /// The addressed resource does not exist.
    NotFound,
    /// The server rejected a submitted artifact during validation.
    Validation,
    /// Any other error reported by the server.
    Remote,
    /// The request never got a response.
    Network,
    /// The server answered with something unparseable.
    Format,
}

impl ErrorCategory {
    /// Whether a deployment may log this error and carry on with the next unit.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingDependency)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingDependency => "Dependent database does not exist",
            Self::NotFound => "Resource not found",
            Self::Validation => "Validation failed",
            Self::Remote => "Management API error",
            Self::Network => "Network connectivity issue",
            Self::Format => "Unexpected response format",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the management API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The owning database of a scoped resource does not exist.
    #[error("{message}")]
    MissingDependency {
        /// Server message code, e.g. `XDMP-NOSUCHDB`.
        code: String,
        /// Server message.
        message: String,
    },

    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A submitted artifact failed server-side validation.
    #[error("{code}: {message}")]
    ValidationFailed {
        /// Validation engine error code, e.g. `TDE-REPEATEDCOLUMN`.
        code: String,
        /// Validation engine message.
        message: String,
    },

    /// Any other error response.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server message code, if the response carried one.
        code: Option<String>,
        /// Server message or raw body.
        message: String,
    },

    /// The request could not be sent or no response was received.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Classify an error response from the management API.
    ///
    /// Understands JSON and XML `errorResponse` bodies; anything else is kept
    /// verbatim as the message.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let (code, message) = parse_error_response(body);
        let message = message.unwrap_or_else(|| body.trim().to_string());

        if let Some(code) = code.as_deref()
            && is_missing_dependency_code(code)
        {
            return Self::MissingDependency {
                code: code.to_string(),
                message,
            };
        }

        if status == 404 {
            return Self::NotFound(message);
        }

        Self::Http {
            status,
            code,
            message,
        }
    }

    /// Server message code carried by this error, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::MissingDependency { code, .. } | Self::ValidationFailed { code, .. } => {
                Some(code)
            }
            Self::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingDependency { .. } => ErrorCategory::MissingDependency,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::ValidationFailed { .. } => ErrorCategory::Validation,
            Self::Http { .. } => ErrorCategory::Remote,
            Self::Transport(_) => ErrorCategory::Network,
            Self::InvalidResponse(_) => ErrorCategory::Format,
        }
    }

    /// Whether this error may be downgraded to a warning.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.category().is_recoverable()
    }
}

fn is_missing_dependency_code(code: &str) -> bool {
    let suffix = code.rsplit('-').next().unwrap_or(code);
    MISSING_DEPENDENCY_CODES.contains(&suffix)
}

/// Extract `(messageCode, message)` from an error response body.
fn parse_error_response(body: &str) -> (Option<String>, Option<String>) {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let response = value.get("errorResponse").unwrap_or(&value);
        let code = response
            .get("messageCode")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let message = response
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        return (code, message);
    }

    (
        xml_element_text(body, "messageCode"),
        xml_element_text(body, "message"),
    )
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                status: code,
                code: None,
                message: format!("HTTP {code}"),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_database_json_response() {
        let body = r#"{"errorResponse": {"statusCode": 404, "status": "Not Found",
            "messageCode": "XDMP-NOSUCHDB", "message": "XDMP-NOSUCHDB: No such database app-schemas"}}"#;
        let err = Error::from_response(404, body);
        assert_eq!(err.category(), ErrorCategory::MissingDependency);
        assert_eq!(err.code(), Some("XDMP-NOSUCHDB"));
        assert!(err.to_string().contains("app-schemas"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_missing_database_any_prefix() {
        let body = r#"{"errorResponse": {"messageCode": "MANAGE-NOSUCHDB", "message": "gone"}}"#;
        assert!(Error::from_response(400, body).is_recoverable());
    }

    #[test]
    fn test_missing_database_xml_response() {
        let body = "<error-response xmlns=\"http://marklogic.com/xdmp/error\">\
            <status-code>404</status-code>\
            <message-code>ignored</message-code>\
            <rapi:messageCode>XDMP-NOSUCHDB</rapi:messageCode>\
            <rapi:message>No such database</rapi:message></error-response>";
        let err = Error::from_response(404, body);
        assert_eq!(err.category(), ErrorCategory::MissingDependency);
        assert_eq!(err.to_string(), "No such database");
    }

    #[test]
    fn test_not_found_without_code() {
        let err = Error::from_response(404, "");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_similar_code_is_not_missing_dependency() {
        let body = r#"{"errorResponse": {"messageCode": "XDMP-NOSUCHDBX", "message": "other"}}"#;
        let err = Error::from_response(500, body);
        assert_eq!(err.category(), ErrorCategory::Remote);
        assert_eq!(err.code(), Some("XDMP-NOSUCHDBX"));
    }

    #[test]
    fn test_plain_text_body_kept() {
        let err = Error::from_response(500, "  internal failure \n");
        match err {
            Error::Http {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 500);
                assert_eq!(code, None);
                assert_eq!(message, "internal failure");
            }
            _ => panic!("Expected Error::Http"),
        }
    }

    #[test]
    fn test_validation_category() {
        let err = Error::ValidationFailed {
            code: "TDE-REPEATEDCOLUMN".to_string(),
            message: "column repeated".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "TDE-REPEATEDCOLUMN: column repeated");
    }

    #[test]
    fn test_only_missing_dependency_recoverable() {
        assert!(ErrorCategory::MissingDependency.is_recoverable());
        assert!(!ErrorCategory::NotFound.is_recoverable());
        assert!(!ErrorCategory::Validation.is_recoverable());
        assert!(!ErrorCategory::Remote.is_recoverable());
        assert!(!ErrorCategory::Network.is_recoverable());
        assert!(!ErrorCategory::Format.is_recoverable());
    }

    #[test]
    fn test_error_category_display() {
        let display = format!("{}", ErrorCategory::Network);
        assert!(display.contains("Network"));
    }
}
