use serde::Serialize;

/// Field-level rejection of a manually entered email.
/// Never reaches the resolution state machine: the caller shows it next to the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a test email")]
    Empty,
    #[error("Enter a valid email address")]
    Malformed { received: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        codes::VALIDATION_FAILED
    }
}

/// Structured error report printed by front-ends for scripts to consume.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Hint about what to do next
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl ErrorReport {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            docs_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.docs_hint = Some(hint.into());
        self
    }
}

/// Error codes used across front-ends
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const LOOKUP_FAILED: &str = "lookup_failed";
    pub const CUSTOMER_NOT_FOUND: &str = "customer_not_found";
    pub const EMAIL_MISSING: &str = "email_missing";
    pub const LOOKUP_INTERRUPTED: &str = "lookup_interrupted";
    pub const CLI_ERROR: &str = "cli_error";
}

#[cfg(test)]
mod tests {
    use super::{ErrorReport, ValidationError, codes};

    #[test]
    fn validation_messages_match_field_help() {
        assert_eq!(ValidationError::Empty.to_string(), "Please enter a test email");
        let malformed = ValidationError::Malformed {
            received: "nope".to_string(),
        };
        assert_eq!(malformed.to_string(), "Enter a valid email address");
        assert_eq!(malformed.code(), codes::VALIDATION_FAILED);
    }

    #[test]
    fn error_report_omits_missing_hint() {
        let report = ErrorReport::new(codes::LOOKUP_FAILED, "HTTP 500");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["error"], "lookup_failed");
        assert!(json.get("docs_hint").is_none());

        let hinted = ErrorReport::new(codes::CLI_ERROR, "bad").with_hint("try --help");
        let json = serde_json::to_value(&hinted).unwrap();
        assert_eq!(json["docs_hint"], "try --help");
    }
}
