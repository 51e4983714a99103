use crate::error::ValidationError;
use std::fmt;

/// Tri-level outcome of `validate()`. Callers branch on this, never on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Result of validating a staged batch. `error` is set exactly when the severity is `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationStatus {
    severity: Severity,
    message: String,
    error: Option<ValidationError>,
}

impl ValidationStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Ok,
            message: message.into(),
            error: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            error: None,
        }
    }

    pub fn error(error: ValidationError) -> Self {
        Self {
            severity: Severity::Error,
            message: error.to_string(),
            error: Some(error),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextRange;

    #[test]
    fn error_status_carries_structured_tag() {
        let status = ValidationStatus::error(ValidationError::OutOfBounds {
            range: TextRange::new(8, 5),
            buffer_len: 10,
        });
        assert!(status.is_error());
        assert_eq!(status.severity(), Severity::Error);
        assert!(matches!(
            status.validation_error(),
            Some(ValidationError::OutOfBounds { buffer_len: 10, .. })
        ));
        assert_eq!(
            status.to_string(),
            "error: edit [8, 13) ends past buffer length 10"
        );
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(ValidationStatus::warning("w").validation_error().is_none());
    }
}
