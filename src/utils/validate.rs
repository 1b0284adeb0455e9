//! Parameter validation shared by filters and commands.

use crate::error::{PipelineError, Result};
use uuid::Uuid;

/// True for a 36-character hyphenated UUID.
pub fn is_uuid(value: &str) -> bool {
    value.len() == 36 && Uuid::try_parse(value).is_ok()
}

/// Trim `value` and check its length in characters.
pub fn string_param(value: &str, name: &str, min: usize, max: usize) -> Result<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(PipelineError::validation(format!(
            "{} must be at least {} characters long",
            name, min
        )));
    }
    if len > max {
        return Err(PipelineError::validation(format!(
            "{} must be no more than {} characters long",
            name, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Require a full hyphenated UUID.
pub fn uuid_param(value: &str, name: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.len() < 36 {
        return Err(PipelineError::validation(format!(
            "{} appears to be truncated. Expected 36 characters, got {}: {}",
            name,
            trimmed.len(),
            trimmed
        )));
    }
    if !is_uuid(trimmed) {
        return Err(PipelineError::validation(format!(
            "{} must be a valid UUID. Received: {}",
            name, trimmed
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_uuid() {
        assert!(is_uuid("7f1e9b6a-2e4c-4c9e-8d37-5c5b2a0f8e11"));
        assert!(!is_uuid("7f1e9b6a2e4c4c9e8d375c5b2a0f8e11"));
        assert!(!is_uuid("not-a-uuid-but-exactly-36-characters"));
        assert!(!is_uuid("Svc"));
    }

    #[test]
    fn test_string_param_bounds() {
        assert_eq!(string_param("  cdsp ", "Source", 1, 100).unwrap(), "cdsp");
        assert!(string_param("   ", "Source", 1, 100)
            .unwrap_err()
            .is_validation());
        let err = string_param("2025-04-01", "Start Date", 20, 30).unwrap_err();
        assert!(err.to_string().contains("at least 20"));
        assert!(string_param(&"x".repeat(101), "Action", 1, 100).is_err());
    }

    #[test]
    fn test_uuid_param() {
        assert!(uuid_param("7f1e9b6a-2e4c-4c9e-8d37-5c5b2a0f8e11", "tenant_id").is_ok());
        let err = uuid_param("7f1e9b6a-2e4c", "tenant_id").unwrap_err();
        assert!(err.to_string().contains("truncated"));
        let err = uuid_param("zzzzzzzz-2e4c-4c9e-8d37-5c5b2a0f8e11", "tenant_id").unwrap_err();
        assert!(err.to_string().contains("valid UUID"));
    }
}
