//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest challenge id accepted from clients.
pub const MAX_CHALLENGE_ID_LEN: usize = 128;

/// Validates that a challenge id is non-blank, reasonably short and free of control
/// characters.
///
/// # Examples
///
/// ```ignore
/// validate_challenge_id("web-1")   // Ok
/// validate_challenge_id("   ")     // Err - blank
/// validate_challenge_id("web\n1")  // Err - control character
/// ```
pub fn validate_challenge_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("challenge_id_blank");
        err.message = Some("Challenge ID must not be blank".into());
        return Err(err);
    }

    if id.len() > MAX_CHALLENGE_ID_LEN {
        let mut err = ValidationError::new("challenge_id_length");
        err.message = Some(
            format!(
                "Challenge ID must be at most {MAX_CHALLENGE_ID_LEN} bytes (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_control) {
        let mut err = ValidationError::new("challenge_id_format");
        err.message = Some("Challenge ID must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_challenge_id_valid() {
        assert!(validate_challenge_id("web-1").is_ok());
        assert!(validate_challenge_id("crypto_rot13").is_ok());
    }

    #[test]
    fn test_validate_challenge_id_invalid() {
        assert!(validate_challenge_id("").is_err());
        assert!(validate_challenge_id("   ").is_err());
        assert!(validate_challenge_id("web\t1").is_err());
        assert!(validate_challenge_id(&"x".repeat(MAX_CHALLENGE_ID_LEN + 1)).is_err());
    }
}
