use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Philippine mobile numbers with an optional +63 / 63 / 0 prefix
    /// - Valid: "09171234567", "+639171234567", "9171234567"
    /// - Invalid: "12345", "0917-123-4567", "+1 555 0100"
    pub static ref MOBILE_REGEX: Regex = Regex::new(r"^(\+?63|0)?[0-9]{10}$").unwrap();

    /// Six digit verification code
    pub static ref VERIFICATION_CODE_REGEX: Regex = Regex::new(r"^[0-9]{6}$").unwrap();

    /// 24-hour `HH:MM:SS`
    pub static ref TIME_REGEX: Regex =
        Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9]$").unwrap();
}

/// Password policy: at least 8 characters with a lowercase letter,
/// an uppercase letter and a digit.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let long_enough = password.chars().count() >= 8;
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_lower && has_upper && has_digit {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(
            "Password must be at least 8 characters and contain at least one uppercase letter, one lowercase letter, and one number"
                .into(),
        );
        Err(err)
    }
}

/// Rejects values that are empty once surrounding whitespace is removed
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Normalises a mobile number to E.164 for the SMS gateway
pub fn normalize_mobile(mobile: &str) -> String {
    let trimmed = mobile.trim();
    if let Some(rest) = trimmed.strip_prefix('0') {
        format!("+63{}", rest)
    } else if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_regex_valid() {
        assert!(MOBILE_REGEX.is_match("09171234567"));
        assert!(MOBILE_REGEX.is_match("+639171234567"));
        assert!(MOBILE_REGEX.is_match("639171234567"));
        assert!(MOBILE_REGEX.is_match("9171234567"));
    }

    #[test]
    fn test_mobile_regex_invalid() {
        assert!(!MOBILE_REGEX.is_match("12345"));
        assert!(!MOBILE_REGEX.is_match("0917-123-4567"));
        assert!(!MOBILE_REGEX.is_match("+1 555 0100"));
        assert!(!MOBILE_REGEX.is_match(""));
    }

    #[test]
    fn test_time_regex() {
        assert!(TIME_REGEX.is_match("08:00:00"));
        assert!(TIME_REGEX.is_match("23:59:59"));
        assert!(!TIME_REGEX.is_match("24:00:00"));
        assert!(!TIME_REGEX.is_match("8:00"));
        assert!(!TIME_REGEX.is_match("08:60:00"));
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Secret123").is_ok());
        assert!(validate_password_strength("Secr3t!!x").is_ok());
        assert!(validate_password_strength("secret123").is_err()); // no uppercase
        assert!(validate_password_strength("SECRET123").is_err()); // no lowercase
        assert!(validate_password_strength("SecretPass").is_err()); // no digit
        assert!(validate_password_strength("Se1").is_err()); // too short
    }

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("x").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }

    #[test]
    fn test_normalize_mobile() {
        assert_eq!(normalize_mobile("09171234567"), "+639171234567");
        assert_eq!(normalize_mobile("+639171234567"), "+639171234567");
        assert_eq!(normalize_mobile("639171234567"), "+639171234567");
    }
}
