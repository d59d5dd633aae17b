use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::users::models::{DeviceType, User, UserDevice, UserRole};
use crate::shared::types::double_option;
use crate::shared::validation::{
    validate_password_strength, MOBILE_REGEX, VERIFICATION_CODE_REGEX,
};

/// Request DTO for citizen self-registration
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequestDto {
    #[validate(length(min = 2, max = 50, message = "First name must be 2-50 characters"))]
    pub first_name: String,

    #[validate(length(min = 2, max = 50, message = "Last name must be 2-50 characters"))]
    pub last_name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(regex(path = *MOBILE_REGEX, message = "Please provide a valid Philippine mobile number"))]
    pub mobile: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,

    #[validate(length(min = 5, max = 255, message = "Address must be 5-255 characters"))]
    pub address: String,

    #[validate(length(min = 1, max = 50, message = "Barangay is required"))]
    pub barangay: String,
}

/// Request DTO for user login
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequestDto {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct VerifyAccountRequestDto {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(regex(path = *VERIFICATION_CODE_REGEX, message = "Verification code must be 6 digits"))]
    pub code: String,
}

/// Body for endpoints that only need an email address
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct EmailRequestDto {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequestDto {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequestDto {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub new_password: String,
}

/// Partial profile update. `profile_photo_url: null` removes the photo.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequestDto {
    #[validate(length(min = 2, max = 50, message = "First name must be 2-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 2, max = 50, message = "Last name must be 2-50 characters"))]
    pub last_name: Option<String>,

    #[validate(regex(path = *MOBILE_REGEX, message = "Please provide a valid Philippine mobile number"))]
    pub mobile: Option<String>,

    #[validate(length(min = 5, max = 255, message = "Address must be 5-255 characters"))]
    pub address: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Barangay must be 1-50 characters"))]
    pub barangay: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub profile_photo_url: Option<Option<String>>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterDeviceRequestDto {
    #[validate(length(min = 1, max = 500, message = "Device token is required"))]
    pub device_token: String,

    pub device_type: DeviceType,
}

/// Public view of a user account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfileDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub address: String,
    pub barangay: String,
    pub profile_photo_url: Option<String>,
    pub role: UserRole,
    pub verification_status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfileDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            mobile: user.mobile,
            address: user.address,
            barangay: user.barangay,
            profile_photo_url: user.profile_photo_url,
            role: user.role,
            verification_status: user.verification_status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Response DTO for a successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponseDto {
    /// Signed JWT access token
    pub token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: UserProfileDto,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceResponseDto {
    pub id: Uuid,
    pub device_token: String,
    pub device_type: DeviceType,
    pub created_at: DateTime<Utc>,
}

impl From<UserDevice> for DeviceResponseDto {
    fn from(device: UserDevice) -> Self {
        Self {
            id: device.id,
            device_token: device.device_token,
            device_type: device.device_type,
            created_at: device.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::{FirstName, LastName};
    use fake::Fake;

    fn valid_registration() -> RegisterRequestDto {
        RegisterRequestDto {
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            email: SafeEmail().fake(),
            mobile: "09171234567".to_string(),
            password: "Secret123".to_string(),
            address: "Purok 3, Poblacion".to_string(),
            barangay: "Poblacion".to_string(),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        let mut dto = valid_registration();
        // Fake names can be a single letter
        dto.first_name = format!("{}x", dto.first_name);
        dto.last_name = format!("{}x", dto.last_name);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_registration_rejects_weak_password_and_bad_mobile() {
        let mut dto = valid_registration();
        dto.first_name = "Maria".to_string();
        dto.last_name = "Santos".to_string();
        dto.password = "alllowercase".to_string();
        dto.mobile = "12345".to_string();

        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("mobile"));
    }

    #[test]
    fn test_verify_code_must_be_six_digits() {
        let dto = VerifyAccountRequestDto {
            email: "maria@example.com".to_string(),
            code: "12a456".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_update_profile_distinguishes_null_photo() {
        let cleared: UpdateProfileRequestDto =
            serde_json::from_str(r#"{"profile_photo_url": null}"#).unwrap();
        assert_eq!(cleared.profile_photo_url, Some(None));

        let untouched: UpdateProfileRequestDto =
            serde_json::from_str(r#"{"first_name": "Maria"}"#).unwrap();
        assert_eq!(untouched.profile_photo_url, None);
        assert!(untouched.validate().is_ok());
    }
}
