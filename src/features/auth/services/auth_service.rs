use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::config::AuthConfig;
use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{
    AuthResponseDto, ChangePasswordRequestDto, DeviceResponseDto, LoginRequestDto,
    RegisterDeviceRequestDto, RegisterRequestDto, ResetPasswordRequestDto,
    UpdateProfileRequestDto, UserProfileDto, VerifyAccountRequestDto,
};
use crate::features::auth::jwt::JwtService;
use crate::features::auth::password;
use crate::features::users::models::{CreateUser, UpdateProfile, User};
use crate::features::users::services::DUPLICATE_USER_MESSAGE;
use crate::features::users::UserService;
use crate::modules::notifications::{Notification, Notifier};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const NOT_VERIFIED_MESSAGE: &str = "Account not verified. Please verify your account first.";
pub const INVALID_RESET_TOKEN_MESSAGE: &str = "Invalid or expired password reset token";
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

/// Lifetimes of the one-time secrets handed to users
#[derive(Debug, Clone, Copy)]
pub struct AuthTimings {
    pub verification_code_ttl: Duration,
    pub reset_token_ttl: Duration,
}

impl AuthTimings {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            verification_code_ttl: Duration::seconds(config.verification_code_ttl.as_secs() as i64),
            reset_token_ttl: Duration::seconds(config.reset_token_ttl.as_secs() as i64),
        }
    }
}

/// Outcome of checking a submitted verification code
#[derive(Debug, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    AlreadyVerified,
    Mismatch,
    Expired,
}

/// Compares a submitted code against the stored one. Expiry is checked
/// only once the code matches.
pub fn check_verification_code(user: &User, code: &str, now: DateTime<Utc>) -> CodeCheck {
    if user.verification_status {
        return CodeCheck::AlreadyVerified;
    }
    if user.verification_code.as_deref() != Some(code) {
        return CodeCheck::Mismatch;
    }
    match user.verification_code_expires_at {
        Some(expires_at) if expires_at < now => CodeCheck::Expired,
        _ => CodeCheck::Valid,
    }
}

/// Registration, login and account recovery
pub struct AuthService {
    users: Arc<UserService>,
    jwt: Arc<JwtService>,
    notifier: Arc<Notifier>,
    timings: AuthTimings,
    frontend_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<UserService>,
        jwt: Arc<JwtService>,
        notifier: Arc<Notifier>,
        timings: AuthTimings,
        frontend_url: String,
    ) -> Self {
        Self {
            users,
            jwt,
            notifier,
            timings,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    fn verification_notification(&self, user: &User, code: &str) -> Notification {
        Notification::AccountVerification {
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            name: user.first_name.clone(),
            code: code.to_string(),
            expires_in_minutes: self.timings.verification_code_ttl.num_minutes(),
        }
    }

    pub async fn register(&self, dto: RegisterRequestDto) -> Result<UserProfileDto> {
        let email = dto.email.trim().to_lowercase();
        let mobile = dto.mobile.trim().to_string();

        if self.users.exists_by_email_or_mobile(&email, &mobile).await? {
            return Err(AppError::Conflict(DUPLICATE_USER_MESSAGE.to_string()));
        }

        let password_hash = password::hash_password_blocking(dto.password).await?;
        let code = password::generate_verification_code();

        let user = self
            .users
            .create(&CreateUser {
                first_name: dto.first_name.trim().to_string(),
                last_name: dto.last_name.trim().to_string(),
                email,
                mobile,
                address: dto.address.trim().to_string(),
                barangay: dto.barangay.trim().to_string(),
                password_hash,
                verification_code: code.clone(),
                verification_code_expires_at: Utc::now() + self.timings.verification_code_ttl,
            })
            .await?;

        self.notifier
            .dispatch(self.verification_notification(&user, &code));

        Ok(user.into())
    }

    pub async fn login(&self, dto: LoginRequestDto) -> Result<AuthResponseDto> {
        let email = dto.email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))?;

        let matches =
            password::verify_password_blocking(dto.password, user.password_hash.clone()).await?;
        if !matches {
            return Err(AppError::Unauthorized(
                INVALID_CREDENTIALS_MESSAGE.to_string(),
            ));
        }

        if !user.verification_status {
            return Err(AppError::Unauthorized(NOT_VERIFIED_MESSAGE.to_string()));
        }

        let token = self.jwt.issue(&user)?;
        tracing::info!("User logged in: {}", user.id);

        Ok(AuthResponseDto {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.expires_in_secs(),
            user: user.into(),
        })
    }

    pub async fn verify_account(&self, dto: VerifyAccountRequestDto) -> Result<()> {
        let user = self.require_by_email(&dto.email).await?;

        match check_verification_code(&user, dto.code.trim(), Utc::now()) {
            CodeCheck::Valid => self.users.mark_verified(user.id).await,
            CodeCheck::AlreadyVerified => Err(AppError::BadRequest(
                "Account is already verified".to_string(),
            )),
            CodeCheck::Mismatch => Err(AppError::BadRequest(
                "Invalid verification code".to_string(),
            )),
            CodeCheck::Expired => Err(AppError::BadRequest(
                "Verification code has expired".to_string(),
            )),
        }
    }

    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        let user = self.require_by_email(email).await?;
        if user.verification_status {
            return Err(AppError::BadRequest(
                "Account is already verified".to_string(),
            ));
        }

        let code = password::generate_verification_code();
        self.users
            .set_verification_code(
                user.id,
                &code,
                Utc::now() + self.timings.verification_code_ttl,
            )
            .await?;

        self.notifier
            .dispatch(self.verification_notification(&user, &code));
        Ok(())
    }

    /// Starts a password reset. Unknown emails succeed silently.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let Some(user) = self.users.find_by_email(&email.trim().to_lowercase()).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let (token, digest) = password::generate_reset_token();
        self.users
            .set_reset_token(user.id, &digest, Utc::now() + self.timings.reset_token_ttl)
            .await?;

        self.notifier.dispatch(Notification::PasswordReset {
            email: user.email.clone(),
            name: user.first_name.clone(),
            reset_url: format!("{}/reset-password?token={}", self.frontend_url, token),
            expires_in_minutes: self.timings.reset_token_ttl.num_minutes(),
        });
        Ok(())
    }

    pub async fn reset_password(&self, dto: ResetPasswordRequestDto) -> Result<()> {
        let digest = password::hash_reset_token(dto.token.trim());
        let user = self
            .users
            .find_by_valid_reset_token(&digest, Utc::now())
            .await?
            .ok_or_else(|| AppError::BadRequest(INVALID_RESET_TOKEN_MESSAGE.to_string()))?;

        let password_hash = password::hash_password_blocking(dto.password).await?;
        self.users.update_password(user.id, &password_hash).await
    }

    pub async fn me(&self, user_id: Uuid) -> Result<UserProfileDto> {
        Ok(self.users.get_by_id(user_id).await?.into())
    }

    pub async fn update_me(
        &self,
        user_id: Uuid,
        dto: UpdateProfileRequestDto,
    ) -> Result<UserProfileDto> {
        let update = UpdateProfile {
            first_name: dto.first_name.map(|v| v.trim().to_string()),
            last_name: dto.last_name.map(|v| v.trim().to_string()),
            mobile: dto.mobile.map(|v| v.trim().to_string()),
            address: dto.address.map(|v| v.trim().to_string()),
            barangay: dto.barangay.map(|v| v.trim().to_string()),
            profile_photo_url: dto.profile_photo_url,
        };
        Ok(self.users.update_profile(user_id, &update).await?.into())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        dto: ChangePasswordRequestDto,
    ) -> Result<()> {
        let user = self.users.get_by_id(user_id).await?;

        let matches =
            password::verify_password_blocking(dto.current_password, user.password_hash).await?;
        if !matches {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = password::hash_password_blocking(dto.new_password).await?;
        self.users.update_password(user_id, &password_hash).await
    }

    /// Returns the device and whether it was newly registered
    pub async fn register_device(
        &self,
        user_id: Uuid,
        dto: RegisterDeviceRequestDto,
    ) -> Result<(DeviceResponseDto, bool)> {
        let (device, created) = self
            .users
            .register_device(user_id, dto.device_token.trim(), dto.device_type)
            .await?;
        Ok((device.into(), created))
    }

    async fn require_by_email(&self, email: &str) -> Result<User> {
        self.users
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::users::models::UserRole;
    use crate::shared::test_helpers::{test_jwt, test_notifier};
    use sqlx::PgPool;

    fn pending_user(code: &str, expires_in: Duration) -> User {
        let now = Utc::now();
        User {
            id: Uuid::now_v7(),
            first_name: "Maria".to_string(),
            last_name: "Santos".to_string(),
            email: "maria@example.com".to_string(),
            mobile: "09171234567".to_string(),
            address: "Purok 3, Poblacion".to_string(),
            barangay: "Poblacion".to_string(),
            password_hash: String::new(),
            profile_photo_url: None,
            role: UserRole::Citizen,
            verification_status: false,
            verification_code: Some(code.to_string()),
            verification_code_expires_at: Some(now + expires_in),
            reset_token_hash: None,
            reset_token_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_check_verification_code() {
        let now = Utc::now();
        let user = pending_user("482913", Duration::minutes(15));

        assert_eq!(check_verification_code(&user, "482913", now), CodeCheck::Valid);
        assert_eq!(
            check_verification_code(&user, "000000", now),
            CodeCheck::Mismatch
        );

        let expired = pending_user("482913", Duration::minutes(-1));
        assert_eq!(
            check_verification_code(&expired, "482913", now),
            CodeCheck::Expired
        );

        let mut verified = user.clone();
        verified.verification_status = true;
        assert_eq!(
            check_verification_code(&verified, "482913", now),
            CodeCheck::AlreadyVerified
        );
    }

    #[test]
    fn test_timings_from_config() {
        let config = AuthConfig {
            jwt_secret: "x".repeat(32),
            jwt_expires_in: std::time::Duration::from_secs(86_400),
            jwt_leeway: std::time::Duration::from_secs(0),
            verification_code_ttl: std::time::Duration::from_secs(900),
            reset_token_ttl: std::time::Duration::from_secs(3600),
        };
        let timings = AuthTimings::from_config(&config);
        assert_eq!(timings.verification_code_ttl.num_minutes(), 15);
        assert_eq!(timings.reset_token_ttl.num_minutes(), 60);
    }

    fn service(pool: &PgPool) -> AuthService {
        AuthService::new(
            Arc::new(UserService::new(pool.clone())),
            test_jwt(),
            test_notifier(),
            AuthTimings {
                verification_code_ttl: Duration::minutes(15),
                reset_token_ttl: Duration::hours(1),
            },
            "http://localhost:3000/".to_string(),
        )
    }

    fn registration(email: &str, mobile: &str) -> RegisterRequestDto {
        RegisterRequestDto {
            first_name: "Maria".to_string(),
            last_name: "Santos".to_string(),
            email: email.to_string(),
            mobile: mobile.to_string(),
            password: "Secret123".to_string(),
            address: "Purok 3, Poblacion".to_string(),
            barangay: "Poblacion".to_string(),
        }
    }

    async fn user_count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a local Postgres"]
    async fn test_register_rejects_taken_email_or_mobile(pool: PgPool) {
        let auth = service(&pool);
        let profile = auth
            .register(registration("Maria@Example.com", "09171234567"))
            .await
            .unwrap();
        assert_eq!(profile.email, "maria@example.com");

        let same_email = auth
            .register(registration("maria@example.com", "09179999999"))
            .await;
        assert!(
            matches!(same_email, Err(AppError::Conflict(msg)) if msg == DUPLICATE_USER_MESSAGE)
        );

        let same_mobile = auth
            .register(registration("other@example.com", "09171234567"))
            .await;
        assert!(matches!(same_mobile, Err(AppError::Conflict(_))));

        assert_eq!(user_count(&pool).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a local Postgres"]
    async fn test_insert_conflict_maps_unique_violation(pool: PgPool) {
        let users = UserService::new(pool.clone());
        let data = CreateUser {
            first_name: "Juan".to_string(),
            last_name: "Dela Cruz".to_string(),
            email: "juan@example.com".to_string(),
            mobile: "09181234567".to_string(),
            address: "Purok 1, Hingotanan".to_string(),
            barangay: "Hingotanan East".to_string(),
            password_hash: String::new(),
            verification_code: "123456".to_string(),
            verification_code_expires_at: Utc::now(),
        };
        users.create(&data).await.unwrap();

        let again = users.create(&data).await;
        assert!(matches!(again, Err(AppError::Conflict(msg)) if msg == DUPLICATE_USER_MESSAGE));
        assert_eq!(user_count(&pool).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a local Postgres"]
    async fn test_reset_password_honours_expiry(pool: PgPool) {
        let auth = service(&pool);
        let users = UserService::new(pool.clone());
        let profile = auth
            .register(registration("maria@example.com", "09171234567"))
            .await
            .unwrap();

        let (stale, stale_digest) = password::generate_reset_token();
        users
            .set_reset_token(profile.id, &stale_digest, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        let expired = auth
            .reset_password(ResetPasswordRequestDto {
                token: stale,
                password: "Changed123".to_string(),
            })
            .await;
        assert!(
            matches!(expired, Err(AppError::BadRequest(msg)) if msg == INVALID_RESET_TOKEN_MESSAGE)
        );

        let (token, digest) = password::generate_reset_token();
        users
            .set_reset_token(profile.id, &digest, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        auth.reset_password(ResetPasswordRequestDto {
            token: token.clone(),
            password: "Changed123".to_string(),
        })
        .await
        .unwrap();

        let user = users.get_by_id(profile.id).await.unwrap();
        assert!(user.reset_token_hash.is_none());
        assert!(user.reset_token_expires.is_none());
        assert!(password::verify_password("Changed123", &user.password_hash).unwrap());

        let reused = auth
            .reset_password(ResetPasswordRequestDto {
                token,
                password: "Another123".to_string(),
            })
            .await;
        assert!(matches!(reused, Err(AppError::BadRequest(_))));
    }
}
