use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::database::is_unique_violation;
use crate::core::error::{AppError, Result};
use crate::features::users::models::{
    CreateUser, DeviceType, UpdateProfile, User, UserDevice, UserRole,
};

const USER_COLUMNS: &str = r#"
    id, first_name, last_name, email, mobile, address, barangay,
    password_hash, profile_photo_url, role, verification_status,
    verification_code, verification_code_expires_at,
    reset_token_hash, reset_token_expires, created_at, updated_at
"#;

pub const DUPLICATE_USER_MESSAGE: &str = "Email or mobile number already registered";

/// Identity store: user records, verification and password-reset state
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, data: &CreateUser) -> Result<User> {
        let query = format!(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, mobile, address, barangay,
                password_hash, verification_code, verification_code_expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::now_v7())
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(&data.email)
            .bind(&data.mobile)
            .bind(&data.address)
            .bind(&data.barangay)
            .bind(&data.password_hash)
            .bind(&data.verification_code)
            .bind(data.verification_code_expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return AppError::Conflict(DUPLICATE_USER_MESSAGE.to_string());
                }
                tracing::error!("Failed to create user: {:?}", e);
                AppError::Database(e)
            })?;

        tracing::info!("Created user: {}", user.id);
        Ok(user)
    }

    pub async fn exists_by_email_or_mobile(&self, email: &str, mobile: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR mobile = $2)",
        )
        .bind(email)
        .bind(mobile)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check existing user: {:?}", e);
            AppError::Database(e)
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get user by id: {:?}", e);
                AppError::Database(e)
            })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get user by email: {:?}", e);
                AppError::Database(e)
            })
    }

    /// Looks up a user holding an unexpired reset token with the given digest
    pub async fn find_by_valid_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE reset_token_hash = $1 AND reset_token_expires > $2",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get user by reset token: {:?}", e);
                AppError::Database(e)
            })
    }

    /// Role of the given user, if they exist
    pub async fn find_role(&self, id: Uuid) -> Result<Option<UserRole>> {
        sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get user role: {:?}", e);
                AppError::Database(e)
            })
    }

    pub async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_code = $2, verification_code_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to set verification code: {:?}", e);
            AppError::Database(e)
        })?;
        Ok(())
    }

    pub async fn mark_verified(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_status = TRUE,
                verification_code = NULL,
                verification_code_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark user verified: {:?}", e);
            AppError::Database(e)
        })?;

        tracing::info!("Verified user: {}", id);
        Ok(())
    }

    pub async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token_hash = $2, reset_token_expires = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to set reset token: {:?}", e);
            AppError::Database(e)
        })?;
        Ok(())
    }

    /// Stores a new password hash and clears any outstanding reset token
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_token_hash = NULL,
                reset_token_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update password: {:?}", e);
            AppError::Database(e)
        })?;

        tracing::info!("Password updated for user: {}", id);
        Ok(())
    }

    pub async fn update_profile(&self, id: Uuid, data: &UpdateProfile) -> Result<User> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");

        if let Some(first_name) = &data.first_name {
            fields.push("first_name = ").push_bind_unseparated(first_name.clone());
        }
        if let Some(last_name) = &data.last_name {
            fields.push("last_name = ").push_bind_unseparated(last_name.clone());
        }
        if let Some(mobile) = &data.mobile {
            fields.push("mobile = ").push_bind_unseparated(mobile.clone());
        }
        if let Some(address) = &data.address {
            fields.push("address = ").push_bind_unseparated(address.clone());
        }
        if let Some(barangay) = &data.barangay {
            fields.push("barangay = ").push_bind_unseparated(barangay.clone());
        }
        if let Some(photo) = &data.profile_photo_url {
            fields
                .push("profile_photo_url = ")
                .push_bind_unseparated(photo.clone());
        }
        fields.push("updated_at = NOW()");

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(" RETURNING ").push(USER_COLUMNS);

        let user = builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return AppError::Conflict("Mobile number already registered".to_string());
                }
                tracing::error!("Failed to update user profile: {:?}", e);
                AppError::Database(e)
            })?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!("Updated profile for user: {}", id);
        Ok(user)
    }

    pub async fn count_verified_citizens(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role = 'citizen' AND verification_status = TRUE",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count verified citizens: {:?}", e);
            AppError::Database(e)
        })
    }

    /// Registers a device token for the user.
    /// Returns the stored row and whether it was newly created.
    pub async fn register_device(
        &self,
        user_id: Uuid,
        device_token: &str,
        device_type: DeviceType,
    ) -> Result<(UserDevice, bool)> {
        let inserted = sqlx::query_as::<_, UserDevice>(
            r#"
            INSERT INTO user_devices (id, user_id, device_token, device_type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (device_token, user_id) DO NOTHING
            RETURNING id, user_id, device_token, device_type, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(device_token)
        .bind(device_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to register device: {:?}", e);
            AppError::Database(e)
        })?;

        if let Some(device) = inserted {
            tracing::info!("Registered device {} for user {}", device.id, user_id);
            return Ok((device, true));
        }

        let existing = sqlx::query_as::<_, UserDevice>(
            r#"
            SELECT id, user_id, device_token, device_type, created_at, updated_at
            FROM user_devices
            WHERE device_token = $1 AND user_id = $2
            "#,
        )
        .bind(device_token)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get existing device: {:?}", e);
            AppError::Database(e)
        })?;

        Ok((existing, false))
    }
}
