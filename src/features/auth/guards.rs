//! Extractor guards layered on top of the auth middleware.
//!
//! - `VerifiedUser`: any signed-in user whose account has been verified
//! - `RequireStaff`: verified admin or official

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

fn authenticated(parts: &Parts) -> Result<&AuthenticatedUser, AppError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
}

fn verified(parts: &Parts) -> Result<&AuthenticatedUser, AppError> {
    let user = authenticated(parts)?;
    if !user.is_verified {
        return Err(AppError::Forbidden(
            "Please verify your account first.".to_string(),
        ));
    }
    Ok(user)
}

/// Guard for routes that need a verified account.
///
/// # Example
/// ```ignore
/// pub async fn handler(VerifiedUser(user): VerifiedUser) { ... }
/// ```
pub struct VerifiedUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for VerifiedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        verified(parts).map(|user| VerifiedUser(user.clone()))
    }
}

/// Guard for staff-only routes. Allows "admin" and "official".
pub struct RequireStaff(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = verified(parts)?;

        if !user.is_staff() {
            return Err(AppError::Forbidden(
                "Access denied. Officials and admins only.".to_string(),
            ));
        }

        Ok(RequireStaff(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{admin_user, citizen_user, official_user};
    use axum::http::Request;

    fn parts_with(user: Option<AuthenticatedUser>) -> Parts {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        if let Some(user) = user {
            parts.extensions.insert(user);
        }
        parts
    }

    #[tokio::test]
    async fn test_require_staff() {
        for user in [admin_user(), official_user()] {
            let mut parts = parts_with(Some(user));
            assert!(RequireStaff::from_request_parts(&mut parts, &()).await.is_ok());
        }

        let mut parts = parts_with(Some(citizen_user()));
        assert!(matches!(
            RequireStaff::from_request_parts(&mut parts, &()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_verified_user_rejects_unverified() {
        let mut unverified = citizen_user();
        unverified.is_verified = false;
        let mut parts = parts_with(Some(unverified));
        assert!(matches!(
            VerifiedUser::from_request_parts(&mut parts, &()).await,
            Err(AppError::Forbidden(_))
        ));

        let mut parts = parts_with(None);
        assert!(matches!(
            VerifiedUser::from_request_parts(&mut parts, &()).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
