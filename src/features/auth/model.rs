use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::users::models::{User, UserRole};

/// Caller identity attached to the request by the auth middleware
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub barangay: String,
    pub is_verified: bool,
}

impl AuthenticatedUser {
    pub fn is_citizen(&self) -> bool {
        self.role == UserRole::Citizen
    }

    /// Admin or official
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            barangay: user.barangay.clone(),
            is_verified: user.verification_status,
        }
    }
}

/// JWT payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}
