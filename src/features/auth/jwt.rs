use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::model::Claims;
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use crate::features::users::models::User;

/// Issues and verifies HS256 access tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in_secs: i64,
    leeway: u64,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        Self::from_secret(
            config.jwt_secret.as_bytes(),
            config.jwt_expires_in.as_secs() as i64,
            config.jwt_leeway.as_secs(),
        )
    }

    pub fn from_secret(secret: &[u8], expires_in_secs: i64, leeway: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expires_in_secs,
            leeway,
        }
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in_secs
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.expires_in_secs,
        };
        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired.".to_string()),
                _ => {
                    tracing::debug!("Rejected token: {}", e);
                    AppError::Unauthorized("Invalid token.".to_string())
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::users::models::UserRole;
    use uuid::Uuid;

    fn service() -> JwtService {
        JwtService::from_secret(b"test-secret-with-enough-length-0123456789", 3600, 0)
    }

    fn claims(exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::now_v7(),
            email: "juan@example.com".to_string(),
            role: UserRole::Official,
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn test_verify_accepts_fresh_token() {
        let jwt = service();
        let original = claims(600);
        let token = jwt.encode_claims(&original).unwrap();

        let decoded = jwt.verify(&token).unwrap();
        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.role, UserRole::Official);
        assert_eq!(decoded.email, "juan@example.com");
    }

    #[test]
    fn test_verify_reports_expired_token() {
        let jwt = service();
        let token = jwt.encode_claims(&claims(-600)).unwrap();

        match jwt.verify(&token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token expired."),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_verify_rejects_foreign_signature() {
        let other = JwtService::from_secret(b"another-secret-with-enough-length-xyz", 3600, 0);
        let token = other.encode_claims(&claims(600)).unwrap();

        match service().verify(&token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Invalid token."),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(matches!(
            service().verify("not-a-jwt"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
