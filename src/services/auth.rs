use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

use crate::{
    error::PaystrataError,
    models::{AdminClaims, AdminProfile, LoginResponse},
    services::store::Store,
};

pub const DEFAULT_ADMIN_ROLE: &str = "admin";

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Argon2::default().verify_password(password.as_bytes(), &parsed_hash)
}

/// Admin login and HS256 token handling.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, secret: &str, token_expiry_hours: i64) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_hours,
        }
    }

    /// Creates or resets the bootstrap admin account.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<AdminProfile, PaystrataError> {
        let password_hash = hash_password(password)
            .map_err(|e| PaystrataError::InternalError(format!("Failed to hash password: {}", e)))?;
        let admin = self
            .store
            .upsert_admin(email, &password_hash, DEFAULT_ADMIN_ROLE)
            .await?;

        tracing::info!(email = %admin.email, "Admin account ready");
        Ok(AdminProfile::from(&admin))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, PaystrataError> {
        let invalid = || PaystrataError::Unauthorized("Invalid credentials".to_string());

        let admin = self
            .store
            .find_admin_by_email(email.trim())
            .await?
            .ok_or_else(invalid)?;

        verify_password(password, &admin.password_hash).map_err(|_| invalid())?;

        let user = AdminProfile::from(&admin);
        let token = self.issue_token(&user)?;

        tracing::info!(admin_id = %user.id, "Admin logged in");

        Ok(LoginResponse {
            success: true,
            token,
            user,
        })
    }

    pub fn issue_token(&self, admin: &AdminProfile) -> Result<String, PaystrataError> {
        let now = Utc::now();
        let claims = AdminClaims {
            sub: admin.id.to_string(),
            email: admin.email.clone(),
            role: admin.role.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.token_expiry_hours)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PaystrataError::InternalError(format!("Failed to encode token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<AdminClaims, PaystrataError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        decode::<AdminClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected admin token: {}", e);
                PaystrataError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;
    use uuid::Uuid;

    const SECRET: &str = "a-test-secret-that-is-long-enough!!";

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()), SECRET, 24)
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(verify_password("hunter23", &hash).is_err());
    }

    #[tokio::test]
    async fn login_issues_a_token_for_valid_credentials() {
        let auth = service();
        auth.ensure_admin("Ops@Paystrata.com", "correct horse").await.unwrap();

        let response = auth.login("ops@paystrata.com", "correct horse").await.unwrap();
        assert!(response.success);

        let claims = auth.validate_token(&response.token).unwrap();
        assert_eq!(claims.sub, response.user.id.to_string());
        assert_eq!(claims.role, DEFAULT_ADMIN_ROLE);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email() {
        let auth = service();
        auth.ensure_admin("ops@paystrata.com", "correct horse").await.unwrap();

        assert!(matches!(
            auth.login("ops@paystrata.com", "wrong").await,
            Err(PaystrataError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login("nobody@paystrata.com", "correct horse").await,
            Err(PaystrataError::Unauthorized(_))
        ));
    }

    #[test]
    fn tokens_from_another_secret_or_expired_are_rejected() {
        let profile = AdminProfile {
            id: Uuid::new_v4(),
            email: "ops@paystrata.com".to_string(),
            role: DEFAULT_ADMIN_ROLE.to_string(),
        };

        let other = AuthService::new(Arc::new(MemoryStore::new()), "another-secret-entirely-32-chars", 24);
        let foreign = other.issue_token(&profile).unwrap();
        assert!(service().validate_token(&foreign).is_err());

        let expired = AuthService::new(Arc::new(MemoryStore::new()), SECRET, -2);
        let token = expired.issue_token(&profile).unwrap();
        assert!(service().validate_token(&token).is_err());
    }
}
