//! Authentication service.
//!
//! Handles registration, login, profile management, JWT minting and
//! password hashing.

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::user::User;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Username
    pub username: String,
    /// Email
    pub email: String,
    /// Is admin
    pub is_admin: bool,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Presence-aware profile update. Absent fields leave the column
/// untouched; a password change requires the current password.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, created_at, updated_at";

/// Authentication service
pub struct AuthService {
    db: PgPool,
    config: Arc<Config>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let secret = config.jwt_secret.clone();
        Self {
            db,
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Register a new user and return it with a signed token
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String)> {
        let password_hash = Self::hash_password(password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash) \
             VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if e.to_string().contains("duplicate key") {
                AppError::Conflict("Email is already registered".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Authenticate by email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Fetch the caller's user row
    pub async fn profile(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Update the caller's profile
    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<User> {
        let user = self.profile(user_id).await?;

        let new_hash = match &update.new_password {
            Some(new_password) => {
                let current = update.current_password.as_deref().ok_or_else(|| {
                    AppError::Validation("Current password is required".to_string())
                })?;
                if !Self::verify_password(current, &user.password_hash)? {
                    return Err(AppError::Authentication(
                        "Current password is incorrect".to_string(),
                    ));
                }
                Some(Self::hash_password(new_password)?)
            }
            None => None,
        };

        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                 username = COALESCE($2, username), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.username)
        .bind(update.email)
        .bind(new_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if e.to_string().contains("duplicate key") {
                AppError::Conflict("Email is already registered".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete the caller's account; owned rows cascade
    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    /// Sign a token for a user
    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.jwt_expiration_secs);

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }

    /// Hash a password
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        let config = Config {
            database_url: "postgres://localhost/unused".into(),
            bind_address: "127.0.0.1:0".into(),
            public_base_url: "http://localhost:8080".into(),
            storage_path: "/tmp".into(),
            placeholder_image_url: "http://localhost:8080/uploads/assets/placeholder.jpg".into(),
            jwt_secret: "unit-test-secret".into(),
            jwt_expiration_secs: 3600,
            ml_predict_url: None,
            environment: "development".into(),
            cors_origins: vec!["http://localhost:3000".into()],
            admin_email: "admin@artefacto.local".into(),
            admin_password: None,
        };
        let db = PgPool::connect_lazy(&config.database_url).unwrap();
        AuthService::new(db, Arc::new(config))
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "wayan".into(),
            email: "wayan@example.com".into(),
            password_hash: "x".into(),
            is_admin: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = AuthService::hash_password(password).unwrap();
        assert!(AuthService::verify_password(password, &hash).unwrap());
        assert!(!AuthService::verify_password("wrong_password", &hash).unwrap());
    }

    #[tokio::test]
    async fn issued_tokens_validate_and_carry_identity() {
        let service = test_service();
        let user = test_user();

        let token = service.issue_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "wayan");
        assert_eq!(claims.email, "wayan@example.com");
        assert!(claims.is_admin);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn tampered_tokens_are_rejected() {
        let service = test_service();
        let token = service.issue_token(&test_user()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');

        assert!(matches!(
            service.validate_token(&tampered),
            Err(AppError::Authentication(_))
        ));
    }
}
