use bcrypt::BcryptError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    models::{User, UserInput},
    services::user_service::UserService,
    utils::error::AppError,
};

pub const PASSWORD_MIN_LENGTH: usize = 8;
/// bcrypt ignores everything past 72 bytes.
pub const PASSWORD_MAX_BYTES: usize = 72;

// ==================== VALIDATION ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationError {
    EmptyForm,
    InvalidEmail,
    InvalidPassword,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyForm => "EMPTY_FORM",
            ValidationError::InvalidEmail => "INVALID_EMAIL",
            ValidationError::InvalidPassword => "INVALID_PASSWORD",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyForm => write!(f, "Email and password are required"),
            ValidationError::InvalidEmail => write!(f, "Email must contain '@'"),
            ValidationError::InvalidPassword => write!(
                f,
                "Password must be at least {} characters and at most {} bytes long",
                PASSWORD_MIN_LENGTH, PASSWORD_MAX_BYTES
            ),
        }
    }
}

/// Per-field result of the form validation, as shown next to each input.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FieldErrors {
    pub email: Option<ValidationError>,
    pub password: Option<ValidationError>,
}

impl FieldErrors {
    /// True when every field satisfies its rule.
    pub fn is_valid(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

pub fn validate_email(email: &str) -> Option<ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        Some(ValidationError::EmptyForm)
    } else if !email.contains('@') {
        Some(ValidationError::InvalidEmail)
    } else {
        None
    }
}

pub fn validate_password(password: &str) -> Option<ValidationError> {
    if password.is_empty() {
        Some(ValidationError::EmptyForm)
    } else if password.chars().count() < PASSWORD_MIN_LENGTH
        || password.len() > PASSWORD_MAX_BYTES
    {
        Some(ValidationError::InvalidPassword)
    } else {
        None
    }
}

pub fn validate_fields(input: &UserInput) -> FieldErrors {
    FieldErrors {
        email: validate_email(&input.email),
        password: validate_password(&input.password),
    }
}

/// Whole-request verdict: an empty field wins over format errors,
/// then email is checked before password.
pub fn login_validator(input: &UserInput) -> Result<(), ValidationError> {
    let errors = validate_fields(input);

    if errors.email == Some(ValidationError::EmptyForm)
        || errors.password == Some(ValidationError::EmptyForm)
    {
        return Err(ValidationError::EmptyForm);
    }

    match errors.email.or(errors.password) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ==================== TOKENS ====================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,  // email
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

pub fn create_token(config: &AuthConfig, email: &str) -> Result<String, AppError> {
    let now = Utc::now();

    let claims = Claims {
        sub: email.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.jwt_expiration_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: config.jwt_audience.clone(),
        iss: config.jwt_issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.jwt_audience.as_str()]);
    validation.set_issuer(&[config.jwt_issuer.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

// ==================== PASSWORDS ====================

// bcrypt is CPU bound, keep it off the async workers
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// A stored value that is not a bcrypt hash never matches.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?;

    match result {
        Ok(valid) => Ok(valid),
        Err(
            e @ (BcryptError::InvalidHash(_)
            | BcryptError::InvalidPrefix(_)
            | BcryptError::InvalidCost(_)
            | BcryptError::InvalidBase64(_)),
        ) => {
            log::warn!("⚠️ Stored password is not a valid bcrypt hash: {}", e);
            Ok(false)
        }
        Err(e) => Err(AppError::Internal(format!("Password verification error: {}", e))),
    }
}

// ==================== FLOWS ====================

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
}

pub const SIGN_UP_SUCCESS: &str = "Sign up completed successfully";
pub const LOGIN_SUCCESS: &str = "Login completed successfully";

/// validate -> check existing email -> create document -> issue token
pub async fn sign_up(
    users: &dyn UserService,
    config: &AuthConfig,
    input: &UserInput,
) -> Result<AuthResponse, AppError> {
    login_validator(input)?;

    let email = normalize_email(&input.email);

    if users.find_user(&email).await?.is_some() {
        return Err(AppError::UserExists);
    }

    let password_hash = hash_password(&input.password, config.bcrypt_cost).await?;
    let user = users.create_user(&email, &password_hash).await?;

    log::info!("✅ User registered: {}", user.email);

    Ok(AuthResponse {
        message: SIGN_UP_SUCCESS.to_string(),
        token: create_token(config, &user.email)?,
    })
}

/// validate -> find user -> verify password -> issue token
pub async fn login(
    users: &dyn UserService,
    config: &AuthConfig,
    input: &UserInput,
) -> Result<AuthResponse, AppError> {
    login_validator(input)?;

    let email = normalize_email(&input.email);

    let user: User = users
        .find_user(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&input.password, &user.password).await? {
        return Err(AppError::InvalidCredentials);
    }

    Ok(AuthResponse {
        message: LOGIN_SUCCESS.to_string(),
        token: create_token(config, &user.email)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user_service::testing::{Failure, InMemoryUserService};

    fn test_config() -> AuthConfig {
        AuthConfig::for_tests()
    }

    fn input(email: &str, password: &str) -> UserInput {
        UserInput {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_login_validator_empty_form() {
        assert_eq!(login_validator(&input("", "")), Err(ValidationError::EmptyForm));
        assert_eq!(login_validator(&input("a@b.com", "")), Err(ValidationError::EmptyForm));
        assert_eq!(login_validator(&input("   ", "password1")), Err(ValidationError::EmptyForm));
        // empty wins even when the other field is malformed
        assert_eq!(login_validator(&input("asdf", "")), Err(ValidationError::EmptyForm));
    }

    #[test]
    fn test_login_validator_formats() {
        assert_eq!(
            login_validator(&input("asdf", "password1")),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            login_validator(&input("a@b.com", "short")),
            Err(ValidationError::InvalidPassword)
        );
        assert_eq!(login_validator(&input("asdf", "short")), Err(ValidationError::InvalidEmail));
        assert_eq!(login_validator(&input("a@b.com", "12345678")), Ok(()));
    }

    #[test]
    fn test_password_length_counts_characters() {
        // 8 multi-byte characters
        assert_eq!(validate_password("비밀번호비밀번호"), None);
        assert_eq!(validate_password("비밀번호"), Some(ValidationError::InvalidPassword));
    }

    #[test]
    fn test_password_longer_than_bcrypt_limit() {
        assert_eq!(validate_password(&"a".repeat(PASSWORD_MAX_BYTES)), None);
        assert_eq!(
            validate_password(&"a".repeat(PASSWORD_MAX_BYTES + 1)),
            Some(ValidationError::InvalidPassword)
        );
        // 25 three-byte characters = 75 bytes
        assert_eq!(validate_password(&"비".repeat(25)), Some(ValidationError::InvalidPassword));
    }

    #[test]
    fn test_validate_fields() {
        let errors = validate_fields(&input("asdf", ""));
        assert_eq!(errors.email, Some(ValidationError::InvalidEmail));
        assert_eq!(errors.password, Some(ValidationError::EmptyForm));
        assert!(!errors.is_valid());

        assert!(validate_fields(&input("a@b.com", "password1")).is_valid());
    }

    #[test]
    fn test_token_roundtrip() {
        let config = test_config();
        let token = create_token(&config, "user@example.com").unwrap();
        let claims = verify_token(&config, &token).unwrap();

        assert_eq!(claims.sub, "user@example.com");
        assert_eq!(claims.iss, "auth-service");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_with_other_secret_or_audience() {
        let config = test_config();
        let token = create_token(&config, "user@example.com").unwrap();

        let other_secret = AuthConfig {
            jwt_secret: "other".to_string(),
            ..test_config()
        };
        assert!(matches!(
            verify_token(&other_secret, &token),
            Err(AppError::Unauthorized(_))
        ));

        let other_audience = AuthConfig {
            jwt_audience: "other-api".to_string(),
            ..test_config()
        };
        assert!(verify_token(&other_audience, &token).is_err());
        assert!(verify_token(&config, "not.a.token").is_err());
    }

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let hash = hash_password("password1", 4).await.unwrap();
        assert_ne!(hash, "password1");
        assert!(verify_password("password1", &hash).await.unwrap());
        assert!(!verify_password("password2", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_password_against_non_bcrypt_value() {
        assert!(!verify_password("password1", "password1").await.unwrap());
        assert!(!verify_password("password1", "").await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_up_creates_user_and_token() {
        let users = InMemoryUserService::new();
        let config = test_config();

        let response = sign_up(&users, &config, &input(" New@Example.com ", "password1"))
            .await
            .unwrap();

        assert_eq!(response.message, SIGN_UP_SUCCESS);
        assert_eq!(verify_token(&config, &response.token).unwrap().sub, "new@example.com");

        let stored = users.find_user("new@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password, "password1");
    }

    #[tokio::test]
    async fn test_sign_up_invalid_input_does_not_touch_store() {
        let users = InMemoryUserService::failing(Failure::FindUser);
        let err = sign_up(&users, &test_config(), &input("asdf", "password1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::InvalidEmail)));
        assert_eq!(users.len(), 0);
    }

    #[tokio::test]
    async fn test_sign_up_existing_user() {
        let users = InMemoryUserService::new().with_user(User::new("a@b.com", "hash"));
        let err = sign_up(&users, &test_config(), &input("a@b.com", "password1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UserExists));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_up_propagates_database_error() {
        let users = InMemoryUserService::failing(Failure::CreateUser);
        let err = sign_up(&users, &test_config(), &input("a@b.com", "password1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_login() {
        let users = InMemoryUserService::new();
        let config = test_config();
        sign_up(&users, &config, &input("a@b.com", "password1")).await.unwrap();

        let response = login(&users, &config, &input("A@B.com", "password1")).await.unwrap();
        assert_eq!(response.message, LOGIN_SUCCESS);
        assert_eq!(verify_token(&config, &response.token).unwrap().sub, "a@b.com");

        let wrong = login(&users, &config, &input("a@b.com", "password2")).await.unwrap_err();
        assert!(matches!(wrong, AppError::InvalidCredentials));

        let unknown = login(&users, &config, &input("x@b.com", "password1")).await.unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_up_propagates_lookup_error() {
        let users = InMemoryUserService::failing(Failure::FindUser);
        let err = sign_up(&users, &test_config(), &input("a@b.com", "password1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(users.len(), 0);
    }

    #[tokio::test]
    async fn test_login_propagates_lookup_error() {
        let users = InMemoryUserService::failing(Failure::FindUser);
        let err = login(&users, &test_config(), &input("a@b.com", "password1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_login_with_plaintext_stored_password() {
        // documents written before passwords were hashed
        let users = InMemoryUserService::new().with_user(User::new("a@b.com", "password1"));
        let err = login(&users, &test_config(), &input("a@b.com", "password1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidCredentials));
    }
}
