use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    middleware::auth::{bearer_token, Claims},
    models::{UserInput, UserSummary},
    services::{
        auth_service::{self, AuthResponse},
        user_service::UserService,
    },
    utils::error::{AppError, ErrorResponse},
};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    pub email: String,
    pub exp: usize,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "Auth",
    request_body = UserInput,
    responses(
        (status = 200, description = "User created", body = AuthResponse),
        (status = 400, description = "EMPTY_FORM, INVALID_EMAIL or INVALID_PASSWORD", body = ErrorResponse),
        (status = 409, description = "EXIST_USER", body = ErrorResponse),
        (status = 500, description = "Database failure", body = ErrorResponse)
    )
)]
pub async fn sign_up(
    users: web::Data<dyn UserService>,
    config: web::Data<AuthConfig>,
    request: web::Json<UserInput>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /auth/signup - email: {}", request.email);

    match auth_service::sign_up(users.get_ref(), &config, &request).await {
        Ok(response) => {
            log::info!("✅ Sign up successful: {}", request.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Sign up failed: {} - {}", request.email, e.code());
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = UserInput,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "EMPTY_FORM, INVALID_EMAIL or INVALID_PASSWORD", body = ErrorResponse),
        (status = 401, description = "INVALID_CREDENTIALS", body = ErrorResponse),
        (status = 500, description = "Database failure", body = ErrorResponse)
    )
)]
pub async fn login(
    users: web::Data<dyn UserService>,
    config: web::Data<AuthConfig>,
    request: web::Json<UserInput>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(users.get_ref(), &config, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e.code());
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 400, description = "No valid Authorization header", body = ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(
    config: web::Data<AuthConfig>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    log::info!("✓ GET /auth/verify");

    let token = bearer_token(&req).ok_or(AppError::MissingAuthorization)?;

    let claims = auth_service::verify_token(&config, token)?;

    Ok(HttpResponse::Ok().json(VerifyTokenResponse {
        valid: true,
        email: claims.sub,
        exp: claims.exp,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserSummary),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(
    users: web::Data<dyn UserService>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("👤 GET /auth/me - {}", claims.sub);

    let user = users
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", claims.sub)))?;

    Ok(HttpResponse::Ok().json(UserSummary::from(user)))
}
