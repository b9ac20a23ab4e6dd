use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Auth Service API",
        version = "1.0.0",
        description = "User sign-up and login.\n\n**Authentication:** `/api/v1/auth/me` and `/api/v1/users` require a JWT Bearer token issued by sign-up or login.",
    ),
    paths(
        // Auth endpoints
        crate::api::auth::sign_up,
        crate::api::auth::login,
        crate::api::auth::verify_token,
        crate::api::auth::get_me,

        // Users
        crate::api::users::list_users,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::models::UserInput,
            crate::models::UserSummary,
            crate::services::auth_service::AuthResponse,
            crate::api::auth::VerifyTokenResponse,
            crate::api::users::ListUsersResponse,
            crate::utils::error::ErrorResponse,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Sign-up, login and token verification."),
        (name = "Users", description = "Registered users."),
        (name = "Health", description = "Health check."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by sign-up or login"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_auth_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/auth/signup"));
        assert!(doc.paths.paths.contains_key("/api/v1/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/v1/users"));
    }
}
