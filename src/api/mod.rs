pub mod auth;
pub mod health;
pub mod swagger;
pub mod users;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::{middleware::AuthMiddleware, utils::error::AppError};

/// Registers every route of the service. Callers provide the
/// `web::Data<dyn UserService>` and `web::Data<AuthConfig>` app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/v1/auth")
                .route("/signup", web::post().to(auth::sign_up))
                .route("/login", web::post().to(auth::login))
                .route("/verify", web::get().to(auth::verify_token))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(auth::get_me)),
                ),
        )
        .service(
            web::scope("/api/v1/users")
                .wrap(AuthMiddleware)
                .route("", web::get().to(users::list_users)),
        );
}

fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("⚠️  {} {} - invalid JSON body: {}", req.method(), req.path(), err);
    AppError::InvalidBody(err.to_string()).into()
}
