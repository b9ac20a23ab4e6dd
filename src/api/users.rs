use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    middleware::auth::Claims,
    models::UserSummary,
    services::user_service::UserService,
    utils::error::{AppError, ErrorResponse},
};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListUsersResponse {
    pub users: Vec<UserSummary>,
    pub count: usize,
}

/// GET /api/v1/users - Lista todos os usuários (sem senha)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    responses(
        (status = 200, description = "All registered users", body = ListUsersResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    users: web::Data<dyn UserService>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /users - requested by {}", claims.sub);

    let users: Vec<UserSummary> = users
        .find_all_users()
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    log::info!("✅ Listed {} users", users.len());

    Ok(HttpResponse::Ok().json(ListUsersResponse {
        count: users.len(),
        users,
    }))
}
