use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::extractors::{AuthUser, TokenClaims},
    error::{AppError, AppResult},
    response::JsonResponse,
    state::AppState,
    users::{
        dto::{CreateUsersReq, GetUsersQuery, GetUsersWithPaginationReq, GetUsersWithPaginationResp, LoginReq, LoginResp},
        services,
    },
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users", post(create_users).get(get_users_with_pagination))
        .route("/v1/login", post(login))
        .route("/v1/logout", delete(logout))
}

fn decoded<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| AppError::Validation(e.body_text()))
}

#[instrument(skip(state, payload))]
pub async fn create_users(
    State(state): State<AppState>,
    payload: Result<Json<CreateUsersReq>, JsonRejection>,
) -> AppResult<JsonResponse<()>> {
    let req = decoded(payload)?;
    services::create_users(&state, req).await?;
    Ok(JsonResponse::created("user created"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginReq>, JsonRejection>,
) -> AppResult<JsonResponse<LoginResp>> {
    let req = decoded(payload)?;
    let resp = services::login(&state, req).await?;
    Ok(JsonResponse::ok(resp))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    TokenClaims(claims): TokenClaims,
) -> AppResult<StatusCode> {
    services::logout(&state, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn get_users_with_pagination(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<GetUsersQuery>,
) -> AppResult<JsonResponse<GetUsersWithPaginationResp>> {
    debug!(user_uid = %user.user_uid, role_uid = %user.role_uid, "listing users");
    let req = GetUsersWithPaginationReq::from(query);
    let resp = services::get_users_with_pagination(&state, req).await?;
    Ok(JsonResponse::ok(resp))
}
