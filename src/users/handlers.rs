use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{CreateUserRequest, ListParams, MessageResponse, UpdateUserRequest, UserListing};
use super::repo;
use super::repo_types::User;
use super::services::{list_users as list_users_service, parse_id};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).post(update_user).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<UserListing>> {
    let Query(pairs) = query?;
    let params = ListParams::from_pairs(pairs);
    let listing = list_users_service(&state, &params).await?;
    Ok(Json(listing))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id)?;
    match repo::find_by_id(&state.db, id).await? {
        Some(user) => Ok(Json(user)),
        None => {
            warn!(user_id = id, "user not found");
            Err(ApiError::NotFound("user not found".into()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(body) = payload?;
    let user = repo::insert(
        &state.db,
        body.id,
        body.email.as_deref(),
        body.first_name.as_deref(),
        body.last_name.as_deref(),
    )
    .await
    .map_err(ApiError::from_insert)?;

    info!(user_id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    let user = repo::update(
        &state.db,
        id,
        body.email.as_deref(),
        body.first_name.as_deref(),
        body.last_name.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    info!(user_id = id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    let removed = repo::delete(&state.db, id).await?;
    info!(user_id = id, removed, "user delete");
    Ok(Json(MessageResponse { message: "OK" }))
}
