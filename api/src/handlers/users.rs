use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::user::{CreateUser, UserResponse},
    store::Registration,
    AppState,
};

pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(user.into()))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let user = payload.into_user()?;
    let email = user.email.clone();

    let response = match state.users.register(user).await? {
        Registration::Created(id) => {
            tracing::info!(%email, "user account created");
            (
                StatusCode::CREATED,
                Json(json!({
                    "acknowledged": true,
                    "insertedId": id.to_hex(),
                    "message": "user account created",
                })),
            )
        }
        Registration::AlreadyExists => (
            StatusCode::CONFLICT,
            Json(json!({
                "acknowledged": false,
                "message": "user already exists",
            })),
        ),
    };

    Ok(response.into_response())
}
