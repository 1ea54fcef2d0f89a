use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{parse_object_id, product::ProductResponse},
    store::UpdateSummary,
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistChange {
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub product_id: String,
}

impl WishlistChange {
    fn parse(&self) -> Result<(&str, ObjectId), AppError> {
        let email = self.user_email.trim();
        if email.is_empty() {
            return Err(AppError::Validation("userEmail is required".to_string()));
        }
        let product = parse_object_id("productId", &self.product_id)?;
        Ok((email, product))
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub acknowledged: bool,
    #[serde(flatten)]
    pub summary: UpdateSummary,
}

impl From<UpdateSummary> for UpdateResponse {
    fn from(summary: UpdateSummary) -> Self {
        Self {
            acknowledged: true,
            summary,
        }
    }
}

pub async fn get_wishlist(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let id = parse_object_id("userId", &user_id)?;
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    tracing::debug!(requested_by = %claims.email, owner = %user.email, "wishlist lookup");

    if user.wishlist.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let products = state.products.find_by_ids(&user.wishlist).await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

pub async fn add(
    State(state): State<AppState>,
    payload: Result<Json<WishlistChange>, JsonRejection>,
) -> Result<Json<UpdateResponse>, AppError> {
    let Json(change) = payload?;
    let (email, product) = change.parse()?;

    let summary = state.users.add_to_wishlist(email, product).await?;
    if summary.matched_count == 0 {
        tracing::debug!(%email, "wishlist add matched no user");
    }

    Ok(Json(summary.into()))
}

pub async fn remove(
    State(state): State<AppState>,
    payload: Result<Json<WishlistChange>, JsonRejection>,
) -> Result<Json<UpdateResponse>, AppError> {
    let Json(change) = payload?;
    let (email, product) = change.parse()?;

    let summary = state.users.remove_from_wishlist(email, product).await?;
    if summary.matched_count == 0 {
        tracing::debug!(%email, "wishlist remove matched no user");
    }

    Ok(Json(summary.into()))
}
