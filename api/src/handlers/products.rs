use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::RequireSeller,
    catalog::{self, ListingParams, ProductListing, ProductQuery},
    error::AppError,
    models::{product::CreateProduct, InsertResponse},
    AppState,
};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ProductListing>, AppError> {
    let query = ProductQuery::from_params(params, state.page_size)?;
    let listing = catalog::list_products(state.products.as_ref(), &query).await?;

    Ok(Json(listing))
}

pub async fn create(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    payload: Result<Json<CreateProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<InsertResponse>), AppError> {
    let Json(payload) = payload?;
    let product = payload.into_product()?;

    let id = state.products.insert(product).await?;
    tracing::info!(seller = %seller.email, product = %id, "product created");

    Ok((StatusCode::CREATED, Json(id.into())))
}
