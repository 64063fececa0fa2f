use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::routes::AppState;

/// Sorted distinct tags across the catalog
pub async fn tags(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let tags = state.recipes.tags().await?;
    Ok(Json(json!({ "tags": tags })))
}

/// Sorted distinct categories across the catalog
pub async fn categories(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let categories = state.recipes.categories().await?;
    Ok(Json(json!({ "categories": categories })))
}
