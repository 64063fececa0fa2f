use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CreateRecipeRequest, Recipe, RecipeQuery, UpdateRecipeRequest};
use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct RecipeListResponse {
    pub recipes: Vec<Recipe>,
    pub pagination: Pagination,
}

/// Handler for the filtered, paginated catalog listing
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> AppResult<Json<RecipeListResponse>> {
    let limit = query.limit();
    let (recipes, total) = state.recipes.list(&query).await?;

    Ok(Json(RecipeListResponse {
        recipes,
        pagination: Pagination {
            page: query.page.max(1),
            limit,
            total,
            pages: (total + i64::from(limit) - 1) / i64::from(limit),
        },
    }))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Recipe>> {
    state
        .recipes
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateRecipeRequest>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    request.validate()?;
    let recipe = state.recipes.create(&request).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecipeRequest>,
) -> AppResult<Json<Recipe>> {
    request.validate()?;
    state
        .recipes
        .update(id, &request)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    if state.recipes.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Recipe not found".to_string()))
    }
}
