use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{
    CreateMealPlanRequest, MealEntryWithRecipe, MealPlan, UpdateMealPlanRequest,
    UpsertMealEntryRequest,
};
use crate::routes::AppState;
use crate::services::{planner, shopping_list::build_shopping_list};

#[derive(Debug, Serialize)]
pub struct MealPlanListResponse {
    pub meal_plans: Vec<MealPlan>,
}

#[derive(Debug, Serialize)]
pub struct MealPlanDetailResponse {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub entries: Vec<MealEntryWithRecipe>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub entries: Vec<MealEntryWithRecipe>,
}

/// All plans, newest week first
pub async fn list(State(state): State<AppState>) -> AppResult<Json<MealPlanListResponse>> {
    let meal_plans = state.meal_plans.list().await?;
    Ok(Json(MealPlanListResponse { meal_plans }))
}

/// A plan with its entries and joined recipes
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MealPlanDetailResponse>> {
    let plan = state
        .meal_plans
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal plan not found".to_string()))?;
    let entries = state.meal_plans.entries_with_recipes(id).await?;

    Ok(Json(MealPlanDetailResponse { plan, entries }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateMealPlanRequest>,
) -> AppResult<(StatusCode, Json<MealPlan>)> {
    request.validate()?;
    let plan = state.meal_plans.create(&request).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMealPlanRequest>,
) -> AppResult<Json<MealPlan>> {
    request.validate()?;
    state
        .meal_plans
        .update(id, &request)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Meal plan not found".to_string()))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    if state.meal_plans.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Meal plan not found".to_string()))
    }
}

/// Handler for the plan generation endpoint
pub async fn generate(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GenerateResponse>> {
    tracing::info!(
        request_id = %request_id,
        plan_id = %id,
        "Processing generation request"
    );

    let entries =
        planner::generate_plan(state.meal_plans.clone(), state.recipes.clone(), id).await?;

    tracing::info!(
        request_id = %request_id,
        created = entries.len(),
        "Generation completed"
    );

    Ok(Json(GenerateResponse { entries }))
}

/// Creates or replaces the manual entry at the request's (date, slot)
pub async fn upsert_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpsertMealEntryRequest>,
) -> AppResult<Json<MealEntryWithRecipe>> {
    request.validate()?;

    // Surface a 404 rather than attaching entries to a missing plan
    state
        .meal_plans
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal plan not found".to_string()))?;

    let entry = state.meal_plans.upsert_entry(id, &request).await?;
    Ok(Json(entry))
}

pub async fn remove_entry(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    if state.meal_plans.delete_entry(id, entry_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Meal entry not found".to_string()))
    }
}

/// Aggregated shopping list over all entries of a plan
pub async fn shopping_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state
        .meal_plans
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal plan not found".to_string()))?;

    let entries = state.meal_plans.entries_with_recipes(id).await?;
    let shopping_list = build_shopping_list(&entries);

    Ok(Json(json!({ "shopping_list": shopping_list })))
}
