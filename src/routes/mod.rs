use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::{MealPlanStore, RecipeStore};
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

pub mod meal_plans;
pub mod recipes;
pub mod taxonomy;

/// Shared application state: the two store collaborators
#[derive(Clone)]
pub struct AppState {
    pub recipes: Arc<dyn RecipeStore>,
    pub meal_plans: Arc<dyn MealPlanStore>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recipe catalog
        .route("/recipes", get(recipes::list).post(recipes::create))
        .route(
            "/recipes/:id",
            get(recipes::get_by_id)
                .put(recipes::update)
                .delete(recipes::remove),
        )
        // Taxonomy
        .route("/tags", get(taxonomy::tags))
        .route("/categories", get(taxonomy::categories))
        // Meal plans
        .route(
            "/meal-plans",
            get(meal_plans::list).post(meal_plans::create),
        )
        .route(
            "/meal-plans/:id",
            get(meal_plans::get_by_id)
                .put(meal_plans::update)
                .delete(meal_plans::remove),
        )
        .route("/meal-plans/:id/generate", post(meal_plans::generate))
        .route("/meal-plans/:id/entries", post(meal_plans::upsert_entry))
        .route(
            "/meal-plans/:id/entries/:entry_id",
            delete(meal_plans::remove_entry),
        )
        .route(
            "/meal-plans/:id/shopping-list",
            get(meal_plans::shopping_list),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
