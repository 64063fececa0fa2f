use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    CreateMealPlanRequest, CreateRecipeRequest, MealEntry, MealEntryWithRecipe, MealPlan, Recipe,
    RecipeQuery, UpdateMealPlanRequest, UpdateRecipeRequest, UpsertMealEntryRequest,
};

pub mod meal_plans;
pub mod memory;
pub mod postgres;
pub mod recipes;

pub use meal_plans::PgMealPlanStore;
pub use memory::{MemoryMealPlanStore, MemoryRecipeStore};
pub use postgres::create_pool;
pub use recipes::PgRecipeStore;

/// Read/write access to the recipe catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// One page of recipes matching the query plus the unpaged total
    async fn list(&self, query: &RecipeQuery) -> AppResult<(Vec<Recipe>, i64)>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Recipe>>;

    async fn create(&self, request: &CreateRecipeRequest) -> AppResult<Recipe>;

    /// Applies the present fields; `None` when the recipe does not exist
    async fn update(&self, id: Uuid, request: &UpdateRecipeRequest) -> AppResult<Option<Recipe>>;

    /// `false` when the recipe does not exist
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// The full catalog, used as the generator's candidate set
    async fn all(&self) -> AppResult<Vec<Recipe>>;

    /// Sorted distinct tags across the catalog
    async fn tags(&self) -> AppResult<Vec<String>>;

    /// Sorted distinct categories across the catalog
    async fn categories(&self) -> AppResult<Vec<String>>;
}

/// Read/write access to meal plans and their entries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MealPlanStore: Send + Sync {
    /// All plans, newest week first
    async fn list(&self) -> AppResult<Vec<MealPlan>>;

    async fn get(&self, id: Uuid) -> AppResult<Option<MealPlan>>;

    async fn create(&self, request: &CreateMealPlanRequest) -> AppResult<MealPlan>;

    async fn update(
        &self,
        id: Uuid,
        request: &UpdateMealPlanRequest,
    ) -> AppResult<Option<MealPlan>>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// A plan's entries, ordered by date then slot
    async fn entries(&self, plan_id: Uuid) -> AppResult<Vec<MealEntry>>;

    /// A plan's entries with recipes joined, ordered by date then slot
    async fn entries_with_recipes(&self, plan_id: Uuid) -> AppResult<Vec<MealEntryWithRecipe>>;

    /// Creates one generated entry; the caller guarantees the slot is free
    async fn insert_entry(
        &self,
        plan_id: Uuid,
        entry: &UpsertMealEntryRequest,
    ) -> AppResult<MealEntryWithRecipe>;

    /// Creates or replaces the manual entry for the entry's (date, slot)
    async fn upsert_entry(
        &self,
        plan_id: Uuid,
        entry: &UpsertMealEntryRequest,
    ) -> AppResult<MealEntryWithRecipe>;

    /// `false` when the entry does not exist or belongs to another plan
    async fn delete_entry(&self, plan_id: Uuid, entry_id: Uuid) -> AppResult<bool>;
}
