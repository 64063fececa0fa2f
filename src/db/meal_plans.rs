use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::recipes::{recipe_from_row, RECIPE_COLUMNS};
use crate::db::MealPlanStore;
use crate::error::AppResult;
use crate::models::{
    CreateMealPlanRequest, MealEntry, MealEntryWithRecipe, MealPlan, MealSlot, Recipe,
    UpdateMealPlanRequest, UpsertMealEntryRequest,
};

const PLAN_COLUMNS: &str = "id, week_start, meals_per_day, goals_kcal, goals_protein, \
     goals_fat, goals_carbs, created_at, updated_at";

const ENTRY_COLUMNS: &str =
    "id, meal_plan_id, date, slot, recipe_id, servings_count, created_at";

fn plan_from_row(row: &PgRow) -> Result<MealPlan, sqlx::Error> {
    Ok(MealPlan {
        id: row.try_get("id")?,
        week_start: row.try_get("week_start")?,
        meals_per_day: row.try_get("meals_per_day")?,
        goals_kcal: row.try_get("goals_kcal")?,
        goals_protein: row.try_get("goals_protein")?,
        goals_fat: row.try_get("goals_fat")?,
        goals_carbs: row.try_get("goals_carbs")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<MealEntry, sqlx::Error> {
    let slot: String = row.try_get("slot")?;
    let slot = MealSlot::from_str(&slot)
        .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;

    Ok(MealEntry {
        id: row.try_get("id")?,
        meal_plan_id: row.try_get("meal_plan_id")?,
        date: row.try_get("date")?,
        slot,
        recipe_id: row.try_get("recipe_id")?,
        servings_count: row.try_get("servings_count")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Meal plans and their entries backed by PostgreSQL
pub struct PgMealPlanStore {
    pool: PgPool,
}

impl PgMealPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn recipe_by_id(&self, id: Uuid) -> AppResult<Option<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(recipe_from_row).transpose().map_err(Into::into)
    }
}

#[async_trait]
impl MealPlanStore for PgMealPlanStore {
    async fn list(&self) -> AppResult<Vec<MealPlan>> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM meal_plans ORDER BY week_start DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut plans = Vec::with_capacity(rows.len());
        for row in &rows {
            plans.push(plan_from_row(row)?);
        }
        Ok(plans)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<MealPlan>> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM meal_plans WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(plan_from_row).transpose().map_err(Into::into)
    }

    async fn create(&self, request: &CreateMealPlanRequest) -> AppResult<MealPlan> {
        let sql = format!(
            "INSERT INTO meal_plans (week_start, meals_per_day, goals_kcal, goals_protein, \
             goals_fat, goals_carbs) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PLAN_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(request.week_start)
            .bind(request.meals_per_day)
            .bind(request.goals_kcal)
            .bind(request.goals_protein)
            .bind(request.goals_fat)
            .bind(request.goals_carbs)
            .fetch_one(&self.pool)
            .await?;

        Ok(plan_from_row(&row)?)
    }

    async fn update(
        &self,
        id: Uuid,
        request: &UpdateMealPlanRequest,
    ) -> AppResult<Option<MealPlan>> {
        let sql = format!(
            "UPDATE meal_plans SET \
             week_start = COALESCE($2, week_start), \
             meals_per_day = COALESCE($3, meals_per_day), \
             goals_kcal = COALESCE($4, goals_kcal), \
             goals_protein = COALESCE($5, goals_protein), \
             goals_fat = COALESCE($6, goals_fat), \
             goals_carbs = COALESCE($7, goals_carbs), \
             updated_at = now() \
             WHERE id = $1 \
             RETURNING {PLAN_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(request.week_start)
            .bind(request.meals_per_day)
            .bind(request.goals_kcal)
            .bind(request.goals_protein)
            .bind(request.goals_fat)
            .bind(request.goals_carbs)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(plan_from_row).transpose().map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM meal_plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn entries(&self, plan_id: Uuid) -> AppResult<Vec<MealEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM meal_entries WHERE meal_plan_id = $1 ORDER BY date"
        );
        let rows = sqlx::query(&sql).bind(plan_id).fetch_all(&self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(entry_from_row(row)?);
        }
        // Slot order is the domain order, not the column's lexicographic one
        entries.sort_by_key(|e| (e.date, e.slot));
        Ok(entries)
    }

    async fn entries_with_recipes(&self, plan_id: Uuid) -> AppResult<Vec<MealEntryWithRecipe>> {
        let entries = self.entries(plan_id).await?;

        let mut joined = Vec::with_capacity(entries.len());
        for entry in entries {
            let recipe = self.recipe_by_id(entry.recipe_id).await?;
            joined.push(MealEntryWithRecipe { entry, recipe });
        }
        Ok(joined)
    }

    async fn insert_entry(
        &self,
        plan_id: Uuid,
        entry: &UpsertMealEntryRequest,
    ) -> AppResult<MealEntryWithRecipe> {
        let sql = format!(
            "INSERT INTO meal_entries (meal_plan_id, date, slot, recipe_id, servings_count) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ENTRY_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(plan_id)
            .bind(entry.date)
            .bind(entry.slot.as_str())
            .bind(entry.recipe_id)
            .bind(entry.servings_count)
            .fetch_one(&self.pool)
            .await?;

        let entry = entry_from_row(&row)?;
        let recipe = self.recipe_by_id(entry.recipe_id).await?;
        Ok(MealEntryWithRecipe { entry, recipe })
    }

    async fn upsert_entry(
        &self,
        plan_id: Uuid,
        entry: &UpsertMealEntryRequest,
    ) -> AppResult<MealEntryWithRecipe> {
        let sql = format!(
            "INSERT INTO meal_entries (meal_plan_id, date, slot, recipe_id, servings_count) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (meal_plan_id, date, slot) DO UPDATE \
             SET recipe_id = EXCLUDED.recipe_id, servings_count = EXCLUDED.servings_count \
             RETURNING {ENTRY_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(plan_id)
            .bind(entry.date)
            .bind(entry.slot.as_str())
            .bind(entry.recipe_id)
            .bind(entry.servings_count)
            .fetch_one(&self.pool)
            .await?;

        let entry = entry_from_row(&row)?;
        let recipe = self.recipe_by_id(entry.recipe_id).await?;
        Ok(MealEntryWithRecipe { entry, recipe })
    }

    async fn delete_entry(&self, plan_id: Uuid, entry_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM meal_entries WHERE id = $1 AND meal_plan_id = $2")
            .bind(entry_id)
            .bind(plan_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
