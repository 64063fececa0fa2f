use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::RecipeStore;
use crate::error::AppResult;
use crate::models::{CreateRecipeRequest, Ingredient, Recipe, RecipeQuery, UpdateRecipeRequest};

pub(crate) const RECIPE_COLUMNS: &str = "id, title, description, ingredients, steps, image_url, \
     tags, category, servings, cook_time_min, kcal_per_serving, protein_per_serving, \
     fat_per_serving, carbs_per_serving, created_at, updated_at";

pub(crate) fn recipe_from_row(row: &PgRow) -> Result<Recipe, sqlx::Error> {
    let Json(ingredients): Json<Vec<Ingredient>> = row.try_get("ingredients")?;
    Ok(Recipe {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        ingredients,
        steps: row.try_get("steps")?,
        image_url: row.try_get("image_url")?,
        tags: row.try_get("tags")?,
        category: row.try_get("category")?,
        servings: row.try_get("servings")?,
        cook_time_min: row.try_get("cook_time_min")?,
        kcal_per_serving: row.try_get("kcal_per_serving")?,
        protein_per_serving: row.try_get("protein_per_serving")?,
        fat_per_serving: row.try_get("fat_per_serving")?,
        carbs_per_serving: row.try_get("carbs_per_serving")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Recipe catalog backed by PostgreSQL
pub struct PgRecipeStore {
    pool: PgPool,
}

impl PgRecipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn list(&self, query: &RecipeQuery) -> AppResult<(Vec<Recipe>, i64)> {
        // Category and kcal bounds are pushed into SQL; text/tag/macro
        // range filters apply in memory on the fetched page.
        let categories = query.category_filter();

        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes \
             WHERE ($1::text[] IS NULL OR category = ANY($1)) \
               AND ($2::int4 IS NULL OR kcal_per_serving >= $2) \
               AND ($3::int4 IS NULL OR kcal_per_serving <= $3) \
             ORDER BY created_at DESC, id \
             LIMIT $4 OFFSET $5"
        );

        let rows = sqlx::query(&sql)
            .bind(&categories)
            .bind(query.min_kcal)
            .bind(query.max_kcal)
            .bind(i64::from(query.limit()))
            .bind(i64::from(query.offset()))
            .fetch_all(&self.pool)
            .await?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in &rows {
            recipes.push(recipe_from_row(row)?);
        }
        recipes.retain(|r| query.matches(r));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM recipes \
             WHERE ($1::text[] IS NULL OR category = ANY($1)) \
               AND ($2::int4 IS NULL OR kcal_per_serving >= $2) \
               AND ($3::int4 IS NULL OR kcal_per_serving <= $3)",
        )
        .bind(&categories)
        .bind(query.min_kcal)
        .bind(query.max_kcal)
        .fetch_one(&self.pool)
        .await?;

        Ok((recipes, total))
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(recipe_from_row).transpose().map_err(Into::into)
    }

    async fn create(&self, request: &CreateRecipeRequest) -> AppResult<Recipe> {
        let sql = format!(
            "INSERT INTO recipes (title, description, ingredients, steps, image_url, tags, \
             category, servings, cook_time_min, kcal_per_serving, protein_per_serving, \
             fat_per_serving, carbs_per_serving) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {RECIPE_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(&request.title)
            .bind(&request.description)
            .bind(Json(&request.ingredients))
            .bind(&request.steps)
            .bind(&request.image_url)
            .bind(&request.tags)
            .bind(&request.category)
            .bind(request.servings)
            .bind(request.cook_time_min)
            .bind(request.kcal_per_serving)
            .bind(request.protein_per_serving)
            .bind(request.fat_per_serving)
            .bind(request.carbs_per_serving)
            .fetch_one(&self.pool)
            .await?;

        Ok(recipe_from_row(&row)?)
    }

    async fn update(&self, id: Uuid, request: &UpdateRecipeRequest) -> AppResult<Option<Recipe>> {
        let sql = format!(
            "UPDATE recipes SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             ingredients = COALESCE($4, ingredients), \
             steps = COALESCE($5, steps), \
             image_url = COALESCE($6, image_url), \
             tags = COALESCE($7, tags), \
             category = COALESCE($8, category), \
             servings = COALESCE($9, servings), \
             cook_time_min = COALESCE($10, cook_time_min), \
             kcal_per_serving = COALESCE($11, kcal_per_serving), \
             protein_per_serving = COALESCE($12, protein_per_serving), \
             fat_per_serving = COALESCE($13, fat_per_serving), \
             carbs_per_serving = COALESCE($14, carbs_per_serving), \
             updated_at = now() \
             WHERE id = $1 \
             RETURNING {RECIPE_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&request.title)
            .bind(&request.description)
            .bind(request.ingredients.as_ref().map(Json))
            .bind(&request.steps)
            .bind(&request.image_url)
            .bind(&request.tags)
            .bind(&request.category)
            .bind(request.servings)
            .bind(request.cook_time_min)
            .bind(request.kcal_per_serving)
            .bind(request.protein_per_serving)
            .bind(request.fat_per_serving)
            .bind(request.carbs_per_serving)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(recipe_from_row).transpose().map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn all(&self) -> AppResult<Vec<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at, id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in &rows {
            recipes.push(recipe_from_row(row)?);
        }
        Ok(recipes)
    }

    async fn tags(&self) -> AppResult<Vec<String>> {
        let tags: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT unnest(tags) AS tag FROM recipes ORDER BY tag")
                .fetch_all(&self.pool)
                .await?;
        Ok(tags)
    }

    async fn categories(&self) -> AppResult<Vec<String>> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM recipes ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }
}
