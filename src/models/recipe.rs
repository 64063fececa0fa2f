use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A single ingredient line of a recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A recipe in the catalog, carrying its per-serving macro profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub servings: i32,
    pub cook_time_min: i32,
    pub kcal_per_serving: i32,
    pub protein_per_serving: f64,
    pub fat_per_serving: f64,
    pub carbs_per_serving: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a recipe
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: String,
    pub servings: i32,
    pub cook_time_min: i32,
    pub kcal_per_serving: i32,
    pub protein_per_serving: f64,
    pub fat_per_serving: f64,
    pub carbs_per_serving: f64,
}

/// Payload for partially updating a recipe; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub steps: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub servings: Option<i32>,
    pub cook_time_min: Option<i32>,
    pub kcal_per_serving: Option<i32>,
    pub protein_per_serving: Option<f64>,
    pub fat_per_serving: Option<f64>,
    pub carbs_per_serving: Option<f64>,
}

fn check_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }
    if title.len() > 200 {
        return Err(AppError::InvalidInput("Title too long".to_string()));
    }
    Ok(())
}

fn check_description(description: &str) -> AppResult<()> {
    if description.trim().is_empty() {
        return Err(AppError::InvalidInput("Description is required".to_string()));
    }
    if description.len() > 1000 {
        return Err(AppError::InvalidInput("Description too long".to_string()));
    }
    Ok(())
}

fn check_ingredients(ingredients: &[Ingredient]) -> AppResult<()> {
    if ingredients.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one ingredient required".to_string(),
        ));
    }
    for ingredient in ingredients {
        if ingredient.name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Ingredient name is required".to_string(),
            ));
        }
        if ingredient.unit.trim().is_empty() {
            return Err(AppError::InvalidInput("Unit is required".to_string()));
        }
        if !(ingredient.quantity > 0.0) || !ingredient.quantity.is_finite() {
            return Err(AppError::InvalidInput(
                "Quantity must be positive".to_string(),
            ));
        }
    }
    Ok(())
}

fn check_steps(steps: &[String]) -> AppResult<()> {
    if steps.is_empty() || steps.iter().any(|s| s.trim().is_empty()) {
        return Err(AppError::InvalidInput(
            "At least one step required".to_string(),
        ));
    }
    Ok(())
}

fn check_macro(name: &str, value: f64) -> AppResult<()> {
    if value < 0.0 || !value.is_finite() {
        return Err(AppError::InvalidInput(format!(
            "{name} must be non-negative"
        )));
    }
    Ok(())
}

impl CreateRecipeRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_title(&self.title)?;
        check_description(&self.description)?;
        check_ingredients(&self.ingredients)?;
        check_steps(&self.steps)?;
        if self.category.trim().is_empty() {
            return Err(AppError::InvalidInput("Category is required".to_string()));
        }
        if self.servings < 1 {
            return Err(AppError::InvalidInput(
                "Servings must be positive integer".to_string(),
            ));
        }
        if self.cook_time_min < 1 {
            return Err(AppError::InvalidInput(
                "Cook time must be positive integer".to_string(),
            ));
        }
        if self.kcal_per_serving < 0 {
            return Err(AppError::InvalidInput(
                "Calories must be non-negative".to_string(),
            ));
        }
        check_macro("Protein", self.protein_per_serving)?;
        check_macro("Fat", self.fat_per_serving)?;
        check_macro("Carbs", self.carbs_per_serving)?;
        Ok(())
    }
}

impl UpdateRecipeRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        if let Some(ingredients) = &self.ingredients {
            check_ingredients(ingredients)?;
        }
        if let Some(steps) = &self.steps {
            check_steps(steps)?;
        }
        if let Some(category) = &self.category {
            if category.trim().is_empty() {
                return Err(AppError::InvalidInput("Category is required".to_string()));
            }
        }
        if matches!(self.servings, Some(s) if s < 1) {
            return Err(AppError::InvalidInput(
                "Servings must be positive integer".to_string(),
            ));
        }
        if matches!(self.cook_time_min, Some(t) if t < 1) {
            return Err(AppError::InvalidInput(
                "Cook time must be positive integer".to_string(),
            ));
        }
        if matches!(self.kcal_per_serving, Some(k) if k < 0) {
            return Err(AppError::InvalidInput(
                "Calories must be non-negative".to_string(),
            ));
        }
        if let Some(p) = self.protein_per_serving {
            check_macro("Protein", p)?;
        }
        if let Some(f) = self.fat_per_serving {
            check_macro("Fat", f)?;
        }
        if let Some(c) = self.carbs_per_serving {
            check_macro("Carbs", c)?;
        }
        Ok(())
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// Catalog listing filters.
///
/// Category and kcal bounds are pushed down to the store query; the text
/// query, tag filter, and the remaining macro ranges are applied in memory
/// on the fetched page via [`RecipeQuery::matches`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    pub query: Option<String>,
    /// Comma-separated tag list; a recipe matches if any of its tags
    /// contains any requested tag (case-insensitive substring).
    pub tags: Option<String>,
    pub category: Option<String>,
    /// Comma-separated category list; takes precedence over `category`.
    pub categories: Option<String>,
    pub min_kcal: Option<i32>,
    pub max_kcal: Option<i32>,
    pub min_protein: Option<f64>,
    pub max_protein: Option<f64>,
    pub min_fat: Option<f64>,
    pub max_fat: Option<f64>,
    pub min_carbs: Option<f64>,
    pub max_carbs: Option<f64>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl RecipeQuery {
    /// Page size clamped to the API maximum
    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, 100)
    }

    /// Zero-based row offset for the requested page
    pub fn offset(&self) -> u32 {
        self.page.max(1).saturating_sub(1) * self.limit()
    }

    /// Categories to restrict the store query to, if any
    pub fn category_filter(&self) -> Option<Vec<String>> {
        if let Some(categories) = &self.categories {
            let list: Vec<String> = categories
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if !list.is_empty() {
                return Some(list);
            }
        }
        self.category.clone().map(|c| vec![c])
    }

    /// In-memory filters applied after the page fetch
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if let Some(query) = &self.query {
            let needle = query.to_lowercase();
            let hit = recipe.title.to_lowercase().contains(&needle)
                || recipe.description.to_lowercase().contains(&needle)
                || recipe.category.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(tags) = &self.tags {
            let wanted: Vec<String> = tags
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            let hit = wanted.iter().any(|w| {
                recipe
                    .tags
                    .iter()
                    .any(|t| t.to_lowercase().contains(w.as_str()))
            });
            if !wanted.is_empty() && !hit {
                return false;
            }
        }

        let in_range = |value: f64, min: Option<f64>, max: Option<f64>| {
            value >= min.unwrap_or(0.0) && value <= max.unwrap_or(f64::INFINITY)
        };

        if self.min_protein.is_some() || self.max_protein.is_some() {
            if !in_range(recipe.protein_per_serving, self.min_protein, self.max_protein) {
                return false;
            }
        }
        if self.min_fat.is_some() || self.max_fat.is_some() {
            if !in_range(recipe.fat_per_serving, self.min_fat, self.max_fat) {
                return false;
            }
        }
        if self.min_carbs.is_some() || self.max_carbs.is_some() {
            if !in_range(recipe.carbs_per_serving, self.min_carbs, self.max_carbs) {
                return false;
            }
        }

        true
    }
}
