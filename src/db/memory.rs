use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{MealPlanStore, RecipeStore};
use crate::error::AppResult;
use crate::models::{
    CreateMealPlanRequest, CreateRecipeRequest, MealEntry, MealEntryWithRecipe, MealPlan, Recipe,
    RecipeQuery, UpdateMealPlanRequest, UpdateRecipeRequest, UpsertMealEntryRequest,
};

/// Recipe catalog held in process memory. Backs the integration tests and
/// mirrors the Postgres store's listing semantics.
#[derive(Default)]
pub struct MemoryRecipeStore {
    inner: RwLock<HashMap<Uuid, Recipe>>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn list(&self, query: &RecipeQuery) -> AppResult<(Vec<Recipe>, i64)> {
        let inner = self.inner.read().await;
        let categories = query.category_filter();

        let mut rows: Vec<Recipe> = inner
            .values()
            .filter(|r| categories.as_ref().map_or(true, |c| c.contains(&r.category)))
            .filter(|r| query.min_kcal.map_or(true, |min| r.kcal_per_serving >= min))
            .filter(|r| query.max_kcal.map_or(true, |max| r.kcal_per_serving <= max))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        // Totals count the pre-page filters only, as in the SQL store
        let total = rows.len() as i64;

        let page: Vec<Recipe> = rows
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .filter(|r| query.matches(r))
            .collect();

        Ok((page, total))
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Recipe>> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn create(&self, request: &CreateRecipeRequest) -> AppResult<Recipe> {
        let now = Utc::now();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            title: request.title.clone(),
            description: request.description.clone(),
            ingredients: request.ingredients.clone(),
            steps: request.steps.clone(),
            image_url: request.image_url.clone(),
            tags: request.tags.clone(),
            category: request.category.clone(),
            servings: request.servings,
            cook_time_min: request.cook_time_min,
            kcal_per_serving: request.kcal_per_serving,
            protein_per_serving: request.protein_per_serving,
            fat_per_serving: request.fat_per_serving,
            carbs_per_serving: request.carbs_per_serving,
            created_at: now,
            updated_at: now,
        };

        self.inner.write().await.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn update(&self, id: Uuid, request: &UpdateRecipeRequest) -> AppResult<Option<Recipe>> {
        let mut inner = self.inner.write().await;
        let Some(recipe) = inner.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = &request.title {
            recipe.title = title.clone();
        }
        if let Some(description) = &request.description {
            recipe.description = description.clone();
        }
        if let Some(ingredients) = &request.ingredients {
            recipe.ingredients = ingredients.clone();
        }
        if let Some(steps) = &request.steps {
            recipe.steps = steps.clone();
        }
        if let Some(image_url) = &request.image_url {
            recipe.image_url = Some(image_url.clone());
        }
        if let Some(tags) = &request.tags {
            recipe.tags = tags.clone();
        }
        if let Some(category) = &request.category {
            recipe.category = category.clone();
        }
        if let Some(servings) = request.servings {
            recipe.servings = servings;
        }
        if let Some(cook_time_min) = request.cook_time_min {
            recipe.cook_time_min = cook_time_min;
        }
        if let Some(kcal) = request.kcal_per_serving {
            recipe.kcal_per_serving = kcal;
        }
        if let Some(protein) = request.protein_per_serving {
            recipe.protein_per_serving = protein;
        }
        if let Some(fat) = request.fat_per_serving {
            recipe.fat_per_serving = fat;
        }
        if let Some(carbs) = request.carbs_per_serving {
            recipe.carbs_per_serving = carbs;
        }
        recipe.updated_at = Utc::now();

        Ok(Some(recipe.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.inner.write().await.remove(&id).is_some())
    }

    async fn all(&self) -> AppResult<Vec<Recipe>> {
        let inner = self.inner.read().await;
        let mut recipes: Vec<Recipe> = inner.values().cloned().collect();
        recipes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(recipes)
    }

    async fn tags(&self) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        let tags: BTreeSet<String> = inner
            .values()
            .flat_map(|r| r.tags.iter().cloned())
            .collect();
        Ok(tags.into_iter().collect())
    }

    async fn categories(&self) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        let categories: BTreeSet<String> =
            inner.values().map(|r| r.category.clone()).collect();
        Ok(categories.into_iter().collect())
    }
}

#[derive(Default)]
struct MemoryPlanState {
    plans: HashMap<Uuid, MealPlan>,
    entries: HashMap<Uuid, MealEntry>,
}

/// Meal plans and entries held in process memory, joining recipes from a
/// shared [`MemoryRecipeStore`]
pub struct MemoryMealPlanStore {
    recipes: Arc<MemoryRecipeStore>,
    inner: RwLock<MemoryPlanState>,
}

impl MemoryMealPlanStore {
    pub fn new(recipes: Arc<MemoryRecipeStore>) -> Self {
        Self {
            recipes,
            inner: RwLock::new(MemoryPlanState::default()),
        }
    }
}

#[async_trait]
impl MealPlanStore for MemoryMealPlanStore {
    async fn list(&self) -> AppResult<Vec<MealPlan>> {
        let inner = self.inner.read().await;
        let mut plans: Vec<MealPlan> = inner.plans.values().cloned().collect();
        plans.sort_by(|a, b| b.week_start.cmp(&a.week_start));
        Ok(plans)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<MealPlan>> {
        Ok(self.inner.read().await.plans.get(&id).cloned())
    }

    async fn create(&self, request: &CreateMealPlanRequest) -> AppResult<MealPlan> {
        let now = Utc::now();
        let plan = MealPlan {
            id: Uuid::new_v4(),
            week_start: request.week_start,
            meals_per_day: request.meals_per_day,
            goals_kcal: request.goals_kcal,
            goals_protein: request.goals_protein,
            goals_fat: request.goals_fat,
            goals_carbs: request.goals_carbs,
            created_at: now,
            updated_at: now,
        };

        self.inner.write().await.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(
        &self,
        id: Uuid,
        request: &UpdateMealPlanRequest,
    ) -> AppResult<Option<MealPlan>> {
        let mut inner = self.inner.write().await;
        let Some(plan) = inner.plans.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(week_start) = request.week_start {
            plan.week_start = week_start;
        }
        if let Some(meals_per_day) = request.meals_per_day {
            plan.meals_per_day = meals_per_day;
        }
        if let Some(goals_kcal) = request.goals_kcal {
            plan.goals_kcal = goals_kcal;
        }
        if let Some(goals_protein) = request.goals_protein {
            plan.goals_protein = goals_protein;
        }
        if let Some(goals_fat) = request.goals_fat {
            plan.goals_fat = goals_fat;
        }
        if let Some(goals_carbs) = request.goals_carbs {
            plan.goals_carbs = goals_carbs;
        }
        plan.updated_at = Utc::now();

        Ok(Some(plan.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.plans.remove(&id).is_some();
        if removed {
            inner.entries.retain(|_, e| e.meal_plan_id != id);
        }
        Ok(removed)
    }

    async fn entries(&self, plan_id: Uuid) -> AppResult<Vec<MealEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<MealEntry> = inner
            .entries
            .values()
            .filter(|e| e.meal_plan_id == plan_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.date, e.slot));
        Ok(entries)
    }

    async fn entries_with_recipes(&self, plan_id: Uuid) -> AppResult<Vec<MealEntryWithRecipe>> {
        let entries = self.entries(plan_id).await?;

        let mut joined = Vec::with_capacity(entries.len());
        for entry in entries {
            let recipe = self.recipes.get(entry.recipe_id).await?;
            joined.push(MealEntryWithRecipe { entry, recipe });
        }
        Ok(joined)
    }

    async fn insert_entry(
        &self,
        plan_id: Uuid,
        request: &UpsertMealEntryRequest,
    ) -> AppResult<MealEntryWithRecipe> {
        let entry = MealEntry {
            id: Uuid::new_v4(),
            meal_plan_id: plan_id,
            date: request.date,
            slot: request.slot,
            recipe_id: request.recipe_id,
            servings_count: request.servings_count,
            created_at: Utc::now(),
        };

        self.inner.write().await.entries.insert(entry.id, entry.clone());
        let recipe = self.recipes.get(entry.recipe_id).await?;
        Ok(MealEntryWithRecipe { entry, recipe })
    }

    async fn upsert_entry(
        &self,
        plan_id: Uuid,
        request: &UpsertMealEntryRequest,
    ) -> AppResult<MealEntryWithRecipe> {
        let mut inner = self.inner.write().await;

        let mut replaced: Option<MealEntry> = None;
        for entry in inner.entries.values_mut() {
            if entry.meal_plan_id == plan_id && entry.date == request.date && entry.slot == request.slot
            {
                entry.recipe_id = request.recipe_id;
                entry.servings_count = request.servings_count;
                replaced = Some(entry.clone());
                break;
            }
        }

        let entry = match replaced {
            Some(entry) => entry,
            None => {
                let entry = MealEntry {
                    id: Uuid::new_v4(),
                    meal_plan_id: plan_id,
                    date: request.date,
                    slot: request.slot,
                    recipe_id: request.recipe_id,
                    servings_count: request.servings_count,
                    created_at: Utc::now(),
                };
                inner.entries.insert(entry.id, entry.clone());
                entry
            }
        };
        drop(inner);

        let recipe = self.recipes.get(entry.recipe_id).await?;
        Ok(MealEntryWithRecipe { entry, recipe })
    }

    async fn delete_entry(&self, plan_id: Uuid, entry_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.entries.get(&entry_id) {
            Some(entry) if entry.meal_plan_id == plan_id => {
                inner.entries.remove(&entry_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, MealSlot};
    use chrono::NaiveDate;

    fn recipe_request(title: &str, kcal: i32) -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: title.to_string(),
            description: "test".to_string(),
            ingredients: vec![Ingredient {
                name: "thing".to_string(),
                quantity: 1.0,
                unit: "g".to_string(),
                note: None,
            }],
            steps: vec!["cook".to_string()],
            image_url: None,
            tags: vec!["quick".to_string()],
            category: "dinner".to_string(),
            servings: 1,
            cook_time_min: 10,
            kcal_per_serving: kcal,
            protein_per_serving: 10.0,
            fat_per_serving: 5.0,
            carbs_per_serving: 20.0,
        }
    }

    fn plan_request() -> CreateMealPlanRequest {
        CreateMealPlanRequest {
            week_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            meals_per_day: 3,
            goals_kcal: 14000,
            goals_protein: 700.0,
            goals_fat: 350.0,
            goals_carbs: 1750.0,
        }
    }

    #[tokio::test]
    async fn test_recipe_crud_round_trip() {
        let store = MemoryRecipeStore::new();
        let created = store.create(&recipe_request("Soup", 300)).await.unwrap();

        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Soup");

        let update = UpdateRecipeRequest {
            title: Some("Stew".to_string()),
            ..Default::default()
        };
        let updated = store.update(created.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.title, "Stew");
        assert_eq!(updated.kcal_per_serving, 300);

        assert!(store.delete(created.id).await.unwrap());
        assert!(store.get(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recipe_list_kcal_filter_and_total() {
        let store = MemoryRecipeStore::new();
        store.create(&recipe_request("Light", 200)).await.unwrap();
        store.create(&recipe_request("Heavy", 900)).await.unwrap();

        let query = RecipeQuery {
            min_kcal: Some(500),
            ..Default::default()
        };
        let (recipes, total) = store.list(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].title, "Heavy");
    }

    #[tokio::test]
    async fn test_taxonomy_is_sorted_and_distinct() {
        let store = MemoryRecipeStore::new();
        store.create(&recipe_request("A", 100)).await.unwrap();
        store.create(&recipe_request("B", 100)).await.unwrap();

        assert_eq!(store.tags().await.unwrap(), vec!["quick".to_string()]);
        assert_eq!(
            store.categories().await.unwrap(),
            vec!["dinner".to_string()]
        );
    }

    #[tokio::test]
    async fn test_upsert_entry_replaces_same_slot() {
        let recipes = Arc::new(MemoryRecipeStore::new());
        let first = recipes.create(&recipe_request("First", 100)).await.unwrap();
        let second = recipes.create(&recipe_request("Second", 200)).await.unwrap();

        let store = MemoryMealPlanStore::new(recipes);
        let plan = store.create(&plan_request()).await.unwrap();

        let request = UpsertMealEntryRequest {
            date: plan.week_start,
            slot: MealSlot::Breakfast,
            recipe_id: first.id,
            servings_count: 1.0,
        };
        store.upsert_entry(plan.id, &request).await.unwrap();

        let request = UpsertMealEntryRequest {
            recipe_id: second.id,
            servings_count: 1.5,
            ..request
        };
        store.upsert_entry(plan.id, &request).await.unwrap();

        let entries = store.entries(plan.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].recipe_id, second.id);
        assert_eq!(entries[0].servings_count, 1.5);
    }

    #[tokio::test]
    async fn test_plan_delete_cascades_entries() {
        let recipes = Arc::new(MemoryRecipeStore::new());
        let recipe = recipes.create(&recipe_request("Soup", 300)).await.unwrap();

        let store = MemoryMealPlanStore::new(recipes);
        let plan = store.create(&plan_request()).await.unwrap();

        let request = UpsertMealEntryRequest {
            date: plan.week_start,
            slot: MealSlot::Lunch,
            recipe_id: recipe.id,
            servings_count: 1.0,
        };
        store.insert_entry(plan.id, &request).await.unwrap();

        assert!(store.delete(plan.id).await.unwrap());
        assert!(store.entries(plan.id).await.unwrap().is_empty());
    }
}
