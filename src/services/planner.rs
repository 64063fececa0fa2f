use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::db::{MealPlanStore, RecipeStore};
use crate::error::{AppError, AppResult};
use crate::models::{MealEntry, MealEntryWithRecipe, MealPlan, Recipe, UpsertMealEntryRequest};
use crate::services::generator::{
    allocate, free_slots, rank_candidates, refine, week_slots, MacroProfile, RecipeMacros,
    CANDIDATE_POOL_SIZE,
};

/// Fills every free slot of a plan's week and persists the result
///
/// Reads the plan with its existing entries and the full recipe catalog,
/// runs greedy allocation followed by the refinement pass, then persists
/// one entry per newly assigned slot, in slot order. Pre-existing entries
/// are never touched; their macro contribution seeds the running totals so
/// generated slots compensate around them.
pub async fn generate_plan(
    meal_plans: Arc<dyn MealPlanStore>,
    recipes: Arc<dyn RecipeStore>,
    plan_id: Uuid,
) -> AppResult<Vec<MealEntryWithRecipe>> {
    let start = Instant::now();

    let plan = meal_plans
        .get(plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal plan not found".to_string()))?;
    let entries = meal_plans.entries(plan_id).await?;
    let catalog = recipes.all().await?;

    if catalog.is_empty() {
        tracing::warn!(plan_id = %plan_id, "Recipe catalog is empty; nothing to assign");
    }

    let macros: Vec<RecipeMacros> = catalog.iter().map(recipe_macros).collect();
    let goals = weekly_goals(&plan);

    let slots = week_slots(plan.week_start, plan.meals_per_day);
    let free = free_slots(&slots, &entries);

    tracing::info!(
        plan_id = %plan_id,
        total_slots = slots.len(),
        locked = slots.len() - free.len(),
        free = free.len(),
        catalog = macros.len(),
        "Starting meal plan generation"
    );

    let per_slot_goal = goals.scaled(1.0 / slots.len().max(1) as f64);
    let pool = rank_candidates(&macros, &per_slot_goal, CANDIDATE_POOL_SIZE);

    let locked = locked_totals(&entries, &macros);
    let assignments = refine(allocate(&free, &pool, &goals, &locked));

    let mut created = Vec::with_capacity(assignments.len());
    for assignment in &assignments {
        let request = UpsertMealEntryRequest {
            date: assignment.slot.date,
            slot: assignment.slot.slot,
            recipe_id: assignment.recipe_id,
            servings_count: assignment.servings,
        };
        created.push(meal_plans.insert_entry(plan_id, &request).await?);
    }

    tracing::info!(
        plan_id = %plan_id,
        created = created.len(),
        processing_time_ms = start.elapsed().as_millis(),
        "Meal plan generation completed"
    );

    Ok(created)
}

/// Per-serving macro snapshot used by the generator
fn recipe_macros(recipe: &Recipe) -> RecipeMacros {
    RecipeMacros {
        id: recipe.id,
        title: recipe.title.clone(),
        macros: MacroProfile {
            kcal: f64::from(recipe.kcal_per_serving),
            protein: recipe.protein_per_serving,
            fat: recipe.fat_per_serving,
            carbs: recipe.carbs_per_serving,
        },
    }
}

fn weekly_goals(plan: &MealPlan) -> MacroProfile {
    MacroProfile {
        kcal: f64::from(plan.goals_kcal),
        protein: plan.goals_protein,
        fat: plan.goals_fat,
        carbs: plan.goals_carbs,
    }
}

/// Macro contribution of pre-existing entries. Entries pointing at recipes
/// missing from the catalog still lock their slot but contribute nothing.
fn locked_totals(entries: &[MealEntry], catalog: &[RecipeMacros]) -> MacroProfile {
    let by_id: HashMap<Uuid, &RecipeMacros> = catalog.iter().map(|r| (r.id, r)).collect();

    let mut totals = MacroProfile::default();
    for entry in entries {
        if let Some(recipe) = by_id.get(&entry.recipe_id) {
            totals.add(&recipe.macros.scaled(entry.servings_count));
        }
    }
    totals
}
