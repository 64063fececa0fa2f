pub mod meal_plan;
pub mod recipe;

pub use meal_plan::{
    is_half_step, CreateMealPlanRequest, MealEntry, MealEntryWithRecipe, MealPlan, MealSlot,
    UpdateMealPlanRequest, UpsertMealEntryRequest, DAYS_PER_WEEK,
};
pub use recipe::{CreateRecipeRequest, Ingredient, Recipe, RecipeQuery, UpdateRecipeRequest};
