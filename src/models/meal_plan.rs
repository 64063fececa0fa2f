use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Recipe;

/// Number of calendar days covered by a meal plan
pub const DAYS_PER_WEEK: u32 = 7;

/// Named meal slots of a day, in fixed order. A plan uses the first
/// `meals_per_day` of them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack1,
    Snack2,
    Snack3,
}

impl MealSlot {
    pub const ALL: [MealSlot; 6] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snack1,
        MealSlot::Snack2,
        MealSlot::Snack3,
    ];

    /// Slot names used by a plan with the given meal count
    pub fn for_meals_per_day(meals_per_day: i16) -> &'static [MealSlot] {
        let count = meals_per_day.clamp(0, Self::ALL.len() as i16) as usize;
        &Self::ALL[..count]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snack1 => "snack1",
            MealSlot::Snack2 => "snack2",
            MealSlot::Snack3 => "snack3",
        }
    }
}

impl Display for MealSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(MealSlot::Breakfast),
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            "snack1" => Ok(MealSlot::Snack1),
            "snack2" => Ok(MealSlot::Snack2),
            "snack3" => Ok(MealSlot::Snack3),
            other => Err(AppError::InvalidInput(format!(
                "Unknown meal slot: {other}"
            ))),
        }
    }
}

/// A weekly meal plan with its macro goals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealPlan {
    pub id: Uuid,
    /// Day 0 of the plan's 7-day window (timezone-naive calendar date)
    pub week_start: NaiveDate,
    pub meals_per_day: i16,
    pub goals_kcal: i32,
    pub goals_protein: f64,
    pub goals_fat: f64,
    pub goals_carbs: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One occupied slot of a meal plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealEntry {
    pub id: Uuid,
    pub meal_plan_id: Uuid,
    pub date: NaiveDate,
    pub slot: MealSlot,
    pub recipe_id: Uuid,
    pub servings_count: f64,
    pub created_at: DateTime<Utc>,
}

/// A meal entry joined with its recipe for API responses
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MealEntryWithRecipe {
    #[serde(flatten)]
    pub entry: MealEntry,
    pub recipe: Option<Recipe>,
}

/// Payload for creating a meal plan
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMealPlanRequest {
    pub week_start: NaiveDate,
    pub meals_per_day: i16,
    pub goals_kcal: i32,
    pub goals_protein: f64,
    pub goals_fat: f64,
    pub goals_carbs: f64,
}

/// Payload for partially updating a meal plan
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMealPlanRequest {
    pub week_start: Option<NaiveDate>,
    pub meals_per_day: Option<i16>,
    pub goals_kcal: Option<i32>,
    pub goals_protein: Option<f64>,
    pub goals_fat: Option<f64>,
    pub goals_carbs: Option<f64>,
}

/// Payload for manually placing a recipe into a slot
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertMealEntryRequest {
    pub date: NaiveDate,
    pub slot: MealSlot,
    pub recipe_id: Uuid,
    pub servings_count: f64,
}

fn check_meals_per_day(meals_per_day: i16) -> AppResult<()> {
    if meals_per_day < 3 {
        return Err(AppError::InvalidInput(
            "At least 3 meals per day".to_string(),
        ));
    }
    if meals_per_day > 6 {
        return Err(AppError::InvalidInput(
            "Maximum 6 meals per day".to_string(),
        ));
    }
    Ok(())
}

fn check_goal(name: &str, value: f64) -> AppResult<()> {
    if value < 0.0 || !value.is_finite() {
        return Err(AppError::InvalidInput(format!(
            "Weekly {name} goal must be non-negative"
        )));
    }
    Ok(())
}

impl CreateMealPlanRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_meals_per_day(self.meals_per_day)?;
        if self.goals_kcal <= 0 {
            return Err(AppError::InvalidInput(
                "Weekly calories goal must be positive".to_string(),
            ));
        }
        check_goal("protein", self.goals_protein)?;
        check_goal("fat", self.goals_fat)?;
        check_goal("carbs", self.goals_carbs)?;
        Ok(())
    }
}

impl UpdateMealPlanRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(meals_per_day) = self.meals_per_day {
            check_meals_per_day(meals_per_day)?;
        }
        if matches!(self.goals_kcal, Some(k) if k <= 0) {
            return Err(AppError::InvalidInput(
                "Weekly calories goal must be positive".to_string(),
            ));
        }
        if let Some(p) = self.goals_protein {
            check_goal("protein", p)?;
        }
        if let Some(f) = self.goals_fat {
            check_goal("fat", f)?;
        }
        if let Some(c) = self.goals_carbs {
            check_goal("carbs", c)?;
        }
        Ok(())
    }
}

/// Whether a servings count is a positive multiple of 0.5
pub fn is_half_step(servings: f64) -> bool {
    if !(servings > 0.0) || !servings.is_finite() {
        return false;
    }
    let doubled = servings * 2.0;
    (doubled - doubled.round()).abs() < 1e-9
}

impl UpsertMealEntryRequest {
    pub fn validate(&self) -> AppResult<()> {
        if !is_half_step(self.servings_count) {
            return Err(AppError::InvalidInput(
                "Servings count must be a positive multiple of 0.5".to_string(),
            ));
        }
        Ok(())
    }
}
