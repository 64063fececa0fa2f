use std::collections::HashMap;

use serde::Serialize;

use crate::models::MealEntryWithRecipe;

/// One aggregated line of a plan's shopping list
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShoppingListItem {
    pub name: String,
    pub unit: String,
    pub total_quantity: i64,
}

/// Aggregates the ingredients of all entries of a plan.
///
/// Lines merge on (lowercased name, lowercased unit); quantities scale by
/// each entry's servings count and are rounded to whole numbers at the
/// end. Entries without a joined recipe are skipped.
pub fn build_shopping_list(entries: &[MealEntryWithRecipe]) -> Vec<ShoppingListItem> {
    struct Aggregate {
        name: String,
        unit: String,
        total: f64,
    }

    let mut by_key: HashMap<(String, String), Aggregate> = HashMap::new();
    let mut order: Vec<(String, String)> = Vec::new();

    for entry in entries {
        let Some(recipe) = &entry.recipe else {
            continue;
        };

        for ingredient in &recipe.ingredients {
            let key = (
                ingredient.name.trim().to_lowercase(),
                ingredient.unit.trim().to_lowercase(),
            );
            let quantity = ingredient.quantity * entry.entry.servings_count;

            match by_key.get_mut(&key) {
                Some(aggregate) => aggregate.total += quantity,
                None => {
                    order.push(key.clone());
                    by_key.insert(
                        key,
                        Aggregate {
                            name: ingredient.name.clone(),
                            unit: ingredient.unit.clone(),
                            total: quantity,
                        },
                    );
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .map(|aggregate| ShoppingListItem {
            name: aggregate.name,
            unit: aggregate.unit,
            total_quantity: aggregate.total.round() as i64,
        })
        .collect()
}
