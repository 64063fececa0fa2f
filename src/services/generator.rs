use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{MealEntry, MealSlot, DAYS_PER_WEEK};

/// Number of top-ranked recipes considered as candidates for every slot.
/// The ranking is computed once per generation run and shared by all slots.
pub const CANDIDATE_POOL_SIZE: usize = 20;

/// Serving multipliers the generator may propose
pub const SERVING_STEPS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

/// Accepted swaps per outer index during the single refinement pass
pub const SWAPS_PER_OUTER_INDEX: usize = 1;

// Distance weights: calorie accuracy dominates, macros are secondary.
const KCAL_WEIGHT: f64 = 1.0;
const PROTEIN_WEIGHT: f64 = 0.8;
const FAT_WEIGHT: f64 = 0.6;
const CARBS_WEIGHT: f64 = 0.6;

/// Calories and macro grams; used both as per-serving values and as
/// running totals or targets
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacroProfile {
    pub kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl MacroProfile {
    /// Linearly scales all four axes, e.g. by a serving multiplier
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            kcal: self.kcal * factor,
            protein: self.protein * factor,
            fat: self.fat * factor,
            carbs: self.carbs * factor,
        }
    }

    pub fn add(&mut self, other: &Self) {
        self.kcal += other.kcal;
        self.protein += other.protein;
        self.fat += other.fat;
        self.carbs += other.carbs;
    }
}

/// Per-serving macro snapshot of a catalog recipe
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeMacros {
    pub id: Uuid,
    pub title: String,
    pub macros: MacroProfile,
}

/// Identity of one meal slot within a plan week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    pub date: NaiveDate,
    pub slot: MealSlot,
}

/// A generated, not yet persisted, slot assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub slot: SlotId,
    pub recipe_id: Uuid,
    pub servings: f64,
    /// Macro contribution at the chosen serving size
    pub macros: MacroProfile,
    /// The remaining per-slot target this slot was scored against
    pub target: MacroProfile,
}

/// Enumerates all slot identities of the plan week in day-major,
/// slot-minor order
pub fn week_slots(week_start: NaiveDate, meals_per_day: i16) -> Vec<SlotId> {
    let slot_names = MealSlot::for_meals_per_day(meals_per_day);
    let mut slots = Vec::with_capacity(DAYS_PER_WEEK as usize * slot_names.len());

    for day in 0..DAYS_PER_WEEK {
        let date = week_start + chrono::Days::new(u64::from(day));
        for slot in slot_names {
            slots.push(SlotId { date, slot: *slot });
        }
    }

    slots
}

/// Keeps only slots without an existing entry. Matching is exact on
/// calendar date and slot name.
pub fn free_slots(slots: &[SlotId], entries: &[MealEntry]) -> Vec<SlotId> {
    let locked: HashSet<(NaiveDate, MealSlot)> =
        entries.iter().map(|e| (e.date, e.slot)).collect();

    slots
        .iter()
        .filter(|s| !locked.contains(&(s.date, s.slot)))
        .copied()
        .collect()
}

/// Weighted relative absolute deviation between a candidate and a target
/// profile. Lower is better; the result is always non-negative.
///
/// Each axis contributes `|candidate - target| / |target|`, with a zero
/// target treated as 1 to avoid division by zero.
pub fn macro_distance(candidate: &MacroProfile, target: &MacroProfile) -> f64 {
    fn axis(candidate: f64, target: f64) -> f64 {
        let denom = if target == 0.0 { 1.0 } else { target.abs() };
        (candidate - target).abs() / denom
    }

    KCAL_WEIGHT * axis(candidate.kcal, target.kcal)
        + PROTEIN_WEIGHT * axis(candidate.protein, target.protein)
        + FAT_WEIGHT * axis(candidate.fat, target.fat)
        + CARBS_WEIGHT * axis(candidate.carbs, target.carbs)
}

/// Per-slot target for the next assignment: the unmet share of the weekly
/// goals divided over the slots still to fill (including the current one)
pub fn remaining_target(
    goals: &MacroProfile,
    running: &MacroProfile,
    remaining_slots: usize,
) -> MacroProfile {
    let divisor = remaining_slots.max(1) as f64;
    MacroProfile {
        kcal: (goals.kcal - running.kcal) / divisor,
        protein: (goals.protein - running.protein) / divisor,
        fat: (goals.fat - running.fat) / divisor,
        carbs: (goals.carbs - running.carbs) / divisor,
    }
}

/// Ranks the catalog by distance at 1.0 serving against the average
/// per-slot goal and keeps the best `pool_size` recipes. The ranking is
/// fixed for the whole run; ties keep catalog order.
pub fn rank_candidates(
    catalog: &[RecipeMacros],
    per_slot_goal: &MacroProfile,
    pool_size: usize,
) -> Vec<RecipeMacros> {
    let mut scored: Vec<(f64, &RecipeMacros)> = catalog
        .iter()
        .map(|r| (macro_distance(&r.macros, per_slot_goal), r))
        .collect();

    // Stable sort keeps first-encountered order for equal scores
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored
        .into_iter()
        .take(pool_size)
        .map(|(_, r)| r.clone())
        .collect()
}

/// Greedily assigns a (recipe, servings) pair to every free slot, in slot
/// order, re-deriving the per-slot target after each assignment so later
/// slots compensate for earlier over- or under-shoot.
///
/// `locked_totals` is the macro contribution of pre-existing entries.
/// With an empty candidate pool no assignments are produced.
pub fn allocate(
    free: &[SlotId],
    pool: &[RecipeMacros],
    goals: &MacroProfile,
    locked_totals: &MacroProfile,
) -> Vec<Assignment> {
    let mut running = *locked_totals;
    let mut assignments = Vec::with_capacity(free.len());

    for (index, slot) in free.iter().enumerate() {
        let target = remaining_target(goals, &running, free.len() - index);

        let Some((recipe, servings, scaled)) = best_candidate(pool, &target) else {
            continue;
        };

        running.add(&scaled);
        assignments.push(Assignment {
            slot: *slot,
            recipe_id: recipe.id,
            servings,
            macros: scaled,
            target,
        });
    }

    assignments
}

/// Picks the lowest-scoring (recipe, serving size) pair for a slot target.
/// Ties resolve to the first candidate in rank order, then the smallest
/// serving size.
fn best_candidate<'a>(
    pool: &'a [RecipeMacros],
    target: &MacroProfile,
) -> Option<(&'a RecipeMacros, f64, MacroProfile)> {
    let mut best: Option<(&RecipeMacros, f64, MacroProfile)> = None;
    let mut best_score = f64::INFINITY;

    for recipe in pool {
        for servings in SERVING_STEPS {
            let scaled = recipe.macros.scaled(servings);
            let score = macro_distance(&scaled, target);
            if score < best_score {
                best_score = score;
                best = Some((recipe, servings, scaled));
            }
        }
    }

    best
}

/// Single bounded pass of pairwise exchanges over the new assignments.
///
/// For each ascending index pair the two assignments' (recipe, servings)
/// are exchanged while each slot keeps the target captured at allocation
/// time; the swap is kept only if the pair's summed distance against those
/// targets strictly decreases. At most `SWAPS_PER_OUTER_INDEX` kept swaps
/// per outer index, and no second pass.
pub fn refine(mut assignments: Vec<Assignment>) -> Vec<Assignment> {
    if assignments.len() < 2 {
        return assignments;
    }

    for i in 0..assignments.len() - 1 {
        let mut kept = 0;
        for j in i + 1..assignments.len() {
            let before = macro_distance(&assignments[i].macros, &assignments[i].target)
                + macro_distance(&assignments[j].macros, &assignments[j].target);
            let after = macro_distance(&assignments[j].macros, &assignments[i].target)
                + macro_distance(&assignments[i].macros, &assignments[j].target);

            if after < before {
                swap_payload(&mut assignments, i, j);
                kept += 1;
                if kept >= SWAPS_PER_OUTER_INDEX {
                    break;
                }
            }
        }
    }

    assignments
}

/// Exchanges recipe, servings and macro contribution between two
/// assignments; slots and their targets stay put
fn swap_payload(assignments: &mut [Assignment], i: usize, j: usize) {
    let (recipe_id, servings, macros) = (
        assignments[i].recipe_id,
        assignments[i].servings,
        assignments[i].macros,
    );
    assignments[i].recipe_id = assignments[j].recipe_id;
    assignments[i].servings = assignments[j].servings;
    assignments[i].macros = assignments[j].macros;
    assignments[j].recipe_id = recipe_id;
    assignments[j].servings = servings;
    assignments[j].macros = macros;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn recipe(title: &str, kcal: f64, protein: f64, fat: f64, carbs: f64) -> RecipeMacros {
        RecipeMacros {
            id: Uuid::new_v4(),
            title: title.to_string(),
            macros: MacroProfile {
                kcal,
                protein,
                fat,
                carbs,
            },
        }
    }

    fn entry_at(day: u32, slot: MealSlot) -> MealEntry {
        MealEntry {
            id: Uuid::new_v4(),
            meal_plan_id: Uuid::new_v4(),
            date: date(day),
            slot,
            recipe_id: Uuid::new_v4(),
            servings_count: 1.0,
            created_at: Utc::now(),
        }
    }

    fn weekly_goals() -> MacroProfile {
        MacroProfile {
            kcal: 14000.0,
            protein: 700.0,
            fat: 350.0,
            carbs: 1750.0,
        }
    }

    #[test]
    fn test_week_slots_counts() {
        assert_eq!(week_slots(date(1), 3).len(), 21);
        assert_eq!(week_slots(date(1), 4).len(), 28);
        assert_eq!(week_slots(date(1), 6).len(), 42);
    }

    #[test]
    fn test_week_slots_day_major_order() {
        let slots = week_slots(date(1), 3);

        assert_eq!(slots[0], SlotId { date: date(1), slot: MealSlot::Breakfast });
        assert_eq!(slots[1], SlotId { date: date(1), slot: MealSlot::Lunch });
        assert_eq!(slots[2], SlotId { date: date(1), slot: MealSlot::Dinner });
        assert_eq!(slots[3], SlotId { date: date(2), slot: MealSlot::Breakfast });
        assert_eq!(slots[20], SlotId { date: date(7), slot: MealSlot::Dinner });
    }

    #[test]
    fn test_week_slots_no_duplicates() {
        let slots = week_slots(date(1), 6);
        let unique: HashSet<SlotId> = slots.iter().copied().collect();
        assert_eq!(unique.len(), slots.len());
    }

    #[test]
    fn test_free_slots_removes_exact_matches_only() {
        let slots = week_slots(date(1), 3);
        let entries = vec![
            entry_at(1, MealSlot::Breakfast),
            // Different date than any plan slot: must not lock anything
            entry_at(20, MealSlot::Lunch),
        ];

        let free = free_slots(&slots, &entries);
        assert_eq!(free.len(), 20);
        assert!(!free.contains(&SlotId { date: date(1), slot: MealSlot::Breakfast }));
        assert!(free.contains(&SlotId { date: date(1), slot: MealSlot::Lunch }));
    }

    #[test]
    fn test_free_slots_all_locked() {
        let slots = week_slots(date(1), 3);
        let entries: Vec<MealEntry> = slots
            .iter()
            .map(|s| MealEntry {
                date: s.date,
                slot: s.slot,
                ..entry_at(1, MealSlot::Breakfast)
            })
            .collect();

        assert!(free_slots(&slots, &entries).is_empty());
    }

    #[test]
    fn test_macro_distance_exact_match_is_zero() {
        let target = MacroProfile {
            kcal: 600.0,
            protein: 40.0,
            fat: 20.0,
            carbs: 70.0,
        };
        assert_eq!(macro_distance(&target, &target), 0.0);
    }

    #[test]
    fn test_macro_distance_weights() {
        let target = MacroProfile {
            kcal: 100.0,
            protein: 100.0,
            fat: 100.0,
            carbs: 100.0,
        };
        let candidate = MacroProfile {
            kcal: 200.0,
            protein: 200.0,
            fat: 200.0,
            carbs: 200.0,
        };
        // Each axis deviates by 100%: 1.0 + 0.8 + 0.6 + 0.6
        let score = macro_distance(&candidate, &target);
        assert!((score - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_macro_distance_zero_target_guard() {
        let target = MacroProfile::default();
        let candidate = MacroProfile {
            kcal: 10.0,
            protein: 5.0,
            fat: 2.0,
            carbs: 1.0,
        };
        // Denominators floored to 1 on every axis, kcal included
        let expected = 10.0 + 0.8 * 5.0 + 0.6 * 2.0 + 0.6 * 1.0;
        assert!((macro_distance(&candidate, &target) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_macro_distance_non_negative_for_negative_target() {
        let target = MacroProfile {
            kcal: -500.0,
            protein: -10.0,
            fat: 0.0,
            carbs: -1.0,
        };
        let candidate = MacroProfile {
            kcal: 300.0,
            protein: 20.0,
            fat: 5.0,
            carbs: 50.0,
        };
        assert!(macro_distance(&candidate, &target) >= 0.0);
    }

    #[test]
    fn test_remaining_target_formula() {
        let goals = weekly_goals();
        let running = MacroProfile {
            kcal: 2000.0,
            protein: 100.0,
            fat: 50.0,
            carbs: 250.0,
        };

        let target = remaining_target(&goals, &running, 18);
        assert!((target.kcal - (14000.0 - 2000.0) / 18.0).abs() < 1e-9);
        assert!((target.protein - (700.0 - 100.0) / 18.0).abs() < 1e-9);
        assert!((target.fat - (350.0 - 50.0) / 18.0).abs() < 1e-9);
        assert!((target.carbs - (1750.0 - 250.0) / 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_candidates_orders_and_truncates() {
        let per_slot = MacroProfile {
            kcal: 600.0,
            protein: 30.0,
            fat: 15.0,
            carbs: 75.0,
        };
        let catalog = vec![
            recipe("far", 1800.0, 90.0, 45.0, 225.0),
            recipe("exact", 600.0, 30.0, 15.0, 75.0),
            recipe("close", 650.0, 32.0, 16.0, 80.0),
        ];

        let pool = rank_candidates(&catalog, &per_slot, 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].title, "exact");
        assert_eq!(pool[1].title, "close");
    }

    #[test]
    fn test_rank_candidates_stable_on_ties() {
        let per_slot = MacroProfile {
            kcal: 600.0,
            protein: 30.0,
            fat: 15.0,
            carbs: 75.0,
        };
        let first = recipe("first", 600.0, 30.0, 15.0, 75.0);
        let second = recipe("second", 600.0, 30.0, 15.0, 75.0);
        let catalog = vec![first.clone(), second];

        let pool = rank_candidates(&catalog, &per_slot, 2);
        assert_eq!(pool[0].id, first.id);
    }

    #[test]
    fn test_allocate_empty_pool_produces_nothing() {
        let free = week_slots(date(1), 3);
        let assignments = allocate(&free, &[], &weekly_goals(), &MacroProfile::default());
        assert!(assignments.is_empty());
    }

    #[test]
    fn test_allocate_fills_every_free_slot() {
        let free = week_slots(date(1), 3);
        let pool = vec![recipe("bowl", 667.0, 33.0, 17.0, 83.0)];

        let assignments = allocate(&free, &pool, &weekly_goals(), &MacroProfile::default());
        assert_eq!(assignments.len(), 21);

        let slots: HashSet<SlotId> = assignments.iter().map(|a| a.slot).collect();
        assert_eq!(slots.len(), 21);
    }

    #[test]
    fn test_allocate_serving_domain() {
        let free = week_slots(date(1), 4);
        let pool = vec![
            recipe("light", 250.0, 15.0, 8.0, 30.0),
            recipe("heavy", 900.0, 50.0, 30.0, 100.0),
        ];

        let assignments = allocate(&free, &pool, &weekly_goals(), &MacroProfile::default());
        for assignment in &assignments {
            assert!(SERVING_STEPS.contains(&assignment.servings));
        }
    }

    #[test]
    fn test_allocate_recomputes_remaining_target_each_slot() {
        let free = week_slots(date(1), 3);
        let pool = vec![
            recipe("a", 400.0, 20.0, 10.0, 50.0),
            recipe("b", 800.0, 45.0, 25.0, 90.0),
        ];
        let goals = weekly_goals();
        let locked = MacroProfile {
            kcal: 1500.0,
            protein: 60.0,
            fat: 40.0,
            carbs: 120.0,
        };

        let assignments = allocate(&free, &pool, &goals, &locked);
        assert_eq!(assignments.len(), free.len());

        let mut running = locked;
        for (k, assignment) in assignments.iter().enumerate() {
            let expected = remaining_target(&goals, &running, free.len() - k);
            assert!((assignment.target.kcal - expected.kcal).abs() < 1e-9);
            assert!((assignment.target.protein - expected.protein).abs() < 1e-9);
            assert!((assignment.target.fat - expected.fat).abs() < 1e-9);
            assert!((assignment.target.carbs - expected.carbs).abs() < 1e-9);
            running.add(&assignment.macros);
        }
    }

    #[test]
    fn test_allocate_ties_resolve_to_first_candidate_smallest_serving() {
        let free = week_slots(date(1), 3);
        let first = recipe("zero-a", 0.0, 0.0, 0.0, 0.0);
        let pool = vec![first.clone(), recipe("zero-b", 0.0, 0.0, 0.0, 0.0)];
        let goals = MacroProfile::default();

        let assignments = allocate(&free, &pool, &goals, &MacroProfile::default());
        for assignment in &assignments {
            assert_eq!(assignment.recipe_id, first.id);
            assert_eq!(assignment.servings, SERVING_STEPS[0]);
        }
    }

    #[test]
    fn test_allocate_compensates_for_locked_overshoot() {
        // Locked entries already exceed the weekly kcal goal, so the
        // remaining target turns negative and the smallest serving of the
        // lighter recipe wins every slot.
        let free = vec![SlotId { date: date(1), slot: MealSlot::Lunch }];
        let pool = vec![
            recipe("heavy", 900.0, 50.0, 30.0, 100.0),
            recipe("light", 100.0, 5.0, 2.0, 10.0),
        ];
        let locked = MacroProfile {
            kcal: 15000.0,
            protein: 750.0,
            fat: 400.0,
            carbs: 1800.0,
        };

        let assignments = allocate(&free, &pool, &weekly_goals(), &locked);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].servings, 0.5);
        assert_eq!(assignments[0].macros.kcal, 50.0);
    }

    fn assignment(
        day: u32,
        slot: MealSlot,
        kcal: f64,
        target_kcal: f64,
    ) -> Assignment {
        Assignment {
            slot: SlotId { date: date(day), slot },
            recipe_id: Uuid::new_v4(),
            servings: 1.0,
            macros: MacroProfile { kcal, ..MacroProfile::default() },
            target: MacroProfile { kcal: target_kcal, ..MacroProfile::default() },
        }
    }

    fn pair_objective(assignments: &[Assignment]) -> f64 {
        assignments
            .iter()
            .map(|a| macro_distance(&a.macros, &a.target))
            .sum()
    }

    #[test]
    fn test_refine_keeps_improving_swap() {
        // Slot 0 wants 500 kcal but holds 1000; slot 1 wants 1000 but
        // holds 500. Swapping zeroes both distances.
        let before = vec![
            assignment(1, MealSlot::Breakfast, 1000.0, 500.0),
            assignment(1, MealSlot::Lunch, 500.0, 1000.0),
        ];
        let heavy = before[0].recipe_id;
        let light = before[1].recipe_id;

        let refined = refine(before);
        assert_eq!(refined[0].recipe_id, light);
        assert_eq!(refined[1].recipe_id, heavy);
        assert_eq!(refined[0].macros.kcal, 500.0);
        assert_eq!(refined[1].macros.kcal, 1000.0);
        // Slots themselves never move
        assert_eq!(refined[0].slot.slot, MealSlot::Breakfast);
        assert!(pair_objective(&refined) < 1e-12);
    }

    #[test]
    fn test_refine_reverts_non_improving_swap() {
        let before = vec![
            assignment(1, MealSlot::Breakfast, 500.0, 500.0),
            assignment(1, MealSlot::Lunch, 1000.0, 1000.0),
        ];
        let refined = refine(before.clone());
        assert_eq!(refined, before);
    }

    #[test]
    fn test_refine_one_swap_per_outer_index() {
        // Both j=1 and j=2 would improve i=0; only the first swap is kept
        // before the scan advances to the next outer index.
        let before = vec![
            assignment(1, MealSlot::Breakfast, 1000.0, 500.0),
            assignment(1, MealSlot::Lunch, 500.0, 1000.0),
            assignment(1, MealSlot::Dinner, 500.0, 1000.0),
        ];
        let ids: Vec<Uuid> = before.iter().map(|a| a.recipe_id).collect();

        let refined = refine(before);
        assert_eq!(refined[0].recipe_id, ids[1]);
        assert_eq!(refined[1].recipe_id, ids[0]);
        assert_eq!(refined[2].recipe_id, ids[2]);
    }

    #[test]
    fn test_refine_never_worsens_objective() {
        let before = vec![
            assignment(1, MealSlot::Breakfast, 700.0, 600.0),
            assignment(1, MealSlot::Lunch, 400.0, 650.0),
            assignment(2, MealSlot::Breakfast, 900.0, 550.0),
            assignment(2, MealSlot::Lunch, 300.0, 700.0),
        ];
        let objective_before = pair_objective(&before);
        let refined = refine(before);
        assert!(pair_objective(&refined) <= objective_before + 1e-12);
    }

    #[test]
    fn test_refine_handles_tiny_inputs() {
        assert!(refine(Vec::new()).is_empty());
        let single = vec![assignment(1, MealSlot::Breakfast, 500.0, 500.0)];
        assert_eq!(refine(single.clone()), single);
    }
}
