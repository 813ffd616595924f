use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Recipe;
use crate::time;

/// Day of a Monday-based week
///
/// Stored under its English name (case-sensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }

    /// Exact-match parse of a stored day name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|day| day.as_str() == name)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is planned for a day
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlannedMeal {
    Recipe { id: String },
    Leftovers,
    Takeout,
}

/// Reserved tokens for the non-recipe meals. Anything else is a recipe id.
const MEAL_TOKENS: [(&str, PlannedMeal); 2] = [
    ("leftovers", PlannedMeal::Leftovers),
    ("takeout", PlannedMeal::Takeout),
];

impl PlannedMeal {
    pub fn recipe(id: impl Into<String>) -> Self {
        PlannedMeal::Recipe { id: id.into() }
    }

    /// True when `token` decodes to a non-recipe meal
    ///
    /// A recipe stored under such an id could not be told apart from
    /// leftovers or takeout once planned.
    pub fn is_reserved_token(token: &str) -> bool {
        MEAL_TOKENS.iter().any(|(reserved, _)| *reserved == token)
    }

    /// Decode a stored meal token
    pub fn from_token(token: &str) -> Self {
        MEAL_TOKENS
            .iter()
            .find(|(reserved, _)| *reserved == token)
            .map(|(_, meal)| meal.clone())
            .unwrap_or_else(|| PlannedMeal::recipe(token))
    }

    /// Encode as a stored meal token
    pub fn to_token(&self) -> String {
        match self {
            PlannedMeal::Recipe { id } => id.clone(),
            other => MEAL_TOKENS
                .iter()
                .find(|(_, meal)| meal == other)
                .map(|(token, _)| (*token).to_string())
                .unwrap_or_default(),
        }
    }

    /// Human-readable text, resolving recipe ids against `recipes`
    pub fn display_text(&self, recipes: &[Recipe]) -> String {
        match self {
            PlannedMeal::Recipe { id } => recipes
                .iter()
                .find(|recipe| &recipe.id == id)
                .map(|recipe| recipe.name.clone())
                .unwrap_or_else(|| "Unknown recipe".to_string()),
            PlannedMeal::Leftovers => "Leftovers".to_string(),
            PlannedMeal::Takeout => "Takeout".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    pub id: String,
    /// Monday 00:00 UTC of the planned week
    pub week_of: DateTime<Utc>,
    pub meals: BTreeMap<DayOfWeek, PlannedMeal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklyPlan {
    /// Empty plan for the week containing `date`
    pub fn new(date: DateTime<Utc>) -> Self {
        let week_of = time::start_of_week(date);
        let now = time::now();
        Self {
            id: Self::id_for_week(week_of),
            week_of,
            meals: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn for_current_week() -> Self {
        Self::new(time::now())
    }

    /// Plans are keyed by their week so saving the same week twice lands
    /// on one document
    pub fn id_for_week(week_of: DateTime<Utc>) -> String {
        format!("week-{}", week_of.format("%Y-%m-%d"))
    }

    pub fn assign(&mut self, day: DayOfWeek, meal: PlannedMeal) {
        self.meals.insert(day, meal);
    }

    pub fn clear(&mut self, day: DayOfWeek) -> Option<PlannedMeal> {
        self.meals.remove(&day)
    }

    /// Recipes planned this week, in `recipes` order, each at most once
    pub fn this_weeks_recipes(&self, recipes: &[Recipe]) -> Vec<Recipe> {
        recipes
            .iter()
            .filter(|recipe| {
                self.meals.values().any(|meal| match meal {
                    PlannedMeal::Recipe { id } => id == &recipe.id,
                    _ => false,
                })
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_meal_tokens_decode() {
        assert_eq!(PlannedMeal::from_token("leftovers"), PlannedMeal::Leftovers);
        assert_eq!(PlannedMeal::from_token("takeout"), PlannedMeal::Takeout);
        assert_eq!(
            PlannedMeal::from_token("recipe_pasta"),
            PlannedMeal::recipe("recipe_pasta")
        );
    }

    #[test]
    fn test_meal_tokens_are_case_sensitive() {
        assert_eq!(PlannedMeal::from_token("Takeout"), PlannedMeal::recipe("Takeout"));
    }

    #[test]
    fn test_meal_token_encoding_preserves_three_way_distinction() {
        for meal in [
            PlannedMeal::Leftovers,
            PlannedMeal::Takeout,
            PlannedMeal::recipe("chili"),
        ] {
            assert_eq!(PlannedMeal::from_token(&meal.to_token()), meal);
        }
    }

    #[test]
    fn test_reserved_tokens_cannot_be_recipe_slugs() {
        assert!(PlannedMeal::is_reserved_token(&Recipe::new("Leftovers", "", vec![]).slug()));
        assert!(PlannedMeal::is_reserved_token(&Recipe::new(" TAKEOUT ", "", vec![]).slug()));
        assert!(!PlannedMeal::is_reserved_token(&Recipe::new("Leftover Pie", "", vec![]).slug()));
    }

    #[test]
    fn test_day_names_parse_exactly() {
        assert_eq!(DayOfWeek::from_name("Wednesday"), Some(DayOfWeek::Wednesday));
        assert_eq!(DayOfWeek::from_name("wednesday"), None);
        assert_eq!(DayOfWeek::from_name("funday"), None);
    }

    #[test]
    fn test_plan_id_and_week_of_derive_from_week() {
        let thursday = Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap();
        let plan = WeeklyPlan::new(thursday);
        assert_eq!(plan.week_of, Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap());
        assert_eq!(plan.id, "week-2026-10-12");
    }

    #[test]
    fn test_this_weeks_recipes_skips_non_recipe_meals() {
        let pasta = Recipe::new("Pasta", "", vec![]);
        let soup = Recipe::new("Soup", "", vec![]);
        let mut plan = WeeklyPlan::for_current_week();
        plan.assign(DayOfWeek::Monday, PlannedMeal::recipe("pasta"));
        plan.assign(DayOfWeek::Tuesday, PlannedMeal::Takeout);
        plan.assign(DayOfWeek::Friday, PlannedMeal::recipe("pasta"));

        let planned = plan.this_weeks_recipes(&[pasta.clone(), soup]);
        assert_eq!(planned, vec![pasta]);
    }

    #[test]
    fn test_display_text() {
        let recipes = vec![Recipe::new("Beef Stew", "", vec![])];
        assert_eq!(PlannedMeal::recipe("beef_stew").display_text(&recipes), "Beef Stew");
        assert_eq!(PlannedMeal::recipe("gone").display_text(&recipes), "Unknown recipe");
        assert_eq!(PlannedMeal::Leftovers.display_text(&recipes), "Leftovers");
    }
}
