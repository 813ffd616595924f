//! Domain models
//!
//! Plain in-memory entities. The database owns the data; these are the
//! cached, strongly-typed view of its documents.

mod grocery;
mod recipe;
mod weekly_plan;

pub use grocery::{GroceryCategory, GroceryItem};
pub use recipe::{Ingredient, Recipe};
pub use weekly_plan::{DayOfWeek, PlannedMeal, WeeklyPlan};
