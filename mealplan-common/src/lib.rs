//! # Meal Planner Common Library
//!
//! Shared code for the meal planner crates including:
//! - Domain models (recipes, weekly plans, grocery items)
//! - Document value model and the document mapper
//! - Event types (MealPlanEvent enum) and EventBus
//! - Configuration loading
//! - Utility functions (slugs, week arithmetic, ids)

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod mapper;
pub mod models;
pub mod slug;
pub mod time;
pub mod uuid_utils;

pub use document::{Document, Fields, Timestamp, Value};
pub use error::{Error, Result};
pub use models::{
    DayOfWeek, GroceryCategory, GroceryItem, Ingredient, PlannedMeal, Recipe, WeeklyPlan,
};
