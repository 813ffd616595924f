//! Meal planner application layer
//!
//! - categorizer: files grocery items into store aisles
//! - state: observable application state driven by live listeners
//! - bootstrap: wires config, database, auth and categorizer together

pub mod bootstrap;
pub mod categorizer;
pub mod state;

pub use bootstrap::{build_app, AppOptions};
pub use categorizer::{Categorizer, KeywordModel, Prediction, TextClassifier};
pub use state::{AppDataStore, AppSnapshot};
