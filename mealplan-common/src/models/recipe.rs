use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{slug::slugify, time, uuid_utils};

/// A recipe ingredient line
///
/// `id` only identifies the row (and deduplicates ingredients when several
/// recipes are combined into one shopping list); quantity is free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub quantity: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            id: uuid_utils::generate_id(),
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Slug of `name` at the time the recipe was last written
    pub id: String,
    pub name: String,
    pub instructions: String,
    pub ingredients: Vec<Ingredient>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        ingredients: Vec<Ingredient>,
    ) -> Self {
        let name = name.into();
        let now = time::now();
        Self {
            id: slugify(&name),
            name,
            instructions: instructions.into(),
            ingredients,
            created_at: now,
            updated_at: now,
        }
    }

    /// Storage key derived from the current name
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// True when the name was edited since the recipe was stored under `id`
    pub fn is_renamed(&self) -> bool {
        self.id != self.slug()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recipe_id_is_slug() {
        let recipe = Recipe::new("Pasta Carbonara", "Boil pasta", vec![]);
        assert_eq!(recipe.id, "pasta_carbonara");
        assert_eq!(recipe.created_at, recipe.updated_at);
        assert!(!recipe.is_renamed());
    }

    #[test]
    fn test_rename_is_detected() {
        let mut recipe = Recipe::new("Tacos", "", vec![]);
        recipe.name = "Fish Tacos".to_string();
        assert!(recipe.is_renamed());
        assert_eq!(recipe.slug(), "fish_tacos");
    }

    #[test]
    fn test_ingredient_ids_are_unique() {
        let a = Ingredient::new("Eggs", "3");
        let b = Ingredient::new("Eggs", "3");
        assert_ne!(a.id, b.id);
    }
}
