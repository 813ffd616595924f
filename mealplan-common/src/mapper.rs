//! Document mapper
//!
//! Converts raw documents into [`Recipe`], [`WeeklyPlan`] and [`GroceryItem`]
//! and back.
//!
//! Decoding never fails loudly: a missing or wrong-typed required field
//! yields `None` and the caller drops the document. Recipe ingredients are
//! decoded individually, so one malformed ingredient only loses that line.
//! Encoding is a plain field-by-field projection with dates written as
//! database [`Timestamp`]s.

use std::collections::BTreeMap;

use crate::document::{Document, Fields, Timestamp, Value};
use crate::models::{
    DayOfWeek, GroceryCategory, GroceryItem, Ingredient, PlannedMeal, Recipe, WeeklyPlan,
};

/// Persisted field names
pub mod fields {
    pub const NAME: &str = "name";
    pub const INSTRUCTIONS: &str = "instructions";
    pub const INGREDIENTS: &str = "ingredients";
    pub const ID: &str = "id";
    pub const QUANTITY: &str = "quantity";
    pub const WEEK_OF: &str = "weekOf";
    pub const MEALS: &str = "meals";
    pub const IS_CHECKED: &str = "isChecked";
    pub const CATEGORY: &str = "category";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

fn string_field(data: &Fields, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn date_field(data: &Fields, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    data.get(key).and_then(Value::as_date)
}

fn timestamp(date: chrono::DateTime<chrono::Utc>) -> Value {
    Value::Timestamp(Timestamp::from_datetime(date))
}

// ============================================================================
// Decoding
// ============================================================================

pub fn parse_ingredient(data: &Fields) -> Option<Ingredient> {
    Some(Ingredient {
        id: string_field(data, fields::ID)?,
        name: string_field(data, fields::NAME)?,
        quantity: string_field(data, fields::QUANTITY)?,
    })
}

pub fn parse_recipe(doc: &Document) -> Option<Recipe> {
    let data = &doc.fields;

    let name = string_field(data, fields::NAME)?;
    let instructions = string_field(data, fields::INSTRUCTIONS)?;
    let ingredient_values = data.get(fields::INGREDIENTS)?.as_array()?;
    let created_at = date_field(data, fields::CREATED_AT)?;
    let updated_at = date_field(data, fields::UPDATED_AT)?;

    let ingredients = ingredient_values
        .iter()
        .filter_map(Value::as_map)
        .filter_map(parse_ingredient)
        .collect();

    Some(Recipe {
        id: doc.id.clone(),
        name,
        instructions,
        ingredients,
        created_at,
        updated_at,
    })
}

pub fn parse_weekly_plan(doc: &Document) -> Option<WeeklyPlan> {
    let data = &doc.fields;

    let week_of = data.get(fields::WEEK_OF)?.as_timestamp()?.to_datetime()?;
    let raw_meals = data.get(fields::MEALS)?.as_map()?;
    let created_at = date_field(data, fields::CREATED_AT)?;
    let updated_at = date_field(data, fields::UPDATED_AT)?;

    // Every value must be a string token, otherwise the map is not a meal map
    let tokens = raw_meals
        .iter()
        .map(|(day, value)| value.as_str().map(|token| (day.as_str(), token)))
        .collect::<Option<Vec<_>>>()?;

    let meals = tokens
        .into_iter()
        .filter_map(|(day, token)| {
            DayOfWeek::from_name(day).map(|day| (day, PlannedMeal::from_token(token)))
        })
        .collect();

    Some(WeeklyPlan {
        id: doc.id.clone(),
        week_of,
        meals,
        created_at,
        updated_at,
    })
}

pub fn parse_grocery_item(doc: &Document) -> Option<GroceryItem> {
    let data = &doc.fields;

    let name = string_field(data, fields::NAME)?;
    let is_checked = data.get(fields::IS_CHECKED)?.as_bool()?;
    let created_at = date_field(data, fields::CREATED_AT)?;
    let updated_at = date_field(data, fields::UPDATED_AT)?;

    let quantity = string_field(data, fields::QUANTITY);
    let category = data.get(fields::CATEGORY).and_then(Value::as_str);

    Some(GroceryItem {
        id: doc.id.clone(),
        name,
        quantity,
        is_checked,
        category: GroceryCategory::from_stored(category),
        created_at,
        updated_at,
    })
}

// ============================================================================
// Encoding
// ============================================================================

pub fn encode_ingredient(ingredient: &Ingredient) -> Value {
    let mut data = Fields::new();
    data.insert(fields::ID.into(), ingredient.id.as_str().into());
    data.insert(fields::NAME.into(), ingredient.name.as_str().into());
    data.insert(fields::QUANTITY.into(), ingredient.quantity.as_str().into());
    Value::Map(data)
}

pub fn encode_recipe(recipe: &Recipe) -> Fields {
    let mut data = Fields::new();
    data.insert(fields::NAME.into(), recipe.name.as_str().into());
    data.insert(fields::INSTRUCTIONS.into(), recipe.instructions.as_str().into());
    data.insert(
        fields::INGREDIENTS.into(),
        Value::Array(recipe.ingredients.iter().map(encode_ingredient).collect()),
    );
    data.insert(fields::CREATED_AT.into(), timestamp(recipe.created_at));
    data.insert(fields::UPDATED_AT.into(), timestamp(recipe.updated_at));
    data
}

pub fn encode_meals(meals: &BTreeMap<DayOfWeek, PlannedMeal>) -> Fields {
    meals
        .iter()
        .map(|(day, meal)| (day.as_str().to_string(), Value::String(meal.to_token())))
        .collect()
}

pub fn encode_weekly_plan(plan: &WeeklyPlan) -> Fields {
    let mut data = Fields::new();
    data.insert(fields::WEEK_OF.into(), timestamp(plan.week_of));
    data.insert(fields::MEALS.into(), Value::Map(encode_meals(&plan.meals)));
    data.insert(fields::CREATED_AT.into(), timestamp(plan.created_at));
    data.insert(fields::UPDATED_AT.into(), timestamp(plan.updated_at));
    data
}

pub fn encode_grocery_item(item: &GroceryItem) -> Fields {
    let mut data = Fields::new();
    data.insert(fields::NAME.into(), item.name.as_str().into());
    data.insert(fields::IS_CHECKED.into(), item.is_checked.into());
    if let Some(quantity) = &item.quantity {
        data.insert(fields::QUANTITY.into(), quantity.as_str().into());
    }
    data.insert(fields::CATEGORY.into(), item.category.label().into());
    data.insert(fields::CREATED_AT.into(), timestamp(item.created_at));
    data.insert(fields::UPDATED_AT.into(), timestamp(item.updated_at));
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap()
    }

    fn ingredient(id: Option<&str>, name: Option<&str>, quantity: Option<&str>) -> Value {
        let mut fields = Fields::new();
        if let Some(id) = id {
            fields.insert("id".into(), id.into());
        }
        if let Some(name) = name {
            fields.insert("name".into(), name.into());
        }
        if let Some(quantity) = quantity {
            fields.insert("quantity".into(), quantity.into());
        }
        Value::Map(fields)
    }

    fn recipe_fields() -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), "Pasta Carbonara".into());
        fields.insert(
            "instructions".into(),
            "1. Boil pasta\n2. Cook bacon\n3. Mix with eggs".into(),
        );
        fields.insert(
            "ingredients".into(),
            Value::Array(vec![
                ingredient(Some("1"), Some("Pasta"), Some("1 lb")),
                ingredient(Some("2"), Some("Bacon"), Some("6 slices")),
                ingredient(Some("3"), Some("Eggs"), Some("3 large")),
            ]),
        );
        fields.insert("createdAt".into(), Value::Date(date()));
        fields.insert("updatedAt".into(), Value::Timestamp(date().into()));
        fields
    }

    fn plan_fields(meals: &[(&str, Value)]) -> Fields {
        let mut fields = Fields::new();
        fields.insert("weekOf".into(), Value::Timestamp(date().into()));
        fields.insert(
            "meals".into(),
            Value::Map(meals.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()),
        );
        fields.insert("createdAt".into(), Value::Timestamp(date().into()));
        fields.insert("updatedAt".into(), Value::Timestamp(date().into()));
        fields
    }

    fn grocery_fields() -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), "Milk".into());
        fields.insert("isChecked".into(), false.into());
        fields.insert("quantity".into(), "1 gal".into());
        fields.insert("category".into(), "Dairy & Eggs".into());
        fields.insert("createdAt".into(), Value::Timestamp(date().into()));
        fields.insert("updatedAt".into(), Value::Timestamp(date().into()));
        fields
    }

    #[test]
    fn test_parse_recipe_valid() {
        let doc = Document::new("pasta_carbonara", recipe_fields());
        let recipe = parse_recipe(&doc).expect("recipe should decode");
        assert_eq!(recipe.id, "pasta_carbonara");
        assert_eq!(recipe.name, "Pasta Carbonara");
        assert_eq!(recipe.ingredients.len(), 3);
        assert_eq!(recipe.ingredients[1].name, "Bacon");
        assert_eq!(recipe.created_at, date());
        assert_eq!(recipe.updated_at, date());
    }

    #[test]
    fn test_parse_recipe_missing_required_field() {
        for key in ["name", "instructions", "ingredients", "createdAt", "updatedAt"] {
            let mut fields = recipe_fields();
            fields.remove(key);
            assert!(
                parse_recipe(&Document::new("r", fields)).is_none(),
                "recipe without {} should not decode",
                key
            );
        }
    }

    #[test]
    fn test_parse_recipe_wrong_typed_field() {
        let wrong: [(&str, Value); 5] = [
            ("name", Value::Integer(123)),
            ("instructions", Value::Boolean(true)),
            ("ingredients", "eggs".into()),
            ("createdAt", "yesterday".into()),
            ("updatedAt", Value::Integer(0)),
        ];
        for (key, value) in wrong {
            let mut fields = recipe_fields();
            fields.insert(key.to_string(), value);
            assert!(
                parse_recipe(&Document::new("r", fields)).is_none(),
                "recipe with wrong-typed {} should not decode",
                key
            );
        }
    }

    #[test]
    fn test_parse_recipe_drops_invalid_ingredients() {
        let mut fields = recipe_fields();
        fields.insert(
            "ingredients".into(),
            Value::Array(vec![
                ingredient(Some("1"), Some("Valid Ingredient"), Some("1 cup")),
                ingredient(Some("2"), Some("Missing Quantity"), None),
                ingredient(None, Some("No ID"), Some("2 cups")),
                ingredient(Some("3"), None, Some("3 tbsp")),
                "not a map".into(),
            ]),
        );
        let recipe = parse_recipe(&Document::new("r", fields)).unwrap();
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.ingredients[0].name, "Valid Ingredient");
    }

    #[test]
    fn test_parse_recipe_empty_ingredients() {
        let mut fields = recipe_fields();
        fields.insert("ingredients".into(), Value::Array(vec![]));
        let recipe = parse_recipe(&Document::new("r", fields)).unwrap();
        assert!(recipe.ingredients.is_empty());
    }

    #[test]
    fn test_parse_weekly_plan_meal_tokens() {
        let doc = Document::new(
            "week-2026-10-12",
            plan_fields(&[
                ("Monday", "recipe_pasta".into()),
                ("Tuesday", "leftovers".into()),
                ("Wednesday", "takeout".into()),
            ]),
        );
        let plan = parse_weekly_plan(&doc).unwrap();
        assert_eq!(plan.meals.len(), 3);
        assert_eq!(plan.meals[&DayOfWeek::Monday], PlannedMeal::recipe("recipe_pasta"));
        assert_eq!(plan.meals[&DayOfWeek::Tuesday], PlannedMeal::Leftovers);
        assert_eq!(plan.meals[&DayOfWeek::Wednesday], PlannedMeal::Takeout);
        assert_eq!(plan.week_of, date());
    }

    #[test]
    fn test_parse_weekly_plan_drops_unknown_days() {
        let doc = Document::new(
            "w",
            plan_fields(&[
                ("Monday", "chili".into()),
                ("funday", "takeout".into()),
                ("friday", "takeout".into()),
            ]),
        );
        let plan = parse_weekly_plan(&doc).unwrap();
        assert_eq!(plan.meals.len(), 1);
        assert!(plan.meals.contains_key(&DayOfWeek::Monday));
    }

    #[test]
    fn test_parse_weekly_plan_requires_string_meal_values() {
        let doc = Document::new("w", plan_fields(&[("Monday", Value::Integer(7))]));
        assert!(parse_weekly_plan(&doc).is_none());
    }

    #[test]
    fn test_parse_weekly_plan_requires_timestamp_week_of() {
        let mut fields = plan_fields(&[]);
        fields.insert("weekOf".into(), Value::Date(date()));
        assert!(parse_weekly_plan(&Document::new("w", fields)).is_none());

        let mut fields = plan_fields(&[]);
        fields.remove("weekOf");
        assert!(parse_weekly_plan(&Document::new("w", fields)).is_none());
    }

    #[test]
    fn test_parse_grocery_item_optional_fields() {
        let mut fields = grocery_fields();
        fields.remove("quantity");
        fields.remove("category");
        let item = parse_grocery_item(&Document::new("milk", fields)).unwrap();
        assert_eq!(item.quantity, None);
        assert_eq!(item.category, GroceryCategory::Other);
        assert!(!item.is_checked);
    }

    #[test]
    fn test_parse_grocery_item_missing_required_field() {
        for key in ["name", "isChecked", "createdAt", "updatedAt"] {
            let mut fields = grocery_fields();
            fields.remove(key);
            assert!(
                parse_grocery_item(&Document::new("milk", fields)).is_none(),
                "grocery item without {} should not decode",
                key
            );
        }
    }

    #[test]
    fn test_recipe_round_trip() {
        let doc = Document::new("pasta_carbonara", recipe_fields());
        let recipe = parse_recipe(&doc).unwrap();
        let encoded = Document::new(recipe.id.clone(), encode_recipe(&recipe));
        assert_eq!(parse_recipe(&encoded), Some(recipe.clone()));
        // Dates are normalized to database timestamps on the way out
        assert_eq!(encoded.get("createdAt"), Some(&Value::Timestamp(date().into())));
    }

    #[test]
    fn test_weekly_plan_round_trip() {
        let doc = Document::new(
            "week-2026-10-12",
            plan_fields(&[("Monday", "chili".into()), ("Sunday", "leftovers".into())]),
        );
        let plan = parse_weekly_plan(&doc).unwrap();
        assert_eq!(encode_weekly_plan(&plan), doc.fields);
    }

    #[test]
    fn test_grocery_item_round_trip() {
        let doc = Document::new("milk", grocery_fields());
        let item = parse_grocery_item(&doc).unwrap();
        assert_eq!(encode_grocery_item(&item), doc.fields);
    }

    #[test]
    fn test_encode_grocery_item_omits_missing_quantity() {
        let item = GroceryItem::new("Bread", None);
        let fields = encode_grocery_item(&item);
        assert!(!fields.contains_key("quantity"));
        assert_eq!(fields.get("category"), Some(&Value::from("Other")));
    }
}
