use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{slug::slugify, time};

/// Store aisle a grocery item is filed under
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum GroceryCategory {
    Produce,
    MeatAndSeafood,
    DairyAndEggs,
    Bakery,
    Frozen,
    Pantry,
    CannedGoods,
    PastaAndGrains,
    CondimentsAndSauces,
    SpicesAndSeasonings,
    Snacks,
    Beverages,
    BreakfastAndCereal,
    Deli,
    Household,
    #[default]
    Other,
}

impl GroceryCategory {
    /// All categories in display order
    pub const ALL: [GroceryCategory; 16] = [
        GroceryCategory::Produce,
        GroceryCategory::MeatAndSeafood,
        GroceryCategory::DairyAndEggs,
        GroceryCategory::Bakery,
        GroceryCategory::Frozen,
        GroceryCategory::Pantry,
        GroceryCategory::CannedGoods,
        GroceryCategory::PastaAndGrains,
        GroceryCategory::CondimentsAndSauces,
        GroceryCategory::SpicesAndSeasonings,
        GroceryCategory::Snacks,
        GroceryCategory::Beverages,
        GroceryCategory::BreakfastAndCereal,
        GroceryCategory::Deli,
        GroceryCategory::Household,
        GroceryCategory::Other,
    ];

    /// Stored/displayed label
    pub fn label(self) -> &'static str {
        match self {
            GroceryCategory::Produce => "Produce",
            GroceryCategory::MeatAndSeafood => "Meat & Seafood",
            GroceryCategory::DairyAndEggs => "Dairy & Eggs",
            GroceryCategory::Bakery => "Bakery",
            GroceryCategory::Frozen => "Frozen",
            GroceryCategory::Pantry => "Pantry",
            GroceryCategory::CannedGoods => "Canned Goods",
            GroceryCategory::PastaAndGrains => "Pasta & Grains",
            GroceryCategory::CondimentsAndSauces => "Condiments & Sauces",
            GroceryCategory::SpicesAndSeasonings => "Spices & Seasonings",
            GroceryCategory::Snacks => "Snacks",
            GroceryCategory::Beverages => "Beverages",
            GroceryCategory::BreakfastAndCereal => "Breakfast & Cereal",
            GroceryCategory::Deli => "Deli",
            GroceryCategory::Household => "Household",
            GroceryCategory::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.label() == label)
    }

    /// Map an optional stored label; missing or unknown labels become `Other`
    pub fn from_stored(label: Option<&str>) -> Self {
        label.and_then(Self::from_label).unwrap_or_default()
    }
}

impl fmt::Display for GroceryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    /// Slug of `name`; items with the same name merge into one document
    pub id: String,
    pub name: String,
    pub quantity: Option<String>,
    pub is_checked: bool,
    pub category: GroceryCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroceryItem {
    pub fn new(name: impl Into<String>, quantity: Option<String>) -> Self {
        let name = name.into();
        let now = time::now();
        Self {
            id: slugify(&name),
            name,
            quantity,
            is_checked: false,
            category: GroceryCategory::Other,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_category(mut self, category: GroceryCategory) -> Self {
        self.category = category;
        self
    }

    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    pub fn is_renamed(&self) -> bool {
        self.id != self.slug()
    }
}
