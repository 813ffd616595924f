//! Grocery item categorization
//!
//! A [`Categorizer`] wraps an optional text classifier loaded once at
//! startup. Each phrase is trimmed and lower-cased before classification;
//! a prediction is used only when its confidence reaches the threshold,
//! otherwise the item is filed under "Other".
//!
//! The bundled classifier is [`KeywordModel`], a small lexicon of keywords
//! per aisle scored with Jaro-Winkler similarity.

use mealplan_common::config::DEFAULT_CATEGORY_THRESHOLD;
use mealplan_common::{Error, GroceryCategory, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Label returned whenever no confident prediction is available
pub const FALLBACK_LABEL: &str = "Other";

/// Single best label for a phrase
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// In [0, 1]
    pub confidence: f64,
}

pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Option<Prediction>;
}

pub struct Categorizer {
    model: Option<Box<dyn TextClassifier>>,
    threshold: f64,
}

impl Categorizer {
    pub fn new(model: Option<Box<dyn TextClassifier>>, threshold: f64) -> Self {
        Self { model, threshold }
    }

    /// Load the keyword model from `model_path`, or the built-in lexicon
    ///
    /// A model that fails to load is logged and left out; every phrase then
    /// categorizes as "Other".
    pub fn load(model_path: Option<&Path>, threshold: f64) -> Self {
        let model = match model_path {
            Some(path) => match KeywordModel::from_file(path) {
                Ok(model) => {
                    info!(
                        "Loaded categorizer model {} ({} keywords)",
                        path.display(),
                        model.keyword_count()
                    );
                    Some(model)
                }
                Err(e) => {
                    warn!("Failed to load categorizer model {}: {}", path.display(), e);
                    None
                }
            },
            None => match KeywordModel::builtin() {
                Ok(model) => Some(model),
                Err(e) => {
                    warn!("Failed to load built-in categorizer model: {}", e);
                    None
                }
            },
        };

        Self::new(
            model.map(|m| Box::new(m) as Box<dyn TextClassifier>),
            threshold,
        )
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Category label for `phrase` at the configured threshold
    pub fn category(&self, phrase: &str) -> String {
        self.category_with_threshold(phrase, self.threshold)
    }

    pub fn category_with_threshold(&self, phrase: &str, threshold: f64) -> String {
        let Some(model) = &self.model else {
            return FALLBACK_LABEL.to_string();
        };

        let text = phrase.trim().to_lowercase();
        match model.classify(&text) {
            Some(prediction) if prediction.confidence >= threshold => {
                debug!(
                    "Categorized '{}' as {} ({:.2})",
                    text, prediction.label, prediction.confidence
                );
                prediction.label
            }
            Some(prediction) => {
                debug!(
                    "Low confidence for '{}': {} ({:.2} < {:.2})",
                    text, prediction.label, prediction.confidence, threshold
                );
                FALLBACK_LABEL.to_string()
            }
            None => FALLBACK_LABEL.to_string(),
        }
    }

    /// Like [`category`](Self::category), mapped onto the closed category set
    pub fn grocery_category(&self, phrase: &str) -> GroceryCategory {
        GroceryCategory::from_stored(Some(self.category(phrase).as_str()))
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::load(None, DEFAULT_CATEGORY_THRESHOLD)
    }
}

// ============================================================================
// Keyword model
// ============================================================================

const BUILTIN_LEXICON: &str = r#"
[labels]
"Produce" = ["apple", "banana", "orange", "lemon", "lime", "grape", "strawberry", "blueberry",
    "avocado", "tomato", "potato", "onion", "garlic", "carrot", "celery", "lettuce", "spinach",
    "broccoli", "cucumber", "pepper", "zucchini", "mushroom", "cilantro", "parsley", "ginger"]
"Meat & Seafood" = ["chicken", "beef", "pork", "bacon", "sausage", "turkey", "lamb", "steak",
    "salmon", "shrimp", "tuna", "cod", "fish", "mince"]
"Dairy & Eggs" = ["milk", "cheese", "butter", "yogurt", "cream", "egg", "eggs", "parmesan",
    "mozzarella", "cheddar"]
"Bakery" = ["bread", "bagel", "baguette", "croissant", "muffin", "tortilla", "bun", "roll",
    "pita"]
"Frozen" = ["frozen", "ice cream", "peas", "waffles"]
"Pantry" = ["flour", "sugar", "oil", "vinegar", "honey", "yeast", "baking soda", "stock",
    "broth", "peanut butter", "jam"]
"Canned Goods" = ["beans", "chickpeas", "canned", "corn", "tomato paste", "coconut milk"]
"Pasta & Grains" = ["pasta", "spaghetti", "penne", "noodles", "rice", "quinoa", "couscous",
    "oats", "lasagna"]
"Condiments & Sauces" = ["ketchup", "mustard", "mayonnaise", "salsa", "soy sauce", "sauce",
    "dressing", "pesto", "hot sauce"]
"Spices & Seasonings" = ["salt", "cumin", "paprika", "cinnamon", "oregano", "basil", "thyme",
    "chili", "curry", "nutmeg", "vanilla"]
"Snacks" = ["chips", "crackers", "cookies", "popcorn", "pretzels", "nuts", "chocolate"]
"Beverages" = ["coffee", "tea", "juice", "soda", "water", "wine", "beer", "lemonade"]
"Breakfast & Cereal" = ["cereal", "granola", "oatmeal", "pancake", "syrup"]
"Deli" = ["ham", "salami", "hummus", "prosciutto", "pastrami"]
"Household" = ["paper towels", "toilet paper", "detergent", "soap", "sponge", "foil",
    "trash bags", "napkins", "batteries", "light bulbs", "motor oil", "dog food", "cat food"]
"#;

#[derive(Debug, Deserialize)]
struct LexiconFile {
    labels: BTreeMap<String, Vec<String>>,
}

/// Similarity below which a keyword does not count as a match
const MATCH_FLOOR: f64 = 0.85;

/// Lexicon classifier
///
/// Each keyword is compared with Jaro-Winkler similarity against the whole
/// phrase, each word (and its singular form) and each pair of adjacent
/// words. Scores under [`MATCH_FLOOR`] are not matches; the best match is
/// rescaled so the floor maps to 0 and an exact hit to 1. Ties go to the
/// longer keyword.
#[derive(Debug, Clone)]
pub struct KeywordModel {
    keywords: Vec<(String, String)>,
}

impl KeywordModel {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let lexicon: LexiconFile =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        let keywords: Vec<(String, String)> = lexicon
            .labels
            .into_iter()
            .flat_map(|(label, words)| {
                words
                    .into_iter()
                    .map(move |word| (word.trim().to_lowercase(), label.clone()))
            })
            .filter(|(word, _)| !word.is_empty())
            .collect();

        if keywords.is_empty() {
            return Err(Error::Config("lexicon has no keywords".to_string()));
        }
        Ok(Self { keywords })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_LEXICON)
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

/// Word forms tried against the lexicon: as written, then without a
/// trailing "s" or "es"
fn word_forms(word: &str) -> Vec<&str> {
    let mut forms = vec![word];
    for suffix in ["es", "s"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.len() >= 3 {
                forms.push(stem);
            }
        }
    }
    forms
}

impl TextClassifier for KeywordModel {
    fn classify(&self, text: &str) -> Option<Prediction> {
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        if words.is_empty() {
            return None;
        }

        let mut candidates: Vec<String> = vec![words.join(" ")];
        for word in &words {
            candidates.extend(word_forms(word).into_iter().map(str::to_string));
        }
        for pair in words.windows(2) {
            let joined = pair.join(" ");
            candidates.extend(word_forms(&joined).into_iter().map(str::to_string));
        }

        let mut best: Option<(f64, &str, &str)> = None;
        for (keyword, label) in &self.keywords {
            let score = candidates
                .iter()
                .map(|candidate| strsim::jaro_winkler(candidate, keyword))
                .fold(0.0, f64::max);
            if score < MATCH_FLOOR {
                continue;
            }

            let better = match best {
                Some((current, current_keyword, _)) => {
                    score > current
                        || (score == current && keyword.len() > current_keyword.len())
                }
                None => true,
            };
            if better {
                best = Some((score, keyword.as_str(), label.as_str()));
            }
        }

        best.map(|(score, _, label)| Prediction {
            label: label.to_string(),
            confidence: ((score - MATCH_FLOOR) / (1.0 - MATCH_FLOOR)).clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns a fixed prediction and records what it was asked
    struct FixedClassifier {
        prediction: Option<Prediction>,
        seen: Mutex<Vec<String>>,
    }

    impl FixedClassifier {
        fn new(label: &str, confidence: f64) -> Self {
            Self {
                prediction: Some(Prediction {
                    label: label.to_string(),
                    confidence,
                }),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextClassifier for std::sync::Arc<FixedClassifier> {
        fn classify(&self, text: &str) -> Option<Prediction> {
            self.seen.lock().unwrap().push(text.to_string());
            self.prediction.clone()
        }
    }

    #[test]
    fn test_confident_prediction_respects_threshold() {
        let classifier = std::sync::Arc::new(FixedClassifier::new("Produce", 0.95));
        let categorizer = Categorizer::new(Some(Box::new(classifier.clone())), 0.6);

        assert_eq!(categorizer.category_with_threshold("  Bananas ", 0.9), "Produce");
        assert_eq!(categorizer.category_with_threshold("  Bananas ", 0.99), "Other");

        // phrase reaches the classifier trimmed and lower-cased
        assert_eq!(classifier.seen.lock().unwrap()[0], "bananas");
    }

    #[test]
    fn test_no_model_falls_back_to_other() {
        let categorizer = Categorizer::new(None, 0.0);
        assert_eq!(categorizer.category("milk"), "Other");
        assert_eq!(categorizer.grocery_category("milk"), GroceryCategory::Other);
    }

    #[test]
    fn test_no_prediction_falls_back_to_other() {
        struct Silent;
        impl TextClassifier for Silent {
            fn classify(&self, _text: &str) -> Option<Prediction> {
                None
            }
        }
        let categorizer = Categorizer::new(Some(Box::new(Silent)), 0.1);
        assert_eq!(categorizer.category("anything"), "Other");
    }

    #[test]
    fn test_missing_model_file_leaves_no_model() {
        let categorizer = Categorizer::load(Some(Path::new("/nonexistent/lexicon.toml")), 0.6);
        assert!(!categorizer.has_model());
        assert_eq!(categorizer.category("Bananas"), "Other");
    }

    #[test]
    fn test_builtin_lexicon_categorizes_common_items() {
        let categorizer = Categorizer::default();
        assert!(categorizer.has_model());
        assert_eq!(categorizer.category("  Bananas "), "Produce");
        assert_eq!(categorizer.category("Whole milk"), "Dairy & Eggs");
        assert_eq!(categorizer.grocery_category("Spaghetti"), GroceryCategory::PastaAndGrains);
    }

    #[test]
    fn test_custom_lexicon_from_toml() {
        let model = KeywordModel::from_toml_str(
            r#"
            [labels]
            "Snacks" = ["Pretzels"]
            "#,
        )
        .unwrap();
        assert_eq!(model.keyword_count(), 1);

        let prediction = model.classify("pretzels").unwrap();
        assert_eq!(prediction.label, "Snacks");
        assert!((prediction.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unrelated_phrases_fall_back_to_other() {
        let categorizer = Categorizer::default();
        for phrase in ["xylophone", "aluminum", "sandpaper", "printer ink"] {
            assert_eq!(categorizer.category(phrase), "Other", "phrase {}", phrase);
        }
    }

    #[test]
    fn test_plurals_and_multi_word_keywords_match() {
        let categorizer = Categorizer::default();
        assert_eq!(categorizer.category("Tomatoes"), "Produce");
        assert_eq!(categorizer.category("vanilla ice cream"), "Frozen");
        assert_eq!(categorizer.category("Motor oil"), "Household");
    }

    #[test]
    fn test_weak_similarity_is_not_a_match() {
        let model = KeywordModel::from_toml_str(
            r#"
            [labels]
            "Produce" = ["banana"]
            "#,
        )
        .unwrap();
        assert!(model.classify("banjo").is_none());
        assert!(model.classify("cabbage").is_none());

        // a partial match is a prediction, but not a confident one
        let categorizer = Categorizer::new(Some(Box::new(model)), 0.6);
        assert_eq!(categorizer.category("bananarama"), "Other");
    }

    #[test]
    fn test_empty_lexicon_rejected() {
        assert!(KeywordModel::from_toml_str("[labels]\n").is_err());
    }
}
