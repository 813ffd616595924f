//! Name-derived document identifiers
//!
//! Recipes and grocery items are keyed by a slug of their name, so two
//! entries with the same name (ignoring case and surrounding whitespace)
//! land on the same document.

/// Derive the storage key for a name
///
/// Lower-cases, trims, and replaces whitespace with `_`. `/` is also
/// replaced since it separates path segments in collection paths.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_lowercases_and_replaces_spaces() {
        assert_eq!(slugify("Pasta Carbonara"), "pasta_carbonara");
    }

    #[test]
    fn test_slug_trims_surrounding_whitespace() {
        assert_eq!(slugify("  Milk "), "milk");
    }

    #[test]
    fn test_slug_is_deterministic_for_case_variants() {
        assert_eq!(slugify("Green Onions"), slugify("green onions"));
    }

    #[test]
    fn test_slug_replaces_path_separator() {
        assert_eq!(slugify("Salt/Pepper"), "salt_pepper");
    }
}
