//! Collection namespaces
//!
//! All three collections live under one base path: a shared household, the
//! signed-in user, or `users/unknown` when neither is available.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionScope {
    Household(String),
    User(String),
    UnknownUser,
}

impl CollectionScope {
    /// Household key wins over the user id
    pub fn resolve(household_key: Option<String>, user_id: Option<String>) -> Self {
        match (household_key, user_id) {
            (Some(key), _) => CollectionScope::Household(key),
            (None, Some(uid)) => CollectionScope::User(uid),
            (None, None) => CollectionScope::UnknownUser,
        }
    }

    pub fn base_path(&self) -> String {
        match self {
            CollectionScope::Household(key) => format!("households/{}", key),
            CollectionScope::User(uid) => format!("users/{}", uid),
            CollectionScope::UnknownUser => "users/unknown".to_string(),
        }
    }

    pub fn collection_path(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_path(), collection.name())
    }
}

impl fmt::Display for CollectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Recipes,
    Groceries,
    WeeklyPlans,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Recipes => "recipes",
            Collection::Groceries => "groceries",
            Collection::WeeklyPlans => "weeklyPlans",
        }
    }

    /// Used in user-facing messages
    pub fn label(self) -> &'static str {
        match self {
            Collection::Recipes => "recipes",
            Collection::Groceries => "grocery items",
            Collection::WeeklyPlans => "weekly plans",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_household_takes_priority() {
        let scope = CollectionScope::resolve(Some("fam".into()), Some("u1".into()));
        assert_eq!(scope.collection_path(Collection::Recipes), "households/fam/recipes");
    }

    #[test]
    fn test_user_and_unknown_paths() {
        let user = CollectionScope::resolve(None, Some("u1".into()));
        assert_eq!(user.collection_path(Collection::WeeklyPlans), "users/u1/weeklyPlans");

        let unknown = CollectionScope::resolve(None, None);
        assert_eq!(unknown.collection_path(Collection::Groceries), "users/unknown/groceries");
    }
}
