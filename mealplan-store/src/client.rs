//! Typed access to the meal planner collections
//!
//! [`RemoteStore`] maps domain models to documents and back, writes them
//! under the resolved [`CollectionScope`], and exposes live observers.
//!
//! All writes are top-level merge writes keyed by the entity's derived id.
//! Recipes and grocery items are keyed by the slug of their name; an update
//! after a rename deletes the old document and writes the new one in a
//! single batch.

use crate::auth::{ensure_authenticated, AuthProvider};
use crate::credentials::CredentialStore;
use crate::database::{Direction, DocumentDatabase, Query, SetMode, WriteBatch};
use crate::listener::{spawn_listener, ListenerRegistration};
use crate::scope::{Collection, CollectionScope};
use mealplan_common::mapper::{self, fields};
use mealplan_common::{
    time, Error, GroceryItem, Ingredient, PlannedMeal, Recipe, Result, Timestamp, Value,
    WeeklyPlan,
};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub struct RemoteStore {
    db: Arc<dyn DocumentDatabase>,
    auth: Arc<dyn AuthProvider>,
    credentials: Arc<dyn CredentialStore>,
    scope: OnceLock<CollectionScope>,
    listeners: CancellationToken,
}

impl RemoteStore {
    pub fn new(
        db: Arc<dyn DocumentDatabase>,
        auth: Arc<dyn AuthProvider>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            db,
            auth,
            credentials,
            scope: OnceLock::new(),
            listeners: CancellationToken::new(),
        }
    }

    pub fn database(&self) -> &Arc<dyn DocumentDatabase> {
        &self.db
    }

    /// Namespace for this client, fixed on first use
    pub fn scope(&self) -> &CollectionScope {
        self.scope.get_or_init(|| {
            let scope = CollectionScope::resolve(
                self.credentials.household_key(),
                self.auth.current_user(),
            );
            info!("Using collection scope {}", scope);
            scope
        })
    }

    pub fn collection_path(&self, collection: Collection) -> String {
        self.scope().collection_path(collection)
    }

    /// Sign in anonymously if nobody is signed in
    pub async fn ensure_authenticated(&self) -> Result<String> {
        ensure_authenticated(self.auth.as_ref()).await
    }

    // ------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------

    /// Write a recipe under the slug of its name; returns the stored id
    ///
    /// Names that slug to a reserved meal token ("leftovers", "takeout")
    /// are rejected.
    pub async fn add_recipe(&self, recipe: &Recipe) -> Result<String> {
        let path = self.collection_path(Collection::Recipes);
        let slug = recipe.slug();
        if PlannedMeal::is_reserved_token(&slug) {
            return Err(Error::InvalidInput(format!(
                "'{}' is reserved for planned meals and cannot name a recipe",
                recipe.name.trim()
            )));
        }
        let data = mapper::encode_recipe(recipe);
        self.write_keyed(&path, &recipe.id, &slug, data, "recipe")
            .await?;
        Ok(slug)
    }

    /// Re-stamp `updated_at` and write
    pub async fn update_recipe(&self, recipe: &Recipe) -> Result<String> {
        let mut recipe = recipe.clone();
        recipe.updated_at = time::now();
        self.add_recipe(&recipe).await
    }

    pub async fn delete_recipe(&self, recipe: &Recipe) -> Result<()> {
        let path = self.collection_path(Collection::Recipes);
        self.db.delete(&path, &recipe.id).await.inspect_err(|e| {
            error!("Failed to delete recipe {}: {}", recipe.id, e);
        })
    }

    // ------------------------------------------------------------------
    // Grocery items
    // ------------------------------------------------------------------

    pub async fn add_grocery_item(&self, item: &GroceryItem) -> Result<String> {
        let path = self.collection_path(Collection::Groceries);
        let slug = item.slug();
        let data = mapper::encode_grocery_item(item);
        self.write_keyed(&path, &item.id, &slug, data, "grocery item")
            .await?;
        Ok(slug)
    }

    pub async fn update_grocery_item(&self, item: &GroceryItem) -> Result<String> {
        let mut item = item.clone();
        item.updated_at = time::now();
        self.add_grocery_item(&item).await
    }

    pub async fn delete_grocery_item(&self, item: &GroceryItem) -> Result<()> {
        let path = self.collection_path(Collection::Groceries);
        self.db.delete(&path, &item.id).await.inspect_err(|e| {
            error!("Failed to delete grocery item {}: {}", item.id, e);
        })
    }

    /// Upsert each ingredient as an unchecked grocery item in one batch
    ///
    /// Ingredients whose name matches an existing item merge into it, which
    /// resets its checkmark and timestamps. Existing categories are kept.
    /// Blank-named ingredients are skipped. Returns the number of items
    /// written.
    pub async fn add_or_update_grocery_items(&self, ingredients: &[Ingredient]) -> Result<usize> {
        let path = self.collection_path(Collection::Groceries);
        let mut batch = WriteBatch::new();
        for ingredient in ingredients {
            if ingredient.name.trim().is_empty() {
                debug!("Skipping ingredient with a blank name");
                continue;
            }
            let quantity = Some(ingredient.quantity.trim().to_string()).filter(|q| !q.is_empty());
            let item = GroceryItem::new(ingredient.name.trim(), quantity);
            let mut data = mapper::encode_grocery_item(&item);
            data.remove(fields::CATEGORY);
            batch.set(&path, item.id, data, SetMode::Merge);
        }

        if batch.is_empty() {
            info!("No ingredients to add to the grocery list");
            return Ok(0);
        }

        let count = batch.len();
        self.db.commit(batch).await.inspect_err(|e| {
            error!("Failed to add {} grocery item(s): {}", count, e);
        })?;
        info!("Added {} grocery item(s) from ingredients", count);
        Ok(count)
    }

    /// Delete every checked grocery item in one batch; returns how many
    pub async fn delete_all_checked_grocery_items(&self) -> Result<usize> {
        let path = self.collection_path(Collection::Groceries);
        let checked = self
            .db
            .query(&Query::collection(&path).where_eq(fields::IS_CHECKED, true))
            .await?;

        if checked.is_empty() {
            info!("No checked grocery items to delete");
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for doc in &checked {
            batch.delete(&path, &doc.id);
        }
        let count = batch.len();
        self.db.commit(batch).await.inspect_err(|e| {
            error!("Failed to delete checked grocery items: {}", e);
        })?;
        info!("Deleted {} checked grocery item(s)", count);
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Weekly plans
    // ------------------------------------------------------------------

    /// Write a plan under its week id, re-stamping `updated_at`
    pub async fn save_weekly_plan(&self, plan: &WeeklyPlan) -> Result<()> {
        let mut plan = plan.clone();
        plan.updated_at = time::now();

        let path = self.collection_path(Collection::WeeklyPlans);
        let data = mapper::encode_weekly_plan(&plan);
        self.db
            .set(&path, &plan.id, data, SetMode::Merge)
            .await
            .inspect_err(|e| error!("Failed to save weekly plan {}: {}", plan.id, e))?;
        debug!("Saved weekly plan {}", plan.id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Recipes, most recently updated first
    pub fn observe_recipes<U, E>(&self, on_update: U, on_error: E) -> ListenerRegistration
    where
        U: Fn(Vec<Recipe>) + Send + Sync + 'static,
        E: Fn(String) + Send + Sync + 'static,
    {
        let query = Query::collection(self.collection_path(Collection::Recipes))
            .order_by(fields::UPDATED_AT, Direction::Descending);
        self.observe(query, Collection::Recipes, mapper::parse_recipe, on_update, on_error)
    }

    /// Grocery items, newest first
    pub fn observe_grocery_items<U, E>(&self, on_update: U, on_error: E) -> ListenerRegistration
    where
        U: Fn(Vec<GroceryItem>) + Send + Sync + 'static,
        E: Fn(String) + Send + Sync + 'static,
    {
        let query = Query::collection(self.collection_path(Collection::Groceries))
            .order_by(fields::CREATED_AT, Direction::Descending);
        self.observe(
            query,
            Collection::Groceries,
            mapper::parse_grocery_item,
            on_update,
            on_error,
        )
    }

    /// The earliest plan for this week or later (at most one)
    ///
    /// The week boundary is computed when the listener is registered.
    pub fn observe_weekly_plan<U, E>(&self, on_update: U, on_error: E) -> ListenerRegistration
    where
        U: Fn(Vec<WeeklyPlan>) + Send + Sync + 'static,
        E: Fn(String) + Send + Sync + 'static,
    {
        let week_start = Timestamp::from_datetime(time::start_of_current_week());
        let query = Query::collection(self.collection_path(Collection::WeeklyPlans))
            .where_ge(fields::WEEK_OF, Value::Timestamp(week_start))
            .order_by(fields::WEEK_OF, Direction::Ascending)
            .limit(1);
        self.observe(
            query,
            Collection::WeeklyPlans,
            mapper::parse_weekly_plan,
            on_update,
            on_error,
        )
    }

    /// Cancel every listener registered through this client
    pub fn shutdown(&self) {
        self.listeners.cancel();
    }

    fn observe<T, D, U, E>(
        &self,
        query: Query,
        collection: Collection,
        decode: D,
        on_update: U,
        on_error: E,
    ) -> ListenerRegistration
    where
        T: Send + 'static,
        D: Fn(&mealplan_common::Document) -> Option<T> + Send + Sync + 'static,
        U: Fn(Vec<T>) + Send + Sync + 'static,
        E: Fn(String) + Send + Sync + 'static,
    {
        debug!("Registering listener on {}", query.collection);
        spawn_listener(
            Arc::clone(&self.db),
            query,
            collection.label(),
            self.listeners.child_token(),
            decode,
            on_update,
            on_error,
        )
    }

    /// Write `data` under `slug`, removing the document at `stored_id` when
    /// the name changed since it was stored
    async fn write_keyed(
        &self,
        path: &str,
        stored_id: &str,
        slug: &str,
        data: mealplan_common::Fields,
        what: &str,
    ) -> Result<()> {
        if slug.is_empty() {
            return Err(Error::InvalidInput(format!("{} name cannot be blank", what)));
        }

        let mut batch = WriteBatch::new();
        if !stored_id.is_empty() && stored_id != slug {
            info!("Renaming {} {} to {}", what, stored_id, slug);
            batch.delete(path, stored_id);
        }
        batch.set(path, slug, data, SetMode::Merge);

        self.db
            .commit(batch)
            .await
            .inspect_err(|e| error!("Failed to write {} {}: {}", what, slug, e))
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        self.listeners.cancel();
    }
}
