//! Observable application state
//!
//! [`AppDataStore`] keeps the latest snapshot of recipes, grocery items and
//! the current weekly plan, plus a transient error message. Listener
//! callbacks and mutation results all funnel into one `watch` channel, so
//! front ends see a consistent [`AppSnapshot`] and never touch listener
//! threads directly.
//!
//! Mutations write through the [`RemoteStore`] and do not touch the local
//! lists; the listener echo refreshes them.

use crate::categorizer::Categorizer;
use mealplan_common::events::{EventBus, MealPlanEvent, SnapshotList};
use mealplan_common::{
    time, DayOfWeek, GroceryItem, Ingredient, PlannedMeal, Recipe, Result, WeeklyPlan,
};
use mealplan_store::{ListenerRegistration, RemoteStore};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info};

pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed. Please restart the app.";

/// Everything a front end renders
///
/// A `None` list has not loaded yet; `Some(vec![])` is loaded and empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppSnapshot {
    pub recipes: Option<Vec<Recipe>>,
    pub grocery_items: Option<Vec<GroceryItem>>,
    pub weekly_plans: Option<Vec<WeeklyPlan>>,
    pub error_message: Option<String>,
}

impl AppSnapshot {
    /// The earliest plan for this week or later
    pub fn current_week_plan(&self) -> Option<&WeeklyPlan> {
        self.weekly_plans.as_ref().and_then(|plans| plans.first())
    }

    pub fn is_loaded(&self) -> bool {
        self.recipes.is_some() && self.grocery_items.is_some() && self.weekly_plans.is_some()
    }

    /// Mark `list` as loaded and empty
    fn reset_list(&mut self, list: SnapshotList) {
        match list {
            SnapshotList::Recipes => self.recipes = Some(Vec::new()),
            SnapshotList::GroceryItems => self.grocery_items = Some(Vec::new()),
            SnapshotList::WeeklyPlans => self.weekly_plans = Some(Vec::new()),
        }
    }
}

/// Single writer for the snapshot channel
#[derive(Clone)]
struct Publisher {
    state: Arc<watch::Sender<AppSnapshot>>,
    event_bus: EventBus,
}

impl Publisher {
    fn publish<T>(&self, list: SnapshotList, items: Vec<T>, apply: fn(&mut AppSnapshot, Vec<T>)) {
        let count = items.len();
        self.state.send_modify(|snapshot| apply(snapshot, items));
        debug!("Published {:?} snapshot with {} entries", list, count);
        self.event_bus.emit_lossy(MealPlanEvent::SnapshotPublished {
            list,
            count,
            timestamp: chrono::Utc::now(),
        });
    }

    fn listener_failed(&self, list: SnapshotList, message: String) {
        error!("{}", message);
        self.state.send_modify(|snapshot| {
            snapshot.reset_list(list);
            snapshot.error_message = Some(message.clone());
        });
        self.raised(message);
    }

    fn set_error(&self, message: String) {
        self.state
            .send_modify(|snapshot| snapshot.error_message = Some(message.clone()));
        self.raised(message);
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|snapshot| snapshot.error_message.take().is_some());
    }

    fn raised(&self, message: String) {
        self.event_bus.emit_lossy(MealPlanEvent::ErrorRaised {
            message,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Application state shared by every front end
///
/// Listeners live as long as the store: dropping it cancels them.
pub struct AppDataStore {
    store: Arc<RemoteStore>,
    categorizer: Arc<Categorizer>,
    publisher: Publisher,
    registrations: Mutex<Vec<ListenerRegistration>>,
}

impl AppDataStore {
    pub fn new(store: Arc<RemoteStore>, categorizer: Arc<Categorizer>, event_bus: EventBus) -> Self {
        let (state, _) = watch::channel(AppSnapshot::default());
        Self {
            store,
            categorizer,
            publisher: Publisher {
                state: Arc::new(state),
                event_bus,
            },
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn remote_store(&self) -> &Arc<RemoteStore> {
        &self.store
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Authenticate, then register the three listeners
    ///
    /// Calling `start` on a started store does nothing.
    pub async fn start(&self) -> Result<()> {
        let mut registrations = self.registrations.lock().await;
        if !registrations.is_empty() {
            debug!("Application state already started");
            return Ok(());
        }

        if let Err(e) = self.store.ensure_authenticated().await {
            error!("Authentication failed: {}", e);
            self.publisher.set_error(AUTH_FAILED_MESSAGE.to_string());
            return Err(e);
        }

        let publisher = self.publisher.clone();
        let on_error = self.publisher.clone();
        registrations.push(self.store.observe_recipes(
            move |recipes| {
                publisher.publish(SnapshotList::Recipes, recipes, |s, v| s.recipes = Some(v))
            },
            move |message| on_error.listener_failed(SnapshotList::Recipes, message),
        ));

        let publisher = self.publisher.clone();
        let on_error = self.publisher.clone();
        registrations.push(self.store.observe_grocery_items(
            move |items| {
                publisher.publish(SnapshotList::GroceryItems, items, |s, v| {
                    s.grocery_items = Some(v)
                })
            },
            move |message| on_error.listener_failed(SnapshotList::GroceryItems, message),
        ));

        let publisher = self.publisher.clone();
        let on_error = self.publisher.clone();
        registrations.push(self.store.observe_weekly_plan(
            move |plans| {
                publisher.publish(SnapshotList::WeeklyPlans, plans, |s, v| {
                    s.weekly_plans = Some(v)
                })
            },
            move |message| on_error.listener_failed(SnapshotList::WeeklyPlans, message),
        ));

        info!("Application state started ({})", self.store.scope());
        Ok(())
    }

    /// Cancel every listener and wait for them to exit
    pub async fn stop(&self) {
        let registrations: Vec<_> = self.registrations.lock().await.drain(..).collect();
        if registrations.is_empty() {
            return;
        }
        for registration in registrations {
            registration.stop().await;
        }
        info!("Application state stopped");
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> AppSnapshot {
        self.publisher.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppSnapshot> {
        self.publisher.state.subscribe()
    }

    /// `SnapshotPublished` and `ErrorRaised` notifications
    pub fn subscribe_events(&self) -> broadcast::Receiver<MealPlanEvent> {
        self.publisher.event_bus.subscribe()
    }

    pub fn current_week_plan(&self) -> Option<WeeklyPlan> {
        self.publisher.state.borrow().current_week_plan().cloned()
    }

    pub fn error_message(&self) -> Option<String> {
        self.publisher.state.borrow().error_message.clone()
    }

    /// Wait until all three lists have been delivered at least once
    pub async fn wait_until_loaded(&self) -> AppSnapshot {
        let mut rx = self.subscribe();
        let loaded = match rx.wait_for(AppSnapshot::is_loaded).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        loaded
    }

    /// Recipes sorted by name, ignoring case
    pub fn recipes_by_name(&self) -> Vec<Recipe> {
        let mut recipes = self.publisher.state.borrow().recipes.clone().unwrap_or_default();
        recipes.sort_by_key(|recipe| recipe.name.to_lowercase());
        recipes
    }

    /// Recipes planned in the current plan, each once
    pub fn this_weeks_recipes(&self) -> Vec<Recipe> {
        let snapshot = self.publisher.state.borrow();
        let recipes = match (snapshot.current_week_plan(), &snapshot.recipes) {
            (Some(plan), Some(recipes)) => plan.this_weeks_recipes(recipes),
            _ => Vec::new(),
        };
        recipes
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub async fn add_recipe(&self, recipe: &Recipe) -> Result<String> {
        self.settle("add recipe", self.store.add_recipe(recipe).await)
    }

    pub async fn update_recipe(&self, recipe: &Recipe) -> Result<String> {
        self.settle("update recipe", self.store.update_recipe(recipe).await)
    }

    pub async fn delete_recipe(&self, recipe: &Recipe) -> Result<()> {
        self.settle("delete recipe", self.store.delete_recipe(recipe).await)
    }

    pub async fn add_grocery_item(&self, item: &GroceryItem) -> Result<String> {
        self.settle("add grocery item", self.store.add_grocery_item(item).await)
    }

    /// Create an unchecked item, filed by the categorizer
    pub async fn add_grocery_named(
        &self,
        name: &str,
        quantity: Option<String>,
    ) -> Result<GroceryItem> {
        let category = self.categorizer.grocery_category(name);
        let item = GroceryItem::new(name.trim(), quantity).with_category(category);
        self.add_grocery_item(&item).await?;
        Ok(item)
    }

    pub async fn update_grocery_item(&self, item: &GroceryItem) -> Result<String> {
        self.settle("update grocery item", self.store.update_grocery_item(item).await)
    }

    pub async fn delete_grocery_item(&self, item: &GroceryItem) -> Result<()> {
        self.settle("delete grocery item", self.store.delete_grocery_item(item).await)
    }

    pub async fn toggle_grocery_item(&self, item: &GroceryItem) -> Result<String> {
        let mut toggled = item.clone();
        toggled.is_checked = !toggled.is_checked;
        self.settle("update grocery item", self.store.update_grocery_item(&toggled).await)
    }

    pub async fn add_or_update_grocery_items(&self, ingredients: &[Ingredient]) -> Result<usize> {
        self.settle(
            "add items to grocery list",
            self.store.add_or_update_grocery_items(ingredients).await,
        )
    }

    pub async fn delete_all_checked_grocery_items(&self) -> Result<usize> {
        self.settle(
            "delete checked items",
            self.store.delete_all_checked_grocery_items().await,
        )
    }

    pub async fn save_weekly_plan(&self, plan: &WeeklyPlan) -> Result<()> {
        self.settle("save weekly plan", self.store.save_weekly_plan(plan).await)
    }

    /// The loaded plan for this week, or a new empty one saved now
    pub async fn load_or_create_current_week_plan(&self) -> Result<WeeklyPlan> {
        let week_start = time::start_of_current_week();
        if let Some(plan) = self.current_week_plan().filter(|plan| plan.week_of == week_start) {
            return Ok(plan);
        }

        let plan = WeeklyPlan::new(week_start);
        info!("Creating weekly plan {}", plan.id);
        self.save_weekly_plan(&plan).await?;
        Ok(plan)
    }

    pub async fn assign_meal(&self, day: DayOfWeek, meal: PlannedMeal) -> Result<WeeklyPlan> {
        let mut plan = self.load_or_create_current_week_plan().await?;
        plan.assign(day, meal);
        self.save_weekly_plan(&plan).await?;
        Ok(plan)
    }

    pub async fn clear_meal(&self, day: DayOfWeek) -> Result<WeeklyPlan> {
        let mut plan = self.load_or_create_current_week_plan().await?;
        if plan.clear(day).is_some() {
            self.save_weekly_plan(&plan).await?;
        }
        Ok(plan)
    }

    /// Ingredients of this week's recipes, each listed once
    ///
    /// The picker for adding only some of them to the grocery list.
    pub fn week_ingredients(&self) -> Vec<Ingredient> {
        let mut seen = HashSet::new();
        self.this_weeks_recipes()
            .into_iter()
            .flat_map(|recipe| recipe.ingredients)
            .filter(|ingredient| seen.insert(ingredient.id.clone()))
            .collect()
    }

    /// Put every ingredient of this week's recipes on the grocery list
    pub async fn add_week_ingredients_to_groceries(&self) -> Result<usize> {
        let ingredients = self.week_ingredients();
        self.add_or_update_grocery_items(&ingredients).await
    }

    /// Clear the error on success, or replace it with "Failed to <action>: ..."
    fn settle<T>(&self, action: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.publisher.clear_error();
                Ok(value)
            }
            Err(e) => {
                let message = format!("Failed to {}: {}", action, e);
                error!("{}", message);
                self.publisher.set_error(message);
                Err(e)
            }
        }
    }
}
