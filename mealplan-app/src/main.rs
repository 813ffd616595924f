//! mealplan - headless front end for the meal planner
//!
//! Drives the same observable application state a UI would: every command
//! starts the live listeners, waits for the first snapshot, performs its
//! action and stops the listeners again. `watch` keeps them running and
//! prints every published snapshot event as a JSON line.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use mealplan_app::{build_app, AppDataStore, AppOptions};
use mealplan_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use mealplan_common::{slug::slugify, DayOfWeek, GroceryItem, Ingredient, PlannedMeal, Recipe};
use mealplan_store::{CredentialStore, FileCredentialStore};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for mealplan
#[derive(Parser, Debug)]
#[command(name = "mealplan")]
#[command(about = "Recipes, weekly meal plans and a shared grocery list")]
#[command(version)]
struct Args {
    /// Root folder for the database, session and household key
    #[arg(long, global = true, env = "MEALPLAN_ROOT")]
    root: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep all documents in memory for this run
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage recipes
    #[command(subcommand)]
    Recipes(RecipeCommand),
    /// Show and edit this week's plan
    #[command(subcommand)]
    Plan(PlanCommand),
    /// Manage the grocery list
    #[command(subcommand)]
    Groceries(GroceryCommand),
    /// Share lists with a household
    #[command(subcommand)]
    Household(HouseholdCommand),
    /// Print snapshot events until interrupted
    Watch,
}

#[derive(Subcommand, Debug)]
enum RecipeCommand {
    List,
    Show {
        name: String,
    },
    Add {
        name: String,
        #[arg(long, default_value = "")]
        instructions: String,
        /// Ingredient as "name=quantity"; repeatable
        #[arg(long = "ingredient")]
        ingredients: Vec<String>,
    },
    Delete {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum PlanCommand {
    Show,
    /// Plan a recipe, "leftovers" or "takeout" for a day
    Assign {
        day: String,
        meal: String,
    },
    Clear {
        day: String,
    },
    /// Add the ingredients of this week's recipes to the grocery list
    Shop {
        /// Only add this ingredient; repeatable
        #[arg(long = "only")]
        only: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum GroceryCommand {
    List,
    Add {
        name: String,
        #[arg(long)]
        quantity: Option<String>,
    },
    Check {
        name: String,
    },
    Uncheck {
        name: String,
    },
    Delete {
        name: String,
    },
    /// Remove every checked item
    ClearChecked,
}

#[derive(Subcommand, Debug)]
enum HouseholdCommand {
    Show,
    Set { key: String },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting mealplan v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Command::Household(command) = &args.command {
        return household(command, &args, &config);
    }

    let options = AppOptions {
        root_folder: args.root.clone(),
        ephemeral: args.ephemeral,
    };
    let app = build_app(&config, &options)
        .await
        .context("Failed to initialize meal planner")?;

    app.start().await?;
    app.wait_until_loaded().await;

    let outcome = match args.command {
        Command::Recipes(command) => recipes(&app, command).await,
        Command::Plan(command) => plan(&app, command).await,
        Command::Groceries(command) => groceries(&app, command).await,
        Command::Watch => watch(&app).await,
        Command::Household(_) => Ok(()),
    };

    app.stop().await;
    outcome
}

async fn recipes(app: &AppDataStore, command: RecipeCommand) -> Result<()> {
    match command {
        RecipeCommand::List => {
            for recipe in app.recipes_by_name() {
                println!("{:<24} {} ingredient(s)", recipe.name, recipe.ingredients.len());
            }
        }
        RecipeCommand::Show { name } => {
            let recipe = find_recipe(app, &name)?;
            println!("{}", recipe.name);
            for ingredient in &recipe.ingredients {
                println!("  - {} {}", ingredient.quantity, ingredient.name);
            }
            if !recipe.instructions.is_empty() {
                println!();
                println!("{}", recipe.instructions);
            }
        }
        RecipeCommand::Add {
            name,
            instructions,
            ingredients,
        } => {
            let ingredients = ingredients.iter().map(|raw| parse_ingredient(raw)).collect();
            let id = app
                .add_recipe(&Recipe::new(name.trim(), instructions, ingredients))
                .await?;
            println!("Saved recipe {}", id);
        }
        RecipeCommand::Delete { name } => {
            let recipe = find_recipe(app, &name)?;
            app.delete_recipe(&recipe).await?;
            println!("Deleted recipe {}", recipe.name);
        }
    }
    Ok(())
}

async fn plan(app: &AppDataStore, command: PlanCommand) -> Result<()> {
    match command {
        PlanCommand::Show => {
            let recipes = app.snapshot().recipes.unwrap_or_default();
            match app.current_week_plan() {
                Some(plan) => {
                    println!("Week of {}", plan.week_of.format("%Y-%m-%d"));
                    for day in DayOfWeek::ALL {
                        let text = plan
                            .meals
                            .get(&day)
                            .map(|meal| meal.display_text(&recipes))
                            .unwrap_or_else(|| "-".to_string());
                        println!("{:<10} {}", day.as_str(), text);
                    }
                }
                None => println!("No plan for this week yet"),
            }
        }
        PlanCommand::Assign { day, meal } => {
            let day = parse_day(&day)?;
            let meal = parse_meal(app, &meal)?;
            app.assign_meal(day, meal).await?;
            println!("Planned {}", day);
        }
        PlanCommand::Clear { day } => {
            let day = parse_day(&day)?;
            app.clear_meal(day).await?;
            println!("Cleared {}", day);
        }
        PlanCommand::Shop { only } if only.is_empty() => {
            let added = app.add_week_ingredients_to_groceries().await?;
            println!("Added {} item(s) to the grocery list", added);
        }
        PlanCommand::Shop { only } => {
            let wanted: Vec<String> = only.iter().map(|name| slugify(name)).collect();
            let available = app.week_ingredients();
            for (name, slug) in only.iter().zip(&wanted) {
                if !available.iter().any(|ingredient| slugify(&ingredient.name) == *slug) {
                    warn!("'{}' is not an ingredient of this week's recipes", name);
                }
            }
            let picked: Vec<Ingredient> = available
                .into_iter()
                .filter(|ingredient| wanted.contains(&slugify(&ingredient.name)))
                .collect();
            let added = app.add_or_update_grocery_items(&picked).await?;
            println!("Added {} item(s) to the grocery list", added);
        }
    }
    Ok(())
}

async fn groceries(app: &AppDataStore, command: GroceryCommand) -> Result<()> {
    match command {
        GroceryCommand::List => {
            let mut items = app.snapshot().grocery_items.unwrap_or_default();
            items.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
            for item in items {
                println!(
                    "[{}] {:<24} {:<10} {}",
                    if item.is_checked { "x" } else { " " },
                    item.name,
                    item.quantity.as_deref().unwrap_or(""),
                    item.category
                );
            }
        }
        GroceryCommand::Add { name, quantity } => {
            let item = app.add_grocery_named(&name, quantity).await?;
            println!("Added {} ({})", item.name, item.category);
        }
        GroceryCommand::Check { name } => set_checked(app, &name, true).await?,
        GroceryCommand::Uncheck { name } => set_checked(app, &name, false).await?,
        GroceryCommand::Delete { name } => {
            let item = find_grocery(app, &name)?;
            app.delete_grocery_item(&item).await?;
            println!("Deleted {}", item.name);
        }
        GroceryCommand::ClearChecked => {
            let removed = app.delete_all_checked_grocery_items().await?;
            println!("Removed {} checked item(s)", removed);
        }
    }
    Ok(())
}

async fn set_checked(app: &AppDataStore, name: &str, checked: bool) -> Result<()> {
    let item = find_grocery(app, name)?;
    if item.is_checked != checked {
        app.toggle_grocery_item(&item).await?;
    }
    Ok(())
}

async fn watch(app: &AppDataStore) -> Result<()> {
    let mut events = app.subscribe_events();
    info!("Watching for changes, press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    Ok(())
}

fn household(command: &HouseholdCommand, args: &Args, config: &TomlConfig) -> Result<()> {
    let root = RootFolderResolver::new(args.root.as_deref(), config).resolve();
    let initializer = RootFolderInitializer::new(root);
    let credentials = FileCredentialStore::new(initializer.household_key_path());

    match command {
        HouseholdCommand::Show => match credentials.household_key() {
            Some(key) => println!("Household: {}", key),
            None => println!("No household key; lists are private to this user"),
        },
        HouseholdCommand::Set { key } => {
            initializer.ensure_directory_exists()?;
            credentials.set_household_key(key)?;
            println!("Household key set");
        }
        HouseholdCommand::Clear => {
            credentials.clear_household_key()?;
            println!("Household key cleared");
        }
    }
    Ok(())
}

fn parse_ingredient(raw: &str) -> Ingredient {
    match raw.split_once('=') {
        Some((name, quantity)) => Ingredient::new(name.trim(), quantity.trim()),
        None => Ingredient::new(raw.trim(), ""),
    }
}

fn parse_day(raw: &str) -> Result<DayOfWeek> {
    DayOfWeek::ALL
        .into_iter()
        .find(|day| day.as_str().eq_ignore_ascii_case(raw.trim()))
        .ok_or_else(|| anyhow!("Unknown day '{}'", raw))
}

fn parse_meal(app: &AppDataStore, raw: &str) -> Result<PlannedMeal> {
    match PlannedMeal::from_token(&raw.trim().to_lowercase()) {
        PlannedMeal::Recipe { .. } => Ok(PlannedMeal::recipe(find_recipe(app, raw)?.id)),
        reserved => Ok(reserved),
    }
}

fn find_recipe(app: &AppDataStore, name: &str) -> Result<Recipe> {
    let id = slugify(name);
    app.snapshot()
        .recipes
        .unwrap_or_default()
        .into_iter()
        .find(|recipe| recipe.id == id)
        .ok_or_else(|| anyhow!("No recipe named '{}'", name))
}

fn find_grocery(app: &AppDataStore, name: &str) -> Result<GroceryItem> {
    let id = slugify(name);
    let items = app.snapshot().grocery_items.unwrap_or_default();
    match items.into_iter().find(|item| item.id == id) {
        Some(item) => Ok(item),
        None => bail!("'{}' is not on the grocery list", name),
    }
}
