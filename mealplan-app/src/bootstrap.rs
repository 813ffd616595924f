//! Application wiring
//!
//! Resolves the root folder, opens the database and builds an
//! [`AppDataStore`] with file-backed session and household key.

use crate::categorizer::Categorizer;
use crate::state::AppDataStore;
use mealplan_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use mealplan_common::events::EventBus;
use mealplan_common::Result;
use mealplan_store::{
    DocumentDatabase, FileCredentialStore, LocalAuthProvider, MemoryDatabase, RemoteStore,
    SqliteDatabase,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Startup options that override the config file
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Root folder from the command line
    pub root_folder: Option<PathBuf>,
    /// Keep documents in memory instead of the SQLite file
    pub ephemeral: bool,
}

pub async fn build_app(config: &TomlConfig, options: &AppOptions) -> Result<AppDataStore> {
    let root = RootFolderResolver::new(options.root_folder.as_deref(), config).resolve();
    let initializer = RootFolderInitializer::new(root);
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root().display());

    // Database change notices and application events share one bus
    let event_bus = EventBus::new(config.event_bus_capacity);

    let db: Arc<dyn DocumentDatabase> = if options.ephemeral {
        info!("Using in-memory database");
        Arc::new(MemoryDatabase::new(event_bus.clone()))
    } else {
        Arc::new(SqliteDatabase::open(&initializer.database_path(), event_bus.clone()).await?)
    };

    let store = RemoteStore::new(
        db,
        Arc::new(LocalAuthProvider::new(initializer.session_path())),
        Arc::new(FileCredentialStore::new(initializer.household_key_path())),
    );

    let model_path = config
        .categorizer
        .model_path
        .as_deref()
        .map(|path| initializer.resolve_path(path));
    let categorizer = Categorizer::load(model_path.as_deref(), config.categorizer.threshold);

    Ok(AppDataStore::new(
        Arc::new(store),
        Arc::new(categorizer),
        event_bus,
    ))
}
