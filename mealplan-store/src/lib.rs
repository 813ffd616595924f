//! Remote store client for the meal planner
//!
//! Layers, leaf-first:
//! - database: the document database contract plus query/batch types
//! - memory, sqlite: concrete database backends
//! - auth, credentials, scope: who is signed in and which namespace to use
//! - listener: live query subscriptions
//! - client: typed CRUD, batch writes and observers for the three collections

pub mod auth;
pub mod client;
pub mod credentials;
pub mod database;
pub mod listener;
pub mod memory;
pub mod scope;
pub mod sqlite;

pub use auth::{ensure_authenticated, AuthProvider, LocalAuthProvider, StaticAuthProvider};
pub use client::RemoteStore;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use database::{Direction, DocumentDatabase, Query, SetMode, WriteBatch, WriteOp};
pub use listener::ListenerRegistration;
pub use memory::MemoryDatabase;
pub use scope::{Collection, CollectionScope};
pub use sqlite::SqliteDatabase;
