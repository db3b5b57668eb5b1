//! Persistence backends for the user and event aggregates.

mod json;
mod sqlite;

pub use json::JsonStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::Config;
use crate::error::RosterResult;
use crate::event::Event;
use crate::user::User;

/// The persistence service.
///
/// Saves are never destructive full replaces: `save_users` upserts by id
/// and leaves absent users alone, and `save_events` replaces exactly the
/// events it is given. After a successful `save_events`, the stored
/// participant associations of each saved event mirror its
/// `participant_ids` exactly. Every operation is attempted once; failures
/// surface to the caller.
#[async_trait]
pub trait Store: Send + Sync {
    /// Idempotently create the backing schema. Safe to call on every
    /// startup; never touches existing data.
    async fn ensure_schema(&self) -> RosterResult<()>;

    /// All users, ordered by name ascending (case-sensitive).
    async fn load_users(&self) -> RosterResult<Vec<User>>;

    /// Upsert each user by id, atomically as a whole. Users absent from
    /// the list are NOT deleted.
    async fn save_users(&self, users: &[User]) -> RosterResult<()>;

    /// All events, ordered by start date descending, each with its full
    /// participant set (empty set when none).
    async fn load_events(&self) -> RosterResult<Vec<Event>>;

    /// Replace each given event and its participant associations, one
    /// transaction per event, strictly in order. Events absent from the
    /// list are NOT deleted.
    async fn save_events(&self, events: &[Event]) -> RosterResult<()>;

    /// Remove an event and its participant associations.
    async fn delete_event(&self, id: Uuid) -> RosterResult<()>;

    /// Remove a user and its membership in every event.
    async fn delete_user(&self, id: Uuid) -> RosterResult<()>;
}

/// Open the store selected by the configuration: SQLite when a database
/// is configured, JSON documents in the data directory otherwise.
pub fn open_store(config: &Config) -> Box<dyn Store> {
    match config.database_path() {
        Some(path) => Box::new(SqliteStore::new(&path)),
        None => Box::new(JsonStore::new(config.data_path())),
    }
}
