//! JSON-document store, used when no database is configured.
//!
//! Two flat documents in the data directory, `users.json` and
//! `events.json`, each holding one whole list. Saves merge by id into
//! the current document and rewrite it atomically (temp file + rename),
//! so the service contract matches the SQLite backend: absent aggregates
//! survive a save. A missing document loads as an empty list; an
//! unreadable one is an error, never an empty list.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::Store;
use crate::error::{RosterError, RosterResult};
use crate::event::Event;
use crate::user::User;

const USERS_FILE: &str = "users.json";
const EVENTS_FILE: &str = "events.json";

pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: PathBuf) -> Self {
        JsonStore { data_dir }
    }

    fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_FILE)
    }

    fn events_path(&self) -> PathBuf {
        self.data_dir.join(EVENTS_FILE)
    }

    fn read_list<T: DeserializeOwned>(&self, path: &Path) -> RosterResult<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RosterError::Serialization(format!("{}: {e}", path.display())))
    }

    fn write_list<T: Serialize>(&self, path: &Path, items: &[T]) -> RosterResult<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let content = serde_json::to_string_pretty(items)
            .map_err(|e| RosterError::Serialization(e.to_string()))?;

        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, path)?;
        Ok(())
    }
}

/// Replace matching entries in place, append the rest.
fn upsert_by_id<T: Clone>(existing: &mut Vec<T>, incoming: &[T], id_of: impl Fn(&T) -> Uuid) {
    for item in incoming {
        match existing.iter().position(|e| id_of(e) == id_of(item)) {
            Some(i) => existing[i] = item.clone(),
            None => existing.push(item.clone()),
        }
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn ensure_schema(&self) -> RosterResult<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    async fn load_users(&self) -> RosterResult<Vec<User>> {
        let mut users: Vec<User> = self.read_list(&self.users_path())?;
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn save_users(&self, users: &[User]) -> RosterResult<()> {
        debug!(count = users.len(), "saving users");

        let mut current: Vec<User> = self.read_list(&self.users_path())?;
        upsert_by_id(&mut current, users, |u| u.id);
        self.write_list(&self.users_path(), &current)
    }

    async fn load_events(&self) -> RosterResult<Vec<Event>> {
        let mut events: Vec<Event> = self.read_list(&self.events_path())?;
        events.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(events)
    }

    async fn save_events(&self, events: &[Event]) -> RosterResult<()> {
        debug!(count = events.len(), "saving events");

        let mut current: Vec<Event> = self.read_list(&self.events_path())?;
        upsert_by_id(&mut current, events, |e| e.id);
        self.write_list(&self.events_path(), &current)
    }

    async fn delete_event(&self, id: Uuid) -> RosterResult<()> {
        debug!(%id, "deleting event");

        let mut events: Vec<Event> = self.read_list(&self.events_path())?;
        events.retain(|e| e.id != id);
        self.write_list(&self.events_path(), &events)
    }

    async fn delete_user(&self, id: Uuid) -> RosterResult<()> {
        debug!(%id, "deleting user");

        let mut users: Vec<User> = self.read_list(&self.users_path())?;
        users.retain(|u| u.id != id);
        self.write_list(&self.users_path(), &users)?;

        // Membership lives inside the event documents; scrub it there.
        let mut events: Vec<Event> = self.read_list(&self.events_path())?;
        let mut changed = false;
        for event in &mut events {
            changed |= event.participant_ids.remove(&id);
        }
        if changed {
            self.write_list(&self.events_path(), &events)?;
        }
        Ok(())
    }
}
