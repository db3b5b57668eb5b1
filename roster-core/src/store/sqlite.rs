//! SQLite-backed store.
//!
//! Every operation opens its own connection from the stored options and
//! closes it on completion. Each unit of work runs inside a transaction:
//! `save_users` commits the whole list at once, `save_events` commits one
//! transaction per event, strictly sequentially. Participant rows are
//! re-derived on every save by deleting and reinserting — the caller
//! always supplies the full desired state, so nothing is diffed.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::error::ErrorKind;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

use super::Store;
use crate::error::{RosterError, RosterResult};
use crate::event::Event;
use crate::user::User;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS event_participants (
        event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        PRIMARY KEY (event_id, user_id)
    )",
];

pub struct SqliteStore {
    options: SqliteConnectOptions,
}

impl SqliteStore {
    pub fn new(path: &Path) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        SqliteStore { options }
    }

    async fn connect(&self) -> RosterResult<SqliteConnection> {
        self.options
            .connect()
            .await
            .map_err(|e| RosterError::StorageUnavailable(e.to_string()))
    }
}

/// Map a statement failure, surfacing constraint breaches distinctly.
fn db_err(e: sqlx::Error) -> RosterError {
    if let sqlx::Error::Database(db) = &e {
        if matches!(
            db.kind(),
            ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
        ) {
            return RosterError::Constraint(db.message().to_string());
        }
    }
    RosterError::Query(e)
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password: String,
}

impl TryFrom<UserRow> for User {
    type Error = RosterError;

    fn try_from(row: UserRow) -> RosterResult<User> {
        Ok(User {
            id: parse_id(&row.id)?,
            name: row.name,
            email: row.email,
            password: row.password,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    title: String,
    description: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    /// Comma-joined participant ids from the aggregation, NULL when none.
    participant_ids: Option<String>,
}

impl TryFrom<EventRow> for Event {
    type Error = RosterError;

    fn try_from(row: EventRow) -> RosterResult<Event> {
        let mut participant_ids = BTreeSet::new();
        if let Some(joined) = &row.participant_ids {
            for id in joined.split(',') {
                participant_ids.insert(parse_id(id)?);
            }
        }

        Ok(Event {
            id: parse_id(&row.id)?,
            title: row.title,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            participant_ids,
        })
    }
}

fn parse_id(raw: &str) -> RosterResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| RosterError::Serialization(format!("invalid uuid in store: {raw:?}")))
}

#[async_trait]
impl Store for SqliteStore {
    async fn ensure_schema(&self) -> RosterResult<()> {
        let mut conn = self.connect().await?;
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut conn)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn load_users(&self) -> RosterResult<Vec<User>> {
        let mut conn = self.connect().await?;
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, name, email, password FROM users ORDER BY name ASC")
                .fetch_all(&mut conn)
                .await
                .map_err(db_err)?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn save_users(&self, users: &[User]) -> RosterResult<()> {
        debug!(count = users.len(), "saving users");

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await.map_err(db_err)?;

        for user in users {
            sqlx::query(
                "INSERT INTO users (id, name, email, password) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     email = excluded.email,
                     password = excluded.password",
            )
            .bind(user.id.to_string())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn load_events(&self) -> RosterResult<Vec<Event>> {
        let mut conn = self.connect().await?;
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT e.id, e.title, e.description, e.start_date, e.end_date,
                    group_concat(p.user_id) AS participant_ids
             FROM events AS e
             LEFT JOIN event_participants AS p ON p.event_id = e.id
             GROUP BY e.id
             ORDER BY e.start_date DESC",
        )
        .fetch_all(&mut conn)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn save_events(&self, events: &[Event]) -> RosterResult<()> {
        debug!(count = events.len(), "saving events");

        let mut conn = self.connect().await?;

        for event in events {
            let mut tx = conn.begin().await.map_err(db_err)?;
            let event_id = event.id.to_string();

            sqlx::query("DELETE FROM events WHERE id = ?1")
                .bind(&event_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;

            sqlx::query(
                "INSERT INTO events (id, title, description, start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&event_id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.start_date)
            .bind(event.end_date)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            sqlx::query("DELETE FROM event_participants WHERE event_id = ?1")
                .bind(&event_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;

            for user_id in &event.participant_ids {
                sqlx::query("INSERT INTO event_participants (event_id, user_id) VALUES (?1, ?2)")
                    .bind(&event_id)
                    .bind(user_id.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
            }

            tx.commit().await.map_err(db_err)?;
        }

        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> RosterResult<()> {
        debug!(%id, "deleting event");

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await.map_err(db_err)?;

        // Explicit on top of the schema's cascade, so behavior does not
        // depend on foreign key enforcement being switched on.
        sqlx::query("DELETE FROM event_participants WHERE event_id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query("DELETE FROM events WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    async fn delete_user(&self, id: Uuid) -> RosterResult<()> {
        debug!(%id, "deleting user");

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM event_participants WHERE user_id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(&dir.path().join("roster.db"));
        (dir, store)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn join_row_count(store: &SqliteStore) -> i64 {
        let mut conn = store.connect().await.unwrap();
        sqlx::query_scalar("SELECT COUNT(*) FROM event_participants")
            .fetch_one(&mut conn)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();

        let ada = User::new("Ada", "ada@x.com", "pw");
        store.save_users(&[ada.clone()]).await.unwrap();

        // A later ensure must not disturb existing data.
        store.ensure_schema().await.unwrap();
        assert_eq!(store.load_users().await.unwrap(), vec![ada]);
    }

    #[tokio::test]
    async fn users_round_trip_ordered_by_name() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let grace = User::new("Grace", "grace@x.com", "pw");
        let ada = User::new("Ada", "ada@x.com", "pw");
        store.save_users(&[grace.clone(), ada.clone()]).await.unwrap();

        assert_eq!(store.load_users().await.unwrap(), vec![ada, grace]);
    }

    #[tokio::test]
    async fn save_users_upserts_in_place() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let mut ada = User::new("Ada", "ada@x.com", "pw");
        store.save_users(&[ada.clone()]).await.unwrap();

        ada.name = "Ada Lovelace".to_string();
        store.save_users(&[ada.clone()]).await.unwrap();

        assert_eq!(store.load_users().await.unwrap(), vec![ada]);
    }

    #[tokio::test]
    async fn save_users_is_additive() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let ada = User::new("Ada", "ada@x.com", "pw");
        let grace = User::new("Grace", "grace@x.com", "pw");
        store.save_users(&[ada.clone(), grace.clone()]).await.unwrap();

        // Saving a list that omits Ada must not delete her.
        store.save_users(&[grace.clone()]).await.unwrap();
        assert_eq!(store.load_users().await.unwrap(), vec![ada, grace]);
    }

    #[tokio::test]
    async fn save_users_rolls_back_whole_list_on_duplicate_email() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let first = User::new("Ada", "ada@x.com", "pw");
        let dupe = User::new("Imposter", "ada@x.com", "pw");

        let err = store.save_users(&[first, dupe]).await.unwrap_err();
        assert!(matches!(err, RosterError::Constraint(_)));

        // Atomic as a whole: not even the first user was committed.
        assert!(store.load_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_round_trip_with_participants() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let ada = User::new("Ada", "ada@x.com", "pw");
        let grace = User::new("Grace", "grace@x.com", "pw");
        store.save_users(&[ada.clone(), grace.clone()]).await.unwrap();

        let mut offsite = Event::new("Offsite", "Annual", date(2024, 3, 4), date(2024, 3, 6));
        offsite.participant_ids.insert(ada.id);
        offsite.participant_ids.insert(grace.id);
        let standup = Event::new("Standup", "", date(2024, 5, 1), date(2024, 5, 1));

        store
            .save_events(&[offsite.clone(), standup.clone()])
            .await
            .unwrap();

        // Ordered by start date descending.
        assert_eq!(store.load_events().await.unwrap(), vec![standup, offsite]);
    }

    #[tokio::test]
    async fn resaving_replaces_join_rows_exactly() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let ada = User::new("Ada", "ada@x.com", "pw");
        let grace = User::new("Grace", "grace@x.com", "pw");
        store.save_users(&[ada.clone(), grace.clone()]).await.unwrap();

        let mut event = Event::new("Offsite", "", date(2024, 3, 4), date(2024, 3, 6));
        event.participant_ids.insert(ada.id);
        event.participant_ids.insert(grace.id);
        store.save_events(&[event.clone()]).await.unwrap();
        assert_eq!(join_row_count(&store).await, 2);

        event.participant_ids.remove(&grace.id);
        store.save_events(&[event.clone()]).await.unwrap();

        assert_eq!(join_row_count(&store).await, 1);
        assert_eq!(store.load_events().await.unwrap(), vec![event]);
    }

    #[tokio::test]
    async fn deleting_event_removes_join_rows() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let ada = User::new("Ada", "ada@x.com", "pw");
        store.save_users(&[ada.clone()]).await.unwrap();

        let mut event = Event::new("Offsite", "", date(2024, 3, 4), date(2024, 3, 6));
        event.participant_ids.insert(ada.id);
        store.save_events(&[event.clone()]).await.unwrap();

        store.delete_event(event.id).await.unwrap();

        assert!(store.load_events().await.unwrap().is_empty());
        assert_eq!(join_row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn deleting_user_removes_membership() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let ada = User::new("Ada", "ada@x.com", "pw");
        store.save_users(&[ada.clone()]).await.unwrap();

        let mut event = Event::new("Offsite", "", date(2024, 3, 4), date(2024, 3, 6));
        event.participant_ids.insert(ada.id);
        store.save_events(&[event.clone()]).await.unwrap();

        store.delete_user(ada.id).await.unwrap();

        assert!(store.load_users().await.unwrap().is_empty());
        let loaded = store.load_events().await.unwrap();
        assert!(loaded[0].participant_ids.is_empty());
    }

    #[tokio::test]
    async fn dangling_participant_is_rejected_and_rolled_back() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let mut event = Event::new("Offsite", "", date(2024, 3, 4), date(2024, 3, 6));
        event.participant_ids.insert(Uuid::new_v4());

        let err = store.save_events(&[event]).await.unwrap_err();
        assert!(matches!(err, RosterError::Constraint(_)));

        // The event's transaction rolled back as a unit.
        assert!(store.load_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn standup_scenario() {
        let (_dir, store) = temp_store();
        store.ensure_schema().await.unwrap();

        let ada = User::new("Ada", "ada@x.com", "pw");
        store.save_users(&[ada.clone()]).await.unwrap();

        let mut standup = Event::new("Standup", "", date(2024, 1, 1), date(2024, 1, 1));
        store.save_events(&[standup.clone()]).await.unwrap();

        standup.participant_ids.insert(ada.id);
        store.save_events(&[standup.clone()]).await.unwrap();

        let loaded = store.load_events().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded[0].participant_ids,
            BTreeSet::from([ada.id])
        );
        assert_eq!(
            loaded[0].participants_display(&store.load_users().await.unwrap()),
            "Participants: Ada"
        );
    }
}
