//! The event aggregate and its query helpers.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RosterError, RosterResult};
use crate::user::User;

/// An event with a set of assigned participants.
///
/// Dates are day-precision. The participant set carries user ids only;
/// duplicates collapse and order is irrelevant. The participant display
/// string is computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub participant_ids: BTreeSet<Uuid>,
}

impl Event {
    /// Create an event with a fresh id and no participants.
    pub fn new(title: &str, description: &str, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Event {
            id: Uuid::new_v4(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            start_date,
            end_date,
            participant_ids: BTreeSet::new(),
        }
    }

    /// Caller-side validation; the stores accept whatever they are given.
    pub fn validate(&self) -> RosterResult<()> {
        if self.title.trim().is_empty() {
            return Err(RosterError::Validation("event title cannot be empty".into()));
        }
        if self.end_date < self.start_date {
            return Err(RosterError::Validation(
                "event end date cannot be before its start date".into(),
            ));
        }
        Ok(())
    }

    /// Whether the event's date range covers the given day (inclusive).
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Case-insensitive substring match on title or description.
    /// A blank query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }

    /// Human-readable participant summary, resolved against a user list.
    ///
    /// Ids with no matching user and users with blank names are skipped;
    /// resolved names are sorted for deterministic output.
    pub fn participants_display(&self, users: &[User]) -> String {
        let mut names: Vec<&str> = self
            .participant_ids
            .iter()
            .filter_map(|id| users.iter().find(|u| u.id == *id))
            .map(|u| u.name.as_str())
            .filter(|n| !n.trim().is_empty())
            .collect();

        if names.is_empty() {
            return "No participants".to_string();
        }

        names.sort_unstable();
        format!("Participants: {}", names.join(", "))
    }
}
