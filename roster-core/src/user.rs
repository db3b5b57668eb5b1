//! The user aggregate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RosterError, RosterResult};

/// A user that can be assigned to events as a participant.
///
/// Plain data: any change notification belongs to the presentation
/// layer, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// May be empty; unique across users in the relational store.
    pub email: String,
    /// Stored verbatim, never interpreted.
    pub password: String,
}

impl User {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        User {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.trim().to_string(),
        }
    }

    /// Caller-side validation; the stores accept whatever they are given.
    pub fn validate(&self) -> RosterResult<()> {
        if self.name.trim().is_empty() {
            return Err(RosterError::Validation("user name cannot be empty".into()));
        }
        if self.password.is_empty() {
            return Err(RosterError::Validation(
                "user password cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Case-insensitive substring match on name or email.
    /// A blank query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query) || self.email.to_lowercase().contains(&query)
    }
}
