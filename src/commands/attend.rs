use std::collections::BTreeSet;

use anyhow::Result;
use owo_colors::OwoColorize;
use roster_core::store::Store;
use roster_core::Event;
use uuid::Uuid;

/// Add users to an event's participant set (union, duplicates collapse).
pub async fn add(store: &dyn Store, event_id: Uuid, user_ids: Vec<Uuid>) -> Result<()> {
    let users = store.load_users().await?;
    check_known(&user_ids, &users)?;

    let mut event = find_event(store, event_id).await?;
    event.participant_ids.extend(user_ids);

    store.save_events(std::slice::from_ref(&event)).await?;

    println!("{}", format!("Updated event: {}", event.title).green());
    println!("  {}", event.participants_display(&users).dimmed());
    Ok(())
}

/// Replace an event's participant set; an empty id list clears it.
pub async fn set(store: &dyn Store, event_id: Uuid, user_ids: Vec<Uuid>) -> Result<()> {
    let users = store.load_users().await?;
    check_known(&user_ids, &users)?;

    let mut event = find_event(store, event_id).await?;
    event.participant_ids = user_ids.into_iter().collect();

    store.save_events(std::slice::from_ref(&event)).await?;

    println!("{}", format!("Updated event: {}", event.title).green());
    println!("  {}", event.participants_display(&users).dimmed());
    Ok(())
}

/// Only saved users can be assigned as participants.
fn check_known(user_ids: &[Uuid], users: &[roster_core::User]) -> Result<()> {
    let known: BTreeSet<Uuid> = users.iter().map(|u| u.id).collect();

    let unknown: Vec<String> = user_ids
        .iter()
        .filter(|id| !known.contains(id))
        .map(|id| id.to_string())
        .collect();

    if !unknown.is_empty() {
        anyhow::bail!("Unknown user ids: {}", unknown.join(", "));
    }
    Ok(())
}

async fn find_event(store: &dyn Store, event_id: Uuid) -> Result<Event> {
    store
        .load_events()
        .await?
        .into_iter()
        .find(|e| e.id == event_id)
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", event_id))
}
