use anyhow::Result;
use chrono::NaiveDate;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use roster_core::store::Store;
use roster_core::Event;
use uuid::Uuid;

pub async fn list(store: &dyn Store, search: Option<String>, on: Option<NaiveDate>) -> Result<()> {
    let events = store.load_events().await?;
    let users = store.load_users().await?;
    let query = search.unwrap_or_default();

    // Already newest-first from the store.
    let matching: Vec<&Event> = events
        .iter()
        .filter(|e| e.matches(&query))
        .filter(|e| on.map_or(true, |day| e.occurs_on(day)))
        .collect();

    if matching.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    for event in matching {
        println!(
            "{}  {}  {}",
            event.id.to_string().dimmed(),
            format_date_range(event),
            event.title.bold()
        );
        if !event.description.is_empty() {
            println!("    {}", event.description.dimmed());
        }
        println!("    {}", event.participants_display(&users).dimmed());
    }

    Ok(())
}

pub async fn add(
    store: &dyn Store,
    title: &str,
    description: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<()> {
    let event = Event::new(title, description, start, end.unwrap_or(start));
    event.validate()?;

    store.save_events(std::slice::from_ref(&event)).await?;

    println!(
        "{}",
        format!("Created event: {} ({})", event.title, event.id).green()
    );
    Ok(())
}

pub async fn edit(
    store: &dyn Store,
    id: Uuid,
    title: Option<String>,
    description: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    let events = store.load_events().await?;
    let mut event = events
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", id))?;

    if let Some(title) = title {
        event.title = title.trim().to_string();
    }
    if let Some(description) = description {
        event.description = description.trim().to_string();
    }
    if let Some(start) = start {
        event.start_date = start;
    }
    if let Some(end) = end {
        event.end_date = end;
    }
    event.validate()?;

    store.save_events(std::slice::from_ref(&event)).await?;

    println!("{}", format!("Updated event: {}", event.title).green());
    Ok(())
}

pub async fn rm(store: &dyn Store, id: Uuid, yes: bool) -> Result<()> {
    let events = store.load_events().await?;
    let event = events
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", id))?;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete '{}'?", event.title))
            .default(false)
            .interact()?;
        if !confirmed {
            return Ok(());
        }
    }

    store.delete_event(id).await?;

    println!("{}", format!("Deleted event: {}", event.title).red());
    Ok(())
}

/// Single day as-is, multi-day as "start..end".
fn format_date_range(event: &Event) -> String {
    if event.start_date == event.end_date {
        event.start_date.format("%Y-%m-%d").to_string()
    } else {
        format!(
            "{}..{}",
            event.start_date.format("%Y-%m-%d"),
            event.end_date.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_day_range() {
        let event = Event::new("Standup", "", date(2024, 1, 1), date(2024, 1, 1));
        assert_eq!(format_date_range(&event), "2024-01-01");
    }

    #[test]
    fn multi_day_range() {
        let event = Event::new("Offsite", "", date(2024, 3, 4), date(2024, 3, 6));
        assert_eq!(format_date_range(&event), "2024-03-04..2024-03-06");
    }
}
