use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use roster_core::store::Store;
use roster_core::User;
use uuid::Uuid;

pub async fn list(store: &dyn Store, search: Option<String>) -> Result<()> {
    let users = store.load_users().await?;
    let query = search.unwrap_or_default();

    let matching: Vec<&User> = users.iter().filter(|u| u.matches(&query)).collect();

    if matching.is_empty() {
        println!("{}", "No users found".dimmed());
        return Ok(());
    }

    for user in matching {
        println!(
            "{}  {}  {}",
            user.id.to_string().dimmed(),
            user.name.bold(),
            user.email.dimmed()
        );
    }

    Ok(())
}

pub async fn add(store: &dyn Store, name: &str, email: &str, password: &str) -> Result<()> {
    let user = User::new(name, email, password);
    user.validate()?;

    store.save_users(std::slice::from_ref(&user)).await?;

    println!("{}", format!("Created user: {} ({})", user.name, user.id).green());
    Ok(())
}

pub async fn edit(
    store: &dyn Store,
    id: Uuid,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let users = store.load_users().await?;
    let mut user = users
        .into_iter()
        .find(|u| u.id == id)
        .ok_or_else(|| anyhow::anyhow!("User '{}' not found", id))?;

    if let Some(name) = name {
        user.name = name.trim().to_string();
    }
    if let Some(email) = email {
        user.email = email.trim().to_string();
    }
    if let Some(password) = password {
        user.password = password.trim().to_string();
    }
    user.validate()?;

    store.save_users(std::slice::from_ref(&user)).await?;

    println!("{}", format!("Updated user: {}", user.name).green());
    Ok(())
}

pub async fn rm(store: &dyn Store, id: Uuid, yes: bool) -> Result<()> {
    let users = store.load_users().await?;
    let user = users
        .iter()
        .find(|u| u.id == id)
        .ok_or_else(|| anyhow::anyhow!("User '{}' not found", id))?;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete '{}'?", user.name))
            .default(false)
            .interact()?;
        if !confirmed {
            return Ok(());
        }
    }

    store.delete_user(id).await?;

    println!("{}", format!("Deleted user: {}", user.name).red());
    Ok(())
}
