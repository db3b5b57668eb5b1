mod commands;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use roster_core::config::Config;
use roster_core::store::{open_store, Store};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Administer roster events and users, and assign participants to events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    #[command(subcommand)]
    Users(UsersCommand),

    /// Manage events
    #[command(subcommand)]
    Events(EventsCommand),

    /// Manage event participants
    #[command(subcommand)]
    Attend(AttendCommand),
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List users, ordered by name
    List {
        /// Only show users whose name or email contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add a user
    Add {
        name: String,

        #[arg(long, default_value = "")]
        email: String,

        #[arg(long)]
        password: String,
    },
    /// Edit a user
    Edit {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        password: Option<String>,
    },
    /// Delete a user and its event memberships
    Rm {
        id: Uuid,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum EventsCommand {
    /// List events, newest start date first
    List {
        /// Only show events whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only show events covering this day (YYYY-MM-DD)
        #[arg(long)]
        on: Option<NaiveDate>,
    },
    /// Add an event
    Add {
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD); defaults to the start date
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Edit an event
    Edit {
        id: Uuid,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Delete an event and its participant assignments
    Rm {
        id: Uuid,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AttendCommand {
    /// Add users to an event's participant set
    Add {
        event_id: Uuid,

        #[arg(required = true)]
        user_ids: Vec<Uuid>,
    },
    /// Replace an event's participant set (no ids clears it)
    Set {
        event_id: Uuid,

        user_ids: Vec<Uuid>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    let store = open_configured_store().await?;

    match cli.command {
        Commands::Users(command) => match command {
            UsersCommand::List { search } => commands::users::list(store.as_ref(), search).await,
            UsersCommand::Add {
                name,
                email,
                password,
            } => commands::users::add(store.as_ref(), &name, &email, &password).await,
            UsersCommand::Edit {
                id,
                name,
                email,
                password,
            } => commands::users::edit(store.as_ref(), id, name, email, password).await,
            UsersCommand::Rm { id, yes } => commands::users::rm(store.as_ref(), id, yes).await,
        },
        Commands::Events(command) => match command {
            EventsCommand::List { search, on } => {
                commands::events::list(store.as_ref(), search, on).await
            }
            EventsCommand::Add {
                title,
                description,
                start,
                end,
            } => commands::events::add(store.as_ref(), &title, &description, start, end).await,
            EventsCommand::Edit {
                id,
                title,
                description,
                start,
                end,
            } => {
                commands::events::edit(store.as_ref(), id, title, description, start, end).await
            }
            EventsCommand::Rm { id, yes } => commands::events::rm(store.as_ref(), id, yes).await,
        },
        Commands::Attend(command) => match command {
            AttendCommand::Add { event_id, user_ids } => {
                commands::attend::add(store.as_ref(), event_id, user_ids).await
            }
            AttendCommand::Set { event_id, user_ids } => {
                commands::attend::set(store.as_ref(), event_id, user_ids).await
            }
        },
    }
}

fn init_logger() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

/// Open the configured store and make sure its schema exists before any
/// command touches it.
async fn open_configured_store() -> Result<Box<dyn Store>> {
    let config = Config::load()?;
    let store = open_store(&config);
    store.ensure_schema().await?;
    Ok(store)
}
