//! Seed script for Context Keeper
//!
//! Connects the configured storage backend, applies the schema when it is
//! the SQL one, and saves a few sample workspaces and groups for one user.
//! Run: cargo run --bin seed_data -- --user <user-id>

use clap::Parser;

use context_keeper::config::{Config, StorageBackend};
use context_keeper::groups::GroupService;
use context_keeper::models::{CreateGroupRequest, CreateTabRequest, CreateWorkspaceRequest};
use context_keeper::storage::{self, PostgresStore};
use context_keeper::workspaces::WorkspaceService;

#[derive(Parser)]
#[command(name = "seed_data", about = "Populate sample workspaces for one user")]
struct Args {
    /// Owner id (the identity service's user id)
    #[arg(short, long)]
    user: String,
}

fn tab(url: &str, title: &str, position: i32) -> CreateTabRequest {
    CreateTabRequest {
        url: url.to_string(),
        title: Some(title.to_string()),
        favicon_url: None,
        position,
    }
}

fn samples() -> Vec<CreateWorkspaceRequest> {
    vec![
        CreateWorkspaceRequest {
            name: "Rust async deep dive".to_string(),
            description: Some("Reading list for the tokio migration".to_string()),
            tabs: vec![
                tab("https://tokio.rs/tokio/tutorial", "Tokio tutorial", 0),
                tab("https://docs.rs/axum/latest/axum/", "axum docs", 1),
                tab("https://docs.rs/sqlx/latest/sqlx/", "sqlx docs", 2),
            ],
        },
        CreateWorkspaceRequest {
            name: "Trip planning".to_string(),
            description: None,
            tabs: vec![
                tab("https://www.openstreetmap.org", "OpenStreetMap", 0),
                tab("https://en.wikivoyage.org", "Wikivoyage", 1),
            ],
        },
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::from_env()?;

    if config.storage.backend == StorageBackend::Postgres {
        let url = config
            .storage
            .database_url
            .as_deref()
            .ok_or("DATABASE_URL is required for the postgres backend")?;
        PostgresStore::connect(url, 1).await?.migrate().await?;
        println!("📦 Schema applied");
    }

    let store = storage::connect(&config.storage).await?;
    let workspaces = WorkspaceService::new(store.clone());
    let groups = GroupService::new(store);

    for sample in samples() {
        let saved = workspaces.create(&args.user, sample).await?;
        println!("✅ Workspace {} '{}' ({} tabs)", saved.id, saved.name, saved.tabs.len());
    }

    for (name, color) in [("Work", None), ("Personal", Some("#10b981"))] {
        let group = groups
            .create(
                &args.user,
                CreateGroupRequest { name: name.to_string(), color: color.map(str::to_string) },
            )
            .await?;
        println!("🏷️  Group {} '{}' {}", group.id, group.name, group.color);
    }

    println!("🌱 Seeded data for user {}", args.user);
    Ok(())
}
