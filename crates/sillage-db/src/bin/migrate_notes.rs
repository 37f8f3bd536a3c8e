//! Offline note-position migration batch.
//!
//! Usage: `DATABASE_URL=postgres://... sillage-migrate-notes`
//!
//! Safe to rerun: counters are recomputed from scratch each time.

use tracing_subscriber::EnvFilter;

use sillage_db::{run_position_migration, Database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "sillage_db=info".into()),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let db = Database::connect(&database_url).await?;
    let report = run_position_migration(&db).await?;

    println!(
        "migrated {} notes ({} derived from usage, {} legacy fallbacks)",
        report.notes_processed, report.derived, report.fallbacks
    );
    Ok(())
}
