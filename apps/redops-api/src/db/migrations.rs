use diesel::Connection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Apply pending migrations over a one-off connection. Returns the names of
/// the migrations that ran.
pub async fn run_pending(database_url: &str) -> Result<Vec<String>, BoxError> {
    let database_url = database_url.to_string();

    // The migration harness is synchronous; keep it off the async workers.
    tokio::task::spawn_blocking(move || -> Result<Vec<String>, BoxError> {
        let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(&database_url)?;
        let applied = conn.run_pending_migrations(MIGRATIONS)?;
        Ok(applied.iter().map(|m| m.to_string()).collect())
    })
    .await?
}
