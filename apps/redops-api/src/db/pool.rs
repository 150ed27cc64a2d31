use diesel_async::pooled_connection::deadpool::{BuildError, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

pub type DbPool = Pool<AsyncPgConnection>;

const MAX_CONNECTIONS: usize = 16;

/// Build the async connection pool. Connections are opened lazily, so this
/// does not touch the database yet.
pub fn connect(database_url: &str) -> Result<DbPool, BuildError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager).max_size(MAX_CONNECTIONS).build()?;

    tracing::info!(max_size = MAX_CONNECTIONS, "database pool created");
    Ok(pool)
}
