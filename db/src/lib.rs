use sessionstore_config::DatabaseConfig;
use sqlx::migrate::MigrateDatabase as _;
use sqlx::{Sqlite, sqlite::SqlitePoolOptions};

pub use sqlx::SqlitePool as DbPool;

/// Clocks the store reads the current instant from.
pub mod clock;
/// Row definitions and the raw queries against the sessions table.
pub mod entities;
/// Background pruning of expired sessions.
pub mod prune;
/// One-time creation of the sessions table and its index.
pub mod schema;
/// The session payload handed over by the session middleware.
pub mod session;
/// The session store itself.
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::session::SessionRecord;
pub use prune::spawn_prune_task;
pub use schema::SchemaGuard;
pub use session::{Cookie, Session};
pub use store::{SessionStore, SessionStoreBuilder};

/// Creates a connection pool to the database specified in the passed [`DatabaseConfig`].
pub async fn connect_pool(config: &DatabaseConfig) -> Result<DbPool, Error> {
    let pool = SqlitePoolOptions::new().connect(&config.url).await?;

    Ok(pool)
}

/// Create a database if it does not exist.
/// Used where the sessions database is created
/// at runtime, e.g. by the CLI on first use.
pub async fn create_database_if_not_exists(config: &DatabaseConfig) -> Result<(), Error> {
    if !Sqlite::database_exists(&config.url).await? {
        Sqlite::create_database(&config.url).await?
    };
    Ok(())
}

/// Errors that can occur as a result of a session store operation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The store was built without a database pool to run its queries on.
    #[error("no database executor was supplied to the session store")]
    MissingExecutor,
    /// General database error, e.g. communicating with the database failed
    #[error("database query failed")]
    DatabaseError(#[from] sqlx::Error),
    /// The session payload could not be encoded for storage.
    #[error("could not serialize session payload")]
    Serialize(#[source] serde_json::Error),
    /// A stored payload could not be decoded into a [`Session`].
    #[error("could not deserialize session payload")]
    Deserialize(#[source] serde_json::Error),
}

/// ------------------------------------------------------------------------------------------
/// A little helper trait for tolerating idempotent DDL failures.
/// ------------------------------------------------------------------------------------------
/// ```rust,ignore
/// sqlx::query("create table sessions (sid text primary key)")
///     .execute(&pool)
///     .await
///     .ignore_already_exists()?;
/// ```
pub trait ResultExt {
    /// If `self` contains a SQLx database error reporting that the object
    /// being created already exists, turn it into success.
    ///
    /// Any other error is passed through.
    fn ignore_already_exists(self) -> Result<(), Error>;
}

impl<T, E> ResultExt for Result<T, E>
where
    E: Into<Error>,
{
    fn ignore_already_exists(self) -> Result<(), Error> {
        match self.map_err(Into::into) {
            Ok(_) => Ok(()),
            Err(Error::DatabaseError(sqlx::Error::Database(dbe)))
                if dbe.message().contains("already exists") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
