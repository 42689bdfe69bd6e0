use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{DbPool, Error, ResultExt};

const CREATE_TABLE: &str = r#"
create table if not exists sessions (
    sid text primary key,
    expires bigint not null,
    data text not null,
    created_at bigint not null
)
"#;

const CREATE_EXPIRES_INDEX: &str =
    r#"create index if not exists sessions_expires_idx on sessions (expires)"#;

static GLOBAL: LazyLock<Arc<SchemaGuard>> = LazyLock::new(|| Arc::new(SchemaGuard::new()));

/// Makes sure the sessions table and its expiry index get created once.
///
/// The guard is a one-shot cell: the first caller of [`SchemaGuard::ensure`]
/// runs the schema statements while concurrent callers wait for that same
/// attempt. A failed attempt leaves the cell empty so the next call retries.
///
/// Stores share [`SchemaGuard::global`] by default, so a process creates the
/// schema at most once no matter how many stores it builds. A process that
/// talks to several databases should give each its own guard.
#[derive(Debug, Default)]
pub struct SchemaGuard {
    initialized: OnceCell<()>,
    attempts: AtomicUsize,
}

impl SchemaGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide guard.
    pub fn global() -> Arc<SchemaGuard> {
        Arc::clone(&GLOBAL)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Number of schema creation attempts this guard has started.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Creates the schema unless a previous call already did.
    pub async fn ensure(&self, pool: &DbPool) -> Result<(), Error> {
        self.initialized
            .get_or_try_init(|| async {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(attempt, "creating sessions schema");
                create_schema(pool).await?;
                info!("sessions schema ready");
                Ok::<(), Error>(())
            })
            .await?;

        Ok(())
    }
}

async fn create_schema(pool: &DbPool) -> Result<(), Error> {
    sqlx::query(CREATE_TABLE)
        .execute(pool)
        .await
        .ignore_already_exists()?;

    sqlx::query(CREATE_EXPIRES_INDEX)
        .execute(pool)
        .await
        .ignore_already_exists()?;

    Ok(())
}
