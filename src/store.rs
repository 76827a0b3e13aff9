//! Running schedule store calls off the async runtime.

use playout_common::{Error, Result};
use playout_db::{get_conn, DbPool, PooledConnection};

/// Run `f` with a pooled connection on the blocking thread pool.
pub async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T>
where
    F: FnOnce(&PooledConnection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = get_conn(&pool)?;
        f(&conn)
    })
    .await
    .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
}
