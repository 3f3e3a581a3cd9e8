//! Live queries: re-run a read whenever one of its tables changes.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use rusqlite::Connection;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::debug;

use crate::database::{Database, StoreResult, Table};

type QueryFn<T> = Arc<dyn Fn(&Connection) -> StoreResult<T> + Send + Sync>;

/// A query bound to the tables it reads.
///
/// Nothing runs until [`LiveQuery::into_stream`] is polled. The stream
/// yields the current result first and then a fresh result after every
/// committed write to one of `tables`. Bursts of writes that land before the
/// stream is polled again produce a single re-query. Dropping the stream
/// drops its subscription.
pub struct LiveQuery<T> {
    db: Database,
    tables: &'static [Table],
    query: QueryFn<T>,
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery").field("tables", &self.tables).finish()
    }
}

impl<T: Send + 'static> LiveQuery<T> {
    pub(crate) fn new<F>(db: Database, tables: &'static [Table], query: F) -> Self
    where
        F: Fn(&Connection) -> StoreResult<T> + Send + Sync + 'static,
    {
        Self {
            db,
            tables,
            query: Arc::new(query),
        }
    }

    /// Run the query once without subscribing.
    pub async fn current(&self) -> StoreResult<T> {
        let query = self.query.clone();
        self.db.read(move |conn| query(conn)).await
    }

    pub fn into_stream(self) -> BoxStream<'static, StoreResult<T>> {
        let Self { db, tables, query } = self;

        // Subscribe before the first read so no write can slip between them
        let rx = db.subscribe();

        stream::unfold((rx, true), move |(mut rx, first)| {
            let db = db.clone();
            let query = query.clone();
            async move {
                if !first && !wait_for_change(&mut rx, tables).await {
                    return None;
                }
                let result = db.read(move |conn| query(conn)).await;
                Some((result, (rx, false)))
            }
        })
        .boxed()
    }
}

/// Block until a relevant table changes, then drain whatever else is queued.
/// Returns false once the channel is closed.
async fn wait_for_change(rx: &mut Receiver<Table>, tables: &[Table]) -> bool {
    loop {
        match rx.recv().await {
            Ok(table) if tables.contains(&table) => break,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                debug!("Live query lagged by {} events; re-querying", skipped);
                break;
            }
            Err(RecvError::Closed) => return false,
        }
    }

    loop {
        match rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    true
}
