//! Bounded connection pool.
//!
//! A connection is checked out as a [`PooledConnection`] guard and goes back
//! to the idle list when the guard drops, unless the guard was marked broken.
//! The semaphore permit travels with the guard, so at most `size`
//! connections exist at any moment.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use dirsync_connector::error::{ConnectorError, ConnectorResult};

/// Opens new connections for a [`Pool`].
#[async_trait]
pub trait ManageConnection: Send + Sync + 'static {
    /// Connection handle. Cloning must yield a handle to the same session.
    type Connection: Clone + Send + 'static;

    /// Open and authenticate a new connection.
    async fn connect(&self) -> ConnectorResult<Self::Connection>;
}

struct PoolInner<M: ManageConnection> {
    manager: M,
    idle: Mutex<Vec<M::Connection>>,
    permits: Arc<Semaphore>,
    size: u32,
    acquire_timeout: Duration,
    closed: AtomicBool,
    opened: AtomicUsize,
}

/// A bounded pool of directory connections.
pub struct Pool<M: ManageConnection> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ManageConnection> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ManageConnection> Pool<M> {
    /// Create an empty pool. Connections are opened lazily.
    pub fn new(manager: M, size: u32, acquire_timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                manager,
                idle: Mutex::new(Vec::new()),
                permits: Arc::new(Semaphore::new(size as usize)),
                size,
                acquire_timeout,
                closed: AtomicBool::new(false),
                opened: AtomicUsize::new(0),
            }),
        }
    }

    /// Check out a connection, waiting up to the acquire timeout for a free slot.
    pub async fn acquire(&self) -> ConnectorResult<PooledConnection<M>> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(ConnectorError::connection_failed("connection pool is closed"));
        }

        let permit = match tokio::time::timeout(
            self.inner.acquire_timeout,
            Arc::clone(&self.inner.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(ConnectorError::connection_failed("connection pool is closed"))
            }
            Err(_) => {
                return Err(ConnectorError::PoolExhausted {
                    pool_size: self.inner.size,
                })
            }
        };

        let reused = self.inner.idle.lock().ok().and_then(|mut idle| idle.pop());
        let conn = match reused {
            Some(conn) => conn,
            None => {
                let conn = self.inner.manager.connect().await?;
                self.inner.opened.fetch_add(1, Ordering::Relaxed);
                debug!(
                    pool_size = self.inner.size,
                    opened = self.opened_count(),
                    in_use = self.in_use(),
                    "Opened pooled connection"
                );
                conn
            }
        };

        Ok(PooledConnection {
            conn,
            pool: Arc::clone(&self.inner),
            broken: false,
            _permit: permit,
        })
    }

    /// Close the pool and hand back the idle connections for shutdown.
    pub fn close(&self) -> Vec<M::Connection> {
        debug!(
            idle = self.idle_count(),
            in_use = self.in_use(),
            "Closing connection pool"
        );
        self.inner.closed.store(true, Ordering::Release);
        self.inner.permits.close();
        match self.inner.idle.lock() {
            Ok(mut idle) => idle.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Whether [`Pool::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of connections currently checked out.
    pub fn in_use(&self) -> usize {
        self.inner.size as usize - self.inner.permits.available_permits()
    }

    /// Number of idle connections ready for reuse.
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    /// Total connections opened over the pool's lifetime.
    pub fn opened_count(&self) -> usize {
        self.inner.opened.load(Ordering::Relaxed)
    }

    /// Maximum number of simultaneous connections.
    pub fn size(&self) -> u32 {
        self.inner.size
    }
}

/// A checked-out connection. Returned to the pool on drop.
pub struct PooledConnection<M: ManageConnection> {
    conn: M::Connection,
    pool: Arc<PoolInner<M>>,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl<M: ManageConnection> PooledConnection<M> {
    /// Discard this connection instead of returning it to the pool.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl<M: ManageConnection> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl<M: ManageConnection> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if self.broken {
            warn!("Discarding broken pooled connection");
            return;
        }
        if self.pool.closed.load(Ordering::Acquire) {
            return;
        }
        if let Ok(mut idle) = self.pool.idle.lock() {
            idle.push(self.conn.clone());
        }
    }
}
