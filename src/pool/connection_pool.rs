//! The pool itself and the guard that owns a checked-out connection.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use super::{Connector, PoolError, PoolOptions, PoolStatus};

/// Mutable bookkeeping shared by the pool and its guards.
struct PoolState<T> {
    idle: Vec<T>,
    /// Idle plus checked out plus reserved-while-connecting.
    live: usize,
    generation: u64,
    closed: bool,
}

type SharedState<T> = Arc<Mutex<PoolState<T>>>;

fn lock<T>(state: &Mutex<PoolState<T>>) -> MutexGuard<'_, PoolState<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A bounded pool of connections opened through a [`Connector`].
///
/// Callers beyond capacity wait on a semaphore for at most the acquire
/// timeout. A slot is held from `acquire` until the guard is released,
/// discarded or dropped, and a released connection re-enters the idle set
/// before its slot is freed, so live connections never exceed capacity.
pub struct ConnectionPool<C: Connector> {
    connector: C,
    options: PoolOptions,
    permits: Arc<Semaphore>,
    state: SharedState<C::Connection>,
}

impl<C: Connector> ConnectionPool<C> {
    /// Creates an empty pool. Connections are opened lazily on `acquire`.
    pub fn new(connector: C, options: PoolOptions) -> Self {
        let capacity = options.max_connections.max(1);
        Self {
            connector,
            options: PoolOptions {
                max_connections: capacity,
                ..options
            },
            permits: Arc::new(Semaphore::new(capacity)),
            state: Arc::new(Mutex::new(PoolState {
                idle: Vec::with_capacity(capacity),
                live: 0,
                generation: 0,
                closed: false,
            })),
        }
    }

    /// Returns the pool's configuration.
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Checks out a connection, reusing an idle one or opening a new one.
    pub async fn acquire(&self) -> Result<PooledConnection<C::Connection>, PoolError> {
        let permit = match tokio::time::timeout(
            self.options.acquire_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                warn!(
                    "No connection became free within {:?}",
                    self.options.acquire_timeout
                );
                return Err(PoolError::Exhausted(self.options.acquire_timeout));
            }
        };

        let generation = {
            let mut state = lock(&self.state);
            if state.closed {
                return Err(PoolError::Closed);
            }
            if let Some(conn) = state.idle.pop() {
                let generation = state.generation;
                drop(state);
                return Ok(PooledConnection::new(
                    conn,
                    generation,
                    permit,
                    Arc::clone(&self.state),
                ));
            }
            state.live += 1;
            state.generation
        };

        // The slot is counted as live while the connection opens; the
        // reservation gives it back if connecting fails or is cancelled.
        let mut reservation = SlotReservation {
            state: self.state.as_ref(),
            armed: true,
        };
        let conn = self.connector.connect().await?;
        reservation.armed = false;

        debug!("Opened new pooled connection (generation {})", generation);
        Ok(PooledConnection::new(
            conn,
            generation,
            permit,
            Arc::clone(&self.state),
        ))
    }

    /// Returns a healthy connection to the idle set.
    pub fn release(&self, conn: PooledConnection<C::Connection>) {
        conn.release();
    }

    /// Drops a connection that failed during use.
    pub fn discard(&self, conn: PooledConnection<C::Connection>) {
        conn.discard();
    }

    /// Retires every existing connection.
    ///
    /// Idle connections are dropped now; checked-out ones are dropped when
    /// their holders hand them back. Replacements open lazily.
    pub fn invalidate(&self) {
        let (stale, generation) = {
            let mut state = lock(&self.state);
            state.generation += 1;
            let stale = std::mem::take(&mut state.idle);
            state.live -= stale.len();
            (stale, state.generation)
        };
        debug!(
            "Pool invalidated: dropped {} idle connections, now at generation {}",
            stale.len(),
            generation
        );
        drop(stale);
    }

    /// Stops handing out connections and drops the idle set.
    pub fn close(&self) {
        self.permits.close();
        let stale = {
            let mut state = lock(&self.state);
            state.closed = true;
            let stale = std::mem::take(&mut state.idle);
            state.live -= stale.len();
            stale
        };
        debug!("Pool closed: dropped {} idle connections", stale.len());
        drop(stale);
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Returns a snapshot of the pool's counters.
    pub fn status(&self) -> PoolStatus {
        let state = lock(&self.state);
        PoolStatus {
            capacity: self.options.max_connections,
            live: state.live,
            idle: state.idle.len(),
            in_use: state.live - state.idle.len(),
            generation: state.generation,
        }
    }
}

struct SlotReservation<'a, T> {
    state: &'a Mutex<PoolState<T>>,
    armed: bool,
}

impl<T> Drop for SlotReservation<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.state).live -= 1;
        }
    }
}

/// Exclusive handle to a pooled connection.
///
/// Call [`release`](Self::release) after successful use and
/// [`discard`](Self::discard) after any error. A guard dropped without
/// either (a cancelled request, a panic) is discarded, never recycled.
pub struct PooledConnection<T: Send + 'static> {
    conn: Option<T>,
    generation: u64,
    state: SharedState<T>,
    // Dropped after `Drop::drop` runs, so the connection is back in the
    // idle set before another caller can take the slot.
    _permit: OwnedSemaphorePermit,
}

impl<T: Send + 'static> PooledConnection<T> {
    fn new(conn: T, generation: u64, permit: OwnedSemaphorePermit, state: SharedState<T>) -> Self {
        Self {
            conn: Some(conn),
            generation,
            state,
            _permit: permit,
        }
    }

    /// The pool generation this connection was opened or recycled under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the connection to the idle set.
    ///
    /// Connections from before the last invalidation, or returned after the
    /// pool closed, are dropped instead.
    pub fn release(mut self) {
        self.finish(true);
    }

    /// Drops the connection and frees its slot.
    pub fn discard(mut self) {
        self.finish(false);
    }

    /// Releases the connection if `outcome` is `Ok`, discards it otherwise,
    /// and passes the outcome through.
    pub fn settle<R, E>(self, outcome: Result<R, E>) -> Result<R, E> {
        if outcome.is_ok() {
            self.release();
        } else {
            self.discard();
        }
        outcome
    }

    fn finish(&mut self, reusable: bool) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        let dropped = {
            let mut state = lock(&self.state);
            if reusable && !state.closed && state.generation == self.generation {
                state.idle.push(conn);
                None
            } else {
                state.live -= 1;
                Some(conn)
            }
        };

        if dropped.is_some() {
            debug!(
                "Discarded pooled connection (generation {}, reusable: {})",
                self.generation, reusable
            );
        }
    }
}

impl<T: Send + 'static> Deref for PooledConnection<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.conn
            .as_ref()
            .expect("connection is present until released")
    }
}

impl<T: Send + 'static> DerefMut for PooledConnection<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.conn
            .as_mut()
            .expect("connection is present until released")
    }
}

impl<T: Send + 'static> Drop for PooledConnection<T> {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!("Pooled connection dropped without release; discarding it");
            self.finish(false);
        }
    }
}
