//! Per-key coalescing of in-flight fetches.
//!
//! The first caller for a key spawns the work onto the runtime; callers that
//! arrive while it runs await the same shared result. The spawned task
//! removes its own key once it finishes, so a caller that gives up early
//! never strands the entry.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::{AbortHandle, JoinError};

use crate::CacheError;

pub(crate) type FlightResult<T> = Result<T, CacheError>;
type SharedFlight<T> = Shared<BoxFuture<'static, FlightResult<T>>>;

struct Flight<T> {
    result: SharedFlight<T>,
    abort: AbortHandle,
}

type FlightMap<K, T> = Arc<Mutex<HashMap<K, Flight<T>>>>;

pub(crate) struct SingleFlight<K, T> {
    flights: FlightMap<K, T>,
}

impl<K, T> Clone for SingleFlight<K, T> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Awaits the flight for `key`, starting it with `start` if none is running.
    ///
    /// The boolean is `true` when this call started the flight.
    pub(crate) async fn run<F, Fut>(&self, key: K, start: F) -> (FlightResult<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult<T>> + Send + 'static,
    {
        let (result, leader) = self.join_or_start(key, start);
        (result.await, leader)
    }

    fn join_or_start<F, Fut>(&self, key: K, start: F) -> (SharedFlight<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult<T>> + Send + 'static,
    {
        let mut flights = lock(&self.flights);
        if let Some(flight) = flights.get(&key) {
            return (flight.result.clone(), false);
        }

        let work = start();
        let registry = Arc::clone(&self.flights);
        let owned_key = key.clone();
        // The task blocks on the map lock until the entry below is inserted.
        let handle = tokio::spawn(async move {
            let result = work.await;
            lock(&registry).remove(&owned_key);
            result
        });

        let abort = handle.abort_handle();
        let result = handle.map(flatten_join).boxed().shared();
        flights.insert(
            key,
            Flight {
                result: result.clone(),
                abort,
            },
        );
        (result, true)
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.flights).len()
    }

    /// Aborts every running flight; their waiters receive [`CacheError::ShuttingDown`].
    pub(crate) fn abort_all(&self) -> usize {
        let mut flights = lock(&self.flights);
        let count = flights.len();
        for (_, flight) in flights.drain() {
            flight.abort.abort();
        }
        count
    }
}

fn lock<K, T>(flights: &Mutex<HashMap<K, Flight<T>>>) -> MutexGuard<'_, HashMap<K, Flight<T>>> {
    flights.lock().unwrap_or_else(PoisonError::into_inner)
}

fn flatten_join<T>(joined: Result<FlightResult<T>, JoinError>) -> FlightResult<T> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(CacheError::ShuttingDown),
        Err(e) => Err(CacheError::Internal(format!("fetch task failed: {e}"))),
    }
}
