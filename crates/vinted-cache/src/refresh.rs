//! Tracked, bounded background refreshes.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::CacheError;

/// A held refresh slot, released when dropped.
///
/// The slot travels with the fetch-and-persist work, wherever that work runs,
/// so the registry's capacity bounds the work and not just the task waiting
/// on it.
pub(crate) struct RefreshSlot {
    _permit: OwnedSemaphorePermit,
    timeout: Duration,
}

impl RefreshSlot {
    /// Runs `work` under the refresh timeout, holding the slot until it
    /// finishes or is dropped. An elapsed timeout drops `work`.
    pub(crate) async fn run<T, Fut>(self, work: Fut) -> Result<T, CacheError>
    where
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                operation: "refresh",
                after_secs: timeout.as_secs(),
            }),
        }
    }
}

/// Runs refresh tasks on a [`JoinSet`] with at most `capacity` slots taken.
///
/// When every slot is taken a new refresh is skipped rather than queued.
/// Each task carries its own timeout; its outcome is only logged.
pub(crate) struct RefreshRegistry {
    tasks: Mutex<JoinSet<()>>,
    permits: Arc<Semaphore>,
    capacity: usize,
    timeout: Duration,
}

impl RefreshRegistry {
    pub(crate) fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            tasks: Mutex::new(JoinSet::new()),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            timeout,
        }
    }

    /// Takes a slot and spawns the refresh built by `build` inside `span`.
    /// Returns `false` when no slot was free.
    ///
    /// `build` receives the [`RefreshSlot`]; dropping it unused frees the
    /// slot immediately.
    pub(crate) fn spawn<B, F>(&self, span: tracing::Span, build: B) -> bool
    where
        B: FnOnce(RefreshSlot) -> F,
        F: Future<Output = Result<(), CacheError>> + Send + 'static,
    {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => {
                span.in_scope(|| {
                    tracing::warn!(
                        capacity = self.capacity,
                        "refresh skipped: too many refreshes in flight"
                    );
                });
                return false;
            }
            Err(TryAcquireError::Closed) => {
                span.in_scope(|| tracing::debug!("refresh skipped: shutting down"));
                return false;
            }
        };

        let timeout = self.timeout;
        let refresh = build(RefreshSlot {
            _permit: permit,
            timeout,
        });
        let task = async move {
            match tokio::time::timeout(timeout, refresh).await {
                Ok(Ok(())) => tracing::debug!("background refresh complete"),
                Ok(Err(e)) => tracing::warn!(error = %e, "background refresh failed"),
                Err(_) => tracing::warn!(
                    after_secs = timeout.as_secs(),
                    "background refresh timed out"
                ),
            }
        };

        let mut tasks = self.lock_tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task.instrument(span));
        true
    }

    /// Slots currently taken, including by work that outlived its waiting task.
    pub(crate) fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.permits.available_permits())
    }

    /// Stops accepting refreshes, waits up to `grace` for running ones, then
    /// aborts the rest. Returns how many were aborted.
    pub(crate) async fn shutdown(&self, grace: Duration) -> usize {
        self.permits.close();
        let mut tasks = std::mem::take(&mut *self.lock_tasks());

        if tokio::time::timeout(grace, drain(&mut tasks)).await.is_ok() {
            return 0;
        }

        let aborted = tasks.len();
        tasks.abort_all();
        drain(&mut tasks).await;
        aborted
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while tasks.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn skips_refreshes_beyond_capacity() {
        let registry = RefreshRegistry::new(1, Duration::from_secs(5));
        let gate = Arc::new(Semaphore::new(0));

        let held = Arc::clone(&gate);
        assert!(registry.spawn(tracing::Span::none(), |slot| {
            slot.run(async move {
                let _ = held.acquire().await;
                Ok(())
            })
        }));
        assert!(!registry.spawn(tracing::Span::none(), |_slot| async { Ok(()) }));
        assert_eq!(registry.in_flight(), 1);

        gate.add_permits(1);
        assert_eq!(registry.shutdown(Duration::from_secs(5)).await, 0);
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn unused_slot_is_released_immediately() {
        let registry = RefreshRegistry::new(1, Duration::from_secs(5));
        let gate = Arc::new(Semaphore::new(0));

        let held = Arc::clone(&gate);
        assert!(registry.spawn(tracing::Span::none(), move |slot| {
            drop(slot);
            async move {
                let _ = held.acquire().await;
                Ok(())
            }
        }));
        assert_eq!(registry.in_flight(), 0);

        gate.add_permits(1);
        assert_eq!(registry.shutdown(Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn refresh_errors_are_absorbed() {
        let registry = RefreshRegistry::new(2, Duration::from_secs(5));
        assert!(registry.spawn(tracing::Span::none(), |_slot| async {
            Err(CacheError::InvalidTopic)
        }));
        assert_eq!(registry.shutdown(Duration::from_secs(5)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn each_refresh_is_bounded_by_its_timeout() {
        let registry = RefreshRegistry::new(1, Duration::from_secs(1));
        let finished = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&finished);
        registry.spawn(tracing::Span::none(), |slot| {
            slot.run(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                f.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        assert_eq!(registry.shutdown(Duration::from_secs(10)).await, 0);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn detached_work_keeps_its_slot_until_it_times_out() {
        let registry = RefreshRegistry::new(1, Duration::from_secs(1));
        let detached = Arc::new(Mutex::new(None));

        let handle_slot = Arc::clone(&detached);
        assert!(registry.spawn(tracing::Span::none(), move |slot| {
            let work = tokio::spawn(slot.run(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<(), CacheError>(())
            }));
            *handle_slot.lock().unwrap() = Some(work);
            async { Ok(()) }
        }));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(registry.in_flight(), 1);
        assert!(!registry.spawn(tracing::Span::none(), |_slot| async { Ok(()) }));

        let work = detached.lock().unwrap().take().expect("work spawned");
        let result = work.await.expect("join");
        assert!(matches!(
            result,
            Err(CacheError::Timeout {
                operation: "refresh",
                ..
            })
        ));
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_after_grace_period() {
        let registry = RefreshRegistry::new(2, Duration::from_secs(3600));
        registry.spawn(tracing::Span::none(), |slot| {
            slot.run(async {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(())
            })
        });

        assert_eq!(registry.shutdown(Duration::from_secs(1)).await, 1);
        assert!(!registry.spawn(tracing::Span::none(), |_slot| async { Ok(()) }));
    }
}
