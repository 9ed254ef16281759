//! Memoized store connection
//!
//! `ConnectionCache` hands out one shared handle per process:
//! - a live handle is reused as-is
//! - concurrent callers during establishment await the same attempt
//! - a failed attempt is reported to every waiter and then forgotten, so the
//!   next call starts a fresh one (no automatic retry)
//! - `close()` owns whatever it takes out of the slot, including an attempt
//!   still in flight, and is the only place a handle is disconnected

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use super::StoreError;

/// Something that can open a connection to the store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    async fn connect(&self) -> Result<Self::Handle, StoreError>;

    /// Gracefully close a handle previously returned by `connect`.
    async fn disconnect(&self, _handle: Self::Handle) {}
}

type PendingConnect<H> = Shared<BoxFuture<'static, Result<H, StoreError>>>;

enum Slot<H> {
    Empty,
    Connecting(PendingConnect<H>),
    Ready(H),
}

/// Process-wide connection cache, owned by startup and injected into handlers
pub struct ConnectionCache<C: Connector> {
    connector: Arc<C>,
    slot: Mutex<Slot<C::Handle>>,
}

impl<C: Connector> ConnectionCache<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            slot: Mutex::new(Slot::Empty),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Return the cached handle, joining or starting a connection attempt if
    /// there is none yet.
    pub async fn connect(&self) -> Result<C::Handle, StoreError> {
        let pending = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                Slot::Ready(handle) => return Ok(handle.clone()),
                Slot::Connecting(pending) => pending.clone(),
                Slot::Empty => {
                    tracing::debug!("opening store connection");
                    let connector = Arc::clone(&self.connector);
                    let pending = async move { connector.connect().await }.boxed().shared();
                    *slot = Slot::Connecting(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        // Settle the slot, unless close() or a newer attempt replaced it meanwhile
        let mut slot = self.slot.lock().await;
        if let Slot::Connecting(current) = &*slot {
            if current.ptr_eq(&pending) {
                *slot = match &result {
                    Ok(handle) => Slot::Ready(handle.clone()),
                    Err(e) => {
                        tracing::error!(error = %e, "store connection failed");
                        Slot::Empty
                    }
                };
            }
        }

        result
    }

    /// Drop the cached handle, closing it gracefully. Returns `true` if there
    /// was one to close.
    ///
    /// An attempt still in flight is awaited and its handle closed too; its
    /// waiters no longer find it in the slot and leave the slot alone.
    pub async fn close(&self) -> bool {
        let previous = {
            let mut slot = self.slot.lock().await;
            std::mem::replace(&mut *slot, Slot::Empty)
        };

        let handle = match previous {
            Slot::Ready(handle) => handle,
            Slot::Connecting(pending) => match pending.await {
                Ok(handle) => handle,
                Err(_) => return false,
            },
            Slot::Empty => return false,
        };

        self.connector.disconnect(handle).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts attempts; fails while `fail` is set.
    struct FakeConnector {
        attempts: AtomicUsize,
        disconnects: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl FakeConnector {
        fn new(delay: Duration) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                disconnects: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay,
            }
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Handle = usize;

        async fn connect(&self) -> Result<usize, StoreError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable(format!("attempt {attempt} refused")));
            }
            Ok(attempt)
        }

        async fn disconnect(&self, _handle: usize) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn reuses_cached_handle() {
        let cache = ConnectionCache::new(FakeConnector::new(Duration::ZERO));

        assert_eq!(cache.connect().await.unwrap(), 1);
        assert_eq!(cache.connect().await.unwrap(), 1);
        assert_eq!(cache.connector().attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_attempt() {
        let cache = Arc::new(ConnectionCache::new(FakeConnector::new(
            Duration::from_millis(50),
        )));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.connect().await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.expect("task panicked");
            assert_eq!(result.unwrap(), 1);
        }
        assert_eq!(cache.connector().attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_reaches_all_waiters_then_retries() {
        let cache = Arc::new(ConnectionCache::new(FakeConnector::new(
            Duration::from_millis(50),
        )));
        cache.connector().fail.store(true, Ordering::SeqCst);

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.connect().await })
            })
            .collect();

        for handle in handles {
            let err = handle.await.expect("task panicked").unwrap_err();
            assert!(matches!(err, StoreError::Unavailable(_)));
        }
        assert_eq!(cache.connector().attempts.load(Ordering::SeqCst), 1);

        // Next call starts over
        cache.connector().fail.store(false, Ordering::SeqCst);
        assert_eq!(cache.connect().await.unwrap(), 2);
        assert_eq!(cache.connector().attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn close_disconnects_and_allows_reconnect() {
        let cache = ConnectionCache::new(FakeConnector::new(Duration::ZERO));

        assert!(!cache.close().await);
        cache.connect().await.unwrap();
        assert!(cache.close().await);
        assert_eq!(cache.connector().disconnects.load(Ordering::SeqCst), 1);
        assert!(!cache.close().await);

        assert_eq!(cache.connect().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn close_during_connect_disconnects_the_late_handle() {
        let cache = Arc::new(ConnectionCache::new(FakeConnector::new(
            Duration::from_millis(100),
        )));

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.connect().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(cache.close().await);
        assert_eq!(cache.connector().disconnects.load(Ordering::SeqCst), 1);

        // The waiter still gets its result, but the handle isn't cached
        assert_eq!(waiter.await.expect("task panicked").unwrap(), 1);
        assert!(!cache.close().await);
        assert_eq!(cache.connector().disconnects.load(Ordering::SeqCst), 1);

        assert_eq!(cache.connect().await.unwrap(), 2);
        assert_eq!(cache.connector().attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn close_during_failed_connect_reports_nothing_closed() {
        let cache = Arc::new(ConnectionCache::new(FakeConnector::new(
            Duration::from_millis(100),
        )));
        cache.connector().fail.store(true, Ordering::SeqCst);

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.connect().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!cache.close().await);
        assert!(waiter.await.expect("task panicked").is_err());
        assert_eq!(cache.connector().disconnects.load(Ordering::SeqCst), 0);
    }
}
