use crate::error::TransmitError;
use futures::channel::oneshot;
use futures::future::{self, Either};
use futures_timer::Delay;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Sync + Send>;

/// A registry of `Awaited` values, each of which is associated with a predicate that determines
/// whether a given value matches the awaited value.
///
/// Adding an entry hands out an `AwaitedRef`, which is used to receive the value when it is
/// available. The `AwaitedRef` is automatically removed from the registry when it is dropped.
pub struct AwaitedRegistry<T> {
    next_id: AtomicU64,
    store: Mutex<Vec<Awaited<T>>>,
}

impl<T> Default for AwaitedRegistry<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            store: Mutex::default(),
        }
    }
}

impl<T> AwaitedRegistry<T> {
    /// Adds an entry to the registry with a given predicate, returning an `AwaitedRef` that can be
    /// used to receive the value when it is available.
    pub fn add(self: &Arc<Self>, predicate: Predicate<T>, timeout: Duration) -> AwaitedRef<T> {
        let (tx, rx) = oneshot::channel::<T>();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let awaited = Awaited {
            id,
            predicate,
            channel: tx,
        };
        if let Ok(mut vec) = self.store.lock() {
            vec.push(awaited);
        }
        AwaitedRef {
            id,
            registry: self.clone(),
            timeout,
            channel: Some(rx),
        }
    }

    /// Hands the value to the first entry whose predicate matches. The entry is removed.
    /// Returns the value if nobody was waiting for it.
    pub fn complete(&self, value: T) -> Option<T> {
        let Some(tx) = self.take_matching(&value) else {
            return Some(value);
        };
        // The waiter may have timed out in the meantime
        tx.send(value).err()
    }

    /// Finds the first entry in the registry that matches the given value and removes it
    pub fn take_matching(&self, value: &T) -> Option<oneshot::Sender<T>> {
        let mut vec = self.store.lock().ok()?;
        let index = vec.iter().position(|a| (a.predicate)(value))?;
        Some(vec.remove(index).channel)
    }

    fn remove(&self, id: u64) {
        if let Ok(mut vec) = self.store.lock() {
            vec.retain(|a| a.id != id);
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Awaited<T> {
    id: u64,
    predicate: Predicate<T>,
    channel: oneshot::Sender<T>,
}

pub struct AwaitedRef<T> {
    id: u64,
    registry: Arc<AwaitedRegistry<T>>,
    timeout: Duration,
    channel: Option<oneshot::Receiver<T>>,
}

impl<T> AwaitedRef<T> {
    /// Waits for the value, bounded by the timeout given on registration
    pub async fn try_await(mut self) -> Result<T, TransmitError> {
        let Some(rx) = self.channel.take() else {
            return Err(TransmitError::Timeout);
        };
        let delay = Delay::new(self.timeout);
        match future::select(rx, delay).await {
            Either::Left((Ok(value), _)) => Ok(value),
            // The registry was dropped
            Either::Left((Err(_), _)) => Err(TransmitError::NoReply),
            Either::Right(_) => Err(TransmitError::Timeout),
        }
    }

    /// Blocks the calling thread until the value arrives or the timeout elapses
    pub fn wait(self) -> Result<T, TransmitError> {
        futures::executor::block_on(self.try_await())
    }
}

impl<T> Drop for AwaitedRef<T> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn test_completed_from_other_thread() {
        let registry = Arc::new(AwaitedRegistry::<u8>::default());
        let awaited = registry.add(Box::new(|v| *v == 7), Duration::from_secs(5));

        let r = registry.clone();
        let io = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            assert_eq!(r.complete(6), Some(6));
            assert_eq!(r.complete(7), None);
        });

        assert_eq!(awaited.wait(), Ok(7));
        io.join().unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_timeout_removes_entry() {
        let registry = Arc::new(AwaitedRegistry::<u8>::default());
        let awaited = registry.add(Box::new(|_| true), Duration::from_millis(10));
        assert_eq!(registry.len(), 1);

        assert_eq!(awaited.wait(), Err(TransmitError::Timeout));
        assert!(registry.is_empty());
        // Nobody is waiting anymore
        assert_eq!(registry.complete(1), Some(1));
    }

    #[test]
    fn test_first_match_wins() {
        let registry = Arc::new(AwaitedRegistry::<u8>::default());
        let first = registry.add(Box::new(|v| *v > 0), Duration::from_secs(1));
        let second = registry.add(Box::new(|v| *v > 0), Duration::from_secs(1));

        assert_eq!(registry.complete(1), None);
        assert_eq!(first.wait(), Ok(1));
        assert_eq!(registry.len(), 1);
        drop(second);
        assert!(registry.is_empty());
    }
}
