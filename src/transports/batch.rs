//! In-memory batch queue shared by the batching transports
//!
//! Entries keep submission order. `take()` swaps the pending list out under
//! the lock, so a background flush and a size-triggered flush can never both
//! send the same entry. Failed entries go back ahead of newer ones, bounded
//! to one batch, either for a single retry (`requeue`) or until they are
//! pushed out by newer failures (`requeue_bounded`).

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct Pending<T> {
    pub item: T,
    /// Already failed once; `requeue` drops it if it fails again
    pub retried: bool,
}

#[derive(Debug)]
pub struct BatchQueue<T> {
    items: Mutex<Vec<Pending<T>>>,
    batch_size: usize,
}

impl<T> BatchQueue<T> {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            items: Mutex::new(Vec::with_capacity(batch_size)),
            batch_size,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Append an item, returning the queue length afterwards
    pub fn push(&self, item: T) -> usize {
        let mut items = self.items.lock();
        items.push(Pending {
            item,
            retried: false,
        });
        items.len()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.batch_size
    }

    /// Swap out everything pending, leaving the queue empty
    pub fn take(&self) -> Vec<Pending<T>> {
        std::mem::take(&mut *self.items.lock())
    }

    /// Put failed items back ahead of newer ones for a single retry
    ///
    /// Items that were already retried are dropped, and only the newest
    /// `batch_size` of the rest are kept. Returns how many were dropped.
    pub fn requeue(&self, failed: Vec<Pending<T>>) -> usize {
        let total = failed.len();
        let mut retry: Vec<Pending<T>> = failed
            .into_iter()
            .filter(|p| !p.retried)
            .map(|p| Pending {
                item: p.item,
                retried: true,
            })
            .collect();
        if retry.len() > self.batch_size {
            retry.drain(..retry.len() - self.batch_size);
        }
        let dropped = total - retry.len();

        let mut items = self.items.lock();
        let newer = std::mem::take(&mut *items);
        retry.extend(newer);
        *items = retry;
        dropped
    }

    /// Put failed items back ahead of newer ones with no retry limit
    ///
    /// Only the newest `batch_size` failed items are kept, so a sink that
    /// stays down holds at most one batch of backlog. Returns how many were
    /// dropped.
    pub fn requeue_bounded(&self, mut failed: Vec<Pending<T>>) -> usize {
        let dropped = failed.len().saturating_sub(self.batch_size);
        failed.drain(..dropped);

        let mut items = self.items.lock();
        let newer = std::mem::take(&mut *items);
        failed.extend(newer);
        *items = failed;
        dropped
    }

    /// Discard the oldest items beyond `max`, returning how many went
    pub fn retain_newest(&self, max: usize) -> usize {
        let mut items = self.items.lock();
        let excess = items.len().saturating_sub(max);
        items.drain(..excess);
        excess
    }
}
