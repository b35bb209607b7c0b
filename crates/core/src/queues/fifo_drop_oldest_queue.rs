use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use tokio::sync::Notify;

pub struct FifoDropOldestQueue<T> {
    inner: Arc<FifoDropOldestInner<T>>,
}

struct FifoDropOldestInner<T> {
    buf: Mutex<VecDeque<T>>,
    capacity: usize,
    notify_any: Arc<Notify>,
}

pub struct FifoDropOldestReceiver<T> {
    inner: Arc<FifoDropOldestInner<T>>,
}

impl<T> FifoDropOldestQueue<T> {
    pub fn new(capacity: usize, notify_any: Arc<Notify>) -> Self {
        assert!(capacity > 0);

        Self {
            inner: Arc::new(FifoDropOldestInner {
                buf: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                notify_any,
            }),
        }
    }

    /// Append `value`, evicting the oldest entry when full. Returns whether an entry was evicted.
    pub fn push_overwrite(&self, value: T) -> bool {
        let mut buf = self.inner.buf.lock().expect("FifoDropOldestQueue poisoned");
        let evicted = buf.len() >= self.inner.capacity && buf.pop_front().is_some();
        buf.push_back(value);
        drop(buf);
        self.inner.notify_any.notify_one();
        evicted
    }

    pub fn receiver(&self) -> FifoDropOldestReceiver<T> {
        FifoDropOldestReceiver {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FifoDropOldestReceiver<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.inner
            .buf
            .lock()
            .expect("FifoDropOldestQueue poisoned")
            .pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let queue = FifoDropOldestQueue::new(2, Arc::new(Notify::new()));
        let rx = queue.receiver();

        assert!(!queue.push_overwrite(1));
        assert!(!queue.push_overwrite(2));
        assert!(queue.push_overwrite(3));

        assert_eq!(rx.try_recv(), Some(2));
        assert_eq!(rx.try_recv(), Some(3));
        assert_eq!(rx.try_recv(), None);
    }
}
