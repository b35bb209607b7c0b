use std::{pin::Pin, sync::Arc};

use tokio::sync::{Notify, mpsc};

pub type DrainTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Background tasks that must be spawned before anything is published.
pub struct StartupTasks {
    pub tokio: Vec<DrainTask>,
}

/// Decouples a publisher from a slow subscriber: publishing only touches the
/// small inbox, and a drain task moves events into the subscriber's buffer.
pub struct IsolatedForwarder<T> {
    inbox_tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> IsolatedForwarder<T> {
    const INBOX_CAPACITY: usize = 16;

    pub fn new(
        output_buffer: usize,
        notify_any: Arc<Notify>,
    ) -> (IsolatedForwarder<T>, mpsc::Receiver<T>, DrainTask) {
        let (inbox_tx, mut inbox_rx) = mpsc::channel::<T>(Self::INBOX_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel::<T>(output_buffer);

        let drain_task = Box::pin(async move {
            while let Some(value) = inbox_rx.recv().await {
                if out_tx.send(value).await.is_err() {
                    break;
                }
                notify_any.notify_one();
            }
        });

        (IsolatedForwarder { inbox_tx }, out_rx, drain_task)
    }

    pub fn try_send(&self, value: T) -> Result<(), T> {
        self.inbox_tx.try_send(value).map_err(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_in_order_through_drain_task() {
        let notify = Arc::new(Notify::new());
        let (fwd, mut rx, drain) = IsolatedForwarder::new(4, Arc::clone(&notify));
        tokio::spawn(drain);

        fwd.try_send("a").unwrap();
        fwd.try_send("b").unwrap();

        assert_eq!(rx.recv().await, Some("a"));
        assert_eq!(rx.recv().await, Some("b"));
    }

    #[test]
    fn full_inbox_hands_the_value_back() {
        let (fwd, _rx, _drain) = IsolatedForwarder::new(1, Arc::new(Notify::new()));
        for i in 0..16 {
            fwd.try_send(i).unwrap();
        }
        assert_eq!(fwd.try_send(99), Err(99));
    }
}
