use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

use crate::{events::EnrichedEvent, queues::FifoDropOldestReceiver};

pub enum FifoReceiver {
    FifoDropOldest(FifoDropOldestReceiver<Arc<EnrichedEvent>>),
    Isolated(mpsc::Receiver<Arc<EnrichedEvent>>),
}

impl FifoReceiver {
    fn try_recv(&mut self) -> Option<Arc<EnrichedEvent>> {
        match self {
            FifoReceiver::FifoDropOldest(r) => r.try_recv(),
            FifoReceiver::Isolated(r) => r.try_recv().ok(),
        }
    }
}

pub struct FifoInput {
    pub event_type: &'static str,
    pub receiver: FifoReceiver,
}

pub struct WorkerInputs {
    pub fifos: Vec<FifoInput>,
    pub notify_any: Arc<Notify>,
    pub fifo_index: usize,
}

impl WorkerInputs {
    /// Next event across all inputs, polled round-robin so one busy input cannot starve the rest
    pub async fn next(&mut self) -> Arc<EnrichedEvent> {
        loop {
            if !self.fifos.is_empty() {
                let start = self.fifo_index;

                loop {
                    let i = self.fifo_index;
                    self.fifo_index = (self.fifo_index + 1) % self.fifos.len();

                    if let Some(e) = self.fifos[i].receiver.try_recv() {
                        return e;
                    }

                    if self.fifo_index == start {
                        break;
                    }
                }
            }
            self.notify_any.notified().await;
        }
    }
}
