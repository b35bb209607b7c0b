pub mod fifo_drop_oldest_queue;
pub mod isolated_forwarder;

pub use fifo_drop_oldest_queue::*;
pub use isolated_forwarder::*;

pub enum QueueKind {
    /// Bounded buffer that evicts the oldest event when full
    FifoDropOldest { capacity: usize },
    /// Hand-off through a drain task; publishing drops when the inbox is full
    Isolated { output_buffer: usize },
}
