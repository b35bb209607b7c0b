use std::{
    collections::HashMap,
    sync::{Arc, atomic::AtomicU64},
};

use crate::{
    events::EnrichedEvent,
    queues::{FifoDropOldestQueue, IsolatedForwarder},
};

/// Event type to subscriber routes, fixed once the bus is built
pub struct Routes {
    pub table: HashMap<&'static str, Vec<Route>>,
}

pub struct Route {
    pub subscriber_id: &'static str,
    pub inbox: RouteInbox,
    pub drops_total: Arc<AtomicU64>,
}

pub enum RouteInbox {
    FifoDropOldest(Arc<FifoDropOldestQueue<Arc<EnrichedEvent>>>),
    Isolated(IsolatedForwarder<Arc<EnrichedEvent>>),
}

impl RouteInbox {
    /// Returns false when the event (or an older one it displaced) was lost
    pub fn try_deliver(&self, event: Arc<EnrichedEvent>) -> bool {
        match self {
            RouteInbox::FifoDropOldest(q) => !q.push_overwrite(event),
            RouteInbox::Isolated(fwd) => fwd.try_send(event).is_ok(),
        }
    }
}
