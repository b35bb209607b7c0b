use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Result;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
    events::{EnrichedEvent, EventBus},
    queues::{FifoDropOldestQueue, IsolatedForwarder, QueueKind, StartupTasks},
    routes::{Route, RouteInbox, Routes},
    workers::{FifoInput, FifoReceiver, SubscriptionSpec, WorkerInputs, WorkerWiring},
};

pub struct BusConfig {
    pub session_id: Uuid,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4(),
        }
    }
}

pub struct BusMetrics {
    pub unrouted_publish_total: AtomicU64,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self {
            unrouted_publish_total: AtomicU64::new(0),
        }
    }

    pub fn record_unrouted(&self, _evt: &'static str) {
        self.unrouted_publish_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unrouted(&self) -> u64 {
        self.unrouted_publish_total.load(Ordering::Relaxed)
    }
}

impl Default for BusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(subs: &[SubscriptionSpec]) -> Result<()> {
    let mut seen_subscribers: HashSet<&'static str> = HashSet::new();
    for s in subs {
        if s.subscriber_id.trim().is_empty() {
            anyhow::bail!("empty subscriber_id");
        }
        if !seen_subscribers.insert(s.subscriber_id) {
            anyhow::bail!("duplicate subscriber_id={}", s.subscriber_id);
        }
        if s.inputs.is_empty() {
            anyhow::bail!("subscriber_id={} has no inputs", s.subscriber_id);
        }

        let mut seen_inputs: HashSet<&'static str> = HashSet::new();
        for i in &s.inputs {
            if i.event_type.trim().is_empty() {
                anyhow::bail!("subscriber_id={} has empty event_type", s.subscriber_id);
            }
            if !seen_inputs.insert(i.event_type) {
                anyhow::bail!(
                    "subscriber_id={} has duplicate input event_type={}",
                    s.subscriber_id,
                    i.event_type
                );
            }

            match i.queue_kind {
                QueueKind::FifoDropOldest { capacity } => {
                    anyhow::ensure!(capacity > 0, "capacity must be > 0")
                }
                QueueKind::Isolated { output_buffer } => {
                    anyhow::ensure!(output_buffer > 0, "output_buffer must be > 0")
                }
            }
        }
    }
    Ok(())
}

pub struct EventBusBuilder {
    cfg: BusConfig,
    subs: Vec<SubscriptionSpec>,
}

impl EventBusBuilder {
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            subs: Vec::new(),
        }
    }

    pub fn subscribe(mut self, s: SubscriptionSpec) -> Self {
        self.subs.push(s);
        self
    }

    pub fn build(self) -> Result<(EventBus, WorkerWiring, StartupTasks)> {
        validate(&self.subs)?;

        let mut routes: HashMap<&'static str, Vec<Route>> = HashMap::new();
        let mut wiring: HashMap<&'static str, WorkerInputs> = HashMap::new();
        let mut tasks = StartupTasks { tokio: Vec::new() };
        let metrics = Arc::new(BusMetrics::new());

        for spec in self.subs {
            let notify_any = Arc::new(Notify::new());
            let mut fifos = Vec::new();

            for input in spec.inputs {
                let drops_total = Arc::new(AtomicU64::new(0));

                match input.queue_kind {
                    QueueKind::FifoDropOldest { capacity } => {
                        let q =
                            Arc::new(FifoDropOldestQueue::new(capacity, Arc::clone(&notify_any)));
                        routes.entry(input.event_type).or_default().push(Route {
                            subscriber_id: spec.subscriber_id,
                            inbox: RouteInbox::FifoDropOldest(Arc::clone(&q)),
                            drops_total: Arc::clone(&drops_total),
                        });
                        fifos.push(FifoInput {
                            event_type: input.event_type,
                            receiver: FifoReceiver::FifoDropOldest(q.receiver()),
                        });
                    }
                    QueueKind::Isolated { output_buffer } => {
                        let (fwd, out_rx, drain_task) =
                            IsolatedForwarder::<Arc<EnrichedEvent>>::new(
                                output_buffer,
                                Arc::clone(&notify_any),
                            );
                        tasks.tokio.push(drain_task);

                        routes.entry(input.event_type).or_default().push(Route {
                            subscriber_id: spec.subscriber_id,
                            inbox: RouteInbox::Isolated(fwd),
                            drops_total: Arc::clone(&drops_total),
                        });

                        fifos.push(FifoInput {
                            event_type: input.event_type,
                            receiver: FifoReceiver::Isolated(out_rx),
                        });
                    }
                }
            }

            wiring.insert(
                spec.subscriber_id,
                WorkerInputs {
                    fifos,
                    notify_any,
                    fifo_index: 0,
                },
            );
        }

        let bus = EventBus::new(self.cfg, Routes { table: routes }, metrics);
        Ok((bus, WorkerWiring::new(wiring), tasks))
    }
}

#[cfg(test)]
mod tests {
    use std::{any::Any, time::SystemTime};

    use serde::Serialize;

    use super::*;
    use crate::{events::Event, workers::InputSpec};

    #[derive(Serialize)]
    struct Ping {
        id: Uuid,
    }

    impl Event for Ping {
        fn event_id(&self) -> Uuid {
            self.id
        }

        fn parent_ids(&self) -> &[Uuid] {
            &[]
        }

        fn event_type(&self) -> &'static str {
            "test.ping"
        }

        fn timestamp(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn spec(id: &'static str, queue_kind: QueueKind) -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: id,
            inputs: vec![InputSpec {
                event_type: "test.ping",
                queue_kind,
            }],
        }
    }

    #[test]
    fn duplicate_subscribers_are_rejected() {
        let result = EventBusBuilder::new(BusConfig::default())
            .subscribe(spec("a", QueueKind::FifoDropOldest { capacity: 1 }))
            .subscribe(spec("a", QueueKind::FifoDropOldest { capacity: 1 }))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = EventBusBuilder::new(BusConfig::default())
            .subscribe(spec("a", QueueKind::FifoDropOldest { capacity: 0 }))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn published_events_reach_every_subscriber() {
        let (bus, mut wiring, tasks) = EventBusBuilder::new(BusConfig::default())
            .subscribe(spec("fifo", QueueKind::FifoDropOldest { capacity: 2 }))
            .subscribe(spec("isolated", QueueKind::Isolated { output_buffer: 2 }))
            .build()
            .unwrap();
        for t in tasks.tokio {
            tokio::spawn(t);
        }

        let id = Uuid::new_v4();
        bus.publish(Arc::new(Ping { id }));

        let mut fifo = wiring.take("fifo").unwrap();
        let mut isolated = wiring.take("isolated").unwrap();
        assert_eq!(fifo.next().await.event.event_id(), id);
        assert_eq!(isolated.next().await.event.event_id(), id);
    }

    #[test]
    fn unrouted_events_are_counted() {
        let (bus, _wiring, _tasks) = EventBusBuilder::new(BusConfig::default()).build().unwrap();
        bus.publish(Arc::new(Ping { id: Uuid::new_v4() }));
        assert_eq!(bus.metrics().unrouted(), 1);
    }
}
