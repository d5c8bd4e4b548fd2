use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{trace, warn};

// EventNode
//
// A node in the listener tree. Player events are fired on the world's node and on the
// player's own node; anything that wants to react to them hangs a child node underneath and
// detaches the whole child again with a single `remove_child` call.
//
// Dispatch works on a snapshot of the listeners and children, so a listener is free to add or
// remove listeners and children (including its own node) while it runs.

// Any type that can travel through the bus
pub trait Event: Any + Send + Sync {
    fn is_cancelled(&self) -> bool {
        false
    }
}

// Boxed event handler type
type BoxedHandler = Arc<dyn Fn(&dyn Any) -> anyhow::Result<()> + Send + Sync>;

type Filter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type Handler<E> = Box<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct Registered {
    id: ListenerId,
    handler: BoxedHandler,
}

/// A typed listener with its filters, built through [`EventListener::builder`].
pub struct EventListener<E: Event> {
    ignore_cancelled: bool,
    filters: Vec<Filter<E>>,
    handler: Handler<E>,
}

impl<E: Event> EventListener<E> {
    pub fn builder() -> EventListenerBuilder<E> {
        EventListenerBuilder {
            ignore_cancelled: false,
            filters: Vec::new(),
        }
    }

    fn run(&self, event: &E) -> anyhow::Result<()> {
        if self.ignore_cancelled && event.is_cancelled() {
            return Ok(());
        }
        if !self.filters.iter().all(|filter| filter(event)) {
            return Ok(());
        }
        (self.handler)(event)
    }
}

pub struct EventListenerBuilder<E: Event> {
    ignore_cancelled: bool,
    filters: Vec<Filter<E>>,
}

impl<E: Event> EventListenerBuilder<E> {
    // Skip the handler when the event has been cancelled by an earlier listener
    pub fn ignore_cancelled(mut self, ignore: bool) -> Self {
        self.ignore_cancelled = ignore;
        self
    }

    // Every filter must pass for the handler to run
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn handler<F>(self, handler: F) -> EventListener<E>
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        EventListener {
            ignore_cancelled: self.ignore_cancelled,
            filters: self.filters,
            handler: Box::new(handler),
        }
    }
}

pub struct EventNode {
    name: String,
    next_id: AtomicU64,
    handlers: RwLock<HashMap<TypeId, Vec<Registered>>>,
    children: RwLock<Vec<Arc<EventNode>>>,
}

impl EventNode {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(EventNode {
            name: name.into(),
            next_id: AtomicU64::new(0),
            handlers: RwLock::new(HashMap::new()),
            children: RwLock::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Register a listener built with filters
    pub fn add_listener<E: Event>(&self, listener: EventListener<E>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        // Create a type-erased handler
        let handler: BoxedHandler = Arc::new(move |event: &dyn Any| match event.downcast_ref::<E>() {
            Some(specific_event) => listener.run(specific_event),
            None => Ok(()),
        });

        self.handlers
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Registered { id, handler });
        id
    }

    // Shorthand for a listener without filters
    pub fn listen<E, F>(&self, handler: F) -> ListenerId
    where
        E: Event,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_listener(EventListener::builder().handler(handler))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut handlers = self.handlers.write();
        for registered in handlers.values_mut() {
            if let Some(index) = registered.iter().position(|entry| entry.id == id) {
                registered.remove(index);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    pub fn add_child(&self, child: Arc<EventNode>) {
        self.children.write().push(child);
    }

    pub fn remove_child(&self, child: &Arc<EventNode>) -> bool {
        let mut children = self.children.write();
        match children.iter().position(|existing| Arc::ptr_eq(existing, child)) {
            Some(index) => {
                children.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    /// Fire `event` on this node and then on every child, depth first.
    ///
    /// Every listener runs even if an earlier one failed; the first failure is handed back to
    /// the caller and the rest are logged.
    pub fn call<E: Event>(&self, event: &E) -> anyhow::Result<()> {
        let handlers = self
            .handlers
            .read()
            .get(&TypeId::of::<E>())
            .cloned()
            .unwrap_or_default();
        let children = self.children.read().clone();

        trace!(
            node = %self.name,
            listeners = handlers.len(),
            children = children.len(),
            "dispatching {}",
            std::any::type_name::<E>()
        );

        let mut first_error = None;
        let mut record = |result: anyhow::Result<()>| {
            if let Err(err) = result {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!(node = %self.name, "additional listener failure: {:#}", err);
                }
            }
        };

        for registered in &handlers {
            record((registered.handler)(event as &dyn Any));
        }
        for child in &children {
            record(child.call(event));
        }

        match first_error {
            Some(err) => Err(err.context(format!("listener failed on event node '{}'", self.name))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod event_bus_tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicBool;

    // Example event types for testing
    #[derive(Debug, Clone)]
    struct TestEvent;
    impl Event for TestEvent {}

    #[derive(Debug, Clone)]
    struct DataEvent {
        data: String,
    }
    impl Event for DataEvent {}

    #[derive(Debug)]
    struct CancellableEvent {
        cancelled: AtomicBool,
    }
    impl Event for CancellableEvent {
        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_simple_event_subscription() {
        let node = EventNode::new("root");
        let received = Arc::new(Mutex::new(false));
        let test_received = Arc::clone(&received);

        node.listen(move |_: &TestEvent| {
            *test_received.lock() = true;
            Ok(())
        });
        node.call(&TestEvent).unwrap();

        assert!(*received.lock());
    }

    #[test]
    fn test_multiple_subscribers() {
        let node = EventNode::new("root");
        let received_count = Arc::new(Mutex::new(0));

        for _ in 0..3 {
            let count_clone = Arc::clone(&received_count);
            node.listen(move |_: &TestEvent| {
                *count_clone.lock() += 1;
                Ok(())
            });
        }
        node.call(&TestEvent).unwrap();

        assert_eq!(*received_count.lock(), 3);
    }

    #[test]
    fn test_event_data_passing() {
        let node = EventNode::new("root");
        let received_data = Arc::new(Mutex::new(None));
        let data_clone = Arc::clone(&received_data);

        node.listen(move |event: &DataEvent| {
            *data_clone.lock() = Some(event.data.clone());
            Ok(())
        });
        // A different event type must not reach the DataEvent listener
        node.call(&TestEvent).unwrap();
        assert_eq!(*received_data.lock(), None);

        node.call(&DataEvent {
            data: "Test Data".to_string(),
        })
        .unwrap();
        assert_eq!(*received_data.lock(), Some("Test Data".to_string()));
    }

    #[test]
    fn test_no_subscribers_scenario() {
        let node = EventNode::new("root");
        assert!(node.call(&TestEvent).is_ok());
    }

    #[test]
    fn test_children_receive_and_detach() {
        let root = EventNode::new("root");
        let child = EventNode::new("child");
        let count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&count);
        child.listen(move |_: &TestEvent| {
            *count_clone.lock() += 1;
            Ok(())
        });

        root.add_child(Arc::clone(&child));
        root.call(&TestEvent).unwrap();
        assert!(root.remove_child(&child));
        assert!(!root.remove_child(&child));
        root.call(&TestEvent).unwrap();

        assert_eq!(*count.lock(), 1);
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn test_filters_and_cancellation() {
        let node = EventNode::new("root");
        let hits = Arc::new(Mutex::new(0));

        let hits_clone = Arc::clone(&hits);
        node.add_listener(
            EventListener::<CancellableEvent>::builder()
                .ignore_cancelled(true)
                .handler(move |_| {
                    *hits_clone.lock() += 1;
                    Ok(())
                }),
        );
        let hits_clone = Arc::clone(&hits);
        node.add_listener(
            EventListener::<CancellableEvent>::builder()
                .filter(|_| false)
                .handler(move |_| {
                    *hits_clone.lock() += 100;
                    Ok(())
                }),
        );

        node.call(&CancellableEvent {
            cancelled: AtomicBool::new(true),
        })
        .unwrap();
        assert_eq!(*hits.lock(), 0);

        node.call(&CancellableEvent {
            cancelled: AtomicBool::new(false),
        })
        .unwrap();
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let node = EventNode::new("root");
        let id = node.listen(|_: &TestEvent| Ok(()));
        assert_eq!(node.listener_count(), 1);
        assert!(node.remove_listener(id));
        assert!(!node.remove_listener(id));
        assert_eq!(node.listener_count(), 0);
    }

    #[test]
    fn test_failures_reach_caller_and_do_not_starve_others() {
        let node = EventNode::new("root");
        let ran = Arc::new(Mutex::new(false));
        let ran_clone = Arc::clone(&ran);

        node.listen(|_: &TestEvent| Err(anyhow::anyhow!("boom")));
        node.listen(move |_: &TestEvent| {
            *ran_clone.lock() = true;
            Ok(())
        });

        let err = node.call(&TestEvent).unwrap_err();
        assert!(format!("{:#}", err).contains("boom"));
        assert!(*ran.lock());
    }

    #[test]
    fn test_listener_can_detach_its_own_node() {
        let root = EventNode::new("root");
        let child = EventNode::new("child");
        let weak_root = Arc::downgrade(&root);
        let weak_child = Arc::downgrade(&child);
        child.listen(move |_: &TestEvent| {
            if let (Some(root), Some(child)) = (weak_root.upgrade(), weak_child.upgrade()) {
                root.remove_child(&child);
            }
            Ok(())
        });
        root.add_child(child);

        root.call(&TestEvent).unwrap();
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn test_high_frequency_events() {
        let node = EventNode::new("root");
        let event_count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&event_count);
        node.listen(move |_: &TestEvent| {
            *count_clone.lock() += 1;
            Ok(())
        });

        for _ in 0..1000 {
            node.call(&TestEvent).unwrap();
        }

        assert_eq!(*event_count.lock(), 1000);
    }
}
