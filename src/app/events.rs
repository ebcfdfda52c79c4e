//! Typed publish/subscribe bus.
//!
//! Events are queued by [`EventManager::emit`] and dispatched in emission
//! order by [`EventManager::process`], which the engine calls once at the
//! start of every tick. Handlers are keyed by the event's `TypeId`.

use std::any::{Any, TypeId};
use std::collections::VecDeque;

use rustc_hash::FxHashMap;

/// Handle returned by [`EventManager::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    event: TypeId,
    index: u64,
}

type Handler = Box<dyn FnMut(&dyn Any)>;

#[derive(Default)]
pub struct EventManager {
    queue: VecDeque<(TypeId, Box<dyn Any>)>,
    handlers: FxHashMap<TypeId, Vec<(SubscriptionId, Handler)>>,
    next_index: u64,
}

impl EventManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `event` for the next [`process`](Self::process).
    pub fn emit<E: Any>(&mut self, event: E) {
        self.queue.push_back((TypeId::of::<E>(), Box::new(event)));
    }

    pub fn subscribe<E: Any>(&mut self, mut handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId {
            event: TypeId::of::<E>(),
            index: self.next_index,
        };
        self.next_index += 1;

        let erased: Handler = Box::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });
        self.handlers.entry(id.event).or_default().push((id, erased));
        id
    }

    /// Returns `false` when the subscription was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(list) = self.handlers.get_mut(&id.event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(&id.event);
        }
        removed
    }

    /// Number of events waiting for dispatch.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Dispatches every queued event to its subscribers and returns how many
    /// events were drained. Events without subscribers are dropped.
    pub fn process(&mut self) -> usize {
        let drained: Vec<_> = self.queue.drain(..).collect();
        let count = drained.len();
        for (ty, event) in drained {
            if let Some(list) = self.handlers.get_mut(&ty) {
                for (_, handler) in list.iter_mut() {
                    handler(event.as_ref());
                }
            }
        }
        count
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("pending", &self.queue.len())
            .field("event_types", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Ping(u32);
    struct Pong;

    #[test]
    fn handlers_receive_only_their_type_in_order() {
        let mut events = EventManager::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        events.subscribe(move |e: &Ping| sink.borrow_mut().push(e.0));

        events.emit(Ping(1));
        events.emit(Pong);
        events.emit(Ping(2));
        assert!(seen.borrow().is_empty());

        assert_eq!(events.process(), 3);
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(events.pending(), 0);
    }

    #[test]
    fn unsubscribed_handler_is_not_called() {
        let mut events = EventManager::new();
        let calls = Rc::new(RefCell::new(0));
        let sink = calls.clone();
        let id = events.subscribe(move |_: &Pong| *sink.borrow_mut() += 1);

        assert!(events.unsubscribe(id));
        assert!(!events.unsubscribe(id));
        events.emit(Pong);
        events.process();
        assert_eq!(*calls.borrow(), 0);
    }
}
