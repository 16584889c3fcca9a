/// Handle returned when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(usize);

/// An explicit registry of callbacks for one kind of event.
/// Delivery is synchronous and in registration order.
pub struct Listeners<E> {
    next_id: usize,
    listeners: Vec<(ListenerId, Box<dyn FnMut(&E) + Send>)>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    pub fn add(&mut self, listener: impl FnMut(&E) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether a listener with that id was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn notify(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_notify_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners: Listeners<u32> = Listeners::new();

        for name in ["first", "second", "third"] {
            let seen = seen.clone();
            listeners.add(move |value: &u32| seen.lock().unwrap().push(format!("{name}:{value}")));
        }

        listeners.notify(&7);

        assert_eq!(*seen.lock().unwrap(), vec!["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let count = Arc::new(Mutex::new(0));
        let mut listeners: Listeners<()> = Listeners::new();

        let id = {
            let count = count.clone();
            listeners.add(move |_| *count.lock().unwrap() += 1)
        };
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id), "Should not be able to remove twice");

        listeners.notify(&());
        assert_eq!(*count.lock().unwrap(), 0);
        assert!(listeners.is_empty());
    }
}
