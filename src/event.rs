use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Handle returned when a listener is registered; used to deregister it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registration list for one kind of listener.
///
/// `L` is usually an unsized closure type such as `dyn FnMut(&Event)`. Listeners are notified
/// in registration order.
pub struct Listeners<L: ?Sized> {
    next_id: u64,
    entries: Vec<(ListenerId, Box<L>)>,
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Listeners<L> {
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Registers a listener and returns its handle.
    pub fn add(&mut self, listener: Box<L>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Removes a listener; returns `false` if the handle is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the registered listeners in notification order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut L> {
        self.entries.iter_mut().map(|(_, listener)| listener.as_mut())
    }
}

/// Single-threaded FIFO used to carry events from a source component back to its owner.
///
/// The owner keeps the queue, hands [`EventQueue::listener`] to the source, and drains the
/// queue after each call that can make the source emit.
pub struct EventQueue<E> {
    inner: Rc<RefCell<VecDeque<E>>>,
}

impl<E> Clone for EventQueue<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn push(&self, event: E) {
        self.inner.borrow_mut().push_back(event);
    }

    pub fn pop(&self) -> Option<E> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Drops every pending event.
    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}

impl<E: Clone + 'static> EventQueue<E> {
    /// Returns a listener closure that enqueues a copy of every event it receives.
    pub fn listener(&self) -> Box<dyn FnMut(&E)> {
        let queue = self.clone();
        Box::new(move |event: &E| queue.push(event.clone()))
    }
}
