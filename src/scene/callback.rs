//! Ordered change-notification lists

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(1);

/// Token returned on registration, used to remove the callback again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    fn next() -> Self {
        Self(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type Callback<T> = Box<dyn FnMut(&T)>;

/// Callbacks invoked in registration order with the changed value.
pub struct CallbackList<T: ?Sized> {
    entries: SmallVec<[(CallbackId, Callback<T>); 4]>,
}

impl<T: ?Sized> CallbackList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    pub fn add(&mut self, callback: impl FnMut(&T) + 'static) -> CallbackId {
        let id = CallbackId::next();
        self.entries.push((id, Box::new(callback)));
        id
    }

    pub fn remove(&mut self, id: CallbackId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(key, _)| *key != id);
        before != self.entries.len()
    }

    pub fn invoke(&mut self, value: &T) {
        for (_, callback) in &mut self.entries {
            callback(value);
        }
    }

    /// Append callbacks registered elsewhere, keeping their order
    pub fn append(&mut self, mut other: Self) {
        self.entries.extend(other.entries.drain(..));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: ?Sized> Default for CallbackList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for CallbackList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackList")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_invoke_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut list = CallbackList::<i32>::new();
        for tag in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            list.add(move |v| log.borrow_mut().push(format!("{tag}{v}")));
        }
        list.invoke(&1);
        assert_eq!(*log.borrow(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn test_remove_by_id() {
        let hits = Rc::new(RefCell::new(0));
        let mut list = CallbackList::<()>::new();
        let h = Rc::clone(&hits);
        let id = list.add(move |_| *h.borrow_mut() += 1);
        assert!(list.remove(id));
        assert!(!list.remove(id));
        list.invoke(&());
        assert_eq!(*hits.borrow(), 0);
        assert!(list.is_empty());
    }
}
