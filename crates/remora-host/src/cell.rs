//! Single-slot rendezvous cell shared between threads.
//!
//! A [`SlotCell`] holds at most one value. Taking from an empty cell blocks
//! until a value is put, and putting into a full cell blocks until the value
//! is taken. The lifecycle and channel-identity cells are built on it.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Blocking single-slot cell.
#[derive(Debug)]
pub(crate) struct SlotCell<T> {
    slot: Mutex<Option<T>>,
    changed: Condvar,
}

impl<T> Default for SlotCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> SlotCell<T> {
    /// Creates an empty cell.
    pub(crate) const fn empty() -> Self {
        Self {
            slot: Mutex::new(None),
            changed: Condvar::new(),
        }
    }

    /// Creates a cell already holding `value`.
    pub(crate) const fn full(value: T) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
            changed: Condvar::new(),
        }
    }

    /// Puts `value`, waiting while the cell still holds an unconsumed value.
    pub(crate) fn put(&self, value: T) {
        let mut slot = self.lock();
        while slot.is_some() {
            slot = self
                .changed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *slot = Some(value);
        self.changed.notify_all();
    }

    /// Removes and returns the value, waiting while the cell is empty.
    pub(crate) fn take(&self) -> T {
        let mut slot = self.lock();
        loop {
            if let Some(value) = slot.take() {
                self.changed.notify_all();
                return value;
            }
            slot = self
                .changed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes and returns the value, waiting at most `timeout`.
    pub(crate) fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let mut slot = self.wait_full(timeout)?;
        let value = slot.take();
        self.changed.notify_all();
        value
    }

    /// Removes the value without waiting.
    pub(crate) fn try_take(&self) -> Option<T> {
        let value = self.lock().take();
        if value.is_some() {
            self.changed.notify_all();
        }
        value
    }

    /// Replaces the current contents atomically, returning the previous value.
    pub(crate) fn replace(&self, value: T) -> Option<T> {
        let previous = self.lock().replace(value);
        self.changed.notify_all();
        previous
    }

    /// Returns `true` when the cell holds a value.
    pub(crate) fn is_full(&self) -> bool {
        self.lock().is_some()
    }

    fn wait_full(&self, timeout: Duration) -> Option<MutexGuard<'_, Option<T>>> {
        // An unrepresentable deadline means the caller is prepared to wait
        // indefinitely.
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.lock();
        while slot.is_none() {
            slot = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    self.changed
                        .wait_timeout(slot, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .changed
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
        Some(slot)
    }

    // No caller code runs while the lock is held, so a poisoned guard still
    // protects a consistent `Option`.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> SlotCell<T> {
    /// Returns a copy of the value without removing it, waiting at most
    /// `timeout` for one to arrive.
    pub(crate) fn read_timeout(&self, timeout: Duration) -> Option<T> {
        self.wait_full(timeout).and_then(|slot| slot.clone())
    }

    /// Returns a copy of the value without waiting.
    pub(crate) fn try_read(&self) -> Option<T> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn take_returns_put_value() {
        let cell = SlotCell::empty();
        cell.put(7_u8);
        assert_eq!(cell.take(), 7);
        assert!(!cell.is_full());
    }

    #[test]
    fn take_blocks_until_value_arrives() {
        let cell = Arc::new(SlotCell::empty());
        let producer = Arc::clone(&cell);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.put("ready");
        });
        assert_eq!(cell.take(), "ready");
        handle.join().expect("producer thread");
    }

    #[test]
    fn take_timeout_expires_on_empty_cell() {
        let cell: SlotCell<u8> = SlotCell::empty();
        assert_eq!(cell.take_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn read_leaves_value_in_place() {
        let cell = SlotCell::full(String::from("name"));
        assert_eq!(
            cell.read_timeout(Duration::from_millis(10)).as_deref(),
            Some("name")
        );
        assert_eq!(cell.try_read().as_deref(), Some("name"));
        assert!(cell.is_full());
    }

    #[test]
    fn replace_swaps_contents() {
        let cell = SlotCell::full(1_u8);
        assert_eq!(cell.replace(2), Some(1));
        assert_eq!(cell.try_take(), Some(2));
        assert_eq!(cell.try_take(), None);
    }
}
