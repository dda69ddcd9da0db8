use crate::fifo::{Linked, Links};

use std::mem::MaybeUninit;

/// A simple slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and
/// returns stable indices that can be reused after removal.
///
/// Internally, it keeps track of:
/// - initialized slots,
/// - free indices,
/// - and uninitialized memory using [`MaybeUninit`].
///
/// The event loop uses it as the arena owning every completion; the
/// returned index doubles as the completion id and as the key the
/// intrusive queues thread through.
pub(crate) struct Slab<T> {
    /// Storage for items (may contain uninitialized slots).
    items: Vec<MaybeUninit<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Marks whether a slot is currently initialized.
    used: Vec<bool>,
    /// Number of initialized slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with a fixed initial capacity.
    ///
    /// All slots are initially free and uninitialized. Fresh slots are
    /// handed out lowest first; freed slots are reused most recent first.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| MaybeUninit::<T>::uninit()).collect();
        let free = (0..size).rev().collect();
        let used = vec![false; size];

        Self {
            items,
            free,
            used,
            len: 0,
        }
    }

    /// Inserts a value into the slab and returns its index.
    ///
    /// If a free slot is available, it is reused.
    /// Otherwise, the slab grows exponentially.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = if let Some(i) = self.free.pop() {
            i
        } else {
            let len = self.items.len();
            let new_len = if len == 0 { 1 } else { 2 * len };

            self.items
                .extend((len..new_len).map(|_| MaybeUninit::<T>::uninit()));
            self.free.extend(((len + 1)..new_len).rev());
            self.used.resize(new_len, false);

            len
        };

        self.items[index] = MaybeUninit::new(item);
        self.used[index] = true;
        self.len += 1;

        index
    }

    /// Removes and returns the value stored at `index`.
    ///
    /// Returns `None` if the slot is not in use. The slot becomes free
    /// and may be reused by future insertions.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        if !self.contains(index) {
            return None;
        }

        self.free.push(index);
        self.used[index] = false;
        self.len -= 1;

        // SAFETY: `used[index]` was set, so the slot is initialized, and it
        // is marked unused before anyone can read it again.
        let item = unsafe { self.items[index].assume_init_read() };
        self.items[index] = MaybeUninit::uninit();

        Some(item)
    }

    /// Returns `true` if `index` holds a value.
    pub(crate) fn contains(&self, index: usize) -> bool {
        self.used.get(index).copied().unwrap_or(false)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        if !self.contains(index) {
            return None;
        }

        // SAFETY: the slot is marked used, hence initialized.
        Some(unsafe { self.items[index].assume_init_ref() })
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if !self.contains(index) {
            return None;
        }

        // SAFETY: the slot is marked used, hence initialized.
        Some(unsafe { self.items[index].assume_init_mut() })
    }

    /// Number of values currently stored.
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl<T: Linked> Links for Slab<T> {
    fn next(&self, key: usize) -> Option<usize> {
        self.get(key).and_then(|item| item.link().next())
    }

    fn set_next(&mut self, key: usize, next: Option<usize>) {
        if let Some(item) = self.get_mut(key) {
            item.link_mut().set_next(next);
        }
    }
}

impl<T> Drop for Slab<T> {
    /// Drops all initialized elements stored in the slab.
    ///
    /// Uninitialized slots are ignored.
    fn drop(&mut self) {
        for (slot, &used) in self.items.iter_mut().zip(self.used.iter()) {
            if used {
                // SAFETY: used slots are initialized and dropped exactly once.
                unsafe {
                    slot.assume_init_drop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_reuses_freed_slots() {
        let mut slab = Slab::new(2);

        let a = slab.insert("a");
        let b = slab.insert("b");
        assert_eq!((a, b), (0, 1));

        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.insert("c"), a);
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn test_freed_slots_are_reused_most_recent_first() {
        let mut slab = Slab::new(3);

        let a = slab.insert("a");
        let b = slab.insert("b");

        slab.remove(a);
        slab.remove(b);

        assert_eq!(slab.insert("c"), b);
        assert_eq!(slab.insert("d"), a);
        assert_eq!(slab.insert("e"), 2);
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut slab = Slab::new(0);

        let keys: Vec<usize> = (0..5).map(|i| slab.insert(i)).collect();
        assert_eq!(keys, vec![0, 1, 2, 3, 4]);
        assert_eq!(slab.get(3), Some(&3));
    }

    #[test]
    fn test_remove_vacant_is_none() {
        let mut slab: Slab<u32> = Slab::new(4);

        assert_eq!(slab.remove(2), None);
        assert_eq!(slab.remove(100), None);
        assert!(slab.get_mut(0).is_none());
    }
}
