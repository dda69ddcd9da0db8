//! Intrusive singly-linked FIFO queue.
//!
//! The queue never owns its members. Each record carries its own [`Link`]
//! (the "next" slot) and lives in some storage that maps a key to the
//! record. The queue only remembers the keys of its head and tail and
//! threads the rest through the records' links, so pushing and popping
//! never allocate.
//!
//! Any record type can participate by implementing [`Linked`]; any
//! container can hold the records by implementing [`Links`]. The event
//! loop keeps its completions in a slab arena, tests
//! use a plain `Vec`.

/// The forward link embedded in every queue member.
///
/// A record can be a member of at most one queue at a time, since it
/// has a single link.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    next: Option<usize>,
}

impl Link {
    /// Creates an unlinked slot.
    pub const fn new() -> Self {
        Self { next: None }
    }

    /// Key of the member following this one, if any.
    pub fn next(&self) -> Option<usize> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<usize>) {
        self.next = next;
    }
}

/// A record that exposes a [`Link`] slot.
pub trait Linked {
    fn link(&self) -> &Link;

    fn link_mut(&mut self) -> &mut Link;
}

/// Storage that resolves queue keys to linked records.
///
/// Keys that do not resolve to a record read as unlinked and ignore
/// writes.
pub trait Links {
    /// Returns the key following `key`.
    fn next(&self, key: usize) -> Option<usize>;

    /// Overwrites the link of `key`.
    fn set_next(&mut self, key: usize, next: Option<usize>);
}

impl<T: Linked> Links for [T] {
    fn next(&self, key: usize) -> Option<usize> {
        self.get(key).and_then(|item| item.link().next)
    }

    fn set_next(&mut self, key: usize, next: Option<usize>) {
        if let Some(item) = self.get_mut(key) {
            item.link_mut().set_next(next);
        }
    }
}

impl<T: Linked> Links for Vec<T> {
    fn next(&self, key: usize) -> Option<usize> {
        self.as_slice().next(key)
    }

    fn set_next(&mut self, key: usize, next: Option<usize>) {
        self.as_mut_slice().set_next(key, next);
    }
}

/// A FIFO queue threaded through the links of its members.
///
/// Invariants:
/// - `head` is `None` exactly when `tail` is `None`;
/// - the tail's link is always `None`;
/// - following links from `head` reaches `tail` in `len - 1` steps.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fifo {
    /// Next key to dequeue.
    head: Option<usize>,

    /// Last key enqueued.
    tail: Option<usize>,

    len: usize,
}

impl Fifo {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Returns `true` if the queue has no members.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of members currently queued.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the head without removing it.
    pub fn peek(&self) -> Option<usize> {
        self.head
    }

    /// Appends `key` at the tail.
    ///
    /// `key` must not already be a member of this or any other queue.
    pub fn push<L: Links + ?Sized>(&mut self, links: &mut L, key: usize) {
        links.set_next(key, None);

        match self.tail {
            Some(tail) => links.set_next(tail, Some(key)),
            None => self.head = Some(key),
        }

        self.tail = Some(key);
        self.len += 1;
    }

    /// Removes and returns the head.
    pub fn pop<L: Links + ?Sized>(&mut self, links: &mut L) -> Option<usize> {
        let head = self.head?;

        self.head = links.next(head);
        if self.tail == Some(head) {
            self.tail = None;
        }

        links.set_next(head, None);
        self.len -= 1;

        Some(head)
    }

    /// Removes an arbitrary member by scanning from the head.
    ///
    /// Returns `false` (and changes nothing) if `key` is not a member.
    pub fn remove<L: Links + ?Sized>(&mut self, links: &mut L, key: usize) -> bool {
        if self.head == Some(key) {
            self.pop(links);
            return true;
        }

        let mut cursor = self.head;

        while let Some(current) = cursor {
            let next = links.next(current);

            if next == Some(key) {
                if self.tail == Some(key) {
                    self.tail = Some(current);
                }

                links.set_next(current, links.next(key));
                links.set_next(key, None);
                self.len -= 1;

                return true;
            }

            cursor = next;
        }

        false
    }

    /// Returns `true` if `key` is currently queued.
    pub fn contains<L: Links + ?Sized>(&self, links: &L, key: usize) -> bool {
        self.iter(links).any(|member| member == key)
    }

    /// Iterates over the members from head to tail.
    pub fn iter<'a, L: Links + ?Sized>(&self, links: &'a L) -> Iter<'a, L> {
        Iter {
            links,
            cursor: self.head,
        }
    }
}

/// Iterator over the keys of a [`Fifo`].
pub struct Iter<'a, L: ?Sized> {
    links: &'a L,
    cursor: Option<usize>,
}

impl<L: Links + ?Sized> Iterator for Iter<'_, L> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.cursor?;
        self.cursor = self.links.next(current);
        Some(current)
    }
}
