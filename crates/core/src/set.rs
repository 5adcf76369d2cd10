use std::collections::HashSet;

use crate::arena::Identity;

/// Duplicate-free, insertion-ordered set of identities with one external cursor.
///
/// The cursor API (`current`/`key`/`next`/`rewind`/`valid`) walks the set the
/// way the rule objects traverse it; `iter()` is the borrow-based alternative.
/// Mutating the set while a cursor walk is in progress is unsupported.
#[derive(Debug, Clone)]
pub struct OrderedSet<T: Identity> {
    items: Vec<T>,
    members: HashSet<T>,
    cursor: usize,
}

impl<T: Identity> Default for OrderedSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            members: HashSet::new(),
            cursor: 0,
        }
    }
}

impl<T: Identity> OrderedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item`. Returns false (and changes nothing) if already present.
    pub fn push(&mut self, item: T) -> bool {
        if !self.members.insert(item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove `item` by identity. Returns false if it was not present.
    pub fn delete(&mut self, item: T) -> bool {
        if !self.members.remove(&item) {
            return false;
        }
        if let Some(pos) = self.items.iter().position(|i| *i == item) {
            self.items.remove(pos);
            if pos < self.cursor {
                self.cursor -= 1;
            }
        }
        true
    }

    pub fn contains(&self, item: T) -> bool {
        self.members.contains(&item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<T> {
        self.items.first().copied()
    }

    /// Position of `item` in insertion order.
    pub fn position(&self, item: T) -> Option<usize> {
        if !self.contains(item) {
            return None;
        }
        self.items.iter().position(|i| *i == item)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    // -- cursor ---------------------------------------------------------------

    pub fn current(&self) -> Option<T> {
        self.items.get(self.cursor).copied()
    }

    /// Cursor position, if it points at an element.
    pub fn key(&self) -> Option<usize> {
        self.valid().then_some(self.cursor)
    }

    pub fn next(&mut self) {
        if self.cursor < self.items.len() {
            self.cursor += 1;
        }
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn valid(&self) -> bool {
        self.cursor < self.items.len()
    }
}

impl<T: Identity> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.push(item);
        }
        set
    }
}

/// Sets are equal when they hold the same identities in the same order.
impl<T: Identity> PartialEq for OrderedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Identity> Eq for OrderedSet<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, Handle};

    fn handles(n: usize) -> Vec<Handle<&'static str>> {
        let mut arena = Arena::new();
        (0..n).map(|_| arena.alloc("p")).collect()
    }

    #[test]
    fn push_is_idempotent() {
        let h = handles(2);
        let mut set = OrderedSet::new();
        assert!(set.push(h[0]));
        assert!(set.push(h[1]));
        assert!(!set.push(h[0]));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![h[0], h[1]]);
    }

    #[test]
    fn cursor_walks_in_insertion_order() {
        let h = handles(3);
        let mut set: OrderedSet<_> = h.iter().copied().collect();

        let mut seen = Vec::new();
        set.rewind();
        while set.valid() {
            seen.push((set.key(), set.current()));
            set.next();
        }
        assert_eq!(
            seen,
            vec![(Some(0), Some(h[0])), (Some(1), Some(h[1])), (Some(2), Some(h[2]))]
        );
        assert_eq!(set.current(), None);
        assert_eq!(set.key(), None);

        set.rewind();
        assert_eq!(set.current(), Some(h[0]));
    }

    #[test]
    fn delete_by_identity() {
        let h = handles(3);
        let mut set: OrderedSet<_> = h.iter().copied().collect();
        assert!(set.delete(h[1]));
        assert!(!set.delete(h[1]));
        assert!(!set.contains(h[1]));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![h[0], h[2]]);
        assert_eq!(set.position(h[2]), Some(1));
    }

    #[test]
    fn delete_behind_cursor_keeps_current() {
        let h = handles(3);
        let mut set: OrderedSet<_> = h.iter().copied().collect();
        set.next();
        set.next();
        assert_eq!(set.current(), Some(h[2]));
        set.delete(h[0]);
        assert_eq!(set.current(), Some(h[2]));
    }
}
