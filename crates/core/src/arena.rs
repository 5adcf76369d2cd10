//! Owned storage with typed handles.
//!
//! A `Handle<T>` is the identity of one object stored in an `Arena<T>`.
//! Handles are never reused: the arena is append-only.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker for key types whose equality means "same object".
///
/// Only opaque handles (and tuples of them) should implement this; it is what
/// [`crate::IdentityMap`] and [`crate::OrderedSet`] require of their keys.
pub trait Identity: Copy + Eq + Hash + fmt::Debug {}

pub struct Handle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self { index, _marker: PhantomData }
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

impl<T> Identity for Handle<T> {}

/// Append-only owner of `T` values addressed by [`Handle<T>`].
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, value: T) -> Handle<T> {
        let handle = Handle::from_raw(self.items.len() as u32);
        self.items.push(value);
        handle
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.items.get(handle.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Handles in allocation order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        (0..self.items.len()).map(|i| Handle::from_raw(i as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, v)| (Handle::from_raw(i as u32), v))
    }
}

impl<T> std::ops::Index<Handle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        &self.items[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_get_distinct_handles() {
        let mut arena = Arena::new();
        let a = arena.alloc("same".to_string());
        let b = arena.alloc("same".to_string());
        assert_ne!(a, b);
        assert_eq!(arena[a], arena[b]);
    }

    #[test]
    fn handles_follow_allocation_order() {
        let mut arena = Arena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        let handles: Vec<_> = arena.handles().collect();
        assert_eq!(handles, vec![a, b]);
        assert!(a < b);
        assert_eq!(arena.get(Handle::from_raw(7)), None);
    }
}
