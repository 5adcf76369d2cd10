use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::arena::Identity;

// ---------------------------------------------------------------------------
// ValueMap
// ---------------------------------------------------------------------------

/// Insertion-ordered map with keys compared by value.
#[derive(Debug, Clone)]
pub struct ValueMap<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for ValueMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> ValueMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An overwrite keeps the key's original position.
    pub fn set(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&pos) => Some(&mut self.entries[pos].1),
            None => None,
        }
    }

    /// Remove a key, returning its value. Missing keys are not an error.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pos = self.index.remove(key)?;
        let (_, value) = self.entries.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn has_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    pub fn has_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.entries.iter().any(|(_, v)| v == value)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for ValueMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl<K, V> IntoIterator for ValueMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for ValueMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Serialize, V: Serialize> Serialize for ValueMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// IdentityMap
// ---------------------------------------------------------------------------

/// Insertion-ordered map keyed by object identity.
///
/// Keys must be [`Identity`] handles; looking up with a handle to a different
/// (even structurally equal) object misses.
#[derive(Debug, Clone)]
pub struct IdentityMap<K: Identity, V> {
    inner: ValueMap<K, V>,
}

impl<K: Identity, V> Default for IdentityMap<K, V> {
    fn default() -> Self {
        Self { inner: ValueMap::default() }
    }
}

impl<K: Identity, V> IdentityMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: K, value: V) {
        self.inner.set(key, value);
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.inner.get(&key)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.inner.get_mut(&key)
    }

    pub fn delete(&mut self, key: K) -> Option<V> {
        self.inner.delete(&key)
    }

    pub fn has_key(&self, key: K) -> bool {
        self.inner.has_key(&key)
    }

    pub fn has_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.inner.has_value(value)
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.inner.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.inner.iter().map(|(k, v)| (*k, v))
    }
}

impl<K: Identity, V> FromIterator<(K, V)> for IdentityMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}

impl<K: Identity, V> IntoIterator for IdentityMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}
