use super::Llrb;
use crate::error::{CheckError, Error, Result};
use crate::payload::{Payload, Values};
use std::borrow::Borrow;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};

/// A sorted map that keeps every value inserted under a key.
///
/// The values for one key are kept in insertion order.  [`get`](Self::get)
/// and [`remove`](Self::remove) both work on the oldest of them; the key
/// itself leaves the map when its last value is removed.  Keys live in a
/// [`Llrb`] tree, so every operation is logarithmic in the number of keys.
///
/// # Examples
/// ```
/// use multi_collections::{Error, Multimap};
///
/// let mut m = Multimap::new();
/// m.insert("a", 1);
/// m.insert("a", 2);
/// m.insert("b", 3);
/// assert_eq!(m.get("a"), Ok(&1));
/// assert_eq!(m.remove("a"), Ok(1));
/// assert_eq!(m.get("a"), Ok(&2));
/// assert_eq!(m.remove("a"), Ok(2));
/// assert!(!m.contains("a"));
/// assert_eq!(m.get("a"), Err(Error::KeyNotFound));
/// ```
#[derive(Clone)]
pub struct Multimap<K, V> {
    tree: Llrb<K, Values<V>>,
}

impl<K, V> Default for Multimap<K, V> {
    fn default() -> Self {
        Multimap { tree: Llrb::new() }
    }
}

impl<K: Debug, V: Debug> Debug for Multimap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut m = f.debug_map();
        self.tree.for_each(|(k, vs)| {
            m.entry(k, vs.as_deque());
        });
        m.finish()
    }
}

impl<K, V> Multimap<K, V> {
    /// Creates a new, empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every key and value.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns true if the map holds no keys.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Tests if the map holds at least one value for k.
    pub fn contains<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains(k)
    }

    /// Returns the oldest value stored under k.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent.
    pub fn get<Q>(&self, k: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .get(k)
            .and_then(Values::first)
            .ok_or(Error::KeyNotFound)
    }

    /// Returns every value stored under k, oldest first.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent.
    pub fn get_all<Q>(&self, k: &Q) -> Result<&VecDeque<V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .get(k)
            .map(Values::as_deque)
            .ok_or(Error::KeyNotFound)
    }

    /// Returns the number of values stored under k.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent.
    pub fn count<Q>(&self, k: &Q) -> Result<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .get(k)
            .map(Payload::occurrences)
            .ok_or(Error::KeyNotFound)
    }

    /// Returns the least key.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the map is empty.
    pub fn min(&self) -> Result<&K> {
        self.tree.min()
    }

    /// Returns the greatest key.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the map is empty.
    pub fn max(&self) -> Result<&K> {
        self.tree.max()
    }

    /// Returns the greatest key less than or equal to k.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the map is empty, [`Error::NoSuchBound`] if
    /// every key is greater than k.
    pub fn floor<Q>(&self, k: &Q) -> Result<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.floor(k)
    }

    /// Returns the least key greater than or equal to k.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the map is empty, [`Error::NoSuchBound`] if
    /// every key is less than k.
    pub fn ceiling<Q>(&self, k: &Q) -> Result<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.ceiling(k)
    }

    /// Applies f to each key and its values in increasing key order.
    pub fn for_each<F: FnMut((&K, &VecDeque<V>))>(&self, mut f: F) {
        self.tree.for_each(|(k, vs)| f((k, vs.as_deque())));
    }
}

impl<K: Ord, V> Multimap<K, V> {
    /// Adds a value under key, after any values already stored there.
    pub fn insert(&mut self, key: K, value: V) {
        self.tree.insert(key, value);
    }

    /// Removes and returns the oldest value stored under k.  The key goes with
    /// it if no other value remains.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent; the map is left unchanged.
    pub fn remove<Q>(&mut self, k: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove_one(k)
    }

    /// Removes k along with all of its values and returns the values, oldest
    /// first.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent; the map is left unchanged.
    pub fn remove_all<Q>(&mut self, k: &Q) -> Result<VecDeque<V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (_, vs) = self.tree.remove_entry(k)?;
        Ok(vs.into_deque())
    }

    /// Verifies the structural invariants of the underlying tree.
    ///
    /// # Errors
    /// The first [`CheckError`] found.
    pub fn check(&self) -> std::result::Result<(), CheckError> {
        self.tree.check()
    }
}

impl<K: Ord, V> Extend<(K, V)> for Multimap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Multimap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut m = Multimap::new();
        m.extend(iter);
        m
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for Multimap<K, V> {
    fn from(vs: [(K, V); N]) -> Self {
        Multimap::from_iter(vs)
    }
}
