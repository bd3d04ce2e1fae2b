use super::Bst;
use crate::error::{CheckError, Error, Result};
use crate::payload::Count;
use std::borrow::Borrow;
use std::fmt::{Debug, Formatter};

/// A sorted multiset: a set that counts how many times each element was
/// inserted.
///
/// Each distinct element occupies one node of a plain, unbalanced [`Bst`]
/// holding its occurrence count.  [`len`](Self::len) counts occurrences, not
/// distinct elements.
///
/// # Examples
/// ```
/// use multi_collections::Multiset;
///
/// let mut s = Multiset::new();
/// s.insert(23);
/// s.insert(42);
/// s.insert(42);
/// assert_eq!(s.len(), 3);
/// assert_eq!(s.min(), Ok(&23));
/// assert_eq!(s.max(), Ok(&42));
/// assert_eq!(s.count(&42), Ok(2));
/// ```
#[derive(Clone)]
pub struct Multiset<K> {
    tree: Bst<K, Count>,
    len: usize,
}

impl<K> Default for Multiset<K> {
    fn default() -> Self {
        Multiset {
            tree: Bst::new(),
            len: 0,
        }
    }
}

impl<K: Debug> Debug for Multiset<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut m = f.debug_map();
        self.tree.for_each(|(k, c)| {
            m.entry(k, &c.get());
        });
        m.finish()
    }
}

impl<K> Multiset<K> {
    /// Creates a new, empty multiset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every element.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.len = 0;
    }

    /// Returns the number of occurrences of all elements together.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of distinct elements.
    pub fn distinct_len(&self) -> usize {
        self.tree.len()
    }

    /// Returns true if the multiset holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tests if the multiset holds at least one occurrence of k.
    pub fn contains<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains(k)
    }

    /// Returns how many times k occurs.
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
            .map(|c| c.get())
            .ok_or(Error::KeyNotFound)
    }

    /// Returns the least element.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the multiset is empty.
    pub fn min(&self) -> Result<&K> {
        self.tree.min()
    }

    /// Returns the greatest element.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the multiset is empty.
    pub fn max(&self) -> Result<&K> {
        self.tree.max()
    }

    /// Returns the greatest element less than or equal to k.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the multiset is empty, [`Error::NoSuchBound`]
    /// if every element is greater than k.
    ///
    /// # Examples
    /// ```
    /// use multi_collections::{Error, Multiset};
    ///
    /// let s = Multiset::from([5, 3, 7, 3]);
    /// assert_eq!(s.floor(&4), Ok(&3));
    /// assert_eq!(s.floor(&6), Ok(&5));
    /// assert_eq!(s.floor(&2), Err(Error::NoSuchBound));
    /// ```
    pub fn floor<Q>(&self, k: &Q) -> Result<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.floor(k)
    }

    /// Returns the least element greater than or equal to k.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the multiset is empty, [`Error::NoSuchBound`]
    /// if every element is less than k.
    ///
    /// # Examples
    /// ```
    /// use multi_collections::{Error, Multiset};
    ///
    /// let s = Multiset::from([5, 3, 7, 3]);
    /// assert_eq!(s.ceiling(&4), Ok(&5));
    /// assert_eq!(s.ceiling(&6), Ok(&7));
    /// assert_eq!(s.ceiling(&8), Err(Error::NoSuchBound));
    /// ```
    pub fn ceiling<Q>(&self, k: &Q) -> Result<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.ceiling(k)
    }

    /// Applies f to each distinct element and its count in increasing order.
    pub fn for_each<F: FnMut((&K, usize))>(&self, mut f: F) {
        self.tree.for_each(|(k, c)| f((k, c.get())));
    }
}

impl<K: Ord> Multiset<K> {
    /// Adds one occurrence of key.
    pub fn insert(&mut self, key: K) {
        self.tree.insert(key, ());
        self.len += 1;
    }

    /// Removes one occurrence of k.  The element leaves the multiset with its
    /// last occurrence.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent; the multiset is left unchanged.
    pub fn remove<Q>(&mut self, k: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove_one(k)?;
        self.len -= 1;
        Ok(())
    }

    /// Removes every occurrence of k and returns how many there were.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent; the multiset is left unchanged.
    pub fn remove_all<Q>(&mut self, k: &Q) -> Result<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (_, c) = self.tree.remove_entry(k)?;
        self.len -= c.get();
        Ok(c.get())
    }

    /// Verifies the underlying tree and that the occurrence total matches the
    /// stored counts.
    ///
    /// # Errors
    /// The first [`CheckError`] found.
    pub fn check(&self) -> std::result::Result<(), CheckError> {
        self.tree.check()?;

        let mut actual = 0;
        self.tree.for_each(|(_, c)| actual += c.get());
        if actual != self.len {
            return Err(CheckError::LenMismatch {
                recorded: self.len,
                actual,
            });
        }

        Ok(())
    }
}

impl<K: Ord> Extend<K> for Multiset<K> {
    fn extend<T: IntoIterator<Item = K>>(&mut self, iter: T) {
        for k in iter {
            self.insert(k);
        }
    }
}

impl<K: Ord> FromIterator<K> for Multiset<K> {
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let mut s = Multiset::new();
        s.extend(iter);
        s
    }
}

impl<K: Ord, const N: usize> From<[K; N]> for Multiset<K> {
    fn from(ks: [K; N]) -> Self {
        Multiset::from_iter(ks)
    }
}
