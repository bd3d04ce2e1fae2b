use crate::error::{CheckError, Error, Result};
use crate::payload::Payload;
use log::trace;
use std::borrow::Borrow;
use std::cmp::Ordering::*;
use std::mem::replace;

mod multiset;
pub use multiset::Multiset;

type OptNode<K, P> = Option<Box<Node<K, P>>>;

struct Node<K, P> {
    key: K,
    payload: P,
    left: OptNode<K, P>,
    right: OptNode<K, P>,
}

/// An ordered map from keys to [`Payload`]s stored in a plain binary search
/// tree.
///
/// The tree never rebalances: its shape follows the insertion order, so the
/// operations cost O(height), which is logarithmic for random insertion orders
/// and linear for sorted ones.  Use [`Llrb`](crate::Llrb) when that matters.
///
/// No operation recurses on the height of the tree, so a tree that has
/// degenerated into a long list is still safe to query, clone and drop.
pub struct Bst<K, P> {
    len: usize,
    root: OptNode<K, P>,
}

impl<K, P> Default for Bst<K, P> {
    fn default() -> Self {
        Bst { len: 0, root: None }
    }
}

impl<K, P> Drop for Bst<K, P> {
    fn drop(&mut self) {
        unlink_all(&mut self.root);
    }
}

impl<K: Clone, P: Clone> Clone for Bst<K, P> {
    fn clone(&self) -> Self {
        // Children come before their parent in post-order, so each node's
        // copied subtrees sit on top of the work stack when it is reached.
        let mut work: Vec<Box<Node<K, P>>> = Vec::new();
        for n in post_order(&self.root) {
            let right = if n.right.is_some() { work.pop() } else { None };
            let left = if n.left.is_some() { work.pop() } else { None };
            work.push(Box::new(Node {
                key: n.key.clone(),
                payload: n.payload.clone(),
                left,
                right,
            }));
        }

        Bst {
            len: self.len,
            root: work.pop(),
        }
    }
}

// An in-order walk over the nodes of a tree.
struct InOrder<'a, K, P> {
    work: Vec<&'a Node<K, P>>,
}

impl<'a, K, P> InOrder<'a, K, P> {
    fn new(root: &'a OptNode<K, P>) -> Self {
        let mut iter = InOrder { work: Vec::new() };
        iter.push_left_spine(root);
        iter
    }

    fn push_left_spine(&mut self, mut curr: &'a OptNode<K, P>) {
        while let Some(n) = curr.as_deref() {
            self.work.push(n);
            curr = &n.left;
        }
    }
}

impl<'a, K, P> Iterator for InOrder<'a, K, P> {
    type Item = &'a Node<K, P>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.work.pop()?;
        self.push_left_spine(&n.right);
        Some(n)
    }
}

fn post_order<K, P>(root: &OptNode<K, P>) -> Vec<&Node<K, P>> {
    let mut out = Vec::new();
    let mut work: Vec<&Node<K, P>> = root.as_deref().into_iter().collect();
    while let Some(n) = work.pop() {
        out.push(n);
        work.extend(n.left.as_deref());
        work.extend(n.right.as_deref());
    }

    // out holds node, right, left; reversed it is left, right, node
    out.reverse();
    out
}

// Detaches every node from root and frees them one at a time.
fn unlink_all<K, P>(root: &mut OptNode<K, P>) {
    let mut work: Vec<Box<Node<K, P>>> = root.take().into_iter().collect();
    while let Some(mut n) = work.pop() {
        work.extend(n.left.take());
        work.extend(n.right.take());
    }
}

fn height<K, P>(root: &OptNode<K, P>) -> usize {
    let mut max = 0;
    let mut work: Vec<(&Node<K, P>, usize)> =
        root.as_deref().map(|n| (n, 1)).into_iter().collect();
    while let Some((n, depth)) = work.pop() {
        max = max.max(depth);
        work.extend(n.left.as_deref().map(|m| (m, depth + 1)));
        work.extend(n.right.as_deref().map(|m| (m, depth + 1)));
    }
    max
}

// moves the node out of its slot, leaving the slot empty
fn take_node<K, P>(opt_node: &mut OptNode<K, P>) -> Option<Node<K, P>> {
    opt_node.take().map(|n| *n)
}

// Returns the slot holding k, or the empty slot where k belongs.
fn find_slot<'a, K, P, Q>(
    mut curr: &'a mut OptNode<K, P>,
    k: &Q,
) -> &'a mut OptNode<K, P>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    loop {
        let ord = match curr.as_deref() {
            Some(n) => k.cmp(n.key.borrow()),
            None => Equal,
        };
        if ord == Equal {
            return curr;
        }

        match curr {
            Some(n) => curr = if ord == Less { &mut n.left } else { &mut n.right },
            None => return curr,
        }
    }
}

fn ins<K: Ord, P: Payload>(
    root: &mut OptNode<K, P>,
    key: K,
    item: P::Item,
) -> bool {
    let slot = find_slot(root, &key);
    match slot {
        Some(n) => {
            n.payload.merge(item);
            false
        }

        None => {
            *slot = Some(Box::new(Node {
                key,
                payload: P::from_item(item),
                left: None,
                right: None,
            }));
            true
        }
    }
}

// helper function for rm that removes the leftmost node and returns its entry
fn rm_leftmost<K, P>(root: &mut OptNode<K, P>) -> Option<(K, P)> {
    let mut curr = root;
    while curr.as_deref().is_some_and(|n| n.left.is_some()) {
        match curr {
            Some(n) => curr = &mut n.left,
            None => break,
        }
    }

    let old_n = take_node(curr)?;
    *curr = old_n.right;
    Some((old_n.key, old_n.payload))
}

// removes the node for k and returns its entry
fn rm<K, P, Q>(root: &mut OptNode<K, P>, k: &Q) -> Option<(K, P)>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let slot = find_slot(root, k);
    let n = slot.as_deref_mut()?;

    if n.left.is_some() && n.right.is_some() {
        let (succ_key, succ_payload) = rm_leftmost(&mut n.right)?;
        let old_key = replace(&mut n.key, succ_key);
        let old_payload = replace(&mut n.payload, succ_payload);
        return Some((old_key, old_payload)); // *** EARLY RETURN ***
    }

    // at most one child, which takes the node's place
    let old_n = take_node(slot)?;
    *slot = old_n.left.or(old_n.right);
    Some((old_n.key, old_n.payload))
}

fn floor<'a, K, P, Q>(mut curr: &'a OptNode<K, P>, k: &Q) -> Option<&'a K>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let mut best = None;
    while let Some(n) = curr.as_deref() {
        match k.cmp(n.key.borrow()) {
            Equal => return Some(&n.key),
            Less => curr = &n.left,
            Greater => {
                best = Some(&n.key);
                curr = &n.right;
            }
        }
    }

    best
}

fn ceiling<'a, K, P, Q>(mut curr: &'a OptNode<K, P>, k: &Q) -> Option<&'a K>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let mut best = None;
    while let Some(n) = curr.as_deref() {
        match k.cmp(n.key.borrow()) {
            Equal => return Some(&n.key),
            Greater => curr = &n.right,
            Less => {
                best = Some(&n.key);
                curr = &n.left;
            }
        }
    }

    best
}

impl<K, P> Bst<K, P> {
    /// Creates a new, empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every node.
    pub fn clear(&mut self) {
        self.len = 0;
        unlink_all(&mut self.root);
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of nodes on the longest path from the root.
    pub fn height(&self) -> usize {
        height(&self.root)
    }

    /// Applies f to each key and its payload in increasing key order.
    pub fn for_each<F: FnMut((&K, &P))>(&self, mut f: F) {
        for n in InOrder::new(&self.root) {
            f((&n.key, &n.payload));
        }
    }

    /// Returns the least key.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the tree is empty.
    pub fn min(&self) -> Result<&K> {
        let mut n = self.root.as_deref().ok_or(Error::EmptyTree)?;
        while let Some(lf) = n.left.as_deref() {
            n = lf;
        }
        Ok(&n.key)
    }

    /// Returns the greatest key.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the tree is empty.
    pub fn max(&self) -> Result<&K> {
        let mut n = self.root.as_deref().ok_or(Error::EmptyTree)?;
        while let Some(rt) = n.right.as_deref() {
            n = rt;
        }
        Ok(&n.key)
    }

    /// Returns a reference to the payload stored under k.
    pub fn get<Q>(&self, k: &Q) -> Option<&P>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut curr = &self.root;
        while let Some(n) = curr {
            match k.cmp(n.key.borrow()) {
                Less => curr = &n.left,
                Equal => return Some(&n.payload),
                Greater => curr = &n.right,
            }
        }

        None
    }

    // Emptying the payload through this reference would leave a node that
    // check() rejects; callers remove the node once its payload runs dry.
    pub(crate) fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut P>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut curr = &mut self.root;
        while let Some(n) = curr {
            match k.cmp(n.key.borrow()) {
                Less => curr = &mut n.left,
                Equal => return Some(&mut n.payload),
                Greater => curr = &mut n.right,
            }
        }

        None
    }

    /// Tests if the tree holds the key.
    pub fn contains<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(k).is_some()
    }

    /// Returns the greatest key less than or equal to k.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the tree is empty, [`Error::NoSuchBound`] if
    /// every key is greater than k.
    pub fn floor<Q>(&self, k: &Q) -> Result<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.root.is_none() {
            return Err(Error::EmptyTree);
        }
        floor(&self.root, k).ok_or(Error::NoSuchBound)
    }

    /// Returns the least key greater than or equal to k.
    ///
    /// # Errors
    /// [`Error::EmptyTree`] if the tree is empty, [`Error::NoSuchBound`] if
    /// every key is less than k.
    pub fn ceiling<Q>(&self, k: &Q) -> Result<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.root.is_none() {
            return Err(Error::EmptyTree);
        }
        ceiling(&self.root, k).ok_or(Error::NoSuchBound)
    }

    /// Removes the node for k and returns its key and whole payload.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent.
    pub fn remove_entry<Q>(&mut self, k: &Q) -> Result<(K, P)>
    where
        K: Borrow<Q> + Ord,
        P: Payload,
        Q: Ord + ?Sized,
    {
        let entry = rm(&mut self.root, k).ok_or(Error::KeyNotFound)?;
        self.len -= 1;
        trace!("bst: dropped a node, {} keys left", self.len);
        chk_tree!(self);
        Ok(entry)
    }

    /// Takes one item out of the payload stored under k.  The node is dropped
    /// when that empties its payload.
    ///
    /// # Errors
    /// [`Error::KeyNotFound`] if k is absent.
    pub fn remove_one<Q>(&mut self, k: &Q) -> Result<P::Item>
    where
        K: Borrow<Q> + Ord,
        P: Payload,
        Q: Ord + ?Sized,
    {
        let payload = self.get_mut(k).ok_or(Error::KeyNotFound)?;
        let item = payload.take_one().ok_or(Error::KeyNotFound)?;
        if payload.is_empty() {
            self.remove_entry(k)?;
        }
        Ok(item)
    }

    /// Verifies that the keys are in order, that no payload is empty and that
    /// the recorded length matches the tree.
    ///
    /// # Errors
    /// The first [`CheckError`] found.
    pub fn check(&self) -> std::result::Result<(), CheckError>
    where
        K: Ord,
        P: Payload,
    {
        let mut actual = 0;
        let mut greatest: Option<&K> = None;
        for n in InOrder::new(&self.root) {
            if n.payload.is_empty() {
                return Err(CheckError::EmptyPayload);
            }
            if greatest.is_some_and(|k| k >= &n.key) {
                return Err(CheckError::OutOfOrder);
            }
            greatest = Some(&n.key);
            actual += 1;
        }

        if actual != self.len {
            return Err(CheckError::LenMismatch {
                recorded: self.len,
                actual,
            });
        }

        Ok(())
    }
}

impl<K: Ord, P: Payload> Bst<K, P> {
    /// Inserts item under key.  If the key is already present, the item is
    /// merged into its payload.  Returns true if a new node was created.
    pub fn insert(&mut self, key: K, item: P::Item) -> bool {
        let created = ins(&mut self.root, key, item);
        if created {
            self.len += 1;
            trace!("bst: created a node, {} keys", self.len);
        }

        chk_tree!(self);
        created
    }
}

#[cfg(test)]
mod test {
    extern crate quickcheck;
    use super::*;
    use crate::payload::Count;
    use quickcheck::quickcheck;

    fn from_keys(ks: impl IntoIterator<Item = u8>) -> Bst<u8, Count> {
        let mut t = Bst::new();
        for k in ks {
            t.insert(k, ());
        }
        t
    }

    fn keys(t: &Bst<u8, Count>) -> Vec<u8> {
        let mut ks = Vec::new();
        t.for_each(|(k, _)| ks.push(*k));
        ks
    }

    fn rm_test(vs: Vec<i8>) {
        let mut t: Bst<i8, Count> = Bst::new();
        let mut set = std::collections::BTreeSet::new();

        for &k in vs.iter() {
            match k {
                1..=i8::MAX => {
                    let k = k % 32;
                    assert_eq!(t.insert(k, ()), set.insert(k));
                }

                0 | i8::MIN => (),

                _ => {
                    let k = -k % 32;
                    assert_eq!(t.remove_entry(&k).is_ok(), set.remove(&k));
                }
            }

            t.check().unwrap();
            let mut expected = set.iter();
            t.for_each(|(k, _)| assert_eq!(expected.next(), Some(k)));
            assert_eq!(expected.next(), None);
        }
    }

    #[test]
    fn sorted_inserts_degenerate() {
        let t = from_keys(0..16);
        assert_eq!(t.height(), 16);
        assert_eq!(t.min(), Ok(&0));
        assert_eq!(t.max(), Ok(&15));
    }

    #[test]
    fn rm_two_kids_test() {
        let mut t = from_keys([50, 30, 70, 20, 40, 60, 80, 65]);
        let (k, _) = t.remove_entry(&50).unwrap();
        assert_eq!(k, 50);
        assert_eq!(keys(&t), vec![20, 30, 40, 60, 65, 70, 80]);
        t.remove_entry(&70).unwrap();
        assert_eq!(keys(&t), vec![20, 30, 40, 60, 65, 80]);
        assert_eq!(t.remove_entry(&70).err(), Some(Error::KeyNotFound));
        t.check().unwrap();
    }

    #[test]
    fn floor_ceiling_test() {
        let t = from_keys([5, 3, 7, 3]);
        assert_eq!(t.floor(&4), Ok(&3));
        assert_eq!(t.floor(&6), Ok(&5));
        assert_eq!(t.ceiling(&4), Ok(&5));
        assert_eq!(t.ceiling(&6), Ok(&7));
        assert_eq!(t.floor(&2), Err(Error::NoSuchBound));
        assert_eq!(t.ceiling(&8), Err(Error::NoSuchBound));
    }

    // Builds the degenerate tree that ascending inserts produce, without paying
    // for the quadratic inserts.
    fn right_spine(n: u32) -> Bst<u32, Count> {
        let mut root = None;
        for k in (0..n).rev() {
            root = Some(Box::new(Node {
                key: k,
                payload: Count::from_item(()),
                left: None,
                right: root,
            }));
        }
        Bst {
            len: n as usize,
            root,
        }
    }

    #[test]
    fn deep_tree_test() {
        const N: u32 = 200_000;
        let mut t = right_spine(N);
        t.check().unwrap();
        assert_eq!(t.height(), N as usize);

        let mut visited = 0;
        t.for_each(|(k, _)| {
            assert_eq!(*k, visited);
            visited += 1;
        });
        assert_eq!(visited, N);

        assert_eq!(t.floor(&(N + 5)), Ok(&(N - 1)));
        assert_eq!(t.ceiling(&(N - 1)), Ok(&(N - 1)));
        assert_eq!(t.get(&(N - 1)).map(|c| c.get()), Some(1));

        assert!(t.insert(N, ()));
        assert!(!t.insert(N, ()));
        assert_eq!(t.remove_one(&N), Ok(()));
        assert_eq!(t.remove_entry(&N).map(|(k, c)| (k, c.get())), Ok((N, 1)));
        assert_eq!(t.remove_entry(&(N - 1)).map(|(k, _)| k), Ok(N - 1));
        assert_eq!(t.len(), N as usize - 1);

        let copy = t.clone();
        copy.check().unwrap();
        assert_eq!(copy.height(), N as usize - 1);
        drop(copy);

        t.clear();
        assert!(t.is_empty());
        drop(right_spine(N));
    }

    #[test]
    fn clone_keeps_shape_test() {
        let t = from_keys([50, 30, 70, 20, 40, 60, 80, 65]);
        let copy = t.clone();
        assert_eq!(keys(&copy), keys(&t));
        assert_eq!(copy.height(), t.height());
        assert_eq!(copy.len(), t.len());
        copy.check().unwrap();
    }

    #[test]
    fn rm_test_regr1() {
        rm_test(vec![31, 14, 1, 15, 32, 16, 17, -14, -31]);
    }

    quickcheck! {
        fn qc_rm_test(vs: Vec<i8>) -> () {
            rm_test(vs);
        }

        fn qc_floor_ceiling(ks: Vec<u8>, q: u8) -> () {
            let t = from_keys(ks.iter().copied());
            let expect_floor = ks.iter().filter(|&&k| k <= q).max();
            let expect_ceiling = ks.iter().filter(|&&k| k >= q).min();
            assert_eq!(t.floor(&q).ok(), expect_floor);
            assert_eq!(t.ceiling(&q).ok(), expect_ceiling);
        }
    }
}
