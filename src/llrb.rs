use crate::error::{CheckError, Error, Result};
use crate::payload::Payload;
use log::trace;
use std::borrow::Borrow;
use std::cmp::Ordering::*;
use std::mem::replace;

mod multimap;
pub use multimap::Multimap;

type OptNode<K, P> = Option<Box<Node<K, P>>>;

// The color of the link from a node's parent to the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}
use Color::*;

impl Color {
    fn flip(self) -> Self {
        match self {
            Red => Black,
            Black => Red,
        }
    }
}

#[derive(Clone)]
struct Node<K, P> {
    key: K,
    payload: P,
    color: Color,
    left: OptNode<K, P>,
    right: OptNode<K, P>,
}

impl<K, P> Node<K, P> {
    // New nodes always join the tree through a red link.
    fn new(key: K, payload: P) -> Self {
        Node {
            key,
            payload,
            color: Red,
            left: None,
            right: None,
        }
    }

    fn for_each<F: FnMut((&K, &P))>(&self, g: &mut F) {
        if let Some(lf) = self.left.as_deref() {
            lf.for_each(g);
        }

        g((&self.key, &self.payload));

        if let Some(rt) = self.right.as_deref() {
            rt.for_each(g);
        }
    }
}

/// An ordered map from keys to [`Payload`]s kept balanced as a
/// [left-leaning red-black tree](https://en.wikipedia.org/wiki/Left-leaning_red%E2%80%93black_tree).
///
/// Every key appears in at most one node.  Inserting a key that is already
/// present merges the new item into that node's payload, and removing an item
/// only drops the node once its payload has run dry.  The tree keeps the LLRB
/// invariants after every public operation:
///
/// - red links lean left and no path has two red links in a row,
/// - every path from the root to an empty subtree crosses the same number of
///   black links,
/// - the root is black.
///
/// so searches, insertions and removals are all logarithmic in the number of
/// distinct keys.
///
/// # Examples
/// ```
/// use multi_collections::{Count, Llrb};
///
/// let mut t: Llrb<u32, Count> = Llrb::new();
/// t.insert(7, ());
/// t.insert(7, ());
/// assert_eq!(t.len(), 1);
/// assert_eq!(t.get(&7).map(|c| c.get()), Some(2));
/// ```
#[derive(Clone)]
pub struct Llrb<K, P> {
    len: usize,
    root: OptNode<K, P>,
}

impl<K, P> Default for Llrb<K, P> {
    fn default() -> Self {
        Llrb { len: 0, root: None }
    }
}

fn is_red<K, P>(opt_node: &OptNode<K, P>) -> bool {
    matches!(opt_node.as_deref(), Some(n) if n.color == Red)
}

// is the left child of the node red?
fn is_left_red<K, P>(opt_node: &OptNode<K, P>) -> bool {
    opt_node.as_deref().map_or(false, |n| is_red(&n.left))
}

fn leans_right<K, P>(opt_node: &OptNode<K, P>) -> bool {
    opt_node
        .as_deref()
        .map_or(false, |n| is_red(&n.right) && !is_red(&n.left))
}

fn has_two_left_reds<K, P>(opt_node: &OptNode<K, P>) -> bool {
    opt_node
        .as_deref()
        .map_or(false, |n| is_red(&n.left) && is_left_red(&n.left))
}

fn has_red_kids<K, P>(opt_node: &OptNode<K, P>) -> bool {
    opt_node
        .as_deref()
        .map_or(false, |n| is_red(&n.left) && is_red(&n.right))
}

fn height<K, P>(opt_node: &OptNode<K, P>) -> usize {
    opt_node
        .as_deref()
        .map_or(0, |n| 1 + height(&n.left).max(height(&n.right)))
}

// prerequisite: root and its right child are populated
fn rot_lf<K, P>(root: &mut OptNode<K, P>) {
    // We want the following transformation:
    //    a(x, b(y, z))   =>   b(a(x, y), z)
    // b inherits a's color and a becomes red, so black heights are unchanged.
    let Some(mut a) = root.take() else { return };
    let Some(mut b) = a.right.take() else {
        *root = Some(a);
        return;
    };

    a.right = b.left.take();
    b.color = a.color;
    a.color = Red;
    b.left = Some(a);

    *root = Some(b);
}

// prerequisite: root and its left child are populated
fn rot_rt<K, P>(root: &mut OptNode<K, P>) {
    // We want the following transformation:
    //    a(b(x, y), z)   =>   b(x, a(y, z))
    let Some(mut a) = root.take() else { return };
    let Some(mut b) = a.left.take() else {
        *root = Some(a);
        return;
    };

    a.left = b.right.take();
    b.color = a.color;
    a.color = Red;
    b.right = Some(a);

    *root = Some(b);
}

// Toggles the color of the root and of both of its children.
fn flip<K, P>(root: &mut OptNode<K, P>) {
    if let Some(n) = root.as_deref_mut() {
        n.color = n.color.flip();
        if let Some(lf) = n.left.as_deref_mut() {
            lf.color = lf.color.flip();
        }
        if let Some(rt) = n.right.as_deref_mut() {
            rt.color = rt.color.flip();
        }
    }
}

// Restores the local LLRB shape at root once its subtrees are valid.
fn fix_up<K, P>(root: &mut OptNode<K, P>) {
    if leans_right(root) {
        rot_lf(root);
    }
    if has_two_left_reds(root) {
        rot_rt(root);
    }
    if has_red_kids(root) {
        flip(root);
    }
}

// Borrows a red link from the right sibling so that the left subtree can lose
// a node.
fn move_red_lf<K, P>(root: &mut OptNode<K, P>) {
    flip(root);
    if root.as_deref().map_or(false, |n| is_left_red(&n.right)) {
        if let Some(n) = root.as_deref_mut() {
            rot_rt(&mut n.right);
        }
        rot_lf(root);
        flip(root);
    }
}

// Borrows a red link from the left sibling so that the right subtree can lose
// a node.
fn move_red_rt<K, P>(root: &mut OptNode<K, P>) {
    flip(root);
    if root.as_deref().map_or(false, |n| is_left_red(&n.left)) {
        rot_rt(root);
        flip(root);
    }
}

// Inserts item under key in the tree rooted at root and returns whether a new
// node was created for it.
fn ins<K: Ord, P: Payload>(
    root: &mut OptNode<K, P>,
    key: K,
    item: P::Item,
) -> bool {
    let n = match root.as_deref_mut() {
        None => {
            *root = Some(Box::new(Node::new(key, P::from_item(item))));
            return true; // *** EARLY RETURN ***
        }

        Some(n) => n,
    };

    let created = match key.cmp(&n.key) {
        Less => ins(&mut n.left, key, item),
        Greater => ins(&mut n.right, key, item),
        Equal => {
            n.payload.merge(item);
            false
        }
    };

    fix_up(root);
    created
}

// Removes the leftmost node of the tree rooted at root and returns its entry.
fn del_min<K, P>(root: &mut OptNode<K, P>) -> Option<(K, P)> {
    let n = root.as_deref()?;

    if n.left.is_none() {
        let Node {
            key, payload, right, ..
        } = *root.take()?;
        *root = right;
        return Some((key, payload)); // *** EARLY RETURN ***
    }

    if !is_red(&n.left) && !is_left_red(&n.left) {
        move_red_lf(root);
    }

    let removed = del_min(&mut root.as_deref_mut()?.left);
    fix_up(root);
    removed
}

// Removes the node for k from the tree rooted at root and returns its entry.
//
// prerequisite: k is in the tree.  The descent leans on it: every subtree we
// step into is known to be populated.
fn del<K, P, Q>(root: &mut OptNode<K, P>, k: &Q) -> Option<(K, P)>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let n = root.as_deref()?;

    let removed = if k.cmp(n.key.borrow()) == Less {
        if !is_red(&n.left) && !is_left_red(&n.left) {
            move_red_lf(root);
        }
        del(&mut root.as_deref_mut()?.left, k)
    } else {
        if is_red(&n.left) {
            rot_rt(root);
        }

        let n = root.as_deref()?;
        if k.cmp(n.key.borrow()) == Equal && n.right.is_none() {
            // with no right child and a black left link, the left side is empty
            let Node {
                key, payload, left, ..
            } = *root.take()?;
            *root = left;
            return Some((key, payload)); // *** EARLY RETURN ***
        }

        if !is_red(&n.right) && !is_left_red(&n.right) {
            move_red_rt(root);
        }

        let n = root.as_deref_mut()?;
        if k.cmp(n.key.borrow()) == Equal {
            // take over the in-order successor's entry
            let (succ_key, succ_payload) = del_min(&mut n.right)?;
            let old_key = replace(&mut n.key, succ_key);
            let old_payload = replace(&mut n.payload, succ_payload);
            Some((old_key, old_payload))
        } else {
            del(&mut n.right, k)
        }
    };

    fix_up(root);
    removed
}

fn floor<'a, K, P, Q>(opt_node: &'a OptNode<K, P>, k: &Q) -> Option<&'a K>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let n = opt_node.as_deref()?;
    match k.cmp(n.key.borrow()) {
        Equal => Some(&n.key),
        Less => floor(&n.left, k),
        Greater => floor(&n.right, k).or(Some(&n.key)),
    }
}

fn ceiling<'a, K, P, Q>(opt_node: &'a OptNode<K, P>, k: &Q) -> Option<&'a K>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let n = opt_node.as_deref()?;
    match k.cmp(n.key.borrow()) {
        Equal => Some(&n.key),
        Greater => ceiling(&n.right, k),
        Less => ceiling(&n.left, k).or(Some(&n.key)),
    }
}

// Verifies the subtree at opt_node and returns its node count, its black
// height and the greatest key seen so far in an in-order walk.
fn chk<'a, K: Ord, P: Payload>(
    opt_node: &'a OptNode<K, P>,
    greatest: Option<&'a K>,
) -> std::result::Result<(usize, usize, Option<&'a K>), CheckError> {
    let n = match opt_node.as_deref() {
        None => return Ok((0, 0, greatest)),
        Some(n) => n,
    };

    if n.payload.is_empty() {
        return Err(CheckError::EmptyPayload);
    }
    if is_red(&n.right) {
        return Err(CheckError::RedRightLink);
    }
    if n.color == Red && is_red(&n.left) {
        return Err(CheckError::ConsecutiveReds);
    }

    let (lf_len, lf_blacks, greatest) = chk(&n.left, greatest)?;
    if greatest.is_some_and(|k| k >= &n.key) {
        return Err(CheckError::OutOfOrder);
    }

    let (rt_len, rt_blacks, greatest) = chk(&n.right, Some(&n.key))?;
    if lf_blacks != rt_blacks {
        return Err(CheckError::UnbalancedBlacks {
            left: lf_blacks,
            right: rt_blacks,
        });
    }

    let blacks = lf_blacks + (n.color == Black) as usize;
    Ok((lf_len + 1 + rt_len, blacks, greatest))
}

impl<K, P> Llrb<K, P> {
    /// Creates a new, empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every node.
    pub fn clear(&mut self) {
        self.len = 0;
        self.root = None;
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
        if let Some(n) = self.root.as_deref() {
            n.for_each(&mut f);
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
    /// [`Error::KeyNotFound`] if k is absent, in which case the tree is left
    /// untouched.
    pub fn remove_entry<Q>(&mut self, k: &Q) -> Result<(K, P)>
    where
        K: Borrow<Q> + Ord,
        P: Payload,
        Q: Ord + ?Sized,
    {
        if !self.contains(k) {
            return Err(Error::KeyNotFound);
        }

        // a red root lets the first step down borrow a red link
        if let Some(n) = self.root.as_deref_mut() {
            if !is_red(&n.left) && !is_red(&n.right) {
                n.color = Red;
            }
        }

        let removed = del(&mut self.root, k);
        self.paint_root_black();

        let entry = removed.ok_or(Error::KeyNotFound)?;
        self.len -= 1;
        trace!("llrb: dropped a node, {} keys left", self.len);
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

    /// Verifies the structural invariants of the tree.
    ///
    /// # Errors
    /// The first [`CheckError`] found.
    pub fn check(&self) -> std::result::Result<(), CheckError>
    where
        K: Ord,
        P: Payload,
    {
        if is_red(&self.root) {
            return Err(CheckError::RedRoot);
        }

        let (actual, _, _) = chk(&self.root, None)?;
        if actual != self.len {
            return Err(CheckError::LenMismatch {
                recorded: self.len,
                actual,
            });
        }

        Ok(())
    }

    fn paint_root_black(&mut self) {
        if let Some(n) = self.root.as_deref_mut() {
            n.color = Black;
        }
    }
}

impl<K: Ord, P: Payload> Llrb<K, P> {
    /// Inserts item under key.  If the key is already present, the item is
    /// merged into its payload.  Returns true if a new node was created.
    ///
    /// # Examples
    /// ```
    /// use multi_collections::{Llrb, Values};
    ///
    /// let mut t: Llrb<&str, Values<u8>> = Llrb::new();
    /// assert!(t.insert("a", 1));
    /// assert!(!t.insert("a", 2));
    /// assert_eq!(t.get("a").and_then(|vs| vs.first()), Some(&1));
    /// ```
    pub fn insert(&mut self, key: K, item: P::Item) -> bool {
        let created = ins(&mut self.root, key, item);
        self.paint_root_black();

        if created {
            self.len += 1;
            trace!("llrb: created a node, {} keys", self.len);
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

    // pre-order (key, color, depth) snapshot of the tree's shape
    fn shape<K: Clone, P>(t: &Llrb<K, P>) -> Vec<(K, Color, usize)> {
        fn walk<K: Clone, P>(
            opt_node: &OptNode<K, P>,
            depth: usize,
            acc: &mut Vec<(K, Color, usize)>,
        ) {
            if let Some(n) = opt_node.as_deref() {
                acc.push((n.key.clone(), n.color, depth));
                walk(&n.left, depth + 1, acc);
                walk(&n.right, depth + 1, acc);
            }
        }

        let mut acc = Vec::new();
        walk(&t.root, 0, &mut acc);
        acc
    }

    fn keys<K: Clone, P>(t: &Llrb<K, P>) -> Vec<K> {
        let mut ks = Vec::new();
        t.for_each(|(k, _)| ks.push(k.clone()));
        ks
    }

    fn bal_test(vs: Vec<u8>) {
        let mut t: Llrb<u8, Count> = Llrb::new();
        for &k in vs.iter() {
            t.insert(k, ());
            t.check().unwrap();

            // a red-black tree is never more than twice the optimal height
            let bound = 2 * (usize::BITS - t.len().leading_zeros()) as usize;
            assert!(t.height() <= bound);
        }
    }

    fn rm_test(vs: Vec<i8>) {
        let mut t: Llrb<i8, Count> = Llrb::new();
        let mut counts = std::collections::BTreeMap::new();

        for &k in vs.iter() {
            match k {
                1..=i8::MAX => {
                    let k = k % 32;
                    t.insert(k, ());
                    *counts.entry(k).or_insert(0usize) += 1;
                }

                0 | i8::MIN => (),

                _ => {
                    let k = -k % 32;
                    match counts.get_mut(&k) {
                        None => {
                            assert_eq!(t.remove_one(&k), Err(Error::KeyNotFound))
                        }
                        Some(c) => {
                            assert_eq!(t.remove_one(&k), Ok(()));
                            *c -= 1;
                            if *c == 0 {
                                counts.remove(&k);
                            }
                        }
                    }
                }
            }

            t.check().unwrap();
            assert_eq!(t.len(), counts.len());
            let mut expected = counts.iter();
            t.for_each(|(k, c)| {
                assert_eq!(expected.next(), Some((k, &c.get())));
            });
        }
    }

    // systematically try deleting each key of t
    fn chk_all_removes(t: Llrb<u8, Count>) {
        for k in keys(&t) {
            let mut t2 = t.clone();
            assert!(t2.remove_entry(&k).is_ok());
            t2.check().unwrap();
            assert!(!t2.contains(&k));
            assert_eq!(t2.len(), t.len() - 1);
        }
    }

    fn from_keys(ks: impl IntoIterator<Item = u8>) -> Llrb<u8, Count> {
        let mut t = Llrb::new();
        for k in ks {
            t.insert(k, ());
        }
        t
    }

    #[test]
    fn rm_each_test() {
        // build in order to encourage skewing
        chk_all_removes(from_keys(0..32));

        // build in reverse order to encourage opposite skewing
        chk_all_removes(from_keys((0..32).rev()));
    }

    #[test]
    fn drain_test() {
        let mut t = from_keys((0..64u32).map(|x| ((x * 37) % 64) as u8));
        for k in (0..64).rev() {
            assert_eq!(t.max(), Ok(&k));
            let (k2, c) = t.remove_entry(&k).unwrap();
            assert_eq!((k2, c.get()), (k, 1));
        }
        assert!(t.is_empty());
        assert_eq!(t.min(), Err(Error::EmptyTree));
        assert_eq!(t.height(), 0);
    }

    #[test]
    fn failed_remove_is_noop() {
        let t = from_keys([50, 20, 80, 10, 30, 70, 90, 60]);
        let mut t2 = t.clone();
        assert_eq!(t2.remove_entry(&55).err(), Some(Error::KeyNotFound));
        assert_eq!(t2.remove_one(&0).err(), Some(Error::KeyNotFound));
        assert_eq!(shape(&t), shape(&t2));
        assert_eq!(t2.len(), 8);
    }

    #[test]
    fn merge_keeps_one_node() {
        let mut t = from_keys([3, 1, 3, 2, 3]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(&3).map(|c| c.get()), Some(3));
        assert_eq!(t.remove_one(&3), Ok(()));
        assert_eq!(t.remove_one(&3), Ok(()));
        assert!(t.contains(&3));
        assert_eq!(t.remove_one(&3), Ok(()));
        assert!(!t.contains(&3));
        assert_eq!(keys(&t), vec![1, 2]);
    }

    #[test]
    fn floor_ceiling_test() {
        let t = from_keys([10, 20, 30, 40]);
        assert_eq!(t.floor(&25), Ok(&20));
        assert_eq!(t.floor(&30), Ok(&30));
        assert_eq!(t.floor(&99), Ok(&40));
        assert_eq!(t.floor(&5), Err(Error::NoSuchBound));
        assert_eq!(t.ceiling(&25), Ok(&30));
        assert_eq!(t.ceiling(&10), Ok(&10));
        assert_eq!(t.ceiling(&0), Ok(&10));
        assert_eq!(t.ceiling(&41), Err(Error::NoSuchBound));

        let empty: Llrb<u8, Count> = Llrb::new();
        assert_eq!(empty.floor(&1), Err(Error::EmptyTree));
        assert_eq!(empty.ceiling(&1), Err(Error::EmptyTree));
    }

    #[test]
    fn rot_shape_test() {
        // ascending inserts rotate left at every step and settle into a
        // perfect tree of black nodes
        let t = from_keys([1, 2, 3]);
        assert_eq!(
            shape(&t),
            vec![(2, Black, 0), (1, Black, 1), (3, Black, 1)]
        );

        // a fourth key hangs off the left of the right child as a red link
        let t = from_keys([1, 2, 3, 4]);
        assert_eq!(
            shape(&t),
            vec![(2, Black, 0), (1, Black, 1), (4, Black, 1), (3, Red, 2)]
        );
    }

    #[test]
    fn bal_test_regr1() {
        bal_test(vec![127, 3, 1, 4, 6, 2, 5, 127]);
    }

    #[test]
    fn rm_test_regr1() {
        rm_test(vec![101, 100, 1, -100, -101, -1]);
    }

    #[test]
    fn rm_test_regr2() {
        rm_test(vec![
            99, 1, 103, 3, 98, 2, 8, 4, 5, 6, 7, 102, 9, 97, -102, 10, -97,
        ]);
    }

    quickcheck! {
        fn qc_bal_test(vs: Vec<u8>) -> () {
            bal_test(vs);
        }

        fn qc_rm_test(vs: Vec<i8>) -> () {
            rm_test(vs);
        }

        fn qc_rm_test2(vs: Vec<u8>) -> () {
            chk_all_removes(from_keys(vs));
        }
    }
}
