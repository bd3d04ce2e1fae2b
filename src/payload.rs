use std::collections::VecDeque;

/// What a tree node keeps for its key, and how repeated insertions of the same
/// key fold into it.
///
/// A node is created from the first item inserted under a key.  Later items
/// for the same key are [`merge`](Payload::merge)d into the existing payload
/// rather than creating another node.  Removal takes items back out one at a
/// time; a tree drops the node as soon as its payload
/// [`is_empty`](Payload::is_empty).
pub trait Payload {
    /// The unit inserted into and removed from a payload.
    type Item;

    /// Builds the payload of a freshly created node.
    fn from_item(item: Self::Item) -> Self;

    /// Folds another item for the same key into the payload.
    fn merge(&mut self, item: Self::Item);

    /// Removes one item, or returns `None` if the payload holds no items.
    fn take_one(&mut self) -> Option<Self::Item>;

    /// The number of items held.
    fn occurrences(&self) -> usize;

    /// Tests if the payload holds no items.
    fn is_empty(&self) -> bool {
        self.occurrences() == 0
    }
}

/// A bare occurrence count, the payload of a multiset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Count(usize);

impl Count {
    /// Returns the number of occurrences.
    pub fn get(self) -> usize {
        self.0
    }
}

impl Payload for Count {
    type Item = ();

    fn from_item(_: ()) -> Self {
        Count(1)
    }

    fn merge(&mut self, _: ()) {
        self.0 += 1;
    }

    fn take_one(&mut self) -> Option<()> {
        self.0 = self.0.checked_sub(1)?;
        Some(())
    }

    fn occurrences(&self) -> usize {
        self.0
    }
}

/// The values stored under one key of a multimap, in insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Values<V>(VecDeque<V>);

impl<V> Values<V> {
    /// Returns the earliest inserted value that is still present.
    pub fn first(&self) -> Option<&V> {
        self.0.front()
    }

    /// Returns every value, oldest first.
    pub fn as_deque(&self) -> &VecDeque<V> {
        &self.0
    }

    pub(crate) fn into_deque(self) -> VecDeque<V> {
        self.0
    }
}

impl<V> Payload for Values<V> {
    type Item = V;

    fn from_item(item: V) -> Self {
        Values(VecDeque::from([item]))
    }

    fn merge(&mut self, item: V) {
        self.0.push_back(item);
    }

    // Values leave in the order they arrived.
    fn take_one(&mut self) -> Option<V> {
        self.0.pop_front()
    }

    fn occurrences(&self) -> usize {
        self.0.len()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn count_test() {
        let mut c = Count::from_item(());
        c.merge(());
        assert_eq!(c.get(), 2);
        assert_eq!(c.take_one(), Some(()));
        assert_eq!(c.take_one(), Some(()));
        assert!(c.is_empty());
        assert_eq!(c.take_one(), None);
        assert_eq!(c.get(), 0);
    }

    #[test]
    fn values_fifo_test() {
        let mut vs = Values::from_item('a');
        vs.merge('b');
        vs.merge('c');
        assert_eq!(vs.first(), Some(&'a'));
        assert_eq!(vs.occurrences(), 3);
        assert_eq!(vs.take_one(), Some('a'));
        assert_eq!(vs.first(), Some(&'b'));
        assert!(vs.as_deque().iter().eq([&'b', &'c']));
        assert_eq!(vs.take_one(), Some('b'));
        assert_eq!(vs.take_one(), Some('c'));
        assert!(vs.is_empty());
        assert_eq!(vs.take_one(), None);
    }
}
