//! # Ordered collections that allow duplicate keys
//!
//! `multi-collections` provides two sorted containers that accept the same key
//! more than once:
//!
//! - [`Multiset`] counts the occurrences of each element.  It sits on a plain,
//!   unbalanced binary search tree ([`Bst`]).
//! - [`Multimap`] keeps every value inserted under a key, in insertion order.
//!   It sits on a left-leaning red-black tree ([`Llrb`]).
//!
//! Both trees store one node per distinct key and are generic over the node's
//! [`Payload`], which decides how a repeated key is folded into its node and
//! when the node is empty enough to drop.  Failed lookups and removals are
//! reported through [`Error`] and never modify the container.

#![warn(missing_docs)]

#[cfg(test)]
macro_rules! chk_tree {
    ( $x:expr ) => {{
        $x.check().unwrap();
    }};
}

#[cfg(not(test))]
macro_rules! chk_tree {
    ( $x:expr ) => {{
        let _ = &$x;
    }};
}

mod error;
pub use error::{CheckError, Error, Result};

mod payload;
pub use payload::{Count, Payload, Values};

mod llrb;
pub use llrb::{Llrb, Multimap};

mod bst;
pub use bst::{Bst, Multiset};
