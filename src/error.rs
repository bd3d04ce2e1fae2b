/// Failures reported by the public operations of the containers.
///
/// None of them is fatal and none leaves a container partially updated.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// A query that needs at least one element was made on an empty container.
    #[error("the container is empty")]
    EmptyTree,

    /// The key is not stored in the container.
    #[error("key not found")]
    KeyNotFound,

    /// No stored key satisfies a floor or ceiling query.
    #[error("no stored key satisfies the bound")]
    NoSuchBound,
}

/// The result type of the container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A broken structural invariant found by one of the `check` methods.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// An in-order walk met a key that is not greater than the one before it.
    #[error("keys are not in strictly increasing order")]
    OutOfOrder,

    /// A node outlived its last item.
    #[error("a node holds an empty payload")]
    EmptyPayload,

    /// A node is joined to its parent by a red right link.
    #[error("a red link leans right")]
    RedRightLink,

    /// Two red links follow each other on one path.
    #[error("a red node has a red child")]
    ConsecutiveReds,

    /// The root of a red-black tree is red.
    #[error("the root is red")]
    RedRoot,

    /// The two subtrees of a node cross different numbers of black links.
    #[error("unbalanced black heights: {left} on the left, {right} on the right")]
    UnbalancedBlacks {
        /// Black links below the left child.
        left: usize,
        /// Black links below the right child.
        right: usize,
    },

    /// The length a container records differs from what it holds.
    #[error("recorded length {recorded} does not match the actual {actual}")]
    LenMismatch {
        /// The length the container keeps track of.
        recorded: usize,
        /// The number of entries actually found.
        actual: usize,
    },
}
