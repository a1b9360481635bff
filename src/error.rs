use thiserror::Error;

/// Violations of the tree invariants detected when reassembling a tree from its parts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The parallel arrays do not have the same length
    #[error("array lengths differ: order {order}, lower {lower}, upper {upper}, subtree max {subtree_max}")]
    LengthMismatch {
        /// Length of `order`
        order: usize,
        /// Length of `lower`
        lower: usize,
        /// Length of `upper`
        upper: usize,
        /// Length of `subtree_max`
        subtree_max: usize,
    },

    /// The lower bound at `slot` is smaller than the one before it
    #[error("lower bounds are not sorted at slot {slot}")]
    NotSorted {
        /// The offending slot
        slot: usize,
    },

    /// The position at `slot` is out of range or repeated
    #[error("order is not a permutation at slot {slot}")]
    InvalidOrder {
        /// The offending slot
        slot: usize,
    },

    /// The subtree maximum at `slot` differs from the maximum upper bound of its subtree
    #[error("subtree maximum is wrong at slot {slot}")]
    SubtreeMax {
        /// The offending slot
        slot: usize,
    },
}

/// Result type used throughout this crate
pub type Result<T> = std::result::Result<T, Error>;
