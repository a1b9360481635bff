#![forbid(unsafe_code)]
#![deny(missing_docs, missing_debug_implementations)]

//! A simple library implementing a static, flat representation of an [augmented interval tree](https://en.wikipedia.org/wiki/Interval_tree#Augmented_tree)
//! answering stabbing queries, i.e. which closed intervals contain a given point.
//!
//! The tree is built once from a collection of intervals and never modified afterwards.
//! It does not store any values itself: queries yield positions into the collection the tree was built from.
//!
//! ```
//! use intree::InTree;
//!
//! let intervals = [[4.0, 6.0], [6.0, 9.0], [9.0, 11.0]];
//! let tree = InTree::new(&intervals);
//!
//! let mut positions = tree.including(6.0);
//! positions.sort_unstable();
//! assert_eq!(positions, [0, 1]);
//! ```
//!
//! Bounds are compared using [`PartialOrd`] only, so non-finite floating point keys like `NaN` are the caller's responsibility to avoid.

mod error;
mod query;
mod sort;

use std::cmp::Ordering;
use std::ops::{Range, RangeInclusive};

pub use crate::error::{Error, Result};

/// Anything exposing the closed interval `[lower, upper]`
///
/// Intervals with `lower > upper` are accepted but will never contain any point.
pub trait Bounds<K = f64> {
    /// Returns the lower and upper limits of the interval, both inclusive
    fn limits(&self) -> (K, K);
}

/// Bounds carrying an opaque value
///
/// The tree ignores the value, it is available via the original collection using the positions returned by queries.
pub trait ValuedBounds<K = f64>: Bounds<K> {
    /// The type of the associated value
    type Value;

    /// Returns the value associated with the interval
    fn value(&self) -> &Self::Value;
}

impl<K> Bounds<K> for RangeInclusive<K>
where
    K: Copy,
{
    fn limits(&self) -> (K, K) {
        (*self.start(), *self.end())
    }
}

impl<K> Bounds<K> for [K; 2]
where
    K: Copy,
{
    fn limits(&self) -> (K, K) {
        (self[0], self[1])
    }
}

impl<K, V> Bounds<K> for (RangeInclusive<K>, V)
where
    K: Copy,
{
    fn limits(&self) -> (K, K) {
        self.0.limits()
    }
}

impl<K, V> ValuedBounds<K> for (RangeInclusive<K>, V)
where
    K: Copy,
{
    type Value = V;

    fn value(&self) -> &V {
        &self.1
    }
}

impl<K, B> Bounds<K> for &B
where
    B: Bounds<K> + ?Sized,
{
    fn limits(&self) -> (K, K) {
        (**self).limits()
    }
}

impl<K, B> ValuedBounds<K> for &B
where
    B: ValuedBounds<K> + ?Sized,
{
    type Value = B::Value;

    fn value(&self) -> &B::Value {
        (**self).value()
    }
}

/// Interval tree over closed intervals with boundaries of type `K`
///
/// The intervals are stored in parallel arrays sorted by their lower bounds.
/// These slots form an implicit balanced binary tree: the root of a range of slots is its middle slot
/// with the slots before and after it forming its left and right subtrees.
#[derive(Debug, Clone)]
pub struct InTree<K = f64> {
    order: Box<[usize]>,
    lower: Box<[K]>,
    upper: Box<[K]>,
    subtree_max: Box<[K]>,
}

impl<K> Default for InTree<K> {
    fn default() -> Self {
        Self {
            order: Box::default(),
            lower: Box::default(),
            upper: Box::default(),
            subtree_max: Box::default(),
        }
    }
}

impl<K> InTree<K> {
    /// Number of intervals in the tree
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the tree contains no intervals at all
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maps each sorted slot to the position of its interval in the original collection
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Lower bounds in ascending order
    pub fn lower(&self) -> &[K] {
        &self.lower
    }

    /// Upper bounds, in the same order as [`lower`][Self::lower]
    pub fn upper(&self) -> &[K] {
        &self.upper
    }

    /// Maximum upper bound within the subtree rooted at each slot
    pub fn subtree_max(&self) -> &[K] {
        &self.subtree_max
    }

    /// Iterate over all intervals as `(position, lower, upper)` in sorted order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (usize, &K, &K)> + '_ {
        self.order
            .iter()
            .zip(self.lower.iter())
            .zip(self.upper.iter())
            .map(|((&position, lower), upper)| (position, lower, upper))
    }

    /// Decomposes the tree into its `order`, `lower`, `upper` and `subtree_max` arrays
    pub fn into_parts(self) -> (Box<[usize]>, Box<[K]>, Box<[K]>, Box<[K]>) {
        (self.order, self.lower, self.upper, self.subtree_max)
    }
}

impl<K> InTree<K>
where
    K: PartialOrd + Copy,
{
    /// Reassembles a tree from arrays previously obtained via [`into_parts`][Self::into_parts]
    ///
    /// All invariants are checked, see [`check`][Self::check].
    pub fn from_parts(
        order: Box<[usize]>,
        lower: Box<[K]>,
        upper: Box<[K]>,
        subtree_max: Box<[K]>,
    ) -> Result<Self> {
        let tree = Self {
            order,
            lower,
            upper,
            subtree_max,
        };

        tree.check()?;

        Ok(tree)
    }

    /// Verifies that the arrays are organized as an interval tree
    ///
    /// That is, they have equal length, `lower` is non-decreasing, `order` is a permutation
    /// and `subtree_max` holds the maximum upper bound of each subtree.
    pub fn check(&self) -> Result<()> {
        let len = self.order.len();

        if self.lower.len() != len || self.upper.len() != len || self.subtree_max.len() != len {
            return Err(Error::LengthMismatch {
                order: len,
                lower: self.lower.len(),
                upper: self.upper.len(),
                subtree_max: self.subtree_max.len(),
            });
        }

        for slot in 1..len {
            match self.lower[slot - 1].partial_cmp(&self.lower[slot]) {
                Some(Ordering::Less | Ordering::Equal) => (),
                _ => return Err(Error::NotSorted { slot }),
            }
        }

        let mut seen = vec![false; len];

        for (slot, &position) in self.order.iter().enumerate() {
            match seen.get_mut(position) {
                Some(seen) if !*seen => *seen = true,
                _ => return Err(Error::InvalidOrder { slot }),
            }
        }

        if len != 0 {
            check_max(&self.upper, &self.subtree_max, 0..len)?;
        }

        Ok(())
    }
}

fn check_max<K>(upper: &[K], subtree_max: &[K], range: Range<usize>) -> Result<K>
where
    K: PartialOrd + Copy,
{
    let (left, mid, right) = split(range);

    let mut max = upper[mid];

    if !left.is_empty() {
        max = max_of(max, check_max(upper, subtree_max, left)?);
    }

    if !right.is_empty() {
        max = max_of(max, check_max(upper, subtree_max, right)?);
    }

    if subtree_max[mid] != max {
        return Err(Error::SubtreeMax { slot: mid });
    }

    Ok(max)
}

/// Splits a non-empty range of slots into left subtree, root and right subtree
///
/// Build and query must agree on this rule.
fn split(range: Range<usize>) -> (Range<usize>, usize, Range<usize>) {
    let mid = range.start + range.len() / 2;

    (range.start..mid, mid, mid + 1..range.end)
}

fn max_of<K>(lhs: K, rhs: K) -> K
where
    K: PartialOrd,
{
    if rhs > lhs {
        rhs
    } else {
        lhs
    }
}

/// Number of levels of the implicit tree over `len` slots
fn height(len: usize) -> u32 {
    usize::BITS - len.leading_zeros()
}
