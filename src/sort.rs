use rand::Rng;
#[cfg(feature = "rayon")]
use rayon::join;

use crate::{height, max_of, Bounds, InTree};

impl<K> InTree<K>
where
    K: PartialOrd + Copy,
{
    /// Construct a new tree by sorting the given `items`
    ///
    /// The items are only read, the tree refers back to them by their position in iteration order.
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Bounds<K>,
    {
        Self::new_with_rng(items, &mut rand::rng())
    }

    /// Construct a new tree by sorting the given `items`, choosing pivots using `rng`
    ///
    /// Using a seeded generator makes the layout of the tree reproducible.
    pub fn new_with_rng<I, R>(items: I, rng: &mut R) -> Self
    where
        I: IntoIterator,
        I::Item: Bounds<K>,
        R: Rng + ?Sized,
    {
        let (mut order, mut lower, mut upper) = collect(items);

        sort(
            Slots {
                order: &mut order,
                lower: &mut lower,
                upper: &mut upper,
            },
            rng,
        );

        let mut subtree_max = upper.clone();

        if !subtree_max.is_empty() {
            update_max(&upper, &mut subtree_max);
        }

        log::debug!(
            "Built interval tree over {} intervals with height {}",
            order.len(),
            height(order.len())
        );

        Self {
            order: order.into(),
            lower: lower.into(),
            upper: upper.into(),
            subtree_max: subtree_max.into(),
        }
    }

    #[cfg(feature = "rayon")]
    /// Construct a new tree by sorting the given `items`, in parallel
    ///
    /// Requires the `rayon` feature and dispatches tasks into the current [thread pool][rayon::ThreadPool].
    pub fn par_new<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Bounds<K>,
        K: Send + Sync,
    {
        let (mut order, mut lower, mut upper) = collect(items);

        // fork only while partitions are expected to be balanced
        let depth = 2 * height(order.len());

        par_sort(
            Slots {
                order: &mut order,
                lower: &mut lower,
                upper: &mut upper,
            },
            depth,
        );

        let mut subtree_max = upper.clone();

        if !subtree_max.is_empty() {
            par_update_max(&upper, &mut subtree_max);
        }

        log::debug!(
            "Built interval tree over {} intervals with height {} in parallel",
            order.len(),
            height(order.len())
        );

        Self {
            order: order.into(),
            lower: lower.into(),
            upper: upper.into(),
            subtree_max: subtree_max.into(),
        }
    }
}

fn collect<K, I>(items: I) -> (Vec<usize>, Vec<K>, Vec<K>)
where
    I: IntoIterator,
    I::Item: Bounds<K>,
{
    let items = items.into_iter();
    let (len, _) = items.size_hint();

    let mut order = Vec::with_capacity(len);
    let mut lower = Vec::with_capacity(len);
    let mut upper = Vec::with_capacity(len);

    for (position, item) in items.enumerate() {
        let (lower_limit, upper_limit) = item.limits();

        order.push(position);
        lower.push(lower_limit);
        upper.push(upper_limit);
    }

    (order, lower, upper)
}

/// A range of slots, permuted jointly
struct Slots<'a, K> {
    order: &'a mut [usize],
    lower: &'a mut [K],
    upper: &'a mut [K],
}

impl<'a, K> Slots<'a, K> {
    fn len(&self) -> usize {
        self.order.len()
    }

    fn swap(&mut self, lhs: usize, rhs: usize) {
        self.order.swap(lhs, rhs);
        self.lower.swap(lhs, rhs);
        self.upper.swap(lhs, rhs);
    }

    /// Splits into the slots before and after `mid`, dropping `mid` itself
    fn split_around(self, mid: usize) -> (Self, Self) {
        let Self {
            order,
            lower,
            upper,
        } = self;

        let (order_left, [_, order_right @ ..]) = order.split_at_mut(mid) else {
            unreachable!()
        };
        let (lower_left, [_, lower_right @ ..]) = lower.split_at_mut(mid) else {
            unreachable!()
        };
        let (upper_left, [_, upper_right @ ..]) = upper.split_at_mut(mid) else {
            unreachable!()
        };

        (
            Self {
                order: order_left,
                lower: lower_left,
                upper: upper_left,
            },
            Self {
                order: order_right,
                lower: lower_right,
                upper: upper_right,
            },
        )
    }
}

/// Moves a randomly chosen pivot into its final slot and returns that slot
///
/// Slots with a strictly smaller lower bound end up before the pivot, all others after it.
fn partition<K, R>(slots: &mut Slots<'_, K>, rng: &mut R) -> usize
where
    K: PartialOrd + Copy,
    R: Rng + ?Sized,
{
    let last = slots.len() - 1;

    slots.swap(rng.random_range(0..slots.len()), last);

    let pivot = slots.lower[last];
    let mut store = 0;

    for idx in 0..last {
        if slots.lower[idx] < pivot {
            slots.swap(store, idx);
            store += 1;
        }
    }

    slots.swap(store, last);

    store
}

/// Randomized quicksort by lower bound
///
/// The smaller partition is always processed first so that the pending stack stays logarithmic.
fn sort<K, R>(slots: Slots<'_, K>, rng: &mut R)
where
    K: PartialOrd + Copy,
    R: Rng + ?Sized,
{
    let mut pending = vec![slots];

    while let Some(mut slots) = pending.pop() {
        if slots.len() < 2 {
            continue;
        }

        let mid = partition(&mut slots, rng);
        let (left, right) = slots.split_around(mid);

        if left.len() < right.len() {
            pending.push(right);
            pending.push(left);
        } else {
            pending.push(left);
            pending.push(right);
        }
    }
}

#[cfg(feature = "rayon")]
fn par_sort<K>(mut slots: Slots<'_, K>, depth: u32)
where
    K: PartialOrd + Copy + Send,
{
    if slots.len() < 2 {
        return;
    }

    let mut rng = rand::rng();

    if depth == 0 {
        sort(slots, &mut rng);
        return;
    }

    let mid = partition(&mut slots, &mut rng);
    let (left, right) = slots.split_around(mid);

    join(|| par_sort(left, depth - 1), || par_sort(right, depth - 1));
}

fn update_max<K>(upper: &[K], subtree_max: &mut [K]) -> K
where
    K: PartialOrd + Copy,
{
    let mid = upper.len() / 2;

    let (upper_left, [mid_upper, upper_right @ ..]) = upper.split_at(mid) else {
        unreachable!()
    };
    let (max_left, [mid_max, max_right @ ..]) = subtree_max.split_at_mut(mid) else {
        unreachable!()
    };

    let mut max = *mid_upper;

    if !upper_left.is_empty() {
        max = max_of(max, update_max(upper_left, max_left));
    }

    if !upper_right.is_empty() {
        max = max_of(max, update_max(upper_right, max_right));
    }

    *mid_max = max;

    max
}

#[cfg(feature = "rayon")]
fn par_update_max<K>(upper: &[K], subtree_max: &mut [K]) -> K
where
    K: PartialOrd + Copy + Send + Sync,
{
    let mid = upper.len() / 2;

    let (upper_left, [mid_upper, upper_right @ ..]) = upper.split_at(mid) else {
        unreachable!()
    };
    let (max_left, [mid_max, max_right @ ..]) = subtree_max.split_at_mut(mid) else {
        unreachable!()
    };

    let (left, right) = join(
        || (!upper_left.is_empty()).then(|| update_max(upper_left, max_left)),
        || (!upper_right.is_empty()).then(|| update_max(upper_right, max_right)),
    );

    let mut max = *mid_upper;

    if let Some(left) = left {
        max = max_of(max, left);
    }

    if let Some(right) = right {
        max = max_of(max, right);
    }

    *mid_max = max;

    max
}
