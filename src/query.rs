use std::convert::Infallible;
use std::ops::{ControlFlow, Range};

#[cfg(feature = "rayon")]
use rayon::join;

use crate::{split, InTree, ValuedBounds};

impl<K> InTree<K>
where
    K: PartialOrd + Copy,
{
    /// Query for the positions of all intervals containing the given point
    ///
    /// Positions refer to the collection the tree was built from and are yielded in no particular order.
    pub fn query<H, R>(&self, val: K, mut handler: H) -> ControlFlow<R>
    where
        H: FnMut(usize) -> ControlFlow<R>,
    {
        if self.is_empty() {
            return ControlFlow::Continue(());
        }

        let mut stack = Stack::default();
        stack.push(0..self.len());

        while let Some(range) = stack.pop() {
            let (left, mid, right) = split(range);

            if val <= self.subtree_max[mid] && !left.is_empty() {
                stack.push(left);
            }

            if self.lower[mid] <= val {
                if !right.is_empty() {
                    stack.push(right);
                }

                if val <= self.upper[mid] {
                    handler(self.order[mid])?;
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// Collect the positions of all intervals containing the given point
    pub fn including(&self, val: K) -> Vec<usize> {
        let mut positions = Vec::new();

        let _: ControlFlow<Infallible> = self.query(val, |position| {
            positions.push(position);
            ControlFlow::Continue(())
        });

        positions
    }

    /// Count the intervals containing the given point
    pub fn count(&self, val: K) -> usize {
        let mut count = 0;

        let _: ControlFlow<Infallible> = self.query(val, |_position| {
            count += 1;
            ControlFlow::Continue(())
        });

        count
    }

    /// Look up the values of all intervals in `items` containing the given point
    ///
    /// `items` must be the collection this tree was built from.
    ///
    /// # Panics
    ///
    /// Panics if `items` is shorter than the tree.
    pub fn including_values<'a, T>(
        &self,
        items: &'a [T],
        val: K,
    ) -> impl Iterator<Item = &'a T::Value> + 'a
    where
        K: 'a,
        T: ValuedBounds<K> + 'a,
    {
        self.including(val)
            .into_iter()
            .map(move |position| items[position].value())
    }

    #[cfg(feature = "rayon")]
    /// Query for the positions of all intervals containing the given point, in parallel
    pub fn par_query<H, R>(&self, val: K, handler: H) -> ControlFlow<R>
    where
        K: Sync,
        H: Fn(usize) -> ControlFlow<R> + Sync,
        R: Send,
    {
        if !self.is_empty() {
            par_query(self, val, &handler, 0..self.len())?;
        }

        ControlFlow::Continue(())
    }
}

/// Pending subtrees of a depth-first traversal
///
/// Holds at most one pending sibling per level plus the current node's children,
/// which the height of the implicit tree bounds by `usize::BITS + 1`.
struct Stack {
    ranges: [(usize, usize); STACK_LEN],
    len: usize,
}

const STACK_LEN: usize = usize::BITS as usize + 1;

impl Default for Stack {
    fn default() -> Self {
        Self {
            ranges: [(0, 0); STACK_LEN],
            len: 0,
        }
    }
}

impl Stack {
    fn push(&mut self, range: Range<usize>) {
        self.ranges[self.len] = (range.start, range.end);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<Range<usize>> {
        self.len = self.len.checked_sub(1)?;

        let (start, end) = self.ranges[self.len];
        Some(start..end)
    }
}

#[cfg(feature = "rayon")]
fn par_query<K, H, R>(tree: &InTree<K>, val: K, handler: &H, mut range: Range<usize>) -> ControlFlow<R>
where
    K: PartialOrd + Copy + Sync,
    H: Fn(usize) -> ControlFlow<R> + Sync,
    R: Send,
{
    loop {
        let (left, mid, right) = split(range);

        let mut go_left = false;
        let mut go_right = false;

        if val <= tree.subtree_max[mid] && !left.is_empty() {
            go_left = true;
        }

        if tree.lower[mid] <= val {
            if !right.is_empty() {
                go_right = true;
            }

            if val <= tree.upper[mid] {
                handler(tree.order[mid])?;
            }
        }

        match (go_left, go_right) {
            (true, true) => {
                let (left, right) = join(
                    || par_query(tree, val, handler, left),
                    || par_query(tree, val, handler, right),
                );

                left?;
                right?;

                return ControlFlow::Continue(());
            }
            (true, false) => range = left,
            (false, true) => range = right,
            (false, false) => return ControlFlow::Continue(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "rayon")]
    use std::sync::Mutex;

    use proptest::{collection::vec, test_runner::TestRunner};

    fn naive<B>(intervals: &[B], val: f64) -> Vec<usize>
    where
        B: crate::Bounds,
    {
        intervals
            .iter()
            .enumerate()
            .filter(|(_, interval)| {
                let (lower, upper) = interval.limits();
                lower <= val && val <= upper
            })
            .map(|(position, _)| position)
            .collect()
    }

    #[test]
    fn query_random() {
        const DOM: Range<f64> = -1000.0..1000.0;
        const LEN: usize = 1000_usize;

        TestRunner::default()
            .run(
                &(vec(DOM, LEN), vec(DOM, LEN), DOM),
                |(lower, upper, val)| {
                    let intervals = lower
                        .iter()
                        .zip(&upper)
                        .map(|(&lower, &upper)| lower..=upper)
                        .collect::<Vec<_>>();

                    let tree = InTree::new(&intervals);

                    let mut result1 = tree.including(val);
                    let result2 = naive(&intervals, val);

                    for &position in &result1 {
                        assert!(intervals[position].contains(&val));
                    }

                    result1.sort_unstable();
                    assert_eq!(result1, result2);
                    assert_eq!(tree.count(val), result2.len());

                    Ok(())
                },
            )
            .unwrap()
    }

    #[test]
    fn query_random_integers() {
        const DOM: Range<i32> = -100..100;
        const LEN: usize = 1000_usize;

        TestRunner::default()
            .run(
                &(vec(DOM, 0..LEN), vec(DOM, 0..LEN), DOM),
                |(lower, upper, val)| {
                    let intervals = lower
                        .iter()
                        .zip(&upper)
                        .map(|(&lower, &upper)| [lower, upper])
                        .collect::<Vec<_>>();

                    let tree = InTree::new(&intervals);

                    let mut result1 = tree.including(val);

                    let result2 = intervals
                        .iter()
                        .enumerate()
                        .filter(|(_, [lower, upper])| *lower <= val && val <= *upper)
                        .map(|(position, _)| position)
                        .collect::<Vec<_>>();

                    result1.sort_unstable();
                    assert_eq!(result1, result2);

                    Ok(())
                },
            )
            .unwrap()
    }

    #[test]
    fn query_stops_early() {
        let tree = InTree::new([[1.0, 5.0], [2.0, 6.0], [3.0, 7.0]]);

        let mut visited = 0;

        let res = tree.query(4.0, |position| {
            visited += 1;
            ControlFlow::Break(position)
        });

        assert_eq!(visited, 1);
        assert!(matches!(res, ControlFlow::Break(position) if position < 3));
    }

    #[test]
    fn query_deep_tree() {
        let intervals = (0..100_000)
            .map(|idx| [idx as f64, idx as f64 + 2.0])
            .collect::<Vec<_>>();

        let tree = InTree::new(&intervals);

        let mut positions = tree.including(500.0);
        positions.sort_unstable();
        assert_eq!(positions, [498, 499, 500]);

        assert_eq!(tree.count(-1.0), 0);
        assert_eq!(tree.count(100_001.0), 1);
    }

    #[test]
    fn inverted_intervals_never_match() {
        let intervals = [[6.0, 4.0], [4.0, 6.0]];
        let tree = InTree::new(&intervals);

        assert_eq!(tree.including(5.0), [1]);
        assert!(tree.including(6.5).is_empty());
    }

    #[test]
    fn stack_is_last_in_first_out() {
        let mut stack = Stack::default();

        assert_eq!(stack.pop(), None);

        stack.push(0..3);
        stack.push(4..7);

        assert_eq!(stack.pop(), Some(4..7));
        assert_eq!(stack.pop(), Some(0..3));
        assert_eq!(stack.pop(), None);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn par_query_random() {
        const DOM: Range<f64> = -1000.0..1000.0;
        const LEN: usize = 1000_usize;

        TestRunner::default()
            .run(
                &(vec(DOM, LEN), vec(DOM, LEN), DOM),
                |(lower, upper, val)| {
                    let intervals = lower
                        .iter()
                        .zip(&upper)
                        .map(|(&lower, &upper)| lower..=upper)
                        .collect::<Vec<_>>();

                    let tree = InTree::par_new(&intervals);

                    let result1 = Mutex::new(Vec::new());
                    tree.par_query(val, |position| {
                        result1.lock().unwrap().push(position);
                        ControlFlow::<()>::Continue(())
                    })
                    .continue_value()
                    .unwrap();
                    let mut result1 = result1.into_inner().unwrap();

                    let result2 = naive(&intervals, val);

                    result1.sort_unstable();
                    assert_eq!(result1, result2);

                    Ok(())
                },
            )
            .unwrap()
    }
}
