// Copyright 2026 quadtree-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::coord::Coordinate;
use crate::geometry::{Bound, Point};
use crate::tree::quad::located::Located;
use crate::tree::quad::node::{child_index, Node, MAX_DEPTH};
use crate::tree::quad::query::{walk, FindVisitor, InBoundVisitor, NearestVisitor};
use thiserror::Error;

/// Errors returned by tree mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The value's location lies outside the bound the tree was built over.
    #[error("point outside of bounds")]
    PointOutsideOfBounds,
}

/// A point-region quadtree over values that report a location.
///
/// The tree is built over a fixed universe bound and every added value must
/// lie within it. Mutation (`add`, `remove*`) requires exclusive access; the
/// read queries borrow the tree shared and may run concurrently once no
/// further mutation occurs.
pub struct Quadtree<P, T> {
    bound: Bound<P>,
    root: Option<Box<Node<T>>>,
    len: usize,
}

impl<P, T> Quadtree<P, T>
where
    P: Coordinate,
    T: Located<P>,
{
    /// New empty tree over the given universe bound.
    pub fn new(bound: Bound<P>) -> Quadtree<P, T> {
        Quadtree {
            bound,
            root: None,
            len: 0,
        }
    }

    /// The universe bound the tree was built over.
    pub fn bound(&self) -> Bound<P> {
        self.bound
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree stores nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every stored value.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Put a value into the tree. Fails if its location is outside the
    /// tree's bound; a value without a location is accepted and ignored.
    pub fn add(&mut self, pointer: T) -> Result<(), Error> {
        let point = match pointer.location() {
            Some(point) => point,
            None => return Ok(()),
        };
        if !self.bound.contains(point) {
            return Err(Error::PointOutsideOfBounds);
        }

        let mut cell = self.bound;
        let mut depth = 0;
        let mut slot = &mut self.root;
        loop {
            match slot {
                None => {
                    *slot = Some(Box::new(Node::new(pointer)));
                    self.len += 1;
                    return Ok(());
                }
                Some(node) => {
                    let quadrant = descend_cell(&mut cell, point, depth);
                    depth += 1;
                    slot = &mut node.children[quadrant];
                }
            }
        }
    }

    /// Remove the stored value whose location equals the given value's.
    /// Returns whether one was found and removed. With several values at the
    /// same location, which of them goes is unspecified; use
    /// [`Quadtree::remove_matching`] to pick a specific one.
    pub fn remove(&mut self, pointer: &T) -> bool {
        let point = match pointer.location() {
            Some(point) => point,
            None => return false,
        };
        self.remove_with(point, |candidate: &T| candidate.location() == Some(point))
    }

    /// Remove the stored value nearest to the given value's location for
    /// which `eq` returns true. Returns whether one was found and removed.
    pub fn remove_matching<F>(&mut self, pointer: &T, eq: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        let point = match pointer.location() {
            Some(point) => point,
            None => return false,
        };
        self.remove_with(point, eq)
    }

    fn remove_with<F>(&mut self, point: Point<P>, eq: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        // locate the nearest matching value first; its location pins down
        // the descent path the node sits on
        let target = {
            let root = match self.root {
                Some(ref root) => root,
                None => return false,
            };
            let mut visitor = FindVisitor::new(point, Some(&eq), self.bound);
            walk(root, self.bound, &mut visitor);
            match visitor.closest.and_then(|value| value.location()) {
                Some(target) => target,
                None => return false,
            }
        };

        if self.remove_located(target, &eq) {
            self.len -= 1;
            true
        } else {
            false
        }
    }

    /// Walk `target`'s insertion path to the first node holding a matching
    /// value, then compact that node.
    fn remove_located<F>(&mut self, target: Point<P>, eq: &F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        let mut cell = self.bound;
        let mut depth = 0;
        let mut slot = &mut self.root;
        loop {
            match slot {
                None => return false,
                Some(node) => {
                    let matched = match node.value {
                        Some(ref value) => value.location() == Some(target) && eq(value),
                        None => false,
                    };
                    if matched {
                        compact(node);
                        return true;
                    }
                    let quadrant = descend_cell(&mut cell, target, depth);
                    depth += 1;
                    slot = &mut node.children[quadrant];
                }
            }
        }
    }

    /// The stored value closest to the point, if the tree holds any.
    pub fn find(&self, point: Point<P>) -> Option<&T> {
        self.matching_impl(point, None::<fn(&T) -> bool>)
    }

    /// The closest stored value for which the filter returns true. The
    /// filter decides acceptance only; rejected values' subtrees are still
    /// searched.
    pub fn matching<F>(&self, point: Point<P>, filter: F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        self.matching_impl(point, Some(filter))
    }

    fn matching_impl<F>(&self, point: Point<P>, filter: Option<F>) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        let root = match self.root {
            Some(ref root) => root,
            None => return None,
        };
        let mut visitor = FindVisitor::new(point, filter, self.bound);
        walk(root, self.bound, &mut visitor);
        visitor.closest
    }
}

impl<P, T> Quadtree<P, T>
where
    P: Coordinate,
    T: Located<P> + Clone,
{
    /// The k stored values closest to the point, nearest first; fewer if the
    /// tree holds fewer. `max_distance` caps the search radius. `buf` is
    /// cleared and reused for the result.
    pub fn k_nearest(
        &self,
        buf: Vec<T>,
        point: Point<P>,
        k: usize,
        max_distance: Option<P>,
    ) -> Vec<T> {
        self.k_nearest_impl(buf, point, k, None::<fn(&T) -> bool>, max_distance)
    }

    /// Like [`Quadtree::k_nearest`], restricted to values for which the
    /// filter returns true.
    pub fn k_nearest_matching<F>(
        &self,
        buf: Vec<T>,
        point: Point<P>,
        k: usize,
        filter: F,
        max_distance: Option<P>,
    ) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.k_nearest_impl(buf, point, k, Some(filter), max_distance)
    }

    fn k_nearest_impl<F>(
        &self,
        mut buf: Vec<T>,
        point: Point<P>,
        k: usize,
        filter: Option<F>,
        max_distance: Option<P>,
    ) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        buf.clear();
        if k == 0 {
            return buf;
        }
        let root = match self.root {
            Some(ref root) => root,
            None => return buf,
        };

        let mut visitor = NearestVisitor::new(point, filter, k, self.bound, max_distance);
        walk(root, self.bound, &mut visitor);

        // the heap yields farthest first
        while let Some((_, value)) = visitor.heap.pop() {
            buf.push(value.clone());
        }
        buf.reverse();
        buf
    }

    /// All stored values within the given bound, boundary inclusive, in no
    /// particular order. `buf` is cleared and reused for the result.
    pub fn in_bound(&self, buf: Vec<T>, bound: Bound<P>) -> Vec<T> {
        self.in_bound_impl(buf, bound, None::<fn(&T) -> bool>)
    }

    /// Like [`Quadtree::in_bound`], restricted to values for which the
    /// filter returns true.
    pub fn in_bound_matching<F>(&self, buf: Vec<T>, bound: Bound<P>, filter: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.in_bound_impl(buf, bound, Some(filter))
    }

    fn in_bound_impl<F>(&self, mut buf: Vec<T>, bound: Bound<P>, filter: Option<F>) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        buf.clear();
        let root = match self.root {
            Some(ref root) => root,
            None => return buf,
        };
        let mut visitor = InBoundVisitor::new(bound, buf, filter);
        walk(root, self.bound, &mut visitor);
        visitor.pointers
    }
}

/// Pick the child quadrant for `point` and shrink `cell` onto it. Below the
/// subdivision cutoff the cell stays fixed and only the quadrant is chosen,
/// so coincident values chain through a stable cell.
fn descend_cell<P: Coordinate>(cell: &mut Bound<P>, point: Point<P>, depth: usize) -> usize {
    let center = cell.center();
    if depth >= MAX_DEPTH {
        return child_index(center, point);
    }

    let mut i = 0;
    if point.y() <= center.y() {
        cell.max[1] = center.y();
        i = 2;
    } else {
        cell.min[1] = center.y();
    }
    if point.x() >= center.x() {
        cell.min[0] = center.x();
        i += 1;
    } else {
        cell.max[0] = center.x();
    }
    i
}

/// Pull-up after a removal: refill the vacated node from its first occupied
/// child quadrant, repeating down that child, and clear a value only where
/// no occupied children remain. Child slots whose nodes hold neither value
/// nor children are dropped along the way.
fn compact<T>(mut node: &mut Node<T>) {
    loop {
        let mut pick = None;
        for i in 0..4 {
            let discard = match node.children[i] {
                Some(ref child) => child.is_empty(),
                None => false,
            };
            if discard {
                node.children[i] = None;
                continue;
            }
            if node.children[i].is_some() {
                pick = Some(i);
                break;
            }
        }

        match pick {
            None => {
                node.value = None;
                return;
            }
            Some(i) => match node.children[i] {
                Some(ref mut child) => {
                    // move the child's value up; the hole sinks one level
                    node.value = child.value.take();
                    node = &mut **child;
                }
                None => return,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Quadtree};
    use crate::geometry::{distance_squared, Bound, Point};

    fn universe() -> Bound<f64> {
        Bound::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0))
    }

    fn populated() -> Quadtree<f64, Point<f64>> {
        let mut tree = Quadtree::new(universe());
        for &(x, y) in &[(1.0, 1.0), (9.0, 9.0), (5.0, 5.0), (1.0, 9.0)] {
            tree.add(Point::new(x, y)).unwrap();
        }
        tree
    }

    #[test]
    fn find_returns_exact_match() {
        let tree = populated();
        assert_eq!(Some(&Point::new(5.0, 5.0)), tree.find(Point::new(5.0, 5.0)));
        assert_eq!(Some(&Point::new(1.0, 1.0)), tree.find(Point::new(0.1, 0.1)));
    }

    #[test]
    fn find_is_idempotent() {
        let tree = populated();
        let first = tree.find(Point::new(4.0, 4.0)).cloned();
        assert_eq!(first.as_ref(), tree.find(Point::new(4.0, 4.0)));
        assert_eq!(first.as_ref(), tree.find(Point::new(4.0, 4.0)));
    }

    #[test]
    fn k_nearest_ordered_scenario() {
        let tree = populated();
        let got = tree.k_nearest(Vec::new(), Point::new(0.0, 0.0), 2, None);
        assert_eq!(vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)], got);
    }

    #[test]
    fn k_nearest_with_k_over_len_returns_all_sorted() {
        let tree = populated();
        let probe = Point::new(0.0, 0.0);
        let got = tree.k_nearest(Vec::new(), probe, 10, None);
        assert_eq!(4, got.len());
        for pair in got.windows(2) {
            assert!(
                distance_squared(pair[0], probe) <= distance_squared(pair[1], probe),
                "not sorted by distance: {:?}",
                got
            );
        }
    }

    #[test]
    fn k_zero_is_empty() {
        let tree = populated();
        assert!(tree.k_nearest(Vec::new(), Point::new(5.0, 5.0), 0, None).is_empty());
    }

    #[test]
    fn k_nearest_max_distance_is_strict() {
        let tree = populated();
        // (1,1) is at distance sqrt(2) from the origin
        let got = tree.k_nearest(Vec::new(), Point::new(0.0, 0.0), 4, Some(2.0));
        assert_eq!(vec![Point::new(1.0, 1.0)], got);
        let none = tree.k_nearest(Vec::new(), Point::new(0.0, 0.0), 4, Some(1.0));
        assert!(none.is_empty());
    }

    #[test]
    fn in_bound_scenario() {
        let tree = populated();
        let query = Bound::new(Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        let mut got = tree.in_bound(Vec::new(), query);
        got.sort_by(|a, b| a.x().partial_cmp(&b.x()).unwrap());
        assert_eq!(vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)], got);
    }

    #[test]
    fn in_bound_over_universe_returns_everything() {
        let tree = populated();
        assert_eq!(4, tree.in_bound(Vec::new(), tree.bound()).len());
        assert_eq!(tree.len(), tree.in_bound(Vec::new(), tree.bound()).len());
    }

    #[test]
    fn remove_then_find_surfaces_a_neighbor() {
        let mut tree = populated();
        assert!(tree.remove(&Point::new(5.0, 5.0)));
        assert_eq!(3, tree.len());

        let found = tree.find(Point::new(5.0, 5.0)).cloned().unwrap();
        assert_ne!(Point::new(5.0, 5.0), found);

        let everything = tree.in_bound(Vec::new(), tree.bound());
        assert_eq!(3, everything.len());
        assert!(!everything.contains(&Point::new(5.0, 5.0)));
    }

    #[test]
    fn remove_nonexistent_is_false_and_harmless() {
        let mut tree = populated();
        assert!(!tree.remove(&Point::new(2.0, 2.0)));
        assert_eq!(4, tree.len());
        assert_eq!(4, tree.in_bound(Vec::new(), tree.bound()).len());
    }

    #[test]
    fn remove_everything_empties_the_tree() {
        let mut tree = populated();
        for &(x, y) in &[(1.0, 1.0), (9.0, 9.0), (5.0, 5.0), (1.0, 9.0)] {
            assert!(tree.remove(&Point::new(x, y)));
        }
        assert!(tree.is_empty());
        assert_eq!(None, tree.find(Point::new(5.0, 5.0)));
        assert!(tree.in_bound(Vec::new(), tree.bound()).is_empty());
        assert!(!tree.remove(&Point::new(1.0, 1.0)));
    }

    #[test]
    fn add_on_the_boundary_succeeds() {
        let mut tree: Quadtree<f64, Point<f64>> = Quadtree::new(universe());
        assert!(tree.add(Point::new(10.0, 10.0)).is_ok());
        assert!(tree.add(Point::new(0.0, 10.0)).is_ok());
        assert_eq!(
            Err(Error::PointOutsideOfBounds),
            tree.add(Point::new(10.0 + 1e-9, 10.0))
        );
        assert_eq!(
            Err(Error::PointOutsideOfBounds),
            tree.add(Point::new(5.0, -1e-9))
        );
        assert_eq!(2, tree.len());
    }

    #[test]
    fn add_without_location_is_a_noop() {
        let mut tree: Quadtree<f64, Option<Point<f64>>> = Quadtree::new(universe());
        assert!(tree.add(None).is_ok());
        assert!(tree.is_empty());
        assert!(tree.add(Some(Point::new(3.0, 3.0))).is_ok());
        assert_eq!(1, tree.len());
    }

    #[test]
    fn matching_filters_acceptance_only() {
        let mut tree: Quadtree<f64, (Point<f64>, u32)> = Quadtree::new(universe());
        tree.add((Point::new(2.0, 2.0), 1)).unwrap();
        tree.add((Point::new(3.0, 3.0), 2)).unwrap();

        let got = tree.matching(Point::new(2.0, 2.0), |v| v.1 == 2);
        assert_eq!(Some(2), got.map(|v| v.1));
        assert_eq!(None, tree.matching(Point::new(2.0, 2.0), |_| false));
    }

    #[test]
    fn k_nearest_matching_applies_the_filter() {
        let mut tree: Quadtree<f64, (Point<f64>, u32)> = Quadtree::new(universe());
        for id in 0..8 {
            tree.add((Point::new(1.0 + id as f64, 1.0), id)).unwrap();
        }

        let got = tree.k_nearest_matching(Vec::new(), Point::new(0.0, 1.0), 3, |v| v.1 % 2 == 1, None);
        let ids: Vec<u32> = got.iter().map(|v| v.1).collect();
        assert_eq!(vec![1, 3, 5], ids);
    }

    #[test]
    fn remove_matching_picks_identity_among_coincident() {
        let mut tree: Quadtree<f64, (Point<f64>, u32)> = Quadtree::new(universe());
        for id in 0..4 {
            tree.add((Point::new(6.0, 6.0), id)).unwrap();
        }

        assert!(tree.remove_matching(&(Point::new(6.0, 6.0), 2), |v| v.1 == 2));
        assert_eq!(3, tree.len());
        let left = tree.in_bound(Vec::new(), tree.bound());
        let mut ids: Vec<u32> = left.iter().map(|v| v.1).collect();
        ids.sort();
        assert_eq!(vec![0, 1, 3], ids);
        assert!(!tree.remove_matching(&(Point::new(6.0, 6.0), 2), |v| v.1 == 2));
    }

    #[test]
    fn remove_matching_reaches_values_far_from_the_probe() {
        let mut tree: Quadtree<f64, (Point<f64>, u32)> = Quadtree::new(universe());
        tree.add((Point::new(1.0, 1.0), 1)).unwrap();
        tree.add((Point::new(9.0, 9.0), 2)).unwrap();

        // matcher by id, probed from the opposite corner
        assert!(tree.remove_matching(&(Point::new(0.0, 0.0), 2), |v| v.1 == 2));
        assert_eq!(1, tree.len());
        assert_eq!(Some(1), tree.find(Point::new(9.0, 9.0)).map(|v| v.1));
    }

    #[test]
    fn coincident_points_chain_and_unwind() {
        let mut tree: Quadtree<f64, (Point<f64>, u32)> = Quadtree::new(universe());
        // far past the subdivision cutoff
        let n = 80;
        for id in 0..n {
            tree.add((Point::new(7.0, 3.0), id)).unwrap();
        }
        assert_eq!(n as usize, tree.len());
        assert_eq!(n as usize, tree.in_bound(Vec::new(), tree.bound()).len());

        let nearest = tree.k_nearest(Vec::new(), Point::new(7.0, 3.0), 5, None);
        assert_eq!(5, nearest.len());

        for id in 0..n {
            assert!(tree.remove_matching(&(Point::new(7.0, 3.0), id), |v| v.1 == id));
        }
        assert!(tree.is_empty());
        assert_eq!(None, tree.find(Point::new(7.0, 3.0)));
    }

    #[test]
    fn clear_resets() {
        let mut tree = populated();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(None, tree.find(Point::new(5.0, 5.0)));
        tree.add(Point::new(2.0, 2.0)).unwrap();
        assert_eq!(1, tree.len());
    }

    #[test]
    fn integer_coordinates_round_trip() {
        let mut tree: Quadtree<i64, Point<i64>> =
            Quadtree::new(Bound::new(Point::new(0, 0), Point::new(100, 100)));
        let points = [(3, 3), (97, 2), (50, 50), (2, 96), (51, 49)];
        for &(x, y) in &points {
            tree.add(Point::new(x, y)).unwrap();
        }
        for &(x, y) in &points {
            assert_eq!(Some(&Point::new(x, y)), tree.find(Point::new(x, y)));
        }
        assert_eq!(points.len(), tree.in_bound(Vec::new(), tree.bound()).len());
        assert_eq!(
            Err(Error::PointOutsideOfBounds),
            tree.add(Point::new(101, 5))
        );
    }

    #[test]
    fn unsigned_coordinates_round_trip() {
        let mut tree: Quadtree<u32, Point<u32>> =
            Quadtree::new(Bound::new(Point::new(0, 0), Point::new(1000, 1000)));
        for &(x, y) in &[(0, 0), (1000, 1000), (999, 1), (500, 500)] {
            tree.add(Point::new(x, y)).unwrap();
        }
        assert_eq!(Some(&Point::new(999, 1)), tree.find(Point::new(990, 0)));
        let got = tree.k_nearest(Vec::new(), Point::new(0, 0), 2, None);
        assert_eq!(vec![Point::new(0, 0), Point::new(500, 500)], got);
    }

    #[test]
    fn reusable_buffer_is_reused() {
        let tree = populated();
        let buf = tree.in_bound(Vec::with_capacity(16), tree.bound());
        assert_eq!(4, buf.len());
        let buf = tree.in_bound(buf, Bound::new(Point::new(8.0, 8.0), Point::new(10.0, 10.0)));
        assert_eq!(vec![Point::new(9.0, 9.0)], buf);
        let buf = tree.k_nearest(buf, Point::new(9.0, 9.0), 1, None);
        assert_eq!(vec![Point::new(9.0, 9.0)], buf);
    }
}
