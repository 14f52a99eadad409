// Copyright 2026 quadtree-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The pruning walk shared by every read query, and the per-query visitors
//! that drive it.

use crate::coord::Coordinate;
use crate::geometry::{distance_squared, Bound, Point};
use crate::tree::quad::heap::DistHeap;
use crate::tree::quad::located::Located;
use crate::tree::quad::node::{child_index, Node, MAX_DEPTH};

/// What a query exposes to the walk: a pruning bound it may tighten as
/// better candidates turn up, an action to run on every stored value, and an
/// optional point that steers which quadrant is explored first.
pub(crate) trait Visitor<'t, P: Coordinate, T> {
    /// The current relevant bound; subtrees whose cells miss it are skipped.
    fn bound(&self) -> &Bound<P>;

    /// Called for every value in an unpruned node.
    fn visit(&mut self, value: &'t T);

    /// The point being searched for, if there is one. Guides child order so
    /// the most promising quadrant tightens the bound before its siblings
    /// are considered.
    fn point(&self) -> Option<Point<P>>;
}

/// Depth-first walk from `root`, whose cell is `bound`. Runs on an explicit
/// stack so chained or adversarially deep trees cannot exhaust the call
/// stack. The relevant bound is re-read at every node, so a visit that
/// tightens it also prunes frames pushed earlier.
pub(crate) fn walk<'t, P, T, V>(root: &'t Node<T>, bound: Bound<P>, visitor: &mut V)
where
    P: Coordinate,
    V: Visitor<'t, P, T>,
{
    let mut stack: Vec<(&'t Node<T>, Bound<P>, usize)> = vec![(root, bound, 0)];

    while let Some((node, cell, depth)) = stack.pop() {
        if !cell.intersects(visitor.bound()) {
            continue;
        }

        if let Some(ref value) = node.value {
            visitor.visit(value);
        }

        if node.is_leaf() {
            continue;
        }

        let center = cell.center();
        let first = match visitor.point() {
            Some(point) => child_index(center, point),
            None => 0,
        };

        // cyclic child order starting at `first`; pushed reversed so the
        // most promising quadrant is popped first
        for j in (first..first + 4).rev() {
            let quadrant = j % 4;
            if let Some(ref child) = node.children[quadrant] {
                let sub = if depth < MAX_DEPTH {
                    quadrant_cell(&cell, center, quadrant)
                } else {
                    cell
                };
                stack.push((&**child, sub, depth + 1));
            }
        }
    }
}

/// The cell of one quadrant of `cell` with the given center.
fn quadrant_cell<P: Coordinate>(cell: &Bound<P>, center: Point<P>, quadrant: usize) -> Bound<P> {
    match quadrant {
        0 => Bound {
            min: Point::new(cell.min.x(), center.y()),
            max: Point::new(center.x(), cell.max.y()),
        },
        1 => Bound {
            min: center,
            max: cell.max,
        },
        2 => Bound {
            min: cell.min,
            max: center,
        },
        _ => Bound {
            min: Point::new(center.x(), cell.min.y()),
            max: Point::new(cell.max.x(), center.y()),
        },
    }
}

/// Nearest-neighbor search state. Each better candidate shrinks the relevant
/// bound to the square that could still hold a closer one.
pub(crate) struct FindVisitor<'t, P, T, F> {
    point: Point<P>,
    filter: Option<F>,
    pub closest: Option<&'t T>,
    closest_bound: Bound<P>,
    min_dist_squared: P,
}

impl<'t, P, T, F> FindVisitor<'t, P, T, F>
where
    P: Coordinate,
    T: Located<P>,
    F: Fn(&T) -> bool,
{
    pub fn new(point: Point<P>, filter: Option<F>, bound: Bound<P>) -> FindVisitor<'t, P, T, F> {
        FindVisitor {
            point,
            filter,
            closest: None,
            closest_bound: bound,
            min_dist_squared: P::max_value(),
        }
    }
}

impl<'t, P, T, F> Visitor<'t, P, T> for FindVisitor<'t, P, T, F>
where
    P: Coordinate,
    T: Located<P>,
    F: Fn(&T) -> bool,
{
    fn bound(&self) -> &Bound<P> {
        &self.closest_bound
    }

    fn visit(&mut self, value: &'t T) {
        if let Some(ref filter) = self.filter {
            if !filter(value) {
                return;
            }
        }
        let location = match value.location() {
            Some(location) => location,
            None => return,
        };

        let d = distance_squared(location, self.point);
        if d < self.min_dist_squared {
            self.min_dist_squared = d;
            self.closest = Some(value);
            self.closest_bound = Bound::from_center(self.point, d.sqrt());
        }
    }

    fn point(&self) -> Option<Point<P>> {
        Some(self.point)
    }
}

/// K-nearest search state: a bounded max-heap of the best k candidates seen
/// so far. Once full, the worst kept distance becomes the acceptance
/// threshold and the relevant bound shrinks to match it.
pub(crate) struct NearestVisitor<'t, P, T, F> {
    point: Point<P>,
    filter: Option<F>,
    k: usize,
    pub heap: DistHeap<P, &'t T>,
    closest_bound: Bound<P>,
    max_dist_squared: P,
}

impl<'t, P, T, F> NearestVisitor<'t, P, T, F>
where
    P: Coordinate,
    T: Located<P>,
    F: Fn(&T) -> bool,
{
    /// `max_distance` seeds both the threshold and the relevant bound, so a
    /// tight radius prunes from the very first frame.
    pub fn new(
        point: Point<P>,
        filter: Option<F>,
        k: usize,
        bound: Bound<P>,
        max_distance: Option<P>,
    ) -> NearestVisitor<'t, P, T, F> {
        let (max_dist_squared, closest_bound) = match max_distance {
            Some(d) => (d.mul_clamped(d), Bound::from_center(point, d)),
            None => (P::max_value(), bound),
        };
        NearestVisitor {
            point,
            filter,
            k,
            heap: DistHeap::with_capacity(k + 1),
            closest_bound,
            max_dist_squared,
        }
    }
}

impl<'t, P, T, F> Visitor<'t, P, T> for NearestVisitor<'t, P, T, F>
where
    P: Coordinate,
    T: Located<P>,
    F: Fn(&T) -> bool,
{
    fn bound(&self) -> &Bound<P> {
        &self.closest_bound
    }

    fn visit(&mut self, value: &'t T) {
        if let Some(ref filter) = self.filter {
            if !filter(value) {
                return;
            }
        }
        let location = match value.location() {
            Some(location) => location,
            None => return,
        };

        let d = distance_squared(location, self.point);
        if d < self.max_dist_squared {
            self.heap.push(d, value);
            if self.heap.len() > self.k {
                self.heap.pop();
                if let Some(worst) = self.heap.peek_dist() {
                    // the heap is full; from here on only closer candidates
                    // matter, so the search range tightens
                    self.max_dist_squared = worst;
                    self.closest_bound = Bound::from_center(self.point, worst.sqrt());
                }
            }
        }
    }

    fn point(&self) -> Option<Point<P>> {
        Some(self.point)
    }
}

/// Range query state: the relevant bound is the query rectangle and never
/// changes, and there is no guidance point.
pub(crate) struct InBoundVisitor<P, T, F> {
    bound: Bound<P>,
    pub pointers: Vec<T>,
    filter: Option<F>,
}

impl<P, T, F> InBoundVisitor<P, T, F>
where
    P: Coordinate,
    T: Located<P> + Clone,
    F: Fn(&T) -> bool,
{
    pub fn new(bound: Bound<P>, buf: Vec<T>, filter: Option<F>) -> InBoundVisitor<P, T, F> {
        InBoundVisitor {
            bound,
            pointers: buf,
            filter,
        }
    }
}

impl<'t, P, T, F> Visitor<'t, P, T> for InBoundVisitor<P, T, F>
where
    P: Coordinate,
    T: Located<P> + Clone,
    F: Fn(&T) -> bool,
{
    fn bound(&self) -> &Bound<P> {
        &self.bound
    }

    fn visit(&mut self, value: &'t T) {
        if let Some(ref filter) = self.filter {
            if !filter(value) {
                return;
            }
        }
        match value.location() {
            Some(location) if self.bound.contains(location) => {
                self.pointers.push(value.clone());
            }
            _ => {}
        }
    }

    fn point(&self) -> Option<Point<P>> {
        None
    }
}
