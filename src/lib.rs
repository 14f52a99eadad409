// Copyright 2026 quadtree-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A point-region quadtree over two-dimensional point data.
//!
//! The tree recursively subdivides a fixed universe [`Bound`] into
//! quadrants. Each node stores at most one value; inserting into an occupied
//! cell descends into ever smaller quadrants until an empty slot is found.
//! All read queries share one pruning depth-first walk, so nearest-neighbor,
//! k-nearest, and bounding-box searches skip whole subtrees whose cells
//! cannot contain a better answer.
//!
//! ```
//! use quadtree::{Bound, Point, Quadtree};
//!
//! let universe = Bound::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
//! let mut tree = Quadtree::new(universe);
//!
//! tree.add(Point::new(2.0, 3.0)).unwrap();
//! tree.add(Point::new(7.0, 1.0)).unwrap();
//!
//! assert_eq!(tree.find(Point::new(1.0, 1.0)), Some(&Point::new(2.0, 3.0)));
//! ```
//!
//! Mutation assumes exclusive access. Once no further mutation occurs, any
//! number of threads may query the same tree concurrently; every query
//! allocates its own transient search state.

#[macro_use]
extern crate itertools;

#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod coord;
pub mod geometry;
pub mod tree;

pub use crate::coord::Coordinate;
pub use crate::geometry::{distance_squared, Bound, Point};
pub use crate::tree::quad::{Error, Located, Quadtree};
