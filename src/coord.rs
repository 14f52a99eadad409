// Copyright 2026 quadtree-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The generic coordinate domain the tree is parameterized over.

use num::{Bounded, FromPrimitive, Num, ToPrimitive, Zero};
use std::fmt::Debug;

/// Arithmetic the quadtree needs from a coordinate type.
///
/// Implemented for every primitive integer and float. The required methods
/// are the ones whose correct form differs between the integer and float
/// domains; everything else is derived from the `num` traits.
pub trait Coordinate: Num + Bounded + PartialOrd + ToPrimitive + FromPrimitive + Copy + Debug {
    /// Midpoint of `self` and `other`, never overflowing and always within
    /// `[self, other]`. Integer domains round; a unit-wide integer range
    /// yields its lower end, so bisection can stall at that granularity.
    fn mid(self, other: Self) -> Self;

    /// Square root, truncated back into the domain for integers.
    fn sqrt(self) -> Self;

    /// Product, clamped to the domain maximum instead of wrapping.
    fn mul_clamped(self, other: Self) -> Self;

    /// Absolute difference, valid for unsigned domains as well.
    fn abs_diff(self, other: Self) -> Self {
        if self > other {
            self - other
        } else {
            other - self
        }
    }

    /// `self + other` clamped to the domain maximum. `other` must be
    /// non-negative.
    fn add_clamped(self, other: Self) -> Self {
        if self <= Self::max_value() - other {
            self + other
        } else {
            Self::max_value()
        }
    }

    /// `self - other` clamped to the domain minimum. `other` must be
    /// non-negative.
    fn sub_clamped(self, other: Self) -> Self {
        if self >= Self::min_value() + other {
            self - other
        } else {
            Self::min_value()
        }
    }
}

macro_rules! coordinate_int {
    ($($t:ty),*) => {$(
        impl Coordinate for $t {
            #[inline]
            fn mid(self, other: Self) -> Self {
                // carry-free midpoint; immune to overflow at the type's edges
                (self & other) + ((self ^ other) >> 1)
            }

            #[inline]
            fn sqrt(self) -> Self {
                self.to_f64()
                    .and_then(|f| Self::from_f64(f.sqrt()))
                    .unwrap_or_else(Self::zero)
            }

            #[inline]
            fn mul_clamped(self, other: Self) -> Self {
                match self.checked_mul(other) {
                    Some(product) => product,
                    None => <Self as Bounded>::max_value(),
                }
            }
        }
    )*}
}

macro_rules! coordinate_float {
    ($($t:ty),*) => {$(
        impl Coordinate for $t {
            #[inline]
            fn mid(self, other: Self) -> Self {
                self / 2.0 + other / 2.0
            }

            #[inline]
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            #[inline]
            fn mul_clamped(self, other: Self) -> Self {
                self * other
            }
        }
    )*}
}

coordinate_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
coordinate_float!(f32, f64);
