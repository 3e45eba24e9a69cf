// Copyright 2024 the adopt developers
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module defines the numeric capability the protocol requires from its
//! cost values: a zero, an absorbing "plus infinity", addition, subtraction
//! and a total order. The capability is resolved entirely at compile time
//! through the `Cost` trait and its associated constants; there is no runtime
//! introspection of any sort.

use std::fmt::Debug;
use std::hash::Hash;

/// The algebra of cost values manipulated by the protocol. The protocol only
/// ever works with minimization over non-negative costs, so the requirements
/// are deliberately small: a `ZERO`, an absorbing `INFINITY`, an addition and
/// a subtraction consistent with it, and the total order brought in by `Ord`
/// (which also provides `min`).
pub trait Cost: Copy + Ord + Eq + Hash + Debug + Send + Sync + 'static {
    /// The neutral element of the addition.
    const ZERO: Self;
    /// The absorbing top element: the cost of anything unknown or infeasible.
    const INFINITY: Self;

    /// Adds two costs. `INFINITY` is absorbing: adding anything to it yields
    /// `INFINITY` again (no wrap-around).
    fn add(self, other: Self) -> Self;

    /// Subtracts `other` from `self`. Subtracting a finite cost from
    /// `INFINITY` leaves `INFINITY` untouched.
    fn subtract(self, other: Self) -> Self;

    /// True iff this cost is the `INFINITY` element.
    fn is_infinite(self) -> bool {
        self == Self::INFINITY
    }
}

/// Implements `Cost` for a primitive signed integer, using the type's `MAX`
/// as the infinity element.
macro_rules! int_cost {
    ($t:ty) => {
        impl Cost for $t {
            const ZERO: $t = 0;
            const INFINITY: $t = <$t>::max_value();

            fn add(self, other: $t) -> $t {
                if self == Self::INFINITY || other == Self::INFINITY {
                    Self::INFINITY
                } else {
                    self + other
                }
            }
            fn subtract(self, other: $t) -> $t {
                if self == Self::INFINITY {
                    Self::INFINITY
                } else {
                    self - other
                }
            }
        }
    };
}

int_cost!(i32);
int_cost!(i64);
int_cost!(isize);

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
