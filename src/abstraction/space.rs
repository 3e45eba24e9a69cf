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

//! This module defines the abstractions through which the protocol consumes
//! the cost structure of the problem: the `CostSpace` trait standing for one
//! local cost function (a constraint), and the `Preprocessor` trait standing
//! for the external collaborator that supplies admissible lower-bound tables.

use crate::common::Context;

/// One local cost function over a set of variables. A variable of the
/// pseudo-tree is made responsible for zero or more such spaces (the ones
/// binding it to its separator); their costs add up to that variable's local
/// cost `delta`.
pub trait CostSpace<V, U>: Send + Sync {
    /// The names of the variables this cost function depends on.
    fn scope(&self) -> &[String];

    /// The cost of the given (possibly partial) assignment. Scope variables
    /// missing from the context are minimized over, so that the returned
    /// value is always an admissible lower bound of any completion; on a
    /// complete context it is the exact cost.
    fn cost(&self, ctx: &Context<V>) -> U;

    /// Iterates over every cost entry of this space. Used at setup time to
    /// verify that all local costs are non-negative.
    fn costs(&self) -> Box<dyn Iterator<Item = U> + '_>;
}

/// The preprocessing collaborator: it supplies, for every variable, an
/// admissible lower bound per domain value, and for every variable/child pair
/// an admissible lower bound on the cost of the subtree rooted in that child.
/// The all-zero tables are always admissible when costs are non-negative.
pub trait Preprocessor<V, U> {
    /// One admissible lower bound per value of `variable`, in domain order.
    fn own_bounds(&self, variable: &str, domain: &[V]) -> Vec<U>;

    /// An admissible lower bound on the cost of the subtree rooted in
    /// `child`, as seen from `variable`.
    fn child_bound(&self, variable: &str, child: &str) -> U;
}
