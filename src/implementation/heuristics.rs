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

//! This module provides the stock preprocessing heuristics. Any admissible
//! lower bound is sound; zero is the trivially admissible one every run can
//! fall back to.

use crate::abstraction::cost::Cost;
use crate::abstraction::space::Preprocessor;

/// The trivial preprocessing heuristic: every bound is zero. Always
/// admissible, never informative. Tighter heuristics speed the search up but
/// never change the outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroBounds;

impl<V, U: Cost> Preprocessor<V, U> for ZeroBounds {
    fn own_bounds(&self, _variable: &str, domain: &[V]) -> Vec<U> {
        vec![U::ZERO; domain.len()]
    }

    fn child_bound(&self, _variable: &str, _child: &str) -> U {
        U::ZERO
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
