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

//! # ADOPT
//! A simulation framework for asynchronous distributed constraint
//! optimization. Each variable of the problem runs the ADOPT protocol (Modi
//! et al.): it stands on a tentative value, exchanges VALUE and COST messages
//! with its neighbours in a pseudo-tree ordering, and narrows a window of
//! lower and upper bounds until it can commit to a provably optimal value.
//! No variable ever sees the whole problem: only its own cost functions and
//! what its neighbours tell it.
//!
//! Describe your problem as a `DcopProblem` (variables, domains, a
//! pseudo-tree and extensional cost tables), then hand it to one of the two
//! engines: the `SequentialEngine` replays the protocol deterministically
//! through a virtual clock, the `ParallelEngine` runs one thread per agent
//! and takes whatever interleaving the scheduler produces. Both converge to
//! an optimal assignment.
pub mod common;

pub mod abstraction;
pub mod implementation;

pub mod prelude;
