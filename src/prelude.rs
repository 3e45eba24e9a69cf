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

//! The prelude module is only present to ease your life while assembling a
//! simulation. That way you don't have to care about manually importing all
//! structs and traits by yourself: either `use adopt::prelude::*;` or
//! re-export it from your own prelude.

pub use crate::common::*;

// Abstractions
pub use crate::abstraction::cost::*;
pub use crate::abstraction::space::*;
pub use crate::abstraction::transport::*;
pub use crate::abstraction::variant::*;

// Implementations
pub use crate::implementation::agent::{Agent, Delivery};
pub use crate::implementation::engine::sequential::minimize;
pub use crate::implementation::engine::{
    DcopProblem, Objective, ParallelEngine, SequentialEngine, SetupError, Solution, VariableSpec,
};
pub use crate::implementation::heuristics::ZeroBounds;
pub use crate::implementation::space::TableSpace;
pub use crate::implementation::state::VariableState;
pub use crate::implementation::termination::{AssignmentCollector, TerminationTracker};
pub use crate::implementation::variant::ClassicAdopt;
