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

//! This module provides the global-termination machinery: a tracker counting
//! the variables that committed their final value, and a collector gathering
//! those values into the solution assignment. Both are shared across agents
//! (and across threads in the parallel engine).

use std::fmt::Debug;
use std::hash::Hash;

use parking_lot::{Condvar, Mutex};

use crate::abstraction::transport::{OutputSink, TerminationHandle};
use crate::common::{Context, FinalAssignment};

/// Counts terminated variables; the simulation is over when all of them are.
pub struct TerminationTracker {
    /// The number of variables that committed so far.
    critical: Mutex<usize>,
    /// Notified whenever the count reaches the total.
    monitor: Condvar,
    /// The number of variables taking part in the simulation.
    total: usize,
}

impl TerminationTracker {
    /// Creates a tracker waiting for `total` variables.
    pub fn new(total: usize) -> Self {
        TerminationTracker {
            critical: Mutex::new(0),
            monitor: Condvar::new(),
            total,
        }
    }

    /// The number of variables that committed so far.
    pub fn finished(&self) -> usize {
        *self.critical.lock()
    }

    /// Blocks the calling thread until every variable has committed.
    pub fn wait(&self) {
        let mut finished = self.critical.lock();
        while *finished < self.total {
            self.monitor.wait(&mut finished);
        }
    }
}

impl TerminationHandle for TerminationTracker {
    fn variable_finished(&self) {
        let mut finished = self.critical.lock();
        *finished += 1;
        if *finished >= self.total {
            self.monitor.notify_all();
        }
    }

    fn is_complete(&self) -> bool {
        *self.critical.lock() >= self.total
    }
}

/// Gathers the final assignments as they are emitted.
pub struct AssignmentCollector<V> {
    values: Mutex<Context<V>>,
}

impl<V: Clone + Eq + Hash + Debug> AssignmentCollector<V> {
    pub fn new() -> Self {
        AssignmentCollector {
            values: Mutex::new(Context::default()),
        }
    }

    /// A copy of what has been collected so far.
    pub fn snapshot(&self) -> Context<V> {
        self.values.lock().clone()
    }
}

impl<V: Clone + Eq + Hash + Debug> Default for AssignmentCollector<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Eq + Hash + Debug> OutputSink<V> for AssignmentCollector<V> {
    fn emit(&self, assignment: FinalAssignment<V>) {
        self.values.lock().insert(assignment.variable, assignment.value);
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
