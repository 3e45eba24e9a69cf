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

//! This module provides the three maintenance procedures that keep a
//! variable's threshold budget consistent with its bound tables. They are
//! re-established after every bound movement, in this order:
//!
//!  1. the scalar threshold is clamped into `[LB, UB]`;
//!  2. every child's threshold share is clamped into the child's own
//!     `[lb, ub]` window;
//!  3. for the current value, the shares add up to what the children are
//!     entitled to: `threshold - delta(current)`.

use std::fmt::Debug;
use std::hash::Hash;

use crate::abstraction::cost::Cost;
use crate::implementation::state::VariableState;

/// Clamps the scalar threshold into `[LB, UB]`.
pub fn maintain_threshold_invariant<V, U>(state: &mut VariableState<V, U>)
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    if state.threshold < state.lower_bound() {
        state.threshold = state.lower_bound();
    }
    if state.threshold > state.upper_bound() {
        state.threshold = state.upper_bound();
    }
    debug_assert!(check_threshold_invariant(state));
}

/// Clamps every child's threshold share (for every value) into the child's
/// reported `[lb, ub]` window.
pub fn maintain_child_threshold_invariant<V, U>(state: &mut VariableState<V, U>)
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    for d in 0..state.domain.len() {
        for c in 0..state.nb_children() {
            let lb = state.child_lb_at(d, c);
            if state.child_threshold_at(d, c) < lb {
                state.set_child_threshold_at(d, c, lb);
            }
            let ub = state.child_ub_at(d, c);
            if state.child_threshold_at(d, c) > ub {
                state.set_child_threshold_at(d, c, ub);
            }
        }
    }
    debug_assert!(check_child_threshold_invariant(state));
}

/// Redistributes the threshold shares of the current value so that they add
/// up to `threshold - delta(current)`. When the threshold is infinite no
/// finite redistribution exists; every child simply gets its own upper bound.
pub fn maintain_allocation_invariant<V, U>(state: &mut VariableState<V, U>)
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    let k = state.nb_children();
    if k == 0 {
        return;
    }
    let d = state.value_index(&state.current_value().clone());

    if state.threshold.is_infinite() {
        for c in 0..k {
            let ub = state.child_ub_at(d, c);
            state.set_child_threshold_at(d, c, ub);
        }
        return;
    }

    let need = state.threshold.subtract(state.current_delta());
    let mut t_sum = U::ZERO;
    for c in 0..k {
        t_sum = t_sum.add(state.child_threshold_at(d, c));
    }

    if t_sum < need {
        // grow the shares in child order, each capped by its upper bound
        let mut diff = need.subtract(t_sum);
        for c in 0..k {
            if diff == U::ZERO {
                break;
            }
            let t = state.child_threshold_at(d, c);
            let headroom = state.child_ub_at(d, c).subtract(t);
            let grant = diff.min(headroom);
            state.set_child_threshold_at(d, c, t.add(grant));
            diff = diff.subtract(grant);
        }
    } else if t_sum > need {
        if t_sum.is_infinite() {
            // infinite shares cannot be shrunk arithmetically: restart every
            // share from the child's lower bound and re-grow
            let mut base = U::ZERO;
            for c in 0..k {
                let lb = state.child_lb_at(d, c);
                state.set_child_threshold_at(d, c, lb);
                base = base.add(lb);
            }
            let mut diff = need.subtract(base);
            let mut progressed = true;
            while diff > U::ZERO && progressed {
                progressed = false;
                for c in 0..k {
                    if diff == U::ZERO {
                        break;
                    }
                    let t = state.child_threshold_at(d, c);
                    let headroom = state.child_ub_at(d, c).subtract(t);
                    let grant = diff.min(headroom);
                    if grant > U::ZERO {
                        state.set_child_threshold_at(d, c, t.add(grant));
                        diff = diff.subtract(grant);
                        progressed = true;
                    }
                }
            }
        } else {
            let mut alpha = t_sum.subtract(need);
            for c in 0..k {
                if alpha == U::ZERO {
                    break;
                }
                let t = state.child_threshold_at(d, c);
                let slack = t.subtract(state.child_lb_at(d, c));
                let taken = alpha.min(slack);
                state.set_child_threshold_at(d, c, t.subtract(taken));
                alpha = alpha.subtract(taken);
            }
        }
    }
}

/// True iff `LB <= threshold <= UB`.
pub fn check_threshold_invariant<V, U>(state: &VariableState<V, U>) -> bool
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    state.lower_bound() <= state.threshold && state.threshold <= state.upper_bound()
}

/// True iff every child's share lies in the child's `[lb, ub]` window.
pub fn check_child_threshold_invariant<V, U>(state: &VariableState<V, U>) -> bool
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    for d in 0..state.domain.len() {
        for c in 0..state.nb_children() {
            let t = state.child_threshold_at(d, c);
            if t < state.child_lb_at(d, c) || t > state.child_ub_at(d, c) {
                return false;
            }
        }
    }
    true
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
