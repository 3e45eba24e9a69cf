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

//! This module provides the state a single variable maintains while taking
//! part in the protocol: its per-value, per-child bound tables, the threshold
//! distribution, its current context, and the derived aggregates (`LB`, `UB`
//! and their minimizing values). The state is a passive data structure; the
//! protocol transitions that drive it live in
//! `crate::implementation::variant`, and the invariants that constrain it in
//! `crate::implementation::invariants`.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use metrohash::{MetroHashMap, MetroHashSet};

use crate::abstraction::cost::Cost;
use crate::abstraction::space::CostSpace;
use crate::common::{Context, MessageKind, ProtocolMessage};

/// All the information a single variable needs to run the protocol. One such
/// state exists per variable and is mutated by exactly one logical owner at a
/// time: one inbound message is processed to completion before the next one
/// is looked at.
pub struct VariableState<V, U> {
    /// This variable's name.
    pub name: String,
    /// The ordered, duplicate-free domain.
    pub domain: Vec<V>,
    /// For each value, its position in the per-value tables.
    value_index: MetroHashMap<V, usize>,

    /// The separator: parent first (when there is one), then pseudo-parents.
    separator: Vec<String>,
    /// Whether the first entry of `separator` is a true parent.
    has_parent: bool,
    /// For each separator member, its position in `separator`.
    separator_index: MetroHashMap<String, usize>,
    /// The lower neighbours: the first `nb_children` are true children, the
    /// rest are pseudo-children.
    lower_neighbours: Vec<String>,
    /// The number of true children.
    nb_children: usize,
    /// For each lower neighbour, its position in `lower_neighbours`.
    lower_index: MetroHashMap<String, usize>,
    /// Whether the topology view has arrived yet.
    topology_set: bool,

    /// The cost spaces this variable is responsible for; their costs add up
    /// to the local cost `delta`.
    spaces: Vec<Arc<dyn CostSpace<V, U>>>,
    /// The own admissible lower bounds from preprocessing, in domain order.
    own_bounds: Option<Vec<U>>,
    /// The admissible lower bound reported by preprocessing for each child.
    child_bounds: MetroHashMap<String, U>,

    /// `child_lb[d][c]`: the lower bound child `c` last reported for our
    /// value `d`.
    child_lb: Vec<Vec<U>>,
    /// `child_ub[d][c]`: the upper bound child `c` last reported for our
    /// value `d`.
    child_ub: Vec<Vec<U>>,
    /// `child_threshold[d][c]`: the share of our threshold allocated to `c`
    /// when our value is `d`.
    child_threshold: Vec<Vec<U>>,
    /// `child_context[d][c]`: the context under which `child_lb`/`child_ub`
    /// were reported.
    child_context: Vec<Vec<Context<V>>>,
    /// Cached per-value sum of `child_lb`.
    lb_sum: Vec<U>,
    /// Cached per-value sum of `child_ub`.
    ub_sum: Vec<U>,

    /// The local cost of each value under the current context.
    delta: Vec<U>,
    /// `LB(d) = delta(d) + sum of child lower bounds`, floored by the own
    /// preprocessing bound.
    lb_per_value: Vec<U>,
    /// `UB(d) = delta(d) + sum of child upper bounds` once full information
    /// holds, `INFINITY` before that.
    ub_per_value: Vec<U>,
    /// The minimal `LB(d)`.
    lb: U,
    /// The minimal `UB(d)`.
    ub: U,
    /// The value minimizing `LB(d)`.
    lb_value: V,
    /// The value minimizing `UB(d)`.
    ub_value: V,

    /// The tentative value this variable currently stands on.
    current_value: V,
    /// The scalar threshold budget (invariant: `LB <= threshold <= UB`).
    pub(crate) threshold: U,
    /// The last known assignment of the separator (plus whatever was learned
    /// transitively from cost reports).
    pub(crate) current_context: Context<V>,

    /// Set at the end of init; messages received before that are buffered or
    /// re-queued, never processed.
    pub(crate) initialized: bool,
    /// Set when the parent ordered termination.
    pub(crate) terminate: bool,
    /// Set when this variable emitted its final value. Monotonic: once true,
    /// no further VALUE/COST leaves this variable.
    pub(crate) execution_terminated: bool,
    /// True once a VALUE was received from every separator member, making the
    /// upper bounds finite and trustworthy.
    pub(crate) full_info: bool,
    /// The separator members that sent us a VALUE so far.
    value_senders: MetroHashSet<String>,
    /// The size of the separator.
    nb_separators: usize,

    /// For each lower neighbour, the last VALUE sent to it.
    last_value_sent: Vec<Option<ProtocolMessage<V, U>>>,
    /// For each (kind, sender) edge, the last message processed from it.
    last_received: MetroHashMap<(MessageKind, String), ProtocolMessage<V, U>>,
}

impl<V, U> VariableState<V, U>
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    /// Creates the state of an unconfigured variable. The topology and the
    /// preprocessing bounds must still arrive (in either order) before the
    /// variable is ready to take part in the protocol.
    pub fn new<S: Into<String>>(name: S, domain: Vec<V>) -> Self {
        debug_assert!(!domain.is_empty());
        let mut value_index = MetroHashMap::default();
        for (i, v) in domain.iter().enumerate() {
            value_index.insert(v.clone(), i);
        }
        let n = domain.len();
        let first = domain[0].clone();
        VariableState {
            name: name.into(),
            value_index,
            separator: vec![],
            has_parent: false,
            separator_index: MetroHashMap::default(),
            lower_neighbours: vec![],
            nb_children: 0,
            lower_index: MetroHashMap::default(),
            topology_set: false,
            spaces: vec![],
            own_bounds: None,
            child_bounds: MetroHashMap::default(),
            child_lb: vec![vec![]; n],
            child_ub: vec![vec![]; n],
            child_threshold: vec![vec![]; n],
            child_context: vec![vec![]; n],
            lb_sum: vec![U::ZERO; n],
            ub_sum: vec![U::ZERO; n],
            delta: vec![U::ZERO; n],
            lb_per_value: vec![U::ZERO; n],
            ub_per_value: vec![U::ZERO; n],
            lb: U::INFINITY,
            ub: U::INFINITY,
            lb_value: first.clone(),
            ub_value: first.clone(),
            current_value: first,
            threshold: U::ZERO,
            current_context: Context::default(),
            initialized: false,
            terminate: false,
            execution_terminated: false,
            full_info: false,
            value_senders: MetroHashSet::default(),
            nb_separators: 0,
            last_value_sent: vec![],
            last_received: MetroHashMap::default(),
            domain,
        }
    }

    // ------------------------------------------------------------------------
    // --- TOPOLOGY -----------------------------------------------------------
    // ------------------------------------------------------------------------

    /// Records the separator: the parent (if any) followed by the
    /// pseudo-parents.
    pub fn set_separator(&mut self, parent: Option<String>, pseudo_parents: Vec<String>) {
        self.separator.clear();
        self.separator_index.clear();
        self.has_parent = parent.is_some();
        if let Some(p) = parent {
            self.separator_index.insert(p.clone(), 0);
            self.separator.push(p);
        }
        for pp in pseudo_parents {
            self.separator_index.insert(pp.clone(), self.separator.len());
            self.separator.push(pp);
        }
        self.nb_separators = self.separator.len();
    }

    /// Records the lower neighbours (children first, then pseudo-children)
    /// and allocates the per-value, per-child tables.
    pub fn set_lower_neighbours(&mut self, children: Vec<String>, pseudo_children: Vec<String>) {
        self.nb_children = children.len();
        self.lower_neighbours.clear();
        self.lower_index.clear();
        for c in children.into_iter().chain(pseudo_children.into_iter()) {
            self.lower_index.insert(c.clone(), self.lower_neighbours.len());
            self.lower_neighbours.push(c);
        }
        let (n, k) = (self.domain.len(), self.nb_children);
        self.child_lb = vec![vec![U::ZERO; k]; n];
        self.child_ub = vec![vec![U::INFINITY; k]; n];
        self.child_threshold = vec![vec![U::ZERO; k]; n];
        self.child_context = vec![vec![Context::default(); k]; n];
        self.last_value_sent = vec![None; self.lower_neighbours.len()];
        self.topology_set = true;
    }

    /// Makes this variable responsible for one more cost space.
    pub fn store_space(&mut self, space: Arc<dyn CostSpace<V, U>>) {
        self.spaces.push(space);
    }

    /// Records the own preprocessing bounds (one per domain value).
    pub fn set_own_bounds(&mut self, bounds: Vec<U>) {
        debug_assert_eq!(bounds.len(), self.domain.len());
        self.own_bounds = Some(bounds);
    }

    /// Records the preprocessing bound of one child.
    pub fn set_child_bound(&mut self, child: String, bound: U) {
        self.child_bounds.insert(child, bound);
    }

    /// A variable is ready to start once its topology view has arrived along
    /// with all its preprocessing bounds: its own table plus one bound per
    /// true child.
    pub fn is_ready(&self) -> bool {
        self.topology_set
            && self.own_bounds.is_some()
            && self.child_bounds.len() == self.nb_children
    }

    /// True iff this variable has no neighbour at all, in which case it never
    /// exchanges a single message and decides on its own.
    pub fn is_singleton(&self) -> bool {
        self.topology_set && self.separator.is_empty() && self.lower_neighbours.is_empty()
    }

    // ------------------------------------------------------------------------
    // --- SMALL ACCESSORS ----------------------------------------------------
    // ------------------------------------------------------------------------

    /// The parent variable, if this is not the root.
    pub fn parent(&self) -> Option<&str> {
        if self.has_parent {
            self.separator.first().map(|s| s.as_str())
        } else {
            None
        }
    }
    /// True iff this variable has no parent.
    pub fn is_root(&self) -> bool {
        self.topology_set && !self.has_parent
    }
    /// The ordered lower neighbours (children then pseudo-children).
    pub fn lower_neighbours(&self) -> &[String] {
        &self.lower_neighbours
    }
    /// The number of true children.
    pub fn nb_children(&self) -> usize {
        self.nb_children
    }
    /// The size of the separator.
    pub fn nb_separators(&self) -> usize {
        self.nb_separators
    }
    /// True iff `name` belongs to the separator.
    pub fn in_separator(&self, name: &str) -> bool {
        self.separator_index.contains_key(name)
    }
    /// True iff `name` is a neighbour of any kind (separator member or lower
    /// neighbour).
    pub fn is_neighbour(&self, name: &str) -> bool {
        self.separator_index.contains_key(name) || self.lower_index.contains_key(name)
    }
    /// The child-table position of `name`, when it is a true child.
    pub fn child_position(&self, name: &str) -> Option<usize> {
        self.lower_index.get(name).copied().filter(|i| *i < self.nb_children)
    }
    /// The table position of a domain value. The value must belong to the
    /// domain.
    pub fn value_index(&self, value: &V) -> usize {
        self.value_index[value]
    }
    /// The table position of a value, `None` when it is not in the domain.
    pub fn position_of(&self, value: &V) -> Option<usize> {
        self.value_index.get(value).copied()
    }

    /// The current tentative value.
    pub fn current_value(&self) -> &V {
        &self.current_value
    }
    /// The aggregate lower bound `LB`.
    pub fn lower_bound(&self) -> U {
        self.lb
    }
    /// The aggregate upper bound `UB`.
    pub fn upper_bound(&self) -> U {
        self.ub
    }
    /// The value minimizing `LB(d)`.
    pub fn lb_value(&self) -> &V {
        &self.lb_value
    }
    /// The value minimizing `UB(d)`.
    pub fn ub_value(&self) -> &V {
        &self.ub_value
    }
    /// The scalar threshold.
    pub fn threshold(&self) -> U {
        self.threshold
    }
    /// The current context.
    pub fn current_context(&self) -> &Context<V> {
        &self.current_context
    }
    /// True iff this variable has emitted its final value.
    pub fn is_terminated(&self) -> bool {
        self.execution_terminated
    }
    /// True iff a VALUE was received from every separator member.
    pub fn has_full_info(&self) -> bool {
        self.full_info
    }
    /// `LB(d)` for a given value.
    pub fn lb_of(&self, value: &V) -> U {
        self.lb_per_value[self.value_index[value]]
    }
    /// `UB(d)` for a given value.
    pub fn ub_of(&self, value: &V) -> U {
        self.ub_per_value[self.value_index[value]]
    }

    pub(crate) fn set_current_value(&mut self, value: V) {
        self.current_value = value;
    }
    pub(crate) fn child_lb_at(&self, value_idx: usize, child: usize) -> U {
        self.child_lb[value_idx][child]
    }
    pub(crate) fn child_ub_at(&self, value_idx: usize, child: usize) -> U {
        self.child_ub[value_idx][child]
    }
    pub(crate) fn child_threshold_at(&self, value_idx: usize, child: usize) -> U {
        self.child_threshold[value_idx][child]
    }
    pub(crate) fn set_child_threshold_at(&mut self, value_idx: usize, child: usize, t: U) {
        self.child_threshold[value_idx][child] = t;
    }
    pub(crate) fn child_context_at(&self, value_idx: usize, child: usize) -> &Context<V> {
        &self.child_context[value_idx][child]
    }
    pub(crate) fn set_child_context_at(&mut self, value_idx: usize, child: usize, ctx: Context<V>) {
        self.child_context[value_idx][child] = ctx;
    }

    // ------------------------------------------------------------------------
    // --- DEDUPLICATION ------------------------------------------------------
    // ------------------------------------------------------------------------

    /// Records `msg` as the last processed message on its (kind, sender)
    /// edge. Returns false -- and records nothing -- when `msg` is equal to
    /// the message already recorded on that edge: a duplicate delivery that
    /// carries no new information and must not generate more traffic.
    pub fn register_received(&mut self, msg: &ProtocolMessage<V, U>) -> bool {
        let key = (msg.kind(), msg.sender().to_string());
        if self.last_received.get(&key) == Some(msg) {
            return false;
        }
        self.last_received.insert(key, msg.clone());
        true
    }

    /// Notes that one separator member sent us a VALUE. Full information
    /// holds once every separator member did so at least once.
    pub(crate) fn note_value_sender(&mut self, sender: &str) {
        if self.in_separator(sender) {
            self.value_senders.insert(sender.to_string());
            if self.value_senders.len() == self.nb_separators {
                self.full_info = true;
            }
        }
    }

    /// Declares full information without waiting for VALUE messages. Used
    /// when the parent orders termination: its final context covers the
    /// whole separator.
    pub(crate) fn force_full_info(&mut self) {
        self.full_info = true;
    }

    /// Records the VALUE just sent to the lower neighbour at `index`.
    /// Returns true when it differs from the previous one (used for tracing
    /// only; the message is sent either way).
    pub(crate) fn register_value_sent(&mut self, index: usize, msg: &ProtocolMessage<V, U>) -> bool {
        if self.last_value_sent[index].as_ref() == Some(msg) {
            false
        } else {
            self.last_value_sent[index] = Some(msg.clone());
            true
        }
    }

    // ------------------------------------------------------------------------
    // --- BOUND TABLES -------------------------------------------------------
    // ------------------------------------------------------------------------

    /// The own preprocessing bound for the value at `idx` (zero when the
    /// preprocessing table has not arrived, which only happens in tests that
    /// poke the state directly).
    fn own_bound(&self, idx: usize) -> U {
        self.own_bounds.as_ref().map(|b| b[idx]).unwrap_or(U::ZERO)
    }

    /// Populates the bound tables from the preprocessing results: for every
    /// value, each child starts at its heuristic lower bound with an infinite
    /// upper bound, and its initial threshold share equals that lower bound.
    /// Then derives `LB(d)`/`UB(d)` and elects the initial tentative value
    /// (the one minimizing the lower bound).
    pub fn initialize_bounds(&mut self) {
        for i in 0..self.domain.len() {
            self.lb_sum[i] = U::ZERO;
            self.ub_sum[i] = U::ZERO;
        }
        for c in 0..self.nb_children {
            let h = self
                .child_bounds
                .get(&self.lower_neighbours[c])
                .copied()
                .unwrap_or(U::ZERO);
            for i in 0..self.domain.len() {
                self.child_lb[i][c] = h;
                self.child_ub[i][c] = U::INFINITY;
                self.child_threshold[i][c] = h;
                self.lb_sum[i] = self.lb_sum[i].add(h);
                self.ub_sum[i] = self.ub_sum[i].add(U::INFINITY);
            }
        }

        self.lb = U::INFINITY;
        self.ub = U::INFINITY;
        for i in 0..self.domain.len() {
            let lb_d = self.delta[i].add(self.lb_sum[i]).max(self.own_bound(i));
            self.lb_per_value[i] = lb_d;
            self.ub_per_value[i] = if self.nb_children == 0 {
                U::INFINITY
            } else {
                self.delta[i].add(self.ub_sum[i])
            };

            if self.lb > lb_d {
                self.lb = lb_d;
                self.lb_value = self.domain[i].clone();
            }
            // >= so that ub_value is elected even when every UB(d) is
            // still infinite
            if self.ub >= self.ub_per_value[i] {
                self.ub = self.ub_per_value[i];
                self.ub_value = self.domain[i].clone();
            }
        }
        self.current_value = self.lb_value.clone();
    }

    /// Recomputes the local cost `delta(d)` of every value under the current
    /// context, then `LB(d)`/`UB(d)` and the aggregates. Upper bounds remain
    /// infinite until full information holds.
    pub fn set_delta(&mut self) {
        let mut min_lb = U::INFINITY;
        let mut min_ub = U::INFINITY;

        for i in 0..self.domain.len() {
            let d = self.domain[i].clone();
            self.current_context.insert(self.name.clone(), d.clone());
            let mut cost = U::ZERO;
            for space in self.spaces.iter() {
                cost = cost.add(space.cost(&self.current_context));
            }

            self.delta[i] = cost;
            self.lb_per_value[i] = self.lb_sum[i].add(cost).max(self.own_bound(i));
            if self.lb_per_value[i] < min_lb {
                min_lb = self.lb_per_value[i];
                self.lb_value = d.clone();
            }

            self.ub_per_value[i] = if self.full_info {
                self.ub_sum[i].add(cost)
            } else {
                U::INFINITY
            };
            if self.ub_per_value[i] < min_ub {
                min_ub = self.ub_per_value[i];
                self.ub_value = d;
            }
        }

        self.lb = min_lb;
        self.ub = min_ub;
        self.current_context.remove(&self.name);
    }

    /// The local cost of the current tentative value.
    pub fn current_delta(&self) -> U {
        self.delta[self.value_index[&self.current_value]]
    }

    /// Overwrites the bounds reported by one child for one value and fixes up
    /// the aggregates.
    pub fn update_bounds(&mut self, value_idx: usize, child: usize, new_lb: U, new_ub: U) {
        self.child_lb[value_idx][child] = new_lb;
        self.child_ub[value_idx][child] = new_ub;
        self.compute_lb(value_idx);
        self.compute_ub(value_idx);
    }

    /// Forgets everything one child reported for one value: its lower bound
    /// falls back to zero and its upper bound to infinity.
    pub fn reset_bounds(&mut self, value_idx: usize, child: usize) {
        self.child_lb[value_idx][child] = U::ZERO;
        self.child_ub[value_idx][child] = U::INFINITY;
        self.compute_lb(value_idx);
        self.compute_ub(value_idx);
    }

    /// Resets the threshold share of one child for one value.
    pub fn reset_child_threshold(&mut self, value_idx: usize, child: usize) {
        self.child_threshold[value_idx][child] = U::ZERO;
    }

    /// Forgets the context under which one child reported its bounds for one
    /// value.
    pub fn reset_child_context(&mut self, value_idx: usize, child: usize) {
        self.child_context[value_idx][child] = Context::default();
    }

    /// Recomputes the sum of child lower bounds for one value, then `LB(d)`
    /// and, if needed, the aggregate `LB` and its minimizer.
    pub fn compute_lb(&mut self, value_idx: usize) {
        let mut sum = U::ZERO;
        for bound in self.child_lb[value_idx].iter() {
            sum = sum.add(*bound);
        }
        self.lb_sum[value_idx] = sum;
        self.lb_per_value[value_idx] = sum
            .add(self.delta[value_idx])
            .max(self.own_bound(value_idx));

        let value = &self.domain[value_idx];
        if self.lb_value == *value && self.lb != self.lb_per_value[value_idx] {
            // the former minimizer moved: full re-scan
            self.lb = U::INFINITY;
            for i in 0..self.domain.len() {
                if self.lb > self.lb_per_value[i] {
                    self.lb = self.lb_per_value[i];
                    self.lb_value = self.domain[i].clone();
                }
            }
        } else if self.lb > self.lb_per_value[value_idx] {
            self.lb = self.lb_per_value[value_idx];
            self.lb_value = value.clone();
        }
    }

    /// Recomputes the sum of child upper bounds for one value, then `UB(d)`
    /// and, if needed, the aggregate `UB` and its minimizer.
    pub fn compute_ub(&mut self, value_idx: usize) {
        let mut sum = U::ZERO;
        for bound in self.child_ub[value_idx].iter() {
            sum = sum.add(*bound);
        }
        self.ub_sum[value_idx] = sum;
        self.ub_per_value[value_idx] = if self.full_info {
            sum.add(self.delta[value_idx])
        } else {
            U::INFINITY
        };

        let value = &self.domain[value_idx];
        if self.ub_value == *value && self.ub != self.ub_per_value[value_idx] {
            self.ub = U::INFINITY;
            for i in 0..self.domain.len() {
                if self.ub > self.ub_per_value[i] {
                    self.ub = self.ub_per_value[i];
                    self.ub_value = self.domain[i].clone();
                }
            }
        } else if self.ub > self.ub_per_value[value_idx] {
            self.ub = self.ub_per_value[value_idx];
            self.ub_value = value.clone();
        }
    }

    /// Elects the value a neighbourless variable should settle on: the one
    /// with the smallest local cost (ties go to the first in domain order).
    pub fn pick_singleton_value(&mut self) {
        let mut min = U::INFINITY;
        let mut best: Option<usize> = None;
        for i in 0..self.domain.len() {
            if min > self.delta[i] {
                min = self.delta[i];
                best = Some(i);
            }
        }
        self.current_value = self.domain[best.unwrap_or(0)].clone();
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_state {
    use std::sync::Arc;

    use crate::abstraction::cost::Cost;
    use crate::implementation::space::TableSpace;

    use super::*;

    fn chain_leaf() -> VariableState<i32, i32> {
        // y, child of x, owning the single binary space of scenario A
        let mut y = VariableState::new("y", vec![0, 1]);
        y.set_separator(Some("x".to_string()), vec![]);
        y.set_lower_neighbours(vec![], vec![]);
        y.store_space(Arc::new(TableSpace::binary(
            ("x", vec![0, 1]),
            ("y", vec![0, 1]),
            vec![0, 2, 3, 1],
        )));
        y.set_own_bounds(vec![0, 0]);
        y
    }

    #[test]
    fn not_ready_before_topology_and_bounds() {
        let mut x: VariableState<i32, i32> = VariableState::new("x", vec![0, 1]);
        assert!(!x.is_ready());
        x.set_own_bounds(vec![0, 0]);
        assert!(!x.is_ready());
        x.set_separator(None, vec![]);
        x.set_lower_neighbours(vec!["y".to_string()], vec![]);
        assert!(!x.is_ready());
        x.set_child_bound("y".to_string(), 0);
        assert!(x.is_ready());
    }

    #[test]
    fn bounds_can_arrive_before_topology() {
        let mut x: VariableState<i32, i32> = VariableState::new("x", vec![0, 1]);
        x.set_child_bound("y".to_string(), 0);
        x.set_own_bounds(vec![0, 0]);
        assert!(!x.is_ready());
        x.set_separator(None, vec![]);
        x.set_lower_neighbours(vec!["y".to_string()], vec![]);
        assert!(x.is_ready());
    }

    #[test]
    fn initialize_bounds_seeds_children_with_heuristic() {
        let mut x: VariableState<i32, i32> = VariableState::new("x", vec![0, 1]);
        x.set_separator(None, vec![]);
        x.set_lower_neighbours(vec!["y".to_string()], vec![]);
        x.set_own_bounds(vec![0, 0]);
        x.set_child_bound("y".to_string(), 2);
        x.initialize_bounds();

        assert_eq!(2, x.child_lb_at(0, 0));
        assert_eq!(i32::INFINITY, x.child_ub_at(0, 0));
        assert_eq!(2, x.child_threshold_at(0, 0));
        assert_eq!(2, x.lower_bound());
        assert_eq!(i32::INFINITY, x.upper_bound());
    }

    #[test]
    fn leaf_upper_bound_stays_infinite_until_full_info() {
        let mut y = chain_leaf();
        y.initialize_bounds();
        y.set_delta();
        // x not known yet: delta minimizes over x, UB infinite
        assert_eq!(0, y.lower_bound());
        assert_eq!(i32::INFINITY, y.upper_bound());

        y.current_context.insert("x".to_string(), 0);
        y.full_info = true;
        y.set_delta();
        assert_eq!(0, y.lower_bound());
        assert_eq!(0, y.upper_bound());
        assert_eq!(&0, y.ub_value());
    }

    #[test]
    fn update_bounds_moves_the_aggregates() {
        let mut x: VariableState<i32, i32> = VariableState::new("x", vec![0, 1]);
        x.set_separator(None, vec![]);
        x.set_lower_neighbours(vec!["y".to_string()], vec![]);
        x.set_own_bounds(vec![0, 0]);
        x.set_child_bound("y".to_string(), 0);
        x.initialize_bounds();
        x.full_info = true;
        x.set_delta();

        x.update_bounds(0, 0, 2, 2);
        assert_eq!(2, x.lb_of(&0));
        assert_eq!(2, x.ub_of(&0));
        // value 1 still has an infinite upper bound and a zero lower bound
        assert_eq!(0, x.lower_bound());
        assert_eq!(&1, x.lb_value());
        assert_eq!(2, x.upper_bound());
        assert_eq!(&0, x.ub_value());

        x.update_bounds(1, 0, 1, 1);
        assert_eq!(1, x.lower_bound());
        assert_eq!(1, x.upper_bound());
        assert_eq!(&1, x.ub_value());
    }

    #[test]
    fn reset_bounds_forgets_a_report() {
        let mut x: VariableState<i32, i32> = VariableState::new("x", vec![0, 1]);
        x.set_separator(None, vec![]);
        x.set_lower_neighbours(vec!["y".to_string()], vec![]);
        x.set_own_bounds(vec![0, 0]);
        x.set_child_bound("y".to_string(), 0);
        x.initialize_bounds();
        x.full_info = true;
        x.set_delta();
        x.update_bounds(0, 0, 2, 2);

        x.reset_bounds(0, 0);
        assert_eq!(0, x.child_lb_at(0, 0));
        assert_eq!(i32::INFINITY, x.child_ub_at(0, 0));
        assert_eq!(0, x.lower_bound());
        assert_eq!(i32::INFINITY, x.upper_bound());
    }

    #[test]
    fn duplicate_messages_are_detected_by_value() {
        let mut y = chain_leaf();
        let msg = ProtocolMessage::Value {
            sender: "x".to_string(),
            receiver: "y".to_string(),
            value: 0,
            threshold: Some(0),
        };
        assert!(y.register_received(&msg));
        assert!(!y.register_received(&msg.clone()));
        // a different payload on the same edge goes through
        let other = ProtocolMessage::Value {
            sender: "x".to_string(),
            receiver: "y".to_string(),
            value: 1,
            threshold: Some(0),
        };
        assert!(y.register_received(&other));
    }

    #[test]
    fn singleton_picks_the_cheapest_value() {
        let mut v: VariableState<i32, i32> = VariableState::new("v", vec![0, 1, 2]);
        v.set_separator(None, vec![]);
        v.set_lower_neighbours(vec![], vec![]);
        v.store_space(Arc::new(TableSpace::unary("v", vec![0, 1, 2], vec![5, 1, 3])));
        v.set_own_bounds(vec![0, 0, 0]);
        assert!(v.is_singleton());
        v.set_delta();
        v.pick_singleton_value();
        assert_eq!(&1, v.current_value());
    }
}
