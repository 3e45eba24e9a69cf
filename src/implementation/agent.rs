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

//! This module provides the agent: the mailbox-side entity that owns one or
//! more variables and feeds each inbound envelope to the right one. The agent
//! knows nothing about the protocol itself; it performs the routing, tracks
//! readiness, and defers every transition to the `ProtocolVariant` it was
//! built with.

use std::fmt::Debug;
use std::hash::Hash;

use metrohash::MetroHashMap;
use tracing::{debug, trace};

use crate::abstraction::cost::Cost;
use crate::abstraction::transport::AgentContext;
use crate::abstraction::variant::ProtocolVariant;
use crate::common::{Envelope, FinalAssignment};
use crate::implementation::state::VariableState;
use crate::implementation::variant::ClassicAdopt;

/// What the caller should do after an envelope has been delivered.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Delivery {
    /// Keep pumping the mailbox.
    Continue,
    /// The shutdown order was received; stop pumping.
    Shutdown,
}

/// An agent owning a set of variables. Exactly one envelope is processed at a
/// time; within one agent no two variables ever run concurrently.
pub struct Agent<V, U, P = ClassicAdopt>
where
    P: ProtocolVariant<V, U, State = VariableState<V, U>>,
{
    /// This agent's name (for tracing only; routing is by variable).
    pub name: String,
    /// The transition system every owned variable runs.
    variant: P,
    /// The owned variables, by name.
    states: MetroHashMap<String, VariableState<V, U>>,
}

impl<V, U, P> Agent<V, U, P>
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
    P: ProtocolVariant<V, U, State = VariableState<V, U>>,
{
    /// Creates an agent running the given transition system, owning no
    /// variable yet.
    pub fn new<S: Into<String>>(name: S, variant: P) -> Self {
        Agent {
            name: name.into(),
            variant,
            states: MetroHashMap::default(),
        }
    }

    /// Declares one variable owned by this agent. Must be called for every
    /// owned variable before the first envelope is delivered.
    pub fn register_variable<S: Into<String>>(&mut self, variable: S, domain: Vec<V>) {
        let variable = variable.into();
        let state = VariableState::new(variable.clone(), domain);
        self.states.insert(variable, state);
    }

    /// Read access to one owned variable.
    pub fn state(&self, variable: &str) -> Option<&VariableState<V, U>> {
        self.states.get(variable)
    }

    /// The names of the owned variables.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(|k| k.as_str())
    }

    /// Delivers one envelope: routes it to the targeted variable, fires the
    /// protocol transition, and starts the variable once its setup is
    /// complete. Envelopes for unknown variables are dropped.
    pub fn deliver(&mut self, env: Envelope<V, U>, ctx: &AgentContext<'_, V, U>) -> Delivery {
        match env {
            Envelope::Shutdown => return Delivery::Shutdown,
            Envelope::Topology(t) => {
                if let Some(state) = self.states.get_mut(&t.variable) {
                    state.set_separator(t.parent, t.pseudo_parents);
                    state.set_lower_neighbours(t.children, t.pseudo_children);
                    for space in t.spaces {
                        state.store_space(space);
                    }
                    self.maybe_start(&t.variable, ctx);
                } else {
                    trace!(agent = %self.name, variable = %t.variable, "dropped topology for unknown variable");
                }
            }
            Envelope::OwnBounds(b) => {
                if let Some(state) = self.states.get_mut(&b.variable) {
                    state.set_own_bounds(b.bounds);
                    self.maybe_start(&b.variable, ctx);
                } else {
                    trace!(agent = %self.name, variable = %b.variable, "dropped bounds for unknown variable");
                }
            }
            Envelope::ChildBound(b) => {
                if let Some(state) = self.states.get_mut(&b.variable) {
                    state.set_child_bound(b.child, b.bound);
                    self.maybe_start(&b.variable, ctx);
                } else {
                    trace!(agent = %self.name, variable = %b.variable, "dropped bound for unknown variable");
                }
            }
            Envelope::Protocol(msg) => {
                if !self.variant.message_kinds().contains(&msg.kind()) {
                    trace!(agent = %self.name, kind = ?msg.kind(), "dropped unsupported message kind");
                    return Delivery::Continue;
                }
                match self.states.get_mut(msg.receiver()) {
                    Some(state) => self.variant.notify(state, msg, ctx),
                    None => {
                        trace!(agent = %self.name, to = %msg.receiver(), "dropped message for unknown variable")
                    }
                }
            }
        }
        Delivery::Continue
    }

    /// Starts a variable once (and only once) its topology view and all its
    /// preprocessing bounds have arrived. A variable with no neighbour at all
    /// never exchanges a message: it settles on its cheapest value on the
    /// spot.
    fn maybe_start(&mut self, variable: &str, ctx: &AgentContext<'_, V, U>) {
        let state = match self.states.get_mut(variable) {
            Some(s) => s,
            None => return,
        };
        if state.initialized || !state.is_ready() {
            return;
        }
        let singleton = state.is_singleton();
        self.variant.init(state, ctx);
        if singleton {
            let state = self.states.get_mut(variable).unwrap();
            state.pick_singleton_value();
            state.execution_terminated = true;
            debug!(agent = %self.name, variable = %variable, value = ?state.current_value(), "singleton settled");
            ctx.output.emit(FinalAssignment {
                variable: variable.to_string(),
                value: state.current_value().clone(),
            });
            ctx.termination.variable_finished();
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
