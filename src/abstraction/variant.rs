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

//! This module defines the capability through which the per-variable protocol
//! logic is plugged into the agent dispatcher. Different variants of the
//! algorithm handle initialization and message processing differently; the
//! variant to use is selected by configuration when the agents are built, and
//! the dispatch is resolved statically (a plain generic parameter, nothing
//! reflective).

use crate::abstraction::transport::AgentContext;
use crate::common::{MessageKind, ProtocolMessage};

/// One variant of the protocol: the init-time behavior and the reaction to
/// each inbound protocol message for a single variable. Implementations are
/// stateless; everything mutable lives in the per-variable `State`.
pub trait ProtocolVariant<V, U> {
    /// The per-variable protocol state this variant manipulates.
    type State;

    /// Called exactly once per variable, when both its topology view and its
    /// preprocessing bounds have arrived (in either order).
    fn init(&self, state: &mut Self::State, ctx: &AgentContext<'_, V, U>);

    /// Reacts to one inbound protocol message addressed to this variable.
    /// Duplicate and stale messages are dropped silently in here.
    fn notify(&self, state: &mut Self::State, msg: ProtocolMessage<V, U>, ctx: &AgentContext<'_, V, U>);

    /// The message kinds this variant knows how to process; the dispatcher
    /// drops everything else.
    fn message_kinds(&self) -> &'static [MessageKind];
}
