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

//! This module defines the seams between the protocol core and its runtime
//! surroundings: how messages leave a variable (`MessageSender`), where final
//! assignments go (`OutputSink`), how global termination is accounted for
//! (`TerminationHandle`), and the `AgentContext` bundle through which all
//! three are handed to every handler call. Handlers never hold a reference
//! back to the engine that drives them; everything they are allowed to touch
//! travels in the context.

use crate::common::{Envelope, FinalAssignment, ProtocolMessage};

/// The outbound half of the transport: a fire-and-forget, reliable,
/// per-edge-FIFO point-to-point send. The receiver variable named inside the
/// message is resolved to its owning agent by the implementation.
pub trait MessageSender<V, U> {
    /// Delivers `msg` to the agent owning the receiver variable.
    fn send(&self, msg: ProtocolMessage<V, U>);

    /// Re-enqueues an envelope into the mailbox of the calling agent, to be
    /// processed in a later step (used for messages that arrived too early).
    fn send_to_self(&self, env: Envelope<V, U>);
}

/// The sink final assignments are reported to, exactly once per variable.
/// Implementations only need append semantics.
pub trait OutputSink<V> {
    /// Records the definitive value of one variable.
    fn emit(&self, assignment: FinalAssignment<V>);
}

/// The global termination account: a monotonic counter of terminated
/// variables shared by every variable of the problem.
pub trait TerminationHandle: Send + Sync {
    /// Records that one more variable has emitted its final value.
    fn variable_finished(&self);

    /// True iff every variable of the problem has terminated.
    fn is_complete(&self) -> bool;
}

/// Everything a handler may interact with while processing one message: the
/// transport to emit messages through, the sink to report a final assignment
/// to, and the global termination account.
pub struct AgentContext<'a, V, U> {
    /// The outbound transport.
    pub sender: &'a dyn MessageSender<V, U>,
    /// The final-assignment sink.
    pub output: &'a dyn OutputSink<V>,
    /// The global termination account.
    pub termination: &'a dyn TerminationHandle,
}
