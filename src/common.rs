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

//! This module defines the most basic data types that are used throughout all
//! the code of our library (both at the abstraction and implementation levels).
//! These are also the types your client code is likely to work with.
//!
//! In particular, this module comprises the definition of the following types:
//! - `Context` (+ the associated `compatible` predicate)
//! - `ProtocolMessage` and `MessageKind`
//! - `TopologyNotify`, `OwnBoundsNotify`, `ChildBoundNotify`
//! - `FinalAssignment`
//! - `Envelope`

use std::fmt;
use std::sync::Arc;

use metrohash::MetroHashMap;

use crate::abstraction::space::CostSpace;

// ----------------------------------------------------------------------------
// --- CONTEXT ----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A context is a partial joint assignment: it maps the name of a variable
/// onto the value that variable is currently believed to hold. Every node of
/// the pseudo-tree maintains such a context for its separator (and whatever it
/// learned transitively from the cost reports of its children).
pub type Context<V> = MetroHashMap<String, V>;

/// Two contexts are compatible iff they agree on the value of every variable
/// they share. An empty context is therefore compatible with anything.
pub fn compatible<V: Eq>(a: &Context<V>, b: &Context<V>) -> bool {
    for (var, val) in a.iter() {
        if let Some(other) = b.get(var) {
            if other != val {
                return false;
            }
        }
    }
    true
}

// ----------------------------------------------------------------------------
// --- PROTOCOL MESSAGES ------------------------------------------------------
// ----------------------------------------------------------------------------
/// The kind of a protocol message. A protocol variant advertises the kinds it
/// knows how to process (see `ProtocolVariant::message_kinds`), and the
/// dispatcher drops anything else.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MessageKind {
    /// A tentative value flowing down the pseudo-tree.
    Value,
    /// A bound report flowing up the pseudo-tree.
    Cost,
    /// The one-shot termination order flowing down the pseudo-tree.
    Terminate,
}

/// One of the three messages the protocol core exchanges between variables.
/// All variants carry the names of the sending and receiving variables; the
/// routing to the owning agent is performed by the transport layer.
///
/// The type implements `PartialEq` on purpose: duplicate delivery is detected
/// by *value* equality against the last processed message of the same kind on
/// the same logical edge, never by object identity.
#[derive(Clone, Debug, PartialEq)]
pub enum ProtocolMessage<V, U> {
    /// Notifies a lower-priority neighbour of the sender's tentative value.
    /// The threshold budget is only present when the receiver is a true child
    /// of the sender (pseudo-children get the bare value).
    Value {
        sender: String,
        receiver: String,
        value: V,
        threshold: Option<U>,
    },
    /// Reports to the parent the lower and upper bounds on the cost of the
    /// subtree rooted at the sender, valid under the given context.
    Cost {
        sender: String,
        receiver: String,
        context: Context<V>,
        lb: U,
        ub: U,
    },
    /// Orders a child to terminate with the given (final) context.
    Terminate {
        sender: String,
        receiver: String,
        context: Context<V>,
    },
}

impl<V, U> ProtocolMessage<V, U> {
    /// The kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            ProtocolMessage::Value { .. } => MessageKind::Value,
            ProtocolMessage::Cost { .. } => MessageKind::Cost,
            ProtocolMessage::Terminate { .. } => MessageKind::Terminate,
        }
    }
    /// The name of the variable that sent this message.
    pub fn sender(&self) -> &str {
        match self {
            ProtocolMessage::Value { sender, .. } => sender,
            ProtocolMessage::Cost { sender, .. } => sender,
            ProtocolMessage::Terminate { sender, .. } => sender,
        }
    }
    /// The name of the variable this message is addressed to.
    pub fn receiver(&self) -> &str {
        match self {
            ProtocolMessage::Value { receiver, .. } => receiver,
            ProtocolMessage::Cost { receiver, .. } => receiver,
            ProtocolMessage::Terminate { receiver, .. } => receiver,
        }
    }
}

// ----------------------------------------------------------------------------
// --- ONE-TIME NOTIFICATIONS -------------------------------------------------
// ----------------------------------------------------------------------------
/// The one-time notification delivering the pseudo-tree view of a variable.
/// It is produced by the (external) tree-construction collaborator and tells
/// the variable who its parent, pseudo-parents, children and pseudo-children
/// are, along with the cost spaces that variable is responsible for.
#[derive(Clone)]
pub struct TopologyNotify<V, U> {
    /// The variable this notification is about.
    pub variable: String,
    /// The ordered, duplicate-free domain of that variable.
    pub domain: Vec<V>,
    /// The parent in the pseudo-tree (`None` for the root).
    pub parent: Option<String>,
    /// The pseudo-parents, highest priority first.
    pub pseudo_parents: Vec<String>,
    /// The true children.
    pub children: Vec<String>,
    /// The pseudo-children.
    pub pseudo_children: Vec<String>,
    /// The cost spaces this variable is responsible for.
    pub spaces: Vec<Arc<dyn CostSpace<V, U>>>,
}

impl<V: fmt::Debug, U> fmt::Debug for TopologyNotify<V, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologyNotify")
            .field("variable", &self.variable)
            .field("domain", &self.domain)
            .field("parent", &self.parent)
            .field("pseudo_parents", &self.pseudo_parents)
            .field("children", &self.children)
            .field("pseudo_children", &self.pseudo_children)
            .field("spaces", &self.spaces.len())
            .finish()
    }
}

/// The one-time notification delivering a variable's own admissible lower
/// bounds, one per domain value, as computed by the (external) preprocessing
/// collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnBoundsNotify<U> {
    /// The variable this notification is about.
    pub variable: String,
    /// One admissible lower bound per domain value, in domain order.
    pub bounds: Vec<U>,
}

/// The one-time notification delivering the admissible lower bound on the
/// cost of the subtree rooted in one child of a variable.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildBoundNotify<U> {
    /// The variable this notification is about.
    pub variable: String,
    /// The child the bound applies to.
    pub child: String,
    /// An admissible lower bound on the cost of the subtree rooted in `child`.
    pub bound: U,
}

// ----------------------------------------------------------------------------
// --- OUTPUT -----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The final, definitive assignment of one variable, emitted exactly once
/// when that variable terminates.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalAssignment<V> {
    /// The terminated variable.
    pub variable: String,
    /// The value it settled on.
    pub value: V,
}

// ----------------------------------------------------------------------------
// --- ENVELOPE ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// Everything an agent mailbox can carry: the one-time notifications, the
/// protocol messages, and the shutdown order the engine issues once global
/// termination has been detected.
#[derive(Clone, Debug)]
pub enum Envelope<V, U> {
    /// The pseudo-tree view of one variable.
    Topology(TopologyNotify<V, U>),
    /// The own-bound table of one variable.
    OwnBounds(OwnBoundsNotify<U>),
    /// The bound of one child of one variable.
    ChildBound(ChildBoundNotify<U>),
    /// A regular protocol message.
    Protocol(ProtocolMessage<V, U>),
    /// Stop processing; the simulation is over.
    Shutdown,
}

impl<V, U> Envelope<V, U> {
    /// The variable this envelope must be routed to, when it carries one.
    pub fn receiver(&self) -> Option<&str> {
        match self {
            Envelope::Topology(t) => Some(&t.variable),
            Envelope::OwnBounds(b) => Some(&b.variable),
            Envelope::ChildBound(b) => Some(&b.variable),
            Envelope::Protocol(m) => Some(m.receiver()),
            Envelope::Shutdown => None,
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
