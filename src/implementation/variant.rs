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

//! This module provides `ClassicAdopt`, the reference transition system of
//! the protocol (Modi et al., "ADOPT: asynchronous distributed constraint
//! optimization with quality guarantees", AIJ 2005). It is written against
//! the `ProtocolVariant` seam so that refined variants can plug in their own
//! transitions while reusing the agents and engines unchanged.

use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::abstraction::cost::Cost;
use crate::abstraction::transport::AgentContext;
use crate::abstraction::variant::ProtocolVariant;
use crate::common::{compatible, Context, Envelope, FinalAssignment, MessageKind, ProtocolMessage};
use crate::implementation::invariants::{
    maintain_allocation_invariant, maintain_child_threshold_invariant,
    maintain_threshold_invariant,
};
use crate::implementation::state::VariableState;

/// The reference transition system. Stateless: everything a variable knows
/// lives in its `VariableState`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicAdopt;

static KINDS: [MessageKind; 3] = [MessageKind::Value, MessageKind::Cost, MessageKind::Terminate];

impl<V, U> ProtocolVariant<V, U> for ClassicAdopt
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    type State = VariableState<V, U>;

    fn init(&self, state: &mut Self::State, ctx: &AgentContext<'_, V, U>) {
        state.threshold = U::ZERO;
        state.initialize_bounds();
        if state.nb_separators() == 0 {
            // nobody above us: our upper bounds are trustworthy from the start
            state.force_full_info();
        }
        self.send_values(state, ctx);
        // values buffered before setup completed count toward full
        // information
        let heard: Vec<String> = state.current_context.keys().cloned().collect();
        for sender in heard {
            state.note_value_sender(&sender);
        }
        state.set_delta();
        maintain_threshold_invariant(state);
        if !state.is_singleton() {
            self.backtrack(state, ctx);
        }
        state.initialized = true;
        debug!(variable = %state.name, "initialized");
    }

    fn notify(
        &self,
        state: &mut Self::State,
        msg: ProtocolMessage<V, U>,
        ctx: &AgentContext<'_, V, U>,
    ) {
        if !state.initialized {
            match msg {
                // a value heard before setup completes is remembered, the
                // rest of the processing happens once we are up
                ProtocolMessage::Value { sender, value, .. } => {
                    state.current_context.insert(sender, value);
                }
                // bounds and termination cannot be interpreted yet: put the
                // message back in our own mailbox and look at it again later
                _ => ctx.sender.send_to_self(Envelope::Protocol(msg)),
            }
            return;
        }
        if state.execution_terminated {
            return;
        }
        if !state.register_received(&msg) {
            trace!(variable = %state.name, kind = ?msg.kind(), "dropped duplicate");
            return;
        }
        match msg {
            ProtocolMessage::Value {
                sender,
                value,
                threshold,
                ..
            } => self.handle_value(state, sender, value, threshold, ctx),
            ProtocolMessage::Cost {
                sender,
                context,
                lb,
                ub,
                ..
            } => self.handle_cost(state, sender, context, lb, ub, ctx),
            ProtocolMessage::Terminate { context, .. } => {
                self.handle_terminate(state, context, ctx)
            }
        }
    }

    fn message_kinds(&self) -> &'static [MessageKind] {
        &KINDS
    }
}

impl ClassicAdopt {
    /// Processes a VALUE from a separator member: remember the value,
    /// invalidate the child reports that conflict with it, take over the
    /// piggybacked threshold when it comes from the parent, then backtrack.
    fn handle_value<V, U>(
        &self,
        state: &mut VariableState<V, U>,
        sender: String,
        value: V,
        threshold: Option<U>,
        ctx: &AgentContext<'_, V, U>,
    ) where
        V: Clone + Eq + Hash + Debug,
        U: Cost,
    {
        if state.terminate {
            // the context is frozen to what the parent ordered
            return;
        }
        if !state.in_separator(&sender) {
            trace!(variable = %state.name, from = %sender, "ignored VALUE from non-separator");
            return;
        }
        state.current_context.insert(sender.clone(), value);
        state.note_value_sender(&sender);
        self.drop_incompatible_reports(state);
        state.set_delta();

        if let Some(t) = threshold {
            if state.parent() == Some(sender.as_str()) {
                state.threshold = t;
            }
        }
        maintain_threshold_invariant(state);
        self.backtrack(state, ctx);
    }

    /// Processes a COST from a lower neighbour. The report carries the
    /// context the child computed its bounds under: our own value in there
    /// selects the table row, and assignments of variables we do not share a
    /// constraint with are learned transitively.
    fn handle_cost<V, U>(
        &self,
        state: &mut VariableState<V, U>,
        sender: String,
        mut context: Context<V>,
        lb: U,
        ub: U,
        ctx: &AgentContext<'_, V, U>,
    ) where
        V: Clone + Eq + Hash + Debug,
        U: Cost,
    {
        let row = context
            .remove(&state.name)
            .and_then(|d| state.position_of(&d));

        if !state.terminate {
            for (var, val) in context.iter() {
                if !state.is_neighbour(var) {
                    state.current_context.insert(var.clone(), val.clone());
                }
            }
            self.drop_incompatible_reports(state);
        }

        // only true children hold a row in the bound tables; a report from a
        // pseudo-child contributes its context and nothing else
        if let Some(c) = state.child_position(&sender) {
            if compatible(&context, &state.current_context) {
                // a report that does not mention our value holds under all
                // of them
                let rows: Vec<usize> = match row {
                    Some(d) => vec![d],
                    None => (0..state.domain.len()).collect(),
                };
                for d in rows {
                    // bounds only ever improve; a report weaker than what we
                    // already hold is not allowed to loosen the tables
                    let new_lb = state.child_lb_at(d, c).max(lb);
                    let new_ub = state.child_ub_at(d, c).min(ub);
                    state.update_bounds(d, c, new_lb, new_ub);
                    state.set_child_context_at(d, c, context.clone());
                }
                maintain_child_threshold_invariant(state);
            }
        }
        maintain_threshold_invariant(state);
        self.backtrack(state, ctx);
    }

    /// Processes a TERMINATE from the parent: adopt its final context as
    /// ours, stop listening to VALUE updates, and run to quiescence. The
    /// parent's context covers our whole separator, so full information
    /// holds from here on.
    fn handle_terminate<V, U>(
        &self,
        state: &mut VariableState<V, U>,
        context: Context<V>,
        ctx: &AgentContext<'_, V, U>,
    ) where
        V: Clone + Eq + Hash + Debug,
        U: Cost,
    {
        state.terminate = true;
        state.current_context = context;
        state.force_full_info();
        self.drop_incompatible_reports(state);
        state.set_delta();
        maintain_threshold_invariant(state);
        self.backtrack(state, ctx);
    }

    /// Invalidates every child report whose context conflicts with the
    /// current one: its bounds, threshold share and context all fall back to
    /// their initial values.
    fn drop_incompatible_reports<V, U>(&self, state: &mut VariableState<V, U>)
    where
        V: Clone + Eq + Hash + Debug,
        U: Cost,
    {
        for d in 0..state.domain.len() {
            for c in 0..state.nb_children() {
                if !compatible(state.child_context_at(d, c), &state.current_context) {
                    state.reset_bounds(d, c);
                    state.reset_child_threshold(d, c);
                    state.reset_child_context(d, c);
                }
            }
        }
    }

    /// Sends the current value to every lower neighbour. True children also
    /// receive their threshold share; pseudo-children only see the value.
    fn send_values<V, U>(&self, state: &mut VariableState<V, U>, ctx: &AgentContext<'_, V, U>)
    where
        V: Clone + Eq + Hash + Debug,
        U: Cost,
    {
        let cur = state.value_index(&state.current_value().clone());
        let neighbours: Vec<String> = state.lower_neighbours().to_vec();
        for (i, n) in neighbours.into_iter().enumerate() {
            let threshold = if i < state.nb_children() {
                Some(state.child_threshold_at(cur, i))
            } else {
                None
            };
            let msg = ProtocolMessage::Value {
                sender: state.name.clone(),
                receiver: n,
                value: state.current_value().clone(),
                threshold,
            };
            if state.register_value_sent(i, &msg) {
                trace!(variable = %state.name, to = %msg.receiver(), "VALUE changed");
            }
            ctx.sender.send(msg);
        }
    }

    /// The heart of the protocol: re-elects the tentative value, rebalances
    /// the threshold shares, advertises the value downwards and either
    /// reports the bounds upwards or, when the threshold window has closed
    /// and the parent already terminated (or we are the root), commits the
    /// final value and orders the children to terminate.
    fn backtrack<V, U>(&self, state: &mut VariableState<V, U>, ctx: &AgentContext<'_, V, U>)
    where
        V: Clone + Eq + Hash + Debug,
        U: Cost,
    {
        if state.execution_terminated {
            return;
        }

        if state.threshold == state.upper_bound() {
            if state.current_value() != state.ub_value() {
                let v = state.ub_value().clone();
                trace!(variable = %state.name, value = ?v, "switch to ub minimizer");
                state.set_current_value(v);
            }
        } else if state.lb_of(&state.current_value().clone()) > state.threshold {
            if state.current_value() != state.lb_value() {
                let v = state.lb_value().clone();
                trace!(variable = %state.name, value = ?v, "switch to lb minimizer");
                state.set_current_value(v);
            }
        }

        maintain_allocation_invariant(state);
        self.send_values(state, ctx);

        if state.threshold == state.upper_bound() && (state.terminate || state.is_root()) {
            state.execution_terminated = true;
            let mut final_context = state.current_context().clone();
            final_context.insert(state.name.clone(), state.current_value().clone());
            for c in 0..state.nb_children() {
                ctx.sender.send(ProtocolMessage::Terminate {
                    sender: state.name.clone(),
                    receiver: state.lower_neighbours()[c].clone(),
                    context: final_context.clone(),
                });
            }
            debug!(variable = %state.name, value = ?state.current_value(), cost = ?state.upper_bound(), "terminated");
            ctx.output.emit(FinalAssignment {
                variable: state.name.clone(),
                value: state.current_value().clone(),
            });
            ctx.termination.variable_finished();
            return;
        }

        if let Some(parent) = state.parent() {
            ctx.sender.send(ProtocolMessage::Cost {
                sender: state.name.clone(),
                receiver: parent.to_string(),
                context: state.current_context().clone(),
                lb: state.lower_bound(),
                ub: state.upper_bound(),
            });
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_variant {
    use std::cell::RefCell;
    use std::sync::Arc;

    use crate::abstraction::space::CostSpace;
    use crate::abstraction::transport::{
        AgentContext, MessageSender, OutputSink, TerminationHandle,
    };
    use crate::abstraction::variant::ProtocolVariant;
    use crate::implementation::space::TableSpace;

    use super::*;

    /// Records everything an agent sends, for inspection.
    #[derive(Default)]
    struct RecordedSends {
        sent: RefCell<Vec<ProtocolMessage<i32, i32>>>,
        requeued: RefCell<Vec<Envelope<i32, i32>>>,
    }
    impl MessageSender<i32, i32> for RecordedSends {
        fn send(&self, msg: ProtocolMessage<i32, i32>) {
            self.sent.borrow_mut().push(msg);
        }
        fn send_to_self(&self, env: Envelope<i32, i32>) {
            self.requeued.borrow_mut().push(env);
        }
    }

    #[derive(Default)]
    struct RecordedOutput {
        emitted: RefCell<Vec<FinalAssignment<i32>>>,
    }
    impl OutputSink<i32> for RecordedOutput {
        fn emit(&self, assignment: FinalAssignment<i32>) {
            self.emitted.borrow_mut().push(assignment);
        }
    }

    #[derive(Default)]
    struct CountingHandle {
        finished: RefCell<usize>,
    }
    impl TerminationHandle for CountingHandle {
        fn variable_finished(&self) {
            *self.finished.borrow_mut() += 1;
        }
        fn is_complete(&self) -> bool {
            false
        }
    }

    // RefCell is fine here, the mocks never cross a thread
    unsafe impl Sync for CountingHandle {}
    unsafe impl Send for CountingHandle {}

    fn space_a() -> Arc<dyn CostSpace<i32, i32>> {
        Arc::new(TableSpace::binary(
            ("x", vec![0, 1]),
            ("y", vec![0, 1]),
            vec![0, 2, 3, 1],
        ))
    }

    fn root_x() -> VariableState<i32, i32> {
        let mut x = VariableState::new("x", vec![0, 1]);
        x.set_separator(None, vec![]);
        x.set_lower_neighbours(vec!["y".to_string()], vec![]);
        x.set_own_bounds(vec![0, 0]);
        x.set_child_bound("y".to_string(), 0);
        x
    }

    fn leaf_y() -> VariableState<i32, i32> {
        let mut y = VariableState::new("y", vec![0, 1]);
        y.set_separator(Some("x".to_string()), vec![]);
        y.set_lower_neighbours(vec![], vec![]);
        y.store_space(space_a());
        y.set_own_bounds(vec![0, 0]);
        y
    }

    #[test]
    fn init_advertises_value_and_reports_cost() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut x = root_x();
        ClassicAdopt.init(&mut x, &ctx);
        assert!(x.initialized);
        // the child heard about our value at least once
        let sent = sender.sent.borrow();
        assert!(sent
            .iter()
            .any(|m| m.kind() == MessageKind::Value && m.receiver() == "y"));
        // the root has no parent: no COST
        assert!(sent.iter().all(|m| m.kind() != MessageKind::Cost));
    }

    #[test]
    fn early_value_is_buffered_into_the_context() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut y = leaf_y();
        let msg = ProtocolMessage::Value {
            sender: "x".to_string(),
            receiver: "y".to_string(),
            value: 0,
            threshold: Some(0),
        };
        ClassicAdopt.notify(&mut y, msg, &ctx);
        assert_eq!(Some(&0), y.current_context().get("x"));
        assert!(sender.sent.borrow().is_empty());
        assert!(sender.requeued.borrow().is_empty());

        // once setup completes, the buffered value already counts as heard
        ClassicAdopt.init(&mut y, &ctx);
        assert!(y.has_full_info());
        assert_eq!(0, y.upper_bound());
    }

    #[test]
    fn early_terminate_is_requeued() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut y = leaf_y();
        let msg = ProtocolMessage::Terminate {
            sender: "x".to_string(),
            receiver: "y".to_string(),
            context: Context::default(),
        };
        ClassicAdopt.notify(&mut y, msg, &ctx);
        assert_eq!(1, sender.requeued.borrow().len());
        assert!(!y.is_terminated());
    }

    #[test]
    fn duplicate_value_generates_no_traffic() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut y = leaf_y();
        ClassicAdopt.init(&mut y, &ctx);
        let msg = ProtocolMessage::Value {
            sender: "x".to_string(),
            receiver: "y".to_string(),
            value: 0,
            threshold: None,
        };
        ClassicAdopt.notify(&mut y, msg.clone(), &ctx);
        let after_first = sender.sent.borrow().len();
        ClassicAdopt.notify(&mut y, msg, &ctx);
        assert_eq!(after_first, sender.sent.borrow().len());
    }

    #[test]
    fn duplicate_cost_generates_no_traffic() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut x = root_x();
        ClassicAdopt.init(&mut x, &ctx);
        let mut context = Context::default();
        context.insert("x".to_string(), 0);
        let report = ProtocolMessage::Cost {
            sender: "y".to_string(),
            receiver: "x".to_string(),
            context,
            lb: 1,
            ub: 6,
        };
        ClassicAdopt.notify(&mut x, report.clone(), &ctx);
        let after_first = sender.sent.borrow().len();
        let (lb, ub) = (x.lb_of(&0), x.ub_of(&0));
        ClassicAdopt.notify(&mut x, report, &ctx);
        assert_eq!(after_first, sender.sent.borrow().len());
        assert_eq!(lb, x.lb_of(&0));
        assert_eq!(ub, x.ub_of(&0));
    }

    #[test]
    fn duplicate_terminate_generates_no_traffic() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut y = leaf_y();
        ClassicAdopt.init(&mut y, &ctx);
        let mut context = Context::default();
        context.insert("x".to_string(), 0);
        let order = ProtocolMessage::Terminate {
            sender: "x".to_string(),
            receiver: "y".to_string(),
            context,
        };
        ClassicAdopt.notify(&mut y, order.clone(), &ctx);
        assert!(y.is_terminated());
        let after_first = sender.sent.borrow().len();
        ClassicAdopt.notify(&mut y, order, &ctx);
        assert_eq!(after_first, sender.sent.borrow().len());
        assert_eq!(1, output.emitted.borrow().len());
        assert_eq!(1, *handle.finished.borrow());
    }

    #[test]
    fn leaf_reports_exact_bounds_once_parent_value_is_known() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut y = leaf_y();
        ClassicAdopt.init(&mut y, &ctx);
        ClassicAdopt.notify(
            &mut y,
            ProtocolMessage::Value {
                sender: "x".to_string(),
                receiver: "y".to_string(),
                value: 0,
                threshold: None,
            },
            &ctx,
        );
        // cost(x=0, y=0) = 0 is both feasible and optimal for y
        assert!(y.has_full_info());
        assert_eq!(0, y.lower_bound());
        assert_eq!(0, y.upper_bound());
        let sent = sender.sent.borrow();
        let last_cost = sent
            .iter()
            .rev()
            .find(|m| m.kind() == MessageKind::Cost)
            .expect("leaf must report to its parent");
        match last_cost {
            ProtocolMessage::Cost { lb, ub, context, .. } => {
                assert_eq!(&0, lb);
                assert_eq!(&0, ub);
                assert_eq!(Some(&0), context.get("x"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn terminate_commits_the_leaf() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut y = leaf_y();
        ClassicAdopt.init(&mut y, &ctx);
        let mut context = Context::default();
        context.insert("x".to_string(), 0);
        ClassicAdopt.notify(
            &mut y,
            ProtocolMessage::Terminate {
                sender: "x".to_string(),
                receiver: "y".to_string(),
                context,
            },
            &ctx,
        );
        assert!(y.is_terminated());
        assert_eq!(&0, y.current_value());
        let emitted = output.emitted.borrow();
        assert_eq!(1, emitted.len());
        assert_eq!(0, emitted[0].value);
        assert_eq!(1, *handle.finished.borrow());
    }

    #[test]
    fn bounds_only_ever_tighten() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut x = root_x();
        ClassicAdopt.init(&mut x, &ctx);
        let report = |lb: i32, ub: i32| {
            let mut context = Context::default();
            context.insert("x".to_string(), 0);
            ProtocolMessage::Cost {
                sender: "y".to_string(),
                receiver: "x".to_string(),
                context,
                lb,
                ub,
            }
        };

        ClassicAdopt.notify(&mut x, report(1, 6), &ctx);
        assert_eq!(1, x.lb_of(&0));
        assert_eq!(6, x.ub_of(&0));

        ClassicAdopt.notify(&mut x, report(2, 4), &ctx);
        assert_eq!(2, x.lb_of(&0));
        assert_eq!(4, x.ub_of(&0));

        // a weaker report must not loosen what we already know
        ClassicAdopt.notify(&mut x, report(0, 9), &ctx);
        assert_eq!(2, x.lb_of(&0));
        assert_eq!(4, x.ub_of(&0));
    }

    #[test]
    fn root_terminates_when_child_reports_tight_bounds() {
        let sender = RecordedSends::default();
        let output = RecordedOutput::default();
        let handle = CountingHandle::default();
        let ctx = AgentContext {
            sender: &sender,
            output: &output,
            termination: &handle,
        };

        let mut x = root_x();
        ClassicAdopt.init(&mut x, &ctx);
        let mut context = Context::default();
        context.insert("x".to_string(), 0);
        ClassicAdopt.notify(
            &mut x,
            ProtocolMessage::Cost {
                sender: "y".to_string(),
                receiver: "x".to_string(),
                context,
                lb: 0,
                ub: 0,
            },
            &ctx,
        );
        assert!(x.is_terminated());
        assert_eq!(&0, x.current_value());
        let sent = sender.sent.borrow();
        assert!(sent
            .iter()
            .any(|m| m.kind() == MessageKind::Terminate && m.receiver() == "y"));
        assert_eq!(1, *handle.finished.borrow());
    }
}
