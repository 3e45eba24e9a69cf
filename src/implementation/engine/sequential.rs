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

//! This module provides the deterministic single-threaded engine. Messages
//! travel through a virtual clock: each one is stamped with a delivery tick
//! (emission tick plus a per-edge latency) and a priority queue delivers them
//! in (tick, emission order). Two runs of the same problem with the same
//! latencies replay the exact same message trace, which makes this engine the
//! one to debug and test against.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;

use binary_heap_plus::BinaryHeap;
use compare::Compare;
use metrohash::MetroHashMap;
use tracing::debug;

use crate::abstraction::cost::Cost;
use crate::abstraction::space::Preprocessor;
use crate::abstraction::transport::{AgentContext, MessageSender, TerminationHandle};
use crate::common::{Envelope, ProtocolMessage};
use crate::implementation::agent::Agent;
use crate::implementation::engine::{DcopProblem, SetupError, Solution};
use crate::implementation::heuristics::ZeroBounds;
use crate::implementation::termination::{AssignmentCollector, TerminationTracker};
use crate::implementation::variant::ClassicAdopt;

/// Runs the whole problem and returns the assignment it converged to. The
/// shorthand for `SequentialEngine::new(problem).run()`.
pub fn minimize<V, U>(problem: DcopProblem<V, U>) -> Result<Solution<V, U>, SetupError>
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    SequentialEngine::new(problem).run()
}

// ----------------------------------------------------------------------------
// --- DELIVERY QUEUE ---------------------------------------------------------
// ----------------------------------------------------------------------------

/// An envelope waiting in the virtual-time queue.
struct Pending<V, U> {
    /// The tick this envelope gets delivered at.
    at: u64,
    /// The emission rank, to break ties deterministically.
    seq: u64,
    env: Envelope<V, U>,
}

/// Orders the queue by (delivery tick, emission rank), smallest first. The
/// comparison is reversed because the underlying heap pops its maximum.
struct MinDelivery;
impl<V, U> Compare<Pending<V, U>> for MinDelivery {
    fn compare(&self, a: &Pending<V, U>, b: &Pending<V, U>) -> Ordering {
        b.at.cmp(&a.at).then_with(|| b.seq.cmp(&a.seq))
    }
}

/// What an agent produced while processing one envelope. The engine drains
/// this after every delivery and stamps each entry with its delivery tick.
enum Outgoing<V, U> {
    /// A protocol message for some (possibly other) variable.
    Peer(ProtocolMessage<V, U>),
    /// An envelope the variable put back in its own mailbox.
    SelfDirected(Envelope<V, U>),
}

struct Outbox<V, U> {
    queued: RefCell<Vec<Outgoing<V, U>>>,
}
impl<V, U> Default for Outbox<V, U> {
    fn default() -> Self {
        Outbox {
            queued: RefCell::new(vec![]),
        }
    }
}
impl<V, U> Outbox<V, U> {
    fn drain(&self) -> Vec<Outgoing<V, U>> {
        self.queued.borrow_mut().drain(..).collect()
    }
}
impl<V, U> MessageSender<V, U> for Outbox<V, U> {
    fn send(&self, msg: ProtocolMessage<V, U>) {
        self.queued.borrow_mut().push(Outgoing::Peer(msg));
    }
    fn send_to_self(&self, env: Envelope<V, U>) {
        self.queued.borrow_mut().push(Outgoing::SelfDirected(env));
    }
}

// ----------------------------------------------------------------------------
// --- ENGINE -----------------------------------------------------------------
// ----------------------------------------------------------------------------

/// The deterministic single-threaded engine.
pub struct SequentialEngine<V, U> {
    problem: DcopProblem<V, U>,
    /// The preprocessing collaborator supplying the admissible bound tables.
    preprocessor: Box<dyn Preprocessor<V, U>>,
    /// The latency of each directed edge, in ticks.
    latency: MetroHashMap<(String, String), u64>,
    /// The latency of every edge not listed in `latency`.
    default_latency: u64,
    /// The number of protocol messages exchanged during the last run.
    nb_messages: usize,
}

impl<V, U> SequentialEngine<V, U>
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    pub fn new(problem: DcopProblem<V, U>) -> Self {
        SequentialEngine {
            problem,
            preprocessor: Box::new(ZeroBounds),
            latency: MetroHashMap::default(),
            default_latency: 1,
            nb_messages: 0,
        }
    }

    /// Sets the preprocessing collaborator. Any admissible heuristic may be
    /// plugged in; all-zero bounds are the default.
    pub fn with_preprocessor<P: Preprocessor<V, U> + 'static>(mut self, preprocessor: P) -> Self {
        self.preprocessor = Box::new(preprocessor);
        self
    }

    /// Sets the latency of one directed edge. Exploring different latencies
    /// exercises different interleavings of the same problem.
    pub fn with_latency<S: Into<String>>(mut self, from: S, to: S, ticks: u64) -> Self {
        self.latency.insert((from.into(), to.into()), ticks);
        self
    }

    /// Sets the latency of every edge not explicitly listed.
    pub fn with_default_latency(mut self, ticks: u64) -> Self {
        self.default_latency = ticks;
        self
    }

    /// The number of protocol messages exchanged during the last `run`.
    pub fn nb_messages(&self) -> usize {
        self.nb_messages
    }

    fn latency_of(&self, from: &str, to: &str) -> u64 {
        self.latency
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .unwrap_or(self.default_latency)
    }

    /// Validates the problem, then pumps the virtual-time queue until every
    /// variable has committed its final value (or the queue runs dry).
    pub fn run(&mut self) -> Result<Solution<V, U>, SetupError> {
        self.problem.validate()?;
        self.nb_messages = 0;

        let nb_variables = self.problem.variables().len();
        let tracker = TerminationTracker::new(nb_variables);
        let collector = AssignmentCollector::new();
        let outbox = Outbox::default();
        let mut agent = Agent::new("simulator", ClassicAdopt);
        for spec in self.problem.variables() {
            agent.register_variable(spec.name.clone(), spec.domain.clone());
        }

        let mut heap = BinaryHeap::from_vec_cmp(vec![], MinDelivery);
        let mut seq = 0_u64;
        for env in self.problem.setup_envelopes(self.preprocessor.as_ref()) {
            heap.push(Pending { at: 0, seq, env });
            seq += 1;
        }

        while let Some(Pending { at, env, .. }) = heap.pop() {
            let ctx = AgentContext {
                sender: &outbox,
                output: &collector,
                termination: &tracker,
            };
            agent.deliver(env, &ctx);

            for out in outbox.drain() {
                match out {
                    Outgoing::Peer(msg) => {
                        self.nb_messages += 1;
                        let lat = self.latency_of(msg.sender(), msg.receiver());
                        heap.push(Pending {
                            at: at + lat,
                            seq,
                            env: Envelope::Protocol(msg),
                        });
                    }
                    Outgoing::SelfDirected(env) => {
                        heap.push(Pending {
                            at: at + self.default_latency,
                            seq,
                            env,
                        });
                    }
                }
                seq += 1;
            }
            if tracker.is_complete() {
                break;
            }
        }

        let assignment = collector.snapshot();
        let cost = self.problem.total_cost(&assignment);
        debug!(messages = self.nb_messages, cost = ?cost, "run complete");
        Ok(Solution { assignment, cost })
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_sequential {
    use std::sync::Arc;

    use crate::implementation::engine::VariableSpec;
    use crate::implementation::space::TableSpace;

    use super::*;

    fn chain() -> DcopProblem<i32, i32> {
        DcopProblem::minimization()
            .with_variable(VariableSpec::new("x", vec![0, 1]).with_children(vec!["y"]))
            .with_variable(
                VariableSpec::new("y", vec![0, 1])
                    .with_parent("x")
                    .with_space(Arc::new(TableSpace::binary(
                        ("x", vec![0, 1]),
                        ("y", vec![0, 1]),
                        vec![4, 2, 3, 1],
                    ))),
            )
    }

    #[test]
    fn chain_converges_to_the_optimum() {
        let solution = minimize(chain()).unwrap();
        assert_eq!(1, solution.cost);
        assert_eq!(Some(&1), solution.assignment.get("x"));
        assert_eq!(Some(&1), solution.assignment.get("y"));
    }

    #[test]
    fn replays_are_identical() {
        let mut a = SequentialEngine::new(chain());
        let mut b = SequentialEngine::new(chain());
        let sol_a = a.run().unwrap();
        let sol_b = b.run().unwrap();
        assert_eq!(sol_a.cost, sol_b.cost);
        assert_eq!(a.nb_messages(), b.nb_messages());
    }

    #[test]
    fn latencies_change_the_schedule_not_the_outcome() {
        let mut slow = SequentialEngine::new(chain()).with_latency("x", "y", 10);
        let solution = slow.run().unwrap();
        assert_eq!(1, solution.cost);
    }

    #[test]
    fn invalid_problems_never_run() {
        let problem: DcopProblem<i32, i32> = DcopProblem::maximization();
        assert!(SequentialEngine::new(problem).run().is_err());
    }
}
