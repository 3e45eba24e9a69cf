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

//! This module provides the thread-per-agent engine: each agent pumps its own
//! unbounded mailbox on its own thread, and messages cross agents through
//! channels. Delivery order between agents is whatever the scheduler makes of
//! it, which makes this engine the one to shake race-sensitive protocol
//! variants with. The outcome is the same as the sequential engine's cost-wise
//! (the assignment itself may differ when several optima exist).

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};
use metrohash::MetroHashMap;
use tracing::{debug, trace};

use crate::abstraction::cost::Cost;
use crate::abstraction::space::Preprocessor;
use crate::abstraction::transport::{AgentContext, MessageSender};
use crate::common::{Envelope, ProtocolMessage};
use crate::implementation::agent::{Agent, Delivery};
use crate::implementation::engine::{DcopProblem, SetupError, Solution};
use crate::implementation::heuristics::ZeroBounds;
use crate::implementation::termination::{AssignmentCollector, TerminationTracker};
use crate::implementation::variant::ClassicAdopt;

/// The postal service of one agent: peer messages are routed to the mailbox
/// of the agent hosting the destination variable, self-directed envelopes go
/// straight back into our own mailbox.
struct AgentPost<V, U> {
    /// For every variable, the mailbox of the agent hosting it.
    router: Arc<MetroHashMap<String, Sender<Envelope<V, U>>>>,
    /// Our own mailbox.
    own: Sender<Envelope<V, U>>,
}

impl<V, U> MessageSender<V, U> for AgentPost<V, U> {
    fn send(&self, msg: ProtocolMessage<V, U>) {
        match self.router.get(msg.receiver()) {
            // a failed send means the destination already shut down
            Some(mailbox) => {
                let _ = mailbox.send(Envelope::Protocol(msg));
            }
            None => trace!(to = %msg.receiver(), "dropped message for unrouted variable"),
        }
    }
    fn send_to_self(&self, env: Envelope<V, U>) {
        let _ = self.own.send(env);
    }
}

/// The thread-per-agent engine.
pub struct ParallelEngine<V, U> {
    problem: DcopProblem<V, U>,
    /// The preprocessing collaborator supplying the admissible bound tables.
    preprocessor: Box<dyn Preprocessor<V, U>>,
}

impl<V, U> ParallelEngine<V, U>
where
    V: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    U: Cost,
{
    pub fn new(problem: DcopProblem<V, U>) -> Self {
        ParallelEngine {
            problem,
            preprocessor: Box::new(ZeroBounds),
        }
    }

    /// Sets the preprocessing collaborator. Any admissible heuristic may be
    /// plugged in; all-zero bounds are the default.
    pub fn with_preprocessor<P: Preprocessor<V, U> + 'static>(mut self, preprocessor: P) -> Self {
        self.preprocessor = Box::new(preprocessor);
        self
    }

    /// Validates the problem, spawns one thread per agent, seeds the
    /// mailboxes, blocks until every variable has committed, then shuts the
    /// agents down.
    pub fn run(&self) -> Result<Solution<V, U>, SetupError> {
        self.problem.validate()?;

        let nb_variables = self.problem.variables().len();
        let tracker = Arc::new(TerminationTracker::new(nb_variables));
        let collector = Arc::new(AssignmentCollector::<V>::new());

        // one mailbox per agent, one routing entry per variable
        let mut mailboxes: MetroHashMap<String, (Sender<Envelope<V, U>>, Receiver<Envelope<V, U>>)> =
            MetroHashMap::default();
        let mut router: MetroHashMap<String, Sender<Envelope<V, U>>> = MetroHashMap::default();
        for spec in self.problem.variables() {
            let (tx, _) = mailboxes
                .entry(spec.agent.clone())
                .or_insert_with(unbounded);
            router.insert(spec.name.clone(), tx.clone());
        }
        let router = Arc::new(router);

        crossbeam::thread::scope(|s| {
            for (agent_name, (tx, rx)) in mailboxes.iter() {
                let mut agent = Agent::new(agent_name.clone(), ClassicAdopt);
                for spec in self.problem.variables() {
                    if &spec.agent == agent_name {
                        agent.register_variable(spec.name.clone(), spec.domain.clone());
                    }
                }
                let post = AgentPost {
                    router: Arc::clone(&router),
                    own: tx.clone(),
                };
                let tracker = Arc::clone(&tracker);
                let collector = Arc::clone(&collector);
                let rx = rx.clone();
                s.spawn(move |_| {
                    let ctx = AgentContext {
                        sender: &post,
                        output: collector.as_ref(),
                        termination: tracker.as_ref(),
                    };
                    while let Ok(env) = rx.recv() {
                        if agent.deliver(env, &ctx) == Delivery::Shutdown {
                            break;
                        }
                    }
                    debug!(agent = %agent.name, "agent thread done");
                });
            }

            for env in self.problem.setup_envelopes(self.preprocessor.as_ref()) {
                if let Some(receiver) = env.receiver() {
                    if let Some(mailbox) = router.get(receiver) {
                        let _ = mailbox.send(env);
                    }
                }
            }

            tracker.wait();
            for (_, (tx, _)) in mailboxes.iter() {
                let _ = tx.send(Envelope::Shutdown);
            }
        })
        .expect("simulation threads panicked");

        let assignment = collector.snapshot();
        let cost = self.problem.total_cost(&assignment);
        Ok(Solution { assignment, cost })
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
