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

//! This module (and its submodules) provides the simulation engines: the
//! problem description they consume, the validation performed before any
//! message flies, and the two drivers (a deterministic single-threaded one
//! and a thread-per-agent one).

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use metrohash::MetroHashMap;

use crate::abstraction::cost::Cost;
use crate::abstraction::space::{CostSpace, Preprocessor};
use crate::common::{
    ChildBoundNotify, Context, Envelope, OwnBoundsNotify, TopologyNotify,
};

pub mod parallel;
pub mod sequential;

pub use parallel::ParallelEngine;
pub use sequential::SequentialEngine;

/// An error detected while validating a problem, before the simulation
/// starts.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SetupError {
    /// The protocol bounds costs from below; maximization would need the
    /// dual and is not supported.
    #[error("only minimization problems are supported")]
    Maximization,
    /// A finite negative cost breaks the admissibility of every bound.
    #[error("cost space of variable `{variable}` holds a negative cost")]
    NegativeCost {
        /// The variable responsible for the offending space.
        variable: String,
    },
    /// The pseudo-tree references a variable that was never declared.
    #[error("variable `{variable}` references unknown variable `{unknown}`")]
    UnknownVariable {
        /// The variable whose topology is broken.
        variable: String,
        /// The name that could not be resolved.
        unknown: String,
    },
    /// The same variable was declared twice.
    #[error("variable `{variable}` is declared twice")]
    DuplicateVariable {
        /// The name declared more than once.
        variable: String,
    },
}

/// The direction of optimization.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Objective {
    Minimize,
    Maximize,
}

/// The declaration of one variable: who owns it, its domain, its place in
/// the pseudo-tree, and the cost spaces it is responsible for (by
/// convention, every space is owned by the lowest variable of its scope).
#[derive(Clone)]
pub struct VariableSpec<V, U> {
    /// The variable name. Names identify variables across the whole problem.
    pub name: String,
    /// The agent hosting this variable.
    pub agent: String,
    /// The ordered, duplicate-free domain.
    pub domain: Vec<V>,
    /// The parent in the pseudo-tree (`None` for a root).
    pub parent: Option<String>,
    /// The pseudo-parents, highest priority first.
    pub pseudo_parents: Vec<String>,
    /// The true children.
    pub children: Vec<String>,
    /// The pseudo-children.
    pub pseudo_children: Vec<String>,
    /// The cost spaces this variable evaluates.
    pub spaces: Vec<Arc<dyn CostSpace<V, U>>>,
}

impl<V, U> VariableSpec<V, U> {
    /// Declares a root variable hosted by its own agent. The topology and
    /// the spaces are filled in with the `with_` methods.
    pub fn new<S: Into<String>>(name: S, domain: Vec<V>) -> Self {
        let name = name.into();
        VariableSpec {
            agent: name.clone(),
            name,
            domain,
            parent: None,
            pseudo_parents: vec![],
            children: vec![],
            pseudo_children: vec![],
            spaces: vec![],
        }
    }
    pub fn with_agent<S: Into<String>>(mut self, agent: S) -> Self {
        self.agent = agent.into();
        self
    }
    pub fn with_parent<S: Into<String>>(mut self, parent: S) -> Self {
        self.parent = Some(parent.into());
        self
    }
    pub fn with_pseudo_parents(mut self, pseudo_parents: Vec<&str>) -> Self {
        self.pseudo_parents = pseudo_parents.into_iter().map(String::from).collect();
        self
    }
    pub fn with_children(mut self, children: Vec<&str>) -> Self {
        self.children = children.into_iter().map(String::from).collect();
        self
    }
    pub fn with_pseudo_children(mut self, pseudo_children: Vec<&str>) -> Self {
        self.pseudo_children = pseudo_children.into_iter().map(String::from).collect();
        self
    }
    pub fn with_space(mut self, space: Arc<dyn CostSpace<V, U>>) -> Self {
        self.spaces.push(space);
        self
    }
}

/// A whole problem: an objective and the declarations of every variable,
/// pseudo-tree included.
#[derive(Clone)]
pub struct DcopProblem<V, U> {
    objective: Objective,
    variables: Vec<VariableSpec<V, U>>,
}

impl<V, U> DcopProblem<V, U>
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    /// An empty minimization problem.
    pub fn minimization() -> Self {
        DcopProblem {
            objective: Objective::Minimize,
            variables: vec![],
        }
    }

    /// An empty maximization problem. Declared for completeness; validation
    /// rejects it.
    pub fn maximization() -> Self {
        DcopProblem {
            objective: Objective::Maximize,
            variables: vec![],
        }
    }

    /// Adds one variable declaration.
    pub fn with_variable(mut self, spec: VariableSpec<V, U>) -> Self {
        self.variables.push(spec);
        self
    }

    /// The variable declarations.
    pub fn variables(&self) -> &[VariableSpec<V, U>] {
        &self.variables
    }

    /// Maps every variable to the agent hosting it.
    pub fn owners(&self) -> MetroHashMap<String, String> {
        let mut owners = MetroHashMap::default();
        for spec in self.variables.iter() {
            owners.insert(spec.name.clone(), spec.agent.clone());
        }
        owners
    }

    /// Checks the problem before any message flies: the objective must be
    /// minimization, declarations must be unique, every referenced variable
    /// must exist, and no finite cost may be negative.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.objective == Objective::Maximize {
            return Err(SetupError::Maximization);
        }
        let mut seen = MetroHashMap::default();
        for spec in self.variables.iter() {
            if seen.insert(spec.name.clone(), ()).is_some() {
                return Err(SetupError::DuplicateVariable {
                    variable: spec.name.clone(),
                });
            }
        }
        for spec in self.variables.iter() {
            let refs = spec
                .parent
                .iter()
                .chain(spec.pseudo_parents.iter())
                .chain(spec.children.iter())
                .chain(spec.pseudo_children.iter());
            for name in refs {
                if !seen.contains_key(name) {
                    return Err(SetupError::UnknownVariable {
                        variable: spec.name.clone(),
                        unknown: name.clone(),
                    });
                }
            }
            for space in spec.spaces.iter() {
                if space.costs().any(|c| c < U::ZERO) {
                    return Err(SetupError::NegativeCost {
                        variable: spec.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The global cost of a complete assignment: the sum of every space over
    /// every variable.
    pub fn total_cost(&self, assignment: &Context<V>) -> U {
        let mut total = U::ZERO;
        for spec in self.variables.iter() {
            for space in spec.spaces.iter() {
                total = total.add(space.cost(assignment));
            }
        }
        total
    }

    /// The setup envelopes both engines seed the mailboxes with: one
    /// topology view per variable plus the preprocessing bounds (the
    /// variable's own table and one bound per child).
    pub fn setup_envelopes(
        &self,
        preprocessor: &dyn Preprocessor<V, U>,
    ) -> Vec<Envelope<V, U>> {
        let mut envelopes = Vec::with_capacity(3 * self.variables.len());
        for spec in self.variables.iter() {
            envelopes.push(Envelope::Topology(TopologyNotify {
                variable: spec.name.clone(),
                domain: spec.domain.clone(),
                parent: spec.parent.clone(),
                pseudo_parents: spec.pseudo_parents.clone(),
                children: spec.children.clone(),
                pseudo_children: spec.pseudo_children.clone(),
                spaces: spec.spaces.clone(),
            }));
            envelopes.push(Envelope::OwnBounds(OwnBoundsNotify {
                variable: spec.name.clone(),
                bounds: preprocessor.own_bounds(&spec.name, &spec.domain),
            }));
            for child in spec.children.iter() {
                envelopes.push(Envelope::ChildBound(ChildBoundNotify {
                    variable: spec.name.clone(),
                    child: child.clone(),
                    bound: preprocessor.child_bound(&spec.name, child),
                }));
            }
        }
        envelopes
    }
}

/// The outcome of a run: one value per variable and the global cost of that
/// assignment.
#[derive(Debug, Clone)]
pub struct Solution<V, U> {
    /// The final value of every variable.
    pub assignment: Context<V>,
    /// The global cost of `assignment`.
    pub cost: U,
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
