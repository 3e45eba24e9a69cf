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

//! This module provides `TableSpace`, the extensional implementation of the
//! `CostSpace` abstraction: one cost per tuple of the scope's cartesian
//! product, stored row-major.

use std::fmt::Debug;
use std::hash::Hash;

use crate::abstraction::cost::Cost;
use crate::abstraction::space::CostSpace;
use crate::common::Context;

/// A cost function given in extension. The cost of a full tuple is a table
/// lookup; the cost under a partial context is the minimum over every
/// completion of that context, which keeps the bounds derived from it
/// admissible.
#[derive(Debug, Clone)]
pub struct TableSpace<V, U> {
    /// The variables this table constrains, in table order.
    scope: Vec<String>,
    /// The domain of each scope variable, in table order.
    domains: Vec<Vec<V>>,
    /// The cost of each tuple, row-major (last scope variable fastest).
    costs: Vec<U>,
}

impl<V, U> TableSpace<V, U>
where
    V: Clone + Eq + Hash + Debug,
    U: Cost,
{
    /// Creates a table over the given scope. `costs` must hold one entry per
    /// tuple of the cartesian product of the domains, row-major with the
    /// last variable varying fastest.
    pub fn new<S: Into<String>>(scope: Vec<(S, Vec<V>)>, costs: Vec<U>) -> Self {
        assert!(!scope.is_empty());
        let mut names = Vec::with_capacity(scope.len());
        let mut domains = Vec::with_capacity(scope.len());
        let mut expected = 1;
        for (name, domain) in scope {
            assert!(!domain.is_empty());
            expected *= domain.len();
            names.push(name.into());
            domains.push(domain);
        }
        assert_eq!(expected, costs.len());
        TableSpace {
            scope: names,
            domains,
            costs,
        }
    }

    /// A table over a single variable.
    pub fn unary<S: Into<String>>(var: S, domain: Vec<V>, costs: Vec<U>) -> Self {
        Self::new(vec![(var, domain)], costs)
    }

    /// A table over two variables, the second varying fastest.
    pub fn binary<S: Into<String>>(a: (S, Vec<V>), b: (S, Vec<V>), costs: Vec<U>) -> Self {
        Self::new(vec![a, b], costs)
    }
}

impl<V, U> CostSpace<V, U> for TableSpace<V, U>
where
    V: Clone + Eq + Hash + Debug + Send + Sync,
    U: Cost,
{
    fn scope(&self) -> &[String] {
        &self.scope
    }

    fn cost(&self, ctx: &Context<V>) -> U {
        // for each scope variable, the table positions the context allows:
        // a single one when the variable is assigned a domain value, the
        // whole domain otherwise
        let candidates: Vec<Vec<usize>> = self
            .scope
            .iter()
            .zip(self.domains.iter())
            .map(|(var, domain)| {
                match ctx.get(var).and_then(|v| domain.iter().position(|d| d == v)) {
                    Some(p) => vec![p],
                    None => (0..domain.len()).collect(),
                }
            })
            .collect();

        let mut counters = vec![0_usize; candidates.len()];
        let mut best = U::INFINITY;
        loop {
            let mut idx = 0;
            for (i, c) in counters.iter().enumerate() {
                idx = idx * self.domains[i].len() + candidates[i][*c];
            }
            best = best.min(self.costs[idx]);

            // odometer step, last position fastest
            let mut i = candidates.len();
            loop {
                if i == 0 {
                    return best;
                }
                i -= 1;
                counters[i] += 1;
                if counters[i] < candidates[i].len() {
                    break;
                }
                counters[i] = 0;
            }
        }
    }

    fn costs(&self) -> Box<dyn Iterator<Item = U> + '_> {
        Box::new(self.costs.iter().copied())
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_space {
    use crate::abstraction::cost::Cost;

    use super::*;

    fn table_a() -> TableSpace<i32, i32> {
        TableSpace::binary(("x", vec![0, 1]), ("y", vec![0, 1]), vec![0, 2, 3, 1])
    }

    #[test]
    fn full_tuple_is_a_lookup() {
        let space = table_a();
        let mut ctx = Context::default();
        ctx.insert("x".to_string(), 1);
        ctx.insert("y".to_string(), 0);
        assert_eq!(3, space.cost(&ctx));
    }

    #[test]
    fn missing_variables_are_minimized_over() {
        let space = table_a();
        let mut ctx = Context::default();
        ctx.insert("x".to_string(), 1);
        assert_eq!(1, space.cost(&ctx));
        assert_eq!(0, space.cost(&Context::default()));
    }

    #[test]
    fn foreign_values_are_minimized_over() {
        let space = table_a();
        let mut ctx = Context::default();
        ctx.insert("x".to_string(), 99);
        ctx.insert("y".to_string(), 1);
        assert_eq!(1, space.cost(&ctx));
    }

    #[test]
    fn variables_outside_the_scope_are_ignored() {
        let space = table_a();
        let mut ctx = Context::default();
        ctx.insert("x".to_string(), 0);
        ctx.insert("y".to_string(), 1);
        ctx.insert("z".to_string(), 7);
        assert_eq!(2, space.cost(&ctx));
    }

    #[test]
    fn unary_table() {
        let space = TableSpace::unary("v", vec![0, 1, 2], vec![5, 1, 3]);
        let mut ctx = Context::default();
        ctx.insert("v".to_string(), 2);
        assert_eq!(3, space.cost(&ctx));
        assert_eq!(1, space.cost(&Context::default()));
    }

    #[test]
    fn costs_iterates_every_tuple() {
        let space = table_a();
        let all: Vec<i32> = space.costs().collect();
        assert_eq!(vec![0, 2, 3, 1], all);
    }

    #[test]
    #[should_panic]
    fn mismatched_table_length_is_rejected() {
        let _ = TableSpace::binary(("x", vec![0, 1]), ("y", vec![0, 1]), vec![0, 2, 3]);
    }

    #[test]
    fn tables_can_be_shared_across_agent_threads() {
        fn assert_shareable<V, U>(_: &dyn CostSpace<V, U>) {}
        let space = table_a();
        assert_shareable(&space);
        let shared: std::sync::Arc<dyn CostSpace<i32, i32>> = std::sync::Arc::new(table_a());
        let mut ctx = Context::default();
        ctx.insert("x".to_string(), 0);
        ctx.insert("y".to_string(), 0);
        assert_eq!(0, shared.cost(&ctx));
    }

    #[test]
    fn infinite_costs_stand_for_hard_constraints() {
        let space = TableSpace::binary(
            ("x", vec![0, 1]),
            ("y", vec![0, 1]),
            vec![i32::INFINITY, 0, 0, i32::INFINITY],
        );
        let mut ctx = Context::default();
        ctx.insert("x".to_string(), 0);
        ctx.insert("y".to_string(), 0);
        assert_eq!(i32::INFINITY, space.cost(&ctx));
        ctx.insert("y".to_string(), 1);
        assert_eq!(0, space.cost(&ctx));
    }
}
