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

//! End-to-end runs of complete problems through both engines.

use std::sync::Arc;

use adopt::prelude::*;

/// A two-variable chain: x is the root, y its only child, one binary table
/// between them (row-major, y varying fastest).
fn chain(costs: Vec<i32>) -> DcopProblem<i32, i32> {
    DcopProblem::minimization()
        .with_variable(VariableSpec::new("x", vec![0, 1]).with_children(vec!["y"]))
        .with_variable(
            VariableSpec::new("y", vec![0, 1])
                .with_parent("x")
                .with_space(Arc::new(TableSpace::binary(
                    ("x", vec![0, 1]),
                    ("y", vec![0, 1]),
                    costs,
                ))),
        )
}

/// A three-variable star: r in the middle, a and b as children, one equality
/// reward per branch (agreeing costs 0, disagreeing costs 5).
fn star() -> DcopProblem<i32, i32> {
    let agree = |other: &str| {
        Arc::new(TableSpace::binary(
            ("r", vec![0, 1]),
            (other, vec![0, 1]),
            vec![0, 5, 5, 0],
        ))
    };
    DcopProblem::minimization()
        .with_variable(VariableSpec::new("r", vec![0, 1]).with_children(vec!["a", "b"]))
        .with_variable(
            VariableSpec::new("a", vec![0, 1])
                .with_parent("r")
                .with_space(agree("a")),
        )
        .with_variable(
            VariableSpec::new("b", vec![0, 1])
                .with_parent("r")
                .with_space(agree("b")),
        )
}

/// A triangle: x at the top, y below it, z at the bottom constrained by both.
/// The edge between x and z bypasses a level of the tree, so x sees z as a
/// pseudo-child and z sees x as a pseudo-parent. Every edge penalizes
/// agreement; with binary domains at least one pair must agree, so the
/// optimum costs exactly 1.
fn triangle() -> DcopProblem<i32, i32> {
    let differ = |a: &str, b: &str| {
        Arc::new(TableSpace::binary(
            (a, vec![0, 1]),
            (b, vec![0, 1]),
            vec![1, 0, 0, 1],
        ))
    };
    DcopProblem::minimization()
        .with_variable(
            VariableSpec::new("x", vec![0, 1])
                .with_children(vec!["y"])
                .with_pseudo_children(vec!["z"]),
        )
        .with_variable(
            VariableSpec::new("y", vec![0, 1])
                .with_parent("x")
                .with_children(vec!["z"])
                .with_space(differ("x", "y")),
        )
        .with_variable(
            VariableSpec::new("z", vec![0, 1])
                .with_parent("y")
                .with_pseudo_parents(vec!["x"])
                .with_space(differ("x", "z"))
                .with_space(differ("y", "z")),
        )
}

#[test]
fn chain_settles_on_the_cheapest_pair() {
    let solution = minimize(chain(vec![0, 2, 3, 1])).unwrap();
    assert_eq!(0, solution.cost);
    assert_eq!(Some(&0), solution.assignment.get("x"));
    assert_eq!(Some(&0), solution.assignment.get("y"));
}

#[test]
fn chain_settles_on_the_cheapest_pair_when_it_is_the_last_one() {
    let solution = minimize(chain(vec![4, 2, 3, 1])).unwrap();
    assert_eq!(1, solution.cost);
    assert_eq!(Some(&1), solution.assignment.get("x"));
    assert_eq!(Some(&1), solution.assignment.get("y"));
}

#[test]
fn star_reaches_full_agreement() {
    let solution = minimize(star()).unwrap();
    assert_eq!(0, solution.cost);
    let r = solution.assignment.get("r").unwrap();
    assert_eq!(Some(r), solution.assignment.get("a"));
    assert_eq!(Some(r), solution.assignment.get("b"));
}

#[test]
fn lonely_variable_decides_without_a_single_message() {
    let problem = DcopProblem::minimization().with_variable(
        VariableSpec::new("v", vec![0, 1, 2])
            .with_space(Arc::new(TableSpace::unary("v", vec![0, 1, 2], vec![5, 1, 3]))),
    );
    let mut engine = SequentialEngine::new(problem);
    let solution = engine.run().unwrap();
    assert_eq!(Some(&1), solution.assignment.get("v"));
    assert_eq!(1, solution.cost);
    assert_eq!(0, engine.nb_messages());
}

#[test]
fn triangle_costs_exactly_one_disagreement_miss() {
    let solution = minimize(triangle()).unwrap();
    assert_eq!(1, solution.cost);
    assert_eq!(3, solution.assignment.len());
}

#[test]
fn infinite_costs_act_as_hard_constraints() {
    // x and y must differ; a unary preference pushes y towards 0
    let problem = DcopProblem::minimization()
        .with_variable(VariableSpec::new("x", vec![0, 1]).with_children(vec!["y"]))
        .with_variable(
            VariableSpec::new("y", vec![0, 1])
                .with_parent("x")
                .with_space(Arc::new(TableSpace::binary(
                    ("x", vec![0, 1]),
                    ("y", vec![0, 1]),
                    vec![i32::INFINITY, 0, 0, i32::INFINITY],
                )))
                .with_space(Arc::new(TableSpace::unary("y", vec![0, 1], vec![0, 1]))),
        );
    let solution = minimize(problem).unwrap();
    assert_eq!(0, solution.cost);
    assert_eq!(Some(&1), solution.assignment.get("x"));
    assert_eq!(Some(&0), solution.assignment.get("y"));
}

#[test]
fn latencies_do_not_change_the_outcome() {
    for lat in &[1_u64, 3, 10] {
        let mut engine = SequentialEngine::new(chain(vec![4, 2, 3, 1]))
            .with_latency("x", "y", *lat);
        assert_eq!(1, engine.run().unwrap().cost);
    }
}

#[test]
fn both_engines_agree_on_the_cost() {
    for problem in &[chain(vec![4, 2, 3, 1]), star(), triangle()] {
        let sequential = minimize(problem.clone()).unwrap();
        let parallel = ParallelEngine::new(problem.clone()).run().unwrap();
        assert_eq!(sequential.cost, parallel.cost);
    }
}

#[test]
fn parallel_runs_are_cost_stable() {
    // the interleaving changes between runs, the optimum must not
    for _ in 0..10 {
        let solution = ParallelEngine::new(triangle()).run().unwrap();
        assert_eq!(1, solution.cost);
    }
}

/// An informed preprocessing heuristic for the `{4, 2, 3, 1}` chain: y's
/// cheapest cost per own value bounds y itself, and the cheapest entry of the
/// whole table bounds the subtree rooted in y as seen from x. Both bounds are
/// admissible, so the optimum must not move.
struct ChainBounds;

impl Preprocessor<i32, i32> for ChainBounds {
    fn own_bounds(&self, variable: &str, domain: &[i32]) -> Vec<i32> {
        if variable == "y" {
            vec![3, 1]
        } else {
            vec![0; domain.len()]
        }
    }
    fn child_bound(&self, _variable: &str, _child: &str) -> i32 {
        1
    }
}

#[test]
fn informed_heuristics_do_not_change_the_outcome() {
    let mut sequential =
        SequentialEngine::new(chain(vec![4, 2, 3, 1])).with_preprocessor(ChainBounds);
    let solution = sequential.run().unwrap();
    assert_eq!(1, solution.cost);
    assert_eq!(Some(&1), solution.assignment.get("x"));
    assert_eq!(Some(&1), solution.assignment.get("y"));

    let parallel = ParallelEngine::new(chain(vec![4, 2, 3, 1]))
        .with_preprocessor(ChainBounds)
        .run()
        .unwrap();
    assert_eq!(1, parallel.cost);
}

#[test]
fn negative_costs_are_rejected_up_front() {
    let problem = DcopProblem::minimization().with_variable(
        VariableSpec::new("x", vec![0, 1])
            .with_space(Arc::new(TableSpace::unary("x", vec![0, 1], vec![0, -2]))),
    );
    assert_eq!(
        Err(SetupError::NegativeCost {
            variable: "x".to_string()
        }),
        minimize(problem).map(|_| ())
    );
}

#[test]
fn maximization_is_rejected_up_front() {
    let problem: DcopProblem<i32, i32> =
        DcopProblem::maximization().with_variable(VariableSpec::new("x", vec![0]));
    assert_eq!(
        Err(SetupError::Maximization),
        minimize(problem).map(|_| ())
    );
}

#[test]
fn variables_can_be_spread_over_fewer_agents() {
    let problem = DcopProblem::minimization()
        .with_variable(
            VariableSpec::new("x", vec![0, 1])
                .with_agent("host")
                .with_children(vec!["y"]),
        )
        .with_variable(
            VariableSpec::new("y", vec![0, 1])
                .with_agent("host")
                .with_parent("x")
                .with_space(Arc::new(TableSpace::binary(
                    ("x", vec![0, 1]),
                    ("y", vec![0, 1]),
                    vec![4, 2, 3, 1],
                ))),
        );
    let solution = ParallelEngine::new(problem).run().unwrap();
    assert_eq!(1, solution.cost);
}
