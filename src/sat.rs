//! CNF construction and SAT-based proof for a combinational AIG (component F
//! support). Used by choice synthesis to refine simulation classes and, at
//! the flow level, to confirm two AIGs compute the same function.
//!
//! CNF is built with the standard three-clause Tseitin encoding for each AND
//! gate, with a shortcut for MUX-shaped nodes (see [`crate::choice::recognize_mux`])
//! so choice synthesis does not waste a literal rediscovering structure the
//! core already recognizes.

use std::collections::HashMap;

use rustsat::instances::SatInstance;
use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::{Lit, TernaryVal, Var};
use rustsat_kissat::Kissat;

use crate::aig::Aig;
use crate::choice::recognize_mux;
use crate::signal::Signal;

/// Maps AIG node indices to CNF variables, lazily allocating as needed.
struct VarMap {
    vars: HashMap<u32, Var>,
    next: u32,
}

impl VarMap {
    fn new() -> VarMap {
        VarMap {
            vars: HashMap::new(),
            next: 0,
        }
    }

    fn lit(&mut self, s: Signal) -> Lit {
        if s.is_constant() {
            panic!("constants must be special-cased by the caller before building a literal");
        }
        let var = *self.vars.entry(s.index()).or_insert_with(|| {
            let v = Var::new(self.next);
            self.next += 1;
            v
        });
        if s.complement() {
            var.neg_lit()
        } else {
            var.pos_lit()
        }
    }
}

/// Build Tseitin clauses for every live AND gate of `aig` reachable from
/// `roots`, recognizing MUX pairs to save one auxiliary variable each.
fn build_cnf(aig: &Aig, roots: &[Signal]) -> (SatInstance, HashMap<u32, Var>, VarMap) {
    let mut inst = SatInstance::new();
    let mut vm = VarMap::new();
    let mut visited: HashMap<u32, bool> = HashMap::new();
    let mut stack: Vec<u32> = roots.iter().filter(|s| !s.is_constant()).map(|s| s.index()).collect();

    while let Some(n) = stack.pop() {
        if visited.contains_key(&n) || aig.is_ci(n) {
            visited.insert(n, true);
            continue;
        }
        visited.insert(n, true);

        if let Some((sel, a, b)) = recognize_mux(aig, n) {
            let ln = vm.lit(Signal::new(n, false));
            let ls = if sel.is_constant() { None } else { Some(vm.lit(sel)) };
            let la = if a.is_constant() { None } else { Some(vm.lit(a)) };
            let lb = if b.is_constant() { None } else { Some(vm.lit(b)) };
            add_mux_clauses(&mut inst, ln, ls, la, a.is_constant(), a == Signal::one(), lb, b.is_constant(), b == Signal::one());
            for child in [sel, a, b] {
                if !child.is_constant() {
                    stack.push(child.index());
                }
            }
            continue;
        }

        let [c0, c1] = aig.fanins(n);
        let ln = vm.lit(Signal::new(n, false));
        let la = if c0.is_constant() { None } else { Some(vm.lit(c0)) };
        let lb = if c1.is_constant() { None } else { Some(vm.lit(c1)) };
        add_and_clauses(&mut inst, ln, la, c0.is_constant() && c0 == Signal::one(), lb, c1.is_constant() && c1 == Signal::one());
        for child in [c0, c1] {
            if !child.is_constant() {
                stack.push(child.index());
            }
        }
    }

    let var_of: HashMap<u32, Var> = vm.vars.clone();
    (inst, var_of, vm)
}

#[allow(clippy::too_many_arguments)]
fn add_and_clauses(inst: &mut SatInstance, n: Lit, a: Option<Lit>, a_const_one: bool, b: Option<Lit>, b_const_one: bool) {
    match (a, b) {
        (Some(a), Some(b)) => {
            inst.add_ternary(!a, !b, n);
            inst.add_binary(a, !n);
            inst.add_binary(b, !n);
        }
        (Some(a), None) if b_const_one => {
            inst.add_binary(a, !n);
            inst.add_binary(!a, n);
        }
        (None, Some(b)) if a_const_one => {
            inst.add_binary(b, !n);
            inst.add_binary(!b, n);
        }
        _ => panic!("AND node with two constant fanins should have been simplified away"),
    }
    let _ = (a_const_one, b_const_one);
}

#[allow(clippy::too_many_arguments)]
fn add_mux_clauses(
    inst: &mut SatInstance,
    n: Lit,
    sel: Option<Lit>,
    a: Option<Lit>,
    a_is_const: bool,
    a_const_one: bool,
    b: Option<Lit>,
    b_is_const: bool,
    b_const_one: bool,
) {
    let sel = sel.expect("select input of a MUX is never constant after trivial simplification");
    match (a_is_const, b_is_const) {
        (false, false) => {
            let a = a.unwrap();
            let b = b.unwrap();
            inst.add_ternary(!sel, !a, n);
            inst.add_ternary(!sel, a, !n);
            inst.add_ternary(sel, !b, n);
            inst.add_ternary(sel, b, !n);
        }
        (true, false) => {
            let b = b.unwrap();
            if a_const_one {
                inst.add_binary(!sel, n);
            } else {
                inst.add_binary(!sel, !n);
            }
            inst.add_ternary(sel, !b, n);
            inst.add_ternary(sel, b, !n);
        }
        (false, true) => {
            let a = a.unwrap();
            inst.add_ternary(!sel, !a, n);
            inst.add_ternary(!sel, a, !n);
            if b_const_one {
                inst.add_binary(sel, n);
            } else {
                inst.add_binary(sel, !n);
            }
        }
        (true, true) => panic!("both MUX data inputs constant should have collapsed to a buffer"),
    }
}

/// Outcome of trying to prove `signal == 1` is unsatisfiable.
#[derive(Clone, Debug)]
pub enum ProofResult {
    /// The signal can never be 1: proven equivalent to constant 0.
    Unsat,
    /// A primary-input assignment that makes the signal 1.
    Sat(HashMap<u32, bool>),
}

/// Try to prove that `signal` (a node of `aig`) is always false, using a
/// freshly spawned Kissat instance.
///
/// Mirrors the CNF-then-solve structure used for bounded equivalence
/// checking: build Tseitin clauses for the fanin cone, assert the signal
/// literal, and solve.
pub fn prove_always_false(aig: &Aig, signal: Signal) -> ProofResult {
    if signal == Signal::zero() {
        return ProofResult::Unsat;
    }
    if signal == Signal::one() {
        let mut empty = HashMap::new();
        empty.insert(u32::MAX, true);
        return ProofResult::Sat(empty);
    }

    let (mut inst, var_of, mut vm) = build_cnf(aig, &[signal]);
    let assert_lit = vm.lit(signal);
    inst.add_unit(assert_lit);

    let mut solver = Kissat::default();
    solver.add_cnf(inst.into_cnf().0).expect("CNF clauses are well formed");
    match solver.solve().expect("kissat solve should not error") {
        SolverResult::Unsat => ProofResult::Unsat,
        SolverResult::Sat => {
            let mut assignment = HashMap::new();
            for (&node, &var) in var_of.iter() {
                if let Ok(TernaryVal::True) = solver.lit_val(var.pos_lit()) {
                    assignment.insert(node, true);
                } else {
                    assignment.insert(node, false);
                }
            }
            ProofResult::Sat(assignment)
        }
        SolverResult::Interrupted => panic!("kissat solve was interrupted unexpectedly"),
    }
}

/// Prove whether `a` and `b` (signals of the same AIG) are functionally
/// equivalent, i.e. that `a XOR b` is always false.
pub fn prove_equivalent(aig: &Aig, a: Signal, b: Signal) -> bool {
    if a == b {
        return true;
    }
    // a == b  <=>  (a AND NOT b) OR (NOT a AND b) is always false
    let mut scratch = aig.clone();
    let diff = scratch.create_and(a, !b);
    let diff2 = scratch.create_and(!a, b);
    let either = !scratch.create_and(!diff, !diff2);
    matches!(prove_always_false(&scratch, either), ProofResult::Unsat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prove_constant_false_signal() {
        let aig = Aig::new();
        assert!(matches!(prove_always_false(&aig, Signal::zero()), ProofResult::Unsat));
    }

    #[test]
    fn test_equivalent_constructions_of_xor() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let t1 = !aig.create_and(a, b);
        let t2 = !aig.create_and(!a, !b);
        let xor_a = !aig.create_and(t1, t2);

        let and1 = aig.create_and(a, !b);
        let and2 = aig.create_and(!a, b);
        let xor_b = !aig.create_and(!and1, !and2);

        assert!(prove_equivalent(&aig, xor_a, xor_b));
    }

    #[test]
    fn test_non_equivalent_signals() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let and_ab = aig.create_and(a, b);
        assert!(!prove_equivalent(&aig, and_ab, a));
    }
}
