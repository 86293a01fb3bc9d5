//! Choice synthesis: simulation-based candidate classes refined by SAT
//! (component F).
//!
//! Candidates are found cheaply with random-pattern simulation (nodes with
//! the same simulation signature, up to global complementation, might be
//! equivalent); every candidate pair is then confirmed or refuted with
//! [`prove_equivalent`]. Simulation never produces a false negative class
//! split (two truly-equal nodes always simulate identically), only false
//! positives, which SAT weeds out.

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::aig::Aig;
use crate::choice::ChoiceView;
use crate::sat::prove_equivalent;
use crate::signal::Signal;

/// Number of random simulation words (each `u64` is 64 simulation patterns).
const DEFAULT_SIM_WORDS: usize = 8;

/// Run `num_words` words of random simulation over `aig`, returning each
/// live node's signature.
fn simulate(aig: &Aig, num_words: usize, seed: u64) -> Vec<Vec<u64>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let n = aig.num_nodes();
    let mut sig = vec![vec![0u64; num_words]; n];

    for i in 1..=aig.num_pis() {
        for w in sig[i].iter_mut() {
            *w = rng.gen();
        }
    }

    for i in 0..n {
        if !aig.is_alive(i as u32) || aig.is_ci(i as u32) {
            continue;
        }
        let [c0, c1] = aig.fanins(i as u32);
        for w in 0..num_words {
            let v0 = sim_value(&sig, c0, w);
            let v1 = sim_value(&sig, c1, w);
            sig[i][w] = v0 & v1;
        }
    }
    sig
}

fn sim_value(sig: &[Vec<u64>], s: Signal, word: usize) -> u64 {
    let v = if s.is_constant() { 0 } else { sig[s.index() as usize][word] };
    if s.complement() {
        !v
    } else {
        v
    }
}

/// Canonicalize a signature so that two signatures differing only by a
/// global bit-flip hash to the same key: flip if bit 0 of word 0 is set.
fn canonical_key(sig: &[u64]) -> (bool, Vec<u64>) {
    let flipped = sig[0] & 1 != 0;
    if flipped {
        (true, sig.iter().map(|w| !w).collect())
    } else {
        (false, sig.to_vec())
    }
}

/// Synthesize choices for `aig` by simulating `num_words` random patterns
/// (64 per word) and confirming same-signature candidates with SAT.
///
/// Returns a [`ChoiceView`] where every confirmed equivalence has been
/// merged into one class; candidates refuted by SAT are left unmerged.
pub fn synthesize_choices(aig: &Aig, num_words: usize, seed: u64) -> ChoiceView {
    let sig = simulate(aig, num_words.max(1), seed);
    let mut classes: HashMap<(bool, Vec<u64>), Vec<u32>> = HashMap::new();

    for i in 0..aig.num_nodes() {
        if !aig.is_alive(i as u32) || aig.is_ci(i as u32) {
            continue;
        }
        let key = canonical_key(&sig[i]);
        classes.entry(key).or_default().push(i as u32);
    }

    let mut view = ChoiceView::identity(aig);
    for members in classes.values() {
        if members.len() < 2 {
            continue;
        }
        let repr = members[0];
        for &m in &members[1..] {
            if view.repr(m) == view.repr(repr) {
                continue;
            }
            let repr_sig = Signal::new(repr, false);
            let m_sig = Signal::new(m, false);
            let same_phase = sig[repr as usize][0] & 1 == sig[m as usize][0] & 1;
            let candidate = if same_phase { m_sig } else { !m_sig };
            if prove_equivalent(aig, repr_sig, candidate) {
                if !reachable(aig, repr, m) && !reachable(aig, m, repr) {
                    view.add_choice(repr, m);
                }
            }
        }
    }
    view
}

/// Whether `target` is reachable from `from` by following fanins, used to
/// reject a choice edge that would create a combinational loop.
fn reachable(aig: &Aig, from: u32, target: u32) -> bool {
    let mut stack = vec![from];
    let mut seen = std::collections::HashSet::new();
    while let Some(n) = stack.pop() {
        if n == target {
            return true;
        }
        if !seen.insert(n) {
            continue;
        }
        if aig.is_ci(n) {
            continue;
        }
        let [c0, c1] = aig.fanins(n);
        if !c0.is_constant() {
            stack.push(c0.index());
        }
        if !c1.is_constant() {
            stack.push(c1.index());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesizes_choice_for_equivalent_cones() {
        // a & b strashes to the same node under any bracketing, so build two
        // genuinely distinct structures for the same function instead: XOR
        // via the 4-NAND chain, and XOR via a direct sum-of-products
        // (a & !b) | (!a & b), expressed as its own AND/OR/INV tree.
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();

        let n1 = !aig.create_and(a, b);
        let n2 = !aig.create_and(a, n1);
        let n3 = !aig.create_and(b, n1);
        let nand_xor = !aig.create_and(n2, n3);

        let p = aig.create_and(a, !b);
        let q = aig.create_and(!a, b);
        let sop_xor = !aig.create_and(!p, !q);

        assert_ne!(nand_xor.index(), sop_xor.index());
        aig.create_po(nand_xor);
        aig.create_po(sop_xor);

        let view = synthesize_choices(&aig, DEFAULT_SIM_WORDS, 42);
        assert_eq!(view.repr(nand_xor.index()), view.repr(sop_xor.index()));
    }

    #[test]
    fn test_no_choice_between_different_functions() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let and_sig = aig.create_and(a, b);
        let or_sig = !aig.create_and(!a, !b);
        let view = synthesize_choices(&aig, DEFAULT_SIM_WORDS, 7);
        assert_ne!(view.repr(and_sig.index()), view.repr(or_sig.index()));
    }
}
