//! Reconvergence-driven refactoring via ISOP/SOP factoring (component I).
//!
//! Unlike the rewriter's fixed 4-input NPN database, refactoring targets
//! wider reconvergent cones (up to `max_leaves` inputs, capped at 12 per
//! bounded parameters) by enumerating a node's own best cut, then
//! replacing its cone with a from-scratch sum-of-products reconstruction
//! when that is smaller than the cone it replaces.

use crate::aig::Aig;
use crate::cut_enum::{enumerate_cuts, CutEnumConfig};
use crate::isop::{cover_depth, factor_cover, isop};
use crate::signal::Signal;

/// Parameters for one refactoring pass.
#[derive(Clone, Copy, Debug)]
pub struct RefactorConfig {
    /// Maximum number of leaves considered for a cone (`I <= 12`).
    pub max_leaves: usize,
    /// Maximum MFFC size considered for refactoring (cone <= 20).
    pub max_cone: usize,
    /// Accept zero-gain (same node count) replacements.
    pub use_zero_gain: bool,
    /// Refuse any replacement that increases the root's logic level.
    pub preserve_depth: bool,
}

impl Default for RefactorConfig {
    fn default() -> RefactorConfig {
        RefactorConfig {
            max_leaves: 10,
            max_cone: 20,
            use_zero_gain: false,
            preserve_depth: true,
        }
    }
}

fn node_level(levels: &[u32], s: Signal) -> u32 {
    if s.is_constant() {
        0
    } else {
        levels[s.index() as usize]
    }
}

fn compute_levels(aig: &Aig) -> Vec<u32> {
    let mut levels = vec![0u32; aig.num_nodes()];
    for n in 0..aig.num_nodes() as u32 {
        if !aig.is_alive(n) || aig.is_ci(n) {
            continue;
        }
        let [c0, c1] = aig.fanins(n);
        levels[n as usize] = 1 + node_level(&levels, c0).max(node_level(&levels, c1));
    }
    levels
}

fn mffc_nodes(aig: &Aig, root: u32, leaves: &[u32]) -> Vec<u32> {
    let mut nodes = Vec::new();
    let mut stack = vec![root];
    let mut seen = std::collections::HashSet::new();
    while let Some(n) = stack.pop() {
        if leaves.contains(&n) || !seen.insert(n) {
            continue;
        }
        if aig.is_ci(n) {
            continue;
        }
        nodes.push(n);
        let [c0, c1] = aig.fanins(n);
        for c in [c0, c1] {
            if !c.is_constant() && aig.fanout_size(c.index()) == 1 {
                stack.push(c.index());
            }
        }
    }
    nodes
}

/// Run one refactoring pass over `aig`, returning the number of nodes replaced.
pub fn refactor(aig: &mut Aig, config: RefactorConfig) -> usize {
    let mut replaced = 0;
    let enum_config = CutEnumConfig {
        max_leaves: config.max_leaves.min(crate::cut::MAX_CUT_LEAVES),
        max_cuts: 8,
        compute_truth: true,
    };

    let mut levels = compute_levels(aig);
    let gates: Vec<u32> = aig.foreach_gate().collect();
    for root in gates {
        if !aig.is_alive(root) || aig.fanout_size(root) == 0 {
            continue;
        }
        let result = enumerate_cuts(aig, enum_config);
        let Some(best_cut) = result.cut_sets[root as usize]
            .cuts()
            .iter()
            .filter(|c| c.size() >= 2)
            .max_by_key(|c| c.size())
        else {
            continue;
        };
        let Some(truth_lit) = best_cut.truth_lit else { continue };
        let cone = mffc_nodes(aig, root, best_cut.leaves());
        if cone.len() > config.max_cone || cone.is_empty() {
            continue;
        }

        let tt = result.truth_cache.get(truth_lit);
        let leaf_sigs: Vec<Signal> = best_cut.leaves().iter().map(|&l| Signal::new(l, false)).collect();
        let cover_pos = isop(&tt, best_cut.size());
        let cover_neg = isop(&!tt.clone(), best_cut.size());
        let (cover, negate_output) = if cover_neg.len() < cover_pos.len() {
            (cover_neg, true)
        } else {
            (cover_pos, false)
        };

        let cut_level = best_cut.leaves().iter().map(|&l| levels[l as usize]).max().unwrap_or(0);
        let new_level = cut_level + cover_depth(&cover);
        if config.preserve_depth && new_level > levels[root as usize] {
            continue;
        }

        let mut scratch = aig.clone();
        let _ = factor_cover(&mut scratch, &leaf_sigs, &cover, best_cut.size());
        let new_nodes = scratch.num_nodes() - aig.num_nodes();
        let gain = cone.len() as i64 - new_nodes as i64;
        if gain < 0 || (gain == 0 && !config.use_zero_gain) {
            continue;
        }

        let rebuilt = factor_cover(aig, &leaf_sigs, &cover, best_cut.size());
        let new_root_sig = rebuilt ^ negate_output;
        if new_root_sig.index() == root {
            continue;
        }
        aig.substitute_node(root, new_root_sig);
        replaced += 1;
        levels = compute_levels(aig);
    }
    replaced
}
