//! Priority-cut enumeration over the whole AIG (component D).

use itertools::iproduct;
use volute::Lut;

use crate::aig::Aig;
use crate::cut::{Cut, CutSet, SortMode, MAX_CUT_LEAVES, MAX_CUT_SET_SIZE};
use crate::truth::TruthCache;

/// Parameters controlling cut enumeration.
#[derive(Clone, Copy, Debug)]
pub struct CutEnumConfig {
    /// Maximum leaves per cut (`K`).
    pub max_leaves: usize,
    /// Maximum cuts retained per node (`L`).
    pub max_cuts: usize,
    /// Whether to compute and intern truth tables for every cut.
    pub compute_truth: bool,
}

impl Default for CutEnumConfig {
    fn default() -> CutEnumConfig {
        CutEnumConfig {
            max_leaves: 6,
            max_cuts: MAX_CUT_SET_SIZE,
            compute_truth: true,
        }
    }
}

/// Per-node cut-sets for the whole network, plus the truth cache populated
/// while enumerating (when `compute_truth` is enabled).
pub struct CutEnumResult {
    pub cut_sets: Vec<CutSet>,
    pub truth_cache: TruthCache,
}

fn leaf_truth(leaf_pos: usize, num_leaves: usize) -> Lut {
    Lut::nth_var(num_leaves, leaf_pos).expect("leaf index within arity")
}

/// Compute the truth table of a cut given its leaves' truth tables (in leaf order)
/// and the AND/inversion structure between the cut's root and its two immediate
/// fanins' cuts being merged. This helper computes the truth table for a merge
/// of two child cuts whose own truth tables are already expressed over the
/// *merged* leaf set, i.e. the caller has already expanded each child's table.
pub(crate) fn and_truth(a: &Lut, a_inv: bool, b: &Lut, b_inv: bool) -> Lut {
    let ta = if a_inv { !a.clone() } else { a.clone() };
    let tb = if b_inv { !b.clone() } else { b.clone() };
    ta & tb
}

/// Expand a truth table expressed over `old_leaves` to be expressed over
/// `new_leaves` (a superset), by permuting/duplicating variables.
pub(crate) fn expand_truth(tt: &Lut, old_leaves: &[u32], new_leaves: &[u32]) -> Lut {
    if old_leaves == new_leaves {
        return tt.clone();
    }
    let n = new_leaves.len();
    let mut result = Lut::zero(n);
    for row in 0..(1usize << n) {
        let mut old_row = 0usize;
        for (old_pos, leaf) in old_leaves.iter().enumerate() {
            let new_pos = new_leaves.iter().position(|l| l == leaf).expect("leaf subset");
            if (row >> new_pos) & 1 != 0 {
                old_row |= 1 << old_pos;
            }
        }
        if tt.value(old_row) {
            result.set_value(row, true);
        }
    }
    result
}

/// Enumerate priority cuts for every node of `aig`, in topological (index) order.
///
/// Each node's cut-set always contains the trivial unit cut `{n}`; AND nodes
/// additionally get every leaf-bounded merge of a cut from each fanin's
/// cut-set, pruned by dominance and capped at `config.max_cuts`.
pub fn enumerate_cuts(aig: &Aig, config: CutEnumConfig) -> CutEnumResult {
    let n = aig.num_nodes();
    let mut cut_sets: Vec<CutSet> = (0..n).map(|_| CutSet::new(config.max_cuts)).collect();
    let mut truth_cache = TruthCache::new();

    for i in 0..n {
        if !aig.is_alive(i as u32) {
            continue;
        }
        if aig.is_ci(i as u32) {
            let mut unit = Cut::unit(i as u32);
            if config.compute_truth {
                let tt = Lut::nth_var(1, 0).expect("1-input projection exists");
                unit.truth_lit = Some(truth_cache.insert(tt));
            }
            cut_sets[i].insert(unit, SortMode::Default);
            continue;
        }

        let fanins = aig.fanins(i as u32);
        let unit = Cut::unit(i as u32);
        cut_sets[i].insert(unit, SortMode::Default);

        let set0 = &cut_sets[fanins[0].index() as usize];
        let set1 = &cut_sets[fanins[1].index() as usize];
        let pairs: Vec<(Cut, Cut)> = iproduct!(set0.cuts(), set1.cuts())
            .map(|(c0, c1)| (c0.clone(), c1.clone()))
            .collect();

        let mut merged_cuts = Vec::new();
        for (c0, c1) in pairs {
            if let Some(mut merged) = Cut::merge(&c0, &c1, config.max_leaves.min(MAX_CUT_LEAVES)) {
                if config.compute_truth {
                    if let (Some(l0), Some(l1)) = (c0.truth_lit, c1.truth_lit) {
                        let t0 = expand_truth(&truth_cache.get(l0), c0.leaves(), merged.leaves());
                        let t1 = expand_truth(&truth_cache.get(l1), c1.leaves(), merged.leaves());
                        let merged_tt = and_truth(&t0, fanins[0].complement(), &t1, fanins[1].complement());
                        merged.truth_lit = Some(truth_cache.insert(merged_tt));
                    }
                }
                merged.value.delay = 1 + std::cmp::max(
                    cut_delay(&cut_sets, fanins[0].index() as usize, &c0),
                    cut_delay(&cut_sets, fanins[1].index() as usize, &c1),
                );
                merged_cuts.push(merged);
            }
        }
        for merged in merged_cuts {
            cut_sets[i].insert(merged, SortMode::Default);
        }
        cut_sets[i].limit(config.max_cuts);
    }

    CutEnumResult { cut_sets, truth_cache }
}

fn cut_delay(_cut_sets: &[CutSet], _node: usize, c: &Cut) -> u32 {
    c.value.delay
}
