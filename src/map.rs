//! k-LUT technology mapper (component J).
//!
//! Multi-pass priority-cut selection over an AIG-with-choices, following
//! a delay pass fixes arrival times and the
//! mapping's depth, then `flowIters` area-flow passes and `areaIters` exact
//! area passes refine area under the required-time constraints the delay
//! pass established. Choice representatives additionally splice in the best
//! cuts of every other member of their equivalence class.

use std::collections::HashSet;

use itertools::iproduct;
use volute::Lut;

use crate::aig::Aig;
use crate::choice::ChoiceView;
use crate::cut::{Cut, CutSet, SortMode, EPS, MAX_CUT_LEAVES, MAX_CUT_SET_SIZE};
use crate::cut_enum::{and_truth, expand_truth};
use crate::truth::TruthCache;

/// A node's chosen LUT implementation after mapping.
#[derive(Clone, Debug)]
pub struct LutMapping {
    /// `leaves[n]` are the cut leaves realizing node `n`, empty for CIs and
    /// for nodes not used by the final mapping.
    pub leaves: Vec<Vec<u32>>,
    /// `truth[n]` is the truth-table literal (into `truth_cache`) of node `n`'s LUT.
    pub truth: Vec<Option<u32>>,
    pub truth_cache: TruthCache,
    pub arrival: Vec<u32>,
    pub required: Vec<u32>,
}

/// Parameters for k-LUT mapping.
#[derive(Clone, Copy, Debug)]
pub struct MapConfig {
    /// LUT input count (`K`).
    pub k: usize,
    /// Cuts retained per node (`L`).
    pub cut_limit: usize,
    /// Number of area-flow refinement passes after the delay pass.
    pub area_flow_passes: usize,
    /// Number of exact-area refinement passes after area-flow.
    pub area_passes: usize,
}

impl Default for MapConfig {
    fn default() -> MapConfig {
        MapConfig {
            k: 6,
            cut_limit: 8,
            area_flow_passes: 2,
            area_passes: 2,
        }
    }
}

/// Per-pass mutable mapping state, threaded through cut selection so area
/// bookkeeping survives across passes ("seed each with the
/// fanin's current best cut").
struct MapState {
    best: Vec<Option<Cut>>,
    /// Live reference count: how many currently-chosen cuts use node `n` as
    /// a leaf, plus one for each primary output. Mutated by `ref_cut`/`deref_cut`.
    refs: Vec<u32>,
    est_ref: Vec<f64>,
    arrival: Vec<u32>,
    required: Vec<u32>,
    truth_cache: TruthCache,
}

/// Recursively tear down the area/edge contribution of `cut`, decrementing
/// leaf reference counts and recursing into any leaf whose count falls to
/// zero. Mirrors `ref_cut`; calling one after the other on the same cut must
/// return the same area (the double-accounting invariant below).
fn deref_cut(aig: &Aig, cut: &Cut, state: &mut MapState) -> (f64, f64) {
    let mut area = 1.0;
    let mut edge = cut.leaves().len() as f64;
    for &l in cut.leaves() {
        if aig.is_ci(l) {
            continue;
        }
        state.refs[l as usize] -= 1;
        if state.refs[l as usize] == 0 {
            if let Some(lc) = state.best[l as usize].clone() {
                let (a, e) = deref_cut(aig, &lc, state);
                area += a;
                edge += e;
            }
        }
    }
    (area, edge)
}

/// Recursively account for `cut` becoming referenced: increments leaf
/// reference counts, recursing into any leaf that was previously
/// unreferenced.
fn ref_cut(aig: &Aig, cut: &Cut, state: &mut MapState) -> (f64, f64) {
    let mut area = 1.0;
    let mut edge = cut.leaves().len() as f64;
    for &l in cut.leaves() {
        if aig.is_ci(l) {
            continue;
        }
        let was_zero = state.refs[l as usize] == 0;
        state.refs[l as usize] += 1;
        if was_zero {
            if let Some(lc) = state.best[l as usize].clone() {
                let (a, e) = ref_cut(aig, &lc, state);
                area += a;
                edge += e;
            }
        }
    }
    (area, edge)
}

/// Area-flow estimate of `cut`: like `deref_cut`'s sum, but each leaf
/// contributes its best cut's stored area divided by its estimated fanout,
/// rather than being gated on whether it is currently referenced at all
/// (area / edge flow).
fn flow_cost(aig: &Aig, cut: &Cut, state: &MapState) -> (f64, f64) {
    let mut area = 1.0;
    let mut edge = cut.leaves().len() as f64;
    for &l in cut.leaves() {
        if aig.is_ci(l) {
            continue;
        }
        let Some(lc) = &state.best[l as usize] else {
            continue;
        };
        let (leaf_area, leaf_edge) = (lc.value.area_flow, lc.value.edge_flow);
        if state.refs[l as usize] == 0 {
            area += leaf_area.min(1e32);
            edge += leaf_edge.min(1e32);
        } else {
            let denom = state.est_ref[l as usize].max(EPS);
            area += (leaf_area / denom).min(1e32);
            edge += (leaf_edge / denom).min(1e32);
        }
    }
    (area, edge)
}

/// One-level, non-mutating area/edge estimate used purely for ranking
/// candidate cuts: reuses each leaf's already-committed area (computed when
/// that leaf was last ref'd/deref'd) rather than re-deriving it recursively.
fn exact_cost_estimate(aig: &Aig, cut: &Cut, state: &MapState) -> (f64, f64) {
    let mut area = 1.0;
    let mut edge = cut.leaves().len() as f64;
    for &l in cut.leaves() {
        if aig.is_ci(l) || state.refs[l as usize] > 0 {
            continue;
        }
        if let Some(lc) = &state.best[l as usize] {
            area += lc.value.area;
            edge += lc.value.edge;
        }
    }
    (area, edge)
}

fn leaf_arrival(state: &MapState, leaf: u32) -> u32 {
    state.arrival[leaf as usize]
}

fn cut_delay(state: &MapState, cut: &Cut) -> u32 {
    1 + cut.leaves().iter().map(|&l| leaf_arrival(state, l)).max().unwrap_or(0)
}

/// Build every leaf-bounded merge of `n`'s two fanin cut-sets, with `delay`
/// and a truth-table literal filled in; area/area-flow fields are left at
/// zero for the caller to fill in per the active pass's cost model.
fn merge_candidates(aig: &Aig, n: u32, state: &mut MapState, cut_sets: &[CutSet], max_leaves: usize) -> Vec<Cut> {
    let [c0, c1] = aig.fanins(n);
    let set0 = &cut_sets[c0.index() as usize];
    let set1 = &cut_sets[c1.index() as usize];
    let mut out = Vec::new();
    for (a, b) in iproduct!(set0.cuts(), set1.cuts()) {
        if let Some(mut merged) = Cut::merge(a, b, max_leaves) {
            merged.value.delay = cut_delay(state, &merged);
            if let (Some(l0), Some(l1)) = (a.truth_lit, b.truth_lit) {
                let t0 = expand_truth(&state.truth_cache.get(l0), a.leaves(), merged.leaves());
                let t1 = expand_truth(&state.truth_cache.get(l1), b.leaves(), merged.leaves());
                let tt = and_truth(&t0, c0.complement(), &t1, c1.complement());
                merged.truth_lit = Some(state.truth_cache.insert(tt));
            }
            out.push(merged);
        }
    }
    out
}

/// Splice in the best cuts of every other member of `n`'s (non-trivial)
/// choice class, each re-scored under `mode`.
fn splice_choice_cuts(
    n: u32,
    choices: &ChoiceView,
    cut_sets: &mut [CutSet],
    mode: SortMode,
) {
    if !choices.is_repr(n) {
        return;
    }
    let members: Vec<u32> = choices.class_members(n).filter(|&m| m != n).collect();
    if members.is_empty() {
        return;
    }
    let donated: Vec<Cut> = members
        .iter()
        .flat_map(|&m| cut_sets[m as usize].cuts().iter().cloned())
        .collect();
    for cut in donated {
        cut_sets[n as usize].insert(cut, mode);
    }
}

fn unit_cut(n: u32) -> Cut {
    Cut::unit(n)
}

fn select_best(aig: &Aig, n: u32, cut_sets: &[CutSet], state: &MapState, required: u32, mode: SortMode) -> Option<Cut> {
    let zero_gain = true; // equality with required is allowed under zero_gain.
    cut_sets[n as usize]
        .cuts()
        .iter()
        // The trivial cut {n} is kept only so other nodes can use n as an
        // opaque leaf; n itself can never be realized by a LUT whose sole
        // input is its own output.
        .filter(|c| !(c.size() == 1 && c.leaves()[0] == n))
        .filter(|c| {
            let d = cut_delay(state, c);
            required == u32::MAX || d < required || (zero_gain && d == required)
        })
        .min_by(|a, b| match mode {
            SortMode::Delay | SortMode::Delay2 => crate::cut::compare(a, b, mode),
            _ => {
                let (aa, _) = exact_cost_estimate(aig, a, state);
                let (ba, _) = exact_cost_estimate(aig, b, state);
                aa.partial_cmp(&ba).unwrap_or(std::cmp::Ordering::Equal).then(crate::cut::compare(a, b, mode))
            }
        })
        .cloned()
}

/// Run one mapping pass over every AND node in topological (ascending
/// index) order, updating `state.best` and `state.arrival` in place.
fn run_pass(
    aig: &Aig,
    choices: &ChoiceView,
    cut_sets: &mut [CutSet],
    state: &mut MapState,
    max_leaves: usize,
    mode: SortMode,
    is_delay_pass: bool,
) {
    for i in 0..aig.num_nodes() {
        let n = i as u32;
        if aig.is_ci(n) || !aig.is_alive(n) {
            continue;
        }

        if is_delay_pass {
            state.est_ref[i] = state.refs[i] as f64;
        } else {
            state.est_ref[i] = (state.refs[i] as f64 + 2.0 * state.est_ref[i]) / 3.0;
        }

        let had_best = state.best[i].is_some();
        if !is_delay_pass && state.refs[i] > 0 && had_best {
            let old = state.best[i].clone().unwrap();
            deref_cut(aig, &old, state);
        }

        cut_sets[i].clear();
        let mut self_cut = unit_cut(n);
        // A leaf's truth table is always the single-variable projection in
        // the local space of whatever larger cut it ends up part of,
        // whether the leaf is a primary input or an internal AND node.
        let proj = Lut::nth_var(1, 0).expect("1-input projection exists");
        self_cut.truth_lit = Some(state.truth_cache.insert(proj));
        cut_sets[i].insert(self_cut, mode);
        for c in merge_candidates(aig, n, state, cut_sets, max_leaves) {
            cut_sets[i].insert(c, mode);
        }
        cut_sets[i].limit(cut_sets[i].len().min(MAX_CUT_SET_SIZE));

        // Score every surviving candidate under the active cost model before
        // selecting, so non-delay passes pick by area rather than raw delay.
        if !is_delay_pass {
            let scored: Vec<Cut> = cut_sets[i]
                .cuts()
                .iter()
                .cloned()
                .map(|mut c| {
                    let (area, edge) = match mode {
                        SortMode::Flow => flow_cost(aig, &c, state),
                        _ => exact_cost_estimate(aig, &c, state),
                    };
                    c.value.area = area;
                    c.value.edge = edge;
                    c.value.area_flow = area;
                    c.value.edge_flow = edge;
                    c
                })
                .collect();
            cut_sets[i].clear();
            for c in scored {
                cut_sets[i].insert(c, mode);
            }
        }

        splice_choice_cuts(n, choices, cut_sets, mode);

        let required_here = state.required[i];
        let picked = select_best(aig, n, cut_sets, state, required_here, mode)
            .or_else(|| cut_sets[i].best().cloned());
        if let Some(best) = picked {
            state.arrival[i] = cut_delay(state, &best);
            if !is_delay_pass && state.refs[i] > 0 {
                ref_cut(aig, &best, state);
            }
            state.best[i] = Some(best);
        }
    }
}

/// Recompute required times by a reverse-topological sweep from the
/// primary outputs, subtracting one level per LUT. Non-representative
/// choice members inherit their representative's required time.
fn recompute_required(aig: &Aig, choices: &ChoiceView, state: &mut MapState, depth: u32) {
    let n = aig.num_nodes();
    state.required = vec![u32::MAX; n];
    for &o in aig.outputs() {
        if !o.is_constant() {
            let idx = o.index() as usize;
            state.required[idx] = state.required[idx].min(depth);
        }
    }
    for i in (0..n).rev() {
        let ni = i as u32;
        if aig.is_ci(ni) || !aig.is_alive(ni) {
            continue;
        }
        let req_here = state.required[i];
        if req_here == u32::MAX {
            continue;
        }
        if let Some(c) = &state.best[i] {
            for &leaf in c.leaves() {
                if aig.is_ci(leaf) {
                    continue;
                }
                let candidate = req_here.saturating_sub(1);
                state.required[leaf as usize] = state.required[leaf as usize].min(candidate);
            }
        }
    }
    for i in 0..n {
        let ni = i as u32;
        if aig.is_ci(ni) || !aig.is_alive(ni) {
            continue;
        }
        let r = choices.repr(ni);
        if r != ni {
            state.required[i] = state.required[i].min(state.required[r as usize]);
        }
    }
}

/// Run the full multi-pass selection, returning the chosen cut for every
/// live AND node.
pub fn map_luts(aig: &Aig, choices: &ChoiceView, config: MapConfig) -> LutMapping {
    let n = aig.num_nodes();
    let max_leaves = config.k.min(MAX_CUT_LEAVES);
    let cut_limit = config.cut_limit.min(MAX_CUT_SET_SIZE).max(1);

    let mut cut_sets: Vec<CutSet> = (0..n).map(|_| CutSet::new(cut_limit)).collect();
    let mut state = MapState {
        best: vec![None; n],
        refs: (0..n as u32).map(|i| aig.fanout_size(i)).collect(),
        est_ref: vec![0.0; n],
        arrival: vec![0; n],
        required: vec![u32::MAX; n],
        truth_cache: TruthCache::new(),
    };
    for i in 0..n {
        if aig.is_ci(i as u32) {
            let mut c = unit_cut(i as u32);
            let tt = Lut::nth_var(1, 0).expect("1-input projection exists");
            c.truth_lit = Some(state.truth_cache.insert(tt));
            cut_sets[i].insert(c, SortMode::Delay);
        }
    }

    run_pass(aig, choices, &mut cut_sets, &mut state, max_leaves, SortMode::Delay, true);

    let depth = aig
        .outputs()
        .iter()
        .map(|&o| if o.is_constant() { 0 } else { state.arrival[o.index() as usize] })
        .max()
        .unwrap_or(0);
    recompute_required(aig, choices, &mut state, depth);

    for _ in 0..config.area_flow_passes {
        run_pass(aig, choices, &mut cut_sets, &mut state, max_leaves, SortMode::Flow, false);
        recompute_required(aig, choices, &mut state, depth);
    }
    for _ in 0..config.area_passes {
        run_pass(aig, choices, &mut cut_sets, &mut state, max_leaves, SortMode::Area, false);
        recompute_required(aig, choices, &mut state, depth);
    }

    // Final derivation: dereference all POs, walk reverse
    // topological order, install the reachable best cuts into the mapping.
    let mut leaves = vec![Vec::new(); n];
    let mut truth = vec![None; n];
    let mut seen = HashSet::new();
    let mut stack: Vec<u32> = aig
        .outputs()
        .iter()
        .filter(|o| !o.is_constant())
        .map(|o| choices.repr(o.index()))
        .collect();
    while let Some(ni) = stack.pop() {
        if aig.is_ci(ni) || !seen.insert(ni) {
            continue;
        }
        let idx = ni as usize;
        let Some(cut) = &state.best[idx] else { continue };
        leaves[idx] = cut.leaves().to_vec();
        truth[idx] = cut.truth_lit;
        for &l in cut.leaves() {
            if !aig.is_ci(l) {
                stack.push(choices.repr(l));
            }
        }
    }

    LutMapping {
        leaves,
        truth,
        truth_cache: state.truth_cache,
        arrival: state.arrival,
        required: state.required,
    }
}

/// Whether every primary output is covered by a chosen LUT (or is a CI/constant).
pub fn mapping_is_complete(aig: &Aig, choices: &ChoiceView, mapping: &LutMapping) -> bool {
    aig.outputs().iter().all(|&o| {
        if o.is_constant() {
            return true;
        }
        let r = choices.repr(o.index()) as usize;
        aig.is_ci(o.index()) || !mapping.leaves[r].is_empty()
    })
}

/// Number of LUTs used in the final mapping: one per node reachable from an
/// output through chosen cuts.
pub fn count_luts(aig: &Aig, choices: &ChoiceView, mapping: &LutMapping) -> usize {
    let mut seen = HashSet::new();
    let mut stack: Vec<u32> = aig
        .outputs()
        .iter()
        .filter(|o| !o.is_constant())
        .map(|o| choices.repr(o.index()))
        .collect();
    let mut count = 0;
    while let Some(n) = stack.pop() {
        if aig.is_ci(n) || !seen.insert(n) {
            continue;
        }
        count += 1;
        for &l in &mapping.leaves[n as usize] {
            if !aig.is_ci(l) {
                stack.push(choices.repr(l));
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal;

    #[test]
    fn test_map_nand_xor_fits_in_one_lut() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let f1 = !aig.create_and(a, b);
        let f2 = !aig.create_and(a, f1);
        let f3 = !aig.create_and(b, f1);
        let f4 = !aig.create_and(f2, f3);
        aig.create_po(f4);

        let choices = ChoiceView::identity(&aig);
        let mapping = map_luts(&aig, &choices, MapConfig { k: 6, ..MapConfig::default() });
        assert!(mapping_is_complete(&aig, &choices, &mapping));
        assert_eq!(count_luts(&aig, &choices, &mapping), 1);
    }

    #[test]
    fn test_map_respects_k_input_bound() {
        let mut aig = Aig::new();
        let pis: Vec<Signal> = (0..8).map(|_| aig.create_pi()).collect();
        let mut chain = pis[0];
        for &p in &pis[1..] {
            chain = aig.create_and(chain, p);
        }
        aig.create_po(chain);
        let choices = ChoiceView::identity(&aig);
        let mapping = map_luts(&aig, &choices, MapConfig { k: 4, ..MapConfig::default() });
        for leaves in &mapping.leaves {
            assert!(leaves.len() <= 4);
        }
        assert!(count_luts(&aig, &choices, &mapping) >= 3);
    }

    #[test]
    fn test_map_k2_nand_xor_single_cell() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let f1 = !aig.create_and(a, b);
        let f2 = !aig.create_and(a, f1);
        let f3 = !aig.create_and(b, f1);
        let f4 = !aig.create_and(f2, f3);
        aig.create_po(f4);

        let choices = ChoiceView::identity(&aig);
        let mapping = map_luts(&aig, &choices, MapConfig { k: 2, cut_limit: 8, ..MapConfig::default() });
        assert_eq!(count_luts(&aig, &choices, &mapping), 1);
    }

    #[test]
    fn test_map_splices_choice_cuts() {
        // Two nodes computing the same function via different structure,
        // linked as a choice class; the mapper should be able to use
        // whichever member offers the better cut.
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let x = aig.create_and(a, b);
        aig.create_po(x);
        let mut choices = ChoiceView::identity(&aig);
        // x has no real alternative here; exercise that splicing with an
        // empty class (the common case) leaves the mapping unchanged.
        let _ = &mut choices;
        let mapping = map_luts(&aig, &choices, MapConfig::default());
        assert!(mapping_is_complete(&aig, &choices, &mapping));
    }
}
