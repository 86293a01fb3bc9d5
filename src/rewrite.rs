//! NPN-database-driven rewriting (component H).
//!
//! For every AND node, enumerate its priority cuts up to 4 leaves, look up
//! the cut's truth table in the precompiled [`npn`](crate::npn) database,
//! and replace the node's cone with the database subgraph if doing so does
//! not increase the node's level (unless `use_zero_gain` allows equal-cost
//! replacements) and does not increase the total node count.

use crate::aig::Aig;
use crate::cut::Cut;
use crate::cut_enum::{enumerate_cuts, CutEnumConfig};
use crate::isop::{cover_depth, factor_cover, isop};
use crate::npn::{instantiate, lookup, npn_canonical};
use crate::signal::Signal;
use crate::truth::TruthCache;

/// Parameters for one rewriting pass.
#[derive(Clone, Copy, Debug)]
pub struct RewriteConfig {
    /// Maximum cuts kept per node while searching for candidates.
    pub cut_limit: usize,
    /// Accept same-size (zero-gain) replacements, not just strict improvements.
    pub use_zero_gain: bool,
    /// Refuse any replacement that increases the node's logic level.
    pub preserve_depth: bool,
}

impl Default for RewriteConfig {
    fn default() -> RewriteConfig {
        RewriteConfig {
            cut_limit: 8,
            use_zero_gain: false,
            preserve_depth: true,
        }
    }
}

/// Count the nodes exclusively used by `root`'s cone within `leaves` — its
/// maximum fanout-free cone (MFFC) bounded by the cut.
fn mffc_size(aig: &Aig, root: u32, leaves: &[u32]) -> usize {
    let mut count = 0usize;
    let mut stack = vec![root];
    let mut seen = std::collections::HashSet::new();
    while let Some(n) = stack.pop() {
        if leaves.contains(&n) || !seen.insert(n) {
            continue;
        }
        if aig.is_ci(n) {
            continue;
        }
        count += 1;
        let [c0, c1] = aig.fanins(n);
        for c in [c0, c1] {
            if !c.is_constant() && aig.fanout_size(c.index()) == 1 {
                stack.push(c.index());
            }
        }
    }
    count
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

/// Run one rewriting pass over `aig`, returning the number of nodes replaced.
pub fn rewrite(aig: &mut Aig, config: RewriteConfig) -> usize {
    let mut replaced = 0;
    let mut levels = compute_levels(aig);
    let enum_config = CutEnumConfig {
        max_leaves: 4,
        max_cuts: config.cut_limit,
        compute_truth: true,
    };

    let gates: Vec<u32> = aig.foreach_gate().collect();
    for root in gates {
        if !aig.is_alive(root) || aig.fanout_size(root) == 0 {
            continue;
        }
        let result = enumerate_cuts(aig, enum_config);
        let Some(repl) = find_best_replacement(aig, &result.cut_sets[root as usize].cuts(), &result.truth_cache, root, &levels, &config)
        else {
            continue;
        };
        let (leaves, new_root_sig) = repl;
        if new_root_sig.index() == root {
            continue;
        }
        aig.substitute_node(root, new_root_sig);
        replaced += 1;
        let _ = leaves;
        levels = compute_levels(aig);
    }
    replaced
}

/// Outcome of having picked a best candidate for a cut: either the precompiled
/// database had a matching recipe, or the cut's function fell outside the
/// curated NPN classes and was synthesized on the fly.
#[derive(Clone, Copy)]
enum Method {
    Recipe,
    Generic,
}

fn find_best_replacement(
    aig: &mut Aig,
    cuts: &[Cut],
    truth_cache: &TruthCache,
    root: u32,
    levels: &[u32],
    config: &RewriteConfig,
) -> Option<(Vec<u32>, Signal)> {
    let mut best: Option<(i64, Vec<u32>, Signal, Method)> = None;
    for cut in cuts {
        if cut.size() < 2 || cut.size() > 4 {
            continue;
        }
        let Some(truth_lit) = cut.truth_lit else { continue };
        let tt = truth_cache.get(truth_lit);
        let leaves: Vec<Signal> = cut.leaves().iter().map(|&l| Signal::new(l, false)).collect();
        let cut_level = leaves.iter().map(|&l| node_level(levels, l)).max().unwrap_or(0);
        let old_nodes = mffc_size(aig, root, cut.leaves());

        let transform = npn_canonical(&tt, cut.size());
        let candidate = if let Some(recipe) = lookup(&transform, cut.size()) {
            let mut scratch = aig.clone();
            let built = instantiate(&mut scratch, recipe, &leaves, &transform);
            let new_nodes = scratch.num_nodes() - aig.num_nodes();
            let new_level = cut_level + recipe_depth(recipe);
            (built, new_nodes, new_level, Method::Recipe)
        } else {
            // No curated recipe for this NPN class: fall back to general
            // ISOP-and-factor synthesis, which realizes any function, not
            // just the database's representative subset.
            let cover_pos = isop(&tt, cut.size());
            let cover_neg = isop(&!tt.clone(), cut.size());
            let (cover, negate) = if cover_neg.len() < cover_pos.len() { (cover_neg, true) } else { (cover_pos, false) };
            let mut scratch = aig.clone();
            let built = factor_cover(&mut scratch, &leaves, &cover, cut.size()) ^ negate;
            let new_nodes = scratch.num_nodes() - aig.num_nodes();
            let new_level = cut_level + cover_depth(&cover);
            (built, new_nodes, new_level, Method::Generic)
        };
        let (built, new_nodes, new_level, method) = candidate;

        if config.preserve_depth && new_level > levels[root as usize] {
            continue;
        }

        let gain = old_nodes as i64 - new_nodes as i64;
        if gain < 0 || (gain == 0 && !config.use_zero_gain) {
            continue;
        }
        if best.as_ref().map(|(g, _, _, _)| gain > *g).unwrap_or(true) {
            best = Some((gain, cut.leaves().to_vec(), built, method));
        }
    }
    best.map(|(_, leaves, built, method)| {
        let rebuilt_in_real_aig = reinstantiate_best(aig, &leaves, root, method);
        (leaves, rebuilt_in_real_aig.unwrap_or(built))
    })
}

/// Recipes (and generic covers) are small; reinstantiate the winning
/// candidate directly in `aig` rather than trying to splice the scratch
/// clone's nodes back in.
fn reinstantiate_best(aig: &mut Aig, leaves: &[u32], root: u32, method: Method) -> Option<Signal> {
    let leaf_sigs: Vec<Signal> = leaves.iter().map(|&l| Signal::new(l, false)).collect();
    let result = enumerate_cuts(aig, CutEnumConfig {
        max_leaves: 4,
        max_cuts: 8,
        compute_truth: true,
    });
    let cut = result.cut_sets[root as usize]
        .cuts()
        .iter()
        .find(|c| c.leaves() == leaves)?;
    let truth_lit = cut.truth_lit?;
    let tt = result.truth_cache.get(truth_lit);
    match method {
        Method::Recipe => {
            let transform = npn_canonical(&tt, cut.size());
            let recipe = lookup(&transform, cut.size())?;
            Some(instantiate(aig, recipe, &leaf_sigs, &transform))
        }
        Method::Generic => {
            let cover_pos = isop(&tt, cut.size());
            let cover_neg = isop(&!tt.clone(), cut.size());
            let (cover, negate) = if cover_neg.len() < cover_pos.len() { (cover_neg, true) } else { (cover_pos, false) };
            Some(factor_cover(aig, &leaf_sigs, &cover, cut.size()) ^ negate)
        }
    }
}

fn recipe_depth(recipe: &crate::npn::Recipe) -> u32 {
    recipe.steps.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_replaces_demorgan_and_with_direct_and() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        // build AND(a,b) the expensive way: !(!a | !b) = !(!(!a | !b))... use a 3-AND chain instead
        let t1 = aig.create_and(a, b);
        let t2 = aig.create_and(t1, Signal::one());
        aig.create_po(t2);
        let before = aig.foreach_gate().count();
        rewrite(&mut aig, RewriteConfig::default());
        let after = aig.foreach_gate().count();
        assert!(after <= before);
    }

    /// Evaluate the AIG's sole PO by substituting every PI with a constant
    /// drawn from `bits` (PI `i` takes bit `i`).
    fn eval_po0(aig: &Aig, pis: &[Signal], bits: u8) -> bool {
        let mut scratch = aig.clone();
        let subs: Vec<(u32, Signal)> = pis
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let v = (bits >> i) & 1 != 0;
                (p.index(), if v { Signal::one() } else { Signal::zero() })
            })
            .collect();
        scratch.substitute_nodes(&subs);
        let out = scratch.po(0);
        assert!(out.is_constant(), "fully-constant-assigned AIG must collapse to a constant");
        out.complement()
    }

    /// A 4-input function outside the curated NPN database (an AND-OR pair
    /// over disjoint variables, `(a&b)|(c&d)`), built inefficiently through a
    /// redundant consensus term so the rewriter's generic ISOP/factor
    /// fallback has something to remove. Confirms that falling through the
    /// database (no recipe matches this class) still rewrites correctly.
    #[test]
    fn test_rewrite_falls_back_to_generic_synthesis_for_uncatalogued_function() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let c = aig.create_pi();
        let d = aig.create_pi();
        let ab = aig.create_and(a, b);
        let cd = aig.create_and(c, d);
        let abc = aig.create_and(ab, c);
        let abcd = aig.create_and(abc, d);
        let t1 = !aig.create_and(!ab, !cd);
        let f = !aig.create_and(!t1, !abcd);
        aig.create_po(f);

        let pis = [a, b, c, d];
        let before = aig.foreach_gate().count();
        rewrite(&mut aig, RewriteConfig::default());
        let after = aig.foreach_gate().count();
        assert!(after <= before);
        for bits in 0..16u8 {
            let av = bits & 1 != 0;
            let bv = (bits >> 1) & 1 != 0;
            let cv = (bits >> 2) & 1 != 0;
            let dv = (bits >> 3) & 1 != 0;
            let expected = (av && bv) || (cv && dv);
            assert_eq!(eval_po0(&aig, &pis, bits), expected, "inputs bits={bits:#06b}");
        }
    }
}
