//! Irredundant sum-of-products computation and its reconstruction as an AIG
//! (component I support).
//!
//! Truth tables are handled as plain `u64` row-masks (at most 6 cut inputs,
//! so the row space always fits in 64 bits) rather than through
//! [`volute::Lut`], since the recursive Shannon-cofactor cover construction
//! below only needs row masking, not the richer `Lut` API.

use volute::Lut;

use crate::aig::Aig;
use crate::signal::Signal;

/// One product term: `cube[i] = Some(true)` means variable `i` appears
/// uncomplemented, `Some(false)` complemented, `None` means the variable is
/// not part of this term.
pub type Cube = Vec<Option<bool>>;

fn lut_to_bits(tt: &Lut, num_vars: usize) -> u64 {
    let mut bits = 0u64;
    for row in 0..(1usize << num_vars) {
        if tt.value(row) {
            bits |= 1 << row;
        }
    }
    bits
}

fn cofactor(bits: u64, num_vars: usize, v: usize, polarity: bool) -> u64 {
    let mut out = 0u64;
    for row in 0..(1usize << num_vars) {
        let src = if polarity { row | (1 << v) } else { row & !(1 << v) };
        if bits & (1 << src) != 0 {
            out |= 1 << row;
        }
    }
    out
}

/// All-ones mask over the `2^num_vars`-row space (the constant-1 function).
fn full_mask(num_vars: usize) -> u64 {
    if num_vars >= 6 {
        u64::MAX
    } else {
        (1u64 << (1usize << num_vars)) - 1
    }
}

fn cube_single(v: usize, polarity: bool, num_vars: usize) -> Cube {
    let mut cube = vec![None; num_vars];
    cube[v] = Some(polarity);
    cube
}

/// Recursive Shannon-cofactor irredundant cover, after Minato and Morreale:
/// split on a variable, then cover the two cofactors' symmetric difference
/// separately and their shared minterms once, so no minterm is covered by
/// more than the cubes strictly needed for it.
fn isop_rec(bits: u64, num_vars: usize, vars: &[usize]) -> Vec<Cube> {
    match vars.split_first() {
        None => {
            if bits & 1 != 0 {
                vec![vec![None; num_vars]]
            } else {
                vec![]
            }
        }
        Some((&v, rest)) => {
            let f0 = cofactor(bits, num_vars, v, false);
            let f1 = cofactor(bits, num_vars, v, true);
            if f0 == f1 {
                return isop_rec(f0, num_vars, rest);
            }
            let full = full_mask(num_vars);
            // If a cofactor is the tautology, a bare literal covers it: no
            // need to restrict the other cofactor's cover with `!v`/`v`,
            // since any extra minterms it asserts are already true there.
            if f1 == full {
                let mut cover = vec![cube_single(v, true, num_vars)];
                cover.extend(isop_rec(f0, num_vars, rest));
                return cover;
            }
            if f0 == full {
                let mut cover = vec![cube_single(v, false, num_vars)];
                cover.extend(isop_rec(f1, num_vars, rest));
                return cover;
            }
            let shared = f0 & f1;
            let only1 = f1 & !shared;
            let only0 = f0 & !shared;
            let mut cover = Vec::new();
            for mut cube in isop_rec(only1, num_vars, rest) {
                cube[v] = Some(true);
                cover.push(cube);
            }
            for mut cube in isop_rec(only0, num_vars, rest) {
                cube[v] = Some(false);
                cover.push(cube);
            }
            cover.extend(isop_rec(shared, num_vars, rest));
            cover
        }
    }
}

/// Compute an irredundant sum-of-products cover for `tt` (a `num_vars`-input
/// truth table).
pub fn isop(tt: &Lut, num_vars: usize) -> Vec<Cube> {
    let bits = lut_to_bits(tt, num_vars);
    let vars: Vec<usize> = (0..num_vars).collect();
    isop_rec(bits, num_vars, &vars)
}

/// Rebuild `cover` as an AIG: each cube becomes an AND of literals, and the
/// cubes are OR-ed together via De Morgan (`a | b == !(!a & !b)`). This is
/// the fallback reconstruction used when no literal appears often enough in
/// `cover` for algebraic factoring to help; see [`factor_cover`] for the
/// general path.
pub fn build_sop(aig: &mut Aig, leaves: &[Signal], cover: &[Cube]) -> Signal {
    if cover.is_empty() {
        return Signal::zero();
    }
    let products: Vec<Signal> = cover
        .iter()
        .map(|cube| build_cube(aig, leaves, cube))
        .collect();
    or_all(aig, &products)
}

fn build_cube(aig: &mut Aig, leaves: &[Signal], cube: &Cube) -> Signal {
    let mut acc = Signal::one();
    for (i, lit) in cube.iter().enumerate() {
        if let Some(polarity) = lit {
            let literal = leaves[i] ^ !polarity;
            acc = aig.create_and(acc, literal);
        }
    }
    acc
}

fn or_all(aig: &mut Aig, terms: &[Signal]) -> Signal {
    let mut acc = Signal::zero();
    for &t in terms {
        acc = !aig.create_and(!acc, !t);
    }
    acc
}

/// Count how many cubes of `cover` carry each literal, indexed `[var][0 =
/// complemented, 1 = uncomplemented]`.
fn literal_counts(cover: &[Cube], num_vars: usize) -> Vec<[usize; 2]> {
    let mut counts = vec![[0usize; 2]; num_vars];
    for cube in cover {
        for (i, lit) in cube.iter().enumerate() {
            if let Some(polarity) = lit {
                counts[i][*polarity as usize] += 1;
            }
        }
    }
    counts
}

/// Pick the literal appearing in the most cubes, provided it appears in at
/// least two (a literal used once can never be factored out of anything).
/// This is the single-cube-divisor special case of Brayton and Rudell's
/// quick factoring: a cheap stand-in for full kernel extraction that still
/// pulls out the common literal in sum-of-products like `a.b + a.c`.
fn best_literal(cover: &[Cube], num_vars: usize) -> Option<(usize, bool)> {
    let counts = literal_counts(cover, num_vars);
    let mut best: Option<(usize, bool, usize)> = None;
    for (v, count) in counts.iter().enumerate() {
        for (polarity_idx, &n) in count.iter().enumerate() {
            if n < 2 {
                continue;
            }
            if best.map(|(_, _, best_n)| n > best_n).unwrap_or(true) {
                best = Some((v, polarity_idx != 0, n));
            }
        }
    }
    best.map(|(v, p, _)| (v, p))
}

/// Algebraic division of `cover` by the single-literal divisor `(var,
/// polarity)`: every cube carrying that literal drops it and joins the
/// quotient, every other cube is left behind as the remainder.
fn divide_by_literal(cover: &[Cube], var: usize, polarity: bool) -> (Vec<Cube>, Vec<Cube>) {
    let mut quotient = Vec::new();
    let mut remainder = Vec::new();
    for cube in cover {
        if cube[var] == Some(polarity) {
            let mut reduced = cube.clone();
            reduced[var] = None;
            quotient.push(reduced);
        } else {
            remainder.push(cube.clone());
        }
    }
    (quotient, remainder)
}

/// Logic-level upper bound of the AND/OR tree [`factor_cover`] would build
/// for `cover`: each product's literal count sets an AND-chain depth, and
/// covers with more than one cube add one more level for the final OR. Not
/// exact (factoring can do better than the flat chain this assumes), but a
/// safe bound for depth-preserving acceptance gates.
pub(crate) fn cover_depth(cover: &[Cube]) -> u32 {
    if cover.is_empty() {
        return 0;
    }
    let max_literals = cover
        .iter()
        .map(|cube| cube.iter().filter(|l| l.is_some()).count())
        .max()
        .unwrap_or(0);
    let and_chain = max_literals.saturating_sub(1) as u32;
    let or_chain = if cover.len() > 1 { (cover.len() - 1) as u32 } else { 0 };
    and_chain + or_chain
}

/// Rebuild `cover` as a factored AND/OR tree rather than a flat two-level
/// sum-of-products, following the literal-factoring scheme of Brayton and
/// Rudell: repeatedly pull the most common literal out as a divisor, factor
/// the quotient and remainder recursively, and recombine as `literal &
/// quotient | remainder`. Produces literal-minimal forms such as `a.b + a.c
/// -> a & (b | c)` instead of `build_sop`'s flat two-level expansion.
pub fn factor_cover(aig: &mut Aig, leaves: &[Signal], cover: &[Cube], num_vars: usize) -> Signal {
    if cover.is_empty() {
        return Signal::zero();
    }
    if cover.len() == 1 {
        return build_cube(aig, leaves, &cover[0]);
    }
    match best_literal(cover, num_vars) {
        None => build_sop(aig, leaves, cover),
        Some((var, polarity)) => {
            let (quotient, remainder) = divide_by_literal(cover, var, polarity);
            let literal_sig = leaves[var] ^ !polarity;
            let quotient_sig = factor_cover(aig, leaves, &quotient, num_vars);
            let term = aig.create_and(literal_sig, quotient_sig);
            if remainder.is_empty() {
                term
            } else {
                let remainder_sig = factor_cover(aig, leaves, &remainder, num_vars);
                or_all(aig, &[term, remainder_sig])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isop_of_and_is_single_cube() {
        let and2 = Lut::from_hex_string(2, "8").unwrap();
        let cover = isop(&and2, 2);
        assert_eq!(cover.len(), 1);
        assert_eq!(cover[0], vec![Some(true), Some(true)]);
    }

    #[test]
    fn test_isop_of_or_has_two_cubes() {
        let or2 = Lut::from_hex_string(2, "e").unwrap();
        let cover = isop(&or2, 2);
        assert_eq!(cover.len(), 2);
    }

    #[test]
    fn test_isop_of_ab_plus_ac_is_minimal() {
        // f(a,b,c) = a&b | a&c, row order LSB-first (a=bit0, b=bit1, c=bit2).
        let tt = Lut::from_hex_string(3, "a8").unwrap();
        let cover = isop(&tt, 3);
        // The minimal irredundant cover is exactly {a.b, a.c}: two 2-literal
        // cubes, never a 3-literal cube like the naive a.!b.c split.
        assert_eq!(cover.len(), 2);
        for cube in &cover {
            assert_eq!(cube.iter().filter(|l| l.is_some()).count(), 2);
            assert_eq!(cube[0], Some(true));
        }
    }

    #[test]
    fn test_build_sop_reconstructs_and() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let and2 = Lut::from_hex_string(2, "8").unwrap();
        let cover = isop(&and2, 2);
        let built = build_sop(&mut aig, &[a, b], &cover);
        assert_eq!(built, aig.create_and(a, b));
    }

    #[test]
    fn test_build_sop_reconstructs_maj3() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let c = aig.create_pi();
        let maj3 = Lut::from_hex_string(3, "e8").unwrap();
        let cover = isop(&maj3, 3);
        let built = build_sop(&mut aig, &[a, b, c], &cover);

        let ab = aig.create_and(a, b);
        let bc = aig.create_and(b, c);
        let ac = aig.create_and(a, c);
        let expected = !aig.create_and(!aig.create_and(!ab, !bc), !ac);
        assert_eq!(built, expected);
    }

    #[test]
    fn test_factor_cover_of_ab_plus_ac_is_and_of_or() {
        let tt = Lut::from_hex_string(3, "a8").unwrap();
        let cover = isop(&tt, 3);

        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let c = aig.create_pi();
        let built = factor_cover(&mut aig, &[a, b, c], &cover, 3);

        // a & (b | c), i.e. a & !(!b & !c).
        let b_or_c = !aig.create_and(!b, !c);
        let expected = aig.create_and(a, b_or_c);
        assert_eq!(built, expected);
        // Only two AND nodes (!b&!c and a&(...)); build_sop's flat expansion
        // of the same cover needs three (a.b, a.c, and their De Morgan OR).
        assert_eq!(aig.foreach_gate().count(), 2);
    }

    #[test]
    fn test_factor_cover_falls_back_without_shared_literal() {
        // f = a^b (no literal appears twice), so factor_cover must match
        // build_sop's flat expansion exactly.
        let tt = Lut::from_hex_string(2, "6").unwrap();
        let cover = isop(&tt, 2);

        let mut aig_factored = Aig::new();
        let a1 = aig_factored.create_pi();
        let b1 = aig_factored.create_pi();
        let factored = factor_cover(&mut aig_factored, &[a1, b1], &cover, 2);

        let mut aig_flat = Aig::new();
        let a2 = aig_flat.create_pi();
        let b2 = aig_flat.create_pi();
        let flat = build_sop(&mut aig_flat, &[a2, b2], &cover);

        assert_eq!(aig_factored.foreach_gate().count(), aig_flat.foreach_gate().count());
        assert_eq!(factored.complement(), flat.complement());
    }
}
