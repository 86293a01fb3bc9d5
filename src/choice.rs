//! AIG-with-choices view (component E).
//!
//! Choices are stored outside the core [`Aig`](crate::aig::Aig): a
//! representative array `repr[n]` maps each node to the canonical member of
//! its equivalence class (itself, if it has no choices), and `equiv[n]`
//! threads a singly-linked list of the other class members. Exactly one
//! member of a class is ever "chosen" for mapping; the rest stay alive only
//! because of the choice links, not ordinary fanout.

use crate::aig::Aig;
use crate::signal::Signal;

/// An AIG-with-choices overlay.
#[derive(Clone, Debug)]
pub struct ChoiceView {
    /// `repr[n]` is the representative node index of `n`'s equivalence class.
    repr: Vec<u32>,
    /// `equiv[n]` is the next member of `n`'s class (`u32::MAX` if none), with
    /// the representative first.
    equiv: Vec<u32>,
}

impl ChoiceView {
    /// Build a choice-free view: every node is its own class of one.
    pub fn identity(aig: &Aig) -> ChoiceView {
        let n = aig.num_nodes();
        ChoiceView {
            repr: (0..n as u32).collect(),
            equiv: vec![u32::MAX; n],
        }
    }

    fn grow(&mut self, n: usize) {
        while self.repr.len() < n {
            let idx = self.repr.len() as u32;
            self.repr.push(idx);
            self.equiv.push(u32::MAX);
        }
    }

    /// The representative of `n`'s class.
    pub fn repr(&self, n: u32) -> u32 {
        self.repr[n as usize]
    }

    /// Whether `n` is the representative of its own class.
    pub fn is_repr(&self, n: u32) -> bool {
        self.repr(n) == n
    }

    /// Iterate the members of `n`'s class, starting at the representative.
    pub fn class_members(&self, n: u32) -> impl Iterator<Item = u32> + '_ {
        let start = self.repr(n);
        ChoiceIter {
            view: self,
            cur: Some(start),
        }
    }

    /// Add `member` to `repr`'s equivalence class.
    ///
    /// `repr` must already be a representative (its own); `member` must not
    /// already belong to any non-trivial class, and must not be reachable
    /// from `repr` through the existing AIG structure (no combinational
    /// loop through the choice), which the caller is expected to have
    /// checked via structural reachability before adding the edge.
    pub fn add_choice(&mut self, repr: u32, member: u32) {
        let n = (repr.max(member) + 1) as usize;
        self.grow(n);
        debug_assert!(self.is_repr(repr), "can only add to a representative's class");
        debug_assert_ne!(repr, member);
        debug_assert!(
            self.is_repr(member),
            "member must not already belong to another class"
        );
        self.equiv[member as usize] = self.equiv[repr as usize];
        self.equiv[repr as usize] = member;
        self.repr[member as usize] = repr;
    }

    /// Number of classes with more than one member.
    pub fn num_nontrivial_classes(&self) -> usize {
        (0..self.repr.len() as u32)
            .filter(|&n| self.is_repr(n) && self.class_members(n).nth(1).is_some())
            .count()
    }
}

struct ChoiceIter<'a> {
    view: &'a ChoiceView,
    cur: Option<u32>,
}

impl<'a> Iterator for ChoiceIter<'a> {
    type Item = u32;
    fn next(&mut self) -> Option<u32> {
        let cur = self.cur?;
        self.cur = match self.view.equiv[cur as usize] {
            u32::MAX => None,
            next => Some(next),
        };
        Some(cur)
    }
}

/// Recognize whether node `n` of `aig` implements `sel ? a : b` (a 2:1 mux),
/// returning `(sel, a, b)` if so. Used by the rewriter/refactorer to avoid
/// destroying MUX structure that balancing or NPN rewriting would otherwise
/// obscure.
pub fn recognize_mux(aig: &Aig, n: u32) -> Option<(Signal, Signal, Signal)> {
    if aig.is_ci(n) {
        return None;
    }
    let [c0, c1] = aig.fanins(n);
    if !c0.complement() || !c1.complement() {
        return None;
    }
    if aig.is_ci(c0.index()) || aig.is_ci(c1.index()) {
        return None;
    }
    let [a0, a1] = aig.fanins(c0.index());
    let [b0, b1] = aig.fanins(c1.index());
    for (sa, pa) in [(a0, a1), (a1, a0)] {
        for (sb, pb) in [(b0, b1), (b1, b0)] {
            if sa == !sb {
                return Some((sa, !pa, !pb));
            }
        }
    }
    None
}

/// Depth-first duplication of the cone rooted at `s` (following only the
/// chosen representative at each node) into `dst`, memoized by a scratch map
/// so shared subgraphs are only built once.
pub fn dup_dfs(
    src: &Aig,
    choices: &ChoiceView,
    dst: &mut Aig,
    memo: &mut std::collections::HashMap<u32, Signal>,
    s: Signal,
) -> Signal {
    if s.is_constant() {
        return s;
    }
    let root = choices.repr(s.index());
    if let Some(&cached) = memo.get(&root) {
        return cached ^ s.complement();
    }
    if src.is_ci(root) {
        let sig = Signal::new(root, false);
        memo.insert(root, sig);
        return sig ^ s.complement();
    }
    let [c0, c1] = src.fanins(root);
    let d0 = dup_dfs(src, choices, dst, memo, c0);
    let d1 = dup_dfs(src, choices, dst, memo, c1);
    let built = dst.create_and(d0, d1);
    memo.insert(root, built);
    built ^ s.complement()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_view_has_no_nontrivial_classes() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let _ = aig.create_and(a, b);
        let view = ChoiceView::identity(&aig);
        assert_eq!(view.num_nontrivial_classes(), 0);
        assert!(view.is_repr(a.index()));
    }

    #[test]
    fn test_add_choice_links_class() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let c = aig.create_pi();
        let x = aig.create_and(a, b);
        let y = aig.create_and(b, c);
        let mut view = ChoiceView::identity(&aig);
        view.add_choice(x.index(), y.index());
        assert_eq!(view.repr(y.index()), x.index());
        let members: Vec<u32> = view.class_members(x.index()).collect();
        assert_eq!(members, vec![x.index(), y.index()]);
        assert_eq!(view.num_nontrivial_classes(), 1);
    }

    #[test]
    fn test_recognize_mux() {
        let mut aig = Aig::new();
        let s = aig.create_pi();
        let a = aig.create_pi();
        let b = aig.create_pi();
        // mux = !( !(s & a) & !(!s & b) )
        let t = !aig.create_and(s, a);
        let e = !aig.create_and(!s, b);
        let mux = !aig.create_and(t, e);
        let recognized = recognize_mux(&aig, mux.index());
        assert!(recognized.is_some());
    }

    #[test]
    fn test_dup_dfs_shares_subgraph() {
        let mut src = Aig::new();
        let a = src.create_pi();
        let b = src.create_pi();
        let x = src.create_and(a, b);
        let y = src.create_and(x, !x);
        let choices = ChoiceView::identity(&src);
        let mut dst = Aig::new();
        let pa = dst.create_pi();
        let pb = dst.create_pi();
        let mut memo = std::collections::HashMap::new();
        memo.insert(a.index(), pa);
        memo.insert(b.index(), pb);
        let result = dup_dfs(&src, &choices, &mut dst, &mut memo, y);
        assert_eq!(result, Signal::zero());
    }
}
