//! Network statistics (`print_stats`; ambient reporting used across commands).

use std::fmt;

use crate::aig::Aig;
use crate::choice::ChoiceView;

/// A snapshot of size/shape statistics for an AIG.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stats {
    pub num_pis: usize,
    pub num_pos: usize,
    pub num_ands: usize,
    pub max_level: u32,
    pub num_choice_classes: usize,
}

fn levels_of(aig: &Aig) -> Vec<u32> {
    let mut levels = vec![0u32; aig.num_nodes()];
    for n in aig.foreach_gate() {
        let [c0, c1] = aig.fanins(n);
        let l0 = if c0.is_constant() { 0 } else { levels[c0.index() as usize] };
        let l1 = if c1.is_constant() { 0 } else { levels[c1.index() as usize] };
        levels[n as usize] = 1 + l0.max(l1);
    }
    levels
}

/// Compute size/shape statistics for `aig`, optionally over a choice view.
pub fn compute_stats(aig: &Aig, choices: Option<&ChoiceView>) -> Stats {
    let levels = levels_of(aig);
    let max_level = aig
        .outputs()
        .iter()
        .filter(|o| !o.is_constant())
        .map(|o| levels[o.index() as usize])
        .max()
        .unwrap_or(0);

    Stats {
        num_pis: aig.num_pis(),
        num_pos: aig.num_pos(),
        num_ands: aig.foreach_gate().count(),
        max_level,
        num_choice_classes: choices.map(|c| c.num_nontrivial_classes()).unwrap_or(0),
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "inputs   = {}", self.num_pis)?;
        writeln!(f, "outputs  = {}", self.num_pos)?;
        writeln!(f, "ands     = {}", self.num_ands)?;
        writeln!(f, "level    = {}", self.max_level)?;
        if self.num_choice_classes > 0 {
            writeln!(f, "choices  = {}", self.num_choice_classes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_of_nand_xor() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let f1 = !aig.create_and(a, b);
        let f2 = !aig.create_and(a, f1);
        let f3 = !aig.create_and(b, f1);
        let f4 = !aig.create_and(f2, f3);
        aig.create_po(f4);

        let stats = compute_stats(&aig, None);
        assert_eq!(stats.num_pis, 2);
        assert_eq!(stats.num_pos, 1);
        assert_eq!(stats.num_ands, 4);
        assert_eq!(stats.max_level, 3);
        assert_eq!(stats.num_choice_classes, 0);
    }
}
