//! GraphViz DOT writer for visualizing an AIG's gate structure.

use std::io::{self, Write};

use crate::aig::Aig;
use crate::signal::Signal;

fn edge_style(s: Signal) -> &'static str {
    if s.complement() {
        "[style=dashed]"
    } else {
        ""
    }
}

/// Write `aig` as a DOT graph: PIs as boxes, AND gates as circles, POs as
/// diamonds, with dashed edges for complemented fanins.
pub fn write_dot<W: Write>(mut w: W, aig: &Aig) -> io::Result<()> {
    writeln!(w, "digraph aig {{")?;
    writeln!(w, "  rankdir=BT;")?;

    for i in 0..aig.num_pis() {
        let pi = aig.pi(i);
        writeln!(w, "  n{} [shape=box, label=\"pi{}\"];", pi.index(), i)?;
    }
    for n in aig.foreach_gate() {
        writeln!(w, "  n{n} [shape=circle, label=\"{n}\"];")?;
    }
    for n in aig.foreach_gate() {
        let [c0, c1] = aig.fanins(n);
        for c in [c0, c1] {
            if c.is_constant() {
                writeln!(w, "  const_{n} [shape=point];")?;
                writeln!(w, "  const_{n} -> n{n} {};", edge_style(c))?;
            } else {
                writeln!(w, "  n{} -> n{n} {};", c.index(), edge_style(c))?;
            }
        }
    }
    for (i, &o) in aig.outputs().iter().enumerate() {
        writeln!(w, "  po{i} [shape=diamond, label=\"po{i}\"];")?;
        if o.is_constant() {
            writeln!(w, "  const_po{i} [shape=point];")?;
            writeln!(w, "  const_po{i} -> po{i} {};", edge_style(o))?;
        } else {
            writeln!(w, "  n{} -> po{i} {};", o.index(), edge_style(o))?;
        }
    }
    writeln!(w, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_dot_contains_nodes_and_edges() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let and = aig.create_and(a, !b);
        aig.create_po(and);

        let mut buf = Vec::new();
        write_dot(&mut buf, &aig).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("digraph aig {"));
        assert!(text.contains("shape=box"));
        assert!(text.contains("shape=diamond"));
        assert!(text.contains("style=dashed"));
    }
}
