//! Verilog netlist writer for a collapsed k-LUT network.
//!
//! Each mapped node becomes a `LUTk` primitive instance with an `INIT`
//! parameter holding its truth table in hex (width `2^k`, `k` the cut's
//! actual leaf count). The AIG core carries no signal names, so every PI/PO
//! is emitted as a scalar `pi<i>`/`po<i>` wire rather than a named bus.

use std::collections::HashSet;
use std::io::{self, Write};

use crate::aig::Aig;
use crate::choice::ChoiceView;
use crate::map::LutMapping;

/// Escape-quote a Verilog identifier if it contains non-alphanumeric
/// characters other than `_`, or starts with a digit.
fn escape_identifier(name: &str) -> String {
    let plain = name.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\\{name} ")
    }
}

fn port_name(prefix: &str, i: usize) -> String {
    format!("{prefix}{i}")
}

fn node_wire(n: u32) -> String {
    format!("n{n}")
}

/// The wire expression for a node reference: a PI port, the constant
/// sentinel node (index 0), or an internal LUT output wire.
fn leaf_wire(aig: &Aig, n: u32) -> String {
    if n == 0 {
        "1'b0".to_string()
    } else if aig.is_ci(n) {
        port_name("pi", n as usize - 1)
    } else {
        node_wire(n)
    }
}

/// Write `aig`'s LUT mapping (rooted at its outputs through `choices`) out as
/// a flat structural Verilog module named `module_name`.
pub fn write_verilog<W: Write>(
    mut w: W,
    aig: &Aig,
    choices: &ChoiceView,
    mapping: &LutMapping,
    module_name: &str,
) -> io::Result<()> {
    let inputs: Vec<String> = (0..aig.num_pis()).map(|i| port_name("pi", i)).collect();
    let outputs: Vec<String> = (0..aig.num_pos()).map(|i| port_name("po", i)).collect();

    write!(w, "module {module_name}(")?;
    let ports: Vec<String> = inputs.iter().chain(outputs.iter()).map(|s| escape_identifier(s)).collect();
    writeln!(w, "{});", ports.join(", "))?;
    for name in &inputs {
        writeln!(w, "  input {};", escape_identifier(name))?;
    }
    for name in &outputs {
        writeln!(w, "  output {};", escape_identifier(name))?;
    }
    writeln!(w)?;

    // Collect every mapped node reachable from the outputs, in any order
    // (each LUT instance only references wires it already depends on, and
    // Verilog nets don't require declaration-before-use ordering).
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<u32> = aig
        .outputs()
        .iter()
        .filter(|o| !o.is_constant())
        .map(|o| choices.repr(o.index()))
        .collect();
    while let Some(n) = stack.pop() {
        if aig.is_ci(n) || !seen.insert(n) {
            continue;
        }
        let idx = n as usize;
        if mapping.leaves[idx].is_empty() {
            continue;
        }
        order.push(n);
        for &l in &mapping.leaves[idx] {
            if !aig.is_ci(l) {
                stack.push(choices.repr(l));
            }
        }
    }

    for &n in &order {
        writeln!(w, "  wire {};", node_wire(n))?;
    }
    writeln!(w)?;

    for &n in &order {
        let idx = n as usize;
        let leaves = &mapping.leaves[idx];
        let k = leaves.len();
        let tt = mapping.truth[idx].map(|lit| mapping.truth_cache.get(lit));
        let init_bits = 1usize << k;
        let hex_digits = (init_bits + 3) / 4;
        let hex = match &tt {
            Some(tt) => {
                let mut bits = 0u64;
                for row in 0..init_bits {
                    if tt.value(row) {
                        bits |= 1 << row;
                    }
                }
                format!("{bits:0width$x}", width = hex_digits)
            }
            None => "0".repeat(hex_digits.max(1)),
        };
        write!(w, "  LUT{k} #(.INIT({init_bits}'h{hex})) u{n} (.O({})", node_wire(n))?;
        for (i, &leaf) in leaves.iter().enumerate() {
            write!(w, ", .I{i}({})", leaf_wire(aig, leaf))?;
        }
        writeln!(w, ");")?;
    }
    writeln!(w)?;

    for (i, &o) in aig.outputs().iter().enumerate() {
        let rhs = if o.is_constant() {
            if o.complement() { "1'b1".to_string() } else { "1'b0".to_string() }
        } else {
            let r = choices.repr(o.index());
            let wire = leaf_wire(aig, r);
            if o.complement() {
                format!("~{wire}")
            } else {
                wire
            }
        };
        writeln!(w, "  assign {} = {rhs};", outputs[i])?;
    }

    writeln!(w, "endmodule")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{map_luts, MapConfig};

    #[test]
    fn test_write_verilog_nand_xor() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let f1 = !aig.create_and(a, b);
        let f2 = !aig.create_and(a, f1);
        let f3 = !aig.create_and(b, f1);
        let f4 = !aig.create_and(f2, f3);
        aig.create_po(f4);

        let choices = ChoiceView::identity(&aig);
        let mapping = map_luts(&aig, &choices, MapConfig::default());

        let mut buf = Vec::new();
        write_verilog(&mut buf, &aig, &choices, &mapping, "top").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("module top("));
        assert!(text.contains("LUT"));
        assert!(text.contains("assign po0"));
    }

    #[test]
    fn test_escape_identifier_quotes_special_chars() {
        assert_eq!(escape_identifier("plain_name"), "plain_name");
        assert_eq!(escape_identifier("has.dot"), "\\has.dot ");
        assert_eq!(escape_identifier("1leading"), "\\1leading ");
    }
}
