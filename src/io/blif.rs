//! Structural BLIF reader/writer for the collapsed k-LUT network.
//!
//! The writer emits one `.names` cover per mapped LUT, computed from its
//! truth table via the same irredundant-SOP machinery the refactorer uses
//! (`crate::isop`). The reader rebuilds an [`Aig`] from `.names` covers the
//! same way: each cover becomes a `build_sop` subgraph over its fanin
//! signals. Latches are rejected, matching the AIGER reader's
//! combinational-only stance.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use volute::Lut;

use crate::aig::Aig;
use crate::choice::ChoiceView;
use crate::isop::{build_sop, isop, Cube};
use crate::map::LutMapping;
use crate::signal::Signal;

/// An error while parsing a BLIF file.
#[derive(Debug)]
pub enum BlifError {
    Io(io::Error),
    Malformed(String),
}

impl std::fmt::Display for BlifError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlifError::Io(e) => write!(f, "I/O error: {e}"),
            BlifError::Malformed(s) => write!(f, "malformed BLIF: {s}"),
        }
    }
}

impl std::error::Error for BlifError {}

impl From<io::Error> for BlifError {
    fn from(e: io::Error) -> BlifError {
        BlifError::Io(e)
    }
}

fn cube_to_chars(cube: &Cube) -> String {
    cube.iter()
        .map(|lit| match lit {
            Some(true) => '1',
            Some(false) => '0',
            None => '-',
        })
        .collect()
}

fn node_net(n: u32) -> String {
    format!("n{n}")
}

/// Write `aig`'s LUT mapping out as a structural BLIF file: one `.model`,
/// `.inputs`/`.outputs` declaration, a `.names` cover per mapped LUT (its
/// cover recomputed from the truth table via [`isop`]), and `.end`.
pub fn write_blif<W: Write>(
    mut w: W,
    aig: &Aig,
    choices: &ChoiceView,
    mapping: &LutMapping,
    model_name: &str,
) -> io::Result<()> {
    writeln!(w, ".model {model_name}")?;
    let inputs: Vec<String> = (0..aig.num_pis()).map(|i| format!("pi{i}")).collect();
    let outputs: Vec<String> = (0..aig.num_pos()).map(|i| format!("po{i}")).collect();
    writeln!(w, ".inputs {}", inputs.join(" "))?;
    writeln!(w, ".outputs {}", outputs.join(" "))?;

    let mut seen = std::collections::HashSet::new();
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
        if mapping.leaves[n as usize].is_empty() {
            continue;
        }
        order.push(n);
        for &l in &mapping.leaves[n as usize] {
            if !aig.is_ci(l) {
                stack.push(choices.repr(l));
            }
        }
    }

    let net_name = |aig: &Aig, n: u32| -> String {
        if n == 0 {
            "$false".to_string()
        } else if aig.is_ci(n) {
            format!("pi{}", n as usize - 1)
        } else {
            node_net(n)
        }
    };

    for &n in &order {
        let leaves = &mapping.leaves[n as usize];
        let k = leaves.len();
        let tt = mapping.truth[n as usize].map(|lit| mapping.truth_cache.get(lit));
        let fanin_names: Vec<String> = leaves.iter().map(|&l| net_name(aig, l)).collect();
        writeln!(w, ".names {} {}", fanin_names.join(" "), node_net(n))?;
        if let Some(tt) = tt {
            for cube in isop(&tt, k) {
                writeln!(w, "{} 1", cube_to_chars(&cube))?;
            }
        }
    }

    for (i, &o) in aig.outputs().iter().enumerate() {
        if o.is_constant() {
            writeln!(w, ".names {}", outputs[i])?;
            writeln!(w, "{}", if o.complement() { "1" } else { "0" })?;
        } else {
            let r = choices.repr(o.index());
            let src = net_name(aig, r);
            if o.complement() {
                writeln!(w, ".names {} {}", src, outputs[i])?;
                writeln!(w, "0 1")?;
            } else {
                writeln!(w, ".names {} {}", src, outputs[i])?;
                writeln!(w, "1 1")?;
            }
        }
    }

    writeln!(w, ".end")?;
    Ok(())
}

enum Statement {
    Model(String),
    Inputs(Vec<String>),
    Outputs(Vec<String>),
    Names { fanins: Vec<String>, output: String, cubes: Vec<(String, bool)> },
    Latch,
    End,
}

fn parse_statements<R: BufRead>(reader: R) -> Result<Vec<Statement>, BlifError> {
    let mut statements = Vec::new();
    let mut pending: Option<(Vec<String>, String, Vec<(String, bool)>)> = None;
    let flush = |pending: &mut Option<(Vec<String>, String, Vec<(String, bool)>)>, out: &mut Vec<Statement>| {
        if let Some((fanins, output, cubes)) = pending.take() {
            out.push(Statement::Names { fanins, output, cubes });
        }
    };

    let mut lines: Vec<String> = Vec::new();
    let mut carry = String::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_end();
        if let Some(stripped) = trimmed.strip_suffix('\\') {
            carry.push_str(stripped);
            continue;
        }
        carry.push_str(trimmed);
        lines.push(std::mem::take(&mut carry));
    }
    if !carry.is_empty() {
        lines.push(carry);
    }

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix(".model") {
            flush(&mut pending, &mut statements);
            statements.push(Statement::Model(rest.trim().to_string()));
        } else if let Some(rest) = line.strip_prefix(".inputs") {
            flush(&mut pending, &mut statements);
            statements.push(Statement::Inputs(rest.split_whitespace().map(str::to_string).collect()));
        } else if let Some(rest) = line.strip_prefix(".outputs") {
            flush(&mut pending, &mut statements);
            statements.push(Statement::Outputs(rest.split_whitespace().map(str::to_string).collect()));
        } else if let Some(rest) = line.strip_prefix(".names") {
            flush(&mut pending, &mut statements);
            let mut toks: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            let output = toks
                .pop()
                .ok_or_else(|| BlifError::Malformed(".names with no nets".into()))?;
            pending = Some((toks, output, Vec::new()));
        } else if line.starts_with(".latch") {
            flush(&mut pending, &mut statements);
            statements.push(Statement::Latch);
        } else if let Some(rest) = line.strip_prefix(".end") {
            let _ = rest;
            flush(&mut pending, &mut statements);
            statements.push(Statement::End);
        } else if line.starts_with('.') {
            // Unsupported directive (.exdc, .clock, ...); ignore.
            flush(&mut pending, &mut statements);
        } else if let Some((_, _, cubes)) = pending.as_mut() {
            let mut toks = line.split_whitespace();
            let cube = toks
                .next()
                .ok_or_else(|| BlifError::Malformed("empty cube line".into()))?;
            let value = toks.next().unwrap_or("1");
            if value != "0" && value != "1" {
                return Err(BlifError::Malformed(format!("unsupported cube output value {value}")));
            }
            cubes.push((cube.to_string(), value == "1"));
        } else {
            return Err(BlifError::Malformed(format!("unexpected line: {line}")));
        }
    }
    flush(&mut pending, &mut statements);
    Ok(statements)
}

fn parse_cube(text: &str, num_vars: usize) -> Result<Cube, BlifError> {
    if text.len() != num_vars {
        return Err(BlifError::Malformed(format!(
            "cube length {} does not match {} fanins",
            text.len(),
            num_vars
        )));
    }
    text.chars()
        .map(|c| match c {
            '1' => Ok(Some(true)),
            '0' => Ok(Some(false)),
            '-' => Ok(None),
            other => Err(BlifError::Malformed(format!("invalid cube literal {other}"))),
        })
        .collect()
}

fn cover_to_lut(cubes: &[(String, bool)], num_vars: usize) -> Result<(Lut, Vec<Cube>), BlifError> {
    let mut on_cubes = Vec::new();
    for (text, on) in cubes {
        if *on {
            on_cubes.push(parse_cube(text, num_vars)?);
        }
    }
    let mut tt = Lut::zero(num_vars);
    for row in 0..(1usize << num_vars) {
        let hits = on_cubes.iter().any(|cube| {
            cube.iter()
                .enumerate()
                .all(|(i, lit)| lit.map(|p| ((row >> i) & 1 != 0) == p).unwrap_or(true))
        });
        if hits {
            tt.set_value(row, true);
        }
    }
    Ok((tt, on_cubes))
}

/// Parse a structural, combinational BLIF file into an [`Aig`]. Sequential
/// constructs (`.latch`) are rejected.
pub fn read_blif<R: BufRead>(reader: R) -> Result<Aig, BlifError> {
    let statements = parse_statements(reader)?;
    let mut aig = Aig::new();
    let mut nets: HashMap<String, Signal> = HashMap::new();
    nets.insert("$false".to_string(), Signal::zero());
    nets.insert("$true".to_string(), Signal::one());

    let mut input_names = Vec::new();
    let mut output_names = Vec::new();
    let mut names_stmts = Vec::new();

    for stmt in statements {
        match stmt {
            Statement::Model(_) | Statement::End => {}
            Statement::Latch => {
                return Err(BlifError::Malformed("sequential BLIF (.latch) is not supported".into()));
            }
            Statement::Inputs(names) => input_names.extend(names),
            Statement::Outputs(names) => output_names.extend(names),
            Statement::Names { fanins, output, cubes } => names_stmts.push((fanins, output, cubes)),
        }
    }

    for name in &input_names {
        nets.insert(name.clone(), aig.create_pi());
    }

    // `.names` statements are emitted by the writer in fanin-before-fanout
    // order; resolve repeatedly until every net is defined so reordered or
    // hand-written files still parse, as long as there is no combinational
    // loop.
    let mut pending = names_stmts;
    while !pending.is_empty() {
        let mut progressed = false;
        let mut next_round = Vec::new();
        for (fanins, output, cubes) in pending {
            if nets.contains_key(&output) {
                continue;
            }
            let resolved: Option<Vec<Signal>> = fanins.iter().map(|f| nets.get(f).copied()).collect();
            let Some(leaves) = resolved else {
                next_round.push((fanins, output, cubes));
                continue;
            };
            let (tt, cover) = cover_to_lut(&cubes, fanins.len())?;
            let sig = if fanins.is_empty() {
                if tt.value(0) { Signal::one() } else { Signal::zero() }
            } else {
                build_sop(&mut aig, &leaves, &cover)
            };
            nets.insert(output, sig);
            progressed = true;
        }
        if !progressed && !next_round.is_empty() {
            return Err(BlifError::Malformed("unresolved .names net (cycle or undefined fanin)".into()));
        }
        pending = next_round;
    }

    for name in &output_names {
        let sig = *nets
            .get(name)
            .ok_or_else(|| BlifError::Malformed(format!("output net {name} is never driven")))?;
        aig.create_po(sig);
    }

    Ok(aig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{map_luts, MapConfig};

    #[test]
    fn test_roundtrip_nand_xor() {
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
        write_blif(&mut buf, &aig, &choices, &mapping, "top").unwrap();
        let parsed = read_blif(&buf[..]).unwrap();
        assert_eq!(parsed.num_pis(), 2);
        assert_eq!(parsed.num_pos(), 1);
    }

    #[test]
    fn test_rejects_latch() {
        let text = ".model seq\n.inputs a\n.outputs b\n.latch a b\n.end\n";
        let err = read_blif(text.as_bytes()).unwrap_err();
        assert!(matches!(err, BlifError::Malformed(_)));
    }

    #[test]
    fn test_parses_and_gate_cover() {
        let text = ".model m\n.inputs a b\n.outputs y\n.names a b y\n11 1\n.end\n";
        let aig = read_blif(text.as_bytes()).unwrap();
        assert_eq!(aig.num_pis(), 2);
        assert_eq!(aig.num_pos(), 1);
        assert_eq!(aig.foreach_gate().count(), 1);
    }
}
