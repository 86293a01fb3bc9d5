//! ASCII and binary AIGER I/O.
//!
//! Follows the AIGER literal convention: literal `2i` is "output of variable
//! `i` asserted", `2i+1` is "negated"; gate literals are strictly greater
//! than both their fanin literals, and the binary form delta-encodes
//! `lhs - rhs0` and `rhs0 - rhs1` as 7-bit varints.

use std::io::{self, BufRead, Read, Write};

use crate::aig::Aig;
use crate::signal::Signal;

/// An error while parsing an AIGER file.
#[derive(Debug)]
pub enum AigerError {
    Io(io::Error),
    BadHeader(String),
    BadBody(String),
}

impl std::fmt::Display for AigerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AigerError::Io(e) => write!(f, "I/O error: {e}"),
            AigerError::BadHeader(s) => write!(f, "malformed AIGER header: {s}"),
            AigerError::BadBody(s) => write!(f, "malformed AIGER body: {s}"),
        }
    }
}

impl std::error::Error for AigerError {}

impl From<io::Error> for AigerError {
    fn from(e: io::Error) -> AigerError {
        AigerError::Io(e)
    }
}

struct Header {
    binary: bool,
    max_var: usize,
    num_inputs: usize,
    num_latches: usize,
    num_outputs: usize,
    num_ands: usize,
}

fn parse_header(line: &str) -> Result<Header, AigerError> {
    let mut it = line.split_whitespace();
    let tag = it.next().ok_or_else(|| AigerError::BadHeader("empty header".into()))?;
    let binary = match tag {
        "aag" => false,
        "aig" => true,
        other => return Err(AigerError::BadHeader(format!("unknown tag {other}"))),
    };
    let mut nums = [0usize; 5];
    for n in nums.iter_mut() {
        let tok = it.next().ok_or_else(|| AigerError::BadHeader("truncated header".into()))?;
        *n = tok
            .parse()
            .map_err(|_| AigerError::BadHeader(format!("non-numeric header field {tok}")))?;
    }
    let [max_var, num_inputs, num_latches, num_outputs, num_ands] = nums;
    if num_latches != 0 {
        return Err(AigerError::BadHeader("sequential AIGER files are not supported".into()));
    }
    Ok(Header {
        binary,
        max_var,
        num_inputs,
        num_latches,
        num_outputs,
        num_ands,
    })
}

fn literal_to_signal(pi_and_and_signals: &[Signal], lit: u64) -> Signal {
    if lit < 2 {
        return Signal::new(0, lit == 1);
    }
    let var = (lit / 2) as usize;
    let compl = lit % 2 != 0;
    pi_and_and_signals[var] ^ compl
}

fn read_varint<R: Read>(r: &mut R) -> Result<u64, AigerError> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte).map_err(AigerError::Io)?;
        let b = byte[0];
        result |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

fn write_varint<W: Write>(w: &mut W, mut value: u64) -> io::Result<()> {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            w.write_all(&[byte])?;
            break;
        } else {
            w.write_all(&[byte | 0x80])?;
        }
    }
    Ok(())
}

/// Parse an AIGER file (ASCII `aag` or binary `aig`) into an [`Aig`].
pub fn read_aiger<R: Read>(mut input: R) -> Result<Aig, AigerError> {
    let mut reader = io::BufReader::new(&mut input);
    let mut header_line = String::new();
    reader.read_line(&mut header_line)?;
    let header = parse_header(header_line.trim_end())?;

    let mut aig = Aig::new();
    // slot[var] holds the signal for variable `var`; slot[0] is the constant.
    let mut slot = vec![Signal::zero(); header.max_var + 1];

    for i in 0..header.num_inputs {
        slot[i + 1] = aig.create_pi();
    }

    let mut output_lits = Vec::with_capacity(header.num_outputs);
    if header.binary {
        for _ in 0..header.num_outputs {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            let lit: u64 = line
                .trim()
                .parse()
                .map_err(|_| AigerError::BadBody("non-numeric output literal".into()))?;
            output_lits.push(lit);
        }
        for g in 0..header.num_ands {
            let lhs_var = header.num_inputs + g + 1;
            let delta0 = read_varint(&mut reader)?;
            let delta1 = read_varint(&mut reader)?;
            let lhs_lit = (lhs_var as u64) * 2;
            let rhs0 = lhs_lit.checked_sub(delta0).ok_or_else(|| AigerError::BadBody("underflow in delta0".into()))?;
            let rhs1 = rhs0.checked_sub(delta1).ok_or_else(|| AigerError::BadBody("underflow in delta1".into()))?;
            let s0 = literal_to_signal(&slot, rhs0);
            let s1 = literal_to_signal(&slot, rhs1);
            slot[lhs_var] = aig.create_and(s0, s1);
        }
    } else {
        for i in 0..header.num_inputs {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            let lit: u64 = line
                .trim()
                .parse()
                .map_err(|_| AigerError::BadBody("non-numeric input literal".into()))?;
            if lit != ((i + 1) as u64) * 2 {
                return Err(AigerError::BadBody("ASCII AIGER PI literals must be listed in order".into()));
            }
        }
        for _ in 0..header.num_outputs {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            let lit: u64 = line
                .trim()
                .parse()
                .map_err(|_| AigerError::BadBody("non-numeric output literal".into()))?;
            output_lits.push(lit);
        }
        for g in 0..header.num_ands {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            let mut it = line.trim().split_whitespace();
            let lhs: u64 = it.next().and_then(|t| t.parse().ok()).ok_or_else(|| AigerError::BadBody("missing lhs".into()))?;
            let rhs0: u64 = it.next().and_then(|t| t.parse().ok()).ok_or_else(|| AigerError::BadBody("missing rhs0".into()))?;
            let rhs1: u64 = it.next().and_then(|t| t.parse().ok()).ok_or_else(|| AigerError::BadBody("missing rhs1".into()))?;
            let lhs_var = (lhs / 2) as usize;
            if lhs_var != header.num_inputs + g + 1 {
                return Err(AigerError::BadBody("AND gates must be listed in variable order".into()));
            }
            let s0 = literal_to_signal(&slot, rhs0);
            let s1 = literal_to_signal(&slot, rhs1);
            slot[lhs_var] = aig.create_and(s0, s1);
        }
    }

    for lit in output_lits {
        let s = literal_to_signal(&slot, lit);
        aig.create_po(s);
    }
    Ok(aig)
}

/// Write `aig` out in ASCII AIGER (`aag`) format.
pub fn write_aiger_ascii<W: Write>(mut w: W, aig: &Aig) -> io::Result<()> {
    let gates: Vec<u32> = aig.foreach_gate().collect();
    writeln!(
        w,
        "aag {} {} 0 {} {}",
        aig.num_pis() + gates.len(),
        aig.num_pis(),
        aig.num_pos(),
        gates.len()
    )?;
    for i in 0..aig.num_pis() {
        writeln!(w, "{}", (i + 1) * 2)?;
    }
    for &o in aig.outputs() {
        writeln!(w, "{}", signal_to_literal(o))?;
    }
    for &g in &gates {
        let [c0, c1] = aig.fanins(g);
        writeln!(w, "{} {} {}", g * 2, signal_to_literal(c0), signal_to_literal(c1))?;
    }
    Ok(())
}

/// Write `aig` out in binary AIGER (`aig`) format.
pub fn write_aiger_binary<W: Write>(mut w: W, aig: &Aig) -> io::Result<()> {
    let gates: Vec<u32> = aig.foreach_gate().collect();
    writeln!(
        w,
        "aig {} {} 0 {} {}",
        aig.num_pis() + gates.len(),
        aig.num_pis(),
        aig.num_pos(),
        gates.len()
    )?;
    for &o in aig.outputs() {
        writeln!(w, "{}", signal_to_literal(o))?;
    }
    for &g in &gates {
        let [c0, c1] = aig.fanins(g);
        let lhs_lit = (g as u64) * 2;
        let rhs0 = signal_to_literal(c0);
        let rhs1 = signal_to_literal(c1);
        write_varint(&mut w, lhs_lit - rhs0)?;
        write_varint(&mut w, rhs0 - rhs1)?;
    }
    Ok(())
}

fn signal_to_literal(s: Signal) -> u64 {
    if s.is_constant() {
        s.complement() as u64
    } else {
        (s.index() as u64) * 2 + (s.complement() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_ascii_nand_xor() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let f1 = !aig.create_and(a, b);
        let f2 = !aig.create_and(a, f1);
        let f3 = !aig.create_and(b, f1);
        let f4 = !aig.create_and(f2, f3);
        aig.create_po(f4);

        let mut buf = Vec::new();
        write_aiger_ascii(&mut buf, &aig).unwrap();
        let parsed = read_aiger(&buf[..]).unwrap();
        assert_eq!(parsed.num_pis(), aig.num_pis());
        assert_eq!(parsed.num_pos(), aig.num_pos());
        assert_eq!(parsed.foreach_gate().count(), aig.foreach_gate().count());
    }

    #[test]
    fn test_roundtrip_binary() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let c = aig.create_pi();
        let ab = aig.create_and(a, b);
        let abc = aig.create_and(ab, c);
        aig.create_po(abc);
        aig.create_po(!a);

        let mut buf = Vec::new();
        write_aiger_binary(&mut buf, &aig).unwrap();
        let parsed = read_aiger(&buf[..]).unwrap();
        assert_eq!(parsed.num_pis(), 3);
        assert_eq!(parsed.num_pos(), 2);
        assert_eq!(parsed.foreach_gate().count(), 2);
    }

    #[test]
    fn test_rejects_sequential_header() {
        let text = "aag 3 2 1 1 0\n2\n4\n6\n6\n";
        let err = read_aiger(text.as_bytes()).unwrap_err();
        assert!(matches!(err, AigerError::BadHeader(_)));
    }
}
