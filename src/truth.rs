//! Global interning of truth tables (component B).
//!
//! Tables are stored only in "normal" form (the all-zero-input value is 0);
//! `insert` strips the complement out and returns a packed literal
//! `2*index + was_complemented`, mirroring how [`Signal`](crate::signal::Signal)
//! packs a node index and an inversion bit. The backing vector is append-only,
//! so a literal remains valid for the whole lifetime of the cache.

use volute::Lut;

/// Interning cache for Boolean function truth tables.
#[derive(Clone, Debug, Default)]
pub struct TruthCache {
    tables: Vec<Lut>,
}

/// Whether a truth table's value on the all-zero input row is 1.
///
/// The all-zero row is bit 0 of the table, which is exactly `tt.low_bit()`
/// in the minterm ordering `volute::Lut` uses internally.
fn is_complemented(tt: &Lut) -> bool {
    tt.value(0)
}

impl TruthCache {
    /// An empty cache.
    pub fn new() -> TruthCache {
        TruthCache { tables: Vec::new() }
    }

    /// Intern a truth table, returning its packed literal.
    ///
    /// Equivalent tables (including ones differing only by global
    /// complementation) share the same index; `insert` is idempotent up to
    /// complementation: `cache.get(cache.insert(tt)) == tt`.
    pub fn insert(&mut self, tt: Lut) -> u32 {
        let comp = is_complemented(&tt);
        let normal = if comp { !tt.clone() } else { tt };
        for (i, existing) in self.tables.iter().enumerate() {
            if *existing == normal {
                return 2 * (i as u32) + (comp as u32);
            }
        }
        let idx = self.tables.len() as u32;
        self.tables.push(normal);
        2 * idx + (comp as u32)
    }

    /// Reconstruct the truth table for a packed literal.
    pub fn get(&self, literal: u32) -> Lut {
        let idx = (literal >> 1) as usize;
        let comp = literal & 1 != 0;
        let tt = self.tables[idx].clone();
        if comp {
            !tt
        } else {
            tt
        }
    }

    /// Number of distinct normal-form tables interned so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the cache holds no table yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volute::Lut;

    #[test]
    fn test_insert_roundtrip() {
        let mut cache = TruthCache::new();
        let and2 = Lut::from_hex_string(2, "8").unwrap();
        let lit = cache.insert(and2.clone());
        assert_eq!(cache.get(lit), and2);
    }

    #[test]
    fn test_insert_dedups_complement() {
        let mut cache = TruthCache::new();
        let and2 = Lut::from_hex_string(2, "8").unwrap();
        let nand2 = !and2.clone();
        let l0 = cache.insert(and2.clone());
        let l1 = cache.insert(nand2.clone());
        assert_eq!(l0 >> 1, l1 >> 1, "should share the same table entry");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(l0), and2);
        assert_eq!(cache.get(l1), nand2);
    }

    #[test]
    fn test_insert_of_insert_reconstruct_is_stable() {
        let mut cache = TruthCache::new();
        let xor2 = Lut::from_hex_string(2, "6").unwrap();
        let l0 = cache.insert(xor2);
        let reconstructed = cache.get(l0);
        let l1 = cache.insert(reconstructed);
        assert_eq!(l0, l1);
    }
}
