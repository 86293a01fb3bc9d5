//! Priority cuts and bounded cut-sets (component C).

use std::cmp::Ordering;

/// Upper bound on the number of leaves a cut may hold (`K in [2,8]`).
pub const MAX_CUT_LEAVES: usize = 8;

/// Upper bound on the number of cuts kept per node (`L in [6,20]`).
pub const MAX_CUT_SET_SIZE: usize = 20;

/// Tolerance used for all float comparisons in cut ordering.
pub const EPS: f64 = 0.005;

/// The comparator mode threaded explicitly through cut-set operations.
///
/// Modeled as plain data passed to `CutSet::insert`/`CutSet::sort`, not as
/// thread-local or global mutable state: the
/// mapper and cut enumerator simply carry the current mode as a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    /// delay -> size -> area -> edge -> power -> useless
    Delay,
    /// delay -> useless -> area -> edge -> power -> size
    Delay2,
    /// area -> edge -> power -> delay -> size -> useless
    Area,
    /// area-flow -> delay
    Flow,
    /// delay -> size
    Default,
}

/// Per-cut cost payload, populated as needed by cut enumeration or mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CutValue {
    /// Arrival time if this cut is used to implement its root as a single LUT.
    pub delay: u32,
    /// Dereferenced area of the subgraph covered by this cut.
    pub area: f64,
    /// Area-flow estimate (area divided by estimated fanout along the cut).
    pub area_flow: f64,
    /// Dereferenced edge count.
    pub edge: f64,
    /// Edge-flow estimate.
    pub edge_flow: f64,
    /// Power estimate (switching activity weighted area); 0 if unused.
    pub power: f64,
    /// Whether this cut was ever chosen as a node's best (affects "useless" ordering).
    pub useless: bool,
}

/// A single priority cut: an ascending-sorted leaf set plus optional truth
/// table literal and cost payload.
#[derive(Clone, Debug)]
pub struct Cut {
    leaves: Vec<u32>,
    signature: u64,
    /// Literal into the global [`TruthCache`](crate::truth::TruthCache), if computed.
    pub truth_lit: Option<u32>,
    pub value: CutValue,
}

fn signature_of(leaves: &[u32]) -> u64 {
    leaves.iter().fold(0u64, |acc, &l| acc | (1u64 << (l & 63)))
}

impl Cut {
    /// The trivial unit cut `{n}` for a node, with zero cost.
    pub fn unit(n: u32) -> Cut {
        Cut {
            leaves: vec![n],
            signature: signature_of(&[n]),
            truth_lit: None,
            value: CutValue::default(),
        }
    }

    /// Build a cut from an explicit (already deduplicated, unsorted) leaf set.
    pub fn from_leaves(mut leaves: Vec<u32>) -> Cut {
        leaves.sort_unstable();
        leaves.dedup();
        let signature = signature_of(&leaves);
        Cut {
            leaves,
            signature,
            truth_lit: None,
            value: CutValue::default(),
        }
    }

    /// The cut's leaves, in ascending node-index order.
    pub fn leaves(&self) -> &[u32] {
        &self.leaves
    }

    /// The cut's 64-bit leaf signature.
    pub fn signature(&self) -> u64 {
        self.signature
    }

    /// Number of leaves.
    pub fn size(&self) -> usize {
        self.leaves.len()
    }

    /// Whether `self` dominates `other`: `self.leaves() ⊆ other.leaves()`.
    pub fn dominates(&self, other: &Cut) -> bool {
        if self.size() > other.size() {
            return false;
        }
        if self.signature & other.signature != self.signature {
            return false;
        }
        self.leaves.iter().all(|l| other.leaves.binary_search(l).is_ok())
    }

    /// Merge two cuts into their leaf union, rejecting if it would exceed `max_leaves`.
    pub fn merge(c1: &Cut, c2: &Cut, max_leaves: usize) -> Option<Cut> {
        if (c1.signature | c2.signature).count_ones() as usize > max_leaves {
            return None;
        }
        let mut leaves = Vec::with_capacity(c1.size() + c2.size());
        leaves.extend_from_slice(&c1.leaves);
        leaves.extend_from_slice(&c2.leaves);
        leaves.sort_unstable();
        leaves.dedup();
        if leaves.len() > max_leaves {
            return None;
        }
        let signature = c1.signature | c2.signature;
        debug_assert_eq!(signature, signature_of(&leaves));
        Some(Cut {
            leaves,
            signature,
            truth_lit: None,
            value: CutValue::default(),
        })
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < EPS {
        Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

/// Compare two cuts under `mode`; `Less` means `a` should be kept ahead of `b`.
pub fn compare(a: &Cut, b: &Cut, mode: SortMode) -> Ordering {
    use Ordering::*;
    let (va, vb) = (&a.value, &b.value);
    match mode {
        SortMode::Delay => [
            va.delay.cmp(&vb.delay),
            a.size().cmp(&b.size()),
            cmp_f64(va.area, vb.area),
            cmp_f64(va.edge, vb.edge),
            cmp_f64(va.power, vb.power),
            va.useless.cmp(&vb.useless),
        ]
        .into_iter()
        .find(|o| *o != Equal)
        .unwrap_or(Equal),
        SortMode::Delay2 => [
            va.delay.cmp(&vb.delay),
            va.useless.cmp(&vb.useless),
            cmp_f64(va.area, vb.area),
            cmp_f64(va.edge, vb.edge),
            cmp_f64(va.power, vb.power),
            a.size().cmp(&b.size()),
        ]
        .into_iter()
        .find(|o| *o != Equal)
        .unwrap_or(Equal),
        SortMode::Area => [
            cmp_f64(va.area, vb.area),
            cmp_f64(va.edge, vb.edge),
            cmp_f64(va.power, vb.power),
            va.delay.cmp(&vb.delay),
            a.size().cmp(&b.size()),
            va.useless.cmp(&vb.useless),
        ]
        .into_iter()
        .find(|o| *o != Equal)
        .unwrap_or(Equal),
        SortMode::Flow => {
            let o = cmp_f64(va.area_flow, vb.area_flow);
            if o != Equal {
                o
            } else {
                va.delay.cmp(&vb.delay)
            }
        }
        SortMode::Default => {
            let o = va.delay.cmp(&vb.delay);
            if o != Equal {
                o
            } else {
                a.size().cmp(&b.size())
            }
        }
    }
}

/// A bounded, ordered set of priority cuts for one node.
#[derive(Clone, Debug, Default)]
pub struct CutSet {
    cuts: Vec<Cut>,
    capacity: usize,
}

impl CutSet {
    /// An empty cut-set bounded to `capacity` entries.
    pub fn new(capacity: usize) -> CutSet {
        CutSet {
            cuts: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Current number of cuts held.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// All cuts, in current priority order (best first).
    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    /// The current best (highest priority) cut.
    pub fn best(&self) -> Option<&Cut> {
        self.cuts.first()
    }

    /// Drop every cut.
    pub fn clear(&mut self) {
        self.cuts.clear();
    }

    /// Truncate to the first `limit` cuts.
    pub fn limit(&mut self, limit: usize) {
        if self.cuts.len() > limit {
            self.cuts.truncate(limit);
        }
    }

    /// Rotate the cut at `i` to the front, making it the new best.
    pub fn update_best(&mut self, i: usize) {
        if i > 0 && i < self.cuts.len() {
            let c = self.cuts.remove(i);
            self.cuts.insert(0, c);
        }
    }

    /// Insert `c` under `mode`, pruning dominated cuts and keeping the
    /// bounded set ordered.
    ///
    /// 1. Drop any existing cut dominated by `c`.
    /// 2. If `c` is itself dominated by a surviving cut, discard `c`.
    /// 3. Insert `c` at its sorted position, dropping the tail entry if the
    ///    set would otherwise exceed capacity.
    pub fn insert(&mut self, c: Cut, mode: SortMode) -> bool {
        if self.cuts.iter().any(|existing| existing.dominates(&c)) {
            return false;
        }
        self.cuts.retain(|existing| !c.dominates(existing));

        let pos = self
            .cuts
            .binary_search_by(|existing| compare(existing, &c, mode))
            .unwrap_or_else(|p| p);
        if pos >= self.capacity {
            return false;
        }
        self.cuts.insert(pos, c);
        if self.cuts.len() > self.capacity {
            self.cuts.pop();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominance() {
        let small = Cut::from_leaves(vec![1, 2]);
        let big = Cut::from_leaves(vec![1, 2, 3]);
        assert!(small.dominates(&big));
        assert!(!big.dominates(&small));
    }

    #[test]
    fn test_merge_rejects_oversize() {
        let a = Cut::from_leaves(vec![1, 2, 3, 4]);
        let b = Cut::from_leaves(vec![5, 6, 7, 8]);
        assert!(Cut::merge(&a, &b, 6).is_none());
        let merged = Cut::merge(&a, &b, 8).unwrap();
        assert_eq!(merged.size(), 8);
    }

    #[test]
    fn test_cutset_dominance_pruning() {
        let mut set = CutSet::new(10);
        let mut big = Cut::from_leaves(vec![1, 2, 3]);
        big.value.delay = 2;
        set.insert(big, SortMode::Delay);
        let mut small = Cut::from_leaves(vec![1, 2]);
        small.value.delay = 2;
        set.insert(small, SortMode::Delay);
        assert_eq!(set.len(), 1);
        assert_eq!(set.cuts()[0].size(), 2);
    }

    #[test]
    fn test_cutset_capacity_and_order() {
        let mut set = CutSet::new(2);
        for delay in [3u32, 1, 2] {
            let mut c = Cut::from_leaves(vec![delay + 10]);
            c.value.delay = delay;
            set.insert(c, SortMode::Delay);
        }
        assert_eq!(set.len(), 2);
        assert_eq!(set.cuts()[0].value.delay, 1);
        assert_eq!(set.cuts()[1].value.delay, 2);
    }

    #[test]
    fn test_update_best() {
        let mut set = CutSet::new(5);
        for i in 0..3u32 {
            set.insert(Cut::from_leaves(vec![i + 1]), SortMode::Default);
        }
        set.update_best(2);
        assert_eq!(set.cuts()[0].leaves(), &[3]);
    }
}
