//! The strashed two-input AND-Inverter Graph (component A).
//!
//! Structural hashing guarantees that at most one live node exists for a
//! given ordered fanin pair; `create_and` and `substitute_node` are the two
//! entry points that must preserve this invariant.

use core::fmt;

use crate::aig_node::{AigNode, Fanin};
use crate::signal::Signal;

/// Events fired by the AIG as it is mutated. Consumed by views (depth cache,
/// mapping overlay) and by `substitute_nodes`' on-delete bookkeeping.
#[derive(Clone, Copy, Debug)]
pub enum AigEvent {
    /// A new node was appended at this index.
    Added(u32),
    /// An existing node's fanins were rewritten in place.
    Modified(u32),
    /// A node was logically deleted (`take_out_node`).
    Deleted(u32),
}

/// Observer trait for `AigEvent`s, gated by [`Aig::has_observers`] so the hot
/// path avoids a vtable call when nothing is listening.
pub trait AigObserver {
    /// Handle one event.
    fn on_event(&mut self, ev: AigEvent);
}

const EMPTY: u32 = u32::MAX;

/// The strashed AIG storage.
#[derive(Clone, Debug, Default)]
pub struct Aig {
    nodes: Vec<AigNode>,
    num_pis: usize,
    outputs: Vec<Signal>,
    hash_buckets: Vec<u32>,
    hash_count: usize,
    traversal_counter: u32,
    #[allow(clippy::type_complexity)]
    observers: Vec<Box<dyn AigObserver>>,
}

impl Aig {
    /// Build an empty AIG, with only the constant-false node.
    pub fn new() -> Aig {
        let mut aig = Aig {
            nodes: Vec::new(),
            num_pis: 0,
            outputs: Vec::new(),
            hash_buckets: vec![EMPTY; 64],
            hash_count: 0,
            traversal_counter: 0,
            observers: Vec::new(),
        };
        aig.nodes.push(AigNode::new_ci(0));
        aig
    }

    /// Register an observer. Observers are never removed once added.
    pub fn add_observer(&mut self, obs: Box<dyn AigObserver>) {
        self.observers.push(obs);
    }

    /// Whether any observer is currently registered.
    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    fn fire(&mut self, ev: AigEvent) {
        if self.observers.is_empty() {
            return;
        }
        for obs in self.observers.iter_mut() {
            obs.on_event(ev);
        }
    }

    // ---- basic accessors -------------------------------------------------

    /// Number of nodes in the node array, including the constant and PIs.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of primary inputs.
    pub fn num_pis(&self) -> usize {
        self.num_pis
    }

    /// Number of primary outputs.
    pub fn num_pos(&self) -> usize {
        self.outputs.len()
    }

    /// The signal for the constant `v`.
    pub fn get_constant(&self, v: bool) -> Signal {
        Signal::new(0, v)
    }

    /// The signal for primary input `i` (0-indexed), in creation order.
    pub fn pi(&self, i: usize) -> Signal {
        assert!(i < self.num_pis);
        Signal::new((i + 1) as u32, false)
    }

    /// The output signal at position `i`.
    pub fn po(&self, i: usize) -> Signal {
        self.outputs[i]
    }

    /// All primary output signals.
    pub fn outputs(&self) -> &[Signal] {
        &self.outputs
    }

    /// Raw node record access, for views that need low-level detail.
    pub fn node(&self, n: u32) -> &AigNode {
        &self.nodes[n as usize]
    }

    /// Whether node `n` is alive.
    pub fn is_alive(&self, n: u32) -> bool {
        !self.nodes[n as usize].is_dead()
    }

    /// Whether node `n` is a combinational input (constant or PI).
    pub fn is_ci(&self, n: u32) -> bool {
        self.nodes[n as usize].is_ci()
    }

    /// Whether node `n` is an AND gate.
    pub fn is_and(&self, n: u32) -> bool {
        !self.is_ci(n)
    }

    /// Fanin signals of an AND node.
    pub fn fanins(&self, n: u32) -> [Signal; 2] {
        let c = self.nodes[n as usize].children();
        [c[0].signal(), c[1].signal()]
    }

    /// Current fanout count of node `n`.
    pub fn fanout_size(&self, n: u32) -> u32 {
        self.nodes[n as usize].fanout_size()
    }

    /// Phase of node `n` under the all-zero input assignment.
    pub fn phase(&self, n: u32) -> bool {
        self.nodes[n as usize].phase()
    }

    /// Allocate a fresh traversal id, for mark-based DFS without clearing arrays.
    pub fn new_traversal_id(&mut self) -> u32 {
        self.traversal_counter += 1;
        self.traversal_counter
    }

    pub(crate) fn visited_at(&self, n: u32) -> u32 {
        self.nodes[n as usize].visited
    }

    pub(crate) fn set_visited(&mut self, n: u32, id: u32) {
        self.nodes[n as usize].visited = id;
    }

    // ---- construction ------------------------------------------------

    /// Append a new primary input.
    pub fn create_pi(&mut self) -> Signal {
        let idx = self.nodes.len() as u32;
        self.nodes.push(AigNode::new_ci(idx));
        self.num_pis += 1;
        self.fire(AigEvent::Added(idx));
        Signal::new(idx, false)
    }

    /// Append a primary output.
    pub fn create_po(&mut self, s: Signal) {
        self.outputs.push(s);
        self.nodes[s.index() as usize].inc_fanout();
    }

    /// Rewire output `i` to a new signal, updating fanout counts so the old
    /// driver can be reclaimed if it becomes otherwise unused.
    pub fn set_output(&mut self, i: usize, s: Signal) {
        let old = self.outputs[i];
        if old == s {
            return;
        }
        self.outputs[i] = s;
        self.nodes[s.index() as usize].inc_fanout();
        let was_zero = self.nodes[old.index() as usize].dec_fanout();
        if was_zero && self.is_and(old.index()) && !self.nodes[old.index() as usize].is_dead() {
            self.take_out_node(old.index());
        }
    }

    /// Compute the trivial simplification of `a & b`, if any.
    fn trivial_and(a: Signal, b: Signal) -> Option<Signal> {
        if a == b {
            Some(a)
        } else if a == !b {
            Some(Signal::zero())
        } else if a == Signal::zero() || b == Signal::zero() {
            Some(Signal::zero())
        } else if a == Signal::one() {
            Some(b)
        } else if b == Signal::one() {
            Some(a)
        } else {
            None
        }
    }

    fn hash_of(c0: Signal, c1: Signal) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut h = fxhash::FxHasher::default();
        c0.raw().hash(&mut h);
        c1.raw().hash(&mut h);
        h.finish()
    }

    fn bucket(&self, c0: Signal, c1: Signal) -> usize {
        (Self::hash_of(c0, c1) as usize) & (self.hash_buckets.len() - 1)
    }

    fn hash_lookup(&self, c0: Signal, c1: Signal) -> Option<u32> {
        let mut cur = self.hash_buckets[self.bucket(c0, c1)];
        while cur != EMPTY {
            let node = &self.nodes[cur as usize];
            let [n0, n1] = node.children();
            if n0.signal() == c0 && n1.signal() == c1 && !node.is_dead() {
                return Some(cur);
            }
            cur = node.hash_next;
        }
        None
    }

    fn hash_insert(&mut self, n: u32) {
        let [c0, c1] = self.fanins(n);
        let b = self.bucket(c0, c1);
        self.nodes[n as usize].hash_next = self.hash_buckets[b];
        self.hash_buckets[b] = n;
        self.hash_count += 1;
        if self.hash_count > 2 * self.hash_buckets.len() {
            self.rehash();
        }
    }

    fn hash_remove(&mut self, n: u32) {
        let [c0, c1] = self.fanins(n);
        let b = self.bucket(c0, c1);
        let mut cur = self.hash_buckets[b];
        if cur == n {
            self.hash_buckets[b] = self.nodes[n as usize].hash_next;
            self.hash_count -= 1;
            return;
        }
        while cur != EMPTY {
            let next = self.nodes[cur as usize].hash_next;
            if next == n {
                self.nodes[cur as usize].hash_next = self.nodes[n as usize].hash_next;
                self.hash_count -= 1;
                return;
            }
            cur = next;
        }
    }

    fn rehash(&mut self) {
        let new_size = self.hash_buckets.len() * 2;
        self.hash_buckets = vec![EMPTY; new_size];
        self.hash_count = 0;
        let indices: Vec<u32> = (0..self.nodes.len() as u32)
            .filter(|&i| !self.nodes[i as usize].is_ci() && !self.nodes[i as usize].is_dead())
            .collect();
        for i in indices {
            self.hash_insert(i);
        }
    }

    fn node_phase(&self, c0: Signal, c1: Signal) -> bool {
        let p0 = self.phase(c0.index()) ^ c0.complement();
        let p1 = self.phase(c1.index()) ^ c1.complement();
        p0 & p1
    }

    /// Create (or reuse, through strashing) the AND of `a` and `b`.
    pub fn create_and(&mut self, a: Signal, b: Signal) -> Signal {
        if let Some(s) = Self::trivial_and(a, b) {
            return s;
        }
        let (c0, c1) = if a.index() <= b.index() { (a, b) } else { (b, a) };
        if let Some(existing) = self.hash_lookup(c0, c1) {
            return Signal::new(existing, false);
        }
        let idx = self.nodes.len() as u32;
        let node = AigNode::new_and(Fanin::from_signal(c0), Fanin::from_signal(c1));
        self.nodes.push(node);
        self.nodes[c0.index() as usize].inc_fanout();
        self.nodes[c1.index() as usize].inc_fanout();
        let phase = self.node_phase(c0, c1);
        self.nodes[idx as usize].flags.phase = phase;
        self.hash_insert(idx);
        self.fire(AigEvent::Added(idx));
        Signal::new(idx, false)
    }

    /// Duplicate a two-input AND gate from another AIG's node into this one.
    pub fn clone_node(&mut self, children: [Signal; 2]) -> Signal {
        self.create_and(children[0], children[1])
    }

    /// Sweep any live AND gate with zero fanout (unreachable from every
    /// primary output). Fanout-driven deletion already reclaims these as
    /// soon as their last reference drops, so in steady state this is a
    /// no-op; it exists as a defensive pass over networks built or edited
    /// outside that discipline (e.g. freshly parsed from a file).
    pub fn cleanup(&mut self) {
        loop {
            let dead: Vec<u32> = self
                .foreach_gate()
                .filter(|&n| self.nodes[n as usize].fanout_size() == 0)
                .collect();
            if dead.is_empty() {
                break;
            }
            for n in dead {
                if !self.nodes[n as usize].is_dead() {
                    self.take_out_node(n);
                }
            }
        }
    }

    // ---- iteration ------------------------------------------------------

    /// Iterate over the indices of all live AND nodes, in creation order.
    pub fn foreach_gate(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.nodes.len() as u32).filter(|&i| self.is_and(i) && self.is_alive(i))
    }

    /// Iterate over the indices of all live nodes (CIs and gates).
    pub fn foreach_node(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.nodes.len() as u32).filter(|&i| self.is_alive(i))
    }

    // ---- destructive edits ------------------------------------------------

    fn deref_fanin(&mut self, n: u32) {
        let node = &self.nodes[n as usize];
        if node.is_ci() {
            return;
        }
        let [c0, c1] = node.children();
        for c in [c0, c1] {
            let was_zero = self.nodes[c.index() as usize].dec_fanout();
            if was_zero && self.is_and(c.index()) && !self.nodes[c.index() as usize].is_dead() {
                self.take_out_node(c.index());
            }
        }
    }

    fn ref_fanin(&mut self, n: u32) {
        let node = &self.nodes[n as usize];
        if node.is_ci() {
            return;
        }
        let [c0, c1] = node.children();
        for c in [c0, c1] {
            self.nodes[c.index() as usize].inc_fanout();
        }
    }

    /// Logically delete node `n`: it must have zero remaining fanout.
    ///
    /// Recursively dereferences its fanins, reclaiming them in turn if they
    /// become dead ANDs with no other reference.
    pub fn take_out_node(&mut self, n: u32) {
        assert_eq!(
            self.nodes[n as usize].fanout_size(),
            0,
            "take_out_node on a node that still has references"
        );
        assert!(!self.nodes[n as usize].is_dead(), "node already dead");
        if self.is_and(n) {
            self.hash_remove(n);
        }
        self.deref_fanin(n);
        self.nodes[n as usize].mark_dead();
        self.fire(AigEvent::Deleted(n));
    }

    /// Replace every live use of `old` by `new_sig`, then take `old` out.
    ///
    /// Walks nodes in ascending index order starting just after `old`: later
    /// nodes may depend on earlier ones, and strashing hits can turn a single
    /// substitution into a cascade, which is why an explicit work stack (not
    /// recursion) drives the rewrite.
    pub fn substitute_node(&mut self, old: u32, new_sig: Signal) {
        assert!(!self.nodes[old as usize].is_dead());
        assert_ne!(old, new_sig.index(), "cannot substitute a node by itself");
        let mut work: Vec<(u32, Signal)> = vec![(old, new_sig)];
        while let Some((o, s)) = work.pop() {
            self.substitute_one(o, s, &mut work);
        }
    }

    /// Apply several independent substitutions.
    ///
    /// If an earlier substitution's cascade already killed the left-hand side
    /// of a later one, that entry is silently dropped rather than panicking:
    /// this mirrors the on-delete hook in the original design, without
    /// needing to keep a temporary extra reference on pending left-hand
    /// sides, since substitutions are applied eagerly rather than batched.
    pub fn substitute_nodes(&mut self, subs: &[(u32, Signal)]) {
        for &(old, new_sig) in subs {
            if self.nodes[old as usize].is_dead() {
                continue;
            }
            if old == new_sig.index() {
                continue;
            }
            self.substitute_node(old, new_sig);
        }
    }

    fn substitute_one(&mut self, old: u32, new_sig: Signal, work: &mut Vec<(u32, Signal)>) {
        if self.nodes[old as usize].is_dead() {
            return;
        }
        let size = self.nodes.len() as u32;
        for n in (old + 1)..size {
            if self.nodes[n as usize].is_dead() || self.nodes[n as usize].is_ci() {
                continue;
            }
            let [c0, c1] = self.fanins(n);
            let mut changed = false;
            let mut nc = [c0, c1];
            for c in nc.iter_mut() {
                if c.index() == old {
                    *c = new_sig ^ c.complement();
                    changed = true;
                }
            }
            if !changed {
                continue;
            }
            self.hash_remove(n);
            let (a, b) = (nc[0], nc[1]);
            if let Some(collapsed) = Self::trivial_and(a, b) {
                self.deref_fanin(n);
                self.nodes[n as usize].mark_dead();
                self.fire(AigEvent::Deleted(n));
                work.push((n, collapsed));
                continue;
            }
            let (lo, hi) = if a.index() <= b.index() { (a, b) } else { (b, a) };
            if let Some(existing) = self.hash_lookup(lo, hi) {
                self.deref_fanin(n);
                self.nodes[n as usize].mark_dead();
                self.fire(AigEvent::Deleted(n));
                work.push((n, Signal::new(existing, false)));
                continue;
            }
            self.deref_fanin(n);
            self.nodes[n as usize].children = [Fanin::from_signal(lo), Fanin::from_signal(hi)];
            self.nodes[n as usize].flags.phase = self.node_phase(lo, hi);
            self.ref_fanin(n);
            self.hash_insert(n);
            self.fire(AigEvent::Modified(n));
        }
        for o in self.outputs.iter_mut() {
            if o.index() == old {
                *o = new_sig ^ o.complement();
            }
        }
        if old != new_sig.index() {
            self.take_out_node(old);
        }
    }
}

impl fmt::Display for Aig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Aig with {} inputs, {} gates, {} outputs",
            self.num_pis(),
            self.foreach_gate().count(),
            self.num_pos()
        )?;
        for n in self.foreach_gate() {
            let [c0, c1] = self.fanins(n);
            writeln!(f, "\tn{n} = {c0} & {c1}")?;
        }
        for (i, o) in self.outputs.iter().enumerate() {
            writeln!(f, "\to{i} = {o}")?;
        }
        Ok(())
    }
}
