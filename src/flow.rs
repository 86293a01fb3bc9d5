//! Flow manager: scripted optimization schedules and the undo/history ring
//! (ambient: the `flow_manager` config section and the `history` CLI command).

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::aig::Aig;
use crate::balance::{balance, ZeroArrival};
use crate::choice::{dup_dfs, ChoiceView};
use crate::choice_synth::synthesize_choices;
use crate::config::Config;
use crate::io::aiger::{read_aiger, write_aiger_binary};
use crate::map::{map_luts, LutMapping, MapConfig};
use crate::refactor::{refactor, RefactorConfig};
use crate::rewrite::{rewrite, RewriteConfig};
use crate::sat::prove_equivalent;
use crate::signal::Signal;

/// Fixed capacity of the undo/redo ring used by the `history` command
/// (history ring size 5).
pub const HISTORY_SIZE: usize = 5;

/// A bounded ring buffer of past `Aig` snapshots, used by `history -c|-s|-a|-r <idx>`.
#[derive(Clone, Debug, Default)]
pub struct History {
    entries: Vec<Aig>,
}

impl History {
    pub fn new() -> History {
        History { entries: Vec::new() }
    }

    /// `history -c`: clear all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `history -s`: show the number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `history -a`: push the current AIG, evicting the oldest entry once
    /// the ring is full.
    pub fn add(&mut self, aig: &Aig) {
        if self.entries.len() == HISTORY_SIZE {
            self.entries.remove(0);
        }
        self.entries.push(aig.clone());
    }

    /// `history -r <idx>`: restore a previously stored snapshot by index,
    /// oldest first.
    pub fn restore(&self, idx: usize) -> Option<&Aig> {
        self.entries.get(idx)
    }

    /// Load a history ring previously written by [`History::save`]. A
    /// missing file is treated as an empty ring, so `history -a` on a fresh
    /// file just starts one.
    pub fn load(path: impl AsRef<Path>) -> io::Result<History> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(History::new()),
            Err(e) => return Err(e),
        };
        let mut cursor = &bytes[..];
        let mut entries = Vec::new();
        while !cursor.is_empty() {
            let mut len_buf = [0u8; 8];
            cursor.read_exact(&mut len_buf)?;
            let len = u64::from_le_bytes(len_buf) as usize;
            let (blob, rest) = cursor.split_at(len);
            entries.push(read_aiger(blob).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?);
            cursor = rest;
        }
        Ok(History { entries })
    }

    /// Persist the ring as a sequence of length-prefixed binary AIGER blobs,
    /// oldest entry first, so a later [`History::load`] reconstructs it exactly.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut out = Vec::new();
        for aig in &self.entries {
            let mut blob = Vec::new();
            write_aiger_binary(&mut blob, aig)?;
            out.write_all(&(blob.len() as u64).to_le_bytes())?;
            out.write_all(&blob)?;
        }
        std::fs::write(path, out)
    }
}

/// One step of a `compress`/`compress2`-style schedule.
#[derive(Clone, Copy, Debug)]
pub enum Step {
    Balance,
    Rewrite,
    Refactor,
}

/// The standard `compress2` schedule: balance, then alternate rewrite and
/// refactor, balancing between each.
pub fn compress2_schedule() -> Vec<Step> {
    vec![
        Step::Balance,
        Step::Rewrite,
        Step::Refactor,
        Step::Balance,
        Step::Rewrite,
    ]
}

/// Run `schedule` over `aig`, recording a history entry before each step and
/// (if `config.flow_manager.debug` is set) SAT-checking that every step
/// preserved function. The `rewrite` section of `config` parameterizes every
/// `Step::Rewrite`; refactoring and balancing use their own defaults, since
/// the JSON config schema only names a `rewrite` section.
pub fn run_schedule(aig: &mut Aig, schedule: &[Step], config: &Config, history: &mut History) {
    let flow_manager = &config.flow_manager;
    let rewrite_config = RewriteConfig::from(&config.rewrite);
    for step in schedule {
        history.add(aig);
        let before = if flow_manager.debug { Some(aig.clone()) } else { None };

        match step {
            Step::Balance => {
                if flow_manager.use_balance {
                    balance(aig, &ZeroArrival);
                }
            }
            Step::Rewrite => {
                if flow_manager.use_rewrite {
                    rewrite(aig, rewrite_config);
                }
            }
            Step::Refactor => {
                if flow_manager.use_refactor {
                    refactor(aig, RefactorConfig::default());
                }
            }
        }

        if let Some(reference) = before {
            assert!(
                outputs_equivalent(&reference, aig),
                "flow step {step:?} changed the network's function"
            );
        }

        if flow_manager.very_verbose {
            println!("{step:?}: {} nodes, {} live gates", aig.num_nodes(), aig.foreach_gate().count());
        }
    }
}

/// `map_fpga`: k-LUT map `aig` directly, with no choice synthesis (every
/// node is its own trivial equivalence class).
pub fn map_fpga(aig: &Aig, config: MapConfig) -> (ChoiceView, LutMapping) {
    let choices = ChoiceView::identity(aig);
    let mapping = map_luts(aig, &choices, config);
    (choices, mapping)
}

/// `lut_opt`: synthesize choices by simulation + SAT proof first, then map
/// under the resulting `ChoiceView` so the mapper can pick among structurally
/// different but functionally equivalent cuts.
pub fn lut_opt(aig: &Aig, config: MapConfig, num_words: usize, seed: u64) -> (ChoiceView, LutMapping) {
    let choices = synthesize_choices(aig, num_words, seed);
    let mapping = map_luts(aig, &choices, config);
    (choices, mapping)
}

/// Verify that `before` and `after` compute the same outputs, by copying
/// each of `before`'s output cones into a clone of `after` (primary inputs
/// line up by index across every pass in this module) and SAT-checking
/// pairwise equivalence.
fn outputs_equivalent(before: &Aig, after: &Aig) -> bool {
    assert_eq!(before.num_pos(), after.num_pos());
    let mut combined = after.clone();
    let choices = ChoiceView::identity(before);
    let mut memo: HashMap<u32, Signal> = HashMap::new();
    for i in 0..before.num_pis() {
        let idx = (i + 1) as u32;
        memo.insert(idx, Signal::new(idx, false));
    }
    for i in 0..before.num_pos() {
        let copied = dup_dfs(before, &choices, &mut combined, &mut memo, before.po(i));
        if !prove_equivalent(&combined, copied, after.po(i)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_ring_evicts_oldest() {
        let aig = Aig::new();
        let mut history = History::new();
        for _ in 0..(HISTORY_SIZE + 2) {
            history.add(&aig);
        }
        assert_eq!(history.len(), HISTORY_SIZE);
    }

    #[test]
    fn test_history_save_load_roundtrip() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let x = aig.create_and(a, b);
        aig.create_po(x);

        let mut history = History::new();
        history.add(&Aig::new());
        history.add(&aig);

        let path = std::env::temp_dir().join("aigmap_test_history_roundtrip.ring");
        history.save(&path).unwrap();
        let loaded = History::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.restore(1).unwrap().num_pos(), 1);
    }

    #[test]
    fn test_history_load_missing_file_is_empty() {
        let path = std::env::temp_dir().join("aigmap_test_history_missing.ring");
        std::fs::remove_file(&path).ok();
        let history = History::load(&path).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_compress2_runs_without_changing_output_count() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let x = aig.create_and(a, b);
        aig.create_po(x);
        let mut history = History::new();
        run_schedule(&mut aig, &compress2_schedule(), &Config::default(), &mut history);
        assert_eq!(aig.num_pos(), 1);
    }

    #[test]
    fn test_equivalence_helper_used_elsewhere() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        assert!(prove_equivalent(&aig, a, a));
    }

    #[test]
    fn test_map_fpga_covers_all_outputs() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let x = aig.create_and(a, b);
        aig.create_po(x);
        let (choices, mapping) = map_fpga(&aig, MapConfig::default());
        assert!(crate::map::mapping_is_complete(&aig, &choices, &mapping));
    }

    #[test]
    fn test_lut_opt_covers_all_outputs() {
        let mut aig = Aig::new();
        let a = aig.create_pi();
        let b = aig.create_pi();
        let c = aig.create_pi();
        let ab = aig.create_and(a, b);
        let bc = aig.create_and(b, c);
        let ac = aig.create_and(a, c);
        let maj = !aig.create_and(!aig.create_and(!ab, !bc), !ac);
        aig.create_po(maj);
        let (choices, mapping) = lut_opt(&aig, MapConfig::default(), 4, 1);
        assert!(crate::map::mapping_is_complete(&aig, &choices, &mapping));
    }
}
