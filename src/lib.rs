//! Technology-independent logic optimization and FPGA (k-LUT) technology
//! mapping over And-Inverter Graphs.
//!
//! The crate is organized bottom-up, leaves first: a strashed AIG core
//! (`aig`), a truth-table cache (`truth`), priority cuts (`cut`/`cut_enum`),
//! an AIG-with-choices view (`choice`) built by simulation + SAT-based
//! choice synthesis (`choice_synth`/`sat`), local rewriting transforms
//! (`balance`/`rewrite`/`refactor`/`npn`/`isop`), and finally the k-LUT
//! mapper (`map`). `flow` sequences these into the `compress`/`compress2`
//! schedules the CLI (`cmd`) drives.
//!
//! It is inspired by the logic synthesis tools ABC and Mockturtle.

mod aig_node;
mod signal;
mod aig;
mod truth;
mod cut;
mod cut_enum;
mod choice;
mod sat;
mod choice_synth;
mod balance;
mod npn;
mod rewrite;
mod isop;
mod refactor;
mod map;
mod flow;
mod config;
mod stats;
pub mod io;

pub use aig::{Aig, AigEvent, AigObserver};
pub use aig_node::AigNode;
pub use balance::{balance, ZeroArrival};
pub use choice::{recognize_mux, ChoiceView};
pub use choice_synth::synthesize_choices;
pub use config::{Config, ConfigError, FlowManagerConfig, KLutMappingConfig, RewriteSectionConfig};
pub use cut::{Cut, CutSet, SortMode};
pub use cut_enum::{enumerate_cuts, CutEnumConfig, CutEnumResult};
pub use flow::{compress2_schedule, lut_opt, map_fpga, run_schedule, History, Step};
pub use map::{count_luts, map_luts, mapping_is_complete, LutMapping, MapConfig};
pub use refactor::{refactor, RefactorConfig};
pub use rewrite::{rewrite, RewriteConfig};
pub use sat::{prove_always_false, prove_equivalent, ProofResult};
pub use signal::Signal;
pub use stats::{compute_stats, Stats};
pub use truth::TruthCache;
