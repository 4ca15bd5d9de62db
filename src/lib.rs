//! This crate provides the simulation engine behind an interactive automata
//! workbench: the four classical machine models of formal-language theory —
//! DFA, NFA with ε-transitions, pushdown automata, and single-tape Turing
//! machines — behind one container type with per-model operational
//! semantics, validation, and serialization.
//!
//! Rendering, pointer editing, and timers are host concerns: the engine is
//! synchronous, exposes read-only snapshots (active states, highlighted
//! transitions, tape and stack views), and is driven one step at a time.

pub mod automaton;
pub mod dfa;
pub mod document;
pub mod interchange;
pub mod labels;
pub mod library;
pub mod loader;
pub mod nfa;
pub mod pda;
pub mod simulator;
pub mod tm;
pub mod types;

/// Re-exports the `Rule` enum from the label grammar, used by `pest`.
pub use crate::labels::Rule;
/// Re-exports the machine container and its configuration types.
pub use automaton::{Automaton, Configurations, MachineConfig, PdaConfig, TmConfig};
/// Re-exports the structured serialization documents.
pub use document::{MachineDoc, StateDoc, TransitionDoc};
/// Re-exports label parsing and formatting.
pub use labels::{format_label, parse_label};
/// Re-exports the bundled machine registry.
pub use library::MachineLibrary;
/// Re-exports the machine file loader.
pub use loader::MachineLoader;
/// Re-exports the PDA configuration triple.
pub use pda::PdaConfiguration;
/// Re-exports the simulation driver.
pub use simulator::{Simulator, TestOutcome};
/// Re-exports the Turing machine tape.
pub use tm::{Tape, TmConfiguration};
/// Re-exports the core model and simulation types.
pub use types::{
    Direction, EngineError, MachineType, Point, StateId, StateNode, StepOutcome, TapeSnapshot,
    TraceEntry, Transition, TransitionId, TransitionLabel, ValidationIssue, ValidationReport,
    Verdict, BLANK_SYMBOL, DEFAULT_STACK_SYMBOL, EPSILON_SYMBOL, INPUT_BLANK_SYMBOL,
};
