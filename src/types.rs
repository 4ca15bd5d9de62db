//! Core data structures shared by every machine model: states, transitions,
//! transition labels, trace records, verdicts, and the engine error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::labels::Rule;

/// The blank symbol shown on a Turing machine tape.
pub const BLANK_SYMBOL: char = '□';
/// A substitute accepted in transition labels and input to mean the blank symbol.
pub const INPUT_BLANK_SYMBOL: char = '_';
/// The epsilon symbol accepted in transition labels to mean "no symbol".
pub const EPSILON_SYMBOL: char = 'ε';
/// The stack symbol a pushdown automaton starts with unless configured otherwise.
pub const DEFAULT_STACK_SYMBOL: char = 'Z';

/// Step budget for finite automata runs.
pub const DEFAULT_FINITE_STEP_LIMIT: usize = 1_000;
/// Step budget for pushdown automaton runs.
pub const DEFAULT_PDA_STEP_LIMIT: usize = 1_000;
/// Step budget for Turing machine runs.
pub const DEFAULT_TM_STEP_LIMIT: usize = 10_000;

/// Maximum number of undo snapshots kept per automaton.
pub const HISTORY_LIMIT: usize = 50;

/// Identifier of a state, unique within its owning automaton.
pub type StateId = usize;
/// Identifier of a transition, unique within its owning automaton.
pub type TransitionId = usize;

/// The four supported machine models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineType {
    /// Deterministic finite automaton.
    Dfa,
    /// Nondeterministic finite automaton with ε-transitions.
    Nfa,
    /// Pushdown automaton.
    Pda,
    /// Single-tape Turing machine.
    Tm,
}

impl std::fmt::Display for MachineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            MachineType::Dfa => "DFA",
            MachineType::Nfa => "NFA",
            MachineType::Pda => "PDA",
            MachineType::Tm => "TM",
        };
        write!(f, "{tag}")
    }
}

/// Head movement of a Turing machine transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one cell to the left.
    #[serde(rename = "L")]
    Left,
    /// Move the head one cell to the right.
    #[serde(rename = "R")]
    Right,
    /// Keep the head where it is.
    #[serde(rename = "S")]
    Stay,
}

impl Direction {
    /// Parses a direction letter, case-insensitively.
    pub fn from_char(c: char) -> Option<Direction> {
        match c.to_ascii_uppercase() {
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            'S' => Some(Direction::Stay),
            _ => None,
        }
    }

    /// The canonical single-letter form used in labels and serialization.
    pub fn as_char(&self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Stay => 'S',
        }
    }
}

/// A position on the editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
}

/// A node in the transition graph.
///
/// Identity is stable across mutations; geometry and role flags are mutated
/// by the editor. The `active` and `selected` flags are a read-only snapshot
/// for the renderer and are never serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct StateNode {
    pub id: StateId,
    pub name: String,
    pub position: Point,
    pub is_initial: bool,
    pub is_final: bool,
    /// Marks an explicit halting state; meaningful for Turing machines only.
    pub is_halt: bool,
    /// Set while the state is part of the active configuration set.
    pub active: bool,
    /// Editor selection flag, untouched by the engine.
    pub selected: bool,
}

impl StateNode {
    /// Creates a plain state with the given name and canvas position.
    pub fn new(name: impl Into<String>, position: Point) -> StateNode {
        StateNode {
            id: 0,
            name: name.into(),
            position,
            is_initial: false,
            is_final: false,
            is_halt: false,
            active: false,
            selected: false,
        }
    }

    /// Builder-style setter for the initial flag.
    pub fn with_initial(mut self, is_initial: bool) -> StateNode {
        self.is_initial = is_initial;
        self
    }

    /// Builder-style setter for the final flag.
    pub fn with_final(mut self, is_final: bool) -> StateNode {
        self.is_final = is_final;
        self
    }

    /// Builder-style setter for the halt flag.
    pub fn with_halt(mut self, is_halt: bool) -> StateNode {
        self.is_halt = is_halt;
        self
    }
}

/// The machine-type-dependent payload of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionLabel {
    /// DFA/NFA: the ordered set of accepted input symbols.
    /// An empty set denotes an ε-transition.
    Finite { symbols: Vec<char> },
    /// PDA: input symbol, stack-read symbol, and stack-write string.
    /// `None` and the empty string denote ε.
    Pda {
        input: Option<char>,
        pop: Option<char>,
        /// Written top-first: the first character ends up on top of the stack.
        push: String,
    },
    /// TM: read symbol, write symbol, and head movement.
    Tm {
        read: char,
        write: char,
        direction: Direction,
    },
}

impl TransitionLabel {
    /// An ε-transition label for finite automata.
    pub fn epsilon() -> TransitionLabel {
        TransitionLabel::Finite { symbols: vec![] }
    }

    /// A finite-automaton label accepting the given symbols.
    pub fn symbols(symbols: impl IntoIterator<Item = char>) -> TransitionLabel {
        TransitionLabel::Finite {
            symbols: symbols.into_iter().collect(),
        }
    }

    /// Returns `true` for a finite-automaton label that consumes no input.
    pub fn is_epsilon(&self) -> bool {
        matches!(self, TransitionLabel::Finite { symbols } if symbols.is_empty())
    }

    /// Returns `true` if a finite-automaton label accepts the given symbol.
    /// Labels of other machine types never match this way.
    pub fn accepts(&self, symbol: char) -> bool {
        match self {
            TransitionLabel::Finite { symbols } => symbols.contains(&symbol),
            _ => false,
        }
    }

    /// The input symbols this label contributes to the derived alphabet.
    pub fn input_symbols(&self) -> Vec<char> {
        match self {
            TransitionLabel::Finite { symbols } => symbols.clone(),
            TransitionLabel::Pda { input, .. } => input.iter().copied().collect(),
            TransitionLabel::Tm { .. } => vec![],
        }
    }
}

/// A labeled edge between two states, referenced by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: TransitionId,
    pub from: StateId,
    pub to: StateId,
    pub label: TransitionLabel,
    /// Curve control point, managed by the editor.
    pub control_point: Option<Point>,
    /// Perpendicular label offset, managed by the editor.
    pub label_offset: Option<f64>,
    /// Set for one step after the transition was taken.
    pub highlighted: bool,
}

impl Transition {
    pub fn new(from: StateId, to: StateId, label: TransitionLabel) -> Transition {
        Transition {
            id: 0,
            from,
            to,
            label,
            control_point: None,
            label_offset: None,
            highlighted: false,
        }
    }
}

/// Tri-valued outcome of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verdict {
    #[default]
    Undecided,
    Accepted,
    Rejected,
}

impl Verdict {
    /// Returns `true` once the run has come to a decision.
    pub fn is_decided(&self) -> bool {
        !matches!(self, Verdict::Undecided)
    }
}

/// Whether a single step left the machine able to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The machine performed a step and can take another.
    Continue,
    /// The run terminated with the given verdict.
    Finished(Verdict),
}

/// The materialized tape window recorded in a trace entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapeSnapshot {
    /// The materialized cells, left to right.
    pub cells: String,
    /// Logical coordinate of the head.
    pub head: i64,
}

/// One record of the step-by-step simulation trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: usize,
    /// Names of the states active after the step.
    pub states: Vec<String>,
    pub remaining_input: String,
    pub current_symbol: Option<char>,
    pub description: String,
    /// PDA only: the canonical display stack, top at the right end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<char>>,
    /// TM only: the materialized tape window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tape: Option<TapeSnapshot>,
}

/// A problem found by `validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// FA/PDA: no state is flagged initial.
    MissingInitialState,
    /// Finite models: no state is flagged final.
    MissingFinalState,
    /// DFA: two transitions from the same state accept the same symbol.
    NondeterministicChoice { state: String, symbol: char },
    /// DFA: an ε-transition is present.
    EpsilonTransition { state: String },
    /// DFA: a (state, symbol) pair has no outgoing transition.
    MissingTransition { state: String, symbol: char },
    /// A non-initial state is unreachable from the initial state.
    UnreachableState { state: String },
    /// TM: a non-halt, non-final state has no outgoing transitions.
    DeadEndState { state: String },
    /// A transition references a state that does not exist.
    DanglingTransition { id: TransitionId },
    /// A transition carries a label of the wrong machine type.
    ForeignLabel { id: TransitionId },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::MissingInitialState => write!(f, "No initial state is set"),
            ValidationIssue::MissingFinalState => write!(f, "No state is flagged final"),
            ValidationIssue::NondeterministicChoice { state, symbol } => write!(
                f,
                "State '{state}' has more than one transition on symbol '{symbol}'"
            ),
            ValidationIssue::EpsilonTransition { state } => {
                write!(f, "State '{state}' has an ε-transition, forbidden in a DFA")
            }
            ValidationIssue::MissingTransition { state, symbol } => {
                write!(f, "State '{state}' has no transition on symbol '{symbol}'")
            }
            ValidationIssue::UnreachableState { state } => {
                write!(f, "State '{state}' is unreachable from the initial state")
            }
            ValidationIssue::DeadEndState { state } => {
                write!(f, "State '{state}' has no outgoing transitions")
            }
            ValidationIssue::DanglingTransition { id } => {
                write!(f, "Transition {id} references a state that does not exist")
            }
            ValidationIssue::ForeignLabel { id } => {
                write!(f, "Transition {id} carries a label of the wrong machine type")
            }
        }
    }
}

/// The result of validating an automaton against the contract of its type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns `true` if no errors were found; warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Errors surfaced by parsing, serialization, and file handling.
///
/// Simulation outcomes are never errors: rejection and step-budget
/// exhaustion are ordinary verdicts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A transition label does not match the mini-grammar of its machine type.
    #[error("Label parse error: {0}")]
    LabelParse(#[from] Box<pest::error::Error<Rule>>),
    /// A transition label is structurally wrong for its machine type.
    #[error("Invalid label: {0}")]
    InvalidLabel(String),
    /// Malformed structured document.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Malformed interchange XML.
    #[error("Interchange error: {0}")]
    Interchange(String),
    /// A file could not be read or written.
    #[error("File error: {0}")]
    File(String),
    /// A bundled machine was requested that does not exist.
    #[error("Unknown machine: {0}")]
    UnknownMachine(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip() {
        for (c, d) in [
            ('L', Direction::Left),
            ('r', Direction::Right),
            ('S', Direction::Stay),
        ] {
            assert_eq!(Direction::from_char(c), Some(d));
        }
        assert_eq!(Direction::from_char('x'), None);
        assert_eq!(Direction::Left.as_char(), 'L');
    }

    #[test]
    fn test_direction_serialization() {
        let json = serde_json::to_string(&Direction::Left).unwrap();
        assert_eq!(json, "\"L\"");
        let back: Direction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Direction::Left);
    }

    #[test]
    fn test_machine_type_tags() {
        assert_eq!(serde_json::to_string(&MachineType::Dfa).unwrap(), "\"dfa\"");
        assert_eq!(serde_json::to_string(&MachineType::Tm).unwrap(), "\"tm\"");
        let back: MachineType = serde_json::from_str("\"pda\"").unwrap();
        assert_eq!(back, MachineType::Pda);
    }

    #[test]
    fn test_epsilon_label() {
        let label = TransitionLabel::epsilon();
        assert!(label.is_epsilon());
        assert!(!label.accepts('a'));

        let label = TransitionLabel::symbols(['a', 'b']);
        assert!(!label.is_epsilon());
        assert!(label.accepts('a'));
        assert!(!label.accepts('c'));
    }

    #[test]
    fn test_label_input_symbols() {
        let pda = TransitionLabel::Pda {
            input: Some('a'),
            pop: Some('Z'),
            push: "AZ".to_string(),
        };
        assert_eq!(pda.input_symbols(), vec!['a']);

        let tm = TransitionLabel::Tm {
            read: '0',
            write: '1',
            direction: Direction::Right,
        };
        assert!(tm.input_symbols().is_empty());
    }

    #[test]
    fn test_verdict_default_undecided() {
        assert_eq!(Verdict::default(), Verdict::Undecided);
        assert!(!Verdict::Undecided.is_decided());
        assert!(Verdict::Rejected.is_decided());
    }
}
