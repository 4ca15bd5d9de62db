//! Turing machine semantics: a two-way-infinite tape over a materialized
//! window, first-match transition selection with blank normalization, halt
//! handling, and a heuristic loop guard.

use std::collections::HashMap;

use crate::automaton::{Automaton, Configurations};
use crate::types::{
    Direction, StateId, StepOutcome, TapeSnapshot, TransitionLabel, ValidationIssue,
    ValidationReport, Verdict, BLANK_SYMBOL, INPUT_BLANK_SYMBOL,
};

/// How many trace entries must exist before the loop guard engages.
const LOOP_GUARD_WARMUP: usize = 100;
/// How many recent trace entries the loop guard inspects.
const LOOP_GUARD_WINDOW: usize = 50;
/// A configuration triple seen more often than this within the window is
/// treated as a potential infinite loop.
const LOOP_GUARD_REPEATS: usize = 2;

/// A logically two-way-infinite tape.
///
/// Only a finite window is materialized; `origin` is the logical coordinate
/// of the first materialized cell, and the head is kept inside the window by
/// growing it one blank at a time. All logical ↔ physical conversion happens
/// here; already-written cells keep their logical coordinates across growth
/// at either end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tape {
    cells: Vec<char>,
    origin: i64,
    head: usize,
    blank: char,
}

impl Tape {
    /// Materializes a tape holding `input`, head on the first cell. An empty
    /// input materializes a single blank cell.
    pub fn new(input: &str, blank: char) -> Tape {
        let mut cells: Vec<char> = input.chars().collect();
        if cells.is_empty() {
            cells.push(blank);
        }
        Tape {
            cells,
            origin: 0,
            head: 0,
            blank,
        }
    }

    /// The symbol under the head.
    pub fn read(&self) -> char {
        self.cells[self.head]
    }

    /// Replaces the cell under the head.
    pub fn write(&mut self, symbol: char) {
        self.cells[self.head] = symbol;
    }

    /// Moves the head, extending the materialized window when it would step
    /// outside. On left-extension the origin shifts so logical coordinates
    /// of existing cells are unchanged.
    pub fn move_head(&mut self, direction: Direction) {
        match direction {
            Direction::Left => {
                if self.head == 0 {
                    self.cells.insert(0, self.blank);
                    self.origin -= 1;
                } else {
                    self.head -= 1;
                }
            }
            Direction::Right => {
                self.head += 1;
                if self.head == self.cells.len() {
                    self.cells.push(self.blank);
                }
            }
            Direction::Stay => {}
        }
    }

    /// The logical coordinate of the head.
    pub fn head_logical(&self) -> i64 {
        self.origin + self.head as i64
    }

    /// Logical coordinate of the leftmost materialized cell.
    pub fn left_logical(&self) -> i64 {
        self.origin
    }

    /// Logical coordinate of the rightmost materialized cell.
    pub fn right_logical(&self) -> i64 {
        self.origin + self.cells.len() as i64 - 1
    }

    /// Reads the cell at a logical coordinate; unmaterialized cells read as
    /// blank.
    pub fn read_at(&self, logical: i64) -> char {
        if logical < self.origin {
            return self.blank;
        }
        let index = (logical - self.origin) as usize;
        self.cells.get(index).copied().unwrap_or(self.blank)
    }

    /// The materialized window, left to right.
    pub fn cells(&self) -> &[char] {
        &self.cells
    }

    pub fn blank(&self) -> char {
        self.blank
    }

    pub(crate) fn snapshot(&self) -> TapeSnapshot {
        TapeSnapshot {
            cells: self.cells.iter().collect(),
            head: self.head_logical(),
        }
    }
}

/// The single configuration of a deterministic Turing machine run.
#[derive(Debug, Clone, PartialEq)]
pub struct TmConfiguration {
    pub state: StateId,
    pub tape: Tape,
}

pub(crate) fn init(a: &mut Automaton) {
    let blank = a.blank_symbol();
    let input: String = a.sim.input.iter().collect();
    let config = a.initial_state().map(|q0| TmConfiguration {
        state: q0,
        tape: Tape::new(&input, blank),
    });
    a.sim.configurations = Configurations::Tm(config);
    match a.initial_state() {
        Some(q0) => {
            let name = a.state_name(q0);
            a.push_trace_entry(&format!("Start in state {name}, head at cell 0"), None);
        }
        None => a.push_trace_entry("No initial state; nothing to run", None),
    }
}

/// One TM step: pick the first transition of the current state whose read
/// symbol matches the cell under the head, write, move, and switch state.
/// Entering a final or halt state terminates the run; a missing transition
/// terminates it immediately.
pub(crate) fn step(a: &mut Automaton) -> StepOutcome {
    let Configurations::Tm(Some(mut config)) = a.sim.configurations.clone() else {
        return StepOutcome::Finished(Verdict::Rejected);
    };
    let blank = a.blank_symbol();
    let current = config.tape.read();

    let chosen = a
        .transitions_from(config.state)
        .into_iter()
        .find_map(|t| match &t.label {
            TransitionLabel::Tm {
                read,
                write,
                direction,
            } if matches_symbol(*read, current, blank) => {
                Some((t.id, t.to, *write, *direction))
            }
            _ => None,
        });

    let Some((transition_id, target, write, direction)) = chosen else {
        let state = a.state(config.state);
        let is_final = state.map(|s| s.is_final).unwrap_or(false);
        let name = a.state_name(config.state);
        let verdict = if is_final {
            a.push_trace_entry(&format!("Halted in final state {name}; input accepted"), None);
            Verdict::Accepted
        } else {
            a.push_trace_entry(
                &format!("No transition from {name} on '{current}'; input rejected"),
                None,
            );
            Verdict::Rejected
        };
        return StepOutcome::Finished(verdict);
    };

    config.tape.write(normalize(write, blank));
    config.tape.move_head(direction);
    let source = config.state;
    config.state = target;
    a.highlight_transition(transition_id);

    let (is_final, is_halt) = a
        .state(target)
        .map(|s| (s.is_final, s.is_halt))
        .unwrap_or((false, false));
    a.sim.configurations = Configurations::Tm(Some(config));

    let description = format!(
        "Read '{current}', wrote '{}', moved {}: {} → {}",
        normalize(write, blank),
        direction.as_char(),
        a.state_name(source),
        a.state_name(target),
    );
    a.push_trace_entry(&description, Some(current));

    if is_final || is_halt {
        let verdict = if is_final {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        };
        let name = a.state_name(target);
        let note = if is_final {
            format!("Reached final state {name}; input accepted")
        } else {
            format!("Reached halt state {name} without final flag; input rejected")
        };
        a.push_trace_entry(&note, None);
        return StepOutcome::Finished(verdict);
    }
    StepOutcome::Continue
}

/// Heuristic nontermination guard, consulted by `run` after every step.
///
/// Once the trace has grown past the warmup length, the run is suspected of
/// looping when more than `LOOP_GUARD_REPEATS` of the most recent entries
/// share the exact (state, head position, tape contents) triple. This is a
/// heuristic, not a decision procedure; a firing guard rejects the input.
pub(crate) fn loop_suspected(a: &Automaton) -> bool {
    let trace = a.trace();
    if trace.len() <= LOOP_GUARD_WARMUP {
        return false;
    }
    let window = &trace[trace.len().saturating_sub(LOOP_GUARD_WINDOW)..];
    let mut seen: HashMap<(&str, i64, &str), usize> = HashMap::new();
    for entry in window {
        let Some(tape) = &entry.tape else { continue };
        let Some(state) = entry.states.first() else { continue };
        let key = (state.as_str(), tape.head, tape.cells.as_str());
        let count = seen.entry(key).or_insert(0);
        *count += 1;
        if *count > LOOP_GUARD_REPEATS {
            return true;
        }
    }
    false
}

/// A TM is valid without final states. Non-halt, non-final states with no
/// outgoing transitions are merely suspicious.
pub(crate) fn validate(a: &Automaton, report: &mut ValidationReport) {
    for state in a.states() {
        if !state.is_final && !state.is_halt && a.transitions_from(state.id).is_empty() {
            report.warnings.push(ValidationIssue::DeadEndState {
                state: state.name.clone(),
            });
        }
    }
}

/// The tape symbols a machine can ever see: the blank plus every symbol read
/// or written by a transition. Used by serialization.
pub(crate) fn tape_alphabet(a: &Automaton) -> Vec<char> {
    let mut symbols = std::collections::BTreeSet::new();
    symbols.insert(a.blank_symbol());
    for transition in a.transitions() {
        if let TransitionLabel::Tm { read, write, .. } = &transition.label {
            symbols.insert(*read);
            symbols.insert(*write);
        }
    }
    symbols.into_iter().collect()
}

fn matches_symbol(label_read: char, cell: char, blank: char) -> bool {
    normalize(label_read, blank) == cell
}

/// The blank substitutes □ and `_` stand for the configured blank symbol.
fn normalize(symbol: char, blank: char) -> char {
    if symbol == BLANK_SYMBOL || symbol == INPUT_BLANK_SYMBOL {
        blank
    } else {
        symbol
    }
}
