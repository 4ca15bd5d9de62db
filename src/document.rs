//! The structured serialization form: a flat document that round-trips every
//! core field of an automaton. Undo snapshots and `test_string` working
//! copies are built on this form as well.

use serde::{Deserialize, Serialize};

use crate::automaton::{Automaton, MachineConfig, PdaConfig, Simulation, TmConfig};
use crate::types::{
    Direction, EngineError, MachineType, Point, StateId, StateNode, TransitionId,
    TransitionLabel, BLANK_SYMBOL, DEFAULT_STACK_SYMBOL,
};

/// Wire form of a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDoc {
    pub id: StateId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub is_initial: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_halt: bool,
}

/// Wire form of a transition. The label fields are a union over the machine
/// types; absent fields mean ε for the types that read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDoc {
    pub id: TransitionId,
    pub from_state: StateId,
    pub to_state: StateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<char>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_read: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_write: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_symbol: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_symbol: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_point: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_offset: Option<f64>,
}

/// Wire form of a whole automaton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDoc {
    #[serde(rename = "type")]
    pub machine_type: MachineType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub states: Vec<StateDoc>,
    #[serde(default)]
    pub transitions: Vec<TransitionDoc>,
    #[serde(default)]
    pub alphabet: Vec<char>,
    #[serde(default)]
    pub initial_state_id: Option<StateId>,
    /// TM only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blank_symbol: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tape_alphabet: Option<Vec<char>>,
    /// PDA only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_stack_symbol: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_by_final_state: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_by_empty_stack: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_alphabet: Option<Vec<char>>,
}

/// Serializes an automaton into its structured document.
pub(crate) fn to_structured(a: &Automaton) -> MachineDoc {
    let states = a
        .states()
        .iter()
        .map(|s| StateDoc {
            id: s.id,
            name: s.name.clone(),
            x: s.position.x,
            y: s.position.y,
            is_initial: s.is_initial,
            is_final: s.is_final,
            is_halt: s.is_halt,
        })
        .collect();

    let transitions = a
        .transitions()
        .iter()
        .map(|t| {
            let mut doc = TransitionDoc {
                id: t.id,
                from_state: t.from,
                to_state: t.to,
                symbols: None,
                stack_read: None,
                stack_write: None,
                read_symbol: None,
                write_symbol: None,
                direction: None,
                control_point: t.control_point,
                label_offset: t.label_offset,
            };
            match &t.label {
                TransitionLabel::Finite { symbols } => {
                    doc.symbols = Some(symbols.clone());
                }
                TransitionLabel::Pda { input, pop, push } => {
                    doc.symbols = Some(input.iter().copied().collect());
                    doc.stack_read = *pop;
                    doc.stack_write = Some(push.clone());
                }
                TransitionLabel::Tm {
                    read,
                    write,
                    direction,
                } => {
                    doc.read_symbol = Some(*read);
                    doc.write_symbol = Some(*write);
                    doc.direction = Some(*direction);
                }
            }
            doc
        })
        .collect();

    let mut doc = MachineDoc {
        machine_type: a.machine_type(),
        name: Some(a.name.clone()),
        states,
        transitions,
        alphabet: a.alphabet().iter().copied().collect(),
        initial_state_id: a.initial_state(),
        blank_symbol: None,
        tape_alphabet: None,
        initial_stack_symbol: None,
        accept_by_final_state: None,
        accept_by_empty_stack: None,
        stack_alphabet: None,
    };

    if let Some(config) = a.tm_config() {
        doc.blank_symbol = Some(config.blank_symbol);
        doc.tape_alphabet = Some(crate::tm::tape_alphabet(a));
    }
    if let Some(config) = a.pda_config() {
        doc.initial_stack_symbol = Some(config.initial_stack_symbol);
        doc.accept_by_final_state = Some(config.accept_by_final_state);
        doc.accept_by_empty_stack = Some(config.accept_by_empty_stack);
        doc.stack_alphabet = Some(crate::pda::stack_alphabet(a));
    }
    doc
}

/// Reconstructs an automaton from a structured document.
///
/// Malformed documents (duplicate ids, dangling endpoints, unknown initial
/// state) are reported as a single error and build nothing, so a caller's
/// existing model stays intact.
pub(crate) fn from_structured(doc: &MachineDoc) -> Result<Automaton, EngineError> {
    validate_doc(doc)?;
    let mut automaton = Automaton::new(doc.machine_type);
    apply(doc, &mut automaton);
    automaton.reset_history();
    Ok(automaton)
}

fn validate_doc(doc: &MachineDoc) -> Result<(), EngineError> {
    let mut ids = std::collections::HashSet::new();
    for state in &doc.states {
        if !ids.insert(state.id) {
            return Err(EngineError::Serialization(format!(
                "Duplicate state id {}",
                state.id
            )));
        }
    }
    for transition in &doc.transitions {
        for endpoint in [transition.from_state, transition.to_state] {
            if !ids.contains(&endpoint) {
                return Err(EngineError::Serialization(format!(
                    "Transition {} references unknown state {endpoint}",
                    transition.id
                )));
            }
        }
    }
    if let Some(initial) = doc.initial_state_id {
        if !ids.contains(&initial) {
            return Err(EngineError::Serialization(format!(
                "Initial state {initial} does not exist"
            )));
        }
    }
    Ok(())
}

/// Overwrites the model part of `automaton` with the document contents:
/// identities are taken verbatim, endpoints rewired, the alphabet rebuilt,
/// and the id counters reset past the highest loaded id.
///
/// The document must have passed `validate_doc`; undo snapshots always have.
pub(crate) fn apply(doc: &MachineDoc, automaton: &mut Automaton) {
    automaton.name = doc.name.clone().unwrap_or_else(|| "Untitled".to_string());
    automaton.config = config_from(doc);

    automaton.states = doc
        .states
        .iter()
        .map(|s| StateNode {
            id: s.id,
            name: s.name.clone(),
            position: Point::new(s.x, s.y),
            is_initial: s.is_initial,
            is_final: s.is_final,
            is_halt: s.is_halt,
            active: false,
            selected: false,
        })
        .collect();

    automaton.transitions = doc
        .transitions
        .iter()
        .map(|t| crate::types::Transition {
            id: t.id,
            from: t.from_state,
            to: t.to_state,
            label: label_from(t, doc.machine_type),
            control_point: t.control_point,
            label_offset: t.label_offset,
            highlighted: false,
        })
        .collect();

    // The explicit reference wins over the per-state flags; afterwards the
    // flags agree with it.
    let initial = doc
        .initial_state_id
        .filter(|id| automaton.states.iter().any(|s| s.id == *id))
        .or_else(|| {
            automaton
                .states
                .iter()
                .find(|s| s.is_initial)
                .map(|s| s.id)
        });
    automaton.initial = initial;
    for state in &mut automaton.states {
        state.is_initial = Some(state.id) == initial;
    }

    automaton.next_state_id = doc.states.iter().map(|s| s.id + 1).max().unwrap_or(0);
    automaton.next_transition_id = doc.transitions.iter().map(|t| t.id + 1).max().unwrap_or(0);
    automaton.rebuild_alphabet();
    automaton.sim = Simulation::default();
}

fn config_from(doc: &MachineDoc) -> MachineConfig {
    match doc.machine_type {
        MachineType::Dfa => MachineConfig::Dfa,
        MachineType::Nfa => MachineConfig::Nfa,
        MachineType::Pda => MachineConfig::Pda(PdaConfig {
            initial_stack_symbol: doc.initial_stack_symbol.unwrap_or(DEFAULT_STACK_SYMBOL),
            accept_by_final_state: doc.accept_by_final_state.unwrap_or(true),
            accept_by_empty_stack: doc.accept_by_empty_stack.unwrap_or(false),
        }),
        MachineType::Tm => MachineConfig::Tm(TmConfig {
            blank_symbol: doc.blank_symbol.unwrap_or(BLANK_SYMBOL),
        }),
    }
}

fn label_from(doc: &TransitionDoc, machine_type: MachineType) -> TransitionLabel {
    match machine_type {
        MachineType::Dfa | MachineType::Nfa => TransitionLabel::Finite {
            symbols: doc.symbols.clone().unwrap_or_default(),
        },
        MachineType::Pda => TransitionLabel::Pda {
            input: doc.symbols.as_ref().and_then(|s| s.first().copied()),
            pop: doc.stack_read,
            push: doc.stack_write.clone().unwrap_or_default(),
        },
        MachineType::Tm => TransitionLabel::Tm {
            read: doc.read_symbol.unwrap_or(BLANK_SYMBOL),
            write: doc.write_symbol.unwrap_or(BLANK_SYMBOL),
            direction: doc.direction.unwrap_or(Direction::Stay),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StateNode, Transition};

    fn sample_pda() -> Automaton {
        let mut a = Automaton::new(MachineType::Pda);
        a.name = "aⁿbⁿ".to_string();
        let q0 = a.add_state(StateNode::new("q0", Point::new(100.0, 100.0)));
        let q1 = a.add_state(StateNode::new("q1", Point::new(260.0, 100.0)).with_final(true));
        a.add_transition(Transition::new(
            q0,
            q1,
            TransitionLabel::Pda {
                input: Some('a'),
                pop: Some('Z'),
                push: "AZ".to_string(),
            },
        ))
        .unwrap();
        a
    }

    #[test]
    fn test_structured_round_trip_pda() {
        let a = sample_pda();
        let doc = a.to_structured();
        let b = Automaton::from_structured(&doc).unwrap();

        assert_eq!(b.name, a.name);
        assert_eq!(b.machine_type(), MachineType::Pda);
        assert_eq!(b.states(), a.states());
        assert_eq!(b.transitions(), a.transitions());
        assert_eq!(b.initial_state(), a.initial_state());
        assert_eq!(b.alphabet(), a.alphabet());
        assert_eq!(b.pda_config(), a.pda_config());
        assert_eq!(b.to_structured(), doc);
    }

    #[test]
    fn test_round_trip_preserves_geometry_extras() {
        let mut a = sample_pda();
        let q0 = a.states()[0].id;
        let mut t = Transition::new(q0, q0, TransitionLabel::Pda {
            input: None,
            pop: None,
            push: String::new(),
        });
        t.control_point = Some(Point::new(180.0, 40.0));
        t.label_offset = Some(-12.0);
        a.add_transition(t).unwrap();

        let b = Automaton::from_structured(&a.to_structured()).unwrap();
        let restored = b.transitions().last().unwrap();
        assert_eq!(restored.control_point, Some(Point::new(180.0, 40.0)));
        assert_eq!(restored.label_offset, Some(-12.0));
    }

    #[test]
    fn test_counters_reset_past_loaded_ids() {
        let a = sample_pda();
        let mut b = Automaton::from_structured(&a.to_structured()).unwrap();
        let fresh = b.add_state(StateNode::new("fresh", Point::default()));
        assert!(a.states().iter().all(|s| s.id != fresh));
    }

    #[test]
    fn test_load_is_not_undoable() {
        let a = sample_pda();
        let mut b = Automaton::from_structured(&a.to_structured()).unwrap();
        assert!(!b.undo());
    }

    #[test]
    fn test_dangling_endpoint_is_an_error() {
        let mut doc = sample_pda().to_structured();
        doc.transitions[0].to_state = 999;
        let result = Automaton::from_structured(&doc);
        assert!(matches!(result, Err(EngineError::Serialization(_))));
    }

    #[test]
    fn test_duplicate_state_id_is_an_error() {
        let mut doc = sample_pda().to_structured();
        doc.states[1].id = doc.states[0].id;
        assert!(Automaton::from_structured(&doc).is_err());
    }

    #[test]
    fn test_unknown_initial_reference_is_an_error() {
        let mut doc = sample_pda().to_structured();
        doc.initial_state_id = Some(42);
        assert!(Automaton::from_structured(&doc).is_err());
    }

    #[test]
    fn test_initial_flag_fallback() {
        let mut doc = sample_pda().to_structured();
        doc.initial_state_id = None;
        let b = Automaton::from_structured(&doc).unwrap();
        assert_eq!(b.initial_state(), Some(doc.states[0].id));
    }

    #[test]
    fn test_json_round_trip() {
        let a = sample_pda();
        let json = a.to_json();
        let b = Automaton::from_json(&json).unwrap();
        assert_eq!(b.to_structured(), a.to_structured());
    }

    #[test]
    fn test_json_field_names_are_camel_case() {
        let a = sample_pda();
        let json = a.to_json();
        assert!(json.contains("\"initialStateId\""));
        assert!(json.contains("\"fromState\""));
        assert!(json.contains("\"initialStackSymbol\""));
        assert!(json.contains("\"acceptByFinalState\""));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(Automaton::from_json("{ not json").is_err());
        assert!(Automaton::from_json("{\"type\": \"q-machine\"}").is_err());
    }

    #[test]
    fn test_tm_doc_carries_tape_fields() {
        let mut a = Automaton::new(MachineType::Tm);
        let q0 = a.add_state(StateNode::new("q0", Point::default()));
        a.add_transition(Transition::new(
            q0,
            q0,
            TransitionLabel::Tm {
                read: '0',
                write: '1',
                direction: Direction::Right,
            },
        ))
        .unwrap();

        let doc = a.to_structured();
        assert_eq!(doc.blank_symbol, Some(BLANK_SYMBOL));
        let tape_alphabet = doc.tape_alphabet.unwrap();
        assert!(tape_alphabet.contains(&'0'));
        assert!(tape_alphabet.contains(&'1'));
        assert!(doc.initial_stack_symbol.is_none());
    }
}
