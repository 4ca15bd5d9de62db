//! Deterministic finite automaton semantics: singleton-state stepping,
//! determinism validation, and the structural conversion to an NFA.

use std::collections::{HashSet, VecDeque};

use crate::automaton::{Automaton, Configurations, MachineConfig};
use crate::types::{
    StateId, StepOutcome, ValidationIssue, ValidationReport, Verdict,
};

pub(crate) fn init(a: &mut Automaton) {
    let active: Vec<StateId> = a.initial_state().into_iter().collect();
    a.sim.configurations = Configurations::Finite(active);
    match a.initial_state() {
        Some(q0) => {
            let name = a.state_name(q0);
            a.push_trace_entry(&format!("Start in state {name}"), None);
        }
        None => a.push_trace_entry("No initial state; nothing to run", None),
    }
}

/// One DFA step: read the symbol under the cursor and take the unique
/// matching transition. A missing transition rejects immediately.
pub(crate) fn step(a: &mut Automaton) -> StepOutcome {
    let active = match &a.sim.configurations {
        Configurations::Finite(states) => states.clone(),
        _ => vec![],
    };
    let Some(&q) = active.first() else {
        return StepOutcome::Finished(Verdict::Rejected);
    };
    let Some(symbol) = a.sim.current_symbol() else {
        // Input exhausted; acceptance was already decidable.
        return StepOutcome::Finished(check_acceptance(a));
    };

    let chosen = a
        .transitions_from(q)
        .into_iter()
        .find(|t| t.label.accepts(symbol))
        .map(|t| (t.id, t.to));

    match chosen {
        None => {
            let name = a.state_name(q);
            a.push_trace_entry(
                &format!("No transition from {name} on '{symbol}'; input rejected"),
                Some(symbol),
            );
            StepOutcome::Finished(Verdict::Rejected)
        }
        Some((transition_id, target)) => {
            a.highlight_transition(transition_id);
            a.sim.configurations = Configurations::Finite(vec![target]);
            a.sim.cursor += 1;
            let description = format!(
                "Read '{symbol}': {} → {}",
                a.state_name(q),
                a.state_name(target)
            );
            a.push_trace_entry(&description, Some(symbol));
            StepOutcome::Continue
        }
    }
}

/// Accepts iff the cursor has consumed the whole input and the active state
/// is final. An empty active set rejects.
pub(crate) fn check_acceptance(a: &Automaton) -> Verdict {
    let active = match &a.sim.configurations {
        Configurations::Finite(states) => states,
        _ => return Verdict::Rejected,
    };
    let Some(&q) = active.first() else {
        return Verdict::Rejected;
    };
    if a.sim.cursor < a.sim.input.len() {
        return Verdict::Undecided;
    }
    if a.state(q).map(|s| s.is_final).unwrap_or(false) {
        Verdict::Accepted
    } else {
        Verdict::Rejected
    }
}

pub(crate) fn validate(a: &Automaton, report: &mut ValidationReport) {
    if a.final_states().is_empty() {
        report.errors.push(ValidationIssue::MissingFinalState);
    }

    // Determinism: at most one transition per (state, symbol), and no ε.
    for state in a.states() {
        let mut seen: HashSet<char> = HashSet::new();
        let mut reported: HashSet<char> = HashSet::new();
        for transition in a.transitions_from(state.id) {
            if transition.label.is_epsilon() {
                report.errors.push(ValidationIssue::EpsilonTransition {
                    state: state.name.clone(),
                });
            }
            for symbol in transition.label.input_symbols() {
                if !seen.insert(symbol) && reported.insert(symbol) {
                    report.errors.push(ValidationIssue::NondeterministicChoice {
                        state: state.name.clone(),
                        symbol,
                    });
                }
            }
        }
    }

    // Completeness: every (state, alphabet symbol) pair needs an edge.
    for state in a.states() {
        for &symbol in a.alphabet() {
            let covered = a
                .transitions_from(state.id)
                .iter()
                .any(|t| t.label.accepts(symbol));
            if !covered {
                report.warnings.push(ValidationIssue::MissingTransition {
                    state: state.name.clone(),
                    symbol,
                });
            }
        }
    }

    unreachable_warnings(a, report);
}

/// Flags every non-initial state not reached by a forward BFS over the
/// transition graph. Incoming edges alone do not make a state reachable.
pub(crate) fn unreachable_warnings(a: &Automaton, report: &mut ValidationReport) {
    let mut reached: HashSet<StateId> = HashSet::new();
    let mut queue: VecDeque<StateId> = VecDeque::new();
    if let Some(q0) = a.initial_state() {
        reached.insert(q0);
        queue.push_back(q0);
    }
    while let Some(q) = queue.pop_front() {
        for transition in a.transitions_from(q) {
            if reached.insert(transition.to) {
                queue.push_back(transition.to);
            }
        }
    }
    for state in a.states() {
        if !state.is_initial && !reached.contains(&state.id) {
            report.warnings.push(ValidationIssue::UnreachableState {
                state: state.name.clone(),
            });
        }
    }
}

impl Automaton {
    /// Emits a structurally identical NFA: same states, same transitions,
    /// only the type tag changes. On non-DFA machines this is a plain copy.
    pub fn to_nfa(&self) -> Automaton {
        let mut nfa = self.clone();
        if nfa.machine_type() == crate::types::MachineType::Dfa {
            nfa.config = MachineConfig::Nfa;
        }
        nfa.reset_simulation();
        nfa.reset_history();
        nfa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MachineType, Point, StateNode, Transition, TransitionLabel};

    /// The `(ab)+` machine: q0 -a→ q1 -b→ q2 (final), q2 -a→ q1.
    fn ab_plus() -> Automaton {
        let mut a = Automaton::new(MachineType::Dfa);
        let q0 = a.add_state(StateNode::new("q0", Point::new(100.0, 100.0)));
        let q1 = a.add_state(StateNode::new("q1", Point::new(240.0, 100.0)));
        let q2 = a.add_state(StateNode::new("q2", Point::new(380.0, 100.0)).with_final(true));
        a.add_transition(Transition::new(q0, q1, TransitionLabel::symbols(['a'])))
            .unwrap();
        a.add_transition(Transition::new(q1, q2, TransitionLabel::symbols(['b'])))
            .unwrap();
        a.add_transition(Transition::new(q2, q1, TransitionLabel::symbols(['a'])))
            .unwrap();
        a
    }

    #[test]
    fn test_ab_plus_language() {
        let mut a = ab_plus();
        assert!(a.accepts("ab"));
        assert!(a.accepts("abab"));
        assert!(!a.accepts(""));
        assert!(!a.accepts("a"));
        assert!(!a.accepts("abb"));
        assert!(!a.accepts("ba"));
    }

    #[test]
    fn test_rejection_terminates_run() {
        let mut a = ab_plus();
        a.init_simulation("ba");
        let outcome = a.step();
        assert_eq!(outcome, StepOutcome::Finished(Verdict::Rejected));
        assert!(a
            .trace()
            .last()
            .unwrap()
            .description
            .contains("No transition"));
    }

    #[test]
    fn test_step_highlights_taken_transition() {
        let mut a = ab_plus();
        a.init_simulation("ab");
        a.step();
        let highlighted: Vec<_> = a.transitions().iter().filter(|t| t.highlighted).collect();
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].from, a.states()[0].id);

        // Highlights last exactly one step.
        a.step();
        let highlighted: Vec<_> = a.transitions().iter().filter(|t| t.highlighted).collect();
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].to, a.states()[2].id);
    }

    #[test]
    fn test_validate_flags_nondeterminism() {
        let mut a = ab_plus();
        let q0 = a.states()[0].id;
        let q2 = a.states()[2].id;
        a.add_transition(Transition::new(q0, q2, TransitionLabel::symbols(['a'])))
            .unwrap();
        let report = a.validate();
        assert!(report.errors.iter().any(|e| matches!(
            e,
            ValidationIssue::NondeterministicChoice { symbol: 'a', .. }
        )));
    }

    #[test]
    fn test_validate_flags_epsilon() {
        let mut a = ab_plus();
        let q0 = a.states()[0].id;
        a.add_transition(Transition::new(q0, q0, TransitionLabel::epsilon()))
            .unwrap();
        let report = a.validate();
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationIssue::EpsilonTransition { .. })));
    }

    #[test]
    fn test_validate_warns_incomplete() {
        let a = ab_plus();
        let report = a.validate();
        assert!(report.is_valid());
        // q0 has no 'b' edge, q1 no 'a' edge, q2 no 'b' edge.
        let missing: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| matches!(w, ValidationIssue::MissingTransition { .. }))
            .collect();
        assert_eq!(missing.len(), 3);
    }

    #[test]
    fn test_validate_warns_unreachable() {
        let mut a = ab_plus();
        a.add_state(StateNode::new("orphan", Point::default()));
        let report = a.validate();
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            ValidationIssue::UnreachableState { state } if state == "orphan"
        )));
    }

    #[test]
    fn test_initial_state_never_reported_unreachable() {
        let mut a = Automaton::new(MachineType::Dfa);
        a.add_state(StateNode::new("lonely", Point::default()).with_final(true));
        let report = a.validate();
        assert!(!report
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationIssue::UnreachableState { .. })));
    }

    #[test]
    fn test_to_nfa_is_structural() {
        let dfa = ab_plus();
        let nfa = dfa.to_nfa();
        assert_eq!(nfa.machine_type(), MachineType::Nfa);
        assert_eq!(nfa.states().len(), dfa.states().len());
        assert_eq!(nfa.transitions().len(), dfa.transitions().len());
        for (t1, t2) in dfa.transitions().iter().zip(nfa.transitions()) {
            assert_eq!(t1.from, t2.from);
            assert_eq!(t1.to, t2.to);
            assert_eq!(t1.label, t2.label);
        }
    }

    #[test]
    fn test_empty_input_decided_at_init() {
        let mut a = ab_plus();
        a.init_simulation("");
        assert_eq!(a.verdict(), Verdict::Rejected);

        let q0 = a.states()[0].id;
        a.set_final(q0, true);
        a.init_simulation("");
        assert_eq!(a.verdict(), Verdict::Accepted);
    }
}
