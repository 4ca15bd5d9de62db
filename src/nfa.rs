//! Nondeterministic finite automaton semantics: ε-closure, set-valued
//! stepping, and the subset construction to an equivalent DFA.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::automaton::{Automaton, Configurations};
use crate::dfa::unreachable_warnings;
use crate::types::{
    MachineType, Point, StateId, StateNode, StepOutcome, Transition, TransitionLabel,
    ValidationIssue, ValidationReport, Verdict,
};

/// Computes the ε-closure of a set of states: the least superset closed
/// under following ε-transitions. Worklist algorithm over a stack.
pub(crate) fn epsilon_closure(a: &Automaton, seed: &BTreeSet<StateId>) -> BTreeSet<StateId> {
    let mut closure = seed.clone();
    let mut stack: Vec<StateId> = seed.iter().copied().collect();
    while let Some(q) = stack.pop() {
        for transition in a.transitions_from(q) {
            if transition.label.is_epsilon() && closure.insert(transition.to) {
                stack.push(transition.to);
            }
        }
    }
    closure
}

pub(crate) fn init(a: &mut Automaton) {
    let active: Vec<StateId> = match a.initial_state() {
        Some(q0) => epsilon_closure(a, &BTreeSet::from([q0])).into_iter().collect(),
        None => vec![],
    };
    a.sim.configurations = Configurations::Finite(active);
    let names = active_names(a);
    a.push_trace_entry(&format!("Start in states {{{names}}}"), None);
}

/// One NFA step: consume the symbol under the cursor, move every active
/// state along its matching transitions, then ε-close the result.
pub(crate) fn step(a: &mut Automaton) -> StepOutcome {
    let active = match &a.sim.configurations {
        Configurations::Finite(states) => states.clone(),
        _ => vec![],
    };
    if active.is_empty() {
        return StepOutcome::Finished(Verdict::Rejected);
    }
    let Some(symbol) = a.sim.current_symbol() else {
        return StepOutcome::Finished(check_acceptance(a));
    };

    let mut moved: BTreeSet<StateId> = BTreeSet::new();
    let mut used = Vec::new();
    for &q in &active {
        for transition in a.transitions_from(q) {
            if transition.label.accepts(symbol) {
                moved.insert(transition.to);
                used.push(transition.id);
            }
        }
    }
    for id in used {
        a.highlight_transition(id);
    }

    if moved.is_empty() {
        a.push_trace_entry(
            &format!("No active state accepts '{symbol}'; input rejected"),
            Some(symbol),
        );
        a.sim.configurations = Configurations::Finite(vec![]);
        return StepOutcome::Finished(Verdict::Rejected);
    }

    let closed: Vec<StateId> = epsilon_closure(a, &moved).into_iter().collect();
    a.sim.configurations = Configurations::Finite(closed);
    a.sim.cursor += 1;
    let names = active_names(a);
    a.push_trace_entry(&format!("Read '{symbol}': active set {{{names}}}"), Some(symbol));
    StepOutcome::Continue
}

/// Accepts iff the whole input is consumed and some active state is final.
/// Mid-input acceptance is never claimed.
pub(crate) fn check_acceptance(a: &Automaton) -> Verdict {
    let active = match &a.sim.configurations {
        Configurations::Finite(states) => states,
        _ => return Verdict::Rejected,
    };
    if active.is_empty() {
        return Verdict::Rejected;
    }
    if a.sim.cursor < a.sim.input.len() {
        return Verdict::Undecided;
    }
    let any_final = active
        .iter()
        .any(|&q| a.state(q).map(|s| s.is_final).unwrap_or(false));
    if any_final {
        Verdict::Accepted
    } else {
        Verdict::Rejected
    }
}

pub(crate) fn validate(a: &Automaton, report: &mut ValidationReport) {
    if a.final_states().is_empty() {
        report.errors.push(ValidationIssue::MissingFinalState);
    }
    unreachable_warnings(a, report);
}

fn active_names(a: &Automaton) -> String {
    a.active_states()
        .iter()
        .map(|&id| a.state_name(id))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Automaton {
    /// Determinizes an NFA via the subset construction.
    ///
    /// DFA states are the ε-closed subsets of NFA states reachable from the
    /// initial closure; the canonical subset identity is the sorted sequence
    /// of member ids, and the DFA state is named `{q_i, q_j, …}` after its
    /// members. A subset is final iff it contains a final NFA state.
    ///
    /// On machines that are not NFAs this is a plain copy.
    pub fn to_dfa(&self) -> Automaton {
        if self.machine_type() != MachineType::Nfa {
            let mut copy = self.clone();
            copy.reset_simulation();
            copy.reset_history();
            return copy;
        }

        let mut dfa = Automaton::new(MachineType::Dfa);
        dfa.name = self.name.clone();
        let Some(q0) = self.initial_state() else {
            dfa.reset_history();
            return dfa;
        };

        let alphabet: Vec<char> = self.alphabet().iter().copied().collect();
        let initial: Vec<StateId> = epsilon_closure(self, &BTreeSet::from([q0]))
            .into_iter()
            .collect();

        // Canonical subset identity → DFA state id.
        let mut subset_ids: HashMap<Vec<StateId>, StateId> = HashMap::new();
        let mut queue: VecDeque<Vec<StateId>> = VecDeque::new();

        let id = dfa.add_state(self.subset_state(&initial, 0));
        subset_ids.insert(initial.clone(), id);
        queue.push_back(initial);

        while let Some(subset) = queue.pop_front() {
            let from_id = subset_ids[&subset];
            for &symbol in &alphabet {
                let mut moved: BTreeSet<StateId> = BTreeSet::new();
                for &q in &subset {
                    for transition in self.transitions_from(q) {
                        if transition.label.accepts(symbol) {
                            moved.insert(transition.to);
                        }
                    }
                }
                if moved.is_empty() {
                    continue;
                }
                let target: Vec<StateId> =
                    epsilon_closure(self, &moved).into_iter().collect();
                let to_id = match subset_ids.get(&target) {
                    Some(&id) => id,
                    None => {
                        let id = dfa.add_state(self.subset_state(&target, subset_ids.len()));
                        subset_ids.insert(target.clone(), id);
                        queue.push_back(target);
                        id
                    }
                };
                let _ = dfa.add_transition(Transition::new(
                    from_id,
                    to_id,
                    TransitionLabel::symbols([symbol]),
                ));
            }
        }

        dfa.reset_history();
        dfa
    }

    /// Builds the DFA state for a subset: named after its members, final iff
    /// any member is final, laid out on a coarse grid.
    fn subset_state(&self, subset: &[StateId], index: usize) -> StateNode {
        let names = subset
            .iter()
            .map(|&id| self.state_name(id))
            .collect::<Vec<_>>()
            .join(", ");
        let is_final = subset
            .iter()
            .any(|&id| self.state(id).map(|s| s.is_final).unwrap_or(false));
        let position = Point::new(
            120.0 + 170.0 * (index % 4) as f64,
            120.0 + 140.0 * (index / 4) as f64,
        );
        StateNode::new(format!("{{{names}}}"), position).with_final(is_final)
    }
}
