//! Pushdown automaton semantics: a concurrently explored set of
//! `(state, stack, inputIndex)` configurations with ε-moves, and acceptance
//! by final state and/or empty stack.

use crate::automaton::{Automaton, Configurations};
use crate::types::{
    StateId, StepOutcome, TransitionLabel, ValidationIssue, ValidationReport, Verdict,
};

/// One branch of the nondeterministic search. The stack grows to the right:
/// the last element is the top.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdaConfiguration {
    pub state: StateId,
    pub stack: Vec<char>,
    pub input_index: usize,
}

impl PdaConfiguration {
    fn top(&self) -> Option<char> {
        self.stack.last().copied()
    }
}

pub(crate) fn init(a: &mut Automaton) {
    let stack_symbol = a
        .pda_config()
        .map(|c| c.initial_stack_symbol)
        .unwrap_or(crate::types::DEFAULT_STACK_SYMBOL);
    let configs: Vec<PdaConfiguration> = a
        .initial_state()
        .map(|q0| PdaConfiguration {
            state: q0,
            stack: vec![stack_symbol],
            input_index: 0,
        })
        .into_iter()
        .collect();
    a.sim.configurations = Configurations::Pda(configs);
    match a.initial_state() {
        Some(q0) => {
            let name = a.state_name(q0);
            a.push_trace_entry(
                &format!("Start in state {name} with stack [{stack_symbol}]"),
                None,
            );
        }
        None => a.push_trace_entry("No initial state; nothing to run", None),
    }
}

/// One micro-step of the whole configuration set: every applicable
/// transition of every configuration contributes a successor.
///
/// A transition applies when its source matches, its input symbol is ε or
/// equals the next unread symbol, and its stack-read is ε or equals the top
/// of the stack. Stacks are copied per successor, so branches never alias.
pub(crate) fn step(a: &mut Automaton) -> StepOutcome {
    let configs = match &a.sim.configurations {
        Configurations::Pda(configs) => configs.clone(),
        _ => vec![],
    };
    if configs.is_empty() {
        return StepOutcome::Finished(Verdict::Rejected);
    }

    let input = a.sim.input.clone();
    let transitions = a.transitions.clone();
    let mut next: Vec<PdaConfiguration> = Vec::new();
    let mut used: Vec<crate::types::TransitionId> = Vec::new();
    let mut moves: Vec<String> = Vec::new();

    for config in &configs {
        for transition in transitions.iter().filter(|t| t.from == config.state) {
            let TransitionLabel::Pda { input: read, pop, push } = &transition.label else {
                continue;
            };

            let consumed = match read {
                None => false,
                Some(symbol) => {
                    if input.get(config.input_index) != Some(symbol) {
                        continue;
                    }
                    true
                }
            };
            if let Some(expected) = pop {
                if config.top() != Some(*expected) {
                    continue;
                }
            }

            let mut stack = config.stack.clone();
            if pop.is_some() {
                stack.pop();
            }
            // Push right-to-left so the first character of the write string
            // ends up on top.
            for symbol in push.chars().rev() {
                stack.push(symbol);
            }

            let successor = PdaConfiguration {
                state: transition.to,
                stack,
                input_index: config.input_index + usize::from(consumed),
            };
            used.push(transition.id);
            moves.push(format!(
                "{} → {} [{}]",
                a.state_name(config.state),
                a.state_name(transition.to),
                crate::labels::format_label(&transition.label),
            ));
            if !next.contains(&successor) {
                next.push(successor);
            }
        }
    }

    for id in used {
        a.highlight_transition(id);
    }

    if next.is_empty() {
        a.sim.configurations = Configurations::Pda(vec![]);
        a.push_trace_entry("Every configuration is stuck; input rejected", None);
        return StepOutcome::Finished(Verdict::Rejected);
    }

    // The canonical display configuration is the first of the set.
    a.sim.cursor = next[0].input_index;
    a.sim.configurations = Configurations::Pda(next);
    let description = moves.join("; ");
    a.push_trace_entry(&description, None);
    StepOutcome::Continue
}

/// Considers only configurations that consumed all input. The run accepts as
/// soon as one of them satisfies an enabled acceptance mode; exploration
/// stops there.
pub(crate) fn check_acceptance(a: &Automaton) -> Verdict {
    let configs = match &a.sim.configurations {
        Configurations::Pda(configs) => configs,
        _ => return Verdict::Rejected,
    };
    if configs.is_empty() {
        return Verdict::Rejected;
    }
    let modes = a.pda_config().cloned().unwrap_or_default();

    for config in configs {
        if config.input_index != a.sim.input.len() {
            continue;
        }
        if modes.accept_by_final_state
            && a.state(config.state).map(|s| s.is_final).unwrap_or(false)
        {
            return Verdict::Accepted;
        }
        if modes.accept_by_empty_stack && config.stack.is_empty() {
            return Verdict::Accepted;
        }
    }
    Verdict::Undecided
}

pub(crate) fn validate(a: &Automaton, report: &mut ValidationReport) {
    let modes = a.pda_config().cloned().unwrap_or_default();
    if modes.accept_by_final_state && !modes.accept_by_empty_stack && a.final_states().is_empty() {
        report.errors.push(ValidationIssue::MissingFinalState);
    }
    crate::dfa::unreachable_warnings(a, report);
}

/// The stack symbols a machine can ever hold: the initial symbol plus every
/// symbol read or written by a transition. Used by serialization.
pub(crate) fn stack_alphabet(a: &Automaton) -> Vec<char> {
    let mut symbols = std::collections::BTreeSet::new();
    symbols.insert(
        a.pda_config()
            .map(|c| c.initial_stack_symbol)
            .unwrap_or(crate::types::DEFAULT_STACK_SYMBOL),
    );
    for transition in a.transitions() {
        if let TransitionLabel::Pda { pop, push, .. } = &transition.label {
            symbols.extend(pop.iter().copied());
            symbols.extend(push.chars());
        }
    }
    symbols.into_iter().collect()
}
