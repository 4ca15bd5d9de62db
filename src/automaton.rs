//! The `Automaton` container: a transition graph plus derived alphabet,
//! simulation state, and a bounded snapshot history. The four machine types
//! share this container; the type-specific semantics live in the `dfa`,
//! `nfa`, `pda`, and `tm` modules and are dispatched from here.

use std::collections::BTreeSet;

use crate::document::{self, MachineDoc};
use crate::pda::PdaConfiguration;
use crate::tm::TmConfiguration;
use crate::types::{
    EngineError, MachineType, Point, StateId, StateNode, StepOutcome, TraceEntry, Transition,
    TransitionId, TransitionLabel, ValidationIssue, ValidationReport, Verdict, BLANK_SYMBOL,
    DEFAULT_FINITE_STEP_LIMIT, DEFAULT_PDA_STEP_LIMIT, DEFAULT_STACK_SYMBOL,
    DEFAULT_TM_STEP_LIMIT, EPSILON_SYMBOL, HISTORY_LIMIT,
};
use crate::{dfa, interchange, nfa, pda, tm};

/// Acceptance and alphabet configuration of a pushdown automaton.
#[derive(Debug, Clone, PartialEq)]
pub struct PdaConfig {
    /// The symbol the stack is initialized with.
    pub initial_stack_symbol: char,
    /// Accept when a finished configuration sits in a final state.
    pub accept_by_final_state: bool,
    /// Accept when a finished configuration has emptied its stack.
    pub accept_by_empty_stack: bool,
}

impl Default for PdaConfig {
    fn default() -> PdaConfig {
        PdaConfig {
            initial_stack_symbol: DEFAULT_STACK_SYMBOL,
            accept_by_final_state: true,
            accept_by_empty_stack: false,
        }
    }
}

/// Tape configuration of a Turing machine.
#[derive(Debug, Clone, PartialEq)]
pub struct TmConfig {
    /// The symbol unwritten tape cells read as.
    pub blank_symbol: char,
}

impl Default for TmConfig {
    fn default() -> TmConfig {
        TmConfig {
            blank_symbol: BLANK_SYMBOL,
        }
    }
}

/// The machine type tag together with its type-specific configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineConfig {
    Dfa,
    Nfa,
    Pda(PdaConfig),
    Tm(TmConfig),
}

impl MachineConfig {
    fn for_type(machine_type: MachineType) -> MachineConfig {
        match machine_type {
            MachineType::Dfa => MachineConfig::Dfa,
            MachineType::Nfa => MachineConfig::Nfa,
            MachineType::Pda => MachineConfig::Pda(PdaConfig::default()),
            MachineType::Tm => MachineConfig::Tm(TmConfig::default()),
        }
    }
}

/// The set of active configurations of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Configurations {
    /// No simulation has been initialized.
    #[default]
    Idle,
    /// DFA: at most one entry. NFA: the ε-closed active state set.
    Finite(Vec<StateId>),
    /// PDA: the concurrent configuration set.
    Pda(Vec<PdaConfiguration>),
    /// TM: the single machine configuration, if any.
    Tm(Option<TmConfiguration>),
}

impl Configurations {
    /// The state ids that are part of any active configuration.
    pub fn active_state_ids(&self) -> Vec<StateId> {
        match self {
            Configurations::Idle => vec![],
            Configurations::Finite(states) => states.clone(),
            Configurations::Pda(configs) => {
                let mut ids: Vec<StateId> = configs.iter().map(|c| c.state).collect();
                ids.dedup();
                ids
            }
            Configurations::Tm(config) => config.iter().map(|c| c.state).collect(),
        }
    }

    /// Returns `true` when no configuration is left to explore.
    pub fn is_empty(&self) -> bool {
        match self {
            Configurations::Idle => true,
            Configurations::Finite(states) => states.is_empty(),
            Configurations::Pda(configs) => configs.is_empty(),
            Configurations::Tm(config) => config.is_none(),
        }
    }
}

/// Per-run simulation state: input cursor, active configurations, trace,
/// and the acceptance verdict.
#[derive(Debug, Clone, Default)]
pub(crate) struct Simulation {
    pub input: Vec<char>,
    pub cursor: usize,
    pub configurations: Configurations,
    pub trace: Vec<TraceEntry>,
    pub verdict: Verdict,
    pub running: bool,
    pub steps: usize,
}

impl Simulation {
    pub fn remaining_input(&self) -> String {
        self.input[self.cursor.min(self.input.len())..].iter().collect()
    }

    pub fn current_symbol(&self) -> Option<char> {
        self.input.get(self.cursor).copied()
    }
}

/// A machine model: states, transitions, derived alphabet, simulation state,
/// and a bounded undo history.
///
/// States and transitions are owned flat stores; transitions reference their
/// endpoints by identity and are resolved on access. Deleting a state
/// cascades to every incident transition.
#[derive(Debug, Clone)]
pub struct Automaton {
    pub name: String,
    pub(crate) config: MachineConfig,
    pub(crate) states: Vec<StateNode>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) alphabet: BTreeSet<char>,
    pub(crate) initial: Option<StateId>,
    pub(crate) next_state_id: StateId,
    pub(crate) next_transition_id: TransitionId,
    pub(crate) sim: Simulation,
    history: Vec<MachineDoc>,
    history_index: usize,
}

impl Automaton {
    /// Creates an empty automaton of the given machine type.
    pub fn new(machine_type: MachineType) -> Automaton {
        let mut automaton = Automaton {
            name: "Untitled".to_string(),
            config: MachineConfig::for_type(machine_type),
            states: Vec::new(),
            transitions: Vec::new(),
            alphabet: BTreeSet::new(),
            initial: None,
            next_state_id: 0,
            next_transition_id: 0,
            sim: Simulation::default(),
            history: Vec::new(),
            history_index: 0,
        };
        automaton.history.push(document::to_structured(&automaton));
        automaton
    }

    pub fn machine_type(&self) -> MachineType {
        match self.config {
            MachineConfig::Dfa => MachineType::Dfa,
            MachineConfig::Nfa => MachineType::Nfa,
            MachineConfig::Pda(_) => MachineType::Pda,
            MachineConfig::Tm(_) => MachineType::Tm,
        }
    }

    /// The PDA configuration, if this is a pushdown automaton.
    pub fn pda_config(&self) -> Option<&PdaConfig> {
        match &self.config {
            MachineConfig::Pda(config) => Some(config),
            _ => None,
        }
    }

    /// Mutable access to the PDA configuration for editor toggles.
    pub fn pda_config_mut(&mut self) -> Option<&mut PdaConfig> {
        match &mut self.config {
            MachineConfig::Pda(config) => Some(config),
            _ => None,
        }
    }

    /// The TM configuration, if this is a Turing machine.
    pub fn tm_config(&self) -> Option<&TmConfig> {
        match &self.config {
            MachineConfig::Tm(config) => Some(config),
            _ => None,
        }
    }

    pub fn tm_config_mut(&mut self) -> Option<&mut TmConfig> {
        match &mut self.config {
            MachineConfig::Tm(config) => Some(config),
            _ => None,
        }
    }

    /// The blank symbol in effect; meaningful for Turing machines.
    pub(crate) fn blank_symbol(&self) -> char {
        self.tm_config()
            .map(|c| c.blank_symbol)
            .unwrap_or(BLANK_SYMBOL)
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn states(&self) -> &[StateNode] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn state(&self, id: StateId) -> Option<&StateNode> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id == id)
    }

    /// The derived input alphabet: the union of non-ε input symbols across
    /// all transitions, in sorted order.
    pub fn alphabet(&self) -> &BTreeSet<char> {
        &self.alphabet
    }

    pub fn initial_state(&self) -> Option<StateId> {
        self.initial
    }

    /// Transitions leaving `state`, in insertion order.
    pub fn transitions_from(&self, state: StateId) -> Vec<&Transition> {
        self.transitions.iter().filter(|t| t.from == state).collect()
    }

    /// Transitions entering `state`, in insertion order.
    pub fn transitions_to(&self, state: StateId) -> Vec<&Transition> {
        self.transitions.iter().filter(|t| t.to == state).collect()
    }

    /// Transitions from `from` to `to`, in insertion order.
    pub fn transitions_between(&self, from: StateId, to: StateId) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.from == from && t.to == to)
            .collect()
    }

    pub fn final_states(&self) -> Vec<&StateNode> {
        self.states.iter().filter(|s| s.is_final).collect()
    }

    /// The display name of a state, or `"?"` for a dangling reference.
    pub(crate) fn state_name(&self, id: StateId) -> String {
        self.state(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "?".to_string())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Appends a state, issuing its identity.
    ///
    /// The first state of an automaton becomes initial. A state added with
    /// `is_initial` set displaces the previous initial state.
    pub fn add_state(&mut self, mut state: StateNode) -> StateId {
        state.id = self.next_state_id;
        self.next_state_id += 1;

        if self.states.is_empty() {
            state.is_initial = true;
        }
        if state.is_initial {
            self.displace_initial();
            self.initial = Some(state.id);
        }

        let id = state.id;
        self.states.push(state);
        self.record_history();
        id
    }

    /// Removes a state and every transition incident to it. Unknown ids are
    /// a no-op. If the removed state was initial, the first remaining state
    /// is promoted.
    pub fn remove_state(&mut self, id: StateId) {
        if self.state(id).is_none() {
            return;
        }
        self.states.retain(|s| s.id != id);
        self.transitions.retain(|t| t.from != id && t.to != id);

        if self.initial == Some(id) {
            self.initial = None;
            if let Some(first) = self.states.first_mut() {
                first.is_initial = true;
                self.initial = Some(first.id);
            }
        }
        self.record_history();
    }

    /// Appends a transition, issuing its identity and folding its input
    /// symbols into the derived alphabet.
    ///
    /// Returns `None` (a no-op) if either endpoint does not exist.
    pub fn add_transition(&mut self, mut transition: Transition) -> Option<TransitionId> {
        if self.state(transition.from).is_none() || self.state(transition.to).is_none() {
            return None;
        }
        transition.id = self.next_transition_id;
        self.next_transition_id += 1;

        for symbol in transition.label.input_symbols() {
            if symbol != EPSILON_SYMBOL {
                self.alphabet.insert(symbol);
            }
        }

        let id = transition.id;
        self.transitions.push(transition);
        self.record_history();
        Some(id)
    }

    /// Removes a transition by identity. Unknown ids are a no-op.
    pub fn remove_transition(&mut self, id: TransitionId) {
        let before = self.transitions.len();
        self.transitions.retain(|t| t.id != id);
        if self.transitions.len() != before {
            self.record_history();
        }
    }

    /// Makes `id` the initial state, displacing the previous one.
    /// Unknown ids are a no-op.
    pub fn set_initial_state(&mut self, id: StateId) {
        if self.state(id).is_none() {
            return;
        }
        self.displace_initial();
        if let Some(state) = self.state_entry(id) {
            state.is_initial = true;
        }
        self.initial = Some(id);
        self.record_history();
    }

    /// Toggles the final flag of a state. Unknown ids are a no-op.
    pub fn set_final(&mut self, id: StateId, is_final: bool) {
        if let Some(state) = self.state_entry(id) {
            state.is_final = is_final;
        }
    }

    /// Toggles the halt flag of a state. Unknown ids are a no-op.
    pub fn set_halt(&mut self, id: StateId, is_halt: bool) {
        if let Some(state) = self.state_entry(id) {
            state.is_halt = is_halt;
        }
    }

    /// Renames a state. Unknown ids are a no-op.
    pub fn rename_state(&mut self, id: StateId, name: impl Into<String>) {
        if let Some(state) = self.state_entry(id) {
            state.name = name.into();
        }
    }

    /// Moves a state on the canvas. Unknown ids are a no-op.
    pub fn move_state(&mut self, id: StateId, position: Point) {
        if let Some(state) = self.state_entry(id) {
            state.position = position;
        }
    }

    /// Empties the model and resets the identity counters.
    pub fn clear(&mut self) {
        self.states.clear();
        self.transitions.clear();
        self.alphabet.clear();
        self.initial = None;
        self.next_state_id = 0;
        self.next_transition_id = 0;
        self.sim = Simulation::default();
        self.record_history();
    }

    fn displace_initial(&mut self) {
        for state in &mut self.states {
            state.is_initial = false;
        }
        self.initial = None;
    }

    fn state_entry(&mut self, id: StateId) -> Option<&mut StateNode> {
        self.states.iter_mut().find(|s| s.id == id)
    }

    /// Rebuilds the derived alphabet from scratch; used after loading.
    pub(crate) fn rebuild_alphabet(&mut self) {
        self.alphabet.clear();
        let symbols: Vec<char> = self
            .transitions
            .iter()
            .flat_map(|t| t.label.input_symbols())
            .collect();
        for symbol in symbols {
            if symbol != EPSILON_SYMBOL {
                self.alphabet.insert(symbol);
            }
        }
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    fn record_history(&mut self) {
        self.history.truncate(self.history_index + 1);
        self.history.push(document::to_structured(self));
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history_index = self.history.len() - 1;
    }

    /// Restores the previous snapshot. Returns `false` at the bottom of the
    /// history.
    pub fn undo(&mut self) -> bool {
        if self.history_index == 0 {
            return false;
        }
        self.history_index -= 1;
        let doc = self.history[self.history_index].clone();
        document::apply(&doc, self);
        true
    }

    /// Restores the next snapshot. Returns `false` at the top of the history.
    pub fn redo(&mut self) -> bool {
        if self.history_index + 1 >= self.history.len() {
            return false;
        }
        self.history_index += 1;
        let doc = self.history[self.history_index].clone();
        document::apply(&doc, self);
        true
    }

    /// Replaces the history with a single baseline snapshot of the current
    /// model. Loading from serialization goes through this, so a load is
    /// not undoable.
    pub(crate) fn reset_history(&mut self) {
        self.history = vec![document::to_structured(self)];
        self.history_index = 0;
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Checks the model against the contract of its machine type.
    ///
    /// Errors make the model unfit for simulation; warnings flag suspicious
    /// but well-formed constructs. Simulation itself never reports these.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.initial.is_none() {
            report.errors.push(ValidationIssue::MissingInitialState);
        }
        for transition in &self.transitions {
            if self.state(transition.from).is_none() || self.state(transition.to).is_none() {
                report
                    .errors
                    .push(ValidationIssue::DanglingTransition { id: transition.id });
            }
            if !self.label_matches_type(&transition.label) {
                report
                    .errors
                    .push(ValidationIssue::ForeignLabel { id: transition.id });
            }
        }

        match self.machine_type() {
            MachineType::Dfa => dfa::validate(self, &mut report),
            MachineType::Nfa => nfa::validate(self, &mut report),
            MachineType::Pda => pda::validate(self, &mut report),
            MachineType::Tm => tm::validate(self, &mut report),
        }
        report
    }

    fn label_matches_type(&self, label: &TransitionLabel) -> bool {
        matches!(
            (self.machine_type(), label),
            (MachineType::Dfa, TransitionLabel::Finite { .. })
                | (MachineType::Nfa, TransitionLabel::Finite { .. })
                | (MachineType::Pda, TransitionLabel::Pda { .. })
                | (MachineType::Tm, TransitionLabel::Tm { .. })
        )
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Starts a fresh run on the given input.
    pub fn init_simulation(&mut self, input: &str) {
        self.clear_highlights();
        self.sim = Simulation {
            input: input.chars().collect(),
            ..Simulation::default()
        };
        match self.machine_type() {
            MachineType::Dfa => dfa::init(self),
            MachineType::Nfa => nfa::init(self),
            MachineType::Pda => pda::init(self),
            MachineType::Tm => tm::init(self),
        }
        self.refresh_active_flags();
        self.check_acceptance();
    }

    /// Performs one atomic step of the machine.
    ///
    /// Highlight flags from the previous step are cleared first; transitions
    /// taken during this step are highlighted, and the active flags on
    /// states reflect the configurations after the step.
    pub fn step(&mut self) -> StepOutcome {
        if self.sim.verdict.is_decided() {
            return StepOutcome::Finished(self.sim.verdict);
        }
        self.clear_highlights();

        let outcome = match self.machine_type() {
            MachineType::Dfa => dfa::step(self),
            MachineType::Nfa => nfa::step(self),
            MachineType::Pda => pda::step(self),
            MachineType::Tm => tm::step(self),
        };
        self.sim.steps += 1;
        self.refresh_active_flags();

        match outcome {
            StepOutcome::Finished(verdict) => {
                self.sim.verdict = verdict;
                outcome
            }
            StepOutcome::Continue => {
                self.check_acceptance();
                if self.sim.verdict.is_decided() {
                    StepOutcome::Finished(self.sim.verdict)
                } else {
                    StepOutcome::Continue
                }
            }
        }
    }

    /// Re-evaluates the acceptance condition of the machine type against the
    /// current configurations, deciding the verdict where possible.
    pub fn check_acceptance(&mut self) {
        if self.sim.verdict.is_decided() {
            return;
        }
        let verdict = match self.machine_type() {
            MachineType::Dfa => dfa::check_acceptance(self),
            MachineType::Nfa => nfa::check_acceptance(self),
            MachineType::Pda => pda::check_acceptance(self),
            MachineType::Tm => Verdict::Undecided, // decided by `step` on halt
        };
        self.sim.verdict = verdict;
    }

    /// Drives `step` until the verdict is decided, the configuration set is
    /// exhausted, or the step budget runs out. Budget exhaustion rejects
    /// with a dedicated trace entry.
    pub fn run(&mut self, max_steps: Option<usize>) -> Verdict {
        let budget = max_steps.unwrap_or(match self.machine_type() {
            MachineType::Dfa | MachineType::Nfa => DEFAULT_FINITE_STEP_LIMIT,
            MachineType::Pda => DEFAULT_PDA_STEP_LIMIT,
            MachineType::Tm => DEFAULT_TM_STEP_LIMIT,
        });
        self.sim.running = true;

        let mut taken = 0;
        while !self.sim.verdict.is_decided() && taken < budget {
            match self.step() {
                StepOutcome::Finished(_) => break,
                StepOutcome::Continue => taken += 1,
            }
            if self.machine_type() == MachineType::Tm && tm::loop_suspected(self) {
                self.push_trace_entry("Potential infinite loop detected; halting the run", None);
                self.sim.verdict = Verdict::Rejected;
                break;
            }
        }

        if !self.sim.verdict.is_decided() {
            self.push_trace_entry(
                &format!("Step limit of {budget} reached without a decision"),
                None,
            );
            self.sim.verdict = Verdict::Rejected;
        }
        self.sim.running = false;
        self.sim.verdict
    }

    /// Convenience: initializes on `input` and runs with the default budget.
    pub fn accepts(&mut self, input: &str) -> bool {
        self.init_simulation(input);
        self.run(None) == Verdict::Accepted
    }

    /// Discards the current run, keeping the model untouched.
    pub fn reset_simulation(&mut self) {
        self.clear_highlights();
        self.sim = Simulation::default();
        for state in &mut self.states {
            state.active = false;
        }
    }

    // ------------------------------------------------------------------
    // Run inspection (renderer view)
    // ------------------------------------------------------------------

    pub fn verdict(&self) -> Verdict {
        self.sim.verdict
    }

    pub fn is_running(&self) -> bool {
        self.sim.running
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.sim.trace
    }

    pub fn active_configurations(&self) -> &Configurations {
        &self.sim.configurations
    }

    pub fn active_states(&self) -> Vec<StateId> {
        self.sim.configurations.active_state_ids()
    }

    /// The position of the input cursor.
    pub fn cursor(&self) -> usize {
        self.sim.cursor
    }

    /// PDA: the canonical display stack (the first active configuration's).
    pub fn stack(&self) -> Option<&[char]> {
        match &self.sim.configurations {
            Configurations::Pda(configs) => configs.first().map(|c| c.stack.as_slice()),
            _ => None,
        }
    }

    /// TM: the current tape, if a run is active.
    pub fn tape(&self) -> Option<&tm::Tape> {
        match &self.sim.configurations {
            Configurations::Tm(Some(config)) => Some(&config.tape),
            _ => None,
        }
    }

    pub(crate) fn clear_highlights(&mut self) {
        for transition in &mut self.transitions {
            transition.highlighted = false;
        }
    }

    pub(crate) fn highlight_transition(&mut self, id: TransitionId) {
        if let Some(transition) = self.transitions.iter_mut().find(|t| t.id == id) {
            transition.highlighted = true;
        }
    }

    fn refresh_active_flags(&mut self) {
        let active = self.sim.configurations.active_state_ids();
        for state in &mut self.states {
            state.active = active.contains(&state.id);
        }
    }

    pub(crate) fn push_trace_entry(&mut self, description: &str, current_symbol: Option<char>) {
        let entry = TraceEntry {
            step: self.sim.trace.len(),
            states: self
                .active_states()
                .iter()
                .map(|&id| self.state_name(id))
                .collect(),
            remaining_input: self.sim.remaining_input(),
            current_symbol,
            description: description.to_string(),
            stack: self.stack().map(|s| s.to_vec()),
            tape: self.tape().map(|t| t.snapshot()),
        };
        self.sim.trace.push(entry);
    }

    // ------------------------------------------------------------------
    // Serialization entry points
    // ------------------------------------------------------------------

    /// Serializes the model into its structured document form.
    pub fn to_structured(&self) -> MachineDoc {
        document::to_structured(self)
    }

    /// Reconstructs an automaton from a structured document.
    ///
    /// Identity counters are reset past the highest loaded id, endpoints are
    /// rewired, and the alphabet is rebuilt. The load is not recorded in the
    /// undo history.
    pub fn from_structured(doc: &MachineDoc) -> Result<Automaton, EngineError> {
        document::from_structured(doc)
    }

    /// Serializes to pretty-printed JSON of the structured form.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_structured())
            .expect("structured documents always serialize")
    }

    /// Parses JSON of the structured form.
    pub fn from_json(json: &str) -> Result<Automaton, EngineError> {
        let doc: MachineDoc = serde_json::from_str(json)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        Automaton::from_structured(&doc)
    }

    /// Emits the interchange XML dialect.
    pub fn to_interchange_xml(&self) -> String {
        interchange::to_xml(self)
    }

    /// Parses the interchange XML dialect. Inbound finite automata load as
    /// NFAs.
    pub fn from_interchange_xml(xml: &str) -> Result<Automaton, EngineError> {
        interchange::from_xml(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_nfa() -> Automaton {
        let mut a = Automaton::new(MachineType::Nfa);
        let q0 = a.add_state(StateNode::new("q0", Point::new(100.0, 100.0)));
        let q1 = a.add_state(StateNode::new("q1", Point::new(250.0, 100.0)).with_final(true));
        a.add_transition(Transition::new(q0, q1, TransitionLabel::symbols(['a'])))
            .unwrap();
        a
    }

    #[test]
    fn test_first_state_becomes_initial() {
        let mut a = Automaton::new(MachineType::Dfa);
        let q0 = a.add_state(StateNode::new("q0", Point::default()));
        assert_eq!(a.initial_state(), Some(q0));
        assert!(a.state(q0).unwrap().is_initial);
    }

    #[test]
    fn test_at_most_one_initial_state() {
        let mut a = Automaton::new(MachineType::Dfa);
        let q0 = a.add_state(StateNode::new("q0", Point::default()));
        let q1 = a.add_state(StateNode::new("q1", Point::default()).with_initial(true));
        assert_eq!(a.initial_state(), Some(q1));
        assert!(!a.state(q0).unwrap().is_initial);
        assert_eq!(a.states().iter().filter(|s| s.is_initial).count(), 1);

        a.set_initial_state(q0);
        assert_eq!(a.initial_state(), Some(q0));
        assert_eq!(a.states().iter().filter(|s| s.is_initial).count(), 1);
    }

    #[test]
    fn test_remove_state_cascades_to_transitions() {
        let mut a = two_state_nfa();
        let q1 = a.states()[1].id;
        a.remove_state(q1);
        assert!(a.transitions().is_empty());
        assert_eq!(a.states().len(), 1);
    }

    #[test]
    fn test_remove_initial_promotes_first_remaining() {
        let mut a = two_state_nfa();
        let q0 = a.states()[0].id;
        let q1 = a.states()[1].id;
        a.remove_state(q0);
        assert_eq!(a.initial_state(), Some(q1));
        assert!(a.state(q1).unwrap().is_initial);
    }

    #[test]
    fn test_remove_unknown_state_is_noop() {
        let mut a = two_state_nfa();
        a.remove_state(999);
        assert_eq!(a.states().len(), 2);
        assert_eq!(a.transitions().len(), 1);
    }

    #[test]
    fn test_add_transition_requires_live_endpoints() {
        let mut a = two_state_nfa();
        let q0 = a.states()[0].id;
        assert!(a
            .add_transition(Transition::new(q0, 999, TransitionLabel::epsilon()))
            .is_none());
        assert_eq!(a.transitions().len(), 1);
    }

    #[test]
    fn test_alphabet_derived_from_labels() {
        let mut a = two_state_nfa();
        let q0 = a.states()[0].id;
        let q1 = a.states()[1].id;
        a.add_transition(Transition::new(q1, q0, TransitionLabel::symbols(['b', 'c'])))
            .unwrap();
        assert_eq!(a.alphabet().iter().collect::<Vec<_>>(), [&'a', &'b', &'c']);

        // ε-transitions contribute nothing.
        a.add_transition(Transition::new(q0, q0, TransitionLabel::epsilon()))
            .unwrap();
        assert_eq!(a.alphabet().len(), 3);
    }

    #[test]
    fn test_queries() {
        let mut a = two_state_nfa();
        let q0 = a.states()[0].id;
        let q1 = a.states()[1].id;
        a.add_transition(Transition::new(q1, q0, TransitionLabel::symbols(['b'])))
            .unwrap();

        assert_eq!(a.transitions_from(q0).len(), 1);
        assert_eq!(a.transitions_to(q0).len(), 1);
        assert_eq!(a.transitions_between(q0, q1).len(), 1);
        assert_eq!(a.transitions_between(q1, q1).len(), 0);
        assert_eq!(a.final_states().len(), 1);
        assert_eq!(a.final_states()[0].name, "q1");
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut a = two_state_nfa();
        a.clear();
        assert!(a.states().is_empty());
        assert!(a.transitions().is_empty());
        assert!(a.alphabet().is_empty());
        assert_eq!(a.initial_state(), None);

        let q = a.add_state(StateNode::new("fresh", Point::default()));
        assert_eq!(q, 0);
    }

    #[test]
    fn test_undo_redo() {
        let mut a = Automaton::new(MachineType::Nfa);
        let q0 = a.add_state(StateNode::new("q0", Point::default()));
        a.add_state(StateNode::new("q1", Point::default()));
        assert_eq!(a.states().len(), 2);

        assert!(a.undo());
        assert_eq!(a.states().len(), 1);
        assert_eq!(a.states()[0].id, q0);

        assert!(a.redo());
        assert_eq!(a.states().len(), 2);
        assert!(!a.redo());

        assert!(a.undo());
        assert!(a.undo());
        assert!(a.states().is_empty());
        assert!(!a.undo());
    }

    #[test]
    fn test_undo_discards_redo_branch() {
        let mut a = Automaton::new(MachineType::Nfa);
        a.add_state(StateNode::new("q0", Point::default()));
        a.add_state(StateNode::new("q1", Point::default()));
        a.undo();
        a.add_state(StateNode::new("q2", Point::default()));
        assert!(!a.redo());
        assert_eq!(a.states().len(), 2);
        assert_eq!(a.states()[1].name, "q2");
    }

    #[test]
    fn test_history_is_capped() {
        let mut a = Automaton::new(MachineType::Nfa);
        for i in 0..(HISTORY_LIMIT + 20) {
            a.add_state(StateNode::new(format!("q{i}"), Point::default()));
        }
        let mut undone = 0;
        while a.undo() {
            undone += 1;
        }
        assert!(undone < HISTORY_LIMIT);
    }

    #[test]
    fn test_validate_reports_missing_initial() {
        let a = Automaton::new(MachineType::Dfa);
        let report = a.validate();
        assert!(report.errors.contains(&ValidationIssue::MissingInitialState));
        assert!(!report.is_valid());
    }

    #[test]
    fn test_validate_reports_foreign_label() {
        let mut a = two_state_nfa();
        let q0 = a.states()[0].id;
        a.add_transition(Transition::new(
            q0,
            q0,
            TransitionLabel::Tm {
                read: '0',
                write: '1',
                direction: crate::types::Direction::Right,
            },
        ))
        .unwrap();
        let report = a.validate();
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationIssue::ForeignLabel { .. })));
    }

    #[test]
    fn test_reset_simulation_keeps_model() {
        let mut a = two_state_nfa();
        a.accepts("a");
        assert!(!a.trace().is_empty());
        a.reset_simulation();
        assert!(a.trace().is_empty());
        assert_eq!(a.verdict(), Verdict::Undecided);
        assert_eq!(a.states().len(), 2);
    }
}
