//! The simulation driver: wraps an automaton with run lifecycle control,
//! speed mapping for a host-owned timer, cooperative pause/stop, detached
//! string tests, and batch testing.
//!
//! The engine stays synchronous. Auto-running belongs to the host: it calls
//! `tick` on the interval reported by `interval_ms`, and the driver consults
//! its pause flag on every tick.

use crate::automaton::Automaton;
use crate::types::{EngineError, StepOutcome, TraceEntry, Verdict};

/// The lowest auto-step interval the driver will report.
const MIN_INTERVAL_MS: u64 = 50;

type Callback = Box<dyn FnMut(&Automaton)>;

/// Result of testing one input string against a machine.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub input: String,
    pub accepted: bool,
    pub trace: Vec<TraceEntry>,
}

/// Drives a single automaton through init / step / auto-run / batch tests.
pub struct Simulator {
    automaton: Automaton,
    speed: u8,
    auto_running: bool,
    paused: bool,
    on_step_complete: Option<Callback>,
    on_simulation_complete: Option<Callback>,
}

impl Simulator {
    pub fn new(automaton: Automaton) -> Simulator {
        Simulator {
            automaton,
            speed: 5,
            auto_running: false,
            paused: false,
            on_step_complete: None,
            on_simulation_complete: None,
        }
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn automaton_mut(&mut self) -> &mut Automaton {
        &mut self.automaton
    }

    /// Replaces the wrapped automaton, dropping any run in progress.
    pub fn load(&mut self, automaton: Automaton) {
        self.automaton = automaton;
        self.auto_running = false;
        self.paused = false;
    }

    /// Registers a callback fired after every step.
    pub fn on_step_complete(&mut self, callback: impl FnMut(&Automaton) + 'static) {
        self.on_step_complete = Some(Box::new(callback));
    }

    /// Registers a callback fired when a run terminates.
    pub fn on_simulation_complete(&mut self, callback: impl FnMut(&Automaton) + 'static) {
        self.on_simulation_complete = Some(Box::new(callback));
    }

    // ------------------------------------------------------------------
    // Speed
    // ------------------------------------------------------------------

    /// Sets the auto-run rate; clamped into 1..=10.
    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed.clamp(1, 10);
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// The host timer interval for the current speed:
    /// ≈ (1000 − 90·speed) ms, floored at 50 ms.
    pub fn interval_ms(&self) -> u64 {
        (1000u64.saturating_sub(90 * self.speed as u64)).max(MIN_INTERVAL_MS)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Starts a fresh run on `input`.
    pub fn init(&mut self, input: &str) {
        self.automaton.init_simulation(input);
        self.auto_running = false;
        self.paused = false;
    }

    /// Performs one step and fires the lifecycle callbacks.
    pub fn step(&mut self) -> StepOutcome {
        let outcome = self.automaton.step();
        if let Some(callback) = &mut self.on_step_complete {
            callback(&self.automaton);
        }
        if let StepOutcome::Finished(_) = outcome {
            self.auto_running = false;
            if let Some(callback) = &mut self.on_simulation_complete {
                callback(&self.automaton);
            }
        }
        outcome
    }

    /// Enters auto-run mode. The host is expected to call `tick` every
    /// `interval_ms` milliseconds until the run finishes.
    pub fn run(&mut self) {
        self.auto_running = true;
        self.paused = false;
    }

    /// One timer tick: steps unless paused or not auto-running.
    pub fn tick(&mut self) -> StepOutcome {
        if !self.auto_running || self.paused {
            return StepOutcome::Continue;
        }
        self.step()
    }

    pub fn is_auto_running(&self) -> bool {
        self.auto_running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspends auto-running; the machine stays inspectable mid-run.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stops auto-running synchronously, leaving the post-step state (active
    /// configurations, cursor, trace) in place.
    pub fn stop(&mut self) {
        self.auto_running = false;
        self.paused = false;
    }

    /// Discards the run and returns the machine to its idle state.
    pub fn reset(&mut self) {
        self.automaton.reset_simulation();
        self.auto_running = false;
        self.paused = false;
    }

    /// Runs the current simulation to completion synchronously, firing the
    /// completion callback. The per-step budget is the machine default.
    pub fn run_to_completion(&mut self, max_steps: Option<usize>) -> Verdict {
        let verdict = self.automaton.run(max_steps);
        self.auto_running = false;
        if let Some(callback) = &mut self.on_simulation_complete {
            callback(&self.automaton);
        }
        verdict
    }

    // ------------------------------------------------------------------
    // String tests
    // ------------------------------------------------------------------

    /// Tests one input on a serialized-then-deserialized working copy, so
    /// the live model and any paused run stay untouched.
    pub fn test_string(&self, input: &str) -> Result<TestOutcome, EngineError> {
        let mut copy = Automaton::from_structured(&self.automaton.to_structured())?;
        let accepted = copy.accepts(input);
        Ok(TestOutcome {
            input: input.to_string(),
            accepted,
            trace: copy.trace().to_vec(),
        })
    }

    /// Tests a batch of inputs sequentially, each on a fresh working copy so
    /// no state leaks across cases.
    pub fn run_batch_tests<I, S>(&self, inputs: I) -> Result<Vec<TestOutcome>, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        inputs
            .into_iter()
            .map(|input| self.test_string(input.as_ref()))
            .collect()
    }
}
