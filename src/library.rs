//! A small library of bundled example machines, one per machine type,
//! embedded as structured JSON documents and parsed on first use.

use std::sync::RwLock;

use crate::automaton::Automaton;
use crate::types::EngineError;

// Default embedded machines
const MACHINE_TEXTS: [&str; 4] = [
    include_str!("../machines/dfa-ab-plus.json"),
    include_str!("../machines/nfa-a-star-b.json"),
    include_str!("../machines/pda-an-bn.json"),
    include_str!("../machines/tm-bit-flipper.json"),
];

lazy_static::lazy_static! {
    static ref MACHINES: RwLock<Vec<Automaton>> = RwLock::new(Vec::new());
}

pub struct MachineLibrary;

impl MachineLibrary {
    /// Parses the embedded machines into the registry. Called lazily by the
    /// accessors, so using it explicitly is optional.
    pub fn load() -> Result<(), EngineError> {
        {
            let guard = MACHINES
                .read()
                .map_err(|_| EngineError::File("Failed to acquire library lock".to_string()))?;
            if !guard.is_empty() {
                return Ok(());
            }
        }

        let mut machines = Vec::new();
        for text in MACHINE_TEXTS {
            machines.push(Automaton::from_json(text)?);
        }

        let mut guard = MACHINES
            .write()
            .map_err(|_| EngineError::File("Failed to acquire library lock".to_string()))?;
        if guard.is_empty() {
            *guard = machines;
        }
        Ok(())
    }

    /// The number of bundled machines.
    pub fn count() -> usize {
        let _ = Self::load();
        MACHINES.read().map(|m| m.len()).unwrap_or(0)
    }

    /// The bundled machine at `index`, as a fresh copy.
    pub fn get(index: usize) -> Result<Automaton, EngineError> {
        let _ = Self::load();
        MACHINES
            .read()
            .map_err(|_| EngineError::File("Failed to acquire library lock".to_string()))?
            .get(index)
            .cloned()
            .ok_or_else(|| EngineError::UnknownMachine(format!("index {index} out of range")))
    }

    /// The bundled machine with the given name, as a fresh copy.
    pub fn by_name(name: &str) -> Result<Automaton, EngineError> {
        let _ = Self::load();
        MACHINES
            .read()
            .map_err(|_| EngineError::File("Failed to acquire library lock".to_string()))?
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownMachine(name.to_string()))
    }

    /// The names of every bundled machine, in registry order.
    pub fn names() -> Vec<String> {
        let _ = Self::load();
        MACHINES
            .read()
            .map(|machines| machines.iter().map(|m| m.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MachineType;

    #[test]
    fn test_all_bundled_machines_parse() {
        assert!(MachineLibrary::load().is_ok());
        assert_eq!(MachineLibrary::count(), 4);
    }

    #[test]
    fn test_one_machine_per_type() {
        let types: Vec<MachineType> = (0..MachineLibrary::count())
            .map(|i| MachineLibrary::get(i).unwrap().machine_type())
            .collect();
        assert!(types.contains(&MachineType::Dfa));
        assert!(types.contains(&MachineType::Nfa));
        assert!(types.contains(&MachineType::Pda));
        assert!(types.contains(&MachineType::Tm));
    }

    #[test]
    fn test_bundled_machines_validate() {
        for i in 0..MachineLibrary::count() {
            let machine = MachineLibrary::get(i).unwrap();
            let report = machine.validate();
            assert!(
                report.is_valid(),
                "machine '{}' has errors: {:?}",
                machine.name,
                report.errors
            );
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let machine = MachineLibrary::by_name("Bit flipper").unwrap();
        assert_eq!(machine.machine_type(), MachineType::Tm);
        assert!(MachineLibrary::by_name("no such machine").is_err());
    }

    #[test]
    fn test_bundled_dfa_runs() {
        let mut dfa = MachineLibrary::by_name("(ab)+ recognizer").unwrap();
        assert!(dfa.accepts("abab"));
        assert!(!dfa.accepts("aba"));
    }

    #[test]
    fn test_bundled_pda_runs() {
        let mut pda = MachineLibrary::by_name("aⁿbⁿ by final state").unwrap();
        assert!(pda.accepts("aabb"));
        assert!(!pda.accepts("aab"));
    }

    #[test]
    fn test_bundled_tm_runs() {
        let mut tm = MachineLibrary::by_name("Bit flipper").unwrap();
        assert!(tm.accepts("0110"));
    }

    #[test]
    fn test_index_out_of_range() {
        assert!(MachineLibrary::get(99).is_err());
    }
}
