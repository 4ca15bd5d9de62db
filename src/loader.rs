//! Loading and saving machine files: `.json` carries the structured form,
//! `.jff`/`.xml` the interchange dialect.

use std::fs;
use std::path::{Path, PathBuf};

use crate::automaton::Automaton;
use crate::types::EngineError;

/// `MachineLoader` reads and writes machine files, picking the serialization
/// by file extension.
pub struct MachineLoader;

impl MachineLoader {
    /// Loads a machine from a file.
    ///
    /// # Arguments
    ///
    /// * `path` - A `.json` (structured) or `.jff`/`.xml` (interchange) file.
    ///
    /// # Returns
    ///
    /// * `Ok(Automaton)` on success.
    /// * `Err(EngineError::File)` if the file cannot be read or has an
    ///   unsupported extension.
    /// * `Err(EngineError::Serialization)` / `Err(EngineError::Interchange)`
    ///   if the content is malformed.
    pub fn load(path: &Path) -> Result<Automaton, EngineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::File(format!("Failed to read {}: {e}", path.display()))
        })?;
        match extension(path).as_deref() {
            Some("json") => Automaton::from_json(&content),
            Some("jff") | Some("xml") => Automaton::from_interchange_xml(&content),
            _ => Err(EngineError::File(format!(
                "Unsupported machine file extension: {}",
                path.display()
            ))),
        }
    }

    /// Loads a machine from in-memory content, sniffing the serialization:
    /// content starting with `<` is interchange XML, anything else is the
    /// structured JSON form.
    pub fn load_from_string(content: &str) -> Result<Automaton, EngineError> {
        if content.trim_start().starts_with('<') {
            Automaton::from_interchange_xml(content)
        } else {
            Automaton::from_json(content)
        }
    }

    /// Loads every machine file (`.json`, `.jff`, `.xml`) in a directory.
    /// Other files are skipped; each machine file yields its own `Result`.
    pub fn load_dir(directory: &Path) -> Vec<Result<(PathBuf, Automaton), EngineError>> {
        if !directory.exists() {
            return vec![Err(EngineError::File(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(EngineError::File(format!(
                    "Failed to read directory {}: {e}",
                    directory.display()
                )))]
            }
        };

        entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(EngineError::File(format!(
                            "Failed to read directory entry: {e}"
                        ))))
                    }
                };
                let path = entry.path();
                if path.is_dir()
                    || !matches!(
                        extension(&path).as_deref(),
                        Some("json") | Some("jff") | Some("xml")
                    )
                {
                    return None;
                }
                Some(Self::load(&path).map(|machine| (path, machine)))
            })
            .collect()
    }

    /// Saves a machine, picking the serialization by extension the same way
    /// `load` does.
    pub fn save(automaton: &Automaton, path: &Path) -> Result<(), EngineError> {
        let content = match extension(path).as_deref() {
            Some("json") => automaton.to_json(),
            Some("jff") | Some("xml") => automaton.to_interchange_xml(),
            _ => {
                return Err(EngineError::File(format!(
                    "Unsupported machine file extension: {}",
                    path.display()
                )))
            }
        };
        fs::write(path, content).map_err(|e| {
            EngineError::File(format!("Failed to write {}: {e}", path.display()))
        })
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MachineType, Point, StateNode, Transition, TransitionLabel};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn one_state_machine() -> Automaton {
        let mut a = Automaton::new(MachineType::Nfa);
        let q0 = a.add_state(StateNode::new("q0", Point::default()).with_final(true));
        a.add_transition(Transition::new(q0, q0, TransitionLabel::symbols(['a'])))
            .unwrap();
        a
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("machine.json");

        let a = one_state_machine();
        MachineLoader::save(&a, &path).unwrap();
        let b = MachineLoader::load(&path).unwrap();
        assert_eq!(b.to_structured(), a.to_structured());
    }

    #[test]
    fn test_save_and_load_interchange() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("machine.jff");

        let a = one_state_machine();
        MachineLoader::save(&a, &path).unwrap();
        let mut b = MachineLoader::load(&path).unwrap();
        assert_eq!(b.machine_type(), MachineType::Nfa);
        assert!(b.accepts("aaa"));
    }

    #[test]
    fn test_load_from_string_sniffs_format() {
        let a = one_state_machine();
        let from_json = MachineLoader::load_from_string(&a.to_json()).unwrap();
        let from_xml = MachineLoader::load_from_string(&a.to_interchange_xml()).unwrap();
        assert_eq!(from_json.states().len(), 1);
        assert_eq!(from_xml.states().len(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("machine.tur");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"whatever").unwrap();
        assert!(matches!(
            MachineLoader::load(&path),
            Err(EngineError::File(_))
        ));
        assert!(MachineLoader::save(&one_state_machine(), &path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = MachineLoader::load(Path::new("/no/such/machine.json"));
        assert!(matches!(result, Err(EngineError::File(_))));
    }

    #[test]
    fn test_load_dir_mixes_successes_and_errors() {
        let dir = tempdir().unwrap();

        MachineLoader::save(&one_state_machine(), &dir.path().join("good.json")).unwrap();

        let mut bad = File::create(dir.path().join("bad.json")).unwrap();
        bad.write_all(b"not a machine").unwrap();

        let mut ignored = File::create(dir.path().join("notes.txt")).unwrap();
        ignored.write_all(b"ignored").unwrap();

        let results = MachineLoader::load_dir(dir.path());
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let results = MachineLoader::load_dir(Path::new("/no/such/dir"));
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
