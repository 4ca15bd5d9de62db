//! Parsing and formatting of transition labels, using the `pest` grammar in
//! `labels.pest`. Each machine family has its own mini-grammar:
//!
//! - DFA: a single symbol; empty or `ε` means ε.
//! - NFA: a comma-separated symbol list; empty or `ε` means ε.
//! - PDA: `input,pop;push` (or `input,pop→push`); missing fields mean ε.
//! - TM: `read;write,dir` (or `read→write,dir`) with `dir` ∈ {L, R, S}.

use crate::types::{
    Direction, EngineError, MachineType, TransitionLabel, BLANK_SYMBOL, EPSILON_SYMBOL,
    INPUT_BLANK_SYMBOL,
};
use pest::{iterators::Pair, Parser as PestParser};
use pest_derive::Parser as PestParser;

/// Derives a `PestParser` for the label grammar defined in `labels.pest`.
#[derive(PestParser)]
#[grammar = "labels.pest"]
pub struct LabelParser;

/// Parses a transition label in the mini-grammar of the given machine type.
///
/// # Arguments
///
/// * `machine_type` - Selects which mini-grammar to apply.
/// * `text` - The label text as typed by the user.
///
/// # Returns
///
/// * `Ok(TransitionLabel)` of the matching variant.
/// * `Err(EngineError::LabelParse)` if the text does not match the grammar.
/// * `Err(EngineError::InvalidLabel)` if a DFA label carries more than one symbol.
pub fn parse_label(machine_type: MachineType, text: &str) -> Result<TransitionLabel, EngineError> {
    match machine_type {
        MachineType::Dfa => {
            let symbols = parse_finite(text)?;
            if symbols.len() > 1 {
                return Err(EngineError::InvalidLabel(format!(
                    "A DFA label carries a single symbol, got '{text}'"
                )));
            }
            Ok(TransitionLabel::Finite { symbols })
        }
        MachineType::Nfa => Ok(TransitionLabel::Finite {
            symbols: parse_finite(text)?,
        }),
        MachineType::Pda => parse_pda(text),
        MachineType::Tm => parse_tm(text),
    }
}

/// Formats a transition label back into its canonical mini-grammar form.
pub fn format_label(label: &TransitionLabel) -> String {
    match label {
        TransitionLabel::Finite { symbols } => {
            if symbols.is_empty() {
                EPSILON_SYMBOL.to_string()
            } else {
                symbols
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            }
        }
        TransitionLabel::Pda { input, pop, push } => {
            let input = input.unwrap_or(EPSILON_SYMBOL);
            let pop = pop.unwrap_or(EPSILON_SYMBOL);
            let push = if push.is_empty() {
                EPSILON_SYMBOL.to_string()
            } else {
                push.clone()
            };
            format!("{input},{pop};{push}")
        }
        TransitionLabel::Tm {
            read,
            write,
            direction,
        } => format!("{read};{write},{}", direction.as_char()),
    }
}

fn parse_finite(text: &str) -> Result<Vec<char>, EngineError> {
    let root = LabelParser::parse(Rule::finite_label, text.trim())
        .map_err(|e| EngineError::LabelParse(e.into()))?
        .next()
        .expect("grammar yields exactly one finite_label");

    let mut symbols = Vec::new();
    for pair in root.into_inner() {
        if pair.as_rule() == Rule::finite_sym {
            let c = single_char(&pair);
            // ε in a symbol list stands for "no symbol", not a literal.
            if c != EPSILON_SYMBOL {
                symbols.push(c);
            }
        }
    }
    Ok(symbols)
}

fn parse_pda(text: &str) -> Result<TransitionLabel, EngineError> {
    let root = LabelParser::parse(Rule::pda_label, text.trim())
        .map_err(|e| EngineError::LabelParse(e.into()))?
        .next()
        .expect("grammar yields exactly one pda_label");

    let mut input = None;
    let mut pop = None;
    let mut push = String::new();
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::pda_input => input = epsilon_free(single_char(&pair)),
            Rule::pda_pop => pop = epsilon_free(single_char(&pair)),
            Rule::pda_push => {
                let text = pair.as_str();
                if text != EPSILON_SYMBOL.to_string() {
                    push = text.to_string();
                }
            }
            _ => {}
        }
    }
    Ok(TransitionLabel::Pda { input, pop, push })
}

fn parse_tm(text: &str) -> Result<TransitionLabel, EngineError> {
    let root = LabelParser::parse(Rule::tm_label, text.trim())
        .map_err(|e| EngineError::LabelParse(e.into()))?
        .next()
        .expect("grammar yields exactly one tm_label");

    let mut read = BLANK_SYMBOL;
    let mut write = BLANK_SYMBOL;
    let mut direction = Direction::Stay;
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::tm_read => read = normalize_blank(single_char(&pair)),
            Rule::tm_write => write = normalize_blank(single_char(&pair)),
            Rule::tm_move => {
                let c = single_char(&pair);
                direction = Direction::from_char(c)
                    .expect("grammar admits only direction letters");
            }
            _ => {}
        }
    }
    Ok(TransitionLabel::Tm {
        read,
        write,
        direction,
    })
}

fn single_char(pair: &Pair<Rule>) -> char {
    pair.as_str()
        .chars()
        .next()
        .expect("matched rule spans at least one character")
}

fn epsilon_free(c: char) -> Option<char> {
    (c != EPSILON_SYMBOL).then_some(c)
}

/// Maps the blank substitutes accepted in label text onto the tape blank.
fn normalize_blank(c: char) -> char {
    if c == INPUT_BLANK_SYMBOL {
        BLANK_SYMBOL
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dfa_single_symbol() {
        let label = parse_label(MachineType::Dfa, "a").unwrap();
        assert_eq!(label, TransitionLabel::symbols(['a']));
    }

    #[test]
    fn test_parse_dfa_rejects_symbol_list() {
        let result = parse_label(MachineType::Dfa, "a,b");
        assert!(matches!(result, Err(EngineError::InvalidLabel(_))));
    }

    #[test]
    fn test_parse_dfa_epsilon_forms() {
        assert!(parse_label(MachineType::Dfa, "").unwrap().is_epsilon());
        assert!(parse_label(MachineType::Dfa, "ε").unwrap().is_epsilon());
    }

    #[test]
    fn test_parse_nfa_symbol_list() {
        let label = parse_label(MachineType::Nfa, "a,b,c").unwrap();
        assert_eq!(label, TransitionLabel::symbols(['a', 'b', 'c']));
    }

    #[test]
    fn test_parse_nfa_spaces_allowed() {
        let label = parse_label(MachineType::Nfa, "0 , 1").unwrap();
        assert_eq!(label, TransitionLabel::symbols(['0', '1']));
    }

    #[test]
    fn test_parse_pda_full_label() {
        let label = parse_label(MachineType::Pda, "a,Z;AZ").unwrap();
        assert_eq!(
            label,
            TransitionLabel::Pda {
                input: Some('a'),
                pop: Some('Z'),
                push: "AZ".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_pda_arrow_synonym() {
        assert_eq!(
            parse_label(MachineType::Pda, "a,Z→AZ").unwrap(),
            parse_label(MachineType::Pda, "a,Z;AZ").unwrap()
        );
        assert_eq!(
            parse_label(MachineType::Pda, "a,Z->AZ").unwrap(),
            parse_label(MachineType::Pda, "a,Z;AZ").unwrap()
        );
    }

    #[test]
    fn test_parse_pda_missing_fields_are_epsilon() {
        let label = parse_label(MachineType::Pda, ",;").unwrap();
        assert_eq!(
            label,
            TransitionLabel::Pda {
                input: None,
                pop: None,
                push: String::new(),
            }
        );

        let label = parse_label(MachineType::Pda, "ε,Z;Z").unwrap();
        assert_eq!(
            label,
            TransitionLabel::Pda {
                input: None,
                pop: Some('Z'),
                push: "Z".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_tm_label() {
        let label = parse_label(MachineType::Tm, "0;1,R").unwrap();
        assert_eq!(
            label,
            TransitionLabel::Tm {
                read: '0',
                write: '1',
                direction: Direction::Right,
            }
        );
    }

    #[test]
    fn test_parse_tm_arrow_and_lowercase_direction() {
        let label = parse_label(MachineType::Tm, "0→1,r").unwrap();
        assert_eq!(
            label,
            TransitionLabel::Tm {
                read: '0',
                write: '1',
                direction: Direction::Right,
            }
        );
    }

    #[test]
    fn test_parse_tm_blank_substitutes() {
        let label = parse_label(MachineType::Tm, "_;_,S").unwrap();
        assert_eq!(
            label,
            TransitionLabel::Tm {
                read: BLANK_SYMBOL,
                write: BLANK_SYMBOL,
                direction: Direction::Stay,
            }
        );

        // Missing read/write fields also mean blank.
        let label = parse_label(MachineType::Tm, ";,L").unwrap();
        assert_eq!(
            label,
            TransitionLabel::Tm {
                read: BLANK_SYMBOL,
                write: BLANK_SYMBOL,
                direction: Direction::Left,
            }
        );
    }

    #[test]
    fn test_parse_tm_invalid_direction() {
        let result = parse_label(MachineType::Tm, "0;1,X");
        assert!(matches!(result, Err(EngineError::LabelParse(_))));
    }

    #[test]
    fn test_format_round_trip() {
        for (machine_type, text) in [
            (MachineType::Nfa, "a,b"),
            (MachineType::Nfa, "ε"),
            (MachineType::Pda, "a,Z;AZ"),
            (MachineType::Pda, "ε,ε;ε"),
            (MachineType::Tm, "0;1,R"),
        ] {
            let label = parse_label(machine_type, text).unwrap();
            assert_eq!(format_label(&label), text);
            assert_eq!(parse_label(machine_type, &format_label(&label)).unwrap(), label);
        }
    }
}
