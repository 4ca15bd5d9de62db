//! The interchange XML dialect, compatible with the established desktop
//! tool: a `<structure>` root carrying a `<type>` tag (`fa`, `pda`,
//! `turing`) and an `<automaton>` of `<state>` and `<transition>` elements.
//!
//! The dialect is closed and small, so it is read by a dedicated scanner
//! rather than a general XML library. Imported finite automata always load
//! as NFAs; an inbound DFA is a well-formed NFA.

use crate::automaton::Automaton;
use crate::document::{self, MachineDoc, StateDoc, TransitionDoc};
use crate::types::{
    Direction, EngineError, MachineType, StateId, TransitionLabel, BLANK_SYMBOL,
};

// ---------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------

/// Emits the automaton in the interchange dialect.
pub(crate) fn to_xml(a: &Automaton) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    out.push_str("<structure>\n");
    let type_tag = match a.machine_type() {
        MachineType::Dfa | MachineType::Nfa => "fa",
        MachineType::Pda => "pda",
        MachineType::Tm => "turing",
    };
    out.push_str(&format!("\t<type>{type_tag}</type>\n"));
    out.push_str("\t<automaton>\n");

    for state in a.states() {
        out.push_str(&format!(
            "\t\t<state id=\"{}\" name=\"{}\">\n",
            state.id,
            escape(&state.name)
        ));
        out.push_str(&format!("\t\t\t<x>{}</x>\n", state.position.x));
        out.push_str(&format!("\t\t\t<y>{}</y>\n", state.position.y));
        if state.is_initial {
            out.push_str("\t\t\t<initial/>\n");
        }
        if state.is_final {
            out.push_str("\t\t\t<final/>\n");
        }
        out.push_str("\t\t</state>\n");
    }

    for transition in a.transitions() {
        out.push_str("\t\t<transition>\n");
        out.push_str(&format!("\t\t\t<from>{}</from>\n", transition.from));
        out.push_str(&format!("\t\t\t<to>{}</to>\n", transition.to));
        match &transition.label {
            TransitionLabel::Finite { symbols } => {
                if symbols.is_empty() {
                    out.push_str("\t\t\t<read/>\n");
                } else {
                    for symbol in symbols {
                        out.push_str(&format!("\t\t\t<read>{}</read>\n", escape_char(*symbol)));
                    }
                }
            }
            TransitionLabel::Pda { input, pop, push } => {
                out.push_str(&text_element("read", &optional_char(*input)));
                out.push_str(&text_element("pop", &optional_char(*pop)));
                out.push_str(&text_element("push", &escape(push)));
            }
            TransitionLabel::Tm {
                read,
                write,
                direction,
            } => {
                let blank = a
                    .tm_config()
                    .map(|c| c.blank_symbol)
                    .unwrap_or(BLANK_SYMBOL);
                out.push_str(&text_element("read", &tape_char(*read, blank)));
                out.push_str(&text_element("write", &tape_char(*write, blank)));
                out.push_str(&format!(
                    "\t\t\t<move>{}</move>\n",
                    direction.as_char()
                ));
            }
        }
        out.push_str("\t\t</transition>\n");
    }

    out.push_str("\t</automaton>\n");
    out.push_str("</structure>\n");
    out
}

fn text_element(name: &str, text: &str) -> String {
    if text.is_empty() {
        format!("\t\t\t<{name}/>\n")
    } else {
        format!("\t\t\t<{name}>{text}</{name}>\n")
    }
}

fn optional_char(symbol: Option<char>) -> String {
    symbol.map(escape_char).unwrap_or_default()
}

/// The dialect writes the blank as an empty element.
fn tape_char(symbol: char, blank: char) -> String {
    if symbol == blank {
        String::new()
    } else {
        escape_char(symbol)
    }
}

fn escape_char(c: char) -> String {
    escape(&c.to_string())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------

/// Parses the interchange dialect into an automaton. Malformed input is
/// reported as a single error; nothing is built from it.
pub(crate) fn from_xml(xml: &str) -> Result<Automaton, EngineError> {
    let root = Element::parse_document(xml)?;
    if root.name != "structure" {
        return Err(EngineError::Interchange(format!(
            "Expected <structure> root, found <{}>",
            root.name
        )));
    }
    let type_text = root
        .child("type")
        .map(|e| e.text.trim().to_string())
        .ok_or_else(|| EngineError::Interchange("Missing <type> element".to_string()))?;
    let machine_type = match type_text.as_str() {
        "fa" => MachineType::Nfa,
        "pda" => MachineType::Pda,
        "turing" => MachineType::Tm,
        other => {
            return Err(EngineError::Interchange(format!(
                "Unsupported machine type '{other}'"
            )))
        }
    };
    let body = root
        .child("automaton")
        .ok_or_else(|| EngineError::Interchange("Missing <automaton> element".to_string()))?;

    let mut doc = MachineDoc {
        machine_type,
        name: None,
        states: vec![],
        transitions: vec![],
        alphabet: vec![],
        initial_state_id: None,
        blank_symbol: None,
        tape_alphabet: None,
        initial_stack_symbol: None,
        accept_by_final_state: None,
        accept_by_empty_stack: None,
        stack_alphabet: None,
    };

    for element in body.children.iter().filter(|e| e.name == "state") {
        let id: StateId = element
            .attribute("id")
            .ok_or_else(|| EngineError::Interchange("<state> without id".to_string()))?
            .parse()
            .map_err(|_| EngineError::Interchange("Unparsable state id".to_string()))?;
        let name = element
            .attribute("name")
            .unwrap_or_else(|| format!("q{id}"));
        let is_initial = element.child("initial").is_some();
        if is_initial && doc.initial_state_id.is_none() {
            doc.initial_state_id = Some(id);
        }
        doc.states.push(StateDoc {
            id,
            name,
            x: element.child_number("x").unwrap_or(0.0),
            y: element.child_number("y").unwrap_or(0.0),
            is_initial,
            is_final: element.child("final").is_some(),
            is_halt: false,
        });
    }

    for (index, element) in body
        .children
        .iter()
        .filter(|e| e.name == "transition")
        .enumerate()
    {
        let from_state = element
            .child_number::<StateId>("from")
            .ok_or_else(|| EngineError::Interchange("<transition> without <from>".to_string()))?;
        let to_state = element
            .child_number::<StateId>("to")
            .ok_or_else(|| EngineError::Interchange("<transition> without <to>".to_string()))?;

        let mut transition = TransitionDoc {
            id: index,
            from_state,
            to_state,
            symbols: None,
            stack_read: None,
            stack_write: None,
            read_symbol: None,
            write_symbol: None,
            direction: None,
            control_point: None,
            label_offset: None,
        };

        match machine_type {
            MachineType::Dfa | MachineType::Nfa => {
                let symbols: Vec<char> = element
                    .children
                    .iter()
                    .filter(|e| e.name == "read")
                    .filter_map(|e| e.text.trim().chars().next())
                    .collect();
                transition.symbols = Some(symbols);
            }
            MachineType::Pda => {
                transition.symbols = Some(
                    element
                        .child_symbol("read")
                        .into_iter()
                        .collect(),
                );
                transition.stack_read = element.child_symbol("pop");
                transition.stack_write = element
                    .child("push")
                    .map(|e| e.text.trim().to_string());
            }
            MachineType::Tm => {
                transition.read_symbol =
                    Some(element.child_symbol("read").unwrap_or(BLANK_SYMBOL));
                transition.write_symbol =
                    Some(element.child_symbol("write").unwrap_or(BLANK_SYMBOL));
                let move_text = element
                    .child("move")
                    .map(|e| e.text.trim().to_string())
                    .ok_or_else(|| {
                        EngineError::Interchange("<transition> without <move>".to_string())
                    })?;
                let direction = move_text
                    .chars()
                    .next()
                    .and_then(Direction::from_char)
                    .ok_or_else(|| {
                        EngineError::Interchange(format!("Invalid direction '{move_text}'"))
                    })?;
                transition.direction = Some(direction);
            }
        }
        doc.transitions.push(transition);
    }

    document::from_structured(&doc)
        .map_err(|e| EngineError::Interchange(e.to_string()))
}

/// A parsed XML element of the dialect: name, attributes, children, and the
/// concatenated character data.
#[derive(Debug, Clone, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn parse_document(xml: &str) -> Result<Element, EngineError> {
        let mut scanner = Scanner::new(xml);
        scanner.skip_misc()?;
        let root = scanner.parse_element()?;
        scanner.skip_misc()?;
        if !scanner.at_end() {
            return Err(EngineError::Interchange(
                "Trailing content after the root element".to_string(),
            ));
        }
        Ok(root)
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.name == name)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn child_number<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.child(name)?.text.trim().parse().ok()
    }

    /// The first character of a child's text; `None` when the child is
    /// absent or empty, which the dialect uses for ε and the blank.
    fn child_symbol(&self, name: &str) -> Option<char> {
        self.child(name)?.text.trim().chars().next()
    }
}

/// A cursor over the XML text. Understands exactly what the dialect needs:
/// elements, attributes, character data, comments, and the prolog.
struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(xml: &str) -> Scanner {
        Scanner {
            chars: xml.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        prefix
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn advance(&mut self, count: usize) {
        self.pos += count;
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance(1);
        }
    }

    /// Skips whitespace, the `<?xml …?>` prolog, and comments.
    fn skip_misc(&mut self) -> Result<(), EngineError> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_until(&mut self, terminator: &str) -> Result<(), EngineError> {
        while !self.at_end() {
            if self.starts_with(terminator) {
                self.advance(terminator.chars().count());
                return Ok(());
            }
            self.advance(1);
        }
        Err(EngineError::Interchange(format!(
            "Unterminated construct, expected '{terminator}'"
        )))
    }

    fn parse_element(&mut self) -> Result<Element, EngineError> {
        self.expect('<')?;
        let name = self.read_name();
        if name.is_empty() {
            return Err(EngineError::Interchange("Empty element name".to_string()));
        }
        let mut element = Element {
            name,
            ..Element::default()
        };

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('/') => {
                    self.advance(1);
                    self.expect('>')?;
                    return Ok(element);
                }
                Some('>') => {
                    self.advance(1);
                    break;
                }
                Some(_) => {
                    let (attr, value) = self.parse_attribute()?;
                    element.attributes.push((attr, value));
                }
                None => {
                    return Err(EngineError::Interchange(format!(
                        "Unterminated <{}> tag",
                        element.name
                    )))
                }
            }
        }

        // Content: character data, children, comments, then the close tag.
        loop {
            if self.starts_with("</") {
                self.advance(2);
                let close = self.read_name();
                if close != element.name {
                    return Err(EngineError::Interchange(format!(
                        "Mismatched close tag </{close}> for <{}>",
                        element.name
                    )));
                }
                self.skip_whitespace();
                self.expect('>')?;
                return Ok(element);
            }
            if self.starts_with("<!--") {
                self.skip_until("-->")?;
                continue;
            }
            match self.peek() {
                Some('<') => element.children.push(self.parse_element()?),
                Some(_) => {
                    let text = self.read_text();
                    element.text.push_str(&text);
                }
                None => {
                    return Err(EngineError::Interchange(format!(
                        "Missing close tag for <{}>",
                        element.name
                    )))
                }
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<(String, String), EngineError> {
        let name = self.read_name();
        if name.is_empty() {
            return Err(EngineError::Interchange("Malformed attribute".to_string()));
        }
        self.skip_whitespace();
        self.expect('=')?;
        self.skip_whitespace();
        let quote = self.peek().filter(|&c| c == '"' || c == '\'').ok_or_else(|| {
            EngineError::Interchange(format!("Attribute '{name}' is not quoted"))
        })?;
        self.advance(1);
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance(1);
                return Ok((name, unescape(&value)));
            }
            value.push(c);
            self.advance(1);
        }
        Err(EngineError::Interchange(format!(
            "Unterminated value for attribute '{name}'"
        )))
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == ':' || c == '.' {
                name.push(c);
                self.advance(1);
            } else {
                break;
            }
        }
        name
    }

    fn read_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '<' {
                break;
            }
            text.push(c);
            self.advance(1);
        }
        unescape(&text)
    }

    fn expect(&mut self, expected: char) -> Result<(), EngineError> {
        if self.peek() == Some(expected) {
            self.advance(1);
            Ok(())
        } else {
            Err(EngineError::Interchange(format!(
                "Expected '{expected}' at offset {}",
                self.pos
            )))
        }
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
