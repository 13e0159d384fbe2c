//! Class-chain query parser
//!
//! Grammar:
//!
//! ```text
//! chain      := step ("/" step)*
//! step       := "**" | typeToken position? predicate?
//! typeToken  := "*" | registered type name (with or without prefix)
//! position   := "[" integer "]"          1-based, negative counts from the end
//! predicate  := "[`" expression "`]"
//! ```
//!
//! Parsing never fails. Unknown types fall back to the wildcard type and
//! unusable brackets are skipped; both are reported as diagnostics.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use uiloc_core_types::{ElementType, Predicate};

use crate::types::Diagnostic;

const DESCENDANT_MARKER: &str = "**";
const WILDCARD: &str = "*";

static PREDICATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[`(.*?)`\]").expect("valid regex"));
static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("valid regex"));

/// One chain step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    pub element_type: ElementType,
    pub position: Option<i64>,
    pub is_descendant: bool,
    pub predicate: Option<Predicate>,
}

impl ChainStep {
    pub fn child(element_type: ElementType) -> Self {
        Self {
            element_type,
            position: None,
            is_descendant: false,
            predicate: None,
        }
    }

    /// The bare `**` step.
    pub fn descendant_marker() -> Self {
        Self {
            element_type: ElementType::ANY,
            position: None,
            is_descendant: true,
            predicate: None,
        }
    }

    pub fn is_descendant_marker(&self) -> bool {
        self.is_descendant
            && self.element_type.is_any()
            && self.position.is_none()
            && self.predicate.is_none()
    }
}

impl fmt::Display for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_descendant_marker() {
            return f.write_str(DESCENDANT_MARKER);
        }
        if self.element_type.is_any() {
            f.write_str(WILDCARD)?;
        } else {
            f.write_str(self.element_type.name())?;
        }
        if let Some(predicate) = &self.predicate {
            write!(f, "[`{}`]", predicate)?;
        }
        if let Some(position) = self.position {
            write!(f, "[{}]", position)?;
        }
        Ok(())
    }
}

/// Ordered chain of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChainQuery {
    pub steps: Vec<ChainStep>,
}

impl ChainQuery {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Display for ChainQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Parser output: the best-effort chain and what had to be skipped
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedChain {
    pub query: ChainQuery,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a class-chain string
pub fn parse_chain(input: &str) -> ParsedChain {
    let mut parsed = ParsedChain::default();
    for token in split_steps(input) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let step = parse_step(token, &mut parsed.diagnostics);
        parsed.query.steps.push(step);
    }
    debug!(
        chain = input,
        steps = parsed.query.len(),
        diagnostics = parsed.diagnostics.len(),
        "parsed class chain"
    );
    parsed
}

/// Split on `/` outside backtick-quoted predicates.
fn split_steps(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut in_predicate = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '`' => in_predicate = !in_predicate,
            '/' if !in_predicate => {
                tokens.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(&input[start..]);
    tokens
}

fn parse_step(token: &str, diagnostics: &mut Vec<Diagnostic>) -> ChainStep {
    if token == DESCENDANT_MARKER {
        return ChainStep::descendant_marker();
    }

    let type_end = token.find('[').unwrap_or(token.len());
    let type_token = token[..type_end].trim();
    let element_type = if type_token.starts_with(WILDCARD) {
        ElementType::ANY
    } else {
        match ElementType::lookup(type_token) {
            Ok(element_type) => element_type,
            Err(err) => {
                warn!("{}; using {}", err, ElementType::ANY.name());
                diagnostics.push(err.into());
                ElementType::ANY
            }
        }
    };

    let brackets = &token[type_end..];
    let mut predicate = None;
    if let Some(captures) = PREDICATE_RE.captures(brackets) {
        let expression = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        match Predicate::parse(expression) {
            Ok(parsed) => predicate = Some(parsed),
            Err(err) => {
                warn!(token, "dropping chain predicate: {}", err);
                diagnostics.push(Diagnostic::MalformedChainQuery {
                    token: token.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    // positions are looked up outside the predicate so bracketed text inside it is ignored
    let remainder = PREDICATE_RE.replace_all(brackets, "");
    let mut position = None;
    for captures in BRACKET_RE.captures_iter(&remainder) {
        let inner = captures.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        match inner.parse::<i64>() {
            Ok(value) if position.is_none() => position = Some(value),
            Ok(_) => diagnostics.push(Diagnostic::MalformedChainQuery {
                token: token.to_string(),
                reason: format!("extra position [{}] ignored", inner),
            }),
            Err(_) => diagnostics.push(Diagnostic::MalformedChainQuery {
                token: token.to_string(),
                reason: format!("'[{}]' is neither a position nor a predicate", inner),
            }),
        }
    }
    let leftover = BRACKET_RE.replace_all(&remainder, "");
    if leftover.contains('[') || leftover.contains(']') || leftover.contains('`') {
        diagnostics.push(Diagnostic::MalformedChainQuery {
            token: token.to_string(),
            reason: "unbalanced brackets ignored".to_string(),
        });
    }

    ChainStep {
        element_type,
        position,
        is_descendant: false,
        predicate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_child_steps_with_position() {
        let parsed = parse_chain("XCUIElementTypeWindow/XCUIElementTypeTable[2]/XCUIElementTypeCell");
        let steps = &parsed.query.steps;
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|s| !s.is_descendant));
        assert_eq!(steps[1].position, Some(2));
        assert_eq!(steps[1].element_type, ElementType::TABLE);
        assert_eq!(steps[0].position, None);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_descendant_marker_then_type() {
        let parsed = parse_chain("**/Button");
        let steps = &parsed.query.steps;
        assert_eq!(steps.len(), 2);
        assert!(steps[0].is_descendant_marker());
        assert_eq!(steps[1].element_type, ElementType::BUTTON);
        assert!(!steps[1].is_descendant);
    }

    #[test]
    fn test_predicate_without_position() {
        let parsed = parse_chain("Cell[`label == \"x\"`]");
        let step = &parsed.query.steps[0];
        assert!(step.predicate.is_some());
        assert_eq!(step.position, None);
    }

    #[test]
    fn test_predicate_and_position_together() {
        let parsed = parse_chain("**/Cell[`label BEGINSWITH \"[1]/a\"`][-1]");
        let step = &parsed.query.steps[1];
        assert!(step.predicate.is_some());
        assert_eq!(step.position, Some(-1));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_wildcards_and_empty_segments() {
        let parsed = parse_chain("/*[3]//**/");
        let steps = &parsed.query.steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].element_type, ElementType::ANY);
        assert_eq!(steps[0].position, Some(3));
        assert!(steps[1].is_descendant_marker());
    }

    #[test]
    fn test_unknown_type_is_reported_not_fatal() {
        let parsed = parse_chain("Gizmo/Button");
        assert_eq!(parsed.query.steps[0].element_type, ElementType::ANY);
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::InvalidTypeName {
                name: "Gizmo".into()
            }]
        );
    }

    #[test]
    fn test_malformed_brackets_are_skipped() {
        let parsed = parse_chain("Button[abc]/Cell[`label ==`]/Cell[`label == 'x'");
        let steps = &parsed.query.steps;
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|s| s.position.is_none() && s.predicate.is_none()));
        assert_eq!(steps[2].element_type, ElementType::CELL);
        assert_eq!(parsed.diagnostics.len(), 3);
    }

    #[test]
    fn test_display_round_trips() {
        let parsed = parse_chain("**/XCUIElementTypeCell[`label == \"x\"`][2]/*");
        let printed = parsed.query.to_string();
        assert_eq!(parse_chain(&printed).query, parsed.query);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_chain("").query.is_empty());
        assert!(parse_chain("///").query.is_empty());
    }
}
