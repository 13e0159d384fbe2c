//! pest front end for the predicate language

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::{Attribute, CompareOptions, Comparison, ComparisonOperator, Literal, Predicate, PredicateError};

#[derive(Parser)]
#[grammar = "predicate/predicate.pest"]
struct PredicateParser;

pub(super) fn parse(input: &str) -> Result<Predicate, PredicateError> {
    let mut pairs = PredicateParser::parse(Rule::predicate, input).map_err(|err| {
        PredicateError::Syntax {
            expression: input.to_string(),
            message: err.variant.message().to_string(),
        }
    })?;

    let root = pairs.next().ok_or_else(|| syntax(input, "empty expression"))?;
    let or_expr = root
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::or_expr)
        .ok_or_else(|| syntax(input, "empty expression"))?;
    build_or(or_expr)
}

fn syntax(input: &str, message: &str) -> PredicateError {
    PredicateError::Syntax {
        expression: input.to_string(),
        message: message.to_string(),
    }
}

fn build_or(pair: Pair<Rule>) -> Result<Predicate, PredicateError> {
    let mut terms = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::and_expr)
        .map(build_and)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if terms.len() == 1 {
        terms.remove(0)
    } else {
        Predicate::Or(terms)
    })
}

fn build_and(pair: Pair<Rule>) -> Result<Predicate, PredicateError> {
    let mut terms = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::not_expr)
        .map(build_not)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if terms.len() == 1 {
        terms.remove(0)
    } else {
        Predicate::And(terms)
    })
}

fn build_not(pair: Pair<Rule>) -> Result<Predicate, PredicateError> {
    let mut negations = 0usize;
    let mut inner = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::not_op => negations += 1,
            _ => inner = Some(build_primary(part)?),
        }
    }
    let mut predicate = inner.ok_or_else(|| PredicateError::Syntax {
        expression: String::new(),
        message: "negation without operand".to_string(),
    })?;
    for _ in 0..negations {
        predicate = Predicate::Not(Box::new(predicate));
    }
    Ok(predicate)
}

fn build_primary(pair: Pair<Rule>) -> Result<Predicate, PredicateError> {
    match pair.as_rule() {
        Rule::or_expr => build_or(pair),
        Rule::true_predicate => Ok(Predicate::Constant(true)),
        Rule::false_predicate => Ok(Predicate::Constant(false)),
        Rule::comparison => build_comparison(pair),
        other => Err(PredicateError::Syntax {
            expression: pair.as_str().to_string(),
            message: format!("unexpected {:?}", other),
        }),
    }
}

fn build_comparison(pair: Pair<Rule>) -> Result<Predicate, PredicateError> {
    let text = pair.as_str().to_string();
    let mut attribute = None;
    let mut operator = None;
    let mut options = CompareOptions::default();
    let mut literal = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::key_path => attribute = Some(Attribute::from_key(part.as_str())?),
            Rule::op_symbol | Rule::op_word => {
                operator = Some(ComparisonOperator::from_token(part.as_str()).ok_or_else(
                    || PredicateError::Syntax {
                        expression: text.clone(),
                        message: format!("unknown operator '{}'", part.as_str()),
                    },
                )?)
            }
            Rule::modifier => options = parse_modifier(part.as_str()),
            _ => literal = Some(build_literal(part)?),
        }
    }

    match (attribute, operator, literal) {
        (Some(attribute), Some(operator), Some(literal)) => {
            Comparison::new(attribute, operator, options, literal).map(Predicate::Comparison)
        }
        _ => Err(syntax(&text, "incomplete comparison")),
    }
}

fn parse_modifier(token: &str) -> CompareOptions {
    let flags = token.trim_start_matches('[').trim_end_matches(']');
    CompareOptions {
        case_insensitive: flags.chars().any(|c| c.eq_ignore_ascii_case(&'c')),
        diacritic_insensitive: flags.chars().any(|c| c.eq_ignore_ascii_case(&'d')),
    }
}

fn build_literal(pair: Pair<Rule>) -> Result<Literal, PredicateError> {
    match pair.as_rule() {
        Rule::string => {
            let raw = pair
                .into_inner()
                .next()
                .map(|inner| inner.as_str())
                .unwrap_or_default();
            Ok(Literal::String(unescape(raw)))
        }
        Rule::number => pair
            .as_str()
            .parse::<f64>()
            .map(Literal::Number)
            .map_err(|err| syntax(pair.as_str(), &err.to_string())),
        Rule::bool_true => Ok(Literal::Bool(true)),
        Rule::bool_false => Ok(Literal::Bool(false)),
        Rule::null => Ok(Literal::Null),
        Rule::list => pair
            .into_inner()
            .map(build_literal)
            .collect::<Result<Vec<_>, _>>()
            .map(Literal::List),
        other => Err(syntax(pair.as_str(), &format!("unexpected {:?}", other))),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_binds_tighter() {
        let predicate = parse("label == 'a' OR label == 'b' AND enabled == YES").unwrap();
        match predicate {
            Predicate::Or(terms) => {
                assert_eq!(terms.len(), 2);
                assert!(matches!(terms[1], Predicate::And(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keywords_need_word_boundaries() {
        // `NOTlabel` is a key path, not a negation
        assert!(matches!(parse("NOTlabel == 'x'"), Err(PredicateError::UnknownAttribute(_))));
        assert!(parse("NOT label == 'x'").is_ok());
        assert!(parse("label == 'x' ANDvalue == 'y'").is_err());
    }

    #[test]
    fn test_escapes_and_modifiers() {
        let predicate = parse(r#"label ==[c] "say \"hi\"""#).unwrap();
        match predicate {
            Predicate::Comparison(cmp) => {
                assert_eq!(cmp.literal, Literal::String("say \"hi\"".into()));
                assert!(cmp.options.case_insensitive);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lists_and_constants() {
        assert!(parse("label IN {'a', 'b', 3}").is_ok());
        assert_eq!(parse("TRUEPREDICATE").unwrap(), Predicate::Constant(true));
        assert!(parse("label ==").is_err());
        assert!(parse("").is_err());
    }
}
