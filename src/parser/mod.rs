//! Query language parser
//!
//! Parses the modal first-order query surface syntax into [`Formula`]
//! values. The grammar (whitespace-insensitive except inside lexemes):
//!
//! ```text
//! formula     := implication
//! implication := disjunction ('->' implication)?
//! disjunction := conjunction ((';' | '|') disjunction)?
//! conjunction := unary      ((',' | '&') conjunction)?
//! unary       := modal | negation | predicate | '(' formula ')'
//! negation    := '~' unary
//! modal       := ('B'|'K'|'P'|'H') options? unary
//! options     := '[' option? (',' option?)* ']'
//! option      := keyvalue | constant
//! predicate   := atomRaw ('(' argument (',' argument)* ')')?
//! argument    := compound | variable | constant | constantList
//! constant    := atom | string | number
//! atom        := singleQuotes | iri | lowerPrefix
//! variable    := upperPrefix
//! ```
//!
//! `ns:name` atoms are expanded through the injected [`PrefixRegistry`]
//! at parse time; an unregistered namespace aborts the parse with a
//! [`QueryError`]. Precedence binds tightest first: unary operators, then
//! `,`/`&`, then `;`/`|`, then right-associative `->`.
//!
//! Entry points perform a full-input match: trailing garbage is a syntax
//! error.

use std::fmt;
use std::sync::Arc;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, multispace0, one_of, satisfy};
use nom::combinator::opt;
use nom::error::ErrorKind;
use nom::number::complete::double;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;

use crate::error::{QueryError, QueryResult};
use crate::formula::{Formula, ModalOperator, TimeInterval};
use crate::term::{Compound, Term};

mod prefix;

pub use prefix::PrefixRegistry;

// ============================================================================
// Parser error plumbing
// ============================================================================

/// Internal grammar error: either a plain nom error (backtrackable) or a
/// query error that must abort the whole parse.
#[derive(Debug)]
enum GrammarError<'a> {
    Nom(&'a str, ErrorKind),
    Query(QueryError),
}

impl<'a> nom::error::ParseError<&'a str> for GrammarError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        GrammarError::Nom(input, kind)
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a str, T, GrammarError<'a>>;

fn abort<'a, T>(error: QueryError) -> PResult<'a, T> {
    Err(nom::Err::Failure(GrammarError::Query(error)))
}

// ============================================================================
// Lexemes
// ============================================================================

fn ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lower_prefix(i: &str) -> PResult<'_, &str> {
    nom::combinator::recognize(pair(satisfy(|c| c.is_ascii_lowercase()), take_while(ident_char)))(i)
}

fn upper_prefix(i: &str) -> PResult<'_, &str> {
    nom::combinator::recognize(pair(satisfy(|c| c.is_ascii_uppercase()), take_while(ident_char)))(i)
}

fn alpha_word(i: &str) -> PResult<'_, &str> {
    nom::combinator::recognize(pair(satisfy(|c| c.is_ascii_alphabetic()), take_while(ident_char)))(i)
}

fn single_quotes(i: &str) -> PResult<'_, &str> {
    delimited(char('\''), take_while1(|c| c != '\''), char('\''))(i)
}

fn double_quotes(i: &str) -> PResult<'_, &str> {
    delimited(char('"'), take_while1(|c| c != '"'), char('"'))(i)
}

fn ws(i: &str) -> PResult<'_, &str> {
    multispace0(i)
}

// ============================================================================
// Modal option lists
// ============================================================================

/// One entry of a modal option list: a positional constant or a
/// `key=value` assignment.
#[derive(Debug, Clone, PartialEq)]
enum OptionEntry {
    Positional(Term),
    KeyValue(String, Term),
}

impl fmt::Display for OptionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionEntry::Positional(t) => write!(f, "{}", t),
            OptionEntry::KeyValue(k, v) => write!(f, "=({}, {})", k, v),
        }
    }
}

fn unrecognized(entry: &OptionEntry) -> QueryError {
    QueryError::UnrecognizedOption(entry.to_string())
}

fn create_k(slots: &[Option<OptionEntry>]) -> Result<ModalOperator, QueryError> {
    let mut agent: Option<String> = None;
    for entry in slots.iter().flatten() {
        let recognized = match entry {
            OptionEntry::Positional(t) => match t.text() {
                Some(s) if agent.is_none() => {
                    agent = Some(s.to_string());
                    true
                }
                _ => false,
            },
            OptionEntry::KeyValue(key, value) => match (key.as_str(), value.text()) {
                ("agent" | "a", Some(s)) if agent.is_none() => {
                    agent = Some(s.to_string());
                    true
                }
                _ => false,
            },
        };
        if !recognized {
            return Err(unrecognized(entry));
        }
    }
    Ok(match agent {
        Some(a) => ModalOperator::k_of(&a),
        None => ModalOperator::k(),
    })
}

fn create_b(slots: &[Option<OptionEntry>]) -> Result<ModalOperator, QueryError> {
    let mut agent: Option<String> = None;
    let mut confidence: Option<f64> = None;
    for entry in slots.iter().flatten() {
        let recognized = match entry {
            OptionEntry::Positional(t) => {
                if agent.is_none() && t.text().is_some() {
                    agent = t.text().map(str::to_string);
                    true
                } else if confidence.is_none() && t.as_float().is_some() {
                    confidence = t.as_float();
                    true
                } else {
                    false
                }
            }
            OptionEntry::KeyValue(key, value) => match key.as_str() {
                "agent" | "a" if agent.is_none() && value.text().is_some() => {
                    agent = value.text().map(str::to_string);
                    true
                }
                "confidence" | "c" if confidence.is_none() && value.as_float().is_some() => {
                    confidence = value.as_float();
                    true
                }
                _ => false,
            },
        };
        if !recognized {
            return Err(unrecognized(entry));
        }
    }
    Ok(match (agent, confidence) {
        (Some(a), Some(c)) => ModalOperator::b_of_confident(&a, c),
        (Some(a), None) => ModalOperator::b_of(&a),
        (None, Some(c)) => ModalOperator::b_confident(c),
        (None, None) => ModalOperator::b(),
    })
}

/// Read a time interval from an option list. Positional floats fill the
/// begin and end sides in order; an empty slot skips its side, so `[,20]`
/// is an interval with only an upper bound.
fn read_interval(slots: &[Option<OptionEntry>]) -> Result<Option<TimeInterval>, QueryError> {
    let mut sides: [Option<f64>; 2] = [None, None];
    let mut cursor = 0usize;
    for slot in slots {
        match slot {
            None => cursor = (cursor + 1).min(2),
            Some(entry @ OptionEntry::Positional(t)) => {
                let value = t.as_float().ok_or_else(|| unrecognized(entry))?;
                let index = (cursor..2)
                    .find(|&i| sides[i].is_none())
                    .ok_or_else(|| unrecognized(entry))?;
                sides[index] = Some(value);
                cursor = index + 1;
            }
            Some(entry @ OptionEntry::KeyValue(key, value)) => {
                let recognized = match (key.as_str(), value.as_float()) {
                    ("begin" | "since", Some(v)) if sides[0].is_none() => {
                        sides[0] = Some(v);
                        true
                    }
                    ("end" | "until", Some(v)) if sides[1].is_none() => {
                        sides[1] = Some(v);
                        true
                    }
                    _ => false,
                };
                if !recognized {
                    return Err(unrecognized(entry));
                }
            }
        }
    }
    let [begin, end] = sides;
    if begin.is_some() || end.is_some() {
        Ok(Some(TimeInterval::new(begin, end)))
    } else {
        Ok(None)
    }
}

fn create_p(slots: &[Option<OptionEntry>]) -> Result<ModalOperator, QueryError> {
    Ok(match read_interval(slots)? {
        Some(interval) => ModalOperator::p_during(interval),
        None => ModalOperator::p(),
    })
}

fn create_h(slots: &[Option<OptionEntry>]) -> Result<ModalOperator, QueryError> {
    Ok(match read_interval(slots)? {
        Some(interval) => ModalOperator::h_during(interval),
        None => ModalOperator::h(),
    })
}

// ============================================================================
// The parser
// ============================================================================

/// Parser for the query surface syntax.
///
/// The parser itself is stateless; all its rules are pure functions, so one
/// instance may be shared between threads. Atoms of the form `ns:name` are
/// expanded through the injected prefix registry.
#[derive(Debug, Clone)]
pub struct QueryParser {
    prefixes: Arc<PrefixRegistry>,
}

impl Default for QueryParser {
    fn default() -> Self {
        QueryParser::new()
    }
}

impl QueryParser {
    /// A parser backed by the process-wide prefix registry.
    pub fn new() -> Self {
        QueryParser { prefixes: Arc::clone(PrefixRegistry::global()) }
    }

    /// A parser backed by a caller-supplied prefix registry.
    pub fn with_prefixes(prefixes: Arc<PrefixRegistry>) -> Self {
        QueryParser { prefixes }
    }

    pub fn prefixes(&self) -> &Arc<PrefixRegistry> {
        &self.prefixes
    }

    /// Parse a formula of the query language.
    pub fn parse(&self, text: &str) -> QueryResult<Formula> {
        self.run(text, |i| self.p_formula(i))
    }

    /// Parse a single (possibly nullary) predicate.
    pub fn parse_predicate(&self, text: &str) -> QueryResult<Arc<Compound>> {
        self.run(text, |i| preceded(ws, |i| self.p_predicate(i))(i))
    }

    /// Parse a single constant term.
    pub fn parse_constant(&self, text: &str) -> QueryResult<Term> {
        self.run(text, |i| preceded(ws, |i| self.p_constant(i))(i))
    }

    /// Parse a raw atom, applying IRI expansion.
    pub fn parse_raw_atom(&self, text: &str) -> QueryResult<String> {
        self.run(text, |i| preceded(ws, |i| self.p_atom_raw(i))(i))
    }

    fn run<'a, T>(
        &self,
        text: &'a str,
        parser: impl FnOnce(&'a str) -> PResult<'a, T>,
    ) -> QueryResult<T> {
        match parser(text) {
            Ok((rest, value)) if rest.trim().is_empty() => Ok(value),
            Ok(_) => Err(QueryError::InvalidSyntax(text.to_string())),
            Err(nom::Err::Failure(GrammarError::Query(e))) => Err(e),
            Err(_) => Err(QueryError::InvalidSyntax(text.to_string())),
        }
    }

    // ------------------------------------------------------------------
    // terms
    // ------------------------------------------------------------------

    fn p_iri<'a>(&self, i: &'a str) -> PResult<'a, String> {
        let (i, ns) = alpha_word(i)?;
        let (i, _) = char(':')(i)?;
        let (i, entity) = alt((single_quotes, alpha_word))(i)?;
        match self.prefixes.expand(ns, entity) {
            Some(iri) => Ok((i, iri)),
            None => abort(QueryError::UnknownPrefix {
                prefix: ns.to_string(),
                name: entity.to_string(),
            }),
        }
    }

    fn p_atom_raw<'a>(&self, i: &'a str) -> PResult<'a, String> {
        if let Ok((rest, text)) = single_quotes(i) {
            return Ok((rest, text.to_string()));
        }
        match self.p_iri(i) {
            Ok(result) => return Ok(result),
            Err(e @ nom::Err::Failure(_)) => return Err(e),
            Err(_) => {}
        }
        let (rest, text) = lower_prefix(i)?;
        Ok((rest, text.to_string()))
    }

    fn p_atom<'a>(&self, i: &'a str) -> PResult<'a, Term> {
        let (i, text) = self.p_atom_raw(i)?;
        Ok((i, Term::atom(text)))
    }

    fn p_string<'a>(&self, i: &'a str) -> PResult<'a, Term> {
        let (i, text) = double_quotes(i)?;
        Ok((i, Term::string(text)))
    }

    fn p_number<'a>(&self, i: &'a str) -> PResult<'a, Term> {
        let (i, value) = double(i)?;
        Ok((i, Term::Float(value)))
    }

    fn p_constant<'a>(&self, i: &'a str) -> PResult<'a, Term> {
        alt((|i| self.p_atom(i), |i| self.p_string(i), |i| self.p_number(i)))(i)
    }

    fn p_variable<'a>(&self, i: &'a str) -> PResult<'a, Term> {
        let (i, name) = upper_prefix(i)?;
        Ok((i, Term::variable(name)))
    }

    fn p_constant_list<'a>(&self, i: &'a str) -> PResult<'a, Term> {
        let (i, _) = char('[')(i)?;
        let (i, items) = nom::multi::separated_list1(
            delimited(ws, char(','), ws),
            preceded(ws, |i| self.p_constant(i)),
        )(i)?;
        let (i, _) = preceded(ws, char(']'))(i)?;
        Ok((i, Term::list(items)))
    }

    fn p_compound_term<'a>(&self, i: &'a str) -> PResult<'a, Term> {
        let (i, compound) = self.p_predicate_with_args(i)?;
        Ok((i, Term::Compound(compound)))
    }

    fn p_argument<'a>(&self, i: &'a str) -> PResult<'a, Term> {
        alt((
            |i| self.p_compound_term(i),
            |i| self.p_variable(i),
            |i| self.p_constant(i),
            |i| self.p_constant_list(i),
        ))(i)
    }

    // ------------------------------------------------------------------
    // predicates
    // ------------------------------------------------------------------

    fn p_predicate_with_args<'a>(&self, i: &'a str) -> PResult<'a, Arc<Compound>> {
        let (i, functor) = self.p_atom_raw(i)?;
        let (i, _) = preceded(ws, char('('))(i)?;
        let (i, args) = nom::multi::separated_list1(
            delimited(ws, char(','), ws),
            preceded(ws, |i| self.p_argument(i)),
        )(i)?;
        let (i, _) = preceded(ws, char(')'))(i)?;
        Ok((i, Arc::new(Compound::new(functor, args))))
    }

    fn p_predicate<'a>(&self, i: &'a str) -> PResult<'a, Arc<Compound>> {
        match self.p_predicate_with_args(i) {
            Ok(result) => Ok(result),
            Err(e @ nom::Err::Failure(_)) => Err(e),
            Err(_) => {
                // nullary
                let (i, functor) = self.p_atom_raw(i)?;
                Ok((i, Arc::new(Compound::new(functor, Vec::new()))))
            }
        }
    }

    // ------------------------------------------------------------------
    // modal option lists
    // ------------------------------------------------------------------

    fn p_keyvalue<'a>(&self, i: &'a str) -> PResult<'a, OptionEntry> {
        let (i, key) = self.p_atom_raw(i)?;
        let (i, _) = preceded(ws, char('='))(i)?;
        let (i, value) = preceded(ws, |i| self.p_constant(i))(i)?;
        Ok((i, OptionEntry::KeyValue(key, value)))
    }

    fn p_option<'a>(&self, i: &'a str) -> PResult<'a, OptionEntry> {
        match self.p_keyvalue(i) {
            Ok(result) => Ok(result),
            Err(e @ nom::Err::Failure(_)) => Err(e),
            Err(_) => {
                let (i, value) = self.p_constant(i)?;
                Ok((i, OptionEntry::Positional(value)))
            }
        }
    }

    fn p_options<'a>(&self, i: &'a str) -> PResult<'a, Vec<Option<OptionEntry>>> {
        let (i, _) = char('[')(i)?;
        let (mut rest, first) = opt(preceded(ws, |i| self.p_option(i)))(i)?;
        let mut slots = vec![first];
        loop {
            match preceded(ws, char(','))(rest) {
                Ok((i, _)) => {
                    let (i, slot) = opt(preceded(ws, |i| self.p_option(i)))(i)?;
                    slots.push(slot);
                    rest = i;
                }
                Err(nom::Err::Failure(e)) => return Err(nom::Err::Failure(e)),
                Err(_) => break,
            }
        }
        let (i, _) = preceded(ws, char(']'))(rest)?;
        Ok((i, slots))
    }

    // ------------------------------------------------------------------
    // formulas
    // ------------------------------------------------------------------

    fn p_brackets<'a>(&self, i: &'a str) -> PResult<'a, Formula> {
        let (i, _) = char('(')(i)?;
        let (i, formula) = self.p_formula(i)?;
        let (i, _) = preceded(ws, char(')'))(i)?;
        Ok((i, formula))
    }

    fn p_negation<'a>(&self, i: &'a str) -> PResult<'a, Formula> {
        let (i, _) = char('~')(i)?;
        let (i, inner) = preceded(ws, |i| self.p_unary(i))(i)?;
        Ok((i, !inner))
    }

    fn p_modal<'a>(&self, i: &'a str) -> PResult<'a, Formula> {
        let (i, symbol) = one_of("BKPH")(i)?;
        let (i, slots) = opt(preceded(ws, |i| self.p_options(i)))(i)?;
        let (i, body) = preceded(ws, |i| self.p_unary(i))(i)?;
        let slots = slots.unwrap_or_default();
        let op = match symbol {
            'B' => create_b(&slots),
            'K' => create_k(&slots),
            'P' => create_p(&slots),
            'H' => create_h(&slots),
            _ => unreachable!(),
        };
        match op {
            Ok(op) => Ok((i, Formula::modal(op, body))),
            Err(e) => abort(e),
        }
    }

    fn p_unary<'a>(&self, i: &'a str) -> PResult<'a, Formula> {
        preceded(
            ws,
            alt((
                |i| self.p_modal(i),
                |i| self.p_negation(i),
                |i| {
                    let (i, compound) = self.p_predicate(i)?;
                    Ok((i, Formula::Predicate(compound)))
                },
                |i| self.p_brackets(i),
            )),
        )(i)
    }

    fn p_conjunction<'a>(&self, i: &'a str) -> PResult<'a, Formula> {
        let (i, lhs) = self.p_unary(i)?;
        let (i, rhs) = opt(preceded(delimited(ws, one_of(",&"), ws), |i| {
            self.p_conjunction(i)
        }))(i)?;
        Ok((i, match rhs {
            Some(rhs) => lhs & rhs,
            None => lhs,
        }))
    }

    fn p_disjunction<'a>(&self, i: &'a str) -> PResult<'a, Formula> {
        let (i, lhs) = self.p_conjunction(i)?;
        let (i, rhs) = opt(preceded(delimited(ws, one_of(";|"), ws), |i| {
            self.p_disjunction(i)
        }))(i)?;
        Ok((i, match rhs {
            Some(rhs) => lhs | rhs,
            None => lhs,
        }))
    }

    fn p_implication<'a>(&self, i: &'a str) -> PResult<'a, Formula> {
        let (i, lhs) = self.p_disjunction(i)?;
        let (i, rhs) = opt(preceded(delimited(ws, tag("->"), ws), |i| {
            self.p_implication(i)
        }))(i)?;
        Ok((i, match rhs {
            Some(rhs) => Formula::implication(lhs, rhs),
            None => lhs,
        }))
    }

    fn p_formula<'a>(&self, i: &'a str) -> PResult<'a, Formula> {
        self.p_implication(i)
    }
}

// ============================================================================
// Module-level entry points (process-wide prefix registry)
// ============================================================================

/// Parse a formula using the process-wide prefix registry.
pub fn parse(text: &str) -> QueryResult<Formula> {
    QueryParser::new().parse(text)
}

/// Parse a predicate using the process-wide prefix registry.
pub fn parse_predicate(text: &str) -> QueryResult<Arc<Compound>> {
    QueryParser::new().parse_predicate(text)
}

/// Parse a constant term using the process-wide prefix registry.
pub fn parse_constant(text: &str) -> QueryResult<Term> {
    QueryParser::new().parse_constant(text)
}

/// Parse a raw atom (with IRI expansion) using the process-wide prefix
/// registry.
pub fn parse_raw_atom(text: &str) -> QueryResult<String> {
    QueryParser::new().parse_raw_atom(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::ConnectiveKind;

    fn assert_float(term: &Term, expected: f64) {
        match term {
            Term::Float(v) => assert_eq!(*v, expected),
            other => panic!("expected float, got {:?}", other),
        }
    }

    fn connective(formula: &Formula, kind: ConnectiveKind) -> &[Formula] {
        match formula {
            Formula::Connective { kind: k, operands } if *k == kind => operands,
            other => panic!("expected {:?}, got {:?}", kind, other),
        }
    }

    fn modal(formula: &Formula, symbol: char) -> &Formula {
        match formula {
            Formula::Modal { op, body } => {
                assert_eq!(op.symbol(), symbol);
                body
            }
            other => panic!("expected modal formula, got {:?}", other),
        }
    }

    fn modal_op(formula: &Formula) -> &ModalOperator {
        match formula {
            Formula::Modal { op, .. } => op,
            other => panic!("expected modal formula, got {:?}", other),
        }
    }

    #[test]
    fn numbers() {
        assert_float(&parse_constant("234").unwrap(), 234.0);
        assert_float(&parse_constant("-45").unwrap(), -45.0);
        assert_float(&parse_constant("-45.64").unwrap(), -45.64);
    }

    #[test]
    fn raw_atoms() {
        assert_eq!(parse_raw_atom("p").unwrap(), "p");
        assert_eq!(parse_raw_atom("p2").unwrap(), "p2");
        assert_eq!(parse_raw_atom("p_2").unwrap(), "p_2");
        assert_eq!(parse_raw_atom("'Foo'").unwrap(), "Foo");
        assert_eq!(parse_raw_atom("owl:foo").unwrap(), "http://www.w3.org/2002/07/owl#foo");
        assert_eq!(parse_raw_atom("owl:Foo").unwrap(), "http://www.w3.org/2002/07/owl#Foo");
        assert_eq!(parse_raw_atom("owl:'Foo'").unwrap(), "http://www.w3.org/2002/07/owl#Foo");
    }

    #[test]
    fn unknown_prefix_is_reported() {
        let err = parse_raw_atom("nope:Foo").unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownPrefix { prefix: "nope".into(), name: "Foo".into() }
        );
        assert_eq!(
            err.to_string(),
            "Cannot construct IRI for 'Foo': IRI prefix 'nope' is not registered!"
        );
        // the error also aborts a formula parse
        assert!(matches!(
            parse("p(nope:Foo)").unwrap_err(),
            QueryError::UnknownPrefix { .. }
        ));
    }

    #[test]
    fn atoms() {
        assert_eq!(parse_constant("p").unwrap(), Term::atom("p"));
        assert_eq!(parse_constant("pSDd2").unwrap(), Term::atom("pSDd2"));
        assert_eq!(parse_constant("'Foo'").unwrap(), Term::atom("Foo"));
        assert_eq!(parse_constant("'x#/&%s'").unwrap(), Term::atom("x#/&%s"));
    }

    #[test]
    fn strings() {
        assert_eq!(parse_constant("\"Foo\"").unwrap(), Term::string("Foo"));
        assert_eq!(parse_constant("\"x#/&%s\"").unwrap(), Term::string("x#/&%s"));
    }

    #[test]
    fn invalid_constants() {
        assert!(parse_constant("X1").is_err());
        assert!(parse_constant("p(x)").is_err());
        assert!(parse_constant("p,q").is_err());
    }

    #[test]
    fn predicates() {
        let p = parse_predicate("p(X,a)").unwrap();
        assert_eq!(p.functor(), "p");
        assert_eq!(p.arity(), 2);
        assert_eq!(p.args()[0], Term::variable("X"));
        assert_eq!(p.args()[1], Term::atom("a"));

        let quoted = parse_predicate("'X1'(x1)").unwrap();
        assert_eq!(quoted.functor(), "X1");
        assert_eq!(quoted.arity(), 1);

        let spaced = parse_predicate("q  (   3   ,    \"x\"   )").unwrap();
        assert_eq!(spaced.functor(), "q");
        assert_float(&spaced.args()[0], 3.0);
        assert_eq!(spaced.args()[1], Term::string("x"));

        let nullary = parse_predicate("nullary").unwrap();
        assert_eq!(nullary.arity(), 0);
    }

    #[test]
    fn predicate_with_compound_argument() {
        let p = parse_predicate("p(X,'<'(a))").unwrap();
        assert_eq!(p.arity(), 2);
        let inner = p.args()[1].as_compound().expect("compound argument");
        assert_eq!(inner.functor(), "<");
        assert_eq!(inner.args(), &[Term::atom("a")]);

        let q = parse_predicate("p(X,[a,b])").unwrap();
        assert_eq!(q.args()[1], Term::list(vec![Term::atom("a"), Term::atom("b")]));
    }

    #[test]
    fn invalid_predicates() {
        assert!(parse_predicate("X1").is_err());
        assert!(parse_predicate("2").is_err());
        assert!(parse_predicate("p,q").is_err());
    }

    #[test]
    fn conjunctions() {
        let f = parse("p,q").unwrap();
        assert_eq!(connective(&f, ConnectiveKind::And).len(), 2);

        let f = parse("  p,   q  &  r  ").unwrap();
        assert_eq!(connective(&f, ConnectiveKind::And).len(), 3);

        let f = parse("p,(q;r)").unwrap();
        let ops = connective(&f, ConnectiveKind::And);
        assert!(matches!(ops[0], Formula::Predicate(_)));
        assert_eq!(connective(&ops[1], ConnectiveKind::Or).len(), 2);

        let f = parse("(p|q)&r").unwrap();
        let ops = connective(&f, ConnectiveKind::And);
        assert_eq!(connective(&ops[0], ConnectiveKind::Or).len(), 2);
        assert!(matches!(ops[1], Formula::Predicate(_)));
    }

    #[test]
    fn disjunctions() {
        let f = parse("p;q").unwrap();
        assert_eq!(connective(&f, ConnectiveKind::Or).len(), 2);

        let f = parse("  p;   q  |  r  ").unwrap();
        assert_eq!(connective(&f, ConnectiveKind::Or).len(), 3);

        let f = parse("(p,q);r").unwrap();
        let ops = connective(&f, ConnectiveKind::Or);
        assert_eq!(connective(&ops[0], ConnectiveKind::And).len(), 2);
    }

    #[test]
    fn implications() {
        let f = parse("p->q").unwrap();
        assert_eq!(connective(&f, ConnectiveKind::Impl).len(), 2);

        // right-associative
        let f = parse("  p->    q  ->  r  ").unwrap();
        let ops = connective(&f, ConnectiveKind::Impl);
        assert!(matches!(ops[0], Formula::Predicate(_)));
        assert_eq!(connective(&ops[1], ConnectiveKind::Impl).len(), 2);

        let f = parse("p->(q,r)").unwrap();
        let ops = connective(&f, ConnectiveKind::Impl);
        assert_eq!(connective(&ops[1], ConnectiveKind::And).len(), 2);

        let f = parse("(p,q)->r").unwrap();
        let ops = connective(&f, ConnectiveKind::Impl);
        assert_eq!(connective(&ops[0], ConnectiveKind::And).len(), 2);
    }

    #[test]
    fn modal_formulas() {
        assert!(matches!(modal(&parse("B p(x)").unwrap(), 'B'), Formula::Predicate(_)));
        assert!(matches!(modal(&parse("B p").unwrap(), 'B'), Formula::Predicate(_)));
        assert!(matches!(modal(&parse("Bp").unwrap(), 'B'), Formula::Predicate(_)));
        assert!(matches!(modal(&parse("B(p)").unwrap(), 'B'), Formula::Predicate(_)));
        assert!(matches!(modal(&parse("Kq(a)").unwrap(), 'K'), Formula::Predicate(_)));
        assert!(matches!(modal(&parse("BBq").unwrap(), 'B'), Formula::Modal { .. }));
        assert!(matches!(
            modal(&parse("B (b,q)").unwrap(), 'B'),
            Formula::Connective { .. }
        ));
    }

    #[test]
    fn modality_with_arguments() {
        // `self` is canonicalized away
        assert_eq!(modal_op(&parse("B[self] p(x)").unwrap()), &ModalOperator::b());
        assert_eq!(modal_op(&parse("B['self'] p(x)").unwrap()), &ModalOperator::b());

        let op = modal_op(&parse("B[fred,confidence=0.8] p(x)").unwrap()).clone();
        assert_eq!(op, ModalOperator::b_of_confident("fred", 0.8));

        assert_eq!(
            modal_op(&parse("B[fred,0.8] p(x)").unwrap()),
            &ModalOperator::b_of_confident("fred", 0.8)
        );
        assert_eq!(
            modal_op(&parse("B[0.8,fred] p(x)").unwrap()),
            &ModalOperator::b_of_confident("fred", 0.8)
        );
        assert_eq!(
            modal_op(&parse("B[0.8] p(x)").unwrap()),
            &ModalOperator::b_confident(0.8)
        );
        assert_eq!(
            modal_op(&parse("B[confidence=0.8] p(x)").unwrap()),
            &ModalOperator::b_confident(0.8)
        );

        assert_eq!(
            modal_op(&parse("P[begin=10,end=20] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::new(Some(10.0), Some(20.0)))
        );
        assert_eq!(
            modal_op(&parse("P[begin=10] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::since(10.0))
        );
        assert_eq!(
            modal_op(&parse("P[end=20] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::until(20.0))
        );
        assert_eq!(
            modal_op(&parse("P[until=20] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::until(20.0))
        );
        assert_eq!(
            modal_op(&parse("P[10.0,20.0] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::new(Some(10.0), Some(20.0)))
        );
        assert_eq!(
            modal_op(&parse("P[10.0] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::since(10.0))
        );
        assert_eq!(
            modal_op(&parse("P[10,20] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::new(Some(10.0), Some(20.0)))
        );
        assert_eq!(
            modal_op(&parse("H[10,20] p(x)").unwrap()),
            &ModalOperator::h_during(TimeInterval::new(Some(10.0), Some(20.0)))
        );
    }

    #[test]
    fn modality_with_wrong_arguments() {
        let err = parse("B[foo=fred] p(x)").unwrap_err();
        assert_eq!(
            err,
            QueryError::UnrecognizedOption("=(foo, fred)".to_string())
        );
        assert!(matches!(
            parse("B[0.8,0.8] p(x)").unwrap_err(),
            QueryError::UnrecognizedOption(_)
        ));
        assert!(matches!(
            parse("P[fred] p(x)").unwrap_err(),
            QueryError::UnrecognizedOption(_)
        ));
    }

    #[test]
    fn modality_with_empty_arguments() {
        assert_eq!(
            modal_op(&parse("P[,10.0] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::until(10.0))
        );
        assert_eq!(
            modal_op(&parse("P[10,] p(x)").unwrap()),
            &ModalOperator::p_during(TimeInterval::since(10.0))
        );
    }

    #[test]
    fn precedence() {
        let f = parse("p;q,r").unwrap();
        let ops = connective(&f, ConnectiveKind::Or);
        assert!(matches!(ops[0], Formula::Predicate(_)));
        assert_eq!(connective(&ops[1], ConnectiveKind::And).len(), 2);

        let f = parse("p,q;r").unwrap();
        let ops = connective(&f, ConnectiveKind::Or);
        assert_eq!(connective(&ops[0], ConnectiveKind::And).len(), 2);
        assert!(matches!(ops[1], Formula::Predicate(_)));

        let f = parse("Bp;r").unwrap();
        let ops = connective(&f, ConnectiveKind::Or);
        assert!(matches!(ops[0], Formula::Modal { .. }));

        let f = parse("p,q->r;p").unwrap();
        let ops = connective(&f, ConnectiveKind::Impl);
        assert_eq!(connective(&ops[0], ConnectiveKind::And).len(), 2);
        assert_eq!(connective(&ops[1], ConnectiveKind::Or).len(), 2);

        let f = parse("p,q->r->p").unwrap();
        let ops = connective(&f, ConnectiveKind::Impl);
        assert_eq!(connective(&ops[0], ConnectiveKind::And).len(), 2);
        assert_eq!(connective(&ops[1], ConnectiveKind::Impl).len(), 2);

        let f = parse("Bp->Kp").unwrap();
        let ops = connective(&f, ConnectiveKind::Impl);
        assert!(matches!(ops[0], Formula::Modal { .. }));
        assert!(matches!(ops[1], Formula::Modal { .. }));

        let f = parse("Bp->~p").unwrap();
        let ops = connective(&f, ConnectiveKind::Impl);
        assert!(matches!(ops[1], Formula::Negation(_)));
    }

    #[test]
    fn trailing_garbage_is_invalid() {
        let err = parse("p(x) garbage").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Query string (p(x) garbage) has invalid syntax."
        );
        assert!(parse("").is_err());
        assert!(parse("p,").is_err());
    }

    #[test]
    fn ground_formulas_round_trip_through_display() {
        for text in [
            "p(a, b)",
            "p, q; r",
            "p -> q -> r",
            "~(p, q)",
            "B['fred',0.8] p(x)",
            "K q(a)",
            "P[10,20] p(x)",
            "H[,20] p(x)",
            "p(X, 'Foo', \"bar\", [a,b])",
        ] {
            let parsed = parse(text).unwrap();
            let reparsed = parse(&parsed.to_string()).unwrap();
            assert_eq!(parsed, reparsed, "round trip failed for {}", text);
        }
    }

    #[test]
    fn custom_prefix_registry_is_honored() {
        let registry = Arc::new(PrefixRegistry::new());
        registry.register("ex", "http://example.org/ns");
        let parser = QueryParser::with_prefixes(registry);
        assert_eq!(parser.parse_raw_atom("ex:Foo").unwrap(), "http://example.org/ns#Foo");
        assert!(parser.parse_raw_atom("owl:Foo").is_err());
    }
}
