//! Logical term representations
//!
//! This module defines the core data types of the first-order language:
//! - Variables (unbound placeholders, ordered and hashed by name)
//! - Ground constants (atoms, strings, 32/64-bit integers, floats)
//! - Compound terms (a functor applied to an ordered argument list)
//! - Lists (ordered sequences terminated by the distinguished empty list)
//! - The `Top` and `Bottom` truth constants
//!
//! Terms are immutable after construction and cheap to clone: compound and
//! list payloads live behind `Arc`, so substitution application can share
//! ground subtrees freely. `Compound` precomputes its groundness in one pass
//! at construction; later `is_ground` calls are O(1).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

mod substitution;

pub use substitution::{Reversible, Substitution, Unifier};

/// A variable of the first-order language.
///
/// Equality, ordering and hashing are all by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    name: String,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A `(functor, arity)` pair identifying a callable name.
///
/// The total order is lexicographic on `(functor, arity)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PredicateIndicator {
    functor: String,
    arity: u32,
}

impl PredicateIndicator {
    pub fn new(functor: impl Into<String>, arity: u32) -> Self {
        PredicateIndicator { functor: functor.into(), arity }
    }

    pub fn functor(&self) -> &str {
        &self.functor
    }

    pub fn arity(&self) -> u32 {
        self.arity
    }
}

impl fmt::Display for PredicateIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.functor, self.arity)
    }
}

/// A first-order predicate application: a functor with an ordered argument
/// list. The `ground` flag is computed once at construction and is
/// consistent with the transitive argument walk.
#[derive(Debug, PartialEq)]
pub struct Compound {
    indicator: PredicateIndicator,
    args: Vec<Term>,
    ground: bool,
}

impl Compound {
    pub fn new(functor: impl Into<String>, args: Vec<Term>) -> Self {
        let ground = args.iter().all(Term::is_ground);
        let indicator = PredicateIndicator::new(functor, args.len() as u32);
        Compound { indicator, args, ground }
    }

    pub fn indicator(&self) -> &PredicateIndicator {
        &self.indicator
    }

    pub fn functor(&self) -> &str {
        self.indicator.functor()
    }

    pub fn arity(&self) -> u32 {
        self.indicator.arity()
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn is_ground(&self) -> bool {
        self.ground
    }
}

impl Eq for Compound {}

impl Hash for Compound {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.indicator.hash(state);
        self.args.hash(state);
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_atom_text(f, self.functor())?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// An ordered sequence of terms. The empty list is a process-wide singleton
/// obtained through [`ListTerm::nil`].
#[derive(Debug, PartialEq)]
pub struct ListTerm {
    items: Vec<Term>,
    ground: bool,
}

impl ListTerm {
    pub fn new(items: Vec<Term>) -> Self {
        let ground = items.iter().all(Term::is_ground);
        ListTerm { items, ground }
    }

    /// The distinguished empty list.
    pub fn nil() -> &'static Arc<ListTerm> {
        static NIL: OnceLock<Arc<ListTerm>> = OnceLock::new();
        NIL.get_or_init(|| Arc::new(ListTerm::new(Vec::new())))
    }

    pub fn items(&self) -> &[Term] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_ground(&self) -> bool {
        self.ground
    }
}

impl Eq for ListTerm {}

impl Hash for ListTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.hash(state);
    }
}

impl fmt::Display for ListTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "]")
    }
}

/// An element of the first-order language.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// An unbound placeholder.
    Variable(Variable),
    /// A symbolic constant (possibly an expanded IRI).
    Atom(Arc<str>),
    /// A string constant.
    Str(Arc<str>),
    /// A 32-bit integer constant.
    Int32(i32),
    /// A 64-bit integer constant.
    Int64(i64),
    /// A floating point constant.
    Float(f64),
    /// A first-order predicate application.
    Compound(Arc<Compound>),
    /// An ordered sequence of terms.
    List(Arc<ListTerm>),
    /// The truth constant.
    Top,
    /// The falsity constant.
    Bottom,
}

impl Term {
    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(Variable::new(name))
    }

    pub fn atom(text: impl Into<String>) -> Self {
        Term::Atom(Arc::from(text.into()))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Term::Str(Arc::from(text.into()))
    }

    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Compound(Arc::new(Compound::new(functor, args)))
    }

    pub fn list(items: Vec<Term>) -> Self {
        if items.is_empty() {
            Term::nil()
        } else {
            Term::List(Arc::new(ListTerm::new(items)))
        }
    }

    /// The distinguished empty list.
    pub fn nil() -> Self {
        Term::List(Arc::clone(ListTerm::nil()))
    }

    /// True iff no variable is reachable from this term.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Compound(c) => c.is_ground(),
            Term::List(l) => l.is_ground(),
            _ => true,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Term::Top)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Term::Bottom)
    }

    /// The textual value of an atom or string constant.
    pub fn text(&self) -> Option<&str> {
        match self {
            Term::Atom(s) | Term::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Arc<Compound>> {
        match self {
            Term::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Term::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Collect the variables reachable from this term into `out`.
    pub fn collect_variables(&self, out: &mut std::collections::BTreeSet<Variable>) {
        match self {
            Term::Variable(v) => {
                out.insert(v.clone());
            }
            Term::Compound(c) => {
                if !c.is_ground() {
                    for arg in c.args() {
                        arg.collect_variables(out);
                    }
                }
            }
            Term::List(l) => {
                if !l.is_ground() {
                    for item in l.items() {
                        item.collect_variables(out);
                    }
                }
            }
            _ => {}
        }
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Term::Variable(v) => v.hash(state),
            Term::Atom(s) | Term::Str(s) => s.hash(state),
            Term::Int32(v) => v.hash(state),
            Term::Int64(v) => v.hash(state),
            Term::Float(v) => float_bits(*v).hash(state),
            Term::Compound(c) => c.hash(state),
            Term::List(l) => l.hash(state),
            Term::Top | Term::Bottom => {}
        }
    }
}

// Normalize -0.0 so that hash is consistent with value equality.
fn float_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// Write an atom the way the query surface syntax spells it: bare when the
/// text is a lower-case identifier, single-quoted otherwise.
fn write_atom_text(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let mut chars = text.chars();
    let bare = match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if bare {
        write!(f, "{}", text)
    } else {
        write!(f, "'{}'", text)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{}", v),
            Term::Atom(s) => write_atom_text(f, s),
            Term::Str(s) => write!(f, "\"{}\"", s),
            Term::Int32(v) => write!(f, "{}", v),
            Term::Int64(v) => write!(f, "{}", v),
            Term::Float(v) => write!(f, "{}", v),
            Term::Compound(c) => write!(f, "{}", c),
            Term::List(l) => write!(f, "{}", l),
            Term::Top => write!(f, "\u{22A4}"),
            Term::Bottom => write!(f, "\u{22A5}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn ground_flags() {
        assert!(Term::atom("a").is_ground());
        assert!(Term::string("s").is_ground());
        assert!(Term::Float(1.5).is_ground());
        assert!(!Term::variable("X").is_ground());

        let ground = Term::compound("f", vec![Term::atom("a"), Term::Int32(1)]);
        assert!(ground.is_ground());

        let open = Term::compound("f", vec![Term::atom("a"), Term::variable("X")]);
        assert!(!open.is_ground());

        let nested = Term::compound("g", vec![open]);
        assert!(!nested.is_ground());
        assert!(Term::list(vec![Term::atom("a")]).is_ground());
        assert!(!Term::list(vec![Term::variable("X")]).is_ground());
    }

    #[test]
    fn nil_is_shared() {
        let a = Term::nil();
        let b = Term::list(vec![]);
        match (&a, &b) {
            (Term::List(l0), Term::List(l1)) => assert!(Arc::ptr_eq(l0, l1)),
            _ => panic!("expected lists"),
        }
        assert_eq!(a, b);
    }

    #[test]
    fn structural_equality() {
        let t0 = Term::compound("f", vec![Term::variable("X"), Term::atom("a")]);
        let t1 = Term::compound("f", vec![Term::variable("X"), Term::atom("a")]);
        assert_eq!(t0, t1);
        assert_eq!(hash_of(&t0), hash_of(&t1));

        // atoms and strings with the same text are distinct constants
        assert_ne!(Term::atom("a"), Term::string("a"));
    }

    #[test]
    fn float_equality_and_hash() {
        assert_eq!(Term::Float(0.0), Term::Float(-0.0));
        assert_eq!(hash_of(&Term::Float(0.0)), hash_of(&Term::Float(-0.0)));
        assert_ne!(Term::Float(1.0), Term::Float(2.0));
    }

    #[test]
    fn indicator_order_is_lexicographic() {
        let p1 = PredicateIndicator::new("p", 1);
        let p2 = PredicateIndicator::new("p", 2);
        let q0 = PredicateIndicator::new("q", 0);
        assert!(p1 < p2);
        assert!(p2 < q0);
        assert_eq!(p1.to_string(), "p/1");
    }

    #[test]
    fn display_round_trip_shapes() {
        assert_eq!(Term::atom("a").to_string(), "a");
        assert_eq!(Term::atom("Foo").to_string(), "'Foo'");
        assert_eq!(Term::atom("x#/&%s").to_string(), "'x#/&%s'");
        assert_eq!(Term::string("Foo").to_string(), "\"Foo\"");
        assert_eq!(Term::variable("X1").to_string(), "X1");
        assert_eq!(
            Term::compound("p", vec![Term::variable("X"), Term::atom("a")]).to_string(),
            "p(X, a)"
        );
        assert_eq!(
            Term::list(vec![Term::atom("a"), Term::atom("b")]).to_string(),
            "[a,b]"
        );
        assert_eq!(Term::Float(234.0).to_string(), "234");
    }

    #[test]
    fn collect_variables() {
        let t = Term::compound(
            "f",
            vec![
                Term::variable("X"),
                Term::compound("g", vec![Term::variable("Y"), Term::atom("a")]),
                Term::variable("X"),
            ],
        );
        let mut vars = std::collections::BTreeSet::new();
        t.collect_variables(&mut vars);
        let names: Vec<_> = vars.iter().map(|v| v.name().to_string()).collect();
        assert_eq!(names, vec!["X", "Y"]);
    }
}
