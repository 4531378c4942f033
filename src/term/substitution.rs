//! Substitutions, reversible merges and unification
//!
//! A [`Substitution`] maps variables to terms. Applying one to a term is a
//! pure recursive walk that shares ground subtrees instead of rebuilding
//! them. Two substitutions can be merged with [`Substitution::unify_with`],
//! which records one undo step per mutation in a [`Reversible`] journal so a
//! failed merge can be rolled back bit-for-bit.
//!
//! [`Unifier`] computes a most general unifier of two terms by recursive
//! descent, keeping its bindings in solved form: every binding is resolved
//! through the substitution built so far and eliminated from earlier
//! right-hand sides, so a single application pass suffices. An occurs check
//! rejects cyclic bindings before they are made.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use fnv::FnvHasher;

use super::{Compound, ListTerm, Term, Variable};

/// A finite mapping from variables to terms.
///
/// Keys are unique; iteration order is by variable name, which makes
/// `Display` and [`Substitution::hash_value`] deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    mapping: BTreeMap<Variable, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Substitution::default()
    }

    /// Bind `var` to `term`, replacing any previous binding.
    pub fn set(&mut self, var: Variable, term: Term) {
        self.mapping.insert(var, term);
    }

    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.mapping.get(var)
    }

    /// Look up a binding by variable name.
    pub fn get_by_name(&self, name: &str) -> Option<&Term> {
        self.mapping.get(&Variable::new(name))
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.mapping.contains_key(var)
    }

    pub fn erase(&mut self, var: &Variable) {
        self.mapping.remove(var);
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.mapping.iter()
    }

    /// A deterministic hash over the full mapping.
    pub fn hash_value(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Apply this substitution to a term.
    ///
    /// Ground subtrees are returned unchanged (shared), so repeated
    /// application over mostly-ground terms stays cheap.
    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Variable(v) => match self.mapping.get(v) {
                Some(t) => t.clone(),
                None => term.clone(),
            },
            Term::Compound(c) => {
                if c.is_ground() {
                    term.clone()
                } else {
                    let args = c.args().iter().map(|a| self.apply(a)).collect();
                    Term::Compound(Arc::new(Compound::new(c.functor(), args)))
                }
            }
            Term::List(l) => {
                if l.is_ground() {
                    term.clone()
                } else {
                    let items = l.items().iter().map(|i| self.apply(i)).collect();
                    Term::List(Arc::new(ListTerm::new(items)))
                }
            }
            _ => term.clone(),
        }
    }

    /// Merge `other` into this substitution.
    ///
    /// Fresh variables are inserted; variables bound on both sides are
    /// unified and rebound to the unified term. Each mutation pushes exactly
    /// one undo step onto `journal` when one is supplied. Returns `false` as
    /// soon as a binding pair has no unifier; the caller is then expected to
    /// roll back from the journal.
    pub fn unify_with(&mut self, other: &Substitution, mut journal: Option<&mut Reversible>) -> bool {
        for (var, t1) in other.iter() {
            match self.mapping.get(var).cloned() {
                None => {
                    self.mapping.insert(var.clone(), t1.clone());
                    if let Some(j) = journal.as_deref_mut() {
                        let v = var.clone();
                        j.push(move |sub| {
                            sub.mapping.remove(&v);
                        });
                    }
                }
                Some(t0) => {
                    let sigma = Unifier::new(&t0, t1);
                    if !sigma.exists() {
                        return false;
                    }
                    self.mapping.insert(var.clone(), sigma.apply());
                    if let Some(j) = journal.as_deref_mut() {
                        let v = var.clone();
                        j.push(move |sub| {
                            sub.mapping.insert(v, t0);
                        });
                    }
                }
            }
        }
        true
    }

    /// Run a journal against this substitution, undoing the recorded
    /// mutations in reverse order.
    pub fn rollback(&mut self, journal: &mut Reversible) {
        journal.rollback(self);
    }
}

impl Hash for Substitution {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (var, term) in &self.mapping {
            var.hash(state);
            term.hash(state);
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, term)) in self.mapping.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", var.name(), term)?;
        }
        write!(f, "}}")
    }
}

type UndoFn = Box<dyn FnOnce(&mut Substitution) + Send>;

/// A last-in-first-out journal of undo closures.
///
/// Each mutation performed by [`Substitution::unify_with`] pushes exactly
/// one closure; [`Reversible::rollback`] pops and runs them in reverse
/// order, restoring the substitution to its previous state.
#[derive(Default)]
pub struct Reversible {
    steps: Vec<UndoFn>,
}

impl Reversible {
    pub fn new() -> Self {
        Reversible::default()
    }

    pub fn push(&mut self, undo: impl FnOnce(&mut Substitution) + Send + 'static) {
        self.steps.push(Box::new(undo));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Replay the recorded undo steps in LIFO order.
    pub fn rollback(&mut self, sub: &mut Substitution) {
        while let Some(undo) = self.steps.pop() {
            undo(sub);
        }
    }
}

impl fmt::Debug for Reversible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reversible").field("steps", &self.steps.len()).finish()
    }
}

/// A most general unifier of two terms.
///
/// Construction runs the unification; `exists()` reports success and
/// `apply()` yields the canonical unified term, preferring whichever input
/// was already the more ground.
#[derive(Debug)]
pub struct Unifier {
    sub: Substitution,
    t0: Term,
    t1: Term,
    exists: bool,
}

impl Unifier {
    pub fn new(t0: &Term, t1: &Term) -> Self {
        let mut sub = Substitution::new();
        let exists = unify(&mut sub, t0, t1);
        Unifier { sub, t0: t0.clone(), t1: t1.clone(), exists }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn substitution(&self) -> &Substitution {
        &self.sub
    }

    pub fn into_substitution(self) -> Substitution {
        self.sub
    }

    /// The unified term, or `Bottom` when no unifier exists.
    pub fn apply(&self) -> Term {
        if !self.exists {
            Term::Bottom
        } else if self.sub.is_empty() || self.t0.is_ground() {
            self.t0.clone()
        } else if self.t0.is_variable() || self.t1.is_ground() {
            // the substitutions live in t0; t1 is already the more ground side
            self.t1.clone()
        } else if self.t1.is_variable() {
            // t1 was bound to t0, which stays unchanged
            self.t0.clone()
        } else {
            // both sides are open compounds; instantiate one of them
            self.sub.apply(&self.t0)
        }
    }
}

fn unify(sub: &mut Substitution, t0: &Term, t1: &Term) -> bool {
    if let Term::Variable(v1) = t1 {
        if !t0.is_variable() {
            return bind(sub, v1, t0);
        }
    }
    match t0 {
        Term::Variable(v0) => bind(sub, v0, t1),
        Term::Compound(p0) => match t1 {
            Term::Compound(p1) => {
                if p0.functor() != p1.functor() || p0.arity() != p1.arity() {
                    return false;
                }
                p0.args().iter().zip(p1.args()).all(|(a0, a1)| unify(sub, a0, a1))
            }
            _ => false,
        },
        Term::List(l0) => match t1 {
            Term::List(l1) => {
                l0.len() == l1.len()
                    && l0.items().iter().zip(l1.items()).all(|(a0, a1)| unify(sub, a0, a1))
            }
            _ => false,
        },
        Term::Atom(a0) => matches!(t1, Term::Atom(a1) if a0 == a1),
        Term::Str(s0) => matches!(t1, Term::Str(s1) if s0 == s1),
        Term::Int32(v0) => matches!(t1, Term::Int32(v1) if v0 == v1),
        Term::Int64(v0) => matches!(t1, Term::Int64(v1) if v0 == v1),
        Term::Float(v0) => matches!(t1, Term::Float(v1) if v0 == v1),
        Term::Top => t1.is_top(),
        Term::Bottom => t1.is_bottom(),
    }
}

/// Bind `var` to `term`, keeping the substitution in solved form: the term
/// is resolved through the current bindings, the occurs check rejects
/// cyclic bindings, and the new binding is eliminated from every earlier
/// right-hand side.
fn bind(sub: &mut Substitution, var: &Variable, term: &Term) -> bool {
    if let Some(existing) = sub.get(var).cloned() {
        return unify(sub, &existing, term);
    }
    let resolved = sub.apply(term);
    if let Term::Variable(u) = &resolved {
        if u == var {
            return true;
        }
    }
    if occurs(var, &resolved) {
        return false;
    }
    let mut eliminate = Substitution::new();
    eliminate.set(var.clone(), resolved.clone());
    for value in sub.mapping.values_mut() {
        let updated = eliminate.apply(value);
        *value = updated;
    }
    sub.mapping.insert(var.clone(), resolved);
    true
}

fn occurs(var: &Variable, term: &Term) -> bool {
    match term {
        Term::Variable(v) => v == var,
        Term::Compound(c) => !c.is_ground() && c.args().iter().any(|a| occurs(var, a)),
        Term::List(l) => !l.is_ground() && l.items().iter().any(|i| occurs(var, i)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Term {
        Term::variable(name)
    }

    fn atom(text: &str) -> Term {
        Term::atom(text)
    }

    #[test]
    fn apply_replaces_variables() {
        let mut sub = Substitution::new();
        sub.set(Variable::new("X"), atom("a"));

        assert_eq!(sub.apply(&var("X")), atom("a"));
        assert_eq!(sub.apply(&var("Y")), var("Y"));
        assert_eq!(
            sub.apply(&Term::compound("f", vec![var("X"), var("Y")])),
            Term::compound("f", vec![atom("a"), var("Y")])
        );
    }

    #[test]
    fn apply_shares_ground_subtrees() {
        let ground = Term::compound("g", vec![atom("a"), atom("b")]);
        let sub = {
            let mut s = Substitution::new();
            s.set(Variable::new("X"), atom("c"));
            s
        };
        let applied = sub.apply(&ground);
        match (&ground, &applied) {
            (Term::Compound(c0), Term::Compound(c1)) => assert!(Arc::ptr_eq(c0, c1)),
            _ => panic!("expected compounds"),
        }
    }

    #[test]
    fn unify_identical_constants() {
        assert!(Unifier::new(&atom("a"), &atom("a")).exists());
        assert!(!Unifier::new(&atom("a"), &atom("b")).exists());
        // kind mismatches never unify
        assert!(!Unifier::new(&atom("a"), &Term::string("a")).exists());
        assert!(!Unifier::new(&Term::Int32(1), &Term::Int64(1)).exists());
        assert!(Unifier::new(&Term::Top, &Term::Top).exists());
        assert!(!Unifier::new(&Term::Top, &Term::Bottom).exists());
    }

    #[test]
    fn unify_variable_with_constant() {
        let u = Unifier::new(&var("X"), &atom("a"));
        assert!(u.exists());
        assert_eq!(u.apply(), atom("a"));
        assert_eq!(u.substitution().get(&Variable::new("X")), Some(&atom("a")));
    }

    #[test]
    fn unify_compounds_pairwise() {
        // f(X, a) ~ f(b, Y) => {X: b, Y: a}, unified term f(b, a)
        let t0 = Term::compound("f", vec![var("X"), atom("a")]);
        let t1 = Term::compound("f", vec![atom("b"), var("Y")]);
        let u = Unifier::new(&t0, &t1);
        assert!(u.exists());
        assert_eq!(u.substitution().get(&Variable::new("X")), Some(&atom("b")));
        assert_eq!(u.substitution().get(&Variable::new("Y")), Some(&atom("a")));
        assert_eq!(u.apply(), Term::compound("f", vec![atom("b"), atom("a")]));
    }

    #[test]
    fn unify_functor_and_arity_must_match() {
        let t0 = Term::compound("f", vec![atom("a")]);
        assert!(!Unifier::new(&t0, &Term::compound("g", vec![atom("a")])).exists());
        assert!(!Unifier::new(&t0, &Term::compound("f", vec![atom("a"), atom("b")])).exists());
    }

    #[test]
    fn unify_repeated_variable() {
        // f(X, X) ~ f(a, b) must fail, f(X, X) ~ f(a, a) must succeed
        let fxx = Term::compound("f", vec![var("X"), var("X")]);
        assert!(!Unifier::new(&fxx, &Term::compound("f", vec![atom("a"), atom("b")])).exists());
        let u = Unifier::new(&fxx, &Term::compound("f", vec![atom("a"), atom("a")]));
        assert!(u.exists());
        assert_eq!(u.apply(), Term::compound("f", vec![atom("a"), atom("a")]));
    }

    #[test]
    fn unify_chained_variables_is_sound() {
        // g(X, Y) ~ g(Y, a): bindings must resolve transitively
        let t0 = Term::compound("g", vec![var("X"), var("Y")]);
        let t1 = Term::compound("g", vec![var("Y"), atom("a")]);
        let u = Unifier::new(&t0, &t1);
        assert!(u.exists());
        assert_eq!(u.substitution().apply(&t0), u.substitution().apply(&t1));
    }

    #[test]
    fn occurs_check_rejects_cyclic_binding() {
        let x = var("X");
        let fx = Term::compound("f", vec![var("X")]);
        assert!(!Unifier::new(&x, &fx).exists());
        assert!(!Unifier::new(&fx, &x).exists());
    }

    #[test]
    fn unify_lists() {
        let l0 = Term::list(vec![var("X"), atom("b")]);
        let l1 = Term::list(vec![atom("a"), var("Y")]);
        let u = Unifier::new(&l0, &l1);
        assert!(u.exists());
        assert_eq!(u.apply(), Term::list(vec![atom("a"), atom("b")]));
        assert!(!Unifier::new(&l0, &Term::list(vec![atom("a")])).exists());
    }

    #[test]
    fn failed_unifier_applies_to_bottom() {
        let u = Unifier::new(&atom("a"), &atom("b"));
        assert!(!u.exists());
        assert_eq!(u.apply(), Term::Bottom);
    }

    #[test]
    fn merge_inserts_fresh_bindings() {
        let mut sub = Substitution::new();
        sub.set(Variable::new("X"), atom("a"));

        let mut other = Substitution::new();
        other.set(Variable::new("Y"), atom("b"));

        assert!(sub.unify_with(&other, None));
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.get_by_name("Y"), Some(&atom("b")));
    }

    #[test]
    fn merge_unifies_conflicting_bindings() {
        let mut sub = Substitution::new();
        sub.set(Variable::new("X"), Term::compound("f", vec![var("Y")]));

        let mut other = Substitution::new();
        other.set(Variable::new("X"), Term::compound("f", vec![atom("a")]));

        assert!(sub.unify_with(&other, None));
        assert_eq!(
            sub.get_by_name("X"),
            Some(&Term::compound("f", vec![atom("a")]))
        );
    }

    #[test]
    fn merge_failure_reports_false() {
        let mut sub = Substitution::new();
        sub.set(Variable::new("X"), atom("a"));

        let mut other = Substitution::new();
        other.set(Variable::new("X"), atom("b"));

        assert!(!sub.unify_with(&other, None));
    }

    #[test]
    fn rollback_restores_mapping_and_hash() {
        let mut sub = Substitution::new();
        sub.set(Variable::new("X"), Term::compound("f", vec![var("Y")]));
        sub.set(Variable::new("Z"), atom("c"));
        let before = sub.clone();
        let hash_before = sub.hash_value();

        let mut other = Substitution::new();
        other.set(Variable::new("X"), Term::compound("f", vec![atom("a")]));
        other.set(Variable::new("W"), atom("w"));

        let mut journal = Reversible::new();
        assert!(sub.unify_with(&other, Some(&mut journal)));
        assert_eq!(journal.len(), 2);
        assert_ne!(sub, before);

        sub.rollback(&mut journal);
        assert_eq!(sub, before);
        assert_eq!(sub.hash_value(), hash_before);
        assert!(journal.is_empty());
    }

    #[test]
    fn rollback_after_failed_merge() {
        let mut sub = Substitution::new();
        sub.set(Variable::new("X"), atom("a"));
        let before = sub.clone();

        // first pair merges, second pair fails
        let mut other = Substitution::new();
        other.set(Variable::new("W"), atom("w"));
        other.set(Variable::new("X"), atom("b"));

        let mut journal = Reversible::new();
        assert!(!sub.unify_with(&other, Some(&mut journal)));
        sub.rollback(&mut journal);
        assert_eq!(sub, before);
    }

    #[test]
    fn substitution_display() {
        let mut sub = Substitution::new();
        sub.set(Variable::new("Y"), atom("b"));
        sub.set(Variable::new("X"), atom("a"));
        assert_eq!(sub.to_string(), "{X: a, Y: b}");
    }
}
