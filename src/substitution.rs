use std::fmt;
use std::sync::Arc;

use fxhash::FxHashMap;

use crate::error::{KernelError, Result};
use crate::term::{Term, TermRef};

/// A mapping from true free-variable indices to replacement terms.
/// The indices are relative to depth zero; `substitute` shifts the
/// replacements as it carries them under binders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    map: FxHashMap<usize, TermRef>,
}

impl Substitution {
    pub fn new() -> Substitution {
        Substitution {
            map: FxHashMap::default(),
        }
    }

    pub fn singleton(index: usize, term: TermRef) -> Substitution {
        let mut subst = Substitution::new();
        subst.insert(index, term);
        subst
    }

    pub fn insert(&mut self, index: usize, term: TermRef) {
        self.map.insert(index, term);
    }

    pub fn get(&self, index: usize) -> Option<&TermRef> {
        self.map.get(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.map.contains_key(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TermRef)> {
        self.map.iter().map(|(k, v)| (*k, v))
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut keys: Vec<usize> = self.map.keys().copied().collect();
        keys.sort_unstable();
        write!(f, "{{")?;
        for (i, k) in keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "x{} -> {}", k, self.map[k])?;
        }
        write!(f, "}}")
    }
}

/// Shifts every variable with index at or beyond `cutoff` by `amount`,
/// which may be negative. The cutoff rises by one under each binder, so
/// bound variables are untouched. An underflowing index is a caller error.
pub fn shift(term: &TermRef, amount: i64, cutoff: usize) -> Result<TermRef> {
    if amount == 0 {
        return Ok(term.clone());
    }

    match &**term {
        Term::Variable { index, typ } => {
            if *index < cutoff {
                return Ok(term.clone());
            }
            let new_index = *index as i64 + amount;
            if new_index < 0 {
                return Err(KernelError::NegativeShift {
                    index: *index,
                    amount,
                });
            }
            Ok(Arc::new(Term::Variable {
                index: new_index as usize,
                typ: typ.clone(),
            }))
        }
        Term::Constant { .. } => Ok(term.clone()),
        Term::Application { symbol, args, typ } => {
            let mut shifted_args = Vec::with_capacity(args.len());
            for arg in args {
                shifted_args.push(shift(arg, amount, cutoff)?);
            }
            Ok(Arc::new(Term::Application {
                symbol: symbol.clone(),
                args: shifted_args,
                typ: typ.clone(),
            }))
        }
        Term::Forall { hint, body } => {
            Ok(Term::forall(hint, shift(body, amount, cutoff + 1)?))
        }
        Term::Exists { hint, body } => {
            Ok(Term::exists(hint, shift(body, amount, cutoff + 1)?))
        }
        Term::And { left, right } => Ok(Term::and(
            shift(left, amount, cutoff)?,
            shift(right, amount, cutoff)?,
        )),
        Term::Or { left, right } => Ok(Term::or(
            shift(left, amount, cutoff)?,
            shift(right, amount, cutoff)?,
        )),
        Term::Not { body } => Ok(Term::not(shift(body, amount, cutoff)?)),
        Term::Implies {
            antecedent,
            consequent,
        } => Ok(Term::implies(
            shift(antecedent, amount, cutoff)?,
            shift(consequent, amount, cutoff)?,
        )),
    }
}

/// Shift by a non-negative amount. Indices only grow, so this cannot fail.
pub(crate) fn shift_up(term: &TermRef, amount: usize, cutoff: usize) -> TermRef {
    if amount == 0 {
        return term.clone();
    }

    match &**term {
        Term::Variable { index, typ } => {
            if *index < cutoff {
                term.clone()
            } else {
                Arc::new(Term::Variable {
                    index: index + amount,
                    typ: typ.clone(),
                })
            }
        }
        Term::Constant { .. } => term.clone(),
        Term::Application { symbol, args, typ } => Arc::new(Term::Application {
            symbol: symbol.clone(),
            args: args.iter().map(|arg| shift_up(arg, amount, cutoff)).collect(),
            typ: typ.clone(),
        }),
        Term::Forall { hint, body } => Term::forall(hint, shift_up(body, amount, cutoff + 1)),
        Term::Exists { hint, body } => Term::exists(hint, shift_up(body, amount, cutoff + 1)),
        Term::And { left, right } => Term::and(
            shift_up(left, amount, cutoff),
            shift_up(right, amount, cutoff),
        ),
        Term::Or { left, right } => Term::or(
            shift_up(left, amount, cutoff),
            shift_up(right, amount, cutoff),
        ),
        Term::Not { body } => Term::not(shift_up(body, amount, cutoff)),
        Term::Implies {
            antecedent,
            consequent,
        } => Term::implies(
            shift_up(antecedent, amount, cutoff),
            shift_up(consequent, amount, cutoff),
        ),
    }
}

/// Applies a substitution to a term. Variables below `depth` are bound and
/// never substituted; a free variable's true index `i - depth` is looked up
/// in the map, and any replacement is shifted by `depth` on the way in so
/// that none of its free variables get captured. Unchanged subtrees are
/// returned as-is rather than rebuilt.
pub fn substitute(term: &TermRef, subst: &Substitution, depth: usize) -> TermRef {
    if subst.is_empty() {
        return term.clone();
    }

    match &**term {
        Term::Variable { index, .. } => {
            if *index < depth {
                return term.clone();
            }
            match subst.get(index - depth) {
                Some(replacement) => shift_up(replacement, depth, 0),
                None => term.clone(),
            }
        }
        Term::Constant { .. } => term.clone(),
        Term::Application { symbol, args, typ } => {
            let mut new_args = Vec::with_capacity(args.len());
            let mut changed = false;
            for arg in args {
                let new_arg = substitute(arg, subst, depth);
                changed = changed || !Arc::ptr_eq(&new_arg, arg);
                new_args.push(new_arg);
            }
            if !changed {
                return term.clone();
            }
            Arc::new(Term::Application {
                symbol: symbol.clone(),
                args: new_args,
                typ: typ.clone(),
            })
        }
        Term::Forall { hint, body } => {
            let new_body = substitute(body, subst, depth + 1);
            if Arc::ptr_eq(&new_body, body) {
                term.clone()
            } else {
                Term::forall(hint, new_body)
            }
        }
        Term::Exists { hint, body } => {
            let new_body = substitute(body, subst, depth + 1);
            if Arc::ptr_eq(&new_body, body) {
                term.clone()
            } else {
                Term::exists(hint, new_body)
            }
        }
        Term::And { left, right } => {
            let new_left = substitute(left, subst, depth);
            let new_right = substitute(right, subst, depth);
            if Arc::ptr_eq(&new_left, left) && Arc::ptr_eq(&new_right, right) {
                term.clone()
            } else {
                Term::and(new_left, new_right)
            }
        }
        Term::Or { left, right } => {
            let new_left = substitute(left, subst, depth);
            let new_right = substitute(right, subst, depth);
            if Arc::ptr_eq(&new_left, left) && Arc::ptr_eq(&new_right, right) {
                term.clone()
            } else {
                Term::or(new_left, new_right)
            }
        }
        Term::Not { body } => {
            let new_body = substitute(body, subst, depth);
            if Arc::ptr_eq(&new_body, body) {
                term.clone()
            } else {
                Term::not(new_body)
            }
        }
        Term::Implies {
            antecedent,
            consequent,
        } => {
            let new_antecedent = substitute(antecedent, subst, depth);
            let new_consequent = substitute(consequent, subst, depth);
            if Arc::ptr_eq(&new_antecedent, antecedent) && Arc::ptr_eq(&new_consequent, consequent)
            {
                term.clone()
            } else {
                Term::implies(new_antecedent, new_consequent)
            }
        }
    }
}
