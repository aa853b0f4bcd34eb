use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::substitution::{substitute, Substitution};
use crate::term::{Term, TermRef};
use crate::unification::{unifiable, unify};

/// An atom with a polarity. Two literals are complementary when their atoms
/// are equal and their polarities differ.
#[derive(Debug, Clone)]
pub struct Literal {
    pub atom: TermRef,
    pub positive: bool,
}

impl Literal {
    pub fn new(atom: TermRef, positive: bool) -> Literal {
        Literal { atom, positive }
    }

    pub fn positive(atom: TermRef) -> Literal {
        Literal::new(atom, true)
    }

    pub fn negative(atom: TermRef) -> Literal {
        Literal::new(atom, false)
    }

    pub fn negate(&self) -> Literal {
        Literal {
            atom: self.atom.clone(),
            positive: !self.positive,
        }
    }

    pub fn is_complementary(&self, other: &Literal) -> bool {
        self.positive != other.positive && self.atom == other.atom
    }

    /// Applies a substitution to the atom, keeping the polarity.
    pub fn substitute(&self, subst: &Substitution) -> Literal {
        Literal {
            atom: substitute(&self.atom, subst, 0),
            positive: self.positive,
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Literal) -> bool {
        self.positive == other.positive && self.atom == other.atom
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.atom.hash(state);
        self.positive.hash(state);
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.positive {
            write!(f, "!")?;
        }
        write!(f, "{}", self.atom)
    }
}

/// A multiset of literals, read as their disjunction. The empty clause is
/// the refutation witness. The hash is computed on demand, cached, and
/// combined commutatively so that it agrees with the order-independent
/// equality.
#[derive(Debug)]
pub struct Clause {
    literals: Vec<Literal>,
    hash: OnceLock<u64>,
}

impl Clause {
    pub fn new(literals: Vec<Literal>) -> Clause {
        Clause {
            literals,
            hash: OnceLock::new(),
        }
    }

    /// The empty clause.
    pub fn empty() -> Clause {
        Clause::new(vec![])
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Whether some pair of literals is complementary.
    pub fn is_tautology(&self) -> bool {
        for i in 0..self.literals.len() {
            for j in (i + 1)..self.literals.len() {
                if self.literals[i].is_complementary(&self.literals[j]) {
                    return true;
                }
            }
        }
        false
    }

    /// Collapses a tautology to the empty clause and removes duplicate
    /// literals otherwise.
    pub fn simplify(&self) -> Clause {
        if self.is_tautology() {
            return Clause::empty();
        }
        let mut unique: Vec<Literal> = vec![];
        for literal in &self.literals {
            if !unique.iter().any(|kept| kept == literal) {
                unique.push(literal.clone());
            }
        }
        Clause::new(unique)
    }

    /// Applies a substitution to every literal.
    pub fn substitute(&self, subst: &Substitution) -> Clause {
        Clause::new(
            self.literals
                .iter()
                .map(|literal| literal.substitute(subst))
                .collect(),
        )
    }

    /// Shifts every free variable in the clause up by the offset. Used
    /// before resolution so the parents cannot share variables by accident.
    pub fn rename_variables(&self, offset: usize) -> Clause {
        let mut renaming = Substitution::new();
        for literal in &self.literals {
            for index in literal.atom.free_variables(0) {
                if !renaming.contains(index) {
                    renaming.insert(index, Term::variable(index + offset));
                }
            }
        }
        self.substitute(&renaming)
    }

    /// The largest free variable index appearing in any literal, or 0 for
    /// a ground clause.
    pub fn max_variable_index(&self) -> usize {
        self.literals
            .iter()
            .map(|literal| literal.atom.max_variable_index(0))
            .max()
            .unwrap_or(0)
    }

    pub fn clause_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            self.literals
                .iter()
                .fold(0u64, |acc, literal| acc.wrapping_add(fxhash::hash64(literal)))
        })
    }

    /// Whether this clause subsumes the other: some injective mapping pairs
    /// each literal here with a same-polarity literal there, such that all
    /// the pairwise unifiers agree on every variable.
    pub fn subsumes(&self, other: &Clause) -> bool {
        if self.len() > other.len() {
            return false;
        }
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        let mut mapping = vec![0usize; self.len()];
        let mut used = vec![false; other.len()];
        self.find_consistent_mapping(other, 0, &mut mapping, &mut used)
    }

    fn find_consistent_mapping(
        &self,
        other: &Clause,
        index: usize,
        mapping: &mut Vec<usize>,
        used: &mut Vec<bool>,
    ) -> bool {
        if index == self.len() {
            return self.mapping_is_consistent(other, mapping);
        }
        let literal = &self.literals[index];
        for candidate in 0..other.len() {
            if used[candidate] {
                continue;
            }
            let target = &other.literals[candidate];
            if literal.positive != target.positive {
                continue;
            }
            if !unifiable(&literal.atom, &target.atom, 0) {
                continue;
            }
            mapping[index] = candidate;
            used[candidate] = true;
            if self.find_consistent_mapping(other, index + 1, mapping, used) {
                return true;
            }
            used[candidate] = false;
        }
        false
    }

    fn mapping_is_consistent(&self, other: &Clause, mapping: &[usize]) -> bool {
        let mut global = Substitution::new();
        for (index, &candidate) in mapping.iter().enumerate() {
            let result = unify(
                &self.literals[index].atom,
                &other.literals[candidate].atom,
                0,
            );
            if !result.success {
                return false;
            }
            for (variable, term) in result.substitution.iter() {
                match global.get(variable) {
                    Some(existing) => {
                        if existing != term {
                            return false;
                        }
                    }
                    None => global.insert(variable, term.clone()),
                }
            }
        }
        true
    }
}

impl Clone for Clause {
    fn clone(&self) -> Clause {
        let hash = OnceLock::new();
        if let Some(value) = self.hash.get() {
            let _ = hash.set(*value);
        }
        Clause {
            literals: self.literals.clone(),
            hash,
        }
    }
}

impl PartialEq for Clause {
    fn eq(&self, other: &Clause) -> bool {
        if self.literals.len() != other.literals.len() {
            return false;
        }
        let mut matched = vec![false; other.literals.len()];
        for literal in &self.literals {
            let mut found = false;
            for (i, candidate) in other.literals.iter().enumerate() {
                if !matched[i] && literal == candidate {
                    matched[i] = true;
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
        }
        true
    }
}

impl Eq for Clause {}

impl Hash for Clause {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.clause_hash().hash(state);
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.literals.is_empty() {
            return write!(f, "<empty>");
        }
        for (i, literal) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", literal)?;
        }
        Ok(())
    }
}
