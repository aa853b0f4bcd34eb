use tracing::debug;

use crate::clause::{Clause, Literal};
use crate::rewriting::{replace_at, subterm_at, Position};
use crate::substitution::substitute;
use crate::term::{Term, TermRef};
use crate::unification::unify;

/// The outcome of a resolution or paramodulation attempt. "No resolvable
/// pair" and similar dead ends are ordinary results, not errors.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    pub success: bool,
    pub resolvent: Option<Clause>,
    pub error: Option<String>,
}

impl ResolutionResult {
    fn succeeded(resolvent: Clause) -> ResolutionResult {
        ResolutionResult {
            success: true,
            resolvent: Some(resolvent),
            error: None,
        }
    }

    fn failed(message: &str) -> ResolutionResult {
        ResolutionResult {
            success: false,
            resolvent: None,
            error: Some(message.to_string()),
        }
    }
}

/// Binary resolution and factoring.
pub struct ResolutionInference;

impl ResolutionInference {
    /// Tries every pair of literal indices in ascending order and returns
    /// the first resolvent found.
    pub fn resolve(clause1: &Clause, clause2: &Clause) -> ResolutionResult {
        for i in 0..clause1.len() {
            for j in 0..clause2.len() {
                let result = Self::resolve_on_literals(clause1, clause2, i, j);
                if result.success {
                    return result;
                }
            }
        }
        ResolutionResult::failed("no resolvable literal pairs found")
    }

    /// Resolves on one specific pair of literals: they must have opposite
    /// polarity and unifiable atoms. The resolvent is both clauses minus
    /// the resolved pair, under the unifier, simplified.
    pub fn resolve_on_literals(
        clause1: &Clause,
        clause2: &Clause,
        index1: usize,
        index2: usize,
    ) -> ResolutionResult {
        if index1 >= clause1.len() || index2 >= clause2.len() {
            return ResolutionResult::failed("literal index out of range");
        }
        let literal1 = &clause1.literals()[index1];
        let literal2 = &clause2.literals()[index2];

        if literal1.positive == literal2.positive {
            return ResolutionResult::failed("literals have the same polarity");
        }

        let unified = unify(&literal1.atom, &literal2.atom, 0);
        if !unified.success {
            return ResolutionResult::failed("atoms do not unify");
        }

        let mut literals = vec![];
        for (k, literal) in clause1.literals().iter().enumerate() {
            if k != index1 {
                literals.push(literal.substitute(&unified.substitution));
            }
        }
        for (k, literal) in clause2.literals().iter().enumerate() {
            if k != index2 {
                literals.push(literal.substitute(&unified.substitution));
            }
        }

        let resolvent = Clause::new(literals).simplify();
        debug!(resolvent = %resolvent, "resolved");
        ResolutionResult::succeeded(resolvent)
    }

    /// Collapses unifiable same-polarity literals in a single left-to-right
    /// pass: each literal either merges into an earlier kept literal or is
    /// kept itself.
    pub fn factor(clause: &Clause) -> Clause {
        let mut kept: Vec<Literal> = vec![];
        for literal in clause.literals() {
            let mut collapsed = false;
            for existing in kept.iter_mut() {
                if literal.positive != existing.positive {
                    continue;
                }
                let unified = unify(&literal.atom, &existing.atom, 0);
                if unified.success {
                    *existing = Literal::new(
                        substitute(&literal.atom, &unified.substitution, 0),
                        literal.positive,
                    );
                    collapsed = true;
                    break;
                }
            }
            if !collapsed {
                kept.push(literal.clone());
            }
        }
        Clause::new(kept)
    }

    /// The largest free variable index across both clauses. Callers rename
    /// one side past this before resolving, so the parents cannot clash.
    pub fn max_variable_index(clause1: &Clause, clause2: &Clause) -> usize {
        clause1.max_variable_index().max(clause2.max_variable_index())
    }
}

/// Paramodulation: using an equality literal to rewrite a subterm of
/// another clause.
pub struct ParamodulationInference;

impl ParamodulationInference {
    /// Rewrites the subterm of `target_clause[target_index]` at `position`
    /// using the equality `equality_clause[eq_index]`. The left side is
    /// tried first; if only the right side unifies, the equality is used
    /// right-to-left. Every literal of the paramodulant is taken under the
    /// unifier, and a positive equality literal is consumed.
    pub fn paramodulate(
        equality_clause: &Clause,
        target_clause: &Clause,
        eq_index: usize,
        target_index: usize,
        position: &Position,
    ) -> ResolutionResult {
        if eq_index >= equality_clause.len() {
            return ResolutionResult::failed("invalid equality literal index");
        }
        let eq_literal = &equality_clause.literals()[eq_index];
        let (mut left, mut right) = match eq_literal.atom.equality_sides() {
            Ok(sides) => sides,
            Err(_) => return ResolutionResult::failed("literal is not an equality"),
        };

        if target_index >= target_clause.len() {
            return ResolutionResult::failed("invalid target literal index");
        }
        let target_literal = &target_clause.literals()[target_index];

        let subterm = match subterm_at(&target_literal.atom, position) {
            Some(subterm) => subterm,
            None => return ResolutionResult::failed("position does not address a subterm"),
        };

        let mut unified = unify(&left, &subterm, 0);
        if !unified.success {
            unified = unify(&right, &subterm, 0);
            if !unified.success {
                return ResolutionResult::failed("equality does not unify with the subterm");
            }
            std::mem::swap(&mut left, &mut right);
        }

        let replacement = substitute(&right, &unified.substitution, 0);
        let new_atom = match replace_at(&target_literal.atom, position, &replacement) {
            Some(atom) => atom,
            None => return ResolutionResult::failed("failed to replace the subterm"),
        };

        let mut literals = vec![];
        // A positive equality is consumed by the inference; a negative one
        // stays in the paramodulant.
        for (k, literal) in equality_clause.literals().iter().enumerate() {
            if k != eq_index || !eq_literal.positive {
                literals.push(literal.substitute(&unified.substitution));
            }
        }
        for (k, literal) in target_clause.literals().iter().enumerate() {
            if k != target_index {
                literals.push(literal.substitute(&unified.substitution));
            }
        }
        literals.push(Literal::new(
            substitute(&new_atom, &unified.substitution, 0),
            target_literal.positive,
        ));

        let paramodulant = Clause::new(literals).simplify();
        debug!(paramodulant = %paramodulant, "paramodulated");
        ResolutionResult::succeeded(paramodulant)
    }

    /// Enumerates every (literal index, position, subterm) in the clause,
    /// the root of each atom included, descending through application
    /// arguments.
    pub fn find_paramod_positions(clause: &Clause) -> Vec<(usize, Position, TermRef)> {
        let mut positions = vec![];
        for (index, literal) in clause.literals().iter().enumerate() {
            Self::collect_positions(index, &literal.atom, &Position::root(), &mut positions);
        }
        positions
    }

    fn collect_positions(
        literal_index: usize,
        term: &TermRef,
        position: &Position,
        out: &mut Vec<(usize, Position, TermRef)>,
    ) {
        out.push((literal_index, position.clone(), term.clone()));
        if let Term::Application { args, .. } = &**term {
            for (i, arg) in args.iter().enumerate() {
                Self::collect_positions(literal_index, arg, &position.descend(i), out);
            }
        }
    }
}

/// The combined driver: standard resolution plus paramodulation in both
/// directions when positive equalities are present. Returns every outcome;
/// selection among them is the caller's business.
pub struct ResolutionWithParamodulation;

impl ResolutionWithParamodulation {
    pub fn resolve_with_paramodulation(clause1: &Clause, clause2: &Clause) -> Vec<Clause> {
        let mut results = vec![];

        let resolved = ResolutionInference::resolve(clause1, clause2);
        if resolved.success {
            if let Some(resolvent) = resolved.resolvent {
                results.push(resolvent);
            }
        }

        if Self::has_equality_literals(clause1) {
            Self::collect_paramodulants(clause1, clause2, &mut results);
        }
        if Self::has_equality_literals(clause2) {
            Self::collect_paramodulants(clause2, clause1, &mut results);
        }

        results
    }

    pub fn has_equality_literals(clause: &Clause) -> bool {
        clause
            .literals()
            .iter()
            .any(|literal| literal.atom.is_equality())
    }

    pub fn equality_literal_indices(clause: &Clause) -> Vec<usize> {
        clause
            .literals()
            .iter()
            .enumerate()
            .filter(|(_, literal)| literal.atom.is_equality())
            .map(|(i, _)| i)
            .collect()
    }

    fn collect_paramodulants(
        equality_clause: &Clause,
        target_clause: &Clause,
        out: &mut Vec<Clause>,
    ) {
        let targets = ParamodulationInference::find_paramod_positions(target_clause);
        for eq_index in Self::equality_literal_indices(equality_clause) {
            // Only positive equalities justify rewriting.
            if !equality_clause.literals()[eq_index].positive {
                continue;
            }
            for (target_index, position, _) in &targets {
                let result = ParamodulationInference::paramodulate(
                    equality_clause,
                    target_clause,
                    eq_index,
                    *target_index,
                    position,
                );
                if result.success {
                    if let Some(paramodulant) = result.resolvent {
                        out.push(paramodulant);
                    }
                }
            }
        }
    }
}
