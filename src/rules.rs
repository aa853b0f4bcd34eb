use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::gensym::gensym;
use crate::proof_state::{CertificationStatus, Hypothesis, ProofContext, StateId};
use crate::substitution::{shift_up, substitute, Substitution};
use crate::term::{Term, TermKind, TermRef};
use crate::types::Type;
use crate::unification::unify;

/// Why a rule refused to apply. These are precondition failures, not
/// soundness violations; the state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    InvalidHypothesis,
    RulePatternMismatch,
    InvalidRuleApplication,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            ViolationKind::InvalidHypothesis => "invalid hypothesis",
            ViolationKind::RulePatternMismatch => "rule pattern mismatch",
            ViolationKind::InvalidRuleApplication => "invalid rule application",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ConstraintViolation {
    pub kind: ViolationKind,
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(kind: ViolationKind, message: &str) -> ConstraintViolation {
        ConstraintViolation {
            kind,
            message: message.to_string(),
        }
    }
}

fn missing_hypothesis(name: &str) -> ConstraintViolation {
    ConstraintViolation::new(
        ViolationKind::InvalidHypothesis,
        &format!("hypothesis not found: {}", name),
    )
}

fn pattern_mismatch(message: &str) -> ConstraintViolation {
    ConstraintViolation::new(ViolationKind::RulePatternMismatch, message)
}

fn invalid_application(message: &str) -> ConstraintViolation {
    ConstraintViolation::new(ViolationKind::InvalidRuleApplication, message)
}

/// Optional inputs a caller can pass at application time, overriding the
/// values a rule was constructed with.
#[derive(Debug, Clone, Default)]
pub struct RuleApplicationContext {
    pub additional_term: Option<TermRef>,
    pub substitution_term: Option<TermRef>,
    pub variable_name: Option<String>,
    pub hypothesis_name: Option<String>,
    pub left_to_right: Option<bool>,
}

pub type RuleResult = std::result::Result<Vec<StateId>, ConstraintViolation>;

/// A natural-deduction inference rule. `apply` goes through
/// `ProofContext::apply_rule`, so every new state lands in the DAG; the
/// error branch carries the precondition that failed.
pub trait ProofRule {
    fn name(&self) -> String;

    fn description(&self) -> String;

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        app_context: Option<&RuleApplicationContext>,
    ) -> bool;

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult;
}

/// From P and P -> Q, conclude Q.
pub struct ModusPonensRule {
    antecedent_hyp: String,
    implication_hyp: String,
}

impl ModusPonensRule {
    pub fn new(antecedent_hyp: &str, implication_hyp: &str) -> ModusPonensRule {
        ModusPonensRule {
            antecedent_hyp: antecedent_hyp.to_string(),
            implication_hyp: implication_hyp.to_string(),
        }
    }

    fn matches(antecedent: &TermRef, implication: &TermRef) -> bool {
        match &**implication {
            Term::Implies {
                antecedent: expected,
                ..
            } => antecedent == expected,
            _ => false,
        }
    }
}

impl ProofRule for ModusPonensRule {
    fn name(&self) -> String {
        "Modus Ponens".to_string()
    }

    fn description(&self) -> String {
        "From P and P -> Q, derive Q".to_string()
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        let state = context.state(state);
        match (
            state.find_hypothesis(&self.antecedent_hyp),
            state.find_hypothesis(&self.implication_hyp),
        ) {
            (Some(antecedent), Some(implication)) => {
                Self::matches(antecedent.formula(), implication.formula())
            }
            _ => false,
        }
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let antecedent = current
            .find_hypothesis(&self.antecedent_hyp)
            .ok_or_else(|| missing_hypothesis(&self.antecedent_hyp))?;
        let implication = current
            .find_hypothesis(&self.implication_hyp)
            .ok_or_else(|| missing_hypothesis(&self.implication_hyp))?;

        let consequent = match &**implication.formula() {
            Term::Implies {
                antecedent: expected,
                consequent,
            } if antecedent.formula() == expected => consequent.clone(),
            _ => {
                return Err(pattern_mismatch(
                    "the hypotheses do not match the modus ponens pattern",
                ))
            }
        };

        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            "modus_ponens",
            vec![self.antecedent_hyp.clone(), self.implication_hyp.clone()],
            vec![Hypothesis::new(&gensym("mp_result"), consequent)],
            goal,
        );
        Ok(vec![new_state])
    }
}

/// From P and Q, conclude P & Q.
pub struct AndIntroRule {
    left_hyp: String,
    right_hyp: String,
}

impl AndIntroRule {
    pub fn new(left_hyp: &str, right_hyp: &str) -> AndIntroRule {
        AndIntroRule {
            left_hyp: left_hyp.to_string(),
            right_hyp: right_hyp.to_string(),
        }
    }
}

impl ProofRule for AndIntroRule {
    fn name(&self) -> String {
        "And Introduction".to_string()
    }

    fn description(&self) -> String {
        "From P and Q, derive P & Q".to_string()
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        let state = context.state(state);
        state.find_hypothesis(&self.left_hyp).is_some()
            && state.find_hypothesis(&self.right_hyp).is_some()
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let left = current
            .find_hypothesis(&self.left_hyp)
            .ok_or_else(|| missing_hypothesis(&self.left_hyp))?;
        let right = current
            .find_hypothesis(&self.right_hyp)
            .ok_or_else(|| missing_hypothesis(&self.right_hyp))?;

        let conjunction = Term::and(left.formula().clone(), right.formula().clone());
        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            "and_intro",
            vec![self.left_hyp.clone(), self.right_hyp.clone()],
            vec![Hypothesis::new(&gensym("and_intro_result"), conjunction)],
            goal,
        );
        Ok(vec![new_state])
    }
}

/// From P & Q, conclude P (or Q).
pub struct AndElimRule {
    conjunction_hyp: String,
    extract_left: bool,
}

impl AndElimRule {
    pub fn new(conjunction_hyp: &str, extract_left: bool) -> AndElimRule {
        AndElimRule {
            conjunction_hyp: conjunction_hyp.to_string(),
            extract_left,
        }
    }
}

impl ProofRule for AndElimRule {
    fn name(&self) -> String {
        if self.extract_left {
            "And Elimination (Left)".to_string()
        } else {
            "And Elimination (Right)".to_string()
        }
    }

    fn description(&self) -> String {
        if self.extract_left {
            "From P & Q, derive P".to_string()
        } else {
            "From P & Q, derive Q".to_string()
        }
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        match context.state(state).find_hypothesis(&self.conjunction_hyp) {
            Some(hypothesis) => hypothesis.formula().kind() == TermKind::And,
            None => false,
        }
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let hypothesis = current
            .find_hypothesis(&self.conjunction_hyp)
            .ok_or_else(|| missing_hypothesis(&self.conjunction_hyp))?;

        let conjunct = match &**hypothesis.formula() {
            Term::And { left, right } => {
                if self.extract_left {
                    left.clone()
                } else {
                    right.clone()
                }
            }
            _ => {
                return Err(pattern_mismatch(&format!(
                    "hypothesis is not a conjunction: {}",
                    self.conjunction_hyp
                )))
            }
        };

        let (rule_name, hyp_prefix) = if self.extract_left {
            ("and_elim_left", "and_elim_left")
        } else {
            ("and_elim_right", "and_elim_right")
        };
        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            rule_name,
            vec![self.conjunction_hyp.clone()],
            vec![Hypothesis::new(&gensym(hyp_prefix), conjunct)],
            goal,
        );
        Ok(vec![new_state])
    }
}

/// From P, conclude P | Q (or Q | P) for a supplied Q.
pub struct OrIntroRule {
    premise_hyp: String,
    additional_term: Option<TermRef>,
    premise_on_left: bool,
}

impl OrIntroRule {
    pub fn new(
        premise_hyp: &str,
        additional_term: Option<TermRef>,
        premise_on_left: bool,
    ) -> OrIntroRule {
        OrIntroRule {
            premise_hyp: premise_hyp.to_string(),
            additional_term,
            premise_on_left,
        }
    }
}

impl ProofRule for OrIntroRule {
    fn name(&self) -> String {
        if self.premise_on_left {
            "Or Introduction (Left)".to_string()
        } else {
            "Or Introduction (Right)".to_string()
        }
    }

    fn description(&self) -> String {
        if self.premise_on_left {
            "From P, introduce P | Q for any Q".to_string()
        } else {
            "From Q, introduce P | Q for any P".to_string()
        }
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        context
            .state(state)
            .find_hypothesis(&self.premise_hyp)
            .is_some()
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let premise = current
            .find_hypothesis(&self.premise_hyp)
            .ok_or_else(|| missing_hypothesis(&self.premise_hyp))?;

        let extra = app_context
            .and_then(|app| app.additional_term.clone())
            .or_else(|| self.additional_term.clone())
            .ok_or_else(|| invalid_application("or introduction requires an additional term"))?;

        let disjunction = if self.premise_on_left {
            Term::or(premise.formula().clone(), extra)
        } else {
            Term::or(extra, premise.formula().clone())
        };

        let rule_name = if self.premise_on_left {
            "or_intro_left"
        } else {
            "or_intro_right"
        };
        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            rule_name,
            vec![self.premise_hyp.clone()],
            vec![Hypothesis::new(&gensym("or_intro_result"), disjunction)],
            goal,
        );
        Ok(vec![new_state])
    }
}

/// To prove P -> Q, assume P and prove Q.
pub struct ImpliesIntroRule;

impl ImpliesIntroRule {
    pub fn new() -> ImpliesIntroRule {
        ImpliesIntroRule
    }
}

impl ProofRule for ImpliesIntroRule {
    fn name(&self) -> String {
        "Implication Introduction".to_string()
    }

    fn description(&self) -> String {
        "To prove P -> Q, assume P and prove Q".to_string()
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        context.state(state).goal().kind() == TermKind::Implies
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let (antecedent, consequent) = match &**current.goal() {
            Term::Implies {
                antecedent,
                consequent,
            } => (antecedent.clone(), consequent.clone()),
            _ => return Err(pattern_mismatch("goal is not an implication")),
        };

        let new_state = context.apply_rule(
            state,
            "implies_intro",
            vec![],
            vec![Hypothesis::new(
                &gensym("implies_intro_premise"),
                antecedent,
            )],
            consequent,
        );
        Ok(vec![new_state])
    }
}

/// To prove forall x. P, prove P for an arbitrary x. The eigenvariable is
/// tracked as a metavariable on the new state; it must not escape its
/// scope.
pub struct ForallIntroRule {
    variable_hint: String,
}

impl ForallIntroRule {
    pub fn new(variable_hint: &str) -> ForallIntroRule {
        ForallIntroRule {
            variable_hint: variable_hint.to_string(),
        }
    }
}

impl ProofRule for ForallIntroRule {
    fn name(&self) -> String {
        "Universal Introduction".to_string()
    }

    fn description(&self) -> String {
        "To prove forall x. P(x), prove P(x) for a fresh x".to_string()
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        context.state(state).goal().kind() == TermKind::Forall
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let body = match &**current.goal() {
            Term::Forall { body, .. } => body.clone(),
            _ => return Err(pattern_mismatch("goal is not a universal quantifier")),
        };

        let hint = app_context
            .and_then(|app| app.variable_name.clone())
            .unwrap_or_else(|| self.variable_hint.clone());
        let meta_name = if hint.is_empty() {
            gensym("forall_intro_var")
        } else {
            gensym(&hint)
        };

        let new_state = context.apply_rule(state, "forall_intro", vec![], vec![], body);
        // The eigenvariable's type is not inferred in this iteration; a
        // placeholder base type is recorded.
        if context
            .add_metavariable(new_state, &meta_name, Type::base("placeholder"))
            .is_err()
        {
            return Err(invalid_application("eigenvariable name collision"));
        }
        Ok(vec![new_state])
    }
}

/// From forall x. P(x), conclude P(t) for a chosen t.
pub struct ForallElimRule {
    forall_hyp: String,
    substitution_term: Option<TermRef>,
}

impl ForallElimRule {
    pub fn new(forall_hyp: &str, substitution_term: Option<TermRef>) -> ForallElimRule {
        ForallElimRule {
            forall_hyp: forall_hyp.to_string(),
            substitution_term,
        }
    }
}

impl ProofRule for ForallElimRule {
    fn name(&self) -> String {
        "Universal Elimination".to_string()
    }

    fn description(&self) -> String {
        "From forall x. P(x), derive P(t) for any term t".to_string()
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        match context.state(state).find_hypothesis(&self.forall_hyp) {
            Some(hypothesis) => hypothesis.formula().kind() == TermKind::Forall,
            None => false,
        }
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let hypothesis = current
            .find_hypothesis(&self.forall_hyp)
            .ok_or_else(|| missing_hypothesis(&self.forall_hyp))?;

        let body = match &**hypothesis.formula() {
            Term::Forall { body, .. } => body.clone(),
            _ => {
                return Err(pattern_mismatch(&format!(
                    "hypothesis is not a universal quantifier: {}",
                    self.forall_hyp
                )))
            }
        };

        let term = app_context
            .and_then(|app| app.substitution_term.clone())
            .or_else(|| self.substitution_term.clone())
            .ok_or_else(|| {
                invalid_application("universal elimination requires a substitution term")
            })?;

        let instantiated = substitute(&body, &Substitution::singleton(0, term), 0);
        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            "forall_elim",
            vec![self.forall_hyp.clone()],
            vec![Hypothesis::new(&gensym("forall_elim_result"), instantiated)],
            goal,
        );
        Ok(vec![new_state])
    }
}

/// To prove exists x. P(x), exhibit a hypothesis that instantiates the
/// body. The witness hypothesis must match P with only the bound position
/// filled in.
pub struct ExistsIntroRule {
    witness_hyp: String,
}

impl ExistsIntroRule {
    pub fn new(witness_hyp: &str) -> ExistsIntroRule {
        ExistsIntroRule {
            witness_hyp: witness_hyp.to_string(),
        }
    }
}

impl ProofRule for ExistsIntroRule {
    fn name(&self) -> String {
        "Existential Introduction".to_string()
    }

    fn description(&self) -> String {
        "From P(t), derive exists x. P(x)".to_string()
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        let state = context.state(state);
        state.goal().kind() == TermKind::Exists
            && state.find_hypothesis(&self.witness_hyp).is_some()
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let body = match &**current.goal() {
            Term::Exists { body, .. } => body.clone(),
            _ => return Err(pattern_mismatch("goal is not an existential quantifier")),
        };
        let witness = current
            .find_hypothesis(&self.witness_hyp)
            .ok_or_else(|| missing_hypothesis(&self.witness_hyp))?;

        // Shift the witness formula under the binder so its free variables
        // line up with the body's, then match the body against it. Only the
        // bound position (index 0 under the binder) may be instantiated.
        let shifted = shift_up(witness.formula(), 1, 0);
        let unified = unify(&body, &shifted, 0);
        if !unified.success || unified.substitution.iter().any(|(index, _)| index != 0) {
            return Err(pattern_mismatch(&format!(
                "hypothesis {} is not an instance of the existential body",
                self.witness_hyp
            )));
        }

        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            "exists_intro",
            vec![self.witness_hyp.clone()],
            vec![],
            goal,
        );
        // A deduplicated state may already carry this certification.
        let _ = context.mark_proved(
            new_state,
            CertificationStatus::ProvedByRule,
            &format!("witnessed by {}", self.witness_hyp),
        );
        Ok(vec![new_state])
    }
}

/// From exists x. P(x), conclude P(c) for a fresh witness constant c.
/// The witness is generated by gensym so it cannot collide with existing
/// symbols; scope-escape checking is deferred to the validation hook.
pub struct ExistsElimRule {
    exists_hyp: String,
}

impl ExistsElimRule {
    pub fn new(exists_hyp: &str) -> ExistsElimRule {
        ExistsElimRule {
            exists_hyp: exists_hyp.to_string(),
        }
    }
}

impl ProofRule for ExistsElimRule {
    fn name(&self) -> String {
        "Existential Elimination".to_string()
    }

    fn description(&self) -> String {
        "From exists x. P(x), derive P(c) for a fresh witness constant c".to_string()
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        match context.state(state).find_hypothesis(&self.exists_hyp) {
            Some(hypothesis) => hypothesis.formula().kind() == TermKind::Exists,
            None => false,
        }
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let hypothesis = current
            .find_hypothesis(&self.exists_hyp)
            .ok_or_else(|| missing_hypothesis(&self.exists_hyp))?;

        let body = match &**hypothesis.formula() {
            Term::Exists { body, .. } => body.clone(),
            _ => {
                return Err(pattern_mismatch(&format!(
                    "hypothesis is not an existential quantifier: {}",
                    self.exists_hyp
                )))
            }
        };

        let witness = Term::constant(&gensym("witness"));
        let instantiated = substitute(&body, &Substitution::singleton(0, witness), 0);
        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            "exists_elim",
            vec![self.exists_hyp.clone()],
            vec![Hypothesis::new(&gensym("exists_elim_result"), instantiated)],
            goal,
        );
        Ok(vec![new_state])
    }
}

/// From P and !P, conclude anything: the state is certified as a
/// contradiction.
pub struct ContradictionRule {
    formula_hyp: String,
    negation_hyp: String,
}

impl ContradictionRule {
    pub fn new(formula_hyp: &str, negation_hyp: &str) -> ContradictionRule {
        ContradictionRule {
            formula_hyp: formula_hyp.to_string(),
            negation_hyp: negation_hyp.to_string(),
        }
    }

    fn matches(formula: &TermRef, negation: &TermRef) -> bool {
        match &**negation {
            Term::Not { body } => body == formula,
            _ => false,
        }
    }
}

impl ProofRule for ContradictionRule {
    fn name(&self) -> String {
        "Contradiction".to_string()
    }

    fn description(&self) -> String {
        "From a contradiction (P and !P), derive any conclusion".to_string()
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        let state = context.state(state);
        match (
            state.find_hypothesis(&self.formula_hyp),
            state.find_hypothesis(&self.negation_hyp),
        ) {
            (Some(formula), Some(negation)) => {
                Self::matches(formula.formula(), negation.formula())
            }
            _ => false,
        }
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let formula = current
            .find_hypothesis(&self.formula_hyp)
            .ok_or_else(|| missing_hypothesis(&self.formula_hyp))?;
        let negation = current
            .find_hypothesis(&self.negation_hyp)
            .ok_or_else(|| missing_hypothesis(&self.negation_hyp))?;

        if !Self::matches(formula.formula(), negation.formula()) {
            return Err(pattern_mismatch(
                "the second hypothesis is not the negation of the first",
            ));
        }

        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            "contradiction",
            vec![self.formula_hyp.clone(), self.negation_hyp.clone()],
            vec![],
            goal,
        );
        let _ = context.mark_proved(
            new_state,
            CertificationStatus::Contradiction,
            &format!(
                "contradiction between {} and {}",
                self.formula_hyp, self.negation_hyp
            ),
        );
        Ok(vec![new_state])
    }
}

/// Replaces every occurrence of `from` in the term with `to`, shifting
/// both under binders so free variables keep their meaning.
fn replace_all(term: &TermRef, from: &TermRef, to: &TermRef) -> TermRef {
    if **term == **from {
        return to.clone();
    }
    let under_binder = matches!(term.kind(), TermKind::Forall | TermKind::Exists);
    let (from, to) = if under_binder {
        (shift_up(from, 1, 0), shift_up(to, 1, 0))
    } else {
        (from.clone(), to.clone())
    };
    let mut result = term.clone();
    for i in 0..term.child_count() {
        let child = match result.child(i) {
            Some(child) => child.clone(),
            None => continue,
        };
        let new_child = replace_all(&child, &from, &to);
        if !Arc::ptr_eq(&new_child, &child) {
            if let Some(updated) = result.with_child(i, new_child) {
                result = updated;
            }
        }
    }
    result
}

/// Rewrites the goal using an equality hypothesis l = r, replacing every
/// occurrence of one side with the other.
pub struct RewriteRule {
    equality_hyp: String,
    left_to_right: bool,
}

impl RewriteRule {
    pub fn new(equality_hyp: &str, left_to_right: bool) -> RewriteRule {
        RewriteRule {
            equality_hyp: equality_hyp.to_string(),
            left_to_right,
        }
    }
}

impl ProofRule for RewriteRule {
    fn name(&self) -> String {
        if self.left_to_right {
            "Rewrite (Left to Right)".to_string()
        } else {
            "Rewrite (Right to Left)".to_string()
        }
    }

    fn description(&self) -> String {
        if self.left_to_right {
            "Rewrite the goal using an equality, replacing left with right".to_string()
        } else {
            "Rewrite the goal using an equality, replacing right with left".to_string()
        }
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        match context.state(state).find_hypothesis(&self.equality_hyp) {
            Some(hypothesis) => hypothesis.formula().is_equality(),
            None => false,
        }
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let hypothesis = current
            .find_hypothesis(&self.equality_hyp)
            .ok_or_else(|| missing_hypothesis(&self.equality_hyp))?;

        let (left, right) = hypothesis.formula().equality_sides().map_err(|_| {
            pattern_mismatch(&format!(
                "hypothesis is not an equality: {}",
                self.equality_hyp
            ))
        })?;

        let left_to_right = app_context
            .and_then(|app| app.left_to_right)
            .unwrap_or(self.left_to_right);
        let (from, to) = if left_to_right {
            (left, right)
        } else {
            (right, left)
        };

        let goal = current.goal().clone();
        let rewritten = replace_all(&goal, &from, &to);
        if rewritten == goal {
            return Err(pattern_mismatch(&format!(
                "{} does not occur in the goal",
                from
            )));
        }
        debug!(goal = %rewritten, "rewrote goal");

        let new_state = context.apply_rule(
            state,
            "rewrite",
            vec![self.equality_hyp.clone()],
            vec![],
            rewritten,
        );
        Ok(vec![new_state])
    }
}

/// Introduces a formula as a hypothesis, unconditionally.
pub struct AssumptionRule {
    formula: Option<TermRef>,
    hyp_name: String,
}

impl AssumptionRule {
    pub fn new(formula: TermRef, name: &str) -> AssumptionRule {
        AssumptionRule {
            formula: Some(formula),
            hyp_name: name.to_string(),
        }
    }

    /// An assumption with a generated hypothesis name.
    pub fn anonymous(formula: TermRef) -> AssumptionRule {
        AssumptionRule {
            formula: Some(formula),
            hyp_name: gensym("assumption"),
        }
    }
}

impl ProofRule for AssumptionRule {
    fn name(&self) -> String {
        "Assumption".to_string()
    }

    fn description(&self) -> String {
        "Add a formula as a hypothesis".to_string()
    }

    fn is_applicable(
        &self,
        _context: &ProofContext,
        _state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        true
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let formula = app_context
            .and_then(|app| app.additional_term.clone())
            .or_else(|| self.formula.clone())
            .ok_or_else(|| invalid_application("assumption requires a formula"))?;
        let name = app_context
            .and_then(|app| app.hypothesis_name.clone())
            .unwrap_or_else(|| self.hyp_name.clone());

        let goal = context.state(state).goal().clone();
        let new_state = context.apply_rule(
            state,
            "assumption",
            vec![],
            vec![Hypothesis::new(&name, formula)],
            goal,
        );
        Ok(vec![new_state])
    }
}

/// Introduces a lemma: one child state proves it, the other assumes it and
/// continues with the original goal.
pub struct CutRule {
    lemma: Option<TermRef>,
    lemma_name: String,
}

impl CutRule {
    pub fn new(lemma: TermRef, lemma_name: &str) -> CutRule {
        CutRule {
            lemma: Some(lemma),
            lemma_name: lemma_name.to_string(),
        }
    }
}

impl ProofRule for CutRule {
    fn name(&self) -> String {
        "Cut".to_string()
    }

    fn description(&self) -> String {
        "Introduce a lemma and prove it separately".to_string()
    }

    fn is_applicable(
        &self,
        _context: &ProofContext,
        _state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        true
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let lemma = app_context
            .and_then(|app| app.additional_term.clone())
            .or_else(|| self.lemma.clone())
            .ok_or_else(|| invalid_application("cut requires a lemma formula"))?;
        let name = app_context
            .and_then(|app| app.hypothesis_name.clone())
            .unwrap_or_else(|| self.lemma_name.clone());

        let goal = context.state(state).goal().clone();
        let lemma_state =
            context.apply_rule(state, "cut_prove_lemma", vec![], vec![], lemma.clone());
        let continue_state = context.apply_rule(
            state,
            "cut_use_lemma",
            vec![],
            vec![Hypothesis::new(&name, lemma)],
            goal,
        );
        Ok(vec![lemma_state, continue_state])
    }
}

/// The four quantifier negation transforms. Inward pushes a negation
/// through a quantifier (!forall becomes exists-not, !exists becomes
/// forall-not); outward pulls it back out.
pub struct QuantifierNegationRule {
    hyp_name: String,
    inward: bool,
}

impl QuantifierNegationRule {
    pub fn new(hyp_name: &str, inward: bool) -> QuantifierNegationRule {
        QuantifierNegationRule {
            hyp_name: hyp_name.to_string(),
            inward,
        }
    }

    fn transform(&self, formula: &TermRef) -> Option<(TermRef, &'static str)> {
        if self.inward {
            match &**formula {
                Term::Not { body } => match &**body {
                    Term::Forall { hint, body } => Some((
                        Term::exists(hint, Term::not(body.clone())),
                        "not_forall_to_exists_not",
                    )),
                    Term::Exists { hint, body } => Some((
                        Term::forall(hint, Term::not(body.clone())),
                        "not_exists_to_forall_not",
                    )),
                    _ => None,
                },
                _ => None,
            }
        } else {
            match &**formula {
                Term::Forall { hint, body } => match &**body {
                    Term::Not { body: inner } => Some((
                        Term::not(Term::exists(hint, inner.clone())),
                        "forall_not_to_not_exists",
                    )),
                    _ => None,
                },
                Term::Exists { hint, body } => match &**body {
                    Term::Not { body: inner } => Some((
                        Term::not(Term::forall(hint, inner.clone())),
                        "exists_not_to_not_forall",
                    )),
                    _ => None,
                },
                _ => None,
            }
        }
    }
}

impl ProofRule for QuantifierNegationRule {
    fn name(&self) -> String {
        if self.inward {
            "Quantifier Negation (Inward)".to_string()
        } else {
            "Quantifier Negation (Outward)".to_string()
        }
    }

    fn description(&self) -> String {
        if self.inward {
            "Transform !(forall x. P) to exists x. !P, or !(exists x. P) to forall x. !P"
                .to_string()
        } else {
            "Transform forall x. !P to !(exists x. P), or exists x. !P to !(forall x. P)"
                .to_string()
        }
    }

    fn is_applicable(
        &self,
        context: &ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> bool {
        match context.state(state).find_hypothesis(&self.hyp_name) {
            Some(hypothesis) => self.transform(hypothesis.formula()).is_some(),
            None => false,
        }
    }

    fn apply(
        &self,
        context: &mut ProofContext,
        state: StateId,
        _app_context: Option<&RuleApplicationContext>,
    ) -> RuleResult {
        let current = context.state(state);
        let hypothesis = current
            .find_hypothesis(&self.hyp_name)
            .ok_or_else(|| missing_hypothesis(&self.hyp_name))?;

        let (transformed, rule_name) =
            self.transform(hypothesis.formula()).ok_or_else(|| {
                pattern_mismatch(&format!(
                    "hypothesis does not match a quantifier negation pattern: {}",
                    self.hyp_name
                ))
            })?;

        let goal = current.goal().clone();
        let new_state = context.apply_rule(
            state,
            rule_name,
            vec![self.hyp_name.clone()],
            vec![Hypothesis::new(
                &gensym("quantifier_negation_result"),
                transformed,
            )],
            goal,
        );
        Ok(vec![new_state])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(goal: TermRef, hypotheses: Vec<(&str, TermRef)>) -> (ProofContext, StateId) {
        let mut context = ProofContext::new();
        let root = context.create_initial_state(goal.clone());
        if hypotheses.is_empty() {
            return (context, root);
        }
        let hypotheses = hypotheses
            .into_iter()
            .map(|(name, formula)| Hypothesis::new(name, formula))
            .collect();
        let state = context.apply_rule(root, "setup", vec![], hypotheses, goal);
        (context, state)
    }

    fn has_hypothesis(context: &ProofContext, state: StateId, formula: &TermRef) -> bool {
        context
            .state(state)
            .hypotheses()
            .iter()
            .any(|hyp| hyp.formula() == formula)
    }

    #[test]
    fn test_modus_ponens() {
        let p = Term::constant("P");
        let q = Term::constant("Q");
        let (mut context, state) = setup(
            Term::constant("G"),
            vec![
                ("h_p", p.clone()),
                ("h_imp", Term::implies(p.clone(), q.clone())),
            ],
        );
        let rule = ModusPonensRule::new("h_p", "h_imp");
        assert!(rule.is_applicable(&context, state, None));

        let states = rule.apply(&mut context, state, None).unwrap();
        assert_eq!(states.len(), 1);
        assert!(has_hypothesis(&context, states[0], &q));
        let trace = context.get_proof_trace(states[0]);
        assert_eq!(trace.last().unwrap().rule_name(), "modus_ponens");
    }

    #[test]
    fn test_modus_ponens_missing_hypothesis() {
        let (mut context, state) = setup(Term::constant("G"), vec![]);
        let rule = ModusPonensRule::new("h_p", "h_imp");
        assert!(!rule.is_applicable(&context, state, None));
        let violation = rule.apply(&mut context, state, None).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::InvalidHypothesis);
    }

    #[test]
    fn test_modus_ponens_pattern_mismatch() {
        let p = Term::constant("P");
        let (mut context, state) = setup(
            Term::constant("G"),
            vec![("h_p", p.clone()), ("h_imp", Term::and(p.clone(), p))],
        );
        let rule = ModusPonensRule::new("h_p", "h_imp");
        assert!(!rule.is_applicable(&context, state, None));
        let violation = rule.apply(&mut context, state, None).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::RulePatternMismatch);
    }

    #[test]
    fn test_and_intro() {
        let p = Term::constant("P");
        let q = Term::constant("Q");
        let (mut context, state) = setup(
            Term::constant("G"),
            vec![("h_p", p.clone()), ("h_q", q.clone())],
        );
        let rule = AndIntroRule::new("h_p", "h_q");
        let states = rule.apply(&mut context, state, None).unwrap();
        assert!(has_hypothesis(&context, states[0], &Term::and(p, q)));
    }

    #[test]
    fn test_and_elim_both_sides() {
        let p = Term::constant("P");
        let q = Term::constant("Q");
        let (mut context, state) = setup(
            Term::constant("G"),
            vec![("h_pq", Term::and(p.clone(), q.clone()))],
        );
        let left_states = AndElimRule::new("h_pq", true)
            .apply(&mut context, state, None)
            .unwrap();
        assert!(has_hypothesis(&context, left_states[0], &p));

        let right_states = AndElimRule::new("h_pq", false)
            .apply(&mut context, state, None)
            .unwrap();
        assert!(has_hypothesis(&context, right_states[0], &q));
    }

    #[test]
    fn test_and_elim_requires_conjunction() {
        let (mut context, state) =
            setup(Term::constant("G"), vec![("h", Term::constant("P"))]);
        let rule = AndElimRule::new("h", true);
        assert!(!rule.is_applicable(&context, state, None));
        let violation = rule.apply(&mut context, state, None).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::RulePatternMismatch);
    }

    #[test]
    fn test_or_intro_from_context() {
        let p = Term::constant("P");
        let q = Term::constant("Q");
        let (mut context, state) = setup(Term::constant("G"), vec![("h_p", p.clone())]);

        let rule = OrIntroRule::new("h_p", None, true);
        let violation = rule.apply(&mut context, state, None).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::InvalidRuleApplication);

        let app = RuleApplicationContext {
            additional_term: Some(q.clone()),
            ..Default::default()
        };
        let states = rule.apply(&mut context, state, Some(&app)).unwrap();
        assert!(has_hypothesis(&context, states[0], &Term::or(p, q)));
    }

    #[test]
    fn test_or_intro_premise_on_right() {
        let p = Term::constant("P");
        let q = Term::constant("Q");
        let (mut context, state) = setup(Term::constant("G"), vec![("h_p", p.clone())]);
        let rule = OrIntroRule::new("h_p", Some(q.clone()), false);
        let states = rule.apply(&mut context, state, None).unwrap();
        assert!(has_hypothesis(&context, states[0], &Term::or(q, p)));
    }

    #[test]
    fn test_implies_intro() {
        let a = Term::constant("A");
        let b = Term::constant("B");
        let (mut context, state) = setup(Term::implies(a.clone(), b.clone()), vec![]);
        let rule = ImpliesIntroRule::new();
        assert!(rule.is_applicable(&context, state, None));

        let states = rule.apply(&mut context, state, None).unwrap();
        assert_eq!(context.state(states[0]).goal(), &b);
        assert!(has_hypothesis(&context, states[0], &a));
    }

    #[test]
    fn test_implies_intro_requires_implication() {
        let (mut context, state) = setup(Term::constant("G"), vec![]);
        let rule = ImpliesIntroRule::new();
        assert!(!rule.is_applicable(&context, state, None));
        assert!(rule.apply(&mut context, state, None).is_err());
    }

    #[test]
    fn test_forall_intro_adds_metavariable() {
        let goal = Term::forall("x", Term::app("p", vec![Term::variable(0)]));
        let (mut context, state) = setup(goal, vec![]);
        let rule = ForallIntroRule::new("x");
        let states = rule.apply(&mut context, state, None).unwrap();

        let new_state = context.state(states[0]);
        assert_eq!(new_state.goal(), &Term::app("p", vec![Term::variable(0)]));
        assert_eq!(new_state.metavariables().len(), 1);
        assert!(new_state.has_uninstantiated_metavariables());
        assert!(!new_state.is_proved());
    }

    #[test]
    fn test_forall_elim() {
        let hyp = Term::forall("x", Term::app("p", vec![Term::variable(0)]));
        let (mut context, state) = setup(Term::constant("G"), vec![("h_all", hyp)]);
        let rule = ForallElimRule::new("h_all", Some(Term::constant("c")));
        let states = rule.apply(&mut context, state, None).unwrap();
        assert!(has_hypothesis(
            &context,
            states[0],
            &Term::app("p", vec![Term::constant("c")])
        ));
    }

    #[test]
    fn test_forall_elim_term_from_context() {
        let hyp = Term::forall("x", Term::app("p", vec![Term::variable(0)]));
        let (mut context, state) = setup(Term::constant("G"), vec![("h_all", hyp)]);
        let rule = ForallElimRule::new("h_all", None);
        let app = RuleApplicationContext {
            substitution_term: Some(Term::constant("d")),
            ..Default::default()
        };
        let states = rule.apply(&mut context, state, Some(&app)).unwrap();
        assert!(has_hypothesis(
            &context,
            states[0],
            &Term::app("p", vec![Term::constant("d")])
        ));
    }

    #[test]
    fn test_exists_intro_with_matching_witness() {
        let goal = Term::exists("x", Term::app("p", vec![Term::variable(0)]));
        let witness = Term::app("p", vec![Term::constant("c")]);
        let (mut context, state) = setup(goal, vec![("h_w", witness)]);
        let rule = ExistsIntroRule::new("h_w");
        assert!(rule.is_applicable(&context, state, None));

        let states = rule.apply(&mut context, state, None).unwrap();
        let new_state = context.state(states[0]);
        assert_eq!(
            new_state.certification().status,
            CertificationStatus::ProvedByRule
        );
        assert!(new_state.is_proved());
    }

    #[test]
    fn test_exists_intro_rejects_mismatched_witness() {
        let goal = Term::exists("x", Term::app("p", vec![Term::variable(0)]));
        let witness = Term::app("q", vec![Term::constant("c")]);
        let (mut context, state) = setup(goal, vec![("h_w", witness)]);
        let rule = ExistsIntroRule::new("h_w");
        let violation = rule.apply(&mut context, state, None).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::RulePatternMismatch);
    }

    #[test]
    fn test_exists_elim_generates_fresh_witness() {
        let hyp = Term::exists("x", Term::app("p", vec![Term::variable(0)]));
        let (mut context, state) = setup(Term::constant("G"), vec![("h_ex", hyp)]);
        let rule = ExistsElimRule::new("h_ex");
        let states = rule.apply(&mut context, state, None).unwrap();

        let new_state = context.state(states[0]);
        let witnessed = new_state
            .hypotheses()
            .iter()
            .find(|hyp| hyp.name().starts_with("exists_elim_result"))
            .expect("missing eliminated hypothesis");
        match &**witnessed.formula() {
            Term::Application { symbol, args, .. } => {
                assert_eq!(symbol, "p");
                match &*args[0] {
                    Term::Constant { symbol, .. } => assert!(symbol.starts_with("witness")),
                    other => panic!("expected a witness constant, got {:?}", other),
                }
            }
            other => panic!("expected an application, got {:?}", other),
        }
    }

    #[test]
    fn test_contradiction() {
        let p = Term::constant("P");
        let (mut context, state) = setup(
            Term::constant("G"),
            vec![("h_p", p.clone()), ("h_np", Term::not(p))],
        );
        let rule = ContradictionRule::new("h_p", "h_np");
        assert!(rule.is_applicable(&context, state, None));

        let states = rule.apply(&mut context, state, None).unwrap();
        let new_state = context.state(states[0]);
        assert_eq!(
            new_state.certification().status,
            CertificationStatus::Contradiction
        );
        assert!(new_state.is_proved());
    }

    #[test]
    fn test_contradiction_requires_negation_of_same_formula() {
        let (mut context, state) = setup(
            Term::constant("G"),
            vec![
                ("h_p", Term::constant("P")),
                ("h_nq", Term::not(Term::constant("Q"))),
            ],
        );
        let rule = ContradictionRule::new("h_p", "h_nq");
        assert!(!rule.is_applicable(&context, state, None));
        let violation = rule.apply(&mut context, state, None).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::RulePatternMismatch);
    }

    #[test]
    fn test_rewrite_left_to_right() {
        let a = Term::constant("a");
        let b = Term::constant("b");
        let goal = Term::and(
            Term::app("p", vec![a.clone()]),
            Term::app("q", vec![a.clone()]),
        );
        let (mut context, state) = setup(
            goal,
            vec![("h_eq", Term::equality(a.clone(), b.clone()))],
        );
        let rule = RewriteRule::new("h_eq", true);
        let states = rule.apply(&mut context, state, None).unwrap();
        assert_eq!(
            context.state(states[0]).goal(),
            &Term::and(
                Term::app("p", vec![b.clone()]),
                Term::app("q", vec![b]),
            )
        );
    }

    #[test]
    fn test_rewrite_right_to_left_via_context() {
        let a = Term::constant("a");
        let b = Term::constant("b");
        let goal = Term::app("p", vec![b.clone()]);
        let (mut context, state) = setup(
            goal,
            vec![("h_eq", Term::equality(a.clone(), b.clone()))],
        );
        let rule = RewriteRule::new("h_eq", true);
        let app = RuleApplicationContext {
            left_to_right: Some(false),
            ..Default::default()
        };
        let states = rule.apply(&mut context, state, Some(&app)).unwrap();
        assert_eq!(context.state(states[0]).goal(), &Term::app("p", vec![a]));
    }

    #[test]
    fn test_rewrite_under_binder() {
        let a = Term::constant("a");
        let b = Term::constant("b");
        let goal = Term::forall(
            "x",
            Term::app("p", vec![Term::variable(0), a.clone()]),
        );
        let (mut context, state) = setup(
            goal,
            vec![("h_eq", Term::equality(a.clone(), b.clone()))],
        );
        let rule = RewriteRule::new("h_eq", true);
        let states = rule.apply(&mut context, state, None).unwrap();
        assert_eq!(
            context.state(states[0]).goal(),
            &Term::forall("x", Term::app("p", vec![Term::variable(0), b]))
        );
    }

    #[test]
    fn test_rewrite_requires_occurrence() {
        let (mut context, state) = setup(
            Term::constant("G"),
            vec![(
                "h_eq",
                Term::equality(Term::constant("a"), Term::constant("b")),
            )],
        );
        let rule = RewriteRule::new("h_eq", true);
        let violation = rule.apply(&mut context, state, None).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::RulePatternMismatch);
    }

    #[test]
    fn test_assumption() {
        let (mut context, state) = setup(Term::constant("G"), vec![]);
        let formula = Term::constant("A");
        let rule = AssumptionRule::new(formula.clone(), "h_a");
        let states = rule.apply(&mut context, state, None).unwrap();
        assert!(has_hypothesis(&context, states[0], &formula));
        assert!(context.state(states[0]).find_hypothesis("h_a").is_some());
    }

    #[test]
    fn test_assumption_from_context() {
        let (mut context, state) = setup(Term::constant("G"), vec![]);
        let rule = AssumptionRule::anonymous(Term::constant("A"));
        let app = RuleApplicationContext {
            additional_term: Some(Term::constant("B")),
            hypothesis_name: Some("h_b".to_string()),
            ..Default::default()
        };
        let states = rule.apply(&mut context, state, Some(&app)).unwrap();
        assert!(has_hypothesis(&context, states[0], &Term::constant("B")));
        assert!(context.state(states[0]).find_hypothesis("h_b").is_some());
    }

    #[test]
    fn test_cut_returns_two_states() {
        let goal = Term::constant("G");
        let lemma = Term::constant("L");
        let (mut context, state) = setup(goal.clone(), vec![]);
        let rule = CutRule::new(lemma.clone(), "h_lemma");
        let states = rule.apply(&mut context, state, None).unwrap();
        assert_eq!(states.len(), 2);

        // One state proves the lemma, the other assumes it.
        assert_eq!(context.state(states[0]).goal(), &lemma);
        assert_eq!(context.state(states[1]).goal(), &goal);
        assert!(has_hypothesis(&context, states[1], &lemma));
    }

    #[test]
    fn test_quantifier_negation_inward_forall() {
        let hyp = Term::not(Term::forall(
            "x",
            Term::app("p", vec![Term::variable(0)]),
        ));
        let (mut context, state) = setup(Term::constant("G"), vec![("h", hyp)]);
        let rule = QuantifierNegationRule::new("h", true);
        let states = rule.apply(&mut context, state, None).unwrap();
        let expected = Term::exists(
            "x",
            Term::not(Term::app("p", vec![Term::variable(0)])),
        );
        assert!(has_hypothesis(&context, states[0], &expected));
        let trace = context.get_proof_trace(states[0]);
        assert_eq!(
            trace.last().unwrap().rule_name(),
            "not_forall_to_exists_not"
        );
    }

    #[test]
    fn test_quantifier_negation_inward_exists() {
        let hyp = Term::not(Term::exists(
            "x",
            Term::app("p", vec![Term::variable(0)]),
        ));
        let (mut context, state) = setup(Term::constant("G"), vec![("h", hyp)]);
        let rule = QuantifierNegationRule::new("h", true);
        let states = rule.apply(&mut context, state, None).unwrap();
        let expected = Term::forall(
            "x",
            Term::not(Term::app("p", vec![Term::variable(0)])),
        );
        assert!(has_hypothesis(&context, states[0], &expected));
    }

    #[test]
    fn test_quantifier_negation_outward_forall() {
        let hyp = Term::forall(
            "x",
            Term::not(Term::app("p", vec![Term::variable(0)])),
        );
        let (mut context, state) = setup(Term::constant("G"), vec![("h", hyp)]);
        let rule = QuantifierNegationRule::new("h", false);
        let states = rule.apply(&mut context, state, None).unwrap();
        let expected = Term::not(Term::exists(
            "x",
            Term::app("p", vec![Term::variable(0)]),
        ));
        assert!(has_hypothesis(&context, states[0], &expected));
    }

    #[test]
    fn test_quantifier_negation_outward_exists() {
        let hyp = Term::exists(
            "x",
            Term::not(Term::app("p", vec![Term::variable(0)])),
        );
        let (mut context, state) = setup(Term::constant("G"), vec![("h", hyp)]);
        let rule = QuantifierNegationRule::new("h", false);
        let states = rule.apply(&mut context, state, None).unwrap();
        let expected = Term::not(Term::forall(
            "x",
            Term::app("p", vec![Term::variable(0)]),
        ));
        assert!(has_hypothesis(&context, states[0], &expected));
    }

    #[test]
    fn test_quantifier_negation_pattern_mismatch() {
        let (mut context, state) = setup(
            Term::constant("G"),
            vec![("h", Term::not(Term::constant("P")))],
        );
        let rule = QuantifierNegationRule::new("h", true);
        assert!(!rule.is_applicable(&context, state, None));
        let violation = rule.apply(&mut context, state, None).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::RulePatternMismatch);
    }
}
