use std::cmp::Ordering;
use std::fmt;

use tracing::{debug, trace};

use crate::substitution::substitute;
use crate::term::{Term, TermKind, TermRef};
use crate::unification::unify;

/// A path from the root of a term to a subterm: a sequence of child
/// indices. The empty path is the root. Child numbering follows the term's
/// own addressing: application arguments by position, left/antecedent
/// before right/consequent, bodies at 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Position {
    path: Vec<usize>,
}

impl Position {
    pub fn root() -> Position {
        Position { path: vec![] }
    }

    pub fn new(path: Vec<usize>) -> Position {
        Position { path }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// The position of child `index` below this position.
    pub fn descend(&self, index: usize) -> Position {
        let mut path = self.path.clone();
        path.push(index);
        Position { path }
    }

    /// This position reinterpreted as living below child `index`.
    pub fn prefixed_with(&self, index: usize) -> Position {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.push(index);
        path.extend_from_slice(&self.path);
        Position { path }
    }

    pub fn is_prefix_of(&self, other: &Position) -> bool {
        if self.path.len() > other.path.len() {
            return false;
        }
        self.path.iter().zip(other.path.iter()).all(|(a, b)| a == b)
    }

    fn split_first(&self) -> Option<(usize, Position)> {
        let (&first, rest) = self.path.split_first()?;
        Some((first, Position::new(rest.to_vec())))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, step) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", step)?;
        }
        write!(f, "]")
    }
}

/// A strict ordering on terms, used to orient equations into rewrite rules.
/// The rewrite system only accepts rules whose left side is greater, which
/// makes every rewrite step strictly decreasing.
pub trait TermOrdering {
    fn greater(&self, left: &TermRef, right: &TermRef) -> bool;

    /// Neither side is greater than the other.
    fn equivalent(&self, left: &TermRef, right: &TermRef) -> bool {
        !self.greater(left, right) && !self.greater(right, left)
    }
}

/// Compares terms by weight (node count) first and falls back to a
/// lexicographic structural comparison, in the spirit of the Knuth-Bendix
/// orderings. Total up to alpha-equivalence: `equivalent` holds exactly for
/// structurally equal terms.
pub struct WeightOrdering;

fn weight(term: &TermRef) -> usize {
    let mut total = 1;
    for i in 0..term.child_count() {
        if let Some(child) = term.child(i) {
            total += weight(child);
        }
    }
    total
}

fn kind_rank(kind: TermKind) -> u8 {
    match kind {
        TermKind::Variable => 0,
        TermKind::Constant => 1,
        TermKind::Application => 2,
        TermKind::Forall => 3,
        TermKind::Exists => 4,
        TermKind::And => 5,
        TermKind::Or => 6,
        TermKind::Not => 7,
        TermKind::Implies => 8,
    }
}

fn structural_cmp(left: &TermRef, right: &TermRef) -> Ordering {
    let by_rank = kind_rank(left.kind()).cmp(&kind_rank(right.kind()));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (&**left, &**right) {
        (Term::Variable { index: a, .. }, Term::Variable { index: b, .. }) => a.cmp(b),
        (Term::Constant { symbol: a, .. }, Term::Constant { symbol: b, .. }) => a.cmp(b),
        (
            Term::Application {
                symbol: s1,
                args: a1,
                ..
            },
            Term::Application {
                symbol: s2,
                args: a2,
                ..
            },
        ) => s1
            .cmp(s2)
            .then(a1.len().cmp(&a2.len()))
            .then_with(|| children_cmp(left, right)),
        _ => children_cmp(left, right),
    }
}

fn children_cmp(left: &TermRef, right: &TermRef) -> Ordering {
    for i in 0..left.child_count() {
        match (left.child(i), right.child(i)) {
            (Some(a), Some(b)) => {
                let cmp = structural_cmp(a, b);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            _ => break,
        }
    }
    Ordering::Equal
}

impl TermOrdering for WeightOrdering {
    fn greater(&self, left: &TermRef, right: &TermRef) -> bool {
        match weight(left).cmp(&weight(right)) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => structural_cmp(left, right) == Ordering::Greater,
        }
    }
}

/// An oriented rewrite rule. The invariant `lhs > rhs` under the system's
/// ordering is established at insertion time.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    lhs: TermRef,
    rhs: TermRef,
    name: String,
}

impl RewriteRule {
    pub fn new(lhs: TermRef, rhs: TermRef, name: &str) -> RewriteRule {
        let name = if name.is_empty() {
            "unnamed_rule".to_string()
        } else {
            name.to_string()
        };
        RewriteRule { lhs, rhs, name }
    }

    pub fn lhs(&self) -> &TermRef {
        &self.lhs
    }

    pub fn rhs(&self) -> &TermRef {
        &self.rhs
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_oriented(&self, ordering: &dyn TermOrdering) -> bool {
        ordering.greater(&self.lhs, &self.rhs)
    }

    /// Returns this rule oriented so the greater side is on the left, or
    /// None when the sides are equivalent and no orientation exists.
    pub fn orient(&self, ordering: &dyn TermOrdering) -> Option<RewriteRule> {
        if ordering.greater(&self.lhs, &self.rhs) {
            Some(self.clone())
        } else if ordering.greater(&self.rhs, &self.lhs) {
            Some(RewriteRule {
                lhs: self.rhs.clone(),
                rhs: self.lhs.clone(),
                name: self.name.clone(),
            })
        } else {
            None
        }
    }

    /// Whether two rules rewrite the same thing to the same thing. Names
    /// are not compared.
    pub fn same_rewrite(&self, other: &RewriteRule) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }
}

impl fmt::Display for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.name, self.lhs, self.rhs)
    }
}

/// An unoriented equation, the input form for rules. It must be oriented
/// under an ordering before it can enter a rewrite system.
#[derive(Debug, Clone)]
pub struct Equation {
    lhs: TermRef,
    rhs: TermRef,
    name: String,
}

impl Equation {
    pub fn new(lhs: TermRef, rhs: TermRef, name: &str) -> Equation {
        Equation {
            lhs,
            rhs,
            name: name.to_string(),
        }
    }

    pub fn lhs(&self) -> &TermRef {
        &self.lhs
    }

    pub fn rhs(&self) -> &TermRef {
        &self.rhs
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn orient(&self, ordering: &dyn TermOrdering) -> Option<RewriteRule> {
        if ordering.greater(&self.lhs, &self.rhs) {
            Some(RewriteRule::new(self.lhs.clone(), self.rhs.clone(), &self.name))
        } else if ordering.greater(&self.rhs, &self.lhs) {
            Some(RewriteRule::new(self.rhs.clone(), self.lhs.clone(), &self.name))
        } else {
            None
        }
    }

    pub fn is_orientable(&self, ordering: &dyn TermOrdering) -> bool {
        !ordering.equivalent(&self.lhs, &self.rhs)
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} = {}", self.name, self.lhs, self.rhs)
    }
}

/// The outcome of a rewriting operation. "No redex" is an ordinary result;
/// callers treat non-success as no progress.
#[derive(Debug, Clone)]
pub struct RewriteResult {
    pub success: bool,
    pub term: Option<TermRef>,
    pub position: Option<Position>,
    pub rule_name: Option<String>,
}

impl RewriteResult {
    pub fn success_at(term: TermRef, position: Position, rule_name: String) -> RewriteResult {
        RewriteResult {
            success: true,
            term: Some(term),
            position: Some(position),
            rule_name: Some(rule_name),
        }
    }

    pub fn failure() -> RewriteResult {
        RewriteResult {
            success: false,
            term: None,
            position: None,
            rule_name: None,
        }
    }
}

/// The subterm addressed by a position, or None when the path runs off the
/// term.
pub fn subterm_at(term: &TermRef, position: &Position) -> Option<TermRef> {
    let mut current = term.clone();
    for &index in position.path() {
        let child = current.child(index)?.clone();
        current = child;
    }
    Some(current)
}

/// A copy of the term with the subterm at the position replaced. None when
/// the position does not address a subterm.
pub fn replace_at(term: &TermRef, position: &Position, replacement: &TermRef) -> Option<TermRef> {
    match position.split_first() {
        None => Some(replacement.clone()),
        Some((index, rest)) => {
            let child = term.child(index)?;
            let new_child = replace_at(child, &rest, replacement)?;
            term.with_child(index, new_child)
        }
    }
}

/// An oriented set of rewrite rules sharing one term ordering. Rules apply
/// in insertion order; the first match wins.
pub struct RewriteSystem {
    rules: Vec<RewriteRule>,
    ordering: Box<dyn TermOrdering>,
    next_rule_id: usize,
}

impl RewriteSystem {
    pub fn new(ordering: Box<dyn TermOrdering>) -> RewriteSystem {
        RewriteSystem {
            rules: vec![],
            ordering,
            next_rule_id: 0,
        }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn fresh_rule_name(&mut self) -> String {
        let name = format!("rule_{}", self.next_rule_id);
        self.next_rule_id += 1;
        name
    }

    /// Orients the pair under the system's ordering and inserts it.
    /// Returns false when the sides are equivalent, or when an identical
    /// rule is already present.
    pub fn add_rule(&mut self, lhs: TermRef, rhs: TermRef, name: Option<&str>) -> bool {
        let name = match name {
            Some(n) => n.to_string(),
            None => self.fresh_rule_name(),
        };
        let candidate = RewriteRule::new(lhs, rhs, &name);
        match candidate.orient(self.ordering.as_ref()) {
            Some(oriented) => self.insert_oriented(oriented),
            None => false,
        }
    }

    /// Orients an equation and inserts the resulting rule.
    pub fn add_equation(&mut self, equation: &Equation) -> bool {
        let name = if equation.name().is_empty() {
            self.fresh_rule_name()
        } else {
            equation.name().to_string()
        };
        let named = Equation::new(equation.lhs().clone(), equation.rhs().clone(), &name);
        match named.orient(self.ordering.as_ref()) {
            Some(oriented) => self.insert_oriented(oriented),
            None => false,
        }
    }

    fn insert_oriented(&mut self, rule: RewriteRule) -> bool {
        if self.rules.iter().any(|existing| existing.same_rewrite(&rule)) {
            return false;
        }
        debug!(rule = %rule, "adding rewrite rule");
        self.rules.push(rule);
        true
    }

    pub fn remove_rule(&mut self, name: &str) -> bool {
        match self.rules.iter().position(|rule| rule.name() == name) {
            Some(index) => {
                self.rules.remove(index);
                true
            }
            None => false,
        }
    }

    /// Unifies the rule's left side against the term; on success returns
    /// the instantiated right side. Matching by unification is stronger
    /// than pure matching and sufficient for the ground rewriting done
    /// here.
    pub fn try_apply_rule(&self, term: &TermRef, rule: &RewriteRule) -> Option<TermRef> {
        let result = unify(rule.lhs(), term, 0);
        if !result.success {
            return None;
        }
        Some(substitute(rule.rhs(), &result.substitution, 0))
    }

    /// Applies the first rule, in insertion order, that matches the
    /// subterm at the position.
    pub fn rewrite_at(&self, term: &TermRef, position: &Position) -> RewriteResult {
        match self.apply_at(term, position) {
            Some((new_term, rule_name)) => {
                RewriteResult::success_at(new_term, position.clone(), rule_name)
            }
            None => RewriteResult::failure(),
        }
    }

    fn apply_at(&self, term: &TermRef, position: &Position) -> Option<(TermRef, String)> {
        let subterm = subterm_at(term, position)?;
        for rule in &self.rules {
            if let Some(new_subterm) = self.try_apply_rule(&subterm, rule) {
                if let Some(new_term) = replace_at(term, position, &new_subterm) {
                    return Some((new_term, rule.name().to_string()));
                }
            }
        }
        None
    }

    /// One outermost-leftmost rewrite step: the root first, then each
    /// child in natural order, recursively.
    pub fn rewrite_step(&self, term: &TermRef) -> RewriteResult {
        match self.step_inner(term) {
            Some((new_term, position, rule_name)) => {
                trace!(rule = %rule_name, position = %position, "rewrite step");
                RewriteResult::success_at(new_term, position, rule_name)
            }
            None => RewriteResult::failure(),
        }
    }

    fn step_inner(&self, term: &TermRef) -> Option<(TermRef, Position, String)> {
        if let Some((new_term, rule_name)) = self.apply_at(term, &Position::root()) {
            return Some((new_term, Position::root(), rule_name));
        }
        for i in 0..term.child_count() {
            let child = term.child(i)?;
            if let Some((new_child, position, rule_name)) = self.step_inner(child) {
                let new_term = term.with_child(i, new_child)?;
                return Some((new_term, position.prefixed_with(i), rule_name));
            }
        }
        None
    }

    /// Rewrites to a fixpoint or until the step budget runs out, returning
    /// the last term reached.
    pub fn normalize(&self, term: &TermRef, max_steps: usize) -> TermRef {
        let mut current = term.clone();
        for step in 0..max_steps {
            let result = self.rewrite_step(&current);
            if !result.success {
                debug!(steps = step, "normalized to fixpoint");
                return current;
            }
            if let Some(new_term) = result.term {
                current = new_term;
            }
        }
        current
    }

    /// Whether no rule applies anywhere in the term.
    pub fn is_normal_form(&self, term: &TermRef) -> bool {
        !self.rewrite_step(term).success
    }

    /// Whether both terms normalize to the same term within the budget.
    pub fn joinable(&self, term1: &TermRef, term2: &TermRef, max_steps: usize) -> bool {
        self.normalize(term1, max_steps) == self.normalize(term2, max_steps)
    }

    /// Every position in the term where the rule applies, in depth-first
    /// preorder.
    pub fn find_redex_positions(&self, term: &TermRef, rule: &RewriteRule) -> Vec<Position> {
        let mut positions = vec![];
        self.collect_redexes(term, rule, &Position::root(), &mut positions);
        positions
    }

    fn collect_redexes(
        &self,
        term: &TermRef,
        rule: &RewriteRule,
        prefix: &Position,
        out: &mut Vec<Position>,
    ) {
        if self.try_apply_rule(term, rule).is_some() {
            out.push(prefix.clone());
        }
        for i in 0..term.child_count() {
            if let Some(child) = term.child(i) {
                self.collect_redexes(child, rule, &prefix.descend(i), out);
            }
        }
    }
}
