use tracing::trace;

use crate::substitution::{substitute, Substitution};
use crate::term::{Term, TermRef};

/// The outcome of a unification attempt. Failure to unify is an ordinary
/// result, not an error; callers branch on `success`.
#[derive(Debug, Clone)]
pub struct UnificationResult {
    pub success: bool,
    pub substitution: Substitution,
    pub error: Option<String>,
}

impl UnificationResult {
    fn succeeded(substitution: Substitution) -> UnificationResult {
        UnificationResult {
            success: true,
            substitution,
            error: None,
        }
    }

    fn failed(message: &str) -> UnificationResult {
        UnificationResult {
            success: false,
            substitution: Substitution::new(),
            error: Some(message.to_string()),
        }
    }
}

/// Robinson unification with occurs check, producing a most general
/// unifier. `depth` is the number of binders enclosing both terms;
/// variables below it are bound and only unify structurally.
pub fn unify(term1: &TermRef, term2: &TermRef, depth: usize) -> UnificationResult {
    let mut substitution = Substitution::new();
    if unify_impl(term1, term2, &mut substitution, depth) {
        UnificationResult::succeeded(substitution)
    } else {
        trace!(left = %term1, right = %term2, "unification failed");
        UnificationResult::failed("terms cannot be unified")
    }
}

/// Same algorithm without materializing the substitution for the caller.
pub fn unifiable(term1: &TermRef, term2: &TermRef, depth: usize) -> bool {
    let mut substitution = Substitution::new();
    unify_impl(term1, term2, &mut substitution, depth)
}

fn unify_impl(
    term1: &TermRef,
    term2: &TermRef,
    substitution: &mut Substitution,
    depth: usize,
) -> bool {
    if term1 == term2 {
        return true;
    }

    // Resolve variables that are already bound before comparing.
    let t1 = substitute(term1, substitution, depth);
    let t2 = substitute(term2, substitution, depth);

    if t1 == t2 {
        return true;
    }

    // A free variable on either side gets bound to the other side, unless
    // it occurs there.
    if let Term::Variable { index, .. } = &*t1 {
        if *index >= depth {
            let k = index - depth;
            if occurs(k, &t2, depth) {
                return false;
            }
            return match scoped_binding(&t2, depth) {
                Some(value) => {
                    bind(substitution, k, value);
                    true
                }
                None => false,
            };
        }
    }
    if let Term::Variable { index, .. } = &*t2 {
        if *index >= depth {
            let k = index - depth;
            if occurs(k, &t1, depth) {
                return false;
            }
            return match scoped_binding(&t1, depth) {
                Some(value) => {
                    bind(substitution, k, value);
                    true
                }
                None => false,
            };
        }
    }

    match (&*t1, &*t2) {
        (Term::Constant { symbol: s1, .. }, Term::Constant { symbol: s2, .. }) => s1 == s2,
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
        ) => {
            if s1 != s2 || a1.len() != a2.len() {
                return false;
            }
            a1.iter()
                .zip(a2.iter())
                .all(|(x, y)| unify_impl(x, y, substitution, depth))
        }
        (Term::Forall { body: b1, .. }, Term::Forall { body: b2, .. }) => {
            unify_impl(b1, b2, substitution, depth + 1)
        }
        (Term::Exists { body: b1, .. }, Term::Exists { body: b2, .. }) => {
            unify_impl(b1, b2, substitution, depth + 1)
        }
        (
            Term::And { left: l1, right: r1 },
            Term::And { left: l2, right: r2 },
        ) => {
            unify_impl(l1, l2, substitution, depth) && unify_impl(r1, r2, substitution, depth)
        }
        (
            Term::Or { left: l1, right: r1 },
            Term::Or { left: l2, right: r2 },
        ) => {
            unify_impl(l1, l2, substitution, depth) && unify_impl(r1, r2, substitution, depth)
        }
        (
            Term::Implies {
                antecedent: a1,
                consequent: c1,
            },
            Term::Implies {
                antecedent: a2,
                consequent: c2,
            },
        ) => {
            unify_impl(a1, a2, substitution, depth) && unify_impl(c1, c2, substitution, depth)
        }
        (Term::Not { body: b1 }, Term::Not { body: b2 }) => {
            unify_impl(b1, b2, substitution, depth)
        }
        _ => false,
    }
}

/// Rebases a binding value captured at `depth` binders down to depth zero,
/// where the substitution stores its terms. A value that mentions one of
/// the enclosing bound variables cannot be expressed outside the binder,
/// so the unification must fail.
fn scoped_binding(value: &TermRef, depth: usize) -> Option<TermRef> {
    if depth == 0 {
        return Some(value.clone());
    }
    if value.free_variables(0).into_iter().any(|i| i < depth) {
        return None;
    }
    crate::substitution::shift(value, -(depth as i64), 0).ok()
}

/// Records a new binding, keeping the substitution in solved form: terms
/// already stored must not mention the newly bound variable, or a single
/// application of the result would not fully resolve it.
fn bind(substitution: &mut Substitution, k: usize, term: TermRef) {
    let binding = Substitution::singleton(k, term.clone());
    let updated: Vec<(usize, TermRef)> = substitution
        .iter()
        .map(|(i, t)| (i, substitute(t, &binding, 0)))
        .collect();
    for (i, t) in updated {
        substitution.insert(i, t);
    }
    substitution.insert(k, term);
}

/// Whether the variable with true index `target` occurs free in the term.
/// The depth tracks binders crossed during the traversal so that the same
/// variable is recognized at any nesting level.
fn occurs(target: usize, term: &TermRef, depth: usize) -> bool {
    match &**term {
        Term::Variable { index, .. } => *index >= depth && index - depth == target,
        Term::Constant { .. } => false,
        Term::Application { args, .. } => args.iter().any(|arg| occurs(target, arg, depth)),
        Term::Forall { body, .. } | Term::Exists { body, .. } => {
            occurs(target, body, depth + 1)
        }
        Term::And { left, right } | Term::Or { left, right } => {
            occurs(target, left, depth) || occurs(target, right, depth)
        }
        Term::Not { body } => occurs(target, body, depth),
        Term::Implies {
            antecedent,
            consequent,
        } => occurs(target, antecedent, depth) || occurs(target, consequent, depth),
    }
}

/// Composes two substitutions: the result first applies `subst1`, then
/// `subst2`. Bindings of `subst1` get `subst2` applied to their terms;
/// bindings only in `subst2` are carried over with `subst1` applied.
pub fn compose_substitutions(subst1: &Substitution, subst2: &Substitution) -> Substitution {
    let mut result = Substitution::new();
    for (k, term) in subst1.iter() {
        result.insert(k, substitute(term, subst2, 0));
    }
    for (k, term) in subst2.iter() {
        if !result.contains(k) {
            result.insert(k, substitute(term, subst1, 0));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::testing::arb_term;
    use proptest::prelude::*;

    #[test]
    fn test_unify_variable_with_constant() {
        let result = unify(&Term::variable(0), &Term::constant("a"), 0);
        assert!(result.success);
        assert_eq!(
            substitute(&Term::variable(0), &result.substitution, 0),
            Term::constant("a")
        );
    }

    #[test]
    fn test_occurs_check() {
        let result = unify(
            &Term::variable(0),
            &Term::app("f", vec![Term::variable(0)]),
            0,
        );
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_occurs_check_under_binder() {
        // The occurrence is nested under a quantifier, where the same free
        // variable appears with a shifted index.
        let nested = Term::app(
            "f",
            vec![Term::forall("x", Term::app("g", vec![Term::variable(1)]))],
        );
        let result = unify(&Term::variable(0), &nested, 0);
        assert!(!result.success);
    }

    #[test]
    fn test_unify_applications_pointwise() {
        // f(x0, c) and f(b, x1) unify with x0 -> b, x1 -> c.
        let t1 = Term::app("f", vec![Term::variable(0), Term::constant("c")]);
        let t2 = Term::app("f", vec![Term::constant("b"), Term::variable(1)]);
        let result = unify(&t1, &t2, 0);
        assert!(result.success);
        let u1 = substitute(&t1, &result.substitution, 0);
        let u2 = substitute(&t2, &result.substitution, 0);
        assert_eq!(u1, u2);
        assert_eq!(u1, Term::app("f", vec![Term::constant("b"), Term::constant("c")]));
    }

    #[test]
    fn test_symbol_mismatch_fails() {
        let t1 = Term::app("f", vec![Term::variable(0)]);
        let t2 = Term::app("g", vec![Term::variable(0)]);
        assert!(!unify(&t1, &t2, 0).success);
    }

    #[test]
    fn test_arity_mismatch_fails() {
        let t1 = Term::app("f", vec![Term::variable(0)]);
        let t2 = Term::app("f", vec![Term::variable(0), Term::variable(1)]);
        assert!(!unify(&t1, &t2, 0).success);
    }

    #[test]
    fn test_constant_unification() {
        assert!(unify(&Term::constant("a"), &Term::constant("a"), 0).success);
        assert!(!unify(&Term::constant("a"), &Term::constant("b"), 0).success);
    }

    #[test]
    fn test_different_connectives_fail() {
        let a = Term::constant("a");
        let b = Term::constant("b");
        let t1 = Term::and(a.clone(), b.clone());
        let t2 = Term::or(a, b);
        assert!(!unify(&t1, &t2, 0).success);
    }

    #[test]
    fn test_unify_under_binder() {
        // forall x. p(x0, x1) against forall x. p(x0, c): inside the binder
        // x1 is free with true index 0 and binds to c.
        let t1 = Term::forall(
            "x",
            Term::app("p", vec![Term::variable(0), Term::variable(1)]),
        );
        let t2 = Term::forall(
            "x",
            Term::app("p", vec![Term::variable(0), Term::constant("c")]),
        );
        let result = unify(&t1, &t2, 0);
        assert!(result.success);
        assert_eq!(
            substitute(&t1, &result.substitution, 0),
            substitute(&t2, &result.substitution, 0)
        );
    }

    #[test]
    fn test_bound_variables_only_unify_structurally() {
        let t1 = Term::forall("x", Term::variable(0));
        let t2 = Term::forall("x", Term::constant("c"));
        assert!(!unify(&t1, &t2, 0).success);
    }

    #[test]
    fn test_binding_cannot_escape_scope() {
        // In forall x. x1 the x1 is free; it cannot be unified with the
        // bound variable of the binder, since no substitution for it can
        // produce a bound occurrence.
        let t1 = Term::forall("x", Term::variable(1));
        let t2 = Term::forall("x", Term::variable(0));
        assert!(!unify(&t1, &t2, 0).success);
    }

    #[test]
    fn test_binding_under_binder_is_rebased() {
        // forall x. p(x1) against forall x. p(f(x2)): the free x1 (true
        // index 0) binds to f with the free x2 rebased out of the binder.
        let t1 = Term::forall("x", Term::app("p", vec![Term::variable(1)]));
        let t2 = Term::forall(
            "x",
            Term::app("p", vec![Term::app("f", vec![Term::variable(2)])]),
        );
        let result = unify(&t1, &t2, 0);
        assert!(result.success);
        assert_eq!(
            result.substitution.get(0),
            Some(&Term::app("f", vec![Term::variable(1)]))
        );
        assert_eq!(
            substitute(&t1, &result.substitution, 0),
            substitute(&t2, &result.substitution, 0)
        );
    }

    #[test]
    fn test_solved_form_is_idempotent() {
        // Binding x1 after x0 has been bound to a term mentioning x1 must
        // resolve the stored binding as well.
        let t1 = Term::app("f", vec![Term::variable(0), Term::variable(1)]);
        let t2 = Term::app(
            "f",
            vec![Term::app("g", vec![Term::variable(1)]), Term::constant("c")],
        );
        let result = unify(&t1, &t2, 0);
        assert!(result.success);
        let u1 = substitute(&t1, &result.substitution, 0);
        let u2 = substitute(&t2, &result.substitution, 0);
        assert_eq!(u1, u2);
    }

    #[test]
    fn test_bound_variables_equal() {
        let t1 = Term::forall("x", Term::variable(0));
        let t2 = Term::forall("y", Term::variable(0));
        assert!(unify(&t1, &t2, 0).success);
    }

    #[test]
    fn test_unifiable_matches_unify() {
        let t1 = Term::app("f", vec![Term::variable(0)]);
        let t2 = Term::app("f", vec![Term::constant("a")]);
        assert!(unifiable(&t1, &t2, 0));
        assert!(!unifiable(&t1, &Term::constant("a"), 0));
    }

    #[test]
    fn test_compose_substitutions() {
        // s1 = {0 -> f(x1)}, s2 = {1 -> a}.
        let s1 = Substitution::singleton(0, Term::app("f", vec![Term::variable(1)]));
        let s2 = Substitution::singleton(1, Term::constant("a"));
        let composed = compose_substitutions(&s1, &s2);

        // Applying the composition agrees with applying s1 then s2.
        for t in [
            Term::variable(0),
            Term::variable(1),
            Term::app("g", vec![Term::variable(0), Term::variable(1)]),
        ] {
            let chained = substitute(&substitute(&t, &s1, 0), &s2, 0);
            let direct = substitute(&t, &composed, 0);
            assert_eq!(chained, direct);
        }
    }

    proptest! {
        #[test]
        fn prop_unifier_equalizes(t1 in arb_term(), t2 in arb_term()) {
            let result = unify(&t1, &t2, 0);
            if result.success {
                let u1 = substitute(&t1, &result.substitution, 0);
                let u2 = substitute(&t2, &result.substitution, 0);
                prop_assert_eq!(u1, u2);
            }
        }

        #[test]
        fn prop_unification_is_symmetric(t1 in arb_term(), t2 in arb_term()) {
            prop_assert_eq!(unifiable(&t1, &t2, 0), unifiable(&t2, &t1, 0));
        }
    }
}
