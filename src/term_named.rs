use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::gensym::gensym;
use crate::term::{Term, TermRef};
use crate::types::Type;

pub type NamedTermRef = Arc<NamedTerm>;

/// The named mirror of the De Bruijn term form, used at the I/O boundary.
/// Unlike the DB form, equality here is strict: binder names matter, and
/// `forall x. p(x)` differs from `forall y. p(y)`. Correspondence with the
/// DB form is established only through `to_db` and `to_named`.
#[derive(Debug, Clone)]
pub enum NamedTerm {
    Variable {
        name: String,
        typ: Option<Type>,
    },
    Constant {
        name: String,
        typ: Option<Type>,
    },
    Application {
        name: String,
        args: Vec<NamedTermRef>,
        typ: Option<Type>,
    },
    Forall {
        var: String,
        body: NamedTermRef,
    },
    Exists {
        var: String,
        body: NamedTermRef,
    },
    And {
        left: NamedTermRef,
        right: NamedTermRef,
    },
    Or {
        left: NamedTermRef,
        right: NamedTermRef,
    },
    Not {
        body: NamedTermRef,
    },
    Implies {
        antecedent: NamedTermRef,
        consequent: NamedTermRef,
    },
}

// Free variables cross the boundary as "free_k" where k is the true index.
const FREE_PREFIX: &str = "free_";

impl NamedTerm {
    pub fn variable(name: &str) -> NamedTermRef {
        Arc::new(NamedTerm::Variable {
            name: name.to_string(),
            typ: None,
        })
    }

    pub fn constant(name: &str) -> NamedTermRef {
        Arc::new(NamedTerm::Constant {
            name: name.to_string(),
            typ: None,
        })
    }

    pub fn constant_typed(name: &str, typ: Type) -> NamedTermRef {
        Arc::new(NamedTerm::Constant {
            name: name.to_string(),
            typ: Some(typ),
        })
    }

    pub fn app(name: &str, args: Vec<NamedTermRef>) -> NamedTermRef {
        Arc::new(NamedTerm::Application {
            name: name.to_string(),
            args,
            typ: None,
        })
    }

    pub fn forall(var: &str, body: NamedTermRef) -> NamedTermRef {
        Arc::new(NamedTerm::Forall {
            var: var.to_string(),
            body,
        })
    }

    pub fn exists(var: &str, body: NamedTermRef) -> NamedTermRef {
        Arc::new(NamedTerm::Exists {
            var: var.to_string(),
            body,
        })
    }

    pub fn and(left: NamedTermRef, right: NamedTermRef) -> NamedTermRef {
        Arc::new(NamedTerm::And { left, right })
    }

    pub fn or(left: NamedTermRef, right: NamedTermRef) -> NamedTermRef {
        Arc::new(NamedTerm::Or { left, right })
    }

    pub fn not(body: NamedTermRef) -> NamedTermRef {
        Arc::new(NamedTerm::Not { body })
    }

    pub fn implies(antecedent: NamedTermRef, consequent: NamedTermRef) -> NamedTermRef {
        Arc::new(NamedTerm::Implies {
            antecedent,
            consequent,
        })
    }
}

impl PartialEq for NamedTerm {
    fn eq(&self, other: &NamedTerm) -> bool {
        match (self, other) {
            (NamedTerm::Variable { name: a, .. }, NamedTerm::Variable { name: b, .. }) => a == b,
            (NamedTerm::Constant { name: a, .. }, NamedTerm::Constant { name: b, .. }) => a == b,
            (
                NamedTerm::Application {
                    name: n1, args: a1, ..
                },
                NamedTerm::Application {
                    name: n2, args: a2, ..
                },
            ) => n1 == n2 && a1 == a2,
            (
                NamedTerm::Forall { var: v1, body: b1 },
                NamedTerm::Forall { var: v2, body: b2 },
            ) => v1 == v2 && b1 == b2,
            (
                NamedTerm::Exists { var: v1, body: b1 },
                NamedTerm::Exists { var: v2, body: b2 },
            ) => v1 == v2 && b1 == b2,
            (
                NamedTerm::And { left: l1, right: r1 },
                NamedTerm::And { left: l2, right: r2 },
            ) => l1 == l2 && r1 == r2,
            (
                NamedTerm::Or { left: l1, right: r1 },
                NamedTerm::Or { left: l2, right: r2 },
            ) => l1 == l2 && r1 == r2,
            (NamedTerm::Not { body: a }, NamedTerm::Not { body: b }) => a == b,
            (
                NamedTerm::Implies {
                    antecedent: a1,
                    consequent: c1,
                },
                NamedTerm::Implies {
                    antecedent: a2,
                    consequent: c2,
                },
            ) => a1 == a2 && c1 == c2,
            _ => false,
        }
    }
}

impl Eq for NamedTerm {}

impl Hash for NamedTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            NamedTerm::Variable { name, .. } => {
                0u8.hash(state);
                name.hash(state);
            }
            NamedTerm::Constant { name, .. } => {
                1u8.hash(state);
                name.hash(state);
            }
            NamedTerm::Application { name, args, .. } => {
                2u8.hash(state);
                name.hash(state);
                for arg in args {
                    arg.hash(state);
                }
            }
            NamedTerm::Forall { var, body } => {
                3u8.hash(state);
                var.hash(state);
                body.hash(state);
            }
            NamedTerm::Exists { var, body } => {
                4u8.hash(state);
                var.hash(state);
                body.hash(state);
            }
            NamedTerm::And { left, right } => {
                5u8.hash(state);
                left.hash(state);
                right.hash(state);
            }
            NamedTerm::Or { left, right } => {
                6u8.hash(state);
                left.hash(state);
                right.hash(state);
            }
            NamedTerm::Not { body } => {
                7u8.hash(state);
                body.hash(state);
            }
            NamedTerm::Implies {
                antecedent,
                consequent,
            } => {
                8u8.hash(state);
                antecedent.hash(state);
                consequent.hash(state);
            }
        }
    }
}

impl fmt::Display for NamedTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NamedTerm::Variable { name, .. } | NamedTerm::Constant { name, .. } => {
                write!(f, "{}", name)
            }
            NamedTerm::Application { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            NamedTerm::Forall { var, body } => write!(f, "forall {}. {}", var, body),
            NamedTerm::Exists { var, body } => write!(f, "exists {}. {}", var, body),
            NamedTerm::And { left, right } => write!(f, "({} & {})", left, right),
            NamedTerm::Or { left, right } => write!(f, "({} | {})", left, right),
            NamedTerm::Not { body } => write!(f, "!{}", body),
            NamedTerm::Implies {
                antecedent,
                consequent,
            } => write!(f, "({} -> {})", antecedent, consequent),
        }
    }
}

/// A stack of binder names, innermost last. Index 0 refers to the most
/// recently pushed name.
#[derive(Debug, Clone, Default)]
pub struct NameContext {
    names: Vec<String>,
}

impl NameContext {
    pub fn new() -> NameContext {
        NameContext { names: vec![] }
    }

    pub fn push(&mut self, name: &str) {
        self.names.push(name.to_string());
    }

    pub fn pop(&mut self) {
        self.names.pop();
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// The name for a De Bruijn index at the current depth. Indices beyond
    /// the stack denote free variables and render as `free_k` with k the
    /// true index.
    pub fn name_for_index(&self, index: usize) -> String {
        if index < self.names.len() {
            self.names[self.names.len() - 1 - index].clone()
        } else {
            format!("{}{}", FREE_PREFIX, index - self.names.len())
        }
    }

    /// The De Bruijn index of a bound name, resolving to the innermost
    /// binder on shadowing. None when the name is not in scope.
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.names.iter().rev().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Converts a named term to De Bruijn form. Bound names resolve to their
/// binder distance; `free_k` names become free variables with true index k;
/// any other unbound name becomes the free variable with true index 0.
pub fn to_db(term: &NamedTermRef) -> TermRef {
    let mut context = NameContext::new();
    to_db_helper(term, &mut context)
}

fn to_db_helper(term: &NamedTermRef, context: &mut NameContext) -> TermRef {
    match &**term {
        NamedTerm::Variable { name, typ } => {
            if let Some(index) = context.index_for_name(name) {
                return Arc::new(Term::Variable {
                    index,
                    typ: typ.clone(),
                });
            }
            let true_index = name
                .strip_prefix(FREE_PREFIX)
                .and_then(|rest| rest.parse::<usize>().ok())
                .unwrap_or(0);
            Arc::new(Term::Variable {
                index: context.depth() + true_index,
                typ: typ.clone(),
            })
        }
        NamedTerm::Constant { name, typ } => Arc::new(Term::Constant {
            symbol: name.clone(),
            typ: typ.clone(),
        }),
        NamedTerm::Application { name, args, typ } => Arc::new(Term::Application {
            symbol: name.clone(),
            args: args.iter().map(|arg| to_db_helper(arg, context)).collect(),
            typ: typ.clone(),
        }),
        NamedTerm::Forall { var, body } => {
            context.push(var);
            let body_db = to_db_helper(body, context);
            context.pop();
            Term::forall(var, body_db)
        }
        NamedTerm::Exists { var, body } => {
            context.push(var);
            let body_db = to_db_helper(body, context);
            context.pop();
            Term::exists(var, body_db)
        }
        NamedTerm::And { left, right } => Term::and(
            to_db_helper(left, context),
            to_db_helper(right, context),
        ),
        NamedTerm::Or { left, right } => Term::or(
            to_db_helper(left, context),
            to_db_helper(right, context),
        ),
        NamedTerm::Not { body } => Term::not(to_db_helper(body, context)),
        NamedTerm::Implies {
            antecedent,
            consequent,
        } => Term::implies(
            to_db_helper(antecedent, context),
            to_db_helper(consequent, context),
        ),
    }
}

/// Converts a De Bruijn term to named form. Binder hints are reused when
/// possible; an empty or shadowing hint is replaced by a fresh `x_N` so no
/// name in the output shadows another.
pub fn to_named(term: &TermRef) -> NamedTermRef {
    let mut context = NameContext::new();
    to_named_helper(term, &mut context)
}

fn to_named_helper(term: &TermRef, context: &mut NameContext) -> NamedTermRef {
    match &**term {
        Term::Variable { index, typ } => Arc::new(NamedTerm::Variable {
            name: context.name_for_index(*index),
            typ: typ.clone(),
        }),
        Term::Constant { symbol, typ } => Arc::new(NamedTerm::Constant {
            name: symbol.clone(),
            typ: typ.clone(),
        }),
        Term::Application { symbol, args, typ } => Arc::new(NamedTerm::Application {
            name: symbol.clone(),
            args: args
                .iter()
                .map(|arg| to_named_helper(arg, context))
                .collect(),
            typ: typ.clone(),
        }),
        Term::Forall { hint, body } => {
            let var = binder_name(hint, context);
            context.push(&var);
            let body_named = to_named_helper(body, context);
            context.pop();
            NamedTerm::forall(&var, body_named)
        }
        Term::Exists { hint, body } => {
            let var = binder_name(hint, context);
            context.push(&var);
            let body_named = to_named_helper(body, context);
            context.pop();
            NamedTerm::exists(&var, body_named)
        }
        Term::And { left, right } => NamedTerm::and(
            to_named_helper(left, context),
            to_named_helper(right, context),
        ),
        Term::Or { left, right } => NamedTerm::or(
            to_named_helper(left, context),
            to_named_helper(right, context),
        ),
        Term::Not { body } => NamedTerm::not(to_named_helper(body, context)),
        Term::Implies {
            antecedent,
            consequent,
        } => NamedTerm::implies(
            to_named_helper(antecedent, context),
            to_named_helper(consequent, context),
        ),
    }
}

fn binder_name(hint: &str, context: &NameContext) -> String {
    if hint.is_empty() || context.contains(hint) {
        gensym("x")
    } else {
        hint.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_equality_is_strict() {
        let t1 = NamedTerm::forall("x", NamedTerm::app("p", vec![NamedTerm::variable("x")]));
        let t2 = NamedTerm::forall("y", NamedTerm::app("p", vec![NamedTerm::variable("y")]));
        assert_ne!(t1, t2);
        assert_eq!(t1, t1.clone());
    }

    #[test]
    fn test_to_db_resolves_innermost_binder() {
        // forall x. forall y. p(x, y) becomes forall. forall. p(x1, x0)
        let named = NamedTerm::forall(
            "x",
            NamedTerm::forall(
                "y",
                NamedTerm::app(
                    "p",
                    vec![NamedTerm::variable("x"), NamedTerm::variable("y")],
                ),
            ),
        );
        let db = to_db(&named);
        let expected = Term::forall(
            "x",
            Term::forall(
                "y",
                Term::app("p", vec![Term::variable(1), Term::variable(0)]),
            ),
        );
        assert_eq!(db, expected);
    }

    #[test]
    fn test_to_db_shadowing_resolves_to_inner() {
        // forall x. forall x. p(x): the occurrence binds to the inner x.
        let named = NamedTerm::forall(
            "x",
            NamedTerm::forall("x", NamedTerm::app("p", vec![NamedTerm::variable("x")])),
        );
        let db = to_db(&named);
        let expected = Term::forall(
            "x",
            Term::forall("x", Term::app("p", vec![Term::variable(0)])),
        );
        assert_eq!(db, expected);
    }

    #[test]
    fn test_db_to_named_roundtrip_closed_term() {
        let db = Term::forall(
            "x",
            Term::implies(
                Term::app("p", vec![Term::variable(0)]),
                Term::exists("y", Term::app("q", vec![Term::variable(0), Term::variable(1)])),
            ),
        );
        let named = to_named(&db);
        assert_eq!(to_db(&named), db);
    }

    #[test]
    fn test_db_to_named_roundtrip_open_term() {
        // Free variables survive the roundtrip through the free_k naming.
        let db = Term::and(
            Term::variable(2),
            Term::forall("x", Term::app("p", vec![Term::variable(0), Term::variable(3)])),
        );
        let named = to_named(&db);
        assert_eq!(to_db(&named), db);
    }

    #[test]
    fn test_free_variable_names() {
        let db = Term::forall("x", Term::app("p", vec![Term::variable(1)]));
        let named = to_named(&db);
        match &*named {
            NamedTerm::Forall { body, .. } => match &**body {
                NamedTerm::Application { args, .. } => match &*args[0] {
                    NamedTerm::Variable { name, .. } => assert_eq!(name, "free_0"),
                    other => panic!("expected a variable, got {:?}", other),
                },
                other => panic!("expected an application, got {:?}", other),
            },
            other => panic!("expected a forall, got {:?}", other),
        }
    }

    #[test]
    fn test_to_named_freshens_shadowed_hints() {
        // Both binders hint "x"; the inner one must get a fresh name.
        let db = Term::forall(
            "x",
            Term::forall(
                "x",
                Term::app("p", vec![Term::variable(0), Term::variable(1)]),
            ),
        );
        let named = to_named(&db);
        match &*named {
            NamedTerm::Forall { var: outer, body } => match &**body {
                NamedTerm::Forall { var: inner, .. } => {
                    assert_eq!(outer, "x");
                    assert_ne!(inner, outer);
                }
                other => panic!("expected a forall, got {:?}", other),
            },
            other => panic!("expected a forall, got {:?}", other),
        }
        // Either way the structure is preserved.
        assert_eq!(to_db(&named), db);
    }

    #[test]
    fn test_to_named_freshens_empty_hints() {
        let db = Term::exists("", Term::variable(0));
        let named = to_named(&db);
        match &*named {
            NamedTerm::Exists { var, .. } => assert!(!var.is_empty()),
            other => panic!("expected an exists, got {:?}", other),
        }
        assert_eq!(to_db(&named), db);
    }

    #[test]
    fn test_named_to_db_roundtrip() {
        let named = NamedTerm::implies(
            NamedTerm::forall("x", NamedTerm::app("p", vec![NamedTerm::variable("x")])),
            NamedTerm::app("p", vec![NamedTerm::constant("c")]),
        );
        let db = to_db(&named);
        let back = to_named(&db);
        assert_eq!(back, named);
    }

    #[test]
    fn test_type_annotations_survive_conversion() {
        use crate::types::Type;
        let named = NamedTerm::constant_typed("zero", Type::int());
        let db = to_db(&named);
        assert_eq!(db.typ(), Some(&Type::int()));
        let back = to_named(&db);
        match &*back {
            NamedTerm::Constant { typ, .. } => assert_eq!(typ.as_ref(), Some(&Type::int())),
            other => panic!("expected a constant, got {:?}", other),
        }
    }
}
