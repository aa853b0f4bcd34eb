use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{KernelError, Result};
use crate::types::Type;

/// Terms are immutable and shared; constructing one always yields a fresh
/// node, but children may be aliased freely. Equality never depends on
/// pointer identity.
pub type TermRef = Arc<Term>;

/// A first-order formula in De Bruijn form. `Variable(i)` counts enclosing
/// binders from the innermost outward; an index at or beyond the ambient
/// binding depth denotes a free variable whose true index is `i - depth`.
///
/// Binder hints are cosmetic and ignored by equality and hashing, so
/// structural equality is alpha-equivalence. Type annotations are opaque:
/// the kernel stores and clones them but never interprets them.
#[derive(Debug, Clone)]
pub enum Term {
    Variable {
        index: usize,
        typ: Option<Type>,
    },
    Constant {
        symbol: String,
        typ: Option<Type>,
    },
    Application {
        symbol: String,
        args: Vec<TermRef>,
        typ: Option<Type>,
    },
    Forall {
        hint: String,
        body: TermRef,
    },
    Exists {
        hint: String,
        body: TermRef,
    },
    And {
        left: TermRef,
        right: TermRef,
    },
    Or {
        left: TermRef,
        right: TermRef,
    },
    Not {
        body: TermRef,
    },
    Implies {
        antecedent: TermRef,
        consequent: TermRef,
    },
}

/// The variant tag of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Variable,
    Constant,
    Application,
    Forall,
    Exists,
    And,
    Or,
    Not,
    Implies,
}

// Each variant mixes a distinct salt into its hash. The binder variants do
// not mix the hint, so hashing agrees with alpha-equivalence.
const VARIABLE_SALT: u64 = 0x012345;
const CONSTANT_SALT: u64 = 0x6789ab;
const APPLICATION_SALT: u64 = 0xabcdef;
const FORALL_SALT: u64 = 0x123456;
const EXISTS_SALT: u64 = 0x234567;
const AND_SALT: u64 = 0x345678;
const OR_SALT: u64 = 0x456789;
const NOT_SALT: u64 = 0x567890;
const IMPLIES_SALT: u64 = 0x678901;

impl Term {
    pub fn variable(index: usize) -> TermRef {
        Arc::new(Term::Variable { index, typ: None })
    }

    pub fn variable_typed(index: usize, typ: Type) -> TermRef {
        Arc::new(Term::Variable {
            index,
            typ: Some(typ),
        })
    }

    pub fn constant(symbol: &str) -> TermRef {
        Arc::new(Term::Constant {
            symbol: symbol.to_string(),
            typ: None,
        })
    }

    pub fn constant_typed(symbol: &str, typ: Type) -> TermRef {
        Arc::new(Term::Constant {
            symbol: symbol.to_string(),
            typ: Some(typ),
        })
    }

    pub fn app(symbol: &str, args: Vec<TermRef>) -> TermRef {
        Arc::new(Term::Application {
            symbol: symbol.to_string(),
            args,
            typ: None,
        })
    }

    pub fn app_typed(symbol: &str, args: Vec<TermRef>, typ: Type) -> TermRef {
        Arc::new(Term::Application {
            symbol: symbol.to_string(),
            args,
            typ: Some(typ),
        })
    }

    pub fn forall(hint: &str, body: TermRef) -> TermRef {
        Arc::new(Term::Forall {
            hint: hint.to_string(),
            body,
        })
    }

    pub fn exists(hint: &str, body: TermRef) -> TermRef {
        Arc::new(Term::Exists {
            hint: hint.to_string(),
            body,
        })
    }

    pub fn and(left: TermRef, right: TermRef) -> TermRef {
        Arc::new(Term::And { left, right })
    }

    pub fn or(left: TermRef, right: TermRef) -> TermRef {
        Arc::new(Term::Or { left, right })
    }

    pub fn not(body: TermRef) -> TermRef {
        Arc::new(Term::Not { body })
    }

    pub fn implies(antecedent: TermRef, consequent: TermRef) -> TermRef {
        Arc::new(Term::Implies {
            antecedent,
            consequent,
        })
    }

    /// The equality predicate is the special form `=(l, r)`.
    pub fn equality(left: TermRef, right: TermRef) -> TermRef {
        Term::app("=", vec![left, right])
    }

    pub fn kind(&self) -> TermKind {
        match self {
            Term::Variable { .. } => TermKind::Variable,
            Term::Constant { .. } => TermKind::Constant,
            Term::Application { .. } => TermKind::Application,
            Term::Forall { .. } => TermKind::Forall,
            Term::Exists { .. } => TermKind::Exists,
            Term::And { .. } => TermKind::And,
            Term::Or { .. } => TermKind::Or,
            Term::Not { .. } => TermKind::Not,
            Term::Implies { .. } => TermKind::Implies,
        }
    }

    /// The type annotation, for the variants that carry one.
    pub fn typ(&self) -> Option<&Type> {
        match self {
            Term::Variable { typ, .. }
            | Term::Constant { typ, .. }
            | Term::Application { typ, .. } => typ.as_ref(),
            _ => None,
        }
    }

    pub fn is_equality(&self) -> bool {
        match self {
            Term::Application { symbol, args, .. } => symbol == "=" && args.len() == 2,
            _ => false,
        }
    }

    /// The two sides of an equality. Calling this on anything else is a
    /// caller error, reported as such.
    pub fn equality_sides(&self) -> Result<(TermRef, TermRef)> {
        match self {
            Term::Application { symbol, args, .. } if symbol == "=" && args.len() == 2 => {
                Ok((args[0].clone(), args[1].clone()))
            }
            _ => Err(KernelError::NotAnEquality),
        }
    }

    /// Collects the true indices of all variables free relative to `depth`:
    /// a `Variable(i)` with `i >= depth` contributes `i - depth`. The depth
    /// increases under binders.
    pub fn free_variables(&self, depth: usize) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        self.collect_free_variables(depth, &mut out);
        out
    }

    fn collect_free_variables(&self, depth: usize, out: &mut BTreeSet<usize>) {
        match self {
            Term::Variable { index, .. } => {
                if *index >= depth {
                    out.insert(*index - depth);
                }
            }
            Term::Constant { .. } => {}
            Term::Application { args, .. } => {
                for arg in args {
                    arg.collect_free_variables(depth, out);
                }
            }
            Term::Forall { body, .. } | Term::Exists { body, .. } => {
                body.collect_free_variables(depth + 1, out);
            }
            Term::And { left, right } | Term::Or { left, right } => {
                left.collect_free_variables(depth, out);
                right.collect_free_variables(depth, out);
            }
            Term::Not { body } => body.collect_free_variables(depth, out),
            Term::Implies {
                antecedent,
                consequent,
            } => {
                antecedent.collect_free_variables(depth, out);
                consequent.collect_free_variables(depth, out);
            }
        }
    }

    /// The largest true free index, or 0 when the term is closed.
    pub fn max_variable_index(&self, depth: usize) -> usize {
        self.free_variables(depth)
            .into_iter()
            .next_back()
            .unwrap_or(0)
    }

    /// The number of addressable children, following the position scheme:
    /// applications expose their arguments, binary connectives expose left
    /// and right, unary forms expose their body, leaves expose nothing.
    pub fn child_count(&self) -> usize {
        match self {
            Term::Variable { .. } | Term::Constant { .. } => 0,
            Term::Application { args, .. } => args.len(),
            Term::Forall { .. } | Term::Exists { .. } | Term::Not { .. } => 1,
            Term::And { .. } | Term::Or { .. } | Term::Implies { .. } => 2,
        }
    }

    pub fn child(&self, index: usize) -> Option<&TermRef> {
        match self {
            Term::Variable { .. } | Term::Constant { .. } => None,
            Term::Application { args, .. } => args.get(index),
            Term::Forall { body, .. } | Term::Exists { body, .. } | Term::Not { body } => {
                if index == 0 {
                    Some(body)
                } else {
                    None
                }
            }
            Term::And { left, right } | Term::Or { left, right } => match index {
                0 => Some(left),
                1 => Some(right),
                _ => None,
            },
            Term::Implies {
                antecedent,
                consequent,
            } => match index {
                0 => Some(antecedent),
                1 => Some(consequent),
                _ => None,
            },
        }
    }

    /// Rebuilds this node with child `index` replaced, keeping symbols,
    /// hints, and type annotations. Returns None when the index does not
    /// address a child.
    pub fn with_child(&self, index: usize, new_child: TermRef) -> Option<TermRef> {
        match self {
            Term::Variable { .. } | Term::Constant { .. } => None,
            Term::Application { symbol, args, typ } => {
                if index >= args.len() {
                    return None;
                }
                let mut new_args = args.clone();
                new_args[index] = new_child;
                Some(Arc::new(Term::Application {
                    symbol: symbol.clone(),
                    args: new_args,
                    typ: typ.clone(),
                }))
            }
            Term::Forall { hint, .. } => {
                if index != 0 {
                    return None;
                }
                Some(Term::forall(hint, new_child))
            }
            Term::Exists { hint, .. } => {
                if index != 0 {
                    return None;
                }
                Some(Term::exists(hint, new_child))
            }
            Term::Not { .. } => {
                if index != 0 {
                    return None;
                }
                Some(Term::not(new_child))
            }
            Term::And { left, right } => match index {
                0 => Some(Term::and(new_child, right.clone())),
                1 => Some(Term::and(left.clone(), new_child)),
                _ => None,
            },
            Term::Or { left, right } => match index {
                0 => Some(Term::or(new_child, right.clone())),
                1 => Some(Term::or(left.clone(), new_child)),
                _ => None,
            },
            Term::Implies {
                antecedent,
                consequent,
            } => match index {
                0 => Some(Term::implies(new_child, consequent.clone())),
                1 => Some(Term::implies(antecedent.clone(), new_child)),
                _ => None,
            },
        }
    }

    /// A 64-bit structural hash, consistent with equality.
    pub fn term_hash(&self) -> u64 {
        fxhash::hash64(self)
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Term) -> bool {
        match (self, other) {
            (Term::Variable { index: a, .. }, Term::Variable { index: b, .. }) => a == b,
            (Term::Constant { symbol: a, .. }, Term::Constant { symbol: b, .. }) => a == b,
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
            ) => s1 == s2 && a1.len() == a2.len() && a1.iter().zip(a2.iter()).all(|(x, y)| x == y),
            // The hint is not part of equality.
            (Term::Forall { body: a, .. }, Term::Forall { body: b, .. }) => a == b,
            (Term::Exists { body: a, .. }, Term::Exists { body: b, .. }) => a == b,
            (
                Term::And { left: l1, right: r1 },
                Term::And { left: l2, right: r2 },
            ) => l1 == l2 && r1 == r2,
            (
                Term::Or { left: l1, right: r1 },
                Term::Or { left: l2, right: r2 },
            ) => l1 == l2 && r1 == r2,
            (Term::Not { body: a }, Term::Not { body: b }) => a == b,
            (
                Term::Implies {
                    antecedent: a1,
                    consequent: c1,
                },
                Term::Implies {
                    antecedent: a2,
                    consequent: c2,
                },
            ) => a1 == a2 && c1 == c2,
            _ => false,
        }
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Term::Variable { index, .. } => {
                VARIABLE_SALT.hash(state);
                index.hash(state);
            }
            Term::Constant { symbol, .. } => {
                CONSTANT_SALT.hash(state);
                symbol.hash(state);
            }
            Term::Application { symbol, args, .. } => {
                APPLICATION_SALT.hash(state);
                symbol.hash(state);
                for arg in args {
                    arg.hash(state);
                }
            }
            Term::Forall { body, .. } => {
                FORALL_SALT.hash(state);
                body.hash(state);
            }
            Term::Exists { body, .. } => {
                EXISTS_SALT.hash(state);
                body.hash(state);
            }
            Term::And { left, right } => {
                AND_SALT.hash(state);
                left.hash(state);
                right.hash(state);
            }
            Term::Or { left, right } => {
                OR_SALT.hash(state);
                left.hash(state);
                right.hash(state);
            }
            Term::Not { body } => {
                NOT_SALT.hash(state);
                body.hash(state);
            }
            Term::Implies {
                antecedent,
                consequent,
            } => {
                IMPLIES_SALT.hash(state);
                antecedent.hash(state);
                consequent.hash(state);
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Variable { index, .. } => write!(f, "x{}", index),
            Term::Constant { symbol, .. } => write!(f, "{}", symbol),
            Term::Application { symbol, args, .. } => {
                if symbol == "=" && args.len() == 2 {
                    return write!(f, "{} = {}", args[0], args[1]);
                }
                write!(f, "{}(", symbol)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Term::Forall { hint, body } => {
                let h = if hint.is_empty() { "_" } else { hint.as_str() };
                write!(f, "forall {}. {}", h, body)
            }
            Term::Exists { hint, body } => {
                let h = if hint.is_empty() { "_" } else { hint.as_str() };
                write!(f, "exists {}. {}", h, body)
            }
            Term::And { left, right } => write!(f, "({} & {})", left, right),
            Term::Or { left, right } => write!(f, "({} | {})", left, right),
            Term::Not { body } => write!(f, "!{}", body),
            Term::Implies {
                antecedent,
                consequent,
            } => write!(f, "({} -> {})", antecedent, consequent),
        }
    }
}
