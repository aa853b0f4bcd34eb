use std::collections::BTreeMap;
use std::fmt;

use fxhash::FxHashMap;

/// A type annotation. The term kernel carries these on variables, constants,
/// and function applications as opaque data: it clones them but never
/// consults them during term unification. The type system has its own
/// unification, below, which is independent of the term-level one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Primitive types like Int or Bool.
    Base(String),

    /// Type variables for polymorphism.
    Variable(String),

    /// Functions from argument types to a return type.
    Function { args: Vec<Type>, ret: Box<Type> },

    /// Tuples of types.
    Product(Vec<Type>),

    /// Record types with named fields, kept sorted by field name.
    Record(BTreeMap<String, Type>),

    /// Tagged unions, a list of (constructor name, argument types).
    Sum(Vec<(String, Vec<Type>)>),

    /// The type of logical formulas.
    Prop,
}

impl Type {
    pub fn base(name: &str) -> Type {
        Type::Base(name.to_string())
    }

    pub fn variable(name: &str) -> Type {
        Type::Variable(name.to_string())
    }

    pub fn function(args: Vec<Type>, ret: Type) -> Type {
        Type::Function {
            args,
            ret: Box::new(ret),
        }
    }

    pub fn product(components: Vec<Type>) -> Type {
        Type::Product(components)
    }

    pub fn record(fields: Vec<(&str, Type)>) -> Type {
        Type::Record(
            fields
                .into_iter()
                .map(|(name, typ)| (name.to_string(), typ))
                .collect(),
        )
    }

    pub fn sum(constructors: Vec<(&str, Vec<Type>)>) -> Type {
        Type::Sum(
            constructors
                .into_iter()
                .map(|(name, args)| (name.to_string(), args))
                .collect(),
        )
    }

    pub fn int() -> Type {
        Type::base("Int")
    }

    pub fn real() -> Type {
        Type::base("Real")
    }

    pub fn boolean() -> Type {
        Type::base("Bool")
    }

    pub fn string() -> Type {
        Type::base("String")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Base(name) => write!(f, "{}", name),
            Type::Variable(name) => write!(f, "{}", name),
            Type::Function { args, ret } => {
                if args.len() == 1 {
                    write!(f, "{} -> {}", args[0], ret)
                } else {
                    write!(f, "(")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ") -> {}", ret)
                }
            }
            Type::Product(components) => {
                write!(f, "(")?;
                for (i, c) in components.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            Type::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, typ)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, typ)?;
                }
                write!(f, "}}")
            }
            Type::Sum(constructors) => {
                for (i, (name, args)) in constructors.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", name)?;
                    if !args.is_empty() {
                        write!(f, "(")?;
                        for (j, arg) in args.iter().enumerate() {
                            if j > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", arg)?;
                        }
                        write!(f, ")")?;
                    }
                }
                Ok(())
            }
            Type::Prop => write!(f, "Prop"),
        }
    }
}

/// Bindings from type variable names to types, built up during unification.
pub type TypeSubstitution = FxHashMap<String, Type>;

/// Chases variable bindings until reaching an unbound variable or a
/// non-variable type.
fn resolve<'a>(mut typ: &'a Type, subst: &'a TypeSubstitution) -> &'a Type {
    while let Type::Variable(name) = typ {
        match subst.get(name) {
            Some(bound) => typ = bound,
            None => break,
        }
    }
    typ
}

/// Whether the variable occurs in the type, looking through bindings.
/// Binding a variable to a type containing it would create an infinite type.
fn occurs(name: &str, typ: &Type, subst: &TypeSubstitution) -> bool {
    match resolve(typ, subst) {
        Type::Variable(other) => other == name,
        Type::Base(_) | Type::Prop => false,
        Type::Function { args, ret } => {
            args.iter().any(|a| occurs(name, a, subst)) || occurs(name, &**ret, subst)
        }
        Type::Product(components) => components.iter().any(|c| occurs(name, c, subst)),
        Type::Record(fields) => fields.values().any(|t| occurs(name, t, subst)),
        Type::Sum(constructors) => constructors
            .iter()
            .any(|(_, args)| args.iter().any(|a| occurs(name, a, subst))),
    }
}

/// Unifies two types, extending the substitution with any new bindings.
/// Returns false and leaves the substitution in a partially extended state
/// when the types cannot be unified.
pub fn unify_types(t1: &Type, t2: &Type, subst: &mut TypeSubstitution) -> bool {
    let t1 = resolve(t1, subst).clone();
    let t2 = resolve(t2, subst).clone();

    if t1 == t2 {
        return true;
    }

    match (t1, t2) {
        (Type::Variable(name), other) | (other, Type::Variable(name)) => {
            if occurs(&name, &other, subst) {
                return false;
            }
            subst.insert(name, other);
            true
        }
        (
            Type::Function { args: a1, ret: r1 },
            Type::Function { args: a2, ret: r2 },
        ) => {
            if a1.len() != a2.len() {
                return false;
            }
            for (x, y) in a1.iter().zip(a2.iter()) {
                if !unify_types(x, y, subst) {
                    return false;
                }
            }
            unify_types(r1.as_ref(), r2.as_ref(), subst)
        }
        (Type::Product(c1), Type::Product(c2)) => {
            c1.len() == c2.len()
                && c1
                    .iter()
                    .zip(c2.iter())
                    .all(|(x, y)| unify_types(x, y, subst))
        }
        (Type::Record(f1), Type::Record(f2)) => {
            if f1.len() != f2.len() {
                return false;
            }
            for ((n1, t1), (n2, t2)) in f1.iter().zip(f2.iter()) {
                if n1 != n2 || !unify_types(t1, t2, subst) {
                    return false;
                }
            }
            true
        }
        (Type::Sum(c1), Type::Sum(c2)) => {
            if c1.len() != c2.len() {
                return false;
            }
            for ((n1, a1), (n2, a2)) in c1.iter().zip(c2.iter()) {
                if n1 != n2 || a1.len() != a2.len() {
                    return false;
                }
                for (x, y) in a1.iter().zip(a2.iter()) {
                    if !unify_types(x, y, subst) {
                        return false;
                    }
                }
            }
            true
        }
        _ => false,
    }
}

/// Applies a substitution to a type, replacing bound variables throughout.
pub fn apply_type_substitution(typ: &Type, subst: &TypeSubstitution) -> Type {
    match resolve(typ, subst) {
        Type::Base(name) => Type::Base(name.clone()),
        Type::Variable(name) => Type::Variable(name.clone()),
        Type::Function { args, ret } => Type::Function {
            args: args
                .iter()
                .map(|a| apply_type_substitution(a, subst))
                .collect(),
            ret: Box::new(apply_type_substitution(&**ret, subst)),
        },
        Type::Product(components) => Type::Product(
            components
                .iter()
                .map(|c| apply_type_substitution(c, subst))
                .collect(),
        ),
        Type::Record(fields) => Type::Record(
            fields
                .iter()
                .map(|(name, t)| (name.clone(), apply_type_substitution(t, subst)))
                .collect(),
        ),
        Type::Sum(constructors) => Type::Sum(
            constructors
                .iter()
                .map(|(name, args)| {
                    (
                        name.clone(),
                        args.iter()
                            .map(|a| apply_type_substitution(a, subst))
                            .collect(),
                    )
                })
                .collect(),
        ),
        Type::Prop => Type::Prop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unify_variable_with_base() {
        let mut subst = TypeSubstitution::default();
        assert!(unify_types(&Type::variable("a"), &Type::int(), &mut subst));
        assert_eq!(subst.get("a"), Some(&Type::int()));
    }

    #[test]
    fn test_unify_through_binding() {
        let mut subst = TypeSubstitution::default();
        assert!(unify_types(&Type::variable("a"), &Type::variable("b"), &mut subst));
        assert!(unify_types(&Type::variable("b"), &Type::boolean(), &mut subst));
        let applied = apply_type_substitution(&Type::variable("a"), &subst);
        assert_eq!(applied, Type::boolean());
    }

    #[test]
    fn test_unify_function_types() {
        let mut subst = TypeSubstitution::default();
        let f1 = Type::function(vec![Type::variable("a")], Type::variable("a"));
        let f2 = Type::function(vec![Type::int()], Type::variable("b"));
        assert!(unify_types(&f1, &f2, &mut subst));
        let applied = apply_type_substitution(&Type::variable("b"), &subst);
        assert_eq!(applied, Type::int());
    }

    #[test]
    fn test_occurs_check_rejects_infinite_type() {
        let mut subst = TypeSubstitution::default();
        let list_like = Type::function(vec![Type::variable("a")], Type::boolean());
        assert!(!unify_types(&Type::variable("a"), &list_like, &mut subst));
    }

    #[test]
    fn test_occurs_check_through_binding() {
        let mut subst = TypeSubstitution::default();
        assert!(unify_types(&Type::variable("a"), &Type::variable("b"), &mut subst));
        let wrapped = Type::product(vec![Type::variable("a")]);
        assert!(!unify_types(&Type::variable("b"), &wrapped, &mut subst));
    }

    #[test]
    fn test_mismatched_arity_fails() {
        let mut subst = TypeSubstitution::default();
        let f1 = Type::function(vec![Type::int()], Type::int());
        let f2 = Type::function(vec![Type::int(), Type::int()], Type::int());
        assert!(!unify_types(&f1, &f2, &mut subst));
    }

    #[test]
    fn test_record_unification() {
        let mut subst = TypeSubstitution::default();
        let r1 = Type::record(vec![("x", Type::variable("a")), ("y", Type::int())]);
        let r2 = Type::record(vec![("x", Type::real()), ("y", Type::int())]);
        assert!(unify_types(&r1, &r2, &mut subst));
        assert_eq!(subst.get("a"), Some(&Type::real()));
    }

    #[test]
    fn test_display() {
        let f = Type::function(vec![Type::int(), Type::int()], Type::boolean());
        assert_eq!(f.to_string(), "(Int, Int) -> Bool");
        assert_eq!(Type::Prop.to_string(), "Prop");
    }
}
