use thiserror::Error;

/// Errors in this category are contract violations by the caller, not
/// algorithmic failures. Unification failing to find a unifier, a rewrite
/// finding no redex, and similar "no result" outcomes are reported through
/// result records instead (see `UnificationResult`, `RewriteResult`,
/// `ResolutionResult`, `ConstraintViolation`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("variable index {index} would become negative after shifting by {amount}")]
    NegativeShift { index: usize, amount: i64 },

    #[error("term is not an equality")]
    NotAnEquality,

    #[error("metavariable already exists: {0}")]
    DuplicateMetavariable(String),

    #[error("proof state is already certified: {0}")]
    AlreadyCertified(String),

    #[error("certification cannot be reset to unproved")]
    InvalidCertification,
}

pub type Result<T> = std::result::Result<T, KernelError>;
