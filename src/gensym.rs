use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Generates a fresh symbol `prefix_N` from a process-global monotonic
/// counter. Used for hypothesis names, witness constants, and fresh binder
/// names during conversion. Uniqueness is the only guarantee; nothing may
/// depend on the specific numbers produced.
pub fn gensym(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}", prefix, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gensym_is_fresh() {
        let a = gensym("hyp");
        let b = gensym("hyp");
        assert_ne!(a, b);
        assert!(a.starts_with("hyp_"));
        assert!(b.starts_with("hyp_"));
    }
}
