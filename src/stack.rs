//! Stack growth for the recursive front end and evaluator.
//!
//! Nesting in source text and nested calls both recurse natively, so every
//! recursive entry point goes through [`ensure_sufficient_stack`]. The call
//! depth limit in `ExecutionContext` is then the only bound on recursion.

/// Runs `f`, first moving to a freshly allocated stack segment if less than
/// the red zone remains on the current one.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
