//! Outcome tagging for guarded calls.
//!
//! A guarded operation reports what happened through a [`Verdict`]: pass the
//! value through untouched, or hand it back *and* melt the fuse. Which results
//! count as melts is the caller's decision; `From<Result<T, E>>` covers the
//! common "errors melt" rule.

/// Value returned by an operation run under a fuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<T> {
    /// Plain success; the fuse is not touched.
    Pass(T),
    /// The resource misbehaved; record a melt before returning the value.
    Melt(T),
}

impl<T> Verdict<T> {
    /// `true` when this outcome melts the fuse.
    pub fn is_melt(&self) -> bool {
        matches!(self, Verdict::Melt(_))
    }

    /// Drop the tag.
    pub fn into_inner(self) -> T {
        match self {
            Verdict::Pass(v) | Verdict::Melt(v) => v,
        }
    }

    /// Tag with `melt` deciding from a borrow of the value.
    pub fn judge<F>(value: T, melt: F) -> Self
    where
        F: FnOnce(&T) -> bool,
    {
        if melt(&value) {
            Verdict::Melt(value)
        } else {
            Verdict::Pass(value)
        }
    }
}

impl<V, E> Verdict<Result<V, E>> {
    /// Melt on `Err`, pass on `Ok`.
    pub fn from_result(result: Result<V, E>) -> Self {
        match result {
            Ok(v) => Verdict::Pass(Ok(v)),
            Err(e) => Verdict::Melt(Err(e)),
        }
    }
}

impl<V, E> From<Result<V, E>> for Verdict<Result<V, E>> {
    fn from(result: Result<V, E>) -> Self {
        Verdict::from_result(result)
    }
}
