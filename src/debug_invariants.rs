//! Structural checks for fragments and their overlap.
//!
//! [`debug_invariants!`] runs them only under `debug_assertions` or
//! the `check-invariants` feature.

use crate::engine_error::EngineError;

pub trait DebugInvariants {
    /// Panics on the first broken invariant when checks are compiled in.
    fn debug_assert_invariants(&self);
    /// First broken invariant, if any.
    fn validate_invariants(&self) -> Result<(), EngineError>;
}

/// Panics with `$ctx` when `$expr` is an error and checks are compiled in.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

/// Return `Ok(())` when `cond` holds, otherwise the error built by `err`.
#[inline]
pub fn ensure(cond: bool, err: impl FnOnce() -> EngineError) -> Result<(), EngineError> {
    if cond { Ok(()) } else { Err(err()) }
}
