use thiserror::Error;

/// The only two run-time failure kinds a delegate can produce. Everything
/// else (incompatible callables, oversized captures, non-`Copy` captures)
/// is rejected at compile time.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum CallError {
    #[error("delegate called without a bound target")]
    Unbound,

    #[error("delegate called with signature `{supplied}`, but the bound target accepts `{accepted}`")]
    SignatureMismatch {
        accepted: &'static str,
        supplied: &'static str,
    },
}
