use thiserror::Error;

use crate::assets::Asset;

/// Failures raised by the pool engine and the cross-pool router.
///
/// Every failure is immediate and unrecovered at the point of detection; an
/// operation that returns an error leaves the pool state exactly as it was
/// before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulatorError {
    /// The caller referenced an asset the pool does not hold.
    #[error("asset {0} not found in pool")]
    AssetNotFound(Asset),

    /// The invariant or balance solver exceeded its iteration cap. Signals a
    /// degenerate or extreme reserve configuration, not a caller input error.
    #[error("solver did not converge within the iteration cap")]
    ConvergenceFailure,

    /// An amplification ramp violated a timing, bound, or magnitude guard.
    #[error("invalid ramp parameters: {reason}")]
    InvalidRampParameters { reason: &'static str },

    /// No connecting asset between adjacent pools, or a hop's input/output
    /// pair matches none of swap/deposit/withdraw.
    #[error("invalid route: {reason}")]
    InvalidRoute { reason: &'static str },

    /// A composed operation's structure is inconsistent with the pool chain
    /// it was applied to (wrong leg count, wrong intermediate asset, ...).
    #[error("mode mismatch: {reason}")]
    InvalidModeMismatch { reason: &'static str },

    /// The pool cannot cover the requested amount (LP burn above total
    /// supply, output above reserves).
    #[error("insufficient liquidity: {reason}")]
    InsufficientLiquidity { reason: &'static str },

    /// Construction input that cannot describe a valid pool.
    #[error("invalid pool state: {reason}")]
    InvalidState { reason: &'static str },
}
