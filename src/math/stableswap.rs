// StableSwap invariant math: fixed-point solvers over U512.
// ---------------------------------------------------------
// All balances entering these solvers must already be reduced to a common
// 18-decimal precision (the engine multiplies raw reserves by per-asset
// rates before calling in). Amplification values are scaled by A_PRECISION.

use primitive_types::U512;

use crate::error::SimulatorError;

/// Denominator for trading and admin fee numerators.
pub const FEE_DENOMINATOR: u64 = 10_000_000_000;
/// Common fixed-point scale for rate-normalized balances, LP amounts and
/// virtual prices.
pub const PRECISION: u128 = 1_000_000_000_000_000_000;
/// Scale factor applied to stored amplification values.
pub const A_PRECISION: u64 = 100;
/// Hard cap on solver iterations; exceeding it is a `ConvergenceFailure`.
pub const MAX_ITERATIONS: usize = 255;
/// Minimum duration of an amplification ramp, and minimum delay between two
/// ramp starts, in seconds.
pub const MIN_RAMP_TIME: u64 = 86_400;
/// Exclusive upper bound on the unscaled amplification coefficient.
pub const MAX_A: u64 = 1_000_000;
/// Maximum allowed change factor of A per ramp, in either direction.
pub const MAX_A_CHANGE: u64 = 10;

#[inline]
pub(crate) fn abs_diff(a: U512, b: U512) -> U512 {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// Solves the StableSwap invariant
///
/// `Ann * S + D = Ann * D + D^(n+1) / (n^n * Prod(xp))`
///
/// numerically for `D` with the Newton-Raphson update
///
/// `D' = (Ann*S/A_PRECISION + D_P*n) * D / ((Ann - A_PRECISION)*D/A_PRECISION + (n+1)*D_P)`
///
/// where `S = Sum(xp)`, `D_P = D^(n+1) / (n^n * Prod(xp))` and
/// `Ann = amp * n` with `amp` scaled by [`A_PRECISION`].
///
/// Iteration stops once consecutive estimates differ by at most one unit;
/// failing to get there within [`MAX_ITERATIONS`] is a hard error. An empty
/// pool (`S == 0`) yields `D = 0` without iterating.
pub fn solve_invariant(xp: &[U512], amp: u64) -> Result<U512, SimulatorError> {
    let s = xp.iter().fold(U512::zero(), |acc, x| acc + *x);
    if s.is_zero() {
        return Ok(U512::zero());
    }

    let n = U512::from(xp.len());
    let one = U512::one();
    let ann = U512::from(amp) * n;
    let a_prec = U512::from(A_PRECISION);

    let mut d = s;
    let mut d_prev = U512::zero();
    let mut iterations = 0usize;
    while abs_diff(d, d_prev) > one {
        if iterations == MAX_ITERATIONS {
            return Err(SimulatorError::ConvergenceFailure);
        }
        let mut d_p = d;
        for x in xp {
            if x.is_zero() {
                // A zeroed reserve next to live ones has no finite solution.
                return Err(SimulatorError::ConvergenceFailure);
            }
            d_p = d_p * d / (n * *x);
        }
        d_prev = d;
        d = (ann * s / a_prec + d_p * n) * d
            / ((ann - a_prec) * d / a_prec + (n + one) * d_p);
        iterations += 1;
    }
    Ok(d)
}

/// Solves for the post-trade balance of asset `j` when asset `i` moves to
/// `x`, holding the invariant fixed. Used by swaps.
///
/// The unknown satisfies the quadratic form `y^2 + y*(b - D) = c`, iterated
/// as `y' = (y^2 + c) / (2y + b - D)` until `y` stabilizes exactly; the same
/// iteration cap and failure policy as [`solve_invariant`] apply.
pub fn solve_balance(
    i: usize,
    j: usize,
    x: U512,
    xp: &[U512],
    amp: u64,
) -> Result<U512, SimulatorError> {
    let d = solve_invariant(xp, amp)?;
    let n = U512::from(xp.len());
    let ann = U512::from(amp) * n;
    let a_prec = U512::from(A_PRECISION);

    let mut c = d;
    let mut s = U512::zero();
    for (k, balance) in xp.iter().enumerate() {
        let term = if k == i {
            x
        } else if k != j {
            *balance
        } else {
            continue;
        };
        if term.is_zero() {
            return Err(SimulatorError::ConvergenceFailure);
        }
        s = s + term;
        c = c * d / (term * n);
    }
    c = c * d * a_prec / (n * ann);
    let b = s + d * a_prec / ann;

    converge_quadratic(b, c, d)
}

/// Solves for the balance of asset `i` that realizes a reduced invariant `d`
/// with every other balance held fixed. Used by single-asset withdrawal.
pub fn solve_balance_for_invariant(
    i: usize,
    xp: &[U512],
    d: U512,
    amp: u64,
) -> Result<U512, SimulatorError> {
    let n = U512::from(xp.len());
    let ann = U512::from(amp) * n;
    let a_prec = U512::from(A_PRECISION);

    let mut c = d;
    let mut s = U512::zero();
    for (k, balance) in xp.iter().enumerate() {
        if k == i {
            continue;
        }
        if balance.is_zero() {
            return Err(SimulatorError::ConvergenceFailure);
        }
        s = s + *balance;
        c = c * d / (*balance * n);
    }
    c = c * d * a_prec / (n * ann);
    let b = s + d * a_prec / ann;

    converge_quadratic(b, c, d)
}

fn converge_quadratic(b: U512, c: U512, d: U512) -> Result<U512, SimulatorError> {
    let two = U512::from(2u8);
    let mut y = d;
    let mut y_prev = U512::zero();
    let mut iterations = 0usize;
    while y != y_prev {
        if iterations == MAX_ITERATIONS {
            return Err(SimulatorError::ConvergenceFailure);
        }
        y_prev = y;
        y = (y * y + c) / (two * y + b - d);
        iterations += 1;
    }
    Ok(y)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    fn u(v: u128) -> U512 {
        U512::from(v)
    }

    #[test]
    fn balanced_pool_invariant_is_the_sum() {
        // For equal rate-normalized balances the invariant equals n * x
        // exactly, for any amplification and asset count.
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let n = rng.gen_range(2usize..=4);
            let amp: u64 = rng.gen_range(1..2000) * A_PRECISION;
            let balance: u64 = rng.gen();
            let xp = vec![U512::from(balance); n];
            let d = solve_invariant(&xp, amp).unwrap();
            assert_eq!(d, U512::from(balance) * U512::from(n));
        }
    }

    #[test]
    fn skewed_reserves_converge() {
        // 10_000:1 skew across three assets still converges under the cap.
        let xp = vec![u(1_000_000_000_000_000_000_000), u(100_000_000_000_000_000), u(500_000_000_000_000_000_000)];
        let d = solve_invariant(&xp, 2000 * A_PRECISION).unwrap();
        let s: U512 = xp.iter().fold(U512::zero(), |acc, x| acc + *x);
        assert!(d > U512::zero());
        assert!(d <= s);
    }

    #[test]
    fn empty_pool_invariant_is_zero() {
        let xp = vec![U512::zero(); 3];
        assert_eq!(solve_invariant(&xp, 200).unwrap(), U512::zero());
    }

    #[test]
    fn zeroed_reserve_is_a_convergence_failure() {
        let xp = vec![u(1_000_000_000_000_000_000), U512::zero()];
        assert_eq!(
            solve_invariant(&xp, 200),
            Err(SimulatorError::ConvergenceFailure)
        );
    }

    #[test]
    fn solve_balance_preserves_the_invariant() {
        let xp = vec![
            u(1_000_000_000_000_000_000_000),
            u(1_050_000_000_000_000_000_000),
            u(980_000_000_000_000_000_000),
        ];
        let amp = 2000 * A_PRECISION;
        let d = solve_invariant(&xp, amp).unwrap();

        // Push 10% of asset 0 in, solve asset 1 out, re-derive D.
        let x = xp[0] + xp[0] / u(10);
        let y = solve_balance(0, 1, x, &xp, amp).unwrap();
        assert!(y < xp[1]);

        let mut moved = xp.clone();
        moved[0] = x;
        moved[1] = y;
        let d_after = solve_invariant(&moved, amp).unwrap();
        // y stabilizes within a unit of the exact root, so D drifts by at
        // most a handful of units at this scale.
        assert!(abs_diff(d_after, d) < u(1_000_000));
    }

    #[test]
    fn solve_balance_for_invariant_recovers_fixed_point() {
        let xp = vec![
            u(2_000_000_000_000_000_000_000),
            u(2_000_000_000_000_000_000_000),
            u(2_000_000_000_000_000_000_000),
        ];
        let amp = 500 * A_PRECISION;
        let d = solve_invariant(&xp, amp).unwrap();
        // Solving against the unchanged invariant must give the balance back
        // (up to a unit of truncation).
        let y = solve_balance_for_invariant(1, &xp, d, amp).unwrap();
        assert!(abs_diff(y, xp[1]) <= U512::one());
    }
}
