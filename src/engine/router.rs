// Cross-pool route composition.
// ------------------------------
// A route is an ordered chain of pools. Each pool contributes exactly one
// hop: a swap between two of its assets, a deposit into its LP token, or a
// withdrawal out of it. Hops are derived from asset identity alone; the LP
// token of a pool is the connector that turns a hop into a deposit or
// withdrawal.

use log::{debug, trace};
use primitive_types::U512;

use crate::assets::{Allocation, Asset};
use crate::engine::pool::PoolSimulator;
use crate::error::SimulatorError;
use crate::math::stableswap::abs_diff;
use crate::types::{
    ComposedDepositParams, ComposedWithdrawParams, DepositParams, DepositResult, Hop, HopAction,
    NextWithdraw, RouteSwapParams, SimulatorSnapshot, SwapParams, SwapResult, WithdrawParams,
    WithdrawResult, WithdrawTarget,
};

/// Iteration cap for the exact-output bisection searches.
pub const EXACT_OUT_MAX_ITERATIONS: usize = 200;
/// Absolute tolerance, in the target asset's native units, at which the
/// exact-output searches stop early.
pub const EXACT_OUT_TOLERANCE: u64 = 1;

/// Composes operations across an ordered chain of pools.
///
/// The router borrows the chain per operation; pool order in the slice is
/// route order, left to right.
pub struct CrossPoolSimulator<'a> {
    pools: &'a mut [PoolSimulator],
}

impl<'a> CrossPoolSimulator<'a> {
    pub fn new(pools: &'a mut [PoolSimulator]) -> Self {
        CrossPoolSimulator { pools }
    }

    /// Derives the unique hop sequence carrying `asset_in` to `asset_out`
    /// across `pools`, one hop per pool.
    ///
    /// The connector out of each intermediate pool is the first asset, in the
    /// pool's natural order (assets in canonical order, then the pool's own
    /// LP token), that differs from the hop's input and that the next pool
    /// also recognizes (its own LP token included). Derivation is
    /// deterministic: the same chain and endpoints always yield the same
    /// hops.
    pub fn derive_hops(
        pools: &[PoolSimulator],
        asset_in: &Asset,
        asset_out: &Asset,
    ) -> Result<Vec<Hop>, SimulatorError> {
        if pools.is_empty() {
            return Err(SimulatorError::InvalidRoute {
                reason: "empty pool chain",
            });
        }
        if asset_in == asset_out {
            return Err(SimulatorError::InvalidRoute {
                reason: "route input and output are the same asset",
            });
        }

        let mut hops = Vec::with_capacity(pools.len());
        let mut current = asset_in.clone();
        for (k, pool) in pools.iter().enumerate() {
            let target = if k + 1 == pools.len() {
                asset_out.clone()
            } else {
                Self::connector(pool, &pools[k + 1], &current)?
            };
            let action = Self::classify(pool, &current, &target)?;
            hops.push(Hop {
                action,
                pool: pool.lp_asset().clone(),
                asset_in: current,
                asset_out: target.clone(),
            });
            current = target;
        }
        Ok(hops)
    }

    fn connector(
        pool: &PoolSimulator,
        next: &PoolSimulator,
        current: &Asset,
    ) -> Result<Asset, SimulatorError> {
        let candidates = pool
            .assets()
            .iter()
            .chain(std::iter::once(pool.lp_asset()));
        for asset in candidates {
            if asset != current && Self::recognizes(next, asset) {
                return Ok(asset.clone());
            }
        }
        Err(SimulatorError::InvalidRoute {
            reason: "no connecting asset between adjacent pools",
        })
    }

    fn recognizes(pool: &PoolSimulator, asset: &Asset) -> bool {
        asset == pool.lp_asset() || pool.assets().binary_search(asset).is_ok()
    }

    fn classify(
        pool: &PoolSimulator,
        asset_in: &Asset,
        asset_out: &Asset,
    ) -> Result<HopAction, SimulatorError> {
        let in_is_reserve = pool.assets().binary_search(asset_in).is_ok();
        let out_is_reserve = pool.assets().binary_search(asset_out).is_ok();
        let in_is_lp = asset_in == pool.lp_asset();
        let out_is_lp = asset_out == pool.lp_asset();
        match (in_is_reserve, out_is_reserve, in_is_lp, out_is_lp) {
            (true, true, _, _) => Ok(HopAction::Swap),
            (true, false, _, true) => Ok(HopAction::Deposit),
            (false, true, true, _) => Ok(HopAction::Withdraw),
            _ => Err(SimulatorError::InvalidRoute {
                reason: "hop is neither a swap, a deposit nor a withdrawal",
            }),
        }
    }

    /// Routes a swap through the chain, one result per hop.
    ///
    /// Exact-in walks the hops left to right, feeding each hop's output into
    /// the next. Exact-out walks them right to left, resolving each hop's
    /// required input; swap hops use the closed-form inversion, deposit and
    /// withdrawal hops use the bisection searches. Results are returned in
    /// processing order.
    pub fn swap(
        &mut self,
        params: RouteSwapParams,
        hops: Option<Vec<Hop>>,
    ) -> Result<Vec<SwapResult>, SimulatorError> {
        match params {
            RouteSwapParams::ExactIn {
                asset_in,
                asset_out,
                amount_in,
            } => {
                let hops = self.resolve_hops(hops, &asset_in, &asset_out)?;
                self.swap_exact_in(&hops, amount_in)
            }
            RouteSwapParams::ExactOut {
                asset_in,
                asset_out,
                amount_out,
            } => {
                let hops = self.resolve_hops(hops, &asset_in, &asset_out)?;
                self.swap_exact_out(&hops, amount_out)
            }
        }
    }

    fn resolve_hops(
        &self,
        hops: Option<Vec<Hop>>,
        asset_in: &Asset,
        asset_out: &Asset,
    ) -> Result<Vec<Hop>, SimulatorError> {
        let hops = match hops {
            Some(hops) => hops,
            None => Self::derive_hops(self.pools, asset_in, asset_out)?,
        };
        if hops.len() != self.pools.len() {
            return Err(SimulatorError::InvalidRoute {
                reason: "hop count does not match the pool chain",
            });
        }
        Ok(hops)
    }

    fn swap_exact_in(
        &mut self,
        hops: &[Hop],
        amount_in: U512,
    ) -> Result<Vec<SwapResult>, SimulatorError> {
        let mut results = Vec::with_capacity(hops.len());
        let mut amount = amount_in;
        for (pool, hop) in self.pools.iter_mut().zip(hops) {
            let result = match hop.action {
                HopAction::Swap => pool.swap(SwapParams::ExactIn {
                    asset_in: hop.asset_in.clone(),
                    asset_out: hop.asset_out.clone(),
                    amount_in: amount,
                    rates: None,
                })?,
                HopAction::Deposit => {
                    let deposit = pool.deposit(DepositParams {
                        deposit_amounts: vec![Allocation::new(hop.asset_in.clone(), amount)],
                        rates: None,
                    })?;
                    SwapResult::ExactIn {
                        amount_out: deposit.lp_token_out,
                        virtual_price_before: deposit.virtual_price_before,
                        virtual_price_after: deposit.virtual_price_after,
                    }
                }
                HopAction::Withdraw => {
                    let withdraw = pool.withdraw(WithdrawParams {
                        lp_amount: amount,
                        asset_out: Some(hop.asset_out.clone()),
                        rates: None,
                    })?;
                    SwapResult::ExactIn {
                        amount_out: withdraw.amount_outs[0],
                        virtual_price_before: withdraw.virtual_price_before,
                        virtual_price_after: withdraw.virtual_price_after,
                    }
                }
            };
            amount = result.amount();
            results.push(result);
        }
        Ok(results)
    }

    fn swap_exact_out(
        &mut self,
        hops: &[Hop],
        amount_out: U512,
    ) -> Result<Vec<SwapResult>, SimulatorError> {
        let mut results = Vec::with_capacity(hops.len());
        let mut target = amount_out;
        for (pool, hop) in self.pools.iter_mut().zip(hops).rev() {
            let result = match hop.action {
                HopAction::Swap => {
                    let amount_in =
                        pool.quote_swap_exact_out(&hop.asset_in, &hop.asset_out, target)?;
                    match pool.swap(SwapParams::ExactIn {
                        asset_in: hop.asset_in.clone(),
                        asset_out: hop.asset_out.clone(),
                        amount_in,
                        rates: None,
                    })? {
                        SwapResult::ExactIn {
                            virtual_price_before,
                            virtual_price_after,
                            ..
                        } => SwapResult::ExactOut {
                            amount_in,
                            virtual_price_before,
                            virtual_price_after,
                        },
                        out @ SwapResult::ExactOut { .. } => out,
                    }
                }
                HopAction::Deposit => {
                    let (amount_in, deposit) = find_exact_deposit_amount(
                        pool,
                        target,
                        &hop.asset_in,
                        EXACT_OUT_MAX_ITERATIONS,
                        EXACT_OUT_TOLERANCE,
                    )?;
                    SwapResult::ExactOut {
                        amount_in,
                        virtual_price_before: deposit.virtual_price_before,
                        virtual_price_after: deposit.virtual_price_after,
                    }
                }
                HopAction::Withdraw => {
                    let (lp_amount, withdraw) = find_exact_burn_amount(
                        pool,
                        target,
                        &hop.asset_out,
                        EXACT_OUT_MAX_ITERATIONS,
                        EXACT_OUT_TOLERANCE,
                    )?;
                    SwapResult::ExactOut {
                        amount_in: lp_amount,
                        virtual_price_before: withdraw.virtual_price_before,
                        virtual_price_after: withdraw.virtual_price_after,
                    }
                }
            };
            target = result.amount();
            results.push(result);
        }
        Ok(results)
    }

    /// Deposits through a chain: the first pool's LP mint, plus an optional
    /// extra allocation, becomes the second pool's deposit.
    pub fn deposit(
        &mut self,
        params: ComposedDepositParams,
    ) -> Result<Vec<DepositResult>, SimulatorError> {
        let legs = 1 + usize::from(params.next_deposit.is_some());
        if self.pools.len() != legs {
            return Err(SimulatorError::InvalidModeMismatch {
                reason: "deposit legs do not match the pool chain",
            });
        }

        let checkpoint = self.pools[0].snapshot();
        let first = self.pools[0].deposit(DepositParams {
            deposit_amounts: params.deposit_amounts,
            rates: None,
        })?;

        let mut results = vec![first];
        if let Some(next) = params.next_deposit {
            let lp_in = Allocation::new(
                self.pools[0].lp_asset().clone(),
                results[0].lp_token_out,
            );
            let mut deposit_amounts = vec![lp_in];
            if let Some(extra) = next.deposit_amounts {
                deposit_amounts.push(extra);
            }
            match self.pools[1].deposit(DepositParams {
                deposit_amounts,
                rates: None,
            }) {
                Ok(second) => results.push(second),
                Err(err) => {
                    self.pools[0].restore(&checkpoint)?;
                    return Err(err);
                }
            }
        }
        Ok(results)
    }

    /// Withdraws through a chain. A chained first leg pays out the second
    /// pool's LP token, which the second leg then burns in its own mode.
    pub fn withdraw(
        &mut self,
        params: ComposedWithdrawParams,
    ) -> Result<Vec<WithdrawResult>, SimulatorError> {
        match params {
            ComposedWithdrawParams::Single {
                lp_amount,
                target: WithdrawTarget::Asset(asset_out),
            } => {
                self.expect_chain_len(1)?;
                let result = self.pools[0].withdraw(WithdrawParams {
                    lp_amount,
                    asset_out: Some(asset_out),
                    rates: None,
                })?;
                Ok(vec![result])
            }
            ComposedWithdrawParams::Single {
                lp_amount,
                target: WithdrawTarget::NextPool(next),
            } => {
                self.expect_chain_len(2)?;
                let inter_asset = self.pools[1].lp_asset().clone();
                let checkpoint = self.pools[0].snapshot();
                let first = self.pools[0].withdraw(WithdrawParams {
                    lp_amount,
                    asset_out: Some(inter_asset),
                    rates: None,
                })?;
                let inter_amount = first.amount_outs[0];
                self.chained_leg(checkpoint, first, inter_amount, next)
            }
            ComposedWithdrawParams::Balanced {
                lp_amount,
                next_withdraw: None,
            } => {
                self.expect_chain_len(1)?;
                let result = self.pools[0].withdraw(WithdrawParams {
                    lp_amount,
                    asset_out: None,
                    rates: None,
                })?;
                Ok(vec![result])
            }
            ComposedWithdrawParams::Balanced {
                lp_amount,
                next_withdraw: Some(next),
            } => {
                self.expect_chain_len(2)?;
                let inter_asset = self.pools[1].lp_asset().clone();
                let inter_index =
                    self.pools[0].asset_index(&inter_asset).map_err(|_| {
                        SimulatorError::InvalidModeMismatch {
                            reason: "first pool does not hold the next pool's lp token",
                        }
                    })?;
                let checkpoint = self.pools[0].snapshot();
                let first = self.pools[0].withdraw(WithdrawParams {
                    lp_amount,
                    asset_out: None,
                    rates: None,
                })?;
                let inter_amount = first.amount_outs[inter_index];
                self.chained_leg(checkpoint, first, inter_amount, next)
            }
        }
    }

    fn expect_chain_len(&self, expected: usize) -> Result<(), SimulatorError> {
        if self.pools.len() != expected {
            return Err(SimulatorError::InvalidModeMismatch {
                reason: "withdraw legs do not match the pool chain",
            });
        }
        Ok(())
    }

    fn chained_leg(
        &mut self,
        checkpoint: SimulatorSnapshot,
        first: WithdrawResult,
        inter_amount: U512,
        next: NextWithdraw,
    ) -> Result<Vec<WithdrawResult>, SimulatorError> {
        let second = self.pools[1].withdraw(WithdrawParams {
            lp_amount: inter_amount,
            asset_out: match next {
                NextWithdraw::Single { asset_out } => Some(asset_out),
                NextWithdraw::Balanced => None,
            },
            rates: None,
        });
        match second {
            Ok(second) => Ok(vec![first, second]),
            Err(err) => {
                self.pools[0].restore(&checkpoint)?;
                Err(err)
            }
        }
    }
}

/// Bisects the LP burn on `pool` whose single-asset payout in `asset_out`
/// lands within `tolerance` of `target_amount`.
///
/// The search is value-pure: each trial runs on a clone of the pool and the
/// loop keeps only the closest candidate seen. Hitting the iteration cap or
/// exhausting the bracket returns that best candidate rather than failing. A
/// trial that errors (burn too deep for the reserve) shrinks the upper
/// bound. On success the winning trial's state is committed to `pool`.
pub fn find_exact_burn_amount(
    pool: &mut PoolSimulator,
    target_amount: U512,
    asset_out: &Asset,
    max_iterations: usize,
    tolerance: u64,
) -> Result<(U512, WithdrawResult), SimulatorError> {
    let tolerance = U512::from(tolerance);
    let base = pool.clone();
    let mut low = U512::one();
    let mut high = base.lp_total_supply();
    let mut best: Option<(U512, WithdrawResult, PoolSimulator, U512)> = None;

    let mut iterations = 0usize;
    while low <= high && iterations < max_iterations {
        iterations += 1;
        let mid = (low + high) / U512::from(2u8);
        if mid.is_zero() {
            break;
        }
        let mut trial = base.clone();
        match trial.withdraw(WithdrawParams {
            lp_amount: mid,
            asset_out: Some(asset_out.clone()),
            rates: None,
        }) {
            Err(_) => {
                high = mid - U512::one();
                continue;
            }
            Ok(result) => {
                let estimate = result.amount_outs[0];
                let error = abs_diff(estimate, target_amount);
                trace!("burn search: trial {} pays {}", mid, estimate);
                let better = best.as_ref().map_or(true, |(_, _, _, e)| error < *e);
                if better {
                    best = Some((mid, result, trial, error));
                }
                if error <= tolerance {
                    break;
                }
                if estimate < target_amount {
                    low = mid + U512::one();
                } else {
                    high = mid - U512::one();
                }
            }
        }
    }

    match best {
        Some((amount, result, committed, error)) => {
            debug!(
                "burn search settled at {} (error {}) after {} iterations",
                amount, error, iterations
            );
            *pool = committed;
            Ok((amount, result))
        }
        None => Err(SimulatorError::InsufficientLiquidity {
            reason: "no feasible burn amount for the requested output",
        }),
    }
}

/// Bisects the single-asset deposit of `asset_in` on `pool` whose LP mint
/// lands within `tolerance` of `target_lp`.
///
/// Same value-pure search as [`find_exact_burn_amount`], except a failing
/// trial propagates its error: the bracket is sized from the target, so a
/// failure here is a real pool failure, not an oversized probe.
pub fn find_exact_deposit_amount(
    pool: &mut PoolSimulator,
    target_lp: U512,
    asset_in: &Asset,
    max_iterations: usize,
    tolerance: u64,
) -> Result<(U512, DepositResult), SimulatorError> {
    let tolerance = U512::from(tolerance);
    let decimals = pool.decimals()[pool.asset_index(asset_in)?];
    let base = pool.clone();

    let scale_up = U512::from(10u8).pow(U512::from(decimals));
    let scale_down = U512::from(10u8).pow(U512::from(18u8));
    let mut low = U512::one();
    let mut high = target_lp * U512::from(2u8) * scale_up / scale_down;
    if high < low {
        high = low;
    }
    let mut best: Option<(U512, DepositResult, PoolSimulator, U512)> = None;

    let mut iterations = 0usize;
    while low <= high && iterations < max_iterations {
        iterations += 1;
        let mid = (low + high) / U512::from(2u8);
        if mid.is_zero() {
            break;
        }
        let mut trial = base.clone();
        let result = trial.deposit(DepositParams {
            deposit_amounts: vec![Allocation::new(asset_in.clone(), mid)],
            rates: None,
        })?;
        let estimate = result.lp_token_out;
        let error = abs_diff(estimate, target_lp);
        trace!("deposit search: trial {} mints {}", mid, estimate);
        let better = best.as_ref().map_or(true, |(_, _, _, e)| error < *e);
        if better {
            best = Some((mid, result, trial, error));
        }
        if error <= tolerance {
            break;
        }
        if estimate < target_lp {
            low = mid + U512::one();
        } else {
            high = mid - U512::one();
        }
    }

    match best {
        Some((amount, result, committed, error)) => {
            debug!(
                "deposit search settled at {} (error {}) after {} iterations",
                amount, error, iterations
            );
            *pool = committed;
            Ok((amount, result))
        }
        None => Err(SimulatorError::InsufficientLiquidity {
            reason: "no feasible deposit amount for the requested mint",
        }),
    }
}
