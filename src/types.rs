// Parameter, result, state and snapshot types for the pool engine and the
// cross-pool router.
// -----------------------------------------------------------------------
// Amount conventions: reserve-side amounts are in native per-asset decimal
// units; LP amounts and virtual prices are 18-decimal fixed point.

use primitive_types::U512;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assets::{Allocation, Asset};

/// Construction input for a [`crate::PoolSimulator`].
///
/// The `Allocation` lists are sorted into canonical asset order at ingestion;
/// that order becomes the engine's fixed index mapping. `decimals` doubles as
/// the pool's asset roster, so every pool asset must appear in it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct SimulatorState {
    /// Identity of this pool's LP token.
    pub lp_asset: Asset,
    /// Amplification at ramp start, scaled by `A_PRECISION`.
    pub init_a: u64,
    /// Amplification at ramp end, scaled by `A_PRECISION`.
    pub future_a: u64,
    pub init_a_time: u64,
    pub future_a_time: u64,
    pub fee_numerator: u64,
    pub admin_fee_numerator: u64,
    /// Per-asset decimal counts, keyed by asset.
    pub decimals: Vec<Allocation>,
    pub reserves: Vec<Allocation>,
    pub admin_fees: Vec<Allocation>,
    pub lp_total_supply: U512,
    /// External exchange-rate normalization for yield-bearing assets;
    /// `None` means identity rates.
    pub rates: Option<Vec<Allocation>>,
}

/// Complete positional copy of a pool's mutable state.
///
/// Values align with the engine's fixed index mapping; no asset identifiers
/// are embedded, so the consumer must keep the mapping alongside.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatorSnapshot {
    pub init_a: u64,
    pub future_a: u64,
    pub init_a_time: u64,
    pub future_a_time: u64,
    pub now: u64,
    pub reserves: Vec<U512>,
    pub admin_fees: Vec<U512>,
    pub lp_total_supply: U512,
    pub rates: Vec<U512>,
}

// ------------------------------ Pool operations ------------------------------

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct DepositParams {
    /// Amounts to add, a subset of the pool's assets; omitted assets are zero.
    pub deposit_amounts: Vec<Allocation>,
    pub rates: Option<Vec<Allocation>>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct WithdrawParams {
    /// LP amount to burn, 18-decimal fixed point.
    pub lp_amount: U512,
    /// Target asset for a single-asset withdrawal; `None` withdraws balanced.
    pub asset_out: Option<Asset>,
    pub rates: Option<Vec<Allocation>>,
}

/// Swap request, tagged by pricing mode.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum SwapParams {
    ExactIn {
        asset_in: Asset,
        asset_out: Asset,
        amount_in: U512,
        rates: Option<Vec<Allocation>>,
    },
    ExactOut {
        asset_in: Asset,
        asset_out: Asset,
        amount_out: U512,
        rates: Option<Vec<Allocation>>,
    },
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositResult {
    pub lp_token_out: U512,
    pub virtual_price_before: U512,
    pub virtual_price_after: U512,
    pub lp_total_supply: U512,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawResult {
    /// One amount per pool asset for a balanced withdrawal; a single element
    /// for a single-asset withdrawal.
    pub amount_outs: Vec<U512>,
    pub virtual_price_before: U512,
    pub virtual_price_after: U512,
}

/// Swap outcome, tagged by the mode that produced it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwapResult {
    ExactIn {
        amount_out: U512,
        virtual_price_before: U512,
        virtual_price_after: U512,
    },
    ExactOut {
        amount_in: U512,
        virtual_price_before: U512,
        virtual_price_after: U512,
    },
}

impl SwapResult {
    /// The flowing amount of this hop: output for exact-in, required input
    /// for exact-out.
    pub fn amount(&self) -> U512 {
        match self {
            SwapResult::ExactIn { amount_out, .. } => *amount_out,
            SwapResult::ExactOut { amount_in, .. } => *amount_in,
        }
    }
}

// ------------------------------- Route types ---------------------------------

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HopAction {
    Swap,
    Deposit,
    Withdraw,
}

/// One pool-level operation within a multi-pool route. Derived, not
/// persisted; each hop's `asset_out` is the next hop's `asset_in`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hop {
    pub action: HopAction,
    /// The LP asset of the pool this hop executes on.
    pub pool: Asset,
    pub asset_in: Asset,
    pub asset_out: Asset,
}

/// Route-level swap request; per-hop rates are not overridable here.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum RouteSwapParams {
    ExactIn {
        asset_in: Asset,
        asset_out: Asset,
        amount_in: U512,
    },
    ExactOut {
        asset_in: Asset,
        asset_out: Asset,
        amount_out: U512,
    },
}

// -------------------------- Composed two-pool forms ---------------------------

/// Deposit into a pool chain: the first pool's LP mint feeds the second
/// pool's deposit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct ComposedDepositParams {
    pub deposit_amounts: Vec<Allocation>,
    pub next_deposit: Option<NextDeposit>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct NextDeposit {
    /// Extra allocation deposited into the second pool alongside the first
    /// pool's LP mint.
    pub deposit_amounts: Option<Allocation>,
}

/// Second leg of a chained withdrawal, tagged by its own mode.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum NextWithdraw {
    Single { asset_out: Asset },
    Balanced,
}

/// Destination of a single-mode first leg: a plain asset, or the next pool
/// in the chain (the leg then necessarily pays out the next pool's LP
/// asset).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum WithdrawTarget {
    Asset(Asset),
    NextPool(NextWithdraw),
}

/// Withdrawal from a pool chain. Invalid mode/asset combinations are
/// unrepresentable rather than rejected at runtime.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum ComposedWithdrawParams {
    Single {
        lp_amount: U512,
        target: WithdrawTarget,
    },
    Balanced {
        lp_amount: U512,
        next_withdraw: Option<NextWithdraw>,
    },
}
