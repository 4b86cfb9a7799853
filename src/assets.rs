// Asset identity and asset/amount pairs.
// ---------------------------------------
// Assets are opaque, totally ordered identifiers. Pools sort their asset
// lists by this order exactly once, at construction; the resulting index
// mapping is fixed for the lifetime of the engine. LP tokens are ordinary
// `Asset::token` values carrying the pool's own identifier.

use std::fmt;

use primitive_types::U512;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque asset identifier with a canonical total order.
///
/// The native chain coin sorts before every token; tokens sort by their
/// identifier. Nothing in the core interprets the identifier string.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Asset {
    Native,
    Token(String),
}

impl Asset {
    pub fn native() -> Self {
        Asset::Native
    }

    pub fn token(id: impl Into<String>) -> Self {
        Asset::Token(id.into())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(id) => write!(f, "token:{id}"),
        }
    }
}

/// An asset paired with an amount, in the asset's native decimal units.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub asset: Asset,
    pub amount: U512,
}

impl Allocation {
    pub fn new(asset: Asset, amount: impl Into<U512>) -> Self {
        Allocation {
            asset,
            amount: amount.into(),
        }
    }

    /// Sorts allocations into canonical asset order.
    pub fn sort_canonical(allocations: &mut [Allocation]) {
        allocations.sort_by(|a, b| a.asset.cmp(&b.asset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_sorts_before_tokens() {
        let mut allocations = vec![
            Allocation::new(Asset::token("b"), 2u64),
            Allocation::new(Asset::token("a"), 1u64),
            Allocation::new(Asset::native(), 3u64),
        ];
        Allocation::sort_canonical(&mut allocations);
        assert_eq!(allocations[0].asset, Asset::native());
        assert_eq!(allocations[1].asset, Asset::token("a"));
        assert_eq!(allocations[2].asset, Asset::token("b"));
    }
}
