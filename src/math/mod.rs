pub mod stableswap;
