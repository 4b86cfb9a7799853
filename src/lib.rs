// lib.rs - Library exports

pub mod assets;
pub mod engine;
pub mod error;
pub mod math;
pub mod types;

pub use assets::{Allocation, Asset};
pub use engine::pool::PoolSimulator;
pub use engine::router::CrossPoolSimulator;
pub use error::SimulatorError;
