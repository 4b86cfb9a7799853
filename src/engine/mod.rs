pub mod pool;
pub mod router;
