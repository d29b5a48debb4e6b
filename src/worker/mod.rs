mod limiter;

pub use limiter::{Capacity, ConcurrencyLimiter, Permit};
